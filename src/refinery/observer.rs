// * Optional diagnostics hook: sees every candidate card before classification
// * Used when tuning the classifier against markup drift; never required by the pipeline.

use serde::Serialize;
use std::sync::Mutex;

use crate::config::constants::DEFAULT_SAMPLE_CARDS;
use crate::persistence::schema::CandidateCard;
use crate::refinery::strategy::StrategyKind;

pub trait CardObserver: Send + Sync {
    fn on_card(&self, strategy: StrategyKind, card: &CandidateCard);
}

#[derive(Debug, Clone, Serialize)]
pub struct SampledCard {
    pub strategy: StrategyKind,
    pub card: CandidateCard,
}

/// Keeps the first N cards the pipeline produced
#[derive(Debug)]
pub struct CardSampler {
    limit: usize,
    samples: Mutex<Vec<SampledCard>>,
}

impl CardSampler {
    pub fn new() -> Self {
        Self::with_limit(DEFAULT_SAMPLE_CARDS)
    }

    pub fn with_limit(limit: usize) -> Self {
        Self {
            limit,
            samples: Mutex::new(Vec::new()),
        }
    }

    /// Snapshot of the cards collected so far
    pub fn samples(&self) -> Vec<SampledCard> {
        match self.samples.lock() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    /// Converts the samples to pretty JSON string
    pub fn to_json_pretty(&self) -> String {
        serde_json::to_string_pretty(&self.samples()).unwrap_or_else(|_| "[]".to_string())
    }
}

impl Default for CardSampler {
    fn default() -> Self {
        Self::new()
    }
}

impl CardObserver for CardSampler {
    fn on_card(&self, strategy: StrategyKind, card: &CandidateCard) {
        let mut guard = match self.samples.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };

        if guard.len() < self.limit {
            guard.push(SampledCard {
                strategy,
                card: card.clone(),
            });
        }
    }
}
