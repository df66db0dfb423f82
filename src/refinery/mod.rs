// * The Refinery (Extraction Pipeline)
// * Goal: turn one rendered listing page into typed program records.
// * Pure: no network, no filesystem, no JavaScript. Strategies run in a fixed order and
// * the first one that yields a record wins the page.

pub mod card_locator;
pub mod classifier;
pub mod fragments;
pub mod observer;
pub mod strategy;

// * Re-exports for convenient access
pub use card_locator::{CardLocator, LocatorPolicy};
pub use classifier::{classify, Field, LabelTarget};
pub use fragments::{clean_fragment, collect_fragments};
pub use observer::{CardObserver, CardSampler, SampledCard};
pub use strategy::{
    CardError, CompiledFieldSelectors, StrategyContext, StrategyKind, StrategyOutcome,
};

use scraper::{Html, Selector};
use serde::Serialize;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, warn};

use crate::config::site::{compile_selector, ConfigError, SiteConfig};
use crate::ops::telemetry;
use crate::persistence::schema::ProgramRecord;

#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("Rendered HTML cannot be parsed: {0}")]
    MalformedDocument(String),
}

/// Card and strategy counters for one page
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PageStats {
    /// Strategies that ran, in cascade order
    pub strategies_attempted: Vec<StrategyKind>,
    pub cards_seen: usize,
    pub cards_rejected: usize,
    pub card_failures: usize,
}

/// Result of extracting one page
#[derive(Debug, Clone, Default)]
pub struct PageExtraction {
    pub records: Vec<ProgramRecord>,
    /// Strategy that produced the records; None when every strategy came up empty
    pub strategy: Option<StrategyKind>,
    pub stats: PageStats,
}

impl PageExtraction {
    /// True when all four strategies yielded nothing
    pub fn is_exhausted(&self) -> bool {
        self.strategy.is_none()
    }
}

/// One site's extraction pipeline
///
/// # Example
/// ```ignore
/// use program_harvest::config::SiteConfig;
/// use program_harvest::refinery::ExtractionPipeline;
///
/// let pipeline = ExtractionPipeline::new(SiteConfig::preset("applyboard")?)?;
/// let page = pipeline.extract_page(&rendered_html)?;
/// println!("{} records via {:?}", page.records.len(), page.strategy);
/// ```
pub struct ExtractionPipeline {
    site: SiteConfig,
    stable_selector: Option<Selector>,
    field_selectors: CompiledFieldSelectors,
    observer: Option<Arc<dyn CardObserver>>,
}

impl ExtractionPipeline {
    /// Validates the site config and precompiles its stable and field selectors
    pub fn new(site: SiteConfig) -> Result<Self, ConfigError> {
        site.validate()?;
        let stable_selector = site
            .stable_selector
            .as_deref()
            .map(compile_selector)
            .transpose()?;
        let field_selectors = CompiledFieldSelectors::compile(&site.field_selectors)?;

        Ok(Self {
            site,
            stable_selector,
            field_selectors,
            observer: None,
        })
    }

    // * S1 never matches; S2..S4 only need the base origin and detail path
    fn without_selectors(site: SiteConfig) -> Self {
        Self {
            site,
            stable_selector: None,
            field_selectors: CompiledFieldSelectors::default(),
            observer: None,
        }
    }

    /// Attaches a diagnostics observer that sees every candidate card
    pub fn with_observer(mut self, observer: Arc<dyn CardObserver>) -> Self {
        self.observer = Some(observer);
        self
    }

    pub fn site(&self) -> &SiteConfig {
        &self.site
    }

    /// Runs the strategy cascade over one rendered page
    ///
    /// # Pipeline Steps:
    /// 1. Reject input that is not markup at all
    /// 2. Parse the document once
    /// 3. Try S1..S4 in order, stop at the first with an accepted record
    pub fn extract_page(&self, html: &str) -> Result<PageExtraction, ExtractError> {
        // * Step 1: The HTML5 parser accepts anything, so "malformed" means "no markup"
        if html.trim().is_empty() {
            return Err(ExtractError::MalformedDocument("empty document".to_string()));
        }
        if !html.contains('<') {
            return Err(ExtractError::MalformedDocument("no markup found".to_string()));
        }

        // * Step 2: Parse
        let document = Html::parse_document(html);
        let ctx = StrategyContext {
            site: &self.site,
            stable_selector: self.stable_selector.as_ref(),
            field_selectors: &self.field_selectors,
        };

        // * Step 3: Cascade
        let mut extraction = PageExtraction::default();
        for kind in StrategyKind::CASCADE {
            telemetry::record_strategy_attempt(kind.as_str());
            extraction.stats.strategies_attempted.push(kind);

            let outcome = kind.run(&document, &ctx, self.observer.as_deref());
            extraction.stats.cards_seen += outcome.cards_seen;
            extraction.stats.cards_rejected += outcome.cards_rejected;
            extraction.stats.card_failures += outcome.card_failures;
            telemetry::record_cards_rejected("unclassified", outcome.cards_rejected);
            telemetry::record_cards_rejected("card_error", outcome.card_failures);

            if outcome.records.is_empty() {
                debug!(
                    site = %self.site.label,
                    strategy = %kind,
                    cards = outcome.cards_seen,
                    "Strategy produced no records"
                );
                continue;
            }

            telemetry::record_records_extracted(kind.as_str(), outcome.records.len());
            debug!(
                site = %self.site.label,
                strategy = %kind,
                records = outcome.records.len(),
                "Strategy succeeded"
            );
            extraction.records = outcome.records;
            extraction.strategy = Some(kind);
            return Ok(extraction);
        }

        warn!(
            site = %self.site.label,
            cards = extraction.stats.cards_seen,
            "All extraction strategies exhausted"
        );
        Ok(extraction)
    }

    /// Records only, for callers that do not need stats
    pub fn extract_records(&self, html: &str) -> Result<Vec<ProgramRecord>, ExtractError> {
        Ok(self.extract_page(html)?.records)
    }
}

/// Convenience function: one-off extraction with a fresh pipeline
///
/// A site whose selectors do not compile still runs the selector-free strategies,
/// so `MalformedDocument` stays the only error.
pub fn extract_page(html: &str, site: &SiteConfig) -> Result<Vec<ProgramRecord>, ExtractError> {
    let pipeline = ExtractionPipeline::new(site.clone()).unwrap_or_else(|e| {
        warn!(site = %site.label, error = %e, "Site selectors rejected, running without them");
        ExtractionPipeline::without_selectors(site.clone())
    });
    pipeline.extract_records(html)
}
