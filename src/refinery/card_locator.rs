// * CardLocator: finds the block around a detail link that holds one whole record
// * Walks ancestors upward (bounded), returns the smallest one that passes the policy,
// * falling back to the largest text seen on the walk.

use scraper::ElementRef;

use crate::config::constants::{
    LABEL_SEARCH_DEPTH, MAX_ANCESTOR_DEPTH, MIN_CARD_TEXT_LEN, MIN_FIELD_MARKERS,
};
use crate::persistence::schema::CandidateCard;
use crate::refinery::classifier::{contains_field_label, field_markers};
use crate::refinery::fragments::collect_fragments;

/// Predicate an ancestor's text must satisfy to be chosen as the card
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LocatorPolicy {
    /// Markers for two distinct fields, or long text when no markers exist
    Completeness,
    /// Any recognized field label ("Tuition", "Location", ...)
    LabelPresence,
}

#[derive(Debug, Clone, Copy)]
pub struct CardLocator {
    policy: LocatorPolicy,
    max_depth: usize,
}

impl CardLocator {
    /// Completeness-driven locator used by the anchor-driven strategy
    pub fn completeness() -> Self {
        Self {
            policy: LocatorPolicy::Completeness,
            max_depth: MAX_ANCESTOR_DEPTH,
        }
    }

    /// Label-driven locator used by the label-presence strategy
    pub fn label_presence() -> Self {
        Self {
            policy: LocatorPolicy::LabelPresence,
            max_depth: LABEL_SEARCH_DEPTH,
        }
    }

    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    /// Locates the card around `anchor`.
    ///
    /// Returns None only when the anchor has no element ancestors.
    pub fn locate(&self, anchor: ElementRef<'_>, anchor_url: &str) -> Option<CandidateCard> {
        let mut largest: Option<CandidateCard> = None;

        for ancestor in anchor
            .ancestors()
            .filter_map(ElementRef::wrap)
            .take(self.max_depth)
        {
            let card = CandidateCard::new(collect_fragments(ancestor), anchor_url.to_string());

            if self.is_satisfied(&card) {
                return Some(card);
            }

            // * Keep the first of equally long texts
            if largest
                .as_ref()
                .map_or(true, |best| card.text_len() > best.text_len())
            {
                largest = Some(card);
            }
        }

        largest
    }

    fn is_satisfied(&self, card: &CandidateCard) -> bool {
        match self.policy {
            LocatorPolicy::Completeness => {
                let markers = field_markers(&card.fragments);
                markers >= MIN_FIELD_MARKERS
                    || (markers == 0 && card.text_len() >= MIN_CARD_TEXT_LEN)
            }
            LocatorPolicy::LabelPresence => contains_field_label(&card.fragments),
        }
    }
}

impl Default for CardLocator {
    fn default() -> Self {
        Self::completeness()
    }
}
