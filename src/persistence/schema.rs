// * Record shapes for extracted program listings
// * ProgramRecord is persisted; CandidateCard only lives between locator and classifier.

use serde::{Deserialize, Serialize};

use crate::config::constants::UNKNOWN;

/// One academic program as extracted from a listing card
///
/// # Fields
/// - `title`: program/degree name
/// - `institution`: school, university or college
/// - `location`: city/region/country text
/// - `tuition_text`: raw fee text, currency-tagged, never parsed
/// - `detail_url`: absolute detail-page URL, the identity key
/// - `source_site`: `{label}:{strategy}` provenance tag
///
/// Every field except `source_site` may hold the `"unknown"` sentinel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgramRecord {
    pub title: String,
    pub institution: String,
    pub location: String,
    pub tuition_text: String,
    pub detail_url: String,
    pub source_site: String,
}

impl ProgramRecord {
    /// Creates a record with every classified field set to the sentinel
    pub fn unknown(detail_url: &str, source_site: &str) -> Self {
        Self {
            title: UNKNOWN.to_string(),
            institution: UNKNOWN.to_string(),
            location: UNKNOWN.to_string(),
            tuition_text: UNKNOWN.to_string(),
            detail_url: detail_url.to_string(),
            source_site: source_site.to_string(),
        }
    }

    /// True when title or institution was classified
    pub fn is_resolved(&self) -> bool {
        self.title != UNKNOWN || self.institution != UNKNOWN
    }

    /// True when the record carries a usable detail URL
    pub fn has_identity(&self) -> bool {
        self.detail_url != UNKNOWN
    }
}

/// Field values read directly through a site's field selectors
///
/// A present hint wins over whatever the classifier derives from loose text.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldHints {
    pub title: Option<String>,
    pub institution: Option<String>,
    pub location: Option<String>,
    pub tuition_text: Option<String>,
}

impl FieldHints {
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.institution.is_none()
            && self.location.is_none()
            && self.tuition_text.is_none()
    }

    /// Overwrites the record's fields with every hint that is present
    pub fn apply_to(&self, record: &mut ProgramRecord) {
        let pairs = [
            (&self.title, &mut record.title),
            (&self.institution, &mut record.institution),
            (&self.location, &mut record.location),
            (&self.tuition_text, &mut record.tuition_text),
        ];
        for (hint, slot) in pairs {
            if let Some(value) = hint {
                *slot = value.clone();
            }
        }
    }
}

/// A located listing block: its text fragments in document order plus its detail link
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CandidateCard {
    pub fragments: Vec<String>,
    /// Absolute detail URL or the "unknown" sentinel
    pub anchor_url: String,
    #[serde(default, skip_serializing_if = "FieldHints::is_empty")]
    pub hints: FieldHints,
}

impl CandidateCard {
    pub fn new(fragments: Vec<String>, anchor_url: String) -> Self {
        Self {
            fragments,
            anchor_url,
            hints: FieldHints::default(),
        }
    }

    pub fn with_hints(mut self, hints: FieldHints) -> Self {
        self.hints = hints;
        self
    }

    /// All fragments joined with single spaces
    pub fn text(&self) -> String {
        self.fragments.join(" ")
    }

    /// Character count of the joined text
    pub fn text_len(&self) -> usize {
        self.text().chars().count()
    }
}
