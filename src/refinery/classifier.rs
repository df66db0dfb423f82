// * FieldClassifier: assigns loose card text to semantic fields
// * Stateless, order-sensitive, first assignment wins. Pattern order below is the precedence order.

use regex::Regex;
use std::sync::LazyLock;

use crate::config::constants::UNKNOWN;
use crate::persistence::schema::ProgramRecord;
use crate::refinery::fragments::clean_fragment;

// * Degree-type vocabulary (title pattern)
static PATTERN_TITLE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"\b(?:Bachelor(?:'?s)?|Master(?:'?s)?|Associate of|Associate Degree|Diploma|Certificate|PhD|Ph\.D|Doctorate|Doctor of|MBA|BSc|MSc|BEng|MEng|LLB|LLM)\b",
    )
    .expect("Invalid title regex")
});

// * Institution vocabulary
static PATTERN_INSTITUTION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"\b(?:University|College|Institute|School|Academy|Polytechnic|Conservatory|Université|Universidad|Universität|Hochschule)\b",
    )
    .expect("Invalid institution regex")
});

// * Country / region markers, full US state names and a few listing-heavy cities
static PATTERN_REGION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"\b(?:USA|U\.S\.A|United States|Canada|United Kingdom|UK|England|Scotland|Wales|Ireland|Germany|France|Netherlands|Spain|Italy|Sweden|Switzerland|Austria|Australia|New Zealand|Singapore|Alabama|Alaska|Arizona|Arkansas|California|Colorado|Connecticut|Delaware|Florida|Georgia|Hawaii|Idaho|Illinois|Indiana|Iowa|Kansas|Kentucky|Louisiana|Maine|Maryland|Massachusetts|Michigan|Minnesota|Mississippi|Missouri|Montana|Nebraska|Nevada|New Hampshire|New Jersey|New Mexico|New York|North Carolina|North Dakota|Ohio|Oklahoma|Oregon|Pennsylvania|Rhode Island|South Carolina|South Dakota|Tennessee|Texas|Utah|Vermont|Virginia|Washington|West Virginia|Wisconsin|Wyoming|Ontario|British Columbia|Quebec|Alberta|Toronto|Vancouver|Montreal|London|Berlin|Munich|Sydney|Melbourne|Chicago|Boston|Los Angeles|San Francisco)\b",
    )
    .expect("Invalid region regex")
});

// * Two-letter US state code, either after a comma or as the whole fragment
static PATTERN_STATE_CODE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?:^|,\s*)(?:AL|AK|AZ|AR|CA|CO|CT|DE|DC|FL|GA|HI|ID|IL|IN|IA|KS|KY|LA|ME|MD|MA|MI|MN|MS|MO|MT|NE|NV|NH|NJ|NM|NY|NC|ND|OH|OK|OR|PA|RI|SC|SD|TN|TX|UT|VT|VA|WA|WV|WI|WY)(?:$|[\s,])",
    )
    .expect("Invalid state code regex")
});

static PATTERN_CURRENCY_SYMBOL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[$€£¥₹]").expect("Invalid currency symbol regex"));

static PATTERN_CURRENCY_CODE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b(?:USD|CAD|EUR|GBP|AUD|NZD|CHF|SGD|INR|JPY)\b")
        .expect("Invalid currency code regex")
});

// * Fee text that is not tuition
static PATTERN_FEE_DISQUALIFIER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(?:application|deposit)").expect("Invalid fee disqualifier regex")
});

/// Semantic field a fragment can be assigned to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    Title,
    Institution,
    Location,
    Tuition,
}

/// What a recognized UI label does to the fragment right after it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LabelTarget {
    /// Next fragment belongs to this field
    Field(Field),
    /// Next fragment is discarded (fees that are not tuition)
    Suppress,
    /// Pure chrome: no effect on the next fragment
    Chrome,
}

// * Known UI labels, compared case-insensitively without a trailing colon
const LABELS: &[(&str, LabelTarget)] = &[
    ("location", LabelTarget::Field(Field::Location)),
    ("campus", LabelTarget::Field(Field::Location)),
    ("city", LabelTarget::Field(Field::Location)),
    ("tuition", LabelTarget::Field(Field::Tuition)),
    ("tuition (1st year)", LabelTarget::Field(Field::Tuition)),
    ("tuition fee", LabelTarget::Field(Field::Tuition)),
    ("tuition fees", LabelTarget::Field(Field::Tuition)),
    ("fees", LabelTarget::Field(Field::Tuition)),
    ("institution", LabelTarget::Field(Field::Institution)),
    ("provider", LabelTarget::Field(Field::Institution)),
    ("program", LabelTarget::Field(Field::Title)),
    ("programme", LabelTarget::Field(Field::Title)),
    ("application fee", LabelTarget::Suppress),
    ("deposit", LabelTarget::Suppress),
    ("high job demand", LabelTarget::Chrome),
    ("fast acceptance", LabelTarget::Chrome),
    ("popular", LabelTarget::Chrome),
    ("prime", LabelTarget::Chrome),
    ("incentives available", LabelTarget::Chrome),
    ("scholarships available", LabelTarget::Chrome),
    ("duration", LabelTarget::Chrome),
    ("deadline", LabelTarget::Chrome),
    ("start date", LabelTarget::Chrome),
    ("view program", LabelTarget::Chrome),
    ("view details", LabelTarget::Chrome),
    ("compare", LabelTarget::Chrome),
    ("save", LabelTarget::Chrome),
];

/// Looks up a fragment in the UI label table
pub fn label_target(fragment: &str) -> Option<LabelTarget> {
    let key = fragment.trim().trim_end_matches(':').trim().to_lowercase();
    LABELS
        .iter()
        .find(|(label, _)| *label == key)
        .map(|(_, target)| *target)
}

/// Field a fragment labels, when the whole fragment is a field label
pub fn field_label(fragment: &str) -> Option<Field> {
    match label_target(fragment)? {
        LabelTarget::Field(field) => Some(field),
        LabelTarget::Suppress | LabelTarget::Chrome => None,
    }
}

/// True when one of the fragments is a label that anchors a field (e.g. "Tuition", "Location")
pub fn contains_field_label<S: AsRef<str>>(fragments: &[S]) -> bool {
    fragments.iter().any(|f| field_label(f.as_ref()).is_some())
}

pub fn matches_title(text: &str) -> bool {
    PATTERN_TITLE.is_match(text)
}

pub fn matches_institution(text: &str) -> bool {
    PATTERN_INSTITUTION.is_match(text) && !matches_title(text)
}

pub fn has_currency_marker(text: &str) -> bool {
    PATTERN_CURRENCY_SYMBOL.is_match(text) || PATTERN_CURRENCY_CODE.is_match(text)
}

pub fn matches_location(text: &str) -> bool {
    (PATTERN_REGION.is_match(text) || PATTERN_STATE_CODE.is_match(text))
        && !has_currency_marker(text)
}

pub fn matches_tuition(text: &str) -> bool {
    PATTERN_CURRENCY_SYMBOL.is_match(text)
        && PATTERN_CURRENCY_CODE.is_match(text)
        && !PATTERN_FEE_DISQUALIFIER.is_match(text)
}

/// First content pattern a fragment matches, in precedence order
pub fn pattern_field(fragment: &str) -> Option<Field> {
    if matches_title(fragment) {
        Some(Field::Title)
    } else if matches_institution(fragment) {
        Some(Field::Institution)
    } else if matches_location(fragment) {
        Some(Field::Location)
    } else if matches_tuition(fragment) {
        Some(Field::Tuition)
    } else {
        None
    }
}

/// Distinct fields whose markers (label fragments or content patterns) appear in `fragments`
pub fn field_markers<S: AsRef<str>>(fragments: &[S]) -> usize {
    let mut present = [false; 4];

    for fragment in fragments {
        let fragment = fragment.as_ref();
        if let Some(field) = field_label(fragment) {
            present[field as usize] = true;
            continue;
        }

        present[Field::Title as usize] |= matches_title(fragment);
        present[Field::Institution as usize] |= PATTERN_INSTITUTION.is_match(fragment);
        present[Field::Location as usize] |=
            PATTERN_REGION.is_match(fragment) || PATTERN_STATE_CODE.is_match(fragment);
        present[Field::Tuition as usize] |= PATTERN_CURRENCY_SYMBOL.is_match(fragment);
    }

    present.iter().filter(|p| **p).count()
}

/// Classifies ordered card fragments into a ProgramRecord.
///
/// Fields that nothing matched keep the "unknown" sentinel; callers decide
/// whether the record is worth emitting (see [`ProgramRecord::is_resolved`]).
pub fn classify<S: AsRef<str>>(
    fragments: &[S],
    anchor_url: &str,
    source_site: &str,
) -> ProgramRecord {
    let mut record = ProgramRecord::unknown(anchor_url, source_site);
    let mut pending: Option<LabelTarget> = None;

    for raw in fragments {
        let Some(fragment) = clean_fragment(raw.as_ref()) else {
            continue;
        };

        // * Step 1: Labels are never values, only positional anchors
        if let Some(target) = label_target(&fragment) {
            pending = Some(target);
            continue;
        }

        // * Step 2: Fragment right after a label goes to that label's field
        match pending.take() {
            Some(LabelTarget::Field(field)) => {
                assign(&mut record, field, fragment);
                continue;
            }
            Some(LabelTarget::Suppress) => continue,
            Some(LabelTarget::Chrome) | None => {}
        }

        // * Step 3: Content patterns, first match wins for this fragment
        if let Some(field) = pattern_field(&fragment) {
            assign(&mut record, field, fragment);
        }
    }

    record
}

// * Sets a field only if it is still unknown
fn assign(record: &mut ProgramRecord, field: Field, value: String) {
    let slot = match field {
        Field::Title => &mut record.title,
        Field::Institution => &mut record.institution,
        Field::Location => &mut record.location,
        Field::Tuition => &mut record.tuition_text,
    };

    if slot == UNKNOWN {
        *slot = value;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const URL: &str = "https://example.com/programs/1";

    #[test]
    fn test_first_title_wins() {
        let record = classify(&["Bachelor of Science", "Bachelor of Arts"], URL, "t");
        assert_eq!(record.title, "Bachelor of Science");
    }

    #[test]
    fn test_label_anchored_fields() {
        let record = classify(
            &["Location", "Austin, TX", "Tuition (1st year)", "$20,000 USD"],
            URL,
            "t",
        );
        assert_eq!(record.location, "Austin, TX");
        assert_eq!(record.tuition_text, "$20,000 USD");
    }

    #[test]
    fn test_label_overrides_pattern() {
        // * "Northern Campus" matches nothing, but the label claims it
        let record = classify(&["Campus:", "Northern Campus"], URL, "t");
        assert_eq!(record.location, "Northern Campus");
    }

    #[test]
    fn test_institution_excludes_title_matches() {
        let record = classify(&["Diploma in Business, Lakeside College"], URL, "t");
        assert_eq!(record.title, "Diploma in Business, Lakeside College");
        assert_eq!(record.institution, UNKNOWN);
    }

    #[test]
    fn test_location_rejects_currency() {
        let record = classify(&["$12,000 USD per year in USA"], URL, "t");
        assert_eq!(record.location, UNKNOWN);
        assert_eq!(record.tuition_text, "$12,000 USD per year in USA");
    }

    #[test]
    fn test_application_fee_is_not_tuition() {
        let record = classify(&["$100 USD application fee", "$31,000 USD"], URL, "t");
        assert_eq!(record.tuition_text, "$31,000 USD");
    }

    #[test]
    fn test_suppress_label_discards_next_fragment() {
        let record = classify(&["Application fee", "$75 USD", "$9,800 USD"], URL, "t");
        assert_eq!(record.tuition_text, "$9,800 USD");
    }

    #[test]
    fn test_tuition_needs_symbol_and_code() {
        let record = classify(&["$18,500", "18,500 USD"], URL, "t");
        assert_eq!(record.tuition_text, UNKNOWN);
    }

    #[test]
    fn test_state_code_location() {
        assert!(matches_location("Springfield, IL"));
        assert!(matches_location("TX"));
        assert!(!matches_location("INTERNATIONAL STUDENTS"));
    }

    #[test]
    fn test_chrome_labels_never_assigned() {
        let record = classify(&["High Job Demand", "Popular"], URL, "t");
        assert!(!record.is_resolved());
        assert_eq!(record.location, UNKNOWN);
    }

    #[test]
    fn test_label_for_already_set_field_discards_value() {
        let record = classify(
            &["Boston, MA, USA", "Location", "Somewhere Else"],
            URL,
            "t",
        );
        assert_eq!(record.location, "Boston, MA, USA");
    }

    #[test]
    fn test_affordance_stripped_from_values() {
        let record = classify(&["Harbor University (opens in new tab)"], URL, "t");
        assert_eq!(record.institution, "Harbor University");
    }

    #[test]
    fn test_unmatched_fragments_discarded() {
        let record = classify(&["4 years", "Full time", "Apply now"], URL, "t");
        assert!(!record.is_resolved());
        assert_eq!(record.tuition_text, UNKNOWN);
    }

    #[test]
    fn test_field_markers_counts_distinct_fields() {
        assert_eq!(
            field_markers(&["Tuition", "$18,500 USD", "Location", "Springfield, IL"]),
            2
        );
        assert_eq!(field_markers(&["Bachelor of Arts", "Lake University"]), 2);
        assert_eq!(field_markers(&["Apply now"]), 0);
    }

    #[test]
    fn test_prose_words_are_not_markers() {
        let fragments = ["View program", "Fees and city campus life explained"];
        assert_eq!(field_markers(&fragments), 0);
        assert!(!contains_field_label(&fragments));
    }

    #[test]
    fn test_field_label_needs_whole_fragment() {
        assert!(contains_field_label(&["Tuition (1st year)", "$1 USD"]));
        assert!(contains_field_label(&["Location:", "Austin"]));
        assert!(!contains_field_label(&["Relocation assistance"]));
        assert!(!contains_field_label(&["View program"]));
        assert_eq!(field_label("Campus"), Some(Field::Location));
        assert_eq!(field_label("Deposit"), None);
    }
}
