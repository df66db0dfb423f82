// * Extraction strategy cascade
// * Four ordered ways of turning a listing page into candidate cards, most precise first.

use scraper::{ElementRef, Html, Selector};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::sync::LazyLock;
use thiserror::Error;
use tracing::debug;

use crate::config::constants::{MIN_CARD_FRAGMENTS, UNKNOWN};
use crate::config::site::{compile_selector, ConfigError, FieldSelectors, SiteConfig};
use crate::engine::normalization::resolve_href;
use crate::persistence::schema::{CandidateCard, FieldHints, ProgramRecord};
use crate::refinery::card_locator::CardLocator;
use crate::refinery::classifier::{classify, contains_field_label};
use crate::refinery::fragments::{collect_fragments, visible_text};
use crate::refinery::observer::CardObserver;

static SELECTOR_ANCHOR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("a[href]").unwrap());
static SELECTOR_CLASSED: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("[class]").unwrap());

// * Class-name substrings that usually mark a listing card
const STRUCTURAL_KEYWORDS: &[&str] = &["card", "result", "program", "item"];

/// Per-card failure: counted and skipped, never fatal to the page
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CardError {
    #[error("Detail href cannot be resolved to an absolute URL: {0}")]
    UnresolvableHref(String),
}

/// The four cascade variants, in the order they are tried
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StrategyKind {
    /// S1: site-specific stable selector
    StableAttribute,
    /// S2: class-name substring heuristic
    Structural,
    /// S3: detail-page anchors + completeness locator
    AnchorDriven,
    /// S4: detail-page anchors + label locator, label required
    LabelPresence,
}

impl StrategyKind {
    pub const CASCADE: [StrategyKind; 4] = [
        StrategyKind::StableAttribute,
        StrategyKind::Structural,
        StrategyKind::AnchorDriven,
        StrategyKind::LabelPresence,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            StrategyKind::StableAttribute => "stable-attribute",
            StrategyKind::Structural => "structural",
            StrategyKind::AnchorDriven => "anchor-driven",
            StrategyKind::LabelPresence => "label-presence",
        }
    }

    /// Finds candidate cards on the page
    pub fn discover(
        &self,
        document: &Html,
        ctx: &StrategyContext<'_>,
    ) -> Vec<Result<CandidateCard, CardError>> {
        match self {
            StrategyKind::StableAttribute => match ctx.stable_selector {
                Some(selector) => document
                    .select(selector)
                    .map(|element| element_card(element, ctx))
                    .collect(),
                None => Vec::new(),
            },
            StrategyKind::Structural => discover_structural(document, ctx.site),
            StrategyKind::AnchorDriven => {
                discover_by_anchor(document, ctx.site, CardLocator::completeness())
            }
            StrategyKind::LabelPresence => {
                discover_by_anchor(document, ctx.site, CardLocator::label_presence())
            }
        }
    }

    /// Classifies a card; None means the card was rejected
    pub fn to_record(&self, card: &CandidateCard, site: &SiteConfig) -> Option<ProgramRecord> {
        if *self == StrategyKind::LabelPresence && !contains_field_label(&card.fragments) {
            return None;
        }

        let source = format!("{}:{}", site.label, self.as_str());
        let mut record = classify(&card.fragments, &card.anchor_url, &source);
        card.hints.apply_to(&mut record);

        record.is_resolved().then_some(record)
    }

    /// Runs discovery and classification for one page
    pub fn run(
        &self,
        document: &Html,
        ctx: &StrategyContext<'_>,
        observer: Option<&dyn CardObserver>,
    ) -> StrategyOutcome {
        let mut outcome = StrategyOutcome::default();

        for candidate in self.discover(document, ctx) {
            outcome.cards_seen += 1;

            let card = match candidate {
                Ok(card) => card,
                Err(e) => {
                    debug!(strategy = %self, error = %e, "Card skipped");
                    outcome.card_failures += 1;
                    continue;
                }
            };

            if let Some(observer) = observer {
                observer.on_card(*self, &card);
            }

            match self.to_record(&card, ctx.site) {
                Some(record) => outcome.records.push(record),
                None => outcome.cards_rejected += 1,
            }
        }

        outcome
    }
}

impl fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Read-only inputs shared by all strategies for one page
pub struct StrategyContext<'a> {
    pub site: &'a SiteConfig,
    pub stable_selector: Option<&'a Selector>,
    pub field_selectors: &'a CompiledFieldSelectors,
}

/// A site's field selectors, compiled once per pipeline
#[derive(Debug, Default)]
pub struct CompiledFieldSelectors {
    title: Option<Selector>,
    institution: Option<Selector>,
    location: Option<Selector>,
    tuition: Option<Selector>,
}

impl CompiledFieldSelectors {
    pub fn compile(selectors: &FieldSelectors) -> Result<Self, ConfigError> {
        let compile =
            |selector: &Option<String>| selector.as_deref().map(compile_selector).transpose();

        Ok(Self {
            title: compile(&selectors.title)?,
            institution: compile(&selectors.institution)?,
            location: compile(&selectors.location)?,
            tuition: compile(&selectors.tuition)?,
        })
    }

    /// Visible text of the first match of each selector inside `card`
    pub fn read(&self, card: ElementRef<'_>) -> FieldHints {
        let read = |selector: &Option<Selector>| {
            let element = card.select(selector.as_ref()?).next()?;
            let text = visible_text(element);
            (!text.is_empty()).then_some(text)
        };

        FieldHints {
            title: read(&self.title),
            institution: read(&self.institution),
            location: read(&self.location),
            tuition_text: read(&self.tuition),
        }
    }
}

/// Records and card counters from one strategy run
#[derive(Debug, Clone, Default)]
pub struct StrategyOutcome {
    pub records: Vec<ProgramRecord>,
    pub cards_seen: usize,
    pub cards_rejected: usize,
    pub card_failures: usize,
}

// * S1 cards: the selected element is the card, field selectors read first
fn element_card(
    element: ElementRef<'_>,
    ctx: &StrategyContext<'_>,
) -> Result<CandidateCard, CardError> {
    let href = detail_links(element, ctx.site).into_iter().next();
    let anchor_url = card_url(href, ctx.site)?;

    Ok(CandidateCard::new(collect_fragments(element), anchor_url)
        .with_hints(ctx.field_selectors.read(element)))
}

fn has_structural_class(element: ElementRef<'_>) -> bool {
    element.value().attr("class").is_some_and(|class| {
        let class = class.to_lowercase();
        STRUCTURAL_KEYWORDS.iter().any(|keyword| class.contains(keyword))
    })
}

// * S2 cards: outermost classed elements holding exactly one detail link
fn discover_structural(
    document: &Html,
    site: &SiteConfig,
) -> Vec<Result<CandidateCard, CardError>> {
    let mut accepted = Vec::new();
    let mut cards = Vec::new();

    for element in document.select(&SELECTOR_CLASSED) {
        if !has_structural_class(element) {
            continue;
        }

        // * Inner blocks of an accepted card belong to that card
        if element.ancestors().any(|ancestor| accepted.contains(&ancestor.id())) {
            continue;
        }

        let fragments = collect_fragments(element);
        if fragments.len() < MIN_CARD_FRAGMENTS {
            continue;
        }

        // * No detail link is page chrome; several means a list container
        let links = detail_links(element, site);
        let [href] = links.as_slice() else {
            continue;
        };

        accepted.push(element.id());
        cards.push(card_url(Some(*href), site).map(|url| CandidateCard::new(fragments, url)));
    }

    cards
}

// * S3/S4 cards: one per detail anchor, located by walking its ancestors
fn discover_by_anchor(
    document: &Html,
    site: &SiteConfig,
    locator: CardLocator,
) -> Vec<Result<CandidateCard, CardError>> {
    document
        .select(&SELECTOR_ANCHOR)
        .filter_map(|anchor| {
            let href = anchor.value().attr("href")?;
            if !href.contains(&site.detail_path) {
                return None;
            }

            match resolve_href(href, &site.base_origin) {
                Some(url) => locator.locate(anchor, &url).map(Ok),
                None => Some(Err(CardError::UnresolvableHref(href.to_string()))),
            }
        })
        .collect()
}

// * Distinct detail-page hrefs under `element`, in document order
fn detail_links<'a>(element: ElementRef<'a>, site: &SiteConfig) -> Vec<&'a str> {
    let mut seen = HashSet::new();

    element
        .select(&SELECTOR_ANCHOR)
        .filter_map(|anchor| anchor.value().attr("href"))
        .filter(|href| href.contains(&site.detail_path))
        .filter(|href| {
            seen.insert(resolve_href(href, &site.base_origin).unwrap_or_else(|| href.to_string()))
        })
        .collect()
}

fn card_url(href: Option<&str>, site: &SiteConfig) -> Result<String, CardError> {
    match href {
        None => Ok(UNKNOWN.to_string()),
        Some(href) => resolve_href(href, &site.base_origin)
            .ok_or_else(|| CardError::UnresolvableHref(href.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn site() -> SiteConfig {
        SiteConfig::new("demo", "https://example.com", "/programs/")
    }

    static NO_FIELDS: LazyLock<CompiledFieldSelectors> =
        LazyLock::new(CompiledFieldSelectors::default);

    fn ctx<'a>(site: &'a SiteConfig, selector: Option<&'a Selector>) -> StrategyContext<'a> {
        StrategyContext {
            site,
            stable_selector: selector,
            field_selectors: &NO_FIELDS,
        }
    }

    #[test]
    fn test_stable_attribute_without_selector_finds_nothing() {
        let site = site();
        let doc = Html::parse_document(r#"<div class="card"><a href="/programs/1">x</a></div>"#);
        assert!(StrategyKind::StableAttribute.discover(&doc, &ctx(&site, None)).is_empty());
    }

    #[test]
    fn test_stable_attribute_prefers_detail_link() {
        let site = site();
        let selector = Selector::parse("[data-testid='result']").unwrap();
        let doc = Html::parse_document(
            r#"<div data-testid="result">
                 <a href="/schools/9">Harbor University</a>
                 <a href="/programs/42">Master of Finance</a>
               </div>"#,
        );

        let cards = StrategyKind::StableAttribute.discover(&doc, &ctx(&site, Some(&selector)));
        assert_eq!(cards.len(), 1);
        assert_eq!(
            cards[0].as_ref().unwrap().anchor_url,
            "https://example.com/programs/42"
        );
    }

    #[test]
    fn test_structural_requires_three_fragments() {
        let site = site();
        let doc = Html::parse_document(
            r#"<div class="program-item"><span>Master of Law</span><span>Hill College</span></div>"#,
        );
        assert!(StrategyKind::Structural.discover(&doc, &ctx(&site, None)).is_empty());
    }

    #[test]
    fn test_structural_skips_list_containers() {
        let site = site();
        let doc = Html::parse_document(
            r#"<ul class="results">
                 <li class="result-card"><a href="/programs/1">Master of Law</a><span>Hill College</span><span>Boston, MA</span></li>
                 <li class="result-card"><a href="/programs/2">Bachelor of Art</a><span>Dale University</span><span>Austin, TX</span></li>
               </ul>"#,
        );

        let cards = StrategyKind::Structural.discover(&doc, &ctx(&site, None));
        assert_eq!(cards.len(), 2);
    }

    #[test]
    fn test_structural_ignores_classed_chrome_without_detail_link() {
        let site = site();
        let doc = Html::parse_document(
            r#"<ul class="nav">
                 <li class="nav-item"><a href="/">Home</a> <span>Riverside University</span> <a href="/about">About us</a></li>
               </ul>"#,
        );

        assert!(StrategyKind::Structural.discover(&doc, &ctx(&site, None)).is_empty());
    }

    #[test]
    fn test_structural_keeps_outermost_card() {
        let site = site();
        let doc = Html::parse_document(
            r#"<div class="program-card">
                 <div class="card-body">
                   <h3>Master of Finance</h3>
                   <span>Harbor University</span>
                   <span>Boston, MA</span>
                 </div>
                 <a href="/programs/9">Details</a>
               </div>"#,
        );

        let cards = StrategyKind::Structural.discover(&doc, &ctx(&site, None));
        assert_eq!(cards.len(), 1);
        assert_eq!(
            cards[0].as_ref().unwrap().anchor_url,
            "https://example.com/programs/9"
        );
    }

    #[test]
    fn test_stable_attribute_reads_field_selectors() {
        let site = site().with_field_selectors(FieldSelectors::new(".name", ".provider", ".town"));
        let fields = CompiledFieldSelectors::compile(&site.field_selectors).unwrap();
        let selector = Selector::parse("article").unwrap();
        let doc = Html::parse_document(
            r#"<article>
                 <a class="name" href="/programs/3">Marine Biology</a>
                 <span class="provider">Northwind</span>
                 <span class="town">Galway</span>
               </article>"#,
        );
        let ctx = StrategyContext {
            site: &site,
            stable_selector: Some(&selector),
            field_selectors: &fields,
        };

        let outcome = StrategyKind::StableAttribute.run(&doc, &ctx, None);
        assert_eq!(outcome.records.len(), 1);
        let record = &outcome.records[0];
        assert_eq!(record.title, "Marine Biology");
        assert_eq!(record.institution, "Northwind");
        assert_eq!(record.location, "Galway");
        assert_eq!(record.tuition_text, UNKNOWN);
        assert_eq!(record.detail_url, "https://example.com/programs/3");
    }

    #[test]
    fn test_unresolvable_href_is_a_card_failure() {
        let site = SiteConfig::new("demo", "https://example.com", "programs");
        let doc = Html::parse_document(
            r#"<div><a href="http://[programs">Bachelor of Arts</a><span>Lake College</span></div>"#,
        );

        let outcome = StrategyKind::AnchorDriven.run(&doc, &ctx(&site, None), None);
        assert_eq!(outcome.card_failures, 1);
        assert!(outcome.records.is_empty());
    }

    #[test]
    fn test_label_presence_rejects_unlabelled_cards() {
        let site = site();
        let card = CandidateCard::new(
            vec!["Bachelor of Arts".to_string(), "Lake College".to_string()],
            "https://example.com/programs/1".to_string(),
        );

        assert!(StrategyKind::AnchorDriven.to_record(&card, &site).is_some());
        assert!(StrategyKind::LabelPresence.to_record(&card, &site).is_none());
    }

    #[test]
    fn test_source_site_tag() {
        let site = site();
        let card = CandidateCard::new(
            vec!["Lake College".to_string()],
            "https://example.com/programs/1".to_string(),
        );
        let record = StrategyKind::Structural.to_record(&card, &site).unwrap();
        assert_eq!(record.source_site, "demo:structural");
    }

    #[test]
    fn test_cascade_order() {
        let names: Vec<_> = StrategyKind::CASCADE.iter().map(|k| k.as_str()).collect();
        assert_eq!(
            names,
            vec!["stable-attribute", "structural", "anchor-driven", "label-presence"]
        );
    }
}
