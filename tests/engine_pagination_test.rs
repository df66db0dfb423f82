use std::collections::HashMap;
use std::time::Duration;

use program_harvest::config::{PageScheme, SiteConfig};
use program_harvest::engine::pagination::{HarvestRun, PageOutcome, PageSource};
use program_harvest::engine::slow_path::SlowPathError;
use program_harvest::refinery::{ExtractionPipeline, StrategyKind};

// * Test Suite for multi-page runs against canned rendered pages

const START: &str = "https://example.com/list";

/// Serves canned HTML by URL; anything missing times out
#[derive(Default)]
struct FixtureSource {
    pages: HashMap<String, String>,
    requested: Vec<(String, Option<String>)>,
}

impl FixtureSource {
    fn with_page(mut self, url: &str, html: String) -> Self {
        self.pages.insert(url.to_string(), html);
        self
    }
}

impl PageSource for FixtureSource {
    async fn fetch_rendered(
        &mut self,
        url: &str,
        ready_selector: Option<&str>,
    ) -> Result<String, SlowPathError> {
        self.requested
            .push((url.to_string(), ready_selector.map(str::to_string)));
        self.pages
            .get(url)
            .cloned()
            .ok_or(SlowPathError::Timeout(10))
    }
}

fn listing(cards: &[(&str, &str, &str)]) -> String {
    let body: String = cards
        .iter()
        .map(|(id, title, institution)| {
            format!(
                r#"<div><a href="/programs/{}">{}</a><span>{}</span><span>Austin, TX</span></div>"#,
                id, title, institution
            )
        })
        .collect();
    format!("<html><body><main>{}</main></body></html>", body)
}

fn paged_site() -> SiteConfig {
    SiteConfig::new("demo", "https://example.com", "/programs/")
        .with_ready_selector("a[href*='/programs/']")
        .with_page_scheme(PageScheme::QueryParam {
            name: "page".to_string(),
        })
}

fn run(pages: usize) -> HarvestRun {
    HarvestRun::new(pages).with_page_delay(Duration::ZERO)
}

#[tokio::test]
async fn test_records_merge_across_pages() {
    let mut source = FixtureSource::default()
        .with_page(
            "https://example.com/list?page=1",
            listing(&[("1", "Master of Law", "Hill College"), ("2", "Bachelor of Arts", "Lake College")]),
        )
        .with_page(
            "https://example.com/list?page=2",
            listing(&[("2", "Bachelor of Arts", "Lake College"), ("3", "Diploma in Design", "Dale Institute")]),
        );
    let pipeline = ExtractionPipeline::new(paged_site()).unwrap();

    let report = run(2).execute(&mut source, &pipeline, START).await.unwrap();

    let urls: Vec<_> = report.records.iter().map(|r| r.detail_url.as_str()).collect();
    assert_eq!(
        urls,
        vec![
            "https://example.com/programs/1",
            "https://example.com/programs/2",
            "https://example.com/programs/3",
        ]
    );
    assert_eq!(
        report.pages[1].outcome,
        PageOutcome::Extracted {
            strategy: StrategyKind::AnchorDriven,
            raw: 2,
            kept: 1,
        }
    );
    assert_eq!(
        source.requested[0].1.as_deref(),
        Some("a[href*='/programs/']")
    );
}

#[tokio::test]
async fn test_failed_page_does_not_abort_run() {
    let mut source = FixtureSource::default().with_page(
        "https://example.com/list?page=2",
        listing(&[("9", "Master of Finance", "Harbor University")]),
    );
    let pipeline = ExtractionPipeline::new(paged_site()).unwrap();

    let report = run(2).execute(&mut source, &pipeline, START).await.unwrap();

    assert!(matches!(report.pages[0].outcome, PageOutcome::FetchFailed(_)));
    assert_eq!(report.records.len(), 1);
    assert_eq!(report.pages_with_records(), 1);
}

#[tokio::test]
async fn test_malformed_page_contributes_nothing() {
    let mut source = FixtureSource::default()
        .with_page("https://example.com/list?page=1", "   ".to_string())
        .with_page(
            "https://example.com/list?page=2",
            listing(&[("9", "Master of Finance", "Harbor University")]),
        );
    let pipeline = ExtractionPipeline::new(paged_site()).unwrap();

    let report = run(2).execute(&mut source, &pipeline, START).await.unwrap();

    assert!(matches!(report.pages[0].outcome, PageOutcome::Malformed(_)));
    assert_eq!(report.records.len(), 1);
}

#[tokio::test]
async fn test_stop_on_empty_ends_run() {
    let mut source = FixtureSource::default()
        .with_page(
            "https://example.com/list?page=1",
            "<html><body><p>No results</p></body></html>".to_string(),
        )
        .with_page(
            "https://example.com/list?page=2",
            listing(&[("9", "Master of Finance", "Harbor University")]),
        );
    let pipeline = ExtractionPipeline::new(paged_site()).unwrap();

    let report = run(3)
        .with_stop_on_empty(true)
        .execute(&mut source, &pipeline, START)
        .await
        .unwrap();

    assert_eq!(report.pages.len(), 1);
    assert_eq!(report.pages[0].outcome, PageOutcome::Exhausted);
    assert!(report.records.is_empty());
}

#[tokio::test]
async fn test_single_page_site_visits_once() {
    let site = SiteConfig::new("demo", "https://example.com", "/programs/");
    let mut source = FixtureSource::default().with_page(
        START,
        listing(&[("1", "Master of Law", "Hill College")]),
    );
    let pipeline = ExtractionPipeline::new(site).unwrap();

    let report = run(5).execute(&mut source, &pipeline, START).await.unwrap();

    assert_eq!(source.requested.len(), 1);
    assert_eq!(report.records.len(), 1);
}

#[tokio::test]
async fn test_dump_dir_receives_rendered_pages() {
    let dir = tempfile::tempdir().unwrap();
    let html = listing(&[("1", "Master of Law", "Hill College")]);
    let mut source = FixtureSource::default().with_page("https://example.com/list?page=1", html.clone());
    let pipeline = ExtractionPipeline::new(paged_site()).unwrap();

    run(1)
        .with_dump_dir(dir.path())
        .execute(&mut source, &pipeline, START)
        .await
        .unwrap();

    let dumped = std::fs::read_to_string(dir.path().join("demo_page_1.html")).unwrap();
    assert_eq!(dumped, html);
}
