// * PaginationDriver
// * Builds each listing page URL, asks a PageSource for rendered HTML, runs the pipeline
// * once per page and merges everything through one run-scoped Deduplicator.

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, warn};
use url::Url;

use crate::config::constants::{DEFAULT_MAX_PAGES, DEFAULT_PAGE_DELAY_MS};
use crate::config::site::PageScheme;
use crate::engine::slow_path::SlowPathError;
use crate::ops::telemetry;
use crate::persistence::dedup::Deduplicator;
use crate::persistence::schema::ProgramRecord;
use crate::refinery::{ExtractError, ExtractionPipeline, StrategyKind};

#[derive(Debug, Error)]
pub enum PaginationError {
    #[error("Invalid listing URL: {0}")]
    InvalidUrl(String),
}

/// Anything that can hand back fully rendered HTML for a URL
#[allow(async_fn_in_trait)]
pub trait PageSource {
    async fn fetch_rendered(
        &mut self,
        url: &str,
        ready_selector: Option<&str>,
    ) -> Result<String, SlowPathError>;
}

/// Builds the URL of 1-based page `page` from the first listing URL
pub fn page_url(
    start_url: &str,
    scheme: &PageScheme,
    page: usize,
) -> Result<String, PaginationError> {
    let mut url =
        Url::parse(start_url).map_err(|_| PaginationError::InvalidUrl(start_url.to_string()))?;

    match scheme {
        PageScheme::Single => {}
        PageScheme::QueryParam { name } => set_query_param(&mut url, name, page),
        PageScheme::PathSuffix { template } => {
            let segment = template.replace("{n}", &page.to_string());
            let prefix = template.split("{n}").next().unwrap_or_default();

            let mut segments: Vec<String> = url
                .path_segments()
                .map(|parts| parts.filter(|p| !p.is_empty()).map(str::to_string).collect())
                .unwrap_or_default();

            // * Replace an existing page segment instead of stacking a second one
            let replace_last = !prefix.is_empty()
                && segments.last().is_some_and(|last| {
                    last.starts_with(prefix)
                        && last[prefix.len()..].chars().all(|c| c.is_ascii_digit())
                });
            if replace_last {
                segments.pop();
            }
            segments.push(segment);

            url.set_path(&format!("/{}", segments.join("/")));
        }
        PageScheme::FragmentParam { name, prefix } => match url.fragment().map(str::to_string) {
            Some(fragment) if fragment.starts_with(prefix.as_str()) => {
                let rebuilt = rewrite_fragment(&fragment[prefix.len()..], name, page);
                url.set_fragment(Some(&format!("{}{}", prefix, rebuilt)));
            }
            // * No search fragment: fall back to a query parameter
            _ => set_query_param(&mut url, name, page),
        },
    }

    Ok(url.to_string())
}

fn set_query_param(url: &mut Url, name: &str, page: usize) {
    let kept: Vec<(String, String)> = url
        .query_pairs()
        .filter(|(k, _)| k != name)
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();

    let mut serializer = url.query_pairs_mut();
    serializer.clear();
    for (k, v) in &kept {
        serializer.append_pair(k, v);
    }
    serializer.append_pair(name, &page.to_string());
}

// * `a=1&pageNo=2&b=3` -> page param replaced in place (or appended), order otherwise kept
fn rewrite_fragment(query: &str, name: &str, page: usize) -> String {
    let mut replaced = false;
    let mut parts: Vec<String> = query
        .split('&')
        .filter(|part| !part.is_empty())
        .map(|part| {
            let key = part.split('=').next().unwrap_or_default();
            if key == name {
                replaced = true;
                format!("{}={}", name, page)
            } else {
                part.to_string()
            }
        })
        .collect();

    if !replaced {
        parts.push(format!("{}={}", name, page));
    }
    parts.join("&")
}

/// What happened to one listing page
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageOutcome {
    Extracted {
        strategy: StrategyKind,
        raw: usize,
        kept: usize,
    },
    /// Every strategy yielded nothing
    Exhausted,
    Malformed(String),
    FetchFailed(String),
}

impl PageOutcome {
    fn metric_label(&self) -> &'static str {
        match self {
            PageOutcome::Extracted { .. } => "extracted",
            PageOutcome::Exhausted => "exhausted",
            PageOutcome::Malformed(_) => "malformed",
            PageOutcome::FetchFailed(_) => "fetch_failed",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageReport {
    pub page: usize,
    pub url: String,
    pub outcome: PageOutcome,
}

/// Final result of a multi-page run
#[derive(Debug, Clone, Default)]
pub struct RunReport {
    pub records: Vec<ProgramRecord>,
    pub pages: Vec<PageReport>,
}

impl RunReport {
    pub fn pages_with_records(&self) -> usize {
        self.pages
            .iter()
            .filter(|p| matches!(p.outcome, PageOutcome::Extracted { .. }))
            .count()
    }
}

/// Settings for one multi-page run
#[derive(Debug, Clone)]
pub struct HarvestRun {
    pub max_pages: usize,
    pub page_delay: Duration,
    /// Stop at the first page where every strategy came up empty
    pub stop_on_empty: bool,
    /// Directory receiving each page's raw rendered HTML
    pub dump_dir: Option<PathBuf>,
}

impl Default for HarvestRun {
    fn default() -> Self {
        Self {
            max_pages: DEFAULT_MAX_PAGES,
            page_delay: Duration::from_millis(DEFAULT_PAGE_DELAY_MS),
            stop_on_empty: false,
            dump_dir: None,
        }
    }
}

impl HarvestRun {
    pub fn new(max_pages: usize) -> Self {
        Self {
            max_pages,
            ..Default::default()
        }
    }

    pub fn with_page_delay(mut self, delay: Duration) -> Self {
        self.page_delay = delay;
        self
    }

    pub fn with_stop_on_empty(mut self, stop: bool) -> Self {
        self.stop_on_empty = stop;
        self
    }

    pub fn with_dump_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.dump_dir = Some(dir.into());
        self
    }

    // * Dump failures are logged and never fail the page
    fn dump_page(&self, label: &str, page: usize, html: &str) {
        let Some(dir) = &self.dump_dir else {
            return;
        };
        let path = dir.join(format!("{}_page_{}.html", label, page));
        let written = std::fs::create_dir_all(dir).and_then(|_| std::fs::write(&path, html));
        match written {
            Ok(()) => debug!(path = %path.display(), "Dumped rendered page"),
            Err(e) => warn!(path = %path.display(), error = %e, "Failed to dump rendered page"),
        }
    }

    /// Visits pages 1..=max_pages and returns the deduplicated records.
    ///
    /// Page-level failures are recorded in the report and never abort the run.
    pub async fn execute<S: PageSource>(
        &self,
        source: &mut S,
        pipeline: &ExtractionPipeline,
        start_url: &str,
    ) -> Result<RunReport, PaginationError> {
        let site = pipeline.site();
        let ready_selector = site.ready_selector.as_deref();
        let mut dedup = Deduplicator::new();
        let mut report = RunReport::default();

        for page in 1..=self.max_pages {
            let url = page_url(start_url, &site.page_scheme, page)?;
            info!(site = %site.label, page, url = %url, "Scraping listing page");

            let outcome = match source.fetch_rendered(&url, ready_selector).await {
                Err(e) => {
                    warn!(page, error = %e, "Failed to render page");
                    PageOutcome::FetchFailed(e.to_string())
                }
                Ok(html) => {
                    self.dump_page(&site.label, page, &html);
                    extract_into(pipeline, &html, page, &mut dedup, &mut report.records)
                }
            };

            telemetry::record_page_processed(outcome.metric_label());
            let stop = self.stop_on_empty && outcome == PageOutcome::Exhausted;
            report.pages.push(PageReport { page, url, outcome });

            // * Single-page listings have nothing past page 1
            if stop || site.page_scheme == PageScheme::Single {
                break;
            }

            if page < self.max_pages && !self.page_delay.is_zero() {
                tokio::time::sleep(self.page_delay).await;
            }
        }

        info!(
            site = %site.label,
            pages = report.pages.len(),
            records = report.records.len(),
            "Run complete"
        );
        Ok(report)
    }
}

// * Runs the cascade on one page and appends the records the run has not seen yet
fn extract_into(
    pipeline: &ExtractionPipeline,
    html: &str,
    page: usize,
    dedup: &mut Deduplicator,
    records: &mut Vec<ProgramRecord>,
) -> PageOutcome {
    let extraction = match pipeline.extract_page(html) {
        Ok(extraction) => extraction,
        Err(ExtractError::MalformedDocument(reason)) => {
            warn!(page, reason = %reason, "Malformed page skipped");
            return PageOutcome::Malformed(reason);
        }
    };

    let Some(strategy) = extraction.strategy else {
        warn!(page, "No programs found on page");
        return PageOutcome::Exhausted;
    };

    let raw = extraction.records.len();
    let kept = dedup.dedupe(extraction.records);
    info!(page, strategy = %strategy, raw, kept = kept.len(), "Page extracted");

    let kept_count = kept.len();
    records.extend(kept);
    PageOutcome::Extracted {
        strategy,
        raw,
        kept: kept_count,
    }
}
