use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::Context;
use clap::{Parser, Subcommand};

use program_harvest::config::constants::{
    DEFAULT_MAX_PAGES, DEFAULT_PAGE_DELAY_MS, DEFAULT_SAMPLE_CARDS,
};
use program_harvest::config::SiteConfig;
use program_harvest::engine::pagination::{HarvestRun, PageOutcome};
use program_harvest::engine::slow_path::{BrowserRenderer, RendererOptions};
use program_harvest::ops::telemetry;
use program_harvest::persistence::{Deduplicator, JsonExporter};
use program_harvest::refinery::{CardSampler, ExtractError, ExtractionPipeline};

#[derive(Parser)]
#[command(name = "program-harvest", about = "Academic program listing extractor")]
struct Cli {
    /// Human-readable logs instead of JSON lines
    #[arg(long, global = true)]
    pretty_logs: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List the built-in site presets
    Sites,
    /// Render listing pages in a browser and extract programs
    Run {
        /// Preset name or path to a site JSON file
        #[arg(short, long)]
        site: String,
        /// First listing page (defaults to the site's start URL)
        #[arg(short, long)]
        url: Option<String>,
        /// Listing pages to visit
        #[arg(short = 'n', long, default_value_t = DEFAULT_MAX_PAGES)]
        pages: usize,
        /// Pause between pages in milliseconds
        #[arg(long, default_value_t = DEFAULT_PAGE_DELAY_MS)]
        delay_ms: u64,
        /// Directory for the results file
        #[arg(short, long, default_value = "output")]
        out_dir: PathBuf,
        /// Show the browser window
        #[arg(long)]
        headed: bool,
        /// End the run at the first page with no programs
        #[arg(long)]
        stop_on_empty: bool,
        /// Write each page's rendered HTML and a card sample here
        #[arg(long)]
        dump_dir: Option<PathBuf>,
    },
    /// Extract programs from saved HTML files
    Extract {
        /// Preset name or path to a site JSON file
        #[arg(short, long)]
        site: String,
        /// Directory for the results file
        #[arg(short, long, default_value = "output")]
        out_dir: PathBuf,
        /// Rendered listing pages
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    if cli.pretty_logs {
        telemetry::init_tracing_pretty();
    } else {
        telemetry::init_tracing();
    }

    let t0 = Instant::now();
    match cli.command {
        Commands::Sites => {
            for name in SiteConfig::presets() {
                let site = SiteConfig::preset(name)?;
                println!(
                    "{:<16} {:<26} {}",
                    name,
                    site.label,
                    site.start_url.as_deref().unwrap_or("-")
                );
            }
        }
        Commands::Run {
            site,
            url,
            pages,
            delay_ms,
            out_dir,
            headed,
            stop_on_empty,
            dump_dir,
        } => {
            let site = SiteConfig::resolve(&site)
                .with_context(|| format!("Failed to load site `{}`", site))?;
            let start_url = url
                .or_else(|| site.start_url.clone())
                .with_context(|| format!("Site `{}` has no start URL; pass --url", site.label))?;

            let sampler = Arc::new(CardSampler::with_limit(DEFAULT_SAMPLE_CARDS));
            let mut pipeline = ExtractionPipeline::new(site.clone())?;
            let mut run = HarvestRun::new(pages)
                .with_page_delay(Duration::from_millis(delay_ms))
                .with_stop_on_empty(stop_on_empty);
            if let Some(dir) = &dump_dir {
                pipeline = pipeline.with_observer(sampler.clone());
                run = run.with_dump_dir(dir);
            }

            let mut renderer = BrowserRenderer::new(RendererOptions {
                headed,
                ..Default::default()
            });
            let report = run.execute(&mut renderer, &pipeline, &start_url).await;
            renderer.shutdown().await;
            let report = report?;

            for page in &report.pages {
                match &page.outcome {
                    PageOutcome::Extracted { strategy, raw, kept } => {
                        println!("page {}: {} via {} ({} new)", page.page, raw, strategy, kept)
                    }
                    PageOutcome::Exhausted => println!("page {}: no programs found", page.page),
                    PageOutcome::Malformed(reason) => {
                        println!("page {}: malformed ({})", page.page, reason)
                    }
                    PageOutcome::FetchFailed(reason) => {
                        println!("page {}: failed ({})", page.page, reason)
                    }
                }
            }

            if let Some(dir) = &dump_dir {
                let path = dir.join(format!("{}_cards.json", site.label));
                std::fs::write(&path, sampler.to_json_pretty())
                    .with_context(|| format!("Failed to write {}", path.display()))?;
            }

            let path = JsonExporter::new(&out_dir).save(&site.label, &report.records)?;
            println!("Saved {} programs to {}", report.records.len(), path.display());
        }
        Commands::Extract { site, out_dir, files } => {
            let site = SiteConfig::resolve(&site)
                .with_context(|| format!("Failed to load site `{}`", site))?;
            let pipeline = ExtractionPipeline::new(site.clone())?;
            let mut dedup = Deduplicator::new();
            let mut records = Vec::new();

            for file in &files {
                let html = std::fs::read_to_string(file)
                    .with_context(|| format!("Failed to read {}", file.display()))?;
                match pipeline.extract_page(&html) {
                    Ok(page) => {
                        let raw = page.records.len();
                        let kept = dedup.dedupe(page.records);
                        match page.strategy {
                            Some(strategy) => println!(
                                "{}: {} via {} ({} new)",
                                file.display(),
                                raw,
                                strategy,
                                kept.len()
                            ),
                            None => println!("{}: no programs found", file.display()),
                        }
                        records.extend(kept);
                    }
                    Err(ExtractError::MalformedDocument(reason)) => {
                        println!("{}: malformed ({})", file.display(), reason)
                    }
                }
            }

            let path = JsonExporter::new(&out_dir).save(&site.label, &records)?;
            println!("Saved {} programs to {}", records.len(), path.display());
        }
    }

    tracing::debug!(metrics = %telemetry::get_metrics_string(), "Extraction counters");
    tracing::debug!(elapsed_ms = t0.elapsed().as_millis() as u64, "Done");
    Ok(())
}
