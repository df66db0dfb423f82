// * Telemetry - JSON Logging and Prometheus Counters
// * Structured logging setup for the binary plus process-wide extraction counters

use lazy_static::lazy_static;
use prometheus::{register_counter_vec, CounterVec, Encoder, TextEncoder};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

lazy_static! {
    // * Strategy attempts by cascade variant
    pub static ref STRATEGY_ATTEMPTS_TOTAL: CounterVec = register_counter_vec!(
        "harvest_strategy_attempts_total",
        "Number of times each extraction strategy ran",
        &["strategy"]
    ).unwrap();

    // * Accepted records by the strategy that produced them
    pub static ref RECORDS_EXTRACTED_TOTAL: CounterVec = register_counter_vec!(
        "harvest_records_extracted_total",
        "Records accepted per extraction strategy",
        &["strategy"]
    ).unwrap();

    // * Cards dropped before becoming records
    pub static ref CARDS_REJECTED_TOTAL: CounterVec = register_counter_vec!(
        "harvest_cards_rejected_total",
        "Candidate cards dropped by reason",
        &["reason"]
    ).unwrap();

    // * Pages by outcome (extracted, exhausted, malformed, fetch_failed)
    pub static ref PAGES_PROCESSED_TOTAL: CounterVec = register_counter_vec!(
        "harvest_pages_processed_total",
        "Listing pages processed by outcome",
        &["outcome"]
    ).unwrap();
}

/// Initializes the tracing subscriber with JSON formatting
///
/// # Example
/// ```ignore
/// use program_harvest::ops::telemetry;
///
/// telemetry::init_tracing();
/// tracing::info!(site = "applyboard_programs", "Starting run");
/// ```
pub fn init_tracing() {
    init_tracing_with_level("info");
}

/// Initializes tracing with custom log level
pub fn init_tracing_with_level(level: &str) {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt::layer().json())
        .init();
}

/// Initializes tracing with pretty formatting (for development)
pub fn init_tracing_pretty() {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("debug"));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt::layer().pretty())
        .init();
}

/// Returns the current metrics as a string
pub fn get_metrics_string() -> String {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();
    if encoder.encode(&metric_families, &mut buffer).is_err() {
        return String::new();
    }
    String::from_utf8(buffer).unwrap_or_default()
}

pub fn record_strategy_attempt(strategy: &str) {
    STRATEGY_ATTEMPTS_TOTAL.with_label_values(&[strategy]).inc();
}

pub fn record_records_extracted(strategy: &str, count: usize) {
    RECORDS_EXTRACTED_TOTAL
        .with_label_values(&[strategy])
        .inc_by(count as f64);
}

pub fn record_cards_rejected(reason: &str, count: usize) {
    if count > 0 {
        CARDS_REJECTED_TOTAL
            .with_label_values(&[reason])
            .inc_by(count as f64);
    }
}

pub fn record_page_processed(outcome: &str) {
    PAGES_PROCESSED_TOTAL.with_label_values(&[outcome]).inc();
}
