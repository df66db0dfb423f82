// * Operations: logging setup and extraction counters

pub mod telemetry;

// * Re-exports for convenient access
pub use telemetry::{
    get_metrics_string, init_tracing, init_tracing_pretty, init_tracing_with_level,
    record_cards_rejected, record_page_processed, record_records_extracted,
    record_strategy_attempt,
};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_module_exports() {
        record_page_processed("exhausted");
        let metrics = get_metrics_string();
        assert!(!metrics.is_empty());
    }
}
