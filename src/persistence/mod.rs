// * Persistence: record schema, run-scoped deduplication and JSON output

pub mod dedup;
pub mod export;
pub mod schema;

// * Re-exports for convenient access
pub use dedup::{dedupe, DedupResult, DedupStats, Deduplicator};
pub use export::{output_file_name, ExportError, JsonExporter};
pub use schema::{CandidateCard, ProgramRecord};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_module_exports() {
        let _dedup = Deduplicator::new();
        let _exporter = JsonExporter::new(".");
        let _record = ProgramRecord::unknown("unknown", "demo:structural");
    }

    #[test]
    fn test_integration_dedupe_then_export() {
        let records = vec![
            ProgramRecord::unknown("https://example.com/programs/1", "demo:anchor-driven"),
            ProgramRecord::unknown("https://example.com/programs/1", "demo:anchor-driven"),
        ];
        let unique = dedupe(records);

        let dir = tempfile::tempdir().unwrap();
        let path = JsonExporter::new(dir.path()).save("demo", &unique).unwrap();
        let parsed: Vec<ProgramRecord> =
            serde_json::from_str(&std::fs::read_to_string(path).unwrap()).unwrap();

        assert_eq!(parsed, unique);
    }
}
