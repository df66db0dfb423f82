// * JSON persistence for a completed run
// * One pretty-printed UTF-8 array per run, named `{label}_{YYYYMMDD_HHMMSS}.json`.

use chrono::{DateTime, Local, TimeZone};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::PathBuf;
use thiserror::Error;
use tracing::info;

use crate::persistence::schema::ProgramRecord;

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("Failed to write results: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to serialize results: {0}")]
    Json(#[from] serde_json::Error),
}

/// Output file name for a run saved at `at`
pub fn output_file_name<Tz: TimeZone>(source_label: &str, at: &DateTime<Tz>) -> String
where
    Tz::Offset: std::fmt::Display,
{
    format!("{}_{}.json", source_label, at.format("%Y%m%d_%H%M%S"))
}

/// Writes run results as JSON files into one directory
#[derive(Debug, Clone)]
pub struct JsonExporter {
    out_dir: PathBuf,
}

impl JsonExporter {
    pub fn new(out_dir: impl Into<PathBuf>) -> Self {
        Self {
            out_dir: out_dir.into(),
        }
    }

    /// Saves records with the timestamp taken now
    pub fn save(
        &self,
        source_label: &str,
        records: &[ProgramRecord],
    ) -> Result<PathBuf, ExportError> {
        self.save_at(source_label, records, &Local::now())
    }

    /// Saves records under the name for an explicit timestamp
    pub fn save_at<Tz: TimeZone>(
        &self,
        source_label: &str,
        records: &[ProgramRecord],
        at: &DateTime<Tz>,
    ) -> Result<PathBuf, ExportError>
    where
        Tz::Offset: std::fmt::Display,
    {
        std::fs::create_dir_all(&self.out_dir)?;
        let path = self.out_dir.join(output_file_name(source_label, at));

        let mut writer = BufWriter::new(File::create(&path)?);
        serde_json::to_writer_pretty(&mut writer, records)?;
        writer.write_all(b"\n")?;
        writer.flush()?;

        info!(path = %path.display(), records = records.len(), "Saved program records");
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn timestamp() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 9, 14, 5, 7).unwrap()
    }

    #[test]
    fn test_file_name_convention() {
        assert_eq!(
            output_file_name("applyboard_programs", &timestamp()),
            "applyboard_programs_20240309_140507.json"
        );
    }

    #[test]
    fn test_save_writes_pretty_unescaped_json() {
        let dir = tempfile::tempdir().unwrap();
        let exporter = JsonExporter::new(dir.path());

        let mut record =

            ProgramRecord::unknown("https://example.com/programs/1", "demo:structural");
        record.institution = "Université <Laval> & Co".to_string();

        let path = exporter.save_at("demo", &[record], &timestamp()).unwrap();
        let written = std::fs::read_to_string(&path).unwrap();

        assert!(path.ends_with("demo_20240309_140507.json"));
        assert!(written.starts_with("[\n  {"));
        assert!(written.contains("Université <Laval> & Co"));
        assert!(written.contains("\"tuitionText\": \"unknown\""));
    }

    #[test]
    fn test_empty_run_is_an_empty_array() {
        let dir = tempfile::tempdir().unwrap();
        let path = JsonExporter::new(dir.path())
            .save_at("demo", &[], &timestamp())
            .unwrap();
        assert_eq!(std::fs::read_to_string(path).unwrap().trim(), "[]");
    }
}
