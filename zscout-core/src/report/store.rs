//! On-disk store for generated reports, one JSON file per report.

use super::generator::GeneratedReport;
use crate::persistence::{atomic_write_json, load_json};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::io;
use std::path::{Path, PathBuf};
use uuid::Uuid;

/// Listing entry for a stored report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportSummary {
    pub id: Uuid,
    pub query: String,
    pub title: String,
    pub created_at: DateTime<Utc>,
    pub section_count: usize,
    pub reference_count: usize,
}

impl From<&GeneratedReport> for ReportSummary {
    fn from(generated: &GeneratedReport) -> Self {
        Self {
            id: generated.id,
            query: generated.query.clone(),
            title: generated.report.title.clone(),
            created_at: generated.created_at,
            section_count: generated.report.sections.len(),
            reference_count: generated.report.references.len(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ReportStore {
    dir: PathBuf,
}

impl ReportStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, id: &Uuid) -> PathBuf {
        self.dir.join(format!("{id}.json"))
    }

    /// Write a report to `<dir>/<id>.json`, returning the path.
    pub fn save(&self, generated: &GeneratedReport) -> io::Result<PathBuf> {
        let path = self.path_for(&generated.id);
        atomic_write_json(&path, generated)?;
        Ok(path)
    }

    /// Load a report. `Ok(None)` when no file exists for `id`.
    pub fn load(&self, id: &Uuid) -> io::Result<Option<GeneratedReport>> {
        load_json(&self.path_for(id))
    }

    /// Summaries of every readable report, newest first.
    pub fn list(&self) -> Vec<ReportSummary> {
        let Ok(entries) = std::fs::read_dir(&self.dir) else {
            return Vec::new();
        };

        let mut summaries: Vec<ReportSummary> = entries
            .flatten()
            .map(|entry| entry.path())
            .filter(|path| path.extension().is_some_and(|e| e == "json"))
            .filter_map(|path| match load_json::<GeneratedReport>(&path) {
                Ok(Some(generated)) => Some(ReportSummary::from(&generated)),
                Ok(None) => None,
                Err(e) => {
                    tracing::debug!(path = %path.display(), error = %e, "Skipping unreadable report");
                    None
                }
            })
            .collect();
        summaries.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        summaries
    }

    /// Delete a report. Returns whether a file was removed.
    pub fn delete(&self, id: &Uuid) -> io::Result<bool> {
        match std::fs::remove_file(self.path_for(id)) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::quality::QualityMetrics;
    use crate::report::types::{Report, Section};
    use crate::types::TokenUsage;
    use chrono::Duration;
    use pretty_assertions::assert_eq;

    fn generated(query: &str, age_minutes: i64) -> GeneratedReport {
        GeneratedReport {
            id: Uuid::new_v4(),
            query: query.into(),
            report: Report {
                title: format!("Report on {}", query),
                sections: vec![Section::new("A", "B")],
                ..Default::default()
            },
            quality: QualityMetrics::default(),
            attempts: 1,
            retried: false,
            grounding_sources: vec![],
            model: "gemini-2.5-flash".into(),
            usage: TokenUsage::default(),
            created_at: Utc::now() - Duration::minutes(age_minutes),
        }
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let store = ReportStore::new(dir.path().join("reports"));
        let report = generated("fusion", 0);

        let path = store.save(&report).unwrap();
        assert_eq!(path, dir.path().join("reports").join(format!("{}.json", report.id)));

        let loaded = store.load(&report.id).unwrap().unwrap();
        assert_eq!(loaded, report);
    }

    #[test]
    fn test_load_missing() {
        let dir = tempfile::tempdir().unwrap();
        let store = ReportStore::new(dir.path());
        assert!(store.load(&Uuid::new_v4()).unwrap().is_none());
    }

    #[test]
    fn test_list_newest_first_and_skips_garbage() {
        let dir = tempfile::tempdir().unwrap();
        let store = ReportStore::new(dir.path());
        let old = generated("old", 60);
        let new = generated("new", 1);
        store.save(&old).unwrap();
        store.save(&new).unwrap();
        std::fs::write(dir.path().join("broken.json"), "{").unwrap();
        std::fs::write(dir.path().join("notes.txt"), "ignore me").unwrap();

        let list = store.list();
        assert_eq!(list.len(), 2);
        assert_eq!(list[0].query, "new");
        assert_eq!(list[1].query, "old");
        assert_eq!(list[0].title, "Report on new");
        assert_eq!(list[0].section_count, 1);
    }

    #[test]
    fn test_list_missing_dir_is_empty() {
        let store = ReportStore::new("/nonexistent/zscout/reports");
        assert!(store.list().is_empty());
    }

    #[test]
    fn test_delete() {
        let dir = tempfile::tempdir().unwrap();
        let store = ReportStore::new(dir.path());
        let report = generated("x", 0);
        store.save(&report).unwrap();
        assert!(store.delete(&report.id).unwrap());
        assert!(!store.delete(&report.id).unwrap());
        assert!(store.list().is_empty());
    }
}
