//! Review and run log sinks.
//!
//! Append-only text outputs for humans; nothing in the pipeline reads them
//! back. The review log collects flagged translations (echoes and script
//! leaks) as they happen; the final log is an in-memory transcript of the
//! whole run, written once at the end.

use std::collections::HashSet;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Append-only sink for translations needing human follow-up.
pub struct ReviewLog {
    path: PathBuf,
    /// Resource pages whose findings are suppressed (known-noisy pages).
    excluded_pages: HashSet<String>,
}

impl ReviewLog {
    pub fn new(path: impl Into<PathBuf>, excluded_pages: &[String]) -> Self {
        Self {
            path: path.into(),
            excluded_pages: excluded_pages.iter().map(|p| p.to_lowercase()).collect(),
        }
    }

    /// Whether findings from `page` should be reported at all.
    pub fn reports_page(&self, page: &str) -> bool {
        !self.excluded_pages.contains(&page.to_lowercase())
    }

    /// Append one flagged translation. A write failure is logged and
    /// swallowed; review entries are advisory.
    pub fn record(&self, page: &str, locale: &str, key: &str, source: &str, output: &str) {
        let entry = format!(
            "⚠ {} [{} {}]\nSource: {}\nOutput: {}\n{}\n",
            page,
            locale,
            key,
            source,
            output,
            "-".repeat(60)
        );

        let result = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .and_then(|mut f| f.write_all(entry.as_bytes()));

        if let Err(e) = result {
            warn!("Failed to write review log: {}", e);
        }
    }
}

/// In-memory transcript of a run: every accepted translation and every
/// flagged item, flushed to one file when the run completes.
#[derive(Debug, Default)]
pub struct FinalLog {
    lines: String,
}

impl FinalLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an accepted translation.
    pub fn accepted(&mut self, locale: &str, key: &str, translation: &str) {
        self.lines
            .push_str(&format!("{} {} | {}\n\n", locale, key, translation));
    }

    /// Record a flagged translation alongside its source.
    pub fn flagged(&mut self, page: &str, locale: &str, key: &str, source: &str, output: &str) {
        self.lines.push_str(&format!(
            "⚠ {} [{} {}]\nSource: {}\nOutput: {}\n\n",
            page, locale, key, source, output
        ));
    }

    /// Name the log after what was translated: the selected resources, a
    /// single folder, or the whole tree.
    pub fn file_name(folders: &[PathBuf], resources: &[String]) -> String {
        let stem = if !resources.is_empty() {
            resources.join("_")
        } else if folders.len() == 1 {
            folders[0]
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| "FullTranslation".to_string())
        } else {
            "FullTranslation".to_string()
        };
        format!("{}.log", stem)
    }

    /// Write the transcript to `dir`. A failure is logged, not fatal; the
    /// per-entry warnings were already printed inline.
    pub fn write(&self, dir: &Path, folders: &[PathBuf], resources: &[String]) {
        let path = dir.join(Self::file_name(folders, resources));
        match std::fs::write(&path, &self.lines) {
            Ok(()) => info!("Log written to: {}", path.display()),
            Err(e) => warn!("Failed to write final log: {}", e),
        }
    }

    #[cfg(test)]
    pub(crate) fn contents(&self) -> &str {
        &self.lines
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    // ==================== Review Log Tests ====================

    #[test]
    fn test_review_log_appends_entries() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("review.log");
        let log = ReviewLog::new(&path, &[]);

        log.record("city", "km", "Title", "Kampot", "Kampot");
        log.record("city", "lo", "Title", "Kampot", "Kampot");

        let contents = std::fs::read_to_string(&path).unwrap();
        assert_eq!(contents.matches("⚠ city").count(), 2);
        assert!(contents.contains("Source: Kampot"));
        assert!(contents.contains(&"-".repeat(60)));
    }

    #[test]
    fn test_review_log_page_exclusion() {
        let log = ReviewLog::new("/tmp/unused.log", &["boinc".to_string()]);
        assert!(!log.reports_page("boinc"));
        assert!(!log.reports_page("BOINC"));
        assert!(log.reports_page("city"));
    }

    #[test]
    fn test_review_log_unwritable_path_does_not_panic() {
        let log = ReviewLog::new("/nonexistent-dir/review.log", &[]);
        log.record("city", "km", "k", "s", "o");
    }

    // ==================== Final Log Tests ====================

    #[test]
    fn test_final_log_accumulates() {
        let mut log = FinalLog::new();
        log.accepted("km", "Title", "កំពត");
        log.flagged("city", "zh", "Body", "Hello", "Hello");

        assert!(log.contents().contains("km Title | កំពត"));
        assert!(log.contents().contains("⚠ city [zh Body]"));
    }

    #[test]
    fn test_final_log_file_name_from_resources() {
        let name = FinalLog::file_name(&[], &["seahorse".to_string(), "durian".to_string()]);
        assert_eq!(name, "seahorse_durian.log");
    }

    #[test]
    fn test_final_log_file_name_from_single_folder() {
        let name = FinalLog::file_name(&[PathBuf::from("/data/Resources/city")], &[]);
        assert_eq!(name, "city.log");
    }

    #[test]
    fn test_final_log_file_name_fallback() {
        let folders = vec![PathBuf::from("/a"), PathBuf::from("/b")];
        assert_eq!(FinalLog::file_name(&folders, &[]), "FullTranslation.log");
    }

    #[test]
    fn test_final_log_write() {
        let dir = TempDir::new().unwrap();
        let mut log = FinalLog::new();
        log.accepted("km", "Title", "កំពត");
        log.write(dir.path(), &[PathBuf::from("city")], &[]);

        let contents = std::fs::read_to_string(dir.path().join("city.log")).unwrap();
        assert!(contents.contains("km Title | កំពត"));
    }
}
