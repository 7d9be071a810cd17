//! Per-run log directories.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};

/// Sortable run directory name, e.g. `20260301-101500-042`.
pub fn run_stamp(at: DateTime<Utc>) -> String {
    at.format("%Y%m%d-%H%M%S-%3f").to_string()
}

/// Most recent run directory under a bundle's logs dir.
pub fn latest_run_dir(logs_dir: &Path) -> Option<PathBuf> {
    std::fs::read_dir(logs_dir)
        .ok()?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| path.is_dir())
        .max_by(|a, b| a.file_name().cmp(&b.file_name()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn stamps_sort_chronologically() {
        let earlier = DateTime::parse_from_rfc3339("2026-03-01T09:59:59.900Z").unwrap();
        let later = DateTime::parse_from_rfc3339("2026-03-01T10:00:00.100Z").unwrap();
        let a = run_stamp(earlier.with_timezone(&Utc));
        let b = run_stamp(later.with_timezone(&Utc));
        assert_eq!(a, "20260301-095959-900");
        assert!(a < b);
    }

    #[test]
    fn latest_run_dir_picks_newest() {
        let dir = TempDir::new().unwrap();
        for name in ["20260101-000000-000", "20260301-000000-000", "20260201-000000-000"] {
            std::fs::create_dir(dir.path().join(name)).unwrap();
        }
        std::fs::write(dir.path().join("zzz.txt"), "").unwrap();
        assert_eq!(
            latest_run_dir(dir.path()),
            Some(dir.path().join("20260301-000000-000"))
        );
        assert_eq!(latest_run_dir(&dir.path().join("missing")), None);
    }
}
