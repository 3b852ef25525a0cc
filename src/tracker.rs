//! Query and mutation services over the series bucket.

use crate::bucket::Bucket;
use crate::config::TrackerConfig;
use crate::error::{Result, TrackerError};
use crate::types::Series;
use tracing::warn;

/// Name of the bucket holding series records.
pub const SERIES_BUCKET: &str = "Series";

/// Result of a collection scan.
///
/// A stored value that fails to parse does not abort the scan; its key is
/// reported here instead of surfacing as an error.
#[derive(Clone, Debug, Default)]
pub struct Scan {
    /// Parsed records, most recently modified first.
    pub series: Vec<Series>,

    /// Keys whose values could not be parsed and were skipped.
    pub skipped: Vec<String>,
}

/// The tracker service: owns the bucket and enforces the persistence
/// contract on every read and write.
pub struct Tracker {
    bucket: Bucket,
}

impl Tracker {
    /// Open the tracker over the configured bucket file.
    pub fn open(config: &TrackerConfig) -> Result<Self> {
        let bucket = Bucket::open(&config.db_path, SERIES_BUCKET)?;
        Ok(Self { bucket })
    }

    /// Build a tracker over an already-open bucket.
    pub fn new(bucket: Bucket) -> Self {
        Self { bucket }
    }

    /// Load every record, sorted by modification time descending.
    ///
    /// Ties come out external-id ascending because the scan iterates
    /// key-sorted and the sort is stable; observed behavior, not contract.
    pub fn list_all(&self) -> Scan {
        let mut scan = Scan::default();

        for (key, value) in self.bucket.scan() {
            match serde_json::from_slice::<Series>(&value) {
                Ok(series) => scan.series.push(series),
                Err(e) => {
                    let key = String::from_utf8_lossy(&key).into_owned();
                    warn!(key = %key, error = %e, "skipping unparseable record");
                    scan.skipped.push(key);
                }
            }
        }

        scan.series.sort_by(|a, b| b.modified.cmp(&a.modified));
        scan
    }

    /// Insert or update a single record.
    ///
    /// Returns the full post-write collection as confirmation.
    pub fn upsert(&self, mut series: Series) -> Result<Vec<Series>> {
        if !series.is_valid() {
            let payload = serde_json::to_string(&series)?;
            return Err(TrackerError::Validation { payload });
        }

        series.touch();
        let encoded = serde_json::to_vec(&series)?;
        self.bucket.put(series.external_id.as_bytes(), &encoded)?;

        Ok(self.list_all().series)
    }

    /// Replace the entire collection.
    ///
    /// Every existing key is deleted in a best-effort loop, then the
    /// incoming records are written one per transaction; the first write
    /// failure aborts the rest. Deletes and earlier writes are not rolled
    /// back, so readers during a replace may observe a transient mix.
    pub fn replace_all(&self, incoming: Vec<Series>) -> Result<()> {
        for key in self.bucket.keys() {
            if let Err(e) = self.bucket.delete(&key) {
                warn!(
                    key = %String::from_utf8_lossy(&key),
                    error = %e,
                    "failed to delete record during replace"
                );
            }
        }

        for mut series in incoming {
            // Validity is checked but not enforced here: bulk import writes
            // invalid records that a single upsert would reject.
            if !series.is_valid() {
                warn!(title = %series.title, "importing series with empty external id");
            }

            series.touch();
            let encoded = serde_json::to_vec(&series)?;
            self.bucket.put(series.external_id.as_bytes(), &encoded)?;
        }

        Ok(())
    }

    /// Direct access to the underlying bucket.
    pub fn bucket(&self) -> &Bucket {
        &self.bucket
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Timestamp;
    use tempfile::TempDir;

    fn test_tracker(dir: &TempDir) -> Tracker {
        let bucket = Bucket::open(dir.path().join("series.db"), SERIES_BUCKET).unwrap();
        Tracker::new(bucket)
    }

    fn series(id: &str, title: &str) -> Series {
        Series {
            external_id: id.to_string(),
            title: title.to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_upsert_stamps_modified() {
        let dir = TempDir::new().unwrap();
        let tracker = test_tracker(&dir);

        let before = Timestamp::now();
        let mut input = series("tt001", "Show A");
        input.modified = Timestamp(42); // never trusted from the caller
        let all = tracker.upsert(input).unwrap();

        assert_eq!(all.len(), 1);
        assert_eq!(all[0].external_id, "tt001");
        assert!(all[0].modified >= before);
    }

    #[test]
    fn test_upsert_rejects_empty_id() {
        let dir = TempDir::new().unwrap();
        let tracker = test_tracker(&dir);

        let result = tracker.upsert(series("", "Nameless"));
        match result {
            Err(TrackerError::Validation { payload }) => {
                assert!(payload.contains("Nameless"));
            }
            other => panic!("expected validation error, got {other:?}"),
        }

        // Store untouched
        assert!(tracker.bucket().is_empty());
    }

    #[test]
    fn test_upsert_same_id_keeps_one_record() {
        let dir = TempDir::new().unwrap();
        let tracker = test_tracker(&dir);

        tracker.upsert(series("tt001", "Show A")).unwrap();
        let all = tracker.upsert(series("tt001", "Show A Renamed")).unwrap();

        assert_eq!(all.len(), 1);
        assert_eq!(all[0].title, "Show A Renamed");
    }

    #[test]
    fn test_list_all_sorted_by_modified_desc() {
        let dir = TempDir::new().unwrap();
        let tracker = test_tracker(&dir);

        // Write timestamps out of order, bypassing the service stamp
        for (id, modified) in [("a", 30), ("b", 10), ("c", 20)] {
            let mut s = series(id, id);
            s.modified = Timestamp(modified);
            let encoded = serde_json::to_vec(&s).unwrap();
            tracker.bucket().put(id.as_bytes(), &encoded).unwrap();
        }

        let scan = tracker.list_all();
        let ids: Vec<&str> = scan.series.iter().map(|s| s.external_id.as_str()).collect();
        assert_eq!(ids, vec!["a", "c", "b"]);
    }

    #[test]
    fn test_list_all_ties_break_by_external_id() {
        let dir = TempDir::new().unwrap();
        let tracker = test_tracker(&dir);

        for id in ["zz9", "aa1", "mm5"] {
            let mut s = series(id, id);
            s.modified = Timestamp(100);
            let encoded = serde_json::to_vec(&s).unwrap();
            tracker.bucket().put(id.as_bytes(), &encoded).unwrap();
        }

        let scan = tracker.list_all();
        let ids: Vec<&str> = scan.series.iter().map(|s| s.external_id.as_str()).collect();
        assert_eq!(ids, vec!["aa1", "mm5", "zz9"]);
    }

    #[test]
    fn test_list_all_skips_unparseable_records() {
        let dir = TempDir::new().unwrap();
        let tracker = test_tracker(&dir);

        tracker.upsert(series("tt001", "Show A")).unwrap();
        tracker.bucket().put(b"broken", b"{not json").unwrap();

        let scan = tracker.list_all();
        assert_eq!(scan.series.len(), 1);
        assert_eq!(scan.skipped, vec!["broken".to_string()]);
    }

    #[test]
    fn test_replace_all_empty_empties_collection() {
        let dir = TempDir::new().unwrap();
        let tracker = test_tracker(&dir);

        tracker.upsert(series("tt001", "Show A")).unwrap();
        tracker.upsert(series("tt002", "Show B")).unwrap();

        tracker.replace_all(Vec::new()).unwrap();
        assert!(tracker.list_all().series.is_empty());
    }

    #[test]
    fn test_replace_all_round_trip() {
        let dir = TempDir::new().unwrap();
        let tracker = test_tracker(&dir);

        tracker.upsert(series("old", "Old Show")).unwrap();

        let before = Timestamp::now();
        tracker
            .replace_all(vec![series("tt001", "Show A"), series("tt002", "Show B")])
            .unwrap();

        let scan = tracker.list_all();
        let mut ids: Vec<&str> = scan.series.iter().map(|s| s.external_id.as_str()).collect();
        ids.sort_unstable();
        assert_eq!(ids, vec!["tt001", "tt002"]);
        assert!(scan.series.iter().all(|s| s.modified >= before));
    }

    #[test]
    fn test_replace_all_writes_invalid_records() {
        let dir = TempDir::new().unwrap();
        let tracker = test_tracker(&dir);

        // Unlike single upsert, bulk import persists an empty-id record
        tracker.replace_all(vec![series("", "Nameless")]).unwrap();

        let scan = tracker.list_all();
        assert_eq!(scan.series.len(), 1);
        assert_eq!(scan.series[0].title, "Nameless");
    }

    #[test]
    fn test_collection_survives_reopen() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("series.db");

        {
            let bucket = Bucket::open(&path, SERIES_BUCKET).unwrap();
            let tracker = Tracker::new(bucket);
            tracker.upsert(series("tt001", "Show A")).unwrap();
        }

        let bucket = Bucket::open(&path, SERIES_BUCKET).unwrap();
        let tracker = Tracker::new(bucket);
        let scan = tracker.list_all();
        assert_eq!(scan.series.len(), 1);
        assert_eq!(scan.series[0].title, "Show A");
    }
}
