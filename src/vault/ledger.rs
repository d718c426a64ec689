use crate::error::{VaultError, VaultResult};
use chrono::{DateTime, Utc};
use fs2::FileExt;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::ffi::OsString;
use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

const BYTES_PER_MB: f64 = 1024.0 * 1024.0;

/// One uploaded file as the ledger remembers it.
///
/// `size_bytes` and `upload_date` are fixed at record time. `deleted` only
/// ever flips from false to true; the entry itself is never removed, so the
/// ledger doubles as an upload history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerEntry {
    pub message_id: i64,
    pub file_name: String,
    pub size_bytes: u64,
    pub size_mb: f64,
    pub upload_date: DateTime<Utc>,
    pub deletion_date: Option<DateTime<Utc>>,
    pub deleted: bool,
}

/// On-disk ledger schema: `{ "total_size": <int>, "files": { "<id>": ... } }`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LedgerFile {
    pub total_size: u64,
    pub files: BTreeMap<i64, LedgerEntry>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LedgerSummary {
    pub total_size: u64,
    pub total_size_mb: f64,
    pub active_files: usize,
    pub deleted_files: usize,
    pub total_files: usize,
}

/// Local storage-accounting record mirroring remote channel state.
///
/// The remote channel stays the source of truth; this is best-effort cached
/// metadata. Every operation is a full load-mutate-save cycle against the
/// backing file, so no state survives in memory between calls. Invariant
/// after every persisted mutation: `total_size` equals the sum of
/// `size_bytes` over non-deleted entries.
///
/// Constructed with `None` the ledger is inert: mutations are skipped and
/// `summary` reports nothing.
#[derive(Debug, Clone)]
pub struct Ledger {
    path: Option<PathBuf>,
}

fn mb_2dp(bytes: u64) -> f64 {
    (bytes as f64 / BYTES_PER_MB * 100.0).round() / 100.0
}

fn recompute_total(files: &BTreeMap<i64, LedgerEntry>) -> u64 {
    files
        .values()
        .filter(|entry| !entry.deleted)
        .map(|entry| entry.size_bytes)
        .sum()
}

fn lock_path(ledger_path: &Path) -> PathBuf {
    let mut os: OsString = ledger_path.as_os_str().to_owned();
    os.push(".lock");
    PathBuf::from(os)
}

// Held for the duration of one load-mutate-save cycle; the lock releases
// when the file handle drops.
fn acquire_lock(ledger_path: &Path) -> VaultResult<File> {
    let path = lock_path(ledger_path);
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent).map_err(|err| VaultError::Write {
            path: parent.to_path_buf(),
            source: err,
        })?;
    }
    let file = OpenOptions::new()
        .create(true)
        .write(true)
        .truncate(false)
        .open(&path)
        .map_err(|err| VaultError::Write {
            path: path.clone(),
            source: err,
        })?;
    file.lock_exclusive().map_err(|err| VaultError::Write {
        path,
        source: err,
    })?;
    Ok(file)
}

fn load(path: &Path) -> VaultResult<LedgerFile> {
    if !path.exists() {
        return Ok(LedgerFile::default());
    }

    let raw = fs::read_to_string(path).map_err(|err| VaultError::Write {
        path: path.to_path_buf(),
        source: err,
    })?;
    // The persisted total_size is trusted as-is here; mutations recompute it
    // from scratch before the next save.
    serde_json::from_str(&raw).map_err(|err| VaultError::Parse {
        path: path.to_path_buf(),
        source: err,
    })
}

fn save(path: &Path, ledger: &LedgerFile) -> VaultResult<()> {
    let write_err = |err: std::io::Error| VaultError::Write {
        path: path.to_path_buf(),
        source: err,
    };

    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => PathBuf::from("."),
    };
    fs::create_dir_all(&parent).map_err(write_err)?;

    let data = serde_json::to_string_pretty(ledger).map_err(std::io::Error::other).map_err(write_err)?;

    // Write-then-rename so a crash mid-save never truncates the ledger.
    let mut tmp = NamedTempFile::new_in(&parent).map_err(write_err)?;
    tmp.write_all(data.as_bytes()).map_err(write_err)?;
    tmp.write_all(b"\n").map_err(write_err)?;
    tmp.persist(path)
        .map_err(|err| write_err(err.error))?;
    Ok(())
}

impl Ledger {
    pub fn new(path: Option<PathBuf>) -> Self {
        Self { path }
    }

    pub fn is_enabled(&self) -> bool {
        self.path.is_some()
    }

    /// Record a completed upload under `message_id`, reading the file's
    /// current on-disk size. Re-recording an existing id replaces the prior
    /// entry rather than duplicating it. No-op when no ledger is configured.
    pub fn record_upload(&self, message_id: i64, file_path: &Path) -> VaultResult<()> {
        let Some(path) = self.path.as_deref() else {
            return Ok(());
        };

        let size_bytes = fs::metadata(file_path)
            .map_err(|_| VaultError::NotFound(format!("local file {}", file_path.display())))?
            .len();
        let file_name = file_path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("upload.bin")
            .to_string();

        let _lock = acquire_lock(path)?;
        let mut ledger = load(path)?;
        ledger.files.insert(
            message_id,
            LedgerEntry {
                message_id,
                file_name,
                size_bytes,
                size_mb: mb_2dp(size_bytes),
                upload_date: Utc::now(),
                deletion_date: None,
                deleted: false,
            },
        );
        ledger.total_size = recompute_total(&ledger.files);
        save(path, &ledger)
    }

    /// Soft-delete `message_id` if the ledger knows it: flip `deleted`, stamp
    /// `deletion_date` (last write wins), recompute the total. Unknown ids
    /// are a silent no-op; only ids the ledger already tracks are mutated.
    /// No-op when no ledger is configured.
    pub fn record_deletion(&self, message_id: i64) -> VaultResult<()> {
        let Some(path) = self.path.as_deref() else {
            return Ok(());
        };

        let _lock = acquire_lock(path)?;
        let mut ledger = load(path)?;
        let Some(entry) = ledger.files.get_mut(&message_id) else {
            return Ok(());
        };
        entry.deleted = true;
        entry.deletion_date = Some(Utc::now());
        ledger.total_size = recompute_total(&ledger.files);
        save(path, &ledger)
    }

    /// Aggregate view of the ledger, or `None` when no ledger is configured.
    pub fn summary(&self) -> VaultResult<Option<LedgerSummary>> {
        let Some(path) = self.path.as_deref() else {
            return Ok(None);
        };

        let ledger = load(path)?;
        let deleted_files = ledger.files.values().filter(|e| e.deleted).count();
        let total_files = ledger.files.len();
        Ok(Some(LedgerSummary {
            total_size: ledger.total_size,
            total_size_mb: mb_2dp(ledger.total_size),
            active_files: total_files - deleted_files,
            deleted_files,
            total_files,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn ledger_in(dir: &Path) -> (Ledger, PathBuf) {
        let path = dir.join("vault").join("storage_log.json");
        (Ledger::new(Some(path.clone())), path)
    }

    fn write_sized_file(dir: &Path, name: &str, size: usize) -> PathBuf {
        let path = dir.join(name);
        fs::write(&path, vec![0u8; size]).expect("write file");
        path
    }

    fn assert_invariant(path: &Path) {
        let ledger = load(path).expect("load");
        assert_eq!(ledger.total_size, recompute_total(&ledger.files));
    }

    #[test]
    fn record_upload_creates_entry_and_total() {
        let tmp = tempdir().expect("tempdir");
        let (ledger, path) = ledger_in(tmp.path());
        let file = write_sized_file(tmp.path(), "blob.bin", 2048);

        ledger.record_upload(42, &file).expect("record upload");

        let persisted = load(&path).expect("load");
        let entry = persisted.files.get(&42).expect("entry");
        assert_eq!(entry.message_id, 42);
        assert_eq!(entry.file_name, "blob.bin");
        assert_eq!(entry.size_bytes, 2048);
        assert!(!entry.deleted);
        assert!(entry.deletion_date.is_none());
        assert_eq!(persisted.total_size, 2048);
        assert_invariant(&path);
    }

    #[test]
    fn record_upload_same_id_replaces_instead_of_duplicating() {
        let tmp = tempdir().expect("tempdir");
        let (ledger, path) = ledger_in(tmp.path());
        let small = write_sized_file(tmp.path(), "small.bin", 100);
        let large = write_sized_file(tmp.path(), "large.bin", 900);

        ledger.record_upload(7, &small).expect("first upload");
        ledger.record_upload(7, &large).expect("second upload");

        let persisted = load(&path).expect("load");
        assert_eq!(persisted.files.len(), 1);
        assert_eq!(persisted.files.get(&7).expect("entry").size_bytes, 900);
        assert_eq!(persisted.total_size, 900);
        assert_invariant(&path);
    }

    #[test]
    fn record_deletion_soft_deletes_and_excludes_from_total() {
        let tmp = tempdir().expect("tempdir");
        let (ledger, path) = ledger_in(tmp.path());
        let kept = write_sized_file(tmp.path(), "kept.bin", 300);
        let gone = write_sized_file(tmp.path(), "gone.bin", 500);

        ledger.record_upload(1, &kept).expect("upload kept");
        ledger.record_upload(2, &gone).expect("upload gone");
        ledger.record_deletion(2).expect("delete");

        let persisted = load(&path).expect("load");
        let entry = persisted.files.get(&2).expect("entry survives");
        assert!(entry.deleted);
        assert!(entry.deletion_date.is_some());
        assert_eq!(persisted.total_size, 300);
        assert_invariant(&path);
    }

    #[test]
    fn second_deletion_is_monotone_and_leaves_total_unchanged() {
        let tmp = tempdir().expect("tempdir");
        let (ledger, path) = ledger_in(tmp.path());
        let file = write_sized_file(tmp.path(), "blob.bin", 500);

        ledger.record_upload(9, &file).expect("upload");
        ledger.record_deletion(9).expect("first delete");
        let first = load(&path).expect("load");

        ledger.record_deletion(9).expect("second delete");
        let second = load(&path).expect("load");

        assert!(second.files.get(&9).expect("entry").deleted);
        assert_eq!(first.total_size, second.total_size);
        assert_eq!(second.total_size, 0);
        assert_invariant(&path);
    }

    #[test]
    fn deleting_unknown_id_is_a_silent_noop() {
        let tmp = tempdir().expect("tempdir");
        let (ledger, path) = ledger_in(tmp.path());
        let file = write_sized_file(tmp.path(), "blob.bin", 64);
        ledger.record_upload(1, &file).expect("upload");

        // Carried from the original contract: only known ids are mutated.
        ledger.record_deletion(999).expect("unknown id");

        let persisted = load(&path).expect("load");
        assert_eq!(persisted.files.len(), 1);
        assert!(!persisted.files.contains_key(&999));
        assert_eq!(persisted.total_size, 64);
    }

    #[test]
    fn deletion_on_missing_ledger_file_creates_nothing() {
        let tmp = tempdir().expect("tempdir");
        let (ledger, path) = ledger_in(tmp.path());

        ledger.record_deletion(999).expect("unknown id");

        assert!(!path.exists());
    }

    #[test]
    fn saved_ledger_round_trips_bit_identical() {
        let tmp = tempdir().expect("tempdir");
        let (ledger, path) = ledger_in(tmp.path());
        for (id, size) in [(1i64, 10usize), (2, 20), (3, 30)] {
            let file = write_sized_file(tmp.path(), &format!("f{id}.bin"), size);
            ledger.record_upload(id, &file).expect("upload");
        }
        ledger.record_deletion(2).expect("delete");

        let first = load(&path).expect("first load");
        save(&path, &first).expect("re-save");
        let second = load(&path).expect("second load");

        assert_eq!(first.total_size, second.total_size);
        assert_eq!(first.files.len(), second.files.len());
        for (id, entry) in &first.files {
            assert_eq!(second.files.get(id).expect("entry"), entry);
        }
    }

    #[test]
    fn upload_then_delete_scenario_matches_summary() {
        let tmp = tempdir().expect("tempdir");
        let (ledger, _path) = ledger_in(tmp.path());
        let file = write_sized_file(tmp.path(), "big.bin", 10_000_000);

        ledger.record_upload(42, &file).expect("upload");
        let after_upload = ledger.summary().expect("summary").expect("enabled");
        assert_eq!(after_upload.total_size, 10_000_000);
        assert_eq!(after_upload.total_size_mb, 9.54);
        assert_eq!(after_upload.active_files, 1);
        assert_eq!(after_upload.deleted_files, 0);
        assert_eq!(after_upload.total_files, 1);

        ledger.record_deletion(42).expect("delete");
        let after_delete = ledger.summary().expect("summary").expect("enabled");
        assert_eq!(after_delete.total_size, 0);
        assert_eq!(after_delete.active_files, 0);
        assert_eq!(after_delete.deleted_files, 1);
        assert_eq!(after_delete.total_files, 1);
    }

    #[test]
    fn disabled_ledger_skips_everything() {
        let tmp = tempdir().expect("tempdir");
        let ledger = Ledger::new(None);
        let file = write_sized_file(tmp.path(), "blob.bin", 16);

        assert!(!ledger.is_enabled());
        ledger.record_upload(1, &file).expect("upload noop");
        ledger.record_deletion(1).expect("delete noop");
        assert!(ledger.summary().expect("summary").is_none());
    }

    #[test]
    fn malformed_ledger_surfaces_parse_error() {
        let tmp = tempdir().expect("tempdir");
        let (ledger, path) = ledger_in(tmp.path());
        fs::create_dir_all(path.parent().expect("parent")).expect("mkdir");
        fs::write(&path, "{not json").expect("write garbage");

        let err = ledger.summary().expect_err("must fail");
        assert!(matches!(err, VaultError::Parse { .. }));

        let file = write_sized_file(tmp.path(), "blob.bin", 8);
        let err = ledger.record_upload(1, &file).expect_err("must fail");
        assert!(matches!(err, VaultError::Parse { .. }));
    }

    #[test]
    fn load_trusts_persisted_total_size() {
        let tmp = tempdir().expect("tempdir");
        let (ledger, path) = ledger_in(tmp.path());
        fs::create_dir_all(path.parent().expect("parent")).expect("mkdir");
        // Hand-edited total deliberately out of sync with `files`.
        fs::write(&path, r#"{"total_size": 777, "files": {}}"#).expect("seed");

        let summary = ledger.summary().expect("summary").expect("enabled");
        assert_eq!(summary.total_size, 777);
    }

    #[test]
    fn serialized_entry_matches_published_schema() {
        let tmp = tempdir().expect("tempdir");
        let (ledger, path) = ledger_in(tmp.path());
        let file = write_sized_file(tmp.path(), "report.pdf", 1024);
        ledger.record_upload(5, &file).expect("upload");

        let raw = fs::read_to_string(&path).expect("read");
        let value: serde_json::Value = serde_json::from_str(&raw).expect("json");
        let entry = &value["files"]["5"];
        assert_eq!(entry["message_id"], 5);
        assert_eq!(entry["file_name"], "report.pdf");
        assert_eq!(entry["size_bytes"], 1024);
        assert_eq!(entry["deleted"], false);
        assert!(entry["deletion_date"].is_null());
        assert!(entry["upload_date"].is_string());
    }
}
