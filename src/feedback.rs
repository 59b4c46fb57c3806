// src/feedback.rs
//! The user feedback log: `(Reviews, Comments)` rows in a two-column CSV.

use chrono::Local;
use csv::{ReaderBuilder, WriterBuilder};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use std::fs::{self, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, OnceLock};
use tracing::{debug, info};

use crate::error::{RecommendError, Result};
use crate::rating::{to_bubbles, Stars, MAX_RATING};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedbackEntry {
    #[serde(rename = "Reviews")]
    pub reviews: String,
    #[serde(rename = "Comments", default)]
    pub comment: String,
}

impl FeedbackEntry {
    pub fn new(rating: u8, comment: &str) -> Result<Self> {
        if !(1..=MAX_RATING).contains(&rating) {
            return Err(RecommendError::InvalidRating(rating));
        }
        let comment = comment.trim();
        if comment.is_empty() {
            return Err(RecommendError::EmptyComment);
        }
        Ok(Self {
            reviews: to_bubbles(rating),
            comment: comment.to_string(),
        })
    }

    pub fn stars(&self) -> Stars {
        Stars::from_bubbles(&self.reviews)
    }
}

/// Storage for submitted feedback. Rows are identified by their position in
/// the latest snapshot.
pub trait FeedbackStore {
    fn append(&self, entry: &FeedbackEntry) -> Result<()>;
    fn snapshot(&self) -> Result<Vec<FeedbackEntry>>;
    /// Removes the rows at `indices`; returns how many were removed.
    fn delete(&self, indices: &BTreeSet<usize>) -> Result<usize>;

    /// The last `limit` entries paired with their snapshot index.
    fn recent(&self, limit: usize) -> Result<Vec<(usize, FeedbackEntry)>> {
        let all = self.snapshot()?;
        let skip = all.len().saturating_sub(limit);
        Ok(all.into_iter().enumerate().skip(skip).collect())
    }
}

/// One writer lock per log file, shared by every handle in the process.
fn write_lock_for(path: &Path) -> Arc<Mutex<()>> {
    static LOCKS: OnceLock<Mutex<HashMap<PathBuf, Arc<Mutex<()>>>>> = OnceLock::new();
    let mut locks = LOCKS
        .get_or_init(Default::default)
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner());
    locks.entry(path.to_path_buf()).or_default().clone()
}

fn is_empty_file(path: &Path) -> Result<bool> {
    match fs::metadata(path) {
        Ok(meta) => Ok(meta.len() == 0),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(true),
        Err(e) => Err(RecommendError::io(path, e)),
    }
}

/// CSV-backed log. Handles opened on the same file share one writer lock;
/// deletes rewrite into a sibling file and rename it over the log.
pub struct CsvFeedbackLog {
    path: PathBuf,
    write_lock: Arc<Mutex<()>>,
}

impl CsvFeedbackLog {
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| RecommendError::io(parent, e))?;
        }
        // create without truncating so the path can be canonicalized
        OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(|e| RecommendError::io(&path, e))?;
        let key = fs::canonicalize(&path).map_err(|e| RecommendError::io(&path, e))?;

        let log = Self {
            path,
            write_lock: write_lock_for(&key),
        };
        log.ensure_header()?;
        Ok(log)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn lock(&self) -> MutexGuard<'_, ()> {
        // the guarded data is (), so a poisoned lock carries no broken state
        self.write_lock.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn ensure_header(&self) -> Result<()> {
        let _guard = self.lock();
        if is_empty_file(&self.path)? {
            self.write_all(&self.path, &[])?;
            debug!(path = %self.path.display(), "wrote feedback log header");
        }
        Ok(())
    }

    fn write_all(&self, path: &Path, entries: &[FeedbackEntry]) -> Result<()> {
        let mut wtr = WriterBuilder::new()
            .has_headers(false)
            .from_path(path)
            .map_err(|e| RecommendError::csv(path, e))?;
        wtr.write_record(["Reviews", "Comments"])
            .map_err(|e| RecommendError::csv(path, e))?;
        for entry in entries {
            wtr.serialize(entry).map_err(|e| RecommendError::csv(path, e))?;
        }
        wtr.flush().map_err(|e| RecommendError::io(path, e))
    }
}

impl FeedbackStore for CsvFeedbackLog {
    fn append(&self, entry: &FeedbackEntry) -> Result<()> {
        let _guard = self.lock();
        let needs_header = is_empty_file(&self.path)?;

        let csv_file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|e| RecommendError::io(&self.path, e))?;

        let mut wtr = WriterBuilder::new().has_headers(needs_header).from_writer(csv_file);
        wtr.serialize(entry).map_err(|e| RecommendError::csv(&self.path, e))?;
        wtr.flush().map_err(|e| RecommendError::io(&self.path, e))?;

        info!(reviews = %entry.reviews, "appended feedback");
        Ok(())
    }

    fn snapshot(&self) -> Result<Vec<FeedbackEntry>> {
        let mut rdr = ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_path(&self.path)
            .map_err(|e| RecommendError::csv(&self.path, e))?;
        rdr.deserialize()
            .collect::<std::result::Result<Vec<FeedbackEntry>, _>>()
            .map_err(|e| RecommendError::csv(&self.path, e))
    }

    fn delete(&self, indices: &BTreeSet<usize>) -> Result<usize> {
        if indices.is_empty() {
            return Ok(0);
        }
        let _guard = self.lock();
        let before = self.snapshot()?;
        let kept: Vec<FeedbackEntry> = before
            .iter()
            .enumerate()
            .filter(|(i, _)| !indices.contains(i))
            .map(|(_, e)| e.clone())
            .collect();
        let removed = before.len() - kept.len();
        if removed == 0 {
            return Ok(0);
        }

        let stamp = Local::now().format("%Y%m%d%H%M%S%f").to_string();
        let mut tmp_name = self.path.as_os_str().to_os_string();
        tmp_name.push(format!(".{}.tmp", stamp));
        let tmp_path = PathBuf::from(tmp_name);

        self.write_all(&tmp_path, &kept)?;
        fs::rename(&tmp_path, &self.path).map_err(|e| RecommendError::io(&self.path, e))?;

        info!(removed, remaining = kept.len(), "deleted feedback rows");
        Ok(removed)
    }
}
