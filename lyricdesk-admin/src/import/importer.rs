//! Batch importer
//!
//! Runs normalize → dedupe → insert over one import call. Every record keeps
//! its original index from the moment it is read, so outcome entries always
//! point into the caller's input even after invalid and duplicate records
//! have been filtered out.
//!
//! Inserts are attempted as one batch first. If the batch is rejected the
//! queued records are retried one at a time, and each rejection is reported
//! against its own record.

use async_trait::async_trait;
use lyricdesk_common::config::ImportConfig;
use lyricdesk_common::db::{Category, ExistingSong, NewSong};
use lyricdesk_common::Result;
use serde::Serialize;
use tracing::{debug, info, warn};

use super::dedup::{distinct_titles, DuplicateDetector};
use super::normalize::{normalize, NormalizeContext};
use super::source::{RawRecord, RequestError};
use crate::catalog::CatalogStore;

// ========================================
// Store seam
// ========================================

/// Catalog operations the importer needs
#[async_trait]
pub trait ImportTarget: Send + Sync {
    /// Categories for CSV name resolution
    async fn import_categories(&self) -> Result<Vec<Category>>;

    /// Stored (title, artist) pairs whose title matches one of `titles`
    async fn existing_songs(&self, titles: &[String]) -> Result<Vec<ExistingSong>>;

    /// All-or-nothing insert
    async fn insert_batch(&self, songs: &[NewSong]) -> Result<()>;
}

#[async_trait]
impl<T: CatalogStore + ?Sized> ImportTarget for T {
    async fn import_categories(&self) -> Result<Vec<Category>> {
        self.list_categories().await
    }

    async fn existing_songs(&self, titles: &[String]) -> Result<Vec<ExistingSong>> {
        self.find_existing(titles).await
    }

    async fn insert_batch(&self, songs: &[NewSong]) -> Result<()> {
        self.insert_songs(songs).await
    }
}

// ========================================
// Outcome
// ========================================

/// A record that failed validation or persistence
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RecordError {
    pub index: usize,
    pub error: String,
}

/// A record skipped as a duplicate
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RecordSkip {
    pub index: usize,
    pub reason: String,
}

/// Per-call result: every input index is inserted, errored or skipped
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ImportOutcome {
    pub inserted: usize,
    pub errors: Vec<RecordError>,
    pub skipped: Vec<RecordSkip>,
}

impl ImportOutcome {
    /// True when every record was inserted
    pub fn is_complete(&self) -> bool {
        self.errors.is_empty() && self.skipped.is_empty()
    }

    /// Number of input records accounted for
    pub fn total(&self) -> usize {
        self.inserted + self.errors.len() + self.skipped.len()
    }

    /// One-line summary with the first `preview` errors spelled out
    pub fn summary(&self, preview: usize) -> String {
        if !self.errors.is_empty() {
            let shown: Vec<String> = self
                .errors
                .iter()
                .take(preview)
                .map(|e| format!("#{}: {}", e.index, e.error))
                .collect();
            format!(
                "Imported {} with {} error(s): {} and skipped {}",
                self.inserted,
                self.errors.len(),
                shown.join(" | "),
                self.skipped.len()
            )
        } else if !self.skipped.is_empty() {
            format!(
                "Imported {} song(s), skipped {} duplicate(s)",
                self.inserted,
                self.skipped.len()
            )
        } else {
            format!("Imported {} song(s)", self.inserted)
        }
    }

    fn error(&mut self, index: usize, error: impl Into<String>) {
        self.errors.push(RecordError {
            index,
            error: error.into(),
        });
    }

    fn skip(&mut self, index: usize, reason: &str) {
        self.skipped.push(RecordSkip {
            index,
            reason: reason.to_string(),
        });
    }
}

// ========================================
// Importer
// ========================================

/// Importer settings
#[derive(Debug, Clone)]
pub struct ImportOptions {
    pub csv_language: String,
    pub dedupe_within_batch: bool,
}

impl Default for ImportOptions {
    fn default() -> Self {
        Self::from(&ImportConfig::default())
    }
}

impl From<&ImportConfig> for ImportOptions {
    fn from(config: &ImportConfig) -> Self {
        Self {
            csv_language: config.csv_language.clone(),
            dedupe_within_batch: config.dedupe_within_batch,
        }
    }
}

pub struct BatchImporter<'a, S: ImportTarget + ?Sized> {
    store: &'a S,
    options: ImportOptions,
}

impl<'a, S: ImportTarget + ?Sized> BatchImporter<'a, S> {
    pub fn new(store: &'a S, options: ImportOptions) -> Self {
        Self { store, options }
    }

    /// Import `records`, whose positions are their original indices
    ///
    /// Only an empty input fails the call; everything else is reported per
    /// record in the outcome.
    pub async fn run(&self, records: Vec<RawRecord>) -> std::result::Result<ImportOutcome, RequestError> {
        if records.is_empty() {
            return Err(RequestError::MissingData);
        }
        let total = records.len();
        let mut outcome = ImportOutcome::default();

        // Step 1: normalize
        let categories = if records.iter().any(RawRecord::is_csv) {
            self.load_categories().await
        } else {
            Vec::new()
        };
        let ctx = NormalizeContext {
            categories: &categories,
            csv_language: &self.options.csv_language,
        };

        let mut normalized: Vec<(usize, NewSong)> = Vec::with_capacity(total);
        for (index, record) in records.iter().enumerate() {
            match normalize(record, &ctx) {
                Ok(song) => normalized.push((index, song)),
                Err(e) => {
                    debug!(index, error = %e, "Record failed validation");
                    outcome.error(index, e.to_string());
                }
            }
        }

        // Step 2: existing songs sharing a title with the batch
        let titles = distinct_titles(normalized.iter().map(|(_, song)| song));
        let existing = self.load_existing(&titles).await;

        // Step 3: dedupe in original order
        let mut detector = DuplicateDetector::new(&existing, self.options.dedupe_within_batch);
        let mut queued: Vec<(usize, NewSong)> = Vec::with_capacity(normalized.len());
        for (index, song) in normalized {
            match detector.classify(&song) {
                Some(reason) => {
                    debug!(index, title = %song.title, "Skipping duplicate");
                    outcome.skip(index, reason);
                }
                None => queued.push((index, song)),
            }
        }

        // Step 4: batch, then row-by-row on failure
        if !queued.is_empty() {
            self.insert_queued(queued, &mut outcome).await;
        }

        outcome.errors.sort_by_key(|e| e.index);
        debug_assert_eq!(outcome.total(), total);
        info!(
            records = total,
            inserted = outcome.inserted,
            errors = outcome.errors.len(),
            skipped = outcome.skipped.len(),
            "Import finished"
        );
        Ok(outcome)
    }

    async fn load_categories(&self) -> Vec<Category> {
        match self.store.import_categories().await {
            Ok(categories) => categories,
            Err(e) => {
                warn!(error = %e, "Could not load categories, CSV categories will be left unset");
                Vec::new()
            }
        }
    }

    async fn load_existing(&self, titles: &[String]) -> Vec<ExistingSong> {
        if titles.is_empty() {
            return Vec::new();
        }
        match self.store.existing_songs(titles).await {
            Ok(existing) => existing,
            Err(e) => {
                warn!(error = %e, "Existing-song lookup failed, importing without duplicate check");
                Vec::new()
            }
        }
    }

    async fn insert_queued(&self, queued: Vec<(usize, NewSong)>, outcome: &mut ImportOutcome) {
        let (indices, songs): (Vec<usize>, Vec<NewSong>) = queued.into_iter().unzip();

        match self.store.insert_batch(&songs).await {
            Ok(()) => {
                outcome.inserted += songs.len();
                return;
            }
            Err(e) => {
                warn!(
                    batch = songs.len(),
                    error = %e,
                    "Batch insert failed, falling back to row-by-row inserts"
                );
            }
        }

        for (index, song) in indices.into_iter().zip(songs.iter()) {
            match self.store.insert_batch(std::slice::from_ref(song)).await {
                Ok(()) => outcome.inserted += 1,
                Err(e) => {
                    debug!(index, error = %e, "Record insert failed");
                    outcome.error(index, e.record_message());
                }
            }
        }
    }
}
