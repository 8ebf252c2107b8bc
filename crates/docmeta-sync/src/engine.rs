//! Delta metadata engine
//!
//! The [`DeltaEngine`] walks the delta feed of one document library and
//! writes generated metadata back into each file's list-item fields.
//!
//! ## Run Flow
//!
//! 1. **Bind**: load the cursor, resolve site and drive ids when missing or
//!    when the configured drive name no longer matches the persisted one
//! 2. **Walk**: fetch pages one at a time from the resume link, fan each
//!    page's eligible files out to a bounded pool of workers
//! 3. **Bookkeeping**: write one record per processed item, persist the new
//!    cursor, return a [`RunSummary`]
//!
//! ## Cursor Rules
//!
//! A pass cut short by the per-run item cap persists the page's next link
//! as a continuation; when the cap falls on the last page of a pass nothing
//! is written, so the next run replays that page. A completed pass persists
//! the delta link. A run that observed neither leaves the stored cursor
//! untouched, and a cancelled run never writes it.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use docmeta_core::config::Config;
use docmeta_core::domain::{
    filter_empty_fields, find_field, restrict_to, CursorState, DriveItem, FieldMap, ItemOutcome,
    MetadataRecord, OutcomeStatus,
};
use docmeta_core::ports::{
    GeneratorInput, ICursorStore, IDocumentLibrary, IMetadataGenerator, IRecordSink,
    LibraryError,
};

use crate::SyncError;

// ============================================================================
// RunSummary
// ============================================================================

/// Counts and flags describing one engine run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    /// Eligible items handed to workers
    pub processed: usize,
    pub updated: usize,
    pub skipped: usize,
    pub failed: usize,
    /// Delta pages fetched
    pub pages: usize,
    /// Whether a new cursor was written
    pub cursor_saved: bool,
    /// The run stopped on the cancellation token
    pub cancelled: bool,
    /// The engine is disabled by configuration and did nothing
    pub disabled: bool,
    /// Wall-clock duration of the run in milliseconds
    pub duration_ms: u64,
}

impl RunSummary {
    fn disabled() -> Self {
        Self {
            disabled: true,
            ..Self::default()
        }
    }

    fn tally(&mut self, outcome: &ItemOutcome) {
        self.processed += 1;
        match outcome.status {
            OutcomeStatus::Updated => self.updated += 1,
            OutcomeStatus::Skipped => self.skipped += 1,
            OutcomeStatus::Failed => self.failed += 1,
        }
    }
}

// ============================================================================
// EngineSettings
// ============================================================================

/// The slice of [`Config`] the engine reads
#[derive(Debug, Clone)]
pub struct EngineSettings {
    pub enabled: bool,
    pub max_workers: usize,
    pub max_items_per_run: usize,
    pub site_url: String,
    pub drive_name: String,
    /// Subfolder the walk is scoped to, `None` for the drive root
    pub folder_path: Option<String>,
    /// Field names to keep; empty keeps everything
    pub include_fields: Vec<String>,
    /// Write every generated field even when already filled remotely
    pub force_update: bool,
}

impl From<&Config> for EngineSettings {
    fn from(config: &Config) -> Self {
        Self {
            enabled: config.delta.enabled,
            max_workers: config.delta.max_workers,
            max_items_per_run: config.library.max_items_per_run,
            site_url: config.library.site_url.clone(),
            drive_name: config.library.drive_name.clone(),
            folder_path: config.library.folder().map(str::to_string),
            include_fields: config.library.include_fields.clone(),
            force_update: config.library.force_update,
        }
    }
}

// ============================================================================
// DeltaEngine
// ============================================================================

/// Site and drive binding for one run
#[derive(Debug, Clone)]
struct Binding {
    site_id: String,
    drive_id: String,
    /// Link persisted by a previous run, if it still applies to this drive
    resume_link: Option<String>,
}

/// Delta metadata synchronization engine
///
/// ## Dependencies
///
/// - `library`: remote document library (pages, item detail, field writes)
/// - `cursor_store`: persisted position in the delta feed
/// - `sink`: append-only output of processed item records
/// - `generator`: derivation of the business fields for one file
pub struct DeltaEngine {
    library: Arc<dyn IDocumentLibrary>,
    cursor_store: Arc<dyn ICursorStore>,
    sink: Arc<dyn IRecordSink>,
    generator: Arc<dyn IMetadataGenerator>,
    settings: Arc<EngineSettings>,
}

impl DeltaEngine {
    /// Creates a new `DeltaEngine` with the given ports
    pub fn new(
        library: Arc<dyn IDocumentLibrary>,
        cursor_store: Arc<dyn ICursorStore>,
        sink: Arc<dyn IRecordSink>,
        generator: Arc<dyn IMetadataGenerator>,
        settings: EngineSettings,
    ) -> Self {
        Self {
            library,
            cursor_store,
            sink,
            generator,
            settings: Arc::new(settings),
        }
    }

    pub fn settings(&self) -> &EngineSettings {
        &self.settings
    }

    // ========================================================================
    // Run
    // ========================================================================

    /// Performs one run over the delta feed.
    ///
    /// Cancellation is not an error: the returned summary carries
    /// `cancelled = true` and the partial counts, and the cursor is left as
    /// it was. Configuration problems and failures to fetch a page or to
    /// touch the cursor store are returned as errors.
    #[tracing::instrument(skip(self, cancel))]
    pub async fn run_once(&self, cancel: &CancellationToken) -> Result<RunSummary, SyncError> {
        if !self.settings.enabled {
            debug!("Delta engine disabled, skipping run");
            return Ok(RunSummary::disabled());
        }

        let start = Instant::now();
        let mut summary = RunSummary::default();

        let result = self.run_inner(&mut summary, cancel).await;
        summary.duration_ms = start.elapsed().as_millis() as u64;

        match result {
            Ok(()) => {
                info!(
                    processed = summary.processed,
                    updated = summary.updated,
                    skipped = summary.skipped,
                    failed = summary.failed,
                    pages = summary.pages,
                    cursor_saved = summary.cursor_saved,
                    duration_ms = summary.duration_ms,
                    "Delta run completed"
                );
                Ok(summary)
            }
            Err(SyncError::Cancelled) => {
                summary.cancelled = true;
                warn!(
                    processed = summary.processed,
                    pages = summary.pages,
                    "Delta run cancelled, cursor not saved"
                );
                Ok(summary)
            }
            Err(e) => {
                error!(error = %e, processed = summary.processed, "Delta run failed");
                Err(e)
            }
        }
    }

    async fn run_inner(
        &self,
        summary: &mut RunSummary,
        cancel: &CancellationToken,
    ) -> Result<(), SyncError> {
        let state = self
            .cursor_store
            .load()
            .await
            .map_err(SyncError::CursorStore)?;

        let binding = self.bind(state.as_ref(), cancel).await?;
        let initial_link = self
            .library
            .initial_delta_link(&binding.drive_id, self.settings.folder_path.as_deref());

        let cap = self.settings.max_items_per_run;
        let mut resumed = binding.resume_link.is_some();
        let mut link = Some(binding.resume_link.clone().unwrap_or_else(|| initial_link.clone()));
        let mut last_next: Option<String> = None;
        let mut last_delta: Option<String> = None;

        while let Some(current) = link.take() {
            if summary.processed >= cap {
                break;
            }
            if cancel.is_cancelled() {
                return Err(SyncError::Cancelled);
            }

            let page = match self.library.fetch_page(&current, cancel).await {
                Ok(page) => page,
                Err(LibraryError::CursorExpired(_)) if resumed => {
                    warn!("Persisted delta link expired, performing full resync");
                    resumed = false;
                    link = Some(initial_link.clone());
                    continue;
                }
                Err(e) => return Err(e.into()),
            };
            resumed = false;
            summary.pages += 1;

            last_next = page.next_link.clone();
            last_delta = page.delta_link.clone();

            let remaining = cap - summary.processed;
            let items: Vec<DriveItem> = page.eligible_items().take(remaining).cloned().collect();

            debug!(
                page = summary.pages,
                total = page.items.len(),
                eligible = items.len(),
                "Processing delta page"
            );

            let outcomes = self.process_page(&binding.drive_id, items, cancel).await;
            for outcome in &outcomes {
                summary.tally(outcome);
            }
            self.write_records(outcomes).await;

            if cancel.is_cancelled() {
                return Err(SyncError::Cancelled);
            }

            link = page.next_link;
        }

        let capped = summary.processed >= cap;
        summary.cursor_saved = self
            .persist(&binding, capped, last_next, last_delta)
            .await?;
        Ok(())
    }

    /// Resolves the site and drive ids, reusing persisted ones when valid
    async fn bind(
        &self,
        state: Option<&CursorState>,
        cancel: &CancellationToken,
    ) -> Result<Binding, SyncError> {
        let site_id = match state.and_then(CursorState::site_id) {
            Some(id) => id.to_string(),
            None => {
                self.library
                    .resolve_site_id(&self.settings.site_url, cancel)
                    .await?
            }
        };

        let drive_name = &self.settings.drive_name;
        match state.and_then(|s| s.drive_id_for(drive_name)) {
            Some(drive_id) => Ok(Binding {
                site_id,
                drive_id: drive_id.to_string(),
                resume_link: state.and_then(CursorState::resume_link).map(str::to_string),
            }),
            None => {
                if state.and_then(CursorState::resume_link).is_some() {
                    info!(drive_name, "Drive changed, discarding persisted delta links");
                }
                let drive_id = self
                    .library
                    .resolve_drive_id(&site_id, drive_name, cancel)
                    .await?;
                Ok(Binding {
                    site_id,
                    drive_id,
                    resume_link: None,
                })
            }
        }
    }

    /// Writes the cursor for this run; returns whether anything was saved
    ///
    /// A capped run only ever saves the next link: the delta link of a page
    /// it did not finish would skip that page's remaining items.
    async fn persist(
        &self,
        binding: &Binding,
        capped: bool,
        last_next: Option<String>,
        last_delta: Option<String>,
    ) -> Result<bool, SyncError> {
        let (continuation_link, delta_link) = match (last_next, last_delta) {
            (Some(next), _) => (Some(next), None),
            (None, _) if capped => {
                debug!("Item cap reached on the last page, cursor left untouched");
                return Ok(false);
            }
            (None, Some(delta)) => (None, Some(delta)),
            (None, None) => {
                debug!("No continuation or delta link observed, cursor left untouched");
                return Ok(false);
            }
        };

        let state = CursorState {
            continuation_link,
            delta_link,
            site_id: Some(binding.site_id.clone()),
            drive_id: Some(binding.drive_id.clone()),
            drive_name: Some(self.settings.drive_name.clone()),
            saved_at: Utc::now(),
        };

        self.cursor_store
            .save(&state)
            .await
            .map_err(SyncError::CursorStore)?;

        info!(
            resumes_from_delta = state.resumes_from_delta(),
            "Delta cursor saved"
        );
        Ok(true)
    }

    // ========================================================================
    // Fan-out
    // ========================================================================

    /// Processes one page's items on at most `max_workers` concurrent tasks
    ///
    /// Items interrupted by cancellation yield no outcome. A task that
    /// panics yields a `Failed` outcome for its item.
    async fn process_page(
        &self,
        drive_id: &str,
        items: Vec<DriveItem>,
        cancel: &CancellationToken,
    ) -> Vec<ItemOutcome> {
        if items.is_empty() {
            return Vec::new();
        }

        let semaphore = Arc::new(Semaphore::new(self.settings.max_workers.max(1)));
        let mut pending: HashSet<String> = HashSet::with_capacity(items.len());
        let mut tasks = JoinSet::new();

        for item in items {
            pending.insert(item.id.clone());

            let worker = ItemWorker {
                library: Arc::clone(&self.library),
                generator: Arc::clone(&self.generator),
                settings: Arc::clone(&self.settings),
            };
            let semaphore = Arc::clone(&semaphore);
            let drive_id = drive_id.to_string();
            let cancel = cancel.clone();

            tasks.spawn(async move {
                let outcome = match semaphore.acquire_owned().await {
                    Ok(_permit) => worker.process(&drive_id, &item, &cancel).await,
                    Err(_) => None,
                };
                (item.id, outcome)
            });
        }

        let mut outcomes = Vec::with_capacity(pending.len());
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((item_id, outcome)) => {
                    pending.remove(&item_id);
                    outcomes.extend(outcome);
                }
                Err(e) => warn!(error = %e, "Item worker task failed"),
            }
        }

        // Whatever is still pending belongs to a task that panicked
        for item_id in pending {
            warn!(item_id = %item_id, "Item worker panicked");
            outcomes.push(ItemOutcome::failed(item_id, "worker task panicked"));
        }

        outcomes
    }

    /// Writes records one at a time; failures are logged and skipped
    async fn write_records(&self, outcomes: Vec<ItemOutcome>) {
        for record in outcomes.into_iter().filter_map(|o| o.record) {
            if let Err(e) = self.sink.write(&record).await {
                warn!(item_id = %record.item_id, error = %e, "Failed to write record");
            }
        }
    }
}

// ============================================================================
// ItemWorker
// ============================================================================

/// Per-item processing, cloned into each spawned task
struct ItemWorker {
    library: Arc<dyn IDocumentLibrary>,
    generator: Arc<dyn IMetadataGenerator>,
    settings: Arc<EngineSettings>,
}

impl ItemWorker {
    /// Returns `None` when the item was interrupted by cancellation
    async fn process(
        &self,
        drive_id: &str,
        item: &DriveItem,
        cancel: &CancellationToken,
    ) -> Option<ItemOutcome> {
        match self.try_process(drive_id, item, cancel).await {
            Ok(outcome) => Some(outcome),
            Err(LibraryError::Cancelled) => None,
            Err(e) => {
                warn!(item_id = %item.id, error = %e, "Item processing failed");
                Some(ItemOutcome::failed(&item.id, e.to_string()))
            }
        }
    }

    async fn try_process(
        &self,
        drive_id: &str,
        item: &DriveItem,
        cancel: &CancellationToken,
    ) -> Result<ItemOutcome, LibraryError> {
        let detail = self.library.get_item_detail(drive_id, &item.id, cancel).await?;

        let input = GeneratorInput {
            file_name: item.name.clone(),
            parent_path: item.parent_path.clone(),
            size: detail.size,
            created_at: detail.created_at,
            modified_at: item.last_modified_utc,
            created_by: detail.created_by.clone(),
            now: Utc::now(),
        };

        let include = &self.settings.include_fields;
        let generated = restrict_to(&self.generator.generate(&input), include);
        let updates = filter_empty_fields(&generated, &detail.fields, self.settings.force_update);
        let mut fields = restrict_to(&detail.fields, include);

        if updates.is_empty() {
            debug!(item_id = %item.id, "All generated fields already filled");
            return Ok(ItemOutcome::skipped(
                &item.id,
                MetadataRecord::from_item(item, fields),
            ));
        }

        if !self
            .library
            .update_fields(drive_id, &item.id, &updates, cancel)
            .await?
        {
            return Ok(ItemOutcome::failed(&item.id, "field update was rejected"));
        }

        debug!(item_id = %item.id, count = updates.len(), "Fields updated");
        merge_fields(&mut fields, updates);
        Ok(ItemOutcome::updated(
            &item.id,
            MetadataRecord::from_item(item, fields),
        ))
    }
}

/// Overlays `updates` on `fields`, replacing keys that match case-insensitively
fn merge_fields(fields: &mut FieldMap, updates: FieldMap) {
    for (key, value) in updates {
        if find_field(fields, &key).is_some() && !fields.contains_key(&key) {
            fields.retain(|existing, _| !existing.eq_ignore_ascii_case(&key));
        }
        fields.insert(key, value);
    }
}

// ============================================================================
// Tests
// ============================================================================
