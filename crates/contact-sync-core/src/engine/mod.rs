//! Contact reconciliation engine
//!
//! The ContactSyncEngine is responsible for:
//! - Fetching the remote directory once per run
//! - Binding unbound local records (match or create)
//! - Inferring types of untyped remote entries
//! - Diffing every tracked field against the last synced snapshot
//! - Pushing local edits, pulling remote edits, persisting the new snapshot
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────┐        ┌───────────────────┐
//! │ LocalContactStore│        │RemoteContactService│
//! └──────────────────┘        └───────────────────┘
//!          │ list_syncable              │ list (once)
//!          ▼                            ▼
//!                ┌───────────────────┐
//!                │ ContactSyncEngine │
//!                └───────────────────┘
//!                          │
//!       ┌──────────────────┼──────────────────┐
//!       ▼                  ▼                  ▼
//! ┌───────────┐     ┌──────────────┐    ┌───────────┐
//! │  Matcher  │     │TypeInference │    │  Events   │
//! │ (unbound) │     │ + HashTracker│    │ (notify)  │
//! └───────────┘     └──────────────┘    └───────────┘
//! ```
//!
//! ## Per-Record Flow
//!
//! 1. Load (or create) the record's SyncRecord
//! 2. On reset, delete the bound remote contact and clear the record
//! 3. Unbound: bind to the best match, or create and finish
//! 4. Bound: infer types, diff, pull, push, store the new snapshot
//!
//! A failing record is recorded in the [`SyncContext`] and the run moves on.

mod context;

pub use context::{Conflict, FieldChange, IssueKind, SyncContext, SyncIssue};

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::{Mutex, mpsc};
use tracing::{debug, error, info, warn};

use crate::config::SyncConfig;
use crate::contact::{LocalContact, LocalId, RemoteContact};
use crate::convert::to_remote;
use crate::error::{Error, Result};
use crate::fields::{EMPTY_HASH, FieldHashTracker, TrackedField};
use crate::inference::TypeInferenceResolver;
use crate::matcher::Matcher;
use crate::snapshot::SnapshotCache;
use crate::state::open_store;
use crate::traits::{LocalContactStore, RemoteContactService, SyncRecord, SyncRecordStore};

/// Events emitted by the ContactSyncEngine
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncEvent {
    /// Run started
    RunStarted { reset: bool },

    /// Unbound record bound to an existing remote contact
    RecordBound {
        local_id: LocalId,
        remote_id: String,
        score: u32,
    },

    /// Remote contact created for an unmatched record
    RemoteCreated { local_id: LocalId, remote_id: String },

    /// Local edits pushed to the remote contact
    RemoteUpdated {
        local_id: LocalId,
        remote_id: String,
        fields: Vec<TrackedField>,
    },

    /// Remote contact deleted by a reset
    RemoteDeleted { local_id: LocalId, remote_id: String },

    /// Remote edits pulled into the local record
    LocalUpdated {
        local_id: LocalId,
        fields: Vec<TrackedField>,
    },

    /// Field changed on both sides, local value pushed
    ConflictResolved {
        local_id: LocalId,
        field: TrackedField,
    },

    /// Record left unreconciled
    RecordFailed {
        local_id: LocalId,
        kind: IssueKind,
        error: String,
    },

    /// Run finished
    RunFinished {
        processed: usize,
        created: usize,
        updated: usize,
        deleted: usize,
        issues: usize,
    },
}

/// Remote directory view shared by all records of one run
struct RunState {
    /// Every fetched contact by id
    directory: HashMap<String, RemoteContact>,
    /// Matcher candidates: contacts not bound to any record
    available: Vec<RemoteContact>,
    /// Set once anything was written to the remote side
    remote_changed: bool,
}

impl RunState {
    fn new(contacts: Vec<RemoteContact>, claimed: &HashSet<String>, sort: bool) -> Self {
        let mut contacts: Vec<RemoteContact> = contacts
            .into_iter()
            .filter(|contact| {
                if contact.id.is_none() {
                    warn!("Ignoring remote contact '{}' without id", contact.name);
                }
                contact.id.is_some()
            })
            .collect();
        if sort {
            contacts.sort_by(|a, b| a.id.cmp(&b.id));
        }

        let available = contacts
            .iter()
            .filter(|c| c.id.as_ref().is_some_and(|id| !claimed.contains(id)))
            .cloned()
            .collect();
        let directory = contacts
            .into_iter()
            .filter_map(|c| c.id.clone().map(|id| (id, c)))
            .collect();

        Self {
            directory,
            available,
            remote_changed: false,
        }
    }

    /// Take a contact out of the candidate list
    fn claim(&mut self, remote_id: &str) {
        self.available.retain(|c| c.id.as_deref() != Some(remote_id));
    }

    fn forget(&mut self, remote_id: &str) {
        self.claim(remote_id);
        self.directory.remove(remote_id);
        self.remote_changed = true;
    }
}

/// Core reconciliation engine
///
/// Runs are sequential: records are processed one after another against one
/// consistent fetch of the remote directory. Overlapping runs on the same
/// engine are rejected with [`Error::SyncInProgress`].
///
/// ## Lifecycle
///
/// 1. Create with [`ContactSyncEngine::new()`]
/// 2. Call [`ContactSyncEngine::sync()`] for every batch run
/// 3. Consume the returned [`SyncContext`] and the event stream
pub struct ContactSyncEngine {
    remote: Box<dyn RemoteContactService>,
    local: Box<dyn LocalContactStore>,
    records: Box<dyn SyncRecordStore>,

    tracker: FieldHashTracker,
    matcher: Matcher,
    resolver: TypeInferenceResolver,

    /// Sort candidates by remote id before matching
    sort_candidates: bool,

    snapshot_cache: Option<Arc<SnapshotCache>>,

    /// Held for the duration of a run
    run_lock: Mutex<()>,

    /// Event sender for external monitoring
    event_tx: mpsc::Sender<SyncEvent>,
}

impl ContactSyncEngine {
    /// Create a new sync engine
    ///
    /// # Returns
    ///
    /// A tuple of (engine, event_receiver) where event_receiver yields sync events
    pub fn new(
        remote: Box<dyn RemoteContactService>,
        local: Box<dyn LocalContactStore>,
        records: Box<dyn SyncRecordStore>,
        config: SyncConfig,
    ) -> Result<(Self, mpsc::Receiver<SyncEvent>)> {
        config.validate()?;

        let (tx, rx) = mpsc::channel(config.event_channel_capacity);
        let tracker = FieldHashTracker::new(config.country_hint.clone());

        let engine = Self {
            remote,
            local,
            records,
            matcher: Matcher::new(config.country_hint),
            resolver: TypeInferenceResolver::new(tracker.clone()),
            tracker,
            sort_candidates: config.sort_candidates,
            snapshot_cache: None,
            run_lock: Mutex::new(()),
            event_tx: tx,
        };

        Ok((engine, rx))
    }

    /// Create a sync engine whose record store is built from `config.record_store`
    pub async fn from_config(
        remote: Box<dyn RemoteContactService>,
        local: Box<dyn LocalContactStore>,
        config: SyncConfig,
    ) -> Result<(Self, mpsc::Receiver<SyncEvent>)> {
        config.validate()?;
        let records = open_store(&config.record_store).await?;
        Self::new(remote, local, records, config)
    }

    /// Refresh this cache after runs that changed the remote directory
    pub fn with_snapshot_cache(mut self, cache: Arc<SnapshotCache>) -> Self {
        self.snapshot_cache = Some(cache);
        self
    }

    pub fn snapshot_cache(&self) -> Option<&Arc<SnapshotCache>> {
        self.snapshot_cache.as_ref()
    }

    /// Delete every bound remote contact and sync all records from scratch
    pub async fn reset(&self) -> Result<SyncContext> {
        self.sync(true).await
    }

    /// Run one full sync
    ///
    /// # Returns
    ///
    /// - `Ok(SyncContext)`: The run summary, including per-record failures
    /// - `Err(Error::SyncInProgress)`: Another run is active on this engine
    pub async fn sync(&self, reset: bool) -> Result<SyncContext> {
        let _run = self.run_lock.try_lock().map_err(|_| Error::SyncInProgress)?;

        let mut ctx = SyncContext::new(reset);
        self.emit_event(SyncEvent::RunStarted { reset });
        info!(
            "Starting contact sync against {} (reset: {})",
            self.remote.service_name(),
            reset
        );

        if let Some(mut run) = self.prepare_run(&mut ctx).await {
            match self.local.list_syncable().await {
                Ok(locals) => {
                    for local in locals {
                        self.process_record(local, reset, &mut run, &mut ctx).await;
                    }
                }
                Err(e) => {
                    error!("Failed to list local records: {}", e);
                    ctx.fail(None, &e);
                }
            }

            if run.remote_changed
                && let Some(cache) = &self.snapshot_cache
            {
                cache.invalidate();
                cache.refresh_async().await;
            }
        }

        if let Err(e) = self.records.flush().await {
            error!("Failed to flush sync records: {}", e);
            ctx.fail(None, &e);
        }

        ctx.finish();
        info!(
            "Contact sync finished: {} processed, {} created, {} updated, {} deleted, {} pulled, {} issues",
            ctx.local_processed,
            ctx.remote_created,
            ctx.remote_updated,
            ctx.remote_deleted,
            ctx.local_updated,
            ctx.issues.len()
        );
        self.emit_event(SyncEvent::RunFinished {
            processed: ctx.local_processed,
            created: ctx.remote_created,
            updated: ctx.remote_updated,
            deleted: ctx.remote_deleted,
            issues: ctx.issues.len(),
        });

        Ok(ctx)
    }

    /// Fetch the remote directory and the set of already bound remote ids
    async fn prepare_run(&self, ctx: &mut SyncContext) -> Option<RunState> {
        let contacts = match self.remote.list().await {
            Ok(contacts) => contacts,
            Err(e) => {
                error!("Failed to fetch remote contacts: {}", e);
                ctx.fail(None, &e);
                return None;
            }
        };

        let claimed: HashSet<String> = match self.records.list().await {
            Ok(records) => records.into_iter().filter_map(|r| r.remote_id).collect(),
            Err(e) => {
                error!("Failed to list sync records: {}", e);
                ctx.fail(None, &e);
                return None;
            }
        };

        debug!(
            "Fetched {} remote contacts, {} already bound",
            contacts.len(),
            claimed.len()
        );
        Some(RunState::new(contacts, &claimed, self.sort_candidates))
    }

    async fn process_record(
        &self,
        local: LocalContact,
        reset: bool,
        run: &mut RunState,
        ctx: &mut SyncContext,
    ) {
        ctx.local_processed += 1;
        let local_id = local.id.clone();

        if !local.has_usable_name() {
            warn!("Skipping local record {}: no usable name", local_id);
            self.skip_record(local_id, Error::validation("first and last name are blank"), ctx);
            return;
        }

        if let Err(e) = self.sync_record(local, reset, run, ctx).await {
            error!("Failed to sync local record {}: {}", local_id, e);
            self.skip_record(local_id, e, ctx);
        }
    }

    /// Record a left-over record in the context and the event stream
    fn skip_record(&self, local_id: LocalId, error: Error, ctx: &mut SyncContext) {
        ctx.skipped += 1;
        ctx.fail(Some(&local_id), &error);
        self.emit_event(SyncEvent::RecordFailed {
            local_id,
            kind: error.issue_kind(),
            error: error.to_string(),
        });
    }

    async fn sync_record(
        &self,
        local: LocalContact,
        reset: bool,
        run: &mut RunState,
        ctx: &mut SyncContext,
    ) -> Result<()> {
        let mut record = self
            .records
            .get(&local.id)
            .await?
            .unwrap_or_else(|| SyncRecord::new(local.id.clone()));

        if reset && let Some(remote_id) = record.remote_id.clone() {
            self.remote.delete(&remote_id).await?;
            info!("Deleted remote contact {} of local record {}", remote_id, local.id);
            run.forget(&remote_id);
            ctx.remote_deleted += 1;
            self.emit_event(SyncEvent::RemoteDeleted {
                local_id: local.id.clone(),
                remote_id,
            });

            record.reset();
            self.records.put(&record).await?;
        }

        if let Some(remote_id) = &record.remote_id
            && !run.directory.contains_key(remote_id)
        {
            warn!(
                "Remote contact {} bound to local record {} no longer exists, binding again",
                remote_id, local.id
            );
            record.reset();
        }

        if !record.is_bound() && !self.bind(&local, &mut record, run, ctx).await? {
            return Ok(());
        }

        self.reconcile(local, record, run, ctx).await
    }

    /// Bind an unbound record to a match, or create its remote counterpart
    ///
    /// Returns `true` when the record was bound to an existing contact and
    /// still needs to be reconciled.
    async fn bind(
        &self,
        local: &LocalContact,
        record: &mut SyncRecord,
        run: &mut RunState,
        ctx: &mut SyncContext,
    ) -> Result<bool> {
        let matched = self
            .matcher
            .best_match(&run.available, local)
            .and_then(|m| m.contact.id.clone().map(|id| (id, m.score, m.tied_with)));

        if let Some((remote_id, score, tied_with)) = matched {
            if tied_with > 0 {
                let ambiguity = Error::ambiguous_match(format!(
                    "{} candidates scored {}, bound to {}",
                    tied_with + 1,
                    score,
                    remote_id
                ));
                ctx.fail(Some(&local.id), &ambiguity);
            }

            info!("Bound local record {} to remote contact {}", local.id, remote_id);
            record.bind(remote_id.clone());
            run.claim(&remote_id);
            ctx.bound += 1;
            self.emit_event(SyncEvent::RecordBound {
                local_id: local.id.clone(),
                remote_id,
                score,
            });
            return Ok(true);
        }

        let remote_id = self.remote.create(&to_remote(local)).await?;
        info!("Created remote contact {} for local record {}", remote_id, local.id);
        run.remote_changed = true;
        ctx.remote_created += 1;
        self.emit_event(SyncEvent::RemoteCreated {
            local_id: local.id.clone(),
            remote_id: remote_id.clone(),
        });

        record.bind(remote_id);
        record.mark_synced(self.tracker.snapshot(local));
        self.records.put(record).await?;
        Ok(false)
    }

    /// Diff a bound pair and write the result to both sides
    async fn reconcile(
        &self,
        mut local: LocalContact,
        mut record: SyncRecord,
        run: &mut RunState,
        ctx: &mut SyncContext,
    ) -> Result<()> {
        let remote_id = record
            .remote_id
            .clone()
            .ok_or_else(|| Error::Other(format!("Local record {} is not bound", local.id)))?;
        let mut remote = run
            .directory
            .get(&remote_id)
            .cloned()
            .ok_or_else(|| Error::not_found(format!("Remote contact {}", remote_id)))?;

        self.resolver.resolve(&mut remote, &local, &record.hashes);

        let current = self.tracker.snapshot(&local);
        let drifted = FieldHashTracker::diff(&record.hashes, &current);
        let mut pushed = Vec::new();
        let mut pulled = Vec::new();
        let mut conflicts = Vec::new();

        for field in TrackedField::ALL {
            let prior = record.hash_of(field);
            let local_hash = current.get(&field).copied().unwrap_or(EMPTY_HASH);
            let remote_hash = self.tracker.remote_hash(field, &remote);

            // A field never observed counts as a local edit only if it has a value
            let locally_changed =
                drifted.contains(&field) && (prior.is_some() || local_hash != EMPTY_HASH);

            if locally_changed {
                if remote_hash == local_hash {
                    continue;
                }
                if prior.is_some_and(|prior| prior != remote_hash) {
                    warn!(
                        "Conflict on {} of local record {}: changed on both sides, keeping local value",
                        field, local.id
                    );
                    conflicts.push(Conflict {
                        local_id: local.id.clone(),
                        remote_id: remote_id.clone(),
                        field,
                        local_value: field.local_value(&local),
                        remote_value: field.remote_value(&remote),
                    });
                }
                debug!("Push {} of local record {}", field, local.id);
                pushed.push(field);
            } else if field == TrackedField::Name && remote_hash == EMPTY_HASH {
                // Pulling a blank name would leave a record that can never sync again
                warn!(
                    "Remote contact {} has a blank name, restoring it from local record {}",
                    remote_id, local.id
                );
                pushed.push(field);
            } else if remote_hash != local_hash {
                debug!("Pull {} into local record {}", field, local.id);
                field.apply_to_local(&mut local, field.remote_value(&remote).as_deref());
                pulled.push(field);
            }
        }

        if !pulled.is_empty() {
            self.local.save(&local).await?;
            ctx.local_updated += 1;
            ctx.pulled.extend(pulled.iter().map(|field| FieldChange {
                local_id: local.id.clone(),
                remote_id: remote_id.clone(),
                field: *field,
            }));
            self.emit_event(SyncEvent::LocalUpdated {
                local_id: local.id.clone(),
                fields: pulled.clone(),
            });
        }

        if !pushed.is_empty() {
            for field in &pushed {
                field.apply_to_remote(&mut remote, &local);
            }
            remote.prune_blank_addresses();

            self.remote.update(&remote_id, &remote).await?;
            info!(
                "Updated remote contact {} ({} fields)",
                remote_id,
                pushed.len()
            );
            run.remote_changed = true;
            ctx.remote_updated += 1;
            ctx.pushed.extend(pushed.iter().map(|field| FieldChange {
                local_id: local.id.clone(),
                remote_id: remote_id.clone(),
                field: *field,
            }));
            self.emit_event(SyncEvent::RemoteUpdated {
                local_id: local.id.clone(),
                remote_id: remote_id.clone(),
                fields: pushed.clone(),
            });

            for conflict in &conflicts {
                ctx.issue(
                    IssueKind::Conflict,
                    Some(&local.id),
                    Error::conflict(format!("{} changed on both sides", conflict.field)).to_string(),
                );
                self.emit_event(SyncEvent::ConflictResolved {
                    local_id: local.id.clone(),
                    field: conflict.field,
                });
            }
            ctx.conflicts.extend(conflicts);
            run.directory.insert(remote_id.clone(), remote);
        }

        record.mark_synced(self.tracker.snapshot(&local));
        self.records.put(&record).await?;
        Ok(())
    }

    /// Emit a sync event
    fn emit_event(&self, event: SyncEvent) {
        match self.event_tx.try_send(event) {
            Ok(()) => {}
            Err(mpsc::error::TrySendError::Full(_)) => {
                warn!("Event channel full, dropping event. Consider increasing event_channel_capacity.");
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                debug!("Event receiver dropped, discarding event");
            }
        }
    }
}
