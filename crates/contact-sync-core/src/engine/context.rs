//! Per-run summary returned by [`ContactSyncEngine::sync`]
//!
//! [`ContactSyncEngine::sync`]: super::ContactSyncEngine::sync

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::contact::LocalId;
use crate::error::{Error, Result};
use crate::fields::TrackedField;

/// Category of a recorded issue
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueKind {
    /// A call to the remote directory failed
    TransientNetwork,
    /// Several candidates scored equally; the first one was bound
    AmbiguousMatch,
    /// The local record has no usable name and was skipped
    Validation,
    /// A field changed on both sides; the local value was pushed
    Conflict,
    /// Local store or sync record store failure
    Store,
    Other,
}

impl IssueKind {
    /// True for issues that left a record unreconciled
    pub fn is_failure(&self) -> bool {
        matches!(
            self,
            IssueKind::TransientNetwork | IssueKind::Store | IssueKind::Other
        )
    }
}

/// A recoverable problem met during a run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncIssue {
    pub kind: IssueKind,
    /// Record the issue belongs to; `None` for run-level issues
    pub local_id: Option<LocalId>,
    pub message: String,
}

/// A field written to one side
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldChange {
    pub local_id: LocalId,
    pub remote_id: String,
    pub field: TrackedField,
}

/// A field edited on both sides since the last sync
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Conflict {
    pub local_id: LocalId,
    pub remote_id: String,
    pub field: TrackedField,
    /// The value that was pushed
    pub local_value: Option<String>,
    /// The remote value that was overwritten
    pub remote_value: Option<String>,
}

/// Aggregate of one sync run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncContext {
    /// Whether the run deleted and re-created remote counterparts
    pub reset: bool,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,

    /// Local records looked at, including skipped ones
    pub local_processed: usize,
    /// Local records saved after pulling remote values
    pub local_updated: usize,
    pub remote_created: usize,
    pub remote_updated: usize,
    pub remote_deleted: usize,
    /// Records bound to an existing remote contact by the matcher
    pub bound: usize,
    /// Records left unreconciled (validation or failure)
    pub skipped: usize,

    pub pushed: Vec<FieldChange>,
    pub pulled: Vec<FieldChange>,
    pub conflicts: Vec<Conflict>,
    pub issues: Vec<SyncIssue>,
}

impl SyncContext {
    pub fn new(reset: bool) -> Self {
        Self {
            reset,
            started_at: Utc::now(),
            finished_at: None,
            local_processed: 0,
            local_updated: 0,
            remote_created: 0,
            remote_updated: 0,
            remote_deleted: 0,
            bound: 0,
            skipped: 0,
            pushed: Vec::new(),
            pulled: Vec::new(),
            conflicts: Vec::new(),
            issues: Vec::new(),
        }
    }

    pub fn issue(&mut self, kind: IssueKind, local_id: Option<&LocalId>, message: impl Into<String>) {
        self.issues.push(SyncIssue {
            kind,
            local_id: local_id.cloned(),
            message: message.into(),
        });
    }

    /// Record an error that stopped the processing of one record
    pub fn fail(&mut self, local_id: Option<&LocalId>, error: &Error) {
        self.issue(error.issue_kind(), local_id, error.to_string());
    }

    pub(crate) fn finish(&mut self) {
        self.finished_at = Some(Utc::now());
    }

    /// Every field pushed or pulled during the run
    pub fn changed_fields(&self) -> BTreeSet<TrackedField> {
        self.pushed
            .iter()
            .chain(&self.pulled)
            .map(|change| change.field)
            .collect()
    }

    /// True when the run changed nothing on either side
    pub fn is_noop(&self) -> bool {
        self.remote_created == 0
            && self.remote_updated == 0
            && self.remote_deleted == 0
            && self.local_updated == 0
            && self.bound == 0
    }

    /// True when at least one record failed
    ///
    /// Ambiguous matches, validation skips and conflicts are not failures.
    pub fn has_errors(&self) -> bool {
        self.issues.iter().any(|issue| issue.kind.is_failure())
    }

    pub fn issues_of(&self, kind: IssueKind) -> impl Iterator<Item = &SyncIssue> {
        self.issues.iter().filter(move |issue| issue.kind == kind)
    }

    /// Operator-facing JSON report
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_changed_fields_and_errors() {
        let mut ctx = SyncContext::new(false);
        assert!(ctx.is_noop());
        assert!(!ctx.has_errors());

        let id = LocalId::new("1");
        ctx.pushed.push(FieldChange {
            local_id: id.clone(),
            remote_id: "r".to_string(),
            field: TrackedField::Fax,
        });
        ctx.pulled.push(FieldChange {
            local_id: id.clone(),
            remote_id: "r".to_string(),
            field: TrackedField::Name,
        });
        assert_eq!(
            ctx.changed_fields(),
            BTreeSet::from([TrackedField::Name, TrackedField::Fax])
        );

        ctx.issue(IssueKind::AmbiguousMatch, Some(&id), "two candidates");
        assert!(!ctx.has_errors());

        ctx.fail(Some(&id), &Error::remote("timeout"));
        assert!(ctx.has_errors());
        assert_eq!(ctx.issues_of(IssueKind::TransientNetwork).count(), 1);
    }

    #[test]
    fn test_report_serializes() {
        let mut ctx = SyncContext::new(true);
        ctx.remote_deleted = 2;
        ctx.finish();

        let json: serde_json::Value = serde_json::from_str(&ctx.to_json().unwrap()).unwrap();
        assert_eq!(json["reset"], true);
        assert_eq!(json["remoteDeleted"], 2);
        assert!(json["finishedAt"].is_string());
    }
}
