//! Type inference for untyped remote numbers and emails
//!
//! The remote directory drops type tags on numbers and emails. Before a bound
//! contact is diffed, every untyped entry gets the slot it most probably
//! belongs to:
//!
//! 1. **Value**: its normalized value equals the local value of a slot,
//!    checked in [`PhoneSlot::INFERENCE_ORDER`] / [`EmailSlot::INFERENCE_ORDER`].
//! 2. **History**: its hash equals the hash stored for a slot at the last
//!    sync, so a remote value that still carries the previously pushed value
//!    keeps its slot after a local edit.
//!
//! Value matches are assigned for all entries before history is consulted.
//! A slot already held by a typed entry or by an earlier inference is never
//! assigned twice. Entries left over are tagged `OTHER`.
//!
//! A field with no stored hash never matches by history.

use std::collections::HashSet;
use std::hash::Hash;
use tracing::debug;

use crate::contact::{EmailKind, EmailSlot, LocalContact, PhoneSlot, PhoneTag, RemoteContact};
use crate::fields::{EMPTY_HASH, FieldHashMap, FieldHashTracker, TrackedField};
use crate::normalize::{normalize_email, normalize_phone};

/// How a slot was inferred
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InferenceSource {
    /// Normalized value equals the current local value
    Value,
    /// Hash equals the hash stored at the last sync
    History,
}

/// One inferred entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Inferred<S> {
    pub value: String,
    pub slot: S,
    pub source: InferenceSource,
}

/// What a resolver pass changed on a remote contact
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InferenceReport {
    pub phones: Vec<Inferred<PhoneSlot>>,
    pub emails: Vec<Inferred<EmailSlot>>,
    /// Untyped entries that could not be placed and were tagged `OTHER`
    pub unresolved: usize,
}

impl InferenceReport {
    pub fn is_empty(&self) -> bool {
        self.phones.is_empty() && self.emails.is_empty() && self.unresolved == 0
    }
}

/// Assigns slots to untyped entries of a remote contact
#[derive(Debug, Clone, Default)]
pub struct TypeInferenceResolver {
    tracker: FieldHashTracker,
}

impl TypeInferenceResolver {
    pub fn new(tracker: FieldHashTracker) -> Self {
        Self { tracker }
    }

    /// Resolve every untyped number and email of `remote` in place
    ///
    /// `history` is the hash map stored at the last successful sync of this
    /// pair; pass an empty map for a pair that was never synced.
    pub fn resolve(
        &self,
        remote: &mut RemoteContact,
        local: &LocalContact,
        history: &FieldHashMap,
    ) -> InferenceReport {
        let mut report = InferenceReport::default();
        self.resolve_numbers(remote, local, history, &mut report);
        self.resolve_emails(remote, local, history, &mut report);

        if !report.is_empty() {
            debug!(
                "Inferred types for '{}': {} numbers, {} emails, {} left as OTHER",
                remote.name,
                report.phones.len(),
                report.emails.len(),
                report.unresolved
            );
        }
        report
    }

    fn resolve_numbers(
        &self,
        remote: &mut RemoteContact,
        local: &LocalContact,
        history: &FieldHashMap,
        report: &mut InferenceReport,
    ) {
        let hint = self.tracker.country_hint();
        let taken: HashSet<PhoneSlot> = remote.numbers.iter().filter_map(|n| n.slot()).collect();
        let entries: Vec<(usize, String)> = remote
            .numbers
            .iter()
            .enumerate()
            .filter(|(_, n)| n.is_untyped())
            .map(|(i, n)| (i, n.number.clone()))
            .collect();

        let assignments = Self::assign(
            &entries,
            taken,
            &PhoneSlot::INFERENCE_ORDER,
            |raw, slot| {
                let value = normalize_phone(raw, hint);
                value.is_some() && value == local.phone(slot).and_then(|p| normalize_phone(p, hint))
            },
            |raw, slot| self.matches_history(TrackedField::for_phone(slot), raw, history),
        );

        for (index, assignment) in assignments.into_iter().enumerate() {
            let position = entries[index].0;
            let number = &mut remote.numbers[position];
            match assignment {
                Some((slot, source)) => {
                    number.tags = Some(slot.tags());
                    report.phones.push(Inferred {
                        value: number.number.clone(),
                        slot,
                        source,
                    });
                }
                None => {
                    number.tags = Some(vec![PhoneTag::Other]);
                    report.unresolved += 1;
                }
            }
        }
    }

    fn resolve_emails(
        &self,
        remote: &mut RemoteContact,
        local: &LocalContact,
        history: &FieldHashMap,
        report: &mut InferenceReport,
    ) {
        let taken: HashSet<EmailSlot> = remote
            .emails
            .iter()
            .filter_map(|e| e.kind.and_then(EmailSlot::from_kind))
            .collect();
        let entries: Vec<(usize, String)> = remote
            .emails
            .iter()
            .enumerate()
            .filter(|(_, e)| e.is_untyped())
            .map(|(i, e)| (i, e.address.clone()))
            .collect();

        let assignments = Self::assign(
            &entries,
            taken,
            &EmailSlot::INFERENCE_ORDER,
            |raw, slot| {
                let value = normalize_email(raw);
                value.is_some() && value == local.email(slot).and_then(normalize_email)
            },
            |raw, slot| self.matches_history(TrackedField::for_email(slot), raw, history),
        );

        for (index, assignment) in assignments.into_iter().enumerate() {
            let position = entries[index].0;
            let email = &mut remote.emails[position];
            match assignment {
                Some((slot, source)) => {
                    email.kind = Some(slot.kind());
                    report.emails.push(Inferred {
                        value: email.address.clone(),
                        slot,
                        source,
                    });
                }
                None => {
                    email.kind = Some(EmailKind::Other);
                    report.unresolved += 1;
                }
            }
        }
    }

    /// Two-pass slot assignment shared by numbers and emails
    ///
    /// Returns one entry per input, `None` where no slot was found.
    fn assign<S, V, H>(
        entries: &[(usize, String)],
        mut taken: HashSet<S>,
        order: &[S],
        by_value: V,
        by_history: H,
    ) -> Vec<Option<(S, InferenceSource)>>
    where
        S: Copy + Eq + Hash,
        V: Fn(&str, S) -> bool,
        H: Fn(&str, S) -> bool,
    {
        let mut result = vec![None; entries.len()];
        fill_pass(entries, &mut result, &mut taken, order, InferenceSource::Value, by_value);
        fill_pass(entries, &mut result, &mut taken, order, InferenceSource::History, by_history);
        result
    }

    fn matches_history(&self, field: TrackedField, raw: &str, history: &FieldHashMap) -> bool {
        let hash = self.tracker.hash_field(field, Some(raw));
        hash != EMPTY_HASH && history.get(&field) == Some(&hash)
    }
}

fn fill_pass<S, F>(
    entries: &[(usize, String)],
    result: &mut [Option<(S, InferenceSource)>],
    taken: &mut HashSet<S>,
    order: &[S],
    source: InferenceSource,
    matches: F,
) where
    S: Copy + Eq + Hash,
    F: Fn(&str, S) -> bool,
{
    for (index, (_, raw)) in entries.iter().enumerate() {
        if result[index].is_some() {
            continue;
        }
        let found = order
            .iter()
            .copied()
            .find(|slot| !taken.contains(slot) && matches(raw.as_str(), *slot));
        if let Some(slot) = found {
            taken.insert(slot);
            result[index] = Some((slot, source));
        }
    }
}
