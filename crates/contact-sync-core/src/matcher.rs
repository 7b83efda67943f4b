//! Fuzzy matching of unbound local records against remote candidates
//!
//! Used only while a local record has no remote id yet. Candidates must share
//! the record's full name (case-insensitive, trimmed); among several such
//! candidates the one sharing the most phone numbers, emails, postal codes,
//! division and organization wins.
//!
//! Ties go to the earliest candidate in input order. Callers that want
//! reproducible results across runs must pass candidates in a stable order.

use tracing::{debug, warn};

use crate::contact::{AddressSlot, EmailSlot, LocalContact, PhoneSlot, RemoteContact};
use crate::normalize::{normalize_email, normalize_phone, text_key};

/// Best candidate found for a local record
#[derive(Debug, Clone, Copy)]
pub struct MatchResult<'a> {
    /// The winning candidate
    pub contact: &'a RemoteContact,
    /// Its score (1 for a bare name match)
    pub score: u32,
    /// Number of other candidates that reached the same score
    pub tied_with: usize,
}

impl MatchResult<'_> {
    /// True when the tie-break on input order decided the match
    pub fn is_ambiguous(&self) -> bool {
        self.tied_with > 0
    }
}

/// Scores remote candidates against a local record
#[derive(Debug, Clone, Default)]
pub struct Matcher {
    country_hint: Option<String>,
}

impl Matcher {
    pub fn new(country_hint: Option<String>) -> Self {
        Self { country_hint }
    }

    /// Best-scoring candidate, or `None` when no candidate has the same name
    pub fn find_best_match<'a>(
        &self,
        candidates: &'a [RemoteContact],
        local: &LocalContact,
    ) -> Option<&'a RemoteContact> {
        self.best_match(candidates, local).map(|m| m.contact)
    }

    /// Like [`find_best_match`](Self::find_best_match), with score and tie details
    pub fn best_match<'a>(
        &self,
        candidates: &'a [RemoteContact],
        local: &LocalContact,
    ) -> Option<MatchResult<'a>> {
        let name = text_key(&local.full_name());
        if name.is_empty() {
            return None;
        }

        let named: Vec<&RemoteContact> = candidates
            .iter()
            .filter(|c| text_key(&c.name) == name)
            .collect();

        match named.as_slice() {
            [] => {
                debug!("No remote candidate named '{}'", local.full_name());
                None
            }
            [only] => Some(MatchResult {
                contact: *only,
                score: 1,
                tied_with: 0,
            }),
            _ => {
                let scored: Vec<(u32, &'a RemoteContact)> = named
                    .iter()
                    .copied()
                    .map(|candidate| (self.score(candidate, local), candidate))
                    .collect();

                let top = scored.iter().map(|(score, _)| *score).max()?;
                let mut leaders = scored.iter().filter(|(score, _)| *score == top);
                let (score, contact) = leaders.next().copied()?;
                let result = MatchResult {
                    contact,
                    score,
                    tied_with: leaders.count(),
                };

                if result.is_ambiguous() {
                    warn!(
                        "Ambiguous match for '{}': {} candidates scored {}, taking the first",
                        local.full_name(),
                        result.tied_with + 1,
                        result.score
                    );
                }
                Some(result)
            }
        }
    }

    /// Score of a same-named candidate
    ///
    /// Base score 1, plus one point per shared phone number and email, one if
    /// a postal code is shared, one each for equal division and organization.
    pub fn score(&self, candidate: &RemoteContact, local: &LocalContact) -> u32 {
        let hint = self.country_hint.as_deref();
        let mut score = 1;

        let remote_numbers: Vec<String> = candidate
            .numbers
            .iter()
            .filter_map(|n| normalize_phone(&n.number, hint))
            .collect();
        for slot in PhoneSlot::INFERENCE_ORDER {
            if let Some(phone) = local.phone(slot).and_then(|p| normalize_phone(p, hint))
                && remote_numbers.contains(&phone)
            {
                score += 1;
            }
        }

        let remote_emails: Vec<String> = candidate
            .emails
            .iter()
            .filter_map(|e| normalize_email(&e.address))
            .collect();
        for slot in EmailSlot::INFERENCE_ORDER {
            if let Some(email) = local.email(slot).and_then(normalize_email)
                && remote_emails.contains(&email)
            {
                score += 1;
            }
        }

        let remote_zips: Vec<String> = candidate
            .addresses
            .iter()
            .filter_map(|a| a.address.zip.as_deref())
            .map(text_key)
            .filter(|z| !z.is_empty())
            .collect();
        let zip_shared = AddressSlot::ALL.iter().any(|slot| {
            local
                .address(*slot)
                .zip
                .as_deref()
                .map(text_key)
                .is_some_and(|zip| !zip.is_empty() && remote_zips.contains(&zip))
        });
        if zip_shared {
            score += 1;
        }

        if same_text(local.division.as_deref(), candidate.division.as_deref()) {
            score += 1;
        }
        if same_text(local.organization.as_deref(), candidate.organization.as_deref()) {
            score += 1;
        }

        score
    }
}

fn same_text(local: Option<&str>, remote: Option<&str>) -> bool {
    match (local.map(text_key), remote.map(text_key)) {
        (Some(a), Some(b)) => !a.is_empty() && a == b,
        _ => false,
    }
}
