//! Property tests for the normalizer and field hashing

use contact_sync_core::normalize::{normalize_email, normalize_phone};
use contact_sync_core::{FieldHashTracker, TrackedField};
use proptest::prelude::*;

fn country_hint() -> impl Strategy<Value = Option<String>> {
    prop_oneof![Just(None), "[1-9][0-9]{0,2}".prop_map(Some)]
}

proptest! {
    #[test]
    fn phone_normalization_is_idempotent(raw in "[ +0-9()/-]{0,24}", hint in country_hint()) {
        let hint = hint.as_deref();
        if let Some(once) = normalize_phone(&raw, hint) {
            prop_assert_eq!(normalize_phone(&once, hint), Some(once.clone()));
            prop_assert!(once.chars().all(|c| c.is_ascii_digit()));
        }
    }

    #[test]
    fn email_normalization_is_idempotent(raw in "\\PC{0,40}") {
        if let Some(once) = normalize_email(&raw) {
            prop_assert_eq!(normalize_email(&once), Some(once.clone()));
        }
    }

    #[test]
    fn phone_hash_ignores_separators(digits in "[1-9][0-9]{4,12}") {
        let tracker = FieldHashTracker::default();
        let spaced: String = digits
            .chars()
            .enumerate()
            .flat_map(|(i, c)| if i % 3 == 2 { vec![c, ' '] } else { vec![c] })
            .collect();

        prop_assert_eq!(
            tracker.hash_field(TrackedField::MobilePhone, Some(&format!("+{digits}"))),
            tracker.hash_field(TrackedField::MobilePhone, Some(&format!("00{spaced}")))
        );
    }
}
