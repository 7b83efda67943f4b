//! Canonical forms for comparing phone numbers and email addresses
//!
//! Both functions are pure and idempotent: feeding a canonical value back in
//! returns it unchanged.

/// Canonicalize a phone number into a plain digit string
///
/// - All formatting characters are stripped.
/// - A leading `+` or `00` marks an international number; the prefix is
///   dropped and a trunk `(0)` after the country code is ignored.
/// - A national number (single leading `0`) gets its trunk zero replaced by
///   `country_hint` when one is given.
///
/// Returns `None` for blank input or input without any digit.
///
/// ```
/// use contact_sync_core::normalize::normalize_phone;
///
/// assert_eq!(normalize_phone("+49 561 316793-0", None).as_deref(), Some("495613167930"));
/// assert_eq!(normalize_phone("0561 316793-0", Some("49")).as_deref(), Some("495613167930"));
/// assert_eq!(normalize_phone("   ", None), None);
/// ```
pub fn normalize_phone(raw: &str, country_hint: Option<&str>) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }

    let digits = only_digits(trimmed);
    if digits.is_empty() {
        return None;
    }

    if trimmed.starts_with('+') || digits.starts_with("00") {
        // Country codes never start with zero
        let digits = only_digits(&trimmed.replace("(0)", ""));
        let national = digits.trim_start_matches('0');
        return (!national.is_empty()).then(|| national.to_string());
    }

    let hint = country_hint
        .map(|h| h.trim().trim_start_matches('+'))
        .filter(|h| !h.is_empty());

    match (hint, digits.strip_prefix('0')) {
        (Some(hint), Some(rest)) => Some(format!("{hint}{rest}")),
        _ => Some(digits),
    }
}

fn only_digits(raw: &str) -> String {
    raw.chars().filter(|c| c.is_ascii_digit()).collect()
}

/// Canonicalize an email address: trimmed and lowercased, `None` for blank input
pub fn normalize_email(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_lowercase())
    }
}

/// Case- and whitespace-insensitive comparison key for free-text fields
pub(crate) fn text_key(raw: &str) -> String {
    raw.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}
