//! Tracked fields and per-field content hashing
//!
//! [`TrackedField`] is the one list of synchronized fields. The hash tracker,
//! the type inference resolver and the persisted [`SyncRecord`] all key on it,
//! so adding a field is a single edit here plus a bump of
//! [`TRACKED_FIELDS_VERSION`].
//!
//! A [`FieldHashMap`] without an entry for a field means "never observed". Old
//! records that predate a field therefore compare as changed for that field on
//! their first run, which is exactly a first-time sync of it.
//!
//! [`SyncRecord`]: crate::traits::SyncRecord

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;

use crate::contact::{
    AddressSlot, EmailSlot, LocalContact, PhoneSlot, PostalAddress, RemoteContact,
};
use crate::normalize::{normalize_email, normalize_phone};

/// Version of the tracked field set, stored with every sync record
pub const TRACKED_FIELDS_VERSION: u32 = 1;

/// Hash used for a missing or blank value
pub const EMPTY_HASH: u64 = 0;

/// Field hashes captured at the end of a sync, keyed by field
pub type FieldHashMap = BTreeMap<TrackedField, u64>;

/// A sub-field of a postal address block
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AddressPart {
    Street,
    Street2,
    Zip,
    City,
    Region,
    Country,
}

impl AddressPart {
    pub fn get(self, address: &PostalAddress) -> Option<&str> {
        match self {
            AddressPart::Street => address.street.as_deref(),
            AddressPart::Street2 => address.street2.as_deref(),
            AddressPart::Zip => address.zip.as_deref(),
            AddressPart::City => address.city.as_deref(),
            AddressPart::Region => address.region.as_deref(),
            AddressPart::Country => address.country.as_deref(),
        }
    }

    pub fn get_mut(self, address: &mut PostalAddress) -> &mut Option<String> {
        match self {
            AddressPart::Street => &mut address.street,
            AddressPart::Street2 => &mut address.street2,
            AddressPart::Zip => &mut address.zip,
            AddressPart::City => &mut address.city,
            AddressPart::Region => &mut address.region,
            AddressPart::Country => &mut address.country,
        }
    }
}

/// One synchronized semantic field
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TrackedField {
    Name,
    Organization,
    Division,
    BusinessPhone,
    MobilePhone,
    PrivatePhone,
    PrivateMobilePhone,
    Fax,
    Email,
    PrivateEmail,
    BusinessStreet,
    BusinessStreet2,
    BusinessZip,
    BusinessCity,
    BusinessRegion,
    BusinessCountry,
    PrivateStreet,
    PrivateStreet2,
    PrivateZip,
    PrivateCity,
    PrivateRegion,
    PrivateCountry,
}

/// What a field is made of, used to pick canonicalization and accessors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Name,
    Organization,
    Division,
    Phone(PhoneSlot),
    Email(EmailSlot),
    Address(AddressSlot, AddressPart),
}

impl TrackedField {
    /// Every tracked field, in a fixed order
    pub const ALL: [TrackedField; 22] = [
        TrackedField::Name,
        TrackedField::Organization,
        TrackedField::Division,
        TrackedField::BusinessPhone,
        TrackedField::MobilePhone,
        TrackedField::PrivatePhone,
        TrackedField::PrivateMobilePhone,
        TrackedField::Fax,
        TrackedField::Email,
        TrackedField::PrivateEmail,
        TrackedField::BusinessStreet,
        TrackedField::BusinessStreet2,
        TrackedField::BusinessZip,
        TrackedField::BusinessCity,
        TrackedField::BusinessRegion,
        TrackedField::BusinessCountry,
        TrackedField::PrivateStreet,
        TrackedField::PrivateStreet2,
        TrackedField::PrivateZip,
        TrackedField::PrivateCity,
        TrackedField::PrivateRegion,
        TrackedField::PrivateCountry,
    ];

    /// Stable key used in persisted records
    pub fn key(&self) -> &'static str {
        match self {
            TrackedField::Name => "name",
            TrackedField::Organization => "organization",
            TrackedField::Division => "division",
            TrackedField::BusinessPhone => "businessPhone",
            TrackedField::MobilePhone => "mobilePhone",
            TrackedField::PrivatePhone => "privatePhone",
            TrackedField::PrivateMobilePhone => "privateMobilePhone",
            TrackedField::Fax => "fax",
            TrackedField::Email => "email",
            TrackedField::PrivateEmail => "privateEmail",
            TrackedField::BusinessStreet => "businessStreet",
            TrackedField::BusinessStreet2 => "businessStreet2",
            TrackedField::BusinessZip => "businessZip",
            TrackedField::BusinessCity => "businessCity",
            TrackedField::BusinessRegion => "businessRegion",
            TrackedField::BusinessCountry => "businessCountry",
            TrackedField::PrivateStreet => "privateStreet",
            TrackedField::PrivateStreet2 => "privateStreet2",
            TrackedField::PrivateZip => "privateZip",
            TrackedField::PrivateCity => "privateCity",
            TrackedField::PrivateRegion => "privateRegion",
            TrackedField::PrivateCountry => "privateCountry",
        }
    }

    pub fn kind(&self) -> FieldKind {
        use AddressPart as P;
        use AddressSlot::{Business as B, Private as Pr};

        match self {
            TrackedField::Name => FieldKind::Name,
            TrackedField::Organization => FieldKind::Organization,
            TrackedField::Division => FieldKind::Division,
            TrackedField::BusinessPhone => FieldKind::Phone(PhoneSlot::Business),
            TrackedField::MobilePhone => FieldKind::Phone(PhoneSlot::Mobile),
            TrackedField::PrivatePhone => FieldKind::Phone(PhoneSlot::Private),
            TrackedField::PrivateMobilePhone => FieldKind::Phone(PhoneSlot::PrivateMobile),
            TrackedField::Fax => FieldKind::Phone(PhoneSlot::Fax),
            TrackedField::Email => FieldKind::Email(EmailSlot::Work),
            TrackedField::PrivateEmail => FieldKind::Email(EmailSlot::Private),
            TrackedField::BusinessStreet => FieldKind::Address(B, P::Street),
            TrackedField::BusinessStreet2 => FieldKind::Address(B, P::Street2),
            TrackedField::BusinessZip => FieldKind::Address(B, P::Zip),
            TrackedField::BusinessCity => FieldKind::Address(B, P::City),
            TrackedField::BusinessRegion => FieldKind::Address(B, P::Region),
            TrackedField::BusinessCountry => FieldKind::Address(B, P::Country),
            TrackedField::PrivateStreet => FieldKind::Address(Pr, P::Street),
            TrackedField::PrivateStreet2 => FieldKind::Address(Pr, P::Street2),
            TrackedField::PrivateZip => FieldKind::Address(Pr, P::Zip),
            TrackedField::PrivateCity => FieldKind::Address(Pr, P::City),
            TrackedField::PrivateRegion => FieldKind::Address(Pr, P::Region),
            TrackedField::PrivateCountry => FieldKind::Address(Pr, P::Country),
        }
    }

    /// The tracked field holding a phone slot
    pub fn for_phone(slot: PhoneSlot) -> Self {
        match slot {
            PhoneSlot::Business => TrackedField::BusinessPhone,
            PhoneSlot::Mobile => TrackedField::MobilePhone,
            PhoneSlot::Private => TrackedField::PrivatePhone,
            PhoneSlot::PrivateMobile => TrackedField::PrivateMobilePhone,
            PhoneSlot::Fax => TrackedField::Fax,
        }
    }

    /// The tracked field holding an email slot
    pub fn for_email(slot: EmailSlot) -> Self {
        match slot {
            EmailSlot::Work => TrackedField::Email,
            EmailSlot::Private => TrackedField::PrivateEmail,
        }
    }

    /// Canonical comparison form of a raw value of this field
    ///
    /// Phones and emails go through the normalizer; everything else has its
    /// whitespace collapsed. Blank values canonicalize to `None`.
    pub fn canonical(&self, raw: Option<&str>, country_hint: Option<&str>) -> Option<String> {
        let raw = raw?;
        match self.kind() {
            FieldKind::Phone(_) => normalize_phone(raw, country_hint),
            FieldKind::Email(_) => normalize_email(raw),
            _ => {
                let collapsed = raw.split_whitespace().collect::<Vec<_>>().join(" ");
                (!collapsed.is_empty()).then_some(collapsed)
            }
        }
    }

    /// Raw value of this field on a local record
    ///
    /// The name is the derived full name, so it compares against the single
    /// remote `name` string.
    pub fn local_value(&self, local: &LocalContact) -> Option<String> {
        match self.kind() {
            FieldKind::Name => Some(local.full_name()).filter(|n| !n.is_empty()),
            FieldKind::Organization => local.organization.clone(),
            FieldKind::Division => local.division.clone(),
            FieldKind::Phone(slot) => local.phone(slot).map(str::to_string),
            FieldKind::Email(slot) => local.email(slot).map(str::to_string),
            FieldKind::Address(slot, part) => part.get(local.address(slot)).map(str::to_string),
        }
    }

    /// Raw value of this field on a remote contact (typed entries only)
    pub fn remote_value(&self, remote: &RemoteContact) -> Option<String> {
        match self.kind() {
            FieldKind::Name => Some(remote.name.clone()).filter(|n| !n.trim().is_empty()),
            FieldKind::Organization => remote.organization.clone(),
            FieldKind::Division => remote.division.clone(),
            FieldKind::Phone(slot) => remote.phone(slot).map(str::to_string),
            FieldKind::Email(slot) => remote.email(slot).map(str::to_string),
            FieldKind::Address(slot, part) => remote
                .address(slot)
                .and_then(|a| part.get(a))
                .map(str::to_string),
        }
    }

    /// Write a value into the local record (pull)
    pub fn apply_to_local(&self, local: &mut LocalContact, value: Option<&str>) {
        let value = value.map(str::trim).filter(|v| !v.is_empty());
        match self.kind() {
            FieldKind::Name => {
                let (first, last) = split_name(value.unwrap_or(""));
                local.first_name = Some(first).filter(|v| !v.is_empty());
                local.last_name = Some(last).filter(|v| !v.is_empty());
            }
            FieldKind::Organization => local.organization = value.map(str::to_string),
            FieldKind::Division => local.division = value.map(str::to_string),
            FieldKind::Phone(slot) => *local.phone_mut(slot) = value.map(str::to_string),
            FieldKind::Email(slot) => *local.email_mut(slot) = value.map(str::to_string),
            FieldKind::Address(slot, part) => {
                *part.get_mut(local.address_mut(slot)) = value.map(str::to_string)
            }
        }
    }

    /// Write the local record's value of this field onto a remote contact (push)
    pub fn apply_to_remote(&self, remote: &mut RemoteContact, local: &LocalContact) {
        let value = self.local_value(local);
        let value = value.as_deref().map(str::trim).filter(|v| !v.is_empty());
        match self.kind() {
            FieldKind::Name => {
                remote.name = local.full_name();
                remote.given_name = local.first_name.clone().filter(|v| !v.trim().is_empty());
                remote.family_name = local.last_name.clone().filter(|v| !v.trim().is_empty());
            }
            FieldKind::Organization => remote.organization = value.map(str::to_string),
            FieldKind::Division => remote.division = value.map(str::to_string),
            FieldKind::Phone(slot) => remote.set_phone(slot, value),
            FieldKind::Email(slot) => remote.set_email(slot, value),
            FieldKind::Address(slot, part) => {
                if value.is_some() || remote.address(slot).is_some() {
                    *part.get_mut(remote.address_mut(slot)) = value.map(str::to_string);
                }
            }
        }
    }
}

impl fmt::Display for TrackedField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

impl FromStr for TrackedField {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        TrackedField::ALL
            .iter()
            .copied()
            .find(|field| field.key() == s)
            .ok_or_else(|| format!("Unknown tracked field: {s}"))
    }
}

/// Split a single display name into (first, last)
///
/// The last whitespace-delimited token becomes the last name; all preceding
/// tokens joined by one space become the first name.
pub fn split_name(name: &str) -> (String, String) {
    let tokens: Vec<&str> = name.split_whitespace().collect();
    match tokens.split_last() {
        Some((last, rest)) => (rest.join(" "), (*last).to_string()),
        None => (String::new(), String::new()),
    }
}

/// Computes and compares per-field content hashes
#[derive(Debug, Clone, Default)]
pub struct FieldHashTracker {
    country_hint: Option<String>,
}

impl FieldHashTracker {
    pub fn new(country_hint: Option<String>) -> Self {
        Self { country_hint }
    }

    pub fn country_hint(&self) -> Option<&str> {
        self.country_hint.as_deref()
    }

    /// Stable hash of an already canonicalized value
    ///
    /// Missing and empty values both map to [`EMPTY_HASH`]. The hash is taken
    /// from SHA-256 so it stays stable across processes and toolchains.
    pub fn hash(value: Option<&str>) -> u64 {
        match value {
            None | Some("") => EMPTY_HASH,
            Some(v) => {
                let digest = Sha256::digest(v.as_bytes());
                let mut bytes = [0u8; 8];
                bytes.copy_from_slice(&digest[..8]);
                u64::from_be_bytes(bytes)
            }
        }
    }

    /// Canonicalize a raw field value and hash it
    pub fn hash_field(&self, field: TrackedField, raw: Option<&str>) -> u64 {
        Self::hash(field.canonical(raw, self.country_hint()).as_deref())
    }

    /// Hash of a field's current value on a local record
    pub fn local_hash(&self, field: TrackedField, local: &LocalContact) -> u64 {
        self.hash_field(field, field.local_value(local).as_deref())
    }

    /// Hash of a field's current value on a remote contact
    pub fn remote_hash(&self, field: TrackedField, remote: &RemoteContact) -> u64 {
        self.hash_field(field, field.remote_value(remote).as_deref())
    }

    /// Hashes of every tracked field of a local record
    pub fn snapshot(&self, local: &LocalContact) -> FieldHashMap {
        TrackedField::ALL
            .iter()
            .map(|field| (*field, self.local_hash(*field, local)))
            .collect()
    }

    /// Fields whose hash differs between two snapshots
    ///
    /// A field present in only one snapshot counts as changed.
    pub fn diff(old: &FieldHashMap, new: &FieldHashMap) -> BTreeSet<TrackedField> {
        TrackedField::ALL
            .iter()
            .copied()
            .filter(|field| match (old.get(field), new.get(field)) {
                (Some(a), Some(b)) => a != b,
                (None, None) => false,
                _ => true,
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> LocalContact {
        let mut contact = LocalContact::new("1")
            .with_name("Jane", "Doe")
            .with_phone(PhoneSlot::Business, "+49 561 316793-0")
            .with_email(EmailSlot::Work, "Jane@Example.com");
        contact.business_address.zip = Some("34117".to_string());
        contact
    }

    #[test]
    fn test_all_fields_have_unique_keys() {
        let keys: BTreeSet<&str> = TrackedField::ALL.iter().map(|f| f.key()).collect();
        assert_eq!(keys.len(), 22);
        for field in TrackedField::ALL {
            assert_eq!(field.key().parse::<TrackedField>(), Ok(field));
        }
    }

    #[test]
    fn test_serde_key_matches_stable_key() {
        for field in TrackedField::ALL {
            let json = serde_json::to_string(&field).unwrap();
            assert_eq!(json, format!("\"{}\"", field.key()));
        }
    }

    #[test]
    fn test_empty_maps_to_sentinel() {
        let tracker = FieldHashTracker::default();
        assert_eq!(FieldHashTracker::hash(None), EMPTY_HASH);
        assert_eq!(FieldHashTracker::hash(Some("")), EMPTY_HASH);
        assert_eq!(tracker.hash_field(TrackedField::Division, Some("   ")), EMPTY_HASH);
        assert_ne!(FieldHashTracker::hash(Some("x")), EMPTY_HASH);
    }

    #[test]
    fn test_phone_hash_ignores_formatting() {
        let tracker = FieldHashTracker::default();
        assert_eq!(
            tracker.hash_field(TrackedField::BusinessPhone, Some("+49 561 316793-0")),
            tracker.hash_field(TrackedField::BusinessPhone, Some("0049-561-3167930"))
        );
        assert_eq!(
            tracker.hash_field(TrackedField::Email, Some(" JANE@example.com")),
            tracker.hash_field(TrackedField::Email, Some("jane@example.com"))
        );
    }

    #[test]
    fn test_snapshot_covers_every_field() {
        let tracker = FieldHashTracker::default();
        let snapshot = tracker.snapshot(&sample());
        assert_eq!(snapshot.len(), TrackedField::ALL.len());
        assert_eq!(snapshot[&TrackedField::Fax], EMPTY_HASH);
        assert_ne!(snapshot[&TrackedField::BusinessZip], EMPTY_HASH);
    }

    #[test]
    fn test_diff_reports_changed_and_missing_keys() {
        let tracker = FieldHashTracker::default();
        let old = tracker.snapshot(&sample());

        let mut edited = sample();
        edited.division = Some("Sales".to_string());
        let new = tracker.snapshot(&edited);

        let changed = FieldHashTracker::diff(&old, &new);
        assert_eq!(changed, BTreeSet::from([TrackedField::Division]));

        // A record written before a field existed lacks that key
        let mut legacy = old.clone();
        legacy.remove(&TrackedField::PrivateCountry);
        let changed = FieldHashTracker::diff(&legacy, &old);
        assert_eq!(changed, BTreeSet::from([TrackedField::PrivateCountry]));

        assert!(FieldHashTracker::diff(&old, &old).is_empty());
    }

    #[test]
    fn test_split_name() {
        assert_eq!(split_name("Jane Doe"), ("Jane".to_string(), "Doe".to_string()));
        assert_eq!(
            split_name("  Mary  Ann   van Doe "),
            ("Mary Ann van".to_string(), "Doe".to_string())
        );
        assert_eq!(split_name("Cher"), (String::new(), "Cher".to_string()));
        assert_eq!(split_name("   "), (String::new(), String::new()));
    }

    #[test]
    fn test_push_and_pull_single_field() {
        let local = sample();
        let mut remote = RemoteContact::named("Jane Doe");

        TrackedField::BusinessPhone.apply_to_remote(&mut remote, &local);
        TrackedField::BusinessZip.apply_to_remote(&mut remote, &local);
        assert_eq!(remote.phone(PhoneSlot::Business), Some("+49 561 316793-0"));
        assert_eq!(
            remote.address(AddressSlot::Business).and_then(|a| a.zip.as_deref()),
            Some("34117")
        );

        // Pushing a blank sub-field does not create an empty address block
        TrackedField::PrivateCity.apply_to_remote(&mut remote, &local);
        assert!(remote.address(AddressSlot::Private).is_none());

        let mut pulled = LocalContact::new("2");
        TrackedField::Name.apply_to_local(&mut pulled, Some("John Q. Public"));
        assert_eq!(pulled.first_name.as_deref(), Some("John Q."));
        assert_eq!(pulled.last_name.as_deref(), Some("Public"));
    }
}
