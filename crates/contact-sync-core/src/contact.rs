//! Contact data model
//!
//! Two shapes of the same person live here:
//!
//! - [`LocalContact`]: the address record owned by the local persistence layer,
//!   with a fixed set of typed slots.
//! - [`RemoteContact`]: the directory entry owned by the remote service, with
//!   open-ended lists whose type tags may be missing.
//!
//! The slot enums ([`PhoneSlot`], [`EmailSlot`], [`AddressSlot`]) bridge the two.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Opaque identifier of a local address record
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LocalId(pub String);

impl LocalId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for LocalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for LocalId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for LocalId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// A postal address block
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PostalAddress {
    pub street: Option<String>,
    pub street2: Option<String>,
    pub zip: Option<String>,
    pub city: Option<String>,
    pub region: Option<String>,
    pub country: Option<String>,
}

impl PostalAddress {
    /// True when every sub-field is missing or blank
    pub fn is_blank(&self) -> bool {
        [
            &self.street,
            &self.street2,
            &self.zip,
            &self.city,
            &self.region,
            &self.country,
        ]
        .iter()
        .all(|v| is_blank(v.as_deref()))
    }
}

/// Local address record, subject to sync
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocalContact {
    pub id: LocalId,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub organization: Option<String>,
    pub division: Option<String>,
    /// Work email
    pub email: Option<String>,
    /// Home email
    pub private_email: Option<String>,
    pub business_phone: Option<String>,
    pub mobile_phone: Option<String>,
    /// Private landline
    pub private_phone: Option<String>,
    pub private_mobile_phone: Option<String>,
    pub fax: Option<String>,
    #[serde(default)]
    pub business_address: PostalAddress,
    #[serde(default)]
    pub private_address: PostalAddress,
}

impl LocalContact {
    /// Create an empty record with the given id
    pub fn new(id: impl Into<LocalId>) -> Self {
        Self {
            id: id.into(),
            first_name: None,
            last_name: None,
            organization: None,
            division: None,
            email: None,
            private_email: None,
            business_phone: None,
            mobile_phone: None,
            private_phone: None,
            private_mobile_phone: None,
            fax: None,
            business_address: PostalAddress::default(),
            private_address: PostalAddress::default(),
        }
    }

    /// Set the name parts
    pub fn with_name(mut self, first: &str, last: &str) -> Self {
        self.first_name = Some(first.to_string());
        self.last_name = Some(last.to_string());
        self
    }

    /// Set a phone slot
    pub fn with_phone(mut self, slot: PhoneSlot, number: &str) -> Self {
        *self.phone_mut(slot) = Some(number.to_string());
        self
    }

    /// Set an email slot
    pub fn with_email(mut self, slot: EmailSlot, address: &str) -> Self {
        *self.email_mut(slot) = Some(address.to_string());
        self
    }

    /// Display name: first and last name joined by a space, trimmed
    pub fn full_name(&self) -> String {
        join_name(self.first_name.as_deref(), self.last_name.as_deref())
    }

    /// A record can be matched or converted only when it has some name
    pub fn has_usable_name(&self) -> bool {
        !is_blank(self.first_name.as_deref()) || !is_blank(self.last_name.as_deref())
    }

    pub fn phone(&self, slot: PhoneSlot) -> Option<&str> {
        match slot {
            PhoneSlot::Business => self.business_phone.as_deref(),
            PhoneSlot::Mobile => self.mobile_phone.as_deref(),
            PhoneSlot::Private => self.private_phone.as_deref(),
            PhoneSlot::PrivateMobile => self.private_mobile_phone.as_deref(),
            PhoneSlot::Fax => self.fax.as_deref(),
        }
    }

    pub fn phone_mut(&mut self, slot: PhoneSlot) -> &mut Option<String> {
        match slot {
            PhoneSlot::Business => &mut self.business_phone,
            PhoneSlot::Mobile => &mut self.mobile_phone,
            PhoneSlot::Private => &mut self.private_phone,
            PhoneSlot::PrivateMobile => &mut self.private_mobile_phone,
            PhoneSlot::Fax => &mut self.fax,
        }
    }

    pub fn email(&self, slot: EmailSlot) -> Option<&str> {
        match slot {
            EmailSlot::Work => self.email.as_deref(),
            EmailSlot::Private => self.private_email.as_deref(),
        }
    }

    pub fn email_mut(&mut self, slot: EmailSlot) -> &mut Option<String> {
        match slot {
            EmailSlot::Work => &mut self.email,
            EmailSlot::Private => &mut self.private_email,
        }
    }

    pub fn address(&self, slot: AddressSlot) -> &PostalAddress {
        match slot {
            AddressSlot::Business => &self.business_address,
            AddressSlot::Private => &self.private_address,
        }
    }

    pub fn address_mut(&mut self, slot: AddressSlot) -> &mut PostalAddress {
        match slot {
            AddressSlot::Business => &mut self.business_address,
            AddressSlot::Private => &mut self.private_address,
        }
    }
}

/// Semantic type tag of a remote phone number
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PhoneTag {
    Home,
    Work,
    Cell,
    Fax,
    Other,
}

/// Semantic type of a remote email address
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EmailKind {
    Work,
    Home,
    Other,
}

/// Semantic type of a remote postal address
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AddressKind {
    Work,
    Home,
}

/// The five local phone slots
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PhoneSlot {
    Business,
    Mobile,
    Private,
    PrivateMobile,
    Fax,
}

impl PhoneSlot {
    /// Priority order used when inferring the slot of an untyped number
    pub const INFERENCE_ORDER: [PhoneSlot; 5] = [
        PhoneSlot::Private,
        PhoneSlot::Mobile,
        PhoneSlot::Business,
        PhoneSlot::Fax,
        PhoneSlot::PrivateMobile,
    ];

    /// Tag list written to the remote side for this slot
    pub fn tags(&self) -> Vec<PhoneTag> {
        match self {
            PhoneSlot::Business => vec![PhoneTag::Work],
            PhoneSlot::Mobile => vec![PhoneTag::Cell],
            PhoneSlot::Private => vec![PhoneTag::Home],
            PhoneSlot::Fax => vec![PhoneTag::Fax, PhoneTag::Work],
            PhoneSlot::PrivateMobile => vec![PhoneTag::Cell, PhoneTag::Home],
        }
    }

    /// Resolve a remote tag list back to a slot (order-insensitive)
    pub fn from_tags(tags: &[PhoneTag]) -> Option<Self> {
        let mut sorted = tags.to_vec();
        sorted.sort();
        sorted.dedup();

        match sorted.as_slice() {
            [PhoneTag::Work] => Some(PhoneSlot::Business),
            [PhoneTag::Cell] => Some(PhoneSlot::Mobile),
            [PhoneTag::Home] => Some(PhoneSlot::Private),
            [PhoneTag::Fax] | [PhoneTag::Work, PhoneTag::Fax] => Some(PhoneSlot::Fax),
            [PhoneTag::Home, PhoneTag::Cell] => Some(PhoneSlot::PrivateMobile),
            _ => None,
        }
    }
}

/// The two local email slots
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EmailSlot {
    Work,
    Private,
}

impl EmailSlot {
    pub const INFERENCE_ORDER: [EmailSlot; 2] = [EmailSlot::Work, EmailSlot::Private];

    pub fn kind(&self) -> EmailKind {
        match self {
            EmailSlot::Work => EmailKind::Work,
            EmailSlot::Private => EmailKind::Home,
        }
    }

    pub fn from_kind(kind: EmailKind) -> Option<Self> {
        match kind {
            EmailKind::Work => Some(EmailSlot::Work),
            EmailKind::Home => Some(EmailSlot::Private),
            EmailKind::Other => None,
        }
    }
}

/// The two local address blocks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AddressSlot {
    Business,
    Private,
}

impl AddressSlot {
    pub const ALL: [AddressSlot; 2] = [AddressSlot::Business, AddressSlot::Private];

    pub fn kind(&self) -> AddressKind {
        match self {
            AddressSlot::Business => AddressKind::Work,
            AddressSlot::Private => AddressKind::Home,
        }
    }
}

/// A remote email entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteEmail {
    pub address: String,
    #[serde(default, rename = "type")]
    pub kind: Option<EmailKind>,
}

impl RemoteEmail {
    pub fn typed(address: impl Into<String>, kind: EmailKind) -> Self {
        Self {
            address: address.into(),
            kind: Some(kind),
        }
    }

    pub fn untyped(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            kind: None,
        }
    }

    pub fn is_untyped(&self) -> bool {
        self.kind.is_none()
    }
}

/// A remote phone number entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteNumber {
    pub number: String,
    #[serde(default, rename = "type")]
    pub tags: Option<Vec<PhoneTag>>,
}

impl RemoteNumber {
    pub fn typed(number: impl Into<String>, slot: PhoneSlot) -> Self {
        Self {
            number: number.into(),
            tags: Some(slot.tags()),
        }
    }

    pub fn untyped(number: impl Into<String>) -> Self {
        Self {
            number: number.into(),
            tags: None,
        }
    }

    /// A number without tags, or with an empty tag list, is untyped
    pub fn is_untyped(&self) -> bool {
        self.tags.as_ref().is_none_or(|tags| tags.is_empty())
    }

    /// The local slot this number maps to, if its tags name one
    pub fn slot(&self) -> Option<PhoneSlot> {
        self.tags.as_deref().and_then(PhoneSlot::from_tags)
    }
}

/// A remote postal address entry
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteAddress {
    #[serde(default, rename = "type")]
    pub kind: Option<AddressKind>,
    #[serde(flatten)]
    pub address: PostalAddress,
}

/// Remote directory entry
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteContact {
    /// Assigned by the remote system; `None` until created
    pub id: Option<String>,
    #[serde(default)]
    pub name: String,
    pub given_name: Option<String>,
    pub family_name: Option<String>,
    pub organization: Option<String>,
    pub division: Option<String>,
    #[serde(default)]
    pub emails: Vec<RemoteEmail>,
    #[serde(default)]
    pub numbers: Vec<RemoteNumber>,
    #[serde(default)]
    pub addresses: Vec<RemoteAddress>,
}

impl RemoteContact {
    /// Create a named contact with no id
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn with_number(mut self, number: RemoteNumber) -> Self {
        self.numbers.push(number);
        self
    }

    pub fn with_email(mut self, email: RemoteEmail) -> Self {
        self.emails.push(email);
        self
    }

    /// First number whose tags resolve to the given slot
    pub fn phone(&self, slot: PhoneSlot) -> Option<&str> {
        self.numbers
            .iter()
            .find(|n| n.slot() == Some(slot))
            .map(|n| n.number.as_str())
    }

    /// Replace (or remove, on `None`) the number held in a slot
    pub fn set_phone(&mut self, slot: PhoneSlot, value: Option<&str>) {
        let position = self.numbers.iter().position(|n| n.slot() == Some(slot));
        match (position, value.filter(|v| !v.trim().is_empty())) {
            (Some(i), Some(v)) => self.numbers[i].number = v.trim().to_string(),
            (Some(i), None) => {
                self.numbers.remove(i);
            }
            (None, Some(v)) => self.numbers.push(RemoteNumber::typed(v.trim(), slot)),
            (None, None) => {}
        }
    }

    /// First email whose kind resolves to the given slot
    pub fn email(&self, slot: EmailSlot) -> Option<&str> {
        self.emails
            .iter()
            .find(|e| e.kind.and_then(EmailSlot::from_kind) == Some(slot))
            .map(|e| e.address.as_str())
    }

    /// Replace (or remove, on `None`) the email held in a slot
    pub fn set_email(&mut self, slot: EmailSlot, value: Option<&str>) {
        let position = self
            .emails
            .iter()
            .position(|e| e.kind.and_then(EmailSlot::from_kind) == Some(slot));
        match (position, value.filter(|v| !v.trim().is_empty())) {
            (Some(i), Some(v)) => self.emails[i].address = v.trim().to_string(),
            (Some(i), None) => {
                self.emails.remove(i);
            }
            (None, Some(v)) => self.emails.push(RemoteEmail::typed(v.trim(), slot.kind())),
            (None, None) => {}
        }
    }

    /// First address block of the slot's kind
    pub fn address(&self, slot: AddressSlot) -> Option<&PostalAddress> {
        self.addresses
            .iter()
            .find(|a| a.kind == Some(slot.kind()))
            .map(|a| &a.address)
    }

    /// Address block of the slot's kind, created empty if missing
    pub fn address_mut(&mut self, slot: AddressSlot) -> &mut PostalAddress {
        let kind = Some(slot.kind());
        let index = match self.addresses.iter().position(|a| a.kind == kind) {
            Some(i) => i,
            None => {
                self.addresses.push(RemoteAddress {
                    kind,
                    address: PostalAddress::default(),
                });
                self.addresses.len() - 1
            }
        };
        &mut self.addresses[index].address
    }

    /// Drop address blocks whose sub-fields are all blank
    pub fn prune_blank_addresses(&mut self) {
        self.addresses.retain(|a| !a.address.is_blank());
    }
}

/// True for `None`, empty and whitespace-only values
pub fn is_blank(value: Option<&str>) -> bool {
    value.is_none_or(|v| v.trim().is_empty())
}

/// Join name parts with a single space and trim the result
pub fn join_name(first: Option<&str>, last: Option<&str>) -> String {
    format!("{} {}", first.unwrap_or("").trim(), last.unwrap_or("").trim())
        .trim()
        .to_string()
}
