//! Projection between local records and remote contacts
//!
//! [`to_remote`] is the push direction and always produces fully typed entries,
//! since every local value lives in a known slot. [`to_local`] is the reverse
//! mapping used when a local record is first created from a remote contact;
//! untyped remote entries are ignored there.

use crate::contact::{
    AddressSlot, EmailSlot, LocalContact, LocalId, PhoneSlot, RemoteAddress, RemoteContact,
    RemoteEmail, RemoteNumber, is_blank,
};
use crate::fields::split_name;

/// Project a local record onto the remote representation
///
/// Only non-blank values are included. An address block is included only if
/// at least one of its sub-fields is non-blank.
pub fn to_remote(local: &LocalContact) -> RemoteContact {
    let mut remote = RemoteContact {
        id: None,
        name: local.full_name(),
        given_name: non_blank(local.first_name.as_deref()),
        family_name: non_blank(local.last_name.as_deref()),
        organization: local.organization.clone(),
        division: local.division.clone(),
        emails: Vec::new(),
        numbers: Vec::new(),
        addresses: Vec::new(),
    };

    for slot in EmailSlot::INFERENCE_ORDER {
        if let Some(address) = non_blank(local.email(slot)) {
            remote.emails.push(RemoteEmail::typed(address, slot.kind()));
        }
    }

    for slot in [
        PhoneSlot::Business,
        PhoneSlot::Mobile,
        PhoneSlot::Private,
        PhoneSlot::PrivateMobile,
        PhoneSlot::Fax,
    ] {
        if let Some(number) = non_blank(local.phone(slot)) {
            remote.numbers.push(RemoteNumber::typed(number, slot));
        }
    }

    for slot in AddressSlot::ALL {
        let address = local.address(slot);
        if !address.is_blank() {
            remote.addresses.push(RemoteAddress {
                kind: Some(slot.kind()),
                address: address.clone(),
            });
        }
    }

    remote
}

/// Build a local record from a remote contact
///
/// The remote `name` is split heuristically: the last token becomes the last
/// name, the preceding tokens the first name. Typed entries land in their
/// slot (first entry wins when a slot repeats); untyped entries are skipped.
pub fn to_local(remote: &RemoteContact, id: LocalId) -> LocalContact {
    let mut local = LocalContact::new(id);

    let (first, last) = split_name(&remote.name);
    local.first_name = Some(first);
    local.last_name = Some(last);
    local.organization = remote.organization.clone();
    local.division = remote.division.clone();

    for email in &remote.emails {
        let Some(slot) = email.kind.and_then(EmailSlot::from_kind) else {
            continue;
        };
        let target = local.email_mut(slot);
        if target.is_none() {
            *target = non_blank(Some(&email.address));
        }
    }

    for number in &remote.numbers {
        let Some(slot) = number.slot() else {
            continue;
        };
        let target = local.phone_mut(slot);
        if target.is_none() {
            *target = non_blank(Some(&number.number));
        }
    }

    for slot in AddressSlot::ALL {
        if let Some(address) = remote.address(slot) {
            *local.address_mut(slot) = address.clone();
        }
    }

    local
}

fn non_blank(value: Option<&str>) -> Option<String> {
    if is_blank(value) {
        None
    } else {
        value.map(|v| v.trim().to_string())
    }
}
