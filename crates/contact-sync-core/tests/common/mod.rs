//! Test doubles and common utilities for contract tests
//!
//! This module provides in-memory stand-ins for the collaborators of the
//! sync engine, with call counters and failure injection.

#![allow(dead_code)]

use contact_sync_core::contact::{EmailSlot, PhoneSlot};
use contact_sync_core::error::{Error, Result};
use contact_sync_core::{
    ConfigSnapshot, ConfigurationSource, LocalContact, LocalContactStore, LocalId, RemoteContact,
    RemoteContactService, SyncConfig, SyncEvent,
};
use std::collections::{BTreeMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::{Semaphore, mpsc};

#[derive(Default)]
struct Directory {
    contacts: BTreeMap<String, RemoteContact>,
    next_id: usize,
}

/// An in-memory remote directory that tracks calls
///
/// With `strip_types` set, stored numbers and emails lose their type tags,
/// the way the real directory behaves.
pub struct MockRemoteService {
    directory: Arc<Mutex<Directory>>,
    list_call_count: Arc<AtomicUsize>,
    create_call_count: Arc<AtomicUsize>,
    update_call_count: Arc<AtomicUsize>,
    delete_call_count: Arc<AtomicUsize>,
    /// Contact names whose create fails
    failing_creates: Arc<Mutex<HashSet<String>>>,
    /// Contact ids whose update fails
    failing_updates: Arc<Mutex<HashSet<String>>>,
    fail_list: Arc<AtomicBool>,
    /// When set, list() waits for a permit
    list_gate: Option<Arc<Semaphore>>,
    strip_types: bool,
}

impl MockRemoteService {
    pub fn new() -> Self {
        Self {
            directory: Arc::new(Mutex::new(Directory::default())),
            list_call_count: Arc::new(AtomicUsize::new(0)),
            create_call_count: Arc::new(AtomicUsize::new(0)),
            update_call_count: Arc::new(AtomicUsize::new(0)),
            delete_call_count: Arc::new(AtomicUsize::new(0)),
            failing_creates: Arc::new(Mutex::new(HashSet::new())),
            failing_updates: Arc::new(Mutex::new(HashSet::new())),
            fail_list: Arc::new(AtomicBool::new(false)),
            list_gate: None,
            strip_types: false,
        }
    }

    /// A directory that drops type tags of numbers and emails on store
    pub fn stripping_types() -> Self {
        Self {
            strip_types: true,
            ..Self::new()
        }
    }

    /// Block list() until permits are added to the returned semaphore
    pub fn with_list_gate(mut self) -> (Self, Arc<Semaphore>) {
        let gate = Arc::new(Semaphore::new(0));
        self.list_gate = Some(Arc::clone(&gate));
        (self, gate)
    }

    /// Create a new MockRemoteService that shares state with an existing one
    pub fn sharing_state_with(other: &Self) -> Self {
        Self {
            directory: Arc::clone(&other.directory),
            list_call_count: Arc::clone(&other.list_call_count),
            create_call_count: Arc::clone(&other.create_call_count),
            update_call_count: Arc::clone(&other.update_call_count),
            delete_call_count: Arc::clone(&other.delete_call_count),
            failing_creates: Arc::clone(&other.failing_creates),
            failing_updates: Arc::clone(&other.failing_updates),
            fail_list: Arc::clone(&other.fail_list),
            list_gate: other.list_gate.clone(),
            strip_types: other.strip_types,
        }
    }

    /// Put a contact into the directory directly, returning its id
    pub fn insert(&self, contact: RemoteContact) -> String {
        let mut directory = self.directory.lock().unwrap();
        let id = match &contact.id {
            Some(id) => id.clone(),
            None => {
                directory.next_id += 1;
                format!("r-{:03}", directory.next_id)
            }
        };
        let stored = self.stored_form(RemoteContact {
            id: Some(id.clone()),
            ..contact
        });
        directory.contacts.insert(id.clone(), stored);
        id
    }

    /// Edit a stored contact in place, bypassing the engine
    pub fn edit(&self, id: &str, f: impl FnOnce(&mut RemoteContact)) {
        let mut directory = self.directory.lock().unwrap();
        let contact = directory.contacts.get_mut(id).expect("contact exists");
        f(contact);
    }

    pub fn remove(&self, id: &str) {
        self.directory.lock().unwrap().contacts.remove(id);
    }

    pub fn get(&self, id: &str) -> Option<RemoteContact> {
        self.directory.lock().unwrap().contacts.get(id).cloned()
    }

    pub fn contacts(&self) -> Vec<RemoteContact> {
        self.directory.lock().unwrap().contacts.values().cloned().collect()
    }

    pub fn find_by_name(&self, name: &str) -> Vec<RemoteContact> {
        self.contacts().into_iter().filter(|c| c.name == name).collect()
    }

    pub fn fail_create_for(&self, name: &str) {
        self.failing_creates.lock().unwrap().insert(name.to_string());
    }

    pub fn fail_update_for(&self, id: &str) {
        self.failing_updates.lock().unwrap().insert(id.to_string());
    }

    pub fn clear_failures(&self) {
        self.failing_creates.lock().unwrap().clear();
        self.failing_updates.lock().unwrap().clear();
        self.fail_list.store(false, Ordering::SeqCst);
    }

    pub fn fail_list(&self) {
        self.fail_list.store(true, Ordering::SeqCst);
    }

    pub fn list_call_count(&self) -> usize {
        self.list_call_count.load(Ordering::SeqCst)
    }

    pub fn create_call_count(&self) -> usize {
        self.create_call_count.load(Ordering::SeqCst)
    }

    pub fn update_call_count(&self) -> usize {
        self.update_call_count.load(Ordering::SeqCst)
    }

    pub fn delete_call_count(&self) -> usize {
        self.delete_call_count.load(Ordering::SeqCst)
    }

    fn stored_form(&self, mut contact: RemoteContact) -> RemoteContact {
        if self.strip_types {
            for number in &mut contact.numbers {
                number.tags = None;
            }
            for email in &mut contact.emails {
                email.kind = None;
            }
        }
        contact
    }
}

#[async_trait::async_trait]
impl RemoteContactService for MockRemoteService {
    async fn list(&self) -> Result<Vec<RemoteContact>> {
        self.list_call_count.fetch_add(1, Ordering::SeqCst);
        if let Some(gate) = &self.list_gate {
            gate.acquire()
                .await
                .map_err(|e| Error::remote(e.to_string()))?
                .forget();
        }
        if self.fail_list.load(Ordering::SeqCst) {
            return Err(Error::remote("list: connection reset"));
        }
        Ok(self.contacts())
    }

    async fn create(&self, contact: &RemoteContact) -> Result<String> {
        self.create_call_count.fetch_add(1, Ordering::SeqCst);
        if self.failing_creates.lock().unwrap().contains(&contact.name) {
            return Err(Error::remote(format!("create '{}': 503", contact.name)));
        }
        Ok(self.insert(RemoteContact {
            id: None,
            ..contact.clone()
        }))
    }

    async fn update(&self, id: &str, contact: &RemoteContact) -> Result<()> {
        self.update_call_count.fetch_add(1, Ordering::SeqCst);
        if self.failing_updates.lock().unwrap().contains(id) {
            return Err(Error::remote(format!("update {}: 503", id)));
        }
        let stored = self.stored_form(RemoteContact {
            id: Some(id.to_string()),
            ..contact.clone()
        });
        let mut directory = self.directory.lock().unwrap();
        match directory.contacts.get_mut(id) {
            Some(existing) => {
                *existing = stored;
                Ok(())
            }
            None => Err(Error::remote(format!("update {}: 404", id))),
        }
    }

    async fn delete(&self, id: &str) -> Result<()> {
        self.delete_call_count.fetch_add(1, Ordering::SeqCst);
        self.directory.lock().unwrap().contacts.remove(id);
        Ok(())
    }

    fn service_name(&self) -> &'static str {
        "mock-directory"
    }
}

/// An in-memory local record store that tracks saves
pub struct MockLocalStore {
    contacts: Arc<Mutex<BTreeMap<LocalId, LocalContact>>>,
    save_call_count: Arc<AtomicUsize>,
    fail_list: Arc<AtomicBool>,
}

impl MockLocalStore {
    pub fn new(contacts: Vec<LocalContact>) -> Self {
        Self {
            contacts: Arc::new(Mutex::new(
                contacts.into_iter().map(|c| (c.id.clone(), c)).collect(),
            )),
            save_call_count: Arc::new(AtomicUsize::new(0)),
            fail_list: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Create a new MockLocalStore that shares state with an existing one
    pub fn sharing_state_with(other: &Self) -> Self {
        Self {
            contacts: Arc::clone(&other.contacts),
            save_call_count: Arc::clone(&other.save_call_count),
            fail_list: Arc::clone(&other.fail_list),
        }
    }

    pub fn get(&self, id: &str) -> LocalContact {
        self.contacts
            .lock()
            .unwrap()
            .get(&LocalId::new(id))
            .cloned()
            .expect("local record exists")
    }

    pub fn edit(&self, id: &str, f: impl FnOnce(&mut LocalContact)) {
        let mut contacts = self.contacts.lock().unwrap();
        f(contacts.get_mut(&LocalId::new(id)).expect("local record exists"));
    }

    pub fn save_call_count(&self) -> usize {
        self.save_call_count.load(Ordering::SeqCst)
    }

    pub fn fail_list(&self) {
        self.fail_list.store(true, Ordering::SeqCst);
    }
}

#[async_trait::async_trait]
impl LocalContactStore for MockLocalStore {
    async fn list_syncable(&self) -> Result<Vec<LocalContact>> {
        if self.fail_list.load(Ordering::SeqCst) {
            return Err(Error::store("local database unavailable"));
        }
        Ok(self.contacts.lock().unwrap().values().cloned().collect())
    }

    async fn save(&self, contact: &LocalContact) -> Result<()> {
        self.save_call_count.fetch_add(1, Ordering::SeqCst);
        self.contacts
            .lock()
            .unwrap()
            .insert(contact.id.clone(), contact.clone());
        Ok(())
    }
}

/// A configuration source that counts fetches
pub struct CountingSource {
    fetch_call_count: Arc<AtomicUsize>,
}

impl CountingSource {
    pub fn new() -> Self {
        Self {
            fetch_call_count: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn fetch_call_count(&self) -> usize {
        self.fetch_call_count.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl ConfigurationSource for CountingSource {
    async fn fetch_snapshot(&self) -> Result<ConfigSnapshot> {
        let n = self.fetch_call_count.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(ConfigSnapshot::new(
            Vec::new(),
            serde_json::json!({ "generation": n }),
        ))
    }
}

/// A fully populated local record
pub fn jane() -> LocalContact {
    let mut contact = LocalContact::new("1")
        .with_name("Jane", "Doe")
        .with_phone(PhoneSlot::Business, "+49 561 316793-0")
        .with_phone(PhoneSlot::Mobile, "+49 170 1234567")
        .with_email(EmailSlot::Work, "jane.doe@acme.example")
        .with_email(EmailSlot::Private, "jane@home.example");
    contact.organization = Some("ACME".to_string());
    contact.division = Some("Sales".to_string());
    contact.business_address.street = Some("Main St 1".to_string());
    contact.business_address.zip = Some("34117".to_string());
    contact.business_address.city = Some("Kassel".to_string());
    contact
}

pub fn john() -> LocalContact {
    LocalContact::new("2")
        .with_name("John", "Smith")
        .with_phone(PhoneSlot::Private, "0561 998877")
}

/// Helper to create a minimal SyncConfig for testing
pub fn minimal_config() -> SyncConfig {
    SyncConfig {
        event_channel_capacity: 100,
        ..SyncConfig::new().with_country_hint("49")
    }
}

/// Drain every event emitted so far
pub fn drain_events(rx: &mut mpsc::Receiver<SyncEvent>) -> Vec<SyncEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}
