//! In-memory record store for tests.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use crate::model::{NewRecord, Record, RecordUpdate};
use crate::remote::{RecordStore, StoreError};

#[derive(Default)]
pub struct MemoryStore {
    records: Mutex<Vec<Record>>,
    /// Every update payload received, serialized, for assertions on the wire shape
    pub update_payloads: Mutex<Vec<serde_json::Value>>,
    /// When set, every call fails with this transport error
    pub offline: Mutex<Option<String>>,
    pub calls: AtomicUsize,
}

impl MemoryStore {
    pub fn with_records(records: Vec<Record>) -> Self {
        Self {
            records: Mutex::new(records),
            ..Default::default()
        }
    }

    pub fn set_offline(&self, message: Option<&str>) {
        *self.offline.lock().unwrap() = message.map(str::to_string);
    }

    pub fn records(&self) -> Vec<Record> {
        self.records.lock().unwrap().clone()
    }

    fn check(&self) -> Result<(), StoreError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match self.offline.lock().unwrap().as_ref() {
            Some(message) => Err(StoreError::Transport(message.clone())),
            None => Ok(()),
        }
    }
}

fn not_found() -> StoreError {
    StoreError::Remote {
        status: 404,
        message: "RESOURCE_NOT_FOUND".to_string(),
    }
}

impl RecordStore for MemoryStore {
    async fn list(&self, limit: usize) -> Result<Vec<Record>, StoreError> {
        self.check()?;
        Ok(self.records().into_iter().take(limit).collect())
    }

    async fn get(&self, id: &str) -> Result<Record, StoreError> {
        self.check()?;
        self.records()
            .into_iter()
            .find(|record| record.id == id)
            .ok_or_else(not_found)
    }

    async fn create(&self, record: &NewRecord) -> Result<Record, StoreError> {
        self.check()?;
        let mut records = self.records.lock().unwrap();
        if records
            .iter()
            .any(|existing| existing.email.as_deref() == Some(record.email.as_str()))
        {
            return Err(StoreError::Remote {
                status: 400,
                message: "BODY_NOT_VALID".to_string(),
            });
        }
        let created = Record {
            id: uuid::Uuid::new_v4().simple().to_string(),
            title: None,
            first_name: record.first_name.clone(),
            last_name: record.last_name.clone(),
            email: Some(record.email.clone()),
            phone: Some(record.phone.clone()).filter(|p| !p.is_empty()),
            picture: Some(record.picture.clone()),
            register_date: Some("2024-03-01T10:00:00.000Z".to_string()),
            updated_date: Some("2024-03-01T10:00:00.000Z".to_string()),
        };
        records.push(created.clone());
        Ok(created)
    }

    async fn update(&self, id: &str, update: &RecordUpdate) -> Result<Record, StoreError> {
        self.check()?;
        self.update_payloads
            .lock()
            .unwrap()
            .push(serde_json::to_value(update).unwrap());
        let mut records = self.records.lock().unwrap();
        let record = records
            .iter_mut()
            .find(|record| record.id == id)
            .ok_or_else(not_found)?;
        record.first_name = update.first_name.clone();
        record.last_name = update.last_name.clone();
        record.phone = Some(update.phone.clone()).filter(|p| !p.is_empty());
        record.picture = Some(update.picture.clone());
        Ok(record.clone())
    }

    async fn delete(&self, id: &str) -> Result<(), StoreError> {
        self.check()?;
        let mut records = self.records.lock().unwrap();
        let before = records.len();
        records.retain(|record| record.id != id);
        if records.len() == before {
            return Err(not_found());
        }
        Ok(())
    }
}
