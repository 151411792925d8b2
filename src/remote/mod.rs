//! Remote record store abstraction and the HTTP client for the user API.
//!
//! This module provides:
//! - `RecordStore` trait for the five operations the controller needs
//! - `DummyApiStore`, the reqwest-backed implementation
//! - `StoreError`, the transport/remote error taxonomy

pub mod dummyapi;
#[cfg(test)]
pub mod memory;

use std::future::Future;

use thiserror::Error;

use crate::model::{NewRecord, Record, RecordUpdate};

pub use dummyapi::DummyApiStore;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// Non-2xx response. `message` is the server-supplied error when present.
    #[error("{message}")]
    Remote { status: u16, message: String },
    /// Network unreachable, timeout, TLS failure and the like.
    #[error("{0}")]
    Transport(String),
    #[error("unexpected response body: {0}")]
    Decode(String),
}

/// Trait for remote record store implementations.
///
/// Futures are `Send` so requests can be spawned onto the runtime while the
/// UI thread keeps handling input.
pub trait RecordStore: Send + Sync {
    /// Fetch up to `limit` records in server order
    fn list(&self, limit: usize) -> impl Future<Output = Result<Vec<Record>, StoreError>> + Send;

    /// Fetch a single record by id
    fn get(&self, id: &str) -> impl Future<Output = Result<Record, StoreError>> + Send;

    fn create(&self, record: &NewRecord) -> impl Future<Output = Result<Record, StoreError>> + Send;

    fn update(
        &self,
        id: &str,
        update: &RecordUpdate,
    ) -> impl Future<Output = Result<Record, StoreError>> + Send;

    fn delete(&self, id: &str) -> impl Future<Output = Result<(), StoreError>> + Send;
}
