use tracing::debug;

use crate::model::{NewRecord, Record, RecordUpdate};
use crate::remote::{RecordStore, StoreError};

/// A store call prepared by the controller, ready to run off the UI thread.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Request {
    Refresh { seq: u64, limit: usize },
    /// `submission` ties the save to the form that started it.
    Create {
        record: NewRecord,
        submission: Option<u64>,
    },
    Update {
        id: String,
        update: RecordUpdate,
        submission: Option<u64>,
    },
    Delete { id: String },
    Detail { id: String },
}

impl Request {
    pub(super) fn with_submission(self, ticket: u64) -> Self {
        match self {
            Request::Create { record, .. } => Request::Create {
                record,
                submission: Some(ticket),
            },
            Request::Update { id, update, .. } => Request::Update {
                id,
                update,
                submission: Some(ticket),
            },
            other => other,
        }
    }
}

/// Result of a `Request`, handed back to `RecordListController::complete`.
#[derive(Debug, Clone)]
pub enum Completion {
    Refresh {
        seq: u64,
        result: Result<Vec<Record>, StoreError>,
    },
    Create {
        submission: Option<u64>,
        result: Result<Record, StoreError>,
    },
    Update {
        id: String,
        submission: Option<u64>,
        result: Result<Record, StoreError>,
    },
    Delete {
        id: String,
        result: Result<(), StoreError>,
    },
    Detail {
        id: String,
        result: Result<Record, StoreError>,
    },
}

pub async fn execute<S: RecordStore>(store: &S, request: Request) -> Completion {
    debug!(?request, "executing store request");
    match request {
        Request::Refresh { seq, limit } => Completion::Refresh {
            seq,
            result: store.list(limit).await,
        },
        Request::Create { record, submission } => Completion::Create {
            submission,
            result: store.create(&record).await,
        },
        Request::Update {
            id,
            update,
            submission,
        } => {
            let result = store.update(&id, &update).await;
            Completion::Update {
                id,
                submission,
                result,
            }
        }
        Request::Delete { id } => {
            let result = store.delete(&id).await;
            Completion::Delete { id, result }
        }
        Request::Detail { id } => {
            let result = store.get(&id).await;
            Completion::Detail { id, result }
        }
    }
}
