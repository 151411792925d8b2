//! The record list controller.
//!
//! Owns everything the screen shows about the remote store: the canonical
//! list and its filtered view, the open detail panel and the open form.
//! Store calls are split into `Request` (prepared here) and `Completion`
//! (applied here) so the TUI can run them on the runtime; the async methods
//! at the bottom compose both halves for the CLI.

mod form;
mod request;

use std::collections::HashSet;
use std::sync::Arc;

use thiserror::Error;
use tracing::{debug, warn};

use crate::model::{Record, RecordInput};
use crate::notify::NotificationSink;
use crate::remote::{RecordStore, StoreError};
use crate::search;
use crate::validate::{self, Mode, ValidationErrors};

pub use form::{FormMode, FormState};
pub use request::{execute, Completion, Request};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OperationError {
    #[error("{0}")]
    Validation(ValidationErrors),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("delete already in progress for {0}")]
    InFlight(String),
    #[error("a submission is already in progress")]
    Busy,
    #[error("no form is open")]
    NoForm,
    #[error("no contact with id {0} in the list")]
    UnknownRecord(String),
    /// The response no longer matches what is on screen.
    #[error("response discarded")]
    Discarded,
}

// =============================================================================
// List state
// =============================================================================

/// Canonical records in server order plus the view filtered by `query`.
#[derive(Debug, Default)]
pub struct ListState {
    canonical: Vec<Record>,
    query: String,
    view: Vec<Record>,
    selected: Option<usize>,
}

impl ListState {
    pub fn canonical(&self) -> &[Record] {
        &self.canonical
    }

    pub fn view(&self) -> &[Record] {
        &self.view
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    pub fn selected(&self) -> Option<usize> {
        self.selected
    }

    pub fn selected_record(&self) -> Option<&Record> {
        self.selected.and_then(|idx| self.view.get(idx))
    }

    fn replace(&mut self, records: Vec<Record>) {
        self.canonical = records;
        self.recompute();
    }

    fn set_query(&mut self, query: &str) {
        if self.query == query {
            return;
        }
        self.query = query.to_string();
        self.recompute();
    }

    /// Rebuild `view`, keeping the selection on the same record when it survives.
    fn recompute(&mut self) {
        let keep = self.selected_record().map(|record| record.id.clone());
        self.view = search::filter(&self.canonical, &self.query);

        if self.view.is_empty() {
            self.selected = None;
            return;
        }

        let by_id = keep.and_then(|id| self.view.iter().position(|record| record.id == id));
        self.selected = Some(match (by_id, self.selected) {
            (Some(idx), _) => idx,
            (None, Some(idx)) => idx.min(self.view.len() - 1),
            (None, None) => 0,
        });
    }

    fn move_selection(&mut self, delta: isize) {
        if self.view.is_empty() {
            self.selected = None;
            return;
        }
        let last = self.view.len() as isize - 1;
        let current = self.selected.map(|idx| idx as isize).unwrap_or(0);
        self.selected = Some((current + delta).clamp(0, last) as usize);
    }
}

// =============================================================================
// Detail state
// =============================================================================

/// The open detail panel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DetailState {
    Loading { id: String },
    Loaded(Record),
    Failed { id: String, message: String },
}

impl DetailState {
    pub fn id(&self) -> &str {
        match self {
            DetailState::Loading { id } | DetailState::Failed { id, .. } => id,
            DetailState::Loaded(record) => &record.id,
        }
    }
}

// =============================================================================
// Controller
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// The store call succeeded and state was updated.
    Applied,
    /// A stale refresh or a detail response for a panel no longer open.
    Discarded,
    /// Created or updated record as returned by the store.
    Saved(Record),
    Loaded(Record),
}

/// Result of applying a completion, plus the refresh to issue next.
#[derive(Debug)]
pub struct Settled {
    pub result: Result<Outcome, OperationError>,
    pub follow_up: Option<Request>,
}

impl Settled {
    fn done(result: Result<Outcome, OperationError>) -> Self {
        Self {
            result,
            follow_up: None,
        }
    }
}

pub struct RecordListController<S, N> {
    store: Arc<S>,
    sink: N,
    page_size: usize,
    default_picture: String,
    list: ListState,
    detail: Option<DetailState>,
    form: Option<FormState>,
    refresh_issued: u64,
    refresh_settled: u64,
    refresh_applied: u64,
    refresh_error: Option<StoreError>,
    deleting: HashSet<String>,
    submissions: u64,
}

impl<S: RecordStore, N: NotificationSink> RecordListController<S, N> {
    pub fn new(store: Arc<S>, sink: N, page_size: usize, default_picture: impl Into<String>) -> Self {
        Self {
            store,
            sink,
            page_size,
            default_picture: default_picture.into(),
            list: ListState::default(),
            detail: None,
            form: None,
            refresh_issued: 0,
            refresh_settled: 0,
            refresh_applied: 0,
            refresh_error: None,
            deleting: HashSet::new(),
            submissions: 0,
        }
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    pub fn sink(&self) -> &N {
        &self.sink
    }

    pub fn list(&self) -> &ListState {
        &self.list
    }

    pub fn detail(&self) -> Option<&DetailState> {
        self.detail.as_ref()
    }

    pub fn form(&self) -> Option<&FormState> {
        self.form.as_ref()
    }

    pub fn form_mut(&mut self) -> Option<&mut FormState> {
        self.form.as_mut()
    }

    /// True while the newest refresh has not come back yet.
    pub fn is_loading(&self) -> bool {
        self.refresh_settled < self.refresh_issued
    }

    /// Error from the most recent failed refresh, cleared by the next success.
    pub fn last_refresh_error(&self) -> Option<&StoreError> {
        self.refresh_error.as_ref()
    }

    pub fn is_deleting(&self, id: &str) -> bool {
        self.deleting.contains(id)
    }

    pub fn set_query(&mut self, query: &str) {
        self.list.set_query(query);
    }

    pub fn move_selection(&mut self, delta: isize) {
        self.list.move_selection(delta);
    }

    // -------------------------------------------------------------------------
    // Request preparation
    // -------------------------------------------------------------------------

    pub fn refresh_request(&mut self) -> Request {
        self.refresh_issued += 1;
        self.refresh_error = None;
        Request::Refresh {
            seq: self.refresh_issued,
            limit: self.page_size,
        }
    }

    pub fn prepare_create(&mut self, input: &RecordInput) -> Result<Request, OperationError> {
        validate::validate(input, Mode::Create).map_err(OperationError::Validation)?;
        Ok(Request::Create {
            record: input.to_new_record(&self.default_picture),
            submission: None,
        })
    }

    pub fn prepare_update(&mut self, id: &str, input: &RecordInput) -> Result<Request, OperationError> {
        validate::validate(input, Mode::Update).map_err(OperationError::Validation)?;
        Ok(Request::Update {
            id: id.to_string(),
            update: input.to_update(&self.default_picture),
            submission: None,
        })
    }

    pub fn prepare_delete(&mut self, id: &str) -> Result<Request, OperationError> {
        if !self.deleting.insert(id.to_string()) {
            return Err(OperationError::InFlight(id.to_string()));
        }
        Ok(Request::Delete { id: id.to_string() })
    }

    /// Open the detail panel in its loading state.
    pub fn prepare_detail(&mut self, id: &str) -> Request {
        self.detail = Some(DetailState::Loading { id: id.to_string() });
        Request::Detail { id: id.to_string() }
    }

    pub fn close_detail(&mut self) {
        self.detail = None;
    }

    // -------------------------------------------------------------------------
    // Form
    // -------------------------------------------------------------------------

    pub fn open_create_form(&mut self) {
        self.form = Some(FormState::create());
    }

    /// Pre-fill from the canonical list.
    pub fn open_edit_form(&mut self, id: &str) -> Result<(), OperationError> {
        let record = self
            .list
            .canonical
            .iter()
            .find(|record| record.id == id)
            .ok_or_else(|| OperationError::UnknownRecord(id.to_string()))?;
        self.form = Some(FormState::edit(record));
        Ok(())
    }

    pub fn close_form(&mut self) {
        self.form = None;
    }

    pub fn submit_form(&mut self) -> Result<Request, OperationError> {
        let (mode, input) = match self.form.as_ref() {
            None => return Err(OperationError::NoForm),
            Some(form) if form.submitting() => return Err(OperationError::Busy),
            Some(form) => (form.mode.clone(), form.input.clone()),
        };

        let prepared = match &mode {
            FormMode::Create => self.prepare_create(&input),
            FormMode::Edit { id } => self.prepare_update(id, &input),
        };
        let prepared = prepared.map(|request| {
            self.submissions += 1;
            request.with_submission(self.submissions)
        });

        let ticket = self.submissions;
        if let Some(form) = self.form.as_mut() {
            match &prepared {
                Ok(_) => {
                    form.errors = ValidationErrors::default();
                    form.submission = Some(ticket);
                }
                Err(OperationError::Validation(errors)) => form.errors = errors.clone(),
                Err(_) => {}
            }
        }
        prepared
    }

    fn submitted_form(&mut self, submission: Option<u64>) -> Option<&mut FormState> {
        let ticket = submission?;
        self.form
            .as_mut()
            .filter(|form| form.submission == Some(ticket))
    }

    /// Leave the form open with its input so the user can retry.
    fn release_form(&mut self, submission: Option<u64>) {
        if let Some(form) = self.submitted_form(submission) {
            form.submission = None;
        }
    }

    fn close_submitted_form(&mut self, submission: Option<u64>) {
        if self.submitted_form(submission).is_some() {
            self.form = None;
        }
    }

    // -------------------------------------------------------------------------
    // Completion
    // -------------------------------------------------------------------------

    pub fn complete(&mut self, completion: Completion) -> Settled {
        match completion {
            Completion::Refresh { seq, result } => Settled::done(self.apply_refresh(seq, result)),
            Completion::Create { submission, result } => match result {
                Ok(record) => {
                    self.sink.success("Contact created successfully");
                    self.close_submitted_form(submission);
                    Settled {
                        result: Ok(Outcome::Saved(record)),
                        follow_up: Some(self.refresh_request()),
                    }
                }
                Err(err) => {
                    self.sink.error(&format!("Error creating contact: {}", err));
                    self.release_form(submission);
                    Settled::done(Err(err.into()))
                }
            },
            Completion::Update {
                id,
                submission,
                result,
            } => match result {
                Ok(record) => {
                    self.sink.success("Contact updated successfully");
                    self.close_submitted_form(submission);
                    if matches!(&self.detail, Some(DetailState::Loaded(open)) if open.id == id) {
                        self.detail = Some(DetailState::Loaded(record.clone()));
                    }
                    Settled {
                        result: Ok(Outcome::Saved(record)),
                        follow_up: Some(self.refresh_request()),
                    }
                }
                Err(err) => {
                    self.sink.error(&format!("Error updating contact: {}", err));
                    self.release_form(submission);
                    Settled::done(Err(err.into()))
                }
            },
            Completion::Delete { id, result } => {
                self.deleting.remove(&id);
                match result {
                    Ok(()) => {
                        self.sink.success("Contact deleted successfully");
                        if self.detail.as_ref().is_some_and(|detail| detail.id() == id) {
                            self.detail = None;
                        }
                        Settled {
                            result: Ok(Outcome::Applied),
                            follow_up: Some(self.refresh_request()),
                        }
                    }
                    Err(err) => {
                        self.sink.error(&format!("Error deleting contact: {}", err));
                        Settled::done(Err(err.into()))
                    }
                }
            }
            Completion::Detail { id, result } => Settled::done(self.apply_detail(id, result)),
        }
    }

    fn apply_refresh(
        &mut self,
        seq: u64,
        result: Result<Vec<Record>, StoreError>,
    ) -> Result<Outcome, OperationError> {
        self.refresh_settled = self.refresh_settled.max(seq);
        if seq <= self.refresh_applied {
            debug!(seq, applied = self.refresh_applied, "dropping stale refresh");
            return Ok(Outcome::Discarded);
        }
        match result {
            Ok(records) => {
                debug!(seq, count = records.len(), "refreshed contact list");
                self.refresh_applied = seq;
                self.refresh_error = None;
                self.list.replace(records);
                Ok(Outcome::Applied)
            }
            Err(err) => {
                warn!(seq, error = %err, "failed to refresh contact list");
                if seq == self.refresh_issued {
                    self.refresh_error = Some(err.clone());
                }
                Err(err.into())
            }
        }
    }

    fn apply_detail(&mut self, id: String, result: Result<Record, StoreError>) -> Result<Outcome, OperationError> {
        let waiting = matches!(&self.detail, Some(DetailState::Loading { id: open }) if *open == id);
        if !waiting {
            debug!(%id, "dropping detail response for a closed panel");
            return Ok(Outcome::Discarded);
        }
        match result {
            Ok(record) => {
                self.detail = Some(DetailState::Loaded(record.clone()));
                Ok(Outcome::Loaded(record))
            }
            Err(err) => {
                self.sink.error(&format!("Error loading contact: {}", err));
                self.detail = Some(DetailState::Failed {
                    id,
                    message: err.to_string(),
                });
                Err(err.into())
            }
        }
    }

    // -------------------------------------------------------------------------
    // Async convenience layer
    // -------------------------------------------------------------------------

    async fn run(&mut self, request: Request) -> Result<Outcome, OperationError> {
        let completion = execute(self.store.as_ref(), request).await;
        let settled = self.complete(completion);
        if let Some(follow_up) = settled.follow_up {
            let completion = execute(self.store.as_ref(), follow_up).await;
            self.complete(completion);
        }
        settled.result
    }

    /// Replace the canonical list. Returns whether it was replaced.
    pub async fn refresh(&mut self) -> bool {
        let request = self.refresh_request();
        matches!(self.run(request).await, Ok(Outcome::Applied))
    }

    pub async fn create(&mut self, input: &RecordInput) -> Result<Record, OperationError> {
        let request = self.prepare_create(input)?;
        match self.run(request).await? {
            Outcome::Saved(record) => Ok(record),
            _ => Err(OperationError::Discarded),
        }
    }

    pub async fn update(&mut self, id: &str, input: &RecordInput) -> Result<Record, OperationError> {
        let request = self.prepare_update(id, input)?;
        match self.run(request).await? {
            Outcome::Saved(record) => Ok(record),
            _ => Err(OperationError::Discarded),
        }
    }

    pub async fn delete(&mut self, id: &str) -> Result<(), OperationError> {
        let request = self.prepare_delete(id)?;
        self.run(request).await.map(|_| ())
    }

    pub async fn fetch_detail(&mut self, id: &str) -> Result<Record, OperationError> {
        let request = self.prepare_detail(id);
        match self.run(request).await? {
            Outcome::Loaded(record) => Ok(record),
            _ => Err(OperationError::Discarded),
        }
    }
}
