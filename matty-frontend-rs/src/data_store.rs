use crate::{Event, EventDraft, Interest};

#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    #[error("data store is unavailable: {0}")]
    Unavailable(String),
    #[error("no event with id {0}")]
    NotFound(String),
    #[error("permission denied: {0}")]
    PermissionDenied(String),
    #[error("malformed record {id}: {reason}")]
    Malformed { id: String, reason: String },
}

/// The remote side of the feed. Every call may fail; the feed decides what a failure means for the UI.
///
/// The futures are not `Send`: the feed runs on a single thread (the browser's, on wasm).
#[allow(async_fn_in_trait)]
pub trait DataStore {
    async fn fetch_all_interests(&self) -> Result<Vec<Interest>, StoreError>;

    /// Events the current user owns or participates in
    async fn fetch_user_events(&self) -> Result<Vec<Event>, StoreError>;

    /// Recommendations; the store decides what counts as relevant
    async fn fetch_relevant_events(&self) -> Result<Vec<Event>, StoreError>;

    async fn fetch_events(&self, interest: &Interest) -> Result<Vec<Event>, StoreError>;

    async fn join(&self, event: &Event) -> Result<(), StoreError>;

    async fn leave(&self, event: &Event) -> Result<(), StoreError>;

    /// Creates the event and returns it as stored, with its assigned id
    async fn add(&self, draft: EventDraft) -> Result<Event, StoreError>;

    async fn update(&self, event: &Event) -> Result<(), StoreError>;

    async fn remove(&self, event: &Event) -> Result<(), StoreError>;
}

/// The outcome of a list fetch, with "nothing there" kept apart from "could not ask".
#[derive(Clone, Debug, PartialEq)]
pub enum Fetched<T> {
    Loaded(Vec<T>),
    Empty,
    Failed(StoreError),
}

impl<T> From<Result<Vec<T>, StoreError>> for Fetched<T> {
    fn from(result: Result<Vec<T>, StoreError>) -> Self {
        match result {
            Ok(items) if items.is_empty() => Fetched::Empty,
            Ok(items) => Fetched::Loaded(items),
            Err(e) => Fetched::Failed(e),
        }
    }
}
