//! A `DataStore` that answers with whatever the test queued, including answers that arrive only when the test says so.

use std::cell::RefCell;
use std::collections::VecDeque;

use chrono::{DateTime, Utc};
use futures::channel::oneshot;

use crate::data_store::{DataStore, StoreError};
use crate::{Event, EventDraft, Interest, User, UserStatus};

pub(crate) enum Reply<T> {
    Ready(Result<T, StoreError>),
    Later(oneshot::Receiver<Result<T, StoreError>>),
}

impl<T> Reply<T> {
    async fn resolve(self) -> Result<T, StoreError> {
        match self {
            Reply::Ready(result) => result,
            Reply::Later(receiver) => receiver
                .await
                .unwrap_or_else(|_| Err(StoreError::Unavailable("reply dropped".to_string()))),
        }
    }
}

pub(crate) type Replies<T> = RefCell<VecDeque<Reply<T>>>;

/// Unscripted calls succeed with an empty list, or the obvious value.
#[derive(Default)]
pub(crate) struct ScriptedStore {
    pub interests: Replies<Vec<Interest>>,
    pub user_events: Replies<Vec<Event>>,
    pub relevant_events: Replies<Vec<Event>>,
    pub found_events: Replies<Vec<Event>>,
    pub joins: Replies<()>,
    pub leaves: Replies<()>,
    pub adds: Replies<Event>,
    pub updates: Replies<()>,
    pub removes: Replies<()>,
    /// Every call made, in order
    pub calls: RefCell<Vec<String>>,
}

pub(crate) fn reply<T>(queue: &Replies<T>, result: Result<T, StoreError>) {
    queue.borrow_mut().push_back(Reply::Ready(result));
}

/// Queues a reply that stays pending until the returned sender is used.
pub(crate) fn reply_later<T>(queue: &Replies<T>) -> oneshot::Sender<Result<T, StoreError>> {
    let (sender, receiver) = oneshot::channel();
    queue.borrow_mut().push_back(Reply::Later(receiver));
    sender
}

impl ScriptedStore {
    fn next<T>(&self, call: String, queue: &Replies<T>, unscripted: T) -> Reply<T> {
        self.calls.borrow_mut().push(call);
        queue
            .borrow_mut()
            .pop_front()
            .unwrap_or(Reply::Ready(Ok(unscripted)))
    }
}

impl DataStore for ScriptedStore {
    async fn fetch_all_interests(&self) -> Result<Vec<Interest>, StoreError> {
        self.next("fetch_all_interests".to_string(), &self.interests, Vec::new())
            .resolve()
            .await
    }

    async fn fetch_user_events(&self) -> Result<Vec<Event>, StoreError> {
        self.next("fetch_user_events".to_string(), &self.user_events, Vec::new())
            .resolve()
            .await
    }

    async fn fetch_relevant_events(&self) -> Result<Vec<Event>, StoreError> {
        self.next(
            "fetch_relevant_events".to_string(),
            &self.relevant_events,
            Vec::new(),
        )
        .resolve()
        .await
    }

    async fn fetch_events(&self, interest: &Interest) -> Result<Vec<Event>, StoreError> {
        self.next(
            format!("fetch_events {}", interest.name),
            &self.found_events,
            Vec::new(),
        )
        .resolve()
        .await
    }

    async fn join(&self, event: &Event) -> Result<(), StoreError> {
        self.next(format!("join {}", event.id), &self.joins, ())
            .resolve()
            .await
    }

    async fn leave(&self, event: &Event) -> Result<(), StoreError> {
        self.next(format!("leave {}", event.id), &self.leaves, ())
            .resolve()
            .await
    }

    async fn add(&self, draft: EventDraft) -> Result<Event, StoreError> {
        let call = format!("add {}", draft.name);
        let created = draft.into_event("created".to_string(), User::new("dev", "Dev"));
        self.next(call, &self.adds, created).resolve().await
    }

    async fn update(&self, event: &Event) -> Result<(), StoreError> {
        self.next(format!("update {}", event.id), &self.updates, ())
            .resolve()
            .await
    }

    async fn remove(&self, event: &Event) -> Result<(), StoreError> {
        self.next(format!("remove {}", event.id), &self.removes, ())
            .resolve()
            .await
    }
}

/// A public event named after its id, owned by someone else.
pub(crate) fn event_at(id: &str, start: Option<DateTime<Utc>>) -> Event {
    let mut draft = EventDraft::new(id, Interest::new("Cycling", "🚴"));
    draft.start_date = start;
    draft
        .into_event(id.to_string(), User::new("ann", "Ann"))
        .with_user_status(UserStatus::None)
}

pub(crate) fn ids<'a>(events: impl IntoIterator<Item = &'a Event>) -> Vec<String> {
    events.into_iter().map(|event| event.id.clone()).collect()
}
