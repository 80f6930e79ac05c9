use std::cell::{Cell, RefCell};
use std::collections::BTreeMap;

use chrono::Utc;

use crate::data_store::{DataStore, StoreError};
use crate::{Event, EventDraft, Interest, User, UserStatus};

/// A stored event. Membership is kept as user ids and resolved when an event is handed out,
/// so `user_status` is always computed for whoever the store is acting as.
#[derive(Clone, Debug)]
struct EventRecord {
    event: Event,
    participant_ids: Vec<String>,
    inserted: u64,
}

/// A `DataStore` that keeps everything in memory, for tests and offline demos.
pub struct MemoryStore {
    current_user: User,
    users: RefCell<BTreeMap<String, User>>,
    interests: RefCell<Vec<Interest>>,
    events: RefCell<BTreeMap<String, EventRecord>>,
    insertions: Cell<u64>,
    offline: Cell<bool>,
}

impl MemoryStore {
    pub fn new(current_user: User) -> Self {
        let mut users = BTreeMap::new();
        users.insert(current_user.id.clone(), current_user.clone());
        Self {
            current_user,
            users: RefCell::new(users),
            interests: RefCell::new(Vec::new()),
            events: RefCell::new(BTreeMap::new()),
            insertions: Cell::new(0),
            offline: Cell::new(false),
        }
    }

    pub fn current_user(&self) -> &User {
        &self.current_user
    }

    /// While offline, every call fails with `StoreError::Unavailable`
    pub fn set_offline(&self, offline: bool) {
        self.offline.set(offline);
    }

    pub fn insert_interest(&self, interest: Interest) {
        let mut interests = self.interests.borrow_mut();
        if !interests.contains(&interest) {
            interests.push(interest);
        }
    }

    pub fn insert_user(&self, user: User) {
        self.users.borrow_mut().insert(user.id.clone(), user);
    }

    /// Stores an event created by `creator` with the given participants and returns its id
    pub fn insert_event(&self, draft: EventDraft, creator: User, participants: Vec<User>) -> String {
        let id = uuid::Uuid::new_v4().to_string();
        let inserted = self.insertions.get();
        self.insertions.set(inserted + 1);
        self.insert_user(creator.clone());
        let participant_ids = participants
            .into_iter()
            .map(|user| {
                let id = user.id.clone();
                self.insert_user(user);
                id
            })
            .collect();
        self.events.borrow_mut().insert(
            id.clone(),
            EventRecord {
                event: draft.into_event(id.clone(), creator),
                participant_ids,
                inserted,
            },
        );
        id
    }

    pub fn participant_ids(&self, event_id: &str) -> Option<Vec<String>> {
        self.events
            .borrow()
            .get(event_id)
            .map(|record| record.participant_ids.clone())
    }

    fn ensure_online(&self) -> Result<(), StoreError> {
        if self.offline.get() {
            return Err(StoreError::Unavailable("memory store is offline".to_string()));
        }
        Ok(())
    }

    fn status_of(&self, record: &EventRecord) -> UserStatus {
        if record.event.creator == self.current_user {
            UserStatus::Owner
        } else if record.participant_ids.contains(&self.current_user.id) {
            UserStatus::Participant
        } else {
            UserStatus::None
        }
    }

    fn resolve(&self, record: &EventRecord) -> Event {
        let users = self.users.borrow();
        let participants = record
            .participant_ids
            .iter()
            .filter_map(|id| {
                let user = users.get(id).cloned();
                if user.is_none() {
                    log::warn!("Event {} lists unknown participant {id}", record.event.id);
                }
                user
            })
            .collect();
        Event {
            participants,
            ..record.event.clone()
        }
        .with_user_status(self.status_of(record))
    }

    /// Events matching `keep`, oldest record first
    fn select(&self, keep: impl Fn(&EventRecord, UserStatus) -> bool) -> Vec<Event> {
        let events = self.events.borrow();
        let mut records: Vec<&EventRecord> = events
            .values()
            .filter(|record| keep(*record, self.status_of(record)))
            .collect();
        records.sort_by_key(|record| record.inserted);
        records.into_iter().map(|record| self.resolve(record)).collect()
    }

    fn with_record<T>(
        &self,
        event_id: &str,
        f: impl FnOnce(&mut EventRecord, UserStatus) -> Result<T, StoreError>,
    ) -> Result<T, StoreError> {
        let mut events = self.events.borrow_mut();
        let record = events
            .get_mut(event_id)
            .ok_or_else(|| StoreError::NotFound(event_id.to_string()))?;
        let status = self.status_of(record);
        f(record, status)
    }
}

impl DataStore for MemoryStore {
    async fn fetch_all_interests(&self) -> Result<Vec<Interest>, StoreError> {
        self.ensure_online()?;
        Ok(self.interests.borrow().clone())
    }

    async fn fetch_user_events(&self) -> Result<Vec<Event>, StoreError> {
        self.ensure_online()?;
        Ok(self.select(|_, status| status != UserStatus::None))
    }

    async fn fetch_relevant_events(&self) -> Result<Vec<Event>, StoreError> {
        self.ensure_online()?;
        let now = Utc::now();
        let mut events = self.select(|record, status| {
            status == UserStatus::None && record.event.is_public && !record.event.is_past_at(now)
        });
        events.sort_by_key(|event| event.date().unwrap_or(now));
        Ok(events)
    }

    async fn fetch_events(&self, interest: &Interest) -> Result<Vec<Event>, StoreError> {
        self.ensure_online()?;
        Ok(self.select(|record, status| {
            record.event.interest == *interest
                && (record.event.is_public || status != UserStatus::None)
        }))
    }

    async fn join(&self, event: &Event) -> Result<(), StoreError> {
        self.ensure_online()?;
        let user_id = self.current_user.id.clone();
        self.with_record(&event.id, |record, status| match status {
            UserStatus::Owner => Err(StoreError::PermissionDenied(
                "the creator of an event cannot join it".to_string(),
            )),
            UserStatus::Participant => Ok(()),
            UserStatus::None => {
                record.participant_ids.push(user_id);
                Ok(())
            }
        })
    }

    async fn leave(&self, event: &Event) -> Result<(), StoreError> {
        self.ensure_online()?;
        let user_id = &self.current_user.id;
        self.with_record(&event.id, |record, status| match status {
            UserStatus::Owner => Err(StoreError::PermissionDenied(
                "the creator of an event cannot leave it".to_string(),
            )),
            UserStatus::Participant | UserStatus::None => {
                record.participant_ids.retain(|id| id != user_id);
                Ok(())
            }
        })
    }

    async fn add(&self, draft: EventDraft) -> Result<Event, StoreError> {
        self.ensure_online()?;
        let id = self.insert_event(draft, self.current_user.clone(), Vec::new());
        let events = self.events.borrow();
        let record = events
            .get(&id)
            .ok_or_else(|| StoreError::NotFound(id.clone()))?;
        Ok(self.resolve(record))
    }

    async fn update(&self, event: &Event) -> Result<(), StoreError> {
        self.ensure_online()?;
        self.with_record(&event.id, |record, status| {
            if status != UserStatus::Owner {
                return Err(StoreError::PermissionDenied(
                    "only the creator can edit an event".to_string(),
                ));
            }
            record.event = Event {
                id: record.event.id.clone(),
                creator: record.event.creator.clone(),
                user_status: UserStatus::None,
                participants: Vec::new(),
                ..event.clone()
            };
            Ok(())
        })
    }

    async fn remove(&self, event: &Event) -> Result<(), StoreError> {
        self.ensure_online()?;
        self.with_record(&event.id, |_, status| {
            if status != UserStatus::Owner {
                return Err(StoreError::PermissionDenied(
                    "only the creator can delete an event".to_string(),
                ));
            }
            Ok(())
        })?;
        self.events.borrow_mut().remove(&event.id);
        Ok(())
    }
}
