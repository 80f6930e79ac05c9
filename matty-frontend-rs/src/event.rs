use std::hash::{Hash, Hasher};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{Interest, User};

/// The current user's relationship to an event. Computed by the data store from membership.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum UserStatus {
    Owner,
    Participant,
    #[default]
    None,
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub name: String,
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub coordinates: Option<Coordinates>,
}

/// Events are identified by `id`: two copies with different membership are still the same event.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    pub id: String,
    pub name: String,
    pub description: String,
    pub details: String,
    pub interest: Interest,
    pub location: Location,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
    pub is_public: bool,
    pub with_approval: bool,
    pub creator: User,
    #[serde(default)]
    pub user_status: UserStatus,
    #[serde(default)]
    pub participants: Vec<User>,
}

impl Event {
    /// The date the feed orders by. `None` for undated events.
    pub fn date(&self) -> Option<DateTime<Utc>> {
        self.start_date
    }

    /// An event is over once its end has passed. Without an end date the start date stands in; undated events are never past.
    pub fn is_past_at(&self, now: DateTime<Utc>) -> bool {
        self.end_date
            .or(self.start_date)
            .is_some_and(|end| end < now)
    }

    pub fn has_started_at(&self, now: DateTime<Utc>) -> bool {
        self.start_date.is_some_and(|start| start < now)
    }

    pub fn past(&self) -> bool {
        self.is_past_at(Utc::now())
    }

    pub fn started(&self) -> bool {
        self.has_started_at(Utc::now())
    }

    pub fn with_user_status(mut self, user_status: UserStatus) -> Self {
        self.user_status = user_status;
        self
    }
}

impl PartialEq for Event {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Event {}

impl Hash for Event {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

/// What a user fills in when creating an event. The store assigns the rest.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventDraft {
    pub name: String,
    pub description: String,
    pub details: String,
    pub interest: Interest,
    pub location: Location,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
    pub is_public: bool,
    pub with_approval: bool,
}

impl EventDraft {
    pub fn new(name: impl Into<String>, interest: Interest) -> Self {
        Self {
            name: name.into(),
            description: String::new(),
            details: String::new(),
            interest,
            location: Location::default(),
            start_date: None,
            end_date: None,
            is_public: true,
            with_approval: false,
        }
    }

    pub fn starting_at(mut self, start: DateTime<Utc>) -> Self {
        self.start_date = Some(start);
        self
    }

    pub fn ending_at(mut self, end: DateTime<Utc>) -> Self {
        self.end_date = Some(end);
        self
    }

    pub fn private(mut self) -> Self {
        self.is_public = false;
        self
    }

    pub(crate) fn into_event(self, id: String, creator: User) -> Event {
        Event {
            id,
            name: self.name,
            description: self.description,
            details: self.details,
            interest: self.interest,
            location: self.location,
            start_date: self.start_date,
            end_date: self.end_date,
            is_public: self.is_public,
            with_approval: self.with_approval,
            creator,
            user_status: UserStatus::Owner,
            participants: Vec::new(),
        }
    }
}
