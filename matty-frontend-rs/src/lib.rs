//! The Matty event feed: the user's own events, recommendations and interest search, kept in sync with a remote data store.
//!
//! `EventFeed` owns the published state and the actions that change it. The store sits behind the `DataStore` trait,
//! so the same feed drives the browser build (through JS callbacks) and the in-memory store used in tests and demos.

#[cfg(target_arch = "wasm32")]
mod bindings;
mod config;
mod data_store;
mod event;
mod feed;
mod interest;
mod interest_selection;
mod memory_store;
#[cfg(test)]
mod test_store;
mod user;
mod utils;

#[cfg(target_arch = "wasm32")]
pub use bindings::{Feed, JsDataStore, JsStore};
pub use bulletin::ListenerKey;
pub use config::{ConfigError, FeedConfig};
pub use data_store::{DataStore, Fetched, StoreError};
pub use event::{Coordinates, Event, EventDraft, Location, UserStatus};
pub use feed::{
    EventFeed, FeedField, FeedList, FeedSnapshot, LoadState, LoadStates, MutationFailure,
    MutationKind, arrange_user_events, suggest_interests,
};
pub use interest::Interest;
pub use interest_selection::{InterestSelection, SelectableInterest};
pub use memory_store::MemoryStore;
pub use user::User;

#[cfg_attr(target_arch = "wasm32", wasm_bindgen::prelude::wasm_bindgen)]
pub fn get_app_version() -> String {
    env!("CARGO_PKG_VERSION").to_string()
}
