//! The browser surface. wasm-bindgen types can't be generic, so `Feed` wraps an `EventFeed` over the JS-backed store.

use std::rc::Rc;

use js_sys::Promise;
use serde::Serialize;
use serde::de::DeserializeOwned;
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::{JsFuture, future_to_promise};

use crate::{
    DataStore, Event, EventDraft, EventFeed, FeedConfig, Interest, ListenerKey, MutationFailure,
    StoreError,
};

#[wasm_bindgen]
extern "C" {
    /// The app's data store, implemented in JS. Every method returns a promise.
    pub type JsStore;

    #[wasm_bindgen(method, catch, js_name = fetchAllInterests)]
    fn fetch_all_interests(this: &JsStore) -> Result<Promise, JsValue>;

    #[wasm_bindgen(method, catch, js_name = fetchUserEvents)]
    fn fetch_user_events(this: &JsStore) -> Result<Promise, JsValue>;

    #[wasm_bindgen(method, catch, js_name = fetchRelevantEvents)]
    fn fetch_relevant_events(this: &JsStore) -> Result<Promise, JsValue>;

    #[wasm_bindgen(method, catch, js_name = fetchEvents)]
    fn fetch_events(this: &JsStore, interest: JsValue) -> Result<Promise, JsValue>;

    #[wasm_bindgen(method, catch)]
    fn join(this: &JsStore, event: JsValue) -> Result<Promise, JsValue>;

    #[wasm_bindgen(method, catch)]
    fn leave(this: &JsStore, event: JsValue) -> Result<Promise, JsValue>;

    #[wasm_bindgen(method, catch)]
    fn add(this: &JsStore, draft: JsValue) -> Result<Promise, JsValue>;

    #[wasm_bindgen(method, catch)]
    fn update(this: &JsStore, event: JsValue) -> Result<Promise, JsValue>;

    #[wasm_bindgen(method, catch)]
    fn remove(this: &JsStore, event: JsValue) -> Result<Promise, JsValue>;
}

fn unavailable(error: JsValue) -> StoreError {
    StoreError::Unavailable(error.as_string().unwrap_or_else(|| format!("{error:?}")))
}

fn to_js<T: Serialize>(value: &T) -> Result<JsValue, StoreError> {
    serde_wasm_bindgen::to_value(value).map_err(|e| StoreError::Malformed {
        id: "request".to_string(),
        reason: e.to_string(),
    })
}

async fn settle(promise: Result<Promise, JsValue>) -> Result<JsValue, StoreError> {
    JsFuture::from(promise.map_err(unavailable)?)
        .await
        .map_err(unavailable)
}

async fn decode<T: DeserializeOwned>(promise: Result<Promise, JsValue>) -> Result<T, StoreError> {
    let value = settle(promise).await?;
    serde_wasm_bindgen::from_value(value).map_err(|e| {
        log::error!("Store returned something we could not decode: {e}");
        StoreError::Malformed {
            id: "response".to_string(),
            reason: e.to_string(),
        }
    })
}

pub struct JsDataStore(JsStore);

impl DataStore for JsDataStore {
    async fn fetch_all_interests(&self) -> Result<Vec<Interest>, StoreError> {
        decode(self.0.fetch_all_interests()).await
    }

    async fn fetch_user_events(&self) -> Result<Vec<Event>, StoreError> {
        decode(self.0.fetch_user_events()).await
    }

    async fn fetch_relevant_events(&self) -> Result<Vec<Event>, StoreError> {
        decode(self.0.fetch_relevant_events()).await
    }

    async fn fetch_events(&self, interest: &Interest) -> Result<Vec<Event>, StoreError> {
        let interest = to_js(interest)?;
        decode(self.0.fetch_events(interest)).await
    }

    async fn join(&self, event: &Event) -> Result<(), StoreError> {
        let event = to_js(event)?;
        settle(self.0.join(event)).await.map(|_| ())
    }

    async fn leave(&self, event: &Event) -> Result<(), StoreError> {
        let event = to_js(event)?;
        settle(self.0.leave(event)).await.map(|_| ())
    }

    async fn add(&self, draft: EventDraft) -> Result<Event, StoreError> {
        let draft = to_js(&draft)?;
        decode(self.0.add(draft)).await
    }

    async fn update(&self, event: &Event) -> Result<(), StoreError> {
        let event = to_js(event)?;
        settle(self.0.update(event)).await.map(|_| ())
    }

    async fn remove(&self, event: &Event) -> Result<(), StoreError> {
        let event = to_js(event)?;
        settle(self.0.remove(event)).await.map(|_| ())
    }
}

fn rejected(failure: MutationFailure) -> JsValue {
    serde_wasm_bindgen::to_value(&failure).unwrap_or_else(|_| JsValue::from_str(&failure.to_string()))
}

#[wasm_bindgen]
pub struct Feed {
    inner: Rc<EventFeed<JsDataStore>>,
}

#[wasm_bindgen]
impl Feed {
    #[wasm_bindgen(constructor)]
    pub fn new(store: JsStore, config: JsValue) -> Result<Feed, JsValue> {
        let config: FeedConfig = if config.is_undefined() || config.is_null() {
            FeedConfig::default()
        } else {
            serde_wasm_bindgen::from_value(config)?
        };
        Ok(Feed {
            inner: Rc::new(EventFeed::new(JsDataStore(store), config)),
        })
    }

    /// Resolves once the preloads have settled.
    pub fn start(&self) -> Promise {
        let feed = self.inner.clone();
        future_to_promise(async move {
            feed.start().await;
            Ok(JsValue::UNDEFINED)
        })
    }

    /// `callback(listenerKey, field)` runs after each change; read the new values through `snapshot`.
    pub fn subscribe(&self, callback: js_sys::Function) -> ListenerKey {
        self.inner.subscribe(move |key, field| {
            let field = serde_wasm_bindgen::to_value(&field).unwrap_or(JsValue::NULL);
            if let Err(e) = callback.call2(&JsValue::NULL, &key.into(), &field) {
                log::error!("Feed listener threw: {e:?}");
            }
        })
    }

    pub fn unsubscribe(&self, key: ListenerKey) {
        self.inner.unsubscribe(key);
    }

    pub fn snapshot(&self) -> Result<JsValue, JsValue> {
        Ok(serde_wasm_bindgen::to_value(&self.inner.snapshot())?)
    }

    #[wasm_bindgen(js_name = loadAllInterests)]
    pub fn load_all_interests(&self) -> Promise {
        let feed = self.inner.clone();
        future_to_promise(async move {
            feed.load_all_interests().await;
            Ok(JsValue::UNDEFINED)
        })
    }

    #[wasm_bindgen(js_name = loadUserEvents)]
    pub fn load_user_events(&self) -> Promise {
        let feed = self.inner.clone();
        future_to_promise(async move {
            feed.load_user_events().await;
            Ok(JsValue::UNDEFINED)
        })
    }

    #[wasm_bindgen(js_name = loadRelevantEvents)]
    pub fn load_relevant_events(&self) -> Promise {
        let feed = self.inner.clone();
        future_to_promise(async move {
            feed.load_relevant_events().await;
            Ok(JsValue::UNDEFINED)
        })
    }

    #[wasm_bindgen(js_name = updateSearchText)]
    pub fn update_search_text(&self, text: String, modifier: Option<ListenerKey>) {
        self.inner.update_search_text(text, modifier);
    }

    #[wasm_bindgen(js_name = searchEvents)]
    pub fn search_events(&self, interest: JsValue) -> Result<Promise, JsValue> {
        let interest: Interest = serde_wasm_bindgen::from_value(interest)?;
        let feed = self.inner.clone();
        Ok(future_to_promise(async move {
            feed.search_events(&interest).await;
            Ok(JsValue::UNDEFINED)
        }))
    }

    #[wasm_bindgen(js_name = joinEvent)]
    pub fn join_event(&self, event: JsValue) -> Result<Promise, JsValue> {
        let event: Event = serde_wasm_bindgen::from_value(event)?;
        let feed = self.inner.clone();
        Ok(future_to_promise(async move {
            feed.join_event(&event).await.map_err(rejected)?;
            Ok(JsValue::UNDEFINED)
        }))
    }

    #[wasm_bindgen(js_name = leaveEvent)]
    pub fn leave_event(&self, event: JsValue) -> Result<Promise, JsValue> {
        let event: Event = serde_wasm_bindgen::from_value(event)?;
        let feed = self.inner.clone();
        Ok(future_to_promise(async move {
            feed.leave_event(&event).await.map_err(rejected)?;
            Ok(JsValue::UNDEFINED)
        }))
    }

    /// Resolves to the created event.
    #[wasm_bindgen(js_name = submitNewEvent)]
    pub fn submit_new_event(&self, draft: JsValue) -> Result<Promise, JsValue> {
        let draft: EventDraft = serde_wasm_bindgen::from_value(draft)?;
        let feed = self.inner.clone();
        Ok(future_to_promise(async move {
            let event = feed.submit_new_event(draft).await.map_err(rejected)?;
            Ok(serde_wasm_bindgen::to_value(&event)?)
        }))
    }

    #[wasm_bindgen(js_name = saveEvent)]
    pub fn save_event(&self, event: JsValue) -> Result<Promise, JsValue> {
        let event: Event = serde_wasm_bindgen::from_value(event)?;
        let feed = self.inner.clone();
        Ok(future_to_promise(async move {
            feed.save_event(event).await.map_err(rejected)?;
            Ok(JsValue::UNDEFINED)
        }))
    }

    #[wasm_bindgen(js_name = deleteEvent)]
    pub fn delete_event(&self, event: JsValue) -> Result<Promise, JsValue> {
        let event: Event = serde_wasm_bindgen::from_value(event)?;
        let feed = self.inner.clone();
        Ok(future_to_promise(async move {
            feed.delete_event(&event).await.map_err(rejected)?;
            Ok(JsValue::UNDEFINED)
        }))
    }

    /// For edits made outside the feed, e.g. by a separate editor screen.
    #[wasm_bindgen(js_name = onEventEdited)]
    pub fn on_event_edited(&self, event: JsValue) -> Result<Promise, JsValue> {
        let event: Event = serde_wasm_bindgen::from_value(event)?;
        let feed = self.inner.clone();
        Ok(future_to_promise(async move {
            feed.on_event_edited(event).await;
            Ok(JsValue::UNDEFINED)
        }))
    }

    #[wasm_bindgen(js_name = onEventCreated)]
    pub fn on_event_created(&self) -> Promise {
        let feed = self.inner.clone();
        future_to_promise(async move {
            feed.on_event_created().await;
            Ok(JsValue::UNDEFINED)
        })
    }

    #[wasm_bindgen(js_name = onEventDeleted)]
    pub fn on_event_deleted(&self) -> Promise {
        let feed = self.inner.clone();
        future_to_promise(async move {
            feed.on_event_deleted().await;
            Ok(JsValue::UNDEFINED)
        })
    }

    #[wasm_bindgen(js_name = selectEvent)]
    pub fn select_event(&self, event: JsValue) -> Result<(), JsValue> {
        let event: Event = serde_wasm_bindgen::from_value(event)?;
        self.inner.select_event(event);
        Ok(())
    }

    #[wasm_bindgen(js_name = clearSelectedEvent)]
    pub fn clear_selected_event(&self) {
        self.inner.clear_selected_event();
    }

    #[wasm_bindgen(js_name = dismissMutationFailure)]
    pub fn dismiss_mutation_failure(&self) {
        self.inner.dismiss_mutation_failure();
    }
}
