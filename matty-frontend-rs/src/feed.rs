use std::cell::RefCell;
use std::fmt;

use bulletin::{DirtyState, ListenerKey, Listeners, Published, RequestId, RequestSequencer, Sequenced};
use chrono::{DateTime, Utc};
use im::Vector;
use serde::{Deserialize, Serialize};

use crate::config::FeedConfig;
use crate::data_store::{DataStore, Fetched, StoreError};
use crate::{Event, EventDraft, Interest, UserStatus};

/// The pieces of published state a listener can be told about.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FeedField {
    UserEvents,
    RelevantEvents,
    FoundEvents,
    SuggestedInterests,
    SearchText,
    SuggestionsVisible,
    SearchInProgress,
    SelectedEvent,
    LoadStates,
    MutationFailure,
}

/// The lists the feed loads from the store, each with its own request sequence.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FeedList {
    Interests,
    UserEvents,
    RelevantEvents,
    FoundEvents,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", tag = "state", content = "reason")]
pub enum LoadState {
    #[default]
    Idle,
    Loading,
    Loaded,
    Empty,
    Failed(String),
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoadStates {
    pub interests: LoadState,
    pub user_events: LoadState,
    pub relevant_events: LoadState,
    pub found_events: LoadState,
}

impl LoadStates {
    pub fn get(&self, list: FeedList) -> &LoadState {
        match list {
            FeedList::Interests => &self.interests,
            FeedList::UserEvents => &self.user_events,
            FeedList::RelevantEvents => &self.relevant_events,
            FeedList::FoundEvents => &self.found_events,
        }
    }

    fn get_mut(&mut self, list: FeedList) -> &mut LoadState {
        match list {
            FeedList::Interests => &mut self.interests,
            FeedList::UserEvents => &mut self.user_events,
            FeedList::RelevantEvents => &mut self.relevant_events,
            FeedList::FoundEvents => &mut self.found_events,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum MutationKind {
    Join,
    Leave,
    Create,
    Update,
    Delete,
}

impl fmt::Display for MutationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let verb = match self {
            MutationKind::Join => "join",
            MutationKind::Leave => "leave",
            MutationKind::Create => "create",
            MutationKind::Update => "save",
            MutationKind::Delete => "delete",
        };
        f.write_str(verb)
    }
}

/// Published when a change the user asked for was refused by the store. Any optimistic local change has already been undone.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
#[serde(rename_all = "camelCase")]
#[error("could not {kind} {event_name:?}: {reason}")]
pub struct MutationFailure {
    pub kind: MutationKind,
    /// `None` for events that were never created
    pub event_id: Option<String>,
    pub event_name: String,
    pub reason: String,
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedSnapshot {
    pub user_events: Vector<Event>,
    pub relevant_events: Vector<Event>,
    pub found_events: Vector<Event>,
    pub suggested_interests: Vec<Interest>,
    pub search_text: String,
    pub suggestions_visible: bool,
    pub search_in_progress: bool,
    pub selected_event: Option<Event>,
    pub load_states: LoadStates,
    pub mutation_failure: Option<MutationFailure>,
    pub show_relevant_events: bool,
    pub show_found_events: bool,
    pub no_suggested_interests: bool,
    pub no_found_events: bool,
}

/// Sorts by date, undated events counting as `now`, then moves events that are already over to the back.
/// Both halves keep their date order.
pub fn arrange_user_events(mut events: Vec<Event>, now: DateTime<Utc>) -> Vec<Event> {
    events.sort_by_key(|event| event.date().unwrap_or(now));
    let (upcoming, past): (Vec<Event>, Vec<Event>) =
        events.into_iter().partition(|event| !event.is_past_at(now));
    upcoming.into_iter().chain(past).collect()
}

/// Interests whose name contains `text`, ignoring case, in the order given. Empty text suggests nothing.
pub fn suggest_interests(interests: &[Interest], text: &str) -> Vec<Interest> {
    if text.is_empty() {
        return Vec::new();
    }
    let needle = text.to_lowercase();
    interests
        .iter()
        .filter(|interest| interest.name_contains(&needle))
        .cloned()
        .collect()
}

/// What a join or leave changed locally, so it can be put back if the store refuses.
struct MembershipUndo {
    user_copy: Option<(usize, Event)>,
    relevant_copy: Option<(usize, Event)>,
    selected: Option<Event>,
}

#[derive(Default)]
struct FeedState {
    user_events: Published<Vector<Event>>,
    relevant_events: Published<Vector<Event>>,
    found_events: Published<Vector<Event>>,
    suggested_interests: Published<Vec<Interest>>,
    search_text: Published<String>,
    suggestions_visible: Published<bool>,
    search_in_progress: Published<bool>,
    selected_event: Published<Option<Event>>,
    load_states: Published<LoadStates>,
    mutation_failure: Published<Option<MutationFailure>>,

    all_interests: Vec<Interest>,
    interest_requests: RequestSequencer,
    user_event_requests: RequestSequencer,
    relevant_event_requests: RequestSequencer,
    search_requests: RequestSequencer,
}

impl FeedState {
    fn dirty_fields(&mut self) -> [(FeedField, DirtyState); 10] {
        [
            (FeedField::UserEvents, self.user_events.take_dirty()),
            (FeedField::RelevantEvents, self.relevant_events.take_dirty()),
            (FeedField::FoundEvents, self.found_events.take_dirty()),
            (FeedField::SuggestedInterests, self.suggested_interests.take_dirty()),
            (FeedField::SearchText, self.search_text.take_dirty()),
            (FeedField::SuggestionsVisible, self.suggestions_visible.take_dirty()),
            (FeedField::SearchInProgress, self.search_in_progress.take_dirty()),
            (FeedField::SelectedEvent, self.selected_event.take_dirty()),
            (FeedField::LoadStates, self.load_states.take_dirty()),
            (FeedField::MutationFailure, self.mutation_failure.take_dirty()),
        ]
    }

    fn requests(&mut self, list: FeedList) -> &mut RequestSequencer {
        match list {
            FeedList::Interests => &mut self.interest_requests,
            FeedList::UserEvents => &mut self.user_event_requests,
            FeedList::RelevantEvents => &mut self.relevant_event_requests,
            FeedList::FoundEvents => &mut self.search_requests,
        }
    }

    fn set_load_state(&mut self, list: FeedList, load_state: LoadState) {
        let mut load_states = self.load_states.get().clone();
        *load_states.get_mut(list) = load_state;
        self.load_states.set_if_changed(load_states, None);
    }

    fn begin_load(&mut self, list: FeedList) -> RequestId {
        let request_id = self.requests(list).issue();
        self.set_load_state(list, LoadState::Loading);
        request_id
    }

    /// Records how a load ended and hands back the items to publish.
    /// `None` means the list must stay as it is: the response was superseded, or the store failed.
    fn settle<T>(&mut self, list: FeedList, response: Sequenced<Fetched<T>>) -> Option<Vec<T>> {
        if !self.requests(list).settle(response.request_id) {
            log::debug!(
                "Dropping stale {list:?} response (request {})",
                response.request_id.get()
            );
            return None;
        }
        let (load_state, items) = match response.value {
            Fetched::Loaded(items) => (LoadState::Loaded, Some(items)),
            Fetched::Empty => (LoadState::Empty, Some(Vec::new())),
            Fetched::Failed(e) => {
                log::error!("Failed to load {list:?}: {e}");
                (LoadState::Failed(e.to_string()), None)
            }
        };
        self.set_load_state(list, load_state);
        items
    }

    fn set_search_text(&mut self, text: String, modifier: Option<ListenerKey>) {
        let suggestions = suggest_interests(&self.all_interests, &text);
        self.suggested_interests.set_if_changed(suggestions, None);
        self.suggestions_visible.set_if_changed(!text.is_empty(), None);
        self.search_text.set_if_changed(text, modifier);
    }

    fn show_relevant_events(&self) -> bool {
        self.search_text.get().is_empty()
    }

    /// Swaps in `event` if it is the one currently selected; returns the copy it replaced
    fn replace_selected(&mut self, event: &Event) -> Option<Event> {
        if self.selected_event.get().as_ref() != Some(event) {
            return None;
        }
        let previous = self.selected_event.get().clone();
        self.selected_event.set(Some(event.clone()), None);
        previous
    }

    /// A local membership change makes loads already sent out of date. Their answers are dropped,
    /// and the list counts as loaded since the local copy is the newest there is.
    fn supersede_loads(&mut self, lists: &[FeedList]) {
        for &list in lists {
            if self.requests(list).supersede() {
                log::debug!("Dropping the {list:?} load in flight, a local change superseded it");
                self.set_load_state(list, LoadState::Loaded);
            }
        }
    }

    fn apply_join(&mut self, event: &Event) -> MembershipUndo {
        self.supersede_loads(&[FeedList::UserEvents, FeedList::RelevantEvents]);
        let joined = event.clone().with_user_status(UserStatus::Participant);

        let mut user_events = self.user_events.get().clone();
        let user_index = user_events.iter().position(|e| e == event);
        let user_copy = user_index.map(|index| (index, user_events.remove(index)));
        user_events.push_back(joined.clone());
        self.user_events.set(user_events, None);

        let relevant_index = self.relevant_events.get().iter().position(|e| e == event);
        let relevant_copy = relevant_index
            .map(|index| (index, self.relevant_events.get_mut(None).remove(index)));

        MembershipUndo {
            user_copy,
            relevant_copy,
            selected: self.replace_selected(&joined),
        }
    }

    fn apply_leave(&mut self, event: &Event) -> MembershipUndo {
        self.supersede_loads(&[FeedList::UserEvents]);
        let left = event.clone().with_user_status(UserStatus::None);

        let user_index = self.user_events.get().iter().position(|e| e == event);
        let user_copy =
            user_index.map(|index| (index, self.user_events.get_mut(None).remove(index)));

        MembershipUndo {
            user_copy,
            relevant_copy: None,
            selected: self.replace_selected(&left),
        }
    }

    /// Called once the store accepted a join. A load answered while the join was pending may have
    /// dropped the local copy, so it is put back.
    fn confirm_join(&mut self, event: &Event) {
        self.supersede_loads(&[FeedList::UserEvents, FeedList::RelevantEvents]);
        let joined = self.user_events.get().iter().any(|e| e == event);
        let recommended = self.relevant_events.get().iter().any(|e| e == event);
        if !joined || recommended {
            self.apply_join(event);
        }
    }

    fn confirm_leave(&mut self, event: &Event) {
        self.supersede_loads(&[FeedList::UserEvents]);
        if self.user_events.get().iter().any(|e| e == event) {
            self.apply_leave(event);
        }
    }

    fn undo_membership(&mut self, event: &Event, undo: MembershipUndo) {
        let mut user_events = self.user_events.get().clone();
        user_events.retain(|e| e != event);
        if let Some((index, copy)) = undo.user_copy {
            user_events.insert(index.min(user_events.len()), copy);
        }
        self.user_events.set(user_events, None);

        if let Some((index, copy)) = undo.relevant_copy {
            if !self.relevant_events.get().iter().any(|e| e == event) {
                let mut relevant_events = self.relevant_events.get().clone();
                relevant_events.insert(index.min(relevant_events.len()), copy);
                self.relevant_events.set(relevant_events, None);
            }
        }

        if let Some(selected) = undo.selected {
            self.replace_selected(&selected);
        }
    }

    fn record_failure(
        &mut self,
        kind: MutationKind,
        event_id: Option<String>,
        event_name: String,
        error: StoreError,
    ) -> MutationFailure {
        let failure = MutationFailure {
            kind,
            event_id,
            event_name,
            reason: error.to_string(),
        };
        log::warn!("{failure}");
        self.mutation_failure.set(Some(failure.clone()), None);
        failure
    }
}

/// The event feed: what the user's screens show, and the actions that change it.
///
/// Every operation is an `async fn(&self)` meant to be spawned by the UI. State sits in a `RefCell`,
/// and we never hold a borrow across an `.await`, so operations can interleave freely without "already borrowed" panics.
pub struct EventFeed<S> {
    store: S,
    config: FeedConfig,
    state: RefCell<FeedState>,
    listeners: RefCell<Listeners<FeedField>>,
}

impl<S> EventFeed<S> {
    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn config(&self) -> &FeedConfig {
        &self.config
    }

    /// The listener is invoked with the field that changed after each operation that changed it.
    pub fn subscribe(&self, listener: impl Fn(ListenerKey, FeedField) + 'static) -> ListenerKey {
        self.listeners.borrow_mut().register(listener)
    }

    pub fn unsubscribe(&self, key: ListenerKey) {
        self.listeners.borrow_mut().unregister(key)
    }

    /// Flush pending notifications safely, avoiding RefCell re-borrows during callbacks.
    fn flush_notifications(&self) {
        // collect first so no borrow is held while listeners run; they are free to call back into the feed
        let notifications: Vec<Box<dyn FnOnce()>> = {
            let mut state = self.state.borrow_mut();
            let listeners = self.listeners.borrow();
            state
                .dirty_fields()
                .into_iter()
                .flat_map(|(field, dirty_state)| listeners.notifications(field, dirty_state))
                .collect()
        };
        for notification in notifications {
            notification();
        }
    }

    // =======
    // published state
    // =======

    pub fn user_events(&self) -> Vector<Event> {
        self.state.borrow().user_events.get().clone()
    }

    pub fn relevant_events(&self) -> Vector<Event> {
        self.state.borrow().relevant_events.get().clone()
    }

    pub fn found_events(&self) -> Vector<Event> {
        self.state.borrow().found_events.get().clone()
    }

    pub fn suggested_interests(&self) -> Vec<Interest> {
        self.state.borrow().suggested_interests.get().clone()
    }

    pub fn search_text(&self) -> String {
        self.state.borrow().search_text.get().clone()
    }

    pub fn suggestions_visible(&self) -> bool {
        *self.state.borrow().suggestions_visible.get()
    }

    pub fn search_in_progress(&self) -> bool {
        *self.state.borrow().search_in_progress.get()
    }

    pub fn selected_event(&self) -> Option<Event> {
        self.state.borrow().selected_event.get().clone()
    }

    pub fn load_states(&self) -> LoadStates {
        self.state.borrow().load_states.get().clone()
    }

    pub fn mutation_failure(&self) -> Option<MutationFailure> {
        self.state.borrow().mutation_failure.get().clone()
    }

    pub fn show_relevant_events(&self) -> bool {
        self.state.borrow().show_relevant_events()
    }

    pub fn show_found_events(&self) -> bool {
        !self.show_relevant_events()
    }

    pub fn no_suggested_interests(&self) -> bool {
        self.state.borrow().suggested_interests.get().is_empty()
    }

    pub fn no_found_events(&self) -> bool {
        self.state.borrow().found_events.get().is_empty()
    }

    pub fn snapshot(&self) -> FeedSnapshot {
        let state = self.state.borrow();
        FeedSnapshot {
            user_events: state.user_events.get().clone(),
            relevant_events: state.relevant_events.get().clone(),
            found_events: state.found_events.get().clone(),
            suggested_interests: state.suggested_interests.get().clone(),
            search_text: state.search_text.get().clone(),
            suggestions_visible: *state.suggestions_visible.get(),
            search_in_progress: *state.search_in_progress.get(),
            selected_event: state.selected_event.get().clone(),
            load_states: state.load_states.get().clone(),
            mutation_failure: state.mutation_failure.get().clone(),
            show_relevant_events: state.show_relevant_events(),
            show_found_events: !state.show_relevant_events(),
            no_suggested_interests: state.suggested_interests.get().is_empty(),
            no_found_events: state.found_events.get().is_empty(),
        }
    }

    // =======
    // local-only actions
    // =======

    /// `modifier` is the listener that produced the text (typically the search field), so it is not told about its own keystrokes.
    pub fn update_search_text(&self, text: impl Into<String>, modifier: Option<ListenerKey>) {
        let _flusher = FlushLater::new(self);
        let mut state = self.state.borrow_mut();
        state.set_search_text(text.into(), modifier);
    }

    pub fn select_event(&self, event: Event) {
        let _flusher = FlushLater::new(self);
        let mut state = self.state.borrow_mut();
        state.selected_event.set(Some(event), None);
    }

    pub fn clear_selected_event(&self) {
        let _flusher = FlushLater::new(self);
        let mut state = self.state.borrow_mut();
        state.selected_event.set_if_changed(None, None);
    }

    pub fn dismiss_mutation_failure(&self) {
        let _flusher = FlushLater::new(self);
        let mut state = self.state.borrow_mut();
        state.mutation_failure.set_if_changed(None, None);
    }
}

impl<S: DataStore> EventFeed<S> {
    pub fn new(store: S, config: FeedConfig) -> Self {
        crate::utils::init_logging(config.log_level);

        Self {
            store,
            config,
            state: RefCell::new(FeedState::default()),
            listeners: RefCell::new(Listeners::default()),
        }
    }

    /// Runs the initial loads together, if the config asks for them.
    pub async fn start(&self) {
        if !self.config.preload {
            return;
        }
        futures::join!(
            self.load_all_interests(),
            self.load_user_events(),
            self.load_relevant_events()
        );
    }

    /// Marks `list` as loading and tells listeners before the request goes out.
    fn begin_load(&self, list: FeedList) -> RequestId {
        let request_id = self.state.borrow_mut().begin_load(list);
        self.flush_notifications();
        request_id
    }

    pub async fn load_all_interests(&self) {
        let _flusher = FlushLater::new(self);
        let request_id = self.begin_load(FeedList::Interests);
        let response = Sequenced::new(request_id, self.store.fetch_all_interests().await).map(Fetched::from);

        let mut state = self.state.borrow_mut();
        let Some(interests) = state.settle(FeedList::Interests, response) else {
            return;
        };
        state.all_interests = interests;

        // text typed before the interests arrived deserves suggestions too
        let text = state.search_text.get().clone();
        let suggestions = suggest_interests(&state.all_interests, &text);
        state.suggested_interests.set_if_changed(suggestions, None);
    }

    pub async fn load_user_events(&self) {
        let _flusher = FlushLater::new(self);
        let request_id = self.begin_load(FeedList::UserEvents);
        let response = Sequenced::new(request_id, self.store.fetch_user_events().await).map(Fetched::from);

        let mut state = self.state.borrow_mut();
        if let Some(events) = state.settle(FeedList::UserEvents, response) {
            let events = arrange_user_events(events, Utc::now());
            state.user_events.set(events.into(), None);
        }
    }

    pub async fn load_relevant_events(&self) {
        let _flusher = FlushLater::new(self);
        let request_id = self.begin_load(FeedList::RelevantEvents);
        let response = Sequenced::new(request_id, self.store.fetch_relevant_events().await).map(Fetched::from);

        let mut state = self.state.borrow_mut();
        if let Some(events) = state.settle(FeedList::RelevantEvents, response) {
            state.relevant_events.set(events.into(), None);
        }
    }

    /// Searches by `interest`. If a newer search starts before this one returns, this one's results are dropped,
    /// and `search_in_progress` stays set until the newest search is back.
    pub async fn search_events(&self, interest: &Interest) {
        let _flusher = FlushLater::new(self);
        {
            let mut state = self.state.borrow_mut();
            state.set_search_text(interest.name.clone(), None);
            state.suggestions_visible.set_if_changed(false, None);
            state.found_events.set(Vector::new(), None);
            state.search_in_progress.set_if_changed(true, None);
        }
        let request_id = self.begin_load(FeedList::FoundEvents);
        let response = Sequenced::new(request_id, self.store.fetch_events(interest).await).map(Fetched::from);

        let mut state = self.state.borrow_mut();
        if let Some(events) = state.settle(FeedList::FoundEvents, response) {
            state.found_events.set(events.into(), None);
        }
        let in_flight = state.search_requests.in_flight();
        state.search_in_progress.set_if_changed(in_flight, None);
    }

    /// Shows the user as a participant right away, then asks the store. If the store refuses,
    /// the local change is undone and the failure is published.
    pub async fn join_event(&self, event: &Event) -> Result<(), MutationFailure> {
        let _flusher = FlushLater::new(self);
        let undo = self.state.borrow_mut().apply_join(event);
        self.flush_notifications();

        let result = self.store.join(event).await;

        let mut state = self.state.borrow_mut();
        if result.is_ok() {
            state.confirm_join(event);
        }
        result.map_err(|e| {
            state.undo_membership(event, undo);
            state.record_failure(
                MutationKind::Join,
                Some(event.id.clone()),
                event.name.clone(),
                e,
            )
        })
    }

    pub async fn leave_event(&self, event: &Event) -> Result<(), MutationFailure> {
        let _flusher = FlushLater::new(self);
        let undo = self.state.borrow_mut().apply_leave(event);
        self.flush_notifications();

        let result = self.store.leave(event).await;

        let mut state = self.state.borrow_mut();
        if result.is_ok() {
            state.confirm_leave(event);
        }
        result.map_err(|e| {
            state.undo_membership(event, undo);
            state.record_failure(
                MutationKind::Leave,
                Some(event.id.clone()),
                event.name.clone(),
                e,
            )
        })
    }

    pub async fn on_event_created(&self) {
        self.load_user_events().await;
    }

    pub async fn on_event_edited(&self, event: Event) {
        {
            let _flusher = FlushLater::new(self);
            let mut state = self.state.borrow_mut();
            state.selected_event.set(Some(event), None);
        }
        self.load_user_events().await;
    }

    pub async fn on_event_deleted(&self) {
        {
            let _flusher = FlushLater::new(self);
            let mut state = self.state.borrow_mut();
            state.selected_event.set_if_changed(None, None);
        }
        self.load_user_events().await;
    }

    pub async fn submit_new_event(&self, draft: EventDraft) -> Result<Event, MutationFailure> {
        let _flusher = FlushLater::new(self);
        let event_name = draft.name.clone();
        match self.store.add(draft).await {
            Ok(event) => {
                self.on_event_created().await;
                Ok(event)
            }
            Err(e) => {
                let failure = self.state.borrow_mut().record_failure(
                    MutationKind::Create,
                    None,
                    event_name,
                    e,
                );
                Err(failure)
            }
        }
    }

    pub async fn save_event(&self, event: Event) -> Result<(), MutationFailure> {
        let _flusher = FlushLater::new(self);
        match self.store.update(&event).await {
            Ok(()) => {
                self.on_event_edited(event).await;
                Ok(())
            }
            Err(e) => {
                let failure = self.state.borrow_mut().record_failure(
                    MutationKind::Update,
                    Some(event.id),
                    event.name,
                    e,
                );
                Err(failure)
            }
        }
    }

    pub async fn delete_event(&self, event: &Event) -> Result<(), MutationFailure> {
        let _flusher = FlushLater::new(self);
        match self.store.remove(event).await {
            Ok(()) => {
                self.on_event_deleted().await;
                Ok(())
            }
            Err(e) => {
                let failure = self.state.borrow_mut().record_failure(
                    MutationKind::Delete,
                    Some(event.id.clone()),
                    event.name.clone(),
                    e,
                );
                Err(failure)
            }
        }
    }
}

/// Flushes the feed's notifications when an operation returns, on every path out of it.
struct FlushLater<'a, S> {
    feed: &'a EventFeed<S>,
}

impl<'a, S> FlushLater<'a, S> {
    fn new(feed: &'a EventFeed<S>) -> Self {
        Self { feed }
    }
}

impl<S> Drop for FlushLater<'_, S> {
    fn drop(&mut self) {
        self.feed.flush_notifications();
    }
}
