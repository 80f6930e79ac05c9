//! # Listeners
//! The registry of callbacks interested in changes. Listeners are told *which* field changed, not what it changed to; they read the new value back from the owner.

use std::rc::Rc;

use crate::data_model::{DirtyState, ListenerKey};

type Listener<Field> = Rc<dyn Fn(ListenerKey, Field)>;

pub struct Listeners<Field> {
    listeners: slotmap::SlotMap<slotmap::DefaultKey, Listener<Field>>,
}

impl<Field> Default for Listeners<Field> {
    fn default() -> Self {
        Self {
            listeners: Default::default(),
        }
    }
}

impl<Field: Clone + 'static> Listeners<Field> {
    pub fn register(&mut self, listener: impl Fn(ListenerKey, Field) + 'static) -> ListenerKey {
        let key = self.listeners.insert(Rc::new(listener));
        ListenerKey(key)
    }

    pub fn unregister(&mut self, key: ListenerKey) {
        if self.listeners.remove(key.0).is_none() {
            log::debug!("Tried to unregister a listener that was not registered: {key:?}");
        }
    }

    /// Builds the calls owed for one field. They are returned rather than invoked so the caller can release its borrows first.
    pub fn notifications(&self, field: Field, dirty_state: DirtyState) -> Vec<Box<dyn FnOnce()>> {
        let exclude_key = match dirty_state {
            DirtyState::Clean => return Vec::new(),
            DirtyState::DirtyExcept(key) => Some(key),
            DirtyState::DirtyAll => None,
        };

        let mut notifications: Vec<Box<dyn FnOnce()>> = Vec::new();
        for (key, listener) in self.listeners.iter() {
            let listener_key = ListenerKey(key);
            if exclude_key == Some(listener_key) {
                continue;
            }
            let listener = listener.clone();
            let field = field.clone();
            notifications.push(Box::new(move || listener(listener_key, field)));
        }
        notifications
    }
}
