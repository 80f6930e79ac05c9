//! # Published
//! A Published cell is a wrapper around any piece of view state that adds a "dirty" flag.
//! Writing through the cell marks it dirty, so the owner knows which listeners to notify once the current operation is done.

use std::ops::{Deref, DerefMut};

use crate::data_model::ListenerKey;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DirtyState {
    /// Not dirty, no pending notifications
    Clean,
    /// Dirty, notify all listeners except the specified one
    DirtyExcept(ListenerKey),
    /// Dirty, notify all listeners
    DirtyAll,
}

impl DirtyState {
    fn marked_by(&self, modifier: Option<ListenerKey>) -> DirtyState {
        use DirtyState::*;
        match (self, modifier) {
            (Clean, Some(key)) => DirtyExcept(key),
            (DirtyExcept(key1), Some(key2)) if *key1 == key2 => DirtyExcept(*key1),
            (Clean, None) => DirtyAll,
            (DirtyExcept(_), _) | (DirtyAll, _) => DirtyAll,
        }
    }
}

#[derive(Clone, Debug)]
pub struct Published<T> {
    value: T,
    dirty_state: DirtyState,
}

impl<T: Default> Default for Published<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}

/// Smart pointer that marks the cell as dirty when dereferenced mutably
pub struct DirtyOnDerefMut<'a, T> {
    value: &'a mut T,
    dirty_state: &'a mut DirtyState,
    modifier: Option<ListenerKey>,
}

impl<T> Deref for DirtyOnDerefMut<'_, T> {
    type Target = T;

    fn deref(&self) -> &Self::Target {
        self.value
    }
}

impl<T> DerefMut for DirtyOnDerefMut<'_, T> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        *self.dirty_state = self.dirty_state.marked_by(self.modifier);
        self.value
    }
}

impl<T> Published<T> {
    /// A freshly created cell is clean: its initial value is not a change anyone needs to hear about.
    pub fn new(value: T) -> Self {
        Self {
            value,
            dirty_state: DirtyState::Clean,
        }
    }

    pub fn get(&self) -> &T {
        &self.value
    }

    pub fn get_mut(&mut self, modifier: Option<ListenerKey>) -> DirtyOnDerefMut<'_, T> {
        DirtyOnDerefMut {
            value: &mut self.value,
            dirty_state: &mut self.dirty_state,
            modifier,
        }
    }

    pub fn set(&mut self, value: T, modifier: Option<ListenerKey>) {
        *self.get_mut(modifier) = value;
    }

    /// Returns the pending dirty state and resets the cell to clean.
    pub fn take_dirty(&mut self) -> DirtyState {
        std::mem::replace(&mut self.dirty_state, DirtyState::Clean)
    }
}

impl<T: PartialEq> Published<T> {
    /// Returns true if the value was different and has been replaced
    pub fn set_if_changed(&mut self, value: T, modifier: Option<ListenerKey>) -> bool {
        if self.value == value {
            return false;
        }
        self.set(value, modifier);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(n: u32) -> ListenerKey {
        let mut keys = slotmap::SlotMap::new();
        let mut last = keys.insert(());
        for _ in 0..n {
            last = keys.insert(());
        }
        ListenerKey(last)
    }

    #[test]
    fn test_reading_does_not_dirty() {
        let mut cell = Published::new(vec![1, 2, 3]);
        assert_eq!(cell.get().len(), 3);
        assert_eq!(cell.get_mut(None).len(), 3);
        assert_eq!(cell.take_dirty(), DirtyState::Clean);
    }

    #[test]
    fn test_writing_dirties_all() {
        let mut cell = Published::new(vec![1]);
        cell.get_mut(None).push(2);
        assert_eq!(cell.take_dirty(), DirtyState::DirtyAll);
        assert_eq!(cell.take_dirty(), DirtyState::Clean);
        assert_eq!(cell.get(), &vec![1, 2]);
    }

    #[test]
    fn test_same_modifier_stays_excluded() {
        let typist = key(0);
        let mut cell = Published::new(String::new());
        cell.set("a".to_string(), Some(typist));
        cell.set("ab".to_string(), Some(typist));
        assert_eq!(cell.take_dirty(), DirtyState::DirtyExcept(typist));
    }

    #[test]
    fn test_mixed_modifiers_notify_everyone() {
        let mut cell = Published::new(0);
        cell.set(1, Some(key(0)));
        cell.set(2, Some(key(1)));
        assert_eq!(cell.take_dirty(), DirtyState::DirtyAll);

        cell.set(3, Some(key(0)));
        cell.set(4, None);
        assert_eq!(cell.take_dirty(), DirtyState::DirtyAll);
    }

    #[test]
    fn test_set_if_changed() {
        let mut cell = Published::new(false);
        assert!(!cell.set_if_changed(false, None));
        assert_eq!(cell.take_dirty(), DirtyState::Clean);
        assert!(cell.set_if_changed(true, None));
        assert_eq!(cell.take_dirty(), DirtyState::DirtyAll);
    }
}
