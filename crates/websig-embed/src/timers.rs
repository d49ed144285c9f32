//! Ownership of scheduled timer callbacks.
//!
//! A callback is kept until its timer is cancelled or has fired. A fired
//! callback is still running when it reports itself, so it is only released
//! on the next insert or cancel.

use std::collections::HashMap;

pub struct TimerSlots<C> {
    slots: HashMap<String, (i32, C)>,
    fired: Vec<String>,
}

impl<C> Default for TimerSlots<C> {
    fn default() -> Self {
        Self {
            slots: HashMap::new(),
            fired: Vec::new(),
        }
    }
}

impl<C> TimerSlots<C> {
    pub fn insert(&mut self, operation_id: &str, handle: i32, callback: C) {
        self.prune();
        self.slots
            .insert(operation_id.to_string(), (handle, callback));
    }

    /// Record that the timer ran; never drops the callback
    pub fn mark_fired(&mut self, operation_id: &str) {
        if self.slots.contains_key(operation_id) {
            self.fired.push(operation_id.to_string());
        }
    }

    /// Release the callback, returning the handle to clear
    pub fn cancel(&mut self, operation_id: &str) -> Option<i32> {
        self.prune();
        self.slots.remove(operation_id).map(|(handle, _)| handle)
    }

    /// Release everything, returning the handles that may still be armed
    pub fn clear(&mut self) -> Vec<i32> {
        self.fired.clear();
        self.slots.drain().map(|(_, (handle, _))| handle).collect()
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    fn prune(&mut self) {
        for operation_id in self.fired.drain(..) {
            self.slots.remove(&operation_id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::rc::Rc;

    #[test]
    fn test_cancel_releases_callback() {
        let callback = Rc::new(());
        let mut slots = TimerSlots::default();
        slots.insert("op-1", 7, Rc::clone(&callback));
        assert_eq!(Rc::strong_count(&callback), 2);

        assert_eq!(slots.cancel("op-1"), Some(7));
        assert_eq!(Rc::strong_count(&callback), 1);
        assert!(slots.is_empty());
        assert_eq!(slots.cancel("op-1"), None);
    }

    #[test]
    fn test_fired_callback_is_released_later() {
        let callback = Rc::new(());
        let mut slots = TimerSlots::default();
        slots.insert("op-1", 1, Rc::clone(&callback));

        slots.mark_fired("op-1");
        // still alive while it may be running
        assert_eq!(Rc::strong_count(&callback), 2);

        slots.insert("op-2", 2, Rc::new(()));
        assert_eq!(Rc::strong_count(&callback), 1);
        assert_eq!(slots.len(), 1);
    }

    #[test]
    fn test_unknown_fired_ids_are_ignored() {
        let mut slots: TimerSlots<()> = TimerSlots::default();
        slots.mark_fired("gone");
        slots.insert("op-1", 3, ());
        assert_eq!(slots.len(), 1);
    }

    #[test]
    fn test_clear_returns_armed_handles() {
        let mut slots = TimerSlots::default();
        slots.insert("a", 1, ());
        slots.insert("b", 2, ());
        let mut handles = slots.clear();
        handles.sort();
        assert_eq!(handles, vec![1, 2]);
        assert!(slots.is_empty());
    }
}
