//! Event listeners.
//!
//! The merger and differ never keep results themselves: they report every
//! conflict, change and context breadcrumb to a listener. Listeners can
//! accumulate events, fan them out to several other listeners, or discard
//! them.

use serde::{Deserialize, Serialize};

use crate::change::ChangeReport;
use crate::conflict::Conflict;

/// Breadcrumb naming the element currently being processed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContextDescriptor {
    pub label: String,
    pub path: String,
}

impl ContextDescriptor {
    pub fn new(label: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            path: path.into(),
        }
    }
}

/// Sink for merge and diff events.
pub trait MergeEventListener {
    fn conflict_occurred(&mut self, conflict: &Conflict);
    fn change_occurred(&mut self, change: &ChangeReport);
    fn entering_context(&mut self, context: &ContextDescriptor);
}

/// Keeps every event, in arrival order.
#[derive(Debug, Default, Clone)]
pub struct ChangeAndConflictAccumulator {
    pub conflicts: Vec<Conflict>,
    pub changes: Vec<ChangeReport>,
    pub contexts: Vec<ContextDescriptor>,
}

impl ChangeAndConflictAccumulator {
    pub fn new() -> Self {
        Self::default()
    }
}

impl MergeEventListener for ChangeAndConflictAccumulator {
    fn conflict_occurred(&mut self, conflict: &Conflict) {
        self.conflicts.push(conflict.clone());
    }

    fn change_occurred(&mut self, change: &ChangeReport) {
        self.changes.push(change.clone());
    }

    fn entering_context(&mut self, context: &ContextDescriptor) {
        self.contexts.push(context.clone());
    }
}

/// Forwards each event to every registered listener, in registration order.
#[derive(Default)]
pub struct DispatchingListener<'a> {
    listeners: Vec<&'a mut dyn MergeEventListener>,
}

impl<'a> DispatchingListener<'a> {
    pub fn new() -> Self {
        Self {
            listeners: Vec::new(),
        }
    }

    pub fn add_listener(&mut self, listener: &'a mut dyn MergeEventListener) {
        self.listeners.push(listener);
    }

    pub fn len(&self) -> usize {
        self.listeners.len()
    }

    pub fn is_empty(&self) -> bool {
        self.listeners.is_empty()
    }
}

impl MergeEventListener for DispatchingListener<'_> {
    fn conflict_occurred(&mut self, conflict: &Conflict) {
        for listener in self.listeners.iter_mut() {
            listener.conflict_occurred(conflict);
        }
    }

    fn change_occurred(&mut self, change: &ChangeReport) {
        for listener in self.listeners.iter_mut() {
            listener.change_occurred(change);
        }
    }

    fn entering_context(&mut self, context: &ContextDescriptor) {
        for listener in self.listeners.iter_mut() {
            listener.entering_context(context);
        }
    }
}

/// Discards every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullListener;

impl MergeEventListener for NullListener {
    fn conflict_occurred(&mut self, _conflict: &Conflict) {}

    fn change_occurred(&mut self, _change: &ChangeReport) {}

    fn entering_context(&mut self, _context: &ContextDescriptor) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::conflict::ConflictKind;
    use crate::node::Node;

    /// Records the order in which sinks saw an event.
    struct OrderProbe<'a> {
        tag: &'static str,
        log: &'a std::cell::RefCell<Vec<&'static str>>,
    }

    impl MergeEventListener for OrderProbe<'_> {
        fn conflict_occurred(&mut self, _conflict: &Conflict) {
            self.log.borrow_mut().push(self.tag);
        }
        fn change_occurred(&mut self, _change: &ChangeReport) {}
        fn entering_context(&mut self, _context: &ContextDescriptor) {}
    }

    fn conflict() -> Conflict {
        Conflict::new(
            ConflictKind::BothEditedText,
            "gloss",
            Some("a".into()),
            Some("b".into()),
            None,
        )
    }

    #[test]
    fn accumulator_preserves_arrival_order() {
        let mut acc = ChangeAndConflictAccumulator::new();
        acc.entering_context(&ContextDescriptor::new("lift", "lift"));
        acc.entering_context(&ContextDescriptor::new("entry", "lift/entry[1]"));
        let first = conflict();
        let second = conflict();
        acc.conflict_occurred(&first);
        acc.conflict_occurred(&second);
        acc.change_occurred(&ChangeReport::addition(None, Node::new("entry")));

        assert_eq!(acc.contexts[1].path, "lift/entry[1]");
        assert_eq!(acc.conflicts, vec![first, second]);
        assert_eq!(acc.changes.len(), 1);
    }

    #[test]
    fn dispatcher_fans_out_to_every_listener() {
        let mut a = ChangeAndConflictAccumulator::new();
        let mut b = ChangeAndConflictAccumulator::new();
        let mut c = ChangeAndConflictAccumulator::new();
        let event = conflict();
        {
            let mut dispatcher = DispatchingListener::new();
            dispatcher.add_listener(&mut a);
            dispatcher.add_listener(&mut b);
            dispatcher.add_listener(&mut c);
            assert_eq!(dispatcher.len(), 3);
            dispatcher.conflict_occurred(&event);
        }
        for acc in [&a, &b, &c] {
            assert_eq!(acc.conflicts, vec![event.clone()]);
            assert!(acc.changes.is_empty());
        }
    }

    #[test]
    fn dispatcher_respects_registration_order() {
        let log = std::cell::RefCell::new(Vec::new());
        let mut first = OrderProbe { tag: "first", log: &log };
        let mut second = OrderProbe { tag: "second", log: &log };
        {
            let mut dispatcher = DispatchingListener::new();
            dispatcher.add_listener(&mut first);
            dispatcher.add_listener(&mut second);
            dispatcher.conflict_occurred(&conflict());
        }
        assert_eq!(*log.borrow(), vec!["first", "second"]);
    }

    #[test]
    fn null_listener_discards() {
        let mut sink = NullListener;
        sink.conflict_occurred(&conflict());
        sink.change_occurred(&ChangeReport::addition(None, Node::new("entry")));
    }
}
