use std::cell::RefCell;
use std::mem;

use foldhash::{HashMap, HashMapExt};

use crate::{Error, EventBusMode, EventHandler, EventId, Result, Sender};

/// The handlers subscribed to each event id, in subscription order.
///
/// Dispatch does not hold a borrow of the handler lists while a handler runs, so handlers may
/// subscribe, unsubscribe or dispatch further events. Each in-flight dispatch owns a cursor on
/// a stack; unsubscribing shifts the cursors of the affected id so that every in-flight dispatch
/// still visits each remaining handler exactly once. Handlers subscribed while an id is being
/// dispatched are not visited by that dispatch.
pub(crate) struct HandlerRegistry<T> {
    /// Ids with no handlers have no entry.
    handlers: RefCell<HashMap<EventId, Vec<EventHandler<T>>>>,

    /// One entry per in-flight dispatch, innermost last.
    cursors: RefCell<Vec<DispatchCursor>>,
}

#[derive(Debug)]
struct DispatchCursor {
    id: EventId,

    /// Index of the next handler to invoke.
    next: usize,

    /// One past the last handler this dispatch will invoke.
    end: usize,
}

impl<T> HandlerRegistry<T> {
    pub(crate) fn new() -> Self {
        Self {
            handlers: RefCell::new(HashMap::new()),
            cursors: RefCell::new(Vec::new()),
        }
    }

    pub(crate) fn subscribe(
        &self,
        id: EventId,
        handler: EventHandler<T>,
        mode: EventBusMode,
    ) -> Result<()> {
        let mut handlers = self.handlers.borrow_mut();
        let list = handlers.entry(id).or_default();

        if !list.is_empty() {
            if !mode.contains(EventBusMode::ALLOW_MULTI_HANDLER) {
                return Err(Error::MultiHandlerNotAllowed { id });
            }

            if !mode.contains(EventBusMode::ALLOW_DUPLICATE_HANDLER) && list.contains(&handler) {
                return Err(Error::DuplicateHandlerNotAllowed { id });
            }
        }

        list.push(handler);
        Ok(())
    }

    /// Removes the earliest subscription of `handler` to `id`.
    pub(crate) fn unsubscribe(&self, id: EventId, handler: &EventHandler<T>) -> Result<()> {
        let mut handlers = self.handlers.borrow_mut();

        let Some(list) = handlers.get_mut(&id) else {
            return Err(Error::HandlerNotFound { id });
        };

        let Some(index) = list.iter().position(|candidate| candidate == handler) else {
            return Err(Error::HandlerNotFound { id });
        };

        // Dropped only after all borrows end, as its captures may run arbitrary code on drop.
        let removed = list.remove(index);

        if list.is_empty() {
            handlers.remove(&id);
        }

        drop(handlers);

        for cursor in self
            .cursors
            .borrow_mut()
            .iter_mut()
            .filter(|cursor| cursor.id == id)
        {
            if index < cursor.next {
                cursor.next = cursor.next.wrapping_sub(1);
            }

            if index < cursor.end {
                cursor.end = cursor.end.wrapping_sub(1);
            }
        }

        drop(removed);
        Ok(())
    }

    pub(crate) fn contains(&self, id: EventId, handler: &EventHandler<T>) -> bool {
        self.handlers
            .borrow()
            .get(&id)
            .is_some_and(|list| list.contains(handler))
    }

    pub(crate) fn handler_count(&self, id: EventId) -> usize {
        self.handlers.borrow().get(&id).map_or(0, Vec::len)
    }

    pub(crate) fn id_count(&self) -> usize {
        self.handlers.borrow().len()
    }

    /// Removes all subscriptions. In-flight dispatches invoke no further handlers.
    pub(crate) fn clear(&self) {
        let removed = mem::take(&mut *self.handlers.borrow_mut());

        for cursor in self.cursors.borrow_mut().iter_mut() {
            cursor.end = cursor.next;
        }

        drop(removed);
    }

    /// Invokes every handler subscribed to `id`, in subscription order.
    ///
    /// Returns `false` without invoking anything if `id` has no handlers.
    pub(crate) fn dispatch(&self, id: EventId, sender: Option<&Sender>, args: &T) -> bool {
        let Some(end) = self.handlers.borrow().get(&id).map(Vec::len) else {
            return false;
        };

        let depth = {
            let mut cursors = self.cursors.borrow_mut();
            cursors.push(DispatchCursor { id, next: 0, end });
            cursors.len().wrapping_sub(1)
        };

        // Pops the cursor even if a handler panics, so the stack stays aligned with the
        // dispatches that are actually in flight.
        let _guard = CursorGuard {
            cursors: &self.cursors,
        };

        while let Some(handler) = self.next_handler(depth) {
            handler.invoke(sender, args);
        }

        true
    }

    fn next_handler(&self, depth: usize) -> Option<EventHandler<T>> {
        let mut cursors = self.cursors.borrow_mut();
        let cursor = cursors.get_mut(depth)?;

        if cursor.next >= cursor.end {
            return None;
        }

        let index = cursor.next;
        cursor.next = cursor.next.wrapping_add(1);

        self.handlers
            .borrow()
            .get(&cursor.id)
            .and_then(|list| list.get(index))
            .cloned()
    }
}

struct CursorGuard<'a> {
    cursors: &'a RefCell<Vec<DispatchCursor>>,
}

impl Drop for CursorGuard<'_> {
    fn drop(&mut self) {
        self.cursors.borrow_mut().pop();
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use std::cell::OnceCell;
    use std::rc::Rc;

    use testing::CallLog;

    use super::*;

    const MULTI: EventBusMode = EventBusMode::ALLOW_MULTI_HANDLER;

    fn recording(log: &CallLog<&'static str>, name: &'static str) -> EventHandler<u32> {
        let log = log.clone();
        EventHandler::new(move |_, _| log.record(name))
    }

    #[test]
    fn dispatch_follows_subscription_order() {
        let registry = HandlerRegistry::new();
        let log = CallLog::new();

        registry.subscribe(1, recording(&log, "a"), MULTI).unwrap();
        registry.subscribe(1, recording(&log, "b"), MULTI).unwrap();
        registry.subscribe(2, recording(&log, "other"), MULTI).unwrap();

        assert!(registry.dispatch(1, None, &0));
        assert_eq!(log.entries(), vec!["a", "b"]);
    }

    #[test]
    fn dispatch_without_handlers_reports_unhandled() {
        let registry = HandlerRegistry::<u32>::new();
        assert!(!registry.dispatch(1, None, &0));
    }

    #[test]
    fn second_handler_requires_multi_handler_mode() {
        let registry = HandlerRegistry::new();
        let log = CallLog::new();

        registry
            .subscribe(1, recording(&log, "a"), EventBusMode::DEFAULT)
            .unwrap();
        let error = registry
            .subscribe(1, recording(&log, "b"), EventBusMode::DEFAULT)
            .unwrap_err();

        assert!(matches!(error, Error::MultiHandlerNotAllowed { id: 1 }));
        assert_eq!(registry.handler_count(1), 1);
    }

    #[test]
    fn duplicate_handler_requires_duplicate_mode() {
        let registry = HandlerRegistry::new();
        let log = CallLog::new();
        let handler = recording(&log, "a");

        registry.subscribe(1, handler.clone(), MULTI).unwrap();
        let error = registry.subscribe(1, handler.clone(), MULTI).unwrap_err();
        assert!(matches!(error, Error::DuplicateHandlerNotAllowed { id: 1 }));

        registry
            .subscribe(
                1,
                handler,
                MULTI | EventBusMode::ALLOW_DUPLICATE_HANDLER,
            )
            .unwrap();
        assert_eq!(registry.handler_count(1), 2);

        registry.dispatch(1, None, &0);
        assert_eq!(log.entries(), vec!["a", "a"]);
    }

    #[test]
    fn duplicate_flag_alone_does_not_allow_second_handler() {
        let registry = HandlerRegistry::new();
        let log = CallLog::new();
        let handler = recording(&log, "a");

        registry
            .subscribe(1, handler.clone(), EventBusMode::ALLOW_DUPLICATE_HANDLER)
            .unwrap();
        let error = registry
            .subscribe(1, handler, EventBusMode::ALLOW_DUPLICATE_HANDLER)
            .unwrap_err();

        assert!(matches!(error, Error::MultiHandlerNotAllowed { .. }));
    }

    #[test]
    fn unsubscribe_unknown_handler_fails() {
        let registry = HandlerRegistry::new();
        let log = CallLog::new();
        let subscribed = recording(&log, "a");

        let error = registry.unsubscribe(1, &subscribed).unwrap_err();
        assert!(matches!(error, Error::HandlerNotFound { id: 1 }));

        registry.subscribe(1, subscribed.clone(), MULTI).unwrap();
        let error = registry
            .unsubscribe(1, &recording(&log, "b"))
            .unwrap_err();
        assert!(matches!(error, Error::HandlerNotFound { id: 1 }));

        let error = registry.unsubscribe(2, &subscribed).unwrap_err();
        assert!(matches!(error, Error::HandlerNotFound { id: 2 }));
    }

    #[test]
    fn last_unsubscribe_forgets_the_id() {
        let registry = HandlerRegistry::new();
        let log = CallLog::new();
        let handler = recording(&log, "a");

        registry.subscribe(7, handler.clone(), MULTI).unwrap();
        assert_eq!(registry.id_count(), 1);
        assert!(registry.contains(7, &handler));

        registry.unsubscribe(7, &handler).unwrap();
        assert_eq!(registry.id_count(), 0);
        assert!(!registry.contains(7, &handler));
        assert!(!registry.dispatch(7, None, &0));
    }

    #[test]
    fn handler_unsubscribing_a_later_handler_skips_it() {
        let registry = Rc::new(HandlerRegistry::new());
        let log = CallLog::new();

        let b = recording(&log, "b");

        let a = {
            let log = log.clone();
            let registry = Rc::downgrade(&registry);
            let b = b.clone();
            EventHandler::new(move |_, _: &u32| {
                log.record("a");
                registry.upgrade().unwrap().unsubscribe(1, &b).unwrap();
            })
        };

        registry.subscribe(1, a, MULTI).unwrap();
        registry.subscribe(1, b, MULTI).unwrap();
        registry.subscribe(1, recording(&log, "c"), MULTI).unwrap();

        registry.dispatch(1, None, &0);

        assert_eq!(log.entries(), vec!["a", "c"]);
        assert_eq!(registry.handler_count(1), 2);
    }

    #[test]
    fn handler_unsubscribing_itself_does_not_skip_the_next() {
        let registry = Rc::new(HandlerRegistry::new());
        let log = CallLog::new();

        let a = Rc::new(OnceCell::new());
        let handler = {
            let log = log.clone();
            let registry = Rc::downgrade(&registry);
            let a = Rc::clone(&a);
            EventHandler::new(move |_, _: &u32| {
                log.record("a");
                let this: &EventHandler<u32> = a.get().unwrap();
                registry.upgrade().unwrap().unsubscribe(1, this).unwrap();
            })
        };
        a.set(handler.clone()).unwrap();

        registry.subscribe(1, handler, MULTI).unwrap();
        registry.subscribe(1, recording(&log, "b"), MULTI).unwrap();

        registry.dispatch(1, None, &0);
        registry.dispatch(1, None, &0);

        assert_eq!(log.entries(), vec!["a", "b", "b"]);
    }

    #[test]
    fn handler_unsubscribing_an_earlier_handler_does_not_repeat_itself() {
        let registry = Rc::new(HandlerRegistry::new());
        let log = CallLog::new();

        let a = recording(&log, "a");

        let b = {
            let log = log.clone();
            let registry = Rc::downgrade(&registry);
            let a = a.clone();
            EventHandler::new(move |_, _: &u32| {
                log.record("b");
                registry.upgrade().unwrap().unsubscribe(1, &a).unwrap();
            })
        };

        registry.subscribe(1, a, MULTI).unwrap();
        registry.subscribe(1, b, MULTI).unwrap();
        registry.subscribe(1, recording(&log, "c"), MULTI).unwrap();

        registry.dispatch(1, None, &0);

        assert_eq!(log.entries(), vec!["a", "b", "c"]);
    }

    #[test]
    fn handler_subscribed_during_dispatch_waits_for_next_dispatch() {
        let registry = Rc::new(HandlerRegistry::new());
        let log = CallLog::new();

        let late = recording(&log, "late");

        let a = {
            let log = log.clone();
            let registry = Rc::downgrade(&registry);
            EventHandler::new(move |_, _: &u32| {
                log.record("a");
                let registry = registry.upgrade().unwrap();
                if !registry.contains(1, &late) {
                    registry.subscribe(1, late.clone(), MULTI).unwrap();
                }
            })
        };

        registry.subscribe(1, a, MULTI).unwrap();

        registry.dispatch(1, None, &0);
        assert_eq!(log.take(), vec!["a"]);

        registry.dispatch(1, None, &0);
        assert_eq!(log.take(), vec!["a", "late"]);
    }

    #[test]
    fn nested_dispatch_keeps_outer_position() {
        let registry = Rc::new(HandlerRegistry::new());
        let log = CallLog::new();

        let b = recording(&log, "b");

        // Dispatching 1 with payload 0 re-dispatches 1 with payload 1, during which `b` is
        // unsubscribed. Neither dispatch may invoke `b` after that point.
        let a = {
            let log = log.clone();
            let registry = Rc::downgrade(&registry);
            let b = b.clone();
            EventHandler::new(move |_, depth: &u32| {
                log.record("a");
                let registry = registry.upgrade().unwrap();

                if *depth == 0 {
                    registry.dispatch(1, None, &1);
                } else {
                    registry.unsubscribe(1, &b).unwrap();
                }
            })
        };

        registry.subscribe(1, a, MULTI).unwrap();
        registry.subscribe(1, b, MULTI).unwrap();
        registry.subscribe(1, recording(&log, "c"), MULTI).unwrap();

        registry.dispatch(1, None, &0);

        // Outer: a, (inner: a, c), c.
        assert_eq!(log.entries(), vec!["a", "a", "c", "c"]);
        assert!(registry.cursors.borrow().is_empty());
    }

    #[test]
    fn clear_during_dispatch_stops_the_dispatch() {
        let registry = Rc::new(HandlerRegistry::new());
        let log = CallLog::new();

        let a = {
            let log = log.clone();
            let registry = Rc::downgrade(&registry);
            EventHandler::new(move |_, _: &u32| {
                log.record("a");
                registry.upgrade().unwrap().clear();
            })
        };

        registry.subscribe(1, a, MULTI).unwrap();
        registry.subscribe(1, recording(&log, "b"), MULTI).unwrap();

        registry.dispatch(1, None, &0);

        assert_eq!(log.entries(), vec!["a"]);
        assert_eq!(registry.id_count(), 0);
    }
}
