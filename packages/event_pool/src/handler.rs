use std::fmt;
use std::rc::Rc;

use crate::Sender;

/// A callback that is invoked with the sender and payload of each event it is subscribed to.
///
/// The handle is cheap to clone and all clones refer to the same callback. Subscribing,
/// unsubscribing and the duplicate-handler check all go by this identity, so keep a clone of the
/// handle around if you intend to unsubscribe later. Two handles created from identical closures
/// are different handlers.
///
/// Handlers run on the thread that dispatches events and are not required to be thread-safe.
///
/// # Example
///
/// ```rust
/// use event_pool::EventHandler;
///
/// let handler = EventHandler::new(|_sender, score: &u32| println!("score: {score}"));
/// let same = handler.clone();
/// let other = EventHandler::new(|_sender, score: &u32| println!("score: {score}"));
///
/// assert_eq!(handler, same);
/// assert_ne!(handler, other);
/// ```
pub struct EventHandler<T> {
    callback: Rc<dyn Fn(Option<&Sender>, &T)>,
}

impl<T> EventHandler<T> {
    /// Wraps a callback into a new handler with its own identity.
    pub fn new<F>(callback: F) -> Self
    where
        F: Fn(Option<&Sender>, &T) + 'static,
    {
        Self {
            callback: Rc::new(callback),
        }
    }

    pub(crate) fn invoke(&self, sender: Option<&Sender>, args: &T) {
        (self.callback)(sender, args);
    }
}

impl<T> Clone for EventHandler<T> {
    fn clone(&self) -> Self {
        Self {
            callback: Rc::clone(&self.callback),
        }
    }
}

impl<T> PartialEq for EventHandler<T> {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.callback, &other.callback)
    }
}

impl<T> Eq for EventHandler<T> {}

impl<T> fmt::Debug for EventHandler<T> {
    #[cfg_attr(test, mutants::skip)] // Diagnostic output only, no contract to verify.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventHandler")
            .field("callback", &Rc::as_ptr(&self.callback).cast::<()>())
            .finish()
    }
}
