use std::fmt;
use std::ops::{BitOr, BitOrAssign};

/// Flags that govern how strictly an [`EventBus`][crate::EventBus] treats subscriptions and
/// unhandled events.
///
/// Combine flags with `|`. The empty set, [`EventBusMode::DEFAULT`], is the strictest mode: every
/// event must be handled, each event id accepts exactly one handler.
///
/// # Example
///
/// ```rust
/// use event_pool::EventBusMode;
///
/// let mode = EventBusMode::ALLOW_NO_HANDLER | EventBusMode::ALLOW_MULTI_HANDLER;
///
/// assert!(mode.contains(EventBusMode::ALLOW_MULTI_HANDLER));
/// assert!(!mode.contains(EventBusMode::ALLOW_DUPLICATE_HANDLER));
/// ```
#[derive(Clone, Copy, Default, Eq, Hash, PartialEq)]
pub struct EventBusMode {
    bits: u8,
}

impl EventBusMode {
    /// No flags set. Events without handlers are errors and each id accepts one handler.
    pub const DEFAULT: Self = Self { bits: 0 };

    /// Events that have neither handlers nor a default handler are dropped silently instead of
    /// failing with [`Error::NoHandler`][crate::Error::NoHandler].
    pub const ALLOW_NO_HANDLER: Self = Self { bits: 0b001 };

    /// An event id may have more than one handler.
    pub const ALLOW_MULTI_HANDLER: Self = Self { bits: 0b010 };

    /// The same handler may be subscribed to the same event id more than once, in which case it
    /// is invoked once per subscription. Only meaningful together with
    /// [`ALLOW_MULTI_HANDLER`][Self::ALLOW_MULTI_HANDLER].
    pub const ALLOW_DUPLICATE_HANDLER: Self = Self { bits: 0b100 };

    const NAMED: [(Self, &'static str); 3] = [
        (Self::ALLOW_NO_HANDLER, "ALLOW_NO_HANDLER"),
        (Self::ALLOW_MULTI_HANDLER, "ALLOW_MULTI_HANDLER"),
        (Self::ALLOW_DUPLICATE_HANDLER, "ALLOW_DUPLICATE_HANDLER"),
    ];

    /// Returns `true` if all flags in `other` are set in `self`.
    #[must_use]
    pub const fn contains(self, other: Self) -> bool {
        (self.bits & other.bits) == other.bits
    }

    /// The raw bit representation of the flags.
    #[must_use]
    pub const fn bits(self) -> u8 {
        self.bits
    }
}

impl BitOr for EventBusMode {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self {
            bits: self.bits | rhs.bits,
        }
    }
}

impl BitOrAssign for EventBusMode {
    fn bitor_assign(&mut self, rhs: Self) {
        self.bits |= rhs.bits;
    }
}

impl fmt::Debug for EventBusMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names = Self::NAMED
            .iter()
            .filter(|(flag, _)| self.contains(*flag))
            .map(|(_, name)| *name)
            .peekable();

        if names.peek().is_none() {
            return write!(f, "EventBusMode(DEFAULT)");
        }

        write!(f, "EventBusMode(")?;

        let mut first = true;
        for name in names {
            if !first {
                write!(f, " | ")?;
            }
            first = false;

            write!(f, "{name}")?;
        }

        write!(f, ")")
    }
}
