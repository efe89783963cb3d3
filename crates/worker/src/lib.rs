//! Shared worker runtime primitives.
//!
//! * [`spawn`]: classified task spawning that works with or without an
//!   ambient tokio runtime.
//! * [`Mailbox`]: thread-safe single-slot mailbox where the latest message
//!   wins.
//! * [`GenerationClock`]: monotonic generations used to recognise and
//!   suppress stale async completions.
//! * [`DebouncedTrigger`]: sliding-window coalescing of bursty events.

mod class;
pub mod debounce;
pub mod mailbox;
mod spawn;
pub mod token;

pub use class::TaskClass;
pub use debounce::{DebounceEmitter, DebouncedTrigger};
pub use mailbox::{Mailbox, MailboxReceiver, MailboxSendError, MailboxSendOutcome, MailboxSender};
pub use spawn::spawn;
pub use token::GenerationClock;
