//! Dashboard actions
//!
//! High-level handlers for sending messages, moving leads on the board and
//! editing contacts.

mod handler;

pub use handler::{ActionHandler, SendOutcome};
