//! Error types callers branch on
//!
//! Operations return `anyhow::Result`; these variants travel inside it and
//! can be recovered with `downcast_ref::<CrmError>()`.

use crate::models::{ContactId, MessageId};

#[derive(Debug, thiserror::Error)]
pub enum CrmError {
    /// Profile has no phone number, so there is no account to show
    #[error("No phone number is associated with profile {user_id}; update the profile first")]
    MissingPhoneNumber { user_id: String },

    #[error("Profile {user_id} not found")]
    ProfileNotFound { user_id: String },

    #[error("Contact {} not found", .0.as_str())]
    ContactNotFound(ContactId),

    #[error("Message {0} not found")]
    MessageNotFound(MessageId),

    /// Only messages recorded by the send path can be delivered again
    #[error("Message {0} was not sent from this dashboard and cannot be retried")]
    NotRetryable(MessageId),

    #[error("Message text is empty")]
    EmptyMessage,
}
