//! User profile and the account context derived from it

use serde::{Deserialize, Serialize};

use crate::error::CrmError;

/// Profile of an authenticated dashboard user
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    /// Auth user id (primary key)
    pub user_id: String,
    pub email: Option<String>,
    pub full_name: Option<String>,
    /// Phone number of the chat account this user operates
    pub phone_number: Option<String>,
}

impl Profile {
    pub fn new(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            email: None,
            full_name: None,
            phone_number: None,
        }
    }

    pub fn with_phone(mut self, phone: impl Into<String>) -> Self {
        self.phone_number = Some(phone.into());
        self
    }

    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    pub fn with_full_name(mut self, name: impl Into<String>) -> Self {
        self.full_name = Some(name.into());
        self
    }

    /// Account context for message queries.
    ///
    /// Fails with [`CrmError::MissingPhoneNumber`] when the profile has no
    /// phone number, which callers show as an inline notice.
    pub fn account_context(&self) -> Result<AccountContext, CrmError> {
        match self.phone_number.as_deref().map(str::trim) {
            Some(phone) if !phone.is_empty() => Ok(AccountContext {
                user_id: self.user_id.clone(),
                account_phone: phone.to_string(),
            }),
            _ => Err(CrmError::MissingPhoneNumber {
                user_id: self.user_id.clone(),
            }),
        }
    }
}

/// Who is acting and which account's messages they see
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountContext {
    pub user_id: String,
    pub account_phone: String,
}

impl AccountContext {
    pub fn new(user_id: impl Into<String>, account_phone: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            account_phone: account_phone.into(),
        }
    }
}
