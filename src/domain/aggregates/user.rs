//! User Aggregate

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

/// Shopper account. Credentials and sign-up live with the external auth
/// service; this side only reads the profile and the blocked flag.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct User {
    pub id: Uuid,
    pub user_name: String,
    pub email: String,
    pub phone_no: Option<String>,
    pub is_blocked: bool,
    pub created_at: DateTime<Utc>,
}

impl User {
    pub fn register(user_name: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            id: Uuid::now_v7(), user_name: user_name.into(), email: email.into(),
            phone_no: None, is_blocked: false, created_at: Utc::now(),
        }
    }
}
