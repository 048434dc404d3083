//! Authenticated session identity.

use crate::ids::UserId;
use serde::{Deserialize, Serialize};

/// Role of the authenticated user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Browses stories and swipes to match.
    Buyer,
    /// Lists abandoned stories/projects for sale.
    Seller,
    /// Manages users and products.
    Admin,
}

/// Identity resolved from the stored bearer credential.
///
/// Read-only on the client: refreshed on page load, never mutated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    /// Backend user identifier.
    pub user_id: UserId,
    /// Display name shown on outgoing messages.
    pub display_name: String,
    /// Account role.
    pub role: Role,
}

impl Session {
    /// Create a new session record.
    pub fn new(user_id: impl Into<UserId>, display_name: impl Into<String>, role: Role) -> Self {
        Self {
            user_id: user_id.into(),
            display_name: display_name.into(),
            role,
        }
    }
}
