//! Session record of the locally authenticated identity.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{Department, Role, User};

/// Persisted in its own storage slot, independent of the queue document.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub email: String,
    pub name: String,
    pub role: Role,
    #[serde(default)]
    pub department: Option<Department>,
    pub logged_at: DateTime<Utc>,
}

impl Session {
    pub fn for_user(user: &User) -> Self {
        Self {
            email: user.email.clone(),
            name: user.name.clone(),
            role: user.role,
            department: user.department,
            logged_at: Utc::now(),
        }
    }
}
