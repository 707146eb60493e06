//! Account model: admins, workers and customers.

use serde::{Deserialize, Serialize};

use super::Department;

/// Account role.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    #[serde(alias = "trabalhador")]
    Worker,
    #[serde(alias = "usuario")]
    Customer,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Worker => "worker",
            Role::Customer => "customer",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "admin" => Some(Role::Admin),
            "worker" | "trabalhador" => Some(Role::Worker),
            "customer" | "usuario" => Some(Role::Customer),
            _ => None,
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A stored account. The email is the case-insensitive login key.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    pub name: String,
    pub email: String,
    /// Argon2 PHC string; plaintext never reaches storage
    pub password_hash: String,
    pub role: Role,
    /// Only present for workers
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub department: Option<Department>,
}

impl User {
    pub fn summary(&self) -> UserSummary {
        UserSummary {
            name: self.name.clone(),
            role: self.role,
            email: self.email.clone(),
        }
    }

    pub fn view(&self) -> AccountView {
        AccountView {
            id: self.id.clone(),
            name: self.name.clone(),
            email: self.email.clone(),
            role: self.role,
            department: self.department,
        }
    }
}

/// Public view of an account returned by login.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct UserSummary {
    pub name: String,
    pub role: Role,
    pub email: String,
}

/// Account as listed to admins; never carries the credential.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AccountView {
    pub id: String,
    pub name: String,
    pub email: String,
    pub role: Role,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub department: Option<Department>,
}

/// Request body for creating a worker or customer account.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewAccountRequest {
    pub name: String,
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub department: Option<String>,
}

/// Normalize an email into its lookup key.
pub fn normalize_email(value: &str) -> String {
    value.trim().to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_accepts_legacy_spellings() {
        let worker: Role = serde_json::from_str("\"trabalhador\"").unwrap();
        let customer: Role = serde_json::from_str("\"usuario\"").unwrap();
        assert_eq!(worker, Role::Worker);
        assert_eq!(customer, Role::Customer);
        assert_eq!(serde_json::to_string(&Role::Worker).unwrap(), "\"worker\"");
    }

    #[test]
    fn test_normalize_email() {
        assert_eq!(normalize_email("  Admin1@SB.com "), "admin1@sb.com");
    }
}
