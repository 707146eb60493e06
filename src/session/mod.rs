//! Session management.
//!
//! The logged-in identity lives in its own storage slot ([`SESSION_KEY`]), so
//! resetting or reseeding the queue document never logs anyone out.

use std::sync::Arc;

use crate::auth::verify_password;
use crate::db::{KeyValueStore, SESSION_KEY};
use crate::errors::AppError;
use crate::models::{normalize_email, Role, Session, UserSummary};
use crate::store::DataStore;

/// Screen a caller should move to after a session change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RedirectTarget {
    Login,
    AdminDashboard,
    WorkerDashboard,
    CustomerHome,
}

impl RedirectTarget {
    pub fn for_role(role: Role) -> Self {
        match role {
            Role::Admin => RedirectTarget::AdminDashboard,
            Role::Worker => RedirectTarget::WorkerDashboard,
            Role::Customer => RedirectTarget::CustomerHome,
        }
    }

    pub fn path(&self) -> &'static str {
        match self {
            RedirectTarget::Login => "/login",
            RedirectTarget::AdminDashboard => "/admin",
            RedirectTarget::WorkerDashboard => "/worker",
            RedirectTarget::CustomerHome => "/",
        }
    }
}

/// Performs redirect side effects on behalf of the session manager.
pub trait Navigator: Send + Sync {
    fn redirect(&self, target: RedirectTarget);
}

/// Navigator that only logs where it would go.
#[derive(Debug, Default)]
pub struct TracingNavigator;

impl Navigator for TracingNavigator {
    fn redirect(&self, target: RedirectTarget) {
        tracing::info!(to = target.path(), "Redirect");
    }
}

/// Navigator that records redirects in memory.
#[cfg(test)]
#[derive(Debug, Default)]
pub struct RecordingNavigator {
    visited: std::sync::Mutex<Vec<RedirectTarget>>,
}

#[cfg(test)]
impl RecordingNavigator {
    pub fn visited(&self) -> Vec<RedirectTarget> {
        self.visited
            .lock()
            .map(|v| v.clone())
            .unwrap_or_default()
    }
}

#[cfg(test)]
impl Navigator for RecordingNavigator {
    fn redirect(&self, target: RedirectTarget) {
        if let Ok(mut visited) = self.visited.lock() {
            visited.push(target);
        }
    }
}

/// Successful login result.
#[derive(Debug, Clone, PartialEq)]
pub struct LoginOutcome {
    pub user: UserSummary,
    pub redirect: RedirectTarget,
}

pub struct SessionManager {
    store: Arc<DataStore>,
    kv: Arc<dyn KeyValueStore>,
    navigator: Arc<dyn Navigator>,
}

impl SessionManager {
    pub fn new(store: Arc<DataStore>, navigator: Arc<dyn Navigator>) -> Self {
        let kv = store.kv();
        Self {
            store,
            kv,
            navigator,
        }
    }

    /// Authenticate and persist a session record.
    pub async fn login(
        &self,
        email: &str,
        password: &str,
        expected_role: Option<Role>,
    ) -> Result<LoginOutcome, AppError> {
        let email = normalize_email(email);
        let document = self.store.read().await?;

        let Some(user) = document.find_user_by_email(&email) else {
            tracing::info!(email = %email, "Login for unknown account");
            return Err(AppError::InvalidCredentials(
                "Account not found. Please register.".to_string(),
            ));
        };

        if !verify_password(password, &user.password_hash) {
            tracing::info!(email = %email, "Login with wrong password");
            return Err(AppError::WrongPassword("Incorrect password.".to_string()));
        }

        if let Some(expected) = expected_role {
            if user.role != expected {
                return Err(AppError::RoleMismatch(
                    "The selected profile does not match this account.".to_string(),
                ));
            }
        }

        let session = Session::for_user(user);
        let json = serde_json::to_string(&session)?;
        self.kv.put(SESSION_KEY, &json, None).await?;
        tracing::info!(email = %email, role = %user.role, "Logged in");

        Ok(LoginOutcome {
            user: user.summary(),
            redirect: RedirectTarget::for_role(user.role),
        })
    }

    /// The stored session. An unreadable record counts as no session.
    pub async fn current_session(&self) -> Result<Option<Session>, AppError> {
        let Some(stored) = self.kv.get(SESSION_KEY).await? else {
            return Ok(None);
        };

        match serde_json::from_str(&stored.value) {
            Ok(session) => Ok(Some(session)),
            Err(e) => {
                tracing::warn!("Ignoring unreadable session record: {}", e);
                Ok(None)
            }
        }
    }

    /// Return the session if its role is allowed; otherwise redirect to the
    /// login screen and return `None`. Callers must stop rendering on `None`.
    pub async fn require_role(&self, allowed: &[Role]) -> Result<Option<Session>, AppError> {
        match self.current_session().await? {
            Some(session) if allowed.contains(&session.role) => Ok(Some(session)),
            _ => {
                self.navigator.redirect(RedirectTarget::Login);
                Ok(None)
            }
        }
    }

    pub async fn logout(&self) -> Result<(), AppError> {
        self.kv.remove(SESSION_KEY).await?;
        tracing::info!("Logged out");
        self.navigator.redirect(RedirectTarget::Login);
        Ok(())
    }
}
