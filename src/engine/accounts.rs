//! Account administration: workers and self-registered customers.

use super::{required_id, QueueEngine};
use crate::auth::{hash_password, validate_account};
use crate::errors::AppError;
use crate::models::{AccountView, Department, NewAccountRequest, Role, TicketStatus, User};

impl QueueEngine {
    /// Create a worker account. An unknown department falls back to the
    /// generic one.
    pub async fn add_worker(&self, request: NewAccountRequest) -> Result<AccountView, AppError> {
        let department = request
            .department
            .as_deref()
            .map(Department::normalize)
            .unwrap_or_default();
        self.create_account(request, Role::Worker, Some(department))
            .await
    }

    /// Create a customer account.
    pub async fn register_customer(
        &self,
        request: NewAccountRequest,
    ) -> Result<AccountView, AppError> {
        self.create_account(request, Role::Customer, None).await
    }

    /// Delete a worker account. Refused while the worker is serving a ticket.
    pub async fn remove_worker(&self, worker_id: &str) -> Result<AccountView, AppError> {
        let worker_id = required_id(worker_id, "worker")?;

        self.store
            .update_data(move |doc| {
                let index = doc
                    .users
                    .iter()
                    .position(|u| u.id == worker_id && u.role == Role::Worker)
                    .ok_or_else(|| AppError::NotFound("Worker not found".to_string()))?;

                let name = doc.users[index].name.clone();
                let serving = doc.queue.iter().any(|t| {
                    t.status == TicketStatus::InService
                        && t.attended_by.as_deref() == Some(name.as_str())
                });
                if serving {
                    return Err(AppError::StateConflict(
                        "This worker has a service in progress".to_string(),
                    ));
                }

                let removed = doc.users.remove(index);
                tracing::info!(email = %removed.email, "Worker removed");
                Ok(removed.view())
            })
            .await
    }

    /// Worker accounts in storage order.
    pub async fn list_workers(&self) -> Result<Vec<AccountView>, AppError> {
        let document = self.store.read().await?;
        Ok(document
            .users
            .iter()
            .filter(|u| u.role == Role::Worker)
            .map(User::view)
            .collect())
    }

    async fn create_account(
        &self,
        request: NewAccountRequest,
        role: Role,
        department: Option<Department>,
    ) -> Result<AccountView, AppError> {
        let fields = validate_account(&request.name, &request.email, &request.password)?;
        // Hashing is slow; keep it outside the write lock
        let password_hash = hash_password(&fields.password)?;

        self.store
            .update_data(move |doc| {
                if doc.find_user_by_email(&fields.email).is_some() {
                    return Err(AppError::Validation(
                        "An account with this email already exists".to_string(),
                    ));
                }

                let user = User {
                    id: uuid::Uuid::new_v4().to_string(),
                    name: fields.name,
                    email: fields.email,
                    password_hash,
                    role,
                    department,
                };
                tracing::info!(email = %user.email, role = %user.role, "Account created");
                let view = user.view();
                doc.users.push(user);
                Ok(view)
            })
            .await
    }
}
