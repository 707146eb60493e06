//! Deterministic default document written on first use.

use crate::auth::hash_password;
use crate::errors::AppError;
use crate::models::{Department, Document, Role, User};

struct SeedAccount {
    id: &'static str,
    name: &'static str,
    email: &'static str,
    password: &'static str,
    role: Role,
    department: Option<Department>,
}

const SEED_ACCOUNTS: [SeedAccount; 4] = [
    SeedAccount {
        id: "u-admin-1",
        name: "Administrador 1",
        email: "admin1@sb.com",
        password: "Admin1234",
        role: Role::Admin,
        department: None,
    },
    SeedAccount {
        id: "u-admin-2",
        name: "Administrador 2",
        email: "admin2@sb.com",
        password: "Admin2234",
        role: Role::Admin,
        department: None,
    },
    SeedAccount {
        id: "u-worker-1",
        name: "Trabalhador 1",
        email: "trabalhador@sb.com",
        password: "Trab12345",
        role: Role::Worker,
        department: Some(Department::SecretariaAcademica),
    },
    SeedAccount {
        id: "u-user-1",
        name: "Usuario 1",
        email: "usuario@sb.com",
        password: "User12345",
        role: Role::Customer,
        department: None,
    },
];

/// Build the seed document: demo accounts, empty queue and history, zero counters.
pub fn seed_document() -> Result<Document, AppError> {
    let mut document = Document::empty();
    for account in &SEED_ACCOUNTS {
        document.users.push(User {
            id: account.id.to_string(),
            name: account.name.to_string(),
            email: account.email.to_string(),
            password_hash: hash_password(account.password)?,
            role: account.role,
            department: account.department,
        });
    }
    Ok(document)
}
