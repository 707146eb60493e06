//! Schema versioning for the stored document.
//!
//! Raw JSON is upgraded one version at a time before typed decoding. Version 1
//! is the unversioned layout: plaintext `password` on accounts, a single
//! `counter` field, and tickets that may lack their routing fields.

use chrono::Utc;
use serde_json::{Map, Value};

use crate::auth::hash_password;
use crate::engine::routing::route_for_service;
use crate::models::{Department, Document, SCHEMA_VERSION};

/// Result of decoding a stored blob.
#[derive(Debug)]
pub struct Decoded {
    pub document: Document,
    /// True when the blob was written by an older schema and was upgraded
    pub migrated: bool,
}

/// Decode a stored document, upgrading older schemas.
///
/// The error is a human-readable reason the blob is unusable.
pub fn decode_document(raw: &str) -> Result<Decoded, String> {
    let mut value: Value = serde_json::from_str(raw).map_err(|e| e.to_string())?;
    let object = value
        .as_object_mut()
        .ok_or_else(|| "document is not a JSON object".to_string())?;

    let version = match object.get("schemaVersion").and_then(Value::as_u64) {
        None => 1,
        Some(raw) => u32::try_from(raw)
            .map_err(|_| format!("schema version {} is out of range", raw))?,
    };

    if version > SCHEMA_VERSION {
        return Err(format!(
            "schema version {} is newer than supported version {}",
            version, SCHEMA_VERSION
        ));
    }

    let migrated = version < SCHEMA_VERSION;
    if version < 2 {
        migrate_v1_to_v2(object)?;
    }

    let document: Document = serde_json::from_value(value).map_err(|e| e.to_string())?;
    Ok(Decoded { document, migrated })
}

fn migrate_v1_to_v2(object: &mut Map<String, Value>) -> Result<(), String> {
    tracing::info!("Migrating stored document from schema 1 to 2");

    if !object.get("counterNormal").is_some_and(Value::is_u64) {
        let legacy = object.get("counter").and_then(Value::as_u64).unwrap_or(0);
        object.insert("counterNormal".to_string(), Value::from(legacy));
    }
    object.remove("counter");
    if !object.get("counterPriority").is_some_and(Value::is_u64) {
        object.insert("counterPriority".to_string(), Value::from(0));
    }
    if !object.get("updatedAt").is_some_and(Value::is_string) {
        object.insert("updatedAt".to_string(), Value::from(Utc::now().to_rfc3339()));
    }

    for key in ["users", "queue", "history", "dailyArchives"] {
        if !object.get(key).is_some_and(Value::is_array) {
            object.insert(key.to_string(), Value::Array(Vec::new()));
        }
    }

    if let Some(Value::Array(users)) = object.get_mut("users") {
        for user in users.iter_mut() {
            migrate_user(user)?;
        }
    }

    for key in ["queue", "history"] {
        if let Some(Value::Array(tickets)) = object.get_mut(key) {
            tickets.iter_mut().for_each(fill_ticket_routing);
        }
    }

    if let Some(Value::Array(archives)) = object.get_mut("dailyArchives") {
        for archive in archives.iter_mut() {
            for key in ["queue", "history"] {
                if let Some(Value::Array(tickets)) = archive.get_mut(key) {
                    tickets.iter_mut().for_each(fill_ticket_routing);
                }
            }
        }
    }

    object.insert("schemaVersion".to_string(), Value::from(2));
    Ok(())
}

fn migrate_user(user: &mut Value) -> Result<(), String> {
    let Some(fields) = user.as_object_mut() else {
        return Err("account entry is not an object".to_string());
    };

    if let Some(Value::String(plain)) = fields.remove("password") {
        if !fields.contains_key("passwordHash") {
            let hash = hash_password(&plain).map_err(|e| e.message())?;
            fields.insert("passwordHash".to_string(), Value::from(hash));
        }
    }
    // An account without any credential can never log in
    fields
        .entry("passwordHash")
        .or_insert_with(|| Value::from(""));

    let is_worker = matches!(
        fields.get("role").and_then(Value::as_str),
        Some("trabalhador") | Some("worker")
    );
    if is_worker {
        let department = fields
            .get("department")
            .and_then(Value::as_str)
            .map(Department::normalize)
            .unwrap_or_default();
        fields.insert("department".to_string(), Value::from(department.as_str()));
    }
    Ok(())
}

fn fill_ticket_routing(ticket: &mut Value) {
    let Some(fields) = ticket.as_object_mut() else {
        return;
    };

    let service = fields
        .get("service")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();
    let route = route_for_service(&service);

    let department = fields
        .get("department")
        .and_then(Value::as_str)
        .filter(|d| !d.trim().is_empty())
        .map(Department::normalize)
        .unwrap_or(route.department);

    fields.insert("department".to_string(), Value::from(department.as_str()));
    if !fields.get("counterNumber").is_some_and(Value::is_u64) {
        fields.insert("counterNumber".to_string(), Value::from(route.counter_number));
    }
    if !fields.get("counterName").is_some_and(Value::is_string) {
        fields.insert(
            "counterName".to_string(),
            Value::from(department.counter_name()),
        );
    }
}
