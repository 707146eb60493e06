//! Department model: the three fixed service areas and their counters.

use serde::{Deserialize, Serialize};

/// One of the three canonical departments. Each owns exactly one counter.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(from = "String", into = "String")]
pub enum Department {
    SecretariaAcademica,
    Contabilidade,
    #[default]
    ApoioAoCliente,
}

impl Department {
    pub const ALL: [Department; 3] = [
        Department::SecretariaAcademica,
        Department::Contabilidade,
        Department::ApoioAoCliente,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Department::SecretariaAcademica => "Secretaria Academica",
            Department::Contabilidade => "Contabilidade",
            Department::ApoioAoCliente => "Apoio ao Cliente",
        }
    }

    /// Normalize free text into a department. Unrecognized input maps to the default.
    pub fn normalize(value: &str) -> Self {
        match value.trim().to_lowercase().as_str() {
            "secretaria academica" | "secretaria" => Department::SecretariaAcademica,
            "contabilidade" | "tesouraria" => Department::Contabilidade,
            _ => Department::ApoioAoCliente,
        }
    }

    pub fn counter_number(&self) -> u8 {
        match self {
            Department::SecretariaAcademica => 1,
            Department::Contabilidade => 2,
            Department::ApoioAoCliente => 3,
        }
    }

    pub fn counter_name(&self) -> String {
        format!("Balcao {} - {}", self.counter_number(), self.as_str())
    }
}

impl std::fmt::Display for Department {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<String> for Department {
    fn from(value: String) -> Self {
        Department::normalize(&value)
    }
}

impl From<Department> for String {
    fn from(value: Department) -> Self {
        value.as_str().to_string()
    }
}
