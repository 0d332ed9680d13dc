// Team Variable Domain Model

use serde::{Deserialize, Serialize};

/// Team-wide variable stored on the platform
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TeamVariable {
    pub id: String,
    pub key: String,
    #[serde(default)]
    pub value: Option<String>,
    #[serde(default)]
    pub is_sensitive: bool,
}

/// Body of `POST /variables`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateVariableInput {
    pub key: String,
    pub value: String,
    pub is_sensitive: bool,
}

/// Body of `PATCH /variables/{id}`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateVariableInput {
    pub key: String,
    pub value: String,
}

/// Key/value view of a team variable
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnvVar {
    pub key: String,
    pub value: Option<String>,
}

impl From<TeamVariable> for EnvVar {
    fn from(variable: TeamVariable) -> Self {
        Self {
            key: variable.key,
            value: variable.value,
        }
    }
}
