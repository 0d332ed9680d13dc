// Language Domain Model

use crate::error::AppError;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Languages the platform can run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Language {
    #[serde(rename = "JAVASCRIPT")]
    JavaScript,
    #[serde(rename = "PYTHON")]
    Python,
}

impl Language {
    /// Lower-case name, as users type it
    pub fn as_str(&self) -> &'static str {
        match self {
            Language::JavaScript => "javascript",
            Language::Python => "python",
        }
    }

    /// Name the platform expects in `programmingLanguage`
    pub fn wire_name(&self) -> &'static str {
        match self {
            Language::JavaScript => "JAVASCRIPT",
            Language::Python => "PYTHON",
        }
    }
}

impl std::fmt::Display for Language {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Language {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "javascript" | "js" => Ok(Language::JavaScript),
            "python" | "py" => Ok(Language::Python),
            other => Err(AppError::Config(format!(
                "Unsupported language '{}'. Use 'javascript' or 'python'.",
                other
            ))),
        }
    }
}
