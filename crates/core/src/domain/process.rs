// Process Domain Model

use serde::{Deserialize, Serialize};

/// Remote process as returned by the platform (only the fields the SDK reads)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Process {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub slug: String,
}

/// Source code of a process
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateScriptInput {
    pub programming_language: String,
    pub source_code: String,
}

/// Dependency resolution settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DependenciesConfig {
    pub scoped_to_process: bool,
    pub auto_detect: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessSettings {
    pub dependencies: DependenciesConfig,
}

impl ProcessSettings {
    /// Dependencies detected from the source and installed for this process only
    pub fn auto_detected_dependencies() -> Self {
        Self {
            dependencies: DependenciesConfig {
                scoped_to_process: true,
                auto_detect: true,
            },
        }
    }
}

/// Body of `POST /processes`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreateProcessInput {
    pub name: String,
    pub script: CreateScriptInput,
    /// Explicit dependency manifest; when present `settings` is omitted
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub manifest: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub settings: Option<ProcessSettings>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_create_input_wire_shape() {
        let input = CreateProcessInput {
            name: "yepcode-run-abc".to_string(),
            script: CreateScriptInput {
                programming_language: "PYTHON".to_string(),
                source_code: "print(1)".to_string(),
            },
            manifest: None,
            settings: Some(ProcessSettings::auto_detected_dependencies()),
        };

        assert_eq!(
            serde_json::to_value(&input).unwrap(),
            json!({
                "name": "yepcode-run-abc",
                "script": {"programmingLanguage": "PYTHON", "sourceCode": "print(1)"},
                "settings": {"dependencies": {"scopedToProcess": true, "autoDetect": true}}
            })
        );
    }
}
