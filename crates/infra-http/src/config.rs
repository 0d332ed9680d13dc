// API configuration: environment loading, merging and credential resolution

use crate::error::map_config_error;
use ::config::{Config, Environment};
use base64::alphabet;
use base64::engine::general_purpose::{GeneralPurpose, GeneralPurposeConfig};
use base64::engine::DecodePaddingMode;
use base64::Engine;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::time::Duration;
use tracing::debug;
use yepcode_core::error::{AppError, Result};

pub const DEFAULT_API_HOST: &str = "https://cloud.yepcode.io";
pub const ENV_PREFIX: &str = "YEPCODE";
const DEFAULT_TIMEOUT_MS: u64 = 60_000;
const AUTH_PATH: &str = "/auth/realms/yepcode/protocol/openid-connect/token";

const LENIENT_PADDING: GeneralPurposeConfig =
    GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent);
const TOKEN_BASE64: GeneralPurpose = GeneralPurpose::new(&alphabet::STANDARD, LENIENT_PADDING);
const JWT_BASE64: GeneralPurpose = GeneralPurpose::new(&alphabet::URL_SAFE, LENIENT_PADDING);

static SERVICE_ACCOUNT_ID: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^sa-(.*)-[a-z0-9]{8}$").expect("static pattern"));

/// User-facing configuration; every field is optional
///
/// Sources, lowest precedence first: `YEPCODE_*` environment variables
/// (after loading `.env`), then fields set explicitly by the caller.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_host: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_secret: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auth_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub team_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_ms: Option<u64>,
}

impl ApiConfig {
    /// Read `YEPCODE_*` variables, loading `.env` first when present
    pub fn from_env() -> Result<Self> {
        if let Ok(path) = dotenv::dotenv() {
            debug!(path = %path.display(), "Loaded .env file");
        }
        Self::from_environment(
            Environment::with_prefix(ENV_PREFIX)
                .try_parsing(true)
                .ignore_empty(true),
        )
    }

    /// Read configuration from an explicit environment source
    pub fn from_environment(source: Environment) -> Result<Self> {
        Config::builder()
            .add_source(source)
            .build()
            .and_then(|c| c.try_deserialize())
            .map_err(map_config_error)
    }

    /// Fields set in `overrides` win
    pub fn merge(self, overrides: ApiConfig) -> Self {
        Self {
            api_host: overrides.api_host.or(self.api_host),
            api_token: overrides.api_token.or(self.api_token),
            client_id: overrides.client_id.or(self.client_id),
            client_secret: overrides.client_secret.or(self.client_secret),
            access_token: overrides.access_token.or(self.access_token),
            auth_url: overrides.auth_url.or(self.auth_url),
            team_id: overrides.team_id.or(self.team_id),
            timeout_ms: overrides.timeout_ms.or(self.timeout_ms),
        }
    }

    /// Stable identity of this configuration (sha256 over its sorted JSON form)
    pub fn cache_key(&self) -> String {
        // serde_json::Map is a BTreeMap, so keys come out sorted
        let sorted = serde_json::to_value(self)
            .map(|v| v.to_string())
            .unwrap_or_default();
        hex::encode(Sha256::digest(sorted.as_bytes()))
    }

    /// Validate credentials and derive everything the HTTP client needs
    pub fn resolve(&self) -> Result<ResolvedConfig> {
        let api_host = self
            .api_host
            .as_deref()
            .unwrap_or(DEFAULT_API_HOST)
            .trim_end_matches('/')
            .to_string();
        let auth_url = self
            .auth_url
            .clone()
            .unwrap_or_else(|| format!("{}{}", api_host, AUTH_PATH));

        let has_client_pair = self.client_id.is_some() && self.client_secret.is_some();
        if self.access_token.is_none() && self.api_token.is_none() && !has_client_pair {
            return Err(AppError::Config(
                "Invalid configuration. Please provide either: accessToken, apiToken or clientId and clientSecret."
                    .to_string(),
            ));
        }

        let (client_id, client_secret) = match &self.api_token {
            Some(token) => {
                let (id, secret) = decode_api_token(token)?;
                (Some(id), Some(secret))
            }
            None => (self.client_id.clone(), self.client_secret.clone()),
        };

        let team_id = self
            .team_id
            .clone()
            .or_else(|| client_id.as_deref().and_then(team_id_from_client_id))
            .or_else(|| {
                self.access_token
                    .as_deref()
                    .and_then(team_id_from_access_token)
            })
            .ok_or_else(|| AppError::Config("Team ID is not set".to_string()))?;

        Ok(ResolvedConfig {
            api_host,
            auth_url,
            client_id,
            client_secret,
            access_token: self.access_token.clone(),
            team_id,
            timeout: Duration::from_millis(self.timeout_ms.unwrap_or(DEFAULT_TIMEOUT_MS)),
        })
    }
}

/// Validated configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedConfig {
    pub api_host: String,
    pub auth_url: String,
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
    pub access_token: Option<String>,
    pub team_id: String,
    pub timeout: Duration,
}

impl ResolvedConfig {
    pub fn base_url(&self) -> String {
        format!("{}/api/{}/rest", self.api_host, self.team_id)
    }

    pub fn can_authenticate(&self) -> bool {
        self.client_id.is_some() && self.client_secret.is_some()
    }
}

/// Split an api token into (client id, client secret)
///
/// Accepts `sk-` + base64("id:secret") and the legacy base64 JSON
/// `{"clientId", "clientSecret"}` form.
pub fn decode_api_token(token: &str) -> Result<(String, String)> {
    let invalid = || AppError::Config(format!("Invalid apiToken format: {}", token));

    if let Some(encoded) = token.strip_prefix("sk-") {
        let decoded = TOKEN_BASE64.decode(encoded).map_err(|_| invalid())?;
        let decoded = String::from_utf8(decoded).map_err(|_| invalid())?;
        let (id, secret) = decoded.split_once(':').ok_or_else(invalid)?;
        if id.is_empty() || secret.is_empty() {
            return Err(invalid());
        }
        return Ok((id.to_string(), secret.to_string()));
    }

    #[derive(Deserialize)]
    #[serde(rename_all = "camelCase")]
    struct LegacyToken {
        client_id: Option<String>,
        client_secret: Option<String>,
    }

    let decoded = TOKEN_BASE64.decode(token).map_err(|_| invalid())?;
    let legacy: LegacyToken = serde_json::from_slice(&decoded).map_err(|_| invalid())?;
    match (legacy.client_id, legacy.client_secret) {
        (Some(id), Some(secret)) if !id.is_empty() && !secret.is_empty() => Ok((id, secret)),
        _ => Err(invalid()),
    }
}

/// Service account ids embed the team: `sa-<team>-<8 chars>`
fn team_id_from_client_id(client_id: &str) -> Option<String> {
    SERVICE_ACCOUNT_ID
        .captures(client_id)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
}

/// First non-sandbox group of the JWT payload
fn team_id_from_access_token(access_token: &str) -> Option<String> {
    #[derive(Deserialize)]
    struct Claims {
        #[serde(default)]
        groups: Vec<String>,
    }

    let payload = access_token.split('.').nth(1)?;
    let decoded = JWT_BASE64.decode(payload).ok()?;
    let claims: Claims = serde_json::from_slice(&decoded).ok()?;
    claims.groups.into_iter().find(|g| g != "sandbox")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    const SK_TOKEN: &str = "sk-c2EtYWNtZS0xYTJiM2M0ZDpzM2NyZXQ=";
    const LEGACY_TOKEN: &str =
        "eyJjbGllbnRJZCI6InNhLWxlZ2FjeS1hYmNkZWYxMiIsImNsaWVudFNlY3JldCI6InB3In0=";
    const JWT: &str = "header.eyJncm91cHMiOlsic2FuZGJveCIsInRlYW0teCJdfQ.signature";

    #[test]
    fn test_decode_sk_token() {
        let (id, secret) = decode_api_token(SK_TOKEN).unwrap();
        assert_eq!(id, "sa-acme-1a2b3c4d");
        assert_eq!(secret, "s3cret");
    }

    #[test]
    fn test_decode_legacy_token() {
        let (id, secret) = decode_api_token(LEGACY_TOKEN).unwrap();
        assert_eq!(id, "sa-legacy-abcdef12");
        assert_eq!(secret, "pw");
    }

    #[test]
    fn test_malformed_tokens_are_config_errors() {
        // base64("no-colon")
        for token in ["sk-bm8tY29sb24=", "sk-!!!", "not base64 at all", "bm8tY29sb24="] {
            let err = decode_api_token(token).unwrap_err();
            assert!(
                matches!(err, AppError::Config(ref m) if m.starts_with("Invalid apiToken format")),
                "{} gave {:?}",
                token,
                err
            );
        }
    }

    #[test]
    fn test_resolve_from_api_token() {
        let config = ApiConfig {
            api_token: Some(SK_TOKEN.to_string()),
            ..ApiConfig::default()
        };
        let resolved = config.resolve().unwrap();

        assert_eq!(resolved.team_id, "acme");
        assert_eq!(resolved.client_id.as_deref(), Some("sa-acme-1a2b3c4d"));
        assert_eq!(resolved.api_host, DEFAULT_API_HOST);
        assert_eq!(
            resolved.auth_url,
            "https://cloud.yepcode.io/auth/realms/yepcode/protocol/openid-connect/token"
        );
        assert_eq!(resolved.timeout, Duration::from_millis(60_000));
        assert_eq!(
            resolved.base_url(),
            "https://cloud.yepcode.io/api/acme/rest"
        );
    }

    #[test]
    fn test_team_id_from_access_token_groups() {
        let config = ApiConfig {
            access_token: Some(JWT.to_string()),
            api_host: Some("http://localhost:8080/".to_string()),
            ..ApiConfig::default()
        };
        let resolved = config.resolve().unwrap();

        assert_eq!(resolved.team_id, "team-x");
        assert_eq!(resolved.api_host, "http://localhost:8080");
        assert!(!resolved.can_authenticate());
    }

    #[test]
    fn test_explicit_team_id_wins() {
        let config = ApiConfig {
            client_id: Some("sa-acme-1a2b3c4d".to_string()),
            client_secret: Some("x".to_string()),
            team_id: Some("other".to_string()),
            ..ApiConfig::default()
        };
        assert_eq!(config.resolve().unwrap().team_id, "other");
    }

    #[test]
    fn test_missing_credentials() {
        let err = ApiConfig::default().resolve().unwrap_err();
        assert!(err.to_string().contains("Invalid configuration"));

        let only_id = ApiConfig {
            client_id: Some("sa-acme-1a2b3c4d".to_string()),
            ..ApiConfig::default()
        };
        assert!(matches!(only_id.resolve(), Err(AppError::Config(_))));
    }

    #[test]
    fn test_unknown_team_is_config_error() {
        let config = ApiConfig {
            client_id: Some("plain-client".to_string()),
            client_secret: Some("x".to_string()),
            ..ApiConfig::default()
        };
        let err = config.resolve().unwrap_err();
        assert_eq!(err.to_string(), "Configuration error: Team ID is not set");
    }

    #[test]
    fn test_from_environment_source() {
        let mut vars = HashMap::new();
        vars.insert("YEPCODE_API_HOST".to_string(), "http://env-host".to_string());
        vars.insert("YEPCODE_TEAM_ID".to_string(), "env-team".to_string());
        vars.insert("YEPCODE_TIMEOUT_MS".to_string(), "1500".to_string());

        let config = ApiConfig::from_environment(
            Environment::with_prefix(ENV_PREFIX)
                .try_parsing(true)
                .source(Some(vars)),
        )
        .unwrap();

        assert_eq!(config.api_host.as_deref(), Some("http://env-host"));
        assert_eq!(config.team_id.as_deref(), Some("env-team"));
        assert_eq!(config.timeout_ms, Some(1500));
        assert_eq!(config.api_token, None);
    }

    #[test]
    fn test_merge_prefers_overrides() {
        let env = ApiConfig {
            api_host: Some("http://env".to_string()),
            team_id: Some("env-team".to_string()),
            ..ApiConfig::default()
        };
        let explicit = ApiConfig {
            team_id: Some("explicit".to_string()),
            ..ApiConfig::default()
        };

        let merged = env.merge(explicit);
        assert_eq!(merged.api_host.as_deref(), Some("http://env"));
        assert_eq!(merged.team_id.as_deref(), Some("explicit"));
    }

    #[test]
    fn test_cache_key_depends_on_content_only() {
        let a = ApiConfig {
            team_id: Some("t".to_string()),
            access_token: Some("x".to_string()),
            ..ApiConfig::default()
        };
        let b = a.clone();
        let c = ApiConfig {
            team_id: Some("u".to_string()),
            ..a.clone()
        };

        assert_eq!(a.cache_key(), b.cache_key());
        assert_ne!(a.cache_key(), c.cache_key());
        assert_eq!(a.cache_key().len(), 64);
    }
}
