// REST adapter: RemoteService + TeamVariables over reqwest

use crate::config::{ApiConfig, ResolvedConfig};
use crate::error::map_reqwest_error;
use async_trait::async_trait;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use reqwest::{Client, Method, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::RwLock;
use tracing::{debug, info};
use yepcode_core::domain::{
    CreateProcessInput, CreateVariableInput, ExecuteOptions, Execution, ExecutionRef,
    ExecutionSettings, LogEntry, Page, Process, TeamVariable, UpdateVariableInput,
};
use yepcode_core::error::{AppError, Result};
use yepcode_core::port::{RemoteService, TeamVariables};

const INITIATED_BY_HEADER: &str = "Yep-Initiated-By";

/// One REST call, replayable after re-authentication
struct ApiRequest {
    method: Method,
    endpoint: String,
    body: Option<Value>,
    query: Vec<(&'static str, String)>,
    headers: Vec<(&'static str, String)>,
}

impl ApiRequest {
    fn new(method: Method, endpoint: impl Into<String>) -> Self {
        Self {
            method,
            endpoint: endpoint.into(),
            body: None,
            query: Vec::new(),
            headers: Vec::new(),
        }
    }

    fn json(mut self, body: &impl Serialize) -> Result<Self> {
        self.body = Some(serde_json::to_value(body)?);
        Ok(self)
    }

    fn page(mut self, page: u32, limit: u32) -> Self {
        self.query.push(("page", page.to_string()));
        self.query.push(("limit", limit.to_string()));
        self
    }

    fn header(mut self, name: &'static str, value: impl Into<String>) -> Self {
        self.headers.push((name, value.into()));
        self
    }
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: Option<String>,
}

#[derive(Deserialize)]
struct ErrorBody {
    message: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ExecuteBody<'a> {
    /// The platform expects the parameters JSON-encoded as a string
    parameters: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    tag: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    comment: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    settings: Option<&'a ExecutionSettings>,
}

/// Authenticated client of the platform REST API
///
/// Tokens are obtained lazily with the client-credentials grant and
/// refreshed once when a request comes back 401.
pub struct YepCodeApi {
    client: Client,
    config: ResolvedConfig,
    access_token: RwLock<Option<String>>,
}

impl std::fmt::Debug for YepCodeApi {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("YepCodeApi")
            .field("api_host", &self.config.api_host)
            .field("team_id", &self.config.team_id)
            .finish()
    }
}

impl YepCodeApi {
    pub fn new(config: ResolvedConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(map_reqwest_error)?;
        let access_token = RwLock::new(config.access_token.clone());

        Ok(Self {
            client,
            config,
            access_token,
        })
    }

    pub fn from_config(config: &ApiConfig) -> Result<Self> {
        Self::new(config.resolve()?)
    }

    pub fn team_id(&self) -> &str {
        &self.config.team_id
    }

    pub fn client_id(&self) -> Option<&str> {
        self.config.client_id.as_deref()
    }

    async fn current_token(&self) -> Result<String> {
        if let Some(token) = self.access_token.read().await.clone() {
            return Ok(token);
        }
        self.authenticate().await
    }

    /// Client-credentials grant against the auth server
    async fn authenticate(&self) -> Result<String> {
        let (Some(client_id), Some(client_secret)) =
            (&self.config.client_id, &self.config.client_secret)
        else {
            return Err(AppError::Config(
                "Authentication failed: no client credentials configured".to_string(),
            ));
        };

        debug!(auth_url = %self.config.auth_url, "Requesting access token");
        let response = self
            .client
            .post(&self.config.auth_url)
            .basic_auth(client_id, Some(client_secret))
            .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body("grant_type=client_credentials")
            .send()
            .await
            .map_err(map_reqwest_error)?;

        let status = response.status();
        if !status.is_success() {
            return Err(AppError::transport(
                Some(status.as_u16()),
                format!("Authentication failed: HTTP error! status: {}", status.as_u16()),
            ));
        }

        let token = response
            .json::<TokenResponse>()
            .await
            .map_err(map_reqwest_error)?
            .access_token
            .ok_or_else(|| {
                AppError::Config(
                    "Authentication failed: No access token received from server".to_string(),
                )
            })?;

        *self.access_token.write().await = Some(token.clone());
        info!(team_id = %self.config.team_id, "Authenticated");
        Ok(token)
    }

    async fn send(&self, request: &ApiRequest) -> Result<Response> {
        let mut token = self.current_token().await?;
        let mut reauthenticated = false;

        loop {
            let url = format!("{}{}", self.config.base_url(), request.endpoint);
            let mut builder = self
                .client
                .request(request.method.clone(), &url)
                .header(AUTHORIZATION, format!("Bearer {}", token))
                .header(CONTENT_TYPE, "application/json");
            if !request.query.is_empty() {
                builder = builder.query(&request.query);
            }
            for (name, value) in &request.headers {
                builder = builder.header(*name, value);
            }
            if let Some(body) = &request.body {
                builder = builder.body(body.to_string());
            }

            let response = builder.send().await.map_err(map_reqwest_error)?;

            if response.status() == StatusCode::UNAUTHORIZED
                && !reauthenticated
                && self.config.can_authenticate()
            {
                debug!(endpoint = %request.endpoint, "Access token rejected, re-authenticating");
                token = self.authenticate().await?;
                reauthenticated = true;
                continue;
            }

            return check_status(request, response).await;
        }
    }

    async fn call<T: DeserializeOwned>(&self, request: ApiRequest) -> Result<T> {
        let response = self.send(&request).await?;
        let text = response.text().await.map_err(map_reqwest_error)?;
        Ok(serde_json::from_str(&text)?)
    }

    async fn call_empty(&self, request: ApiRequest) -> Result<()> {
        self.send(&request).await?;
        Ok(())
    }
}

/// Map non-2xx responses: 404 to NotFound, anything else to Transport
async fn check_status(request: &ApiRequest, response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let reason = status.canonical_reason().unwrap_or_default().to_string();
    let detail = response
        .json::<ErrorBody>()
        .await
        .ok()
        .and_then(|body| body.message)
        .unwrap_or(reason);
    let message = format!(
        "HTTP error {} in endpoint {} {}: {}",
        status.as_u16(),
        request.method,
        request.endpoint,
        detail
    );

    if status == StatusCode::NOT_FOUND {
        Err(AppError::NotFound(message))
    } else {
        Err(AppError::transport(Some(status.as_u16()), message))
    }
}

#[async_trait]
impl RemoteService for YepCodeApi {
    async fn get_process(&self, id_or_slug: &str) -> Result<Process> {
        self.call(ApiRequest::new(Method::GET, format!("/processes/{}", id_or_slug)))
            .await
    }

    async fn create_process(&self, input: CreateProcessInput) -> Result<Process> {
        self.call(ApiRequest::new(Method::POST, "/processes").json(&input)?)
            .await
    }

    async fn delete_process(&self, id_or_slug: &str) -> Result<()> {
        self.call_empty(ApiRequest::new(
            Method::DELETE,
            format!("/processes/{}", id_or_slug),
        ))
        .await
    }

    async fn execute_async(
        &self,
        id_or_slug: &str,
        parameters: Value,
        options: ExecuteOptions,
    ) -> Result<ExecutionRef> {
        let body = ExecuteBody {
            parameters: serde_json::to_string(&parameters)?,
            tag: options.tag.as_deref(),
            comment: options.comment.as_deref(),
            settings: options.settings.as_ref(),
        };
        let mut request =
            ApiRequest::new(Method::POST, format!("/processes/{}/execute", id_or_slug))
                .json(&body)?;
        if let Some(initiated_by) = options.initiated_by {
            request = request.header(INITIATED_BY_HEADER, initiated_by);
        }
        self.call(request).await
    }

    async fn get_execution(&self, execution_id: &str) -> Result<Execution> {
        self.call(ApiRequest::new(
            Method::GET,
            format!("/executions/{}", execution_id),
        ))
        .await
    }

    async fn get_execution_logs(
        &self,
        execution_id: &str,
        page: u32,
        limit: u32,
    ) -> Result<Page<LogEntry>> {
        self.call(
            ApiRequest::new(Method::GET, format!("/executions/{}/logs", execution_id))
                .page(page, limit),
        )
        .await
    }

    async fn kill_execution(&self, execution_id: &str) -> Result<()> {
        self.call_empty(ApiRequest::new(
            Method::PUT,
            format!("/executions/{}/kill", execution_id),
        ))
        .await
    }

    async fn rerun_execution(&self, execution_id: &str) -> Result<ExecutionRef> {
        self.call(ApiRequest::new(
            Method::POST,
            format!("/executions/{}/rerun", execution_id),
        ))
        .await
    }
}

#[async_trait]
impl TeamVariables for YepCodeApi {
    async fn list_variables(&self, page: u32, limit: u32) -> Result<Page<TeamVariable>> {
        self.call(ApiRequest::new(Method::GET, "/variables").page(page, limit))
            .await
    }

    async fn create_variable(&self, input: CreateVariableInput) -> Result<TeamVariable> {
        self.call(ApiRequest::new(Method::POST, "/variables").json(&input)?)
            .await
    }

    async fn update_variable(&self, id: &str, input: UpdateVariableInput) -> Result<TeamVariable> {
        self.call(ApiRequest::new(Method::PATCH, format!("/variables/{}", id)).json(&input)?)
            .await
    }

    async fn delete_variable(&self, id: &str) -> Result<()> {
        self.call_empty(ApiRequest::new(Method::DELETE, format!("/variables/{}", id)))
            .await
    }
}
