//! HTTP client for the health-tracking service.
//!
//! Implements [`RemoteService`] over reqwest with JSON bodies. Failures are
//! normalized here: the auth endpoints surface the server's `detail`, every
//! other endpoint surfaces its generic message.

use async_trait::async_trait;
use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;
use url::Url;
use vitals_core::config::ApiConfig;
use vitals_core::error::VitalsError;
use vitals_core::remote::{messages, RemoteService};
use vitals_core::types::{
    HistorySeries, ImportRequest, LoginRequest, LoginResponse, Metric, Period, ProfileUpdate,
    ProfileUpdateResponse, RawStats, Registration, UserDetails, UserId,
};

/// How a non-success response is turned into a message.
#[derive(Debug, Clone, Copy)]
enum ErrorStyle {
    /// Use the `detail` field of the JSON body when there is one.
    Detail,
    /// Always use the operation's generic message.
    Generic,
}

/// FastAPI-style error body. `detail` is a string for handled errors and a
/// list of `{loc, msg, type}` objects for validation failures.
#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    detail: Option<Value>,
}

impl ErrorBody {
    fn message(&self) -> Option<String> {
        match self.detail.as_ref()? {
            Value::String(s) if !s.is_empty() => Some(s.clone()),
            Value::Array(items) => {
                let msgs: Vec<&str> = items
                    .iter()
                    .filter_map(|item| item.get("msg").and_then(|m| m.as_str()))
                    .collect();
                if msgs.is_empty() {
                    None
                } else {
                    Some(msgs.join("; "))
                }
            }
            _ => None,
        }
    }
}

pub struct HttpRemoteService {
    client: Client,
    base: Url,
}

impl HttpRemoteService {
    pub fn new(config: &ApiConfig) -> Result<Self, VitalsError> {
        let base = Url::parse(&config.base_url)
            .map_err(|e| VitalsError::Config(format!("Invalid base URL '{}': {}", config.base_url, e)))?;
        if base.cannot_be_a_base() {
            return Err(VitalsError::Config(format!(
                "Base URL '{}' cannot carry a path",
                config.base_url
            )));
        }
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(config.user_agent.as_str())
            .build()
            .map_err(|e| VitalsError::Config(format!("HTTP client: {}", e)))?;
        Ok(Self { client, base })
    }

    pub fn base_url(&self) -> &Url {
        &self.base
    }

    /// Base URL with `segments` appended as percent-encoded path segments.
    fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    async fn send(
        &self,
        request: reqwest::RequestBuilder,
        style: ErrorStyle,
        default: &str,
    ) -> Result<Response, VitalsError> {
        let response = request
            .send()
            .await
            .map_err(|e| VitalsError::Transport(e.to_string()))?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let message = match style {
            ErrorStyle::Detail => response
                .json::<ErrorBody>()
                .await
                .ok()
                .and_then(|body| body.message()),
            ErrorStyle::Generic => None,
        }
        .unwrap_or_else(|| default.to_string());

        tracing::debug!(status = status.as_u16(), "{}", message);
        Err(VitalsError::Remote {
            status: status.as_u16(),
            message,
        })
    }

    async fn decode<T: DeserializeOwned>(response: Response) -> Result<T, VitalsError> {
        response
            .json::<T>()
            .await
            .map_err(|e| VitalsError::Decode(e.to_string()))
    }
}

#[async_trait]
impl RemoteService for HttpRemoteService {
    async fn login(&self, request: &LoginRequest) -> Result<LoginResponse, VitalsError> {
        let req = self.client.post(self.endpoint(&["login"])).json(request);
        let response = self.send(req, ErrorStyle::Detail, messages::LOGIN_FAILED).await?;
        Self::decode(response).await
    }

    async fn register(&self, registration: &Registration) -> Result<(), VitalsError> {
        let req = self
            .client
            .post(self.endpoint(&["register"]))
            .json(registration);
        self.send(req, ErrorStyle::Detail, messages::REGISTRATION_FAILED)
            .await?;
        Ok(())
    }

    async fn logout(&self) -> Result<(), VitalsError> {
        let req = self.client.post(self.endpoint(&["logout"]));
        self.send(req, ErrorStyle::Detail, messages::LOGOUT_FAILED)
            .await?;
        Ok(())
    }

    async fn user_details(&self, user_id: &UserId) -> Result<UserDetails, VitalsError> {
        let req = self.client.get(self.endpoint(&["users", user_id.as_str()]));
        let response = self
            .send(req, ErrorStyle::Generic, messages::USER_DETAILS_FAILED)
            .await?;
        Self::decode(response).await
    }

    async fn current_stats(&self, user_id: &UserId) -> Result<RawStats, VitalsError> {
        let req = self
            .client
            .get(self.endpoint(&["dashboard", user_id.as_str(), "current"]));
        let response = self
            .send(req, ErrorStyle::Generic, messages::CURRENT_STATS_FAILED)
            .await?;
        Self::decode(response).await
    }

    async fn history(
        &self,
        user_id: &UserId,
        metric: Metric,
        period: Period,
    ) -> Result<HistorySeries, VitalsError> {
        let req = self
            .client
            .get(self.endpoint(&["dashboard", user_id.as_str(), "history"]))
            .query(&[("metric", metric.as_str()), ("period", period.as_str())]);
        let response = self
            .send(req, ErrorStyle::Generic, messages::HISTORY_FAILED)
            .await?;
        Self::decode(response).await
    }

    async fn import_data(
        &self,
        user_id: &UserId,
        request: &ImportRequest,
    ) -> Result<(), VitalsError> {
        let req = self
            .client
            .post(self.endpoint(&["users", user_id.as_str(), "import"]))
            .json(request);
        self.send(req, ErrorStyle::Generic, messages::IMPORT_FAILED)
            .await?;
        Ok(())
    }

    async fn update_profile(
        &self,
        user_id: &UserId,
        update: &ProfileUpdate,
    ) -> Result<ProfileUpdateResponse, VitalsError> {
        let req = self
            .client
            .put(self.endpoint(&["users", user_id.as_str()]))
            .json(update);
        let response = self
            .send(req, ErrorStyle::Generic, messages::PROFILE_UPDATE_FAILED)
            .await?;
        Self::decode(response).await
    }
}
