//! HTTP client for the Lacework v2 API
//! Handles token authentication, status mapping, and paginated searches

use crate::config::Credentials;
use crate::error_handling::{ErrorContext, ReportError, ReportResult};
use crate::models::{RawAlert, RawEvent, ResourceGroup, SearchPage, TimeWindow};
use crate::source::{DataSource, PageStream};
use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use regex::Regex;
use reqwest::header::RETRY_AFTER;
use reqwest::{Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use std::time::Duration;
use tracing::{debug, warn};

/// Lifetime requested for access tokens, in seconds
pub const TOKEN_EXPIRY_SECS: u64 = 3600;

/// Client identifier used when the user profile cannot be read
pub const UNKNOWN_CLIENT: &str = "not-found";

const ACCESS_TOKEN_PATH: &str = "/api/v2/access/tokens";
const RESOURCE_GROUPS_PATH: &str = "/api/v2/ResourceGroups";
const ALERTS_SEARCH_PATH: &str = "/api/v2/Alerts/search";
const EVENTS_SEARCH_PATH: &str = "/api/v2/Events/search";
const USER_PROFILE_PATH: &str = "/api/v2/UserProfile";

const REQUEST_TIMEOUT_SECS: u64 = 120;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AccessToken {
    token: String,
    #[serde(default)]
    expires_at: Option<String>,
}

#[derive(Debug, Deserialize)]
struct UserProfile {
    #[serde(default)]
    url: Option<String>,
}

/// Where the next page of a search comes from
enum Cursor {
    First { url: String, body: Value },
    Next(String),
    Done,
}

/// Authenticated Lacework API client
pub struct LaceworkClient {
    client: Client,
    base_url: String,
    token: String,
    subaccount: Option<String>,
}

impl LaceworkClient {
    /// Authenticate against the account's API host
    pub async fn connect(credentials: &Credentials) -> ReportResult<Self> {
        Self::connect_to(&credentials.base_url(), credentials).await
    }

    /// Authenticate against an explicit base URL
    pub async fn connect_to(base_url: &str, credentials: &Credentials) -> ReportResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .gzip(true)
            .build()
            .with_context(|| "Failed to create HTTP client".to_string())?;

        let base_url = base_url.trim_end_matches('/').to_string();
        debug!("Requesting access token from {}", base_url);

        let response = client
            .post(format!("{}{}", base_url, ACCESS_TOKEN_PATH))
            .header("X-LW-UAKS", &credentials.api_secret)
            .json(&json!({ "keyId": credentials.api_key, "expiryTime": TOKEN_EXPIRY_SECS }))
            .send()
            .await
            .with_network_context(|| format!("Failed to reach {}", base_url))?;

        let token: AccessToken = decode(check_status(response).await?).await?;
        debug!(
            "Access token acquired, expires at {}",
            token.expires_at.as_deref().unwrap_or("<unknown>")
        );

        Ok(Self {
            client,
            base_url,
            token: token.token,
            subaccount: credentials.subaccount.clone(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        let request = request
            .bearer_auth(&self.token)
            .header("Content-Type", "application/json");

        match &self.subaccount {
            Some(subaccount) => request.header("Account-Name", subaccount),
            None => request,
        }
    }

    async fn send<T: DeserializeOwned>(&self, request: RequestBuilder, what: &str) -> ReportResult<T> {
        let response = self
            .authorized(request)
            .send()
            .await
            .with_network_context(|| format!("Failed to send {} request", what))?;

        decode(check_status(response).await?).await
    }

    async fn fetch_page<T: DeserializeOwned>(
        &self,
        cursor: Cursor,
    ) -> ReportResult<Option<(Vec<T>, Cursor)>> {
        let page: SearchPage<T> = match cursor {
            Cursor::Done => return Ok(None),
            Cursor::First { url, body } => self.send(self.client.post(&url).json(&body), "search").await?,
            Cursor::Next(url) => self.send(self.client.get(&url), "next page").await?,
        };

        let next = match page.next_page() {
            Some(url) => Cursor::Next(url.to_string()),
            None => Cursor::Done,
        };

        Ok(Some((page.data, next)))
    }

    /// Lazily page through a search endpoint
    pub fn search_pages<T>(&self, path: &str, body: Value) -> PageStream<'_, T>
    where
        T: DeserializeOwned + Send + 'static,
    {
        let first = Cursor::First {
            url: self.url(path),
            body,
        };

        stream::try_unfold(first, move |cursor| self.fetch_page::<T>(cursor)).boxed()
    }

    pub async fn user_profile_url(&self) -> ReportResult<Option<String>> {
        let page: SearchPage<UserProfile> = self
            .send(self.client.get(self.url(USER_PROFILE_PATH)), "user profile")
            .await?;
        Ok(page.data.into_iter().next().and_then(|profile| profile.url))
    }
}

#[async_trait]
impl DataSource for LaceworkClient {
    async fn list_resource_groups(&self) -> ReportResult<Vec<ResourceGroup>> {
        let page: SearchPage<ResourceGroup> = self
            .send(self.client.get(self.url(RESOURCE_GROUPS_PATH)), "resource groups")
            .await?;
        debug!("Listed {} resource groups", page.data.len());
        Ok(page.data)
    }

    fn alert_pages(&self, window: &TimeWindow) -> PageStream<'_, RawAlert> {
        let body = json!({
            "timeFilter": window.time_filter(),
            "returns": ["alertId", "severity"],
        });
        self.search_pages(ALERTS_SEARCH_PATH, body)
    }

    fn event_pages(&self, window: &TimeWindow) -> PageStream<'_, RawEvent> {
        let body = json!({ "timeFilter": window.time_filter() });
        self.search_pages(EVENTS_SEARCH_PATH, body)
    }

    async fn client_identifier(&self) -> ReportResult<String> {
        match self.user_profile_url().await {
            Ok(Some(url)) => Ok(client_name_from_url(&url)),
            Ok(None) => Ok(UNKNOWN_CLIENT.to_string()),
            Err(e) => {
                warn!("Could not read user profile, naming report '{}': {}", UNKNOWN_CLIENT, e);
                Ok(UNKNOWN_CLIENT.to_string())
            }
        }
    }
}

/// Map a non-success status to the matching error kind
pub async fn check_status(response: Response) -> ReportResult<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let retry_after = response
        .headers()
        .get(RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse::<u64>().ok());

    let body = response
        .text()
        .await
        .unwrap_or_else(|_| "<unable to read body>".to_string());

    match status.as_u16() {
        401 | 403 => Err(ReportError::authentication(format!("{}: {}", status, body))),
        429 => Err(ReportError::rate_limit(body, retry_after)),
        code => Err(ReportError::upstream(code, body)),
    }
}

async fn decode<T: DeserializeOwned>(response: Response) -> ReportResult<T> {
    let url = response.url().to_string();
    let body = response
        .text()
        .await
        .with_network_context(|| format!("Failed to read response from {}", url))?;

    serde_json::from_str(&body).with_decode_context(|| format!("Unexpected response from {}", url))
}

/// Leading host label of a profile URL, e.g. `acme` for `acme.lacework.net`
pub fn client_name_from_url(url: &str) -> String {
    let host = url
        .trim_start_matches("https://")
        .trim_start_matches("http://");

    Regex::new(r"^([^.]+)")
        .ok()
        .and_then(|re| re.find(host).map(|m| m.as_str().to_string()))
        .filter(|name| !name.is_empty())
        .unwrap_or_else(|| UNKNOWN_CLIENT.to_string())
}
