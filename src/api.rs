// API client module: the blocking HTTP layer every command goes through.
// It attaches the current auth headers, spots expired sessions, captures
// the credentials the server rotates on each response and decodes the
// JSON body.

use crate::config::{self, ConfigError, Credentials};
use crate::session::Session;
use reqwest::blocking::{Client, Response};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, ACCEPT, ACCEPT_ENCODING, CONTENT_TYPE};
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;
use url::Url;

/// Request payload: JSON object keys to arbitrary JSON values.
pub type Payload = serde_json::Map<String, Value>;

/// Header telling the server which key casing to use in its JSON.
pub const KEY_INFLECTION_HEADER: &str = "x-key-inflection";

/// Everything that can go wrong while talking to the API.
#[derive(Error, Debug)]
pub enum ApiError {
    /// The server answered 401 without a body: the stored session is stale.
    #[error("Session expired, please log in again")]
    ReauthRequired,

    #[error("Request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid URL: {0}")]
    Url(#[from] url::ParseError),

    #[error("Could not store credentials: {0}")]
    Config(#[from] ConfigError),
}

impl ApiError {
    pub fn is_reauth(&self) -> bool {
        matches!(self, ApiError::ReauthRequired)
    }
}

/// Error envelope returned by the server as `{ "success": false, "errors": [...] }`.
#[derive(Error, Deserialize, Debug, Clone, PartialEq, Eq)]
#[error("{}", .errors.join(", "))]
pub struct BusinessError {
    #[serde(default)]
    pub errors: Vec<String>,
}

/// Decoded response body. A body whose `success` field is `false` is a
/// business failure, anything else is the expected shape.
#[derive(Debug, Clone, PartialEq)]
pub enum ApiResponse<T> {
    Success(T),
    Failure(BusinessError),
}

impl<T> ApiResponse<T> {
    pub fn is_success(&self) -> bool {
        matches!(self, ApiResponse::Success(_))
    }

    pub fn into_result(self) -> Result<T, BusinessError> {
        match self {
            ApiResponse::Success(value) => Ok(value),
            ApiResponse::Failure(err) => Err(err),
        }
    }
}

/// Holds the reqwest blocking client, the API origin and the shared
/// session. Hand out one [`Resource`] per endpoint with [`ApiClient::resource`].
#[derive(Clone, Debug)]
pub struct ApiClient {
    client: Client,
    base_url: String,
    session: Session,
}

impl ApiClient {
    /// Create a client for `base_url` (no trailing slash expected).
    pub fn new(base_url: impl Into<String>, session: Session) -> Result<Self, ApiError> {
        let base_url = base_url.into();
        let client = Client::builder().build()?;
        tracing::debug!(base_url = %base_url, "creating API client");
        Ok(ApiClient {
            client,
            base_url,
            session,
        })
    }

    /// Create a client for the origin configured by `LABOR_API_URL`.
    pub fn from_env(session: Session) -> Result<Self, ApiError> {
        Self::new(config::api_root(), session)
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Bind a resource path. The current credentials are read once, here;
    /// create a new resource to pick up credentials rotated afterwards.
    pub fn resource(&self, path: &str) -> Resource<'_> {
        Resource {
            api: self,
            path: normalize_path(path).to_string(),
            headers: request_headers(&self.session.credentials()),
        }
    }
}

/// One endpoint of the API with the headers captured at creation time.
#[derive(Debug)]
pub struct Resource<'a> {
    api: &'a ApiClient,
    path: String,
    headers: HeaderMap,
}

impl Resource<'_> {
    /// Headers that will be sent with every call on this resource.
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    fn url(&self) -> Result<Url, ApiError> {
        Ok(Url::parse(&format!("{}/{}", self.api.base_url, self.path))?)
    }

    /// GET the resource, with `payload` encoded in the query string.
    pub fn get<T: DeserializeOwned>(
        &self,
        payload: Option<&Payload>,
    ) -> Result<ApiResponse<T>, ApiError> {
        let mut url = self.url()?;
        url.set_query(Some(&query_string(payload.unwrap_or(&Payload::new()))));

        tracing::debug!(method = "GET", url = %url, "sending request");
        let res = self
            .api
            .client
            .get(url)
            .headers(self.headers.clone())
            .send()?;
        handle_response(res, &self.api.session)
    }

    /// POST `payload` (an empty object when absent) as the JSON body.
    pub fn post<T: DeserializeOwned>(
        &self,
        payload: Option<&Payload>,
    ) -> Result<ApiResponse<T>, ApiError> {
        let url = self.url()?;
        let body = serde_json::to_vec(payload.unwrap_or(&Payload::new()))?;

        tracing::debug!(method = "POST", url = %url, "sending request");
        let res = self
            .api
            .client
            .post(url)
            .headers(self.headers.clone())
            .body(body)
            .send()?;
        handle_response(res, &self.api.session)
    }
}

/// Strip one leading `/` so `/tasks` and `tasks` hit the same URL.
pub fn normalize_path(path: &str) -> &str {
    path.strip_prefix('/').unwrap_or(path)
}

/// `key=<json value>` pairs joined by `&`. Values are JSON-encoded, so
/// strings show up quoted.
pub fn query_string(payload: &Payload) -> String {
    payload
        .iter()
        .map(|(key, value)| format!("{}={}", key, value))
        .collect::<Vec<_>>()
        .join("&")
}

fn request_headers(credentials: &Credentials) -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(
        CONTENT_TYPE,
        HeaderValue::from_static("application/json;charset=UTF-8"),
    );
    headers.insert(
        ACCEPT,
        HeaderValue::from_static("application/json, text/plain, */*"),
    );
    headers.insert(ACCEPT_ENCODING, HeaderValue::from_static("deflate, br"));
    headers.insert(
        HeaderName::from_static(KEY_INFLECTION_HEADER),
        HeaderValue::from_static("camel"),
    );

    for (name, value) in credentials.header_pairs() {
        if value.is_empty() {
            continue;
        }
        match HeaderValue::from_bytes(value.as_bytes()) {
            Ok(value) => {
                headers.insert(HeaderName::from_static(name), value);
            }
            Err(_) => tracing::warn!(header = name, "stored credential is not a valid header value"),
        }
    }
    headers
}

/// A 401 with an empty body means the session must be renewed. A 401 that
/// carries a body is an ordinary error response.
pub fn is_reauth_required(status: StatusCode, body: &[u8]) -> bool {
    !status.is_success() && body.is_empty() && status == StatusCode::UNAUTHORIZED
}

/// Credentials rotated by the server. Missing headers read as empty
/// strings; `None` when the response carries none of them at all.
/// Values are taken byte for byte, so a non-ASCII `uid` survives.
pub fn rotated_credentials(headers: &HeaderMap) -> Option<Credentials> {
    let names = ["token-type", "access-token", "client", "uid"];
    if !names.iter().any(|name| headers.contains_key(*name)) {
        return None;
    }
    let read = |name: &str| {
        headers
            .get(name)
            .map(|v| String::from_utf8_lossy(v.as_bytes()).into_owned())
            .unwrap_or_default()
    };
    Some(Credentials {
        token_type: read("token-type"),
        access_token: read("access-token"),
        client: read("client"),
        uid: read("uid"),
    })
}

/// Decode a response body into the success shape or the error envelope.
pub fn decode<T: DeserializeOwned>(body: &[u8]) -> Result<ApiResponse<T>, ApiError> {
    let value: Value = serde_json::from_slice(body)?;
    if value.get("success") == Some(&Value::Bool(false)) {
        return Ok(ApiResponse::Failure(serde_json::from_value(value)?));
    }
    Ok(ApiResponse::Success(serde_json::from_value(value)?))
}

fn handle_response<T: DeserializeOwned>(
    res: Response,
    session: &Session,
) -> Result<ApiResponse<T>, ApiError> {
    let status = res.status();
    let rotated = rotated_credentials(res.headers());
    let body = res.bytes()?;

    if is_reauth_required(status, &body) {
        tracing::warn!(%status, "server rejected the stored session");
        return Err(ApiError::ReauthRequired);
    }

    match rotated {
        Some(credentials) => {
            tracing::debug!(%status, "storing rotated credentials");
            session.rotate(credentials)?;
        }
        None => tracing::debug!(%status, "no rotation headers, keeping credentials"),
    }

    decode(&body)
}
