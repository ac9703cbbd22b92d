//! The single chokepoint for talking to the backend.

use crate::{
    navigator::Navigator, routes::LOGIN_PATH, Config, SessionStore,
    DEFAULT_USER_AGENT,
};
use reqwest::{
    header::{HeaderMap, HeaderValue, CONTENT_TYPE},
    Client, Method, RequestBuilder, Response, StatusCode,
};
use serde::{de::DeserializeOwned, Serialize};
use serde_derive::Deserialize;
use std::{fmt::Debug, sync::Arc};
use url::Url;

/// An HTTP client which attaches the session's bearer token to every
/// request and ends the session whenever the backend answers `401`.
#[derive(Clone)]
pub struct ApiClient {
    http: Client,
    base_url: Url,
    session: Arc<SessionStore>,
    navigator: Arc<dyn Navigator>,
}

impl ApiClient {
    pub fn new(
        config: &Config,
        session: Arc<SessionStore>,
        navigator: Arc<dyn Navigator>,
    ) -> Result<Self, ApiError> {
        let mut headers = HeaderMap::new();
        headers
            .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let http = Client::builder()
            .user_agent(DEFAULT_USER_AGENT)
            .default_headers(headers)
            .timeout(config.timeout)
            .build()?;

        Ok(ApiClient {
            http,
            base_url: config.base_url.clone(),
            session,
            navigator,
        })
    }

    pub fn session(&self) -> &Arc<SessionStore> { &self.session }

    pub fn base_url(&self) -> &Url { &self.base_url }

    /// Work out the full URL for an endpoint path like `/skills/3`.
    pub fn url(&self, path: &str) -> Result<Url, ApiError> {
        let raw = format!(
            "{}/{}",
            self.base_url.as_str().trim_end_matches('/'),
            path.trim_start_matches('/')
        );

        Url::parse(&raw).map_err(|inner| ApiError::BadUrl { url: raw, inner })
    }

    pub(crate) fn request(&self, method: Method, url: Url) -> RequestBuilder {
        self.http.request(method, url)
    }

    /// Send a request through the interceptors.
    ///
    /// The current token (if any) is attached as a bearer credential. A `401`
    /// response logs the user out and sends them to the login view, no matter
    /// which endpoint was called, before being reported as
    /// [`ApiError::Unauthorized`]. Any other non-success status is returned
    /// as [`ApiError::Status`].
    pub(crate) async fn send(
        &self,
        request: RequestBuilder,
    ) -> Result<Response, ApiError> {
        let request = match self.session.token() {
            Some(token) => request.bearer_auth(token),
            None => request,
        };
        let request = request.build()?;

        log::debug!("Sending {} {}", request.method(), request.url());
        let response = self.http.execute(request).await?;
        log::trace!("Headers: {:#?}", response.headers());

        let status = response.status();

        if status == StatusCode::UNAUTHORIZED {
            log::warn!("The backend rejected our credentials, logging out");
            self.session.logout();
            self.navigator.navigate(LOGIN_PATH);

            let message = error_body(response).await;
            return Err(ApiError::Unauthorized { message });
        }

        if !status.is_success() {
            let message = error_body(response).await;
            return Err(ApiError::Status { status, message });
        }

        Ok(response)
    }

    pub(crate) async fn get<T>(&self, path: &str) -> Result<T, ApiError>
    where
        T: DeserializeOwned,
    {
        let url = self.url(path)?;
        self.get_url(url).await
    }

    pub(crate) async fn get_url<T>(&self, url: Url) -> Result<T, ApiError>
    where
        T: DeserializeOwned,
    {
        let response = self.send(self.request(Method::GET, url)).await?;
        read_json(response).await
    }

    /// Send a JSON body and throw away whatever comes back.
    pub(crate) async fn send_json<D>(
        &self,
        method: Method,
        path: &str,
        data: &D,
    ) -> Result<Response, ApiError>
    where
        D: Debug + Serialize,
    {
        log::trace!("Payload: {:#?}", data);
        let request = self.request(method, self.url(path)?).json(data);
        self.send(request).await
    }

    pub(crate) async fn delete(&self, path: &str) -> Result<(), ApiError> {
        self.send(self.request(Method::DELETE, self.url(path)?))
            .await?;
        Ok(())
    }
}

impl Debug for ApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiClient")
            .field("base_url", &self.base_url.as_str())
            .field("session", &self.session)
            .finish()
    }
}

pub(crate) async fn read_json<T>(response: Response) -> Result<T, ApiError>
where
    T: DeserializeOwned,
{
    let body = response.bytes().await?;
    log::trace!("Response: {}", String::from_utf8_lossy(&body));

    serde_json::from_slice(&body).map_err(ApiError::Decode)
}

const SESSION_EXPIRED: &str = "Your session has expired, please log in again";

#[derive(Deserialize)]
struct ErrorBody {
    message: Option<String>,
}

fn describe_status(status: &StatusCode, message: &Option<String>) -> String {
    match message {
        Some(message) => message.clone(),
        None => status
            .canonical_reason()
            .unwrap_or("Request failed")
            .to_string(),
    }
}

async fn error_body(response: Response) -> Option<String> {
    let body = response.text().await.unwrap_or_default();
    log::trace!("Error body: {}", body);

    error_message(&body)
}

fn error_message(body: &str) -> Option<String> {
    serde_json::from_str::<ErrorBody>(body)
        .ok()
        .and_then(|b| b.message)
        .filter(|m| !m.is_empty())
}

/// Things that can go wrong when calling the backend.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// The HTTP client encountered an error (connection failure, timeout,
    /// etc.).
    #[error("Unable to send the request")]
    HttpClient(#[from] reqwest::Error),
    /// The backend didn't accept our credentials. The session has already
    /// been cleared by the time you see this.
    #[error("{}", .message.as_deref().unwrap_or(SESSION_EXPIRED))]
    Unauthorized { message: Option<String> },
    /// Any other unsuccessful status.
    #[error("{}", describe_status(.status, .message))]
    Status {
        status: StatusCode,
        message: Option<String>,
    },
    #[error("Unable to parse the response")]
    Decode(#[source] serde_json::Error),
    #[error("\"{}\" is not a valid URL", url)]
    BadUrl {
        url: String,
        #[source]
        inner: url::ParseError,
    },
}

impl ApiError {
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, ApiError::Unauthorized { .. })
    }

    pub fn status(&self) -> Option<StatusCode> {
        match self {
            ApiError::Unauthorized { .. } => Some(StatusCode::UNAUTHORIZED),
            ApiError::Status { status, .. } => Some(*status),
            ApiError::HttpClient(e) => e.status(),
            _ => None,
        }
    }

    /// The message the backend sent along with an error, if any.
    pub fn server_message(&self) -> Option<&str> {
        match self {
            ApiError::Unauthorized { message }
            | ApiError::Status { message, .. } => message.as_deref(),
            _ => None,
        }
    }
}
