//! HTTP access to the Ledgerly API with a shared bearer credential.

use reqwest::{Client, RequestBuilder, Response};
use serde::{Serialize, de::DeserializeOwned};
use serde_json::Value;
use shared::{config::client::with_trailing_slash, models::ErrorResponse};
use std::{
    sync::{Arc, Mutex},
    time::Duration,
};
use tracing::debug;
use url::Url;

use crate::{
    cache::{CacheOptions, ResponseCache},
    error::{ClientError, ClientResult},
};

const USER_AGENT: &str = concat!("ledgerly-client/", env!("CARGO_PKG_VERSION"));

/// HTTP client for the Ledgerly API.
///
/// Clones share the bearer credential and the response cache, so a token set
/// through one handle is attached by every other.
#[derive(Clone, Debug)]
pub struct ApiClient {
    base_url: Url,
    client: Client,
    bearer_token: Arc<Mutex<Option<String>>>,
    cache: Arc<ResponseCache>,
}

impl ApiClient {
    /// Create a client rooted at `base_url` with the given request timeout.
    ///
    /// # Errors
    /// Returns [`ClientError::Transport`] if the underlying HTTP client cannot be built.
    pub fn new(base_url: &Url, timeout: Duration) -> ClientResult<Self> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()?;
        Ok(Self::with_client(base_url, client))
    }

    /// Create a client around an existing [`reqwest::Client`].
    pub fn with_client(base_url: &Url, client: Client) -> Self {
        Self {
            base_url: with_trailing_slash(base_url.clone()),
            client,
            bearer_token: Arc::new(Mutex::new(None)),
            cache: Arc::new(ResponseCache::new()),
        }
    }

    #[must_use]
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Resolve an endpoint path against the API base.
    ///
    /// # Errors
    /// Returns [`ClientError::Endpoint`] when the path cannot be joined.
    pub fn api_url(&self, path: &str) -> ClientResult<Url> {
        self.base_url
            .join(path.trim_start_matches('/'))
            .map_err(|source| ClientError::Endpoint {
                path: path.to_string(),
                source,
            })
    }

    /// Set or remove the credential attached to every request.
    pub fn set_bearer_token(&self, token: Option<String>) {
        if let Ok(mut guard) = self.bearer_token.lock() {
            *guard = token;
        }
    }

    pub fn bearer_token(&self) -> Option<String> {
        self.bearer_token
            .lock()
            .ok()
            .and_then(|guard| guard.as_ref().cloned())
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match self.bearer_token() {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    /// Drop every cached response.
    pub fn clear_cache(&self) {
        self.cache.clear();
        debug!("response cache cleared");
    }

    /// GET `path` and decode the JSON body.
    ///
    /// # Errors
    /// Transport failures, non-2xx statuses, and undecodable bodies.
    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> ClientResult<T> {
        let url = self.api_url(path)?;
        let response = self.authorize(self.client.get(url)).send().await?;
        decode(response).await
    }

    /// GET `path` with `token` as the credential instead of the shared one.
    ///
    /// # Errors
    /// Transport failures, non-2xx statuses, and undecodable bodies.
    pub async fn get_with_token<T: DeserializeOwned>(
        &self,
        path: &str,
        token: &str,
    ) -> ClientResult<T> {
        let url = self.api_url(path)?;
        let response = self.client.get(url).bearer_auth(token).send().await?;
        decode(response).await
    }

    /// GET `path`, serving a fresh cached body when `options` allow it.
    ///
    /// # Errors
    /// Transport failures, non-2xx statuses, and undecodable bodies. Failed
    /// responses are never cached, nor are responses that arrive after a
    /// [`ApiClient::clear_cache`] issued while they were in flight.
    pub async fn get_cached<T: DeserializeOwned>(
        &self,
        path: &str,
        options: CacheOptions,
    ) -> ClientResult<T> {
        let url = self.api_url(path)?;
        let key = url.to_string();

        if !options.force_refresh {
            if let Some(body) = self.cache.get(&key, options.ttl) {
                debug!(url = %key, "serving cached response");
                return Ok(serde_json::from_value(body)?);
            }
        }

        let epoch = self.cache.epoch();
        let response = self.authorize(self.client.get(url)).send().await?;
        let body: Value = decode(response).await?;
        if !self.cache.insert_if_epoch(epoch, key.as_str(), body.clone()) {
            debug!(url = %key, "cache cleared during request; response not stored");
        }
        Ok(serde_json::from_value(body)?)
    }

    /// POST a JSON body to `path` and decode the JSON response.
    ///
    /// # Errors
    /// Transport failures, non-2xx statuses, and undecodable bodies.
    pub async fn post<B, T>(&self, path: &str, body: &B) -> ClientResult<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let url = self.api_url(path)?;
        let response = self.authorize(self.client.post(url)).json(body).send().await?;
        decode(response).await
    }

    /// POST without a body, ignoring whatever the server returns on success.
    ///
    /// # Errors
    /// Transport failures and non-2xx statuses.
    pub async fn post_empty(&self, path: &str) -> ClientResult<()> {
        let url = self.api_url(path)?;
        let response = self.authorize(self.client.post(url)).send().await?;
        check_status(response).await.map(drop)
    }
}

async fn check_status(response: Response) -> ClientResult<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    let message = ErrorResponse::parse(&body).map(|parsed| parsed.error);
    debug!(%status, message = message.as_deref().unwrap_or(""), "request rejected");
    Err(ClientError::Status { status, message })
}

async fn decode<T: DeserializeOwned>(response: Response) -> ClientResult<T> {
    let response = check_status(response).await?;
    let bytes = response.bytes().await?;
    Ok(serde_json::from_slice(&bytes)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client(base: &str) -> ApiClient {
        ApiClient::new(&Url::parse(base).unwrap(), Duration::from_secs(5)).unwrap()
    }

    #[test]
    fn api_url_keeps_base_path() {
        let api = client("http://localhost:5000/api");
        assert_eq!(
            api.api_url("auth/login").unwrap().as_str(),
            "http://localhost:5000/api/auth/login"
        );
        assert_eq!(
            api.api_url("/auth/profile").unwrap().as_str(),
            "http://localhost:5000/api/auth/profile"
        );
    }

    #[test]
    fn bearer_token_is_shared_between_clones() {
        let api = client("http://localhost:5000/api/");
        let other = api.clone();

        api.set_bearer_token(Some("t1".to_string()));
        assert_eq!(other.bearer_token().as_deref(), Some("t1"));

        other.set_bearer_token(None);
        assert_eq!(api.bearer_token(), None);
    }

    #[test]
    fn clear_cache_is_shared_between_clones() {
        let api = client("http://localhost:5000/api/");
        api.cache.insert("k", serde_json::json!(1));

        api.clone().clear_cache();
        assert!(api.cache.is_empty());
    }
}
