use reqwest::{Client as HttpClient, StatusCode};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, instrument};

use super::RemoteSource;
use super::error::{RemoteError, RemoteResult};
use super::model::{
    GET_KEYS_METHOD, GET_VALUE_METHOD, GetKeysRequest, GetKeysResponse, GetValueRequest,
    GetValueResponse, is_not_found_message,
};
use crate::cache::{EntryKey, KeyListing, StoreId};
use crate::config::RemoteConfigHandle;

#[derive(Clone)]
/// JSON-RPC client for the remote data layer service.
///
/// Each call reads the current [`RemoteConfigHandle`] snapshot, so `configure` takes effect on
/// the next request without rebuilding the client.
pub struct RpcRemoteSource {
    http: HttpClient,
    config: RemoteConfigHandle,
}

impl RpcRemoteSource {
    /// Creates a client bound to `config`.
    pub fn new(config: RemoteConfigHandle) -> RemoteResult<Self> {
        let http = HttpClient::builder()
            .build()
            .map_err(|e| RemoteError::ClientBuild {
                message: e.to_string(),
            })?;
        Ok(Self { http, config })
    }

    /// Returns the config handle.
    pub fn config(&self) -> &RemoteConfigHandle {
        &self.config
    }

    async fn call<Req, Resp>(&self, method: &str, body: &Req) -> RemoteResult<Response<Resp>>
    where
        Req: Serialize + ?Sized,
        Resp: DeserializeOwned,
    {
        let config = self.config.snapshot();
        let url = format!("{}/{}", config.endpoint.trim_end_matches('/'), method);

        let mut request = self.http.post(&url).timeout(config.timeout).json(body);
        if let Some(credentials) = &config.credentials {
            request = request.bearer_auth(credentials.token());
        }

        let response = request
            .send()
            .await
            .map_err(|e| classify(&url, e))?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Ok(Response::Missing);
        }
        if !status.is_success() {
            let text = response
                .text()
                .await
                .unwrap_or_else(|_| "<unreadable body>".to_string());
            return Err(RemoteError::Rejected {
                url,
                message: format!("HTTP {}: {}", status, text.trim()),
            });
        }

        let body = response.json::<Resp>().await.map_err(|e| {
            if e.is_timeout() {
                RemoteError::Timeout { url: url.clone() }
            } else {
                RemoteError::InvalidResponse {
                    url: url.clone(),
                    message: e.to_string(),
                }
            }
        })?;

        debug!(url = %url, "RPC call completed");
        Ok(Response::Body { url, body })
    }
}

enum Response<T> {
    Body { url: String, body: T },
    Missing,
}

fn classify(url: &str, err: reqwest::Error) -> RemoteError {
    if err.is_timeout() {
        RemoteError::Timeout {
            url: url.to_string(),
        }
    } else {
        RemoteError::Transport {
            url: url.to_string(),
            message: err.to_string(),
        }
    }
}

fn rpc_failure(url: String, error: Option<String>, not_found: RemoteError) -> RemoteError {
    match error {
        Some(message) if is_not_found_message(&message) => not_found,
        Some(message) => RemoteError::Rejected { url, message },
        None => RemoteError::Rejected {
            url,
            message: "success=false without error message".to_string(),
        },
    }
}

impl RemoteSource for RpcRemoteSource {
    #[instrument(skip_all, fields(store = %store, key = %key))]
    async fn get_value(&self, store: &StoreId, key: &EntryKey) -> RemoteResult<Value> {
        let not_found = RemoteError::NotFound {
            store: store.to_string(),
            key: Some(key.to_string()),
        };
        let request = GetValueRequest {
            id: store.as_str(),
            key: key.as_str(),
        };

        match self
            .call::<_, GetValueResponse>(GET_VALUE_METHOD, &request)
            .await?
        {
            Response::Missing => Err(not_found),
            Response::Body { body, .. } if body.success => Ok(body.value),
            Response::Body { url, body } => Err(rpc_failure(url, body.error, not_found)),
        }
    }

    #[instrument(skip_all, fields(store = %store))]
    async fn get_keys(&self, store: &StoreId) -> RemoteResult<KeyListing> {
        let not_found = RemoteError::NotFound {
            store: store.to_string(),
            key: None,
        };
        let request = GetKeysRequest { id: store.as_str() };

        match self
            .call::<_, GetKeysResponse>(GET_KEYS_METHOD, &request)
            .await?
        {
            Response::Missing => Err(not_found),
            Response::Body { url, body } if body.success => match body.keys {
                Some(keys) => Ok(KeyListing::new(keys)),
                None => Err(RemoteError::InvalidResponse {
                    url,
                    message: "missing 'keys' field".to_string(),
                }),
            },
            Response::Body { url, body } => Err(rpc_failure(url, body.error, not_found)),
        }
    }
}

impl std::fmt::Debug for RpcRemoteSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RpcRemoteSource")
            .field("endpoint", &self.config.snapshot().endpoint)
            .finish()
    }
}
