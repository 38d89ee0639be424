use std::time::Duration;

use reqwest::Response;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use uuid::Uuid;

use crate::config::MatrixClientConfig;
use crate::error::{MatrixClientError, Result};
use crate::types::*;
use crate::urls;

/// Raw client-server API client authenticating with an application-service
/// token. The identity every call acts as is passed per request through the
/// `user_id` query parameter; the client itself holds no acting state.
pub struct MatrixHttpClient {
    base_url: String,
    access_token: String,
    http: reqwest::Client,
    cfg: MatrixClientConfig,
}

impl MatrixHttpClient {
    pub fn new(
        base_url: impl Into<String>,
        access_token: impl Into<String>,
        cfg: MatrixClientConfig,
    ) -> Result<MatrixHttpClient> {
        if cfg.timeout_ms == 0 {
            return Err(MatrixClientError::InvalidInput("timeout_ms"));
        }
        if cfg.connect_timeout_ms == 0 {
            return Err(MatrixClientError::InvalidInput("connect_timeout_ms"));
        }
        if cfg.user_agent.trim().is_empty() {
            return Err(MatrixClientError::InvalidInput("user_agent"));
        }
        let token: String = access_token.into();
        if token.trim().is_empty() {
            return Err(MatrixClientError::InvalidInput("access_token"));
        }
        let base_raw: String = base_url.into();
        let base = urls::validated_base(base_raw.as_str())?;
        let http = reqwest::Client::builder()
            .user_agent(cfg.user_agent.clone())
            .timeout(Duration::from_millis(cfg.timeout_ms))
            .connect_timeout(Duration::from_millis(cfg.connect_timeout_ms))
            .build()?;
        Ok(MatrixHttpClient {
            base_url: base,
            access_token: token,
            http,
            cfg,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub async fn send_message(
        &self,
        as_user: &str,
        room_id: &str,
        content: &Value,
    ) -> Result<SendResponse> {
        let txn_id = Uuid::new_v4().to_string();
        let url = urls::send_message(&self.base_url, room_id, &txn_id);
        let response = self
            .http
            .put(url)
            .bearer_auth(&self.access_token)
            .query(&[("user_id", as_user)])
            .json(content)
            .send()
            .await?;
        decode_json(response).await
    }

    pub async fn sync(&self, as_user: &str, since: Option<&str>) -> Result<SyncResponse> {
        let url = urls::sync(&self.base_url);
        let timeout = self.cfg.sync_timeout_ms.to_string();
        let mut query: Vec<(&str, &str)> = vec![("user_id", as_user), ("timeout", &timeout)];
        if let Some(token) = since {
            query.push(("since", token));
        }
        let response = self
            .http
            .get(url)
            .bearer_auth(&self.access_token)
            .query(&query)
            .send()
            .await?;
        decode_json(response).await
    }

    pub async fn create_room(
        &self,
        as_user: &str,
        request: &CreateRoomRequest,
    ) -> Result<CreateRoomResponse> {
        let url = urls::create_room(&self.base_url);
        self.post_json(url, as_user, request).await
    }

    pub async fn join_room(&self, as_user: &str, room_id: &str) -> Result<Value> {
        let url = urls::join_room(&self.base_url, room_id);
        self.post_json(url, as_user, &serde_json::json!({})).await
    }

    pub async fn resolve_alias(&self, alias: &str) -> Result<Option<AliasResponse>> {
        let url = urls::resolve_alias(&self.base_url, alias);
        let response = self
            .http
            .get(url)
            .bearer_auth(&self.access_token)
            .send()
            .await?;
        if response.status().as_u16() == 404 {
            return Ok(None);
        }
        decode_json(response).await.map(Some)
    }

    pub async fn room_aliases(&self, as_user: &str, room_id: &str) -> Result<AliasesResponse> {
        let url = urls::room_aliases(&self.base_url, room_id);
        let response = self
            .http
            .get(url)
            .bearer_auth(&self.access_token)
            .query(&[("user_id", as_user)])
            .send()
            .await?;
        decode_json(response).await
    }

    pub async fn upload(
        &self,
        as_user: &str,
        content_type: &str,
        bytes: Vec<u8>,
    ) -> Result<UploadResponse> {
        let url = urls::upload(&self.base_url);
        let response = self
            .http
            .post(url)
            .bearer_auth(&self.access_token)
            .query(&[("user_id", as_user)])
            .header(reqwest::header::CONTENT_TYPE, content_type)
            .body(bytes)
            .send()
            .await?;
        decode_json(response).await
    }

    pub async fn set_pusher(&self, as_user: &str, request: &PusherRequest) -> Result<Value> {
        let url = urls::pushers_set(&self.base_url);
        self.post_json(url, as_user, request).await
    }

    /// Turns an `mxc://server/id` content reference into a download URL on
    /// this homeserver. Returns `None` for anything else.
    pub fn media_url(&self, content_uri: &str) -> Option<String> {
        let rest = content_uri.strip_prefix("mxc://")?;
        let (server, media_id) = rest.split_once('/')?;
        if server.is_empty() || media_id.is_empty() {
            return None;
        }
        Some(urls::media_download(&self.base_url, server, media_id))
    }

    async fn post_json<B: Serialize, T: DeserializeOwned>(
        &self,
        url: String,
        as_user: &str,
        body: &B,
    ) -> Result<T> {
        let response = self
            .http
            .post(url)
            .bearer_auth(&self.access_token)
            .query(&[("user_id", as_user)])
            .json(body)
            .send()
            .await?;
        decode_json(response).await
    }
}

async fn decode_json<T: DeserializeOwned>(response: Response) -> Result<T> {
    let status = response.status().as_u16();
    if !(200..300).contains(&status) {
        let body: ErrorBody = response.json().await.unwrap_or(ErrorBody {
            errcode: String::new(),
            error: String::new(),
        });
        return Err(MatrixClientError::Api {
            status,
            errcode: body.errcode,
            error: body.error,
        });
    }
    Ok(response.json().await?)
}
