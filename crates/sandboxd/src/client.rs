//! Minimal client for the sandbox RPC surface.

use reqwest::header::CONTENT_TYPE;
use sandbox_core::API_KEY_HEADER;
use serde::de::DeserializeOwned;
use serde::Serialize;
use thiserror::Error;

use crate::rpc::messages::{
    procedures, EditRequest, EditResponse, Empty, ErrorBody, ExecuteRequest, ExecuteResponse,
    InitSandboxResponse, ReadRequest, ReadResponse, WriteRequest,
};
use crate::rpc::RpcError;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    /// The server answered with a Connect error body.
    #[error("rpc error: {0}")]
    Rpc(#[from] RpcError),

    #[error("unexpected response ({status}): {body}")]
    Unexpected { status: u16, body: String },
}

impl ClientError {
    pub fn rpc(&self) -> Option<&RpcError> {
        match self {
            ClientError::Rpc(err) => Some(err),
            _ => None,
        }
    }
}

pub type ClientResult<T> = std::result::Result<T, ClientError>;

/// Speaks the sandbox wire protocol to one server.
///
/// ```ignore
/// let client = SandboxClient::new("http://127.0.0.1:8080");
/// let init = client.init_sandbox().await?;
/// let client = client.with_api_key(&init.api_key);
/// client.write("notes.md", "# hi").await?;
/// ```
#[derive(Debug, Clone)]
pub struct SandboxClient {
    http: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
}

impl SandboxClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: None,
        }
    }

    /// A copy of this client that sends `api_key` on every call.
    pub fn with_api_key(&self, api_key: impl Into<String>) -> Self {
        Self {
            api_key: Some(api_key.into()),
            ..self.clone()
        }
    }

    pub fn api_key(&self) -> Option<&str> {
        self.api_key.as_deref()
    }

    pub async fn health(&self) -> ClientResult<String> {
        let resp = self
            .http
            .get(format!("{}/health", self.base_url))
            .send()
            .await?;
        let status = resp.status();
        let body = resp.text().await?;
        if !status.is_success() {
            return Err(ClientError::Unexpected {
                status: status.as_u16(),
                body,
            });
        }
        Ok(body)
    }

    pub async fn init_sandbox(&self) -> ClientResult<InitSandboxResponse> {
        self.call(procedures::INIT_SANDBOX, &Empty {}).await
    }

    pub async fn destroy_sandbox(&self) -> ClientResult<()> {
        let _: Empty = self.call(procedures::DESTROY_SANDBOX, &Empty {}).await?;
        Ok(())
    }

    pub async fn read(&self, path: &str) -> ClientResult<String> {
        let resp: ReadResponse = self
            .call(
                procedures::FILE_READ,
                &ReadRequest {
                    path: path.to_string(),
                },
            )
            .await?;
        Ok(resp.content)
    }

    pub async fn write(&self, path: &str, content: &str) -> ClientResult<()> {
        let _: Empty = self
            .call(
                procedures::FILE_WRITE,
                &WriteRequest {
                    path: path.to_string(),
                    content: content.to_string(),
                },
            )
            .await?;
        Ok(())
    }

    pub async fn edit(&self, path: &str, content: &str) -> ClientResult<EditResponse> {
        self.call(
            procedures::FILE_EDIT,
            &EditRequest {
                path: path.to_string(),
                content: content.to_string(),
            },
        )
        .await
    }

    pub async fn execute(&self, command: &str) -> ClientResult<String> {
        let resp: ExecuteResponse = self
            .call(
                procedures::SHELL_EXECUTE,
                &ExecuteRequest {
                    command: command.to_string(),
                },
            )
            .await?;
        Ok(resp.output)
    }

    async fn call<Req, Resp>(&self, procedure: &str, body: &Req) -> ClientResult<Resp>
    where
        Req: Serialize + ?Sized,
        Resp: DeserializeOwned,
    {
        let mut req = self
            .http
            .post(format!("{}{}", self.base_url, procedure))
            .header(CONTENT_TYPE, "application/json")
            .json(body);
        if let Some(key) = &self.api_key {
            req = req.header(API_KEY_HEADER, key);
        }

        let resp = req.send().await?;
        let status = resp.status();
        let bytes = resp.bytes().await?;

        if status.is_success() {
            return serde_json::from_slice(&bytes).map_err(|_| ClientError::Unexpected {
                status: status.as_u16(),
                body: String::from_utf8_lossy(&bytes).into_owned(),
            });
        }
        match serde_json::from_slice::<ErrorBody>(&bytes) {
            Ok(body) => Err(RpcError::from(body).into()),
            Err(_) => Err(ClientError::Unexpected {
                status: status.as_u16(),
                body: String::from_utf8_lossy(&bytes).into_owned(),
            }),
        }
    }
}
