use std::future::Future;

use reqwest::{Client, Response, StatusCode, Url};
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use crate::command::TranslatedRequest;
use crate::error::ExecuteError;

/// Base URL used when none is configured.
pub const DEFAULT_BASE_URL: &str = "http://localhost:8080";

/// Something that can carry a [`TranslatedRequest`] to the API.
///
/// The response body is returned untouched; callers decide what it means.
pub trait Execute: Send + Sync + 'static {
    fn execute(
        &self,
        request: TranslatedRequest,
    ) -> impl Future<Output = Result<Value, ExecuteError>> + Send;
}

/// Executes requests over HTTP against a fixed base URL.
#[derive(Debug, Clone)]
pub struct HttpExecutor {
    client: Client,
    base_url: Url,
}

impl HttpExecutor {
    pub fn new(base_url: Url) -> Self {
        Self {
            client: Client::new(),
            base_url,
        }
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Full URL of `endpoint`, which must start with `/`.
    pub fn url_for(&self, endpoint: &str) -> String {
        format!("{}{endpoint}", self.base_url.as_str().trim_end_matches('/'))
    }
}

impl Execute for HttpExecutor {
    fn execute(
        &self,
        request: TranslatedRequest,
    ) -> impl Future<Output = Result<Value, ExecuteError>> + Send {
        let client = self.client.clone();
        let url = self.url_for(request.endpoint());

        async move {
            debug!(%url, verb = %request.verb(), "sending request");
            let response = client
                .request(request.method(), url.as_str())
                .json(request.body())
                .send()
                .await
                .map_err(ExecuteError::Transport)?;

            let status = response.status();
            debug!(%url, %status, "received response");
            if !status.is_success() {
                return Err(server_error(status, response).await);
            }

            response.json::<Value>().await.map_err(ExecuteError::Transport)
        }
    }
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: Option<String>,
}

/// Prefer the server's own `{"error": "..."}` text, fall back to the status line.
async fn server_error(status: StatusCode, response: Response) -> ExecuteError {
    let message = match response.json::<ErrorBody>().await {
        Ok(ErrorBody {
            error: Some(message),
        }) => message,
        _ => format!("server error: {status}"),
    };

    ExecuteError::Server { status, message }
}
