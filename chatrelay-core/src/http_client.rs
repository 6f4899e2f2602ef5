use std::time::{Duration, Instant};

use reqwest::{Client, Response};
use serde::{Serialize, de::DeserializeOwned};

use crate::config::HttpCfg;
use crate::error::{CoreResult, RelayError};

/// Response framing requested from the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Accept {
    EventStream,
    Json,
}

impl Accept {
    pub fn for_stream(stream: bool) -> Self {
        if stream { Self::EventStream } else { Self::Json }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::EventStream => "text/event-stream",
            Self::Json => "application/json",
        }
    }
}

/// Thin wrapper around reqwest::Client with defaults and helpers.
#[derive(Debug, Clone)]
pub struct HttpClient {
    inner: Client,
    user_agent: String,
}

impl HttpClient {
    pub fn new(cfg: &HttpCfg) -> CoreResult<Self> {
        let mut builder =
            Client::builder().connect_timeout(Duration::from_millis(cfg.connect_timeout_ms));
        if let Some(ms) = cfg.request_timeout_ms {
            builder = builder.timeout(Duration::from_millis(ms));
        }
        if let Some(n) = cfg.pool_max_idle_per_host {
            builder = builder.pool_max_idle_per_host(n);
        }
        let inner = builder
            .build()
            .map_err(|e| RelayError::Other(anyhow::anyhow!("http client build failed: {e}")))?;
        Ok(Self {
            inner,
            user_agent: concat!("chatrelay/", env!("CARGO_PKG_VERSION")).to_string(),
        })
    }

    pub fn new_default() -> CoreResult<Self> {
        Self::new(&HttpCfg::default())
    }

    /// POST a JSON body and return the response once its status is known to
    /// be a success. The body is left unread so callers can stream it.
    ///
    /// `target` names the remote side in errors (provider name or "relay").
    pub async fn post<T: Serialize + ?Sized>(
        &self,
        target: &str,
        url: &str,
        body: &T,
        headers: &[(&str, &str)],
        accept: Accept,
    ) -> CoreResult<Response> {
        let start = Instant::now();
        let mut req = self
            .inner
            .post(url)
            .json(body)
            .header("User-Agent", &self.user_agent)
            .header("Accept", accept.as_str());

        for (k, v) in headers {
            req = req.header(*k, *v);
        }

        let resp = req.send().await.map_err(|e| RelayError::Dispatch {
            target: target.to_string(),
            message: e.to_string(),
        })?;

        let status = resp.status();
        tracing::debug!(
            target_name = target,
            status = status.as_u16(),
            latency_ms = start.elapsed().as_millis() as u64,
            "response headers received"
        );
        if !status.is_success() {
            return Err(RelayError::Upstream {
                status: status.as_u16(),
                body: error_body(target, resp).await,
            });
        }
        Ok(resp)
    }

    pub async fn get_json<R: DeserializeOwned>(&self, target: &str, url: &str) -> CoreResult<R> {
        let resp = self
            .inner
            .get(url)
            .header("User-Agent", &self.user_agent)
            .header("Accept", Accept::Json.as_str())
            .send()
            .await
            .map_err(|e| RelayError::Dispatch {
                target: target.to_string(),
                message: e.to_string(),
            })?;

        let status = resp.status();
        if !status.is_success() {
            return Err(RelayError::Upstream {
                status: status.as_u16(),
                body: error_body(target, resp).await,
            });
        }

        resp.json::<R>()
            .await
            .map_err(|e| RelayError::Decode(format!("json decode error: {e}")))
    }
}

/// Text of a rejection body. An unreadable body is reported as empty, which
/// callers render as `HTTP <status>`.
async fn error_body(target: &str, resp: Response) -> String {
    match resp.text().await {
        Ok(body) => body,
        Err(e) => {
            tracing::warn!(target_name = target, error = %e, "failed to read error body");
            String::new()
        }
    }
}
