//! [`RestClient`]: the reqwest-backed [`RemoteClient`].

use std::time::Duration;

use fieldsync_core::remote::{RemoteClient, RemoteError};
use reqwest::{
  Client, RequestBuilder,
  header::{ACCEPT, CONTENT_TYPE, HeaderMap, HeaderValue},
};

use crate::{Error, Result};

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Credentials and transport settings for the remote instance.
#[derive(Debug, Clone)]
pub struct RestConfig {
  pub user:     String,
  pub password: String,
  pub timeout:  Duration,
}

/// Basic-auth JSON client for the remote table API.
///
/// Cheap to clone; the inner [`reqwest::Client`] is `Arc`-based.
#[derive(Clone)]
pub struct RestClient {
  client: Client,
  config: RestConfig,
}

impl RestClient {
  pub fn new(config: RestConfig) -> Result<Self> {
    let mut headers = HeaderMap::new();
    headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

    let client = Client::builder()
      .timeout(config.timeout)
      .default_headers(headers)
      .build()
      .map_err(|e| Error::InvalidArgument(format!("failed to build HTTP client: {e}")))?;
    Ok(Self { client, config })
  }

  fn auth(&self, req: RequestBuilder) -> RequestBuilder {
    if self.config.user.is_empty() {
      req
    } else {
      req.basic_auth(&self.config.user, Some(&self.config.password))
    }
  }

  async fn send(
    &self,
    method: &'static str,
    url: &str,
    req: RequestBuilder,
  ) -> Result<Vec<u8>, RemoteError> {
    let transport = |e: reqwest::Error| RemoteError::Transport {
      method,
      url: url.to_owned(),
      message: e.to_string(),
    };

    tracing::debug!(method, url = %url, "remote call");
    let resp = self.auth(req).send().await.map_err(transport)?;

    let status = resp.status();
    if !status.is_success() {
      return Err(RemoteError::Status {
        method,
        url: url.to_owned(),
        status: status.as_u16(),
      });
    }
    let body = resp.bytes().await.map_err(transport)?;
    Ok(body.to_vec())
  }
}

impl RemoteClient for RestClient {
  async fn get<'a>(&'a self, url: &'a str) -> Result<Vec<u8>, RemoteError> {
    self.send("GET", url, self.client.get(url)).await
  }

  async fn put<'a>(&'a self, url: &'a str, body: Vec<u8>) -> Result<Vec<u8>, RemoteError> {
    self.send("PUT", url, self.client.put(url).body(body)).await
  }
}
