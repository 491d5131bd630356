//! Scheduler HTTP API: `GET`/`PUT {base}/v2/apps{id}`.

use reqwest::StatusCode;
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, info};

use crate::consts::CHECKSUM_LABEL;
use crate::http::ClientConfig;

/// A failed scheduler call.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchedulerError {
  /// No HTTP response was received.
  #[error("failed to reach {url}: {message}")]
  Transport { url: String, message: String },

  /// The scheduler answered with an error status.
  #[error("{url} returned HTTP {status}: {message}")]
  Http { url: String, status: u16, message: String },

  /// The response body was not the expected JSON.
  #[error("invalid response from {url}: {message}")]
  InvalidResponse { url: String, message: String },
}

/// An application as currently known to the scheduler.
#[derive(Debug, Clone, PartialEq)]
pub struct App {
  pub definition: Value,
}

impl App {
  /// The checksum label the app was deployed with, if any.
  pub fn checksum(&self) -> Option<&str> {
    self
      .definition
      .get("labels")
      .and_then(|labels| labels.get(CHECKSUM_LABEL))
      .and_then(Value::as_str)
  }
}

/// Read and write access to scheduler applications.
#[allow(async_fn_in_trait)]
pub trait Scheduler {
  /// The app `id` at `base_url`, or `None` if the scheduler does not know it.
  async fn get_app(&self, base_url: &str, id: &str) -> Result<Option<App>, SchedulerError>;

  /// Create or replace the app `id` at `base_url`.
  async fn put_app(&self, base_url: &str, id: &str, definition: &Value) -> Result<(), SchedulerError>;
}

impl<T: Scheduler> Scheduler for &T {
  async fn get_app(&self, base_url: &str, id: &str) -> Result<Option<App>, SchedulerError> {
    (**self).get_app(base_url, id).await
  }

  async fn put_app(&self, base_url: &str, id: &str, definition: &Value) -> Result<(), SchedulerError> {
    (**self).put_app(base_url, id, definition).await
  }
}

/// `{base}/v2/apps{id}`; `id` already starts with `/`.
pub fn app_url(base_url: &str, id: &str) -> String {
  format!("{}/v2/apps{}", base_url.trim_end_matches('/'), id)
}

/// [`Scheduler`] over the Marathon-style REST API.
#[derive(Debug, Clone)]
pub struct SchedulerClient {
  client: reqwest::Client,
}

impl SchedulerClient {
  pub fn new(config: &ClientConfig) -> reqwest::Result<Self> {
    Ok(Self {
      client: config.build()?,
    })
  }

  async fn error_from(url: &str, response: reqwest::Response) -> SchedulerError {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<Value>(&body)
      .ok()
      .and_then(|json| json.get("message").and_then(Value::as_str).map(str::to_string))
      .unwrap_or_else(|| {
        if body.trim().is_empty() {
          status.canonical_reason().unwrap_or("unknown error").to_string()
        } else {
          body.trim().to_string()
        }
      });

    SchedulerError::Http {
      url: url.to_string(),
      status: status.as_u16(),
      message,
    }
  }
}

fn transport(url: &str, err: reqwest::Error) -> SchedulerError {
  SchedulerError::Transport {
    url: url.to_string(),
    message: err.without_url().to_string(),
  }
}

impl Scheduler for SchedulerClient {
  async fn get_app(&self, base_url: &str, id: &str) -> Result<Option<App>, SchedulerError> {
    let url = app_url(base_url, id);
    debug!(url = %url, "fetching current app");

    let response = self.client.get(&url).send().await.map_err(|e| transport(&url, e))?;
    let status = response.status();
    if status == StatusCode::NOT_FOUND {
      return Ok(None);
    }
    if !status.is_success() {
      return Err(Self::error_from(&url, response).await);
    }

    let mut body: Value = response.json().await.map_err(|e| SchedulerError::InvalidResponse {
      url: url.clone(),
      message: e.without_url().to_string(),
    })?;
    let definition = match body.get_mut("app") {
      Some(app) => app.take(),
      None => body,
    };
    Ok(Some(App { definition }))
  }

  async fn put_app(&self, base_url: &str, id: &str, definition: &Value) -> Result<(), SchedulerError> {
    let url = app_url(base_url, id);
    info!(url = %url, "deploying app");

    let response = self
      .client
      .put(&url)
      .json(definition)
      .send()
      .await
      .map_err(|e| transport(&url, e))?;
    if !response.status().is_success() {
      return Err(Self::error_from(&url, response).await);
    }
    Ok(())
  }
}
