//! Shared HTTP client configuration.

use std::time::Duration;

/// Default per-request timeout for repository and scheduler calls.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Settings applied to every outbound HTTP client.
#[derive(Debug, Clone)]
pub struct ClientConfig {
  /// Timeout for a single request, connect through body.
  pub timeout: Duration,
}

impl Default for ClientConfig {
  fn default() -> Self {
    Self {
      timeout: DEFAULT_TIMEOUT,
    }
  }
}

impl ClientConfig {
  pub fn with_timeout(timeout: Duration) -> Self {
    Self { timeout }
  }

  /// Build a `reqwest` client with these settings.
  pub fn build(&self) -> reqwest::Result<reqwest::Client> {
    reqwest::Client::builder()
      .timeout(self.timeout)
      .user_agent(concat!("skiff/", env!("CARGO_PKG_VERSION")))
      .build()
  }
}
