//! Environment-driven judge configuration.
//!
//! Recognized variables: `ROBO_JUDGE_MODE` (`stub` | `remote`),
//! `ROBO_JUDGE_URL`, `ROBO_JUDGE_API_KEY`, `ROBO_JUDGE_TIMEOUT` (seconds).
//! Remote mode requires a base URL; otherwise the stub backend is used.

use std::env;
use std::sync::Arc;
use std::time::Duration;

use log::info;

use advisor_core::provider::MarketDataProvider;

use crate::remote::RemoteProvider;
use crate::stub::{SharedDataset, StubProvider};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JudgeMode {
    Stub,
    Remote,
}

#[derive(Debug, Clone)]
pub struct JudgeConfig {
    pub mode: JudgeMode,
    pub base_url: Option<String>,
    pub api_key: Option<String>,
    pub timeout: Duration,
}

impl Default for JudgeConfig {
    fn default() -> Self {
        Self {
            mode: JudgeMode::Stub,
            base_url: None,
            api_key: None,
            timeout: Duration::from_secs(10),
        }
    }
}

impl JudgeConfig {
    pub fn from_env() -> Self {
        // Any mode other than "stub" asks for the remote backend; whether
        // it gets one still depends on a base URL being configured.
        let mode = match env::var("ROBO_JUDGE_MODE").as_deref() {
            Ok(m) if !m.eq_ignore_ascii_case("stub") => JudgeMode::Remote,
            _ => JudgeMode::Stub,
        };
        let timeout = env::var("ROBO_JUDGE_TIMEOUT")
            .ok()
            .and_then(|t| t.parse::<f64>().ok())
            .map(Duration::from_secs_f64)
            .unwrap_or(Duration::from_secs(10));
        Self {
            mode,
            base_url: env::var("ROBO_JUDGE_URL").ok().filter(|u| !u.is_empty()),
            api_key: env::var("ROBO_JUDGE_API_KEY").ok(),
            timeout,
        }
    }

    /// Builds the provider this configuration selects. The stub backend
    /// serves from `dataset`; remote mode needs a base URL or falls back
    /// to the stub.
    pub fn build_provider(
        &self,
        dataset: SharedDataset,
    ) -> anyhow::Result<Arc<dyn MarketDataProvider>> {
        match (self.mode, &self.base_url) {
            (JudgeMode::Remote, Some(url)) => {
                info!("Judge provider: remote at {}", url);
                Ok(Arc::new(RemoteProvider::new(
                    url.clone(),
                    self.api_key.as_deref(),
                    self.timeout,
                )?))
            }
            _ => {
                info!("Judge provider: in-memory stub");
                Ok(Arc::new(StubProvider::new(dataset)))
            }
        }
    }
}
