use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde_json::json;
use tracing::{instrument, warn};

use dojo_core::errors::UpstreamError;
use dojo_core::upstream::{Triage, TriageResult};

use crate::http;

const SERVICE: &str = "triage";

/// Foreman triage API client.
pub struct HttpTriage {
    client: Client,
    base_url: String,
    timeout: Duration,
}

impl HttpTriage {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> reqwest::Result<Self> {
        Ok(Self {
            client: Client::builder().timeout(timeout).build()?,
            base_url: base_url.into(),
            timeout,
        })
    }

    async fn try_classify(&self, caller_number: &str) -> Result<TriageResult, UpstreamError> {
        let resp = self
            .client
            .post(http::endpoint(&self.base_url, "triage"))
            .json(&json!({ "number": caller_number }))
            .send()
            .await
            .map_err(|e| http::request_error(SERVICE, self.timeout, e))?;
        let resp = http::require_success(SERVICE, resp).await?;
        resp.json::<TriageResult>()
            .await
            .map_err(|e| http::request_error(SERVICE, self.timeout, e))
    }
}

#[async_trait]
impl Triage for HttpTriage {
    #[instrument(skip(self))]
    async fn classify(&self, caller_number: &str) -> TriageResult {
        match self.try_classify(caller_number).await {
            Ok(result) => result,
            Err(e) => {
                warn!(error = %e, kind = e.error_kind(), "triage unavailable, treating as ordinary call");
                TriageResult::default()
            }
        }
    }
}
