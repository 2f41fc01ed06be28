use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use tracing::{info, instrument, warn};

use dojo_core::errors::UpstreamError;
use dojo_core::report::{ScoreReceipt, ScoreReport};
use dojo_core::upstream::ScoreSink;

use crate::http;

const SERVICE: &str = "scoring";

/// Steward reward engine client. Submission is best-effort.
pub struct HttpScoring {
    client: Client,
    base_url: String,
    timeout: Duration,
}

impl HttpScoring {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> reqwest::Result<Self> {
        Ok(Self {
            client: Client::builder().timeout(timeout).build()?,
            base_url: base_url.into(),
            timeout,
        })
    }

    async fn try_submit(&self, report: &ScoreReport) -> Result<ScoreReceipt, UpstreamError> {
        let resp = self
            .client
            .post(http::endpoint(&self.base_url, "api/log_call"))
            .json(report)
            .send()
            .await
            .map_err(|e| http::request_error(SERVICE, self.timeout, e))?;
        let resp = http::require_success(SERVICE, resp).await?;
        resp.json::<ScoreReceipt>()
            .await
            .map_err(|e| http::request_error(SERVICE, self.timeout, e))
    }
}

#[async_trait]
impl ScoreSink for HttpScoring {
    #[instrument(skip(self, report), fields(session_id = %report.session_id, user_id = %report.user_id))]
    async fn submit(&self, report: &ScoreReport) -> Option<ScoreReceipt> {
        match self.try_submit(report).await {
            Ok(receipt) => {
                info!(
                    credits = receipt.credits_earned,
                    level = receipt.new_level,
                    mode = report.mode.as_str(),
                    duration_seconds = report.duration_seconds,
                    "session scored"
                );
                Some(receipt)
            }
            Err(e) => {
                warn!(error = %e, kind = e.error_kind(), "score submission failed");
                None
            }
        }
    }
}
