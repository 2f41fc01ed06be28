use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use tracing::instrument;

use dojo_core::errors::UpstreamError;
use dojo_core::upstream::PersonaResponder;

use crate::http;

const SERVICE: &str = "persona";

#[derive(Deserialize)]
struct PersonaReply {
    #[serde(default)]
    response: String,
}

/// Actor service client. Errors propagate; no reply text is ever made up.
pub struct HttpPersona {
    client: Client,
    base_url: String,
    timeout: Duration,
}

impl HttpPersona {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> reqwest::Result<Self> {
        Ok(Self {
            client: Client::builder().timeout(timeout).build()?,
            base_url: base_url.into(),
            timeout,
        })
    }
}

#[async_trait]
impl PersonaResponder for HttpPersona {
    #[instrument(skip(self, transcript), fields(transcript_len = transcript.len()))]
    async fn respond(&self, transcript: &str, persona: &str) -> Result<String, UpstreamError> {
        let resp = self
            .client
            .post(http::endpoint(&self.base_url, "respond"))
            .json(&json!({ "transcript": transcript, "persona": persona }))
            .send()
            .await
            .map_err(|e| http::request_error(SERVICE, self.timeout, e))?;
        let resp = http::require_success(SERVICE, resp).await?;
        let reply: PersonaReply = resp
            .json()
            .await
            .map_err(|e| http::request_error(SERVICE, self.timeout, e))?;
        Ok(reply.response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn returns_persona_reply() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/respond"))
            .and(body_json(json!({"transcript": "this is the IRS", "persona": "hazel"})))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"response": "Oh dear, let me find my glasses."})),
            )
            .mount(&server)
            .await;

        let persona = HttpPersona::new(server.uri(), Duration::from_secs(2)).unwrap();
        let text = persona.respond("this is the IRS", "hazel").await.unwrap();
        assert_eq!(text, "Oh dear, let me find my glasses.");
    }

    #[tokio::test]
    async fn missing_response_field_is_empty_text() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
            .mount(&server)
            .await;

        let persona = HttpPersona::new(server.uri(), Duration::from_secs(2)).unwrap();
        assert_eq!(persona.respond("hi", "hazel").await.unwrap(), "");
    }

    #[tokio::test]
    async fn non_success_propagates_status_and_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500).set_body_string("model offline"))
            .mount(&server)
            .await;

        let persona = HttpPersona::new(server.uri(), Duration::from_secs(2)).unwrap();
        let err = persona.respond("hi", "hazel").await.unwrap_err();
        assert_eq!(
            err,
            UpstreamError::Status {
                service: "persona",
                status: 500,
                body: "model offline".into()
            }
        );
    }

    #[tokio::test]
    async fn timeout_is_reported() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"response": "late"}))
                    .set_delay(Duration::from_millis(500)),
            )
            .mount(&server)
            .await;

        let persona = HttpPersona::new(server.uri(), Duration::from_millis(50)).unwrap();
        let err = persona.respond("hi", "hazel").await.unwrap_err();
        assert_eq!(err.error_kind(), "upstream_timeout");
    }
}
