use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use futures::{Future, Stream};
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde_json::json;
use tracing::instrument;

use dojo_core::errors::UpstreamError;
use dojo_core::upstream::{AudioStream, SpeechSynthesizer, SynthesisRequest};

use crate::http;

const SERVICE: &str = "synthesis";

/// Connection settings for the speech provider.
pub struct SynthesisConfig {
    pub base_url: String,
    pub api_key: Option<SecretString>,
    pub connect_timeout: Duration,
    pub idle_timeout: Duration,
}

/// ElevenLabs streaming text-to-speech client.
pub struct ElevenLabsSynthesizer {
    client: Client,
    base_url: String,
    api_key: Option<SecretString>,
    connect_timeout: Duration,
    idle_timeout: Duration,
}

impl ElevenLabsSynthesizer {
    pub fn new(config: SynthesisConfig) -> reqwest::Result<Self> {
        Ok(Self {
            client: Client::builder()
                .connect_timeout(config.connect_timeout)
                .build()?,
            base_url: config.base_url,
            api_key: config.api_key.filter(|k| !k.expose_secret().is_empty()),
            connect_timeout: config.connect_timeout,
            idle_timeout: config.idle_timeout,
        })
    }

    fn request_body(request: &SynthesisRequest) -> serde_json::Value {
        json!({
            "text": request.text,
            "model_id": request.model_id,
            "voice_settings": {
                "stability": 0.5,
                "similarity_boost": 0.75,
                "style": 0.0,
                "use_speaker_boost": true,
            },
        })
    }
}

#[async_trait]
impl SpeechSynthesizer for ElevenLabsSynthesizer {
    fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }

    #[instrument(skip(self, request), fields(voice = %request.voice_id, model = %request.model_id))]
    async fn stream(&self, request: &SynthesisRequest) -> Result<AudioStream, UpstreamError> {
        let url = http::endpoint(
            &self.base_url,
            &format!("text-to-speech/{}/stream", request.voice_id),
        );
        let mut req = self
            .client
            .post(url)
            .header("accept", "audio/mpeg")
            .json(&Self::request_body(request));
        if let Some(key) = &self.api_key {
            req = req.header("xi-api-key", key.expose_secret());
        }

        // The idle budget also covers the wait for response headers.
        let resp = tokio::time::timeout(self.idle_timeout, req.send())
            .await
            .map_err(|_| UpstreamError::Timeout {
                service: SERVICE,
                after: self.idle_timeout,
            })?
            .map_err(|e| http::request_error(SERVICE, self.connect_timeout, e))?;
        let resp = http::require_success(SERVICE, resp).await?;

        Ok(Box::pin(AudioChunkStream::new(
            resp.bytes_stream(),
            self.idle_timeout,
        )))
    }
}

/// Forwards body chunks as they arrive and fails the stream if the
/// provider goes quiet for longer than `idle_duration`.
struct AudioChunkStream {
    inner: Pin<Box<dyn Stream<Item = Result<Bytes, reqwest::Error>> + Send>>,
    idle_deadline: Pin<Box<tokio::time::Sleep>>,
    idle_duration: Duration,
    finished: bool,
}

impl AudioChunkStream {
    fn new(
        byte_stream: impl Stream<Item = Result<Bytes, reqwest::Error>> + Send + 'static,
        idle_timeout: Duration,
    ) -> Self {
        Self {
            inner: Box::pin(byte_stream),
            idle_deadline: Box::pin(tokio::time::sleep(idle_timeout)),
            idle_duration: idle_timeout,
            finished: false,
        }
    }
}

impl Stream for AudioChunkStream {
    type Item = Result<Bytes, UpstreamError>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        if self.finished {
            return Poll::Ready(None);
        }

        loop {
            match self.inner.as_mut().poll_next(cx) {
                Poll::Ready(Some(Ok(chunk))) => {
                    let new_deadline = tokio::time::Instant::now() + self.idle_duration;
                    self.idle_deadline.as_mut().reset(new_deadline);
                    if chunk.is_empty() {
                        continue;
                    }
                    return Poll::Ready(Some(Ok(chunk)));
                }
                Poll::Ready(Some(Err(e))) => {
                    self.finished = true;
                    return Poll::Ready(Some(Err(UpstreamError::Network {
                        service: SERVICE,
                        message: e.to_string(),
                    })));
                }
                Poll::Ready(None) => {
                    self.finished = true;
                    return Poll::Ready(None);
                }
                Poll::Pending => {
                    if self.idle_deadline.as_mut().poll(cx).is_ready() {
                        self.finished = true;
                        return Poll::Ready(Some(Err(UpstreamError::Timeout {
                            service: SERVICE,
                            after: self.idle_duration,
                        })));
                    }
                    return Poll::Pending;
                }
            }
        }
    }
}
