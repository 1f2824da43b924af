//! HTTP 降级：双工通道不可用时，以一次 POST /api/chat 完成整轮对话
//!
//! 响应体按入站事件解码，并强制 streaming = false（非流式回合原子完成）。
//! 另提供 GET /api/health，用于启动时探测服务端是否就绪。

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;

use super::FallbackTransport;
use crate::core::ChatError;
use crate::protocol::{decode_event, HealthStatus, InboundEvent, OutboundRequest};

pub struct HttpFallback {
    client: Client,
    chat_url: String,
    health_url: String,
}

impl HttpFallback {
    pub fn new(
        chat_url: impl Into<String>,
        health_url: impl Into<String>,
        timeout_secs: u64,
    ) -> Result<Self, ChatError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()?;
        Ok(Self {
            client,
            chat_url: chat_url.into(),
            health_url: health_url.into(),
        })
    }

    pub fn chat_url(&self) -> &str {
        &self.chat_url
    }

    pub async fn health(&self) -> Result<HealthStatus, ChatError> {
        let status = self
            .client
            .get(&self.health_url)
            .send()
            .await?
            .error_for_status()?
            .json::<HealthStatus>()
            .await?;
        Ok(status)
    }
}

#[async_trait]
impl FallbackTransport for HttpFallback {
    async fn request(&self, request: &OutboundRequest) -> Result<InboundEvent, ChatError> {
        tracing::debug!(url = %self.chat_url, resume = request.resume, "fallback request");
        let body = self
            .client
            .post(&self.chat_url)
            .json(request)
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;
        Ok(decode_event(&body)?.finalized())
    }
}
