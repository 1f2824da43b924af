//! 聊天消息协议定义
//!
//! 出站：`{ "message", "resume" }`；入站：服务端推送的流式事件（WebSocket 帧或 /api/chat 响应体）。
//! 入站 JSON 在边界处解码为 InboundEvent，thoughts / deliberations 两个字段统一成 SideContent。

use serde::{Deserialize, Serialize};

use crate::core::ChatError;

/// 出站请求（双工 send 与降级 POST 共用同一个 body）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutboundRequest {
    pub message: String,
    /// 非首轮对话时为 true
    pub resume: bool,
}

impl OutboundRequest {
    pub fn new(message: impl Into<String>, resume: bool) -> Self {
        Self {
            message: message.into(),
            resume,
        }
    }

    pub fn to_json(&self) -> Result<String, ChatError> {
        Ok(serde_json::to_string(self)?)
    }
}

/// 侧栏内容来源字段
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SideContentKind {
    /// `thoughts`：思考过程，整体显示
    Thoughts,
    /// `deliberations`：旧版熟考过程，逐步编号显示
    Deliberations,
}

/// 侧栏内容：有序步骤 + 来源字段
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SideContent {
    pub kind: SideContentKind,
    pub steps: Vec<String>,
}

impl SideContent {
    pub fn thoughts(steps: Vec<String>) -> Self {
        Self {
            kind: SideContentKind::Thoughts,
            steps,
        }
    }

    pub fn deliberations(steps: Vec<String>) -> Self {
        Self {
            kind: SideContentKind::Deliberations,
            steps,
        }
    }

    /// 两个字段同时出现时，取第一个非空的（thoughts 优先）；空数组视同缺省
    pub fn normalize(
        thoughts: Option<Vec<String>>,
        deliberations: Option<Vec<String>>,
    ) -> Option<Self> {
        match (thoughts, deliberations) {
            (Some(t), _) if !t.is_empty() => Some(Self::thoughts(t)),
            (_, Some(d)) if !d.is_empty() => Some(Self::deliberations(d)),
            _ => None,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }
}

/// 线上格式（所有字段可缺省，缺省含义在 decode_event 中决定）
#[derive(Debug, Deserialize)]
struct WireEvent {
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    is_user: Option<bool>,
    #[serde(default)]
    is_streaming: Option<bool>,
    #[serde(default)]
    thoughts: Option<Vec<String>>,
    #[serde(default)]
    deliberations: Option<Vec<String>>,
    /// 对账不使用，仅为容忍任意类型
    #[serde(default)]
    #[allow(dead_code)]
    timestamp: Option<serde_json::Value>,
}

/// 解码后的入站事件（瞬时，不存储）
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundEvent {
    pub id: Option<String>,
    pub message: Option<String>,
    pub is_user: bool,
    /// None / Some(true) = 仍在流式；Some(false) = 该 id 的终止信号
    pub streaming: Option<bool>,
    pub side_content: Option<SideContent>,
}

impl InboundEvent {
    pub fn assistant(id: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            id: Some(id.into()),
            message: Some(message.into()),
            is_user: false,
            streaming: None,
            side_content: None,
        }
    }

    pub fn with_streaming(mut self, streaming: bool) -> Self {
        self.streaming = Some(streaming);
        self
    }

    pub fn with_side_content(mut self, side: SideContent) -> Self {
        self.side_content = Some(side);
        self
    }

    pub fn is_terminal(&self) -> bool {
        self.streaming == Some(false)
    }

    /// 非流式回合（降级响应）整体完成：强制 streaming = false
    pub fn finalized(mut self) -> Self {
        self.streaming = Some(false);
        self
    }

    /// id 与 message 都缺失的事件无法对账
    pub fn is_resolvable(&self) -> bool {
        self.id.is_some() || self.message.is_some()
    }
}

impl From<WireEvent> for InboundEvent {
    fn from(wire: WireEvent) -> Self {
        Self {
            id: wire.id.filter(|id| !id.is_empty()),
            message: wire.message,
            is_user: wire.is_user.unwrap_or(false),
            streaming: wire.is_streaming,
            side_content: SideContent::normalize(wire.thoughts, wire.deliberations),
        }
    }
}

/// 将一条原始 JSON 解码为 InboundEvent；无法解析或无法对账时返回错误（调用方丢弃并记录日志）
pub fn decode_event(raw: &str) -> Result<InboundEvent, ChatError> {
    let wire: WireEvent = serde_json::from_str(raw)?;
    let event = InboundEvent::from(wire);
    if !event.is_resolvable() {
        return Err(ChatError::MalformedEvent(
            "event carries neither id nor message".to_string(),
        ));
    }
    Ok(event)
}

/// `/api/health` 响应
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct HealthStatus {
    pub status: String,
    #[serde(default)]
    pub initialized: bool,
}

impl HealthStatus {
    pub fn is_ok(&self) -> bool {
        self.status.eq_ignore_ascii_case("ok")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_full_streaming_event() {
        let raw = r#"{"id":"r1","message":"Thinking","is_user":false,"is_streaming":true,"thoughts":["step1"],"timestamp":1712345678.5}"#;
        let event = decode_event(raw).unwrap();
        assert_eq!(event.id.as_deref(), Some("r1"));
        assert_eq!(event.message.as_deref(), Some("Thinking"));
        assert!(!event.is_user);
        assert_eq!(event.streaming, Some(true));
        assert!(!event.is_terminal());
        assert_eq!(
            event.side_content,
            Some(SideContent::thoughts(vec!["step1".to_string()]))
        );
    }

    #[test]
    fn test_decode_defaults_when_fields_missing() {
        let event = decode_event(r#"{"message":"hi"}"#).unwrap();
        assert_eq!(event.id, None);
        assert!(!event.is_user);
        assert_eq!(event.streaming, None);
        assert_eq!(event.side_content, None);
    }

    #[test]
    fn test_decode_null_is_user_defaults_to_false() {
        let event = decode_event(r#"{"id":"a","message":"x","is_user":null}"#).unwrap();
        assert!(!event.is_user);
    }

    #[test]
    fn test_decode_rejects_unresolvable_event() {
        let err = decode_event(r#"{"is_user":false,"is_streaming":false}"#).unwrap_err();
        assert!(matches!(err, ChatError::MalformedEvent(_)));
    }

    #[test]
    fn test_decode_empty_id_counts_as_missing() {
        let event = decode_event(r#"{"id":"","message":"x"}"#).unwrap();
        assert_eq!(event.id, None);
        assert!(matches!(
            decode_event(r#"{"id":""}"#),
            Err(ChatError::MalformedEvent(_))
        ));
    }

    #[test]
    fn test_decode_rejects_invalid_json() {
        assert!(matches!(decode_event("not json"), Err(ChatError::Json(_))));
        assert!(matches!(decode_event("[1,2,3]"), Err(ChatError::Json(_))));
    }

    #[test]
    fn test_deliberations_legacy_alias() {
        let event =
            decode_event(r#"{"id":"a","message":"x","deliberations":["d1","d2"]}"#).unwrap();
        let side = event.side_content.unwrap();
        assert_eq!(side.kind, SideContentKind::Deliberations);
        assert_eq!(side.steps, vec!["d1", "d2"]);
    }

    #[test]
    fn test_thoughts_preferred_over_deliberations() {
        let event = decode_event(
            r#"{"id":"a","message":"x","thoughts":["t"],"deliberations":["d"]}"#,
        )
        .unwrap();
        assert_eq!(event.side_content.unwrap().kind, SideContentKind::Thoughts);
    }

    #[test]
    fn test_empty_thoughts_fall_through_to_deliberations() {
        let event =
            decode_event(r#"{"id":"a","message":"x","thoughts":[],"deliberations":["d"]}"#)
                .unwrap();
        assert_eq!(
            event.side_content.unwrap().kind,
            SideContentKind::Deliberations
        );

        let event = decode_event(r#"{"id":"a","message":"x","thoughts":[]}"#).unwrap();
        assert_eq!(event.side_content, None);
    }

    #[test]
    fn test_outbound_request_json_shape() {
        let json = OutboundRequest::new("hello", true).to_json().unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["message"], "hello");
        assert_eq!(value["resume"], true);
        assert_eq!(value.as_object().unwrap().len(), 2);
    }

    #[test]
    fn test_finalized_forces_terminal() {
        let event = decode_event(r#"{"message":"hi","is_user":false}"#)
            .unwrap()
            .finalized();
        assert!(event.is_terminal());
    }

    #[test]
    fn test_health_status() {
        let health: HealthStatus =
            serde_json::from_str(r#"{"status":"ok","initialized":true}"#).unwrap();
        assert!(health.is_ok());
        assert!(health.initialized);
    }
}
