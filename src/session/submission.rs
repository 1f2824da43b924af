//! 提交控制：用户输入 -> 本地回显 -> 双工发送或降级请求
//!
//! 同一时刻只允许一个请求在途；空白输入与在途期间的提交静默忽略（输入框保持不变）。

use crate::core::ChatError;
use crate::protocol::{InboundEvent, OutboundRequest};
use crate::reconcile::{ChatView, ReconciliationEngine};
use crate::session::ChatContext;
use crate::transcript::MessageEntry;
use crate::transport::{ConnectionState, DuplexLink};

/// 降级失败时追加的默认提示
pub const DEFAULT_ERROR_TEXT: &str = "发送消息时出错，请稍后重试。";

/// 本次提交的派发方式
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Dispatch {
    /// 已通过双工通道入队，回复经入站通道到达
    Duplex,
    /// 需由调用方执行降级请求，并把结果交回 complete_fallback
    Fallback(OutboundRequest),
}

#[derive(Debug, Clone)]
pub struct SubmissionController {
    error_text: String,
}

impl Default for SubmissionController {
    fn default() -> Self {
        Self::new(DEFAULT_ERROR_TEXT)
    }
}

impl SubmissionController {
    pub fn new(error_text: impl Into<String>) -> Self {
        Self {
            error_text: error_text.into(),
        }
    }

    pub fn error_text(&self) -> &str {
        &self.error_text
    }

    /// 提交 input；被拒绝时返回 None 且不清空 input，否则派发后清空 input
    pub fn submit(
        &self,
        ctx: &mut ChatContext,
        input: &mut String,
        link: &dyn DuplexLink,
        view: &mut dyn ChatView,
    ) -> Option<Dispatch> {
        let text = input.trim();
        if text.is_empty() {
            return None;
        }
        if ctx.in_flight {
            tracing::debug!("request already in flight, submit ignored");
            return None;
        }

        let echo = MessageEntry::user(ctx.ids.next("user"), text);
        let echo_id = echo.id.clone();
        ctx.transcript.push(echo);
        if let Some(entry) = ctx.transcript.get(&echo_id) {
            view.on_entry_created(entry);
        }

        // transcript 中除了刚追加的回显还有别的条目 => 非首轮
        let request = OutboundRequest::new(text, ctx.transcript.len() > 1);
        ctx.begin_request(view);

        let dispatch = if link.state() == ConnectionState::Open {
            match link.send(&request) {
                Ok(()) => Dispatch::Duplex,
                Err(e) => {
                    tracing::warn!("duplex send failed ({}), using fallback", e);
                    Dispatch::Fallback(request)
                }
            }
        } else {
            Dispatch::Fallback(request)
        };

        let via = match dispatch {
            Dispatch::Duplex => "duplex",
            Dispatch::Fallback(_) => "fallback",
        };
        tracing::info!(id = %echo_id, via, "message submitted");

        input.clear();
        Some(dispatch)
    }

    /// 降级请求完成：成功则按普通入站事件对账，失败则释放守卫并追加错误提示
    pub fn complete_fallback(
        &self,
        ctx: &mut ChatContext,
        engine: &ReconciliationEngine,
        result: Result<InboundEvent, ChatError>,
        view: &mut dyn ChatView,
    ) {
        match result {
            Ok(event) => {
                if engine.apply(ctx, event.finalized(), view).is_none() {
                    self.fail(ctx, view);
                }
            }
            Err(e) => {
                tracing::warn!("fallback request failed: {}", e);
                self.fail(ctx, view);
            }
        }
    }

    fn fail(&self, ctx: &mut ChatContext, view: &mut dyn ChatView) {
        ctx.finish_request(view);
        let notice = MessageEntry::notice(ctx.ids.next("error"), self.error_text.as_str());
        let notice_id = notice.id.clone();
        ctx.transcript.push(notice);
        if let Some(entry) = ctx.transcript.get(&notice_id) {
            view.on_entry_created(entry);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;
    use crate::reconcile::{NullView, RecordingView, ViewEvent};
    use crate::transcript::Role;

    /// 记录发送内容的假双工通道
    struct FakeLink {
        state: ConnectionState,
        fail_send: bool,
        sent: Mutex<Vec<OutboundRequest>>,
    }

    impl FakeLink {
        fn new(state: ConnectionState) -> Self {
            Self {
                state,
                fail_send: false,
                sent: Mutex::new(Vec::new()),
            }
        }

        fn sent(&self) -> Vec<OutboundRequest> {
            self.sent.lock().unwrap().clone()
        }
    }

    impl DuplexLink for FakeLink {
        fn state(&self) -> ConnectionState {
            self.state
        }

        fn send(&self, request: &OutboundRequest) -> Result<(), ChatError> {
            if self.fail_send {
                return Err(ChatError::NotConnected);
            }
            self.sent.lock().unwrap().push(request.clone());
            Ok(())
        }
    }

    #[test]
    fn test_submit_echoes_and_sends_over_duplex() {
        let controller = SubmissionController::default();
        let mut ctx = ChatContext::new();
        let link = FakeLink::new(ConnectionState::Open);
        let mut input = "  hello  ".to_string();

        let dispatch = controller.submit(&mut ctx, &mut input, &link, &mut NullView);

        assert_eq!(dispatch, Some(Dispatch::Duplex));
        assert!(input.is_empty());
        assert!(ctx.in_flight);
        assert!(ctx.loading);
        let echo = &ctx.transcript.entries()[0];
        assert_eq!(echo.role, Role::User);
        assert_eq!(echo.content, "hello");
        assert!(!echo.streaming);
        assert!(echo.id.starts_with("user-"));
        assert_eq!(link.sent(), vec![OutboundRequest::new("hello", false)]);
    }

    #[test]
    fn test_double_submit_is_guarded() {
        let controller = SubmissionController::default();
        let mut ctx = ChatContext::new();
        let link = FakeLink::new(ConnectionState::Open);

        let mut first = "one".to_string();
        let mut second = "two".to_string();
        assert!(controller
            .submit(&mut ctx, &mut first, &link, &mut NullView)
            .is_some());
        assert!(controller
            .submit(&mut ctx, &mut second, &link, &mut NullView)
            .is_none());

        assert_eq!(ctx.transcript.len(), 1);
        assert_eq!(link.sent().len(), 1);
        assert_eq!(second, "two");
    }

    #[test]
    fn test_whitespace_input_is_ignored() {
        let controller = SubmissionController::default();
        let mut ctx = ChatContext::new();
        let link = FakeLink::new(ConnectionState::Open);
        let mut input = "  \n\t ".to_string();

        assert!(controller
            .submit(&mut ctx, &mut input, &link, &mut NullView)
            .is_none());
        assert!(ctx.transcript.is_empty());
        assert!(!ctx.in_flight);
        assert_eq!(input, "  \n\t ");
    }

    #[test]
    fn test_resume_flag_after_first_turn() {
        let controller = SubmissionController::default();
        let engine = ReconciliationEngine::new();
        let mut ctx = ChatContext::new();
        let link = FakeLink::new(ConnectionState::Open);

        let mut input = "first".to_string();
        controller.submit(&mut ctx, &mut input, &link, &mut NullView);
        engine.apply(
            &mut ctx,
            InboundEvent::assistant("r1", "reply").with_streaming(false),
            &mut NullView,
        );
        let mut input = "second".to_string();
        controller.submit(&mut ctx, &mut input, &link, &mut NullView);

        let sent = link.sent();
        assert!(!sent[0].resume);
        assert!(sent[1].resume);
    }

    #[test]
    fn test_closed_link_uses_fallback() {
        let controller = SubmissionController::default();
        let mut ctx = ChatContext::new();
        let link = FakeLink::new(ConnectionState::Connecting);
        let mut input = "hello".to_string();

        let dispatch = controller.submit(&mut ctx, &mut input, &link, &mut NullView);

        assert_eq!(
            dispatch,
            Some(Dispatch::Fallback(OutboundRequest::new("hello", false)))
        );
        assert!(link.sent().is_empty());
        assert!(input.is_empty());
    }

    #[test]
    fn test_failed_duplex_send_falls_back() {
        let controller = SubmissionController::default();
        let mut ctx = ChatContext::new();
        let mut link = FakeLink::new(ConnectionState::Open);
        link.fail_send = true;
        let mut input = "hello".to_string();

        let dispatch = controller.submit(&mut ctx, &mut input, &link, &mut NullView);
        assert!(matches!(dispatch, Some(Dispatch::Fallback(_))));
    }

    #[test]
    fn test_fallback_success_finalizes_entry() {
        let controller = SubmissionController::default();
        let engine = ReconciliationEngine::new();
        let mut ctx = ChatContext::new();
        let link = FakeLink::new(ConnectionState::Closed);
        let mut input = "hello".to_string();
        controller.submit(&mut ctx, &mut input, &link, &mut NullView);

        let response = InboundEvent {
            id: None,
            message: Some("hi".into()),
            is_user: false,
            streaming: None,
            side_content: None,
        };
        controller.complete_fallback(&mut ctx, &engine, Ok(response), &mut NullView);

        assert!(!ctx.in_flight);
        assert_eq!(ctx.transcript.len(), 2);
        let reply = &ctx.transcript.entries()[1];
        assert_eq!(reply.content, "hi");
        assert_eq!(reply.role, Role::Assistant);
        assert!(!reply.streaming);
    }

    #[test]
    fn test_fallback_failure_appends_error_entry() {
        let controller = SubmissionController::new("boom");
        let engine = ReconciliationEngine::new();
        let mut ctx = ChatContext::new();
        let link = FakeLink::new(ConnectionState::Closed);
        let mut view = RecordingView::new();
        let mut input = "hello".to_string();
        controller.submit(&mut ctx, &mut input, &link, &mut view);

        controller.complete_fallback(
            &mut ctx,
            &engine,
            Err(ChatError::MalformedEvent("bad body".into())),
            &mut view,
        );

        assert!(!ctx.in_flight);
        assert!(!ctx.loading);
        assert_eq!(ctx.transcript.len(), 2);
        assert_eq!(ctx.transcript.entries()[0].content, "hello");
        let notice = &ctx.transcript.entries()[1];
        assert_eq!(notice.content, "boom");
        assert_eq!(notice.role, Role::Assistant);
        assert!(!notice.streaming);
        assert!(notice.side_panel.is_none());
        assert!(notice.id.starts_with("error-"));
        assert_eq!(view.count(&ViewEvent::Loading(true)), 1);
        assert_eq!(view.count(&ViewEvent::Loading(false)), 1);

        // 守卫已释放，可以再次提交
        let mut input = "retry".to_string();
        assert!(controller
            .submit(&mut ctx, &mut input, &link, &mut view)
            .is_some());
    }
}
