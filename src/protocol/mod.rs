//! 协议层：出站请求、入站事件、健康检查的线上格式与解码

mod message;

pub use message::{
    decode_event, HealthStatus, InboundEvent, OutboundRequest, SideContent, SideContentKind,
};
