//! 应用配置：从 config/default.toml 与环境变量加载
//!
//! 加载顺序：先读 TOML 文件，再用环境变量 `MYRDAL__*` 覆盖（双下划线表示嵌套，如 `MYRDAL__SERVER__BASE_URL=http://host:8000`）。

use std::path::PathBuf;

use serde::Deserialize;

use crate::session::DEFAULT_ERROR_TEXT;

/// 应用配置根（对应 config/default.toml 的顶层）
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerSection,
    pub transport: TransportSection,
    pub ui: UiSection,
    pub log: LogSection,
}

/// [server] 段：服务端地址与各端点路径
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerSection {
    /// HTTP 基地址，双工地址由其推导（http -> ws，https -> wss）
    pub base_url: String,
    /// 显式指定双工地址时覆盖推导结果
    pub ws_url: Option<String>,
    pub ws_path: String,
    pub chat_path: String,
    pub health_path: String,
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:8000".to_string(),
            ws_url: None,
            ws_path: "/ws/chat".to_string(),
            chat_path: "/api/chat".to_string(),
            health_path: "/api/health".to_string(),
        }
    }
}

impl ServerSection {
    fn base(&self) -> &str {
        self.base_url.trim_end_matches('/')
    }

    pub fn ws_url(&self) -> String {
        if let Some(url) = &self.ws_url {
            return url.clone();
        }
        let base = self.base();
        let ws_base = if let Some(rest) = base.strip_prefix("https://") {
            format!("wss://{}", rest)
        } else if let Some(rest) = base.strip_prefix("http://") {
            format!("ws://{}", rest)
        } else {
            base.to_string()
        };
        format!("{}{}", ws_base, self.ws_path)
    }

    pub fn chat_url(&self) -> String {
        format!("{}{}", self.base(), self.chat_path)
    }

    pub fn health_url(&self) -> String {
        format!("{}{}", self.base(), self.health_path)
    }
}

/// [transport] 段：重连间隔与降级请求超时（秒）
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TransportSection {
    /// 双工断开后的固定重连延迟
    pub reconnect_delay_secs: u64,
    pub request_timeout_secs: u64,
}

impl Default for TransportSection {
    fn default() -> Self {
        Self {
            reconnect_delay_secs: 3,
            request_timeout_secs: 120,
        }
    }
}

/// [ui] 段
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct UiSection {
    /// 降级请求失败时追加的提示文本
    pub error_text: String,
    /// 单条消息显示的最大字符数，超出折叠
    pub max_display_chars: usize,
}

impl Default for UiSection {
    fn default() -> Self {
        Self {
            error_text: DEFAULT_ERROR_TEXT.to_string(),
            max_display_chars: 4000,
        }
    }
}

/// [log] 段：TUI 占用终端，日志默认写文件
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LogSection {
    /// 为空时写 stderr
    pub file: Option<PathBuf>,
    pub level: String,
}

impl Default for LogSection {
    fn default() -> Self {
        Self {
            file: Some(PathBuf::from("myrdal-chat.log")),
            level: "info".to_string(),
        }
    }
}

/// 从 config 目录加载配置，环境变量 MYRDAL__* 可覆盖
///
/// 1. 按顺序查找 config/default.toml、../config/default.toml、default.toml，找到则作为第一源
/// 2. 若传入 config_path 且文件存在，则追加该文件（可覆盖前面的键）
/// 3. 最后叠加环境变量 MYRDAL__*（双下划线表示嵌套键）
pub fn load_config(config_path: Option<PathBuf>) -> Result<AppConfig, config::ConfigError> {
    let mut builder = config::Config::builder();

    let default_names = ["config/default", "../config/default", "default"];
    for name in default_names {
        let path = format!("{}.toml", name);
        if std::path::Path::new(&path).exists() {
            builder = builder.add_source(config::File::with_name(name).required(false));
            break;
        }
    }

    if let Some(ref path) = config_path {
        if path.exists() {
            builder = builder.add_source(config::File::from(path.clone()).required(false));
        }
    }

    builder = builder.add_source(
        config::Environment::with_prefix("MYRDAL")
            .separator("__")
            .try_parsing(true),
    );

    let c = builder.build()?;
    c.try_deserialize()
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    #[test]
    fn test_defaults() {
        let cfg = AppConfig::default();
        assert_eq!(cfg.transport.reconnect_delay_secs, 3);
        assert_eq!(cfg.server.ws_url(), "ws://127.0.0.1:8000/ws/chat");
        assert_eq!(cfg.server.chat_url(), "http://127.0.0.1:8000/api/chat");
        assert_eq!(cfg.server.health_url(), "http://127.0.0.1:8000/api/health");
        assert_eq!(cfg.ui.error_text, DEFAULT_ERROR_TEXT);
    }

    #[test]
    fn test_ws_url_scheme_mapping() {
        let server = ServerSection {
            base_url: "https://chat.example.com/".to_string(),
            ..ServerSection::default()
        };
        assert_eq!(server.ws_url(), "wss://chat.example.com/ws/chat");
        assert_eq!(server.chat_url(), "https://chat.example.com/api/chat");

        let server = ServerSection {
            ws_url: Some("ws://other:9000/stream".to_string()),
            ..ServerSection::default()
        };
        assert_eq!(server.ws_url(), "ws://other:9000/stream");
    }

    #[test]
    fn test_load_config_from_file() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            "[server]\nbase_url = \"http://10.0.0.5:8080\"\n\n[transport]\nreconnect_delay_secs = 7\n\n[ui]\nerror_text = \"oops\""
        )
        .unwrap();

        let cfg = load_config(Some(file.path().to_path_buf())).unwrap();
        assert_eq!(cfg.server.base_url, "http://10.0.0.5:8080");
        assert_eq!(cfg.server.ws_path, "/ws/chat");
        assert_eq!(cfg.transport.reconnect_delay_secs, 7);
        assert_eq!(cfg.transport.request_timeout_secs, 120);
        assert_eq!(cfg.ui.error_text, "oops");
        assert_eq!(cfg.log.level, "info");
    }
}
