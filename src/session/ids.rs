//! 客户端 id 生成：单调毫秒时钟 + 角色前缀（user- / msg- / error-）

use chrono::Utc;

/// 同一毫秒内多次调用时自动 +1，保证不重复
#[derive(Debug, Default)]
pub struct IdGenerator {
    last: i64,
}

impl IdGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn next(&mut self, tag: &str) -> String {
        let now = Utc::now().timestamp_millis();
        self.last = now.max(self.last + 1);
        format!("{}-{}", tag, self.last)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ids_are_unique_and_tagged() {
        let mut ids = IdGenerator::new();
        let a = ids.next("user");
        let b = ids.next("user");
        let c = ids.next("msg");
        assert!(a.starts_with("user-"));
        assert!(c.starts_with("msg-"));
        assert_ne!(a, b);
        assert_ne!(b.trim_start_matches("user-"), c.trim_start_matches("msg-"));
    }
}
