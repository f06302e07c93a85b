//! 错误处理体系 (Error Handling System)
//!
//! 定义重定向链路相关的错误类型以及全局 Result 别名。

use thiserror::Error;

/// 全局错误定义 (Spider Domain Errors)
#[derive(Error, Debug)]
pub enum SpiderError {
    /// 跳转次数或 TTL 耗尽，调度器应丢弃整条链路
    #[error("Redirect limit exceeded after {times} hops: {url}")]
    RedirectLimitExceeded { url: String, times: u32 },

    /// 跳转目标无法解析为可用的绝对 URL
    #[error("Malformed redirect target: {0}")]
    MalformedRedirectTarget(String),

    #[error("Invalid proxy: {0}")]
    InvalidProxy(String),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("Parsing error: {0}")]
    Parse(String),
}

/// 全局 Result 别名
pub type Result<T> = std::result::Result<T, SpiderError>;

impl SpiderError {
    /// 是否意味着丢弃整条重定向链路
    ///
    /// 与普通的"不跳转"结果区分开，便于调度器单独统计被丢弃的链路。
    pub fn is_chain_drop(&self) -> bool {
        matches!(self, SpiderError::RedirectLimitExceeded { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_limit_errors_drop_the_chain() {
        let limit = SpiderError::RedirectLimitExceeded {
            url: "http://example.com/loop".into(),
            times: 21,
        };
        assert!(limit.is_chain_drop());
        assert!(limit.to_string().contains("21 hops"));

        let malformed = SpiderError::MalformedRedirectTarget(String::new());
        assert!(!malformed.is_chain_drop());
    }
}
