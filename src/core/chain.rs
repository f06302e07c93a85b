//! 重定向链路簿记 (Redirect Bookkeeping)
//!
//! 记录一条链路上每一跳的来源 URL 与触发原因，并执行全局次数上限与链路 TTL 两道限制。

use std::fmt;

use serde::{Serialize, Serializer};
use url::Url;

use crate::core::error::{Result, SpiderError};

/// 触发一次跳转的原因
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RedirectReason {
    /// HTTP 3xx 状态码
    Status(u16),
    /// HTML `<meta http-equiv="refresh">`
    MetaRefresh,
}

impl RedirectReason {
    pub const META_REFRESH_TOKEN: &'static str = "meta refresh";
}

impl fmt::Display for RedirectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RedirectReason::Status(code) => write!(f, "{}", code),
            RedirectReason::MetaRefresh => f.write_str(Self::META_REFRESH_TOKEN),
        }
    }
}

impl Serialize for RedirectReason {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            RedirectReason::Status(code) => serializer.serialize_u16(*code),
            RedirectReason::MetaRefresh => serializer.serialize_str(Self::META_REFRESH_TOKEN),
        }
    }
}

/// 链路限制参数
#[derive(Debug, Clone, Copy)]
pub struct ChainLimits {
    pub max_times: u32,
    pub ttl_enabled: bool,
}

impl Default for ChainLimits {
    fn default() -> Self {
        Self {
            max_times: 20,
            ttl_enabled: true,
        }
    }
}

/// 链路状态，随请求元数据逐跳复制
///
/// 不变式：`urls.len() == reasons.len() == times`。
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RedirectContext {
    pub times: u32,
    /// 缺省时按 `max_times` 计
    pub ttl: Option<u32>,
    pub urls: Vec<String>,
    pub reasons: Vec<RedirectReason>,
}

impl RedirectContext {
    /// 以指定 TTL 开启一条链路
    pub fn with_ttl(ttl: u32) -> Self {
        Self {
            ttl: Some(ttl),
            ..Self::default()
        }
    }

    /// 推进一跳，返回下一跳的链路状态
    ///
    /// 超出次数上限或 TTL 耗尽时返回 [`SpiderError::RedirectLimitExceeded`]。
    pub fn advance(&self, from: &Url, reason: RedirectReason, limits: ChainLimits) -> Result<Self> {
        let times = self.times + 1;
        let exceeded = || SpiderError::RedirectLimitExceeded {
            url: from.to_string(),
            times,
        };

        if times > limits.max_times {
            return Err(exceeded());
        }

        let ttl = if limits.ttl_enabled {
            let remaining = self.ttl.unwrap_or(limits.max_times);
            if remaining == 0 {
                return Err(exceeded());
            }
            Some(remaining - 1)
        } else {
            self.ttl
        };

        let mut urls = self.urls.clone();
        urls.push(from.to_string());
        let mut reasons = self.reasons.clone();
        reasons.push(reason);

        Ok(Self {
            times,
            ttl,
            urls,
            reasons,
        })
    }
}
