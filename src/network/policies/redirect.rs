use std::sync::Arc;

use http::header::LOCATION;
use http::StatusCode;
use tracing::debug;

use crate::core::chain::RedirectReason;
use crate::core::config::RedirectConfig;
use crate::core::error::Result;
use crate::core::model::{Response, SpiderContext};
use crate::interfaces::policy::{NetworkPolicy, PolicyResult};
use crate::network::origin::is_http;
use crate::network::url::resolve_location;

use super::{MethodRewrite, build_redirect_request, finish_redirect};

/// HTTP 3xx 重定向处理策略
#[derive(Debug, Default)]
pub struct RedirectPolicy {
    config: RedirectConfig,
}

impl RedirectPolicy {
    pub fn new(config: RedirectConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &RedirectConfig {
        &self.config
    }

    fn is_redirect_status(status: StatusCode) -> bool {
        matches!(
            status,
            StatusCode::MOVED_PERMANENTLY
                | StatusCode::FOUND
                | StatusCode::SEE_OTHER
                | StatusCode::TEMPORARY_REDIRECT
                | StatusCode::PERMANENT_REDIRECT
        )
    }
}

impl NetworkPolicy for RedirectPolicy {
    fn name(&self) -> &str {
        "redirect"
    }

    fn check(&self, resp: Response, spider: &SpiderContext) -> Result<PolicyResult> {
        let request = Arc::clone(&resp.request);
        let status = resp.status;

        if !self.config.enabled
            || request.meta.dont_redirect
            || request.meta.handle_httpstatus.covers(status)
            || spider.handles(status)
            || !Self::is_redirect_status(status)
        {
            return Ok(PolicyResult::Pass(resp));
        }

        if !is_http(&request.url) {
            debug!("非 HTTP(S) 请求不做重定向: {}", request.url);
            return Ok(PolicyResult::Pass(resp));
        }

        let Some(location) = resp.headers.get(LOCATION) else {
            return Ok(PolicyResult::Pass(resp));
        };

        let target = match resolve_location(location.as_bytes(), &request.url) {
            Ok(url) => url,
            Err(e) => {
                debug!("忽略无法解析的重定向目标: {}", e);
                return Ok(PolicyResult::Pass(resp));
            }
        };

        let rewrite = match status {
            StatusCode::FOUND | StatusCode::SEE_OTHER => MethodRewrite::UsingGet,
            _ => MethodRewrite::Preserve,
        };

        let redirected = build_redirect_request(&request, target, rewrite);
        let reason = RedirectReason::Status(status.as_u16());
        let redirected = finish_redirect(&request, redirected, reason, &self.config)?;
        Ok(PolicyResult::Redirect(redirected))
    }
}
