use std::sync::Arc;

use tracing::debug;

use crate::core::chain::RedirectReason;
use crate::core::config::{MetaRefreshConfig, RedirectConfig};
use crate::core::error::Result;
use crate::core::model::{Response, SpiderContext};
use crate::interfaces::policy::{NetworkPolicy, PolicyResult};
use crate::network::html::extract_meta_refresh;
use crate::network::origin::is_http;
use crate::network::url::resolve_text;

use super::{MethodRewrite, build_redirect_request, finish_redirect};

/// HTML meta refresh 跳转策略
#[derive(Debug, Default)]
pub struct MetaRefreshPolicy {
    config: MetaRefreshConfig,
    redirect: RedirectConfig,
}

impl MetaRefreshPolicy {
    /// `redirect` 提供链路上限与优先级调整，与 HTTP 重定向共用同一套参数
    pub fn new(config: MetaRefreshConfig, redirect: RedirectConfig) -> Self {
        Self { config, redirect }
    }
}

impl NetworkPolicy for MetaRefreshPolicy {
    fn name(&self) -> &str {
        "meta_refresh"
    }

    fn check(&self, resp: Response, _spider: &SpiderContext) -> Result<PolicyResult> {
        let request = Arc::clone(&resp.request);

        if !self.config.enabled
            || request.meta.dont_redirect
            || !is_http(&request.url)
            || !resp.is_html()
        {
            return Ok(PolicyResult::Pass(resp));
        }

        let found = extract_meta_refresh(&resp.text(), &self.config.ignore_tags);
        let Some((refresh, base_href)) = found else {
            return Ok(PolicyResult::Pass(resp));
        };

        if refresh.interval >= self.config.max_delay {
            debug!("meta refresh 延迟 {}s 过长，不跳转: {}", refresh.interval, request.url);
            return Ok(PolicyResult::Pass(resp));
        }

        // <base href> 本身也相对请求 URL 解析
        let base = base_href
            .and_then(|href| resolve_text(&href, &request.url).ok())
            .unwrap_or_else(|| request.url.clone());

        let target = match resolve_text(&refresh.url, &base) {
            Ok(url) => url,
            Err(e) => {
                debug!("忽略无法解析的 meta refresh 目标: {}", e);
                return Ok(PolicyResult::Pass(resp));
            }
        };

        let redirected = build_redirect_request(&request, target, MethodRewrite::UsingGet);
        let redirected =
            finish_redirect(&request, redirected, RedirectReason::MetaRefresh, &self.redirect)?;
        Ok(PolicyResult::Redirect(redirected))
    }
}
