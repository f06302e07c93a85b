//! 重定向后续请求的公共构造逻辑
//!
//! 两种重定向策略共用：请求头过滤、方法/请求体改写、代理状态的保留或重置、链路簿记。

pub mod meta_refresh;
pub mod redirect;

pub use meta_refresh::MetaRefreshPolicy;
pub use redirect::RedirectPolicy;

use std::sync::Arc;

use bytes::Bytes;
use http::Method;
use http::header::{CONTENT_LENGTH, CONTENT_TYPE, PROXY_AUTHORIZATION};
use tracing::debug;
use url::Url;

use crate::core::chain::{ChainLimits, RedirectReason};
use crate::core::config::RedirectConfig;
use crate::core::error::Result;
use crate::core::model::{ProxyContext, Request};
use crate::network::security::forwardable_headers;

/// 方法与请求体的改写方式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum MethodRewrite {
    /// 保留方法与请求体 (301/307/308)
    Preserve,
    /// GET/HEAD 保留方法，其余方法改为 GET；
    /// 请求体与 `Content-Type`/`Content-Length` 一律丢弃
    UsingGet,
}

/// 构造后续请求（尚未计入链路）
pub(crate) fn build_redirect_request(
    source: &Arc<Request>,
    target: Url,
    rewrite: MethodRewrite,
) -> Request {
    let mut headers = forwardable_headers(&source.headers, &source.url, &target);
    let mut method = source.method.clone();
    let mut body = source.body.clone();

    if rewrite == MethodRewrite::UsingGet {
        if method != Method::GET && method != Method::HEAD {
            method = Method::GET;
        }
        headers.remove(CONTENT_TYPE);
        headers.remove(CONTENT_LENGTH);
        body = Bytes::new();
    }

    let mut meta = source.meta.clone();

    // 按协议选出的代理在协议变化后失效，交由代理策略重新选择
    let scheme_changed = source.url.scheme() != target.scheme();
    let proxy_reset = meta.proxy.scheme_proxy && scheme_changed;
    if proxy_reset {
        debug!("协议变化 {} -> {}，重置代理状态", source.url.scheme(), target.scheme());
        meta.proxy = ProxyContext::default();
    }

    // 只有代理未变且凭据来源已知时才沿用 Proxy-Authorization
    if proxy_reset || meta.proxy.auth_proxy.is_none() {
        headers.remove(PROXY_AUTHORIZATION);
    }

    Request {
        method,
        url: target,
        headers,
        body,
        meta,
        priority: source.priority,
        dont_filter: source.dont_filter,
        previous: Some(Arc::clone(source)),
    }
}

/// 计入链路并调整优先级
pub(crate) fn finish_redirect(
    source: &Request,
    mut redirected: Request,
    reason: RedirectReason,
    config: &RedirectConfig,
) -> Result<Request> {
    let limits = ChainLimits {
        max_times: config.max_times,
        ttl_enabled: config.ttl_enabled,
    };
    redirected.meta.redirect = source.meta.redirect.advance(&source.url, reason, limits)?;
    redirected.priority = source.priority.saturating_add(config.priority_adjust);

    debug!(
        "重定向 ({}): {} -> {} [第 {} 跳]",
        reason, source.url, redirected.url, redirected.meta.redirect.times
    );
    Ok(redirected)
}

#[cfg(test)]
mod tests {
    use super::MethodRewrite::{Preserve, UsingGet};
    use super::*;
    use crate::core::headers::Headers;

    fn target(s: &str) -> Url {
        Url::parse(s).unwrap()
    }

    fn source(method: Method, url: &str) -> Arc<Request> {
        Arc::new(
            Request::new(method, Url::parse(url).unwrap())
                .with_header("Content-Type", "text/plain")
                .with_header("Content-Length", "4")
                .with_body("test"),
        )
    }

    #[test]
    fn using_get_rewrites_post() {
        let src = source(Method::POST, "http://www.example.com/302");
        let req = build_redirect_request(&src, target("http://www.example.com/b"), UsingGet);
        assert_eq!(req.method, Method::GET);
        assert!(req.body.is_empty());
        assert!(!req.headers.contains("content-type"));
        assert!(!req.headers.contains("content-length"));
        assert!(Arc::ptr_eq(req.previous.as_ref().unwrap(), &src));
    }

    #[test]
    fn preserve_keeps_everything() {
        let src = source(Method::POST, "http://www.example.com/307");
        let req = build_redirect_request(&src, target("http://www.example.com/b"), Preserve);
        assert_eq!(req.method, Method::POST);
        assert_eq!(req.body, Bytes::from_static(b"test"));
        assert_eq!(req.headers, src.headers);
    }

    #[test]
    fn head_without_body_keeps_headers() {
        let src = Arc::new(
            Request::new(Method::HEAD, target("http://www.example.com/302"))
                .with_header("Accept", "*/*"),
        );
        let req = build_redirect_request(&src, target("http://www.example.com/b"), UsingGet);
        assert_eq!(req.method, Method::HEAD);
        assert_eq!(req.headers, Headers::from_pairs([("Accept", "*/*")]));
    }

    #[test]
    fn using_get_always_drops_body_headers() {
        let src = Arc::new(
            Request::get(target("http://www.example.com/302"))
                .with_header("Content-Type", "text/plain")
                .with_header("Content-Length", "0")
                .with_header("Accept", "*/*"),
        );
        let req = build_redirect_request(&src, target("http://www.example.com/b"), UsingGet);
        assert_eq!(req.method, Method::GET);
        assert!(!req.headers.contains("content-type"));
        assert!(!req.headers.contains("content-length"));
        assert_eq!(req.headers, Headers::from_pairs([("Accept", "*/*")]));
    }

    #[test]
    fn untracked_proxy_authorization_is_dropped() {
        let src = Arc::new(
            Request::get(Url::parse("http://example.com").unwrap())
                .with_header("Proxy-Authorization", "Basic YTo=")
                .with_proxy(ProxyContext::pinned("https://a.example")),
        );
        let req = build_redirect_request(&src, target("http://example.com/a"), Preserve);
        assert!(!req.headers.contains(PROXY_AUTHORIZATION));
        assert_eq!(req.meta.proxy.proxy.as_deref(), Some("https://a.example"));
    }

    #[test]
    fn finish_applies_priority_and_history() {
        let src = source(Method::GET, "http://a.com");
        let cfg = RedirectConfig::default();
        let req = build_redirect_request(&src, target("http://a.com/redirected"), UsingGet);
        let req = finish_redirect(&src, req, RedirectReason::Status(302), &cfg).unwrap();
        assert_eq!(req.priority, src.priority + 2);
        assert_eq!(req.meta.redirect.urls, ["http://a.com/"]);
        assert_eq!(req.meta.redirect.reasons, [RedirectReason::Status(302)]);
    }

    #[test]
    fn priority_saturates_at_bounds() {
        let cfg = RedirectConfig::default();
        let top = Arc::new(Request::get(target("http://a.com")).with_priority(i32::MAX));
        let req = build_redirect_request(&top, target("http://a.com/r"), UsingGet);
        let req = finish_redirect(&top, req, RedirectReason::Status(302), &cfg).unwrap();
        assert_eq!(req.priority, i32::MAX);

        let lowered = RedirectConfig::builder().priority_adjust(-1).build();
        let bottom = Arc::new(Request::get(target("http://a.com")).with_priority(i32::MIN));
        let req = build_redirect_request(&bottom, target("http://a.com/r"), Preserve);
        let req = finish_redirect(&bottom, req, RedirectReason::Status(301), &lowered).unwrap();
        assert_eq!(req.priority, i32::MIN);
    }
}
