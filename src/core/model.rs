//! 请求 / 响应模型
//!
//! 原请求与原响应在整个重定向流程中不可变，每一跳都产生新的 [`Request`]。

use std::sync::Arc;

use bytes::Bytes;
use http::header::{CONTENT_TYPE, HeaderName, HeaderValue};
use http::{Method, StatusCode};
use serde::Serialize;
use tracing::warn;
use url::Url;

use crate::core::chain::RedirectContext;
use crate::core::headers::Headers;

/// 爬虫级别的处理上下文
///
/// 由调用方（Spider）声明自己处理哪些状态码，这些状态码不再被当作重定向。
#[derive(Debug, Clone, Default)]
pub struct SpiderContext {
    pub name: String,
    pub handle_httpstatus_list: Vec<u16>,
}

impl SpiderContext {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            handle_httpstatus_list: Vec::new(),
        }
    }

    pub fn with_handled(mut self, statuses: impl IntoIterator<Item = u16>) -> Self {
        self.handle_httpstatus_list.extend(statuses);
        self
    }

    pub fn handles(&self, status: StatusCode) -> bool {
        self.handle_httpstatus_list.contains(&status.as_u16())
    }
}

/// 单个请求声明自行处理的状态码
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct HandleStatus {
    pub list: Vec<u16>,
    pub all: bool,
}

impl HandleStatus {
    pub fn covers(&self, status: StatusCode) -> bool {
        self.all || self.list.contains(&status.as_u16())
    }
}

/// 代理选择状态
///
/// 由代理中间件写入，重定向策略只负责保留或重置。
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ProxyContext {
    /// 当前选用的代理（不含凭据）
    pub proxy: Option<String>,
    /// 请求显式要求直连
    pub direct: bool,
    /// `Proxy-Authorization` 头是针对哪个代理计算的
    pub auth_proxy: Option<String>,
    /// 代理来自按协议的全局规则，而非请求自身指定
    pub scheme_proxy: bool,
}

impl ProxyContext {
    /// 请求自身指定代理（可内嵌凭据）
    pub fn pinned(proxy: impl Into<String>) -> Self {
        Self {
            proxy: Some(proxy.into()),
            ..Self::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// 请求元数据
#[derive(Debug, Clone, Default)]
pub struct Meta {
    /// 冻结当前链路，两种重定向策略都不再生效
    pub dont_redirect: bool,
    pub handle_httpstatus: HandleStatus,
    pub redirect: RedirectContext,
    pub proxy: ProxyContext,
    /// 其他中间件的类型化状态，随元数据一并向后复制
    pub extensions: http::Extensions,
}

/// 抓取请求
#[derive(Debug, Clone)]
pub struct Request {
    pub method: Method,
    pub url: Url,
    pub headers: Headers,
    pub body: Bytes,
    pub meta: Meta,
    /// 数值越大越先调度
    pub priority: i32,
    pub dont_filter: bool,
    /// 产生本请求的上一跳请求
    pub previous: Option<Arc<Request>>,
}

impl Request {
    pub fn new(method: Method, url: Url) -> Self {
        Self {
            method,
            url,
            headers: Headers::new(),
            body: Bytes::new(),
            meta: Meta::default(),
            priority: 0,
            dont_filter: false,
            previous: None,
        }
    }

    pub fn get(url: Url) -> Self {
        Self::new(Method::GET, url)
    }

    /// 追加请求头，非法的键或值记录警告后忽略
    pub fn with_header<K, V>(mut self, name: K, value: V) -> Self
    where
        HeaderName: TryFrom<K>,
        HeaderValue: TryFrom<V>,
    {
        match (HeaderName::try_from(name), HeaderValue::try_from(value)) {
            (Ok(name), Ok(value)) => self.headers.append(name, value),
            _ => warn!("忽略非法请求头: {}", self.url),
        }
        self
    }

    pub fn with_body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }

    pub fn with_meta(mut self, meta: Meta) -> Self {
        self.meta = meta;
        self
    }

    pub fn with_proxy(mut self, proxy: ProxyContext) -> Self {
        self.meta.proxy = proxy;
        self
    }

    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    pub fn dont_redirect(mut self, value: bool) -> Self {
        self.meta.dont_redirect = value;
        self
    }

    /// 输出用的摘要视图
    pub fn summary(&self) -> RequestSummary {
        RequestSummary {
            method: self.method.to_string(),
            url: self.url.to_string(),
            headers: self.headers.to_pairs(),
            body_len: self.body.len(),
            priority: self.priority,
            redirect: self.meta.redirect.clone(),
            proxy: self.meta.proxy.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct RequestSummary {
    pub method: String,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body_len: usize,
    pub priority: i32,
    pub redirect: RedirectContext,
    pub proxy: ProxyContext,
}

/// 抓取响应
#[derive(Debug, Clone)]
pub struct Response {
    pub status: StatusCode,
    pub url: Url,
    pub headers: Headers,
    pub body: Bytes,
    /// 产生本响应的请求
    pub request: Arc<Request>,
}

impl Response {
    /// 以请求的 URL 作为响应 URL 构造
    pub fn new(request: Arc<Request>, status: StatusCode) -> Self {
        Self {
            status,
            url: request.url.clone(),
            headers: Headers::new(),
            body: Bytes::new(),
            request,
        }
    }

    pub fn with_header<K, V>(mut self, name: K, value: V) -> Self
    where
        HeaderName: TryFrom<K>,
        HeaderValue: TryFrom<V>,
    {
        match (HeaderName::try_from(name), HeaderValue::try_from(value)) {
            (Ok(name), Ok(value)) => self.headers.append(name, value),
            _ => warn!("忽略非法响应头: {}", self.url),
        }
        self
    }

    pub fn with_body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }

    /// 响应体是否可按 HTML 解读
    ///
    /// 优先依据 Content-Type；缺失时嗅探正文开头。
    pub fn is_html(&self) -> bool {
        if let Some(ct) = self.headers.get(CONTENT_TYPE) {
            let ct = String::from_utf8_lossy(ct.as_bytes()).to_ascii_lowercase();
            return ct.contains("text/html") || ct.contains("application/xhtml+xml");
        }

        let head = &self.body[..self.body.len().min(1024)];
        let head = String::from_utf8_lossy(head).to_ascii_lowercase();
        let head = head.trim_start();
        ["<!doctype html", "<html", "<head", "<meta", "<noscript", "<body"]
            .iter()
            .any(|prefix| head.starts_with(prefix))
    }

    pub fn text(&self) -> std::borrow::Cow<'_, str> {
        String::from_utf8_lossy(&self.body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(url: &str) -> Arc<Request> {
        Arc::new(Request::get(Url::parse(url).unwrap()))
    }

    #[test]
    fn html_detection_prefers_content_type() {
        let req = request("http://example.org");
        let rsp = Response::new(req.clone(), StatusCode::OK)
            .with_header("Content-Type", "text/html; charset=utf-8")
            .with_body("not markup");
        assert!(rsp.is_html());

        let json = Response::new(req.clone(), StatusCode::OK)
            .with_header("Content-Type", "application/json")
            .with_body("<html></html>");
        assert!(!json.is_html());

        let sniffed = Response::new(req, StatusCode::OK).with_body("  <HTML><head></head></HTML>");
        assert!(sniffed.is_html());
    }

    #[test]
    fn handle_status_covers_list_and_all() {
        let list = HandleStatus {
            list: vec![404, 301],
            all: false,
        };
        assert!(list.covers(StatusCode::MOVED_PERMANENTLY));
        assert!(!list.covers(StatusCode::FOUND));

        let all = HandleStatus {
            list: Vec::new(),
            all: true,
        };
        assert!(all.covers(StatusCode::FOUND));
    }

    #[test]
    fn invalid_builder_headers_are_ignored() {
        let req = Request::get(Url::parse("http://example.org").unwrap())
            .with_header("X-Ok", "1")
            .with_header("bad name", "2");
        assert_eq!(req.headers.len(), 1);
    }
}
