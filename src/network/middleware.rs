use std::sync::Arc;

use tracing::debug;

use crate::core::error::Result;
use crate::core::model::{Request, Response, SpiderContext};
use crate::interfaces::policy::PolicyResult;
use crate::interfaces::{NetworkPolicy, RequestPolicy};

/// 策略跳过标记
///
/// 放在 `Request.meta.extensions` 中，控制响应是否绕过某些或所有网络策略
#[derive(Debug, Clone)]
pub enum SkipPolicy {
    /// 跳过所有策略 (通常用于探测、健康检查)
    All,
    /// 跳过特定名称的策略
    One(String),
}

/// 请求/响应两侧的策略链
///
/// 请求策略在每次发送前按顺序就地调整请求；
/// 响应策略按顺序检查，第一个给出 `Redirect` 的策略终止链路。
#[derive(Debug, Clone, Default)]
pub struct PolicyChain {
    request: Vec<Arc<dyn RequestPolicy>>,
    response: Vec<Arc<dyn NetworkPolicy>>,
}

impl PolicyChain {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_request_policy(mut self, policy: Arc<dyn RequestPolicy>) -> Self {
        self.request.push(policy);
        self
    }

    pub fn with_policy(mut self, policy: Arc<dyn NetworkPolicy>) -> Self {
        self.response.push(policy);
        self
    }

    pub fn policy_names(&self) -> Vec<&str> {
        self.request
            .iter()
            .map(|p| p.name())
            .chain(self.response.iter().map(|p| p.name()))
            .collect()
    }

    /// 发送前运行请求策略
    pub fn prepare(&self, req: &mut Request) -> Result<()> {
        for policy in &self.request {
            policy.prepare(req)?;
        }
        Ok(())
    }

    /// 运行响应策略
    pub fn check(&self, resp: Response, spider: &SpiderContext) -> Result<PolicyResult> {
        let skip = resp.request.meta.extensions.get::<SkipPolicy>().cloned();
        let mut current = resp;

        for policy in &self.response {
            // 检查是否需要跳过当前策略
            match &skip {
                Some(SkipPolicy::All) => break,
                Some(SkipPolicy::One(name)) if name == policy.name() => continue,
                _ => {}
            }

            match policy.check(current, spider) {
                Ok(PolicyResult::Pass(r)) => current = r,
                Ok(PolicyResult::Redirect(next)) => {
                    debug!("策略 {} 产生后续请求: {}", policy.name(), next.url);
                    return Ok(PolicyResult::Redirect(next));
                }
                Err(e) => {
                    debug!("策略 {} 丢弃链路: {}", policy.name(), e);
                    return Err(e);
                }
            }
        }

        Ok(PolicyResult::Pass(current))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::network::policies::{MetaRefreshPolicy, RedirectPolicy};
    use http::StatusCode;
    use url::Url;

    fn chain() -> PolicyChain {
        PolicyChain::new()
            .with_policy(Arc::new(RedirectPolicy::default()))
            .with_policy(Arc::new(MetaRefreshPolicy::default()))
    }

    fn redirect_response(req: Request) -> Response {
        Response::new(Arc::new(req), StatusCode::FOUND).with_header("Location", "/next")
    }

    #[test]
    fn first_redirect_wins() {
        let req = Request::get(Url::parse("http://example.com/a").unwrap());
        let resp = redirect_response(req)
            .with_header("Content-Type", "text/html")
            .with_body(r#"<meta http-equiv="refresh" content="0;url=/refresh">"#);

        match chain().check(resp, &SpiderContext::default()).unwrap() {
            PolicyResult::Redirect(next) => assert_eq!(next.url.path(), "/next"),
            PolicyResult::Pass(_) => panic!("expected redirect"),
        }
    }

    #[test]
    fn skip_markers() {
        let mut req = Request::get(Url::parse("http://example.com/a").unwrap());
        req.meta.extensions.insert(SkipPolicy::All);
        let result = chain().check(redirect_response(req), &SpiderContext::default()).unwrap();
        assert!(matches!(result, PolicyResult::Pass(_)));

        let mut req = Request::get(Url::parse("http://example.com/a").unwrap());
        req.meta.extensions.insert(SkipPolicy::One("redirect".into()));
        let result = chain().check(redirect_response(req), &SpiderContext::default()).unwrap();
        assert!(matches!(result, PolicyResult::Pass(_)));
    }

    #[test]
    fn names_are_listed_in_order() {
        assert_eq!(chain().policy_names(), ["redirect", "meta_refresh"]);
    }
}
