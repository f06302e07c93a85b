//! 下载调度器
//!
//! 负责单条请求链路的生命周期：请求策略 -> 发送 -> 响应策略 -> （跟随）-> 结束

use std::sync::Arc;

use futures::future::join_all;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::core::config::AppConfig;
use crate::core::error::Result;
use crate::core::model::{Request, RequestSummary, Response, SpiderContext};
use crate::interfaces::policy::PolicyResult;
use crate::interfaces::Transport;
use crate::network::middleware::PolicyChain;
use crate::network::policies::{MetaRefreshPolicy, RedirectPolicy};
use crate::network::proxy::ProxyPolicy;

/// 下载器
pub struct Downloader {
    transport: Arc<dyn Transport>,
    chain: PolicyChain,
    spider: SpiderContext,
}

impl Downloader {
    pub fn new(transport: Arc<dyn Transport>, chain: PolicyChain, spider: SpiderContext) -> Self {
        Self { transport, chain, spider }
    }

    /// 按配置装配默认策略链：代理 -> 重定向 -> meta refresh
    pub fn from_config(
        transport: Arc<dyn Transport>,
        config: &AppConfig,
        spider: SpiderContext,
    ) -> Result<Self> {
        let chain = PolicyChain::new()
            .with_request_policy(Arc::new(ProxyPolicy::from_config(&config.proxy)?))
            .with_policy(Arc::new(RedirectPolicy::new(config.redirect.clone())))
            .with_policy(Arc::new(MetaRefreshPolicy::new(
                config.meta_refresh.clone(),
                config.redirect.clone(),
            )));
        debug!("策略链: {:?}", chain.policy_names());
        Ok(Self::new(transport, chain, spider))
    }

    /// 抓取并跟随整条链路，返回最终响应
    pub async fn fetch(&self, mut request: Request) -> Result<Response> {
        loop {
            self.chain.prepare(&mut request)?;
            let sent = Arc::new(request);
            let resp = self.transport.fetch(Arc::clone(&sent)).await?;

            match self.chain.check(resp, &self.spider) {
                Ok(PolicyResult::Pass(resp)) => return Ok(resp),
                Ok(PolicyResult::Redirect(next)) => {
                    info!("跟随跳转: {} -> {}", sent.url, next.url);
                    request = next;
                }
                Err(e) => {
                    if e.is_chain_drop() {
                        warn!("丢弃请求链路: {}", e);
                    }
                    return Err(e);
                }
            }
        }
    }

    /// 并发抓取多条互不相关的链路
    pub async fn fetch_all(&self, requests: Vec<Request>) -> Vec<Result<Response>> {
        join_all(requests.into_iter().map(|req| self.fetch(req))).await
    }
}

/// 链路结果的输出视图
#[derive(Debug, Serialize)]
pub struct FetchReport {
    pub status: u16,
    pub url: String,
    pub body_len: usize,
    /// 从原始请求到最终请求
    pub hops: Vec<RequestSummary>,
}

impl FetchReport {
    pub fn from_response(resp: &Response) -> Self {
        let mut hops = Vec::new();
        let mut cursor = Some(&resp.request);
        while let Some(req) = cursor {
            hops.push(req.summary());
            cursor = req.previous.as_ref();
        }
        hops.reverse();

        Self {
            status: resp.status.as_u16(),
            url: resp.url.to_string(),
            body_len: resp.body.len(),
            hops,
        }
    }
}
