use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use http::HeaderValue;
use http::header::PROXY_AUTHORIZATION;
use parking_lot::RwLock;
use reqwest::{Client, ClientBuilder, Proxy};
use tracing::debug;

use crate::core::config::HttpConfig;
use crate::core::error::Result;
use crate::core::headers::Headers;
use crate::core::model::{Request, Response};
use crate::interfaces::Transport;

/// 每个 (代理, 凭据) 组合对应一个独立连接池
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct ProxyKey {
    url: String,
    auth: Option<HeaderValue>,
}

/// 基于 reqwest 的传输层
///
/// 自身不跟随重定向，也不读取系统代理：两者都由策略链决定。
#[derive(Clone)]
pub struct HttpService {
    config: Arc<HttpConfig>,
    direct: Client,
    proxied: Arc<RwLock<HashMap<ProxyKey, Client>>>,
}

impl HttpService {
    pub fn new(config: HttpConfig) -> Result<Self> {
        let direct = Self::base_builder(&config).no_proxy().build()?;
        Ok(Self {
            config: Arc::new(config),
            direct,
            proxied: Arc::new(RwLock::new(HashMap::new())),
        })
    }

    fn base_builder(config: &HttpConfig) -> ClientBuilder {
        let mut builder = Client::builder()
            .pool_max_idle_per_host(32)
            .tcp_nodelay(true) // 禁用 Nagle 算法，降低小包延迟
            .redirect(reqwest::redirect::Policy::none())
            .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
            .timeout(Duration::from_secs(config.timeout_secs));
        if let Some(ua) = config.user_agent.as_deref() {
            builder = builder.user_agent(ua);
        }
        builder
    }

    /// 按请求的代理状态取得客户端，首次使用某个代理时构建并缓存
    fn client_for(&self, req: &Request) -> Result<Client> {
        let Some(proxy) = req.meta.proxy.proxy.as_deref() else {
            return Ok(self.direct.clone());
        };

        let key = ProxyKey {
            url: proxy.to_string(),
            auth: req.headers.get(PROXY_AUTHORIZATION).cloned(),
        };
        if let Some(client) = self.proxied.read().get(&key) {
            return Ok(client.clone());
        }

        let mut upstream = Proxy::all(key.url.as_str())?;
        if let Some(auth) = key.auth.clone() {
            // CONNECT 隧道同样需要携带凭据
            upstream = upstream.custom_http_auth(auth);
        }
        let client = Self::base_builder(&self.config).proxy(upstream).build()?;
        debug!("为代理 {} 创建客户端", key.url);

        Ok(self.proxied.write().entry(key).or_insert(client).clone())
    }

    #[cfg(test)]
    fn cached_clients(&self) -> usize {
        self.proxied.read().len()
    }
}

#[async_trait]
impl Transport for HttpService {
    async fn fetch(&self, req: Arc<Request>) -> Result<Response> {
        let client = self.client_for(&req)?;

        // Proxy-Authorization 已交给代理配置，不发往目标站点
        let mut builder = client.request(req.method.clone(), req.url.clone());
        for (name, value) in req.headers.iter().filter(|(name, _)| **name != PROXY_AUTHORIZATION) {
            builder = builder.header(name.clone(), value.clone());
        }
        if !req.body.is_empty() {
            builder = builder.body(req.body.clone());
        }

        let resp = builder.send().await?;
        let status = resp.status();
        let url = resp.url().clone();
        let headers = Headers::from(resp.headers());
        let body = resp.bytes().await?;
        debug!("{} {} -> {}", req.method, req.url, status);

        Ok(Response {
            status,
            url,
            headers,
            body,
            request: req,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::model::ProxyContext;
    use url::Url;

    fn request(proxy: Option<&str>, auth: Option<&str>) -> Request {
        let mut req = Request::get(Url::parse("http://example.com").unwrap());
        if let Some(proxy) = proxy {
            req = req.with_proxy(ProxyContext::pinned(proxy));
        }
        if let Some(auth) = auth {
            req = req.with_header("Proxy-Authorization", auth);
        }
        req
    }

    #[test]
    fn clients_are_cached_per_proxy_and_credentials() {
        let service = HttpService::new(HttpConfig::default()).unwrap();

        service.client_for(&request(None, None)).unwrap();
        assert_eq!(service.cached_clients(), 0);

        service.client_for(&request(Some("http://a.example:3128"), Some("Basic YTo="))).unwrap();
        service.client_for(&request(Some("http://a.example:3128"), Some("Basic YTo="))).unwrap();
        assert_eq!(service.cached_clients(), 1);

        service.client_for(&request(Some("http://a.example:3128"), None)).unwrap();
        service.client_for(&request(Some("http://b.example:3128"), None)).unwrap();
        assert_eq!(service.cached_clients(), 3);
    }
}
