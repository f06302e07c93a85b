//! 配置管理系统 (Configuration Management)
//!
//! 负责 `config.toml` 的反序列化及其层级结构映射，支持环境变量与默认值回退机制。

use std::path::Path;

use bon::Builder;
use config::{Config, Environment, File};
use serde::Deserialize;

use crate::core::error::{Result, SpiderError};

/// 全局应用配置
#[derive(Debug, Deserialize, Builder, Clone, Default)]
pub struct AppConfig {
    /// HTTP 3xx 重定向参数
    #[serde(default)]
    #[builder(default)]
    pub redirect: RedirectConfig,

    /// Meta Refresh 跳转参数
    #[serde(default)]
    #[builder(default)]
    pub meta_refresh: MetaRefreshConfig,

    /// 按协议选择的代理规则
    #[serde(default)]
    #[builder(default)]
    pub proxy: ProxyConfig,

    /// 底层传输参数
    #[serde(default)]
    #[builder(default)]
    pub http: HttpConfig,
}

/// 重定向链路参数
#[derive(Debug, Deserialize, Builder, Clone)]
pub struct RedirectConfig {
    #[serde(default = "default_enabled")]
    #[builder(default = default_enabled())]
    pub enabled: bool,
    /// 单条链路允许的最大跳转次数
    #[serde(default = "default_max_times")]
    #[builder(default = default_max_times())]
    pub max_times: u32,
    /// 重定向请求相对原请求的优先级提升量
    #[serde(default = "default_priority_adjust")]
    #[builder(default = default_priority_adjust())]
    pub priority_adjust: i32,
    /// 是否启用每条链路独立的 TTL 递减
    #[serde(default = "default_enabled")]
    #[builder(default = default_enabled())]
    pub ttl_enabled: bool,
}

/// Meta Refresh 参数
#[derive(Debug, Deserialize, Builder, Clone)]
pub struct MetaRefreshConfig {
    #[serde(default = "default_enabled")]
    #[builder(default = default_enabled())]
    pub enabled: bool,
    /// 触发跳转的最大延迟（秒），达到或超过则视为非即时跳转
    #[serde(default = "default_max_delay")]
    #[builder(default = default_max_delay())]
    pub max_delay: f64,
    /// 扫描时忽略的标签上下文
    #[serde(default = "default_ignore_tags")]
    #[builder(default = default_ignore_tags())]
    pub ignore_tags: Vec<String>,
}

/// 代理规则
#[derive(Debug, Deserialize, Builder, Clone, Default)]
pub struct ProxyConfig {
    /// `http://` 目标使用的代理，可内嵌凭据
    pub http: Option<String>,
    /// `https://` 目标使用的代理，可内嵌凭据
    pub https: Option<String>,
    /// 直连的主机后缀
    #[serde(default)]
    #[builder(default)]
    pub no_proxy: Vec<String>,
    /// 是否读取 `http_proxy` / `https_proxy` / `no_proxy` 环境变量
    #[serde(default)]
    #[builder(default)]
    pub from_env: bool,
}

/// 传输层参数
#[derive(Debug, Deserialize, Builder, Clone)]
pub struct HttpConfig {
    #[serde(default = "default_connect_timeout")]
    #[builder(default = default_connect_timeout())]
    pub connect_timeout_secs: u64,
    #[serde(default = "default_timeout")]
    #[builder(default = default_timeout())]
    pub timeout_secs: u64,
    pub user_agent: Option<String>,
}

impl Default for RedirectConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_times: default_max_times(),
            priority_adjust: default_priority_adjust(),
            ttl_enabled: true,
        }
    }
}

impl Default for MetaRefreshConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_delay: default_max_delay(),
            ignore_tags: default_ignore_tags(),
        }
    }
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            connect_timeout_secs: default_connect_timeout(),
            timeout_secs: default_timeout(),
            user_agent: None,
        }
    }
}

fn default_enabled() -> bool {
    true
}
fn default_max_times() -> u32 {
    20
}
fn default_priority_adjust() -> i32 {
    2
}
fn default_max_delay() -> f64 {
    100.0
}
fn default_ignore_tags() -> Vec<String> {
    vec!["script".to_string(), "noscript".to_string()]
}
fn default_connect_timeout() -> u64 {
    10
}
fn default_timeout() -> u64 {
    30
}

impl AppConfig {
    /// 从文件系统中加载并解析配置
    pub fn load() -> Result<Self> {
        Self::load_from(Path::new("config.toml"))
    }

    /// 从指定路径加载配置，文件不存在时回退为默认值
    ///
    /// `SPIDER__REDIRECT__MAX_TIMES=5` 形式的环境变量覆盖文件中的值。
    pub fn load_from(config_path: &Path) -> Result<Self> {
        let builder = Config::builder();

        let builder = if config_path.exists() {
            builder.add_source(File::from(config_path))
        } else {
            builder
        };

        let settings = builder
            .add_source(Environment::with_prefix("SPIDER").separator("__"))
            .build()
            .map_err(SpiderError::Config)?;
        settings.try_deserialize().map_err(SpiderError::Config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let cfg = AppConfig::default();
        assert!(cfg.redirect.enabled);
        assert_eq!(cfg.redirect.max_times, 20);
        assert_eq!(cfg.redirect.priority_adjust, 2);
        assert!(cfg.redirect.ttl_enabled);
        assert_eq!(cfg.meta_refresh.max_delay, 100.0);
        assert_eq!(cfg.meta_refresh.ignore_tags, vec!["script", "noscript"]);
        assert!(!cfg.proxy.from_env);
    }

    #[test]
    fn partial_toml_keeps_defaults() {
        let settings = Config::builder()
            .add_source(File::from_str(
                "[redirect]\nmax_times = 3\n\n[proxy]\nhttps = \"https://b:@b.example\"\n",
                config::FileFormat::Toml,
            ))
            .build()
            .unwrap();
        let cfg: AppConfig = settings.try_deserialize().unwrap();

        assert_eq!(cfg.redirect.max_times, 3);
        assert_eq!(cfg.redirect.priority_adjust, 2);
        assert_eq!(cfg.proxy.https.as_deref(), Some("https://b:@b.example"));
        assert_eq!(cfg.meta_refresh.ignore_tags.len(), 2);
    }

    #[test]
    fn builder_fills_defaults() {
        let redirect = RedirectConfig::builder().max_times(1).build();
        assert_eq!(redirect.max_times, 1);
        assert!(redirect.ttl_enabled);
    }
}
