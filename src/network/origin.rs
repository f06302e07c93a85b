//! 协议与同源判定 (Scheme / Origin Policy)

use std::fmt;
use std::str::FromStr;

use strum::{Display, EnumString};
use url::Url;

/// 允许发起重定向的协议
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum HttpScheme {
    Http,
    Https,
}

impl HttpScheme {
    pub fn default_port(self) -> u16 {
        match self {
            HttpScheme::Http => 80,
            HttpScheme::Https => 443,
        }
    }
}

/// 是否为 http/https
pub fn is_http(url: &Url) -> bool {
    HttpScheme::from_str(url.scheme()).is_ok()
}

/// (scheme, host, 有效端口) 三元组
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Origin {
    pub scheme: String,
    pub host: String,
    pub port: Option<u16>,
}

impl Origin {
    pub fn of(url: &Url) -> Self {
        Self {
            scheme: url.scheme().to_ascii_lowercase(),
            host: url.host_str().unwrap_or_default().to_ascii_lowercase(),
            port: url.port_or_known_default(),
        }
    }

    fn default_port(&self) -> Option<u16> {
        HttpScheme::from_str(&self.scheme).ok().map(HttpScheme::default_port)
    }
}

impl fmt::Display for Origin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}://{}", self.scheme, self.host)?;
        match self.port {
            Some(port) if Some(port) != self.default_port() => write!(f, ":{}", port),
            _ => Ok(()),
        }
    }
}

/// 三元组完全一致才视为同源
pub fn same_origin(a: &Url, b: &Url) -> bool {
    Origin::of(a) == Origin::of(b)
}
