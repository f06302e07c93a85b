//! 跨源请求头过滤 (Header Security Filter)
//!
//! 跨源跳转时剥离携带凭据的请求头；`Proxy-Authorization` 不在此处处理，
//! 它的去留取决于代理是否变化，而非目标是否同源。

use http::header::{AUTHORIZATION, COOKIE, HeaderName};
use url::Url;

use crate::core::headers::Headers;
use crate::network::origin::same_origin;

/// 跨源时不转发的请求头
pub const CREDENTIAL_HEADERS: [HeaderName; 2] = [COOKIE, AUTHORIZATION];

/// 计算可转发到 `target` 的请求头
pub fn forwardable_headers(headers: &Headers, base: &Url, target: &Url) -> Headers {
    let mut forwarded = headers.clone();
    if !same_origin(base, target) {
        forwarded.retain(|name| !CREDENTIAL_HEADERS.contains(name));
    }
    forwarded
}
