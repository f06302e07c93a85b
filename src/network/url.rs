//! 跳转目标解析 (Redirect Target Resolution)
//!
//! 将 `Location` 头字节或 meta refresh 中提取的文本解析为百分号编码后的绝对 URL。

use std::borrow::Cow;

use percent_encoding::{AsciiSet, CONTROLS, percent_encode};
use url::Url;

use crate::core::error::{Result, SpiderError};

/// 需要转义的 ASCII 字符；`%` 与保留字符保持原样
const UNSAFE: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'<')
    .add(b'>')
    .add(b'`')
    .add(b'{')
    .add(b'}')
    .add(b'|')
    .add(b'\\')
    .add(b'^');

/// 头字节的解码字符集
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Charset {
    Utf8,
    /// HTTP 历史上允许的单字节编码，每个字节即一个码点
    Latin1,
}

/// 先按 UTF-8 解码，失败时回退到 Latin-1
pub fn decode_header(raw: &[u8]) -> (Cow<'_, str>, Charset) {
    match std::str::from_utf8(raw) {
        Ok(text) => (Cow::Borrowed(text), Charset::Utf8),
        Err(_) => (Cow::Owned(raw.iter().map(|&b| b as char).collect()), Charset::Latin1),
    }
}

/// 将文本按给定字符集转为仅含 ASCII 的 URL 字符串
pub fn safe_url_string(text: &str, charset: Charset) -> String {
    let bytes: Cow<'_, [u8]> = match charset {
        Charset::Utf8 => Cow::Borrowed(text.as_bytes()),
        // Latin-1 解码得到的码点均 <= 0xFF
        Charset::Latin1 => Cow::Owned(text.chars().map(|c| c as u32 as u8).collect()),
    };
    percent_encode(&bytes, UNSAFE).to_string()
}

/// 解析原始跳转目标
///
/// 协议相对地址（`//host/path`，多余的前导斜杠一并折叠）沿用基准 URL 的协议。
pub fn resolve_location(raw: &[u8], base: &Url) -> Result<Url> {
    let (text, charset) = decode_header(raw);
    resolve_with(text.trim(), charset, base)
}

/// 解析已解码的跳转目标文本
pub fn resolve_text(text: &str, base: &Url) -> Result<Url> {
    resolve_with(text.trim(), Charset::Utf8, base)
}

fn resolve_with(text: &str, charset: Charset, base: &Url) -> Result<Url> {
    if text.is_empty() {
        return Err(SpiderError::MalformedRedirectTarget(String::new()));
    }

    let encoded = safe_url_string(text, charset);
    let location = if encoded.starts_with("//") {
        format!("{}://{}", base.scheme(), encoded.trim_start_matches('/'))
    } else {
        encoded
    };

    base.join(&location)
        .map_err(|e| SpiderError::MalformedRedirectTarget(format!("{}: {}", location, e)))
}
