//! Meta Refresh 指令提取
//!
//! 只定位文档中第一个有效的 `<meta http-equiv="refresh">` 以及可选的 `<base href>`，
//! 不做其他 HTML 解析。

use std::sync::OnceLock;

use html5ever::tendril::TendrilSink;
use html5ever::tree_builder::TreeBuilderOpts;
use html5ever::{ParseOpts, parse_document};
use scraper::{ElementRef, Html, HtmlTreeSink, Selector};

/// 解析出的刷新指令
#[derive(Debug, Clone, PartialEq)]
pub struct MetaRefresh {
    /// 延迟秒数
    pub interval: f64,
    /// 未解析的目标文本
    pub url: String,
}

struct RefreshSelectors {
    meta: Selector,
    base: Selector,
}

static SELECTORS: OnceLock<RefreshSelectors> = OnceLock::new();

fn selectors() -> &'static RefreshSelectors {
    SELECTORS.get_or_init(|| RefreshSelectors {
        meta: Selector::parse("meta[http-equiv][content]").unwrap(),
        base: Selector::parse("base[href]").unwrap(),
    })
}

/// 元素是否位于被忽略的标签上下文中
fn inside_ignored(el: &ElementRef<'_>, ignore_tags: &[String]) -> bool {
    el.ancestors()
        .filter_map(|node| node.value().as_element().map(|e| e.name()))
        .any(|name| ignore_tags.iter().any(|tag| tag.eq_ignore_ascii_case(name)))
}

/// 关闭 scripting 解析，`<noscript>` 的内容按普通元素建树
fn parse_without_scripting(html: &str) -> Html {
    let opts = ParseOpts {
        tree_builder: TreeBuilderOpts {
            scripting_enabled: false,
            ..Default::default()
        },
        ..Default::default()
    };
    parse_document(HtmlTreeSink::new(Html::new_document()), opts).one(html)
}

/// 提取第一个刷新指令
///
/// 返回 `(指令, <base href>)`；没有带目标 URL 的指令时返回 `None`。
/// 是否跳过 `<noscript>` 中的指令完全由 `ignore_tags` 决定。
pub fn extract_meta_refresh(
    html: &str,
    ignore_tags: &[String],
) -> Option<(MetaRefresh, Option<String>)> {
    let doc = parse_without_scripting(html);
    let s = selectors();

    let refresh = doc
        .select(&s.meta)
        .filter(|el| {
            el.value()
                .attr("http-equiv")
                .is_some_and(|v| v.trim().eq_ignore_ascii_case("refresh"))
        })
        .filter(|el| !inside_ignored(el, ignore_tags))
        .find_map(|el| el.value().attr("content").and_then(parse_refresh_content))?;

    let base_href = doc
        .select(&s.base)
        .find_map(|el| el.value().attr("href"))
        .map(|href| href.trim().to_string())
        .filter(|href| !href.is_empty());

    Some((refresh, base_href))
}

/// 去掉 `url =` 键，`=` 两侧允许空白
fn strip_url_key(rest: &str) -> Option<&str> {
    let key = rest.get(..3)?;
    if !key.eq_ignore_ascii_case("url") {
        return None;
    }
    rest[3..].trim_start().strip_prefix('=')
}

/// 解析 `content` 属性：`<interval>[;|,] [url=]<target>`
///
/// 省略 `url=` 时必须有分隔符。
pub fn parse_refresh_content(content: &str) -> Option<MetaRefresh> {
    let content = content.trim();
    let digits_end = content
        .find(|c: char| !(c.is_ascii_digit() || c == '.'))
        .unwrap_or(content.len());
    let interval: f64 = content[..digits_end].parse().ok()?;

    let rest = content[digits_end..].trim_start();
    let (separated, rest) = match rest.strip_prefix([';', ',']) {
        Some(rest) => (true, rest.trim_start()),
        None => (false, rest),
    };
    let url = match strip_url_key(rest) {
        Some(url) => url,
        None if separated => rest,
        None => return None,
    };

    let url = url
        .trim()
        .trim_matches(|c: char| c == '"' || c == '\'')
        .trim();
    if url.is_empty() {
        return None;
    }

    Some(MetaRefresh {
        interval,
        url: url.to_string(),
    })
}
