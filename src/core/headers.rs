//! 有序多值请求头表 (Ordered Header Table)
//!
//! 键大小写不敏感（统一规范化为小写 `HeaderName`），保留插入顺序，
//! 同名多值按追加顺序保存，查找时首值优先。

use std::fmt;

use http::header::{HeaderName, HeaderValue};
use indexmap::IndexMap;
use tracing::warn;

#[derive(Clone, Default, PartialEq, Eq)]
pub struct Headers {
    entries: IndexMap<HeaderName, Vec<HeaderValue>>,
}

fn header_key(name: impl AsRef<[u8]>) -> Option<HeaderName> {
    HeaderName::from_bytes(name.as_ref()).ok()
}

impl Headers {
    pub fn new() -> Self {
        Self::default()
    }

    /// 以字符串键值对构造，非法的键或值会被跳过
    pub fn from_pairs<K, V, I>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<[u8]>,
    {
        let mut headers = Self::new();
        for (k, v) in pairs {
            headers.append_raw(k.as_ref(), v.as_ref());
        }
        headers
    }

    /// 覆盖写入（移除该键已有的所有值），保留该键原有的位置
    pub fn insert(&mut self, name: HeaderName, value: HeaderValue) {
        self.entries.insert(name, vec![value]);
    }

    /// 追加一个值
    pub fn append(&mut self, name: HeaderName, value: HeaderValue) {
        self.entries.entry(name).or_default().push(value);
    }

    /// 追加原始字节形式的键值，非法输入记录警告后忽略
    pub fn append_raw(&mut self, name: &str, value: &[u8]) -> bool {
        match (HeaderName::from_bytes(name.as_bytes()), HeaderValue::from_bytes(value)) {
            (Ok(name), Ok(value)) => {
                self.append(name, value);
                true
            }
            _ => {
                warn!("忽略非法请求头: {}", name);
                false
            }
        }
    }

    /// 首值优先查找
    pub fn get(&self, name: impl AsRef<[u8]>) -> Option<&HeaderValue> {
        header_key(name)
            .and_then(|key| self.entries.get(&key))
            .and_then(|values| values.first())
    }

    pub fn get_all(&self, name: impl AsRef<[u8]>) -> &[HeaderValue] {
        header_key(name)
            .and_then(|key| self.entries.get(&key))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn contains(&self, name: impl AsRef<[u8]>) -> bool {
        header_key(name).is_some_and(|key| self.entries.contains_key(&key))
    }

    /// 移除该键的所有值，其余键的顺序不变
    pub fn remove(&mut self, name: impl AsRef<[u8]>) -> Option<Vec<HeaderValue>> {
        header_key(name).and_then(|key| self.entries.shift_remove(&key))
    }

    /// 仅保留满足条件的键
    pub fn retain(&mut self, mut keep: impl FnMut(&HeaderName) -> bool) {
        self.entries.retain(|name, _| keep(name));
    }

    /// 按插入顺序展开所有 (键, 值)
    pub fn iter(&self) -> impl Iterator<Item = (&HeaderName, &HeaderValue)> {
        self.entries
            .iter()
            .flat_map(|(name, values)| values.iter().map(move |value| (name, value)))
    }

    /// 键的数量（同名多值只计一次）
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// 便于输出的宽松字符串视图
    pub fn to_pairs(&self) -> Vec<(String, String)> {
        self.iter()
            .map(|(k, v)| (k.to_string(), String::from_utf8_lossy(v.as_bytes()).into_owned()))
            .collect()
    }
}

impl fmt::Debug for Headers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}

impl From<&http::HeaderMap> for Headers {
    fn from(map: &http::HeaderMap) -> Self {
        let mut headers = Self::new();
        for (name, value) in map {
            headers.append(name.clone(), value.clone());
        }
        headers
    }
}

impl<'a> IntoIterator for &'a Headers {
    type Item = (&'a HeaderName, &'a HeaderValue);
    type IntoIter = Box<dyn Iterator<Item = Self::Item> + 'a>;

    fn into_iter(self) -> Self::IntoIter {
        Box::new(self.iter())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::header::{CONTENT_TYPE, COOKIE, LOCATION};

    #[test]
    fn lookup_is_case_insensitive_and_first_value_wins() {
        let headers = Headers::from_pairs([
            ("Location", "/first"),
            ("location", "/second"),
        ]);
        assert_eq!(headers.get("LOCATION").unwrap(), "/first");
        assert_eq!(headers.get(LOCATION).unwrap(), "/first");
        assert_eq!(headers.get_all("Location").len(), 2);
        assert_eq!(headers.len(), 1);
    }

    #[test]
    fn remove_keeps_relative_order() {
        let mut headers = Headers::from_pairs([
            ("A", "1"),
            ("Cookie", "a=b"),
            ("B", "2"),
            ("Content-Type", "text/plain"),
        ]);
        headers.remove(COOKIE);
        let names: Vec<_> = headers.iter().map(|(k, _)| k.as_str().to_string()).collect();
        assert_eq!(names, ["a", "b", "content-type"]);
        assert!(headers.contains(CONTENT_TYPE));
        assert!(!headers.contains("cookie"));
    }

    #[test]
    fn invalid_pairs_are_skipped() {
        let mut headers = Headers::new();
        assert!(!headers.append_raw("bad header", b"x"));
        assert!(!headers.append_raw("X-Ok", b"line\nbreak"));
        assert!(headers.is_empty());
    }

    #[test]
    fn non_ascii_bytes_are_kept_verbatim() {
        let headers = Headers::from_pairs([("Location", "/a\u{e7}".as_bytes())]);
        assert_eq!(headers.get("location").unwrap().as_bytes(), "/a\u{e7}".as_bytes());

        let latin1 = Headers::from_pairs([("Location", &[b'/', b'a', 0xE7][..])]);
        assert_eq!(latin1.get("location").unwrap().as_bytes(), &[b'/', b'a', 0xE7]);
    }
}
