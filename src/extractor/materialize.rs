// src/extractor/materialize.rs

use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};
use regex::Regex;
use std::sync::LazyLock;

static PWD_PARAM_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)[?&]pwd=").unwrap());

/// 与 `encodeURIComponent` 一致的保留字符集
const COMPONENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')');

pub fn has_password_param(url: &str) -> bool {
    PWD_PARAM_RE.is_match(url)
}

/// 把提取码拼接进链接的查询串。已带 `pwd=` 的链接原样返回。
pub fn make_full_link(url: &str, code: Option<&str>) -> String {
    let code = match code.map(str::trim) {
        Some(c) if !c.is_empty() => c,
        _ => return url.to_string(),
    };
    if has_password_param(url) {
        return url.to_string();
    }
    let separator = if url.contains('?') { '&' } else { '?' };
    format!("{}{}pwd={}", url, separator, utf8_percent_encode(code, COMPONENT))
}
