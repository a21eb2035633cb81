// src/extractor/links.rs

use super::materialize::has_password_param;
use crate::models::LinkRecord;
use itertools::Itertools;
use log::{debug, trace};
use regex::Regex;
use std::{ops::Range, sync::LazyLock};

/// 分享链接，允许附带查询串 (例如 `?pwd=xxxx`)
static LINK_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)https?://pan\.baidu\.com/s/[A-Za-z0-9_-]{5,}(?:\?[A-Za-z0-9_=&%.-]+)?")
        .unwrap()
});
/// 候选提取码：前后为 ASCII 单词边界的 4 位字母数字
static CODE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?-u:\b)[A-Za-z0-9]{4}(?-u:\b)").unwrap());
/// 带标签的密码，如 "解压密码: abcd1234"、"pwd=abcd"
static LABELLED_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(?:[密码]|password|pwd|code)[^A-Za-z0-9_]*([A-Za-z0-9]{4,10})").unwrap()
});

fn inside_any(spans: &[Range<usize>], range: Range<usize>) -> bool {
    spans
        .iter()
        .any(|span| range.start >= span.start && range.end <= span.end)
}

/// 从任意文本中提取分享链接，并按文本顺序返回。
///
/// 提取码与解压密码的配对是启发式的：从最后一个链接开始往前，
/// 依次取用尚未被取用的、最靠后的候选提取码与带标签密码。
/// 对于 "链接 + 提取码" 顺序排列的常见粘贴格式，这与人工配对结果一致；
/// 多个链接与提取码交错排列时不保证正确。
pub fn extract_pan_links(text: &str) -> Vec<LinkRecord> {
    let links: Vec<_> = LINK_RE.find_iter(text).collect();
    if links.is_empty() {
        return vec![];
    }
    let spans: Vec<Range<usize>> = links.iter().map(|m| m.range()).collect();

    let codes: Vec<&str> = CODE_RE
        .find_iter(text)
        .filter(|m| !inside_any(&spans, m.range()))
        .map(|m| m.as_str())
        .collect();

    let unzips: Vec<&str> = LABELLED_RE
        .captures_iter(text)
        .filter_map(|caps| caps.get(1))
        .filter(|m| !inside_any(&spans, m.range()))
        .map(|m| m.as_str())
        .unique()
        .collect();

    debug!(
        "提取到 {} 个链接, {} 个候选提取码, {} 个带标签密码",
        links.len(),
        codes.len(),
        unzips.len()
    );

    // 游标表示剩余可用的数量，逐个从尾部取用
    let mut code_cursor = codes.len();
    let mut unzip_cursor = unzips.len();

    let mut records: Vec<LinkRecord> = links
        .iter()
        .rev()
        .map(|m| {
            let url = m.as_str();
            let mut code = None;
            if !has_password_param(url) && code_cursor > 0 {
                code_cursor -= 1;
                code = Some(codes[code_cursor]);
            }

            let mut unzip = None;
            if !unzips.is_empty() && unzip_cursor > 0 {
                unzip_cursor -= 1;
                unzip = Some(unzips[unzip_cursor]).filter(|u| Some(*u) != code);
            }

            trace!("配对: {} -> code={:?}, unzip={:?}", url, code, unzip);
            LinkRecord {
                url: url.to_string(),
                code: code.map(str::to_string),
                unzip_password: unzip.map(str::to_string),
            }
        })
        .collect();

    records.reverse();
    records
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_link_with_code() {
        let records = extract_pan_links("https://pan.baidu.com/s/1abcXYZ 提取码: 9k2M");
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].url, "https://pan.baidu.com/s/1abcXYZ");
        assert_eq!(records[0].code.as_deref(), Some("9k2M"));
        // 带标签的 "码: 9k2M" 与提取码相同，因此不作为解压密码
        assert_eq!(records[0].unzip_password, None);
    }

    #[test]
    fn test_no_links() {
        assert!(extract_pan_links("").is_empty());
        assert!(extract_pan_links("提取码: abcd 没有链接").is_empty());
        assert!(extract_pan_links("https://pan.baidu.com/s/abc").is_empty()); // id 太短
    }

    #[test]
    fn test_sequential_pairs_keep_text_order() {
        let text = "资源一: https://pan.baidu.com/s/1AAAAAA 提取码: ab12\n\
                    资源二: https://pan.baidu.com/s/1BBBBBB 提取码: cd34";
        let records = extract_pan_links(text);
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].url, "https://pan.baidu.com/s/1AAAAAA");
        assert_eq!(records[0].code.as_deref(), Some("ab12"));
        assert_eq!(records[1].url, "https://pan.baidu.com/s/1BBBBBB");
        assert_eq!(records[1].code.as_deref(), Some("cd34"));
    }

    #[test]
    fn test_embedded_password_is_not_paired() {
        let text = "https://pan.baidu.com/s/1AAAAAA (ab12) https://pan.baidu.com/s/1BBBBBB?pwd=zz99";
        let records = extract_pan_links(text);
        assert_eq!(records.len(), 2);
        assert_eq!(records[1].code, None);
        assert_eq!(records[1].unzip_password, None);
        // 链接中的 pwd 不会被当成候选提取码
        assert_eq!(records[0].code.as_deref(), Some("ab12"));
    }

    #[test]
    fn test_unzip_password_distinct_from_code() {
        let text = "https://pan.baidu.com/s/1xYz_-9 提取码: q1w2 解压密码: example8";
        let records = extract_pan_links(text);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].code.as_deref(), Some("q1w2"));
        assert_eq!(records[0].unzip_password.as_deref(), Some("example8"));
    }

    #[test]
    fn test_labelled_passwords_deduplicated() {
        let text = "https://pan.baidu.com/s/1AAAAAA\n\
                    https://pan.baidu.com/s/1BBBBBB 解压密码: zzzz9999 (password=zzzz9999)";
        let records = extract_pan_links(text);
        assert_eq!(records.len(), 2);
        assert_eq!(records[1].unzip_password.as_deref(), Some("zzzz9999"));
        // 重复的密码只计一次，不会再分配给前一个链接
        assert_eq!(records[0].unzip_password, None);
    }

    #[test]
    fn test_missing_codes_yield_none() {
        let text = "https://pan.baidu.com/s/1AAAAAA\nhttps://pan.baidu.com/s/1BBBBBB";
        let records = extract_pan_links(text);
        assert_eq!(records.len(), 2);
        assert!(records.iter().all(|r| r.code.is_none() && r.unzip_password.is_none()));
    }

    #[test]
    fn test_more_links_than_codes_pairs_from_the_end() {
        let text = "https://pan.baidu.com/s/1AAAAAA https://pan.baidu.com/s/1BBBBBB 提取码 ab12";
        let records = extract_pan_links(text);
        assert_eq!(records[0].code, None);
        assert_eq!(records[1].code.as_deref(), Some("ab12"));
    }
}
