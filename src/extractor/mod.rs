// src/extractor/mod.rs

pub mod links;
pub mod materialize;

pub use links::extract_pan_links;
pub use materialize::make_full_link;

use crate::{constants::messages, error::*, models::LinkRecord};

/// 校验手动输入的链接与提取码
pub fn manual_record(url: &str, code: Option<&str>) -> AppResult<LinkRecord> {
    let url = url.trim();
    if !url.contains("baidu.com/s/") {
        return Err(AppError::UserInputError(messages::INVALID_LINK.to_string()));
    }
    let code = code.map(|c| c.trim().to_string());
    Ok(LinkRecord::new(url, code))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_manual_record() {
        let record = manual_record(" https://pan.baidu.com/s/1abcde ", Some(" x1y2 ")).unwrap();
        assert_eq!(record.url, "https://pan.baidu.com/s/1abcde");
        assert_eq!(record.code.as_deref(), Some("x1y2"));

        let record = manual_record("https://pan.baidu.com/s/1abcde", Some("")).unwrap();
        assert_eq!(record.code, None);

        assert!(matches!(
            manual_record("https://example.com/s/1abcde", None),
            Err(AppError::UserInputError(_))
        ));
    }
}
