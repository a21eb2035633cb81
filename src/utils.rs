// src/utils.rs

use std::collections::BTreeSet;

pub fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

pub fn truncate_text(text: &str, max_width: usize) -> String {
    let mut width = 0;
    let mut end_pos = 0;
    for (i, c) in text.char_indices() {
        width += if c.is_ascii() { 1 } else { 2 };
        if width > max_width.saturating_sub(3) {
            end_pos = i;
            break;
        }
    }
    if end_pos == 0 { text.to_string() } else { format!("{}...", &text[..end_pos]) }
}

pub fn parse_selection_indices(selection_str: &str, total_items: usize) -> Vec<usize> {
    if selection_str.to_lowercase() == "all" { return (0..total_items).collect(); }
    let mut indices = BTreeSet::new();
    for part in selection_str.split(',').map(|s| s.trim()) {
        if part.is_empty() { continue; }
        if let Some(range_part) = part.split_once('-') {
            if let (Ok(start), Ok(end)) = (range_part.0.parse::<usize>(), range_part.1.parse::<usize>()) {
                if start == 0 || end == 0 { continue; }
                let (min, max) = (start.min(end), start.max(end));
                for i in min..=max {
                    if i > 0 && i <= total_items { indices.insert(i - 1); }
                }
            }
        } else if let Ok(num) = part.parse::<usize>() {
            if num > 0 && num <= total_items { indices.insert(num - 1); }
        }
    }
    indices.into_iter().collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_selection_indices() {
        assert_eq!(parse_selection_indices("1,3,5", 5), vec![0, 2, 4]);
        assert_eq!(parse_selection_indices("2-4", 5), vec![1, 2, 3]);

        // "all" 大小写不敏感
        assert_eq!(parse_selection_indices("all", 3), vec![0, 1, 2]);
        assert_eq!(parse_selection_indices("All", 3), vec![0, 1, 2]);

        // 混合、乱序和重复
        assert_eq!(parse_selection_indices("5, 1-2, 1", 5), vec![0, 1, 4]);

        // 无效和越界输入
        assert_eq!(parse_selection_indices("1,10,foo,-2", 5), vec![0]);
        assert_eq!(parse_selection_indices("", 5), Vec::<usize>::new());
    }

    #[test]
    fn test_truncate_text() {
        assert_eq!(truncate_text("short", 20), "short");
        assert_eq!(truncate_text("https://pan.baidu.com/s/1abcdefghij", 16), "https://pan.b...");
        // 中文按双宽度计算
        assert_eq!(truncate_text("百度网盘分享链接", 9), "百度网...");
    }
}
