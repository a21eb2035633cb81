// src/ui.rs

use crate::{constants, models::LinkRecord, symbols, utils};
use colored::*;
use indicatif::{ProgressBar, ProgressStyle};
use std::io::{self, BufRead, Write};

pub fn print_header(title: &str) {
    println!("\n{}", "═".repeat(constants::UI_WIDTH));
    println!(" {}", title.cyan().bold());
    println!("{}", "═".repeat(constants::UI_WIDTH));
}

pub fn print_sub_header(title: &str) {
    println!("\n--- {} ---", title.bold());
}

pub fn box_message(title: &str, content: &[&str], color_func: fn(ColoredString) -> ColoredString) {
    println!("\n┌{}┐", "─".repeat(constants::UI_WIDTH - 2));
    println!("  {}", color_func(title.bold()));
    println!("├{}┤", "─".repeat(constants::UI_WIDTH - 2));
    for line in content {
        println!("  {}", line);
    }
    println!("└{}┘", "─".repeat(constants::UI_WIDTH - 2));
}

pub fn plain(message: &str) {
    println!("{}", message);
}

pub fn info(message: &str) {
    println!("{} {}", *symbols::INFO, message);
}

pub fn warn(message: &str) {
    println!("{} {}", *symbols::WARN, message.yellow());
}

pub fn error(message: &str) {
    eprintln!("{} {}", *symbols::ERROR, message.red());
}

pub fn prompt(message: &str, default: Option<&str>) -> io::Result<String> {
    let default_str = default.map_or("".to_string(), |d| format!(" (默认: {})", d));
    print!("\n>>> {}{}: ", message, default_str);
    io::stdout().flush()?;
    let mut input = String::new();
    if io::stdin().read_line(&mut input)? == 0 {
        return Err(io::Error::new(io::ErrorKind::UnexpectedEof, "输入已结束"));
    }
    let input = input.trim().to_string();
    if input.is_empty() {
        Ok(default.unwrap_or("").to_string())
    } else {
        Ok(input)
    }
}

/// 读取多行输入，遇到空行或输入结束时停止
pub fn prompt_multiline(message: &str) -> io::Result<String> {
    println!("\n>>> {} (以空行结束):", message);
    io::stdout().flush()?;
    let mut lines = Vec::new();
    for line in io::stdin().lock().lines() {
        let line = line?;
        if line.trim().is_empty() {
            break;
        }
        lines.push(line);
    }
    Ok(lines.join("\n"))
}

/// 提取结果列表，对应面板中的条目
pub fn print_records(records: &[LinkRecord]) {
    print_sub_header(&format!("检测到链接 ({})", records.len()));
    let pad = records.len().to_string().len();
    for (i, record) in records.iter().enumerate() {
        println!(
            "  [{}] {}",
            format!("{:<pad$}", i + 1, pad = pad).yellow(),
            utils::truncate_text(&record.url, constants::URL_TRUNCATE_LENGTH).dimmed()
        );
        let unzip = record
            .unzip_password
            .as_deref()
            .map(|u| format!(" | 解: {}", u))
            .unwrap_or_default();
        println!(
            "  {:pad$}  码: {}{}",
            "",
            record.code.as_deref().unwrap_or("无").bold(),
            unzip,
            pad = pad
        );
    }
}

pub fn new_tasks_progress_bar(total: u64, prefix: &str) -> ProgressBar {
    let pbar = ProgressBar::new(total);
    pbar.set_style(
        ProgressStyle::default_bar()
            .template("{prefix:.bold} [{bar:40.cyan/blue}] {pos}/{len} ({elapsed})")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("=> "),
    );
    pbar.set_prefix(prefix.to_string());
    pbar
}
