// tests/cli_dispatch_test.rs

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs::File;
use std::io::Write;
use tempfile::{TempDir, tempdir};

// 辅助函数：使用临时主目录，避免读写真实的配置与状态文件
fn main_command(home: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin(env!("CARGO_PKG_NAME")).unwrap();
    cmd.env("HOME", home.path());
    cmd
}

// --- 测试基本 CLI 行为 ---

#[test]
fn test_help_flag() {
    let home = tempdir().unwrap();
    main_command(&home)
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("显示此帮助信息并退出"));
}

#[test]
fn test_usage_guide() {
    let home = tempdir().unwrap();
    main_command(&home)
        .arg("--usage")
        .assert()
        .success()
        .stdout(predicate::str::contains("t <序号>  转存到网盘"));
}

#[test]
fn test_missing_mode_shows_help() {
    let home = tempdir().unwrap();
    main_command(&home)
        .assert()
        .failure()
        .stderr(predicate::str::contains("Usage: pan-transfer <MODE> [OPTIONS]"));
}

#[test]
fn test_code_requires_url() {
    let home = tempdir().unwrap();
    main_command(&home)
        .args(["--status", "--code", "abcd", "--offline"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("--url <URL>"));
    // 提前拒绝，不会创建配置目录
    assert!(!home.path().join(".pan-transfer").exists());
}

#[test]
fn test_code_rejected_in_extract_only_mode() {
    let home = tempdir().unwrap();
    main_command(&home)
        .args(["--text", "https://pan.baidu.com/s/1abcXYZ", "--code", "abcd", "-x"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("--url <URL>"));
}

// --- 只提取模式 ---

#[test]
fn test_extract_only_prints_full_links() {
    let home = tempdir().unwrap();
    main_command(&home)
        .args(["--text", "https://pan.baidu.com/s/1abcXYZ 提取码: 9k2M", "-x"])
        .assert()
        .success()
        .stdout(predicate::str::contains("https://pan.baidu.com/s/1abcXYZ?pwd=9k2M"));
    // 只提取时不会创建配置目录
    assert!(!home.path().join(".pan-transfer").exists());
}

#[test]
fn test_extract_only_from_file() {
    let home = tempdir().unwrap();
    let file_path = home.path().join("share.txt");
    let mut file = File::create(&file_path).unwrap();
    writeln!(file, "资源一: https://pan.baidu.com/s/1AAAAAA 提取码: ab12").unwrap();
    writeln!(file, "资源二: https://pan.baidu.com/s/1BBBBBB 提取码: cd34").unwrap();

    main_command(&home)
        .arg("-f")
        .arg(&file_path)
        .arg("--extract-only")
        .assert()
        .success()
        .stdout(predicate::str::contains("检测到链接 (2)"))
        .stdout(predicate::str::contains("https://pan.baidu.com/s/1AAAAAA?pwd=ab12"))
        .stdout(predicate::str::contains("https://pan.baidu.com/s/1BBBBBB?pwd=cd34"));
}

#[test]
fn test_text_without_links_is_not_an_error() {
    let home = tempdir().unwrap();
    main_command(&home)
        .args(["--text", "今天没有分享", "--offline"])
        .assert()
        .success()
        .stdout(predicate::str::contains("未检测到百度网盘分享链接"));
}

// --- 转存相关的分发逻辑 ---

#[test]
fn test_invalid_manual_url() {
    let home = tempdir().unwrap();
    main_command(&home)
        .args(["--url", "https://example.com/not-a-share", "--offline"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("链接无效"));
}

#[test]
fn test_lockout_blocks_transfer() {
    let home = tempdir().unwrap();
    let config_dir = home.path().join(".pan-transfer");
    std::fs::create_dir_all(&config_dir).unwrap();
    std::fs::write(
        config_dir.join("state.json"),
        r#"{"lockout":true,"resetToken":"t1","lastReportTime":0}"#,
    )
    .unwrap();

    main_command(&home)
        .args(["--url", "https://pan.baidu.com/s/1abcXYZ", "--code", "9k2M", "--offline"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("服务暂不可用"));
}

#[test]
fn test_status_offline_lists_custom_endpoints() {
    let home = tempdir().unwrap();
    main_command(&home)
        .args(["--status", "--offline", "--api", "https://dl.example.com/"])
        .assert()
        .success()
        .stdout(predicate::str::contains("本地默认"))
        .stdout(predicate::str::contains("- https://dl.example.com"));
    // 首次运行会生成默认配置文件
    assert!(home.path().join(".pan-transfer").join("config.json").is_file());
}
