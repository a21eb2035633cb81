// src/cli.rs

use crate::constants;
use clap::{Parser, ValueEnum, crate_version};
use std::path::PathBuf;

/// 定义日志输出级别
#[derive(ValueEnum, Copy, Clone, Debug, PartialEq, Eq)]
pub enum LogLevel {
    Off,
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

// command 属性
#[derive(Parser, Debug, Clone)]
#[command(
    version = crate_version!(),
    about,
    long_about = None,
    arg_required_else_help = true,
    disable_help_flag = true,
    disable_version_flag = true,
)]
#[command(group(
    clap::ArgGroup::new("mode")
        .required(true)
        .args(&["interactive", "text", "file", "url", "inspect", "status", "usage_help"]),
))]
pub struct Cli {
    // --- 运行模式 (Mode) ---
    /// 启动交互式面板，粘贴文本后逐条操作
    #[arg(short, long, action = clap::ArgAction::SetTrue, help_heading = "Mode")]
    pub interactive: bool,
    /// 从给定文本中提取链接并转存
    #[arg(long, value_name = "TEXT", help_heading = "Mode")]
    pub text: Option<String>,
    /// 从文本文件中提取链接并转存
    #[arg(short, long, value_name = "FILE", help_heading = "Mode")]
    pub file: Option<PathBuf>,
    /// 手动指定单个分享链接进行转存
    #[arg(long, help_heading = "Mode")]
    pub url: Option<String>,
    /// 检查指定后端页面是否处于故障状态
    #[arg(long, value_name = "URL", help_heading = "Mode")]
    pub inspect: Option<String>,
    /// 同步远程配置并显示服务状态
    #[arg(long, action = clap::ArgAction::SetTrue, help_heading = "Mode")]
    pub status: bool,
    /// 显示使用说明并退出
    #[arg(long = "usage", action = clap::ArgAction::SetTrue, help_heading = "Mode")]
    pub usage_help: bool,

    // --- 选项 (Options) ---
    /// [手动模式] 提取码
    #[arg(long, help_heading = "Options")]
    pub code: Option<String>,
    /// 只提取并输出完整链接，不转存
    #[arg(short = 'x', long, action = clap::ArgAction::SetTrue, help_heading = "Options")]
    pub extract_only: bool,
    /// 指定要转存的条目 (例如 '1-3,5', 'all')
    #[arg(long, default_value_t = constants::DEFAULT_SELECTION.to_string(), value_name = "SELECTION", help_heading = "Options")]
    pub select: String,
    /// 设置最大并发转存数
    #[arg(short, long, value_parser = clap::value_parser!(usize), help_heading = "Options")]
    pub workers: Option<usize>,
    /// 指定后端线路 (可多次使用)，替换内置线路
    #[arg(long, value_name = "URL", help_heading = "Options")]
    pub api: Vec<String>,
    /// 指定远程配置地址
    #[arg(long, value_name = "URL", help_heading = "Options")]
    pub config_url: Option<String>,
    /// 不拉取远程配置，只使用本地线路
    #[arg(long, action = clap::ArgAction::SetTrue, help_heading = "Options")]
    pub offline: bool,

    // --- 通用选项 (General) ---
    /// 显示此帮助信息并退出
    #[arg(short = 'h', long, action = clap::ArgAction::Help, global = true, help_heading = "General")]
    _help: Option<bool>,
    /// 显示版本信息并退出
    #[arg(short = 'V', long, action = clap::ArgAction::Version, global = true, help_heading = "General")]
    _version: Option<bool>,
    /// (隐藏参数) 设置日志文件的输出级别，用于调试
    #[arg(long, value_enum, default_value_t = LogLevel::Off, global = true, hide = true)]
    pub log_level: LogLevel,
}
