// src/constants.rs

pub const UI_WIDTH: usize = 88;
pub const URL_TRUNCATE_LENGTH: usize = 72;
pub const CONFIG_DIR_NAME: &str = concat!(".", clap::crate_name!());
pub const CONFIG_FILE_NAME: &str = "config.json";
pub const STATE_FILE_NAME: &str = "state.json";
pub const LOG_FILE_NAME: &str = "pan-transfer.log";
pub const LOG_FALLBACK_FILE_NAME: &str = "fallback.log";
pub const DEFAULT_SELECTION: &str = "all";
pub const DEFAULT_WORKERS: usize = 3;
pub const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36";

/// 远程配置获取失败时使用的内置线路
pub const DEFAULT_APIS: [&str; 3] = [
    "https://dl.20250823.xyz",
    "https://dl1.20250823.xyz",
    "https://dl2.20250823.xyz",
];

pub const REMOTE_CONFIG_URL: &str = "https://gist.githubusercontent.com/keinen88/cdab96f5b393eea716453910371fb399/raw/remote_config_url.json";
pub const REMOTE_CONFIG_TIMEOUT_SECS: u64 = 8;

pub mod transfer {
    /// 转存源路径前缀，会与目标文件夹拼接
    pub const SOURCE_PATH_PREFIX: &str = "/百度网盘/分享";
    pub const FAILOVER_BACKOFF_MS: u64 = 1000;
    pub const DEFAULT_RATE_LIMIT_SECS: u64 = 60;
}

pub mod api {
    pub const MKDIR_PATH: &str = "/api/fs/mkdir";
    pub const OTHER_PATH: &str = "/api/fs/other";
    pub const TRANSFER_METHOD: &str = "transfer_file";
    pub const CODE_OK: i64 = 200;
    pub const CODE_RATE_LIMITED: i64 = 429;
    pub const ERRNO_OK: i64 = 0;
}

pub mod messages {
    pub const NO_API_AVAILABLE: &str = "暂无可用 API";
    pub const MKDIR_FAILED: &str = "创建文件夹失败";
    pub const TRANSFER_FAILED: &str = "转存失败(API错误)";
    pub const NETWORK_INTERRUPTED: &str = "网络中断";
    pub const INVALID_LINK: &str = "链接无效";
    pub const SERVICE_DISABLED: &str = "服务已暂停，请稍后再试";
    pub const CODE_WITHOUT_URL: &str = "--code 只能与 --url <URL> 一起使用";
}

pub mod health {
    pub const SERVER_ERROR_TITLE: &str = "500 Internal Server Error";
    /// 后端反序列化失败时页面中出现的特征文本
    pub const DESERIALIZE_ERROR_MARKERS: &[&str] = &[
        "failed to deserialize",
        "cannot unmarshal",
        "json: invalid character",
    ];
    pub const REPORT_COOLDOWN_SECS: u64 = 60 * 60;
    pub const INCIDENT_NOTICE: &str = "服务维护中：后端暂时出现故障，转存功能已自动停用，待管理员处理后恢复。";
}

pub const HELP_USAGE_GUIDE: &str = r#"
1. 复制包含百度网盘分享链接的文本 (可包含提取码、解压密码)。
2. 运行交互模式并粘贴文本，以空行结束输入。
3. 在列表中使用以下指令:
   c <序号>  复制完整链接 (带提取码)
   t <序号>  转存到网盘
   o <序号>  显示转存结果地址
   r <序号>  重试
   m         手动输入链接与提取码
   l         重新显示列表
   q         退出"#;
