// src/lib.rs

pub mod cli;
pub mod client;
pub mod config;
pub mod constants;
pub mod error;
pub mod extractor;
pub mod health;
pub mod models;
pub mod panel;
pub mod symbols;
pub mod transfer;
pub mod ui;
pub mod utils;
mod workflows;

use crate::{
    cli::Cli,
    client::RobustClient,
    config::{
        AppConfig,
        remote::{ConfigSnapshot, RemoteConfigSync},
        state::StateStore,
    },
    error::{AppError, AppResult},
    transfer::TransferManager,
};
use colored::*;
use log::{debug, warn};
use std::sync::{Arc, RwLock, atomic::AtomicBool};

/// 核心的执行上下文，包含所有任务所需的状态和工具
#[derive(Clone)]
pub struct TransferContext {
    pub manager: TransferManager,
    pub config: Arc<AppConfig>,
    pub http_client: Arc<RobustClient>,
    pub state_store: Arc<StateStore>,
    pub remote_sync: Arc<RemoteConfigSync>,
    snapshot: Arc<RwLock<Arc<ConfigSnapshot>>>,
    pub args: Arc<Cli>,
    pub cancellation_token: Arc<AtomicBool>,
}

impl TransferContext {
    pub fn new(
        config: Arc<AppConfig>,
        http_client: Arc<RobustClient>,
        state_store: Arc<StateStore>,
        args: Arc<Cli>,
        cancellation_token: Arc<AtomicBool>,
    ) -> AppResult<Self> {
        let remote_sync = Arc::new(RemoteConfigSync::new(
            http_client.clone(),
            &config,
            state_store.clone(),
        ));
        let initial = ConfigSnapshot::fallback(&config, &state_store.load()?);
        Ok(Self {
            manager: TransferManager::new(),
            config,
            http_client,
            state_store,
            remote_sync,
            snapshot: Arc::new(RwLock::new(Arc::new(initial))),
            args,
            cancellation_token,
        })
    }

    /// 当前生效的配置快照
    pub fn snapshot(&self) -> Arc<ConfigSnapshot> {
        match self.snapshot.read() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    pub fn replace_snapshot(&self, next: ConfigSnapshot) -> Arc<ConfigSnapshot> {
        let next = Arc::new(next);
        match self.snapshot.write() {
            Ok(mut guard) => *guard = next.clone(),
            Err(poisoned) => *poisoned.into_inner() = next.clone(),
        }
        next
    }

    /// 拉取远程配置生成新快照。离线模式下只刷新本地 lockout。
    pub async fn refresh_snapshot(&self) -> Arc<ConfigSnapshot> {
        let current = self.snapshot();
        let next = if self.args.offline {
            self.snapshot_with_durable_lockout(&current)
        } else {
            self.remote_sync.sync(&current).await
        };
        self.replace_snapshot(next)
    }

    /// 用持久化的 lockout 覆盖快照中的值，其他进程写入的锁定也能生效
    pub fn current_snapshot(&self) -> Arc<ConfigSnapshot> {
        let current = self.snapshot();
        let next = self.snapshot_with_durable_lockout(&current);
        if next == *current {
            return current;
        }
        self.replace_snapshot(next)
    }

    fn snapshot_with_durable_lockout(&self, current: &ConfigSnapshot) -> ConfigSnapshot {
        match self.state_store.load() {
            Ok(state) => current.with_lockout(state.lockout),
            Err(e) => {
                warn!("读取本地状态失败: {}", e);
                current.clone()
            }
        }
    }
}

/// 库的公共入口点，由 `main.rs` 调用
pub async fn run_from_cli(args: Arc<Cli>, cancellation_token: Arc<AtomicBool>) -> AppResult<()> {
    debug!("CLI 参数: {:?}", args);
    // url 属于 mode 参数组，clap 的 requires 在其他模式下不生效
    if args.code.is_some() && args.url.is_none() {
        return Err(AppError::UserInputError(
            constants::messages::CODE_WITHOUT_URL.to_string(),
        ));
    }
    if args.usage_help {
        ui::box_message(
            "使用说明",
            constants::HELP_USAGE_GUIDE
                .lines()
                .collect::<Vec<_>>()
                .as_slice(),
            |s| s.cyan(),
        );
        return Ok(());
    }

    // 只提取不转存时不需要网络与本地状态
    if args.extract_only {
        if let Some(text) = workflows::read_input_text(&args)? {
            workflows::print_extraction(&text);
            return Ok(());
        }
        if let Some(url) = &args.url {
            let record = extractor::manual_record(url, args.code.as_deref())?;
            ui::plain(&record.full_link());
            return Ok(());
        }
    }

    let config = Arc::new(AppConfig::new(&args)?);
    debug!("加载的应用配置: {:?}", config);

    let state_store = Arc::new(StateStore::open_default()?);
    let http_client = Arc::new(RobustClient::new(&config)?);
    let context = TransferContext::new(
        config,
        http_client,
        state_store,
        args.clone(),
        cancellation_token,
    )?;
    context.refresh_snapshot().await;

    if args.interactive {
        workflows::run_interactive(context).await?;
    } else if let Some(url) = &args.url {
        workflows::run_manual(&context, url, args.code.as_deref()).await?;
    } else if let Some(url) = &args.inspect {
        workflows::run_inspect(&context, url).await?;
    } else if args.status {
        workflows::print_status(&context);
    } else if let Some(text) = workflows::read_input_text(&args)? {
        workflows::run_text(&context, &text).await?;
    }

    Ok(())
}
