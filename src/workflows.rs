// src/workflows.rs

use crate::{
    TransferContext,
    cli::Cli,
    config::remote::SnapshotOrigin,
    constants,
    error::{AppError, AppResult},
    extractor,
    health::{HealthVerdict, PageSnapshot, ServiceHealthMonitor},
    models::{JobEvent, LinkRecord, TransferOutcome},
    panel::{Intent, ItemStatus, PanelState, parse_intent, render_item},
    symbols,
    transfer::{self, Cooldown, CooldownPhase, HttpBackend, TransferJob},
    ui, utils,
};
use anyhow::anyhow;
use colored::*;
use log::{debug, error, info, warn};
use std::{
    fs,
    io::{self, Write},
    time::Duration,
};

/// 等待后台上报请求的最长时间
const REPORT_FLUSH_GRACE: Duration = Duration::from_secs(3);

/// 读取 `--text` 或 `--file` 的内容，二者都未指定时返回 None
pub(crate) fn read_input_text(args: &Cli) -> AppResult<Option<String>> {
    if let Some(text) = &args.text {
        return Ok(Some(text.clone()));
    }
    if let Some(path) = &args.file {
        let content = fs::read_to_string(path).map_err(|e| {
            error!("读取文本文件 '{}' 失败: {}", path.display(), e);
            AppError::from(e)
        })?;
        return Ok(Some(content));
    }
    Ok(None)
}

/// 只提取不转存：列出检测到的链接并逐行输出完整链接
pub(crate) fn print_extraction(text: &str) {
    let records = extractor::extract_pan_links(text);
    if records.is_empty() {
        ui::warn("未检测到百度网盘分享链接。");
        return;
    }
    ui::print_records(&records);
    ui::print_sub_header("完整链接");
    for record in &records {
        ui::plain(&record.full_link());
    }
}

/// 从文本中提取链接，按 `--select` 选择后批量转存
pub(crate) async fn run_text(context: &TransferContext, text: &str) -> AppResult<()> {
    let records = extractor::extract_pan_links(text);
    if records.is_empty() {
        ui::warn("未检测到百度网盘分享链接。");
        return Ok(());
    }
    ui::print_records(&records);

    let indices = utils::parse_selection_indices(&context.args.select, records.len());
    if indices.is_empty() {
        ui::info("未选择任何链接。");
        return Ok(());
    }
    let selected: Vec<LinkRecord> = indices.into_iter().map(|i| records[i].clone()).collect();
    debug!("选中 {} 个链接", selected.len());

    transfer::execute_jobs(context, selected).await?;
    context.manager.print_report();

    let stats = context.manager.get_stats();
    if context.manager.did_all_succeed() {
        Ok(())
    } else {
        Err(AppError::Other(anyhow!(
            "{} 个链接转存未完成。",
            stats.failed + stats.rate_limited
        )))
    }
}

/// 手动指定的单个链接
pub(crate) async fn run_manual(
    context: &TransferContext,
    url: &str,
    code: Option<&str>,
) -> AppResult<()> {
    let record = extractor::manual_record(url, code)?;
    ui::print_records(std::slice::from_ref(&record));

    let snapshot = context.current_snapshot();
    if let Some(reason) = snapshot.unavailable_reason() {
        return Err(AppError::ServiceLockout(reason));
    }

    let mut job = TransferJob::new(record, &snapshot);
    ui::info(&format!("目标文件夹: {}", job.folder()));
    let backend = HttpBackend::new(context.http_client.clone(), snapshot.default_rate_limit_secs);
    let outcome = job.run_with_observer(&backend, &mut print_job_event).await;

    match outcome {
        TransferOutcome::Success { target_url } => {
            println!("\n{} 转存成功，请手动打开:", *symbols::OK);
            ui::plain(&format!("  {}", target_url.green()));
            Ok(())
        }
        TransferOutcome::RateLimited { remaining, .. } => Err(AppError::RateLimited { remaining }),
        TransferOutcome::Failed { reason } => Err(AppError::Api(reason)),
        TransferOutcome::Pending => Err(AppError::Other(anyhow!("转存任务未执行"))),
    }
}

fn print_job_event(event: JobEvent) {
    match event {
        JobEvent::AttemptStarted { attempt, endpoint } => {
            debug!("第 {} 次尝试: {}", attempt, endpoint);
            ui::info(&format!("正在通过线路 {} 转存...", endpoint));
        }
        JobEvent::SwitchingEndpoint { reason } => {
            ui::warn(&format!("{}，切换线路重试...", reason));
        }
    }
}

/// 检查指定的后端页面，发现故障时锁定服务并上报
pub(crate) async fn run_inspect(context: &TransferContext, url: &str) -> AppResult<()> {
    let response = context.http_client.fetch_page(url).await?;
    debug!("页面 {} 状态码: {}", url, response.status);
    let page = PageSnapshot::from_html(url, &response.body)?;

    let snapshot = context.snapshot();
    let monitor = ServiceHealthMonitor::new(
        &context.http_client,
        &context.state_store,
        &context.remote_sync,
        &context.config,
        &snapshot,
    );
    let verdict = monitor.inspect(&page, utils::now_millis()).await?;
    monitor.flush_reports(REPORT_FLUSH_GRACE).await;

    match verdict {
        HealthVerdict::NotBackend => {
            ui::info(&format!("'{}' 不属于已知的后端线路，跳过检测。", page.host));
        }
        HealthVerdict::Healthy => {
            println!("{} 页面 '{}' 状态正常。", *symbols::OK, page.host);
        }
        HealthVerdict::Incident {
            signature,
            notice,
            reported,
        } => {
            context.replace_snapshot(snapshot.with_lockout(true));
            info!("页面 {} 故障: {}", page.host, signature.as_str());
            ui::box_message("服务暂不可用", &[notice], |s| s.red());
            if reported {
                ui::info("已向维护者上报故障。");
            }
        }
    }
    Ok(())
}

/// 显示当前配置快照与持久化状态
pub(crate) fn print_status(context: &TransferContext) {
    let snapshot = context.current_snapshot();
    ui::print_header("服务状态");
    let origin = match snapshot.origin {
        SnapshotOrigin::Remote => "远程配置",
        SnapshotOrigin::Fallback => "本地默认",
    };
    ui::plain(&format!("配置来源: {}", origin));
    match snapshot.unavailable_reason() {
        None => ui::plain(&format!("服务状态: {}", "可用".green())),
        Some(reason) => ui::plain(&format!("服务状态: {} ({})", "不可用".red(), reason)),
    }
    if snapshot.locked_out {
        println!("{} 检测到后端故障，已锁定，等待维护者重置。", *symbols::LOCKED);
    }
    if let Some(message) = snapshot.message.as_deref()
        && snapshot.is_available()
    {
        ui::plain(&format!("公告: {}", message));
    }
    ui::print_sub_header(&format!("线路 ({})", snapshot.endpoints.len()));
    if snapshot.endpoints.is_empty() {
        ui::plain(&format!("  {}", constants::messages::NO_API_AVAILABLE.yellow()));
    }
    for endpoint in &snapshot.endpoints {
        ui::plain(&format!("  - {}", endpoint));
    }
    ui::plain(&format!("\n状态文件: {}", context.state_store.path().display()));
}

enum PanelExit {
    /// 关闭当前面板，回到粘贴文本
    Close,
    Quit,
}

/// 运行交互模式
pub(crate) async fn run_interactive(context: TransferContext) -> AppResult<()> {
    ui::print_header("交互模式");
    ui::plain(&format!(
        "粘贴包含分享链接的文本，以空行结束。直接按回车退出，按 {} 可随时退出。",
        *symbols::CTRL_C
    ));
    if let Some(reason) = context.snapshot().unavailable_reason() {
        ui::warn(&reason);
    }

    loop {
        let text = match ui::prompt_multiline("请粘贴文本") {
            Ok(text) => text,
            Err(_) => return Err(AppError::UserInterrupt),
        };
        if text.trim().is_empty() {
            break;
        }

        let records = extractor::extract_pan_links(&text);
        if records.is_empty() {
            ui::warn("未检测到百度网盘分享链接，可输入 m 手动添加。");
        }
        let mut panel = PanelState::new(records);
        match run_panel(&context, &mut panel).await {
            Ok(PanelExit::Close) => continue,
            Ok(PanelExit::Quit) => break,
            Err(AppError::UserInterrupt) => return Err(AppError::UserInterrupt),
            Err(e) => {
                error!("交互模式出错: {}", e);
                ui::error(&format!("处理时发生错误: {}", e));
            }
        }
    }

    println!("\n{} 退出交互模式。", *symbols::INFO);
    Ok(())
}

async fn run_panel(context: &TransferContext, panel: &mut PanelState) -> AppResult<PanelExit> {
    print_panel(panel);
    loop {
        let input = match ui::prompt("请输入指令 (h 查看帮助，回车返回)", None) {
            Ok(input) => input,
            Err(_) => return Err(AppError::UserInterrupt),
        };
        if input.is_empty() {
            return Ok(PanelExit::Close);
        }

        let intent = match parse_intent(&input) {
            Ok(intent) => intent,
            Err(msg) => {
                ui::warn(&msg);
                continue;
            }
        };
        debug!("面板指令: {:?}", intent);

        match intent {
            Intent::Quit => return Ok(PanelExit::Quit),
            Intent::List => print_panel(panel),
            Intent::Help => ui::box_message(
                "使用说明",
                constants::HELP_USAGE_GUIDE
                    .lines()
                    .collect::<Vec<_>>()
                    .as_slice(),
                |s| s.cyan(),
            ),
            Intent::Copy(index) => match panel.get(index) {
                Some(item) => {
                    ui::plain(&item.record.full_link());
                    ui::info("已输出完整链接，可直接复制。");
                }
                None => warn_index(index, panel),
            },
            Intent::Open(index) => match panel.get(index).map(|item| &item.status) {
                Some(ItemStatus::Succeeded { target_url }) => {
                    ui::info(&format!("请在浏览器中打开: {}", target_url.green()));
                }
                Some(_) => ui::warn("该条目尚未转存成功。"),
                None => warn_index(index, panel),
            },
            Intent::Transfer(index) | Intent::Retry(index) => {
                transfer_item(context, panel, index).await?;
            }
            Intent::Manual => {
                if let Some(index) = prompt_manual_record(panel)? {
                    transfer_item(context, panel, index).await?;
                }
            }
        }
    }
}

fn print_panel(panel: &PanelState) {
    let lines = panel.render();
    if let Some((title, rest)) = lines.split_first() {
        ui::print_sub_header(title);
        for line in rest {
            ui::plain(line);
        }
    }
}

fn print_item(panel: &PanelState, index: usize) {
    if let Some(item) = panel.get(index) {
        for line in render_item(index, item) {
            ui::plain(&line);
        }
    }
}

fn warn_index(index: usize, panel: &PanelState) {
    ui::warn(&format!(
        "序号 {} 超出范围 (共 {} 条)。",
        index + 1,
        panel.items.len()
    ));
}

/// 询问链接与提取码，校验通过后加入面板并返回其序号
fn prompt_manual_record(panel: &mut PanelState) -> AppResult<Option<usize>> {
    let url = ui::prompt("请输入分享链接", None).map_err(|_| AppError::UserInterrupt)?;
    if url.is_empty() {
        return Ok(None);
    }
    let code = ui::prompt("请输入提取码 (可留空)", None).map_err(|_| AppError::UserInterrupt)?;
    let code = (!code.is_empty()).then_some(code);
    match extractor::manual_record(&url, code.as_deref()) {
        Ok(record) => {
            let index = panel.push(record);
            print_item(panel, index);
            Ok(Some(index))
        }
        Err(e) => {
            ui::warn(&e.to_string());
            Ok(None)
        }
    }
}

async fn transfer_item(
    context: &TransferContext,
    panel: &mut PanelState,
    index: usize,
) -> AppResult<()> {
    let Some(item) = panel.get(index) else {
        warn_index(index, panel);
        return Ok(());
    };
    if !item.status.allows_transfer() {
        ui::warn(&format!("当前状态无法转存: {}", item.status.action_label()));
        return Ok(());
    }
    let record = item.record.clone();

    let snapshot = context.current_snapshot();
    if let Some(reason) = snapshot.unavailable_reason() {
        panel.set_status(index, ItemStatus::Locked { reason });
        print_item(panel, index);
        return Ok(());
    }

    panel.set_status(index, ItemStatus::Working);
    print_item(panel, index);

    let mut job = TransferJob::new(record, &snapshot);
    let backend = HttpBackend::new(context.http_client.clone(), snapshot.default_rate_limit_secs);
    let outcome = job.run_with_observer(&backend, &mut print_job_event).await;
    panel.set_status(index, ItemStatus::from_outcome(&outcome));
    print_item(panel, index);

    if let TransferOutcome::RateLimited { remaining, .. } = outcome {
        let target = Cooldown::start(remaining, index)
            .run(|phase| match phase {
                CooldownPhase::Counting(secs) => {
                    print!("\r{} 请求过于频繁，{:>3} 秒后可重试...", *symbols::WAIT, secs);
                    io::stdout().flush().ok();
                }
                CooldownPhase::RetryAvailable => println!(),
            })
            .await;
        panel.set_status(target, ItemStatus::RetryAvailable);
        print_item(panel, target);
        ui::info(&format!("冷却结束，输入 r {} 重试。", target + 1));
    } else if let TransferOutcome::Failed { reason } = job.outcome() {
        warn!("转存失败: {}", reason);
    }
    Ok(())
}
