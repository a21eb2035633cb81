// src/transfer/task_runner.rs

use super::{HttpBackend, TransferJob, backend::TransferBackend};
use crate::{
    TransferContext,
    config::remote::ConfigSnapshot,
    error::*,
    models::{JobEvent, LinkRecord, TransferOutcome},
    ui, utils,
};
use futures::{StreamExt, stream};
use indicatif::ProgressBar;
use std::{cmp::min, sync::atomic::Ordering};

/// 并发执行一批互不相关的转存任务。每个任务持有自己的线路池拷贝。
pub async fn execute_jobs(context: &TransferContext, records: Vec<LinkRecord>) -> AppResult<()> {
    let snapshot = context.snapshot();
    if let Some(reason) = snapshot.unavailable_reason() {
        return Err(AppError::ServiceLockout(reason));
    }

    let max_workers = min(context.config.max_workers, records.len());
    if max_workers == 0 {
        return Ok(());
    }

    context.manager.start_batch(records.len());
    ui::plain("");
    ui::info(&format!(
        "开始转存 {} 个链接 (可用线路: {}, 并发数: {})...",
        records.len(),
        snapshot.endpoints.len(),
        max_workers
    ));
    let main_pbar = ui::new_tasks_progress_bar(records.len() as u64, "转存");
    let backend = HttpBackend::new(context.http_client.clone(), snapshot.default_rate_limit_secs);

    stream::iter(records)
        .for_each_concurrent(max_workers, |record| {
            run_single_job(record, context, &snapshot, &backend, &main_pbar)
        })
        .await;

    main_pbar.finish_and_clear();
    if context.cancellation_token.load(Ordering::Relaxed) {
        return Err(AppError::UserInterrupt);
    }
    Ok(())
}

async fn run_single_job(
    record: LinkRecord,
    context: &TransferContext,
    snapshot: &ConfigSnapshot,
    backend: &dyn TransferBackend,
    main_pbar: &ProgressBar,
) {
    if context.cancellation_token.load(Ordering::Relaxed) {
        return;
    }

    let short_url = utils::truncate_text(&record.url, 48);
    let mut job = TransferJob::new(record, snapshot);
    let pbar = main_pbar.clone();
    let label = short_url.clone();
    let outcome = job
        .run_with_observer(backend, &mut move |event| {
            if let JobEvent::SwitchingEndpoint { reason } = event {
                pbar.println(format!("  {} {}: {}，切换线路重试...", *crate::symbols::WARN, label, reason));
            }
        })
        .await;

    let (symbol, color_fn, default_msg) = outcome.get_display_info();
    let msg = match &outcome {
        TransferOutcome::Success { target_url } => {
            format!("{} {} -> {}", symbol, short_url, color_fn(target_url.as_str().into()))
        }
        TransferOutcome::Failed { reason } | TransferOutcome::RateLimited { reason, .. } => format!(
            "{} {} {}",
            symbol,
            short_url,
            color_fn(format!("{}: {}", default_msg, reason).into())
        ),
        TransferOutcome::Pending => format!("{} {}", symbol, short_url),
    };
    main_pbar.println(msg);
    main_pbar.inc(1);

    context.manager.record(&job.into_result());
}
