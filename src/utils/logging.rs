//! 日志工具模块
//!
//! 提供日志初始化和格式化输出的辅助函数

use std::path::Path;
use std::time::{Duration, Instant};

use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::models::{AssessmentReport, PipelineStage};

/// 初始化全局日志，只应在程序入口调用一次
///
/// 优先使用 `RUST_LOG`，否则默认 `info`（详细模式为 `debug`）
pub fn init(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init();
}

/// 记录运行开始
pub fn log_run_start(run_id: &str, task: &str, image_count: usize) {
    info!("{}", "=".repeat(60));
    info!("🚀 开始评估 [运行 {}]", run_id);
    info!("📄 题目: {}", truncate_text(task, 80));
    info!("🖼️ 图片数量: {}", image_count);
    info!("{}", "=".repeat(60));
}

/// 记录阶段开始，返回计时起点
pub fn log_stage_start(run_id: &str, stage: PipelineStage) -> Instant {
    info!("[运行 {}] ▶ {}...", run_id, stage.label());
    Instant::now()
}

/// 记录阶段完成
pub fn log_stage_complete(run_id: &str, stage: PipelineStage, started: Instant) {
    info!(
        "[运行 {}] ✓ {} 完成，耗时 {:.2} 秒",
        run_id,
        stage.label(),
        started.elapsed().as_secs_f64()
    );
}

/// 打印最终结果
pub fn log_run_complete(report: &AssessmentReport, elapsed: Duration, record_path: &Path) {
    info!("\n{}", "=".repeat(60));
    info!("📊 评估完成 [运行 {}]", report.run_id);
    info!("{}", "=".repeat(60));
    for (criterion, score) in report.criterion_scores.iter() {
        info!("  {:<28} {}/5", criterion.as_str(), score.score);
    }
    info!(
        "✅ 总分: {}/{} ({:.1}%)",
        report.total_score(),
        report.max_score(),
        report.score_percentage()
    );
    if !report.defaulted_fields.is_empty() {
        info!("⚠️ 使用默认值的字段: {}", report.defaulted_fields.join(", "));
    }
    info!("⏱️ 总耗时: {:.2} 秒", elapsed.as_secs_f64());
    info!("{}", "=".repeat(60));
    info!("\n运行记录已保存至: {}", record_path.display());
}

/// 截断长文本用于日志显示
///
/// # 参数
/// - `text`: 原始文本
/// - `max_len`: 最大字符数
///
/// # 返回
/// 返回截断后的文本
pub fn truncate_text(text: &str, max_len: usize) -> String {
    let single_line = text.replace('\n', " ");
    if single_line.chars().count() > max_len {
        single_line.chars().take(max_len).collect::<String>() + "..."
    } else {
        single_line
    }
}
