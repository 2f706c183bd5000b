use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use prof_reviewer::services::HistoryStore;
use prof_reviewer::utils::logging;
use prof_reviewer::{AssessmentPipeline, Config};
use tracing::info;

/// 手写英语作文评估
#[derive(Debug, Parser)]
#[command(name = "prof-reviewer", version)]
struct Cli {
    /// 题目原文
    #[arg(long, conflicts_with = "task_file")]
    task: Option<String>,

    /// 从文件读取题目
    #[arg(long)]
    task_file: Option<PathBuf>,

    /// 作答图片，可重复，按页码顺序
    #[arg(long = "image", required = true)]
    images: Vec<PathBuf>,

    /// 把完整结果写入 JSON 文件
    #[arg(long)]
    output: Option<PathBuf>,

    /// 保存到历史记录
    #[arg(long)]
    save_history: bool,

    /// 显示详细日志
    #[arg(long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // 加载配置
    let mut config = Config::from_env();
    config.verbose_logging |= cli.verbose;

    // 初始化日志
    logging::init(config.verbose_logging);

    let task = match (&cli.task, &cli.task_file) {
        (Some(task), _) => task.clone(),
        (None, Some(path)) => tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("无法读取题目文件: {}", path.display()))?,
        (None, None) => anyhow::bail!("请通过 --task 或 --task-file 提供题目"),
    };

    let pipeline = AssessmentPipeline::from_config(&config)
        .await
        .context("初始化评估流程失败")?;

    let report = pipeline.run(task.trim(), &cli.images).await?;

    println!("\n{}\n", report.general_comment);
    println!("{}\n", report.encouraging_comment);

    if let Some(output) = &cli.output {
        let json = serde_json::to_vec_pretty(&report)?;
        tokio::fs::write(output, json)
            .await
            .with_context(|| format!("无法写入结果文件: {}", output.display()))?;
        info!("✓ 结果已写入: {}", output.display());
    }

    if cli.save_history {
        HistoryStore::new(&config.history_dir).save(&report).await?;
    }

    Ok(())
}
