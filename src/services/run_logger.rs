//! 运行记录服务
//!
//! 每次流水线运行一个实例，独占持有 `RunRecord`。
//! 每记录一个阶段的结果都会立即把完整记录写入磁盘，
//! 运行中途崩溃后也可以查看已经完成的部分。

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use chrono::{DateTime, Local};
use serde_json::Value;
use tracing::{debug, warn};

use crate::error::{AppError, AppResult};
use crate::models::{CriterionMap, CriterionScore, DetailedAnalysis, PipelineStage, RunRecord};

/// 进程内递增序号；与进程号一起保证同一毫秒内创建的运行也有不同的 run_id
static RUN_SEQUENCE: AtomicU64 = AtomicU64::new(0);

/// 记录器状态
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoggerState {
    Created,
    SolutionLogged,
    UnderstandingLogged,
    AnalysisLogged,
    ScoresLogged,
    CommentLogged,
    DetailedAnalysisLogged,
    EncouragementLogged,
    Completed,
}

pub struct RunLogger {
    record: RunRecord,
    path: PathBuf,
    state: LoggerState,
}

impl RunLogger {
    /// 创建新的运行记录并立即落盘
    ///
    /// # 参数
    /// - `log_dir`: 运行记录目录
    /// - `task`: 本次运行的题目
    pub async fn create(log_dir: impl AsRef<Path>, task: &str) -> AppResult<Self> {
        let now = Local::now();
        let sequence = RUN_SEQUENCE.fetch_add(1, Ordering::Relaxed);
        let run_id = format_run_id(&now, std::process::id(), sequence);
        let path = log_dir.as_ref().join(format!("run_{}.json", run_id));

        let logger = Self {
            record: RunRecord::new(run_id, task, now),
            path,
            state: LoggerState::Created,
        };
        logger.persist().await?;
        debug!("已创建运行记录: {}", logger.path.display());
        Ok(logger)
    }

    pub fn run_id(&self) -> &str {
        &self.record.run_id
    }

    pub fn record(&self) -> &RunRecord {
        &self.record
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn state(&self) -> LoggerState {
        self.state
    }

    pub async fn log_student_solution(&mut self, solution: &str, elapsed: Duration) -> AppResult<()> {
        self.record.student_solution = Some(solution.to_string());
        self.advance(LoggerState::SolutionLogged, PipelineStage::UnderstandSolution, elapsed)
            .await
    }

    pub async fn log_task_understanding(&mut self, understanding: &Value, elapsed: Duration) -> AppResult<()> {
        self.record.task_understanding = Some(understanding.clone());
        self.advance(LoggerState::UnderstandingLogged, PipelineStage::TaskUnderstanding, elapsed)
            .await
    }

    pub async fn log_analysis(&mut self, analysis: &CriterionMap<String>, elapsed: Duration) -> AppResult<()> {
        self.record.analysis = Some(analysis.clone());
        self.advance(LoggerState::AnalysisLogged, PipelineStage::Analysis, elapsed)
            .await
    }

    pub async fn log_criterion_scores(
        &mut self,
        scores: &CriterionMap<CriterionScore>,
        elapsed: Duration,
    ) -> AppResult<()> {
        self.record.criterion_scores = Some(scores.clone());
        self.advance(LoggerState::ScoresLogged, PipelineStage::CriterionScoring, elapsed)
            .await
    }

    pub async fn log_general_comment(&mut self, comment: &str, elapsed: Duration) -> AppResult<()> {
        self.record.general_comment = Some(comment.to_string());
        self.advance(LoggerState::CommentLogged, PipelineStage::GeneralComment, elapsed)
            .await
    }

    pub async fn log_detailed_analysis(&mut self, detailed: &DetailedAnalysis, elapsed: Duration) -> AppResult<()> {
        self.record.detailed_analysis = Some(detailed.clone());
        self.advance(LoggerState::DetailedAnalysisLogged, PipelineStage::DetailedAnalysis, elapsed)
            .await
    }

    pub async fn log_encouraging_comment(&mut self, comment: &str, elapsed: Duration) -> AppResult<()> {
        self.record.encouraging_comment = Some(comment.to_string());
        self.advance(LoggerState::EncouragementLogged, PipelineStage::EncouragingComment, elapsed)
            .await
    }

    /// 记录使用了哨兵值的字段，随下一次落盘写入
    pub fn note_defaulted(&mut self, fields: &[String]) {
        for field in fields {
            if !self.record.defaulted_fields.contains(field) {
                self.record.defaulted_fields.push(field.clone());
            }
        }
    }

    /// 标记运行完成
    pub async fn complete(&mut self) -> AppResult<()> {
        self.record.completed = true;
        self.record.completed_at = Some(Local::now());
        self.state = LoggerState::Completed;
        self.persist().await
    }

    async fn advance(&mut self, state: LoggerState, stage: PipelineStage, elapsed: Duration) -> AppResult<()> {
        if self.state == LoggerState::Completed {
            warn!("运行 {} 已完成，仍在记录阶段 {}", self.record.run_id, stage);
        } else {
            self.state = state;
        }
        self.record
            .step_timings
            .insert(stage.as_str().to_string(), elapsed.as_secs_f64());
        self.persist().await
    }

    /// 写入完整记录：先写临时文件再重命名，避免留下半截文件
    async fn persist(&self) -> AppResult<()> {
        let persistence_error = |path: &Path| {
            let path = path.to_path_buf();
            move |source| AppError::Persistence { path, source }
        };

        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(persistence_error(parent))?;
        }

        let json = serde_json::to_vec_pretty(&self.record)?;
        let tmp_path = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp_path, json)
            .await
            .map_err(persistence_error(&tmp_path))?;
        tokio::fs::rename(&tmp_path, &self.path)
            .await
            .map_err(persistence_error(&self.path))?;
        Ok(())
    }
}

/// `{时间}_{进程号}_{序号}`，多个进程同时写入同一目录时也不会重名
fn format_run_id(now: &DateTime<Local>, pid: u32, sequence: u64) -> String {
    format!("{}_{}_{:04}", now.format("%Y%m%d_%H%M%S_%3f"), pid, sequence)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Criterion;

    async fn read_record(path: &Path) -> serde_json::Value {
        let bytes = tokio::fs::read(path).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_create_persists_initial_record() {
        let dir = tempfile::tempdir().unwrap();
        let logger = RunLogger::create(dir.path(), "Write a letter").await.unwrap();

        assert_eq!(logger.state(), LoggerState::Created);
        let json = read_record(logger.path()).await;
        assert_eq!(json["task"], "Write a letter");
        assert_eq!(json["completed"], false);
        assert!(json["student_solution"].is_null());
    }

    #[tokio::test]
    async fn test_each_step_accumulates() {
        let dir = tempfile::tempdir().unwrap();
        let mut logger = RunLogger::create(dir.path(), "task").await.unwrap();

        logger
            .log_student_solution("Dear Sir", Duration::from_millis(1500))
            .await
            .unwrap();
        let after_solution = read_record(logger.path()).await;

        logger
            .log_task_understanding(&serde_json::json!({"text_type": "letter"}), Duration::from_secs(1))
            .await
            .unwrap();
        let after_understanding = read_record(logger.path()).await;

        assert_eq!(after_solution["student_solution"], "Dear Sir");
        assert_eq!(after_understanding["student_solution"], after_solution["student_solution"]);
        assert_eq!(after_understanding["task_understanding"]["text_type"], "letter");
        assert_eq!(after_understanding["step_timings"]["understand_solution"], 1.5);

        let scores = CriterionMap::from_fn(|_| CriterionScore {
            score: 2,
            justification: "ok".to_string(),
        });
        logger.log_criterion_scores(&scores, Duration::ZERO).await.unwrap();
        let json = read_record(logger.path()).await;
        assert_eq!(json["criterion_scores"][Criterion::Language.as_str()]["score"], 2);
        assert_eq!(logger.state(), LoggerState::ScoresLogged);
    }

    #[tokio::test]
    async fn test_complete_sets_flag() {
        let dir = tempfile::tempdir().unwrap();
        let mut logger = RunLogger::create(dir.path(), "task").await.unwrap();
        logger.note_defaulted(&["analysis.content".to_string()]);
        logger.complete().await.unwrap();

        let record: RunRecord =
            serde_json::from_slice(&tokio::fs::read(logger.path()).await.unwrap()).unwrap();
        assert!(record.completed);
        assert!(record.completed_at.is_some());
        assert_eq!(record.defaulted_fields, vec!["analysis.content".to_string()]);
        assert_eq!(logger.state(), LoggerState::Completed);
    }

    #[tokio::test]
    async fn test_back_to_back_runs_have_distinct_ids() {
        let dir = tempfile::tempdir().unwrap();
        let first = RunLogger::create(dir.path(), "task").await.unwrap();
        let second = RunLogger::create(dir.path(), "task").await.unwrap();

        assert_ne!(first.run_id(), second.run_id());
        assert_ne!(first.path(), second.path());
        assert!(first.path().exists());
        assert!(second.path().exists());
    }

    #[test]
    fn test_run_id_differs_across_processes() {
        let now = Local::now();
        let one = format_run_id(&now, 4242, 0);
        let other = format_run_id(&now, 4243, 0);

        assert_ne!(one, other);
        assert!(one.contains("_4242_0000"));
    }

    #[tokio::test]
    async fn test_run_id_includes_process_id() {
        let dir = tempfile::tempdir().unwrap();
        let logger = RunLogger::create(dir.path(), "task").await.unwrap();
        assert!(logger
            .run_id()
            .contains(&format!("_{}_", std::process::id())));
    }
}
