//! 作文评估流程 - 流程层
//!
//! 核心职责：定义"一篇作文"的完整处理流程
//!
//! 流程顺序（严格串行，任何一步失败整个运行中止）：
//! 1. 识别手写文字
//! 2. 理解题目要求
//! 3. 评估：逐维度分析 → 逐维度打分 → 总评
//! 4. 详细改进建议
//! 5. 鼓励评语
//! 6. 运行记录标记完成

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use tracing::error;

use crate::clients::{CompletionGateway, ModelSettings, OpenAiGateway};
use crate::config::Config;
use crate::error::AppResult;
use crate::models::{AssessmentReport, PipelineStage};
use crate::prompts::PromptSet;
use crate::services::{
    Assessor, DetailedAnalysisService, EncouragementService, FixedIntervalPacer, Pacer,
    RunLogger, TaskUnderstandingService, TextExtractor,
};
use crate::utils::logging;

/// 作文评估流程
///
/// - 只依赖业务能力（services），不直接访问模型
/// - 每次 `run` 创建独立的 `RunLogger`，多个运行之间没有共享的可变状态
pub struct AssessmentPipeline {
    extractor: TextExtractor,
    understanding: TaskUnderstandingService,
    assessor: Assessor,
    detailer: DetailedAnalysisService,
    encourager: EncouragementService,
    run_log_dir: PathBuf,
}

impl AssessmentPipeline {
    /// 使用注入的网关和节奏控制创建流程
    pub fn new(
        config: &Config,
        prompts: PromptSet,
        gateway: Arc<dyn CompletionGateway>,
        pacer: Arc<dyn Pacer>,
    ) -> Self {
        let general = ModelSettings::from_config(config, config.llm_model_name.clone());
        let ocr = ModelSettings::from_config(config, config.ocr_model_name.clone());
        let scoring = ModelSettings::from_config(config, config.scoring_model_name.clone());

        Self {
            extractor: TextExtractor::new(gateway.clone(), ocr),
            understanding: TaskUnderstandingService::new(
                gateway.clone(),
                general.clone(),
                prompts.task_understanding.clone(),
            ),
            assessor: Assessor::new(gateway.clone(), pacer, general.clone(), scoring, &prompts),
            detailer: DetailedAnalysisService::new(
                gateway.clone(),
                general.clone(),
                prompts.detailed_analysis.clone(),
            ),
            encourager: EncouragementService::new(gateway, general, prompts.encouraging_comment),
            run_log_dir: config.run_log_dir.clone(),
        }
    }

    /// 按配置创建：读取模板、连接 OpenAI 兼容接口、使用固定间隔节奏
    pub async fn from_config(config: &Config) -> AppResult<Self> {
        let gateway = Arc::new(OpenAiGateway::new(config)?);
        let prompts = PromptSet::load(&config.prompts_dir).await?;
        let pacer = Arc::new(FixedIntervalPacer::new(config.pacing_interval()));
        Ok(Self::new(config, prompts, gateway, pacer))
    }

    /// 评估一篇作文
    ///
    /// # 参数
    /// - `task`: 题目原文
    /// - `image_paths`: 作答图片，按页码顺序
    ///
    /// # 返回
    /// 完整的评估结果；任何阶段失败都直接返回错误，不返回部分结果
    pub async fn run(&self, task: &str, image_paths: &[PathBuf]) -> AppResult<AssessmentReport> {
        let mut logger = RunLogger::create(&self.run_log_dir, task).await?;
        let run_id = logger.run_id().to_string();
        logging::log_run_start(&run_id, task, image_paths.len());

        let started = Instant::now();
        match self.execute(task, image_paths, &mut logger).await {
            Ok(report) => {
                logging::log_run_complete(&report, started.elapsed(), logger.path());
                Ok(report)
            }
            Err(e) => {
                error!("[运行 {}] ❌ 评估中止: {}", run_id, e);
                error!("[运行 {}] 已完成部分保存在: {}", run_id, logger.path().display());
                Err(e)
            }
        }
    }

    async fn execute(
        &self,
        task: &str,
        image_paths: &[PathBuf],
        logger: &mut RunLogger,
    ) -> AppResult<AssessmentReport> {
        let run_id = logger.run_id().to_string();

        // ========== 1. 识别手写文字 ==========
        let stage_started = logging::log_stage_start(&run_id, PipelineStage::UnderstandSolution);
        let solution = self.extractor.extract(image_paths).await?;
        logger
            .log_student_solution(&solution, stage_started.elapsed())
            .await?;
        logging::log_stage_complete(&run_id, PipelineStage::UnderstandSolution, stage_started);

        // ========== 2. 理解题目要求 ==========
        let stage_started = logging::log_stage_start(&run_id, PipelineStage::TaskUnderstanding);
        let understanding = self.understanding.understand(task).await?;
        logger.note_defaulted(&understanding.defaulted);
        logger
            .log_task_understanding(&understanding.value, stage_started.elapsed())
            .await?;
        let understanding_text = serde_json::to_string(&understanding.value)?;
        logging::log_stage_complete(&run_id, PipelineStage::TaskUnderstanding, stage_started);

        // ========== 3. 评估 ==========
        let stage_started = logging::log_stage_start(&run_id, PipelineStage::Analysis);
        let analysis = self
            .assessor
            .pre_scoring_assessment(task, &understanding_text, &solution)
            .await?;
        logger.note_defaulted(&analysis.defaulted);
        logger
            .log_analysis(&analysis.value, stage_started.elapsed())
            .await?;
        logging::log_stage_complete(&run_id, PipelineStage::Analysis, stage_started);

        let stage_started = logging::log_stage_start(&run_id, PipelineStage::CriterionScoring);
        let scores = self
            .assessor
            .get_criterion_scores(&analysis.value, task)
            .await?;
        logger.note_defaulted(&scores.defaulted);
        logger
            .log_criterion_scores(&scores.value, stage_started.elapsed())
            .await?;
        logging::log_stage_complete(&run_id, PipelineStage::CriterionScoring, stage_started);

        let stage_started = logging::log_stage_start(&run_id, PipelineStage::GeneralComment);
        let general_comment = self
            .assessor
            .get_general_comment(task, &understanding_text, &solution, &scores.value)
            .await?;
        logger.note_defaulted(&general_comment.defaulted);
        logger
            .log_general_comment(&general_comment.value, stage_started.elapsed())
            .await?;
        logging::log_stage_complete(&run_id, PipelineStage::GeneralComment, stage_started);

        // ========== 4. 详细改进建议 ==========
        let stage_started = logging::log_stage_start(&run_id, PipelineStage::DetailedAnalysis);
        let analysis_text = serde_json::to_string(&analysis.value)?;
        let detailed = self
            .detailer
            .detail(task, &understanding_text, &solution, &analysis_text)
            .await?;
        logger.note_defaulted(&detailed.defaulted);
        logger
            .log_detailed_analysis(&detailed.value, stage_started.elapsed())
            .await?;
        logging::log_stage_complete(&run_id, PipelineStage::DetailedAnalysis, stage_started);

        // ========== 5. 鼓励评语 ==========
        let stage_started = logging::log_stage_start(&run_id, PipelineStage::EncouragingComment);
        let encouraging_comment = self
            .encourager
            .encourage(&detailed.value.to_prompt_text())
            .await?;
        logger
            .log_encouraging_comment(&encouraging_comment, stage_started.elapsed())
            .await?;
        logging::log_stage_complete(&run_id, PipelineStage::EncouragingComment, stage_started);

        logger.complete().await?;

        Ok(AssessmentReport {
            run_id,
            task: task.to_string(),
            extracted_text: solution,
            task_understanding: understanding.value,
            analysis: analysis.value,
            criterion_scores: scores.value,
            general_comment: general_comment.value,
            detailed_analysis: detailed.value,
            encouraging_comment,
            defaulted_fields: logger.record().defaulted_fields.clone(),
        })
    }
}
