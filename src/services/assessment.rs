//! 评估服务
//!
//! 三个按顺序执行的子步骤：
//! 1. `pre_scoring_assessment` - 每个维度先做定性分析
//! 2. `get_criterion_scores` - 只根据分析文本给每个维度打分
//! 3. `get_general_comment` - 根据各维度分数生成总评
//!
//! 分析与打分分开，打分请求不需要完整的题目上下文，
//! 分数只取决于分析文本，便于人工复核

use std::sync::Arc;

use tracing::{debug, info};

use crate::clients::{complete_json, CompletionGateway, CompletionRequest, ModelSettings};
use crate::error::AppResult;
use crate::models::decode::{field_score, field_text, Decoded};
use crate::models::{Criterion, CriterionMap, CriterionScore, MAX_CRITERION_SCORE};
use crate::prompts::{render, unresolved_placeholders, PromptSet};
use crate::services::pacing::Pacer;

pub const NO_ANALYSIS: &str = "No analysis found";
pub const NO_JUSTIFICATION: &str = "No justification found";
pub const NO_GENERAL_COMMENT: &str = "No general comment found";

/// 评估服务
///
/// 职责：
/// - 每个维度独立请求，一个子步骤内按固定顺序逐个处理
/// - 不捕获网关错误，原样向上传播
pub struct Assessor {
    gateway: Arc<dyn CompletionGateway>,
    pacer: Arc<dyn Pacer>,
    analysis_settings: ModelSettings,
    scoring_settings: ModelSettings,
    pre_scoring_template: String,
    scoring_template: String,
    general_comment_template: String,
    criterion_definitions: CriterionMap<String>,
    criterion_descriptors: CriterionMap<String>,
}

impl Assessor {
    pub fn new(
        gateway: Arc<dyn CompletionGateway>,
        pacer: Arc<dyn Pacer>,
        analysis_settings: ModelSettings,
        scoring_settings: ModelSettings,
        prompts: &PromptSet,
    ) -> Self {
        Self {
            gateway,
            pacer,
            analysis_settings,
            scoring_settings,
            pre_scoring_template: prompts.pre_scoring.clone(),
            scoring_template: prompts.scoring.clone(),
            general_comment_template: prompts.general_comment.clone(),
            criterion_definitions: prompts.criterion_definitions.clone(),
            criterion_descriptors: prompts.criterion_descriptors.clone(),
        }
    }

    /// 每个维度的定性分析
    ///
    /// # 参数
    /// - `task`: 原始题目
    /// - `task_understanding`: 题目理解（JSON 文本）
    /// - `solution`: 识别出的学生作答
    ///
    /// # 返回
    /// 四个维度的分析文本；缺少 `analysis` 字段时使用哨兵值
    pub async fn pre_scoring_assessment(
        &self,
        task: &str,
        task_understanding: &str,
        solution: &str,
    ) -> AppResult<Decoded<CriterionMap<String>>> {
        let mut analysis = CriterionMap::<String>::default();
        let mut defaulted = Vec::new();

        for criterion in Criterion::ALL {
            info!("📝 正在分析维度: {}", criterion);

            let prompt = render(
                &self.pre_scoring_template,
                &[
                    ("Criterion", criterion.as_str()),
                    ("Criterion-definition", self.criterion_definitions[criterion].as_str()),
                    ("Task", task),
                    ("Task-Understanding", task_understanding),
                    ("Candidates-Solution", solution),
                ],
            );
            log_unresolved(criterion, &prompt);

            let response = complete_json(
                self.gateway.as_ref(),
                CompletionRequest::json(prompt, &self.analysis_settings),
            )
            .await?;

            analysis[criterion] = field_text(&response, "analysis").or_sentinel(
                NO_ANALYSIS.to_string(),
                format!("analysis.{}", criterion),
                &mut defaulted,
            );
        }

        Ok(Decoded::new(analysis, defaulted))
    }

    /// 根据分析文本给每个维度打分
    ///
    /// 维度之间通过 `Pacer` 控制请求节奏；缺少 `score` 时记 0 分
    pub async fn get_criterion_scores(
        &self,
        analysis: &CriterionMap<String>,
        task_description: &str,
    ) -> AppResult<Decoded<CriterionMap<CriterionScore>>> {
        let base_prompt = render(&self.scoring_template, &[("Task-Description", task_description)]);

        let mut scores = CriterionMap::<CriterionScore>::default();
        let mut defaulted = Vec::new();

        for (position, criterion) in Criterion::ALL.into_iter().enumerate() {
            if position > 0 {
                self.pacer.pause().await;
            }

            info!("🎯 正在为维度打分: {}", criterion);

            let prompt = render(
                &base_prompt,
                &[
                    ("Criterion-descriptor", self.criterion_descriptors[criterion].as_str()),
                    ("Criterion", criterion.as_str()),
                    ("Analysis", analysis[criterion].as_str()),
                ],
            );
            debug!("维度 {} 的打分提示词长度: {} 字符", criterion, prompt.len());
            log_unresolved(criterion, &prompt);

            let response = complete_json(
                self.gateway.as_ref(),
                CompletionRequest::json(prompt, &self.scoring_settings),
            )
            .await?;

            let score = field_score(&response, "score").or_sentinel(
                0,
                format!("score.{}", criterion),
                &mut defaulted,
            );
            let justification = field_text(&response, "justification").or_sentinel(
                NO_JUSTIFICATION.to_string(),
                format!("justification.{}", criterion),
                &mut defaulted,
            );

            info!("✓ 维度 {} 得分: {}/{}", criterion, score, MAX_CRITERION_SCORE);
            scores[criterion] = CriterionScore {
                score,
                justification,
            };
        }

        Ok(Decoded::new(scores, defaulted))
    }

    /// 根据各维度分数生成总评
    pub async fn get_general_comment(
        &self,
        task: &str,
        task_understanding: &str,
        solution: &str,
        criterion_scores: &CriterionMap<CriterionScore>,
    ) -> AppResult<Decoded<String>> {
        info!("💬 正在生成总评...");

        let serialized_scores = serde_json::to_string(
            &criterion_scores.map(|_, s| (s.score, s.justification.clone())),
        )?;

        let prompt = render(
            &self.general_comment_template,
            &[
                ("Task", task),
                ("Candidates-Solution", solution),
                ("Task-Understanding", task_understanding),
                ("Criterion-Scores", serialized_scores.as_str()),
            ],
        );

        let response = complete_json(
            self.gateway.as_ref(),
            CompletionRequest::json(prompt, &self.analysis_settings),
        )
        .await?;

        let mut defaulted = Vec::new();
        let comment = field_text(&response, "general_comment").or_sentinel(
            NO_GENERAL_COMMENT.to_string(),
            "general_comment",
            &mut defaulted,
        );

        Ok(Decoded::new(comment, defaulted))
    }
}

fn log_unresolved(criterion: Criterion, prompt: &str) {
    let unresolved = unresolved_placeholders(prompt);
    if !unresolved.is_empty() {
        debug!("维度 {} 的提示词仍有未替换的占位符: {:?}", criterion, unresolved);
    }
}
