//! 提示词模板集合
//!
//! 启动时一次性读入内存，运行过程中不再读取文件

use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::error::{AppError, AppResult};
use crate::models::{Criterion, CriterionMap};

const TASK_UNDERSTANDING: &str = "stages/1-task-understanding/task-understanding.md";
const PRE_SCORING: &str = "stages/2-assessment/pre-scoring-assessment.md";
const SCORING: &str = "stages/2-assessment/scoring-assessment.md";
const DETAILED_ANALYSIS: &str = "stages/4-detailed-analysis/detailed-analysis.md";
const GENERAL_COMMENT: &str = "stages/5-final-comments/general-comment.md";
const ENCOURAGING_COMMENT: &str = "stages/5-final-comments/encouraging-comment.md";

/// 所有阶段使用的模板
#[derive(Debug, Clone)]
pub struct PromptSet {
    pub task_understanding: String,
    pub pre_scoring: String,
    pub scoring: String,
    pub general_comment: String,
    pub detailed_analysis: String,
    pub encouraging_comment: String,
    /// 每个维度的评分标准定义
    pub criterion_definitions: CriterionMap<String>,
    /// 每个维度的分数描述
    pub criterion_descriptors: CriterionMap<String>,
}

impl PromptSet {
    /// 从模板目录加载全部模板
    ///
    /// # 参数
    /// - `root`: 模板根目录（例如 `prompts/`）
    pub async fn load(root: impl AsRef<Path>) -> AppResult<Self> {
        let root = root.as_ref();
        info!("📁 正在加载提示词模板: {}", root.display());

        let mut criterion_definitions = CriterionMap::<String>::default();
        let mut criterion_descriptors = CriterionMap::<String>::default();
        for criterion in Criterion::ALL {
            criterion_definitions[criterion] =
                read_template(&root.join(criterion_file(criterion, "definition.md"))).await?;
            criterion_descriptors[criterion] =
                read_template(&root.join(criterion_file(criterion, "descriptor.md"))).await?;
        }

        let prompts = Self {
            task_understanding: read_template(&root.join(TASK_UNDERSTANDING)).await?,
            pre_scoring: read_template(&root.join(PRE_SCORING)).await?,
            scoring: read_template(&root.join(SCORING)).await?,
            general_comment: read_template(&root.join(GENERAL_COMMENT)).await?,
            detailed_analysis: read_template(&root.join(DETAILED_ANALYSIS)).await?,
            encouraging_comment: read_template(&root.join(ENCOURAGING_COMMENT)).await?,
            criterion_definitions,
            criterion_descriptors,
        };

        info!("✓ 提示词模板加载完成");
        Ok(prompts)
    }
}

fn criterion_file(criterion: Criterion, name: &str) -> PathBuf {
    PathBuf::from("stages/2-assessment").join(criterion.as_str()).join(name)
}

async fn read_template(path: &Path) -> AppResult<String> {
    let content = tokio::fs::read_to_string(path)
        .await
        .map_err(|source| AppError::PromptIo {
            path: path.to_path_buf(),
            source,
        })?;
    debug!("已加载模板 {} ({} 字符)", path.display(), content.len());
    Ok(content)
}
