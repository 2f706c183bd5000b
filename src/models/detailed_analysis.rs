use serde::{Deserialize, Serialize};

/// 改进建议条目
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DetailedAnalysisItem {
    pub category: String,
    pub text_reference: String,
    pub issue: String,
    #[serde(default)]
    pub suggestions: Vec<String>,
}

/// 详细分析结果
///
/// 模型没有返回列表时为 `Unavailable`，保存哨兵文本；
/// 序列化形状与历史记录一致（列表或字符串）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DetailedAnalysis {
    Items(Vec<DetailedAnalysisItem>),
    Unavailable(String),
}

impl DetailedAnalysis {
    /// 条目列表，不可用时为空
    pub fn items(&self) -> &[DetailedAnalysisItem] {
        match self {
            DetailedAnalysis::Items(items) => items,
            DetailedAnalysis::Unavailable(_) => &[],
        }
    }

    /// 鼓励评语阶段的输入：每个条目一段 JSON，空行分隔
    pub fn to_prompt_text(&self) -> String {
        match self {
            DetailedAnalysis::Items(items) => items
                .iter()
                .filter_map(|item| serde_json::to_string(item).ok())
                .map(|line| line + "\n\n")
                .collect(),
            DetailedAnalysis::Unavailable(sentinel) => sentinel.clone(),
        }
    }
}
