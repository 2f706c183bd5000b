//! 模型返回 JSON 的字段解码
//!
//! 缺失字段不是错误：每个调用点显式选择哨兵值，
//! 同时把回退记录下来，写入运行记录的 `defaulted_fields`

use serde_json::{Map, Value};
use tracing::warn;

use crate::models::criterion::MAX_CRITERION_SCORE;
use crate::models::detailed_analysis::{DetailedAnalysis, DetailedAnalysisItem};

/// 字段解码结果
#[derive(Debug, Clone, PartialEq)]
pub enum FieldOutcome<T> {
    Present(T),
    Missing(&'static str),
}

impl<T> FieldOutcome<T> {
    /// 缺失时使用哨兵值，并把 `label` 记到 `defaulted` 中
    pub fn or_sentinel(self, sentinel: T, label: impl Into<String>, defaulted: &mut Vec<String>) -> T {
        match self {
            FieldOutcome::Present(value) => value,
            FieldOutcome::Missing(field) => {
                let label = label.into();
                warn!("⚠️ 模型返回缺少字段 `{}`，使用默认值 ({})", field, label);
                defaulted.push(label);
                sentinel
            }
        }
    }

    pub fn is_missing(&self) -> bool {
        matches!(self, FieldOutcome::Missing(_))
    }
}

/// 带有回退记录的解码值
#[derive(Debug, Clone, PartialEq)]
pub struct Decoded<T> {
    pub value: T,
    /// 使用了哨兵值的字段
    pub defaulted: Vec<String>,
}

impl<T> Decoded<T> {
    pub fn new(value: T, defaulted: Vec<String>) -> Self {
        Self { value, defaulted }
    }
}

/// 读取任意 JSON 值，`null` 视为缺失
pub fn field_value(object: &Map<String, Value>, key: &'static str) -> FieldOutcome<Value> {
    match object.get(key) {
        Some(Value::Null) | None => FieldOutcome::Missing(key),
        Some(value) => FieldOutcome::Present(value.clone()),
    }
}

/// 读取文本字段，非字符串值按 JSON 文本保留
pub fn field_text(object: &Map<String, Value>, key: &'static str) -> FieldOutcome<String> {
    match field_value(object, key) {
        FieldOutcome::Present(Value::String(text)) => FieldOutcome::Present(text),
        FieldOutcome::Present(other) => FieldOutcome::Present(other.to_string()),
        FieldOutcome::Missing(k) => FieldOutcome::Missing(k),
    }
}

/// 读取分数字段
///
/// 接受整数、整数值的浮点数和数字字符串；超出 [0, 5] 的值会被截断
pub fn field_score(object: &Map<String, Value>, key: &'static str) -> FieldOutcome<u8> {
    let raw = match field_value(object, key) {
        FieldOutcome::Present(value) => value,
        FieldOutcome::Missing(k) => return FieldOutcome::Missing(k),
    };

    let number = match &raw {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().filter(|f| f.fract() == 0.0).map(|f| f as i64)),
        Value::String(s) => s.trim().parse::<i64>().ok(),
        _ => None,
    };

    match number {
        Some(n) => {
            let clamped = n.clamp(0, MAX_CRITERION_SCORE as i64);
            if clamped != n {
                warn!("⚠️ 分数 {} 超出范围 [0, {}]，截断为 {}", n, MAX_CRITERION_SCORE, clamped);
            }
            FieldOutcome::Present(clamped as u8)
        }
        None => {
            warn!("⚠️ 无法解析分数字段: {}", raw);
            FieldOutcome::Missing(key)
        }
    }
}

/// 读取改进建议列表
///
/// 只有 JSON 数组才会被解码为条目列表，其余形状一律视为缺失
pub fn field_improvement_areas(
    object: &Map<String, Value>,
    key: &'static str,
) -> FieldOutcome<DetailedAnalysis> {
    match field_value(object, key) {
        FieldOutcome::Present(Value::Array(items)) => FieldOutcome::Present(DetailedAnalysis::Items(
            items.iter().filter_map(decode_item).collect(),
        )),
        FieldOutcome::Present(other) => {
            warn!("⚠️ 字段 `{}` 不是列表: {}", key, other);
            FieldOutcome::Missing(key)
        }
        FieldOutcome::Missing(k) => FieldOutcome::Missing(k),
    }
}

fn decode_item(value: &Value) -> Option<DetailedAnalysisItem> {
    let object = match value.as_object() {
        Some(object) => object,
        None => {
            warn!("⚠️ 跳过无法识别的改进建议条目: {}", value);
            return None;
        }
    };

    let text = |key: &'static str| match field_text(object, key) {
        FieldOutcome::Present(text) => text,
        FieldOutcome::Missing(_) => String::new(),
    };

    let suggestions = match object.get("suggestions") {
        Some(Value::Array(list)) => list
            .iter()
            .map(|s| match s {
                Value::String(text) => text.clone(),
                other => other.to_string(),
            })
            .collect(),
        Some(Value::String(single)) => vec![single.clone()],
        _ => Vec::new(),
    };

    Some(DetailedAnalysisItem {
        category: text("category"),
        text_reference: text("text_reference"),
        issue: text("issue"),
        suggestions,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn object(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_field_text_present_and_missing() {
        let obj = object(json!({"analysis": "ok", "empty": null}));
        assert_eq!(field_text(&obj, "analysis"), FieldOutcome::Present("ok".to_string()));
        assert!(field_text(&obj, "empty").is_missing());
        assert!(field_text(&obj, "other").is_missing());
    }

    #[test]
    fn test_or_sentinel_records_label() {
        let obj = object(json!({}));
        let mut defaulted = Vec::new();
        let value = field_text(&obj, "analysis").or_sentinel(
            "No analysis found".to_string(),
            "analysis.content",
            &mut defaulted,
        );
        assert_eq!(value, "No analysis found");
        assert_eq!(defaulted, vec!["analysis.content".to_string()]);
    }

    #[test]
    fn test_field_score_variants() {
        let obj = object(json!({"a": 3, "b": "4", "c": 9, "d": -2, "e": 2.0, "f": "good", "g": 2.5}));
        assert_eq!(field_score(&obj, "a"), FieldOutcome::Present(3));
        assert_eq!(field_score(&obj, "b"), FieldOutcome::Present(4));
        assert_eq!(field_score(&obj, "c"), FieldOutcome::Present(5));
        assert_eq!(field_score(&obj, "d"), FieldOutcome::Present(0));
        assert_eq!(field_score(&obj, "e"), FieldOutcome::Present(2));
        assert!(field_score(&obj, "f").is_missing());
        assert!(field_score(&obj, "g").is_missing());
        assert!(field_score(&obj, "score").is_missing());
    }

    #[test]
    fn test_improvement_areas_list() {
        let obj = object(json!({
            "improvement_areas": [
                {
                    "category": "Grammar",
                    "text_reference": "I goed",
                    "issue": "Wrong past tense",
                    "suggestions": ["I went"]
                },
                {"category": "Vocabulary", "suggestions": "Use a synonym"},
                "garbage"
            ]
        }));
        let analysis = match field_improvement_areas(&obj, "improvement_areas") {
            FieldOutcome::Present(analysis) => analysis,
            FieldOutcome::Missing(_) => panic!("列表应当可以解析"),
        };
        let items = analysis.items();
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].suggestions, vec!["I went".to_string()]);
        assert_eq!(items[1].issue, "");
        assert_eq!(items[1].suggestions, vec!["Use a synonym".to_string()]);
    }

    #[test]
    fn test_improvement_areas_wrong_shape_is_missing() {
        let obj = object(json!({"improvement_areas": "none"}));
        assert!(field_improvement_areas(&obj, "improvement_areas").is_missing());
    }
}
