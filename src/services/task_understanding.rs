//! 题目理解服务

use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, info};

use crate::clients::{complete_json, CompletionGateway, CompletionRequest, ModelSettings};
use crate::error::AppResult;
use crate::models::decode::{field_value, Decoded};
use crate::prompts::{render, unresolved_placeholders};

pub const NO_TASK_UNDERSTANDING: &str = "No task understanding found";

pub struct TaskUnderstandingService {
    gateway: Arc<dyn CompletionGateway>,
    settings: ModelSettings,
    template: String,
}

impl TaskUnderstandingService {
    pub fn new(gateway: Arc<dyn CompletionGateway>, settings: ModelSettings, template: String) -> Self {
        Self {
            gateway,
            settings,
            template,
        }
    }

    /// 让模型解读题目，返回 `task_understanding` 字段（结构由模型决定）
    ///
    /// 字段缺失时返回哨兵字符串，不会失败
    pub async fn understand(&self, task: &str) -> AppResult<Decoded<Value>> {
        info!("📋 正在理解题目要求...");

        let prompt = render(&self.template, &[("Task", task)]);
        debug!("题目理解提示词未替换的占位符: {:?}", unresolved_placeholders(&prompt));

        let response = complete_json(
            self.gateway.as_ref(),
            CompletionRequest::json(prompt, &self.settings),
        )
        .await?;

        let mut defaulted = Vec::new();
        let understanding = field_value(&response, "task_understanding").or_sentinel(
            Value::String(NO_TASK_UNDERSTANDING.to_string()),
            "task_understanding",
            &mut defaulted,
        );

        info!("✓ 题目理解完成");
        Ok(Decoded::new(understanding, defaulted))
    }
}
