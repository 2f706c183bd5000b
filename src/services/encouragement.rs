//! 鼓励评语服务

use std::sync::Arc;

use tracing::info;

use crate::clients::{CompletionGateway, CompletionRequest, ModelSettings};
use crate::error::AppResult;
use crate::prompts::render;

pub struct EncouragementService {
    gateway: Arc<dyn CompletionGateway>,
    settings: ModelSettings,
    template: String,
}

impl EncouragementService {
    pub fn new(gateway: Arc<dyn CompletionGateway>, settings: ModelSettings, template: String) -> Self {
        Self {
            gateway,
            settings,
            template,
        }
    }

    /// 根据详细改进建议生成一段鼓励的话，直接返回模型文本
    pub async fn encourage(&self, detailed_analysis: &str) -> AppResult<String> {
        info!("🌟 正在生成鼓励评语...");

        let prompt = render(&self.template, &[("Detailed-Analysis", detailed_analysis)]);
        let comment = self
            .gateway
            .complete(CompletionRequest::text(prompt, &self.settings))
            .await?;

        Ok(comment.trim().to_string())
    }
}
