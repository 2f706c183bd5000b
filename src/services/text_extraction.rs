//! 手写文字识别服务
//!
//! 只负责"图片 → 文字"，不做拼写纠正或任何后处理：
//! 识别噪声本身也是需要评估的语言错误信号

use std::path::PathBuf;
use std::sync::Arc;

use tracing::{info, warn};

use crate::clients::{CompletionGateway, CompletionRequest, ImageInput, ModelSettings};
use crate::error::{AppError, AppResult};

const OCR_INSTRUCTION: &str = "You transcribe handwritten exam answers. \
Respond ONLY with the exact text visible in the images, nothing more. \
No explanations, no additional context, no formatting instructions, no corrections.";

const OCR_PROMPT: &str = "Extract all text visible in these images, in page order.";

pub struct TextExtractor {
    gateway: Arc<dyn CompletionGateway>,
    settings: ModelSettings,
}

impl TextExtractor {
    pub fn new(gateway: Arc<dyn CompletionGateway>, settings: ModelSettings) -> Self {
        Self { gateway, settings }
    }

    /// 识别一张或多张图片中的文字
    ///
    /// 所有图片先读入内存，任何一张读取失败都会在发起网络请求之前返回错误；
    /// 没有图片时返回 `Configuration` 错误
    pub async fn extract(&self, image_paths: &[PathBuf]) -> AppResult<String> {
        if image_paths.is_empty() {
            warn!("没有提供作答图片，跳过文字识别请求");
            return Err(AppError::Configuration("至少需要一张作答图片".to_string()));
        }
        info!("🔍 开始识别 {} 张图片中的文字", image_paths.len());

        let mut images = Vec::with_capacity(image_paths.len());
        for path in image_paths {
            images.push(ImageInput::read(path).await?);
        }

        let request = CompletionRequest::text(OCR_PROMPT, &self.settings)
            .with_system(OCR_INSTRUCTION)
            .with_images(images);

        let text = self.gateway.complete(request).await?;

        info!("✓ 文字识别完成，共 {} 个字符", text.chars().count());
        Ok(text)
    }
}
