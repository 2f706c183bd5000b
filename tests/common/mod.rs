//! 集成测试共用的脚本化网关

#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use prof_reviewer::clients::{CompletionGateway, CompletionRequest, ResponseFormat};
use prof_reviewer::services::NoPacing;
use prof_reviewer::{AppError, AppResult, AssessmentPipeline, Config, PromptSet};
use serde_json::{json, Value};

pub const OCR_TEXT: &str = "Dear Mr Smith, I am writting to complain about the noise.";
pub const ENCOURAGEMENT: &str = "Great effort, keep practising your spelling!";
pub const GENERAL_COMMENT: &str = "A clear letter that covers every point.";

type ErrorFactory = Box<dyn Fn() -> AppError + Send + Sync>;

/// 按请求类型返回固定内容的网关
///
/// - 带图片的文本请求 → 识别文字
/// - 不带图片的文本请求 → 鼓励评语
/// - JSON 请求 → 固定 JSON 对象
pub struct ScriptedGateway {
    json_reply: String,
    fail_at: Option<(usize, ErrorFactory)>,
    requests: Mutex<Vec<CompletionRequest>>,
}

impl ScriptedGateway {
    pub fn canned() -> Self {
        Self::with_json(canned_json())
    }

    pub fn with_json(reply: Value) -> Self {
        Self::with_raw_json(reply.to_string())
    }

    pub fn with_raw_json(reply: impl Into<String>) -> Self {
        Self {
            json_reply: reply.into(),
            fail_at: None,
            requests: Mutex::new(Vec::new()),
        }
    }

    /// 第 `index` 次调用（从 0 开始）返回错误
    pub fn failing_at(mut self, index: usize, error: impl Fn() -> AppError + Send + Sync + 'static) -> Self {
        self.fail_at = Some((index, Box::new(error)));
        self
    }

    pub fn requests(&self) -> Vec<CompletionRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

#[async_trait]
impl CompletionGateway for ScriptedGateway {
    async fn complete(&self, request: CompletionRequest) -> AppResult<String> {
        let index = {
            let mut requests = self.requests.lock().unwrap();
            requests.push(request.clone());
            requests.len() - 1
        };

        if let Some((fail_index, error)) = &self.fail_at {
            if *fail_index == index {
                return Err(error());
            }
        }

        Ok(match (request.response_format, request.images.is_empty()) {
            (ResponseFormat::JsonObject, _) => self.json_reply.clone(),
            (ResponseFormat::Text, false) => OCR_TEXT.to_string(),
            (ResponseFormat::Text, true) => ENCOURAGEMENT.to_string(),
        })
    }
}

pub fn canned_json() -> Value {
    json!({
        "task_understanding": {"text_type": "letter of complaint", "register": "formal"},
        "analysis": "ok",
        "score": 3,
        "justification": "fine",
        "general_comment": GENERAL_COMMENT,
        "improvement_areas": [
            {
                "category": "Spelling",
                "text_reference": "writting",
                "issue": "Misspelled verb",
                "suggestions": ["writing"]
            }
        ]
    })
}

pub fn test_config(run_log_dir: &Path) -> Config {
    Config {
        llm_api_key: "sk-test".to_string(),
        scoring_model_name: "scoring-model".to_string(),
        run_log_dir: run_log_dir.to_path_buf(),
        ..Config::default()
    }
}

pub async fn bundled_prompts() -> PromptSet {
    PromptSet::load(Path::new(env!("CARGO_MANIFEST_DIR")).join("prompts"))
        .await
        .expect("加载模板失败")
}

pub async fn pipeline_with(gateway: Arc<ScriptedGateway>, run_log_dir: &Path) -> AssessmentPipeline {
    AssessmentPipeline::new(
        &test_config(run_log_dir),
        bundled_prompts().await,
        gateway,
        Arc::new(NoPacing),
    )
}

/// 在目录中写入一张假图片
pub fn write_image(dir: &Path, name: &str) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, [0xFFu8, 0xD8, 0xFF, 0xE0, 0x00, 0x10]).expect("写入图片失败");
    path
}

/// 读取目录中的全部运行记录
pub fn read_run_records(dir: &Path) -> Vec<Value> {
    let mut records: Vec<Value> = std::fs::read_dir(dir)
        .expect("读取目录失败")
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| path.extension().and_then(|s| s.to_str()) == Some("json"))
        .map(|path| serde_json::from_slice(&std::fs::read(path).unwrap()).unwrap())
        .collect();
    records.sort_by_key(|record| record["run_id"].as_str().unwrap_or_default().to_string());
    records
}
