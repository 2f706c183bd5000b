use std::path::PathBuf;
use std::time::Duration;

/// 程序配置
#[derive(Clone, Debug)]
pub struct Config {
    // --- LLM 配置 ---
    pub llm_api_key: String,
    pub llm_api_base_url: String,
    /// 任务理解、分析、评语等阶段使用的模型
    pub llm_model_name: String,
    /// 手写文字识别使用的视觉模型
    pub ocr_model_name: String,
    /// 打分阶段使用的模型
    pub scoring_model_name: String,
    pub temperature: f32,
    pub max_output_tokens: Option<u32>,
    /// 单次请求超时（秒）
    pub request_timeout_secs: u64,
    /// 评分阶段两个评分维度之间的间隔（毫秒）
    pub pacing_interval_ms: u64,
    // --- 文件路径 ---
    /// 提示词模板目录
    pub prompts_dir: PathBuf,
    /// 运行记录输出目录
    pub run_log_dir: PathBuf,
    /// 历史记录目录
    pub history_dir: PathBuf,
    /// 是否显示详细日志
    pub verbose_logging: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            llm_api_key: String::new(),
            llm_api_base_url: "https://api.openai.com/v1".to_string(),
            llm_model_name: "gpt-4.1".to_string(),
            ocr_model_name: "gpt-4o".to_string(),
            scoring_model_name: "gpt-4.1".to_string(),
            temperature: 0.0,
            max_output_tokens: None,
            request_timeout_secs: 120,
            pacing_interval_ms: 1000,
            prompts_dir: PathBuf::from("prompts"),
            run_log_dir: PathBuf::from("logs/runs"),
            history_dir: PathBuf::from("logs/history"),
            verbose_logging: false,
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        let default = Self::default();
        Self {
            llm_api_key: std::env::var("OPENAI_API_KEY").unwrap_or(default.llm_api_key),
            llm_api_base_url: std::env::var("OPENAI_API_BASE").unwrap_or(default.llm_api_base_url),
            llm_model_name: std::env::var("LLM_MODEL_NAME").unwrap_or(default.llm_model_name),
            ocr_model_name: std::env::var("OCR_MODEL_NAME").unwrap_or(default.ocr_model_name),
            scoring_model_name: std::env::var("SCORING_MODEL_NAME").unwrap_or(default.scoring_model_name),
            temperature: std::env::var("LLM_TEMPERATURE").ok().and_then(|v| v.parse().ok()).unwrap_or(default.temperature),
            max_output_tokens: std::env::var("LLM_MAX_OUTPUT_TOKENS").ok().and_then(|v| v.parse().ok()).or(default.max_output_tokens),
            request_timeout_secs: std::env::var("LLM_TIMEOUT_SECS").ok().and_then(|v| v.parse().ok()).unwrap_or(default.request_timeout_secs),
            pacing_interval_ms: std::env::var("PACING_INTERVAL_MS").ok().and_then(|v| v.parse().ok()).unwrap_or(default.pacing_interval_ms),
            prompts_dir: std::env::var("PROMPTS_DIR").map(PathBuf::from).unwrap_or(default.prompts_dir),
            run_log_dir: std::env::var("RUN_LOG_DIR").map(PathBuf::from).unwrap_or(default.run_log_dir),
            history_dir: std::env::var("HISTORY_DIR").map(PathBuf::from).unwrap_or(default.history_dir),
            verbose_logging: std::env::var("VERBOSE_LOGGING").ok().and_then(|v| v.parse().ok()).unwrap_or(default.verbose_logging),
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn pacing_interval(&self) -> Duration {
        Duration::from_millis(self.pacing_interval_ms)
    }
}
