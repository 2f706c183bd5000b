use std::path::PathBuf;

use thiserror::Error;

/// 应用程序错误类型
///
/// 流水线中的各个阶段不会捕获或包装网关错误，
/// 所有错误都原样向上传播到 `AssessmentPipeline::run`。
#[derive(Debug, Error)]
pub enum AppError {
    /// 配置错误（例如缺少 API 密钥），构造时即失败
    #[error("配置错误: {0}")]
    Configuration(String),

    /// 模型在超时时间内没有返回
    #[error("LLM 请求超时 (模型: {model}, 超时: {secs}秒)")]
    Timeout { model: String, secs: u64 },

    /// 要求 JSON 对象但返回内容无法解析
    #[error("LLM 返回内容不是合法的 JSON 对象 (模型: {model}): {detail}")]
    MalformedResponse { model: String, detail: String },

    /// 返回结果没有任何文本内容
    #[error("LLM 返回内容为空 (模型: {model})")]
    EmptyResponse { model: String },

    /// 其他后端错误，保留原始信息
    #[error("LLM API 调用失败 (模型: {model}): {message}")]
    Backend { model: String, message: String },

    /// 图片读取失败，在任何网络请求之前抛出
    #[error("无法读取图片 {}: {source}", path.display())]
    ImageIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// 提示词模板读取失败
    #[error("无法读取提示词模板 {}: {source}", path.display())]
    PromptIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// 运行记录 / 历史记录写入失败
    #[error("写入文件失败 {}: {source}", path.display())]
    Persistence {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("JSON 序列化失败: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl AppError {
    /// 创建后端错误
    pub fn backend(model: impl Into<String>, message: impl std::fmt::Display) -> Self {
        AppError::Backend {
            model: model.into(),
            message: message.to_string(),
        }
    }

    /// 创建 JSON 解析错误
    pub fn malformed(model: impl Into<String>, detail: impl std::fmt::Display) -> Self {
        AppError::MalformedResponse {
            model: model.into(),
            detail: detail.to_string(),
        }
    }

    /// 是否为超时错误
    pub fn is_timeout(&self) -> bool {
        matches!(self, AppError::Timeout { .. })
    }
}

/// 应用程序结果类型
pub type AppResult<T> = Result<T, AppError>;
