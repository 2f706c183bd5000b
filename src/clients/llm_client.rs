//! LLM 网关
//!
//! 所有与外部模型的交互都经过 `CompletionGateway`。
//!
//! ## 技术栈
//! - 使用 `async-openai` crate 进行 API 调用
//! - 兼容 OpenAI API 的服务（通过 `api_base` 配置）
//! - 图片以 base64 data URI 内联，统一标记为 JPEG

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use async_openai::{
    config::OpenAIConfig,
    types::chat::{
        ChatCompletionRequestMessage, ChatCompletionRequestMessageContentPartImage,
        ChatCompletionRequestMessageContentPartText, ChatCompletionRequestSystemMessageArgs,
        ChatCompletionRequestUserMessageArgs, ChatCompletionRequestUserMessageContent,
        ChatCompletionRequestUserMessageContentPart, CreateChatCompletionRequestArgs, ImageDetail,
        ImageUrl, ResponseFormat as OpenAiResponseFormat,
    },
    Client,
};
use async_trait::async_trait;
use backoff::ExponentialBackoffBuilder;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde_json::{Map, Value};
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::error::{AppError, AppResult};

/// 返回格式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseFormat {
    /// 自由文本
    Text,
    /// 整个返回体必须是一个 JSON 对象
    JsonObject,
}

/// 单个模型调用的参数
#[derive(Debug, Clone, PartialEq)]
pub struct ModelSettings {
    pub model: String,
    pub temperature: f32,
    pub max_output_tokens: Option<u32>,
    pub timeout: Duration,
}

impl ModelSettings {
    /// 使用配置中的公共参数，指定模型
    pub fn from_config(config: &Config, model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            temperature: config.temperature,
            max_output_tokens: config.max_output_tokens,
            timeout: config.request_timeout(),
        }
    }
}

/// 内存中的图片
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageInput {
    /// 来源文件，仅用于日志
    pub source: PathBuf,
    pub bytes: Vec<u8>,
}

impl ImageInput {
    /// 读取图片文件
    pub async fn read(path: impl AsRef<Path>) -> AppResult<Self> {
        let path = path.as_ref();
        let bytes = tokio::fs::read(path).await.map_err(|source| {
            warn!("图片读取失败: {}", path.display());
            AppError::ImageIo {
                path: path.to_path_buf(),
                source,
            }
        })?;
        debug!("已读取图片 {} ({} 字节)", path.display(), bytes.len());
        Ok(Self {
            source: path.to_path_buf(),
            bytes,
        })
    }

    /// 编码为 data URI，不论实际格式都标记为 JPEG
    pub fn to_data_uri(&self) -> String {
        format!("data:image/jpeg;base64,{}", STANDARD.encode(&self.bytes))
    }
}

/// 一次模型请求
#[derive(Debug, Clone)]
pub struct CompletionRequest {
    pub prompt: String,
    pub system: Option<String>,
    pub images: Vec<ImageInput>,
    pub response_format: ResponseFormat,
    pub settings: ModelSettings,
}

impl CompletionRequest {
    /// 自由文本请求
    pub fn text(prompt: impl Into<String>, settings: &ModelSettings) -> Self {
        Self {
            prompt: prompt.into(),
            system: None,
            images: Vec::new(),
            response_format: ResponseFormat::Text,
            settings: settings.clone(),
        }
    }

    /// JSON 对象请求
    pub fn json(prompt: impl Into<String>, settings: &ModelSettings) -> Self {
        Self {
            response_format: ResponseFormat::JsonObject,
            ..Self::text(prompt, settings)
        }
    }

    pub fn with_system(mut self, system: impl Into<String>) -> Self {
        self.system = Some(system.into());
        self
    }

    pub fn with_images(mut self, images: Vec<ImageInput>) -> Self {
        self.images = images;
        self
    }
}

/// 外部模型能力：给定提示词（和可选图片），返回文本
#[async_trait]
pub trait CompletionGateway: Send + Sync {
    async fn complete(&self, request: CompletionRequest) -> AppResult<String>;
}

/// 请求 JSON 对象并解析
///
/// 解析失败或不是对象时返回 `MalformedResponse`，不重试
pub async fn complete_json(
    gateway: &dyn CompletionGateway,
    request: CompletionRequest,
) -> AppResult<Map<String, Value>> {
    let model = request.settings.model.clone();
    let request = CompletionRequest {
        response_format: ResponseFormat::JsonObject,
        ..request
    };

    let raw = gateway.complete(request).await?;
    match serde_json::from_str::<Value>(&raw) {
        Ok(Value::Object(object)) => Ok(object),
        Ok(other) => {
            warn!("LLM 返回的 JSON 不是对象 (模型: {})", model);
            Err(AppError::malformed(model, format!("期望 JSON 对象，实际为: {}", other)))
        }
        Err(e) => {
            warn!("LLM 返回内容无法解析为 JSON (模型: {}): {}", model, e);
            Err(AppError::malformed(model, e))
        }
    }
}

/// 基于 async-openai 的网关实现
pub struct OpenAiGateway {
    client: Client<OpenAIConfig>,
}

impl std::fmt::Debug for OpenAiGateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAiGateway").finish_non_exhaustive()
    }
}

impl OpenAiGateway {
    /// 创建网关
    ///
    /// 未配置 API 密钥时返回 `Configuration` 错误
    pub fn new(config: &Config) -> AppResult<Self> {
        if config.llm_api_key.trim().is_empty() {
            return Err(AppError::Configuration(
                "未找到 API 密钥，请设置 OPENAI_API_KEY 环境变量".to_string(),
            ));
        }

        let openai_config = OpenAIConfig::new()
            .with_api_key(&config.llm_api_key)
            .with_api_base(&config.llm_api_base_url);

        // 后端错误第一次出现即返回，不自动重试
        let no_retry = ExponentialBackoffBuilder::new()
            .with_max_elapsed_time(Some(Duration::ZERO))
            .build();

        info!("✓ LLM 客户端初始化完成 ({})", config.llm_api_base_url);

        Ok(Self {
            client: Client::with_config(openai_config).with_backoff(no_retry),
        })
    }

    fn build_messages(&self, request: &CompletionRequest) -> AppResult<Vec<ChatCompletionRequestMessage>> {
        let model = &request.settings.model;
        let mut messages = Vec::new();

        if let Some(system) = &request.system {
            let system_msg = ChatCompletionRequestSystemMessageArgs::default()
                .content(system.as_str())
                .build()
                .map_err(|e| AppError::backend(model, e))?;
            messages.push(ChatCompletionRequestMessage::System(system_msg));
        }

        let user_msg = if request.images.is_empty() {
            ChatCompletionRequestUserMessageArgs::default()
                .content(request.prompt.as_str())
                .build()
        } else {
            let mut content_parts = vec![ChatCompletionRequestUserMessageContentPart::Text(
                ChatCompletionRequestMessageContentPartText {
                    text: request.prompt.clone(),
                },
            )];

            for image in &request.images {
                content_parts.push(ChatCompletionRequestUserMessageContentPart::ImageUrl(
                    ChatCompletionRequestMessageContentPartImage {
                        image_url: ImageUrl {
                            url: image.to_data_uri(),
                            detail: Some(ImageDetail::Auto),
                        },
                    },
                ));
                debug!("已添加图片 {}", image.source.display());
            }

            ChatCompletionRequestUserMessageArgs::default()
                .content(ChatCompletionRequestUserMessageContent::Array(content_parts))
                .build()
        }
        .map_err(|e| AppError::backend(model, e))?;

        messages.push(ChatCompletionRequestMessage::User(user_msg));
        Ok(messages)
    }
}

#[async_trait]
impl CompletionGateway for OpenAiGateway {
    async fn complete(&self, request: CompletionRequest) -> AppResult<String> {
        let settings = &request.settings;
        debug!(
            "调用 LLM API，模型: {}，提示词长度: {} 字符，图片: {} 张",
            settings.model,
            request.prompt.len(),
            request.images.len()
        );

        let messages = self.build_messages(&request)?;

        let mut builder = CreateChatCompletionRequestArgs::default();
        builder
            .model(settings.model.as_str())
            .messages(messages)
            .temperature(settings.temperature);
        if let Some(max_tokens) = settings.max_output_tokens {
            builder.max_tokens(max_tokens);
        }
        if request.response_format == ResponseFormat::JsonObject {
            builder.response_format(OpenAiResponseFormat::JsonObject);
        }
        let chat_request = builder
            .build()
            .map_err(|e| AppError::backend(&settings.model, e))?;

        let started = Instant::now();
        let response = match tokio::time::timeout(
            settings.timeout,
            self.client.chat().create(chat_request),
        )
        .await
        {
            Err(_) => {
                warn!(
                    "LLM 请求超时 (模型: {}, 超时: {}秒)",
                    settings.model,
                    settings.timeout.as_secs()
                );
                return Err(AppError::Timeout {
                    model: settings.model.clone(),
                    secs: settings.timeout.as_secs(),
                });
            }
            Ok(Err(e)) => {
                warn!("LLM API 调用失败 (模型: {}): {}", settings.model, e);
                return Err(AppError::backend(&settings.model, e));
            }
            Ok(Ok(response)) => response,
        };

        let total_tokens = response.usage.as_ref().map(|u| u.total_tokens).unwrap_or(0);
        info!(
            "✓ LLM 调用成功 (模型: {}, 耗时: {}ms, tokens: {})",
            settings.model,
            started.elapsed().as_millis(),
            total_tokens
        );

        let content = response
            .choices
            .first()
            .and_then(|choice| choice.message.content.clone())
            .filter(|content| !content.trim().is_empty())
            .ok_or_else(|| {
                warn!("LLM 返回内容为空 (模型: {})", settings.model);
                AppError::EmptyResponse {
                    model: settings.model.clone(),
                }
            })?;

        Ok(content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FixedGateway(&'static str);

    #[async_trait]
    impl CompletionGateway for FixedGateway {
        async fn complete(&self, request: CompletionRequest) -> AppResult<String> {
            assert_eq!(request.response_format, ResponseFormat::JsonObject);
            Ok(self.0.to_string())
        }
    }

    fn settings() -> ModelSettings {
        ModelSettings::from_config(&Config::default(), "gpt-4.1")
    }

    #[test]
    fn test_data_uri_is_always_jpeg() {
        let image = ImageInput {
            source: PathBuf::from("page.png"),
            bytes: b"hello".to_vec(),
        };
        assert_eq!(image.to_data_uri(), "data:image/jpeg;base64,aGVsbG8=");
    }

    #[test]
    fn test_gateway_requires_api_key() {
        let err = OpenAiGateway::new(&Config::default()).unwrap_err();
        assert!(matches!(err, AppError::Configuration(_)));

        let config = Config {
            llm_api_key: "sk-test".to_string(),
            ..Config::default()
        };
        assert!(OpenAiGateway::new(&config).is_ok());
    }

    #[test]
    fn test_build_messages_with_images() {
        let config = Config {
            llm_api_key: "sk-test".to_string(),
            ..Config::default()
        };
        let gateway = OpenAiGateway::new(&config).unwrap();
        let request = CompletionRequest::text("transcribe", &settings())
            .with_system("only text")
            .with_images(vec![ImageInput {
                source: PathBuf::from("a.jpg"),
                bytes: vec![1, 2, 3],
            }]);

        let messages = gateway.build_messages(&request).unwrap();
        assert_eq!(messages.len(), 2);
        assert!(matches!(messages[0], ChatCompletionRequestMessage::System(_)));
        match &messages[1] {
            ChatCompletionRequestMessage::User(user) => {
                assert!(matches!(
                    &user.content,
                    ChatCompletionRequestUserMessageContent::Array(parts) if parts.len() == 2
                ));
            }
            _ => panic!("第二条消息应为用户消息"),
        }
    }

    #[tokio::test]
    async fn test_complete_json_parses_object() {
        let gateway = FixedGateway(r#"{"analysis": "ok"}"#);
        let object = complete_json(&gateway, CompletionRequest::text("p", &settings()))
            .await
            .unwrap();
        assert_eq!(object["analysis"], "ok");
    }

    #[tokio::test]
    async fn test_complete_json_rejects_invalid_json() {
        let gateway = FixedGateway("not json at all");
        let err = complete_json(&gateway, CompletionRequest::json("p", &settings()))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::MalformedResponse { .. }));

        let gateway = FixedGateway("[1, 2, 3]");
        let err = complete_json(&gateway, CompletionRequest::json("p", &settings()))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::MalformedResponse { .. }));
    }

    /// 本地 HTTP 服务，每个请求都返回 500，并记录收到的请求数
    async fn spawn_failing_backend(
        requests: std::sync::Arc<std::sync::atomic::AtomicUsize>,
    ) -> String {
        use tokio::io::{AsyncReadExt, AsyncWriteExt};

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        tokio::spawn(async move {
            loop {
                let Ok((mut socket, _)) = listener.accept().await else {
                    return;
                };
                let requests = requests.clone();
                tokio::spawn(async move {
                    let mut buf = Vec::new();
                    let mut chunk = [0u8; 4096];
                    // 读完请求头和请求体
                    loop {
                        let n = match socket.read(&mut chunk).await {
                            Ok(0) | Err(_) => return,
                            Ok(n) => n,
                        };
                        buf.extend_from_slice(&chunk[..n]);
                        let text = String::from_utf8_lossy(&buf);
                        if let Some(header_end) = text.find("\r\n\r\n") {
                            let content_length = text[..header_end]
                                .lines()
                                .find_map(|line| {
                                    let (name, value) = line.split_once(':')?;
                                    name.eq_ignore_ascii_case("content-length")
                                        .then(|| value.trim().parse::<usize>().ok())
                                        .flatten()
                                })
                                .unwrap_or(0);
                            if buf.len() >= header_end + 4 + content_length {
                                break;
                            }
                        }
                    }
                    requests.fetch_add(1, std::sync::atomic::Ordering::SeqCst);

                    let body = r#"{"error":{"message":"upstream exploded","type":"server_error","param":null,"code":null}}"#;
                    let response = format!(
                        "HTTP/1.1 500 Internal Server Error\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{}",
                        body.len(),
                        body
                    );
                    let _ = socket.write_all(response.as_bytes()).await;
                    let _ = socket.shutdown().await;
                });
            }
        });

        format!("http://{}/v1", addr)
    }

    #[tokio::test]
    async fn test_server_error_is_backend_error_without_retry() {
        let requests = std::sync::Arc::new(std::sync::atomic::AtomicUsize::new(0));
        let base_url = spawn_failing_backend(requests.clone()).await;
        let config = Config {
            llm_api_key: "sk-test".to_string(),
            llm_api_base_url: base_url,
            request_timeout_secs: 10,
            ..Config::default()
        };
        let gateway = OpenAiGateway::new(&config).unwrap();

        let started = Instant::now();
        let err = gateway
            .complete(CompletionRequest::text("hello", &ModelSettings::from_config(&config, "gpt-4.1")))
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::Backend { .. }), "实际错误: {:?}", err);
        assert!(!err.is_timeout());
        assert_eq!(requests.load(std::sync::atomic::Ordering::SeqCst), 1);
        assert!(started.elapsed() < Duration::from_secs(5));
    }

    #[tokio::test]
    #[ignore] // 需要真实的 API 密钥：cargo test -- --ignored
    async fn test_live_text_completion() {
        let _ = tracing_subscriber::fmt::try_init();
        let config = Config::from_env();
        let gateway = OpenAiGateway::new(&config).unwrap();
        let response = gateway
            .complete(CompletionRequest::text(
                "Reply with the single word: ready",
                &ModelSettings::from_config(&config, config.llm_model_name.clone()),
            ))
            .await
            .unwrap();
        assert!(!response.is_empty());
    }
}
