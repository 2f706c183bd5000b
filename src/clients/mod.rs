pub mod llm_client;

pub use llm_client::{
    complete_json, CompletionGateway, CompletionRequest, ImageInput, ModelSettings, OpenAiGateway,
    ResponseFormat,
};
