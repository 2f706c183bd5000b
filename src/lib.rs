//! # Prof Reviewer
//!
//! 手写英语作文自动评估：识别图片中的作答，解读题目，
//! 按四个固定的 Cambridge 维度打分，并生成反馈
//!
//! ## 架构设计
//!
//! ### ① 客户端层（Clients）
//! - `clients/` - 与外部模型的唯一接触点
//! - `CompletionGateway` - "给定提示词和图片，返回文本或 JSON" 的能力
//!
//! ### ② 业务能力层（Services）
//! - `services/` - 每个阶段一个服务，只负责单一能力
//! - `TextExtractor` / `TaskUnderstandingService` / `Assessor`
//!   / `DetailedAnalysisService` / `EncouragementService`
//! - `RunLogger` - 运行记录，每个阶段完成后落盘
//! - `HistoryStore` - 历史记录
//!
//! ### ③ 流程层（Workflow）
//! - `workflow/` - 定义"一篇作文"的完整评估流程
//! - `AssessmentPipeline` - 识别 → 理解题目 → 评估 → 详细建议 → 鼓励评语
//!
//! ## 模块结构

pub mod clients;
pub mod config;
pub mod error;
pub mod models;
pub mod prompts;
pub mod services;
pub mod utils;
pub mod workflow;

// 重新导出常用类型
pub use clients::{CompletionGateway, CompletionRequest, OpenAiGateway, ResponseFormat};
pub use config::Config;
pub use error::{AppError, AppResult};
pub use models::{AssessmentReport, Criterion, CriterionMap, CriterionScore, HistoryEntry, RunRecord};
pub use prompts::PromptSet;
pub use workflow::AssessmentPipeline;
