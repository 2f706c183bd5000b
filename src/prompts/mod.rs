//! 提示词：模板引擎和模板集合

pub mod prompt_set;
pub mod template;

pub use prompt_set::PromptSet;
pub use template::{render, unresolved_placeholders};
