//! 提示词模板引擎
//!
//! 占位符语法为 `{Name}`，只做字面量替换：
//! - 没有提供的占位符原样保留，不报错（模板可以包含可选片段）
//! - 没有嵌套、条件和转义
//! - 多个替换按顺序作用在同一个累积字符串上

use std::sync::OnceLock;

use regex::Regex;

/// 按顺序替换模板中的占位符
///
/// # 参数
/// - `template`: 模板文本
/// - `values`: (占位符名称, 替换内容) 列表，名称不含花括号
///
/// # 返回
/// 替换后的完整文本
pub fn render(template: &str, values: &[(&str, &str)]) -> String {
    values.iter().fold(template.to_string(), |text, (name, value)| {
        text.replace(&format!("{{{}}}", name), value)
    })
}

/// 列出文本中仍未被替换的占位符（按出现顺序，去重）
pub fn unresolved_placeholders(text: &str) -> Vec<String> {
    static PLACEHOLDER: OnceLock<Regex> = OnceLock::new();
    let re = PLACEHOLDER.get_or_init(|| {
        Regex::new(r"\{([A-Z][A-Za-z0-9]*(?:-[A-Za-z0-9]+)*)\}").expect("占位符正则表达式无效")
    });

    let mut names: Vec<String> = Vec::new();
    for cap in re.captures_iter(text) {
        let name = cap[1].to_string();
        if !names.contains(&name) {
            names.push(name);
        }
    }
    names
}
