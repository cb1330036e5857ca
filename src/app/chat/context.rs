use crate::app::types::{Message, Sender};
use crate::catalog::{ContextConfig, ContextId};
use crate::storage::ContextStore;

pub const DEFAULT_DIGEST_WINDOW: usize = 10;
pub const DEFAULT_DIGEST_TRUNCATE_CHARS: usize = 150;

pub const EMPTY_DIGEST_PLACEHOLDER: &str = "（暂无跨模块历史）";
pub const GENERIC_CAPABILITIES_PLACEHOLDER: &str = "（通用模式）";
pub const GENERIC_CONTEXT_NAME: &str = "通用助手";
const UNKNOWN_CONTEXT_NAME: &str = "未知系统";
const ELLIPSIS: &str = "...";

/// Bounds for the cross-context memory injected into each backend call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DigestSettings {
    pub window: usize,
    pub truncate_chars: usize,
}

impl Default for DigestSettings {
    fn default() -> Self {
        Self {
            window: DEFAULT_DIGEST_WINDOW,
            truncate_chars: DEFAULT_DIGEST_TRUNCATE_CHARS,
        }
    }
}

/// Summary lines for the most recent messages outside `target`
pub fn cross_context_lines(
    store: &ContextStore,
    target: ContextId,
    settings: DigestSettings,
) -> Vec<String> {
    store
        .recent_excluding(target, settings.window)
        .into_iter()
        .map(|message| digest_line(message, settings.truncate_chars))
        .collect()
}

/// Newline-joined digest, or the placeholder when no other context has history
pub fn cross_context_digest(
    store: &ContextStore,
    target: ContextId,
    settings: DigestSettings,
) -> String {
    let lines = cross_context_lines(store, target, settings);
    if lines.is_empty() {
        return EMPTY_DIGEST_PLACEHOLDER.to_string();
    }
    lines.join("\n")
}

fn digest_line(message: &Message, truncate_chars: usize) -> String {
    let context_name = message
        .context
        .and_then(ContextId::display_name)
        .unwrap_or(UNKNOWN_CONTEXT_NAME);
    let role = match message.sender {
        Sender::User => "用户",
        Sender::System => "系统",
    };
    format!(
        "[系统:{}] {}: {}",
        context_name,
        role,
        truncate_body(&message.text, truncate_chars)
    )
}

fn truncate_body(text: &str, limit: usize) -> String {
    if text.chars().count() <= limit {
        return text.to_string();
    }
    let mut truncated: String = text.chars().take(limit).collect();
    truncated.push_str(ELLIPSIS);
    truncated
}

/// Capability list of a context, one `- name: description` line each
pub fn capabilities_digest(context: Option<&ContextConfig>) -> String {
    let Some(context) = context else {
        return GENERIC_CAPABILITIES_PLACEHOLDER.to_string();
    };
    if context.capabilities.is_empty() {
        return GENERIC_CAPABILITIES_PLACEHOLDER.to_string();
    }
    context
        .capabilities
        .iter()
        .map(|capability| format!("- {}: {}", capability.name, capability.description))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Assembles the system instruction sent alongside the conversation.
///
/// Empty digests fall back to their placeholders so the backend never sees
/// a blank section.
pub fn build_system_instruction(
    persona: &str,
    context_name: &str,
    capabilities: &str,
    digest: &str,
) -> String {
    let context_name = non_empty_or(context_name, GENERIC_CONTEXT_NAME);
    let capabilities = non_empty_or(capabilities, GENERIC_CAPABILITIES_PLACEHOLDER);
    let digest = non_empty_or(digest, EMPTY_DIGEST_PLACEHOLDER);
    format!(
        "{persona}\n\n\
**当前系统环境 (Current Context)**\n\
- 运行模块: {context_name}\n\
- 可用工具:\n\
{capabilities}\n\n\
**全局记忆 (Global Memory)**\n\
{digest}\n\n\
**执行指令**:\n\
1. 扮演该模块的资深专家。\n\
2. 自动判断是否需要调用工具逻辑。\n\
3. 若需输出图表，必须使用 json:chart 格式：```json:chart\n\
{{\"type\": \"bar|radar|line\", \"title\": \"...\", \"data\": [{{\"name\": \"...\", \"value\": 0}}]}}\n\
```\n"
    )
}

fn non_empty_or<'a>(value: &'a str, fallback: &'a str) -> &'a str {
    if value.trim().is_empty() {
        fallback
    } else {
        value
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::context_config;

    #[test]
    fn test_empty_store_renders_placeholder() {
        let store = ContextStore::new();
        let digest = cross_context_digest(&store, ContextId::Discovery, DigestSettings::default());
        assert_eq!(digest, EMPTY_DIGEST_PLACEHOLDER);
    }

    #[test]
    fn test_only_target_history_renders_placeholder() {
        let mut store = ContextStore::new();
        store.append(Message::user("寻找标的", Some(ContextId::Discovery)));
        let digest = cross_context_digest(&store, ContextId::Discovery, DigestSettings::default());
        assert_eq!(digest, EMPTY_DIGEST_PLACEHOLDER);
    }

    #[test]
    fn test_line_format() {
        let mut store = ContextStore::new();
        store.append(Message::user("测算WACC", Some(ContextId::Analysis)));
        store.append(Message::system("好的", Some(ContextId::Analysis)));
        store.append(Message::user("hi", None));
        let lines = cross_context_lines(&store, ContextId::Discovery, DigestSettings::default());
        assert_eq!(
            lines,
            vec![
                "[系统:分析与估值系统] 用户: 测算WACC",
                "[系统:分析与估值系统] 系统: 好的",
                "[系统:未知系统] 用户: hi",
            ]
        );
    }

    #[test]
    fn test_digest_window_is_bounded() {
        let mut store = ContextStore::new();
        for index in 0..25 {
            store.append(Message::user(format!("msg {index}"), Some(ContextId::Execution)));
            store.append(Message::user("target", Some(ContextId::Discovery)));
        }
        let settings = DigestSettings::default();
        let lines = cross_context_lines(&store, ContextId::Discovery, settings);
        assert_eq!(lines.len(), settings.window);
        assert!(lines.first().unwrap().ends_with("msg 15"));
        assert!(lines.last().unwrap().ends_with("msg 24"));
        let digest = cross_context_digest(&store, ContextId::Discovery, settings);
        assert_eq!(digest.lines().count(), settings.window);
    }

    #[test]
    fn test_truncation() {
        let mut store = ContextStore::new();
        let long = "估".repeat(200);
        store.append(Message::system(long, Some(ContextId::Analysis)));
        store.append(Message::system("x".repeat(150), Some(ContextId::Analysis)));
        let settings = DigestSettings::default();
        let lines = cross_context_lines(&store, ContextId::Execution, settings);
        let prefix = "[系统:分析与估值系统] 系统: ";
        let first = lines[0].strip_prefix(prefix).unwrap();
        assert_eq!(first.chars().count(), settings.truncate_chars + ELLIPSIS.len());
        assert!(first.ends_with(ELLIPSIS));
        let second = lines[1].strip_prefix(prefix).unwrap();
        assert_eq!(second, "x".repeat(150));
    }

    #[test]
    fn test_capabilities_digest() {
        let digest = capabilities_digest(context_config(ContextId::Discovery));
        assert_eq!(
            digest,
            "- 产业猎手: 全网扫描潜在标的，分析产业链上下游。\n- 行业研究: 深度剖析细分赛道，输出市场规模与竞争格局。"
        );
        assert_eq!(capabilities_digest(None), GENERIC_CAPABILITIES_PLACEHOLDER);
    }

    #[test]
    fn test_system_instruction_sections() {
        let instruction = build_system_instruction("PERSONA", "分析与估值系统", "- a: b", "");
        assert!(instruction.starts_with("PERSONA"));
        assert!(instruction.contains("- 运行模块: 分析与估值系统"));
        assert!(instruction.contains("- a: b"));
        assert!(instruction.contains(EMPTY_DIGEST_PLACEHOLDER));
        assert!(instruction.contains("```json:chart"));

        let generic = build_system_instruction("P", " ", "", "[系统:x] 用户: y");
        assert!(generic.contains(GENERIC_CONTEXT_NAME));
        assert!(generic.contains(GENERIC_CAPABILITIES_PLACEHOLDER));
        assert!(generic.contains("[系统:x] 用户: y"));
    }
}
