//! 生成上下文装配
//!
//! 顺序固定：system 人设提示 + 完整消息历史 + 当轮状态注记。
//! 注记只有一条：情绪 + 当前主诉，检索发生时把前疗程信息追加在同一条注记里。

use crate::engine::emotion::EmotionLabel;
use crate::llm::ChatMessage;

/// 装配一轮生成所需的有序上下文
pub fn assemble(
    system_prompt: &str,
    messages: &[ChatMessage],
    emotion: EmotionLabel,
    complaint: &str,
    knowledge: Option<&str>,
) -> Vec<ChatMessage> {
    let mut context = Vec::with_capacity(messages.len() + 2);
    context.push(ChatMessage::system(system_prompt));
    context.extend_from_slice(messages);

    let annotation = match knowledge {
        Some(k) => format!(
            "当前的情绪状态是：{emotion}，当前的主诉是：{complaint}，涉及到之前疗程的信息是：{k}"
        ),
        None => format!("当前的情绪状态是：{emotion}，当前的主诉是：{complaint}"),
    };
    context.push(ChatMessage::system(annotation));
    context
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::Role;

    #[test]
    fn test_ordering_and_roles() {
        let history = vec![
            ChatMessage::user("你好"),
            ChatMessage::assistant("医生你好"),
            ChatMessage::user("最近睡得怎么样"),
        ];
        let context = assemble(
            "你是一位来访者",
            &history,
            EmotionLabel::Nervousness,
            "最近总是失眠",
            None,
        );

        assert_eq!(context.len(), 5);
        assert_eq!(context[0].role, Role::System);
        assert_eq!(context[0].content, "你是一位来访者");
        assert_eq!(context[1].role, Role::User);
        assert_eq!(context[2].role, Role::Assistant);
        assert_eq!(context[4].role, Role::System);
        assert_eq!(
            context[4].content,
            "当前的情绪状态是：nervousness，当前的主诉是：最近总是失眠"
        );
    }

    #[test]
    fn test_knowledge_appended_to_same_annotation() {
        let context = assemble(
            "你是一位来访者",
            &[],
            EmotionLabel::Sadness,
            "失眠",
            Some("上次谈到了加班"),
        );
        assert_eq!(context.len(), 2);
        assert_eq!(
            context[1].content,
            "当前的情绪状态是：sadness，当前的主诉是：失眠，涉及到之前疗程的信息是：上次谈到了加班"
        );
    }
}
