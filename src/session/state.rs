//! 会话状态：画像、案例报告、咨访记录与生成消息列表
//!
//! SessionState 由初始化协作方创建、引擎逐轮修改；会话结束只置 ended 标记，
//! 从不物理删除（留档需要）。

use serde::{Deserialize, Serialize};

use crate::engine::complaint::{ComplaintChain, ComplaintStage, Progress};
use crate::engine::emotion::EmotionLabel;
use crate::llm::ChatMessage;

/// 患者画像（年龄、性别、职业、婚姻状况、症状）
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Portrait {
    pub age: String,
    pub gender: String,
    pub occupation: String,
    pub marital_status: String,
    pub symptoms: String,
}

/// 案例报告：标题、类别、咨询经过等条目，结构不定，保留原始 JSON
pub type Report = serde_json::Value;

/// 咨访记录中的说话人
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Speaker {
    Counselor,
    Seeker,
}

impl Speaker {
    pub fn as_str(&self) -> &'static str {
        match self {
            Speaker::Counselor => "Counselor",
            Speaker::Seeker => "Seeker",
        }
    }
}

/// 单条咨访话语
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Utterance {
    pub speaker: Speaker,
    pub content: String,
}

impl Utterance {
    pub fn counselor(content: impl Into<String>) -> Self {
        Self {
            speaker: Speaker::Counselor,
            content: content.into(),
        }
    }

    pub fn seeker(content: impl Into<String>) -> Self {
        Self {
            speaker: Speaker::Seeker,
            content: content.into(),
        }
    }
}

/// 把咨访记录渲染成提示词里的对话历史文本
pub fn render_transcript(conversation: &[Utterance]) -> String {
    conversation
        .iter()
        .map(|u| format!("{}: {}", u.speaker.as_str(), u.content))
        .collect::<Vec<_>>()
        .join("\n")
}

/// 单轮留档：咨访话语对、情绪、主诉阶段内容、检索到的前疗程信息
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TurnRecord {
    pub counselor: String,
    pub seeker: String,
    pub emotion: EmotionLabel,
    pub complaint: String,
    pub knowledge: Option<String>,
}

/// 会话状态：引擎每轮修改 conversation / messages / progress / turns
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SessionState {
    pub portrait: Portrait,
    pub report: Report,
    /// 前疗程咨访记录（知识检索的素材）
    pub previous_conversations: Vec<Utterance>,
    pub system_prompt: String,
    /// 本疗程咨访记录（Counselor / Seeker）
    pub conversation: Vec<Utterance>,
    /// 生成用消息历史（user / assistant）
    pub messages: Vec<ChatMessage>,
    pub complaint_chain: ComplaintChain,
    pub progress: Progress,
    /// 逐轮留档
    pub turns: Vec<TurnRecord>,
    pub ended: bool,
}

impl SessionState {
    pub fn new(
        portrait: Portrait,
        report: Report,
        previous_conversations: Vec<Utterance>,
        chain: Vec<ComplaintStage>,
        system_prompt: impl Into<String>,
    ) -> Self {
        Self {
            portrait,
            report,
            previous_conversations,
            system_prompt: system_prompt.into(),
            conversation: Vec::new(),
            messages: Vec::new(),
            complaint_chain: ComplaintChain::sanitize(chain),
            progress: Progress::start(),
            turns: Vec::new(),
            ended: false,
        }
    }

    pub fn is_terminated(&self) -> bool {
        self.ended || matches!(self.progress, Progress::Terminated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn portrait() -> Portrait {
        Portrait {
            age: "28".to_string(),
            gender: "男".to_string(),
            occupation: "软件工程师".to_string(),
            marital_status: "未婚".to_string(),
            symptoms: "工作焦虑，失眠".to_string(),
        }
    }

    #[test]
    fn test_new_session_starts_at_stage_one() {
        let state = SessionState::new(
            portrait(),
            serde_json::json!({"案例标题": "工作压力咨询"}),
            vec![],
            vec![],
            "你是一位来访者",
        );
        assert_eq!(state.progress, Progress::start());
        assert!(!state.is_terminated());
        assert!(state.conversation.is_empty());
        // 空链被替换为单一默认阶段
        assert_eq!(state.complaint_chain.len(), 1);
    }

    #[test]
    fn test_render_transcript() {
        let transcript = vec![
            Utterance::counselor("你好。有什么想聊聊吗"),
            Utterance::seeker("医生你好"),
        ];
        assert_eq!(
            render_transcript(&transcript),
            "Counselor: 你好。有什么想聊聊吗\nSeeker: 医生你好"
        );
    }
}
