//! 前疗程知识：是否需要检索的判定与检索总结
//!
//! 两个外部调用都不做本地兜底，失败原样上抛，由编排器按整轮失败处理。

use std::sync::Arc;

use serde::Deserialize;

use crate::llm::{complete_structured, ChatClient, ChatMessage, LlmError};
use crate::session::{render_transcript, Report, Utterance};

/// 是否涉及前疗程内容的结构化判定
#[derive(Debug, Deserialize)]
struct NeedVerdict {
    is_need: bool,
}

/// 知识检索的结构化输出
#[derive(Debug, Deserialize)]
struct KnowledgeAnswer {
    knowledge: String,
}

/// 前疗程知识检索器
pub struct KnowledgeRetriever {
    client: Arc<dyn ChatClient>,
}

impl KnowledgeRetriever {
    pub fn new(client: Arc<dyn ChatClient>) -> Self {
        Self { client }
    }

    /// 判断咨询师这句话是否提及了之前疗程的内容（时间上的回指、此前谈过的话题等）
    pub async fn is_need(&self, utterance: &str) -> Result<bool, LlmError> {
        let prompt = format!(
            "下面这句话是心理咨询师说的话，请判断它是否提及了之前疗程的内容。\n\
             ### 话语\n{utterance}\n\
             ### 输出要求\n请只输出一个 JSON 对象：{{\"is_need\": true|false}}"
        );
        let verdict: NeedVerdict =
            complete_structured(&*self.client, &[ChatMessage::user(prompt)]).await?;
        Ok(verdict.is_need)
    }

    /// 从前疗程记录与案例报告中检索并总结与当前话语相关的信息
    pub async fn query(
        &self,
        utterance: &str,
        previous_conversations: &[Utterance],
        report: &Report,
    ) -> Result<String, LlmError> {
        let history = render_transcript(previous_conversations);
        let report_json =
            serde_json::to_string(report).map_err(|e| LlmError::Malformed(e.to_string()))?;
        let prompt = format!(
            "### 任务\n根据对话内容，从知识库中搜索相关的信息并总结。\n\
             ### 对话内容\n{utterance}\n\
             ### 知识库\n{history}\n{report_json}\n\
             ### 输出要求\n请只输出一个 JSON 对象：{{\"knowledge\": \"<总结>\"}}"
        );
        let answer: KnowledgeAnswer =
            complete_structured(&*self.client, &[ChatMessage::user(prompt)]).await?;
        Ok(answer.knowledge)
    }
}
