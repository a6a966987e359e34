//! 患者引擎：单轮编排状态机
//!
//! 每轮：记录咨询师话语 → 情绪调制 → 主诉推进 → 知识判定/检索 → 装配上下文 →
//! 韧性生成 → 记录患者回复。内部失败显式走 Result 分支，以中性回退语完整收尾该轮，
//! 咨访记录与消息历史每轮恰好新增一对，从不留下半截状态。

use std::sync::Arc;

use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::config::AppConfig;
use crate::engine::complaint::{ComplaintStage, ComplaintTracker, Progress};
use crate::engine::context;
use crate::engine::emotion::{EmotionLabel, EmotionModulator};
use crate::engine::error::TurnError;
use crate::engine::generator::{self, ResilientGenerator};
use crate::engine::knowledge::KnowledgeRetriever;
use crate::llm::{ChatClient, ChatMessage, MockChatClient, OpenAiClient};
use crate::session::{Portrait, Report, SessionState, TurnRecord, Utterance};

/// 会话终止标记（原样透传给上层协议）
pub const END_OF_CONVERSATION: &str = "<|end_of_conversation|>";

/// 整轮失败时的中性回退语
pub const NEUTRAL_FALLBACK: &str = "抱歉，我刚才走神了...最近工作太忙，脑子有点乱。你刚才说什么？";

/// 单轮结果
#[derive(Clone, Debug, PartialEq)]
pub enum TurnResult {
    /// 正常回复：患者话语、情绪标签、当前主诉内容
    Reply {
        text: String,
        emotion: EmotionLabel,
        complaint: String,
    },
    /// 判定模型发出终止信号，会话结束
    Terminated,
}

/// 引擎各步骤的客户端。情绪分类器与主诉判定模型往往是独立部署的端点，
/// 因此按步骤持有；全部指向同一端点也完全可行（见 from_client）。
pub struct EngineClients {
    pub emotion: Arc<dyn ChatClient>,
    pub judge: Arc<dyn ChatClient>,
    pub knowledge: Arc<dyn ChatClient>,
    pub generation: Arc<dyn ChatClient>,
}

impl EngineClients {
    /// 所有步骤共用同一个客户端
    pub fn from_client(client: Arc<dyn ChatClient>) -> Self {
        Self {
            emotion: client.clone(),
            judge: client.clone(),
            knowledge: client.clone(),
            generation: client,
        }
    }
}

/// 根据配置构建各步骤客户端：有 Key 走 OpenAI 兼容端点，否则回落 Mock
pub fn create_clients_from_config(cfg: &AppConfig) -> EngineClients {
    let base = make_client(cfg, None);
    EngineClients {
        emotion: make_client(cfg, Some(&cfg.llm.emotion)),
        judge: make_client(cfg, Some(&cfg.llm.complaint)),
        knowledge: base.clone(),
        generation: base,
    }
}

fn make_client(
    cfg: &AppConfig,
    endpoint: Option<&crate::config::EndpointSection>,
) -> Arc<dyn ChatClient> {
    if cfg.llm.provider.to_lowercase() == "mock" {
        return Arc::new(MockChatClient);
    }

    let api_key = endpoint
        .and_then(|e| e.api_key.clone())
        .or_else(|| cfg.llm.api_key.clone())
        .or_else(|| std::env::var("OPENAI_API_KEY").ok());

    let Some(api_key) = api_key else {
        tracing::warn!("no API key configured, using Mock LLM");
        return Arc::new(MockChatClient);
    };

    let base_url = endpoint
        .and_then(|e| e.base_url.as_deref())
        .or(cfg.llm.base_url.as_deref());
    let model = endpoint
        .and_then(|e| e.model.as_deref())
        .unwrap_or(&cfg.llm.model);

    tracing::info!(model, base_url = base_url.unwrap_or("api.openai.com"), "using OpenAI-compatible LLM");
    Arc::new(OpenAiClient::new(
        base_url,
        model,
        Some(&api_key),
        cfg.llm.request_timeout_secs,
    ))
}

/// 成功回合的内部产物
struct TurnOutcome {
    text: String,
    emotion: EmotionLabel,
    complaint: String,
    knowledge: Option<String>,
}

/// 模拟患者：组合情绪调制、主诉推进、知识检索与韧性生成
pub struct MsPatient {
    emotion: EmotionModulator,
    tracker: ComplaintTracker,
    knowledge: KnowledgeRetriever,
    generator: ResilientGenerator,
    rng: StdRng,
}

impl MsPatient {
    pub fn new(clients: EngineClients) -> Self {
        Self::with_rng(clients, StdRng::from_entropy())
    }

    /// 注入随机源（情绪扰动与回退语选取），测试可复现
    pub fn with_rng(clients: EngineClients, rng: StdRng) -> Self {
        Self::with_options(clients, generator::DEFAULT_MAX_ATTEMPTS, rng)
    }

    pub fn with_options(clients: EngineClients, max_attempts: usize, rng: StdRng) -> Self {
        Self {
            emotion: EmotionModulator::new(clients.emotion),
            tracker: ComplaintTracker::new(clients.judge),
            knowledge: KnowledgeRetriever::new(clients.knowledge),
            generator: ResilientGenerator::with_max_attempts(clients.generation, max_attempts),
            rng,
        }
    }

    /// 按配置构建：各步骤端点与生成重试次数均来自 AppConfig
    pub fn from_config(cfg: &AppConfig) -> Self {
        Self::with_options(
            create_clients_from_config(cfg),
            cfg.engine.max_attempts,
            StdRng::from_entropy(),
        )
    }

    /// 创建会话状态（链整形与默认阶段替换见 ComplaintChain::sanitize）
    pub fn create_session(
        portrait: Portrait,
        report: Report,
        previous_conversations: Vec<Utterance>,
        chain: Vec<ComplaintStage>,
        system_prompt: impl Into<String>,
    ) -> SessionState {
        SessionState::new(portrait, report, previous_conversations, chain, system_prompt)
    }

    pub fn is_terminated(state: &SessionState) -> bool {
        state.is_terminated()
    }

    /// 处理一轮对话。本方法从不返回错误：内部失败被显式转换为中性回退回合。
    pub async fn process_turn(&mut self, state: &mut SessionState, message: &str) -> TurnResult {
        if state.is_terminated() {
            return TurnResult::Terminated;
        }

        // 1. 记录咨询师话语
        state.conversation.push(Utterance::counselor(message));
        state.messages.push(ChatMessage::user(message));

        match self.run_turn(state, message).await {
            Ok(Some(outcome)) => {
                // 8. 记录患者回复
                state.conversation.push(Utterance::seeker(&outcome.text));
                state.messages.push(ChatMessage::assistant(&outcome.text));
                state.turns.push(TurnRecord {
                    counselor: message.to_string(),
                    seeker: outcome.text.clone(),
                    emotion: outcome.emotion,
                    complaint: outcome.complaint.clone(),
                    knowledge: outcome.knowledge,
                });
                tracing::info!(
                    emotion = %outcome.emotion,
                    stage = ?state.progress.index(),
                    "turn completed"
                );
                TurnResult::Reply {
                    text: outcome.text,
                    emotion: outcome.emotion,
                    complaint: outcome.complaint,
                }
            }
            Ok(None) => {
                // 终止信号：回滚本轮咨询师话语，保持记录成对，标记会话结束
                state.conversation.pop();
                state.messages.pop();
                state.progress = Progress::Terminated;
                state.ended = true;
                tracing::info!("conversation terminated by stage judgement");
                TurnResult::Terminated
            }
            Err(e) => {
                // 失败回合：以中性回退语收尾，情绪置 neutral，主诉阶段保持现状
                tracing::warn!(error = %e, "turn failed, completing with neutral fallback");
                let complaint = state
                    .complaint_chain
                    .content_at(state.progress.index().unwrap_or(1))
                    .to_string();
                state.conversation.push(Utterance::seeker(NEUTRAL_FALLBACK));
                state.messages.push(ChatMessage::assistant(NEUTRAL_FALLBACK));
                state.turns.push(TurnRecord {
                    counselor: message.to_string(),
                    seeker: NEUTRAL_FALLBACK.to_string(),
                    emotion: EmotionLabel::Neutral,
                    complaint: complaint.clone(),
                    knowledge: None,
                });
                TurnResult::Reply {
                    text: NEUTRAL_FALLBACK.to_string(),
                    emotion: EmotionLabel::Neutral,
                    complaint,
                }
            }
        }
    }

    /// 步骤 2–7。Ok(None) 表示判定模型发出了终止信号。
    async fn run_turn(
        &mut self,
        state: &mut SessionState,
        message: &str,
    ) -> Result<Option<TurnOutcome>, TurnError> {
        // 2. 情绪调制
        let emotion = self
            .emotion
            .modulate(&state.portrait, &state.conversation, &mut self.rng)
            .await
            .map_err(TurnError::Emotion)?;

        // 3. 主诉推进（fail-open，自身不会出错）
        let progress = self
            .tracker
            .advance(&state.complaint_chain, state.progress, &state.conversation)
            .await;
        let Progress::InProgress(index) = progress else {
            return Ok(None);
        };
        state.progress = progress;

        // 4. 当前主诉内容（取值钳制在链长之内）
        let complaint = state.complaint_chain.content_at(index).to_string();

        // 5. 是否涉及前疗程内容，是则检索总结
        let knowledge = if self
            .knowledge
            .is_need(message)
            .await
            .map_err(TurnError::Knowledge)?
        {
            Some(
                self.knowledge
                    .query(message, &state.previous_conversations, &state.report)
                    .await
                    .map_err(TurnError::Knowledge)?,
            )
        } else {
            None
        };

        // 6. 装配生成上下文
        let context = context::assemble(
            &state.system_prompt,
            &state.messages,
            emotion,
            &complaint,
            knowledge.as_deref(),
        );

        // 7. 韧性生成（不会失败、不会为空）
        let text = self.generator.generate(&context, &mut self.rng).await;

        Ok(Some(TurnOutcome {
            text,
            emotion,
            complaint,
            knowledge,
        }))
    }
}
