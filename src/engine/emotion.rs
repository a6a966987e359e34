//! 情绪调制：GoEmotions 标签推理与类距加权扰动
//!
//! 推理由外部分类器完成（约束为枚举内取值）；每轮以 10% 概率对推理结果做一次扰动。
//! 扰动权重规则：同类成员共享整条类权重、不按成员数归一，
//! 大类（Positive 14 个成员）因此被不成比例地放大。这是有意为之，不要改成按成员归一。

use std::fmt;
use std::sync::Arc;

use rand::distributions::{Distribution, WeightedIndex};
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::llm::{complete_structured, ChatClient, ChatMessage, LlmError};
use crate::session::{render_transcript, Portrait, Utterance};

/// 超过该指示值（0..=100 均匀抽取）才触发扰动，即约 10% 的回合
pub const PERTURB_THRESHOLD: u32 = 90;

/// 情绪标签：GoEmotions 的 27 类情绪加 neutral（分类器枚举的完整取值集）
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmotionLabel {
    Admiration,
    Amusement,
    Anger,
    Annoyance,
    Approval,
    Caring,
    Confusion,
    Curiosity,
    Desire,
    Disappointment,
    Disapproval,
    Disgust,
    Embarrassment,
    Excitement,
    Fear,
    Gratitude,
    Grief,
    Joy,
    Love,
    Nervousness,
    Optimism,
    Pride,
    Realization,
    Relief,
    Remorse,
    Sadness,
    Surprise,
    Neutral,
}

impl EmotionLabel {
    pub const ALL: [EmotionLabel; 28] = [
        EmotionLabel::Admiration,
        EmotionLabel::Amusement,
        EmotionLabel::Anger,
        EmotionLabel::Annoyance,
        EmotionLabel::Approval,
        EmotionLabel::Caring,
        EmotionLabel::Confusion,
        EmotionLabel::Curiosity,
        EmotionLabel::Desire,
        EmotionLabel::Disappointment,
        EmotionLabel::Disapproval,
        EmotionLabel::Disgust,
        EmotionLabel::Embarrassment,
        EmotionLabel::Excitement,
        EmotionLabel::Fear,
        EmotionLabel::Gratitude,
        EmotionLabel::Grief,
        EmotionLabel::Joy,
        EmotionLabel::Love,
        EmotionLabel::Nervousness,
        EmotionLabel::Optimism,
        EmotionLabel::Pride,
        EmotionLabel::Realization,
        EmotionLabel::Relief,
        EmotionLabel::Remorse,
        EmotionLabel::Sadness,
        EmotionLabel::Surprise,
        EmotionLabel::Neutral,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            EmotionLabel::Admiration => "admiration",
            EmotionLabel::Amusement => "amusement",
            EmotionLabel::Anger => "anger",
            EmotionLabel::Annoyance => "annoyance",
            EmotionLabel::Approval => "approval",
            EmotionLabel::Caring => "caring",
            EmotionLabel::Confusion => "confusion",
            EmotionLabel::Curiosity => "curiosity",
            EmotionLabel::Desire => "desire",
            EmotionLabel::Disappointment => "disappointment",
            EmotionLabel::Disapproval => "disapproval",
            EmotionLabel::Disgust => "disgust",
            EmotionLabel::Embarrassment => "embarrassment",
            EmotionLabel::Excitement => "excitement",
            EmotionLabel::Fear => "fear",
            EmotionLabel::Gratitude => "gratitude",
            EmotionLabel::Grief => "grief",
            EmotionLabel::Joy => "joy",
            EmotionLabel::Love => "love",
            EmotionLabel::Nervousness => "nervousness",
            EmotionLabel::Optimism => "optimism",
            EmotionLabel::Pride => "pride",
            EmotionLabel::Realization => "realization",
            EmotionLabel::Relief => "relief",
            EmotionLabel::Remorse => "remorse",
            EmotionLabel::Sadness => "sadness",
            EmotionLabel::Surprise => "surprise",
            EmotionLabel::Neutral => "neutral",
        }
    }

    /// 所属情感大类。grief / surprise 不在扰动成员表里，
    /// 这里取最邻近类仅供距离查询，它们不会成为扰动候选。
    pub fn sentiment_class(self) -> SentimentClass {
        if SentimentClass::Positive.members().contains(&self) {
            SentimentClass::Positive
        } else if SentimentClass::Ambiguous.members().contains(&self) {
            SentimentClass::Ambiguous
        } else if SentimentClass::Negative.members().contains(&self) {
            SentimentClass::Negative
        } else {
            match self {
                EmotionLabel::Grief => SentimentClass::Negative,
                EmotionLabel::Surprise => SentimentClass::Ambiguous,
                _ => SentimentClass::Neutral,
            }
        }
    }
}

impl fmt::Display for EmotionLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 情感大类（Positive / Neutral / Ambiguous / Negative）
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum SentimentClass {
    Positive,
    Neutral,
    Ambiguous,
    Negative,
}

impl SentimentClass {
    pub const ALL: [SentimentClass; 4] = [
        SentimentClass::Positive,
        SentimentClass::Neutral,
        SentimentClass::Ambiguous,
        SentimentClass::Negative,
    ];

    /// 扰动候选成员表（14 / 1 / 3 / 8）
    pub fn members(self) -> &'static [EmotionLabel] {
        match self {
            SentimentClass::Positive => &[
                EmotionLabel::Admiration,
                EmotionLabel::Amusement,
                EmotionLabel::Approval,
                EmotionLabel::Caring,
                EmotionLabel::Curiosity,
                EmotionLabel::Desire,
                EmotionLabel::Excitement,
                EmotionLabel::Gratitude,
                EmotionLabel::Joy,
                EmotionLabel::Love,
                EmotionLabel::Optimism,
                EmotionLabel::Pride,
                EmotionLabel::Realization,
                EmotionLabel::Relief,
            ],
            SentimentClass::Neutral => &[EmotionLabel::Neutral],
            SentimentClass::Ambiguous => &[
                EmotionLabel::Confusion,
                EmotionLabel::Disappointment,
                EmotionLabel::Nervousness,
            ],
            SentimentClass::Negative => &[
                EmotionLabel::Anger,
                EmotionLabel::Annoyance,
                EmotionLabel::Disapproval,
                EmotionLabel::Disgust,
                EmotionLabel::Embarrassment,
                EmotionLabel::Fear,
                EmotionLabel::Sadness,
                EmotionLabel::Remorse,
            ],
        }
    }

    /// 类间对称距离：自身 0，相邻 1，依次递增
    pub fn distance(self, other: SentimentClass) -> u32 {
        use SentimentClass::*;
        match (self, other) {
            (Positive, Positive) | (Neutral, Neutral) | (Ambiguous, Ambiguous)
            | (Negative, Negative) => 0,
            (Positive, Neutral) | (Neutral, Positive) => 1,
            (Positive, Ambiguous) | (Ambiguous, Positive) => 2,
            (Positive, Negative) | (Negative, Positive) => 3,
            (Neutral, Ambiguous) | (Ambiguous, Neutral) => 1,
            (Neutral, Negative) | (Negative, Neutral) => 2,
            (Ambiguous, Negative) | (Negative, Ambiguous) => 1,
        }
    }
}

/// 距离 -> 权重（同类 10，相邻 5，隔一类 2，隔两类 1）
fn distance_weight(distance: u32) -> u32 {
    match distance {
        0 => 10,
        1 => 5,
        2 => 2,
        _ => 1,
    }
}

/// 扰动候选及各自的未归一化权重
///
/// 每个候选的权重是「距离权重 × 所属类成员数」，整条类权重按成员逐个计入，
/// 当前标签本身被排除。权重经随机抽样隐式归一。
pub fn perturb_weights(current: EmotionLabel) -> Vec<(EmotionLabel, u32)> {
    let current_class = current.sentiment_class();
    let mut candidates = Vec::with_capacity(26);
    for class in SentimentClass::ALL {
        let class_weight = distance_weight(current_class.distance(class)) * class.members().len() as u32;
        for &label in class.members() {
            if label != current {
                candidates.push((label, class_weight));
            }
        }
    }
    candidates
}

/// 按类距加权随机扰动到另一个情绪标签（绝不返回原标签）
pub fn perturb(current: EmotionLabel, rng: &mut impl Rng) -> EmotionLabel {
    let candidates = perturb_weights(current);
    // 候选表为静态成员表去掉当前标签，必然非空且权重均为正
    let dist = WeightedIndex::new(candidates.iter().map(|(_, w)| *w))
        .expect("perturbation candidate weights are static and positive");
    candidates[dist.sample(rng)].0
}

/// 指示值超过阈值时扰动，否则直通
pub fn apply_perturbation(
    indicator: u32,
    emotion: EmotionLabel,
    rng: &mut impl Rng,
) -> EmotionLabel {
    if indicator > PERTURB_THRESHOLD {
        perturb(emotion, rng)
    } else {
        emotion
    }
}

/// 情绪分类器的结构化输出
#[derive(Debug, Deserialize)]
struct EmotionChoice {
    emotion: EmotionLabel,
}

/// 情绪调制器：调用外部分类器推理，按概率扰动
pub struct EmotionModulator {
    client: Arc<dyn ChatClient>,
}

impl EmotionModulator {
    pub fn new(client: Arc<dyn ChatClient>) -> Self {
        Self { client }
    }

    /// 推理下一句最可能的情绪；失败向上传播，由编排器兜底
    pub async fn infer(
        &self,
        portrait: &Portrait,
        conversation: &[Utterance],
    ) -> Result<EmotionLabel, LlmError> {
        let patient_info = format!(
            "### 患者信息\n年龄：{}\n性别：{}\n职业：{}\n婚姻状况：{}\n症状：{}",
            portrait.age,
            portrait.gender,
            portrait.occupation,
            portrait.marital_status,
            portrait.symptoms
        );
        let dialogue_history = render_transcript(conversation);
        let labels = EmotionLabel::ALL
            .iter()
            .map(|l| l.as_str())
            .collect::<Vec<_>>()
            .join(", ");

        let prompt = format!(
            "### 任务\n根据患者情况及咨访对话历史记录推测患者下一句话最可能的情绪。\n{patient_info}\n### 对话记录\n{dialogue_history}\n### 输出要求\n请只输出一个 JSON 对象：{{\"emotion\": \"<标签>\"}}，标签必须是以下之一：{labels}"
        );

        let choice: EmotionChoice =
            complete_structured(&*self.client, &[ChatMessage::user(prompt)]).await?;
        Ok(choice.emotion)
    }

    /// 90% 的回合直通推理结果，10% 的回合在推理结果上做一次类距扰动
    pub async fn modulate<R: Rng>(
        &self,
        portrait: &Portrait,
        conversation: &[Utterance],
        rng: &mut R,
    ) -> Result<EmotionLabel, LlmError> {
        let indicator: u32 = rng.gen_range(0..=100);
        let emotion = self.infer(portrait, conversation).await?;
        Ok(apply_perturbation(indicator, emotion, rng))
    }
}
