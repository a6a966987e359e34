//! 结构化输出：要求模型只输出一个 JSON 对象，提取后解析为目标类型
//!
//! 小模型常把 JSON 包进 ```json 围栏或附带说明文字，这里统一做提取；
//! 提取不到或解析失败都归为 Malformed，由调用方按一次失败处理。

use serde::de::DeserializeOwned;

use crate::llm::{ChatClient, ChatMessage, LlmError};

/// 从 LLM 输出中提取 JSON 块（```json ... ``` 围栏或首个 { 到末个 }）
pub fn extract_json(output: &str) -> Option<&str> {
    let trimmed = output.trim();

    if let Some(start) = trimmed.find("```json") {
        let rest = &trimmed[start + 7..];
        return Some(
            rest.find("```")
                .map(|end| rest[..end].trim())
                .unwrap_or_else(|| rest.trim()),
        );
    }

    let start = trimmed.find('{')?;
    let end = trimmed.rfind('}')?;
    if start <= end {
        Some(&trimmed[start..=end])
    } else {
        None
    }
}

/// 调用 LLM 并把输出解析为 T
pub async fn complete_structured<T: DeserializeOwned>(
    client: &dyn ChatClient,
    messages: &[ChatMessage],
) -> Result<T, LlmError> {
    let output = client.complete(messages).await?;
    let json = extract_json(&output)
        .ok_or_else(|| LlmError::Malformed(format!("no JSON object in output: {output}")))?;
    serde_json::from_str(json).map_err(|e| LlmError::Malformed(format!("{e}: {json}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_plain_json() {
        let out = r#"{"is_need": true}"#;
        assert_eq!(extract_json(out), Some(r#"{"is_need": true}"#));
    }

    #[test]
    fn test_extract_fenced_json() {
        let out = "好的，结果如下：\n```json\n{\"advance\": false}\n```";
        assert_eq!(extract_json(out), Some("{\"advance\": false}"));
    }

    #[test]
    fn test_extract_json_with_prose() {
        let out = "根据对话判断：{\"emotion\": \"sadness\"}，请查收。";
        assert_eq!(extract_json(out), Some("{\"emotion\": \"sadness\"}"));
    }

    #[test]
    fn test_extract_no_json() {
        assert_eq!(extract_json("没有任何结构化内容"), None);
    }
}
