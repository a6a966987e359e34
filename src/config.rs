//! 应用配置：从 config/default.toml 与环境变量加载
//!
//! 加载顺序：先读 TOML 文件，再用环境变量 `ANNA__*` 覆盖
//! （双下划线表示嵌套，如 `ANNA__LLM__BASE_URL=http://...`）。

use std::path::PathBuf;

use serde::Deserialize;

/// 应用配置根（对应 config/default.toml 的顶层）
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    #[serde(default)]
    pub llm: LlmSection,
    #[serde(default)]
    pub engine: EngineSection,
}

/// [llm] 段：默认端点与按步骤覆盖
///
/// 情绪分类器与主诉判定模型可各自部署，未覆盖的步骤用默认端点。
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LlmSection {
    /// 后端：openai（兼容端点）/ mock
    pub provider: String,
    pub model: String,
    pub base_url: Option<String>,
    /// 未设置时回落到环境变量 OPENAI_API_KEY
    pub api_key: Option<String>,
    /// 单次请求超时（秒），每次重试各自计时
    pub request_timeout_secs: u64,
    /// 情绪分类器端点覆盖
    pub emotion: EndpointSection,
    /// 主诉判定模型端点覆盖
    pub complaint: EndpointSection,
}

impl Default for LlmSection {
    fn default() -> Self {
        Self {
            provider: "openai".to_string(),
            model: "gpt-4o-mini".to_string(),
            base_url: None,
            api_key: None,
            request_timeout_secs: 60,
            emotion: EndpointSection::default(),
            complaint: EndpointSection::default(),
        }
    }
}

/// 单步骤端点覆盖：任一字段缺省即沿用 [llm] 默认值
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct EndpointSection {
    pub base_url: Option<String>,
    pub model: Option<String>,
    pub api_key: Option<String>,
}

/// [engine] 段：生成重试次数
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct EngineSection {
    pub max_attempts: usize,
}

impl Default for EngineSection {
    fn default() -> Self {
        Self { max_attempts: 3 }
    }
}

/// 从 config 目录加载配置，环境变量 ANNA__* 可覆盖
///
/// 1. 按顺序查找 config/default.toml、../config/default.toml、default.toml，找到则作为第一源
/// 2. 若传入 config_path 且文件存在，则追加该文件（可覆盖前面的键）
/// 3. 最后叠加环境变量 ANNA__*（双下划线表示嵌套键）
pub fn load_config(config_path: Option<PathBuf>) -> Result<AppConfig, config::ConfigError> {
    let mut builder = config::Config::builder();

    let default_names = ["config/default", "../config/default", "default"];
    for name in default_names {
        let path = format!("{}.toml", name);
        if std::path::Path::new(&path).exists() {
            builder = builder.add_source(config::File::with_name(name).required(false));
            break;
        }
    }

    if let Some(ref path) = config_path {
        if path.exists() {
            builder = builder.add_source(config::File::from(path.clone()).required(false));
        }
    }

    builder = builder.add_source(
        config::Environment::with_prefix("ANNA")
            .separator("__")
            .try_parsing(true),
    );

    let c = builder.build()?;
    c.try_deserialize()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let cfg = AppConfig::default();
        assert_eq!(cfg.llm.provider, "openai");
        assert_eq!(cfg.llm.request_timeout_secs, 60);
        assert_eq!(cfg.engine.max_attempts, 3);
        assert!(cfg.llm.emotion.base_url.is_none());
    }
}
