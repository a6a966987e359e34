//! Anna - 模拟心理障碍患者对话引擎
//!
//! 入口：初始化日志、加载配置、构建引擎与演示会话，进入控制台咨访循环。
//! 无任何 API Key 时自动回落 Mock 后端，可离线跑通完整回合。

use std::io::{self, BufRead, Write};

use anna::config::{load_config, AppConfig};
use anna::engine::{ComplaintStage, MsPatient, TurnResult, END_OF_CONVERSATION};
use anna::session::{Portrait, SessionStore, Utterance};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    anna::observability::init();

    let cfg = load_config(None).unwrap_or_else(|e| {
        tracing::warn!("Config load failed ({}), using defaults", e);
        AppConfig::default()
    });

    let mut patient = MsPatient::from_config(&cfg);

    // 演示画像与案例（虚构数据，仅用于演示）
    let portrait = Portrait {
        age: "42".to_string(),
        gender: "女".to_string(),
        occupation: "教师".to_string(),
        marital_status: "离婚".to_string(),
        symptoms: "缺乏自信心，自我价值感低，有自罪感，无望感；精神运动性激越；有自杀想法".to_string(),
    };
    let report = serde_json::json!({
        "案例标题": "决断困难与自罪感的焦虑障碍案例",
        "案例类别": ["焦虑障碍", "自我价值感低落"],
        "运用的技术": ["认知行为疗法", "情感支持"],
    });
    let previous_conversations = vec![
        Utterance::seeker("医生你好"),
        Utterance::counselor("你好。有什么想聊聊吗"),
        Utterance::seeker("我感觉人生很失败，什么事情都干不好，还经常拖累别人"),
        Utterance::counselor("您这样想的原因是什么呢。最近发生什么事情了吗"),
        Utterance::seeker("我感觉最近自己行动变得很拖沓，事情做不好就会很急躁。而且有的时候大脑一片空白"),
        Utterance::counselor("好的。那这种情况持续多久了呢"),
        Utterance::seeker("我也不知道是什么原因。有一阵子了"),
    ];
    let chain = vec![
        ComplaintStage {
            stage: 1,
            content: "觉得自己什么都做不好，经常拖累别人".to_string(),
        },
        ComplaintStage {
            stage: 2,
            content: "意识到急躁和自责背后是长期的自我怀疑".to_string(),
        },
        ComplaintStage {
            stage: 3,
            content: "开始正视自我价值感低落的问题，愿意寻求支持".to_string(),
        },
    ];
    let system_prompt = format!(
        "你将扮演一位{}岁的{}来访者，职业是{}，婚姻状况为{}。主要症状：{}。\
         请始终以第一人称、来访者的口吻自然回应咨询师，不要跳出角色。",
        portrait.age, portrait.gender, portrait.occupation, portrait.marital_status, portrait.symptoms
    );

    let store = SessionStore::new();
    let session_id = store.create(MsPatient::create_session(
        portrait,
        report,
        previous_conversations,
        chain,
        system_prompt,
    ));
    tracing::info!(%session_id, "session created");

    let stdin = io::stdin();
    loop {
        print!("请输入您的消息: ");
        io::stdout().flush()?;

        let Some(line) = stdin.lock().lines().next() else {
            break;
        };
        let message = line?;
        if message.trim().eq_ignore_ascii_case("exit") {
            break;
        }
        if message.trim().is_empty() {
            continue;
        }

        let Some(mut state) = store.get(&session_id) else {
            break;
        };
        match patient.process_turn(&mut state, &message).await {
            TurnResult::Reply {
                text,
                emotion,
                complaint,
            } => {
                store.update(&session_id, state);
                println!("Seeker [{emotion} | {complaint}]: {text}");
            }
            TurnResult::Terminated => {
                store.update(&session_id, state);
                store.mark_ended(&session_id);
                println!("{END_OF_CONVERSATION}");
                break;
            }
        }
    }

    Ok(())
}
