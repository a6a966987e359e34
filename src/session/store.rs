//! 进程内会话存储
//!
//! 会话按 id 存取；结束只改状态不删除，历史留档。引擎不感知本模块，
//! 调用方负责对同一会话串行调用（单写者）。

use std::collections::HashMap;
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::session::SessionState;

/// 会话条目状态
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SessionStatus {
    Active,
    Ended,
}

struct SessionEntry {
    state: SessionState,
    created_at: DateTime<Utc>,
    turn_count: usize,
    status: SessionStatus,
}

/// 会话摘要（列表接口用）
#[derive(Clone, Debug)]
pub struct SessionSummary {
    pub id: Uuid,
    pub created_at: String,
    pub turn_count: usize,
    pub status: SessionStatus,
}

/// 进程内会话存储
#[derive(Default)]
pub struct SessionStore {
    inner: Mutex<HashMap<Uuid, SessionEntry>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn create(&self, state: SessionState) -> Uuid {
        let id = Uuid::new_v4();
        let mut inner = self.inner.lock().expect("session store lock poisoned");
        inner.insert(
            id,
            SessionEntry {
                state,
                created_at: Utc::now(),
                turn_count: 0,
                status: SessionStatus::Active,
            },
        );
        id
    }

    pub fn get(&self, id: &Uuid) -> Option<SessionState> {
        let inner = self.inner.lock().expect("session store lock poisoned");
        inner.get(id).map(|e| e.state.clone())
    }

    /// 写回一轮之后的状态；会话不存在或已结束时返回 false
    pub fn update(&self, id: &Uuid, state: SessionState) -> bool {
        let mut inner = self.inner.lock().expect("session store lock poisoned");
        match inner.get_mut(id) {
            Some(entry) if entry.status == SessionStatus::Active => {
                entry.state = state;
                entry.turn_count += 1;
                true
            }
            _ => false,
        }
    }

    /// 标记结束，保留全部历史
    pub fn mark_ended(&self, id: &Uuid) -> bool {
        let mut inner = self.inner.lock().expect("session store lock poisoned");
        match inner.get_mut(id) {
            Some(entry) => {
                entry.status = SessionStatus::Ended;
                entry.state.ended = true;
                true
            }
            None => false,
        }
    }

    pub fn list(&self) -> Vec<SessionSummary> {
        let inner = self.inner.lock().expect("session store lock poisoned");
        inner
            .iter()
            .map(|(id, e)| SessionSummary {
                id: *id,
                created_at: e.created_at.to_rfc3339(),
                turn_count: e.turn_count,
                status: e.status,
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::Portrait;

    fn demo_state() -> SessionState {
        SessionState::new(
            Portrait {
                age: "28".to_string(),
                gender: "男".to_string(),
                occupation: "软件工程师".to_string(),
                marital_status: "未婚".to_string(),
                symptoms: "工作焦虑，失眠".to_string(),
            },
            serde_json::json!({"案例标题": "工作压力咨询"}),
            vec![],
            vec![],
            "你是一位来访者",
        )
    }

    #[test]
    fn test_create_get_update() {
        let store = SessionStore::new();
        let id = store.create(demo_state());
        let mut state = store.get(&id).unwrap();
        assert!(store.update(&id, state.clone()));
        state.ended = true;
        assert!(store.update(&id, state));
        assert_eq!(store.list()[0].turn_count, 2);
    }

    #[test]
    fn test_mark_ended_keeps_session() {
        let store = SessionStore::new();
        let id = store.create(demo_state());
        assert!(store.mark_ended(&id));
        // 结束后仍可读取（留档），但不再接受写回
        let state = store.get(&id).unwrap();
        assert!(state.ended);
        assert!(!store.update(&id, state));
    }

    #[test]
    fn test_unknown_id() {
        let store = SessionStore::new();
        assert!(store.get(&Uuid::new_v4()).is_none());
        assert!(!store.mark_ended(&Uuid::new_v4()));
    }
}
