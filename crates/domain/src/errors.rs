use crate::TodoId;
use thiserror::Error;

/// サービス層が返すエラー
///
/// ドメイン上の失敗は「存在しない」のみ。ストア由来の失敗は文字列化して
/// そのまま境界まで伝播させます。
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TodoError {
    #[error("Todo not found: {0}")]
    NotFound(TodoId),

    #[error("Subtask {subtask_id} not found under todo {parent_id}")]
    SubtaskNotFound { parent_id: TodoId, subtask_id: TodoId },

    #[error("Store error: {0}")]
    Store(String),
}

impl TodoError {
    /// 見つからなかった ID（NotFound 系のみ）
    pub fn missing_id(&self) -> Option<TodoId> {
        match self {
            TodoError::NotFound(id) => Some(*id),
            TodoError::SubtaskNotFound { subtask_id, .. } => Some(*subtask_id),
            TodoError::Store(_) => None,
        }
    }
}

pub type TodoResult<T> = Result<T, TodoError>;
