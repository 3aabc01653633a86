use crate::clock::next_updated_at;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// ストアが採番する Todo の識別子
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TodoId(i64);

impl TodoId {
    pub fn new(value: i64) -> Self {
        Self(value)
    }

    pub fn get(self) -> i64 {
        self.0
    }
}

impl fmt::Display for TodoId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for TodoId {
    fn from(value: i64) -> Self {
        Self(value)
    }
}

/// Todo エンティティ
///
/// サブタスクは親が所有する順序付きコレクション。値として扱い、
/// 変更は `with_*` 系の遷移関数で新しい値を作って行います。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Todo {
    pub id: TodoId,
    pub title: String,
    pub description: Option<String>,
    pub completed: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// 親 Todo（トップレベルなら None）
    pub parent_id: Option<TodoId>,
    #[serde(default)]
    pub subtasks: Vec<Todo>,
}

impl Todo {
    /// タイトルと説明を上書き（完了フラグ・サブタスクは保持）
    pub fn with_fields(self, fields: TodoFields, now: DateTime<Utc>) -> Self {
        Self {
            title: fields.title,
            description: fields.description,
            ..self.touched(now)
        }
    }

    /// 完了フラグを反転
    pub fn toggled(self, now: DateTime<Utc>) -> Self {
        let completed = !self.completed;
        self.with_completed(completed, now)
    }

    /// 完了フラグを設定（同値でも updated_at は更新）
    pub fn with_completed(self, completed: bool, now: DateTime<Utc>) -> Self {
        Self {
            completed,
            ..self.touched(now)
        }
    }

    /// サブタスク更新: タイトル・説明・完了フラグを上書き
    pub fn with_subtask_changes(self, changes: SubtaskChanges, now: DateTime<Utc>) -> Self {
        Self {
            title: changes.title,
            description: changes.description,
            completed: changes.completed,
            ..self.touched(now)
        }
    }

    /// updated_at のみ更新
    pub fn touched(self, now: DateTime<Utc>) -> Self {
        Self {
            updated_at: next_updated_at(self.updated_at, now),
            ..self
        }
    }

    /// 直下のサブタスクを ID で検索
    pub fn subtask(&self, id: TodoId) -> Option<&Todo> {
        self.subtasks.iter().find(|s| s.id == id)
    }
}

/// 作成・更新リクエストの入力（title / description）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TodoFields {
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
}

impl TodoFields {
    pub fn new(title: impl Into<String>, description: Option<String>) -> Self {
        Self {
            title: title.into(),
            description,
        }
    }
}

/// サブタスク更新の入力
///
/// 省略された description は消去、completed は false として扱う（全置換）。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubtaskChanges {
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub completed: bool,
}

/// PATCH /api/todos/{id} の入力
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompletionChange {
    #[serde(default)]
    pub completed: bool,
}

/// ストアへ挿入する前の Todo（ID 未採番）
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewTodo {
    pub parent_id: Option<TodoId>,
    pub title: String,
    pub description: Option<String>,
    pub completed: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl NewTodo {
    /// created_at = updated_at = now, completed = false で開始
    pub fn new(fields: TodoFields, now: DateTime<Utc>) -> Self {
        Self {
            parent_id: None,
            title: fields.title,
            description: fields.description,
            completed: false,
            created_at: now,
            updated_at: now,
        }
    }

    /// 親の配下に置く
    pub fn under(self, parent_id: TodoId) -> Self {
        Self {
            parent_id: Some(parent_id),
            ..self
        }
    }

    /// 採番済み ID を付与してエンティティ化
    pub fn into_todo(self, id: TodoId) -> Todo {
        Todo {
            id,
            title: self.title,
            description: self.description,
            completed: self.completed,
            created_at: self.created_at,
            updated_at: self.updated_at,
            parent_id: self.parent_id,
            subtasks: Vec::new(),
        }
    }
}
