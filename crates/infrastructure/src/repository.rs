//! 永続ストアの抽象
//!
//! サービスは `TodoStore::begin` でトランザクションを開き、読み取り・変更・
//! `commit` を 1 つの境界内で行います。`commit` せずに破棄した変更は
//! すべて巻き戻されます。

use crate::StoreError;
use todo_domain::{NewTodo, Todo, TodoId};

/// ストア本体
pub trait TodoStore: Send + Sync {
    /// トランザクションを開始（完了まで他の書き込みは待たされる）
    fn begin(&self) -> Result<Box<dyn TodoTransaction + '_>, StoreError>;
}

/// 1 トランザクション内の操作
///
/// 読み取り系はサブタスクを再帰的に詰めた `Todo` を返す。
pub trait TodoTransaction {
    /// 全レコードを ID 昇順で取得
    ///
    /// サブタスクも独立したレコードとして含まれる（`parent_id` 付き）。
    fn find_all(&mut self) -> Result<Vec<Todo>, StoreError>;

    /// ID で取得（サブタスクを含む任意のレコード）
    fn find(&mut self, id: TodoId) -> Result<Option<Todo>, StoreError>;

    /// 挿入して採番済みの Todo を返す
    fn insert(&mut self, todo: NewTodo) -> Result<Todo, StoreError>;

    /// スカラー列（title / description / completed / updated_at）を保存
    ///
    /// `subtasks` は無視する。サブタスクはそれぞれ個別に保存すること。
    fn save(&mut self, todo: &Todo) -> Result<(), StoreError>;

    /// 削除（配下のサブタスクも連鎖削除）。存在しなければ false
    fn delete(&mut self, id: TodoId) -> Result<bool, StoreError>;

    fn commit(self: Box<Self>) -> Result<(), StoreError>;
}

/// 直下の子を返す関数からサブタスクツリーを組み立てる
pub(crate) fn attach_subtasks<F>(mut todo: Todo, children_of: &mut F) -> Result<Todo, StoreError>
where
    F: FnMut(TodoId) -> Result<Vec<Todo>, StoreError>,
{
    let children = children_of(todo.id)?;
    let mut subtasks = Vec::with_capacity(children.len());
    for child in children {
        subtasks.push(attach_subtasks(child, children_of)?);
    }
    todo.subtasks = subtasks;
    Ok(todo)
}
