//! Todo 管理サービス
//!
//! 各公開操作は 1 つのストアトランザクション内で「読み取り → 遷移 → 保存」を
//! 行う。途中で失敗した場合はトランザクションが破棄され、何も永続化されない。
//! 同一 Todo への同時更新はストアの直列化に任せ、後勝ちとする。

use std::sync::Arc;
use todo_domain::{
    Clock, NewTodo, SubtaskChanges, Todo, TodoError, TodoFields, TodoId, TodoResult,
};
use todo_infrastructure::{TodoStore, TodoTransaction};

pub struct TodoService {
    store: Arc<dyn TodoStore>,
    clock: Arc<dyn Clock>,
}

impl TodoService {
    pub fn new(store: Arc<dyn TodoStore>, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    /// 全 Todo を ID 昇順で返す
    ///
    /// サブタスクも `parent_id` 付きの独立したレコードとして含まれ、
    /// 親の `subtasks` にも入れ子で入る。
    pub fn list_all(&self) -> TodoResult<Vec<Todo>> {
        let mut tx = self.store.begin()?;
        Ok(tx.find_all()?)
    }

    pub fn get_by_id(&self, id: TodoId) -> TodoResult<Todo> {
        let mut tx = self.store.begin()?;
        load(&mut *tx, id)
    }

    pub fn create(&self, fields: TodoFields) -> TodoResult<Todo> {
        let mut tx = self.store.begin()?;
        let todo = tx.insert(NewTodo::new(fields, self.clock.now()))?;
        tx.commit()?;
        tracing::info!(todo_id = %todo.id, "Todo created");
        Ok(todo)
    }

    /// タイトルと説明のみ上書き
    pub fn update(&self, id: TodoId, fields: TodoFields) -> TodoResult<Todo> {
        self.modify(id, |todo, now| todo.with_fields(fields, now))
    }

    pub fn toggle(&self, id: TodoId) -> TodoResult<Todo> {
        self.modify(id, |todo, now| todo.toggled(now))
    }

    pub fn set_completed(&self, id: TodoId, completed: bool) -> TodoResult<Todo> {
        self.modify(id, |todo, now| todo.with_completed(completed, now))
    }

    /// 削除（サブタスクも連鎖削除）
    pub fn delete(&self, id: TodoId) -> TodoResult<()> {
        let mut tx = self.store.begin()?;
        if !tx.delete(id)? {
            return Err(TodoError::NotFound(id));
        }
        tx.commit()?;
        tracing::info!(todo_id = %id, "Todo deleted");
        Ok(())
    }

    pub fn list_subtasks(&self, parent_id: TodoId) -> TodoResult<Vec<Todo>> {
        let mut tx = self.store.begin()?;
        Ok(load(&mut *tx, parent_id)?.subtasks)
    }

    /// サブタスクを追加し、追加したサブタスクを返す（親ではない）
    pub fn add_subtask(&self, parent_id: TodoId, fields: TodoFields) -> TodoResult<Todo> {
        let mut tx = self.store.begin()?;
        let parent = load(&mut *tx, parent_id)?;
        let now = self.clock.now();

        let subtask = tx.insert(NewTodo::new(fields, now).under(parent.id))?;
        tx.save(&parent.touched(now))?;
        tx.commit()?;

        tracing::info!(parent_id = %parent_id, subtask_id = %subtask.id, "Subtask added");
        Ok(subtask)
    }

    pub fn update_subtask(
        &self,
        parent_id: TodoId,
        subtask_id: TodoId,
        changes: SubtaskChanges,
    ) -> TodoResult<Todo> {
        let mut tx = self.store.begin()?;
        let parent = load(&mut *tx, parent_id)?;
        let subtask = parent
            .subtask(subtask_id)
            .cloned()
            .ok_or(TodoError::SubtaskNotFound {
                parent_id,
                subtask_id,
            })?;
        let now = self.clock.now();

        let updated = subtask.with_subtask_changes(changes, now);
        tx.save(&updated)?;
        tx.save(&parent.touched(now))?;
        tx.commit()?;

        tracing::info!(parent_id = %parent_id, subtask_id = %subtask_id, "Subtask updated");
        Ok(updated)
    }

    /// サブタスク削除。該当 ID がなければ何もしない（エラーにしない）
    pub fn delete_subtask(&self, parent_id: TodoId, subtask_id: TodoId) -> TodoResult<()> {
        let mut tx = self.store.begin()?;
        let parent = load(&mut *tx, parent_id)?;

        if parent.subtask(subtask_id).is_none() {
            tracing::debug!(parent_id = %parent_id, subtask_id = %subtask_id, "No such subtask; nothing to delete");
            return Ok(());
        }

        tx.delete(subtask_id)?;
        tx.save(&parent.touched(self.clock.now()))?;
        tx.commit()?;

        tracing::info!(parent_id = %parent_id, subtask_id = %subtask_id, "Subtask deleted");
        Ok(())
    }

    fn modify<F>(&self, id: TodoId, change: F) -> TodoResult<Todo>
    where
        F: FnOnce(Todo, chrono::DateTime<chrono::Utc>) -> Todo,
    {
        let mut tx = self.store.begin()?;
        let current = load(&mut *tx, id)?;
        let updated = change(current, self.clock.now());
        tx.save(&updated)?;
        tx.commit()?;
        tracing::debug!(todo_id = %id, completed = updated.completed, "Todo updated");
        Ok(updated)
    }
}

fn load(tx: &mut dyn TodoTransaction, id: TodoId) -> TodoResult<Todo> {
    tx.find(id)?.ok_or(TodoError::NotFound(id))
}
