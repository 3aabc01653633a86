//! InMemory 実装（開発/テスト用）

use crate::repository::attach_subtasks;
use crate::{StoreError, TodoStore, TodoTransaction};
use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard};
use todo_domain::{NewTodo, Todo, TodoId};

#[derive(Debug, Default)]
pub struct InMemoryTodoStore {
    state: Mutex<MemoryState>,
}

#[derive(Debug, Clone, Default)]
struct MemoryState {
    // 最後に採番した ID（削除しても戻さない）
    last_id: i64,
    // subtasks は常に空で保持し、読み取り時に組み立てる
    rows: BTreeMap<TodoId, Todo>,
}

impl MemoryState {
    fn children_of(&self, parent_id: TodoId) -> Vec<Todo> {
        self.rows
            .values()
            .filter(|row| row.parent_id == Some(parent_id))
            .cloned()
            .collect()
    }

    fn with_subtasks(&self, row: Todo) -> Result<Todo, StoreError> {
        attach_subtasks(row, &mut |id| Ok(self.children_of(id)))
    }

    fn descendants_of(&self, id: TodoId) -> Vec<TodoId> {
        let mut out = Vec::new();
        let mut pending = vec![id];
        while let Some(current) = pending.pop() {
            for row in self.rows.values() {
                if row.parent_id == Some(current) {
                    out.push(row.id);
                    pending.push(row.id);
                }
            }
        }
        out
    }
}

impl InMemoryTodoStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl TodoStore for InMemoryTodoStore {
    fn begin(&self) -> Result<Box<dyn TodoTransaction + '_>, StoreError> {
        // パニックで中断されたトランザクションは drop 時に巻き戻し済み
        let guard = self.state.lock().unwrap_or_else(|e| e.into_inner());
        Ok(Box::new(MemoryTransaction {
            guard,
            snapshot: None,
        }))
    }
}

/// ロックを保持したまま直接書き換え、最初の書き込み前にスナップショットを取る。
/// commit されずに drop された場合はスナップショットへ戻す。
struct MemoryTransaction<'a> {
    guard: MutexGuard<'a, MemoryState>,
    snapshot: Option<MemoryState>,
}

impl MemoryTransaction<'_> {
    fn state_mut(&mut self) -> &mut MemoryState {
        if self.snapshot.is_none() {
            self.snapshot = Some((*self.guard).clone());
        }
        &mut self.guard
    }
}

impl TodoTransaction for MemoryTransaction<'_> {
    fn find_all(&mut self) -> Result<Vec<Todo>, StoreError> {
        let rows: Vec<Todo> = self.guard.rows.values().cloned().collect();
        rows.into_iter()
            .map(|row| self.guard.with_subtasks(row))
            .collect()
    }

    fn find(&mut self, id: TodoId) -> Result<Option<Todo>, StoreError> {
        match self.guard.rows.get(&id).cloned() {
            Some(row) => self.guard.with_subtasks(row).map(Some),
            None => Ok(None),
        }
    }

    fn insert(&mut self, todo: NewTodo) -> Result<Todo, StoreError> {
        let state = self.state_mut();
        state.last_id += 1;
        let stored = todo.into_todo(TodoId::new(state.last_id));
        state.rows.insert(stored.id, stored.clone());
        Ok(stored)
    }

    fn save(&mut self, todo: &Todo) -> Result<(), StoreError> {
        let state = self.state_mut();
        if let Some(row) = state.rows.get_mut(&todo.id) {
            row.title = todo.title.clone();
            row.description = todo.description.clone();
            row.completed = todo.completed;
            row.updated_at = todo.updated_at;
        }
        Ok(())
    }

    fn delete(&mut self, id: TodoId) -> Result<bool, StoreError> {
        let state = self.state_mut();
        if !state.rows.contains_key(&id) {
            return Ok(false);
        }
        for descendant in state.descendants_of(id) {
            state.rows.remove(&descendant);
        }
        state.rows.remove(&id);
        Ok(true)
    }

    fn commit(mut self: Box<Self>) -> Result<(), StoreError> {
        self.snapshot = None;
        Ok(())
    }
}

impl Drop for MemoryTransaction<'_> {
    fn drop(&mut self) {
        if let Some(snapshot) = self.snapshot.take() {
            tracing::debug!("Rolling back uncommitted in-memory transaction");
            *self.guard = snapshot;
        }
    }
}
