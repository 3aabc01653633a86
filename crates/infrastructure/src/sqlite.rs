//! SQLite 実装
//!
//! サブタスクは自己参照の `parent_id` 列で表現し、`ON DELETE CASCADE` で
//! 親の削除に追従させる。時刻はミリ秒の整数で保持する。

use crate::repository::attach_subtasks;
use crate::{StoreError, TodoStore, TodoTransaction};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use std::time::{Duration, Instant};
use todo_domain::{NewTodo, Todo, TodoId};

const SCHEMA_VERSION: i64 = 1;

const SCHEMA: &str = r#"
    CREATE TABLE IF NOT EXISTS todos (
      id INTEGER PRIMARY KEY AUTOINCREMENT,
      parent_id INTEGER REFERENCES todos(id) ON DELETE CASCADE,
      title TEXT NOT NULL,
      description TEXT,
      completed INTEGER NOT NULL DEFAULT 0,
      created_at_ms INTEGER NOT NULL,
      updated_at_ms INTEGER NOT NULL
    );

    CREATE INDEX IF NOT EXISTS idx_todos_parent ON todos(parent_id, id);
"#;

const SELECT_COLUMNS: &str =
    "SELECT id, parent_id, title, description, completed, created_at_ms, updated_at_ms FROM todos";

#[derive(Debug)]
pub struct SqliteTodoStore {
    conn: Mutex<Connection>,
}

impl SqliteTodoStore {
    /// ファイルを開き（なければ作成し）スキーマを適用
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref();
        let started_at = Instant::now();
        if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
            std::fs::create_dir_all(dir)?;
        }
        let conn = Connection::open(path)?;
        let store = Self::bootstrap(conn)?;
        tracing::info!(
            path = %path.display(),
            duration_ms = started_at.elapsed().as_millis() as u64,
            "SQLite store opened"
        );
        Ok(store)
    }

    pub fn open_in_memory() -> Result<Self, StoreError> {
        Self::bootstrap(Connection::open_in_memory()?)
    }

    fn bootstrap(conn: Connection) -> Result<Self, StoreError> {
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        conn.busy_timeout(Duration::from_secs(5))?;

        let found: i64 = conn.query_row("PRAGMA user_version", [], |row| row.get(0))?;
        if found > SCHEMA_VERSION {
            return Err(StoreError::UnsupportedSchema {
                found,
                supported: SCHEMA_VERSION,
            });
        }
        if found < SCHEMA_VERSION {
            conn.execute_batch(SCHEMA)?;
            conn.execute_batch(&format!("PRAGMA user_version = {SCHEMA_VERSION};"))?;
        }

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }
}

impl TodoStore for SqliteTodoStore {
    fn begin(&self) -> Result<Box<dyn TodoTransaction + '_>, StoreError> {
        // パニックしたトランザクションは drop 時に ROLLBACK 済み
        let conn = self.conn.lock().unwrap_or_else(|e| e.into_inner());
        conn.execute_batch("BEGIN IMMEDIATE")?;
        Ok(Box::new(SqliteTransaction {
            conn,
            finished: false,
        }))
    }
}

/// `BEGIN IMMEDIATE` 〜 `COMMIT` をロック保持中の接続で実行する。
/// commit されずに drop された場合は ROLLBACK。
struct SqliteTransaction<'a> {
    conn: MutexGuard<'a, Connection>,
    finished: bool,
}

/// 列をそのまま読んだ行（時刻の変換前）
struct RawRow {
    id: i64,
    parent_id: Option<i64>,
    title: String,
    description: Option<String>,
    completed: bool,
    created_at_ms: i64,
    updated_at_ms: i64,
}

impl RawRow {
    fn read(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            parent_id: row.get(1)?,
            title: row.get(2)?,
            description: row.get(3)?,
            completed: row.get(4)?,
            created_at_ms: row.get(5)?,
            updated_at_ms: row.get(6)?,
        })
    }

    fn into_todo(self) -> Result<Todo, StoreError> {
        let id = self.id;
        let timestamp = |ms: i64| {
            DateTime::<Utc>::from_timestamp_millis(ms).ok_or_else(|| StoreError::Corrupt {
                id,
                reason: format!("timestamp out of range: {ms}"),
            })
        };
        Ok(Todo {
            id: TodoId::new(self.id),
            title: self.title,
            description: self.description,
            completed: self.completed,
            created_at: timestamp(self.created_at_ms)?,
            updated_at: timestamp(self.updated_at_ms)?,
            parent_id: self.parent_id.map(TodoId::new),
            subtasks: Vec::new(),
        })
    }
}

fn query_rows(
    conn: &Connection,
    sql: &str,
    params: impl rusqlite::Params,
) -> Result<Vec<Todo>, StoreError> {
    let mut stmt = conn.prepare_cached(sql)?;
    let raw = stmt
        .query_map(params, RawRow::read)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    raw.into_iter().map(RawRow::into_todo).collect()
}

fn children_of(conn: &Connection, parent_id: TodoId) -> Result<Vec<Todo>, StoreError> {
    query_rows(
        conn,
        &format!("{SELECT_COLUMNS} WHERE parent_id = ?1 ORDER BY id"),
        params![parent_id.get()],
    )
}

impl TodoTransaction for SqliteTransaction<'_> {
    fn find_all(&mut self) -> Result<Vec<Todo>, StoreError> {
        let conn: &Connection = &self.conn;
        let rows = query_rows(conn, &format!("{SELECT_COLUMNS} ORDER BY id"), [])?;
        rows.into_iter()
            .map(|row| attach_subtasks(row, &mut |id| children_of(conn, id)))
            .collect()
    }

    fn find(&mut self, id: TodoId) -> Result<Option<Todo>, StoreError> {
        let conn: &Connection = &self.conn;
        let raw = conn
            .prepare_cached(&format!("{SELECT_COLUMNS} WHERE id = ?1"))?
            .query_row(params![id.get()], RawRow::read)
            .optional()?;
        match raw {
            Some(raw) => {
                let todo = raw.into_todo()?;
                attach_subtasks(todo, &mut |id| children_of(conn, id)).map(Some)
            }
            None => Ok(None),
        }
    }

    fn insert(&mut self, todo: NewTodo) -> Result<Todo, StoreError> {
        self.conn.execute(
            "INSERT INTO todos (parent_id, title, description, completed, created_at_ms, updated_at_ms)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                todo.parent_id.map(TodoId::get),
                todo.title,
                todo.description,
                todo.completed,
                todo.created_at.timestamp_millis(),
                todo.updated_at.timestamp_millis(),
            ],
        )?;
        let id = TodoId::new(self.conn.last_insert_rowid());
        Ok(todo.into_todo(id))
    }

    fn save(&mut self, todo: &Todo) -> Result<(), StoreError> {
        self.conn.execute(
            "UPDATE todos SET title = ?1, description = ?2, completed = ?3, updated_at_ms = ?4
             WHERE id = ?5",
            params![
                todo.title,
                todo.description,
                todo.completed,
                todo.updated_at.timestamp_millis(),
                todo.id.get(),
            ],
        )?;
        Ok(())
    }

    fn delete(&mut self, id: TodoId) -> Result<bool, StoreError> {
        let affected = self
            .conn
            .execute("DELETE FROM todos WHERE id = ?1", params![id.get()])?;
        Ok(affected > 0)
    }

    fn commit(mut self: Box<Self>) -> Result<(), StoreError> {
        self.conn.execute_batch("COMMIT")?;
        self.finished = true;
        Ok(())
    }
}

impl Drop for SqliteTransaction<'_> {
    fn drop(&mut self) {
        if !self.finished {
            if let Err(e) = self.conn.execute_batch("ROLLBACK") {
                tracing::error!(error = %e, "Failed to roll back SQLite transaction");
            }
        }
    }
}
