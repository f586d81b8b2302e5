//! Todo repository backed by a single JSON document
//!
//! Every mutation reads the whole document, changes it in memory and writes it
//! back. Mutations are serialized through an async mutex so concurrent
//! requests never lose each other's updates. Writes land in a sibling temp
//! file that is renamed over the store, so readers always see a complete
//! document and take no lock.

use chrono::Utc;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::Mutex;

use crate::error::{TodoError, TodoResult};
use crate::types::{DeleteOutcome, Todo, TodoDocument, TodoFilter, TodoPatch, UNTITLED_TODO};

/// Todo repository with serialized read-modify-write access
#[derive(Clone)]
pub struct TodoRepository {
    path: PathBuf,
    mutations: Arc<Mutex<()>>,
}

impl TodoRepository {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            mutations: Arc::new(Mutex::new(())),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Create the store with an empty document if it does not exist yet
    pub async fn init(&self) -> TodoResult<()> {
        let _guard = self.mutations.lock().await;
        if tokio::fs::try_exists(&self.path)
            .await
            .map_err(|e| self.io_error(e))?
        {
            // Surface a corrupt store at startup rather than on first use
            self.load().await?;
            return Ok(());
        }
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| self.io_error(e))?;
        }
        self.save(&TodoDocument::default()).await?;
        tracing::info!(path = ?self.path, "Created empty todo store");
        Ok(())
    }

    /// Read the whole document. A missing file reads as empty.
    pub async fn load(&self) -> TodoResult<TodoDocument> {
        let bytes = match tokio::fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Ok(TodoDocument::default())
            }
            Err(e) => return Err(self.io_error(e)),
        };
        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Ok(TodoDocument::default());
        }
        serde_json::from_slice(&bytes).map_err(|source| TodoError::Corrupt {
            path: self.path.clone(),
            source,
        })
    }

    async fn save(&self, document: &TodoDocument) -> TodoResult<()> {
        let json = serde_json::to_vec_pretty(document)?;
        let mut tmp = self.path.clone().into_os_string();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);

        tokio::fs::write(&tmp, json)
            .await
            .map_err(|e| self.io_error(e))?;
        tokio::fs::rename(&tmp, &self.path)
            .await
            .map_err(|e| self.io_error(e))
    }

    /// Run `change` against the current document and persist the result.
    async fn mutate<T>(
        &self,
        change: impl FnOnce(&mut TodoDocument) -> TodoResult<T>,
    ) -> TodoResult<T> {
        let _guard = self.mutations.lock().await;
        let mut document = self.load().await?;
        let outcome = change(&mut document)?;
        self.save(&document).await?;
        Ok(outcome)
    }

    fn io_error(&self, source: std::io::Error) -> TodoError {
        TodoError::Io {
            path: self.path.clone(),
            source,
        }
    }

    /// Create a new todo
    pub async fn create(&self, title: &str, completed: bool) -> TodoResult<Todo> {
        let title = if title.is_empty() {
            UNTITLED_TODO.to_string()
        } else {
            title.to_string()
        };

        self.mutate(|document| {
            let mut id = uuid::Uuid::new_v4().to_string();
            while document.todos.iter().any(|t| t.id == id) {
                id = uuid::Uuid::new_v4().to_string();
            }
            let now = Utc::now();
            let todo = Todo {
                id,
                title,
                completed,
                created_at: now,
                updated_at: now,
            };
            document.todos.push(todo.clone());
            Ok(todo)
        })
        .await
    }

    /// List todos in creation order, optionally filtered by completion
    pub async fn list(&self, filter: TodoFilter) -> TodoResult<Vec<Todo>> {
        let document = self.load().await?;
        Ok(document
            .todos
            .into_iter()
            .filter(|todo| filter.matches(todo))
            .collect())
    }

    /// Apply the provided fields to an existing todo
    pub async fn update(&self, id: &str, patch: TodoPatch) -> TodoResult<Todo> {
        self.mutate(|document| {
            let todo = document
                .todos
                .iter_mut()
                .find(|todo| todo.id == id)
                .ok_or_else(|| TodoError::NotFound(id.to_string()))?;

            if let Some(title) = patch.title {
                todo.title = title;
            }
            if let Some(completed) = patch.completed {
                todo.completed = completed;
            }
            // Never move backwards, even if the wall clock does
            todo.updated_at = Utc::now().max(todo.updated_at);
            Ok(todo.clone())
        })
        .await
    }

    /// Remove a todo. Deleting an unknown id is not an error.
    pub async fn delete(&self, id: &str) -> TodoResult<DeleteOutcome> {
        self.mutate(|document| {
            let position = document.todos.iter().position(|todo| todo.id == id);
            let deleted_todo = position.map(|index| document.todos.remove(index));
            Ok(DeleteOutcome {
                success: deleted_todo.is_some(),
                deleted_todo,
            })
        })
        .await
    }
}
