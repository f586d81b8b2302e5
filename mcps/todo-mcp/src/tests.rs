//! Tests for todo-mcp repository

#[cfg(test)]
#[allow(clippy::module_inception)]
mod tests {
    use super::super::repository::TodoRepository;
    use super::super::types::{Todo, TodoFilter, TodoPatch, UNTITLED_TODO};
    use tempfile::TempDir;

    /// Create a repository in a fresh temporary directory
    async fn create_test_repo() -> (TempDir, TodoRepository) {
        let dir = tempfile::tempdir().unwrap();
        let repo = TodoRepository::new(dir.path().join("db.json"));
        repo.init().await.unwrap();
        (dir, repo)
    }

    async fn find_todo(repo: &TodoRepository, id: &str) -> Option<Todo> {
        repo.list(TodoFilter::All)
            .await
            .unwrap()
            .into_iter()
            .find(|todo| todo.id == id)
    }

    #[tokio::test]
    async fn test_init_creates_empty_store() {
        let (dir, repo) = create_test_repo().await;

        let raw = std::fs::read_to_string(dir.path().join("db.json")).unwrap();
        let value: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(value, serde_json::json!({"todos": []}));
        assert!(repo.list(TodoFilter::All).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_buy_milk_scenario() {
        let (_dir, repo) = create_test_repo().await;

        // Create
        let todo = repo.create("Buy milk", false).await.unwrap();
        assert_eq!(todo.title, "Buy milk");
        assert!(!todo.completed);
        assert_eq!(todo.created_at, todo.updated_at);

        // List
        let todos = repo.list(TodoFilter::All).await.unwrap();
        assert_eq!(todos, vec![todo.clone()]);

        // Update
        let updated = repo
            .update(
                &todo.id,
                TodoPatch {
                    completed: Some(true),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert!(updated.completed);
        assert_eq!(updated.title, "Buy milk");
        assert!(updated.updated_at >= todo.updated_at);

        // Delete
        let outcome = repo.delete(&todo.id).await.unwrap();
        assert!(outcome.success);
        assert_eq!(outcome.deleted_todo.unwrap().id, todo.id);

        // Delete again
        let outcome = repo.delete(&todo.id).await.unwrap();
        assert!(!outcome.success);
        assert!(outcome.deleted_todo.is_none());
    }

    #[tokio::test]
    async fn test_list_filter_preserves_creation_order() {
        let (_dir, repo) = create_test_repo().await;

        for i in 0..5 {
            repo.create(&format!("Todo {}", i), i % 2 == 0).await.unwrap();
        }

        let all: Vec<_> = repo
            .list(TodoFilter::All)
            .await
            .unwrap()
            .into_iter()
            .map(|t| t.title)
            .collect();
        assert_eq!(all, vec!["Todo 0", "Todo 1", "Todo 2", "Todo 3", "Todo 4"]);

        let done: Vec<_> = repo
            .list(TodoFilter::Completed)
            .await
            .unwrap()
            .into_iter()
            .map(|t| t.title)
            .collect();
        assert_eq!(done, vec!["Todo 0", "Todo 2", "Todo 4"]);

        let open = repo.list(TodoFilter::Incomplete).await.unwrap();
        assert_eq!(open.len(), 2);
        assert!(open.iter().all(|t| !t.completed));
    }

    #[tokio::test]
    async fn test_update_is_partial() {
        let (_dir, repo) = create_test_repo().await;
        let todo = repo.create("Write report", true).await.unwrap();

        let renamed = repo
            .update(
                &todo.id,
                TodoPatch {
                    title: Some("Write final report".to_string()),
                    completed: None,
                },
            )
            .await
            .unwrap();
        assert_eq!(renamed.title, "Write final report");
        assert!(renamed.completed);
        assert_eq!(renamed.created_at, todo.created_at);

        let fetched = find_todo(&repo, &todo.id).await.unwrap();
        assert_eq!(fetched, renamed);
    }

    #[tokio::test]
    async fn test_updated_at_never_decreases() {
        let (_dir, repo) = create_test_repo().await;
        let todo = repo.create("Tick", false).await.unwrap();

        let mut previous = todo.updated_at;
        for i in 0..5 {
            let updated = repo
                .update(
                    &todo.id,
                    TodoPatch {
                        completed: Some(i % 2 == 0),
                        ..Default::default()
                    },
                )
                .await
                .unwrap();
            assert!(updated.updated_at >= previous);
            assert!(updated.updated_at >= updated.created_at);
            previous = updated.updated_at;
        }
    }

    #[tokio::test]
    async fn test_update_missing_todo() {
        let (_dir, repo) = create_test_repo().await;
        let err = repo
            .update("missing", TodoPatch::default())
            .await
            .unwrap_err();
        assert!(matches!(err, crate::error::TodoError::NotFound(id) if id == "missing"));
    }

    #[tokio::test]
    async fn test_empty_title_becomes_untitled() {
        let (_dir, repo) = create_test_repo().await;
        let todo = repo.create("", false).await.unwrap();
        assert_eq!(todo.title, UNTITLED_TODO);
    }

    #[tokio::test]
    async fn test_whitespace_title_is_kept() {
        let (_dir, repo) = create_test_repo().await;
        let todo = repo.create("   ", false).await.unwrap();
        assert_eq!(todo.title, "   ");
    }

    #[tokio::test]
    async fn test_deleting_missing_id_twice() {
        let (_dir, repo) = create_test_repo().await;
        let kept = repo.create("Keep me", false).await.unwrap();

        for _ in 0..2 {
            let outcome = repo.delete("no-such-todo").await.unwrap();
            assert!(!outcome.success);
            assert!(outcome.deleted_todo.is_none());
        }
        assert_eq!(repo.list(TodoFilter::All).await.unwrap(), vec![kept]);
    }

    #[tokio::test]
    async fn test_concurrent_creates_do_not_lose_updates() {
        let (_dir, repo) = create_test_repo().await;

        let mut handles = Vec::new();
        for i in 0..20 {
            let repo = repo.clone();
            handles.push(tokio::spawn(async move {
                repo.create(&format!("Todo {}", i), false).await.unwrap()
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        let todos = repo.list(TodoFilter::All).await.unwrap();
        assert_eq!(todos.len(), 20);

        let mut ids: Vec<_> = todos.iter().map(|t| t.id.clone()).collect();
        ids.sort();
        ids.dedup();
        assert_eq!(ids.len(), 20);
    }

    #[tokio::test]
    async fn test_persists_across_reopen() {
        let (dir, repo) = create_test_repo().await;
        let todo = repo.create("Survive restart", false).await.unwrap();
        drop(repo);

        let reopened = TodoRepository::new(dir.path().join("db.json"));
        reopened.init().await.unwrap();
        let fetched = find_todo(&reopened, &todo.id).await.unwrap();
        assert_eq!(fetched, todo);
    }

    #[tokio::test]
    async fn test_corrupt_store_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("db.json");
        std::fs::write(&path, "{ not json").unwrap();

        let repo = TodoRepository::new(&path);
        let err = repo.init().await.unwrap_err();
        assert!(matches!(err, crate::error::TodoError::Corrupt { .. }));
    }
}
