//! Memory Backend Tests
//!
//! Checks that the in-memory backend keeps the storage semantics the core
//! relies on.

#[cfg(test)]
mod tests {
    use crate::backend::{Backend, MemoryBackend};
    use pretty_assertions::assert_eq;

    fn setup_backend() -> MemoryBackend {
        let backend = MemoryBackend::with_root("/p");
        backend.add_folder("/p/a");
        backend.add_file("/p/a/x.txt", "hello");
        backend.add_file("/p/top.md", "root level");
        backend
    }

    #[tokio::test]
    async fn test_scan_derives_title_and_category() {
        let backend = setup_backend();
        backend.add_file("/p/a/notes.json", "ignored");

        let entries = backend.scan_prompts("/p").await.expect("scan failed");
        assert_eq!(entries.len(), 2);

        let x = entries.iter().find(|e| e.file_path == "/p/a/x.txt").unwrap();
        assert_eq!(x.title, "x");
        assert_eq!(x.category, "a");

        let top = entries.iter().find(|e| e.file_path == "/p/top.md").unwrap();
        assert_eq!(top.category, "");
    }

    #[tokio::test]
    async fn test_scan_missing_root_is_rejected() {
        let backend = setup_backend();
        let err = backend.scan_prompts("/nowhere").await.unwrap_err();
        assert_eq!(err, "Folder does not exist");
    }

    #[tokio::test]
    async fn test_save_renames_on_category_change() {
        let backend = setup_backend();

        let new_path = backend
            .save_prompt("/p", "b", "x", "moved", Some("/p/a/x.txt"))
            .await
            .expect("save failed");

        assert_eq!(new_path, "/p/b/x.txt");
        assert_eq!(backend.file("/p/a/x.txt"), None);
        assert_eq!(backend.file("/p/b/x.txt").as_deref(), Some("moved"));
        assert!(backend.folder_paths().contains(&"/p/b".to_string()));
    }

    #[tokio::test]
    async fn test_save_new_prompt_defaults_to_markdown_in_root() {
        let backend = setup_backend();
        let new_path = backend.save_prompt("/p", "", "fresh", "body", None).await.unwrap();
        assert_eq!(new_path, "/p/fresh.md");
    }

    #[tokio::test]
    async fn test_mnemonic_is_unique_and_normalized() {
        let backend = setup_backend();

        backend.set_mnemonic("/p/a/x.txt", "  GREET ").await.unwrap();
        assert_eq!(backend.mnemonic("/p/a/x.txt").as_deref(), Some("greet"));

        let err = backend.set_mnemonic("/p/top.md", "greet").await.unwrap_err();
        assert!(err.contains("already used"));

        // Reassigning replaces the file's previous mnemonic
        backend.set_mnemonic("/p/a/x.txt", "hi").await.unwrap();
        assert_eq!(backend.get_mnemonic_for_file("/p/a/x.txt").await.unwrap().as_deref(), Some("hi"));
        backend.set_mnemonic("/p/top.md", "greet").await.unwrap();
    }

    #[tokio::test]
    async fn test_all_mnemonics_sorted_by_title() {
        let backend = setup_backend();
        backend.assign_mnemonic("/p/top.md", "t");

        let records = backend.get_all_mnemonics().await.unwrap();
        let titles: Vec<&str> = records.iter().map(|r| r.title.as_str()).collect();
        assert_eq!(titles, vec!["top", "x"]);
        assert_eq!(records[0].mnemonic, "t");
        assert_eq!(records[1].mnemonic, "");
    }

    #[tokio::test]
    async fn test_default_names_skip_taken_ones() {
        let backend = setup_backend();

        let first = backend.create_file("/p/a").await.unwrap();
        let second = backend.create_file("/p/a").await.unwrap();
        assert_eq!(first, "/p/a/New Prompt.md");
        assert_eq!(second, "/p/a/New Prompt 2.md");

        let folder = backend.create_folder("/p").await.unwrap();
        let again = backend.create_folder("/p").await.unwrap();
        assert_eq!(folder, "/p/New Folder");
        assert_eq!(again, "/p/New Folder 2");
    }

    #[tokio::test]
    async fn test_rename_folder_moves_contents() {
        let backend = setup_backend();
        backend.add_folder("/p/a/deep");
        backend.assign_mnemonic("/p/a/x.txt", "x");

        let renamed = backend.rename_folder("/p/a", "z").await.unwrap();
        assert_eq!(renamed, "/p/z");
        assert_eq!(backend.file("/p/z/x.txt").as_deref(), Some("hello"));
        assert!(backend.folder_paths().contains(&"/p/z/deep".to_string()));
        assert_eq!(backend.mnemonic("/p/z/x.txt").as_deref(), Some("x"));

        backend.add_folder("/p/taken");
        let err = backend.rename_folder("/p/z", "taken").await.unwrap_err();
        assert_eq!(err, "Target name already exists");
    }

    #[tokio::test]
    async fn test_delete_folder_is_recursive() {
        let backend = setup_backend();
        backend.add_file("/p/a/b/y.md", "nested");

        backend.delete_folder("/p/a").await.unwrap();
        assert_eq!(backend.file_paths(), vec!["/p/top.md".to_string()]);
        assert!(backend.folder_paths().is_empty());
    }

    #[tokio::test]
    async fn test_pull_then_push_round_trip_remote() {
        let backend = setup_backend();
        backend.add_remote_file("remote/r.md", "from server");

        let pulled = backend.sync_pull("/p", "me@host", "/srv", 22).await.unwrap();
        assert!(pulled.is_success());
        assert_eq!(backend.file("/p/remote/r.md").as_deref(), Some("from server"));

        let pushed = backend.sync_push("/p", "me@host", "/srv", 22).await.unwrap();
        assert_eq!(pushed.message, "Pushed 3 files to me@host:/srv");
        assert_eq!(backend.remote_files().len(), 3);
    }

    #[tokio::test]
    async fn test_injected_failure_is_returned_and_recorded() {
        let backend = setup_backend();
        backend.fail("delete_prompt", "permission denied");

        let err = backend.delete_prompt("/p/top.md").await.unwrap_err();
        assert_eq!(err, "permission denied");
        assert_eq!(backend.call_count("delete_prompt"), 1);
        assert!(backend.file("/p/top.md").is_some());

        backend.heal("delete_prompt");
        backend.delete_prompt("/p/top.md").await.unwrap();
    }

    #[tokio::test]
    async fn test_update_config_is_persisted() {
        let backend = setup_backend();
        backend.update_config(|c| c.hotkey = "Alt+Space".to_string());

        let config = backend.get_config().await.unwrap();
        assert_eq!(config.root_folder, "/p");
        assert_eq!(config.hotkey, "Alt+Space");
        assert_eq!(backend.stored_config(), config);
    }
}
