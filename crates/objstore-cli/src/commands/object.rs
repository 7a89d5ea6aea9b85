use anyhow::Result;
use objstore_engine::ObjectStore;
use std::path::Path;
use tokio::io::AsyncWriteExt;

use super::{read_input, resolve_target};
use crate::cli::Target;

pub async fn put(store: &ObjectStore, path: &str, file: &Path) -> Result<()> {
    let data = read_input(file).await?;
    let id = store.create_object(path, &data).await?;
    println!("{}", id);
    Ok(())
}

pub async fn get(store: &ObjectStore, target: &Target, output: Option<&Path>) -> Result<()> {
    let object = resolve_target(store, target).await?;
    let data = store.read_object(&object).await?;

    match output {
        Some(path) => tokio::fs::write(path, &data).await?,
        None => {
            let mut stdout = tokio::io::stdout();
            stdout.write_all(&data).await?;
            stdout.flush().await?;
        }
    }
    Ok(())
}

pub async fn update(store: &ObjectStore, target: &Target, file: &Path) -> Result<()> {
    let object = resolve_target(store, target).await?;
    let data = read_input(file).await?;
    store.update_object(&object, &data).await?;
    eprintln!("✓ Updated {}", object);
    Ok(())
}

pub async fn delete(store: &ObjectStore, target: &Target) -> Result<()> {
    let object = resolve_target(store, target).await?;
    store.delete_object(&object).await?;
    eprintln!("✓ Deleted {}", object);
    Ok(())
}

pub async fn stat(store: &ObjectStore, target: &Target) -> Result<()> {
    let object = resolve_target(store, target).await?;
    let record = store.stat_object(&object).await?;
    println!("{}", serde_json::to_string_pretty(&record)?);
    Ok(())
}

pub async fn list(store: &ObjectStore) -> Result<()> {
    let records = store.list_objects().await?;

    if records.is_empty() {
        println!("No objects found.");
        return Ok(());
    }

    println!("Objects:");
    for record in records {
        println!("  {} ({})", record.object_path, record.object_id);
        println!("    Size: {} bytes", record.size_bytes);
        if !record.is_pristine() {
            println!("    Content changed since creation");
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use objstore_core::ObjectRef;

    async fn create_test_store() -> (tempfile::TempDir, ObjectStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = ObjectStore::open(&dir.path().join("objects"), &dir.path().join("metadata.db"))
            .await
            .unwrap();
        (dir, store)
    }

    fn target(token: &str, by_id: bool, by_path: bool) -> Target {
        Target {
            token: token.to_string(),
            by_id,
            by_path,
        }
    }

    #[tokio::test]
    async fn test_put_get_to_file() {
        let (dir, store) = create_test_store().await;
        let input = dir.path().join("input.txt");
        let output = dir.path().join("output.txt");
        std::fs::write(&input, "Hello, world!").unwrap();

        put(&store, "docs/hello.txt", &input).await.unwrap();
        get(&store, &target("docs/hello.txt", false, true), Some(output.as_path()))
            .await
            .unwrap();

        assert_eq!(std::fs::read(&output).unwrap(), b"Hello, world!");
    }

    #[tokio::test]
    async fn test_bare_token_resolution() {
        let (dir, store) = create_test_store().await;
        let id = store.create_object("notes.md", b"notes").await.unwrap();

        let by_id = resolve_target(&store, &target(id.as_str(), false, false))
            .await
            .unwrap();
        assert_eq!(by_id, ObjectRef::Id(id.clone()));

        let by_path = resolve_target(&store, &target("notes.md", false, false))
            .await
            .unwrap();
        assert_eq!(by_path, ObjectRef::Id(id));

        let explicit = resolve_target(&store, &target("notes.md", false, true))
            .await
            .unwrap();
        assert_eq!(explicit, ObjectRef::path("notes.md"));

        assert!(resolve_target(&store, &target("notes.md", true, false)).await.is_err());

        let replacement = dir.path().join("replacement.md");
        std::fs::write(&replacement, "rewritten").unwrap();
        update(&store, &target("notes.md", false, true), &replacement)
            .await
            .unwrap();
        delete(&store, &target("notes.md", false, true)).await.unwrap();
        assert!(store.list_objects().await.unwrap().is_empty());
    }
}
