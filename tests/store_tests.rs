use assert_fs::TempDir;
use assert_fs::prelude::*;
use port_manager::error::{Error, Result};
use port_manager::process::EntryId;
use port_manager::store::{Entry, EntryStore, JsonFileStore, import_entries};

fn sample_entries() -> Vec<Entry> {
    let mut shop = Entry::new("shop", 3000).with_command("/work/shop/dev.command");
    shop.id = EntryId::from("1712345678901");
    shop.github_url = Some("https://github.com/acme/shop".to_string());

    let mut api = Entry::new("api", 8080);
    api.id = EntryId::from("1712345678902");
    api.is_running = true;

    vec![shop, api]
}

#[tokio::test]
async fn test_missing_file_loads_empty() -> Result<()> {
    let temp = TempDir::new().unwrap();
    let store = JsonFileStore::new(temp.child("ports.json").path());

    assert!(store.load().await?.is_empty());
    Ok(())
}

#[tokio::test]
async fn test_save_creates_directory_and_round_trips() -> Result<()> {
    let temp = TempDir::new().unwrap();
    let file = temp.child("nested").child("data").child("ports.json");
    let store = JsonFileStore::new(file.path());

    let entries = sample_entries();
    store.save(&entries).await?;

    assert!(file.path().exists());
    assert_eq!(store.load().await?, entries);
    Ok(())
}

#[tokio::test]
async fn test_saved_file_is_pretty_camel_case_json() -> Result<()> {
    let temp = TempDir::new().unwrap();
    let file = temp.child("ports.json");
    let store = JsonFileStore::new(file.path());

    store.save(&sample_entries()).await?;

    let content = std::fs::read_to_string(file.path()).unwrap();
    assert!(content.contains("\n  {"));
    assert!(content.contains("\"commandPath\": \"/work/shop/dev.command\""));
    assert!(content.contains("\"folderPath\": \"/work/shop\""));
    assert!(content.contains("\"isRunning\": true"));
    Ok(())
}

#[tokio::test]
async fn test_reads_file_written_by_dashboard() -> Result<()> {
    let temp = TempDir::new().unwrap();
    let file = temp.child("ports.json");
    file.write_str(
        r#"[
  {
    "id": "1712345678901",
    "name": "blog",
    "port": 4321,
    "commandPath": "/work/blog/dev.command",
    "deployUrl": "https://blog.example.com",
    "isRunning": false
  }
]"#,
    )
    .unwrap();

    let entries = JsonFileStore::new(file.path()).load().await?;

    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].port, 4321);
    assert_eq!(entries[0].deploy_url.as_deref(), Some("https://blog.example.com"));
    assert!(entries[0].folder_path.is_none());
    Ok(())
}

#[tokio::test]
async fn test_corrupt_file_is_an_error_not_empty() {
    let temp = TempDir::new().unwrap();
    let file = temp.child("ports.json");
    file.write_str("{ not json").unwrap();

    let result = JsonFileStore::new(file.path()).load().await;

    assert!(matches!(result, Err(Error::Serialization(_))));
}

#[tokio::test]
async fn test_import_entries() -> Result<()> {
    let temp = TempDir::new().unwrap();
    let backup = temp.child("backup.json");
    backup
        .write_str(&serde_json::to_string(&sample_entries()).unwrap())
        .unwrap();

    let imported = import_entries(backup.path()).await?;
    assert_eq!(imported, sample_entries());

    let missing = import_entries(temp.child("nope.json").path()).await;
    assert!(matches!(missing, Err(Error::EntryNotFound(_))));

    let garbage = temp.child("garbage.json");
    garbage.write_str("[1, 2, 3]").unwrap();
    assert!(matches!(
        import_entries(garbage.path()).await,
        Err(Error::Serialization(_))
    ));
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_saves_all_succeed() -> Result<()> {
    let temp = TempDir::new().unwrap();
    let file = temp.child("ports.json");
    let store = JsonFileStore::new(file.path());
    let entries = sample_entries();

    for _ in 0..10 {
        let saves = (0..16).map(|_| {
            let store = store.clone();
            let entries = entries.clone();
            tokio::spawn(async move { store.save(&entries).await })
        });
        for result in futures::future::join_all(saves).await {
            result.unwrap()?;
        }
    }

    assert_eq!(store.load().await?, entries);
    let leftovers: Vec<_> = std::fs::read_dir(temp.path())
        .unwrap()
        .map(|entry| entry.unwrap().file_name())
        .filter(|name| name != "ports.json")
        .collect();
    assert!(leftovers.is_empty(), "temporary files left: {:?}", leftovers);
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_updates_lose_nothing() -> Result<()> {
    let temp = TempDir::new().unwrap();
    let store = JsonFileStore::new(temp.child("ports.json").path());

    let updates = (0..32u16).map(|n| {
        let store = store.clone();
        tokio::spawn(async move {
            let mut entry = Entry::new(format!("app-{}", n), 3000 + n);
            entry.id = EntryId::from(format!("{}", n));
            store
                .update(Box::new(move |entries: &mut Vec<Entry>| entries.push(entry)))
                .await
        })
    });
    for result in futures::future::join_all(updates).await {
        result.unwrap()?;
    }

    let mut ports: Vec<u16> = store.load().await?.iter().map(|e| e.port).collect();
    ports.sort_unstable();
    assert_eq!(ports, (3000..3032).collect::<Vec<_>>());
    Ok(())
}
