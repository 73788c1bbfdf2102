use std::{fs, path::Path};

use anyhow::Result;
use notification_service::logging::build_subscriber;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

fn read_logs(dir: &Path, prefix: &str) -> Result<String> {
    let mut contents = String::new();
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        let is_match = path
            .file_name()
            .and_then(|name| name.to_str())
            .is_some_and(|name| name.starts_with(prefix));
        if is_match {
            contents.push_str(&fs::read_to_string(&path)?);
        }
    }
    Ok(contents)
}

/// Test: Every event lands in the application log and only errors in the error log
#[test]
fn test_rolling_files_split_by_level() -> Result<()> {
    let dir = std::env::temp_dir().join(format!("notification-logs-{}", uuid::Uuid::new_v4()));

    let (subscriber, guards) = build_subscriber(&dir, EnvFilter::new("info"))?;
    tracing::subscriber::with_default(subscriber, || {
        info!(notification_id = "n-1", "Notification enqueued");
        error!(notification_id = "n-2", "Status store unreachable");
    });
    drop(guards);

    let application = read_logs(&dir, "application.log")?;
    assert!(application.contains("Notification enqueued"));
    assert!(application.contains("Status store unreachable"));

    let errors = read_logs(&dir, "error.log")?;
    assert!(errors.contains("Status store unreachable"));
    assert!(!errors.contains("Notification enqueued"));

    for line in errors.lines() {
        let event: serde_json::Value = serde_json::from_str(line)?;
        assert_eq!(event["level"], "ERROR");
    }

    fs::remove_dir_all(&dir)?;

    Ok(())
}
