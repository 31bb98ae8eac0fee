//! Pipeline run command handlers
//!
//! Handles showing a run's status, following it live, and replaying
//! recorded status payloads offline.

use std::path::Path;

use anyhow::{Context, Result};
use colored::*;
use tracing::{debug, info};
use vigil_client::live::PipelineRunChannel;
use vigil_client::watch::PipelineRunWatch;
use vigil_core::domain::pipeline::PipelineRunSnapshot;
use vigil_core::dto::envelope::ApiEnvelope;
use vigil_core::timeline::TimelineBuilder;

use crate::config::Config;
use crate::render;

/// Fetch and print the snapshot of a pipeline run
pub async fn show_status(config: &Config, run_id: &str) -> Result<()> {
    let client = config.dashboard_client();

    let snapshot = client
        .get_pipeline_run_snapshot(run_id)
        .await
        .with_context(|| format!("Failed to fetch pipeline run {}", run_id))?;

    render::print_snapshot(&snapshot);
    Ok(())
}

/// Follow a pipeline run until Ctrl-C or until live updates end
pub async fn watch_run(config: &Config, run_id: &str) -> Result<()> {
    let client = config.dashboard_client();
    let live = config
        .live_channel()
        .context("Failed to configure live channel")?;
    info!("Watching pipeline run {} via {}", run_id, live.ws_base_url);

    let channel = PipelineRunChannel::new(run_id, live, client.credentials());
    let mut watch = PipelineRunWatch::open(&client, channel).await;
    render::print_timeline(run_id, watch.timeline(), &watch.entries());

    loop {
        let update = tokio::select! {
            update = watch.next_update() => update,
            _ = tokio::signal::ctrl_c() => {
                debug!("Interrupted");
                break;
            }
        };

        match update {
            Some(entries) => {
                println!();
                render::print_timeline(run_id, watch.timeline(), &entries);
            }
            None => {
                println!("{}", "Live updates unavailable.".yellow());
                break;
            }
        }
    }

    watch.close();
    Ok(())
}

/// Merge a file of recorded payloads and print the resulting timeline
pub fn replay(file: &Path, snapshot: Option<&Path>) -> Result<()> {
    let snapshot = snapshot.map(load_snapshot).transpose()?;

    let contents = std::fs::read_to_string(file)
        .with_context(|| format!("Failed to read payload file: {}", file.display()))?;

    let mut builder = TimelineBuilder::new(snapshot.as_ref());
    let mut skipped = 0usize;
    for line in contents.lines().map(str::trim).filter(|l| !l.is_empty()) {
        if !builder.fold_raw(line) {
            skipped += 1;
        }
    }

    if let Some(snapshot) = &snapshot {
        println!("{}", format!("Replayed timeline for {}:", snapshot.id).bold());
    } else {
        println!("{}", "Replayed timeline:".bold());
    }
    println!();
    render::print_entries(&builder.into_ordered());

    if skipped > 0 {
        println!(
            "{}",
            format!("Skipped {} malformed payload(s)", skipped).yellow()
        );
    }
    Ok(())
}

/// Load a snapshot file, either bare or as returned by the status endpoint
fn load_snapshot(path: &Path) -> Result<PipelineRunSnapshot> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read snapshot file: {}", path.display()))?;

    serde_json::from_str::<ApiEnvelope<PipelineRunSnapshot>>(&text)
        .map(|envelope| envelope.data)
        .or_else(|_| serde_json::from_str::<PipelineRunSnapshot>(&text))
        .with_context(|| format!("Failed to parse snapshot file: {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_temp(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_load_snapshot_accepts_envelope_and_bare() {
        let wrapped = write_temp(
            r#"{"message":"ok","data":{"id":"run-1","macro_service_name":"billing","created_at":"2024-05-01T10:00:00Z"}}"#,
        );
        let snapshot = load_snapshot(wrapped.path()).unwrap();
        assert_eq!(snapshot.id, "run-1");
        assert_eq!(snapshot.macro_service_name.as_deref(), Some("billing"));

        let bare = write_temp(r#"{"id":"run-2","created_at":"2024-05-01T10:00:00Z"}"#);
        assert_eq!(load_snapshot(bare.path()).unwrap().id, "run-2");

        let broken = write_temp(r#"{"id":"run-3"}"#);
        assert!(load_snapshot(broken.path()).is_err());
    }

    #[test]
    fn test_replay_skips_malformed_lines() {
        let payloads = write_temp(concat!(
            r#"{"current_service_id":"svc-a","status":"running","timestamp":"2024-05-01T10:00:01Z"}"#,
            "\n\nnot json\n",
            r#"{"current_service_id":"svc-a","status":"success"}"#,
            "\n"
        ));
        let snapshot = write_temp(r#"{"id":"run-1","created_at":"2024-05-01T10:00:00Z"}"#);

        assert!(replay(payloads.path(), Some(snapshot.path())).is_ok());
        assert!(replay(Path::new("/nonexistent/payloads.jsonl"), None).is_err());
    }
}
