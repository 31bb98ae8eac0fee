//! Terminal rendering of pipeline run timelines

use colored::*;
use vigil_core::domain::pipeline::PipelineRunSnapshot;
use vigil_core::domain::status::PipelineStatus;
use vigil_core::timeline::{MergedTimelineEntry, RunTimeline, SnapshotState};

const TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Print the details of a pipeline run snapshot
pub fn print_snapshot(snapshot: &PipelineRunSnapshot) {
    println!("{}", "Pipeline Run:".bold());
    println!("  ID:          {}", snapshot.id.cyan());
    println!(
        "  Status:      {}",
        colorize_status(snapshot.status.unwrap_or(PipelineStatus::Pending))
    );
    if let Some(name) = &snapshot.macro_service_name {
        println!("  Service:     {}", name);
    }
    if !snapshot.micro_service_names.is_empty() {
        println!("  Components:  {}", snapshot.micro_service_names.join(", "));
    }
    if let Some(unit) = &snapshot.pipeline_unit_id {
        println!("  Unit:        {}", unit.dimmed());
    }
    if let Some(requester) = &snapshot.requester_name {
        println!("  Requester:   {}", requester);
    }
    if let Some(approver) = &snapshot.approver_name {
        println!("  Approver:    {}", approver);
    }
    if let Some(gitlab_id) = snapshot.gitlab_pipeline_id {
        println!("  GitLab ID:   {}", gitlab_id);
    }
    println!("  Created:     {}", snapshot.created_at.format(TIME_FORMAT));
    if let Some(updated) = snapshot.updated_at {
        println!("  Updated:     {}", updated.format(TIME_FORMAT));
    }
}

/// Print the whole view of a run: load state, entries and the waiting hint
pub fn print_timeline(pipeline_run_id: &str, timeline: &RunTimeline, entries: &[MergedTimelineEntry]) {
    println!("{}", format!("Status timeline for {}:", pipeline_run_id).bold());
    println!("{}", "─".repeat(80).dimmed());

    match timeline.snapshot_state() {
        SnapshotState::Loading => println!("{}", "Loading pipeline status...".dimmed()),
        SnapshotState::Failed(reason) => {
            println!("{}", format!("Failed to load pipeline status: {}", reason).red())
        }
        SnapshotState::Ready(_) => {}
    }

    print_entries(entries);

    if timeline.is_awaiting_updates() {
        println!("{}", "Waiting for pipeline updates...".dimmed());
    }
    println!("{}", "─".repeat(80).dimmed());
}

/// Print timeline entries in the order given
pub fn print_entries(entries: &[MergedTimelineEntry]) {
    if entries.is_empty() {
        println!("{}", "No status updates yet.".yellow());
        return;
    }

    for entry in entries {
        for line in entry_lines(entry) {
            println!("{}", line);
        }
        println!();
    }
}

fn entry_lines(entry: &MergedTimelineEntry) -> Vec<String> {
    let mut lines = vec![format!(
        "{} {}  {}",
        marker(entry.status),
        entry.title().bold(),
        colorize_label(entry)
    )];

    if let Some(message) = &entry.message {
        lines.push(format!("    {}", message));
    }
    if let Some(at) = entry.effective_timestamp() {
        lines.push(format!("    {}", at.format(TIME_FORMAT).to_string().dimmed()));
    }
    if entry.is_initial && !entry.micro_service_names.is_empty() {
        lines.push(format!("    Services: {}", entry.micro_service_names.join(", ")));
    }
    if let Some(requester) = &entry.requester_name {
        lines.push(format!("    Requested by: {}", requester));
    }
    if let Some(approver) = entry.distinct_approver() {
        lines.push(format!("    Approved by:  {}", approver));
    }
    if let Some(comment) = &entry.comment {
        lines.push(format!("    Comment: {}", comment.italic()));
    }

    lines
}

fn marker(status: Option<PipelineStatus>) -> ColoredString {
    match status {
        Some(PipelineStatus::Success | PipelineStatus::Completed) => "✓".green(),
        Some(PipelineStatus::Failed | PipelineStatus::Rejected) => "✗".red(),
        _ => "▸".cyan(),
    }
}

fn colorize_label(entry: &MergedTimelineEntry) -> ColoredString {
    colorize_status(entry.status.unwrap_or(PipelineStatus::Pending))
}

/// Colorize a status for display
fn colorize_status(status: PipelineStatus) -> ColoredString {
    let label = status.label();
    match status {
        PipelineStatus::Pending => label.yellow(),
        PipelineStatus::Accepted => label.blue(),
        PipelineStatus::Running => label.cyan(),
        PipelineStatus::Success | PipelineStatus::Completed => label.green(),
        PipelineStatus::Failed | PipelineStatus::Rejected => label.red(),
    }
}
