use std::path::Path;

use eyre::Result;

use crate::VideoMetadata;
use crate::history::History;

/// Render the video preview block. Duration is only shown when known.
pub fn render_preview(video: &VideoMetadata) -> String {
    let mut lines = vec![video.title.clone(), format!("Channel: {}", video.author)];
    if let Some(duration) = video.display_duration() {
        lines.push(format!("Duration: {duration}"));
    }
    lines.push(format!("Thumbnail: {}", video.thumbnail));
    lines.join("\n")
}

/// Render the summary with its preview header, if any
pub fn render_summary(summary: &str, video: Option<&VideoMetadata>) -> String {
    match video {
        Some(video) => format!("{}\n\n--- Summary ---\n{summary}", render_preview(video)),
        None => format!("--- Summary ---\n{summary}"),
    }
}

/// One block per entry, newest first
pub fn render_history(history: &History) -> String {
    history
        .entries()
        .map(|e| format!("{}  {}\n{}", e.formatted_timestamp(), e.video_url, e.summary))
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// Write the summary text to a file exactly as received
pub fn export_summary(path: &Path, summary: &str) -> Result<()> {
    std::fs::write(path, summary.as_bytes())?;
    Ok(())
}
