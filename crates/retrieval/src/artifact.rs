//! Result artifacts written by retrievals.

use chrono::{DateTime, Local};
use chronolog_common::Result;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs::{self, OpenOptions};
use tokio::io::AsyncWriteExt;
use tracing::debug;

/// Sortable capture-time format used in artifact names.
pub const CAPTURE_FORMAT: &str = "%Y%m%d_%H%M%S_%6f";

/// File name for a retrieval captured at `captured_at`.
pub fn artifact_name(chronicle: &str, story: &str, captured_at: &DateTime<Local>) -> String {
    format!(
        "records_{}_{}_{}.txt",
        sanitize(chronicle),
        sanitize(story),
        captured_at.format(CAPTURE_FORMAT)
    )
}

fn sanitize(component: &str) -> String {
    component
        .chars()
        .map(|c| match c {
            '/' | '\\' | '\0' => '_',
            c => c,
        })
        .collect()
}

/// Write `records` one per line to a fresh file in `dir`.
///
/// Never overwrites: if the name is taken, `-1`, `-2`, ... is appended to
/// the stem until a free name is found.
pub async fn write_artifact(
    dir: &Path,
    chronicle: &str,
    story: &str,
    captured_at: &DateTime<Local>,
    records: &[String],
) -> Result<PathBuf> {
    fs::create_dir_all(dir).await?;

    let name = artifact_name(chronicle, story, captured_at);
    let stem = name.trim_end_matches(".txt");
    let mut attempt = 0u32;

    loop {
        let path = if attempt == 0 {
            dir.join(&name)
        } else {
            dir.join(format!("{stem}-{attempt}.txt"))
        };

        match OpenOptions::new().write(true).create_new(true).open(&path).await {
            Ok(mut file) => {
                file.write_all(records.join("\n").as_bytes()).await?;
                file.flush().await?;
                debug!(path = %path.display(), records = records.len(), "Wrote record artifact");
                return Ok(path);
            }
            Err(e) if e.kind() == ErrorKind::AlreadyExists => attempt += 1,
            Err(e) => return Err(e.into()),
        }
    }
}
