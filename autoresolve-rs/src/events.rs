// autoresolve-rs/src/events.rs
// Incremental reader for the append-only command event log.
//
// Implementation notes:
// - One serialized CommandEvent per line (NDJSON), written by the shell hook.
// - The reader remembers its byte offset between polls and only consumes
//   complete lines; a trailing partial line is left for the next poll.
// - The offset moves only on `commit`, so a caller that stops halfway
//   through a batch sees the rest of it again on the next read.
// - Malformed lines are skipped with a warning, never fatal.
// - If the log shrinks below the saved offset it was rotated or truncated,
//   and reading restarts from the beginning.

use std::io::SeekFrom;
use std::path::{Path, PathBuf};

use tokio::fs::{self, OpenOptions};
use tokio::io::{AsyncReadExt, AsyncSeekExt, AsyncWriteExt};

use crate::model::CommandEvent;

#[derive(Debug, thiserror::Error)]
pub enum EventSourceError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}

/// An event together with the log offset just past its line.
#[derive(Debug, Clone, PartialEq)]
pub struct LoggedEvent {
    pub event: CommandEvent,
    pub end_offset: u64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EventBatch {
    pub events: Vec<LoggedEvent>,
    /// Offset past the last complete line read, malformed lines included.
    pub end_offset: u64,
}

impl EventBatch {
    fn empty(offset: u64) -> Self {
        Self {
            events: Vec::new(),
            end_offset: offset,
        }
    }
}

#[derive(Debug)]
pub struct EventLogReader {
    path: PathBuf,
    offset: u64,
}

impl EventLogReader {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            offset: 0,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn offset(&self) -> u64 {
        self.offset
    }

    /// Read every complete event line past the committed offset without
    /// consuming it. Call [`EventLogReader::commit`] as events are handled.
    pub async fn peek_new_events(&mut self) -> Result<EventBatch, EventSourceError> {
        let len = match fs::metadata(&self.path).await {
            Ok(meta) => meta.len(),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                return Ok(EventBatch::empty(self.offset));
            }
            Err(err) => return Err(err.into()),
        };

        if len < self.offset {
            tracing::info!(
                path = %self.path.display(),
                previous_offset = self.offset,
                len,
                "event log truncated; rereading from start"
            );
            self.offset = 0;
        }
        if len == self.offset {
            return Ok(EventBatch::empty(self.offset));
        }

        let mut file = fs::File::open(&self.path).await?;
        file.seek(SeekFrom::Start(self.offset)).await?;
        let mut buf = Vec::new();
        file.read_to_end(&mut buf).await?;

        let Some(last_newline) = buf.iter().rposition(|b| *b == b'\n') else {
            return Ok(EventBatch::empty(self.offset));
        };

        let mut position = self.offset;
        let mut events = Vec::new();
        for chunk in buf[..=last_newline].split_inclusive(|b| *b == b'\n') {
            position += chunk.len() as u64;
            let line = String::from_utf8_lossy(chunk);
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            match serde_json::from_str::<CommandEvent>(line) {
                Ok(event) => events.push(LoggedEvent {
                    event,
                    end_offset: position,
                }),
                Err(err) => {
                    metrics::increment_counter!("autoresolve_malformed_events_total");
                    tracing::warn!(error = %err, "failed to parse command event line; skipping");
                }
            }
        }

        Ok(EventBatch {
            events,
            end_offset: position,
        })
    }

    /// Mark everything before `offset` as consumed. Never moves backwards.
    pub fn commit(&mut self, offset: u64) {
        self.offset = self.offset.max(offset);
    }

    /// Read and consume every complete event line appended since the last call.
    pub async fn read_new_events(&mut self) -> Result<Vec<CommandEvent>, EventSourceError> {
        let batch = self.peek_new_events().await?;
        self.commit(batch.end_offset);
        Ok(batch.events.into_iter().map(|logged| logged.event).collect())
    }
}

/// Append one event to the log in the format the reader expects.
pub async fn append_event(path: &Path, event: &CommandEvent) -> Result<(), EventSourceError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).await?;
    }

    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .await?;

    let mut line = serde_json::to_string(event)?;
    line.push('\n');
    file.write_all(line.as_bytes()).await?;
    file.flush().await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn missing_log_yields_nothing() {
        let tmp_dir = tempfile::tempdir().expect("tempdir");
        let mut reader = EventLogReader::new(tmp_dir.path().join("commands.log"));
        assert!(reader.read_new_events().await.expect("read").is_empty());
        assert_eq!(reader.offset(), 0);
    }

    #[tokio::test]
    async fn reads_only_new_lines_across_polls() {
        let tmp_dir = tempfile::tempdir().expect("tempdir");
        let path = tmp_dir.path().join("commands.log");
        let mut reader = EventLogReader::new(&path);

        append_event(&path, &CommandEvent::new("ls", 0, "a", "", 0.1))
            .await
            .expect("append");
        let first = reader.read_new_events().await.expect("read");
        assert_eq!(first.len(), 1);
        assert_eq!(first[0].command, "ls");

        assert!(reader.read_new_events().await.expect("read").is_empty());

        append_event(&path, &CommandEvent::new("npm start", 127, "", "npm: command not found", 0.2))
            .await
            .expect("append");
        let second = reader.read_new_events().await.expect("read");
        assert_eq!(second.len(), 1);
        assert!(!second[0].success);
    }

    #[tokio::test]
    async fn malformed_lines_are_skipped() {
        let tmp_dir = tempfile::tempdir().expect("tempdir");
        let path = tmp_dir.path().join("commands.log");
        let good = serde_json::to_string(&CommandEvent::new("make", 2, "", "disk full", 3.0))
            .expect("serialize");
        std::fs::write(&path, format!("not json\n{{\"command\": 5}}\n\n{good}\n")).expect("write");

        let mut reader = EventLogReader::new(&path);
        let events = reader.read_new_events().await.expect("read");
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].command, "make");
    }

    #[tokio::test]
    async fn partial_trailing_line_waits_for_completion() {
        let tmp_dir = tempfile::tempdir().expect("tempdir");
        let path = tmp_dir.path().join("commands.log");
        let line = serde_json::to_string(&CommandEvent::new("git push", 1, "", "Connection reset", 1.0))
            .expect("serialize");
        let (head, tail) = line.split_at(10);

        std::fs::write(&path, head).expect("write");
        let mut reader = EventLogReader::new(&path);
        assert!(reader.read_new_events().await.expect("read").is_empty());
        assert_eq!(reader.offset(), 0);

        std::fs::write(&path, format!("{head}{tail}\n")).expect("write");
        let events = reader.read_new_events().await.expect("read");
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].command, "git push");
    }

    #[tokio::test]
    async fn truncated_log_is_reread_from_start() {
        let tmp_dir = tempfile::tempdir().expect("tempdir");
        let path = tmp_dir.path().join("commands.log");
        let mut reader = EventLogReader::new(&path);

        for i in 0..3 {
            append_event(&path, &CommandEvent::new(format!("cmd{i}"), 0, "", "", 0.0))
                .await
                .expect("append");
        }
        assert_eq!(reader.read_new_events().await.expect("read").len(), 3);

        std::fs::write(&path, "").expect("truncate");
        append_event(&path, &CommandEvent::new("fresh", 0, "", "", 0.0))
            .await
            .expect("append");
        let events = reader.read_new_events().await.expect("read");
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].command, "fresh");
    }

    #[tokio::test]
    async fn uncommitted_events_are_returned_again() {
        let tmp_dir = tempfile::tempdir().expect("tempdir");
        let path = tmp_dir.path().join("commands.log");
        let mut reader = EventLogReader::new(&path);

        for cmd in ["npm start", "git push"] {
            append_event(&path, &CommandEvent::new(cmd, 1, "", "boom", 0.0))
                .await
                .expect("append");
        }

        let batch = reader.peek_new_events().await.expect("peek");
        assert_eq!(batch.events.len(), 2);
        assert_eq!(batch.events[1].end_offset, batch.end_offset);
        reader.commit(batch.events[0].end_offset);

        let again = reader.peek_new_events().await.expect("peek");
        let commands: Vec<_> = again.events.iter().map(|e| e.event.command.as_str()).collect();
        assert_eq!(commands, vec!["git push"]);

        reader.commit(again.end_offset);
        assert!(reader.peek_new_events().await.expect("peek").events.is_empty());
        reader.commit(0);
        assert_eq!(reader.offset(), again.end_offset);
    }
}
