// Append-only log of dispatched requests
//
// Diagnostics only. Recording never fails and never returns an error to the
// request path; a poisoned lock or an unwritable file just drops the entry.
// File output goes through a writer thread so the gateway never does disk I/O.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::VecDeque;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{mpsc, Mutex};
use std::thread;
use std::time::Duration;

use super::types::{Channel, LcuRequest};
use crate::error::LcuError;

#[derive(Debug, Clone, Serialize)]
pub struct RequestLogEntry {
  pub seq: u64,
  pub at: DateTime<Utc>,
  pub method: String,
  pub path: String,
  pub channel: Channel,
  /// 0 for the first attempt, incremented per retry.
  pub attempt: u32,
  pub status: Option<u16>,
  pub error: Option<String>,
  pub elapsed_ms: u64,
}

pub struct RequestLog {
  next_seq: AtomicU64,
  capacity: usize,
  entries: Mutex<VecDeque<RequestLogEntry>>,
  file: Option<mpsc::Sender<FileMessage>>,
}

enum FileMessage {
  Line(String),
  Flush(mpsc::Sender<()>),
}

impl RequestLog {
  pub fn new(capacity: usize) -> Self {
    Self {
      next_seq: AtomicU64::new(1),
      capacity: capacity.max(1),
      entries: Mutex::new(VecDeque::new()),
      file: None,
    }
  }

  /// Also append every entry as a JSON line to `path`. The file is opened
  /// once by a background writer thread.
  pub fn with_file(mut self, path: impl Into<PathBuf>) -> Self {
    let path = path.into();
    let (sender, receiver) = mpsc::channel();
    let spawned = thread::Builder::new()
      .name("request-log-writer".to_string())
      .spawn(move || write_lines(path, receiver));
    match spawned {
      Ok(_) => self.file = Some(sender),
      Err(e) => tracing::warn!(error = %e, "failed to start request log writer"),
    }
    self
  }

  /// Block until every entry recorded so far has reached the file, or one
  /// second has passed.
  pub fn flush(&self) {
    let Some(sender) = &self.file else {
      return;
    };
    let (ack, done) = mpsc::channel();
    if sender.send(FileMessage::Flush(ack)).is_ok() {
      let _ = done.recv_timeout(Duration::from_secs(1));
    }
  }

  /// Record one attempt. Returns the sequence number assigned.
  pub fn record(
    &self,
    request: &LcuRequest,
    attempt: u32,
    outcome: Result<u16, &LcuError>,
    elapsed_ms: u64,
  ) -> u64 {
    let seq = self.next_seq.fetch_add(1, Ordering::SeqCst);
    let (status, error) = match outcome {
      Ok(status) => (Some(status), None),
      Err(err) => (err.status(), Some(err.to_string())),
    };
    let entry = RequestLogEntry {
      seq,
      at: Utc::now(),
      method: request.method.to_string(),
      path: request.path.clone(),
      channel: request.channel,
      attempt,
      status,
      error,
      elapsed_ms,
    };

    tracing::trace!(
      seq,
      method = %entry.method,
      path = %entry.path,
      status = ?entry.status,
      "lcu request"
    );

    self.append_to_file(&entry);

    if let Ok(mut buf) = self.entries.lock() {
      buf.push_back(entry);
      while buf.len() > self.capacity {
        buf.pop_front();
      }
    }
    seq
  }

  pub fn entries(&self) -> Vec<RequestLogEntry> {
    self
      .entries
      .lock()
      .map(|buf| buf.iter().cloned().collect())
      .unwrap_or_default()
  }

  pub fn len(&self) -> usize {
    self.entries.lock().map(|buf| buf.len()).unwrap_or(0)
  }

  pub fn is_empty(&self) -> bool {
    self.len() == 0
  }

  fn append_to_file(&self, entry: &RequestLogEntry) {
    let Some(sender) = &self.file else {
      return;
    };
    if let Ok(line) = serde_json::to_string(entry) {
      let _ = sender.send(FileMessage::Line(line));
    }
  }
}

// Runs until the owning log is dropped.
fn write_lines(path: PathBuf, receiver: mpsc::Receiver<FileMessage>) {
  let mut file = match File::options().create(true).append(true).open(&path) {
    Ok(f) => Some(BufWriter::new(f)),
    Err(e) => {
      tracing::debug!(path = %path.display(), error = %e, "request log file unavailable");
      None
    }
  };

  for message in receiver {
    match message {
      FileMessage::Line(line) => {
        if let Some(f) = file.as_mut() {
          if let Err(e) = writeln!(f, "{}", line).and_then(|_| f.flush()) {
            tracing::debug!(error = %e, "failed to write request log");
          }
        }
      }
      FileMessage::Flush(ack) => {
        if let Some(f) = file.as_mut() {
          let _ = f.flush();
        }
        let _ = ack.send(());
      }
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::lcu::types::RequestOptions;
  use reqwest::Method;

  fn request(path: &str) -> LcuRequest {
    LcuRequest::new(Method::GET, path, RequestOptions::default())
  }

  #[test]
  fn test_sequence_numbers_increase() {
    let log = RequestLog::new(10);
    let a = log.record(&request("/a"), 0, Ok(200), 1);
    let b = log.record(
      &request("/b"),
      1,
      Err(&LcuError::AuthExpired { status: 401 }),
      2,
    );
    assert_eq!(b, a + 1);

    let entries = log.entries();
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[1].status, Some(401));
    assert_eq!(entries[1].attempt, 1);
    assert!(entries[1].error.is_some());
  }

  #[test]
  fn test_buffer_is_bounded() {
    let log = RequestLog::new(3);
    for i in 0..5 {
      log.record(&request(&format!("/{}", i)), 0, Ok(200), 0);
    }
    let entries = log.entries();
    assert_eq!(entries.len(), 3);
    assert_eq!(entries[0].path, "/2");
    assert_eq!(entries[2].seq, 5);
  }

  #[test]
  fn test_entries_are_mirrored_to_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("requests.jsonl");
    let log = RequestLog::new(10).with_file(&path);
    log.record(&request("/lol-gameflow/v1/gameflow-phase"), 0, Ok(200), 3);
    log.record(&request("/lol-champ-select/v1/session"), 0, Ok(404), 1);
    log.flush();

    let contents = std::fs::read_to_string(&path).unwrap();
    let lines: Vec<serde_json::Value> = contents
      .lines()
      .map(|l| serde_json::from_str(l).unwrap())
      .collect();
    assert_eq!(lines.len(), 2);
    assert_eq!(lines[0]["path"], "/lol-gameflow/v1/gameflow-phase");
    assert_eq!(lines[0]["channel"], "league_client");
    assert_eq!(lines[1]["seq"], 2);
  }

  #[test]
  fn test_file_survives_reopening() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("requests.jsonl");
    {
      let log = RequestLog::new(10).with_file(&path);
      log.record(&request("/a"), 0, Ok(200), 0);
      log.flush();
    }
    let log = RequestLog::new(10).with_file(&path);
    log.record(&request("/b"), 0, Ok(200), 0);
    log.flush();

    let contents = std::fs::read_to_string(&path).unwrap();
    assert_eq!(contents.lines().count(), 2);
  }

  #[test]
  fn test_unwritable_file_does_not_panic() {
    let dir = tempfile::tempdir().unwrap();
    // A directory cannot be opened for appending
    let log = RequestLog::new(10).with_file(dir.path());
    log.record(&request("/x"), 0, Ok(204), 0);
    log.flush();
    assert_eq!(log.len(), 1);
  }
}
