//! Archive of finished instances, written as JSONL.
//!
//! Every [`ResolutionEvent`] becomes one JSON line on any `Write`
//! destination (stdout, file, pipe) and is kept in memory so callers can
//! inspect the archive without re-reading the output.

use super::{ObserverError, ResolutionEvent, ResolutionObserver};
use crate::store::Snapshot;
use serde::Serialize;
use std::fs::OpenOptions;
use std::io::{BufWriter, Write};
use std::path::Path;
use std::sync::{Mutex, PoisonError};

/// One archived line.
#[derive(Debug, Serialize)]
struct ArchiveLine<'a> {
    revision: u64,
    checksum: u64,
    #[serde(flatten)]
    event: &'a ResolutionEvent,
}

pub struct EventLogObserver {
    writer: Mutex<Box<dyn Write + Send>>,
    records: Mutex<Vec<ResolutionEvent>>,
}

impl EventLogObserver {
    /// Create observer writing to stdout.
    pub fn stdout() -> Self {
        Self::new(Box::new(BufWriter::new(std::io::stdout())))
    }

    /// Create observer appending to a file, creating it if needed.
    pub fn file(path: impl AsRef<Path>) -> std::io::Result<Self> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self::new(Box::new(BufWriter::new(file))))
    }

    /// Keep the archive in memory only.
    pub fn in_memory() -> Self {
        Self::new(Box::new(std::io::sink()))
    }

    pub fn new(writer: Box<dyn Write + Send>) -> Self {
        Self {
            writer: Mutex::new(writer),
            records: Mutex::new(Vec::new()),
        }
    }

    /// Archived events in notification order.
    pub fn records(&self) -> Vec<ResolutionEvent> {
        self.records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl ResolutionObserver for EventLogObserver {
    fn on_resolution(
        &self,
        event: &ResolutionEvent,
        snapshot: &Snapshot,
    ) -> Result<(), ObserverError> {
        let line = ArchiveLine {
            revision: snapshot.revision,
            checksum: snapshot.checksum(),
            event,
        };
        let json = serde_json::to_string(&line)?;

        {
            let mut writer = self
                .writer
                .lock()
                .map_err(|_| std::io::Error::other("event log writer poisoned"))?;
            writeln!(writer, "{json}")?;
        }

        if let Ok(mut records) = self.records.lock() {
            records.push(event.clone());
        }
        Ok(())
    }

    fn name(&self) -> &str {
        "EventLogObserver"
    }

    fn on_shutdown(&self) {
        if let Ok(mut writer) = self.writer.lock() {
            if let Err(e) = writer.flush() {
                log::warn!("Failed to flush event log: {}", e);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::InstanceId;
    use crate::state::KingdomState;
    use std::sync::Arc;

    /// Writer that appends into a shared buffer.
    #[derive(Clone, Default)]
    struct SharedBuffer(Arc<Mutex<Vec<u8>>>);

    impl Write for SharedBuffer {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_writes_jsonl_and_keeps_records() {
        let buffer = SharedBuffer::default();
        let observer = EventLogObserver::new(Box::new(buffer.clone()));
        let snapshot = Snapshot::new(KingdomState::default(), 7);

        for id in 1..=2 {
            let event = ResolutionEvent::Abandoned {
                instance: InstanceId(id),
                event_id: "land-rush".to_string(),
                turn: 1,
            };
            observer.on_resolution(&event, &snapshot).unwrap();
        }

        let output = String::from_utf8(buffer.0.lock().unwrap().clone()).unwrap();
        let lines: Vec<&str> = output.lines().collect();
        assert_eq!(lines.len(), 2);
        let first: serde_json::Value = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(first["type"], "abandoned");
        assert_eq!(first["revision"], 7);
        assert_eq!(first["instance"], 1);

        let records = observer.records();
        assert_eq!(records.len(), 2);
        assert_eq!(records[1].instance(), InstanceId(2));
    }
}
