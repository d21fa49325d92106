//! JSONL telemetry writer with file rotation.
//!
//! One JSON object per logged control cycle:
//!
//! ```text
//! {"cycle":1,"throttle_raw":1.0,"timestamp":"2024-05-01T12:00:00+00:00"}
//! ```
//!
//! The control loop only fills a fixed-size record and queues it. A
//! dedicated `telemetry` thread serializes records and owns every file
//! operation. When the queue is full the record is dropped and counted.
//!
//! A new file is started after `max_records_per_file` records; only the
//! newest `max_files_to_keep` files are retained. Files found on disk at
//! startup always count as older than files this process opened, and the
//! file being written is never removed.

use std::fs::{self, File, OpenOptions};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant, SystemTime};

use chrono::{DateTime, Local};
use serde_json::{Map, Value};
use tokio::sync::mpsc::{self, error::TrySendError};
use tracing::{debug, info, warn};

use super::TelemetrySink;
use crate::error::{DriveShaperError, Result};

const FILE_PREFIX: &str = "telemetry_";
const FILE_EXTENSION: &str = "jsonl";

/// Records buffered between the control loop and the writer thread.
pub const QUEUE_CAPACITY: usize = 256;

/// Distinct keys a single record can hold.
pub const MAX_FIELDS: usize = 8;

/// One cycle of values, copied whole into the writer queue.
#[derive(Debug, Clone, Copy)]
struct TelemetryRecord {
    cycle: u64,
    timestamp: SystemTime,
    fields: [Option<(&'static str, f64)>; MAX_FIELDS],
}

impl TelemetryRecord {
    const EMPTY: Self = Self {
        cycle: 0,
        timestamp: SystemTime::UNIX_EPOCH,
        fields: [None; MAX_FIELDS],
    };

    fn is_empty(&self) -> bool {
        self.fields.iter().all(Option::is_none)
    }

    /// Sets `key`, overwriting an earlier value for the same key.
    fn set(&mut self, key: &'static str, value: f64) -> Result<()> {
        // Slots fill front to back, so the first free slot follows every used one
        let slot = self.fields.iter_mut().find(|slot| match slot {
            Some((existing, _)) => *existing == key,
            None => true,
        });
        match slot {
            Some(slot) => {
                *slot = Some((key, value));
                Ok(())
            }
            None => Err(DriveShaperError::Telemetry(format!(
                "record full, dropping '{}'",
                key
            ))),
        }
    }

    fn to_json(&self) -> Value {
        let timestamp: DateTime<Local> = self.timestamp.into();
        let mut map = Map::new();
        map.insert(
            "timestamp".to_string(),
            Value::String(timestamp.to_rfc3339()),
        );
        map.insert("cycle".to_string(), Value::from(self.cycle));
        for (key, value) in self.fields.iter().flatten() {
            map.insert((*key).to_string(), Value::from(*value));
        }
        Value::Object(map)
    }
}

/// Telemetry files in `dir`, sorted by name.
///
/// # Errors
///
/// Returns error if the directory cannot be read.
pub fn telemetry_files<P: AsRef<Path>>(dir: P) -> Result<Vec<PathBuf>> {
    let mut files: Vec<PathBuf> = fs::read_dir(dir)?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| is_telemetry_file(path))
        .collect();
    files.sort();
    Ok(files)
}

fn is_telemetry_file(path: &Path) -> bool {
    let name_matches = path
        .file_name()
        .map(|name| name.to_string_lossy().starts_with(FILE_PREFIX))
        .unwrap_or(false);
    let ext_matches = path
        .extension()
        .map(|ext| ext == FILE_EXTENSION)
        .unwrap_or(false);
    name_matches && ext_matches
}

/// File side of the sink. Lives on the writer thread.
struct JsonlWriter {
    log_dir: PathBuf,
    max_records_per_file: usize,
    max_files_to_keep: usize,
    writer: Option<BufWriter<File>>,
    records_in_file: usize,
    file_seq: u64,
    /// Files opened by this writer, oldest first. The last one is current.
    opened: Vec<PathBuf>,
}

impl JsonlWriter {
    fn new(log_dir: PathBuf, max_records_per_file: usize, max_files_to_keep: usize) -> Self {
        Self {
            log_dir,
            max_records_per_file,
            max_files_to_keep,
            writer: None,
            records_in_file: 0,
            file_seq: 0,
            opened: Vec::new(),
        }
    }

    fn run(mut self, mut receiver: mpsc::Receiver<TelemetryRecord>) {
        let mut failures: u64 = 0;
        while let Some(record) = receiver.blocking_recv() {
            if let Err(e) = self.write(&record) {
                failures += 1;
                if failures == 1 {
                    warn!("Telemetry write failed: {}", e);
                } else {
                    debug!("Telemetry write failed: {}", e);
                }
                // Start a fresh file on the next record
                self.writer = None;
            }
        }
        if let Err(e) = self.close_current() {
            warn!("Failed to flush telemetry file: {}", e);
        }
        debug!("Telemetry writer stopped");
    }

    fn close_current(&mut self) -> io::Result<()> {
        match self.writer.take() {
            Some(mut writer) => writer.flush(),
            None => Ok(()),
        }
    }

    fn open_next_file(&mut self) -> Result<()> {
        self.close_current()?;

        let stamp = Local::now().format("%Y%m%d_%H%M%S");
        let (path, file) = loop {
            self.file_seq += 1;
            let path = self.log_dir.join(format!(
                "{}{}_{:06}.{}",
                FILE_PREFIX, stamp, self.file_seq, FILE_EXTENSION
            ));
            match OpenOptions::new().write(true).create_new(true).open(&path) {
                Ok(file) => break (path, file),
                Err(e) if e.kind() == io::ErrorKind::AlreadyExists => continue,
                Err(e) => return Err(e.into()),
            }
        };
        debug!("Opening telemetry file {}", path.display());

        self.opened.push(path);
        self.writer = Some(BufWriter::new(file));
        self.records_in_file = 0;
        if let Err(e) = self.prune_old_files() {
            warn!("Failed to prune telemetry files: {}", e);
        }
        Ok(())
    }

    fn prune_old_files(&mut self) -> Result<()> {
        let on_disk = telemetry_files(&self.log_dir)?;
        self.opened.retain(|path| on_disk.contains(path));

        let mut by_age: Vec<&PathBuf> = on_disk
            .iter()
            .filter(|path| !self.opened.contains(path))
            .collect();
        by_age.extend(self.opened.iter());

        let current = self.opened.last();
        let excess = by_age.len().saturating_sub(self.max_files_to_keep);
        let mut removed = Vec::new();
        for path in by_age.into_iter().take(excess) {
            if Some(path) == current {
                continue;
            }
            debug!("Removing old telemetry file {}", path.display());
            fs::remove_file(path)?;
            removed.push(path.clone());
        }
        self.opened.retain(|path| !removed.contains(path));
        Ok(())
    }

    fn write(&mut self, record: &TelemetryRecord) -> Result<()> {
        if self.writer.is_none() || self.records_in_file >= self.max_records_per_file {
            self.open_next_file()?;
        }

        let writer = self
            .writer
            .as_mut()
            .ok_or_else(|| DriveShaperError::Telemetry("no open telemetry file".to_string()))?;
        serde_json::to_writer(&mut *writer, &record.to_json())?;
        writer.write_all(b"\n")?;
        writer.flush()?;
        self.records_in_file += 1;
        Ok(())
    }
}

/// Telemetry sink writing rotating JSONL files from a background thread.
///
/// At most one record is queued per `log_interval`. Dropping the sink
/// drains the queue and joins the writer.
pub struct JsonlSink {
    log_dir: PathBuf,
    sender: Option<mpsc::Sender<TelemetryRecord>>,
    worker: Option<JoinHandle<()>>,
    record: TelemetryRecord,
    log_interval: Duration,
    last_sent: Option<Instant>,
    cycle: u64,
    dropped: u64,
}

impl std::fmt::Debug for JsonlSink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JsonlSink")
            .field("log_dir", &self.log_dir)
            .field("log_interval", &self.log_interval)
            .field("cycle", &self.cycle)
            .field("dropped", &self.dropped)
            .finish_non_exhaustive()
    }
}

impl JsonlSink {
    /// Creates the sink and starts its writer thread, creating `log_dir` if
    /// needed.
    ///
    /// No file is opened until the first record is written. A zero
    /// `log_interval` logs every cycle.
    ///
    /// # Errors
    ///
    /// Returns error if a limit is zero, the directory cannot be created or
    /// the writer thread cannot be spawned.
    pub fn new<P: AsRef<Path>>(
        log_dir: P,
        max_records_per_file: usize,
        max_files_to_keep: usize,
        log_interval: Duration,
    ) -> Result<Self> {
        if max_records_per_file == 0 || max_files_to_keep == 0 {
            return Err(DriveShaperError::Telemetry(
                "file limits must be greater than 0".to_string(),
            ));
        }

        let log_dir = log_dir.as_ref().to_path_buf();
        fs::create_dir_all(&log_dir)?;

        let (sender, receiver) = mpsc::channel(QUEUE_CAPACITY);
        let writer = JsonlWriter::new(log_dir.clone(), max_records_per_file, max_files_to_keep);
        let worker = thread::Builder::new()
            .name("telemetry".to_string())
            .spawn(move || writer.run(receiver))?;

        info!(
            "Telemetry logging to {} every {}ms",
            log_dir.display(),
            log_interval.as_millis()
        );

        Ok(Self::from_parts(log_dir, sender, Some(worker), log_interval))
    }

    fn from_parts(
        log_dir: PathBuf,
        sender: mpsc::Sender<TelemetryRecord>,
        worker: Option<JoinHandle<()>>,
        log_interval: Duration,
    ) -> Self {
        Self {
            log_dir,
            sender: Some(sender),
            worker,
            record: TelemetryRecord::EMPTY,
            log_interval,
            last_sent: None,
            cycle: 0,
            dropped: 0,
        }
    }

    /// Directory the sink writes into.
    #[must_use]
    pub fn log_dir(&self) -> &Path {
        &self.log_dir
    }

    /// Records discarded because the writer queue was full.
    #[must_use]
    pub fn dropped_records(&self) -> u64 {
        self.dropped
    }

    fn interval_elapsed(&self, now: Instant) -> bool {
        match self.last_sent {
            Some(last) => now.duration_since(last) >= self.log_interval,
            None => true,
        }
    }
}

impl TelemetrySink for JsonlSink {
    fn put_number(&mut self, key: &'static str, value: f64) -> Result<()> {
        self.record.set(key, value)
    }

    fn end_cycle(&mut self) -> Result<()> {
        self.cycle += 1;
        // Never carry a half-filled cycle into the next one
        let mut record = std::mem::replace(&mut self.record, TelemetryRecord::EMPTY);
        if record.is_empty() {
            return Ok(());
        }

        let now = Instant::now();
        if !self.interval_elapsed(now) {
            return Ok(());
        }

        let sender = self
            .sender
            .as_ref()
            .ok_or_else(|| DriveShaperError::Telemetry("telemetry writer stopped".to_string()))?;
        record.cycle = self.cycle;
        record.timestamp = SystemTime::now();

        match sender.try_send(record) {
            Ok(()) => {
                self.last_sent = Some(now);
                Ok(())
            }
            Err(TrySendError::Full(_)) => {
                self.dropped += 1;
                if self.dropped == 1 {
                    warn!("Telemetry queue full, dropping records");
                }
                Ok(())
            }
            Err(TrySendError::Closed(_)) => Err(DriveShaperError::Telemetry(
                "telemetry writer stopped".to_string(),
            )),
        }
    }
}

impl Drop for JsonlSink {
    fn drop(&mut self) {
        // Closing the channel lets the writer drain and exit
        self.sender.take();
        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                warn!("Telemetry writer thread panicked");
            }
        }
        if self.dropped > 0 {
            info!("Telemetry records dropped: {}", self.dropped);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{BufRead, BufReader};
    use tempfile::TempDir;

    fn read_lines(path: &Path) -> Vec<Value> {
        let file = File::open(path).unwrap();
        BufReader::new(file)
            .lines()
            .map(|line| serde_json::from_str(&line.unwrap()).unwrap())
            .collect()
    }

    fn read_all(dir: &Path) -> Vec<Value> {
        telemetry_files(dir)
            .unwrap()
            .iter()
            .flat_map(|path| read_lines(path))
            .collect()
    }

    fn every_cycle(dir: &Path, max_records: usize, max_files: usize) -> JsonlSink {
        JsonlSink::new(dir, max_records, max_files, Duration::ZERO).unwrap()
    }

    // ==================== Record Tests ====================

    #[test]
    fn test_record_overwrites_same_key() {
        let mut record = TelemetryRecord::EMPTY;
        assert!(record.is_empty());
        record.set("a", 1.0).unwrap();
        record.set("b", 2.0).unwrap();
        record.set("a", 3.0).unwrap();

        let json = record.to_json();
        assert_eq!(json["a"], 3.0);
        assert_eq!(json["b"], 2.0);
        assert_eq!(record.fields.iter().flatten().count(), 2);
    }

    #[test]
    fn test_record_full_rejects_new_key() {
        const KEYS: [&str; MAX_FIELDS] = ["k0", "k1", "k2", "k3", "k4", "k5", "k6", "k7"];
        let mut record = TelemetryRecord::EMPTY;
        for key in KEYS {
            record.set(key, 0.0).unwrap();
        }
        assert!(record.set("extra", 1.0).is_err());
        // Existing keys can still be updated
        assert!(record.set("k7", 1.0).is_ok());
    }

    // ==================== Sink Tests ====================

    #[test]
    fn test_zero_limits_rejected() {
        let dir = TempDir::new().unwrap();
        assert!(JsonlSink::new(dir.path(), 0, 5, Duration::ZERO).is_err());
        assert!(JsonlSink::new(dir.path(), 5, 0, Duration::ZERO).is_err());
    }

    #[test]
    fn test_creates_log_dir() {
        let dir = TempDir::new().unwrap();
        let nested = dir.path().join("a").join("b");
        let sink = every_cycle(&nested, 10, 2);
        assert!(nested.is_dir());
        assert_eq!(sink.log_dir(), nested.as_path());
    }

    #[test]
    fn test_writes_one_line_per_cycle() {
        let dir = TempDir::new().unwrap();
        let mut sink = every_cycle(dir.path(), 100, 2);

        sink.put_number("throttle_raw", 1.0).unwrap();
        sink.put_number("throttle_slewed", -0.12).unwrap();
        sink.end_cycle().unwrap();
        sink.put_number("throttle_slewed", -0.24).unwrap();
        sink.end_cycle().unwrap();
        drop(sink);

        let files = telemetry_files(dir.path()).unwrap();
        assert_eq!(files.len(), 1);

        let records = read_lines(&files[0]);
        assert_eq!(records.len(), 2);
        assert_eq!(records[0]["cycle"], 1);
        assert_eq!(records[0]["throttle_raw"], 1.0);
        assert_eq!(records[0]["throttle_slewed"], -0.12);
        assert!(records[0]["timestamp"].is_string());
        assert_eq!(records[1]["cycle"], 2);
        assert!(records[1].get("throttle_raw").is_none());
    }

    #[test]
    fn test_empty_cycle_writes_nothing() {
        let dir = TempDir::new().unwrap();
        let mut sink = every_cycle(dir.path(), 100, 2);
        sink.end_cycle().unwrap();
        drop(sink);
        assert!(telemetry_files(dir.path()).unwrap().is_empty());
    }

    #[test]
    fn test_log_interval_limits_records() {
        let dir = TempDir::new().unwrap();
        let mut sink = JsonlSink::new(dir.path(), 100, 2, Duration::from_secs(3600)).unwrap();
        for i in 0..5 {
            sink.put_number("value", f64::from(i)).unwrap();
            sink.end_cycle().unwrap();
        }
        drop(sink);

        let records = read_all(dir.path());
        assert_eq!(records.len(), 1);
        assert_eq!(records[0]["cycle"], 1);
        assert_eq!(records[0]["value"], 0.0);
    }

    #[test]
    fn test_full_queue_drops_record() {
        let dir = TempDir::new().unwrap();
        let (sender, mut receiver) = mpsc::channel(1);
        let mut sink =
            JsonlSink::from_parts(dir.path().to_path_buf(), sender, None, Duration::ZERO);

        for i in 0..3 {
            sink.put_number("value", f64::from(i)).unwrap();
            sink.end_cycle().unwrap();
        }
        assert_eq!(sink.dropped_records(), 2);

        let queued = receiver.try_recv().unwrap();
        assert_eq!(queued.cycle, 1);
        assert_eq!(queued.to_json()["value"], 0.0);
    }

    #[test]
    fn test_stopped_writer_reported() {
        let dir = TempDir::new().unwrap();
        let (sender, receiver) = mpsc::channel(4);
        let mut sink =
            JsonlSink::from_parts(dir.path().to_path_buf(), sender, None, Duration::ZERO);
        drop(receiver);

        sink.put_number("value", 1.0).unwrap();
        assert!(sink.end_cycle().is_err());
        // The next cycle starts clean
        sink.put_number("value", 2.0).unwrap();
        assert_eq!(sink.record.fields.iter().flatten().count(), 1);
    }

    // ==================== Rotation Tests ====================

    #[test]
    fn test_rotation_and_retention() {
        let dir = TempDir::new().unwrap();
        let mut sink = every_cycle(dir.path(), 2, 3);

        // 9 records at 2 per file = 5 files, only 3 kept
        for i in 0..9 {
            sink.put_number("value", f64::from(i)).unwrap();
            sink.end_cycle().unwrap();
        }
        drop(sink);

        let files = telemetry_files(dir.path()).unwrap();
        assert_eq!(files.len(), 3);

        let last = read_lines(files.last().unwrap());
        assert_eq!(last.len(), 1);
        assert_eq!(last[0]["value"], 8.0);
    }

    #[test]
    fn test_future_named_files_pruned_first() {
        let dir = TempDir::new().unwrap();
        for seq in 1..=3 {
            let name = format!("telemetry_29990101_000000_{:06}.jsonl", seq);
            fs::write(dir.path().join(name), "{}\n").unwrap();
        }

        let mut sink = every_cycle(dir.path(), 2, 3);
        for i in 0..5 {
            sink.put_number("value", f64::from(i)).unwrap();
            sink.end_cycle().unwrap();
        }
        drop(sink);

        let files = telemetry_files(dir.path()).unwrap();
        assert_eq!(files.len(), 3);
        assert!(files
            .iter()
            .all(|path| !path.to_string_lossy().contains("29990101")));

        let values: Vec<f64> = read_all(dir.path())
            .iter()
            .map(|record| record["value"].as_f64().unwrap())
            .collect();
        assert_eq!(values, vec![0.0, 1.0, 2.0, 3.0, 4.0]);
    }

    #[test]
    fn test_restart_does_not_overwrite_earlier_file() {
        let dir = TempDir::new().unwrap();

        let mut first = every_cycle(dir.path(), 100, 5);
        for i in 0..2 {
            first.put_number("run", 1.0).unwrap();
            first.put_number("value", f64::from(i)).unwrap();
            first.end_cycle().unwrap();
        }
        drop(first);

        // Same second, same starting sequence number
        let mut second = every_cycle(dir.path(), 100, 5);
        second.put_number("run", 2.0).unwrap();
        second.end_cycle().unwrap();
        drop(second);

        let files = telemetry_files(dir.path()).unwrap();
        assert_eq!(files.len(), 2);

        let records = read_all(dir.path());
        assert_eq!(records.len(), 3);
        assert_eq!(records.iter().filter(|r| r["run"] == 1.0).count(), 2);
        assert_eq!(records.iter().filter(|r| r["run"] == 2.0).count(), 1);
    }

    #[test]
    fn test_ignores_foreign_files() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("notes.txt"), "keep me").unwrap();
        let mut sink = every_cycle(dir.path(), 1, 1);
        for _ in 0..3 {
            sink.put_number("x", 0.0).unwrap();
            sink.end_cycle().unwrap();
        }
        drop(sink);
        assert_eq!(telemetry_files(dir.path()).unwrap().len(), 1);
        assert!(dir.path().join("notes.txt").exists());
    }
}
