// SPDX-License-Identifier: MIT OR Apache-2.0

/*!
An [ExternalBackend] that appends lines to one file per process.

The file lives in the resolved log directory and is named `<stem>_<pid>_<seconds>.log`.  Lines
go through a `BufWriter`; a watcher thread flushes it every [FLUSH_INTERVAL], and an `ERROR` or
`FATAL` record asks the watcher to flush right away.  [ExternalBackend::shutdown] stops the
watcher and flushes what is left.
*/

use crate::error::SinkError;
use crate::external_sink::ExternalBackend;
use crate::log_record::LogRecord;
use crate::severity::Severity;
use crate::sys::{Duration, Instant, SystemTime, UNIX_EPOCH};
use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::JoinHandle;

use wasm_safe_mutex::mpsc;

pub const FLUSH_INTERVAL: Duration = Duration::from_secs(5);

enum Control {
    Flush,
}

#[derive(Debug, Default)]
struct Output {
    writer: Option<BufWriter<File>>,
    path: Option<PathBuf>,
    //set by shutdown; late records from in-flight dispatches are dropped
    closed: bool,
}

struct Watcher {
    sender: mpsc::Sender<Control>,
    thread: JoinHandle<()>,
}

impl std::fmt::Debug for Watcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Watcher")
            .field("thread", &self.thread)
            .finish_non_exhaustive()
    }
}

#[derive(Debug)]
pub struct FileBackend {
    stem: String,
    output: Arc<Mutex<Output>>,
    watcher: Mutex<Option<Watcher>>,
    level: AtomicU8,
}

impl FileBackend {
    /// Names files after the running executable.
    pub fn new() -> Self {
        let stem = std::env::current_exe()
            .ok()
            .and_then(|exe| exe.file_stem().map(|s| s.to_string_lossy().into_owned()))
            .unwrap_or_else(|| "nodelog".to_string());
        Self::with_stem(stem)
    }

    pub fn with_stem(stem: impl Into<String>) -> Self {
        Self {
            stem: stem.into(),
            output: Arc::new(Mutex::new(Output::default())),
            watcher: Mutex::new(None),
            level: AtomicU8::new(Severity::Unset.as_u8()),
        }
    }

    /// The file being written, once initialized.
    pub fn path(&self) -> Option<PathBuf> {
        lock(&self.output).path.clone()
    }

    /// The default level last reported by the context.  Records are not filtered by it: the
    /// context has already applied per-logger levels.
    pub fn level(&self) -> Severity {
        Severity::from_u8(self.level.load(Ordering::Relaxed)).unwrap_or_default()
    }

    /// Flushes buffered lines on the calling thread.
    pub fn flush(&self) -> Result<(), SinkError> {
        flush_output(&self.output)
    }

    fn file_name(&self) -> String {
        let secs = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or_default();
        format!("{}_{}_{}.log", self.stem, std::process::id(), secs)
    }

    fn stop_watcher(&self) {
        let watcher = lock(&self.watcher).take();
        if let Some(watcher) = watcher {
            // disconnecting the channel is the stop signal
            drop(watcher.sender);
            let _ = watcher.thread.join();
        }
    }
}

impl Default for FileBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl ExternalBackend for FileBackend {
    fn initialize(&self, log_dir: &Path) -> Result<(), SinkError> {
        std::fs::create_dir_all(log_dir).map_err(|e| {
            SinkError::External(format!("cannot create {}: {e}", log_dir.display()))
        })?;
        let path = log_dir.join(self.file_name());
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(|e| SinkError::External(format!("cannot open {}: {e}", path.display())))?;

        // a second initialize replaces the previous file
        self.stop_watcher();
        flush_output(&self.output)?;
        {
            let mut output = lock(&self.output);
            output.writer = Some(BufWriter::new(file));
            output.path = Some(path);
            output.closed = false;
        }

        let (sender, receiver) = mpsc::channel();
        let output = self.output.clone();
        let thread = std::thread::Builder::new()
            .name("nodelog-file-flush".to_string())
            .spawn(move || flush_loop(receiver, output))
            .map_err(|e| SinkError::External(format!("cannot spawn flush thread: {e}")))?;
        *lock(&self.watcher) = Some(Watcher { sender, thread });
        Ok(())
    }

    fn set_level(&self, level: Severity) -> Result<(), SinkError> {
        self.level.store(level.as_u8(), Ordering::Relaxed);
        Ok(())
    }

    fn log(&self, record: &LogRecord<'_>, line: &str) -> Result<(), SinkError> {
        {
            let mut output = lock(&self.output);
            if output.closed {
                return Ok(());
            }
            let Some(writer) = output.writer.as_mut() else {
                return Err(SinkError::External("file backend is not initialized".into()));
            };
            writer
                .write_all(line.as_bytes())
                .and_then(|_| writer.write_all(b"\n"))
                .map_err(|e| SinkError::External(format!("write failed: {e}")))?;
        }
        if record.severity() >= Severity::Error {
            if let Some(watcher) = lock(&self.watcher).as_ref() {
                let _ = watcher.sender.send_sync(Control::Flush);
            }
        }
        Ok(())
    }

    fn shutdown(&self) -> Result<(), SinkError> {
        self.stop_watcher();
        let mut output = lock(&self.output);
        output.closed = true;
        if let Some(mut writer) = output.writer.take() {
            writer
                .flush()
                .map_err(|e| SinkError::External(format!("flush failed: {e}")))?;
        }
        Ok(())
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

fn flush_output(output: &Mutex<Output>) -> Result<(), SinkError> {
    if let Some(writer) = lock(output).writer.as_mut() {
        writer
            .flush()
            .map_err(|e| SinkError::External(format!("flush failed: {e}")))?;
    }
    Ok(())
}

fn flush_loop(receiver: mpsc::Receiver<Control>, output: Arc<Mutex<Output>>) {
    loop {
        match receiver.recv_sync_timeout(Instant::now() + FLUSH_INTERVAL) {
            Ok(Control::Flush) | Err(mpsc::RecvTimeoutError::Timeout) => {
                // nowhere to report a failure from here; the next write will see it
                let _ = flush_output(&output);
            }
            Err(mpsc::RecvTimeoutError::Disconnected) => break,
        }
    }
}
