//! Single-consumer log relay.
//!
//! Workers never write log output themselves. They push [`LogLine`]s into a bounded
//! channel through a cloneable [`RelayHandle`]; one dedicated thread owned by
//! [`LogRelay`] drains the channel and hands each line to a sink, so output from many
//! workers is never interleaved. [`LogRelay::shutdown`] sends a stop sentinel and
//! joins the thread, which drains every line queued before the sentinel.
//!
//! The default sink forwards to `tracing`; tests install a capturing sink instead.

use crossbeam_channel::{Receiver, Sender, bounded};
use std::fmt;
use std::thread::JoinHandle;

/// Default queue depth between workers and the logging thread.
pub const DEFAULT_CAPACITY: usize = 1024;

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum Level {
    Debug,
    Info,
    Warn,
    Error,
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Debug => "DEBUG",
            Self::Info => "INFO",
            Self::Warn => "WARN",
            Self::Error => "ERROR",
        };
        f.write_str(s)
    }
}

/// One relayed log line.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LogLine {
    pub level: Level,
    /// Component that produced the line, e.g. `deserialize`.
    pub origin: &'static str,
    pub message: String,
}

enum Relayed {
    Line(LogLine),
    Stop,
}

/// Sending side of the relay. Cheap to clone; one per worker.
#[derive(Clone)]
pub struct RelayHandle {
    tx: Sender<Relayed>,
}

impl RelayHandle {
    /// Queue a line. Blocks while the queue is full; drops the line if the relay
    /// has already stopped.
    pub fn log(&self, level: Level, origin: &'static str, message: impl Into<String>) {
        let _ = self.tx.send(Relayed::Line(LogLine {
            level,
            origin,
            message: message.into(),
        }));
    }

    pub fn debug(&self, origin: &'static str, message: impl Into<String>) {
        self.log(Level::Debug, origin, message);
    }

    pub fn info(&self, origin: &'static str, message: impl Into<String>) {
        self.log(Level::Info, origin, message);
    }

    pub fn warn(&self, origin: &'static str, message: impl Into<String>) {
        self.log(Level::Warn, origin, message);
    }

    pub fn error(&self, origin: &'static str, message: impl Into<String>) {
        self.log(Level::Error, origin, message);
    }
}

/// Owner of the logging thread.
pub struct LogRelay {
    handle: RelayHandle,
    consumer: Option<JoinHandle<()>>,
}

impl LogRelay {
    /// Start a relay that forwards every line to `tracing`.
    ///
    /// # Errors
    ///
    /// Returns an error if the logging thread cannot be spawned.
    pub fn spawn(capacity: usize) -> std::io::Result<Self> {
        Self::with_sink(capacity, emit_tracing)
    }

    /// Start a relay that hands every line to `sink` on the logging thread.
    ///
    /// # Errors
    ///
    /// Returns an error if the logging thread cannot be spawned.
    pub fn with_sink<F>(capacity: usize, mut sink: F) -> std::io::Result<Self>
    where
        F: FnMut(LogLine) + Send + 'static,
    {
        let (tx, rx) = bounded(capacity.max(1));
        let consumer = std::thread::Builder::new()
            .name("s3access-log".into())
            .spawn(move || consume(&rx, &mut sink))?;
        Ok(Self {
            handle: RelayHandle { tx },
            consumer: Some(consumer),
        })
    }

    #[must_use]
    pub fn handle(&self) -> RelayHandle {
        self.handle.clone()
    }

    /// Stop the logging thread after it drains everything queued so far.
    pub fn shutdown(mut self) {
        self.stop();
    }

    fn stop(&mut self) {
        if let Some(consumer) = self.consumer.take() {
            let _ = self.handle.tx.send(Relayed::Stop);
            let _ = consumer.join();
        }
    }
}

impl Drop for LogRelay {
    fn drop(&mut self) {
        self.stop();
    }
}

fn consume(rx: &Receiver<Relayed>, sink: &mut impl FnMut(LogLine)) {
    while let Ok(Relayed::Line(line)) = rx.recv() {
        sink(line);
    }
}

fn emit_tracing(line: LogLine) {
    let LogLine {
        level,
        origin,
        message,
    } = line;
    match level {
        Level::Debug => tracing::debug!(origin, "{message}"),
        Level::Info => tracing::info!(origin, "{message}"),
        Level::Warn => tracing::warn!(origin, "{message}"),
        Level::Error => tracing::error!(origin, "{message}"),
    }
}
