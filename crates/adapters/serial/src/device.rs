//! One serial device: open/read/reconnect lifecycle and acknowledged writes.
//!
//! A device cycles `Closed → Opening → Open → Closed` for the lifetime of
//! the process. While open, every line read is either published to the
//! Session store or matched against the pending writes. A write is
//! repeated every [`RetryPolicy::interval`] until the device echoes it,
//! and writes to one device take turns: the next command goes out only
//! once the previous one is confirmed or given up.

use std::future::Future;
use std::io;
use std::sync::{Arc, Mutex, PoisonError};

use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::task::JoinHandle;
use uuid::Uuid;

use carhub_app::event_store::SessionStore;

use crate::config::{DeviceConfig, ReconnectPolicy, RetryPolicy};
use crate::error::SerialError;
use crate::parser::{Line, parse_line};
use crate::queue::PendingWrites;

/// Target used to log every raw line exchanged with a device.
pub const LINE_TARGET: &str = "carhub::serial::line";

pub type PortReader = Box<dyn AsyncRead + Send + Unpin>;
pub type PortWriter = Box<dyn AsyncWrite + Send + Unpin>;

/// Opens the byte stream behind a device.
pub trait PortOpener: Send + Sync + 'static {
    fn open(
        &self,
        device: &DeviceConfig,
    ) -> impl Future<Output = io::Result<(PortReader, PortWriter)>> + Send;
}

/// Opens the device path as a character device.
///
/// Line settings (baud, raw mode) are left to the system, e.g. `stty`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TtyOpener;

impl PortOpener for TtyOpener {
    async fn open(&self, device: &DeviceConfig) -> io::Result<(PortReader, PortWriter)> {
        // Separate handles so a blocked read never holds up a write.
        let reader = tokio::fs::OpenOptions::new()
            .read(true)
            .open(&device.path)
            .await?;
        let writer = tokio::fs::OpenOptions::new()
            .write(true)
            .open(&device.path)
            .await?;
        Ok((Box::new(reader), Box::new(writer)))
    }
}

/// Where a device is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceState {
    Closed,
    Opening,
    Open,
}

/// A microcontroller reachable over a serial line.
pub struct SerialDevice {
    config: DeviceConfig,
    retry: RetryPolicy,
    reconnect: ReconnectPolicy,
    state: Mutex<DeviceState>,
    writer: tokio::sync::Mutex<Option<PortWriter>>,
    turn: tokio::sync::Mutex<()>,
    pending: PendingWrites,
}

/// Stops tracking a pending write when its writer stops waiting.
struct PendingGuard<'a> {
    pending: &'a PendingWrites,
    id: Uuid,
}

impl Drop for PendingGuard<'_> {
    fn drop(&mut self) {
        self.pending.remove(self.id);
    }
}

impl SerialDevice {
    #[must_use]
    pub fn new(config: DeviceConfig, retry: RetryPolicy, reconnect: ReconnectPolicy) -> Self {
        Self {
            config,
            retry,
            reconnect,
            state: Mutex::new(DeviceState::Closed),
            writer: tokio::sync::Mutex::new(None),
            turn: tokio::sync::Mutex::new(()),
            pending: PendingWrites::default(),
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.config.name
    }

    #[must_use]
    pub fn state(&self) -> DeviceState {
        *self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn set_state(&self, state: DeviceState) {
        *self.state.lock().unwrap_or_else(PoisonError::into_inner) = state;
    }

    /// Number of writes still waiting for their echo.
    #[must_use]
    pub fn pending_writes(&self) -> usize {
        self.pending.len()
    }

    /// Spawn the open/read/reconnect loop.
    pub fn start<O: PortOpener>(
        self: &Arc<Self>,
        opener: Arc<O>,
        session: Arc<SessionStore>,
    ) -> JoinHandle<()> {
        let device = Arc::clone(self);
        tokio::spawn(async move { device.run(opener.as_ref(), &session).await })
    }

    async fn run<O: PortOpener>(&self, opener: &O, session: &SessionStore) {
        loop {
            self.set_state(DeviceState::Opening);
            tracing::info!(
                device = %self.config.name,
                path = %self.config.path,
                baud = self.config.baud,
                "opening serial device"
            );
            let (reader, writer) = match opener.open(&self.config).await {
                Ok(port) => port,
                Err(err) => {
                    tracing::error!(device = %self.config.name, error = %err, "failed to open serial port");
                    self.set_state(DeviceState::Closed);
                    tokio::time::sleep(self.reconnect.open_retry).await;
                    continue;
                }
            };
            *self.writer.lock().await = Some(writer);
            self.set_state(DeviceState::Open);

            if let Err(err) = self.read_lines(reader, session).await {
                tracing::error!(device = %self.config.name, error = %err, "failed to read from serial port");
            }

            self.set_state(DeviceState::Closed);
            self.writer.lock().await.take();
            tracing::error!(
                device = %self.config.name,
                cooldown_secs = self.reconnect.cooldown.as_secs(),
                "serial disconnected, closing port and reopening after cooldown"
            );
            tokio::time::sleep(self.reconnect.cooldown).await;
        }
    }

    /// Read lines until EOF or a read error.
    async fn read_lines(&self, reader: PortReader, session: &SessionStore) -> io::Result<()> {
        let mut reader = BufReader::new(reader);
        let mut buf = Vec::new();
        loop {
            buf.clear();
            if reader.read_until(b'\n', &mut buf).await? == 0 {
                return Ok(());
            }
            let line = String::from_utf8_lossy(&buf);
            tracing::debug!(target: LINE_TARGET, device = %self.config.name, line = %line.trim_end(), "read");
            self.handle_line(&line, session).await;
        }
    }

    async fn handle_line(&self, line: &str, session: &SessionStore) {
        match parse_line(line) {
            Line::Ack(ack) if ack.is_empty() => {}
            Line::Ack(ack) => {
                if !self.pending.confirm(&ack) {
                    tracing::warn!(device = %self.config.name, line = %ack, "serial data matched no pending write");
                }
            }
            Line::Updates(updates) => {
                for (topic, value) in updates {
                    session.publish(topic, value).await;
                }
            }
        }
    }

    /// Write `message` and wait until the device echoes it back.
    ///
    /// # Errors
    ///
    /// - [`SerialError::EmptyMessage`] for a blank message.
    /// - [`SerialError::NotInitialized`] when the port is not open.
    /// - [`SerialError::Unconfirmed`] when a capped [`RetryPolicy`] runs out.
    pub async fn write(&self, message: &str) -> Result<(), SerialError> {
        let message = message.trim();
        if message.is_empty() {
            return Err(SerialError::EmptyMessage);
        }
        if self.state() != DeviceState::Open {
            return Err(SerialError::NotInitialized {
                device: self.config.name.clone(),
            });
        }

        let _turn = self.turn.lock().await;
        let (id, mut confirmed) = self.pending.register(message);
        let _guard = PendingGuard {
            pending: &self.pending,
            id,
        };
        let mut attempts = 0;
        loop {
            attempts += 1;
            self.write_line(message).await;
            if tokio::time::timeout(self.retry.interval, &mut confirmed)
                .await
                .is_ok()
            {
                tracing::info!(device = %self.config.name, message, %id, attempts, "successfully wrote message");
                return Ok(());
            }
            if self.retry.exhausted(attempts) {
                // An echo may have landed between the timeout and the removal.
                if !self.pending.remove(id) && confirmed.try_recv().is_ok() {
                    return Ok(());
                }
                return Err(SerialError::Unconfirmed {
                    message: message.to_string(),
                    attempts,
                });
            }
            tracing::info!(
                device = %self.config.name,
                message,
                %id,
                pending = self.pending.len(),
                "message timed out, rewriting"
            );
        }
    }

    async fn write_line(&self, message: &str) {
        let mut writer = self.writer.lock().await;
        let Some(port) = writer.as_mut() else {
            tracing::warn!(device = %self.config.name, message, "port closed, write will be retried");
            return;
        };
        tracing::debug!(target: LINE_TARGET, device = %self.config.name, line = message, "write");
        if let Err(err) = write_frame(port, message).await {
            tracing::error!(device = %self.config.name, message, error = %err, "failed to write to serial port");
        }
    }
}

async fn write_frame(port: &mut PortWriter, message: &str) -> io::Result<()> {
    port.write_all(format!("{message}\n").as_bytes()).await?;
    port.flush().await
}
