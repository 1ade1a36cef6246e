//! Duplex-backed ports standing in for serial lines.

use std::collections::VecDeque;
use std::io;
use std::sync::Mutex;
use std::time::Duration;

use tokio::io::{
    AsyncBufReadExt, AsyncWriteExt, BufReader, DuplexStream, Lines, ReadHalf, WriteHalf,
};

use crate::config::DeviceConfig;
use crate::device::{PortOpener, PortReader, PortWriter};

/// Hands out pre-made duplex streams, failing once they run out.
pub struct DuplexOpener {
    ports: Mutex<VecDeque<DuplexStream>>,
}

/// The microcontroller side of a duplex port.
pub struct Remote {
    pub lines: Lines<BufReader<ReadHalf<DuplexStream>>>,
    pub writer: WriteHalf<DuplexStream>,
}

impl Remote {
    pub async fn next_line(&mut self) -> String {
        self.lines.next_line().await.unwrap().unwrap()
    }

    pub async fn send(&mut self, line: &str) {
        self.writer
            .write_all(format!("{line}\n").as_bytes())
            .await
            .unwrap();
    }
}

impl DuplexOpener {
    pub fn with_ports(count: usize) -> (Self, Vec<Remote>) {
        let mut ports = VecDeque::new();
        let mut remotes = Vec::new();
        for _ in 0..count {
            let (local, remote) = tokio::io::duplex(1024);
            ports.push_back(local);
            let (rx, tx) = tokio::io::split(remote);
            remotes.push(Remote {
                lines: BufReader::new(rx).lines(),
                writer: tx,
            });
        }
        (
            Self {
                ports: Mutex::new(ports),
            },
            remotes,
        )
    }

    pub fn remaining(&self) -> usize {
        self.ports.lock().unwrap().len()
    }
}

impl PortOpener for DuplexOpener {
    async fn open(&self, _device: &DeviceConfig) -> io::Result<(PortReader, PortWriter)> {
        let port = self.ports.lock().unwrap().pop_front();
        let port = port.ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, "no such device"))?;
        let (reader, writer) = tokio::io::split(port);
        Ok((Box::new(reader), Box::new(writer)))
    }
}

pub fn device_config(name: &str) -> DeviceConfig {
    DeviceConfig {
        name: name.to_string(),
        path: format!("/dev/{name}"),
        baud: 115_200,
    }
}

/// Poll `condition` until it holds, failing the test after 30 s.
pub async fn wait_until(mut condition: impl FnMut() -> bool) {
    tokio::time::timeout(Duration::from_secs(30), async {
        while !condition() {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("condition never held");
}
