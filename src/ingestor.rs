pub mod error;

use crate::ingestor::error::FeedError;
use crate::thread_manager::{SteppableTask, StopSignal};

use std::io::{Read, Write};

pub const LINE_TERMINATOR: &[u8] = b"\r\n";
/// Sent back to the source after every read that produced bytes; some
/// BaseStation servers expect to hear from their clients.
pub const LIVENESS_PROBE: &[u8] = b"\r\n";
const READ_CHUNK_SIZE: usize = 1024;
/// Unterminated bytes beyond this are dropped.
const MAX_PENDING_BYTES: usize = 64 * 1024;
const DEFAULT_READ_TIMEOUT: std::time::Duration = std::time::Duration::from_secs(1);
const DEFAULT_RETRY_BACKOFF: std::time::Duration = std::time::Duration::from_secs(1);
const CONNECT_TIMEOUT: std::time::Duration = std::time::Duration::from_secs(5);

/// Line-framed TCP client for a BaseStation feed.
pub struct FeedReader {
    address: String,
    stream: Option<std::net::TcpStream>,
    buffer: Vec<u8>,
    scanned: usize,
    read_timeout: std::time::Duration,
    retry_backoff: std::time::Duration,
}

impl FeedReader {
    #[must_use]
    pub fn new(host: &str, port: u16) -> Self {
        FeedReader {
            address: format!("{host}:{port}"),
            stream: None,
            buffer: Vec::new(),
            scanned: 0,
            read_timeout: DEFAULT_READ_TIMEOUT,
            retry_backoff: DEFAULT_RETRY_BACKOFF,
        }
    }

    #[must_use]
    pub fn with_timings(
        mut self,
        read_timeout: std::time::Duration,
        retry_backoff: std::time::Duration,
    ) -> Self {
        self.read_timeout = read_timeout;
        self.retry_backoff = retry_backoff;
        self
    }

    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.stream.is_some()
    }

    /// Connects to the feed, retrying after a fixed backoff for as long as
    /// it takes. Only a stop request ends the retries early.
    pub fn connect(&mut self, stop_signal: &StopSignal) -> Result<(), FeedError> {
        log::info!("Connecting to feed on {0}.", self.address);
        loop {
            match self.try_connect() {
                Ok(()) => {
                    log::info!("Connected to {0}, receiving.", self.address);
                    return Ok(());
                }
                Err(err) => {
                    log::warn!("{err}. Retrying...");
                    if stop_signal.wait_timeout(self.retry_backoff) {
                        return Err(FeedError::Cancelled);
                    }
                }
            }
        }
    }

    fn try_connect(&mut self) -> Result<(), FeedError> {
        let connection_error = |source: std::io::Error| FeedError::Connection {
            source,
            address: self.address.clone(),
        };
        let addresses = std::net::ToSocketAddrs::to_socket_addrs(self.address.as_str())
            .map_err(connection_error)?;

        let mut last_error = std::io::Error::new(
            std::io::ErrorKind::AddrNotAvailable,
            "host resolved to no address",
        );
        for socket_address in addresses {
            match std::net::TcpStream::connect_timeout(&socket_address, CONNECT_TIMEOUT) {
                Ok(stream) => {
                    stream
                        .set_read_timeout(Some(self.read_timeout))
                        .and_then(|()| stream.set_write_timeout(Some(self.read_timeout)))
                        .map_err(connection_error)?;
                    self.stream = Some(stream);
                    self.discard_buffer();
                    return Ok(());
                }
                Err(err) => last_error = err,
            }
        }
        Err(connection_error(last_error))
    }

    /// Returns the next complete line without its terminator.
    ///
    /// `Ok(None)` means no complete line arrived within the read timeout.
    /// Partial lines stay buffered for the next call.
    pub fn receive(&mut self) -> Result<Option<String>, FeedError> {
        if let Some(line) = self.take_line() {
            return Ok(Some(line));
        }

        let stream = self.stream.as_mut().ok_or(FeedError::NotConnected)?;
        let mut chunk = [0u8; READ_CHUNK_SIZE];
        let read_result = stream.read(&mut chunk).and_then(|bytes_read| {
            if bytes_read == 0 {
                return Err(std::io::Error::new(
                    std::io::ErrorKind::UnexpectedEof,
                    "connection closed by remote host",
                ));
            }
            Ok(bytes_read)
        });

        match read_result {
            Ok(bytes_read) => {
                self.buffer.extend_from_slice(&chunk[..bytes_read]);
                send_liveness_probe(stream, &self.address);
                let line = self.take_line();
                if line.is_none() && self.buffer.len() > MAX_PENDING_BYTES {
                    log::warn!(
                        "Dropping {0} bytes from {1} with no line terminator.",
                        self.buffer.len(),
                        self.address
                    );
                    self.discard_buffer();
                }
                Ok(line)
            }
            Err(err)
                if matches!(
                    err.kind(),
                    std::io::ErrorKind::WouldBlock
                        | std::io::ErrorKind::TimedOut
                        | std::io::ErrorKind::Interrupted
                ) =>
            {
                Ok(None)
            }
            Err(source) => Err(FeedError::Connection {
                source,
                address: self.address.clone(),
            }),
        }
    }

    pub fn disconnect(&mut self) {
        if let Some(stream) = self.stream.take() {
            let _ = stream.shutdown(std::net::Shutdown::Both);
            log::info!("Disconnected from {0}.", self.address);
        }
        self.discard_buffer();
    }

    fn discard_buffer(&mut self) {
        self.buffer.clear();
        self.scanned = 0;
    }

    /// Scanning resumes where the previous call stopped, backed up so a
    /// terminator split across reads is still found.
    fn take_line(&mut self) -> Option<String> {
        let start = self.scanned.saturating_sub(LINE_TERMINATOR.len() - 1);
        let Some(offset) = self.buffer[start..]
            .windows(LINE_TERMINATOR.len())
            .position(|window| window == LINE_TERMINATOR)
        else {
            self.scanned = self.buffer.len();
            return None;
        };
        let end = start + offset;
        let line: Vec<u8> = self.buffer.drain(..end + LINE_TERMINATOR.len()).collect();
        self.scanned = 0;
        Some(String::from_utf8_lossy(&line[..end]).into_owned())
    }
}

/// Writes the liveness probe. A failed probe never costs the bytes already
/// read; a broken connection surfaces on the next read instead.
fn send_liveness_probe(stream: &mut impl Write, address: &str) -> bool {
    match stream.write_all(LIVENESS_PROBE) {
        Ok(()) => true,
        Err(err)
            if matches!(
                err.kind(),
                std::io::ErrorKind::WouldBlock | std::io::ErrorKind::TimedOut
            ) =>
        {
            log::debug!("{address} is not reading, liveness probe skipped.");
            false
        }
        Err(err) => {
            log::warn!("Liveness probe to {address} failed: {err}");
            false
        }
    }
}

/// Keeps a feed connection open and forwards every non-blank line.
pub struct Ingestor {
    reader: FeedReader,
    sender: crossbeam_channel::Sender<String>,
    stop_signal: StopSignal,
}

impl Ingestor {
    #[must_use]
    pub fn new(
        reader: FeedReader,
        sender: crossbeam_channel::Sender<String>,
        stop_signal: StopSignal,
    ) -> Self {
        Ingestor {
            reader,
            sender,
            stop_signal,
        }
    }
}

impl SteppableTask for Ingestor {
    fn step(&mut self) -> bool {
        if !self.reader.is_connected() {
            if let Err(err) = self.reader.connect(&self.stop_signal) {
                log::info!("Ingestor: {err}");
                return false;
            }
        }

        match self.reader.receive() {
            Ok(Some(line)) => {
                if line.trim().is_empty() {
                    return true;
                }
                if let Err(err) = self.sender.send(line) {
                    log::error!("Ingestor: Failed to send to channel: {err}");
                    return false;
                }
            }
            Ok(None) => {}
            Err(err) => {
                log::error!("{err}. Reconnecting.");
                self.reader.disconnect();
            }
        }
        true
    }

    fn on_stop(&mut self) {
        self.reader.disconnect();
    }
}
