// SMPP wire connection
//
// A `Connection` wraps any byte stream and is split into a reader half and a
// writer half so the two session loops can own one each. Both halves wait in
// bounded slices and check their shutdown signal between slices.

use crate::codec::{CodecError, Frame, PduHeader, PduRegistry, MAX_PDU_SIZE};
use crate::shutdown::Shutdown;
use bytes::{Bytes, BytesMut};
use std::io;
use std::time::Duration;
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, BufWriter, ReadHalf, WriteHalf};
use tokio::net::TcpStream;
use tokio::time::Instant;
use tracing::debug;

/// Upper bound on any single wait, so shutdown requests are noticed promptly
pub const POLL_SLICE: Duration = Duration::from_secs(1);

/// Connection-level errors
#[derive(Debug, Error)]
pub enum WireError {
    #[error("failed to connect to {address}: {source}")]
    Connect {
        address: String,
        #[source]
        source: io::Error,
    },

    #[error("operation timed out")]
    Timeout,

    #[error("connection closed by peer")]
    Closed,

    #[error("connection is closing")]
    Cancelled,

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("malformed PDU: {0}")]
    Decode(#[from] CodecError),
}

/// Open a TCP connection, giving up after `timeout`
pub async fn connect(address: &str, timeout: Duration) -> Result<TcpStream, WireError> {
    let stream = tokio::time::timeout(timeout, TcpStream::connect(address))
        .await
        .map_err(|_| WireError::Timeout)?
        .map_err(|source| WireError::Connect {
            address: address.to_string(),
            source,
        })?;

    stream.set_nodelay(true)?;
    debug!("Connected to {}", address);

    Ok(stream)
}

/// SMPP v3.4 connection over an arbitrary byte stream
#[derive(Debug)]
pub struct Connection<S> {
    stream: S,
}

impl<S> Connection<S>
where
    S: AsyncRead + AsyncWrite + Send + 'static,
{
    pub fn new(stream: S) -> Self {
        Self { stream }
    }

    /// Split into halves that can be driven from separate tasks
    pub fn into_split(self) -> (ConnectionReader<S>, ConnectionWriter<S>) {
        let (read_half, write_half) = tokio::io::split(self.stream);

        let reader = ConnectionReader {
            stream: read_half,
            buffer: BytesMut::with_capacity(4 * 1024),
            registry: PduRegistry::new(),
        };
        let writer = ConnectionWriter {
            stream: BufWriter::new(write_half),
            closed: false,
        };

        (reader, writer)
    }
}

/// Read half of a split connection
#[derive(Debug)]
pub struct ConnectionReader<S> {
    stream: ReadHalf<S>,

    /// Read buffer for incoming data
    buffer: BytesMut,

    /// PDU registry for decoding
    registry: PduRegistry,
}

impl<S: AsyncRead> ConnectionReader<S> {
    /// Buffer at least `n` octets, reading in slices of at most [`POLL_SLICE`]
    async fn fill(&mut self, n: usize, shutdown: &Shutdown) -> Result<(), WireError> {
        while self.buffer.len() < n {
            if shutdown.is_triggered() {
                return Err(WireError::Cancelled);
            }

            match tokio::time::timeout(POLL_SLICE, self.stream.read_buf(&mut self.buffer)).await {
                Err(_) => continue,
                Ok(Ok(0)) => return Err(WireError::Closed),
                Ok(Ok(_)) => {}
                Ok(Err(e)) => return Err(WireError::Io(e)),
            }
        }
        Ok(())
    }

    /// Read exactly `n` octets
    pub async fn read_exactly(&mut self, n: usize, shutdown: &Shutdown) -> Result<Bytes, WireError> {
        self.fill(n, shutdown).await?;
        Ok(self.buffer.split_to(n).freeze())
    }

    /// Read and decode one complete PDU
    pub async fn read_frame(&mut self, shutdown: &Shutdown) -> Result<Frame, WireError> {
        self.fill(4, shutdown).await?;

        let length = u32::from_be_bytes([
            self.buffer[0],
            self.buffer[1],
            self.buffer[2],
            self.buffer[3],
        ]);
        if !(PduHeader::SIZE as u32..=MAX_PDU_SIZE).contains(&length) {
            return Err(WireError::Decode(CodecError::InvalidPduLength {
                length,
                min: PduHeader::SIZE as u32,
                max: MAX_PDU_SIZE,
            }));
        }

        let pdu = self.read_exactly(length as usize, shutdown).await?;
        Ok(self.registry.decode_frame(&pdu)?)
    }
}

/// Write half of a split connection
#[derive(Debug)]
pub struct ConnectionWriter<S> {
    stream: BufWriter<WriteHalf<S>>,
    closed: bool,
}

impl<S: AsyncWrite> ConnectionWriter<S> {
    /// Write all of `bytes` within `timeout`.
    ///
    /// Unless `allow_during_shutdown` is set, a raised shutdown flag aborts
    /// the write with [`WireError::Cancelled`].
    pub async fn write_all(
        &mut self,
        bytes: &[u8],
        allow_during_shutdown: bool,
        timeout: Duration,
        shutdown: &Shutdown,
    ) -> Result<(), WireError> {
        if self.closed {
            return Err(WireError::Closed);
        }

        let deadline = Instant::now() + timeout;
        let mut written = 0;

        while written < bytes.len() {
            let slice = self.next_slice(deadline, allow_during_shutdown, shutdown)?;
            match tokio::time::timeout(slice, self.stream.write(&bytes[written..])).await {
                Err(_) => continue,
                Ok(Ok(0)) => return Err(WireError::Closed),
                Ok(Ok(n)) => written += n,
                Ok(Err(e)) => return Err(WireError::Io(e)),
            }
        }

        loop {
            let slice = self.next_slice(deadline, allow_during_shutdown, shutdown)?;
            match tokio::time::timeout(slice, self.stream.flush()).await {
                Err(_) => continue,
                Ok(result) => return Ok(result?),
            }
        }
    }

    fn next_slice(
        &self,
        deadline: Instant,
        allow_during_shutdown: bool,
        shutdown: &Shutdown,
    ) -> Result<Duration, WireError> {
        if !allow_during_shutdown && shutdown.is_triggered() {
            return Err(WireError::Cancelled);
        }

        let now = Instant::now();
        if now >= deadline {
            return Err(WireError::Timeout);
        }
        Ok((deadline - now).min(POLL_SLICE))
    }

    /// Encode and write one PDU
    pub async fn write_frame(
        &mut self,
        frame: &Frame,
        allow_during_shutdown: bool,
        timeout: Duration,
        shutdown: &Shutdown,
    ) -> Result<(), WireError> {
        let bytes = frame.to_bytes()?;
        self.write_all(&bytes, allow_during_shutdown, timeout, shutdown)
            .await
    }

    /// Shut down the write direction; later calls do nothing
    pub async fn close(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;

        match tokio::time::timeout(POLL_SLICE, self.stream.shutdown()).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => debug!("Ignoring error while closing connection: {}", e),
            Err(_) => debug!("Timed out closing connection"),
        }
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::datatypes::{EnquireLink, EnquireLinkResponse};
    use tokio::net::TcpListener;

    const WRITE_TIMEOUT: Duration = Duration::from_secs(2);

    #[tokio::test]
    async fn frame_roundtrip_over_duplex() {
        let (client, server) = tokio::io::duplex(1024);
        let (mut client_reader, mut client_writer) = Connection::new(client).into_split();
        let (mut server_reader, mut server_writer) = Connection::new(server).into_split();
        let shutdown = Shutdown::new();

        let request = Frame::EnquireLink(EnquireLink::new(42));
        client_writer
            .write_frame(&request, false, WRITE_TIMEOUT, &shutdown)
            .await
            .unwrap();

        let received = server_reader.read_frame(&shutdown).await.unwrap();
        assert_eq!(received, request);

        let response = received.create_response().unwrap();
        server_writer
            .write_frame(&response, false, WRITE_TIMEOUT, &shutdown)
            .await
            .unwrap();

        match client_reader.read_frame(&shutdown).await.unwrap() {
            Frame::EnquireLinkResp(resp) => assert_eq!(resp, EnquireLinkResponse::new(42)),
            other => panic!("Expected EnquireLinkResp, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn back_to_back_frames_in_one_write() {
        let (client, server) = tokio::io::duplex(1024);
        let (_client_reader, mut client_writer) = Connection::new(client).into_split();
        let (mut server_reader, _server_writer) = Connection::new(server).into_split();
        let shutdown = Shutdown::new();

        let mut bytes = Frame::EnquireLink(EnquireLink::new(1)).to_bytes().unwrap().to_vec();
        bytes.extend_from_slice(&Frame::EnquireLink(EnquireLink::new(2)).to_bytes().unwrap());
        client_writer
            .write_all(&bytes, false, WRITE_TIMEOUT, &shutdown)
            .await
            .unwrap();

        assert_eq!(server_reader.read_frame(&shutdown).await.unwrap().sequence_number(), 1);
        assert_eq!(server_reader.read_frame(&shutdown).await.unwrap().sequence_number(), 2);
    }

    #[tokio::test]
    async fn read_is_cancelled_by_shutdown() {
        let (client, _server) = tokio::io::duplex(64);
        let (mut reader, _writer) = Connection::new(client).into_split();
        let shutdown = Shutdown::new();

        let trigger = shutdown.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            trigger.trigger();
        });

        let started = Instant::now();
        let result = reader.read_frame(&shutdown).await;
        assert!(matches!(result, Err(WireError::Cancelled)));
        assert!(started.elapsed() <= POLL_SLICE + Duration::from_millis(500));
    }

    #[tokio::test]
    async fn read_reports_closed_on_eof() {
        let (client, server) = tokio::io::duplex(64);
        let (mut reader, _writer) = Connection::new(client).into_split();
        drop(server);

        let result = reader.read_exactly(4, &Shutdown::new()).await;
        assert!(matches!(result, Err(WireError::Closed)));
    }

    #[tokio::test]
    async fn corrupt_length_is_a_decode_error() {
        let (client, server) = tokio::io::duplex(64);
        let (mut reader, _writer) = Connection::new(client).into_split();
        let (_server_reader, mut server_writer) = Connection::new(server).into_split();
        let shutdown = Shutdown::new();

        server_writer
            .write_all(&[0x00, 0x00, 0x00, 0x04], false, WRITE_TIMEOUT, &shutdown)
            .await
            .unwrap();

        let result = reader.read_frame(&shutdown).await;
        assert!(matches!(
            result,
            Err(WireError::Decode(CodecError::InvalidPduLength { length: 4, .. }))
        ));
    }

    #[tokio::test]
    async fn write_times_out_when_peer_stops_reading() {
        let (client, _server) = tokio::io::duplex(16);
        let (_reader, mut writer) = Connection::new(client).into_split();
        let shutdown = Shutdown::new();

        let result = writer
            .write_all(&[0u8; 32 * 1024], false, Duration::from_millis(100), &shutdown)
            .await;
        assert!(matches!(result, Err(WireError::Timeout)));
    }

    #[tokio::test]
    async fn write_honours_shutdown_unless_allowed() {
        let (client, server) = tokio::io::duplex(1024);
        let (_reader, mut writer) = Connection::new(client).into_split();
        let (mut server_reader, _server_writer) = Connection::new(server).into_split();
        let shutdown = Shutdown::new();
        shutdown.trigger();

        let frame = Frame::EnquireLink(EnquireLink::new(7));
        let result = writer.write_frame(&frame, false, WRITE_TIMEOUT, &shutdown).await;
        assert!(matches!(result, Err(WireError::Cancelled)));

        writer
            .write_frame(&frame, true, WRITE_TIMEOUT, &shutdown)
            .await
            .unwrap();
        let received = server_reader.read_frame(&Shutdown::new()).await.unwrap();
        assert_eq!(received, frame);
    }

    #[tokio::test]
    async fn close_is_idempotent() {
        let (client, _server) = tokio::io::duplex(64);
        let (_reader, mut writer) = Connection::new(client).into_split();

        writer.close().await;
        writer.close().await;
        assert!(writer.is_closed());

        let result = writer
            .write_all(&[0u8; 4], false, WRITE_TIMEOUT, &Shutdown::new())
            .await;
        assert!(matches!(result, Err(WireError::Closed)));
    }

    #[tokio::test]
    async fn connect_refused() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let address = listener.local_addr().unwrap().to_string();
        drop(listener);

        let result = connect(&address, Duration::from_secs(1)).await;
        assert!(matches!(result, Err(WireError::Connect { .. })));
    }
}
