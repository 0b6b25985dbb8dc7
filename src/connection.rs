// ABOUTME: Provides framed TCP I/O for one SMPP session on the gateway side
// ABOUTME: Buffers partial reads across suspensions and splits the byte stream into whole PDUs

use crate::codec::{peek_sequence_number, CodecError, Frame, PduHeader};
use bytes::{Buf, BytesMut};
use std::io::{self, Cursor};
use thiserror::Error;
use tokio::io::{AsyncReadExt, AsyncWriteExt, BufWriter};
use tokio::net::TcpStream;

/// Errors surfaced while reading or writing frames.
#[derive(Debug, Error)]
pub enum ConnectionError {
    /// A whole frame was received but its body did not decode. The frame has
    /// been consumed, so the stream is still in sync.
    #[error("malformed PDU {command_id:#010x} (sequence {sequence_number}): {source}")]
    Malformed {
        command_id: u32,
        sequence_number: u32,
        #[source]
        source: CodecError,
    },

    /// The declared command_length cannot be trusted; the stream cannot be
    /// resynchronised.
    #[error("framing error: {source}")]
    Framing {
        sequence_number: Option<u32>,
        #[source]
        source: CodecError,
    },

    /// An outbound frame could not be encoded. Nothing was written.
    #[error("failed to encode outbound PDU: {0}")]
    Encode(#[source] CodecError),

    #[error("connection reset by peer")]
    Reset,

    #[error(transparent)]
    Io(#[from] io::Error),
}

/// Gateway side of one SMPP connection.
///
/// The read buffer is the only state that survives between reads: a frame is
/// handed out only once all `command_length` bytes are present, and any
/// surplus stays buffered for the next call.
#[derive(Debug)]
pub struct Connection {
    // The `TcpStream`. It is decorated with a `BufWriter`, which provides write
    // level buffering.
    stream: BufWriter<TcpStream>,

    // The buffer for reading frames.
    buffer: BytesMut,

    // Upper bound for a declared command_length
    max_pdu_size: u32,

    // Scratch space for encoding outbound frames
    write_buffer: BytesMut,
}

impl Connection {
    /// Create a new `Connection`, backed by `socket`. Read and write buffers
    /// are initialized.
    pub fn new(socket: TcpStream, max_pdu_size: u32) -> Connection {
        Connection {
            stream: BufWriter::new(socket),
            // Default to a 4KB read buffer; most PDUs are far smaller.
            buffer: BytesMut::with_capacity(4 * 1024),
            max_pdu_size,
            write_buffer: BytesMut::with_capacity(256),
        }
    }

    /// Read a single `Frame` value from the underlying stream.
    ///
    /// The function waits until it has retrieved enough data to parse a frame.
    /// It is cancel safe: if the future is dropped while waiting for bytes,
    /// whatever was read so far stays in the buffer.
    ///
    /// # Returns
    ///
    /// On success, the received frame is returned. If the `TcpStream`
    /// is closed in a way that doesn't break a frame in half, it returns
    /// `None`. Otherwise, an error is returned.
    pub async fn read_frame(&mut self) -> Result<Option<Frame>, ConnectionError> {
        loop {
            // Attempt to parse a frame from the buffered data. If enough data
            // has been buffered, the frame is returned.
            if let Some(frame) = self.parse_frame()? {
                return Ok(Some(frame));
            }

            // `0` indicates "end of stream".
            if 0 == self.stream.read_buf(&mut self.buffer).await? {
                // The remote closed the connection. For this to be a clean
                // shutdown, there should be no data in the read buffer. If
                // there is, this means that the peer closed the socket while
                // sending a frame.
                return if self.buffer.is_empty() {
                    Ok(None)
                } else {
                    Err(ConnectionError::Reset)
                };
            }
        }
    }

    /// Tries to parse a frame from the buffer. If the buffer contains enough
    /// data, the frame is returned and the data removed from the buffer. If not
    /// enough data has been buffered yet, `Ok(None)` is returned.
    fn parse_frame(&mut self) -> Result<Option<Frame>, ConnectionError> {
        let mut buf = Cursor::new(&self.buffer[..]);

        match Frame::check(&mut buf, self.max_pdu_size) {
            Ok(len) => {
                let result = Frame::parse(&self.buffer[..len], self.max_pdu_size);
                let sequence_number = peek_sequence_number(&self.buffer).unwrap_or(0);
                let command_id = u32::from_be_bytes([
                    self.buffer[4],
                    self.buffer[5],
                    self.buffer[6],
                    self.buffer[7],
                ]);

                // Discard the frame whether or not its body decoded
                self.buffer.advance(len);

                match result {
                    Ok(frame) => Ok(Some(frame)),
                    Err(source) => Err(ConnectionError::Malformed {
                        command_id,
                        sequence_number,
                        source,
                    }),
                }
            }
            // Not enough data yet; the caller reads more from the socket.
            Err(CodecError::Incomplete) => Ok(None),
            Err(source) => Err(ConnectionError::Framing {
                sequence_number: peek_sequence_number(&self.buffer),
                source,
            }),
        }
    }

    /// Encode and write a single `Frame`, then flush.
    pub async fn write_frame(&mut self, frame: &Frame) -> Result<(), ConnectionError> {
        self.write_buffer.clear();
        frame
            .encode(&mut self.write_buffer)
            .map_err(ConnectionError::Encode)?;

        debug_assert!(self.write_buffer.len() >= PduHeader::SIZE);
        self.stream.write_all(&self.write_buffer).await?;

        // Ensure the encoded frame is written to the socket.
        self.stream.flush().await?;
        Ok(())
    }

    /// Flush and close the write half.
    pub async fn shutdown(&mut self) -> io::Result<()> {
        self.stream.flush().await?;
        self.stream.shutdown().await
    }
}
