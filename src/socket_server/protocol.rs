//! Wire protocol for the image socket
//!
//! Producers send a pipelined stream of frames with no delimiter beyond the
//! header and no acknowledgment:
//!
//! ```text
//! Frame   := Header Payload
//! Header  := u32, big-endian      ; N = byte length of Payload
//! Payload := N bytes              ; any decodable image encoding
//! ```
//!
//! [`FrameBuffer`] reassembles frames across arbitrary TCP chunk boundaries.
//! The length prefix is peeked, never consumed on its own: the buffer only
//! advances once all `4 + N` bytes are present.

/// Size of the big-endian length prefix
pub const HEADER_LEN: usize = 4;

/// Where a connection's buffer currently sits in the frame cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameState {
    /// Fewer than four bytes buffered
    AwaitingHeader,
    /// Header known, body incomplete
    AwaitingBody { expected: usize, buffered: usize },
    /// At least one complete frame is buffered
    FrameReady,
}

/// Per-connection reassembly buffer
///
/// Grows only through [`extend`](Self::extend) and shrinks only by whole
/// frames through [`next_frame`](Self::next_frame).
#[derive(Debug, Default)]
pub struct FrameBuffer {
    buf: Vec<u8>,
}

impl FrameBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append bytes read from the socket
    pub fn extend(&mut self, bytes: &[u8]) {
        self.buf.extend_from_slice(bytes);
    }

    /// Number of bytes currently buffered
    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    /// Payload length announced by the buffered header, if complete
    fn peek_len(&self) -> Option<usize> {
        let header: [u8; HEADER_LEN] = self.buf.get(..HEADER_LEN)?.try_into().ok()?;
        Some(u32::from_be_bytes(header) as usize)
    }

    pub fn state(&self) -> FrameState {
        match self.peek_len() {
            None => FrameState::AwaitingHeader,
            Some(len) if self.buf.len() - HEADER_LEN < len => FrameState::AwaitingBody {
                expected: len,
                buffered: self.buf.len() - HEADER_LEN,
            },
            Some(_) => FrameState::FrameReady,
        }
    }

    /// Remove and return the next complete payload
    ///
    /// Returns `None` and leaves the buffer untouched when the header or
    /// body is still incomplete.
    pub fn next_frame(&mut self) -> Option<Vec<u8>> {
        let len = self.peek_len()?;
        let total = HEADER_LEN.checked_add(len)?;
        if self.buf.len() < total {
            return None;
        }
        let payload = self.buf[HEADER_LEN..total].to_vec();
        self.buf.drain(..total);
        Some(payload)
    }

    /// Discard everything buffered
    pub fn clear(&mut self) {
        self.buf.clear();
        self.buf.shrink_to_fit();
    }
}

/// Encode one payload as a wire frame
///
/// Fails with `InvalidInput` if the payload does not fit a `u32` length.
pub fn encode_frame(payload: &[u8]) -> std::io::Result<Vec<u8>> {
    let len = u32::try_from(payload.len()).map_err(|_| {
        std::io::Error::new(
            std::io::ErrorKind::InvalidInput,
            format!("payload of {} bytes exceeds frame limit", payload.len()),
        )
    })?;
    let mut frame = Vec::with_capacity(HEADER_LEN + payload.len());
    frame.extend_from_slice(&len.to_be_bytes());
    frame.extend_from_slice(payload);
    Ok(frame)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_split_across_reads() {
        let mut buf = FrameBuffer::new();
        buf.extend(&[0x00, 0x00]);
        assert_eq!(buf.state(), FrameState::AwaitingHeader);
        assert!(buf.next_frame().is_none());
        assert_eq!(buf.len(), 2);

        buf.extend(&[0x00, 0x03, b'a']);
        assert_eq!(
            buf.state(),
            FrameState::AwaitingBody {
                expected: 3,
                buffered: 1
            }
        );
        assert!(buf.next_frame().is_none());
        assert_eq!(buf.len(), 5, "incomplete frame must not advance the buffer");

        buf.extend(b"bc");
        assert_eq!(buf.state(), FrameState::FrameReady);
        assert_eq!(buf.next_frame().as_deref(), Some(&b"abc"[..]));
        assert!(buf.is_empty());
    }

    #[test]
    fn test_ten_byte_body_in_two_halves() {
        let mut buf = FrameBuffer::new();
        buf.extend(&[0x00, 0x00, 0x00, 0x0A]);
        buf.extend(&[1, 2, 3, 4, 5]);
        assert!(buf.next_frame().is_none());
        buf.extend(&[6, 7, 8, 9, 10]);
        assert_eq!(buf.next_frame(), Some(vec![1, 2, 3, 4, 5, 6, 7, 8, 9, 10]));
        assert!(buf.next_frame().is_none());
    }

    #[test]
    fn test_pipelined_frames_fifo() {
        let mut stream = encode_frame(b"first").unwrap();
        stream.extend(encode_frame(b"").unwrap());
        stream.extend(encode_frame(b"third").unwrap());
        stream.extend(&[0x00, 0x00, 0x00]);

        let mut buf = FrameBuffer::new();
        buf.extend(&stream);
        assert_eq!(buf.next_frame(), Some(b"first".to_vec()));
        assert_eq!(buf.next_frame(), Some(Vec::new()));
        assert_eq!(buf.next_frame(), Some(b"third".to_vec()));
        assert_eq!(buf.next_frame(), None);
        assert_eq!(buf.len(), 3);
    }

    #[test]
    fn test_every_chunking_yields_same_frames() {
        let payloads: Vec<Vec<u8>> = vec![vec![7; 13], b"xy".to_vec(), vec![0xFF; 300]];
        let stream: Vec<u8> = payloads
            .iter()
            .flat_map(|p| encode_frame(p).unwrap())
            .collect();

        for chunk_size in [1, 2, 3, 4, 5, 7, 64, stream.len()] {
            let mut buf = FrameBuffer::new();
            let mut out = Vec::new();
            for chunk in stream.chunks(chunk_size) {
                buf.extend(chunk);
                while let Some(frame) = buf.next_frame() {
                    out.push(frame);
                }
            }
            assert_eq!(out, payloads, "chunk size {}", chunk_size);
            assert!(buf.is_empty(), "chunk size {}", chunk_size);
        }
    }

    #[test]
    fn test_encode_frame_header_is_big_endian() {
        let frame = encode_frame(&[0u8; 258]).unwrap();
        assert_eq!(&frame[..4], &[0x00, 0x00, 0x01, 0x02]);
        assert_eq!(frame.len(), 262);
    }

    #[test]
    fn test_clear_drops_partial_frame() {
        let mut buf = FrameBuffer::new();
        buf.extend(&[0, 0, 0, 9, 1, 2]);
        buf.clear();
        assert!(buf.is_empty());
        assert_eq!(buf.state(), FrameState::AwaitingHeader);
    }
}
