//! Newline-delimited message framing.
//!
//! The transport delivers opaque byte chunks with no size guarantees; the
//! framer reassembles them into trimmed, non-empty message strings. One
//! framer instance holds the residual buffer for one connection and is
//! reset when the connection goes away.

use thiserror::Error;

/// Errors produced while framing the byte stream.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FrameError {
    /// The unframed tail exceeded the single-frame byte budget without a
    /// newline; the tail was discarded to resynchronize.
    #[error("frame exceeded {limit} bytes without a newline, {dropped} bytes discarded")]
    FrameTooLarge { limit: usize, dropped: usize },

    /// A framed line was not valid UTF-8. The wire format is UTF-8 text,
    /// so the frame is dropped.
    #[error("frame is not valid UTF-8")]
    InvalidUtf8,
}

/// Reassembles newline-terminated messages from a byte stream.
#[derive(Debug)]
pub struct LineFramer {
    buf: Vec<u8>,
    max_frame_bytes: usize,
}

impl LineFramer {
    /// Create a framer with the given single-frame byte budget.
    pub fn new(max_frame_bytes: usize) -> Self {
        Self {
            buf: Vec::new(),
            max_frame_bytes,
        }
    }

    /// Append a chunk of bytes from the transport.
    ///
    /// If the bytes after the last newline exceed the frame budget, that
    /// tail is discarded and `FrameError::FrameTooLarge` is returned; any
    /// complete frames already buffered remain available via
    /// [`next_message`](Self::next_message).
    pub fn extend(&mut self, chunk: &[u8]) -> Result<(), FrameError> {
        self.buf.extend_from_slice(chunk);

        let tail_start = match self.buf.iter().rposition(|&b| b == b'\n') {
            Some(pos) => pos + 1,
            None => 0,
        };
        let tail_len = self.buf.len() - tail_start;
        if tail_len > self.max_frame_bytes {
            self.buf.truncate(tail_start);
            return Err(FrameError::FrameTooLarge {
                limit: self.max_frame_bytes,
                dropped: tail_len,
            });
        }

        Ok(())
    }

    /// Yield the next complete message, or None when no newline remains.
    ///
    /// The prefix up to the first newline is trimmed of trailing
    /// whitespace (` \t\r\n`); empty frames are discarded and scanning
    /// continues. Invalid UTF-8 drops the frame and reports an error.
    pub fn next_message(&mut self) -> Result<Option<String>, FrameError> {
        while let Some(pos) = self.buf.iter().position(|&b| b == b'\n') {
            let line: Vec<u8> = self.buf.drain(..=pos).take(pos).collect();

            let text = match String::from_utf8(line) {
                Ok(text) => text,
                Err(_) => return Err(FrameError::InvalidUtf8),
            };

            let trimmed = text.trim_end_matches([' ', '\t', '\r', '\n']);
            if !trimmed.is_empty() {
                return Ok(Some(trimmed.to_string()));
            }
            // Empty frame, keep scanning
        }
        Ok(None)
    }

    /// Number of residual bytes awaiting a newline.
    pub fn residual_len(&self) -> usize {
        self.buf.len()
    }

    /// Drop the residual buffer.
    ///
    /// Called on disconnect: a partial message without a trailing newline
    /// is discarded, never yielded. This matches the feed's documented
    /// behavior and is not a defect to fix here.
    pub fn reset(&mut self) {
        self.buf.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn drain(framer: &mut LineFramer) -> Vec<String> {
        let mut out = Vec::new();
        while let Ok(Some(msg)) = framer.next_message() {
            out.push(msg);
        }
        out
    }

    #[test]
    fn test_single_message() {
        let mut framer = LineFramer::new(4096);
        framer.extend(b"Vehicle.Speed=42.5\n").unwrap();
        assert_eq!(drain(&mut framer), vec!["Vehicle.Speed=42.5"]);
        assert_eq!(framer.residual_len(), 0);
    }

    #[test]
    fn test_chunked_message_yields_once_newline_arrives() {
        let mut framer = LineFramer::new(4096);

        framer.extend(b"Vehicle.Spe").unwrap();
        assert_eq!(framer.next_message().unwrap(), None);

        framer.extend(b"ed=42").unwrap();
        assert_eq!(framer.next_message().unwrap(), None);

        framer.extend(b".5\n").unwrap();
        assert_eq!(
            framer.next_message().unwrap(),
            Some("Vehicle.Speed=42.5".to_string())
        );
    }

    #[test]
    fn test_multiple_messages_in_one_chunk() {
        let mut framer = LineFramer::new(4096);
        framer
            .extend(b"Vehicle.Speed=42.5\nVehicle.Cabin.IsNightMode=true\n")
            .unwrap();
        assert_eq!(
            drain(&mut framer),
            vec!["Vehicle.Speed=42.5", "Vehicle.Cabin.IsNightMode=true"]
        );
    }

    #[test]
    fn test_trailing_whitespace_trimmed() {
        let mut framer = LineFramer::new(4096);
        framer.extend(b"Vehicle.Speed=42.5 \t\r\n").unwrap();
        assert_eq!(
            framer.next_message().unwrap(),
            Some("Vehicle.Speed=42.5".to_string())
        );
    }

    #[test]
    fn test_empty_frames_discarded() {
        let mut framer = LineFramer::new(4096);
        framer.extend(b"\n  \r\n\nVehicle.Speed=1\n").unwrap();
        assert_eq!(drain(&mut framer), vec!["Vehicle.Speed=1"]);
    }

    #[test]
    fn test_residual_retained_between_messages() {
        let mut framer = LineFramer::new(4096);
        framer.extend(b"a=1\nb=").unwrap();
        assert_eq!(framer.next_message().unwrap(), Some("a=1".to_string()));
        assert_eq!(framer.next_message().unwrap(), None);
        assert_eq!(framer.residual_len(), 2);

        framer.extend(b"2\n").unwrap();
        assert_eq!(framer.next_message().unwrap(), Some("b=2".to_string()));
    }

    #[test]
    fn test_reset_drops_partial() {
        let mut framer = LineFramer::new(4096);
        framer.extend(b"Vehicle.Speed=4").unwrap();
        framer.reset();
        assert_eq!(framer.residual_len(), 0);

        framer.extend(b"Vehicle.Speed=5\n").unwrap();
        assert_eq!(
            framer.next_message().unwrap(),
            Some("Vehicle.Speed=5".to_string())
        );
    }

    #[test]
    fn test_oversize_tail_discarded() {
        let mut framer = LineFramer::new(8);
        let err = framer.extend(b"0123456789abcdef").unwrap_err();
        assert!(matches!(err, FrameError::FrameTooLarge { limit: 8, .. }));
        assert_eq!(framer.residual_len(), 0);

        // Complete frames before the oversize tail survive
        let mut framer = LineFramer::new(8);
        assert!(framer.extend(b"a=1\n0123456789abcdef").is_err());
        assert_eq!(framer.next_message().unwrap(), Some("a=1".to_string()));
        assert_eq!(framer.next_message().unwrap(), None);
    }

    #[test]
    fn test_invalid_utf8_reported() {
        let mut framer = LineFramer::new(4096);
        framer.extend(&[0xFF, 0xFE, b'\n']).unwrap();
        assert_eq!(framer.next_message().unwrap_err(), FrameError::InvalidUtf8);
        // Framer recovers for the next line
        framer.extend(b"a=1\n").unwrap();
        assert_eq!(framer.next_message().unwrap(), Some("a=1".to_string()));
    }
}
