//! Mark/reset byte source abstraction for record framing.
//!
//! ISO 2709 framing needs to re-read a record's opening bytes after the
//! leader has been inspected: the frame extractor marks the stream, reads the
//! 24-byte leader, then rewinds and reads the full record. [`ByteStream`]
//! captures exactly that contract, and [`BufferedByteStream`] implements it
//! over any [`std::io::Read`] by keeping a bounded replay buffer, so
//! non-seekable transports (pipes, sockets) work the same as files.
//!
//! # Examples
//!
//! ```
//! use permarc::byte_stream::{BufferedByteStream, ByteStream};
//! use std::io::Cursor;
//!
//! let mut stream = BufferedByteStream::new(Cursor::new(b"abcdef".to_vec()));
//! stream.mark(4);
//! assert_eq!(stream.read_byte()?, Some(b'a'));
//! assert_eq!(stream.read_byte()?, Some(b'b'));
//! stream.reset()?;
//! assert_eq!(stream.read_byte()?, Some(b'a'));
//! # Ok::<(), permarc::MarcError>(())
//! ```

use crate::error::{MarcError, Result};
use std::io::Read;

/// A byte source that can replay a bounded window of recently read bytes.
///
/// `mark(limit)` declares that the next `limit` bytes may be replayed;
/// `reset` rewinds to the most recent mark. Marking again before a reset
/// replaces the prior mark at the current position. Reading more than
/// `limit` bytes past a mark invalidates it, and a later `reset` fails
/// deterministically instead of rewinding to a partial window.
pub trait ByteStream {
    /// Declare that the next `limit` bytes may be replayed via [`ByteStream::reset`].
    fn mark(&mut self, limit: usize);

    /// Rewind to the most recent mark.
    ///
    /// # Errors
    ///
    /// Returns [`MarcError::InvalidMark`] if no mark is active or the mark
    /// was invalidated by reading past its limit.
    fn reset(&mut self) -> Result<()>;

    /// Read the next byte, or `None` at end of stream.
    fn read_byte(&mut self) -> Result<Option<u8>>;

    /// Fill `buf` completely.
    ///
    /// On failure the bytes already consumed stay within the active mark
    /// window, so a caller can `reset` and observe the partial prefix with
    /// sequential [`ByteStream::read_byte`] calls.
    ///
    /// # Errors
    ///
    /// Returns [`MarcError::UnexpectedEof`] if the stream ends before `buf`
    /// is full.
    fn read_exact(&mut self, buf: &mut [u8]) -> Result<()> {
        for (filled, slot) in buf.iter_mut().enumerate() {
            match self.read_byte()? {
                Some(b) => *slot = b,
                None => {
                    return Err(MarcError::UnexpectedEof(format!(
                        "expected {} bytes, stream ended after {filled}",
                        buf.len()
                    )));
                },
            }
        }
        Ok(())
    }
}

/// [`ByteStream`] over any [`std::io::Read`], with a bounded replay buffer.
///
/// Bytes read while a mark is active are retained (up to the mark limit) so
/// `reset` can rewind without the underlying transport being seekable. For
/// unbuffered sources such as [`std::fs::File`], wrap the inner reader in a
/// [`std::io::BufReader`] first; this type reads one byte at a time.
#[derive(Debug)]
pub struct BufferedByteStream<R> {
    inner: R,
    /// Bytes retained since the active mark, replayed before the inner reader.
    replay: Vec<u8>,
    /// Read cursor within `replay`.
    pos: usize,
    /// Replay limit of the active mark; `None` when no mark is usable.
    mark_limit: Option<usize>,
}

impl<R: Read> BufferedByteStream<R> {
    /// Create a new stream adapter over `inner`.
    pub fn new(inner: R) -> Self {
        BufferedByteStream {
            inner,
            replay: Vec::new(),
            pos: 0,
            mark_limit: None,
        }
    }

    /// Consume the adapter, returning the underlying reader.
    pub fn into_inner(self) -> R {
        self.inner
    }
}

impl<R: Read> ByteStream for BufferedByteStream<R> {
    fn mark(&mut self, limit: usize) {
        // Bytes already consumed leave the window; unread replayed bytes are
        // upcoming stream content and stay, counting toward the new limit.
        self.replay.drain(..self.pos);
        self.pos = 0;
        self.mark_limit = Some(limit);
    }

    fn reset(&mut self) -> Result<()> {
        if self.mark_limit.is_none() {
            return Err(MarcError::InvalidMark(
                "reset without an active mark, or the mark limit was exceeded".to_string(),
            ));
        }
        self.pos = 0;
        Ok(())
    }

    fn read_byte(&mut self) -> Result<Option<u8>> {
        if self.pos < self.replay.len() {
            let b = self.replay[self.pos];
            self.pos += 1;
            return Ok(Some(b));
        }

        let mut byte = [0u8; 1];
        loop {
            match self.inner.read(&mut byte) {
                Ok(0) => return Ok(None),
                Ok(_) => break,
                Err(e) if e.kind() == std::io::ErrorKind::Interrupted => {},
                Err(e) => return Err(MarcError::IoError(e)),
            }
        }

        match self.mark_limit {
            Some(limit) if self.replay.len() < limit => {
                self.replay.push(byte[0]);
                self.pos += 1;
            },
            Some(_) => {
                // Window exhausted: the mark can no longer replay everything
                // read since it was set, so it must stop being honored.
                self.mark_limit = None;
                self.replay.clear();
                self.pos = 0;
            },
            None => {},
        }

        Ok(Some(byte[0]))
    }
}
