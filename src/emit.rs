//! Output stream emission: cursor-tracked writing with explicit padding.

use crate::error::{BuildError, Result};
use crate::header::HEADER_SIZE;
use crate::layout::Layout;
use std::io::{Read, Write};
use tracing::debug;

/// Gap fill between planned sections. 0xff matches erased SPI flash.
pub const FILL_BYTE: u8 = 0xff;

/// Write sink with a tracked absolute position. All output goes through
/// here, so sections can be padded out to their planned start offset and a
/// pad target behind the cursor is caught instead of corrupting the image.
pub struct CursorWriter<W> {
    sink: W,
    position: u64,
}

impl<W: Write> CursorWriter<W> {
    pub fn new(sink: W) -> Self {
        Self { sink, position: 0 }
    }

    /// Bytes written so far.
    pub fn position(&self) -> u64 {
        self.position
    }

    pub fn write_all(&mut self, buf: &[u8]) -> Result<()> {
        self.sink.write_all(buf).map_err(BuildError::Write)?;
        self.position += buf.len() as u64;
        Ok(())
    }

    /// Write `fill` until the cursor reaches `target`.
    pub fn pad_to(&mut self, target: u64, fill: u8) -> Result<()> {
        if target < self.position {
            return Err(BuildError::BackwardPad {
                cursor: self.position,
                target,
            });
        }
        let chunk = [fill; 64];
        while self.position < target {
            let n = (target - self.position).min(chunk.len() as u64) as usize;
            self.write_all(&chunk[..n])?;
        }
        Ok(())
    }

    pub fn flush(&mut self) -> Result<()> {
        self.sink.flush().map_err(BuildError::Write)
    }

    pub fn into_inner(self) -> W {
        self.sink
    }
}

/// Serialize a planned layout: the fixed header slots first, then every
/// image at its planned offset, with gaps filled by [`FILL_BYTE`].
pub fn emit<R: Read, W: Write>(mut layout: Layout<R>, sink: W) -> Result<()> {
    let mut out = CursorWriter::new(sink);
    for (index, header) in layout.headers.iter().enumerate() {
        out.pad_to((index * HEADER_SIZE) as u64, FILL_BYTE)?;
        header.write(&mut out)?;
    }
    for image in layout.images.iter_mut() {
        out.pad_to(u64::from(image.offset()), FILL_BYTE)?;
        image.copy_to(&mut out)?;
    }
    out.flush()?;
    debug!("emitted {} bytes", out.position());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_write_all_advances_the_position() {
        let mut out = CursorWriter::new(Vec::new());
        out.write_all(b"abc").unwrap();
        assert_eq!(out.position(), 3);
        assert_eq!(out.into_inner(), b"abc");
    }

    #[test]
    fn test_pad_to_fills_forward() {
        let mut out = CursorWriter::new(Vec::new());
        out.write_all(b"ab").unwrap();
        out.pad_to(5, FILL_BYTE).unwrap();
        assert_eq!(out.position(), 5);
        assert_eq!(out.into_inner(), [b'a', b'b', 0xff, 0xff, 0xff]);
    }

    #[test]
    fn test_pad_to_the_current_position_writes_nothing() {
        let mut out = CursorWriter::new(Vec::new());
        out.write_all(b"ab").unwrap();
        out.pad_to(2, FILL_BYTE).unwrap();
        assert_eq!(out.into_inner().len(), 2);
    }

    #[test]
    fn test_pad_spanning_several_chunks() {
        let mut out = CursorWriter::new(Vec::new());
        out.pad_to(200, 0x00).unwrap();
        let bytes = out.into_inner();
        assert_eq!(bytes.len(), 200);
        assert!(bytes.iter().all(|&b| b == 0x00));
    }

    #[test]
    fn test_padding_backwards_is_an_internal_error() {
        let mut out = CursorWriter::new(Vec::new());
        out.write_all(b"abc").unwrap();
        let err = out.pad_to(1, FILL_BYTE).unwrap_err();
        assert!(matches!(
            err,
            BuildError::BackwardPad {
                cursor: 3,
                target: 1,
            }
        ));
    }
}
