//! Input bitstream descriptors.

use crate::emit::CursorWriter;
use crate::error::{BuildError, Result};
use std::fs::File;
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::Path;

/// Transfer chunk for payload copying.
const COPY_CHUNK: usize = 8192;

/// One input bitstream: a byte source, its measured length, and (once the
/// planner has run) its placement in the output image. The payload itself is
/// opaque.
#[derive(Debug)]
pub struct Image<R> {
    name: String,
    source: R,
    len: u64,
    offset: Option<u32>,
}

impl Image<File> {
    /// Open a bitstream from disk.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let name = path.display().to_string();
        let file = File::open(path).map_err(|source| BuildError::Open {
            name: name.clone(),
            source,
        })?;
        Self::from_source(name, file)
    }
}

impl<R: Read + Seek> Image<R> {
    /// Wrap an already-open byte source, measuring its length up front.
    /// Zero-length sources are rejected; a boot slot with no payload cannot
    /// configure anything.
    pub fn from_source(name: impl Into<String>, mut source: R) -> Result<Self> {
        let name = name.into();
        let len = source
            .seek(SeekFrom::End(0))
            .map_err(|source| BuildError::Size {
                name: name.clone(),
                source,
            })?;
        source
            .seek(SeekFrom::Start(0))
            .map_err(|source| BuildError::Size {
                name: name.clone(),
                source,
            })?;
        if len == 0 {
            return Err(BuildError::EmptyImage { name });
        }
        Ok(Self {
            name,
            source,
            len,
            offset: None,
        })
    }
}

impl<R> Image<R> {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Payload length in bytes, as measured at construction.
    pub fn len(&self) -> u64 {
        self.len
    }

    /// Record the planner's placement. Assigned exactly once.
    pub(crate) fn place(&mut self, offset: u32) {
        debug_assert!(self.offset.is_none(), "image placed twice");
        self.offset = Some(offset);
    }

    /// Start offset in the output image.
    pub fn offset(&self) -> u32 {
        self.offset.expect("image queried before placement")
    }
}

impl<R: Read> Image<R> {
    /// Stream the payload into the output, exactly the length measured at
    /// construction. A source that comes up short is an input error, not a
    /// layout adjustment.
    pub(crate) fn copy_to<W: Write>(&mut self, out: &mut CursorWriter<W>) -> Result<()> {
        let mut buf = [0u8; COPY_CHUNK];
        let mut remaining = self.len;
        while remaining > 0 {
            let want = remaining.min(COPY_CHUNK as u64) as usize;
            let got = match self.source.read(&mut buf[..want]) {
                Ok(0) => {
                    return Err(BuildError::Read {
                        name: self.name.clone(),
                        source: io::Error::new(
                            io::ErrorKind::UnexpectedEof,
                            "image shorter than its measured length",
                        ),
                    });
                }
                Ok(n) => n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => {
                    return Err(BuildError::Read {
                        name: self.name.clone(),
                        source: e,
                    });
                }
            };
            out.write_all(&buf[..got])?;
            remaining -= got as u64;
        }
        Ok(())
    }
}
