//! Error types for multiboot image construction.

use crate::header::NUM_IMAGES;
use std::io;
use thiserror::Error;

/// Everything that can go wrong between reading the inputs and writing the
/// last output byte. Configuration and input problems are user-reportable;
/// [`BuildError::BackwardPad`] is not, it means the planner produced a
/// layout the emitter cannot realize.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum BuildError {
    #[error("no input images supplied")]
    NoImages,
    #[error("too many images supplied (maximum is {})", NUM_IMAGES)]
    TooManyImages { count: usize },
    #[error("can't select power-on/reset boot image in cold boot mode")]
    ColdbootPorConflict,
    #[error("specified non-existing image for power-on/reset ({por} of {count} supplied)")]
    PorOutOfRange { por: u8, count: usize },
    #[error("can't open input image `{name}`")]
    Open {
        name: String,
        #[source]
        source: io::Error,
    },
    #[error("can't seek on input image `{name}`")]
    Size {
        name: String,
        #[source]
        source: io::Error,
    },
    #[error("can't read input image `{name}`")]
    Read {
        name: String,
        #[source]
        source: io::Error,
    },
    #[error("input image `{name}` doesn't contain any data")]
    EmptyImage { name: String },
    #[error("image `{name}` would start at {offset:#x}, past the 24-bit boot address space")]
    AddressRange { name: String, offset: u64 },
    #[error("output image would be {len} bytes, past the 32-bit flash address space")]
    TooLarge { len: u64 },
    #[error("can't write output image")]
    Write(#[source] io::Error),
    #[error("internal error: trying to pad backwards (cursor {cursor:#x}, target {target:#x})")]
    BackwardPad { cursor: u64, target: u64 },
}

pub type Result<T> = std::result::Result<T, BuildError>;
