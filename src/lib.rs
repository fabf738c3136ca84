//! Builder for iCE40 multiboot configuration images.
//!
//! Packs up to four bitstreams into one flash image: a fixed table of five
//! boot headers (slot 0 is the power-on/reset entry) followed by the
//! payloads, placed in supplied order under a power-of-two alignment rule.
//! Lattice TN-02001, "iCE40 Programming and Configuration", describes the
//! boot sequence the header table drives.

pub mod emit;
pub mod error;
pub mod header;
pub mod image;
pub mod layout;

pub use emit::{CursorWriter, FILL_BYTE, emit};
pub use error::{BuildError, Result};
pub use header::{BootHeader, HEADER_SIZE, MAX_BOOT_ADDRESS, NUM_HEADERS, NUM_IMAGES};
pub use image::Image;
pub use layout::{BuildOptions, Layout, align_up, plan};

use std::io::{Read, Write};

/// Plan and write a complete multiboot image in one call.
pub fn build<R: Read, W: Write>(
    images: Vec<Image<R>>,
    options: &BuildOptions,
    sink: W,
) -> Result<()> {
    let layout = layout::plan(images, options)?;
    emit::emit(layout, sink)
}
