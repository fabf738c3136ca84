//! Layout planning: image placement and header table population.

use crate::error::{BuildError, Result};
use crate::header::{BootHeader, HEADER_SIZE, MAX_BOOT_ADDRESS, NUM_HEADERS, NUM_IMAGES};
use crate::image::Image;
use tracing::info;

/// Round `offset` up to the next multiple of `2^bits`. `bits == 0` is a
/// no-op.
pub fn align_up(offset: u64, bits: u32) -> u64 {
    debug_assert!(bits < 64);
    let mask = (1u64 << bits) - 1;
    if offset & mask != 0 {
        (offset | mask) + 1
    } else {
        offset
    }
}

/// Placement knobs, as handed over by the CLI.
#[derive(Debug, Default, Copy, Clone)]
pub struct BuildOptions {
    /// Align image starts at `2^align_bits` bytes.
    pub align_bits: u32,
    /// Also align the first image, instead of packing it directly after the
    /// header table.
    pub align_first: bool,
    /// Cold boot: the booted image is selected by the CBSEL0/CBSEL1 pins, so
    /// no power-on/reset image may be picked here.
    pub coldboot: bool,
    /// Index of the image booted on power-on/reset.
    pub por_image: u8,
}

/// A fully planned output image: the header table, the placed inputs, and
/// the total length.
#[derive(Debug)]
pub struct Layout<R> {
    pub(crate) headers: [BootHeader; NUM_HEADERS],
    pub(crate) images: Vec<Image<R>>,
    total_len: u64,
}

impl<R> Layout<R> {
    pub fn headers(&self) -> &[BootHeader; NUM_HEADERS] {
        &self.headers
    }

    pub fn images(&self) -> &[Image<R>] {
        &self.images
    }

    /// Output length in bytes, gap fill included.
    pub fn total_len(&self) -> u64 {
        self.total_len
    }
}

/// Validate the configuration, place every image, and populate the header
/// table. Placement is greedy and in supplied order: each image lands at the
/// running offset, which then advances by its length and rounds up to the
/// alignment granularity.
pub fn plan<R>(mut images: Vec<Image<R>>, options: &BuildOptions) -> Result<Layout<R>> {
    let count = images.len();
    if count == 0 {
        return Err(BuildError::NoImages);
    }
    if count > NUM_IMAGES {
        return Err(BuildError::TooManyImages { count });
    }
    if options.coldboot && options.por_image != 0 {
        return Err(BuildError::ColdbootPorConflict);
    }
    if usize::from(options.por_image) >= count {
        return Err(BuildError::PorOutOfRange {
            por: options.por_image,
            count,
        });
    }

    // Place images
    let mut offset = (NUM_HEADERS * HEADER_SIZE) as u64;
    if options.align_first {
        offset = align_up(offset, options.align_bits);
    }
    let mut total_len = 0;
    for (index, image) in images.iter_mut().enumerate() {
        if offset > u64::from(MAX_BOOT_ADDRESS) {
            return Err(BuildError::AddressRange {
                name: image.name().to_owned(),
                offset,
            });
        }
        image.place(offset as u32);
        total_len = offset + image.len();
        offset = align_up(total_len, options.align_bits);
        info!(
            "place image {index} at {:#08x} .. {:#08x}",
            image.offset(),
            offset
        );
    }
    if total_len > u64::from(u32::MAX) {
        return Err(BuildError::TooLarge { len: total_len });
    }

    // Populate headers
    let mut headers = [BootHeader::Empty; NUM_HEADERS];
    for (index, image) in images.iter().enumerate() {
        headers[index + 1] = BootHeader::from_image(image);
    }
    headers[0] = headers[usize::from(options.por_image) + 1];
    // Unused slots copy the power-on/reset header before the coldboot flag
    // lands on it, so the copies never carry the flag.
    for index in count..NUM_IMAGES {
        headers[index + 1] = headers[0];
    }
    if options.coldboot {
        headers[0].set_coldboot();
    }

    Ok(Layout {
        headers,
        images,
        total_len,
    })
}
