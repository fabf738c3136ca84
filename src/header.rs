//! Boot header table entries and their on-flash encoding.
//!
//! See Lattice TN-02001, "iCE40 Programming and Configuration", for the
//! warm/cold boot command sequence these headers encode.

use crate::emit::CursorWriter;
use crate::error::Result;
use crate::image::Image;
use crate::layout::align_up;
use std::io::Write;

/// Number of selectable boot images in the multiboot layout.
pub const NUM_IMAGES: usize = 4;
/// Header table slots: the power-on/reset header plus one per image.
pub const NUM_HEADERS: usize = NUM_IMAGES + 1;
/// Every header occupies one fixed 32-byte slot.
pub const HEADER_SIZE: usize = 32;
pub(crate) const HEADER_SIZE_BITS: u32 = 5;
const _: () = const { assert!(HEADER_SIZE == 1 << HEADER_SIZE_BITS) };

/// The boot-address command carries three address bytes.
pub const MAX_BOOT_ADDRESS: u32 = 0xff_ffff;

proc_bitfield::bitfield! {
    /// Flag byte of the boot-mode command.
    #[derive(Copy, Clone, bytemuck::Pod, bytemuck::Zeroable)]
    pub struct BootMode(u8): Debug, FromStorage, IntoStorage, DerefStorage {
        coldboot: bool @ 4,
    }
}
impl BootMode {
    pub const EMPTY: Self = Self(0);
}

/// Command sequence of a populated header slot. Layout in memory matches the
/// configuration interface byte-for-byte, so a `&BootCommands` can be cast
/// straight to a byte slice (using e.g. [`bytemuck::bytes_of`]) and written
/// out.
#[derive(Debug, Copy, Clone, bytemuck::Pod, bytemuck::Zeroable)]
#[repr(C)]
struct BootCommands {
    preamble: [u8; 4],
    boot_mode_op: [u8; 2],
    boot_mode: BootMode,
    boot_address_op: [u8; 2],
    boot_address: [u8; 3],
    bank_offset: [u8; 3],
    reboot: [u8; 2],
}
const _: () = const { assert!(size_of::<BootCommands>() == 17) };

impl BootCommands {
    // Command opcodes understood by the configuration engine
    const PREAMBLE: [u8; 4] = [0x7e, 0xaa, 0x99, 0x7e];
    const BOOT_MODE_OP: [u8; 2] = [0x92, 0x00];
    const BOOT_ADDRESS_OP: [u8; 2] = [0x44, 0x03];
    const BANK_OFFSET: [u8; 3] = [0x82, 0x00, 0x00];
    const REBOOT: [u8; 2] = [0x01, 0x08];

    pub fn new(jump_target: u32, coldboot: bool) -> Self {
        assert!(
            jump_target <= MAX_BOOT_ADDRESS,
            "Jump target does not fit the 24-bit boot-address command"
        );
        let [_, hi, mid, lo] = jump_target.to_be_bytes();
        Self {
            preamble: Self::PREAMBLE,
            boot_mode_op: Self::BOOT_MODE_OP,
            boot_mode: BootMode::EMPTY.with_coldboot(coldboot),
            boot_address_op: Self::BOOT_ADDRESS_OP,
            boot_address: [hi, mid, lo],
            bank_offset: Self::BANK_OFFSET,
            reboot: Self::REBOOT,
        }
    }
}

/// One slot of the boot header table.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum BootHeader {
    /// Never assigned an image. Serializes to nothing; the slot is left to
    /// the emitter's gap fill.
    Empty,
    /// Boots the image placed at `jump_target`.
    Populated { jump_target: u32, coldboot: bool },
}

impl BootHeader {
    /// Header for a placed image. Coldboot starts cleared; the planner sets
    /// it on the power-on/reset slot only.
    pub fn from_image<R>(image: &Image<R>) -> Self {
        Self::Populated {
            jump_target: image.offset(),
            coldboot: false,
        }
    }

    /// Mark this header as the coldboot entry. No-op on empty slots.
    pub fn set_coldboot(&mut self) {
        match self {
            Self::Populated { coldboot, .. } => *coldboot = true,
            Self::Empty => {}
        }
    }

    /// Serialize into the current slot. The caller has already padded the
    /// cursor to the slot start.
    pub fn write<W: Write>(&self, out: &mut CursorWriter<W>) -> Result<()> {
        match *self {
            Self::Empty => Ok(()),
            Self::Populated {
                jump_target,
                coldboot,
            } => {
                let commands = BootCommands::new(jump_target, coldboot);
                out.write_all(bytemuck::bytes_of(&commands))?;
                // A populated header owns its whole slot; the tail is zeroed
                // rather than left to the 0xff gap fill.
                out.pad_to(align_up(out.position(), HEADER_SIZE_BITS), 0x00)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::emit::CursorWriter;

    fn render(header: &BootHeader) -> Vec<u8> {
        let mut out = CursorWriter::new(Vec::new());
        header.write(&mut out).unwrap();
        out.into_inner()
    }

    #[test]
    fn test_empty_header_writes_nothing() {
        assert!(render(&BootHeader::Empty).is_empty());
    }

    #[test]
    fn test_populated_header_fills_one_slot() {
        let bytes = render(&BootHeader::Populated {
            jump_target: 0xa0,
            coldboot: false,
        });
        assert_eq!(bytes.len(), HEADER_SIZE);
        assert_eq!(
            &bytes[..17],
            &[
                0x7e, 0xaa, 0x99, 0x7e, // preamble
                0x92, 0x00, 0x00, // boot mode
                0x44, 0x03, 0x00, 0x00, 0xa0, // boot address
                0x82, 0x00, 0x00, // bank offset
                0x01, 0x08, // reboot
            ]
        );
        assert!(bytes[17..].iter().all(|&b| b == 0x00));
    }

    #[test]
    fn test_coldboot_sets_bit_four_of_the_mode_byte() {
        let bytes = render(&BootHeader::Populated {
            jump_target: 0xa0,
            coldboot: true,
        });
        assert_eq!(bytes[6], 0x10);
    }

    #[test]
    fn test_address_bytes_are_most_significant_first() {
        let bytes = render(&BootHeader::Populated {
            jump_target: 0x123456,
            coldboot: false,
        });
        assert_eq!(&bytes[9..12], &[0x12, 0x34, 0x56]);
    }

    #[test]
    fn test_header_written_mid_stream_pads_to_its_own_slot_end() {
        let mut out = CursorWriter::new(Vec::new());
        out.pad_to(HEADER_SIZE as u64, 0xff).unwrap();
        let header = BootHeader::Populated {
            jump_target: 0xa0,
            coldboot: false,
        };
        header.write(&mut out).unwrap();
        assert_eq!(out.position(), 2 * HEADER_SIZE as u64);
    }

    #[test]
    fn test_set_coldboot_leaves_empty_slots_empty() {
        let mut header = BootHeader::Empty;
        header.set_coldboot();
        assert_eq!(header, BootHeader::Empty);
    }
}
