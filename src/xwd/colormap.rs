//! The color table following the XWD header.

use std::fmt;
use std::io::Read;
use std::ops::Deref;

use image::Rgb;

use super::{read_exact_or, Header, XwdError};

/// Size of one color record in the file.
pub const COLOR_ENTRY_SIZE: usize = 12;

// Color records are read one at a time; this bounds how much is reserved
// before the stream has shown the records actually exist.
const MAX_PREALLOCATED_COLORS: usize = 4096;

/// One slot of the color table, an X11 `XColor`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct ColorEntry {
    /// Pixel value this slot is addressed by.
    pub pixel: u32,
    /// Channels use the full 16 bit range.
    pub red: u16,
    pub green: u16,
    pub blue: u16,
    pub flags: u8,
    pub padding: u8,
}

impl ColorEntry {
    pub const DO_RED: u8 = 1;
    pub const DO_GREEN: u8 = 2;
    pub const DO_BLUE: u8 = 4;

    fn from_bytes(b: &[u8; COLOR_ENTRY_SIZE]) -> ColorEntry {
        ColorEntry {
            pixel: u32::from_be_bytes([b[0], b[1], b[2], b[3]]),
            red: u16::from_be_bytes([b[4], b[5]]),
            green: u16::from_be_bytes([b[6], b[7]]),
            blue: u16::from_be_bytes([b[8], b[9]]),
            flags: b[10],
            padding: b[11],
        }
    }

    /// Narrow to 8 bits per channel by keeping the high byte.
    pub fn to_rgb(&self) -> Rgb<u8> {
        Rgb([
            (self.red >> 8) as u8,
            (self.green >> 8) as u8,
            (self.blue >> 8) as u8,
        ])
    }
}

impl fmt::Display for ColorEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "pixel {:#x}: rgb({:#06x}, {:#06x}, {:#06x}) flags {:03b}",
            self.pixel, self.red, self.green, self.blue, self.flags
        )
    }
}

/// The ordered color table of an XWD file.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ColorTable {
    entries: Vec<ColorEntry>,
}

impl ColorTable {
    pub fn new(entries: Vec<ColorEntry>) -> ColorTable {
        ColorTable { entries }
    }
}

impl Deref for ColorTable {
    type Target = [ColorEntry];

    fn deref(&self) -> &[ColorEntry] {
        &self.entries
    }
}

/// Read the color table of an image whose header has already been consumed.
///
/// The number of records is `number_of_colors`, not `color_map_entries`:
/// some producers fill in `color_map_entries` without writing a table, and
/// xwd(1) itself writes `number_of_colors` records.
pub fn read_color_table<R: Read>(r: &mut R, header: &Header) -> Result<ColorTable, XwdError> {
    let count = header.number_of_colors as usize;
    tracing::debug!(count, "xwd: reading color table");

    let mut entries = Vec::with_capacity(count.min(MAX_PREALLOCATED_COLORS));
    let mut record = [0u8; COLOR_ENTRY_SIZE];
    for _ in 0..count {
        read_exact_or(r, &mut record, "reading color entry")?;
        entries.push(ColorEntry::from_bytes(&record));
    }

    Ok(ColorTable::new(entries))
}
