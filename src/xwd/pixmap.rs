//! Pixel data of an XWD file, in either of its two layouts.

use std::io::{self, Read};
use std::sync::Arc;

use super::{read_exact_or, ColorEntry, ColorTable, Header, XwdError};

/// The only pixel size supported for direct color images.
pub const RAW_BITS_PER_PIXEL: u32 = 24;

const RAW_BYTES_PER_PIXEL: usize = RAW_BITS_PER_PIXEL as usize / 8;

// Pixels are read incrementally; don't reserve more than this up front.
const MAX_PREALLOCATED_PIXELS: usize = 1 << 20;

/// Decoded pixel storage.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Pixmap {
    /// Every pixel carries its own color, rebuilt from the channel masks.
    Raw(Vec<ColorEntry>),
    /// Every pixel is an index into a color table shared with the caller.
    Mapped {
        indices: Vec<u8>,
        colors: Arc<ColorTable>,
    },
}

impl Pixmap {
    /// Number of pixels stored.
    pub fn len(&self) -> usize {
        match self {
            Pixmap::Raw(pixels) => pixels.len(),
            Pixmap::Mapped { indices, .. } => indices.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_mapped(&self) -> bool {
        matches!(self, Pixmap::Mapped { .. })
    }

    /// Color of the pixel at linear position `index` (row-major).
    ///
    /// # Panics
    ///
    /// If `index` is not below [`Pixmap::len`].
    pub fn color(&self, index: usize) -> Result<ColorEntry, XwdError> {
        match self {
            Pixmap::Raw(pixels) => Ok(pixels[index]),
            Pixmap::Mapped { indices, colors } => colors
                .get(usize::from(indices[index]))
                .copied()
                .ok_or(XwdError::MalformedInput("palette index out of range")),
        }
    }
}

/// Bit position of the lowest set bit of `mask`, or 0 for an empty mask.
pub fn mask_shift(mask: u32) -> u32 {
    if mask == 0 {
        0
    } else {
        mask.trailing_zeros()
    }
}

/// Read the pixel data, choosing the layout from the header.
///
/// `colors` must be the table read right before; mapped pixmaps keep a
/// reference to it.
pub fn read_pixmap<R: Read>(
    r: &mut R,
    header: &Header,
    colors: &Arc<ColorTable>,
) -> Result<Pixmap, XwdError> {
    if header.is_mapped() {
        tracing::debug!(colors = colors.len(), "xwd: reading mapped pixmap");
        read_mapped(r, header, colors)
    } else {
        tracing::debug!("xwd: reading raw pixmap");
        read_raw(r, header)
    }
}

fn pixel_count(header: &Header) -> Result<usize, XwdError> {
    (header.pixmap_width as usize)
        .checked_mul(header.pixmap_height as usize)
        .ok_or(XwdError::MalformedInput("image dimensions overflow"))
}

fn read_raw<R: Read>(r: &mut R, header: &Header) -> Result<Pixmap, XwdError> {
    if header.bits_per_pixel != RAW_BITS_PER_PIXEL {
        return Err(XwdError::unsupported(
            "bits-per-pixel",
            header.bits_per_pixel,
        ));
    }

    let width = header.pixmap_width as usize;
    let count = pixel_count(header)?;
    let row_bytes = width
        .checked_mul(RAW_BYTES_PER_PIXEL)
        .ok_or(XwdError::MalformedInput("image dimensions overflow"))?;
    let padding = (header.bytes_per_line as usize)
        .checked_sub(row_bytes)
        .ok_or(XwdError::MalformedInput(
            "bytes per line shorter than pixel row",
        ))?;

    let masks = [header.red_mask, header.green_mask, header.blue_mask];
    let shifts = masks.map(mask_shift);
    let channel = |word: u32, c: usize| (((word & masks[c]) >> shifts[c]) << 8) as u16;

    tracing::trace!(row_bytes, padding, ?shifts, "xwd: raw row layout");

    let mut pixels = Vec::with_capacity(count.min(MAX_PREALLOCATED_PIXELS));
    // The high byte of each 32 bit pixel word is not stored.
    let mut word = [0u8; 4];
    for _ in 0..header.pixmap_height {
        for _ in 0..width {
            read_exact_or(r, &mut word[1..], "reading pixel row")?;
            let packed = u32::from_be_bytes(word);
            pixels.push(ColorEntry {
                pixel: pixels.len() as u32,
                red: channel(packed, 0),
                green: channel(packed, 1),
                blue: channel(packed, 2),
                flags: ColorEntry::DO_RED | ColorEntry::DO_GREEN | ColorEntry::DO_BLUE,
                padding: 0,
            });
        }
        skip(r, padding as u64)?;
    }

    Ok(Pixmap::Raw(pixels))
}

fn skip<R: Read>(r: &mut R, len: u64) -> Result<(), XwdError> {
    let skipped = io::copy(&mut r.by_ref().take(len), &mut io::sink()).map_err(XwdError::Io)?;
    if skipped != len {
        return Err(XwdError::TruncatedInput("reading pixel row"));
    }
    Ok(())
}

// Mapped rows are tightly packed: `bytes_per_line` is not applied.
fn read_mapped<R: Read>(
    r: &mut R,
    header: &Header,
    colors: &Arc<ColorTable>,
) -> Result<Pixmap, XwdError> {
    let count = pixel_count(header)?;
    tracing::debug!(count, "xwd: reading palette indices");

    let mut indices = Vec::with_capacity(count.min(MAX_PREALLOCATED_PIXELS));
    r.by_ref()
        .take(count as u64)
        .read_to_end(&mut indices)
        .map_err(XwdError::Io)?;
    if indices.len() != count {
        return Err(XwdError::TruncatedInput("reading palette indices"));
    }

    Ok(Pixmap::Mapped {
        indices,
        colors: Arc::clone(colors),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::xwd::fixture::{self, FileBuilder};
    use crate::xwd::{read_color_table, read_header};
    use std::io::Cursor;

    fn parse(data: Vec<u8>) -> Result<Pixmap, XwdError> {
        let mut cursor = Cursor::new(data);
        let header = read_header(&mut cursor)?;
        let colors = Arc::new(read_color_table(&mut cursor, &header)?);
        read_pixmap(&mut cursor, &header, &colors)
    }

    #[test]
    fn shift_of_masks() {
        assert_eq!(mask_shift(0), 0);
        assert_eq!(mask_shift(0xff), 0);
        assert_eq!(mask_shift(0xff00), 8);
        assert_eq!(mask_shift(0xff0000), 16);
        assert_eq!(mask_shift(0x3ff << 20), 20);
        assert_eq!(mask_shift(0x8000_0000), 31);
    }

    #[test]
    fn raw_channels_are_promoted() {
        let data = FileBuilder::raw(1, 1).data(&[0x11, 0x22, 0x33]).build();
        let pixmap = parse(data).unwrap();
        let color = pixmap.color(0).unwrap();
        assert_eq!(color.red, 0x1100);
        assert_eq!(color.green, 0x2200);
        assert_eq!(color.blue, 0x3300);
        assert_eq!(color.flags, 7);
    }

    #[test]
    fn raw_masks_select_channels() {
        // blue in the high byte, red in the low byte
        let data = FileBuilder::raw(2, 1)
            .set(fixture::RED_MASK, 0xff)
            .set(fixture::GREEN_MASK, 0xff00)
            .set(fixture::BLUE_MASK, 0xff0000)
            .data(&[0x0a, 0x0b, 0x0c, 0xff, 0x00, 0x80])
            .build();
        let pixmap = parse(data).unwrap();
        let first = pixmap.color(0).unwrap();
        assert_eq!((first.red, first.green, first.blue), (0x0c00, 0x0b00, 0x0a00));
        let second = pixmap.color(1).unwrap();
        assert_eq!(second.pixel, 1);
        assert_eq!((second.red, second.green, second.blue), (0x8000, 0, 0xff00));
    }

    #[test]
    fn raw_row_padding_is_skipped() {
        #[rustfmt::skip]
        let rows = [
            1, 2, 3, 4, 5, 6, 0xee, 0xee,
            7, 8, 9, 10, 11, 12, 0xee, 0xee,
        ];
        let data = FileBuilder::raw(2, 2)
            .set(fixture::BYTES_PER_LINE, 8)
            .data(&rows)
            .build();
        let pixmap = parse(data).unwrap();
        assert_eq!(pixmap.len(), 4);
        let reds: Vec<u16> = (0..4).map(|i| pixmap.color(i).unwrap().red).collect();
        assert_eq!(reds, [0x100, 0x400, 0x700, 0xa00]);
    }

    #[test]
    fn raw_missing_padding_is_truncation() {
        let data = FileBuilder::raw(1, 1)
            .set(fixture::BYTES_PER_LINE, 4)
            .data(&[1, 2, 3])
            .build();
        let err = parse(data).unwrap_err();
        assert!(matches!(err, XwdError::TruncatedInput("reading pixel row")));
    }

    #[test]
    fn raw_truncated_pixel() {
        let data = FileBuilder::raw(2, 1).data(&[1, 2, 3, 4]).build();
        let err = parse(data).unwrap_err();
        assert!(matches!(err, XwdError::TruncatedInput("reading pixel row")));
    }

    #[test]
    fn raw_short_stride() {
        let data = FileBuilder::raw(2, 1)
            .set(fixture::BYTES_PER_LINE, 5)
            .data(&[0; 6])
            .build();
        let err = parse(data).unwrap_err();
        assert!(matches!(err, XwdError::MalformedInput(_)));
    }

    #[test]
    fn raw_requires_24_bits() {
        let data = FileBuilder::raw(1, 1)
            .set(fixture::BITS_PER_PIXEL, 32)
            .data(&[0; 4])
            .build();
        let err = parse(data).unwrap_err();
        assert!(matches!(
            err,
            XwdError::UnsupportedFormat {
                field: "bits-per-pixel",
                value: 32
            }
        ));
    }

    #[test]
    fn color_map_entries_zero_forces_raw() {
        let colors = [ColorEntry::default(); 3];
        let data = FileBuilder::raw(1, 1)
            .colors(&colors)
            .data(&[0x10, 0x20, 0x30])
            .build();
        let pixmap = parse(data).unwrap();
        assert!(!pixmap.is_mapped());
        assert_eq!(pixmap.color(0).unwrap().green, 0x2000);
    }

    #[test]
    fn mapped_indices_share_table() {
        let colors: Vec<ColorEntry> = (0..8u16)
            .map(|i| ColorEntry {
                pixel: u32::from(i),
                red: i << 13,
                green: 0xffff - (i << 13),
                blue: 0x1000 * i,
                flags: 7,
                padding: 0,
            })
            .collect();
        let indices = [0, 1, 2, 3, 4, 5, 6, 7, 7, 6, 5, 4];
        let data = FileBuilder::mapped(4, 3, &colors).data(&indices).build();

        let mut cursor = Cursor::new(data);
        let header = read_header(&mut cursor).unwrap();
        let table = Arc::new(read_color_table(&mut cursor, &header).unwrap());
        assert_eq!(table.len(), 8);
        let pixmap = read_pixmap(&mut cursor, &header, &table).unwrap();

        assert!(pixmap.is_mapped());
        assert_eq!(Arc::strong_count(&table), 2);
        for (i, &index) in indices.iter().enumerate() {
            assert_eq!(pixmap.color(i).unwrap(), colors[usize::from(index)]);
        }
    }

    #[test]
    fn mapped_ignores_bytes_per_line() {
        let colors = [ColorEntry::default(); 2];
        let data = FileBuilder::mapped(2, 2, &colors)
            .set(fixture::BYTES_PER_LINE, 4)
            .data(&[0, 1, 1, 0])
            .build();
        let pixmap = parse(data).unwrap();
        assert_eq!(pixmap.len(), 4);
    }

    #[test]
    fn mapped_truncated() {
        let colors = [ColorEntry::default(); 2];
        let data = FileBuilder::mapped(2, 2, &colors).data(&[0, 1, 1]).build();
        let err = parse(data).unwrap_err();
        assert!(matches!(err, XwdError::TruncatedInput(_)));
    }

    #[test]
    fn mapped_index_out_of_range() {
        let colors = [ColorEntry::default(); 2];
        let data = FileBuilder::mapped(2, 1, &colors).data(&[1, 2]).build();
        let pixmap = parse(data).unwrap();
        assert!(pixmap.color(0).is_ok());
        assert!(matches!(
            pixmap.color(1),
            Err(XwdError::MalformedInput("palette index out of range"))
        ));
    }
}
