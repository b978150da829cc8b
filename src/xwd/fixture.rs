//! Builder for synthetic XWD streams used by the unit tests.

use super::ColorEntry;

// Byte offsets of header fields.
pub(crate) const VERSION: usize = 4;
pub(crate) const PIXMAP_FORMAT: usize = 8;
pub(crate) const PIXMAP_DEPTH: usize = 12;
pub(crate) const PIXMAP_WIDTH: usize = 16;
pub(crate) const PIXMAP_HEIGHT: usize = 20;
pub(crate) const X_OFFSET: usize = 24;
pub(crate) const BYTE_ORDER: usize = 28;
pub(crate) const BIT_ORDER: usize = 36;
pub(crate) const BITS_PER_PIXEL: usize = 44;
pub(crate) const BYTES_PER_LINE: usize = 48;
pub(crate) const VISUAL_CLASS: usize = 52;
pub(crate) const RED_MASK: usize = 56;
pub(crate) const GREEN_MASK: usize = 60;
pub(crate) const BLUE_MASK: usize = 64;
pub(crate) const BITS_PER_RGB: usize = 68;
pub(crate) const NUMBER_OF_COLORS: usize = 72;
pub(crate) const COLOR_MAP_ENTRIES: usize = 76;
pub(crate) const WINDOW_X: usize = 88;
pub(crate) const BORDER_WIDTH: usize = 96;

pub(crate) struct FileBuilder {
    fields: [u32; 25],
    header_size: Option<u32>,
    window_name: Vec<u8>,
    colors: Vec<ColorEntry>,
    data: Vec<u8>,
}

impl FileBuilder {
    fn new(width: u32, height: u32) -> FileBuilder {
        FileBuilder {
            fields: [0; 25],
            header_size: None,
            window_name: Vec::new(),
            colors: Vec::new(),
            data: Vec::new(),
        }
        .set(VERSION, 7)
        .set(PIXMAP_FORMAT, 2)
        .set(PIXMAP_WIDTH, width)
        .set(PIXMAP_HEIGHT, height)
    }

    /// A 24 bit direct color image with `0xRRGGBB` pixel words.
    pub(crate) fn raw(width: u32, height: u32) -> FileBuilder {
        FileBuilder::new(width, height)
            .set(PIXMAP_DEPTH, 24)
            .set(BITS_PER_PIXEL, 24)
            .set(BYTES_PER_LINE, width * 3)
            .set(VISUAL_CLASS, 4)
            .set(RED_MASK, 0xff0000)
            .set(GREEN_MASK, 0xff00)
            .set(BLUE_MASK, 0xff)
            .set(BITS_PER_RGB, 8)
    }

    /// An 8 bit pseudo color image using `colors` as its table.
    pub(crate) fn mapped(width: u32, height: u32, colors: &[ColorEntry]) -> FileBuilder {
        FileBuilder::new(width, height)
            .set(PIXMAP_DEPTH, 8)
            .set(BITS_PER_PIXEL, 8)
            .set(BYTES_PER_LINE, width)
            .set(VISUAL_CLASS, 3)
            .set(BITS_PER_RGB, 8)
            .colors(colors)
            .set(COLOR_MAP_ENTRIES, colors.len() as u32)
    }

    pub(crate) fn set(mut self, offset: usize, value: u32) -> FileBuilder {
        self.fields[offset / 4] = value;
        self
    }

    pub(crate) fn header_size(mut self, size: u32) -> FileBuilder {
        self.header_size = Some(size);
        self
    }

    pub(crate) fn window_name(mut self, name: &str) -> FileBuilder {
        self.window_name = name.as_bytes().to_vec();
        if !name.is_empty() {
            self.window_name.push(0);
        }
        self
    }

    /// Color table records; only `number_of_colors` is updated.
    pub(crate) fn colors(mut self, colors: &[ColorEntry]) -> FileBuilder {
        self.colors = colors.to_vec();
        self.set(NUMBER_OF_COLORS, colors.len() as u32)
    }

    pub(crate) fn data(mut self, data: &[u8]) -> FileBuilder {
        self.data = data.to_vec();
        self
    }

    pub(crate) fn build(self) -> Vec<u8> {
        let mut fields = self.fields;
        fields[0] = self
            .header_size
            .unwrap_or(100 + self.window_name.len() as u32);

        let mut out = Vec::new();
        for field in fields {
            out.extend_from_slice(&field.to_be_bytes());
        }
        out.extend_from_slice(&self.window_name);
        for color in &self.colors {
            out.extend_from_slice(&color.pixel.to_be_bytes());
            out.extend_from_slice(&color.red.to_be_bytes());
            out.extend_from_slice(&color.green.to_be_bytes());
            out.extend_from_slice(&color.blue.to_be_bytes());
            out.push(color.flags);
            out.push(color.padding);
        }
        out.extend_from_slice(&self.data);
        out
    }
}
