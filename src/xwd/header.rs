//! The fixed XWD file header and the window name trailing it.

use std::fmt;
use std::io::Read;

use image::ColorType;

use super::{read_exact_or, Config, XwdError};

/// The only file version this decoder understands (X11 `XWD_FILE_VERSION`).
pub const XWD_FILE_VERSION: u32 = 7;

/// Size of the header without the window name.
pub const HEADER_FIXED_SIZE: u32 = 100;

/// Pixmap format code of `ZPixmap`, the packed pixel layout.
pub const Z_PIXMAP: u32 = 2;

/// The only supported x offset.
pub const X_OFFSET: u32 = 0;

/// The only pixel byte and bit order supported; pixel words are then read
/// most significant byte first.
pub const PIXMAP_ORDER: ByteOrder = ByteOrder::LsbFirst;

/// Ordering of bytes (or bits) within the pixel data.
///
/// The header itself is always big-endian; this only describes the pixmap.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ByteOrder {
    LsbFirst,
    MsbFirst,
}

impl ByteOrder {
    /// Interpret a header word, returning `None` for anything but 0 or 1.
    pub fn from_u32(value: u32) -> Option<ByteOrder> {
        match value {
            0 => Some(ByteOrder::LsbFirst),
            1 => Some(ByteOrder::MsbFirst),
            _ => None,
        }
    }
}

impl fmt::Display for ByteOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ByteOrder::LsbFirst => f.write_str("LSBFirst (0)"),
            ByteOrder::MsbFirst => f.write_str("MSBFirst (1)"),
        }
    }
}

/// X11 visual class of the dumped window.
///
/// Informational only; unknown codes are kept rather than rejected.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum VisualClass {
    StaticGray,
    GrayScale,
    StaticColor,
    PseudoColor,
    TrueColor,
    DirectColor,
    Unknown(u32),
}

impl From<u32> for VisualClass {
    fn from(code: u32) -> VisualClass {
        match code {
            0 => VisualClass::StaticGray,
            1 => VisualClass::GrayScale,
            2 => VisualClass::StaticColor,
            3 => VisualClass::PseudoColor,
            4 => VisualClass::TrueColor,
            5 => VisualClass::DirectColor,
            other => VisualClass::Unknown(other),
        }
    }
}

/// Parsed XWD file header.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Header {
    /// Name of the dumped window, without its null terminator.
    pub window_name: String,
    /// Length of the header including the window name.
    pub header_size: u32,
    pub file_version: u32,
    pub pixmap_format: u32,
    pub pixmap_depth: u32,
    pub pixmap_width: u32,
    pub pixmap_height: u32,
    pub x_offset: u32,
    pub byte_order: ByteOrder,
    pub bitmap_unit: u32,
    pub bitmap_bit_order: ByteOrder,
    pub bitmap_pad: u32,
    pub bits_per_pixel: u32,
    /// Row stride of the pixel data, possibly including padding.
    pub bytes_per_line: u32,
    pub visual_class: u32,
    // Masks are only meaningful for images that are not colormapped.
    pub red_mask: u32,
    pub green_mask: u32,
    pub blue_mask: u32,
    pub bits_per_rgb: u32,
    pub number_of_colors: u32,
    pub color_map_entries: u32,
    pub window_width: u32,
    pub window_height: u32,
    pub window_x: u32,
    pub window_y: u32,
    pub window_border_width: u32,
}

impl Header {
    /// Whether the pixel data holds color table indices rather than packed colors.
    pub fn is_mapped(&self) -> bool {
        self.color_map_entries != 0 && self.number_of_colors == self.color_map_entries
    }

    pub fn visual(&self) -> VisualClass {
        VisualClass::from(self.visual_class)
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.pixmap_width, self.pixmap_height)
    }

    pub fn config(&self) -> Config {
        Config {
            width: self.pixmap_width,
            height: self.pixmap_height,
            color_type: ColorType::Rgb8,
        }
    }
}

/// Read the header, including the window name, and validate the fields
/// this decoder depends on.
///
/// Validation happens before the window name is read, so a rejected file
/// has consumed exactly [`HEADER_FIXED_SIZE`] bytes.
pub fn read_header<R: Read>(r: &mut R) -> Result<Header, XwdError> {
    let mut size = [0u8; 4];
    read_exact_or(r, &mut size, "reading header size")?;
    let header_size = u32::from_be_bytes(size);
    tracing::debug!(header_size, "xwd: read header size");

    let mut fixed = [0u8; HEADER_FIXED_SIZE as usize - 4];
    read_exact_or(r, &mut fixed, "reading header")?;

    let mut words = [0u32; (HEADER_FIXED_SIZE as usize - 4) / 4];
    for (word, chunk) in words.iter_mut().zip(fixed.chunks_exact(4)) {
        *word = u32::from_be_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]);
    }

    let [
        file_version,
        pixmap_format,
        pixmap_depth,
        pixmap_width,
        pixmap_height,
        x_offset,
        byte_order,
        bitmap_unit,
        bit_order,
        bitmap_pad,
        bits_per_pixel,
        bytes_per_line,
        visual_class,
        red_mask,
        green_mask,
        blue_mask,
        bits_per_rgb,
        number_of_colors,
        color_map_entries,
        window_width,
        window_height,
        window_x,
        window_y,
        window_border_width,
    ] = words;

    if file_version != XWD_FILE_VERSION {
        return Err(XwdError::unsupported("version", file_version));
    }
    if pixmap_format != Z_PIXMAP {
        return Err(XwdError::unsupported("pixmap-format", pixmap_format));
    }
    if x_offset != X_OFFSET {
        return Err(XwdError::unsupported("x-offset", x_offset));
    }
    let byte_order = ByteOrder::from_u32(byte_order)
        .filter(|&order| order == PIXMAP_ORDER)
        .ok_or_else(|| XwdError::unsupported("byte-order", byte_order))?;
    let bitmap_bit_order = ByteOrder::from_u32(bit_order)
        .filter(|&order| order == PIXMAP_ORDER)
        .ok_or_else(|| XwdError::unsupported("bit-order", bit_order))?;

    let name_len = header_size
        .checked_sub(HEADER_FIXED_SIZE)
        .ok_or(XwdError::MalformedInput(
            "header size smaller than fixed header",
        ))?;

    // The name length comes straight from the file, so let the buffer grow
    // with the bytes actually present instead of trusting it up front.
    let mut name = Vec::new();
    r.by_ref()
        .take(u64::from(name_len))
        .read_to_end(&mut name)
        .map_err(XwdError::Io)?;
    if name.len() as u64 != u64::from(name_len) {
        return Err(XwdError::TruncatedInput("reading window name"));
    }
    // The terminator is counted in the header size.
    name.pop();
    let window_name = String::from_utf8_lossy(&name).into_owned();

    let header = Header {
        window_name,
        header_size,
        file_version,
        pixmap_format,
        pixmap_depth,
        pixmap_width,
        pixmap_height,
        x_offset,
        byte_order,
        bitmap_unit,
        bitmap_bit_order,
        bitmap_pad,
        bits_per_pixel,
        bytes_per_line,
        visual_class,
        red_mask,
        green_mask,
        blue_mask,
        bits_per_rgb,
        number_of_colors,
        color_map_entries,
        window_width,
        window_height,
        window_x,
        window_y,
        window_border_width,
    };
    tracing::debug!(
        width = header.pixmap_width,
        height = header.pixmap_height,
        depth = header.pixmap_depth,
        bits_per_pixel = header.bits_per_pixel,
        mapped = header.is_mapped(),
        "xwd: parsed header"
    );
    Ok(header)
}

/// Field dump in the layout of `xwud -dumpheaders`.
impl fmt::Display for Header {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "window name:        {}", self.window_name)?;
        writeln!(f, "sizeof(XWDheader):  {}", HEADER_FIXED_SIZE)?;
        writeln!(f, "header size:        {}", self.header_size)?;
        writeln!(f, "file version:       {}", self.file_version)?;
        writeln!(f, "pixmap format:      {}", self.pixmap_format)?;
        writeln!(f, "pixmap depth:       {}", self.pixmap_depth)?;
        writeln!(f, "pixmap width:       {}", self.pixmap_width)?;
        writeln!(f, "pixmap height:      {}", self.pixmap_height)?;
        writeln!(f, "x offset:           {}", self.x_offset)?;
        writeln!(f, "byte order:         {}", self.byte_order)?;
        writeln!(f, "bitmap unit:        {}", self.bitmap_unit)?;
        writeln!(f, "bitmap bit order:   {}", self.bitmap_bit_order)?;
        writeln!(f, "bitmap pad:         {}", self.bitmap_pad)?;
        writeln!(f, "bits per pixel:     {}", self.bits_per_pixel)?;
        writeln!(f, "bytes per line:     {}", self.bytes_per_line)?;
        writeln!(f, "visual class:       {:?}", self.visual())?;
        writeln!(f, "red mask:           {:#010x}", self.red_mask)?;
        writeln!(f, "green mask:         {:#010x}", self.green_mask)?;
        writeln!(f, "blue mask:          {:#010x}", self.blue_mask)?;
        writeln!(f, "bits per rgb:       {}", self.bits_per_rgb)?;
        writeln!(f, "colormap entries:   {}", self.color_map_entries)?;
        writeln!(f, "num colors:         {}", self.number_of_colors)?;
        writeln!(f, "window width:       {}", self.window_width)?;
        writeln!(f, "window height:      {}", self.window_height)?;
        writeln!(f, "window x:           {}", self.window_x)?;
        writeln!(f, "window y:           {}", self.window_y)?;
        writeln!(f, "border width:       {}", self.window_border_width)
    }
}
