//! Decoding of XWD Images
//!
//! XWD (X Window Dump) is the format written by the `xwd` utility of the X
//! Window System. A file is a fixed big-endian header, the name of the dumped
//! window, an optional color table, and the pixel data.
//!
//! This decoder supports `ZPixmap` images in two layouts:
//! - 24 bits per pixel direct color, with channels selected by the header's
//!   red/green/blue masks;
//! - 8 bit color table indices, when the header declares a color map whose
//!   size matches the number of colors.
//!
//! # Related Links
//! * <https://gitlab.freedesktop.org/xorg/app/xwd> - The `xwd` utility
//! * <https://gitlab.freedesktop.org/xorg/proto/xorgproto/-/blob/master/include/X11/XWDFile.h> - Header layout
//! * <https://en.wikipedia.org/wiki/Xwd> - The XWD format on Wikipedia

use std::io::{self, BufRead, Read};
use std::sync::Arc;

use image::error::{
    DecodingError, ImageFormatHint, LimitError, LimitErrorKind, UnsupportedError,
    UnsupportedErrorKind,
};
use image::{
    ColorType, ExtendedColorType, ImageDecoder, ImageError, ImageResult, LimitSupport, Limits,
    Rgb, RgbImage,
};
use tracing::Dispatch;

mod colormap;
mod header;
mod pixmap;

#[cfg(test)]
mod fixture;

pub use colormap::{read_color_table, ColorEntry, ColorTable, COLOR_ENTRY_SIZE};
pub use header::{
    read_header, ByteOrder, Header, VisualClass, HEADER_FIXED_SIZE, PIXMAP_ORDER, XWD_FILE_VERSION,
    X_OFFSET, Z_PIXMAP,
};
pub use pixmap::{mask_shift, read_pixmap, Pixmap, RAW_BITS_PER_PIXEL};

/// Errors which can occur while decoding an XWD file.
#[derive(Debug, thiserror::Error)]
pub enum XwdError {
    /// The stream ended before a required number of bytes was read.
    #[error("unexpected end of input while {0}")]
    TruncatedInput(&'static str),

    /// A header field holds a value outside what this decoder handles.
    #[error("unsupported {field}: {value}")]
    UnsupportedFormat { field: &'static str, value: u32 },

    /// The data is present but cannot be interpreted.
    #[error("malformed image: {0}")]
    MalformedInput(&'static str),

    #[error(transparent)]
    Io(#[from] io::Error),
}

impl XwdError {
    fn unsupported(field: &'static str, value: u32) -> XwdError {
        XwdError::UnsupportedFormat { field, value }
    }
}

impl From<XwdError> for ImageError {
    fn from(e: XwdError) -> ImageError {
        match e {
            XwdError::Io(inner) => ImageError::IoError(inner),
            XwdError::UnsupportedFormat { field, value } => {
                ImageError::Unsupported(UnsupportedError::from_format_and_kind(
                    format_hint(),
                    UnsupportedErrorKind::GenericFeature(format!(
                        "{field} {value} is not supported for xwd images"
                    )),
                ))
            }
            e => ImageError::Decoding(DecodingError::new(format_hint(), e)),
        }
    }
}

fn format_hint() -> ImageFormatHint {
    ImageFormatHint::Name("XWD".to_string())
}

/// `read_exact`, reporting a short stream as truncation of `stage`.
pub(crate) fn read_exact_or<R: Read>(
    r: &mut R,
    buf: &mut [u8],
    stage: &'static str,
) -> Result<(), XwdError> {
    r.read_exact(buf).map_err(|e| match e.kind() {
        io::ErrorKind::UnexpectedEof => XwdError::TruncatedInput(stage),
        _ => XwdError::Io(e),
    })
}

/// Dimensions and color model of an image, available from the header alone.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Config {
    pub width: u32,
    pub height: u32,
    pub color_type: ColorType,
}

/// A decoded XWD image.
///
/// Pixels are reported as opaque 8 bit RGB whatever the source depth.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct XwdImage {
    header: Header,
    pixmap: Pixmap,
}

impl XwdImage {
    pub fn header(&self) -> &Header {
        &self.header
    }

    pub fn pixmap(&self) -> &Pixmap {
        &self.pixmap
    }

    pub fn config(&self) -> Config {
        self.header.config()
    }

    pub fn dimensions(&self) -> (u32, u32) {
        self.header.dimensions()
    }

    /// The color table the pixels index into, for mapped images.
    pub fn color_table(&self) -> Option<&Arc<ColorTable>> {
        match &self.pixmap {
            Pixmap::Mapped { colors, .. } => Some(colors),
            Pixmap::Raw(_) => None,
        }
    }

    /// Full precision color of the pixel at `(x, y)`.
    ///
    /// # Panics
    ///
    /// If `(x, y)` is outside the image.
    pub fn color(&self, x: u32, y: u32) -> Result<ColorEntry, XwdError> {
        let (width, height) = self.dimensions();
        assert!(
            x < width && y < height,
            "Pixel ({x}, {y}) is out of bounds of a {width}x{height} image"
        );
        self.pixmap.color(y as usize * width as usize + x as usize)
    }

    /// Color of the pixel at `(x, y)` narrowed to 8 bits per channel.
    ///
    /// # Panics
    ///
    /// If `(x, y)` is outside the image.
    pub fn pixel(&self, x: u32, y: u32) -> Result<Rgb<u8>, XwdError> {
        self.color(x, y).map(|c| c.to_rgb())
    }

    /// Write all pixels as packed RGB8 into `buf`.
    fn write_rgb8(&self, buf: &mut [u8]) -> Result<(), XwdError> {
        for (i, px) in buf.chunks_exact_mut(3).enumerate() {
            let Rgb(rgb) = self.pixmap.color(i)?.to_rgb();
            px.copy_from_slice(&rgb);
        }
        Ok(())
    }

    pub fn to_rgb8(&self) -> Result<RgbImage, XwdError> {
        let (width, height) = self.dimensions();
        let mut buf = vec![0u8; self.pixmap.len() * 3];
        self.write_rgb8(&mut buf)?;
        RgbImage::from_raw(width, height, buf)
            .ok_or(XwdError::MalformedInput("image dimensions overflow"))
    }
}

/// Read only the header of an XWD image.
///
/// Diagnostics go to the current default `tracing` dispatcher; see
/// [`decode_config_with_dispatch`] to choose one.
pub fn decode_config<R: Read>(mut r: R) -> Result<Config, XwdError> {
    read_header(&mut r).map(|header| header.config())
}

/// Decode a complete XWD image.
///
/// The stream is read once, front to back; the first error ends decoding.
/// Diagnostics go to the current default `tracing` dispatcher; see
/// [`decode_with_dispatch`] to choose one.
pub fn decode<R: Read>(mut r: R) -> Result<XwdImage, XwdError> {
    let header = read_header(&mut r)?;
    read_body(&mut r, header)
}

/// [`decode_config`], reporting diagnostics to `dispatch`.
pub fn decode_config_with_dispatch<R: Read>(
    r: R,
    dispatch: &Dispatch,
) -> Result<Config, XwdError> {
    traced(Some(dispatch), || decode_config(r))
}

/// [`decode`], reporting diagnostics to `dispatch`.
pub fn decode_with_dispatch<R: Read>(r: R, dispatch: &Dispatch) -> Result<XwdImage, XwdError> {
    traced(Some(dispatch), || decode(r))
}

fn read_body<R: Read>(r: &mut R, header: Header) -> Result<XwdImage, XwdError> {
    let colors = Arc::new(read_color_table(r, &header)?);
    let pixmap = read_pixmap(r, &header, &colors)?;
    Ok(XwdImage { header, pixmap })
}

/// Decoder for XWD images.
pub struct XwdDecoder<R> {
    reader: R,
    header: Header,
    dispatch: Option<Dispatch>,
}

impl<R> XwdDecoder<R>
where
    R: BufRead,
{
    /// Create a new `XwdDecoder`, reading the header from `r`.
    pub fn new(r: R) -> Result<XwdDecoder<R>, ImageError> {
        Self::from_reader(r, None)
    }

    /// Create a new `XwdDecoder` whose diagnostics go to `dispatch` instead
    /// of the default `tracing` dispatcher.
    pub fn new_with_dispatch(r: R, dispatch: Dispatch) -> Result<XwdDecoder<R>, ImageError> {
        Self::from_reader(r, Some(dispatch))
    }

    fn from_reader(
        mut reader: R,
        dispatch: Option<Dispatch>,
    ) -> Result<XwdDecoder<R>, ImageError> {
        let header = traced(dispatch.as_ref(), || read_header(&mut reader))?;
        Ok(XwdDecoder {
            reader,
            header,
            dispatch,
        })
    }

    pub fn header(&self) -> &Header {
        &self.header
    }

    pub fn config(&self) -> Config {
        self.header.config()
    }
}

fn traced<T>(dispatch: Option<&Dispatch>, f: impl FnOnce() -> T) -> T {
    match dispatch {
        Some(dispatch) => tracing::dispatcher::with_default(dispatch, f),
        None => f(),
    }
}

impl<R: BufRead> ImageDecoder for XwdDecoder<R> {
    fn dimensions(&self) -> (u32, u32) {
        self.header.dimensions()
    }

    fn color_type(&self) -> ColorType {
        ColorType::Rgb8
    }

    fn original_color_type(&self) -> ExtendedColorType {
        if self.header.is_mapped() {
            ExtendedColorType::Unknown(u8::try_from(self.header.pixmap_depth).unwrap_or(u8::MAX))
        } else {
            ExtendedColorType::Rgb8
        }
    }

    fn read_image(self, buf: &mut [u8]) -> ImageResult<()> {
        assert_eq!(u64::try_from(buf.len()), Ok(self.total_bytes()));

        let XwdDecoder {
            mut reader,
            header,
            dispatch,
        } = self;
        traced(dispatch.as_ref(), || -> ImageResult<()> {
            let image = read_body(&mut reader, header)?;
            image.write_rgb8(buf)?;
            tracing::debug!(bytes = buf.len(), "xwd: image decoded");
            Ok(())
        })
    }

    fn read_image_boxed(self: Box<Self>, buf: &mut [u8]) -> ImageResult<()> {
        (*self).read_image(buf)
    }

    fn set_limits(&mut self, limits: Limits) -> ImageResult<()> {
        limits.check_support(&LimitSupport::default())?;
        let (width, height) = self.dimensions();
        limits.check_dimensions(width, height)?;

        let pixels = u64::from(width) * u64::from(height);
        let entry_size = std::mem::size_of::<ColorEntry>() as u64;
        // Output buffer, decoded pixmap and color table are alive together.
        let pixmap_bytes = if self.header.is_mapped() {
            pixels
        } else {
            pixels.saturating_mul(entry_size)
        };
        let table_bytes = u64::from(self.header.number_of_colors) * entry_size;
        let max_bytes = pixels
            .saturating_mul(3)
            .saturating_add(pixmap_bytes)
            .saturating_add(table_bytes);

        let max_alloc = limits.max_alloc.unwrap_or(u64::MAX);
        if max_alloc < max_bytes {
            return Err(ImageError::Limits(LimitError::from_kind(
                LimitErrorKind::InsufficientMemory,
            )));
        }
        Ok(())
    }
}
