//! This crate provides XWD (X Window Dump) support for the image crate.
//!
//! The format is controlled via a Cargo feature, enabled by default:
//! ```toml
//! [dependencies]
//! image-xwd = { version = "0.1", features = ["xwd"] }
//! ```
//!
//! And you must also call the `register` function at program startup:
//!
//!  ```rust,no_run
//! image_xwd::register();
//!
//! // Now you can use the image crate as normal
//! let img = image::open("path/to/screenshot.xwd").unwrap();
//! ```
//!
//! The decoder can also be used directly, without going through the image
//! crate's format detection:
//!
//!  ```rust,no_run
//! # fn main() -> Result<(), image_xwd::xwd::XwdError> {
//! let file = std::io::BufReader::new(std::fs::File::open("screenshot.xwd")?);
//! let image = image_xwd::xwd::decode(file)?;
//! println!("{}", image.header());
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]

#[cfg(feature = "xwd")]
pub mod xwd;

#[allow(unused_imports)]
use image::hooks::{register_decoding_hook, register_format_detection_hook};

static REGISTER: std::sync::Once = std::sync::Once::new();

/// Register all enabled formats with the image crate.
pub fn register() {
    REGISTER.call_once(|| {
        // The first word is the header length and varies between files; the
        // second is the file version, 7.
        #[cfg(feature = "xwd")]
        if register_decoding_hook(
            "xwd".into(),
            Box::new(|r| Ok(Box::new(xwd::XwdDecoder::new(r)?))),
        ) {
            register_format_detection_hook(
                "xwd".into(),
                &[0, 0, 0, 0, 0, 0, 0, 7],
                Some(&[0, 0, 0, 0, 0xff, 0xff, 0xff, 0xff]),
            );
        }
    });
}
