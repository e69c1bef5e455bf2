//! PNG export.
//!
//! Encodes a surface's current pixels and packages them either as a file on
//! disk or as a [`Download`] ready to be served as an attachment.

use image::{ImageFormat, RgbaImage};
use std::io::Cursor;
use std::path::Path;

use crate::config::DEFAULT_FILE_NAME;
use crate::error::TicketError;
use crate::surface::Surface;

/// Encode the surface's pixels as PNG.
pub fn encode_png(surface: &dyn Surface) -> Result<Vec<u8>, TicketError> {
    encode_image(surface.pixels())
}

fn encode_image(image: &RgbaImage) -> Result<Vec<u8>, TicketError> {
    let mut bytes = Cursor::new(Vec::new());
    image
        .write_to(&mut bytes, ImageFormat::Png)
        .map_err(|e| TicketError::Export(format!("Failed to encode PNG: {}", e)))?;
    Ok(bytes.into_inner())
}

/// Save the surface's pixels to `path` as PNG.
pub fn save_png(surface: &dyn Surface, path: &Path) -> Result<(), TicketError> {
    let bytes = encode_png(surface)?;
    std::fs::write(path, bytes).map_err(|e| {
        TicketError::Export(format!("Failed to save {}: {}", path.display(), e))
    })?;
    tracing::info!(path = %path.display(), "ticket saved");
    Ok(())
}

/// An encoded PNG plus the name it should be saved under.
#[derive(Debug, Clone)]
pub struct Download {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

impl Download {
    /// `file_name` falls back to `custom-image.png` when empty.
    pub fn from_surface(surface: &dyn Surface, file_name: &str) -> Result<Self, TicketError> {
        let file_name = if file_name.is_empty() {
            DEFAULT_FILE_NAME
        } else {
            file_name
        };
        Ok(Self {
            file_name: file_name.to_string(),
            bytes: encode_png(surface)?,
        })
    }

    pub const CONTENT_TYPE: &'static str = "image/png";

    /// `Content-Disposition` value with an ASCII fallback name and the
    /// percent-encoded UTF-8 name.
    pub fn content_disposition(&self) -> String {
        let ascii: String = self
            .file_name
            .chars()
            .map(|c| {
                if (c.is_ascii_graphic() && c != '"' && c != '\\') || c == ' ' {
                    c
                } else {
                    '_'
                }
            })
            .collect();
        format!(
            "attachment; filename=\"{}\"; filename*=UTF-8''{}",
            ascii,
            percent_encode(&self.file_name)
        )
    }
}

/// RFC 5987 `attr-char` encoding.
fn percent_encode(value: &str) -> String {
    let mut encoded = String::with_capacity(value.len());
    for byte in value.bytes() {
        let keep = byte.is_ascii_alphanumeric()
            || matches!(byte, b'!' | b'#' | b'$' | b'&' | b'+' | b'-' | b'.' | b'^' | b'_' | b'`' | b'|' | b'~');
        if keep {
            encoded.push(byte as char);
        } else {
            encoded.push_str(&format!("%{:02X}", byte));
        }
    }
    encoded
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::surface::Canvas;
    use pretty_assertions::assert_eq;

    const PNG_SIGNATURE: &[u8] = &[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];

    #[test]
    fn test_encode_png_dimensions() {
        let canvas = Canvas::new(351, 219);
        let bytes = encode_png(&canvas).unwrap();
        assert!(bytes.starts_with(PNG_SIGNATURE));
        let decoded = image::load_from_memory(&bytes).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (351, 219));
    }

    #[test]
    fn test_download_default_name() {
        let download = Download::from_surface(&Canvas::new(2, 2), "").unwrap();
        assert_eq!(download.file_name, "custom-image.png");
        assert_eq!(
            download.content_disposition(),
            "attachment; filename=\"custom-image.png\"; filename*=UTF-8''custom-image.png"
        );
    }

    #[test]
    fn test_download_unicode_name() {
        let download = Download::from_surface(&Canvas::new(2, 2), "自定义行程图.png").unwrap();
        let header = download.content_disposition();
        assert!(header.starts_with("attachment; filename=\"______.png\""));
        assert!(header.ends_with("filename*=UTF-8''%E8%87%AA%E5%AE%9A%E4%B9%89%E8%A1%8C%E7%A8%8B%E5%9B%BE.png"));
    }

    #[test]
    fn test_save_png() {
        let path = std::env::temp_dir().join(format!("ticket-{}.png", uuid::Uuid::new_v4()));
        save_png(&Canvas::new(5, 4), &path).unwrap();
        let decoded = image::open(&path).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (5, 4));
        std::fs::remove_file(&path).unwrap();
    }
}
