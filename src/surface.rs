//! Drawing surfaces.
//!
//! A [`Surface`] is the 2D drawing context a controller owns: it can be
//! resized, cleared, painted with a stretched background, and written on.
//! [`Canvas`] is the pixel implementation backed by an RGBA buffer.

use image::{DynamicImage, RgbaImage, imageops, imageops::FilterType};

use crate::compositor::draw_centered_text;
use crate::font::FontBook;
use crate::layout::TextPlacement;

pub trait Surface {
    /// Current pixel dimensions.
    fn size(&self) -> (u32, u32);

    /// Change dimensions. Contents are discarded.
    fn resize(&mut self, width: u32, height: u32);

    /// Reset every pixel to transparent.
    fn clear(&mut self);

    /// Paint `image` stretched over the whole surface.
    fn draw_background(&mut self, image: &DynamicImage);

    /// Paint one text placement centered on its anchor.
    fn fill_text(&mut self, placement: &TextPlacement, fonts: &FontBook);

    /// Current pixel contents.
    fn pixels(&self) -> &RgbaImage;
}

/// RGBA pixel surface.
#[derive(Debug, Clone)]
pub struct Canvas {
    image: RgbaImage,
}

impl Canvas {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            image: RgbaImage::new(width.max(1), height.max(1)),
        }
    }

    pub fn into_image(self) -> RgbaImage {
        self.image
    }
}

impl Surface for Canvas {
    fn size(&self) -> (u32, u32) {
        self.image.dimensions()
    }

    fn resize(&mut self, width: u32, height: u32) {
        self.image = RgbaImage::new(width.max(1), height.max(1));
    }

    fn clear(&mut self) {
        for pixel in self.image.pixels_mut() {
            pixel.0 = [0, 0, 0, 0];
        }
    }

    fn draw_background(&mut self, image: &DynamicImage) {
        let (width, height) = self.size();
        let source = image.to_rgba8();
        let stretched = if source.dimensions() == (width, height) {
            source
        } else {
            imageops::resize(&source, width, height, FilterType::Triangle)
        };
        imageops::overlay(&mut self.image, &stretched, 0, 0);
    }

    fn fill_text(&mut self, placement: &TextPlacement, fonts: &FontBook) {
        draw_centered_text(
            &mut self.image,
            &placement.text,
            placement.x,
            placement.y,
            &placement.style,
            fonts,
        );
    }

    fn pixels(&self) -> &RgbaImage {
        &self.image
    }
}
