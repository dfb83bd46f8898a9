//! 8-bit luminance grid extracted from decoded images

use image::DynamicImage;

use crate::bitmap::Bitmap;
use crate::error::TraceResult;

/// A width x height grid of 8-bit luminance values, the only pixel data the
/// tracing engine ever sees.
#[derive(Debug, Clone)]
pub struct LuminanceData {
    width: u32,
    height: u32,
    data: Vec<u8>,
}

/// Rec. 709 weighted sum, rounded to the nearest integer in 0..255
pub fn luminance(r: u8, g: u8, b: u8) -> u8 {
    (0.2126 * r as f64 + 0.7152 * g as f64 + 0.0722 * b as f64).round() as u8
}

impl LuminanceData {
    /// Wrap a raw luminance grid. `data` must hold `width * height` samples.
    pub fn new(width: u32, height: u32, data: Vec<u8>) -> Self {
        assert_eq!(
            data.len(),
            width as usize * height as usize,
            "luminance buffer size mismatch"
        );
        Self {
            width,
            height,
            data,
        }
    }

    /// Reduce a decoded image to luminance
    pub fn from_image(image: &DynamicImage) -> Self {
        let rgba = image.to_rgba8();
        let data = rgba
            .pixels()
            .map(|p| {
                let [r, g, b, a] = p.0;
                // Composite onto white so transparent regions trace as background
                if a == 255 {
                    luminance(r, g, b)
                } else {
                    let blend = |c: u8| {
                        (c as u16 * a as u16 / 255 + 255 - a as u16).min(255) as u8
                    };
                    luminance(blend(r), blend(g), blend(b))
                }
            })
            .collect();
        Self::new(rgba.width(), rgba.height(), data)
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn get(&self, x: u32, y: u32) -> u8 {
        self.data[y as usize * self.width as usize + x as usize]
    }

    /// Threshold into a foreground bitmap. With `black_on_white` set, pixels
    /// at or below the threshold are foreground; otherwise pixels at or
    /// above it are.
    pub fn to_bitmap(&self, threshold: u8, black_on_white: bool) -> TraceResult<Bitmap> {
        let mut bm = Bitmap::new(self.width, self.height)?;
        for y in 0..self.height {
            for x in 0..self.width {
                let lum = self.get(x, y);
                let past = if black_on_white {
                    lum > threshold
                } else {
                    lum < threshold
                };
                if !past {
                    bm.set(x as i32, y as i32);
                }
            }
        }
        Ok(bm)
    }
}
