use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{JobError, Result};

/// straight (un-premultiplied) 8-bit RGBA colour
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Rgba {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Rgba {
    pub const BLACK: Rgba = Rgba::new(0, 0, 0, 255);
    pub const WHITE: Rgba = Rgba::new(255, 255, 255, 255);

    pub const fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    #[inline]
    pub const fn to_array(self) -> [u8; 4] {
        [self.r, self.g, self.b, self.a]
    }
}

/// A `width * height` RGBA8 pixel buffer, row-major, 4 bytes per pixel.
///
/// The buffer length always equals `width * height * 4` and both dimensions
/// are non-zero; every constructor checks this.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Bitmap {
    width: u32,
    height: u32,
    pixels: Vec<u8>,
}

impl Bitmap {
    /// flat bitmap filled with one colour
    pub fn new(width: u32, height: u32, fill: Rgba) -> Result<Self> {
        check_dimensions(width, height)?;
        let n = width as usize * height as usize;
        let mut pixels = Vec::with_capacity(n * 4);
        for _ in 0..n {
            pixels.extend_from_slice(&fill.to_array());
        }
        Ok(Self { width, height, pixels })
    }

    /// wrap an existing RGBA8 buffer
    pub fn from_raw(width: u32, height: u32, pixels: Vec<u8>) -> Result<Self> {
        check_dimensions(width, height)?;
        let expected = width as usize * height as usize * 4;
        if pixels.len() != expected {
            return Err(JobError::InvalidDimensions(format!(
                "{width}x{height} bitmap needs {expected} bytes, got {}",
                pixels.len()
            )));
        }
        Ok(Self { width, height, pixels })
    }

    pub fn from_image(img: image::RgbaImage) -> Result<Self> {
        let (w, h) = img.dimensions();
        Self::from_raw(w, h, img.into_raw())
    }

    /// decode any format the `image` crate was built with, converted to RGBA8
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        profiling::scope!("Bitmap::open");
        let img = image::open(path)?;
        Self::from_image(img.to_rgba8())
    }

    pub fn to_image(&self) -> Result<image::RgbaImage> {
        let (w, h) = (self.width, self.height);
        image::RgbaImage::from_raw(w, h, self.pixels.clone())
            .ok_or_else(|| JobError::InvalidDimensions(format!("{w}x{h} buffer rejected by image")))
    }

    /// encode to a file, format chosen from the extension
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        profiling::scope!("Bitmap::save");
        self.to_image()?.save(path)?;
        Ok(())
    }

    #[inline]
    pub fn width(&self) -> u32 {
        self.width
    }

    #[inline]
    pub fn height(&self) -> u32 {
        self.height
    }

    #[inline]
    pub fn as_raw(&self) -> &[u8] {
        &self.pixels
    }

    #[inline]
    pub fn same_dimensions(&self, other: &Bitmap) -> bool {
        self.width == other.width && self.height == other.height
    }

    #[inline]
    pub(crate) fn offset(&self, x: u32, y: u32) -> usize {
        (y as usize * self.width as usize + x as usize) * 4
    }

    pub fn get_pixel(&self, x: u32, y: u32) -> Rgba {
        let i = self.offset(x, y);
        Rgba::new(self.pixels[i], self.pixels[i + 1], self.pixels[i + 2], self.pixels[i + 3])
    }

    pub fn set_pixel(&mut self, x: u32, y: u32, c: Rgba) {
        let i = self.offset(x, y);
        self.pixels[i..i + 4].copy_from_slice(&c.to_array());
    }

    /// bytes of row `y` from column `x1` to `x2` inclusive
    #[inline]
    pub(crate) fn span(&self, y: u32, x1: u32, x2: u32) -> &[u8] {
        let start = self.offset(x1, y);
        let end = self.offset(x2, y) + 4;
        &self.pixels[start..end]
    }

    #[inline]
    pub(crate) fn span_mut(&mut self, y: u32, x1: u32, x2: u32) -> &mut [u8] {
        let start = self.offset(x1, y);
        let end = self.offset(x2, y) + 4;
        &mut self.pixels[start..end]
    }

    /// per-channel mean over every pixel, rounded
    pub fn average_color(&self) -> Rgba {
        profiling::scope!("Bitmap::average_color");
        let mut sums = [0u64; 4];
        for px in self.pixels.chunks_exact(4) {
            for (sum, &c) in sums.iter_mut().zip(px) {
                *sum += c as u64;
            }
        }
        let n = (self.width as u64) * (self.height as u64);
        let avg = |s: u64| ((s as f64 / n as f64).round()).clamp(0.0, 255.0) as u8;
        Rgba::new(avg(sums[0]), avg(sums[1]), avg(sums[2]), avg(sums[3]))
    }
}

fn check_dimensions(width: u32, height: u32) -> Result<()> {
    if width == 0 || height == 0 {
        return Err(JobError::InvalidDimensions(format!("{width}x{height} has a zero side")));
    }
    Ok(())
}
