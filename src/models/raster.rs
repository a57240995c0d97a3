use std::fmt;

/// An RGB color triple
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
pub struct Rgb(pub u8, pub u8, pub u8);

impl Rgb {
    pub const BLACK: Rgb = Rgb(0, 0, 0);
    pub const WHITE: Rgb = Rgb(255, 255, 255);

    /// Returns the color as six lowercase hex digits, e.g. 00ff00
    pub fn to_hex(&self) -> String {
        format!("{:02x}{:02x}{:02x}", self.0, self.1, self.2)
    }
}

impl fmt::Display for Rgb {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "#{}", self.to_hex())
    }
}

/// A single pixel, alpha is None for images without an alpha channel
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Pixel {
    pub rgb: Rgb,
    pub alpha: Option<u8>,
}

impl Pixel {
    pub fn rgb(r: u8, g: u8, b: u8) -> Pixel {
        Pixel { rgb: Rgb(r, g, b), alpha: None }
    }

    pub fn rgba(r: u8, g: u8, b: u8, a: u8) -> Pixel {
        Pixel { rgb: Rgb(r, g, b), alpha: Some(a) }
    }

    pub fn is_transparent(&self) -> bool {
        self.alpha == Some(0)
    }
}

/// A decoded tile image.
///
/// Pixels are stored row-major. Images without color access (grayscale)
/// carry no pixels at all but keep their dimensions.
#[derive(Clone, Debug)]
pub struct RasterImage {
    width: u32,
    height: u32,
    pixels: Option<Vec<Pixel>>,
}

impl RasterImage {
    /// Returns a color image, or None if the pixel count doesn't match the dimensions
    ///
    /// # Arguments
    ///
    /// * 'width' - image width, at least 1
    /// * 'height' - image height, at least 1
    /// * 'pixels' - row-major pixels
    pub fn new(width: u32, height: u32, pixels: Vec<Pixel>) -> Option<RasterImage> {
        if width == 0 || height == 0 || pixels.len() != (width as usize) * (height as usize) {
            return None;
        }
        Some(RasterImage { width, height, pixels: Some(pixels) })
    }

    /// Returns an image lacking per-pixel color access
    pub fn without_color(width: u32, height: u32) -> RasterImage {
        RasterImage { width, height, pixels: None }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Pixel at (x, y), None if out of bounds or if the image has no color access
    pub fn pixel(&self, x: u32, y: u32) -> Option<Pixel> {
        if x >= self.width || y >= self.height {
            return None;
        }
        self.pixels.as_ref().map(|p| p[(y * self.width + x) as usize])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hex_is_lowercase_and_zero_padded() {
        assert_eq!(Rgb(0, 255, 10).to_hex(), "00ff0a");
        assert_eq!(format!("{}", Rgb(204, 16, 0)), "#cc1000");
    }

    #[test]
    fn test_pixel_addressing_is_row_major() {
        let pixels = vec![
            Pixel::rgb(1, 0, 0), Pixel::rgb(2, 0, 0),
            Pixel::rgb(3, 0, 0), Pixel::rgb(4, 0, 0),
            Pixel::rgb(5, 0, 0), Pixel::rgb(6, 0, 0),
        ];
        let image = RasterImage::new(2, 3, pixels).expect("dimensions match");

        assert_eq!(image.pixel(1, 0), Some(Pixel::rgb(2, 0, 0)));
        assert_eq!(image.pixel(0, 2), Some(Pixel::rgb(5, 0, 0)));
        assert_eq!(image.pixel(2, 0), None);
    }

    #[test]
    fn test_mismatched_dimensions_are_rejected() {
        assert!(RasterImage::new(2, 2, vec![Pixel::rgb(0, 0, 0)]).is_none());
        assert!(RasterImage::new(0, 0, vec![]).is_none());
    }

    #[test]
    fn test_grayscale_image_has_no_pixels() {
        let image = RasterImage::without_color(4, 4);
        assert_eq!(image.pixel(0, 0), None);
        assert_eq!(image.width(), 4);
    }
}
