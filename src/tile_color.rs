use std::collections::HashMap;
use std::fmt;
use log::debug;
use crate::models::raster::{RasterImage, Rgb};

/// Max pairwise channel difference for a pixel to count as gray
pub const GRAY_LIMIT: u8 = 10;

/// Channel values above this saturate to 255, all others to 0
pub const SATURATION_THRESHOLD: u8 = 70;

/// Names for saturated colors
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ColorName {
    Red,
    Green,
    Blue,
    Yellow,
    Purple,
    Cyan,
    Black,
    White,
    Unknown,
}

impl fmt::Display for ColorName {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ColorName::Red => write!(f, "red"),
            ColorName::Green => write!(f, "green"),
            ColorName::Blue => write!(f, "blue"),
            ColorName::Yellow => write!(f, "yellow"),
            ColorName::Purple => write!(f, "purple"),
            ColorName::Cyan => write!(f, "cyan"),
            ColorName::Black => write!(f, "black"),
            ColorName::White => write!(f, "white"),
            ColorName::Unknown => write!(f, "unknown"),
        }
    }
}

const CANONICAL_COLORS: [(&str, ColorName); 8] = [
    ("ff0000", ColorName::Red),
    ("00ff00", ColorName::Green),
    ("0000ff", ColorName::Blue),
    ("ffff00", ColorName::Yellow),
    ("ff00ff", ColorName::Purple),
    ("00ffff", ColorName::Cyan),
    ("000000", ColorName::Black),
    ("ffffff", ColorName::White),
];

/// Result of classifying one tile
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TileColor {
    pub dominant: Rgb,
    pub saturated: Rgb,
    pub name: ColorName,
}

/// Counts of chromatic colors in an image, remembering the order in which
/// each color was first seen
#[derive(Default, Debug)]
pub struct ColorHistogram {
    counts: HashMap<Rgb, (usize, usize)>,
}

impl ColorHistogram {
    /// Builds a histogram from the image, skipping black, white, transparent
    /// and near-gray pixels. An image without color access gives an empty histogram.
    ///
    /// # Arguments
    ///
    /// * 'image' - the tile image
    pub fn from_image(image: &RasterImage) -> ColorHistogram {
        let mut histogram = ColorHistogram::default();

        for y in 0..image.height() {
            for x in 0..image.width() {
                let Some(p) = image.pixel(x, y) else {
                    return histogram;
                };
                if p.is_transparent() || p.rgb == Rgb::BLACK || p.rgb == Rgb::WHITE || is_gray(p.rgb) {
                    continue;
                }
                let next = histogram.counts.len();
                histogram.counts.entry(p.rgb).or_insert((0, next)).0 += 1;
            }
        }

        histogram
    }

    pub fn count(&self, color: Rgb) -> usize {
        self.counts.get(&color).map_or(0, |(c, _)| *c)
    }

    /// The most frequent color, ties going to the color seen first.
    /// Black if the histogram is empty.
    pub fn dominant(&self) -> Rgb {
        self.counts
            .iter()
            .max_by(|(_, (ca, oa)), (_, (cb, ob))| ca.cmp(cb).then(ob.cmp(oa)))
            .map_or(Rgb::BLACK, |(rgb, _)| *rgb)
    }
}

fn is_gray(c: Rgb) -> bool {
    c.0.abs_diff(c.1) <= GRAY_LIMIT && c.0.abs_diff(c.2) <= GRAY_LIMIT && c.1.abs_diff(c.2) <= GRAY_LIMIT
}

/// Saturates a color channel by channel (e.g. #cc1000 -> #ff0000)
///
/// # Arguments
///
/// * 'color' - color to saturate
pub fn saturate(color: Rgb) -> Rgb {
    let channel = |v: u8| if v > SATURATION_THRESHOLD { 255 } else { 0 };
    Rgb(channel(color.0), channel(color.1), channel(color.2))
}

/// Names a color by exact match against the canonical saturated colors
///
/// # Arguments
///
/// * 'color' - the color to name
pub fn name_color(color: Rgb) -> ColorName {
    let hex = color.to_hex();
    CANONICAL_COLORS
        .iter()
        .find(|(h, _)| *h == hex)
        .map_or(ColorName::Unknown, |(_, name)| *name)
}

/// Finds the dominant color of a tile, its saturated form and its name
///
/// # Arguments
///
/// * 'image' - the decoded tile
pub fn classify(image: &RasterImage) -> TileColor {
    let histogram = ColorHistogram::from_image(image);
    let dominant = histogram.dominant();
    let saturated = saturate(dominant);
    debug!("{}x{} tile, {} seen {} times", image.width(), image.height(), dominant, histogram.count(dominant));

    TileColor { dominant, saturated, name: name_color(saturated) }
}
