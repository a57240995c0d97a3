pub mod errors;

use std::fs;
use std::time::Duration;
use image::DynamicImage;
use log::debug;
use serde_json::Value;
use ureq::Agent;
use crate::config::{TileParameters, TrafikverketParameters};
use crate::manager_trafikverket::errors::TrafikverketError;
use crate::models::raster::{Pixel, RasterImage};

const USER_AGENT: &str = "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/102.0.0.0 Safari/537.36";
const REFERER: &str = "https://www.trafikverket.se/";
const ORIGIN: &str = "https://www.trafikverket.se";

/// Struct for fetching weather station feeds and road condition tiles from Trafikverket
pub struct Trafikverket {
    agent: Agent,
    api_key: String,
    feed_url: String,
    object_type: String,
    schema_version: String,
    tile_url: String,
}

impl Trafikverket {
    /// Returns a Trafikverket struct ready for fetching data
    ///
    /// # Arguments
    ///
    /// * 'config' - Trafikverket configuration
    pub fn new(config: &TrafikverketParameters) -> Self {
        let agent_config = Agent::config_builder()
            .timeout_global(Some(Duration::from_secs(30)))
            .build();

        let agent = agent_config.into();

        Self {
            agent,
            api_key: config.api_key.clone(),
            feed_url: config.feed_url.clone(),
            object_type: config.object_type.clone(),
            schema_version: config.schema_version.clone(),
            tile_url: config.tile_url.trim_end_matches('/').to_string(),
        }
    }

    /// Retrieves the weather station feed (a couple of MiB of JSON)
    ///
    /// # Arguments
    ///
    /// * 'save_to' - optional file to save the raw feed to
    pub fn get_feed(&self, save_to: Option<&str>) -> Result<Value, TrafikverketError> {
        let json = self.agent
            .post(&self.feed_url)
            .header("Origin", ORIGIN)
            .header("Referer", REFERER)
            .header("User-Agent", USER_AGENT)
            .header("Accept", "application/json, text/javascript, */*; q=0.01")
            .header("Accept-Language", "en-US,en;q=0.9,sv;q=0.8")
            .header("Cache-Control", "no-cache")
            .header("Content-Type", "text/xml")
            .send(self.feed_query())?
            .body_mut()
            .with_config()
            .limit(32 * 1024 * 1024)
            .read_to_string()?;

        if let Some(path) = save_to {
            fs::write(path, &json)?;
            debug!("saved feed to {}", path);
        }

        Ok(serde_json::from_str(&json)?)
    }

    /// Retrieves and decodes one road condition map tile
    ///
    /// # Arguments
    ///
    /// * 'tile' - tile coordinates
    pub fn get_tile(&self, tile: &TileParameters) -> Result<RasterImage, TrafikverketError> {
        let url = self.tile_address(tile);
        debug!("fetching tile {}", url);

        let bytes = self.agent
            .get(&url)
            .header("Accept", "image/avif,image/webp,image/apng,image/svg+xml,image/*,*/*;q=0.8")
            .header("Accept-Language", "en-US,en;q=0.9,sv;q=0.8")
            .header("Referer", REFERER)
            .header("User-Agent", USER_AGENT)
            .header("Sec-Fetch-Dest", "image")
            .header("Sec-Fetch-Mode", "no-cors")
            .header("Sec-Fetch-Site", "same-site")
            .call()?
            .body_mut()
            .read_to_vec()?;

        decode_tile(&bytes)
    }

    fn tile_address(&self, tile: &TileParameters) -> String {
        format!("{}/{}/{}/{}.png", self.tile_url, tile.zoom_level, tile.tile_x, tile.tile_y)
    }

    fn feed_query(&self) -> String {
        format!(
            "<REQUEST><LOGIN authenticationkey='{}'/><QUERY objecttype='{}' schemaversion='{}'><FILTER></FILTER></QUERY></REQUEST>",
            self.api_key, self.object_type, self.schema_version)
    }
}

/// Reads a previously saved feed from file
///
/// # Arguments
///
/// * 'path' - the file to read
pub fn load_feed(path: &str) -> Result<Value, TrafikverketError> {
    let json = fs::read_to_string(path)?;
    Ok(serde_json::from_str(&json)?)
}

/// Decodes an image into a RasterImage. Grayscale images carry no color access.
///
/// # Arguments
///
/// * 'bytes' - the encoded image
pub fn decode_tile(bytes: &[u8]) -> Result<RasterImage, TrafikverketError> {
    let image = image::load_from_memory(bytes)?;
    let (width, height) = (image.width(), image.height());

    let pixels: Vec<Pixel> = match image {
        DynamicImage::ImageLuma8(_)
        | DynamicImage::ImageLumaA8(_)
        | DynamicImage::ImageLuma16(_)
        | DynamicImage::ImageLumaA16(_) => return Ok(RasterImage::without_color(width, height)),
        DynamicImage::ImageRgb8(buffer) => buffer.pixels().map(|p| Pixel::rgb(p[0], p[1], p[2])).collect(),
        other => other.to_rgba8().pixels().map(|p| Pixel::rgba(p[0], p[1], p[2], p[3])).collect(),
    };

    RasterImage::new(width, height, pixels)
        .ok_or_else(|| TrafikverketError::Image(format!("unexpected pixel count for {}x{} image", width, height)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;
    use image::{GrayImage, ImageFormat, Luma, Rgb, RgbImage, Rgba, RgbaImage};

    fn png(image: DynamicImage) -> Vec<u8> {
        let mut bytes = Cursor::new(Vec::new());
        image.write_to(&mut bytes, ImageFormat::Png).expect("png encoding");
        bytes.into_inner()
    }

    fn parameters() -> TrafikverketParameters {
        TrafikverketParameters {
            api_key: "key".to_string(),
            feed_url: "https://example.com/data.json".to_string(),
            object_type: "WeatherMeasurepoint".to_string(),
            schema_version: "2.1".to_string(),
            tile_url: "https://example.com/LPV/".to_string(),
        }
    }

    #[test]
    fn test_rgb_tile_decodes_row_major() {
        let mut image = RgbImage::from_pixel(2, 2, Rgb([0, 0, 0]));
        image.put_pixel(1, 0, Rgb([10, 200, 30]));
        let raster = decode_tile(&png(DynamicImage::ImageRgb8(image))).expect("valid png");

        assert_eq!(raster.width(), 2);
        assert_eq!(raster.pixel(1, 0), Some(Pixel::rgb(10, 200, 30)));
        assert_eq!(raster.pixel(0, 1), Some(Pixel::rgb(0, 0, 0)));
    }

    #[test]
    fn test_rgba_tile_keeps_alpha() {
        let image = RgbaImage::from_pixel(1, 1, Rgba([255, 0, 0, 0]));
        let raster = decode_tile(&png(DynamicImage::ImageRgba8(image))).expect("valid png");

        assert_eq!(raster.pixel(0, 0), Some(Pixel::rgba(255, 0, 0, 0)));
    }

    #[test]
    fn test_grayscale_tile_has_no_color_access() {
        let image = GrayImage::from_pixel(3, 3, Luma([128]));
        let raster = decode_tile(&png(DynamicImage::ImageLuma8(image))).expect("valid png");

        assert_eq!(raster.pixel(1, 1), None);
        assert_eq!(raster.height(), 3);
    }

    #[test]
    fn test_garbage_is_an_image_error() {
        assert!(matches!(decode_tile(b"not a png"), Err(TrafikverketError::Image(_))));
    }

    #[test]
    fn test_tile_address_and_query() {
        let trafikverket = Trafikverket::new(&parameters());
        let tile = TileParameters { road_name: "102".to_string(), zoom_level: 11, tile_x: 1108, tile_y: 1434 };

        assert_eq!(trafikverket.tile_address(&tile), "https://example.com/LPV/11/1108/1434.png");
        let query = trafikverket.feed_query();
        assert!(query.contains("authenticationkey='key'"));
        assert!(query.contains("objecttype='WeatherMeasurepoint'"));
    }
}
