use anyhow::{anyhow, Context, Result};
use image::DynamicImage;
use reqwest::blocking::Client;
use std::time::Duration;

/// Slippy map tiles are 256 px squares
pub const TILE_SIZE: u32 = 256;

const TILE_URL_BASE: &str = "https://tile.openstreetmap.org";
const FETCH_TIMEOUT: Duration = Duration::from_secs(10);

/// Converts a coordinate to the covering tile indices at a zoom level
pub fn tile_coords(lat_deg: f64, lon_deg: f64, zoom: u32) -> (u32, u32) {
    let lat_rad = lat_deg.to_radians();
    let n = (1u32 << zoom) as f64;
    let x = ((lon_deg + 180.0) / 360.0 * n).floor() as u32;
    let y = ((1.0 - (lat_rad.tan() + 1.0 / lat_rad.cos()).ln() / std::f64::consts::PI) / 2.0 * n)
        .floor() as u32;
    (x, y)
}

/// Converts a coordinate to global pixel coordinates at a zoom level
pub fn pixel_coords(lat_deg: f64, lon_deg: f64, zoom: u32) -> (f64, f64) {
    let lat_rad = lat_deg.to_radians();
    let n = (TILE_SIZE as f64) * (1u32 << zoom) as f64;
    let x = (lon_deg + 180.0) / 360.0 * n;
    let y = (1.0 - (lat_rad.tan() + 1.0 / lat_rad.cos()).ln() / std::f64::consts::PI) / 2.0 * n;
    (x, y)
}

/// Wraps a tile x index across the antimeridian
pub fn wrap_tile_x(x: i64, zoom: u32) -> u32 {
    let n = 1i64 << zoom;
    x.rem_euclid(n) as u32
}

/// True when a tile y index lies inside the world at a zoom level
pub fn tile_y_in_range(y: i64, zoom: u32) -> bool {
    y >= 0 && y < (1i64 << zoom)
}

/// Blocking tile client for the OpenStreetMap tile server
pub struct TileFetcher {
    client: Client,
}

impl TileFetcher {
    /// Creates a fetcher with the project user agent and a request timeout
    ///
    /// The tile server rejects requests without a descriptive User-Agent.
    pub fn new() -> Result<Self> {
        let user_agent = format!(
            "mapsnap/{} (https://github.com/dsorvik/mapsnap)",
            env!("CARGO_PKG_VERSION")
        );

        let client = Client::builder()
            .user_agent(user_agent)
            .timeout(FETCH_TIMEOUT)
            .build()
            .context("Failed to build tile HTTP client")?;

        Ok(Self { client })
    }

    /// URL of a single tile
    pub fn tile_url(zoom: u32, x: u32, y: u32) -> String {
        format!("{}/{}/{}/{}.png", TILE_URL_BASE, zoom, x, y)
    }

    /// Downloads and decodes a single tile
    pub fn fetch(&self, zoom: u32, x: u32, y: u32) -> Result<DynamicImage> {
        let url = Self::tile_url(zoom, x, y);
        log::debug!("Fetching tile {}", url);

        let response = self
            .client
            .get(&url)
            .send()
            .with_context(|| format!("Failed to fetch tile {}", url))?;

        if !response.status().is_success() {
            return Err(anyhow!("Tile fetch failed: HTTP {} for {}", response.status(), url));
        }

        let bytes = response
            .bytes()
            .with_context(|| format!("Failed to read tile body for {}", url))?;

        image::load_from_memory(&bytes).with_context(|| format!("Failed to decode tile {}", url))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tile_coords_origin() {
        // (0, 0) is the north-west corner of the single zoom-0 tile
        assert_eq!(tile_coords(0.0, 0.0, 0), (0, 0));
    }

    #[test]
    fn test_pixel_coords_equator_prime_meridian() {
        // The equator/prime-meridian crossing sits at the center of the map
        let (x, y) = pixel_coords(0.0, 0.0, 0);
        assert!((x - 128.0).abs() < 1e-9);
        assert!((y - 128.0).abs() < 1e-9);

        let (x, y) = pixel_coords(0.0, 0.0, 2);
        assert!((x - 512.0).abs() < 1e-9);
        assert!((y - 512.0).abs() < 1e-9);
    }

    #[test]
    fn test_tile_coords_known_locations() {
        // Central London at zoom 10 (reference values from the slippy map
        // tilename formula)
        assert_eq!(tile_coords(51.5074, -0.1278, 10), (511, 340));
        // Paris at zoom 10
        assert_eq!(tile_coords(48.8566, 2.3522, 10), (518, 352));
    }

    #[test]
    fn test_pixel_and_tile_coords_agree() {
        let (px, py) = pixel_coords(47.6062, -122.3321, 13);
        let (tx, ty) = tile_coords(47.6062, -122.3321, 13);
        assert_eq!((px / TILE_SIZE as f64).floor() as u32, tx);
        assert_eq!((py / TILE_SIZE as f64).floor() as u32, ty);
    }

    #[test]
    fn test_wrap_tile_x() {
        assert_eq!(wrap_tile_x(-1, 4), 15);
        assert_eq!(wrap_tile_x(16, 4), 0);
        assert_eq!(wrap_tile_x(5, 4), 5);
    }

    #[test]
    fn test_tile_y_in_range() {
        assert!(tile_y_in_range(0, 4));
        assert!(tile_y_in_range(15, 4));
        assert!(!tile_y_in_range(-1, 4));
        assert!(!tile_y_in_range(16, 4));
    }

    #[test]
    fn test_tile_url_format() {
        assert_eq!(
            TileFetcher::tile_url(13, 1310, 2849),
            "https://tile.openstreetmap.org/13/1310/2849.png"
        );
    }
}
