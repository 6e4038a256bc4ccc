use anyhow::{bail, Context, Result};
use image::{GenericImage, Rgba, RgbaImage};
use std::path::Path;

use crate::tiles::{self, TileFetcher, TILE_SIZE};
use crate::{Coordinate, SnapshotConfig};

/// Appearance of the marker drawn at the snapshot center
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarkerStyle {
    pub color: Rgba<u8>,
    pub radius: u32,
}

impl Default for MarkerStyle {
    fn default() -> Self {
        Self {
            color: Rgba([0, 0, 255, 255]),
            radius: 8,
        }
    }
}

/// Parses a marker color from a name or `#rrggbb` hex form
pub fn parse_color(spec: &str) -> Result<Rgba<u8>> {
    let named: Option<[u8; 3]> = match spec.to_ascii_lowercase().as_str() {
        "blue" => Some([0, 0, 255]),
        "red" => Some([255, 0, 0]),
        "green" => Some([0, 128, 0]),
        "black" => Some([0, 0, 0]),
        "white" => Some([255, 255, 255]),
        _ => None,
    };

    if let Some([r, g, b]) = named {
        return Ok(Rgba([r, g, b, 255]));
    }

    if let Some(hex) = spec.strip_prefix('#') {
        if hex.len() == 6 {
            let r = u8::from_str_radix(&hex[0..2], 16);
            let g = u8::from_str_radix(&hex[2..4], 16);
            let b = u8::from_str_radix(&hex[4..6], 16);
            if let (Ok(r), Ok(g), Ok(b)) = (r, g, b) {
                return Ok(Rgba([r, g, b, 255]));
            }
        }
    }

    bail!("Unrecognized marker color '{}'", spec)
}

/// Global-pixel window of a snapshot centered on a map position
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Window {
    left: i64,
    top: i64,
    width: u32,
    height: u32,
}

impl Window {
    fn centered(cx: f64, cy: f64, width: u32, height: u32) -> Self {
        Self {
            left: cx.round() as i64 - (width / 2) as i64,
            top: cy.round() as i64 - (height / 2) as i64,
            width,
            height,
        }
    }

    /// Inclusive tile index range covering the window
    fn tile_span(&self) -> (i64, i64, i64, i64) {
        let size = TILE_SIZE as i64;
        let x0 = self.left.div_euclid(size);
        let y0 = self.top.div_euclid(size);
        let x1 = (self.left + self.width as i64 - 1).div_euclid(size);
        let y1 = (self.top + self.height as i64 - 1).div_euclid(size);
        (x0, y0, x1, y1)
    }
}

/// Renders a snapshot centered on the coordinate, marker included
///
/// Tiles covering the window are fetched, stitched onto a canvas, and the
/// canvas is cropped so the coordinate sits at the center pixel. Rows above
/// or below the Mercator world are left white.
pub fn render_snapshot(
    fetcher: &TileFetcher,
    config: &SnapshotConfig,
    coord: Coordinate,
) -> Result<RgbaImage> {
    if config.width == 0 || config.height == 0 {
        bail!("Snapshot size must be non-zero");
    }
    if config.zoom > 19 {
        bail!("Zoom level {} out of range (0-19)", config.zoom);
    }

    let (cx, cy) = tiles::pixel_coords(coord.lat, coord.lon, config.zoom);
    let window = Window::centered(cx, cy, config.width, config.height);
    let (tx0, ty0, tx1, ty1) = window.tile_span();

    let cols = (tx1 - tx0 + 1) as u32;
    let rows = (ty1 - ty0 + 1) as u32;
    let mut canvas = RgbaImage::from_pixel(
        cols * TILE_SIZE,
        rows * TILE_SIZE,
        Rgba([255, 255, 255, 255]),
    );

    for ty in ty0..=ty1 {
        if !tiles::tile_y_in_range(ty, config.zoom) {
            continue;
        }
        for tx in tx0..=tx1 {
            let tile = fetcher.fetch(config.zoom, tiles::wrap_tile_x(tx, config.zoom), ty as u32)?;
            let ox = (tx - tx0) as u32 * TILE_SIZE;
            let oy = (ty - ty0) as u32 * TILE_SIZE;
            canvas
                .copy_from(&tile.to_rgba8(), ox, oy)
                .context("Failed to composite tile onto canvas")?;
        }
    }

    let crop_x = (window.left - tx0 * TILE_SIZE as i64) as u32;
    let crop_y = (window.top - ty0 * TILE_SIZE as i64) as u32;
    let mut snapshot =
        image::imageops::crop_imm(&canvas, crop_x, crop_y, config.width, config.height).to_image();

    draw_marker(&mut snapshot, config.width / 2, config.height / 2, &config.marker);

    Ok(snapshot)
}

/// Draws a filled circle at (cx, cy), clipped to the image bounds
pub fn draw_marker(image: &mut RgbaImage, cx: u32, cy: u32, style: &MarkerStyle) {
    let r = style.radius as i64;
    let (w, h) = (image.width() as i64, image.height() as i64);

    for dy in -r..=r {
        for dx in -r..=r {
            if dx * dx + dy * dy > r * r {
                continue;
            }
            let x = cx as i64 + dx;
            let y = cy as i64 + dy;
            if x < 0 || y < 0 || x >= w || y >= h {
                continue;
            }
            image.put_pixel(x as u32, y as u32, style.color);
        }
    }
}

/// Writes the snapshot as PNG, overwriting any existing file at the path
pub fn write_png(image: &RgbaImage, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
    }

    image
        .save_with_format(path, image::ImageFormat::Png)
        .with_context(|| format!("Failed to write {}", path.display()))
}
