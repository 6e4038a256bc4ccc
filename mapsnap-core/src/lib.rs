use anyhow::{Context, Result};
use std::path::PathBuf;

// Internal modules (private)
mod deps;
mod geocoding;
mod platform;
mod render;
mod tiles;

// Re-export public types
pub use deps::{
    build_plan, packages, print_package_status, run_install, InstallPlan, InstallProfile,
    InstallReport, PlannedCommand, StepOutcome,
};
pub use geocoding::Geocoder;
pub use platform::Platform;
pub use render::{parse_color, MarkerStyle};
pub use tiles::TileFetcher;

/// A geographic coordinate
///
/// No range validation is applied; a coordinate outside the Mercator world
/// surfaces as a tile fetch error during rendering.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Coordinate {
    pub lon: f64,
    pub lat: f64,
}

/// How a pair of positional command-line values maps onto a coordinate
///
/// The marker convention of the underlying tile composition is
/// longitude-first; the latitude-first reading is an explicit configuration
/// choice, never an implicit positional assumption.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CoordinateOrder {
    LonLat,
    LatLon,
}

impl CoordinateOrder {
    /// Parses two positional values into a coordinate under this order
    pub fn parse(&self, first: &str, second: &str) -> Result<Coordinate> {
        let a: f64 = first
            .trim()
            .parse()
            .with_context(|| format!("Invalid coordinate value '{}'", first))?;
        let b: f64 = second
            .trim()
            .parse()
            .with_context(|| format!("Invalid coordinate value '{}'", second))?;

        Ok(match self {
            CoordinateOrder::LonLat => Coordinate { lon: a, lat: b },
            CoordinateOrder::LatLon => Coordinate { lon: b, lat: a },
        })
    }
}

/// Configuration options for the snapshot engine
#[derive(Debug, Clone)]
pub struct SnapshotConfig {
    /// Snapshot width in pixels
    pub width: u32,
    /// Snapshot height in pixels
    pub height: u32,
    /// Tile zoom level (0-19); higher shows a smaller area in more detail
    pub zoom: u32,
    /// Marker drawn at the snapshot center
    pub marker: MarkerStyle,
    /// Output path; an existing file there is overwritten
    pub output: PathBuf,
}

impl Default for SnapshotConfig {
    fn default() -> Self {
        Self {
            width: 200,
            height: 200,
            zoom: 15,
            marker: MarkerStyle::default(), // blue, 8 px radius
            output: PathBuf::from("map.png"),
        }
    }
}

/// Renders single-marker static map snapshots to PNG files
pub struct SnapshotEngine {
    config: SnapshotConfig,
    fetcher: TileFetcher,
}

impl SnapshotEngine {
    /// Create a new snapshot engine with the given configuration
    pub fn new(config: SnapshotConfig) -> Result<Self> {
        Ok(Self {
            fetcher: TileFetcher::new()?,
            config,
        })
    }

    /// Render a snapshot centered on the coordinate and write it out
    ///
    /// Returns the path of the written PNG.
    pub fn render_to_file(&self, coord: Coordinate) -> Result<PathBuf> {
        log::info!(
            "Rendering {}x{} snapshot at zoom {} centered on {},{}",
            self.config.width,
            self.config.height,
            self.config.zoom,
            coord.lon,
            coord.lat
        );

        let snapshot = render::render_snapshot(&self.fetcher, &self.config, coord)?;
        render::write_png(&snapshot, &self.config.output)?;

        Ok(self.config.output.clone())
    }
}
