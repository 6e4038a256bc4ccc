use clap::{Parser, ValueEnum};
use mapsnap_core::InstallProfile;
use std::path::PathBuf;

/// A utility to render static map snapshots with a marker at a coordinate
#[derive(Parser, Debug)]
#[command(name = "mapsnap")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Renders a single-marker static map snapshot as PNG", long_about = None)]
pub struct Args {
    /// First coordinate component: longitude, or latitude with --lat-first
    #[arg(value_name = "COORD_A", allow_negative_numbers = true)]
    pub coord_a: Option<String>,

    /// Second coordinate component: latitude, or longitude with --lat-first
    #[arg(value_name = "COORD_B", allow_negative_numbers = true)]
    pub coord_b: Option<String>,

    /// Read the positional arguments as <LAT> <LON> instead of <LON> <LAT>
    #[arg(long = "lat-first")]
    pub lat_first: bool,

    /// Output PNG path (overwritten if it exists)
    #[arg(short = 'o', long = "output", default_value = "map.png")]
    pub output: PathBuf,

    /// Tile zoom level (0-19)
    #[arg(short = 'z', long = "zoom", default_value_t = 15)]
    pub zoom: u32,

    /// Snapshot edge length in pixels
    #[arg(long = "size", default_value_t = 200)]
    pub size: u32,

    /// Marker color (named color or #rrggbb)
    #[arg(long = "marker-color", default_value = "blue")]
    pub marker_color: String,

    /// Marker radius in pixels
    #[arg(long = "marker-radius", default_value_t = 8)]
    pub marker_radius: u32,

    /// Reverse-geocode the coordinate and log the place name
    #[arg(long = "geocode")]
    pub geocode: bool,

    /// Install the native development packages for the host platform
    #[arg(long = "install-deps")]
    pub install_deps: bool,

    /// Report which native packages are present without installing
    #[arg(long = "check-deps")]
    pub check_deps: bool,

    /// Package selection profile for --install-deps / --check-deps
    #[arg(long = "profile", value_enum, default_value_t = ProfileArg::Full)]
    pub profile: ProfileArg,

    /// Print installer commands without executing them
    #[arg(short = 'n', long = "dry-run")]
    pub dry_run: bool,

    /// Verbose logging
    #[arg(short = 'v', long = "verbose")]
    pub verbose: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ProfileArg {
    /// Graphics/windowing stack plus libcurl
    Full,
    /// Graphics/windowing stack only
    Minimal,
}

impl From<ProfileArg> for InstallProfile {
    fn from(arg: ProfileArg) -> Self {
        match arg {
            ProfileArg::Full => InstallProfile::Full,
            ProfileArg::Minimal => InstallProfile::Minimal,
        }
    }
}

/// Parses command-line arguments
pub fn parse_args() -> Args {
    Args::parse()
}
