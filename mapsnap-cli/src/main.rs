use anyhow::Result;
use mapsnap_core::{
    build_plan, parse_color, print_package_status, run_install, CoordinateOrder, Geocoder,
    InstallProfile, MarkerStyle, Platform, SnapshotConfig, SnapshotEngine,
};

mod cli;

fn main() -> Result<()> {
    let args = cli::parse_args();

    // Initialize logger with appropriate level based on verbose flag
    if std::env::var("RUST_LOG").is_err() {
        if args.verbose {
            std::env::set_var("RUST_LOG", "debug");
        } else {
            std::env::set_var("RUST_LOG", "info");
        }
    }
    env_logger::init();

    let platform = Platform::detect();
    let profile: InstallProfile = args.profile.into();

    // Handle dependency check/install commands
    if args.check_deps {
        print_package_status(profile, platform)?;
        return Ok(());
    }

    if args.install_deps {
        let plan = build_plan(profile, platform);

        if let Some(message) = &plan.unsupported {
            println!("{}", message);
            return Ok(());
        }

        if args.dry_run {
            println!("Would run on {}:", platform.name());
            for command in &plan.commands {
                println!("  {}", command);
            }
            return Ok(());
        }

        let report = run_install(profile, platform)?;
        if let Some(failure) = report.first_failure() {
            eprintln!(
                "Error: '{}' failed with exit code {}",
                failure.command,
                failure
                    .exit_code
                    .map(|c| c.to_string())
                    .unwrap_or_else(|| "unknown".to_string())
            );
            std::process::exit(1);
        }

        println!("Dependencies installed.");
        println!("Run 'mapsnap --check-deps' to verify installation.");
        return Ok(());
    }

    // Snapshot mode requires both coordinate arguments
    let (coord_a, coord_b) = match (&args.coord_a, &args.coord_b) {
        (Some(a), Some(b)) => (a, b),
        _ => anyhow::bail!(
            "Two coordinate arguments are required. Use --help for usage information."
        ),
    };

    let order = if args.lat_first {
        CoordinateOrder::LatLon
    } else {
        CoordinateOrder::LonLat
    };
    let coord = order.parse(coord_a, coord_b)?;

    let config = SnapshotConfig {
        width: args.size,
        height: args.size,
        zoom: args.zoom,
        marker: MarkerStyle {
            color: parse_color(&args.marker_color)?,
            radius: args.marker_radius,
        },
        output: args.output.clone(),
    };

    let engine = SnapshotEngine::new(config)?;
    let written = engine.render_to_file(coord)?;
    log::info!("Snapshot written to {}", written.display());

    if args.geocode {
        match Geocoder::new() {
            Ok(geocoder) => {
                if let Some(place) = geocoder.resolve(coord) {
                    log::info!("Marker location: {}", place);
                }
            }
            Err(e) => log::warn!("Geocoding unavailable: {}", e),
        }
    }

    Ok(())
}
