use anyhow::{Context, Result};
use std::fmt;
use std::process::Command;

use crate::platform::Platform;

/// Package selection profile for the native dependency installer
///
/// `Full` matches builds that link against libcurl in addition to the
/// graphics/windowing stack; `Minimal` covers the graphics/windowing stack
/// only and refuses to guess at a package manager on non-Linux hosts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstallProfile {
    Full,
    Minimal,
}

impl InstallProfile {
    pub fn name(&self) -> &'static str {
        match self {
            InstallProfile::Full => "full",
            InstallProfile::Minimal => "minimal",
        }
    }
}

/// Development packages installed via apt on Linux hosts
const APT_PACKAGES_FULL: &[&str] = &[
    "libcurl4-openssl-dev",
    "freeglut3-dev",
    "libwayland-dev",
    "libxkbcommon-dev",
    "xorg-dev",
];

const APT_PACKAGES_MINIMAL: &[&str] = &[
    "freeglut3-dev",
    "libwayland-dev",
    "libxkbcommon-dev",
    "xorg-dev",
];

/// Packages installed via vcpkg on non-Linux hosts under the full profile
const VCPKG_PACKAGES: &[&str] = &["curl"];

/// Returns the package list for a profile on a platform
///
/// Pure function of its inputs; an empty slice means the combination
/// installs nothing.
pub fn packages(profile: InstallProfile, platform: Platform) -> &'static [&'static str] {
    match (platform, profile) {
        (Platform::Linux, InstallProfile::Full) => APT_PACKAGES_FULL,
        (Platform::Linux, InstallProfile::Minimal) => APT_PACKAGES_MINIMAL,
        (_, InstallProfile::Full) => VCPKG_PACKAGES,
        (_, InstallProfile::Minimal) => &[],
    }
}

/// A single package-manager invocation within an install plan
///
/// `required` steps abort the plan on failure; best-effort steps (enabling
/// an already-enabled repository, refreshing an index that the install step
/// would surface anyway) only log theirs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedCommand {
    pub program: &'static str,
    pub args: Vec<String>,
    pub required: bool,
}

impl PlannedCommand {
    fn new(program: &'static str, args: &[&str], required: bool) -> Self {
        Self {
            program,
            args: args.iter().map(|s| s.to_string()).collect(),
            required,
        }
    }
}

impl fmt::Display for PlannedCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program)?;
        for arg in &self.args {
            write!(f, " {}", arg)?;
        }
        Ok(())
    }
}

/// The full command sequence the installer would run
#[derive(Debug, Clone)]
pub struct InstallPlan {
    pub commands: Vec<PlannedCommand>,
    /// Set when the profile takes no action on this platform
    pub unsupported: Option<String>,
}

/// Builds the install plan for a profile on a platform
///
/// Pure function; execution (and sudo escalation) happens in
/// [`run_install`].
pub fn build_plan(profile: InstallProfile, platform: Platform) -> InstallPlan {
    if platform.is_linux() {
        let mut install_args = vec!["install", "-y"];
        install_args.extend_from_slice(packages(profile, platform));

        return InstallPlan {
            commands: vec![
                PlannedCommand::new("add-apt-repository", &["universe"], false),
                PlannedCommand::new("apt-get", &["update"], false),
                PlannedCommand::new("apt-get", &install_args, true),
            ],
            unsupported: None,
        };
    }

    match profile {
        InstallProfile::Full => {
            let mut args = vec!["install"];
            args.extend_from_slice(VCPKG_PACKAGES);
            InstallPlan {
                commands: vec![PlannedCommand::new("vcpkg", &args, true)],
                unsupported: None,
            }
        }
        InstallProfile::Minimal => InstallPlan {
            commands: Vec::new(),
            unsupported: Some(format!(
                "Dependency installation is not supported on {} under the minimal profile. \
                 Install the packages manually: {}",
                platform.name(),
                APT_PACKAGES_MINIMAL.join(", ")
            )),
        },
    }
}

/// Result of executing one planned command
#[derive(Debug, Clone)]
pub struct StepOutcome {
    /// The command line as planned (without any sudo prefix)
    pub command: String,
    pub success: bool,
    pub exit_code: Option<i32>,
    pub required: bool,
}

/// Aggregate outcome of an installer run
///
/// The underlying package-manager exit statuses are captured per step and
/// surfaced to the caller instead of being discarded.
#[derive(Debug, Clone)]
pub struct InstallReport {
    pub steps: Vec<StepOutcome>,
    pub unsupported: Option<String>,
}

impl InstallReport {
    /// True when every required step ran and exited successfully
    pub fn success(&self) -> bool {
        self.steps
            .iter()
            .filter(|s| s.required)
            .all(|s| s.success)
    }

    /// The first failed required step, if any
    pub fn first_failure(&self) -> Option<&StepOutcome> {
        self.steps.iter().find(|s| s.required && !s.success)
    }
}

/// Executes the install plan for a profile on a platform
///
/// Commands run through the system package manager with `sudo` prefixed on
/// Linux when not already root. A failed required step aborts the remainder
/// of the plan; the report carries the exit status of every step that ran.
pub fn run_install(profile: InstallProfile, platform: Platform) -> Result<InstallReport> {
    let plan = build_plan(profile, platform);

    if let Some(message) = &plan.unsupported {
        return Ok(InstallReport {
            steps: Vec::new(),
            unsupported: Some(message.clone()),
        });
    }

    // Fail up front when the package manager itself is missing, rather than
    // per-step with a confusing os error
    let manager = plan
        .commands
        .iter()
        .find(|c| c.required)
        .map(|c| c.program)
        .unwrap_or("apt-get");
    which::which(manager)
        .with_context(|| format!("{} not found in PATH", manager))?;

    let needs_sudo = platform.is_linux() && !running_as_root();
    let mut steps = Vec::new();

    for planned in &plan.commands {
        log::info!("Running: {}", planned);

        let status = if needs_sudo {
            Command::new("sudo")
                .arg(planned.program)
                .args(&planned.args)
                .status()
        } else {
            Command::new(planned.program)
                .args(&planned.args)
                .status()
        };

        let outcome = match status {
            Ok(status) => StepOutcome {
                command: planned.to_string(),
                success: status.success(),
                exit_code: status.code(),
                required: planned.required,
            },
            Err(e) => {
                log::warn!("Failed to execute {}: {}", planned.program, e);
                StepOutcome {
                    command: planned.to_string(),
                    success: false,
                    exit_code: None,
                    required: planned.required,
                }
            }
        };

        let abort = planned.required && !outcome.success;
        if !outcome.success && !planned.required {
            log::warn!("Best-effort step failed, continuing: {}", planned);
        }
        steps.push(outcome);

        if abort {
            break;
        }
    }

    Ok(InstallReport {
        steps,
        unsupported: None,
    })
}

/// Prints the per-package installation status for `--check-deps`
pub fn print_package_status(profile: InstallProfile, platform: Platform) -> Result<()> {
    println!("\n==================================================");
    println!("  Package Status ({} profile, {})", profile.name(), platform.name());
    println!("==================================================\n");

    if platform.is_linux() {
        let mut missing = 0;
        for package in packages(profile, platform) {
            let installed = dpkg_package_installed(package);
            let status = if installed { "✓" } else { "✗" };
            println!("{} {}", status, package);
            if !installed {
                missing += 1;
            }
        }
        println!();
        if missing > 0 {
            println!("{} package(s) missing. Run 'mapsnap --install-deps' to install them.\n", missing);
        } else {
            println!("All packages installed.\n");
        }
        return Ok(());
    }

    match profile {
        InstallProfile::Full => {
            let vcpkg_found = which::which("vcpkg").is_ok();
            let status = if vcpkg_found { "✓" } else { "✗" };
            println!("{} vcpkg", status);
            for package in VCPKG_PACKAGES {
                println!("  would install: {}", package);
            }
            println!();
            if !vcpkg_found {
                println!("vcpkg not found in PATH; install it from https://vcpkg.io\n");
            }
        }
        InstallProfile::Minimal => {
            if let Some(message) = build_plan(profile, platform).unsupported {
                println!("{}\n", message);
            }
        }
    }

    Ok(())
}

/// Checks whether a Debian package is installed via dpkg
fn dpkg_package_installed(package: &str) -> bool {
    Command::new("dpkg")
        .args(["-s", package])
        .output()
        .map(|o| o.status.success())
        .unwrap_or(false)
}

fn running_as_root() -> bool {
    std::env::var("USER").unwrap_or_default() == "root"
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_full_linux_packages() {
        let pkgs = packages(InstallProfile::Full, Platform::Linux);
        assert_eq!(
            pkgs,
            &[
                "libcurl4-openssl-dev",
                "freeglut3-dev",
                "libwayland-dev",
                "libxkbcommon-dev",
                "xorg-dev",
            ]
        );
    }

    #[test]
    fn test_minimal_linux_packages_exclude_curl() {
        let pkgs = packages(InstallProfile::Minimal, Platform::Linux);
        assert_eq!(
            pkgs,
            &["freeglut3-dev", "libwayland-dev", "libxkbcommon-dev", "xorg-dev"]
        );
        assert!(!pkgs.contains(&"libcurl4-openssl-dev"));
    }

    #[test]
    fn test_linux_plan_sequence() {
        let plan = build_plan(InstallProfile::Full, Platform::Linux);
        assert!(plan.unsupported.is_none());
        assert_eq!(plan.commands.len(), 3);

        assert_eq!(plan.commands[0].program, "add-apt-repository");
        assert_eq!(plan.commands[0].args, vec!["universe"]);
        assert!(!plan.commands[0].required);

        assert_eq!(plan.commands[1].program, "apt-get");
        assert_eq!(plan.commands[1].args, vec!["update"]);

        assert_eq!(plan.commands[2].program, "apt-get");
        assert_eq!(plan.commands[2].args[0], "install");
        assert_eq!(plan.commands[2].args[1], "-y");
        assert!(plan.commands[2].required);
    }

    #[test]
    fn test_linux_install_command_carries_exact_package_list() {
        let plan = build_plan(InstallProfile::Full, Platform::Linux);
        let install = &plan.commands[2];
        let tail: Vec<&str> = install.args[2..].iter().map(|s| s.as_str()).collect();
        assert_eq!(
            tail,
            vec![
                "libcurl4-openssl-dev",
                "freeglut3-dev",
                "libwayland-dev",
                "libxkbcommon-dev",
                "xorg-dev",
            ]
        );

        let plan = build_plan(InstallProfile::Minimal, Platform::Linux);
        let install = &plan.commands[2];
        assert!(!install.args.iter().any(|a| a == "libcurl4-openssl-dev"));
        assert_eq!(install.args.len(), 2 + 4);
    }

    #[test]
    fn test_full_non_linux_uses_vcpkg() {
        for platform in [Platform::Windows, Platform::MacOs, Platform::Other] {
            let plan = build_plan(InstallProfile::Full, platform);
            assert!(plan.unsupported.is_none());
            assert_eq!(plan.commands.len(), 1);
            assert_eq!(plan.commands[0].program, "vcpkg");
            assert_eq!(plan.commands[0].args, vec!["install", "curl"]);
            assert!(plan.commands[0].required);
        }
    }

    #[test]
    fn test_minimal_non_linux_takes_no_action() {
        let plan = build_plan(InstallProfile::Minimal, Platform::Windows);
        assert!(plan.commands.is_empty());
        let message = plan.unsupported.expect("expected unsupported notice");
        assert!(message.contains("not supported"));
        assert!(message.contains("Windows"));
    }

    #[test]
    fn test_planned_command_display() {
        let cmd = PlannedCommand::new("apt-get", &["install", "-y", "xorg-dev"], true);
        assert_eq!(cmd.to_string(), "apt-get install -y xorg-dev");
    }

    #[test]
    fn test_report_success_ignores_best_effort_failures() {
        let report = InstallReport {
            steps: vec![
                StepOutcome {
                    command: "add-apt-repository universe".into(),
                    success: false,
                    exit_code: Some(1),
                    required: false,
                },
                StepOutcome {
                    command: "apt-get install -y xorg-dev".into(),
                    success: true,
                    exit_code: Some(0),
                    required: true,
                },
            ],
            unsupported: None,
        };
        assert!(report.success());
        assert!(report.first_failure().is_none());
    }

    #[test]
    fn test_report_failure_names_failed_step() {
        let report = InstallReport {
            steps: vec![StepOutcome {
                command: "apt-get install -y xorg-dev".into(),
                success: false,
                exit_code: Some(100),
                required: true,
            }],
            unsupported: None,
        };
        assert!(!report.success());
        let failure = report.first_failure().unwrap();
        assert_eq!(failure.exit_code, Some(100));
        assert!(failure.command.contains("apt-get install"));
    }

    #[test]
    fn test_unsupported_report_counts_as_success() {
        // The original script printed a notice and exited 0; a no-op run is
        // not a failure
        let report = run_install(InstallProfile::Minimal, Platform::Windows).unwrap();
        assert!(report.steps.is_empty());
        assert!(report.unsupported.is_some());
        assert!(report.success());
    }
}
