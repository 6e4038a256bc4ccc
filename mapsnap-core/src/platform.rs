/// Operating system family the process is running on
///
/// Detected once at startup and passed into the package selection logic
/// explicitly, so that selection is a pure function of its inputs rather
/// than something that re-reads the ambient environment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Platform {
    Linux,
    Windows,
    MacOs,
    Other,
}

impl Platform {
    /// Detects the host platform from the compile-time OS constant
    pub fn detect() -> Self {
        Self::from_os_str(std::env::consts::OS)
    }

    /// Maps an OS identifier (as reported by `std::env::consts::OS`) to a
    /// platform family
    pub fn from_os_str(os: &str) -> Self {
        match os {
            "linux" => Platform::Linux,
            "windows" => Platform::Windows,
            "macos" => Platform::MacOs,
            _ => Platform::Other,
        }
    }

    /// Human-readable platform name for log and status output
    pub fn name(&self) -> &'static str {
        match self {
            Platform::Linux => "Linux",
            Platform::Windows => "Windows",
            Platform::MacOs => "macOS",
            Platform::Other => "unknown",
        }
    }

    pub fn is_linux(&self) -> bool {
        matches!(self, Platform::Linux)
    }
}
