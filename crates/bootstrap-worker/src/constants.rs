// Installer-wide constants: architecture detection, well-known names and
// the environment variables the installer reads.

use std::fmt;

// ---------------------------------------------------------------------------
// Architecture
// ---------------------------------------------------------------------------

/// CPU architecture of the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Architecture {
    X64,
    Arm64,
    Other,
}

impl fmt::Display for Architecture {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Architecture::X64 => write!(f, "x86_64"),
            Architecture::Arm64 => write!(f, "arm64"),
            Architecture::Other => write!(f, "other"),
        }
    }
}

impl Architecture {
    /// Prefix the package manager installs into on this architecture.
    ///
    /// Apple silicon Homebrew lives under `/opt/homebrew`, Intel under `/usr/local`.
    pub fn package_root(&self) -> &'static str {
        match self {
            Architecture::Arm64 => "/opt/homebrew",
            Architecture::X64 | Architecture::Other => "/usr/local",
        }
    }
}

/// The current CPU architecture, detected at compile time.
#[cfg(target_arch = "x86_64")]
pub const CURRENT_ARCHITECTURE: Architecture = Architecture::X64;
#[cfg(target_arch = "aarch64")]
pub const CURRENT_ARCHITECTURE: Architecture = Architecture::Arm64;
#[cfg(not(any(target_arch = "x86_64", target_arch = "aarch64")))]
pub const CURRENT_ARCHITECTURE: Architecture = Architecture::Other;

// ---------------------------------------------------------------------------
// Top-level constants
// ---------------------------------------------------------------------------

pub const PATH_VARIABLE: &str = "PATH";

/// Suffix appended to a displaced resource's directory name.
pub const BACKUP_SUFFIX: &str = "_old";

/// Marker line written above the injected profile block.
pub const PROFILE_MARKER: &str = "# >>> z80-bootstrap environment >>>";

/// Default package manager program.
pub const PACKAGE_MANAGER: &str = "brew";

/// Exit codes reported by the binary.
pub mod return_code {
    pub const SUCCESS: i32 = 0;
    pub const FAILURE: i32 = 1;
}

/// Environment variables read by [`crate::settings::Settings`].
pub mod variables {
    pub const SETTINGS_FILE: &str = "Z80_BOOTSTRAP_SETTINGS";
    pub const INSTALL_ROOT: &str = "Z80_BOOTSTRAP_INSTALL_ROOT";
    pub const PROFILE: &str = "Z80_BOOTSTRAP_PROFILE";
    pub const PACKAGE_ROOT: &str = "Z80_BOOTSTRAP_PACKAGE_ROOT";
    pub const STEP_TIMEOUT_SECS: &str = "Z80_BOOTSTRAP_STEP_TIMEOUT_SECS";
    pub const FRAMEWORK_URL: &str = "Z80_BOOTSTRAP_FRAMEWORK_URL";
    pub const TOOLCHAIN_URL: &str = "Z80_BOOTSTRAP_TOOLCHAIN_URL";
}

/// Variables exported by the injected profile block.
pub mod exported {
    pub const TOOLCHAIN_HOME: &str = "SDCC_HOME";
    pub const FRAMEWORK_HOME: &str = "RETRO_ENGINE_HOME";
}

/// Names of the steps in the default installer plan.
pub mod step_names {
    pub const REQUIRE_PACKAGE_MANAGER: &str = "require-package-manager";
    pub const REMOVE_LEGACY_DIRECTORIES: &str = "remove-legacy-directories";
    pub const FETCH_TOOLCHAIN_SOURCE: &str = "fetch-toolchain-source";
    pub const BUILD_TOOLCHAIN: &str = "build-toolchain";
    pub const LINK_TOOLCHAIN_EXECUTABLES: &str = "link-toolchain-executables";
    pub const CONFIGURE_SHELL_PROFILE: &str = "configure-shell-profile";
    pub const CLONE_FRAMEWORK: &str = "clone-framework";
    pub const BUILD_FRAMEWORK_TOOLS: &str = "build-framework-tools";

    /// Step name for installing one package.
    pub fn install_package(package: &str) -> String {
        format!("install-{package}")
    }
}
