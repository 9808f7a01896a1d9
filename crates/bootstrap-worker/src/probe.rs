// Environment probes backing step preconditions.

use bootstrap_sdk::{IOUtil, WhichUtil};
use once_cell::sync::Lazy;
use regex::Regex;
use std::path::{Path, PathBuf};

use crate::run_context::RunContext;
use crate::step::Precondition;

static DEFINE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?m)^\s*#\s*define\s+(\w+)\s+(\d+)").expect("valid regex"));

impl Precondition {
    /// Whether the step's postcondition already holds. Never fails: anything
    /// that cannot be inspected counts as unsatisfied.
    pub fn is_satisfied(&self, ctx: &RunContext) -> bool {
        match self {
            Precondition::ExecutableOnPath(name) => find_executable(name, ctx).is_some(),
            Precondition::PathExists(path) => path.exists(),
            Precondition::HeaderVersion {
                path,
                define,
                minimum,
            } => header_version(path, define).is_some_and(|v| v >= *minimum),
            Precondition::MarkerInFile { path, marker } => {
                IOUtil::file_contains_text(path, marker)
            }
            Precondition::NoneExist(paths) => paths.iter().all(|p| p.symlink_metadata().is_err()),
            Precondition::AllOf(all) => all.iter().all(|p| p.is_satisfied(ctx)),
            Precondition::Never => false,
        }
    }
}

/// Find `name` on `PATH`, falling back to the package root's `bin/`, which a
/// fresh package manager install may not have added to `PATH` yet.
pub fn find_executable(name: &str, ctx: &RunContext) -> Option<PathBuf> {
    if let Ok(Some(path)) = WhichUtil::which(name, false) {
        return Some(path);
    }
    WhichUtil::which_in(name, ctx.package_root().join("bin"))
}

/// Read the numeric value of `#define <define> <n>` from a header.
pub fn header_version(path: &Path, define: &str) -> Option<u64> {
    let bytes = std::fs::read(path).ok()?;
    parse_define(&String::from_utf8_lossy(&bytes), define)
}

fn parse_define(text: &str, define: &str) -> Option<u64> {
    DEFINE_RE
        .captures_iter(text)
        .find(|c| &c[1] == define)
        .and_then(|c| c[2].parse().ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::Architecture;
    use crate::settings::Settings;

    const BOOST_HEADER: &str = r#"
#ifndef BOOST_VERSION_HPP
#define BOOST_VERSION_HPP
//  BOOST_VERSION % 100 is the patch level
#define BOOST_VERSION 108300
#define BOOST_LIB_VERSION "1_83"
#endif
"#;

    fn ctx_with_package_root(root: &Path) -> RunContext {
        let mut settings = Settings::with_home(root);
        settings.package_root = Some(root.to_path_buf());
        RunContext::for_architecture(&settings, false, Architecture::Arm64)
    }

    #[test]
    fn parses_numeric_define() {
        assert_eq!(parse_define(BOOST_HEADER, "BOOST_VERSION"), Some(108300));
        assert_eq!(parse_define(BOOST_HEADER, "BOOST_LIB_VERSION"), None);
        assert_eq!(parse_define(BOOST_HEADER, "MISSING"), None);
    }

    #[test]
    fn header_version_gate() {
        let dir = tempfile::tempdir().unwrap();
        let header = dir.path().join("version.hpp");
        std::fs::write(&header, BOOST_HEADER).unwrap();
        let ctx = ctx_with_package_root(dir.path());

        let new_enough = Precondition::HeaderVersion {
            path: header.clone(),
            define: "BOOST_VERSION".into(),
            minimum: 107000,
        };
        let too_old = Precondition::HeaderVersion {
            path: header,
            define: "BOOST_VERSION".into(),
            minimum: 109000,
        };
        assert!(new_enough.is_satisfied(&ctx));
        assert!(!too_old.is_satisfied(&ctx));
    }

    #[test]
    fn missing_header_is_unsatisfied() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = ctx_with_package_root(dir.path());
        let probe = Precondition::HeaderVersion {
            path: dir.path().join("include/boost/version.hpp"),
            define: "BOOST_VERSION".into(),
            minimum: 1,
        };
        assert!(!probe.is_satisfied(&ctx));
    }

    #[test]
    fn marker_in_file() {
        let dir = tempfile::tempdir().unwrap();
        let profile = dir.path().join(".zshrc");
        let ctx = ctx_with_package_root(dir.path());
        let probe = Precondition::MarkerInFile {
            path: profile.clone(),
            marker: "# z80".into(),
        };

        assert!(!probe.is_satisfied(&ctx));
        std::fs::write(&profile, "export A=1\n# z80\n").unwrap();
        assert!(probe.is_satisfied(&ctx));
    }

    #[test]
    fn none_exist_and_all_of() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = ctx_with_package_root(dir.path());
        let legacy = dir.path().join("z80engine");
        let gone = Precondition::NoneExist(vec![legacy.clone()]);
        assert!(gone.is_satisfied(&ctx));

        std::fs::create_dir(&legacy).unwrap();
        assert!(!gone.is_satisfied(&ctx));

        let both = Precondition::AllOf(vec![Precondition::PathExists(legacy), Precondition::Never]);
        assert!(!both.is_satisfied(&ctx));
    }

    #[cfg(unix)]
    #[test]
    fn executable_found_in_package_root_bin() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let bin = dir.path().join("bin");
        std::fs::create_dir(&bin).unwrap();
        let tool = bin.join("gpasm-probe-test");
        std::fs::write(&tool, "#!/bin/sh\n").unwrap();
        std::fs::set_permissions(&tool, std::fs::Permissions::from_mode(0o755)).unwrap();

        let ctx = ctx_with_package_root(dir.path());
        assert!(Precondition::ExecutableOnPath("gpasm-probe-test".into()).is_satisfied(&ctx));
        assert!(!Precondition::ExecutableOnPath("nonexistent_command_xyz_123".into()).is_satisfied(&ctx));
    }
}
