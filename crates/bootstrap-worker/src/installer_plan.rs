// The default installer plan: SDCC built from source plus the retro-engine
// framework, in the order later steps depend on.

use std::collections::HashMap;
use std::path::PathBuf;

use crate::constants::{exported, step_names, PATH_VARIABLE, PROFILE_MARKER};
use crate::run_context::RunContext;
use crate::settings::Settings;
use crate::step::{CommandSpec, Precondition, RefreshPolicy, Step, StepKind};

/// Minimum `BOOST_VERSION` the toolchain build accepts (1.70.0).
const MIN_BOOST_VERSION: u64 = 107000;

/// Paths the plan derives from the context and settings.
#[derive(Debug, Clone)]
pub struct PlanLayout {
    /// Extracted toolchain sources.
    pub toolchain_source: PathBuf,
    /// Toolchain install prefix.
    pub toolchain_prefix: PathBuf,
    /// Framework checkout.
    pub framework_dir: PathBuf,
}

impl PlanLayout {
    pub fn new(ctx: &RunContext, settings: &Settings) -> Self {
        Self {
            toolchain_source: ctx
                .source_root()
                .join(format!("sdcc-{}", settings.toolchain.version)),
            toolchain_prefix: ctx.install_root().join("sdcc"),
            framework_dir: ctx.install_root().join(&settings.framework.directory_name),
        }
    }
}

/// Build the ordered step list for one run.
pub fn default_plan(ctx: &RunContext, settings: &Settings) -> Vec<Step> {
    let layout = PlanLayout::new(ctx, settings);
    let package_root = ctx.package_root();
    let inherited_path = std::env::var(PATH_VARIABLE).unwrap_or_default();

    let mut steps = vec![
        Step::new(
            step_names::REQUIRE_PACKAGE_MANAGER,
            Precondition::ExecutableOnPath(ctx.package_manager().to_string()),
            StepKind::RequireExecutable {
                program: ctx.package_manager().to_string(),
                guidance: "Install Homebrew from https://brew.sh, then run this installer again."
                    .to_string(),
            },
        ),
        Step::new(
            step_names::REMOVE_LEGACY_DIRECTORIES,
            Precondition::NoneExist(legacy_paths(ctx, settings)),
            StepKind::RemoveLegacy {
                paths: legacy_paths(ctx, settings),
            },
        ),
    ];

    let packages = [
        (
            "boost",
            Precondition::HeaderVersion {
                path: package_root.join("include/boost/version.hpp"),
                define: "BOOST_VERSION".to_string(),
                minimum: MIN_BOOST_VERSION,
            },
        ),
        (
            "bison",
            Precondition::PathExists(package_root.join("opt/bison/bin/bison")),
        ),
        (
            "gputils",
            Precondition::PathExists(package_root.join("bin/gpasm")),
        ),
    ];
    for (package, probe) in packages {
        steps.push(Step::new(
            step_names::install_package(package),
            probe,
            StepKind::InstallPackage {
                package: package.to_string(),
            },
        ));
    }

    steps.push(
        Step::new(
            step_names::FETCH_TOOLCHAIN_SOURCE,
            Precondition::PathExists(layout.toolchain_source.clone()),
            StepKind::FetchArchive {
                url: settings.toolchain.archive_url.clone(),
                target: layout.toolchain_source.clone(),
            },
        )
        .with_refresh(RefreshPolicy::Displace),
    );

    let mut build_env = HashMap::new();
    build_env.insert(
        "CPPFLAGS".to_string(),
        format!("-I{}", package_root.join("include").display()),
    );
    build_env.insert(
        "LDFLAGS".to_string(),
        format!("-L{}", package_root.join("lib").display()),
    );
    build_env.insert(
        PATH_VARIABLE.to_string(),
        prepend_path(&[package_root.join("opt/bison/bin")], &inherited_path),
    );
    let source = &layout.toolchain_source;
    let jobs = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1);
    steps.push(
        Step::new(
            step_names::BUILD_TOOLCHAIN,
            Precondition::PathExists(layout.toolchain_prefix.join("bin/sdcc")),
            StepKind::RunBuild {
                working_dir: source.clone(),
                commands: vec![
                    CommandSpec::new(source.join("configure").to_string_lossy())
                        .arg(format!("--prefix={}", layout.toolchain_prefix.display()))
                        .args(settings.toolchain.configure_args.iter().cloned())
                        .current_dir(source)
                        .envs(&build_env),
                    CommandSpec::new("make")
                        .arg(format!("-j{jobs}"))
                        .current_dir(source)
                        .envs(&build_env),
                    CommandSpec::new("make")
                        .arg("install")
                        .current_dir(source)
                        .envs(&build_env),
                ],
            },
        )
        .with_refresh(RefreshPolicy::Rerun),
    );

    let bin = layout.toolchain_prefix.join("bin");
    for (existing, alias) in &settings.toolchain.links {
        steps.push(
            Step::new(
                step_names::LINK_TOOLCHAIN_EXECUTABLES,
                Precondition::PathExists(bin.join(alias)),
                StepKind::LinkExecutable {
                    source: bin.join(existing),
                    link: bin.join(alias),
                },
            )
            .best_effort(),
        );
    }

    let marker = Precondition::MarkerInFile {
        path: ctx.profile_path().to_path_buf(),
        marker: PROFILE_MARKER.to_string(),
    };
    steps.push(Step::new(
        step_names::CONFIGURE_SHELL_PROFILE,
        marker,
        StepKind::InjectProfile {
            marker: PROFILE_MARKER.to_string(),
            lines: profile_lines(&layout, settings),
        },
    ));

    steps.push(
        Step::new(
            step_names::CLONE_FRAMEWORK,
            Precondition::PathExists(layout.framework_dir.clone()),
            StepKind::CloneRepository {
                url: settings.framework.repository_url.clone(),
                target: layout.framework_dir.clone(),
                recursive: settings.framework.recursive,
            },
        )
        .with_refresh(RefreshPolicy::Displace),
    );

    let mut framework_env = HashMap::new();
    framework_env.insert(
        exported::TOOLCHAIN_HOME.to_string(),
        layout.toolchain_prefix.display().to_string(),
    );
    framework_env.insert(
        PATH_VARIABLE.to_string(),
        prepend_path(&[bin.clone()], &inherited_path),
    );
    steps.push(
        Step::new(
            step_names::BUILD_FRAMEWORK_TOOLS,
            Precondition::PathExists(layout.framework_dir.join(&settings.framework.tools_marker)),
            StepKind::RunBuild {
                working_dir: layout.framework_dir.clone(),
                commands: vec![CommandSpec::new("make")
                    .arg(&settings.framework.build_target)
                    .current_dir(&layout.framework_dir)
                    .envs(&framework_env)],
            },
        )
        .with_refresh(RefreshPolicy::Rerun),
    );

    steps
}

fn legacy_paths(ctx: &RunContext, settings: &Settings) -> Vec<PathBuf> {
    settings
        .legacy_directories
        .iter()
        .map(|name| ctx.install_root().join(name))
        .collect()
}

fn profile_lines(layout: &PlanLayout, settings: &Settings) -> Vec<String> {
    vec![
        format!(
            "export {}=\"{}\"",
            exported::TOOLCHAIN_HOME,
            layout.toolchain_prefix.display()
        ),
        format!(
            "export {}=\"{}\"",
            exported::FRAMEWORK_HOME,
            layout.framework_dir.display()
        ),
        format!(
            "export PATH=\"${}/bin:${}/{}:$PATH\"",
            exported::TOOLCHAIN_HOME,
            exported::FRAMEWORK_HOME,
            settings.framework.tools_marker
        ),
    ]
}

fn prepend_path(dirs: &[PathBuf], inherited: &str) -> String {
    let mut parts: Vec<String> = dirs.iter().map(|d| d.display().to_string()).collect();
    if !inherited.is_empty() {
        parts.push(inherited.to_string());
    }
    parts.join(":")
}
