// Step definitions: the tagged units of work the orchestrator executes.

use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;

/// An external command, fully resolved before the run starts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    pub program: String,
    pub args: Vec<String>,
    pub working_dir: Option<PathBuf>,
    /// Extra environment on top of the inherited one.
    pub env: HashMap<String, String>,
}

impl CommandSpec {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            working_dir: None,
            env: HashMap::new(),
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn current_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }

    pub fn envs(mut self, env: &HashMap<String, String>) -> Self {
        self.env
            .extend(env.iter().map(|(k, v)| (k.clone(), v.clone())));
        self
    }
}

impl fmt::Display for CommandSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program)?;
        for arg in &self.args {
            write!(f, " {arg}")?;
        }
        Ok(())
    }
}

/// A side-effect free check deciding whether a step's work is already done.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Precondition {
    /// An executable is reachable on `PATH` or in the package root's `bin/`.
    ExecutableOnPath(String),
    /// A marker file or directory exists.
    PathExists(PathBuf),
    /// A header exists and `#define <define> <n>` has `n >= minimum`.
    HeaderVersion {
        path: PathBuf,
        define: String,
        minimum: u64,
    },
    /// A file contains the marker substring.
    MarkerInFile { path: PathBuf, marker: String },
    /// None of the paths exist.
    NoneExist(Vec<PathBuf>),
    AllOf(Vec<Precondition>),
    Never,
}

/// How the run-wide refresh flag applies to a step whose precondition holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshPolicy {
    /// Refresh is ignored; the precondition alone decides.
    Never,
    /// Refresh re-runs the action as-is.
    Rerun,
    /// Refresh displaces the existing resource to `<name>_old`, then re-runs.
    Displace,
}

/// The action a step performs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepKind {
    /// A prerequisite the installer cannot install itself.
    RequireExecutable { program: String, guidance: String },
    InstallPackage { package: String },
    /// Download an archive and extract it next to `target`; extraction must create `target`.
    FetchArchive { url: String, target: PathBuf },
    CloneRepository {
        url: String,
        target: PathBuf,
        recursive: bool,
    },
    RunBuild {
        working_dir: PathBuf,
        commands: Vec<CommandSpec>,
    },
    InjectProfile { marker: String, lines: Vec<String> },
    LinkExecutable { source: PathBuf, link: PathBuf },
    RemoveLegacy { paths: Vec<PathBuf> },
}

impl StepKind {
    /// The resource a displacing refresh moves aside.
    pub fn target(&self) -> Option<&PathBuf> {
        match self {
            StepKind::FetchArchive { target, .. } | StepKind::CloneRepository { target, .. } => {
                Some(target)
            }
            _ => None,
        }
    }
}

/// One ordered unit of provisioning work.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Step {
    pub name: String,
    pub precondition: Precondition,
    pub kind: StepKind,
    pub refresh: RefreshPolicy,
    /// A failing best-effort step is reported but does not stop the run.
    pub best_effort: bool,
}

impl Step {
    pub fn new(name: impl Into<String>, precondition: Precondition, kind: StepKind) -> Self {
        Self {
            name: name.into(),
            precondition,
            kind,
            refresh: RefreshPolicy::Never,
            best_effort: false,
        }
    }

    pub fn with_refresh(mut self, policy: RefreshPolicy) -> Self {
        self.refresh = policy;
        self
    }

    pub fn best_effort(mut self) -> Self {
        self.best_effort = true;
        self
    }
}
