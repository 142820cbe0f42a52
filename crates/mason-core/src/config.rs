//! Build model records produced by interpreting a build file.

use std::collections::BTreeMap;

/// What kind of artifact a target produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TargetType {
    #[default]
    Executable,
    StaticLibrary,
    SharedLibrary,
    Object,
    Custom,
}

impl TargetType {
    /// Stable lowercase label used in graph exports and build-file output.
    pub fn label(&self) -> &'static str {
        match self {
            TargetType::Executable => "executable",
            TargetType::StaticLibrary => "static_library",
            TargetType::SharedLibrary => "shared_library",
            TargetType::Object => "object",
            TargetType::Custom => "custom",
        }
    }
}

/// A single build artifact with its resolved inputs.
///
/// `sources` is the concrete file list at evaluation time; glob expansion is
/// eager, and the list is kept in declaration order without deduplication.
#[derive(Debug, Clone, Default)]
pub struct Target {
    pub name: String,
    pub kind: TargetType,
    pub sources: Vec<String>,
    pub includes: Vec<String>,
    pub flags: Vec<String>,
    pub link_flags: Vec<String>,
    pub dependencies: Vec<String>,
    pub defines: BTreeMap<String, String>,
}

/// An external dependency declared with a `dependency` block.
#[derive(Debug, Clone, Default)]
pub struct DependencyInfo {
    pub name: String,
    pub version: String,
    /// How the dependency is located: system, pkg-config, subproject, ...
    pub kind: String,
    pub include_dirs: Vec<String>,
    pub link_dirs: Vec<String>,
    pub libraries: Vec<String>,
}

/// The structured result of interpreting a build file: project metadata,
/// global compiler settings, targets, external dependencies and task names.
/// Built up incrementally during interpretation and frozen at pipeline end.
#[derive(Debug, Clone, Default)]
pub struct BuildConfig {
    pub project_name: String,
    pub version: String,
    pub license: String,
    /// One of "c", "cpp" or "mixed" when set.
    pub language: String,
    pub standard: String,

    pub global_flags: Vec<String>,
    pub global_includes: Vec<String>,
    pub global_defines: BTreeMap<String, String>,
    /// Explicit compiler overrides from the compiler block.
    pub cc: Option<String>,
    pub cxx: Option<String>,

    pub targets: Vec<Target>,
    pub dependencies: Vec<DependencyInfo>,
    /// Task names in declaration order; bodies live on the interpreter.
    pub tasks: Vec<String>,
}

impl BuildConfig {
    pub fn target(&self, name: &str) -> Option<&Target> {
        self.targets.iter().find(|t| t.name == name)
    }

    pub fn has_target(&self, name: &str) -> bool {
        self.target(name).is_some()
    }
}
