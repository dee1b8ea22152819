//! Locating the office converter executable

use std::env;
use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use tracing::debug;
use crate::error::{Error, Result};

/// Binary names probed in `PATH`, primary first
pub const CONVERTER_NAMES: &[&str] = &["soffice", "libreoffice"];

/// Converter availability, computed once at startup and passed to whoever needs it
#[derive(Debug, Clone, Default)]
pub struct ConverterEnv {
    tool: Option<PathBuf>,
    /// What was looked for, reported when nothing usable was found
    searched: Vec<String>,
}

impl ConverterEnv {
    /// Probe `PATH` for the converter
    pub fn detect() -> Self {
        let path_var = env::var_os("PATH").unwrap_or_default();
        Self::detect_in(&path_var)
    }

    /// Probe an explicit `PATH`-style search list
    pub fn detect_in(path_var: &OsStr) -> Self {
        let dirs: Vec<PathBuf> = env::split_paths(path_var).collect();
        let searched = CONVERTER_NAMES.iter().map(|s| s.to_string()).collect();
        for name in CONVERTER_NAMES {
            if let Some(found) = find_in_dirs(name, &dirs) {
                debug!("using converter {}", found.display());
                return Self {
                    tool: Some(found),
                    searched,
                };
            }
        }
        debug!("no converter found in PATH");
        Self {
            tool: None,
            searched,
        }
    }

    /// Use an explicitly configured converter executable
    ///
    /// A bare name is looked up in `PATH`; anything with a directory part
    /// must point at an executable file. Otherwise the environment has no
    /// converter and [`require`](Self::require) names `path`.
    pub fn with_tool(path: impl Into<PathBuf>) -> Self {
        let path_var = env::var_os("PATH").unwrap_or_default();
        Self::with_tool_in(path, &path_var)
    }

    /// [`with_tool`](Self::with_tool) with an explicit search list for bare names
    pub fn with_tool_in(path: impl Into<PathBuf>, path_var: &OsStr) -> Self {
        let path = path.into();
        let searched = vec![path.display().to_string()];
        let bare = path
            .parent()
            .map_or(true, |parent| parent.as_os_str().is_empty());

        let tool = if bare {
            let dirs: Vec<PathBuf> = env::split_paths(path_var).collect();
            find_in_dirs(&path.to_string_lossy(), &dirs)
        } else if is_executable(&path) {
            Some(path)
        } else {
            None
        };

        match &tool {
            Some(found) => debug!("using configured converter {}", found.display()),
            None => debug!("configured converter {} is not an executable", searched[0]),
        }
        Self { tool, searched }
    }

    pub fn tool(&self) -> Option<&Path> {
        self.tool.as_deref()
    }

    pub fn is_available(&self) -> bool {
        self.tool.is_some()
    }

    /// The converter path, or `ExternalToolMissing`
    pub fn require(&self) -> Result<&Path> {
        self.tool().ok_or_else(|| Error::ExternalToolMissing {
            searched: if self.searched.is_empty() {
                CONVERTER_NAMES.iter().map(|s| s.to_string()).collect()
            } else {
                self.searched.clone()
            },
        })
    }
}

fn find_in_dirs(name: &str, dirs: &[PathBuf]) -> Option<PathBuf> {
    dirs.iter()
        .flat_map(|dir| candidates(dir, name))
        .find(|candidate| is_executable(candidate))
}

#[cfg(windows)]
fn candidates(dir: &Path, name: &str) -> Vec<PathBuf> {
    vec![dir.join(format!("{name}.exe")), dir.join(format!("{name}.com"))]
}

#[cfg(not(windows))]
fn candidates(dir: &Path, name: &str) -> Vec<PathBuf> {
    vec![dir.join(name)]
}

#[cfg(unix)]
fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;
    path.metadata()
        .map(|m| m.is_file() && m.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

#[cfg(not(unix))]
fn is_executable(path: &Path) -> bool {
    path.is_file()
}
