//! Locating the real CNI plugin next to the wrapper.

use crate::config::Config;
use crate::error::{Result, WrapperError};
use std::ffi::{OsStr, OsString};
use std::path::{Path, PathBuf};

/// Absolute directory and file name the wrapper was invoked as.
///
/// `argv0` is resolved against the working directory, not through symlinks,
/// so a wrapper installed as a link named after the plugin still finds
/// `<link-name>-impl`. A bare name (PATH lookup) falls back to the directory
/// of the running executable.
pub fn wrapper_location(argv0: &OsStr) -> Result<(PathBuf, OsString)> {
    let invoked = Path::new(argv0);
    let name = invoked
        .file_name()
        .ok_or_else(|| WrapperError::Location(format!("invalid program name {:?}", argv0)))?
        .to_os_string();

    let has_dir = invoked
        .parent()
        .map(|parent| !parent.as_os_str().is_empty())
        .unwrap_or(false);

    let absolute = if invoked.is_absolute() {
        invoked.to_path_buf()
    } else if has_dir {
        std::env::current_dir()
            .map_err(|e| WrapperError::Location(e.to_string()))?
            .join(invoked)
    } else {
        std::env::current_exe().map_err(|e| WrapperError::Location(e.to_string()))?
    };

    let dir = absolute
        .parent()
        .map(Path::to_path_buf)
        .ok_or_else(|| WrapperError::Location(format!("{} has no parent directory", absolute.display())))?;

    Ok((dir, name))
}

/// Path of the sibling plugin for a wrapper living in `dir` as `name`.
pub fn sibling_plugin_path(dir: &Path, name: &OsStr, suffix: &str) -> PathBuf {
    let mut file_name = name.to_os_string();
    file_name.push(suffix);
    dir.join(file_name)
}

/// Resolve the plugin binary the wrapper delegates to.
///
/// Fails with [`WrapperError::PluginNotFound`] when nothing exists at the
/// resolved path.
pub fn resolve_plugin(config: &Config, argv0: &OsStr) -> Result<PathBuf> {
    let path = match &config.plugin_path {
        Some(path) => path.clone(),
        None => {
            let (dir, name) = wrapper_location(argv0)?;
            sibling_plugin_path(&dir, &name, &config.plugin_suffix)
        }
    };

    if !path.exists() {
        return Err(WrapperError::PluginNotFound(path));
    }

    tracing::debug!("Resolved CNI plugin at {}", path.display());
    Ok(path)
}
