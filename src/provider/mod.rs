//! =============================================================================
//! Compiler Provider
//! =============================================================================
//!
//! Responsible for locating `metaeditor.exe` and deciding how to launch it.
//! On Windows the compiler runs directly; everywhere else it goes through a
//! small wine shim that is generated once inside the data directory.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::config::{FALLBACK_COMPILER, PluginSettings};

pub const SHIM_FILE_NAME: &str = "metaeditor.sh";

/// Environment variable the shim reads the compiler location from.
pub const SHIM_COMPILER_ENV: &str = "MQ_BRIDGE_COMPILER";

const SHIM_SCRIPT: &str = "#!/bin/sh\n\
# Generated by mq-bridge. Usage: metaeditor.sh <target> <log>\n\
exec wine \"$MQ_BRIDGE_COMPILER\" \"/compile:$1\" \"/log:$2\" /s\n";

/// Everything needed to run one compilation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompilerBinary {
    pub executable: PathBuf,
    pub launcher: Launcher,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Launcher {
    /// Execute `metaeditor.exe` itself.
    Native,
    /// Execute the shim script, which forwards to wine.
    Shim(PathBuf),
}

#[derive(Debug)]
pub struct Provider {
    compiler_path: Option<PathBuf>,
    data_dir: PathBuf,
}

impl Provider {
    pub fn new(settings: &PluginSettings, data_dir: impl Into<PathBuf>) -> Self {
        Self {
            compiler_path: settings.compiler_path.clone(),
            data_dir: data_dir.into(),
        }
    }

    /// Resolves the compiler from the configured path or the conventional
    /// relative fallback and prepares the launcher for this platform.
    pub fn resolve(&self) -> Result<CompilerBinary, ProviderError> {
        let executable = self
            .compiler_path
            .clone()
            .unwrap_or_else(|| PathBuf::from(FALLBACK_COMPILER));

        if cfg!(windows) {
            return Ok(CompilerBinary {
                executable,
                launcher: Launcher::Native,
            });
        }

        if let Err(err) = which::which("wine") {
            log::warn!("wine not found on PATH ({err}); compilation will likely fail");
        }
        let shim = ensure_shim(&self.data_dir)?;
        Ok(CompilerBinary {
            executable,
            launcher: Launcher::Shim(shim),
        })
    }
}

/// Writes the shim script if it does not exist yet and returns its path.
pub fn ensure_shim(data_dir: &Path) -> Result<PathBuf, ProviderError> {
    let path = data_dir.join(SHIM_FILE_NAME);
    if path.is_file() {
        return Ok(path);
    }
    fs::create_dir_all(data_dir).map_err(|source| ProviderError::DataDir {
        path: data_dir.to_path_buf(),
        source,
    })?;
    fs::write(&path, SHIM_SCRIPT).map_err(|source| ProviderError::Shim {
        path: path.clone(),
        source,
    })?;
    make_executable(&path).map_err(|source| ProviderError::Shim {
        path: path.clone(),
        source,
    })?;
    log::info!("wrote compiler shim to {}", path.display());
    Ok(path)
}

#[cfg(unix)]
fn make_executable(path: &Path) -> io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, fs::Permissions::from_mode(0o755))
}

#[cfg(not(unix))]
fn make_executable(_path: &Path) -> io::Result<()> {
    Ok(())
}

#[derive(thiserror::Error, Debug)]
pub enum ProviderError {
    #[error("failed to create data directory {path:?}: {source}")]
    DataDir { path: PathBuf, source: io::Error },
    #[error("failed to write compiler shim {path:?}: {source}")]
    Shim { path: PathBuf, source: io::Error },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ensure_shim_writes_once() {
        let dir = tempfile::tempdir().expect("tempdir");
        let nested = dir.path().join("data");
        let path = ensure_shim(&nested).expect("shim written");
        assert_eq!(fs::read_to_string(&path).unwrap(), SHIM_SCRIPT);

        fs::write(&path, "#!/bin/sh\n# edited by hand\n").unwrap();
        let again = ensure_shim(&nested).expect("shim kept");
        assert_eq!(again, path);
        assert_eq!(
            fs::read_to_string(&path).unwrap(),
            "#!/bin/sh\n# edited by hand\n"
        );
    }

    #[cfg(unix)]
    #[test]
    fn shim_is_executable() {
        use std::os::unix::fs::PermissionsExt;
        let dir = tempfile::tempdir().expect("tempdir");
        let path = ensure_shim(dir.path()).expect("shim written");
        let mode = fs::metadata(path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o755);
    }

    #[test]
    fn resolve_prefers_configured_path() {
        let dir = tempfile::tempdir().expect("tempdir");
        let settings = PluginSettings {
            compiler_path: Some(PathBuf::from("/opt/mt4/metaeditor.exe")),
            ..PluginSettings::default()
        };
        let binary = Provider::new(&settings, dir.path()).resolve().unwrap();
        assert_eq!(binary.executable, PathBuf::from("/opt/mt4/metaeditor.exe"));
        if cfg!(windows) {
            assert_eq!(binary.launcher, Launcher::Native);
        } else {
            assert_eq!(
                binary.launcher,
                Launcher::Shim(dir.path().join(SHIM_FILE_NAME))
            );
        }
    }

    #[test]
    fn resolve_falls_back_to_relative_compiler() {
        let dir = tempfile::tempdir().expect("tempdir");
        let binary = Provider::new(&PluginSettings::default(), dir.path())
            .resolve()
            .unwrap();
        assert_eq!(binary.executable, PathBuf::from(FALLBACK_COMPILER));
    }
}
