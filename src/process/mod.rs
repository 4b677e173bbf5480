//! =============================================================================
//! Compiler Process Management
//! =============================================================================
//!
//! Runs MetaEditor against a single file and hands back the decoded log.
//! The compiler's exit status says nothing useful about the build, so it is
//! ignored; the log file is the only source of truth.

mod decode;

pub use decode::{DecodeError, decode_utf16le};

use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, ExitStatus, Stdio};
use std::thread;
use std::time::{Duration, Instant};

use crate::provider::{CompilerBinary, Launcher, SHIM_COMPILER_ENV};

const POLL_INTERVAL: Duration = Duration::from_millis(25);

/// Boundary between the diagnostic parser and whatever produces the log.
pub trait ToolchainAdapter: Send {
    /// Compiles `target` and returns the decoded log written to `log_path`.
    fn compile(&self, target: &str, log_path: &Path) -> Result<String, CompileError>;
}

/// Invokes the real MetaEditor executable.
#[derive(Debug, Clone)]
pub struct MetaEditor {
    binary: CompilerBinary,
    timeout: Option<Duration>,
}

impl MetaEditor {
    pub fn new(binary: CompilerBinary, timeout: Option<Duration>) -> Self {
        Self { binary, timeout }
    }

    fn command(&self, target: &str, log_path: &Path) -> Command {
        let mut command = match &self.binary.launcher {
            Launcher::Native => {
                let mut command = Command::new(&self.binary.executable);
                command.arg(format!("/compile:{target}"));
                command.arg(format!("/log:{}", log_path.display()));
                command.arg("/s");
                command
            }
            Launcher::Shim(shim) => {
                let mut command = Command::new(shim);
                command.env(SHIM_COMPILER_ENV, &self.binary.executable);
                command.arg(target);
                command.arg(log_path);
                command
            }
        };
        command.stdin(Stdio::null());
        command.stdout(Stdio::null());
        command.stderr(Stdio::null());
        command
    }
}

impl ToolchainAdapter for MetaEditor {
    fn compile(&self, target: &str, log_path: &Path) -> Result<String, CompileError> {
        let mut command = self.command(target, log_path);
        log::debug!("metaeditor command: {command:?}");

        let mut child = command.spawn().map_err(CompileError::Spawn)?;
        match wait_with_timeout(&mut child, self.timeout) {
            Ok(status) => log::debug!("metaeditor exited with {status}"),
            Err(WaitError::TimedOut(limit)) => return Err(CompileError::Timeout(limit)),
            Err(WaitError::Io(err)) => log::warn!("failed to wait for metaeditor: {err}"),
        }

        read_log(log_path)
    }
}

/// Reads and decodes a MetaEditor log file.
pub fn read_log(log_path: &Path) -> Result<String, CompileError> {
    let bytes = fs::read(log_path).map_err(|source| CompileError::ReadLog {
        path: log_path.to_path_buf(),
        source,
    })?;
    decode_utf16le(&bytes).map_err(CompileError::Decode)
}

enum WaitError {
    TimedOut(Duration),
    Io(std::io::Error),
}

fn wait_with_timeout(child: &mut Child, timeout: Option<Duration>) -> Result<ExitStatus, WaitError> {
    let Some(limit) = timeout else {
        return child.wait().map_err(WaitError::Io);
    };

    let deadline = Instant::now() + limit;
    loop {
        if let Some(status) = child.try_wait().map_err(WaitError::Io)? {
            return Ok(status);
        }
        if Instant::now() >= deadline {
            log::warn!("metaeditor did not finish within {limit:?}; killing it");
            let _ = child.kill();
            let _ = child.wait();
            return Err(WaitError::TimedOut(limit));
        }
        thread::sleep(POLL_INTERVAL);
    }
}

#[derive(thiserror::Error, Debug)]
pub enum CompileError {
    #[error("failed to spawn metaeditor: {0}")]
    Spawn(std::io::Error),
    #[error("metaeditor timed out after {0:?}")]
    Timeout(Duration),
    #[error("failed to read compiler log {path:?}: {source}")]
    ReadLog {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to decode compiler log: {0}")]
    Decode(DecodeError),
}

#[cfg(test)]
mod tests {
    use super::*;

    fn binary(launcher: Launcher) -> CompilerBinary {
        CompilerBinary {
            executable: PathBuf::from("/opt/mt4/metaeditor.exe"),
            launcher,
        }
    }

    fn args(command: &Command) -> Vec<String> {
        command
            .get_args()
            .map(|arg| arg.to_string_lossy().into_owned())
            .collect()
    }

    #[test]
    fn native_launcher_passes_metaeditor_flags() {
        let editor = MetaEditor::new(binary(Launcher::Native), None);
        let command = editor.command("Experts/app.mq4", Path::new("/data/compile.log"));
        assert_eq!(command.get_program(), "/opt/mt4/metaeditor.exe");
        assert_eq!(
            args(&command),
            vec![
                "/compile:Experts/app.mq4",
                "/log:/data/compile.log",
                "/s"
            ]
        );
    }

    #[test]
    fn shim_launcher_forwards_two_positional_arguments() {
        let editor = MetaEditor::new(binary(Launcher::Shim("/data/metaeditor.sh".into())), None);
        let command = editor.command("Experts/app.mq4", Path::new("/data/compile.log"));
        assert_eq!(command.get_program(), "/data/metaeditor.sh");
        assert_eq!(args(&command), vec!["Experts/app.mq4", "/data/compile.log"]);
        let env: Vec<_> = command.get_envs().collect();
        assert!(env.iter().any(|(key, value)| {
            *key == SHIM_COMPILER_ENV
                && value.map(|v| v == "/opt/mt4/metaeditor.exe").unwrap_or(false)
        }));
    }

    #[test]
    fn read_log_reports_missing_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let err = read_log(&dir.path().join("missing.log")).expect_err("missing log");
        assert!(matches!(err, CompileError::ReadLog { .. }));
    }

    #[test]
    fn read_log_rejects_odd_length() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("compile.log");
        fs::write(&path, [0x41, 0x00, 0x42]).unwrap();
        let err = read_log(&path).expect_err("odd log");
        assert!(matches!(err, CompileError::Decode(DecodeError::OddLength(3))));
    }

    #[test]
    fn spawn_failure_is_reported() {
        let dir = tempfile::tempdir().expect("tempdir");
        let missing = CompilerBinary {
            executable: dir.path().join("no-such-metaeditor.exe"),
            launcher: Launcher::Native,
        };
        let editor = MetaEditor::new(missing, Some(Duration::from_secs(1)));
        let err = editor
            .compile("app.mq4", &dir.path().join("compile.log"))
            .expect_err("spawn should fail");
        assert!(matches!(err, CompileError::Spawn(_)));
    }

    #[cfg(unix)]
    #[test]
    fn exit_status_is_ignored_when_log_exists() {
        use std::os::unix::fs::PermissionsExt;
        let dir = tempfile::tempdir().expect("tempdir");
        let script = dir.path().join("fake.sh");
        fs::write(&script, "#!/bin/sh\nexit 3\n").unwrap();
        fs::set_permissions(&script, fs::Permissions::from_mode(0o755)).unwrap();
        let log_path = dir.path().join("compile.log");
        let log: Vec<u8> = "ok\n".encode_utf16().flat_map(|u| u.to_le_bytes()).collect();
        fs::write(&log_path, log).unwrap();

        let editor = MetaEditor::new(
            CompilerBinary {
                executable: PathBuf::from("unused"),
                launcher: Launcher::Shim(script),
            },
            Some(Duration::from_secs(10)),
        );
        assert_eq!(editor.compile("app.mq4", &log_path).unwrap(), "ok\n");
    }

    #[cfg(unix)]
    #[test]
    fn hung_compiler_is_killed_after_timeout() {
        use std::os::unix::fs::PermissionsExt;
        let dir = tempfile::tempdir().expect("tempdir");
        let script = dir.path().join("hang.sh");
        fs::write(&script, "#!/bin/sh\nexec sleep 30\n").unwrap();
        fs::set_permissions(&script, fs::Permissions::from_mode(0o755)).unwrap();

        let editor = MetaEditor::new(
            CompilerBinary {
                executable: PathBuf::from("unused"),
                launcher: Launcher::Shim(script),
            },
            Some(Duration::from_millis(100)),
        );
        let err = editor
            .compile("app.mq4", &dir.path().join("compile.log"))
            .expect_err("timeout");
        assert!(matches!(err, CompileError::Timeout(_)));
    }
}
