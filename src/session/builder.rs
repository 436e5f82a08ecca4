//! Session builder for configuration

use crate::buffer::BufferManager;
use crate::result::{os_message, ExpectError};
use crate::session::process::ProcessHandle;
use crate::session::pump::spawn_pump;
use crate::session::spawn::{disable_echo, resolve_executable};
use crate::session::{Session, SessionState};
use log::debug;
use portable_pty::{native_pty_system, Child, CommandBuilder, PtySize};
use std::env;
use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Default PTY rows
const DEFAULT_PTY_ROWS: u16 = 24;

/// Default PTY columns
const DEFAULT_PTY_COLS: u16 = 80;

/// Builder for configuring and spawning sessions.
///
/// The timeout and buffer capacity used by expect calls are process-wide
/// settings, see [`config`](crate::config). The builder only covers how the
/// child is started.
///
/// # Defaults
///
/// - No arguments
/// - Inherited environment and working directory
/// - PTY size: 24 rows × 80 columns
/// - PTY echo: disabled
///
/// # Examples
///
/// ```no_run
/// use ptyexpect::Session;
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let session = Session::builder()
///     .args(["-i"])
///     .env("PS1", ">>> ")
///     .pty_size(40, 120)
///     .spawn("python3")?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct SessionBuilder {
    args: Vec<String>,
    env: Vec<(String, String)>,
    cwd: Option<PathBuf>,
    pty_size: PtySize,
    echo: bool,
}

impl Default for SessionBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionBuilder {
    /// Create a new session builder with default configuration.
    ///
    /// See the [`SessionBuilder`] documentation for default values.
    pub fn new() -> Self {
        Self {
            args: Vec::new(),
            env: Vec::new(),
            cwd: None,
            pty_size: PtySize {
                rows: DEFAULT_PTY_ROWS,
                cols: DEFAULT_PTY_COLS,
                pixel_width: 0,
                pixel_height: 0,
            },
            echo: false,
        }
    }

    /// Append one command line argument.
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Append several command line arguments.
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Set an environment variable for the child.
    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.push((key.into(), value.into()));
        self
    }

    /// Set the child's working directory.
    ///
    /// Defaults to the working directory of the calling process.
    pub fn cwd(mut self, dir: impl Into<PathBuf>) -> Self {
        self.cwd = Some(dir.into());
        self
    }

    /// Set PTY (terminal) size.
    ///
    /// # Arguments
    ///
    /// * `rows` - Number of rows (default: 24)
    /// * `cols` - Number of columns (default: 80)
    pub fn pty_size(mut self, rows: u16, cols: u16) -> Self {
        self.pty_size = PtySize {
            rows,
            cols,
            pixel_width: 0,
            pixel_height: 0,
        };
        self
    }

    /// Keep the terminal's input echo on.
    ///
    /// With echo on, everything sent to the child also shows up in its output,
    /// as it would on a human's screen.
    pub fn echo(mut self, echo: bool) -> Self {
        self.echo = echo;
        self
    }

    /// Spawn `program` and return a session attached to it.
    ///
    /// `program` is a path, or a bare name looked up in `PATH`.
    ///
    /// # Errors
    ///
    /// - [`ExpectError::Spawn`] with the OS message verbatim when the program
    ///   is missing or not executable, or the process cannot be created
    /// - [`ExpectError::Pty`] when the PTY cannot be set up
    ///
    /// No session exists after a failure; a child that was already started is
    /// killed.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use ptyexpect::Session;
    ///
    /// let err = Session::builder().spawn("/bin/echox").unwrap_err();
    /// assert_eq!(err.to_string(), "no such file or directory");
    /// ```
    pub fn spawn(self, program: &str) -> Result<Session, ExpectError> {
        let executable = resolve_executable(program).map_err(ExpectError::Spawn)?;
        let cwd = match self.cwd {
            Some(dir) => dir,
            None => env::current_dir().map_err(ExpectError::Spawn)?,
        };

        let pty_system = native_pty_system();
        let pty_pair = pty_system
            .openpty(self.pty_size)
            .map_err(|e| ExpectError::Pty(e.to_string()))?;

        if !self.echo {
            disable_echo(&*pty_pair.master).map_err(|e| ExpectError::Pty(os_message(&e)))?;
        }

        let mut cmd = CommandBuilder::new(&executable);
        cmd.args(&self.args);
        cmd.cwd(&cwd);
        for (key, value) in &self.env {
            cmd.env(key, value);
        }

        let mut child = pty_pair
            .slave
            .spawn_command(cmd)
            .map_err(|e| match e.downcast::<io::Error>() {
                Ok(io_err) => ExpectError::Spawn(io_err),
                Err(other) => ExpectError::Spawn(io::Error::other(other.to_string())),
            })?;

        // Only the child may hold the slave side, or EOF is never seen
        drop(pty_pair.slave);

        let master = pty_pair.master;
        let plumbing = (|| -> Result<_, ExpectError> {
            let pid = child
                .process_id()
                .ok_or_else(|| ExpectError::Pty("child has no process id".to_string()))?;
            let reader = master
                .try_clone_reader()
                .map_err(|e| ExpectError::Pty(e.to_string()))?;
            let writer = master
                .take_writer()
                .map_err(|e| ExpectError::Pty(e.to_string()))?;
            let stream = spawn_pump(reader).map_err(|e| ExpectError::Pty(os_message(&e)))?;
            Ok((pid, writer, stream))
        })();

        let (pid, writer, stream) = match plumbing {
            Ok(parts) => parts,
            Err(e) => {
                abandon(child.as_mut());
                return Err(e);
            }
        };

        debug!(
            "spawned {} {:?} as pid {}",
            executable.display(),
            self.args,
            pid
        );

        Ok(Session {
            _master: Some(master),
            child: Some(child),
            process: ProcessHandle::new(pid),
            writer: Some(Arc::new(Mutex::new(writer))),
            stream: Some(stream),
            buffer: BufferManager::new(),
            state: SessionState::Running,
        })
    }
}

/// Kill a child whose session could not be completed.
fn abandon(child: &mut (dyn Child + Send + Sync)) {
    if let Err(e) = child.kill() {
        debug!("failed to kill half-spawned child: {}", e);
    }
}
