//! Process spawning utilities

use portable_pty::MasterPty;
use rustix::fs::{access, Access};
use rustix::io::Errno;
use rustix::termios::{tcgetattr, tcsetattr, LocalModes, OptionalActions};
use std::env;
use std::fs;
use std::io;
use std::os::fd::BorrowedFd;
use std::path::{Path, PathBuf};

/// Locate the executable for `program`.
///
/// A program containing `/` is used as given; otherwise every `PATH` entry is
/// tried. Failures carry the OS error the exec would have produced, so a
/// missing program reports `no such file or directory` and a non-executable
/// one `permission denied`.
pub(crate) fn resolve_executable(program: &str) -> io::Result<PathBuf> {
    if program.is_empty() {
        return Err(io::Error::from(Errno::NOENT));
    }

    if program.contains('/') {
        check_executable(Path::new(program))?;
        return Ok(PathBuf::from(program));
    }

    let search_path = env::var_os("PATH").unwrap_or_default();
    let mut denied = None;
    for dir in env::split_paths(&search_path) {
        let candidate = dir.join(program);
        match check_executable(&candidate) {
            Ok(()) => return Ok(candidate),
            Err(e) if e.kind() == io::ErrorKind::PermissionDenied => denied = Some(e),
            Err(_) => {}
        }
    }

    Err(denied.unwrap_or_else(|| io::Error::from(Errno::NOENT)))
}

fn check_executable(path: &Path) -> io::Result<()> {
    let metadata = fs::metadata(path)?;
    if metadata.is_dir() {
        return Err(io::Error::from(Errno::ACCESS));
    }
    access(path, Access::EXEC_OK)?;
    Ok(())
}

/// Turn off input echo on the terminal behind `master`.
///
/// Without this every byte sent to the child would come back in its output
/// a second time.
pub(crate) fn disable_echo(master: &dyn MasterPty) -> io::Result<()> {
    let Some(raw) = master.as_raw_fd() else {
        return Ok(());
    };
    // SAFETY: `raw` is owned by `master`, which outlives this borrow.
    let fd = unsafe { BorrowedFd::borrow_raw(raw) };

    let mut termios = tcgetattr(fd)?;
    termios.local_modes.remove(LocalModes::ECHO);
    tcsetattr(fd, OptionalActions::Now, &termios)?;
    Ok(())
}
