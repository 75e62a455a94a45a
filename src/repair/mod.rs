use std::fs;
use std::io;
use std::path::Path;

/// A repair the health checker applied on its own
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepairAction {
    pub description: String,
    /// Shell equivalent, shown to the user
    pub command: String,
}

/// Whether any execute bit is set on `path`
#[cfg(unix)]
pub fn is_executable(path: &Path) -> io::Result<bool> {
    use std::os::unix::fs::PermissionsExt;
    Ok(fs::metadata(path)?.permissions().mode() & 0o111 != 0)
}

#[cfg(not(unix))]
pub fn is_executable(path: &Path) -> io::Result<bool> {
    fs::metadata(path).map(|_| true)
}

/// Make `path` executable when it is not. Returns the action taken, if any.
///
/// Execute bits mirror the read bits, like `chmod +x` under a typical umask.
pub fn ensure_executable(path: &Path) -> io::Result<Option<RepairAction>> {
    if is_executable(path)? {
        return Ok(None);
    }

    set_executable(path)?;

    if !is_executable(path)? {
        return Err(io::Error::new(
            io::ErrorKind::PermissionDenied,
            "execute permission did not stick",
        ));
    }

    tracing::info!(path = %path.display(), "restored execute permission on server binary");
    Ok(Some(RepairAction {
        description: format!("Restored execute permission on {}", path.display()),
        command: format!("chmod +x {}", path.display()),
    }))
}

#[cfg(unix)]
fn set_executable(path: &Path) -> io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    let mut perms = fs::metadata(path)?.permissions();
    let mode = perms.mode();
    let exec_bits = ((mode & 0o444) >> 2) | 0o100;
    perms.set_mode(mode | exec_bits);
    fs::set_permissions(path, perms)
}

#[cfg(not(unix))]
fn set_executable(_path: &Path) -> io::Result<()> {
    Ok(())
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use std::os::unix::fs::PermissionsExt;

    #[test]
    fn test_already_executable_is_untouched() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bin");
        fs::write(&path, "#!/bin/sh\n").unwrap();
        fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();

        assert_eq!(ensure_executable(&path).unwrap(), None);
    }

    #[test]
    fn test_execute_bits_follow_read_bits() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bin");
        fs::write(&path, "#!/bin/sh\n").unwrap();
        fs::set_permissions(&path, fs::Permissions::from_mode(0o640)).unwrap();

        let action = ensure_executable(&path).unwrap().unwrap();
        assert!(action.command.starts_with("chmod +x"));

        let mode = fs::metadata(&path).unwrap().permissions().mode() & 0o777;
        assert_eq!(mode, 0o750);
    }

    #[test]
    fn test_missing_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(ensure_executable(&dir.path().join("nope")).is_err());
    }
}
