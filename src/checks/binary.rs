use std::path::Path;

use crate::error::HealthCheckError;
use crate::repair::{ensure_executable, RepairAction};

pub const EXISTS_CHECK: &str = "Server binary exists";
pub const EXECUTABLE_CHECK: &str = "Server binary executable";

pub fn check_exists(path: &Path) -> Result<(), HealthCheckError> {
    if path.is_file() {
        Ok(())
    } else {
        Err(HealthCheckError::BinaryMissing {
            path: path.to_path_buf(),
        })
    }
}

/// Self-healing step: a missing execute bit is restored instead of failing
pub fn check_executable(path: &Path) -> Result<Option<RepairAction>, HealthCheckError> {
    ensure_executable(path).map_err(|source| HealthCheckError::BinaryNotExecutable {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_directory_is_not_a_binary() {
        let dir = tempfile::tempdir().unwrap();
        let err = check_exists(dir.path()).unwrap_err();
        assert!(matches!(err, HealthCheckError::BinaryMissing { .. }));
    }
}
