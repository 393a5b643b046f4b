//! File system operations (read, write).

use anyhow::{Context, Result};
use std::fs;
use std::path::Path;

use super::RealRuntime;

impl RealRuntime {
    #[tracing::instrument(skip(self))]
    pub(crate) fn read_to_string_impl(&self, path: &Path) -> Result<String> {
        fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))
    }

    #[tracing::instrument(skip(self))]
    pub(crate) fn read_impl(&self, path: &Path) -> Result<Vec<u8>> {
        fs::read(path).with_context(|| format!("Failed to read {}", path.display()))
    }

    #[tracing::instrument(skip(self, contents))]
    pub(crate) fn write_impl(&self, path: &Path, contents: &[u8]) -> Result<()> {
        fs::write(path, contents).with_context(|| format!("Failed to write {}", path.display()))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::runtime::{RealRuntime, Runtime};
    use tempfile::tempdir;

    #[test]
    fn test_real_runtime_file_roundtrip() {
        let runtime = RealRuntime;
        let dir = tempdir().unwrap();
        let path = dir.path().join("ids.txt");

        runtime.write(&path, b"edi/1/1\n").unwrap();
        assert_eq!(runtime.read_to_string(&path).unwrap(), "edi/1/1\n");
        assert_eq!(runtime.read(&path).unwrap(), b"edi/1/1\n".to_vec());
    }

    #[test]
    fn test_read_missing_file_names_path() {
        let runtime = RealRuntime;
        let dir = tempdir().unwrap();
        let err = runtime
            .read_to_string(&dir.path().join("missing.csv"))
            .unwrap_err();
        assert!(err.to_string().contains("missing.csv"));
    }
}
