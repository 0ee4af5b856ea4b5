//! Small helpers for attribute files under /sys

use std::fs;
use std::path::Path;

use super::{BackendError, BackendResult};

pub(crate) fn read_attr(path: &Path) -> BackendResult<String> {
    fs::read_to_string(path)
        .map(|contents| contents.trim().to_string())
        .map_err(|e| BackendError::io(path, e))
}

pub(crate) fn read_u32(path: &Path) -> BackendResult<u32> {
    let contents = read_attr(path)?;
    contents.parse().map_err(|_| BackendError::Parse {
        path: path.to_path_buf(),
        contents,
    })
}

pub(crate) fn write_attr(path: &Path, value: impl std::fmt::Display) -> BackendResult<()> {
    fs::write(path, value.to_string()).map_err(|e| BackendError::io(path, e))
}
