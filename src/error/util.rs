//! Utility functions for error handling
//!
//! File helpers that attach the offending path and the purpose of the access
//! to I/O failures.

use std::fs;
use std::io;
use std::path::Path;

use crate::error::Result;

/// Open a file for reading, naming the path and purpose on failure
///
/// # Arguments
/// * `path` - The path to the file to open
/// * `purpose` - Why the file is being opened (for error context)
pub fn safe_open_file(path: &Path, purpose: &str) -> Result<fs::File> {
    if !path.exists() {
        return Err(io::Error::new(
            io::ErrorKind::NotFound,
            format!("{} not found (needed for: {purpose})", path.display()),
        )
        .into());
    }

    if !path.is_file() {
        return Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("{} is not a file (expected for: {purpose})", path.display()),
        )
        .into());
    }

    fs::File::open(path).map_err(|e| {
        io::Error::new(
            e.kind(),
            format!("Failed to open {} for {purpose}: {e}", path.display()),
        )
        .into()
    })
}

/// Create a file for writing, creating parent directories as needed
pub fn safe_create_file(path: &Path, purpose: &str) -> Result<fs::File> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).map_err(|e| {
                io::Error::new(
                    e.kind(),
                    format!(
                        "Failed to create directory {} for {purpose}: {e}",
                        parent.display()
                    ),
                )
            })?;
        }
    }

    fs::File::create(path).map_err(|e| {
        io::Error::new(
            e.kind(),
            format!("Failed to create {} for {purpose}: {e}", path.display()),
        )
        .into()
    })
}

/// Check that a directory exists, creating it when `create` is set
pub fn validate_directory(path: &Path, create: bool) -> Result<()> {
    if path.is_dir() {
        return Ok(());
    }
    if path.exists() {
        return Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("{} is not a directory", path.display()),
        )
        .into());
    }
    if create {
        fs::create_dir_all(path)?;
        return Ok(());
    }
    Err(io::Error::new(
        io::ErrorKind::NotFound,
        format!("Directory not found: {}", path.display()),
    )
    .into())
}
