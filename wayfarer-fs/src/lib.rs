//! Capability-scoped file checks for Wayfarer artefacts built on `cap-std`
//! and `camino`.
#![forbid(unsafe_code)]

use std::io;
use std::path::MAIN_SEPARATOR_STR;

use camino::{Utf8Component, Utf8Path, Utf8PathBuf};
use cap_std::{ambient_authority, fs_utf8};

/// Whether `path` names an existing regular file.
///
/// A missing path is `Ok(false)`; other inspection failures are returned.
pub fn is_regular_file(path: &Utf8Path) -> io::Result<bool> {
    let (dir, relative) = anchor(path)?;
    if relative.as_str().is_empty() {
        return Ok(false);
    }
    match dir.metadata(&relative) {
        Ok(meta) => Ok(meta.is_file()),
        Err(error) if error.kind() == io::ErrorKind::NotFound => Ok(false),
        Err(error) => Err(error),
    }
}

/// Create every missing directory above `path`.
pub fn create_parent_dirs(path: &Utf8Path) -> io::Result<()> {
    let Some(parent) = path.parent().filter(|parent| !parent.as_str().is_empty()) else {
        return Ok(());
    };
    let (dir, relative) = anchor(parent)?;
    if relative.as_str().is_empty() {
        return Ok(());
    }
    dir.create_dir_all(&relative)
}

/// Open the directory `path` is rooted at (drive, filesystem root or the
/// working directory) and return the remainder relative to it.
fn anchor(path: &Utf8Path) -> io::Result<(fs_utf8::Dir, Utf8PathBuf)> {
    let mut components = path.components();
    let base = match components.clone().next() {
        Some(Utf8Component::Prefix(prefix)) => {
            components.next();
            let mut base = Utf8PathBuf::from(prefix.as_str());
            if matches!(components.clone().next(), Some(Utf8Component::RootDir)) {
                components.next();
                base.push(MAIN_SEPARATOR_STR);
            }
            base
        }
        Some(Utf8Component::RootDir) => {
            components.next();
            Utf8PathBuf::from(MAIN_SEPARATOR_STR)
        }
        _ => Utf8PathBuf::from("."),
    };
    let relative: Utf8PathBuf = components.collect();
    let dir = fs_utf8::Dir::open_ambient_dir(&base, ambient_authority())?;
    Ok((dir, relative))
}
