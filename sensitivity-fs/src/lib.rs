//! Shared filesystem helpers built on `cap-std` and `camino`.
#![forbid(unsafe_code)]

use camino::Utf8Path;
use cap_std::{ambient_authority, fs_utf8};
use std::io;

/// Outcome of [`create_dir_if_missing`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DirCreation {
    /// The directory was created by this call.
    Created,
    /// The directory already existed and was left untouched.
    AlreadyPresent,
}

/// Open a UTF-8 file path using ambient authority.
pub fn open_utf8_file(path: &Utf8Path) -> io::Result<fs_utf8::File> {
    fs_utf8::File::open_ambient(path, ambient_authority())
}

/// Resolve an ambient directory for the given path and return the directory with the file name.
pub fn open_dir_and_file(path: &Utf8Path) -> io::Result<(fs_utf8::Dir, String)> {
    let parent = match path.parent() {
        Some(parent) if !parent.as_str().is_empty() => parent,
        _ => Utf8Path::new("."),
    };
    let file_name = path
        .file_name()
        .ok_or_else(|| io::Error::other("target should include a file name"))?
        .to_owned();
    let dir = fs_utf8::Dir::open_ambient_dir(parent, ambient_authority())?;
    Ok((dir, file_name))
}

/// Create the directory at `path` unless it already exists.
///
/// Only the final component is created: a missing parent is an error, as is
/// a non-directory entry at `path`. Losing a creation race to another
/// process counts as [`DirCreation::AlreadyPresent`].
pub fn create_dir_if_missing(path: &Utf8Path) -> io::Result<DirCreation> {
    let (dir, name) = open_dir_and_file(path)?;
    if dir.exists(name.as_str()) {
        return require_dir(&dir, &name).map(|()| DirCreation::AlreadyPresent);
    }
    match dir.create_dir(name.as_str()) {
        Ok(()) => Ok(DirCreation::Created),
        Err(err) if err.kind() == io::ErrorKind::AlreadyExists => {
            require_dir(&dir, &name).map(|()| DirCreation::AlreadyPresent)
        }
        Err(err) => Err(err),
    }
}

fn require_dir(dir: &fs_utf8::Dir, name: &str) -> io::Result<()> {
    if dir.metadata(name)?.is_dir() {
        Ok(())
    } else {
        Err(io::Error::new(
            io::ErrorKind::NotADirectory,
            format!("{name} exists but is not a directory"),
        ))
    }
}

/// Return whether a path exists and is a regular file using capability-based IO.
pub fn file_is_file(path: &Utf8Path) -> io::Result<bool> {
    let (dir, name) = open_dir_and_file(path)?;
    dir.metadata(name.as_str()).map(|meta| meta.is_file())
}
