//! Capability-based file access for dispatch databases and seed files.
//!
//! Paths are UTF-8 ([`camino`]) and every operation goes through an ambient
//! [`cap_std`] directory handle rather than `std::fs`.
#![forbid(unsafe_code)]

use std::io::{self, Read};
use std::path::Component;

use camino::{Utf8Path, Utf8PathBuf};
use cap_std::{ambient_authority, fs_utf8};

/// Read a whole UTF-8 text file, such as a JSON seed document.
///
/// # Errors
/// Returns the underlying I/O error when the file cannot be opened or is not
/// valid UTF-8.
pub fn read_to_string(path: &Utf8Path) -> io::Result<String> {
    let mut file = fs_utf8::File::open_ambient(path, ambient_authority())?;
    let mut contents = String::new();
    file.read_to_string(&mut contents)?;
    Ok(contents)
}

/// Whether `path` names an existing regular file.
///
/// A missing file, or a missing parent directory, yields `Ok(false)`.
///
/// # Errors
/// Returns other I/O failures, such as permission errors.
pub fn is_file(path: &Utf8Path) -> io::Result<bool> {
    let parent = match path.parent() {
        Some(parent) if !parent.as_str().is_empty() => parent,
        _ => Utf8Path::new("."),
    };
    let Some(name) = path.file_name() else {
        return Ok(false);
    };
    let dir = match fs_utf8::Dir::open_ambient_dir(parent, ambient_authority()) {
        Ok(dir) => dir,
        Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(false),
        Err(err) => return Err(err),
    };
    match dir.metadata(name) {
        Ok(meta) => Ok(meta.is_file()),
        Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(false),
        Err(err) => Err(err),
    }
}

/// Create the directory that will hold `path` when it is missing.
///
/// # Errors
/// Returns the I/O error raised while creating the directories.
pub fn ensure_parent_dir(path: &Utf8Path) -> io::Result<()> {
    let Some(parent) = path.parent() else {
        return Ok(());
    };
    if parent.as_str().is_empty() || parent == Utf8Path::new("/") {
        return Ok(());
    }
    let (base, relative) = split_base(parent)?;
    if relative.as_str().is_empty() {
        return Ok(());
    }
    base.create_dir_all(&relative)
}

/// Split `dir` into an ambient base directory and the path below it.
fn split_base(dir: &Utf8Path) -> io::Result<(fs_utf8::Dir, Utf8PathBuf)> {
    let std_dir = dir.as_std_path();
    let (base, relative) = match std_dir.components().next() {
        // Windows drive or UNC prefix.
        Some(Component::Prefix(prefix)) => {
            let prefix = prefix
                .as_os_str()
                .to_str()
                .ok_or_else(|| io::Error::other("non-UTF-8 path prefix"))?;
            let base = Utf8PathBuf::from(prefix).join(std::path::MAIN_SEPARATOR.to_string());
            let relative = dir
                .strip_prefix(&base)
                .or_else(|_| dir.strip_prefix(prefix))
                .map_err(|_| io::Error::other("failed to strip prefix from directory"))?
                .to_path_buf();
            (base, relative)
        }
        Some(Component::RootDir) => {
            let base = Utf8PathBuf::from(std::path::MAIN_SEPARATOR.to_string());
            let relative = dir
                .strip_prefix(&base)
                .map_err(|_| io::Error::other("failed to strip root from directory"))?
                .to_path_buf();
            (base, relative)
        }
        _ => (Utf8PathBuf::from("."), dir.to_path_buf()),
    };
    let handle = fs_utf8::Dir::open_ambient_dir(&base, ambient_authority())?;
    Ok((handle, relative))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use tempfile::TempDir;

    fn utf8_root(dir: &TempDir) -> Utf8PathBuf {
        Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).expect("utf-8 temp dir")
    }

    #[rstest]
    fn nested_parents_are_created() {
        let temp = TempDir::new().expect("temp dir");
        let target = utf8_root(&temp).join("state/fleet/delivery.db");
        ensure_parent_dir(&target).expect("create parents");
        assert!(target.parent().expect("parent").is_dir());
        assert!(!is_file(&target).expect("probe"));
    }

    #[rstest]
    fn seed_files_read_back() {
        let temp = TempDir::new().expect("temp dir");
        let target = utf8_root(&temp).join("seed.json");
        std::fs::write(&target, "{\"locations\":[]}").expect("write seed");
        assert!(is_file(&target).expect("probe"));
        assert_eq!(
            read_to_string(&target).expect("read seed"),
            "{\"locations\":[]}"
        );
    }

    #[rstest]
    fn missing_directories_are_not_files() {
        let temp = TempDir::new().expect("temp dir");
        let target = utf8_root(&temp).join("absent/delivery.db");
        assert!(!is_file(&target).expect("probe"));
    }

    #[rstest]
    fn bare_file_names_need_no_parent() {
        ensure_parent_dir(Utf8Path::new("delivery.db")).expect("no-op");
    }
}
