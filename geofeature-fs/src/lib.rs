//! Shared filesystem helpers built on `cap-std` and `camino`.
#![forbid(unsafe_code)]

use camino::Utf8Path;
use cap_std::{ambient_authority, fs_utf8};
use std::io::{self, Read};
use std::time::SystemTime;

/// Open a UTF-8 file path using ambient authority.
pub fn open_utf8_file(path: &Utf8Path) -> io::Result<fs_utf8::File> {
    fs_utf8::File::open_ambient(path, ambient_authority())
}

/// Read a whole UTF-8 file into a string.
pub fn read_utf8_to_string(path: &Utf8Path) -> io::Result<String> {
    let mut contents = String::new();
    open_utf8_file(path)?.read_to_string(&mut contents)?;
    Ok(contents)
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

/// Return whether a path exists and is a regular file using capability-based IO.
pub fn file_is_file(path: &Utf8Path) -> io::Result<bool> {
    let (dir, name) = open_dir_and_file(path)?;
    dir.metadata(name.as_str()).map(|meta| meta.is_file())
}

/// Length and modification time of a file, used to tell whether content
/// derived from it is still current.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileStamp {
    /// Length in bytes.
    pub len: u64,
    /// Last modification time, when the platform reports one.
    pub modified: Option<SystemTime>,
}

/// Read the [`FileStamp`] of `path`.
pub fn file_stamp(path: &Utf8Path) -> io::Result<FileStamp> {
    let (dir, name) = open_dir_and_file(path)?;
    let meta = dir.metadata(name.as_str())?;
    Ok(FileStamp {
        len: meta.len(),
        modified: meta.modified().ok().map(cap_std::time::SystemTime::into_std),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use camino::Utf8PathBuf;
    use rstest::rstest;
    use std::fs;

    fn temp_path(dir: &tempfile::TempDir, name: &str) -> Utf8PathBuf {
        Utf8PathBuf::from_path_buf(dir.path().join(name)).expect("temp paths are UTF-8")
    }

    #[rstest]
    fn reads_files_and_reports_stamps() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = temp_path(&dir, "data.json");
        fs::write(&path, "{}").expect("write file");

        assert!(file_is_file(&path).expect("metadata"));
        assert_eq!(read_utf8_to_string(&path).expect("read"), "{}");
        let stamp = file_stamp(&path).expect("stamp");
        assert_eq!(stamp.len, 2);

        fs::write(&path, "{\"a\":1}").expect("rewrite file");
        assert_ne!(file_stamp(&path).expect("stamp"), stamp);
    }

    #[rstest]
    fn directories_are_not_files() {
        let dir = tempfile::tempdir().expect("temp dir");
        let nested = temp_path(&dir, "nested");
        fs::create_dir(&nested).expect("create dir");
        assert!(!file_is_file(&nested).expect("metadata"));
    }

    #[rstest]
    fn missing_files_are_errors() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = temp_path(&dir, "absent.json");
        assert!(file_stamp(&path).is_err());
        assert!(read_utf8_to_string(&path).is_err());
    }
}
