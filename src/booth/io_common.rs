use std::fs::{self, File};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use crate::booth::*;

pub fn display_path(path: &Path) -> String {
    path.display().to_string()
}

/// Reads a whole file. A missing file is not an error.
pub fn read_optional(path: &Path) -> BoothResult<Option<String>> {
    match fs::read_to_string(path) {
        Ok(s) => Ok(Some(s)),
        Err(e) if e.kind() == ErrorKind::NotFound => {
            debug!("read_optional: {:?} does not exist", path);
            Ok(None)
        }
        Err(e) => Err(e).context(FileAccessSnafu {
            path: display_path(path),
        }),
    }
}

fn temp_path(path: &Path) -> PathBuf {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();
    path.with_file_name(format!("{}.tmp", name))
}

/// Replaces the content of a file.
///
/// The data goes to a sibling temporary file first, which is then renamed over the
/// target: readers see either the old or the new content.
pub fn write_atomically(path: &Path, data: &[u8]) -> BoothResult<()> {
    let p = display_path(path);
    let tmp = temp_path(path);
    let res = File::create(&tmp)
        .and_then(|mut f| {
            f.write_all(data)?;
            f.sync_all()
        })
        .and_then(|_| fs::rename(&tmp, path));
    if let Err(e) = res {
        warn!("write_atomically: could not write {}: {}", p, e);
        let _ = fs::remove_file(&tmp);
        return Err(e).context(FileAccessSnafu { path: p });
    }
    debug!("write_atomically: wrote {} bytes to {}", data.len(), p);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_reads_as_none() {
        let dir = tempfile::tempdir().unwrap();
        let res = read_optional(&dir.path().join("nothing.csv")).unwrap();
        assert_eq!(res, None);
    }

    #[test]
    fn atomic_write_replaces_content() {
        let dir = tempfile::tempdir().unwrap();
        let p = dir.path().join("votes.json");
        write_atomically(&p, b"first").unwrap();
        write_atomically(&p, b"second").unwrap();
        assert_eq!(read_optional(&p).unwrap(), Some("second".to_string()));
        assert!(!dir.path().join("votes.json.tmp").exists());
    }

    #[test]
    fn unwritable_target_is_a_file_access_error() {
        let dir = tempfile::tempdir().unwrap();
        let p = dir.path().join("missing_dir").join("votes.json");
        let res = write_atomically(&p, b"x");
        assert!(matches!(res, Err(BoothError::FileAccess { .. })));
    }
}
