use rayon::prelude::*;
use std::fs;
use std::io;
use std::path::Path;
use tracing::{debug, warn};

use crate::error::Error;
use crate::model::CacheEntry;

/// List the immediate children of `root` and keep those holding a
/// `<name>/<name>.<extension>` descriptor.
///
/// Children without a descriptor (or that are plain files) are skipped.
/// Any other stat failure aborts the scan.
pub fn scan_cache(root: &Path, extension: &str) -> Result<Vec<CacheEntry>, Error> {
    let names = fs::read_dir(root)
        .map_err(|err| Error::io(root, err))?
        .map(|entry| {
            entry
                .map(|e| e.file_name())
                .map_err(|err| Error::io(root, err))
        })
        .collect::<Result<Vec<_>, Error>>()?;

    let checked = names
        .into_par_iter()
        .map(|os_name| {
            let name = match os_name.into_string() {
                Ok(name) => name,
                Err(os_name) => {
                    warn!("Skipping non UTF-8 cache entry {:?}", os_name);
                    return Ok(None);
                }
            };
            check_entry(root, name, extension)
        })
        .collect::<Result<Vec<_>, Error>>()?;

    let mut entries: Vec<CacheEntry> = checked.into_iter().flatten().collect();
    entries.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(entries)
}

fn check_entry(root: &Path, name: String, extension: &str) -> Result<Option<CacheEntry>, Error> {
    let folder_path = root.join(&name);
    let descriptor_path = folder_path.join(format!("{}.{}", name, extension));

    match fs::metadata(&descriptor_path) {
        Ok(_) => Ok(Some(CacheEntry {
            name,
            folder_path,
            descriptor_path,
        })),
        Err(err) if is_absent(&err) => {
            debug!("No descriptor in {}", folder_path.display());
            Ok(None)
        }
        Err(err) => Err(Error::io(descriptor_path, err)),
    }
}

/// Stat failures that mean "nothing there" rather than a fault.
pub(crate) fn is_absent(err: &io::Error) -> bool {
    matches!(
        err.kind(),
        io::ErrorKind::NotFound | io::ErrorKind::NotADirectory
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_scan_keeps_only_folders_with_descriptor() {
        let tmp = tempdir().unwrap();
        let root = tmp.path();

        for name in ["abc", "def"] {
            fs::create_dir(root.join(name)).unwrap();
            fs::write(root.join(name).join(format!("{}.torrent", name)), b"de").unwrap();
        }
        // Folder without a descriptor
        fs::create_dir(root.join("empty")).unwrap();
        // Descriptor named after a different folder
        fs::create_dir(root.join("other")).unwrap();
        fs::write(root.join("other").join("abc.torrent"), b"de").unwrap();
        // Plain file at the top level
        fs::write(root.join("stray.txt"), b"not a folder").unwrap();

        let entries = scan_cache(root, "torrent").unwrap();
        let names: Vec<&str> = entries.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["abc", "def"]);
        assert_eq!(entries[0].folder_path, root.join("abc"));
        assert_eq!(entries[0].descriptor_path, root.join("abc").join("abc.torrent"));
    }

    #[test]
    fn test_scan_honours_extension() {
        let tmp = tempdir().unwrap();
        fs::create_dir(tmp.path().join("abc")).unwrap();
        fs::write(tmp.path().join("abc").join("abc.meta"), b"de").unwrap();

        assert!(scan_cache(tmp.path(), "torrent").unwrap().is_empty());
        assert_eq!(scan_cache(tmp.path(), "meta").unwrap().len(), 1);
    }

    #[test]
    fn test_scan_missing_root_is_an_error() {
        let tmp = tempdir().unwrap();
        let missing = tmp.path().join("nope");
        match scan_cache(&missing, "torrent") {
            Err(Error::Io { path, source }) => {
                assert_eq!(path, missing);
                assert_eq!(source.kind(), io::ErrorKind::NotFound);
            }
            other => panic!("expected IO error, got {:?}", other),
        }
    }
}
