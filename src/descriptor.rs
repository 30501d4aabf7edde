//! Torrent descriptor parsing
//!
//! Extracts the declared file list from `.torrent` metadata. The order of the
//! returned files is the order the client uses to name fragments on disk.

use serde::{Deserialize, Serialize};
use serde_bytes::ByteBuf;
use std::fs;

use crate::error::{DescriptorError, Error};
use crate::model::{CacheEntry, FileDescriptor, TorrentManifest};

/// Top-level `.torrent` dictionary. Only `info` matters here; trackers and
/// piece hashes are ignored.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Torrent {
    pub info: Info,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Info {
    pub name: ByteBuf,
    #[serde(rename = "name.utf-8", default, skip_serializing_if = "Option::is_none")]
    pub name_utf8: Option<String>,
    /// Present on single-file torrents.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub length: Option<i64>,
    /// Present on multi-file torrents.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub files: Option<Vec<FileEntry>>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FileEntry {
    pub length: i64,
    pub path: Vec<ByteBuf>,
    #[serde(rename = "path.utf-8", default, skip_serializing_if = "Option::is_none")]
    pub path_utf8: Option<Vec<String>>,
}

/// Read and parse the descriptor of one cache entry.
pub fn read_manifest(entry: CacheEntry) -> Result<TorrentManifest, Error> {
    let data =
        fs::read(&entry.descriptor_path).map_err(|err| Error::io(&entry.descriptor_path, err))?;
    let files = parse_descriptor(&data).map_err(|source| Error::Descriptor {
        path: entry.descriptor_path.clone(),
        source,
    })?;
    Ok(TorrentManifest { entry, files })
}

/// Get the list of declared files from raw descriptor bytes.
///
/// Single-file torrents yield their `name`; multi-file torrents yield
/// `name/segment/...` for each entry of `info.files`. The `.utf-8` variants
/// of `name` and `path` win over the legacy keys when present.
pub fn parse_descriptor(data: &[u8]) -> Result<Vec<FileDescriptor>, DescriptorError> {
    let torrent: Torrent = serde_bencode::from_bytes(data)?;
    let info = torrent.info;
    let name = info.name_utf8.unwrap_or_else(|| lossy(&info.name));

    match info.files {
        // Multi-file torrent
        Some(files) => files
            .into_iter()
            .map(|file| {
                let length = non_negative(file.length)?;
                let segments = match file.path_utf8 {
                    Some(segments) => segments,
                    None => file.path.iter().map(|s| lossy(s)).collect(),
                };
                let mut path = name.clone();
                for segment in segments {
                    path.push('/');
                    path.push_str(&segment);
                }
                Ok(FileDescriptor { path, length })
            })
            .collect(),
        // Single-file torrent
        None => {
            let length = info.length.ok_or(DescriptorError::MissingField("length"))?;
            Ok(vec![FileDescriptor {
                path: name,
                length: non_negative(length)?,
            }])
        }
    }
}

fn non_negative(length: i64) -> Result<u64, DescriptorError> {
    u64::try_from(length).map_err(|_| DescriptorError::NegativeLength(length))
}

fn lossy(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn name(s: &str) -> ByteBuf {
        ByteBuf::from(s.as_bytes().to_vec())
    }

    fn file(length: i64, path: &[&str]) -> FileEntry {
        FileEntry {
            length,
            path: path.iter().map(|s| name(s)).collect(),
            path_utf8: None,
        }
    }

    fn encode(info: Info) -> Vec<u8> {
        serde_bencode::to_bytes(&Torrent { info }).unwrap()
    }

    #[test]
    fn test_single_file_descriptor() {
        let data = encode(Info {
            name: name("movie.mp4"),
            length: Some(1000),
            ..Default::default()
        });
        let files = parse_descriptor(&data).unwrap();
        assert_eq!(
            files,
            vec![FileDescriptor {
                path: "movie.mp4".to_string(),
                length: 1000
            }]
        );
    }

    #[test]
    fn test_extra_keys_are_ignored() {
        let data = b"d8:announce24:udp://tracker.example:804:infod6:lengthi1000e4:name9:movie.mp412:piece lengthi16384e6:pieces4:abcdee";
        let files = parse_descriptor(data).unwrap();
        assert_eq!(files.len(), 1);
        assert_eq!(files[0].path, "movie.mp4");
    }

    #[test]
    fn test_multi_file_descriptor_keeps_declared_order() {
        let data = encode(Info {
            name: name("Show"),
            files: Some(vec![
                file(100, &["sample.mp4"]),
                file(5000, &["Season 1", "episode.mkv"]),
                file(7, &["info.nfo"]),
            ]),
            ..Default::default()
        });
        let files = parse_descriptor(&data).unwrap();
        let paths: Vec<&str> = files.iter().map(|f| f.path.as_str()).collect();
        assert_eq!(
            paths,
            vec!["Show/sample.mp4", "Show/Season 1/episode.mkv", "Show/info.nfo"]
        );
        let lengths: Vec<u64> = files.iter().map(|f| f.length).collect();
        assert_eq!(lengths, vec![100, 5000, 7]);
    }

    #[test]
    fn test_utf8_keys_win_over_legacy_bytes() {
        let data = encode(Info {
            name: ByteBuf::from(vec![0xff, 0xfe]),
            name_utf8: Some("Show".to_string()),
            files: Some(vec![FileEntry {
                length: 10,
                path: vec![ByteBuf::from(b"\x93\x81.mp4".to_vec())],
                path_utf8: Some(vec!["movie.mp4".to_string()]),
            }]),
            ..Default::default()
        });
        let files = parse_descriptor(&data).unwrap();
        assert_eq!(files[0].path, "Show/movie.mp4");
    }

    #[test]
    fn test_legacy_bytes_used_without_utf8_keys() {
        let data = encode(Info {
            name: ByteBuf::from(vec![0xff]),
            length: Some(3),
            ..Default::default()
        });
        let files = parse_descriptor(&data).unwrap();
        assert_eq!(files[0].path, "\u{fffd}");
    }

    #[test]
    fn test_malformed_descriptors() {
        assert!(matches!(
            parse_descriptor(b"not bencode"),
            Err(DescriptorError::Decode(_))
        ));
        assert!(matches!(
            parse_descriptor(b"li1ee"),
            Err(DescriptorError::Decode(_))
        ));
        assert!(matches!(
            parse_descriptor(b"d8:announce3:urle"),
            Err(DescriptorError::Decode(_))
        ));
        assert!(matches!(
            parse_descriptor(b"d4:info"),
            Err(DescriptorError::Decode(_))
        ));

        let no_length = encode(Info {
            name: name("x"),
            ..Default::default()
        });
        assert!(matches!(
            parse_descriptor(&no_length),
            Err(DescriptorError::MissingField("length"))
        ));

        let negative = encode(Info {
            name: name("x"),
            length: Some(-5),
            ..Default::default()
        });
        assert!(matches!(
            parse_descriptor(&negative),
            Err(DescriptorError::NegativeLength(-5))
        ));
    }
}
