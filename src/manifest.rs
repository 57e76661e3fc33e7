//! The pull request written by the companion app.
//!
//! ```text
//! 52428800
//! /sdcard/DCIM/Camera/IMG_0001.jpg\t1
//! /sdcard/Documents/notes\t0
//! ```
//! Line 1 is the byte total measured on the device; each further line is an
//! absolute path and `1` for a file or `0` for a directory.

use crate::error::{Result, TransferError};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManifestEntry {
    pub remote_path: String,
    pub is_file: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Manifest {
    pub total_bytes: u64,
    pub entries: Vec<ManifestEntry>,
}

impl Manifest {
    pub fn parse(text: &str) -> Result<Self> {
        let mut lines = text.lines().map(|l| l.trim_end_matches('\r'));

        let header = lines
            .by_ref()
            .find(|l| !l.trim().is_empty())
            .ok_or_else(|| TransferError::Manifest("empty manifest".into()))?;
        let total_bytes = header.trim().parse::<u64>().map_err(|_| {
            TransferError::Manifest(format!("first line is not a byte count: {:?}", header))
        })?;

        let mut entries = Vec::new();
        for line in lines.filter(|l| !l.trim().is_empty()) {
            let entry = match line.split_once('\t') {
                // Older companion builds wrote bare paths, all of them files.
                None => ManifestEntry {
                    remote_path: line.to_string(),
                    is_file: true,
                },
                Some((path, flag)) => {
                    let is_file = match flag.trim() {
                        "1" => true,
                        "0" => false,
                        other => {
                            return Err(TransferError::Manifest(format!(
                                "bad file flag {:?} for {}",
                                other, path
                            )))
                        }
                    };
                    ManifestEntry {
                        remote_path: path.to_string(),
                        is_file,
                    }
                }
            };
            entries.push(entry);
        }

        Ok(Manifest {
            total_bytes,
            entries,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_header_and_entries() {
        let m = Manifest::parse("1500\n/sdcard/a.jpg\t1\n/sdcard/My Dir\t0\n").unwrap();
        assert_eq!(m.total_bytes, 1500);
        assert_eq!(
            m.entries,
            vec![
                ManifestEntry {
                    remote_path: "/sdcard/a.jpg".into(),
                    is_file: true
                },
                ManifestEntry {
                    remote_path: "/sdcard/My Dir".into(),
                    is_file: false
                },
            ]
        );
    }

    #[test]
    fn bare_paths_are_files() {
        let m = Manifest::parse("10\r\n/sdcard/x.txt\r\n\n").unwrap();
        assert_eq!(m.entries.len(), 1);
        assert!(m.entries[0].is_file);
        assert_eq!(m.entries[0].remote_path, "/sdcard/x.txt");
    }

    #[test]
    fn rejects_garbage() {
        assert!(Manifest::parse("").is_err());
        assert!(Manifest::parse("lots\n/a\t1").is_err());
        assert!(Manifest::parse("1\n/a\tyes").is_err());
    }
}
