// Copyright (C) 2026 Brian Johnson
//
// This program is free software; you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation; either version 2 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License along
// with this program; if not, write to the Free Software Foundation, Inc.,
// 51 Franklin Street, Fifth Floor, Boston, MA 02110-1301 USA.

use std::path::Path;
use crate::sender::TransferError;

/// Load the whole executable into memory
pub fn read_source(path: &Path) -> Result<Vec<u8>, TransferError> {
    if path.is_dir() {
        return Err(TransferError::SourceUnavailable {
            path: path.to_path_buf(),
            source: std::io::Error::new(std::io::ErrorKind::InvalidInput, "is a directory"),
        });
    }

    std::fs::read(path).map_err(|source| TransferError::SourceUnavailable {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_source() {
        let test_file = std::env::temp_dir().join("psxlink_source_test.exe");
        std::fs::write(&test_file, b"PS-X EXE").unwrap();

        let data = read_source(&test_file).unwrap();
        assert_eq!(data, b"PS-X EXE");

        std::fs::remove_file(&test_file).ok();
    }

    #[test]
    fn test_read_empty_source() {
        let test_file = std::env::temp_dir().join("psxlink_source_empty.exe");
        std::fs::write(&test_file, b"").unwrap();

        assert!(read_source(&test_file).unwrap().is_empty());

        std::fs::remove_file(&test_file).ok();
    }

    #[test]
    fn test_missing_source() {
        let missing = std::env::temp_dir().join("psxlink_does_not_exist.exe");

        match read_source(&missing) {
            Err(TransferError::SourceUnavailable { path, source }) => {
                assert_eq!(path, missing);
                assert_eq!(source.kind(), std::io::ErrorKind::NotFound);
            }
            other => panic!("Expected SourceUnavailable, got {:?}", other),
        }
    }

    #[test]
    fn test_directory_source() {
        let dir = std::env::temp_dir();
        assert!(matches!(read_source(&dir), Err(TransferError::SourceUnavailable { .. })));
    }
}
