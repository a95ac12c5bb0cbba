//
// Copyright (c) 2024 Hemi Labs, Inc.
//
// This file is part of the ccompact project covered under
// the MIT License.  For the full license text, please see the LICENSE
// file in the root directory of this project.
// SPDX-License-Identifier: MIT
//

use std::fs::File;
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;

use crate::error::{Error, Result, Stage};

pub const INTERMEDIATE_PREFIX: &str = "ccompact-";
pub const INTERMEDIATE_SUFFIX: &str = ".i";

/// Holds the preprocessor output between expansion and filtering.
///
/// The file is removed when this value is dropped, whichever way the run ends.
#[derive(Debug)]
pub struct Intermediate {
    file: NamedTempFile,
}

impl Intermediate {
    pub fn create() -> Result<Self> {
        Self::create_in(std::env::temp_dir())
    }

    pub fn create_in<P: AsRef<Path>>(dir: P) -> Result<Self> {
        let dir = dir.as_ref();
        let file = tempfile::Builder::new()
            .prefix(INTERMEDIATE_PREFIX)
            .suffix(INTERMEDIATE_SUFFIX)
            .tempfile_in(dir)
            .map_err(|e| Error::file_access(Stage::Intermediate, dir, e))?;
        log::debug!("intermediate file {}", file.path().display());
        Ok(Self { file })
    }

    pub fn path(&self) -> &Path {
        self.file.path()
    }

    /// A fresh handle for the preprocessor to write into.
    pub fn writer(&self) -> Result<File> {
        self.reopen()
    }

    /// A fresh handle positioned at the start, for the filter to read from.
    pub fn reader(&self) -> Result<File> {
        self.reopen()
    }

    fn reopen(&self) -> Result<File> {
        self.file
            .reopen()
            .map_err(|e| Error::file_access(Stage::Intermediate, self.path(), e))
    }

    /// Remove the file now and report a failure to do so, instead of leaving it to drop.
    pub fn close(self) -> Result<()> {
        let path: PathBuf = self.file.path().to_path_buf();
        self.file
            .close()
            .map_err(|e| Error::file_access(Stage::Intermediate, path, e))
    }
}

#[cfg(test)]
mod test {
    use super::Intermediate;
    use std::io::{Read, Write};
    use test_log::test;

    #[test]
    fn test_removed_on_drop() {
        let dir = tempfile::tempdir().unwrap();
        let path = {
            let intermediate = Intermediate::create_in(dir.path()).unwrap();
            assert!(intermediate.path().exists());
            intermediate.path().to_path_buf()
        };
        assert!(!path.exists());
    }

    #[test]
    fn test_close_removes() {
        let dir = tempfile::tempdir().unwrap();
        let intermediate = Intermediate::create_in(dir.path()).unwrap();
        let path = intermediate.path().to_path_buf();
        let name = path.file_name().unwrap().to_string_lossy().into_owned();
        assert!(name.starts_with("ccompact-"));
        assert!(name.ends_with(".i"));
        intermediate.close().unwrap();
        assert!(!path.exists());
    }

    #[test]
    fn test_reader_sees_writer_data() {
        let dir = tempfile::tempdir().unwrap();
        let intermediate = Intermediate::create_in(dir.path()).unwrap();
        intermediate
            .writer()
            .unwrap()
            .write_all(b"int x;\n")
            .unwrap();
        let mut data = Vec::new();
        intermediate.reader().unwrap().read_to_end(&mut data).unwrap();
        assert_eq!(data, b"int x;\n");
    }

    #[test]
    fn test_close_reports_vanished_file() {
        let dir = tempfile::tempdir().unwrap();
        let intermediate = Intermediate::create_in(dir.path()).unwrap();
        std::fs::remove_file(intermediate.path()).unwrap();
        assert_eq!(intermediate.close().unwrap_err().exit_code(), 4);
    }

    #[test]
    fn test_missing_dir_is_file_access_error() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope");
        let err = Intermediate::create_in(&missing).unwrap_err();
        assert_eq!(err.exit_code(), 4);
    }
}
