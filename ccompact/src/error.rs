//
// Copyright (c) 2024 Hemi Labs, Inc.
//
// This file is part of the ccompact project covered under
// the MIT License.  For the full license text, please see the LICENSE
// file in the root directory of this project.
// SPDX-License-Identifier: MIT
//

use std::fmt;
use std::path::PathBuf;

/// The file a [`Error::FileAccess`] refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Source,
    Intermediate,
    Destination,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Stage::Source => "source",
            Stage::Intermediate => "intermediate",
            Stage::Destination => "destination",
        })
    }
}

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("parameter error: {0}")]
    Parameter(String),
    #[error("preprocess: {0}")]
    ExternalTool(String),
    #[error("{stage}: cannot open {}: {source}", .path.display())]
    FileAccess {
        stage: Stage,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("filter: quote nesting deeper than {max} at byte offset {offset}")]
    QuoteDepthExceeded { max: usize, offset: u64 },
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    pub fn file_access(stage: Stage, path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::FileAccess {
            stage,
            path: path.into(),
            source,
        }
    }

    /// Process exit status for this error. 2 matches what clap uses for usage errors.
    pub fn exit_code(&self) -> u8 {
        match self {
            Error::Io(_) => 1,
            Error::Parameter(_) => 2,
            Error::ExternalTool(_) => 3,
            Error::FileAccess { .. } => 4,
            Error::QuoteDepthExceeded { .. } => 5,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

pub trait GetExitCode {
    fn get_exit_code(&self) -> u8;
}

impl<T> GetExitCode for Result<T> {
    fn get_exit_code(&self) -> u8 {
        match self {
            Ok(_) => 0,
            Err(e) => e.exit_code(),
        }
    }
}

#[cfg(test)]
mod test {
    use super::{Error, GetExitCode, Result, Stage};
    use test_log::test;

    fn io_err() -> std::io::Error {
        std::io::Error::new(std::io::ErrorKind::NotFound, "gone")
    }

    #[test]
    fn test_exit_codes_are_distinct() {
        let errors = [
            Error::Io(io_err()),
            Error::Parameter("x".to_owned()),
            Error::ExternalTool("x".to_owned()),
            Error::file_access(Stage::Source, "a.c", io_err()),
            Error::QuoteDepthExceeded { max: 1, offset: 0 },
        ];
        let mut codes: Vec<u8> = errors.iter().map(Error::exit_code).collect();
        codes.sort();
        codes.dedup();
        assert_eq!(codes, vec![1, 2, 3, 4, 5]);
    }

    #[test]
    fn test_result_exit_code() {
        let ok: Result<()> = Ok(());
        assert_eq!(ok.get_exit_code(), 0);
        let err: Result<()> = Err(Error::QuoteDepthExceeded { max: 4, offset: 9 });
        assert_eq!(err.get_exit_code(), 5);
    }

    #[test]
    fn test_file_access_names_stage() {
        let e = Error::file_access(Stage::Destination, "out.c", io_err());
        assert_eq!(e.to_string(), "destination: cannot open out.c: gone");
    }
}
