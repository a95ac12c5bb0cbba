//
// Copyright (c) 2024 Hemi Labs, Inc.
//
// This file is part of the ccompact project covered under
// the MIT License.  For the full license text, please see the LICENSE
// file in the root directory of this project.
// SPDX-License-Identifier: MIT
//

use std::ffi::OsString;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use clap::builder::RangedU64ValueParser;
use gettextrs::gettext;

use error::{Error, Result, Stage};
use filter::{Filter, FilterOptions, DEFAULT_MAX_QUOTE_DEPTH};
use intermediate::Intermediate;
use preprocess::Preprocessor;

pub mod error;
pub mod filter;
pub mod intermediate;
pub mod preprocess;

pub const PROJECT_NAME: &str = "ccompact";

/// Written to the current directory unless `-o` says otherwise.
pub const DEFAULT_OUTPUT: &str = "output.c";

#[derive(Debug, clap::Parser, Clone)]
#[command(version, about = gettext("ccompact - expand a C source file and strip formatting control bytes"))]
pub struct Args {
    #[arg(short, long, help = gettext("Echo every byte kept unchanged to standard output"))]
    pub verbose: bool,

    // Reserved for protected mode, where no quoted region is ever opened.
    #[arg(short = 'c', help = gettext("Reserved; currently has no effect"))]
    pub protected: bool,

    #[arg(short, long, value_name = "file", help = gettext("Place output in file (default: output.c)"))]
    pub output: Option<PathBuf>,

    #[arg(short = 'D', action = clap::ArgAction::Append, value_name = "macro", help = gettext("Define a macro for the preprocessor"))]
    pub defines: Vec<OsString>,

    #[arg(short = 'U', action = clap::ArgAction::Append, value_name = "macro", help = gettext("Undefine a macro for the preprocessor"))]
    pub undefines: Vec<OsString>,

    #[arg(short = 'I', action = clap::ArgAction::Append, value_name = "dir", help = gettext("Add include path for the preprocessor"))]
    pub include_paths: Vec<OsString>,

    #[arg(long = "cc", value_name = "program", help = gettext("Preprocessor program (default: $CC, then cc)"))]
    pub cc: Option<OsString>,

    #[arg(
        long,
        value_name = "depth",
        default_value_t = DEFAULT_MAX_QUOTE_DEPTH,
        value_parser = RangedU64ValueParser::<usize>::new().range(1..),
        help = gettext("Maximum number of nested open quotes")
    )]
    pub max_quote_depth: usize,

    #[arg(help = gettext("C source file to compact"))]
    pub source: PathBuf,
}

/// Whether `a` and `b` name the same file, lexically or after resolving both.
fn same_file(a: &Path, b: &Path) -> bool {
    if a == b {
        return true;
    }
    match (fs::canonicalize(a), fs::canonicalize(b)) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}

/// Remove the intermediate file. The output is complete by now, so a failure is only logged.
fn discard(intermediate: Intermediate) {
    if let Err(e) = intermediate.close() {
        log::warn!("{e}");
    }
}

impl Args {
    pub fn destination(&self) -> PathBuf {
        self.output
            .clone()
            .unwrap_or_else(|| PathBuf::from(DEFAULT_OUTPUT))
    }

    pub fn preprocessor(&self) -> Preprocessor {
        let mut pp = Preprocessor::from_env(self.cc.as_deref());
        for define in &self.defines {
            pp.define(define);
        }
        for name in &self.undefines {
            pp.undefine(name);
        }
        for dir in &self.include_paths {
            pp.include(dir);
        }
        pp
    }

    pub fn filter_options(&self) -> FilterOptions {
        FilterOptions {
            protected: false,
            max_quote_depth: self.max_quote_depth,
        }
    }
}

/// Expand `args.source`, filter it into the destination and return the number of bytes written.
///
/// With `--verbose` the kept bytes are echoed to `stdout`. On a filter error the partial
/// destination is removed. The intermediate file is removed on every path; failing to remove
/// it after a complete run is logged, not reported.
pub fn run<W: Write>(args: &Args, mut stdout: W) -> Result<u64> {
    if args.protected {
        log::warn!("-c is reserved for protected mode and has no effect");
    }

    let destination = args.destination();
    if same_file(&destination, &args.source) {
        return Err(Error::Parameter(format!(
            "source and destination are the same file: {}",
            destination.display()
        )));
    }
    log::debug!("{} -> {}", args.source.display(), destination.display());

    let intermediate = args.preprocessor().expand(&args.source)?;
    let input = intermediate.reader()?;
    let output = File::create(&destination)
        .map_err(|e| Error::file_access(Stage::Destination, &destination, e))?;

    let echo: Option<&mut dyn Write> = if args.verbose {
        Some(&mut stdout)
    } else {
        None
    };

    let mut filter = Filter::new(args.filter_options());
    match filter.run(input, output, echo) {
        Ok(n) => {
            discard(intermediate);
            Ok(n)
        }
        Err(e) => {
            if let Err(rm) = fs::remove_file(&destination) {
                log::warn!("cannot remove {}: {rm}", destination.display());
            }
            Err(e)
        }
    }
}
