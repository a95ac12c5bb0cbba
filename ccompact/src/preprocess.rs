//
// Copyright (c) 2024 Hemi Labs, Inc.
//
// This file is part of the ccompact project covered under
// the MIT License.  For the full license text, please see the LICENSE
// file in the root directory of this project.
// SPDX-License-Identifier: MIT
//

use std::ffi::{OsStr, OsString};
use std::fs::File;
use std::os::unix::process::ExitStatusExt;
use std::path::Path;
use std::process::{Command, ExitStatus, Stdio};

use crate::error::{Error, Result, Stage};
use crate::intermediate::Intermediate;

pub const DEFAULT_PREPROCESSOR: &str = "cc";
pub const PREPROCESSOR_VAR: &str = "CC";

/// Runs the host C preprocessor (`cc -E -P`) over a source file.
#[derive(Debug, Clone)]
pub struct Preprocessor {
    program: OsString,
    flags: Vec<OsString>,
}

fn prefixed(flag: &str, value: &OsStr) -> OsString {
    let mut arg = OsString::from(flag);
    arg.push(value);
    arg
}

impl Preprocessor {
    pub fn new<S: Into<OsString>>(program: S) -> Self {
        Self {
            program: program.into(),
            flags: Vec::new(),
        }
    }

    /// `program` if given, else `$CC`, else `cc`.
    pub fn from_env(program: Option<&OsStr>) -> Self {
        let program = match program {
            Some(p) => p.to_os_string(),
            None => match std::env::var_os(PREPROCESSOR_VAR) {
                Some(cc) if !cc.is_empty() => cc,
                _ => OsString::from(DEFAULT_PREPROCESSOR),
            },
        };
        Self::new(program)
    }

    pub fn program(&self) -> &OsStr {
        &self.program
    }

    pub fn define(&mut self, definition: &OsStr) -> &mut Self {
        self.flags.push(prefixed("-D", definition));
        self
    }

    pub fn undefine(&mut self, name: &OsStr) -> &mut Self {
        self.flags.push(prefixed("-U", name));
        self
    }

    pub fn include(&mut self, dir: &OsStr) -> &mut Self {
        self.flags.push(prefixed("-I", dir));
        self
    }

    /// The command line, passed as an argument vector so no shell ever sees the paths.
    pub fn command(&self, source: &Path) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.arg("-E").arg("-P").args(&self.flags).arg(source);
        cmd
    }

    /// Expand `source` into a new intermediate file.
    pub fn expand(&self, source: &Path) -> Result<Intermediate> {
        File::open(source).map_err(|e| Error::file_access(Stage::Source, source, e))?;

        let intermediate = Intermediate::create()?;
        self.expand_into(source, &intermediate)?;
        Ok(intermediate)
    }

    pub fn expand_into(&self, source: &Path, intermediate: &Intermediate) -> Result<()> {
        let mut cmd = self.command(source);
        log::debug!("running {cmd:?}");

        let status = cmd
            .stdin(Stdio::null())
            .stdout(intermediate.writer()?)
            .status()
            .map_err(|e| {
                Error::ExternalTool(format!(
                    "cannot run {}: {e}",
                    self.program.to_string_lossy()
                ))
            })?;

        if !status.success() {
            return Err(Error::ExternalTool(describe_failure(&self.program, status)));
        }
        Ok(())
    }
}

fn describe_failure(program: &OsStr, status: ExitStatus) -> String {
    let program = program.to_string_lossy();
    match (status.code(), status.signal()) {
        (Some(code), _) => format!("{program} exited with status {code}"),
        (None, Some(signal)) => format!("{program} terminated by signal {signal}"),
        (None, None) => format!("{program} failed"),
    }
}

#[cfg(test)]
mod test {
    use super::{describe_failure, Preprocessor};
    use std::ffi::OsStr;
    use std::os::unix::process::ExitStatusExt;
    use std::path::Path;
    use std::process::ExitStatus;
    use test_log::test;

    #[test]
    fn test_command_line() {
        let mut pp = Preprocessor::new("gcc");
        pp.define(OsStr::new("DEBUG=1"))
            .undefine(OsStr::new("NDEBUG"))
            .include(OsStr::new("inc dir"));
        let cmd = pp.command(Path::new("my file.c"));
        assert_eq!(cmd.get_program(), "gcc");
        let args: Vec<&OsStr> = cmd.get_args().collect();
        assert_eq!(
            args,
            ["-E", "-P", "-DDEBUG=1", "-UNDEBUG", "-Iinc dir", "my file.c"]
        );
    }

    #[test]
    fn test_explicit_program_wins() {
        let pp = Preprocessor::from_env(Some(OsStr::new("clang")));
        assert_eq!(pp.program(), "clang");
    }

    #[test]
    fn test_missing_source_is_file_access_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = Preprocessor::new("cc")
            .expand(&dir.path().join("missing.c"))
            .unwrap_err();
        assert_eq!(err.exit_code(), 4);
    }

    #[test]
    fn test_missing_program_is_external_tool_error() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("a.c");
        std::fs::write(&source, "int x;\n").unwrap();
        let err = Preprocessor::new("/nonexistent/ccompact-cc")
            .expand(&source)
            .unwrap_err();
        assert_eq!(err.exit_code(), 3);
    }

    #[test]
    fn test_describe_failure() {
        let program = OsStr::new("cc");
        assert_eq!(
            describe_failure(program, ExitStatus::from_raw(1 << 8)),
            "cc exited with status 1"
        );
        assert_eq!(
            describe_failure(program, ExitStatus::from_raw(9)),
            "cc terminated by signal 9"
        );
    }
}
