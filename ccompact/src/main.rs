//
// Copyright (c) 2024 Hemi Labs, Inc.
//
// This file is part of the ccompact project covered under
// the MIT License.  For the full license text, please see the LICENSE
// file in the root directory of this project.
// SPDX-License-Identifier: MIT
//
// ccompact - expand a C source file and strip formatting control bytes
//

use std::io;
use std::process::ExitCode;

use ccompact::error::GetExitCode;
use ccompact::PROJECT_NAME;
use clap::Parser;
use gettextrs::{bind_textdomain_codeset, setlocale, textdomain, LocaleCategory};

fn init_locale() -> io::Result<()> {
    setlocale(LocaleCategory::LcAll, "");
    textdomain(PROJECT_NAME)?;
    bind_textdomain_codeset(PROJECT_NAME, "UTF-8")?;
    Ok(())
}

fn main() -> ExitCode {
    if let Err(e) = init_locale() {
        eprintln!("{PROJECT_NAME}: {e}");
        return ExitCode::FAILURE;
    }
    env_logger::init();

    let args = ccompact::Args::parse();

    let result = ccompact::run(&args, io::stdout().lock());
    if let Err(e) = &result {
        eprintln!("{PROJECT_NAME}: {e}");
    }
    ExitCode::from(result.get_exit_code())
}
