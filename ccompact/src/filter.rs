//
// Copyright (c) 2024 Hemi Labs, Inc.
//
// This file is part of the ccompact project covered under
// the MIT License.  For the full license text, please see the LICENSE
// file in the root directory of this project.
// SPDX-License-Identifier: MIT
//

//! Quote-aware control byte filter.
//!
//! Every byte below 0x20 that appears outside a quoted region is replaced by a single space.
//! Bytes inside a region opened by `"` or `'` are copied through untouched, so string and
//! character literals keep their exact contents. The output always has the same length as the
//! input.

use std::io::{BufWriter, Read, Write};

use crate::error::{Error, Result};

pub const BUFSZ: usize = 8 * 1024;

pub const DEFAULT_MAX_QUOTE_DEPTH: usize = 64;

const SPACE: u8 = b' ';
const BACKSLASH: u8 = b'\\';

/// Bytes are unsigned here: 0x80 and above are never control, so UTF-8 text survives.
fn is_control(c: u8) -> bool {
    c < SPACE
}

fn is_quote(c: u8) -> bool {
    c == b'"' || c == b'\''
}

/// Delimiters of the currently open quoted regions, innermost last.
#[derive(Debug, Clone)]
pub struct QuoteStack {
    delims: Vec<u8>,
    max_depth: usize,
}

impl QuoteStack {
    pub fn new(max_depth: usize) -> Self {
        Self {
            delims: Vec::new(),
            max_depth,
        }
    }

    pub fn depth(&self) -> usize {
        self.delims.len()
    }

    pub fn max_depth(&self) -> usize {
        self.max_depth
    }

    pub fn is_empty(&self) -> bool {
        self.delims.is_empty()
    }

    /// Delimiter of the innermost open region.
    pub fn top(&self) -> Option<u8> {
        self.delims.last().copied()
    }

    /// Open a new region. A full stack is left untouched and the rejected delimiter is handed
    /// back.
    pub fn push(&mut self, delim: u8) -> std::result::Result<(), u8> {
        if self.delims.len() >= self.max_depth {
            return Err(delim);
        }
        self.delims.push(delim);
        Ok(())
    }

    pub fn pop(&mut self) -> Option<u8> {
        self.delims.pop()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FilterOptions {
    /// Never open a quoted region. Every control byte is then blanked.
    pub protected: bool,
    pub max_quote_depth: usize,
}

impl Default for FilterOptions {
    fn default() -> Self {
        Self {
            protected: false,
            max_quote_depth: DEFAULT_MAX_QUOTE_DEPTH,
        }
    }
}

/// What the filter writes for one input byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    /// The input byte, unchanged.
    Pass(u8),
    /// A control byte outside any quoted region, written as a space.
    Blank,
}

impl Step {
    pub fn byte(self) -> u8 {
        match self {
            Step::Pass(c) => c,
            Step::Blank => SPACE,
        }
    }
}

/// State of one filtering run.
#[derive(Debug, Clone)]
pub struct Filter {
    quotes: QuoteStack,
    escaped: bool,
    protected: bool,
    offset: u64,
}

impl Filter {
    pub fn new(options: FilterOptions) -> Self {
        Self {
            quotes: QuoteStack::new(options.max_quote_depth),
            escaped: false,
            protected: options.protected,
            offset: 0,
        }
    }

    pub fn depth(&self) -> usize {
        self.quotes.depth()
    }

    pub fn is_escaped(&self) -> bool {
        self.escaped
    }

    /// Number of bytes consumed so far.
    pub fn offset(&self) -> u64 {
        self.offset
    }

    /// Consume one byte and decide what to write for it.
    ///
    /// A blanked byte leaves the quote stack and the escape flag as they were. For a byte that
    /// passes through, the close check runs first and ignores the escape flag, so `\"` still
    /// closes a region opened by `"`. Only the open check honours the escape flag.
    pub fn step(&mut self, c: u8) -> Result<Step> {
        let offset = self.offset;
        self.offset += 1;

        if is_control(c) && self.quotes.is_empty() {
            return Ok(Step::Blank);
        }

        if self.quotes.top() == Some(c) {
            self.quotes.pop();
            log::trace!("close {:?} at {offset}, depth {}", c as char, self.depth());
        } else if !self.escaped && !self.protected && is_quote(c) {
            let max = self.quotes.max_depth();
            self.quotes
                .push(c)
                .map_err(|_| Error::QuoteDepthExceeded { max, offset })?;
            log::trace!("open {:?} at {offset}, depth {}", c as char, self.depth());
        }

        self.escaped = c == BACKSLASH;

        Ok(Step::Pass(c))
    }

    /// Filter `input` into `output` until end of stream, returning the number of bytes written.
    ///
    /// When `echo` is given, every byte that passes through unchanged is also written there,
    /// in the same order.
    pub fn run<R: Read, W: Write>(
        &mut self,
        mut input: R,
        output: W,
        echo: Option<&mut dyn Write>,
    ) -> Result<u64> {
        let mut raw_buffer = [0; BUFSZ];
        let mut writer = BufWriter::new(output);
        let mut echo = echo.map(BufWriter::new);
        let mut n_written: u64 = 0;

        loop {
            let n_read = input.read(&mut raw_buffer[..])?;
            if n_read == 0 {
                break;
            }

            for byte in &raw_buffer[..n_read] {
                let step = self.step(*byte)?;
                writer.write_all(&[step.byte()])?;
                if let (Step::Pass(c), Some(echo)) = (step, echo.as_mut()) {
                    echo.write_all(&[c])?;
                }
            }
            n_written += n_read as u64;
        }

        writer.flush()?;
        if let Some(echo) = echo.as_mut() {
            echo.flush()?;
        }

        if self.depth() > 0 {
            log::warn!(
                "input ended inside {} quoted region(s); innermost opened by {:?}",
                self.depth(),
                self.quotes.top().map(char::from)
            );
        }
        log::debug!("filtered {n_written} bytes");

        Ok(n_written)
    }
}

/// Filter an in-memory buffer in one go.
pub fn filter_bytes(input: &[u8], options: FilterOptions) -> Result<Vec<u8>> {
    let mut output = Vec::with_capacity(input.len());
    Filter::new(options).run(input, &mut output, None)?;
    Ok(output)
}
