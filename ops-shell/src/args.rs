//! `@file` indirection for command line arguments.
//!
//! An argument `@params.conf` is replaced by the lines of `params.conf`,
//! one argument per line. Files may reference other files.

use crate::{Error, Result};
use std::fs;

const MAX_DEPTH: usize = 8;

pub fn expand_arg_files<I>(args: I) -> Result<Vec<String>>
where
    I: IntoIterator<Item = String>,
{
    let mut expanded = Vec::new();
    for arg in args {
        expand_into(arg, 0, &mut expanded)?;
    }
    Ok(expanded)
}

fn expand_into(arg: String, depth: usize, out: &mut Vec<String>) -> Result<()> {
    if !arg.starts_with('@') || arg.len() == 1 {
        out.push(arg);
        return Ok(());
    }
    if depth >= MAX_DEPTH {
        return Err(Error::Config(format!("argument files nested too deep at {}", arg)));
    }
    let content = fs::read_to_string(&arg[1..])?;
    for line in content.lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        expand_into(line.to_owned(), depth + 1, out)?;
    }
    Ok(())
}

/// split a comma separated list, blanks dropped
pub fn parse_list(s: &str) -> impl Iterator<Item = &str> {
    s.split(',').map(|p| p.trim()).filter(|p| !p.is_empty())
}

/// parse comma separated entity codes, lowercased and deduplicated
pub fn parse_codes(s: &str) -> Result<Vec<String>> {
    let mut codes: Vec<String> = Vec::new();
    for part in parse_list(s) {
        let code = part.to_lowercase();
        if !codes.contains(&code) {
            codes.push(code);
        }
    }
    if codes.is_empty() {
        return Err(Error::Config(format!("no code in '{}'", s)));
    }
    Ok(codes)
}
