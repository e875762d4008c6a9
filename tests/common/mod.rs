//! Fake `osascript` interpreters for integration tests.
//!
//! Every fake first checks that it was called as
//! `<fake> -l JavaScript -e <script> <args...>` and exits with 64 otherwise.
//!
//! All fakes a test binary needs must be written before any of them runs:
//! executing a file that another thread still holds open for writing fails
//! with ETXTBSY.

#![allow(dead_code)]

use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};

const ARGV_CHECK: &str = r#"#!/bin/sh
if [ "$1" != "-l" ] || [ "$2" != "JavaScript" ] || [ "$3" != "-e" ]; then
    echo "unexpected invocation: $*" >&2
    exit 64
fi
shift 3
"#;

/// Runs the script text as shell code, with the script arguments as `$1...`.
pub const EVAL_BODY: &str = r#"script="$1"
shift
eval "$script"
"#;

/// Writes an executable fake interpreter named `name` into `dir`.
pub fn write_fake(dir: &Path, name: &str, body: &str) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, format!("{ARGV_CHECK}{body}")).unwrap();
    fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
    path
}

/// Writes a fake that ignores the script and prints `envelope`.
pub fn write_canned(dir: &Path, name: &str, envelope: &str) -> PathBuf {
    write_fake(dir, name, &format!("printf '%s' '{envelope}'\n"))
}
