//! Corpus-relative path utilities.
//!
//! All paths handed between the index, planner and executor are plain
//! `/`-separated strings relative to the corpus root. OS paths only appear at
//! the disk boundary (index build, executor apply).

use std::{
    borrow::Cow,
    path::{Component, Path, PathBuf, MAIN_SEPARATOR_STR},
};

/// Utility function to replace separators and convert to unicode (via to_string_lossy) on os path.
pub fn os_path_to_string<P: AsRef<Path>>(os_path_ref: P) -> String {
    os_path_ref
        .as_ref()
        .components()
        .map(|c| match c {
            Component::RootDir => Cow::from("".to_string()),
            _ => c.as_os_str().to_string_lossy(),
        })
        .collect::<Vec<_>>()
        .join("/")
}

pub fn string_to_os_path(path_string: &str) -> PathBuf {
    PathBuf::from(path_string.replace("/", MAIN_SEPARATOR_STR))
}

/// Directory portion of a corpus-relative path, empty for top-level entries.
pub fn parent_dir(path: &str) -> &str {
    path.rfind('/').map(|idx| &path[..idx]).unwrap_or("")
}

/// Final segment of a corpus-relative path.
pub fn file_name(path: &str) -> &str {
    path.rfind('/').map(|idx| &path[idx + 1..]).unwrap_or(path)
}

/// Split a filename into (stem, extension). The extension is the text after
/// the final dot; a leading dot marks a hidden file, not an extension.
pub fn split_name(name: &str) -> (&str, Option<&str>) {
    match name.rfind('.') {
        Some(0) | None => (name, None),
        Some(idx) => (&name[..idx], Some(&name[idx + 1..])),
    }
}

pub fn join_rel(dir: &str, name: &str) -> String {
    if dir.is_empty() {
        name.to_string()
    } else {
        format!("{dir}/{name}")
    }
}

/// Resolve `.` and `..` segments lexically. Segments that climb above the
/// corpus root are kept so that `exists` checks on the result simply fail.
pub fn normalize(path: &str) -> String {
    let mut out: Vec<&str> = Vec::new();
    for seg in path.split('/') {
        match seg {
            "" | "." => {}
            ".." => {
                if matches!(out.last(), Some(&"..")) || out.is_empty() {
                    out.push("..");
                } else {
                    out.pop();
                }
            }
            _ => out.push(seg),
        }
    }
    out.join("/")
}

/// Relative path from `from_dir` to `target`, both corpus-root-relative.
pub fn relative_from(from_dir: &str, target: &str) -> String {
    let from: Vec<&str> = from_dir.split('/').filter(|s| !s.is_empty()).collect();
    let to: Vec<&str> = target.split('/').filter(|s| !s.is_empty()).collect();
    let common = from
        .iter()
        .zip(to.iter())
        .take_while(|(a, b)| a == b)
        .count();
    let mut out: Vec<&str> = Vec::new();
    for _ in common..from.len() {
        out.push("..");
    }
    out.extend(&to[common..]);
    out.join("/")
}

/// Swap the final segment of a link target, leaving any directory prefix in
/// the raw link text untouched.
pub fn replace_file_name(raw: &str, new_name: &str) -> String {
    match raw.rfind('/') {
        Some(idx) => format!("{}/{}", &raw[..idx], new_name),
        None => new_name.to_string(),
    }
}
