use path_slash::PathExt as _;
use std::error::Error;
use std::path::{Component, Path, PathBuf};

/// Lexically resolves `.` and `..` components without touching the filesystem.
pub fn normalize_path(path: impl AsRef<Path>) -> PathBuf {
    let mut result = PathBuf::new();

    for component in path.as_ref().components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                let popped = match result.components().next_back() {
                    Some(Component::Normal(_)) => result.pop(),
                    _ => false,
                };
                if !popped && !result.has_root() {
                    result.push("..");
                }
            }
            other => result.push(other.as_os_str()),
        }
    }

    if result.as_os_str().is_empty() {
        result.push(".");
    }

    result
}

/// Forward-slash rendering of a path for logs and generated sources.
pub fn display_path(path: impl AsRef<Path>) -> String {
    path.as_ref().to_slash_lossy().into_owned()
}

/// Directory argument with a trailing separator, as the toolchain expects
/// for include and output directories.
pub fn dir_arg(path: impl AsRef<Path>) -> String {
    let mut text = path.as_ref().display().to_string();
    if !text.ends_with(std::path::MAIN_SEPARATOR) {
        text.push(std::path::MAIN_SEPARATOR);
    }
    text
}

/// `time_offset` -> `TimeOffset`: capitalizes the first letter and every
/// letter after an underscore, then drops the underscores.
pub fn pascal_case(name: &str) -> String {
    let mut result = String::with_capacity(name.len());
    let mut upper_next = true;

    for c in name.chars() {
        if c == '_' {
            upper_next = true;
        } else if upper_next {
            result.extend(c.to_uppercase());
            upper_next = false;
        } else {
            result.push(c);
        }
    }

    result
}

pub(crate) trait LogResult<T> {
    fn ok_or_log(self) -> Option<T>;
}

impl<T, E: Error> LogResult<T> for Result<T, E> {
    fn ok_or_log(self) -> Option<T> {
        match self {
            Ok(value) => Some(value),
            Err(err) => {
                log::error!("{}", err);
                None
            }
        }
    }
}
