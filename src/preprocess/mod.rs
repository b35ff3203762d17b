use crate::error::{Error, Result};
use crate::util::{display_path, normalize_path};
use path_slash::PathBufExt;
use regex::Regex;
use std::collections::HashSet;
use std::path::{Path, PathBuf};

lazy_static::lazy_static! {
    pub static ref INCLUDE_MACRO: Regex =
        Regex::new(r#"#include\s*(?:"([^"]*)"|<([^>]*)>)"#).unwrap();
}

/// Expands `#include` directives recursively.
///
/// Every file is injected at most once per [`Flattener::flatten`] call: the
/// first reachable directive gets the flattened content, later ones (and
/// cyclic ones) are replaced by nothing.
#[derive(Debug, Default)]
pub struct Flattener {
    stack: Vec<PathBuf>,
    expanded: HashSet<PathBuf>,
}

impl Flattener {
    pub fn new() -> Flattener {
        Flattener::default()
    }

    pub fn flatten(&mut self, path: impl AsRef<Path>) -> Result<String> {
        self.stack.clear();
        self.expanded.clear();

        let path = normalize_path(path);
        self.expanded.insert(path.clone());
        self.flatten_file(&path)
    }

    fn flatten_file(&mut self, path: &Path) -> Result<String> {
        let mut buffer = std::fs::read_to_string(path).map_err(|err| Error::file(path, err))?;
        let directory = path.parent().map(Path::to_path_buf).unwrap_or_default();

        self.stack.push(path.to_path_buf());
        let result = self.expand_includes(&mut buffer, &directory);
        self.stack.pop();

        result.map(|_| buffer)
    }

    fn expand_includes(&mut self, buffer: &mut String, directory: &Path) -> Result<()> {
        let mut offset = 0;

        loop {
            let (start, end, target) = {
                let captures = match INCLUDE_MACRO.captures(&buffer[offset..]) {
                    Some(captures) => captures,
                    None => break,
                };
                let whole = captures.get(0).ok_or(Error::MatchIndex)?;
                let target = captures
                    .get(1)
                    .or_else(|| captures.get(2))
                    .ok_or(Error::MatchIndex)?;
                (
                    offset + whole.start(),
                    offset + whole.end(),
                    target.as_str().to_string(),
                )
            };

            let include_path = normalize_path(directory.join(PathBuf::from_slash(&target)));

            let replacement = if self.stack.contains(&include_path) {
                log::debug!("skipping cyclic include: {}", display_path(&include_path));
                String::new()
            } else if !self.expanded.insert(include_path.clone()) {
                log::debug!("skipping repeated include: {}", display_path(&include_path));
                String::new()
            } else {
                log::debug!("found include path: {}", display_path(&include_path));
                self.flatten_file(&include_path)?
            };

            buffer.replace_range(start..end, &replacement);
            offset = start + replacement.len();
        }

        Ok(())
    }
}

/// Flattens `path` with a fresh include-once scope.
pub fn flatten(path: impl AsRef<Path>) -> Result<String> {
    Flattener::new().flatten(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn scratch(name: &str, files: &[(&str, &str)]) -> PathBuf {
        let root = std::env::temp_dir().join(format!("demo_starch_preprocess_{}", name));
        let _ = fs::remove_dir_all(&root);
        for (file, contents) in files {
            let path = root.join(file);
            fs::create_dir_all(path.parent().unwrap()).unwrap();
            fs::write(&path, contents).unwrap();
        }
        root
    }

    #[test]
    fn no_includes_is_identity() {
        let root = scratch("identity", &[("a.glsl", "void main() {}\n")]);
        assert_eq!(flatten(root.join("a.glsl")).unwrap(), "void main() {}\n");
        let _ = fs::remove_dir_all(root);
    }

    #[test]
    fn nested_includes_resolve_relative_to_includer() {
        let root = scratch(
            "nested",
            &[
                ("main.glsl", "A\n#include \"lib/b.glsl\"\nZ\n"),
                ("lib/b.glsl", "B\n#include <../c.glsl>\n"),
                ("c.glsl", "C\n"),
            ],
        );
        assert_eq!(flatten(root.join("main.glsl")).unwrap(), "A\nB\nC\n\n\nZ\n");
        let _ = fs::remove_dir_all(root);
    }

    #[test]
    fn self_include_terminates() {
        let root = scratch("self", &[("a.glsl", "top\n#include \"a.glsl\"\nbottom\n")]);
        assert_eq!(flatten(root.join("a.glsl")).unwrap(), "top\n\nbottom\n");
        let _ = fs::remove_dir_all(root);
    }

    #[test]
    fn indirect_cycle_terminates() {
        let root = scratch(
            "cycle",
            &[
                ("a.glsl", "a\n#include \"b.glsl\"\n"),
                ("b.glsl", "b\n#include \"a.glsl\"\n"),
            ],
        );
        assert_eq!(flatten(root.join("a.glsl")).unwrap(), "a\nb\n\n\n");
        let _ = fs::remove_dir_all(root);
    }

    #[test]
    fn repeated_include_is_elided() {
        let root = scratch(
            "once",
            &[
                ("a.glsl", "#include \"b.glsl\"\nmid\n#include \"b.glsl\"\nend\n"),
                ("b.glsl", "B\n"),
            ],
        );
        assert_eq!(flatten(root.join("a.glsl")).unwrap(), "B\n\nmid\n\nend\n");
        let _ = fs::remove_dir_all(root);
    }

    #[test]
    fn diamond_includes_shared_file_once() {
        let root = scratch(
            "diamond",
            &[
                ("a.glsl", "#include \"b.glsl\"\n#include \"c.glsl\"\n"),
                ("b.glsl", "b\n#include \"d.glsl\"\n"),
                ("c.glsl", "c\n#include \"d.glsl\"\n"),
                ("d.glsl", "d\n"),
            ],
        );
        assert_eq!(flatten(root.join("a.glsl")).unwrap(), "b\nd\n\n\nc\n\n\n");
        let _ = fs::remove_dir_all(root);
    }

    #[test]
    fn once_scope_is_per_call() {
        let root = scratch(
            "scope",
            &[("a.glsl", "#include \"b.glsl\"\n"), ("b.glsl", "B")],
        );
        let mut flattener = Flattener::new();
        assert_eq!(flattener.flatten(root.join("a.glsl")).unwrap(), "B\n");
        assert_eq!(flattener.flatten(root.join("a.glsl")).unwrap(), "B\n");
        let _ = fs::remove_dir_all(root);
    }

    #[test]
    fn missing_include_is_an_io_error() {
        let root = scratch("missing", &[("a.glsl", "#include \"nope.glsl\"\n")]);
        match flatten(root.join("a.glsl")) {
            Err(Error::File { path, .. }) => assert!(path.ends_with("nope.glsl")),
            other => panic!("unexpected result: {:?}", other),
        }
        let _ = fs::remove_dir_all(root);
    }
}
