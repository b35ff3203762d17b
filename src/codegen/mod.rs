pub mod data;
pub mod gl;
pub mod hooks;

use crate::context::Context;
use crate::error::{Error, Result};
use crate::util::display_path;
use std::path::PathBuf;

/// Longest run of source characters stored in one string literal segment.
pub const MAX_LITERAL_CHUNK: usize = 64;

pub fn c_escape(text: &str) -> String {
    let mut result = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '\\' => result.push_str("\\\\"),
            '\n' => result.push_str("\\n"),
            '\r' => result.push_str("\\r"),
            '\t' => result.push_str("\\t"),
            '"' => result.push_str("\\\""),
            c => result.push(c),
        }
    }
    result
}

/// Renders `text` as adjacent C string literals, one per line, each holding
/// at most [`MAX_LITERAL_CHUNK`] characters of the original text.
pub fn c_stringify(text: &str) -> String {
    let chars: Vec<char> = text.chars().collect();
    if chars.is_empty() {
        return "\"\"".to_string();
    }

    let segments: Vec<String> = chars
        .chunks(MAX_LITERAL_CHUNK)
        .map(|chunk| format!("\"{}\"", c_escape(&chunk.iter().collect::<String>())))
        .collect();
    segments.join("\n")
}

/// A generated source file living in the build directory.
pub trait GenerateSources {
    fn file_name(&self) -> &'static str;

    fn render(&self, context: &Context) -> Result<String>;

    fn generate_sources(&self, context: &Context) -> Result<PathBuf> {
        let build_dir = context.build_dir()?;
        if !build_dir.exists() {
            std::fs::create_dir_all(&build_dir).map_err(|err| Error::file(&build_dir, err))?;
        }

        let path = build_dir.join(self.file_name());
        let contents = self.render(context)?;
        std::fs::write(&path, contents).map_err(|err| Error::file(&path, err))?;

        log::info!("Generated {}", display_path(&path));
        Ok(path)
    }
}
