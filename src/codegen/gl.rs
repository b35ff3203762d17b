use crate::codegen::GenerateSources;
use crate::config::Config;
use crate::context::Context;
use crate::error::{Error, Result};
use regex::Regex;
use std::fmt::{Display, Formatter};
use std::path::PathBuf;

pub const FILE_NAME: &str = "demo-gl.hpp";

pub const SEED_CONSTANTS: [&str; 2] = ["GL_FRAGMENT_SHADER", "GL_VERTEX_SHADER"];

pub const SEED_FUNCTIONS: [&str; 8] = [
    "glAttachShader",
    "glCompileShader",
    "glCreateProgram",
    "glCreateShader",
    "glLinkProgram",
    "glShaderSource",
    "glUniform1fv",
    "glUseProgram",
];

const PREAMBLE: [&str; 10] = [
    "#pragma once",
    "",
    "#include <GL/gl.h>",
    "",
    "#define GLAPIENTRY __stdcall",
    "typedef char GLchar;",
    "typedef ptrdiff_t GLintptr;",
    "typedef ptrdiff_t GLsizeiptr;",
    "typedef void (APIENTRY * GLDEBUGPROC)(GLenum source, GLenum type, GLuint id, GLenum severity, GLsizei length,const GLchar * message,const void * userParam);",
    "",
];

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum SymbolKind {
    Constant,
    Function,
}

/// A requested symbol the vendored header does not declare.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct MissingSymbol {
    pub kind: SymbolKind,
    pub name: String,
}

impl Display for MissingSymbol {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let kind = match self.kind {
            SymbolKind::Constant => "constant",
            SymbolKind::Function => "function",
        };
        write!(f, "OpenGL {} {} does not seem to exist.", kind, self.name)
    }
}

/// Slot index to function name; `None` marks a function that was not found.
#[derive(Debug, Clone, Default, Eq, PartialEq)]
pub struct BindingTable {
    slots: Vec<Option<String>>,
}

impl BindingTable {
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn slot(&self, index: usize) -> Option<&str> {
        self.slots.get(index).and_then(|it| it.as_deref())
    }

    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.slots
            .iter()
            .position(|slot| slot.as_deref() == Some(name))
    }

    /// C initializers for `glExtFunctionNames`.
    pub fn initializers(&self) -> Vec<String> {
        self.slots
            .iter()
            .map(|slot| match slot {
                Some(name) => format!("\"{}\"", name),
                None => "0".to_string(),
            })
            .collect()
    }
}

#[derive(Debug, Clone)]
pub struct GeneratedBindings {
    pub text: String,
    pub table: BindingTable,
    pub missing: Vec<MissingSymbol>,
}

fn typedef_name(function: &str) -> String {
    format!("PFN{}PROC", function.to_ascii_uppercase())
}

fn find_line(pattern: &str, header: &str) -> Option<String> {
    let regex = match Regex::new(pattern) {
        Ok(regex) => regex,
        Err(err) => {
            log::warn!("unable to search vendored header: {}", err);
            return None;
        }
    };
    regex
        .find(header)
        .map(|found| found.as_str().trim_end_matches('\r').to_string())
}

/// Mines `header` for the requested constants and function typedefs.
///
/// Misses are reported, never fatal: constants are left out, functions keep
/// their slot with a null name.
pub fn generate_bindings(
    constants: &[String],
    functions: &[String],
    header: &str,
) -> GeneratedBindings {
    let mut lines: Vec<String> = PREAMBLE.iter().map(|line| line.to_string()).collect();
    let mut missing = vec![];

    for constant in constants {
        let pattern = format!(r"(?m)^#define {} .+$", regex::escape(constant));
        match find_line(&pattern, header) {
            Some(line) => lines.push(line),
            None => missing.push(MissingSymbol {
                kind: SymbolKind::Constant,
                name: constant.clone(),
            }),
        }
    }

    let mut table = BindingTable::default();
    for (index, function) in functions.iter().enumerate() {
        let typedef = typedef_name(function);
        let pattern = format!(
            r"(?m)^typedef [\w \*]+\(GLAPIENTRY \* {}\).+$",
            regex::escape(&typedef)
        );
        match find_line(&pattern, header) {
            Some(line) => {
                lines.push(line);
                lines.push(format!(
                    "#define {} (({})glExtFunctions[{}])",
                    function, typedef, index
                ));
                table.slots.push(Some(function.clone()));
            }
            None => {
                missing.push(MissingSymbol {
                    kind: SymbolKind::Function,
                    name: function.clone(),
                });
                table.slots.push(None);
            }
        }
    }

    lines.push(format!("#define GL_EXT_FUNCTION_COUNT {}", table.len()));
    lines.push("static const char *glExtFunctionNames[GL_EXT_FUNCTION_COUNT] = { ".to_string());
    lines.push(table.initializers().join(",\n"));
    lines.push(" };".to_string());
    lines.push("static void *glExtFunctions[GL_EXT_FUNCTION_COUNT];".to_string());
    lines.push(String::new());

    GeneratedBindings {
        text: lines.join("\n"),
        table,
        missing,
    }
}

/// Requested GL constants and functions; always starts with the ones the
/// engine itself needs.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct GlBindings {
    constants: Vec<String>,
    functions: Vec<String>,
}

impl Default for GlBindings {
    fn default() -> Self {
        GlBindings {
            constants: SEED_CONSTANTS.iter().map(|it| it.to_string()).collect(),
            functions: SEED_FUNCTIONS.iter().map(|it| it.to_string()).collect(),
        }
    }
}

impl GlBindings {
    pub fn new() -> GlBindings {
        GlBindings::default()
    }

    /// Seeds plus `demo:gl:constants` and `demo:gl:functions`.
    pub fn from_config(config: &Config) -> GlBindings {
        let mut result = GlBindings::new();
        for constant in config.get_list("demo:gl:constants") {
            result.add_constant(constant);
        }
        for function in config.get_list("demo:gl:functions") {
            result.add_function(function);
        }
        result
    }

    /// Returns `false` if the constant was already requested.
    pub fn add_constant(&mut self, name: impl Into<String>) -> bool {
        let name = name.into();
        if self.constants.contains(&name) {
            return false;
        }
        self.constants.push(name);
        true
    }

    /// Returns `false` if the function was already requested.
    pub fn add_function(&mut self, name: impl Into<String>) -> bool {
        let name = name.into();
        if self.functions.contains(&name) {
            return false;
        }
        self.functions.push(name);
        true
    }

    pub fn constants(&self) -> &[String] {
        &self.constants
    }

    pub fn functions(&self) -> &[String] {
        &self.functions
    }

    pub fn generate(&self, header: &str) -> GeneratedBindings {
        let result = generate_bindings(&self.constants, &self.functions, header);
        for missing in &result.missing {
            log::warn!("{}", missing);
        }
        result
    }
}

/// `<tools:glew>/include/GL/glew.h`
pub fn vendored_header_path(context: &Context) -> Result<PathBuf> {
    Ok(context
        .tool("glew")?
        .join("include")
        .join("GL")
        .join("glew.h"))
}

impl GenerateSources for GlBindings {
    fn file_name(&self) -> &'static str {
        FILE_NAME
    }

    fn render(&self, context: &Context) -> Result<String> {
        let path = vendored_header_path(context)?;
        let header = std::fs::read_to_string(&path).map_err(|err| Error::file(&path, err))?;
        Ok(self.generate(&header).text)
    }
}
