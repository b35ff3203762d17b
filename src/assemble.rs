use crate::error::{Error, Result};
use crate::shader::{ShaderDefinition, Stage};
use regex::Regex;

lazy_static::lazy_static! {
    /// One `type name[, name...];` declaration.
    pub static ref STAGE_VARIABLE: Regex = Regex::new(r"\w+ [\w,]+;").unwrap();
}

pub const SEPARATOR: &str = "#pragma separator";

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum Selector {
    /// Declarations shared by every stage, interface blocks untouched.
    WholeProgram,
    /// One compilable stage of one pass.
    Stage { stage: Stage, pass: usize },
}

/// Prefixes every declaration found in `block` with `qualifier`.
pub fn qualify(block: &str, qualifier: &str) -> String {
    STAGE_VARIABLE
        .find_iter(block)
        .map(|declaration| format!("{} {}\n", qualifier, declaration.as_str()))
        .collect()
}

/// Interface declarations each stage needs on top of the common code.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StageInterfaces {
    pub vertex: String,
    pub fragment: String,
}

impl StageInterfaces {
    pub fn new(definition: &ShaderDefinition) -> StageInterfaces {
        let mut result = StageInterfaces::default();

        if let Some(attributes) = definition.attributes() {
            result.vertex += &qualify(attributes, "in");
        }
        if let Some(varyings) = definition.varyings() {
            result.vertex += &qualify(varyings, "out");
            result.fragment += &qualify(varyings, "in");
        }
        if let Some(outputs) = definition.outputs() {
            result.fragment += &qualify(outputs, "out");
        }

        result
    }

    pub fn get(&self, stage: Stage) -> &str {
        match stage {
            Stage::Vertex => &self.vertex,
            Stage::Fragment => &self.fragment,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.vertex.is_empty() && self.fragment.is_empty()
    }
}

/// Line buffer producing separator-tagged sections.
#[derive(Debug, Default)]
pub struct SourceBuilder {
    lines: Vec<String>,
}

impl SourceBuilder {
    pub fn raw(&mut self, text: &str) -> &mut Self {
        self.lines.push(text.to_string());
        self
    }

    pub fn section(&mut self, title: Option<&str>, body: &str) -> &mut Self {
        if !self.lines.is_empty() {
            self.lines.push(String::new());
            self.lines.push(SEPARATOR.to_string());
        }
        if let Some(title) = title {
            self.lines.push(format!("// {}", title));
        }
        self.lines.push(String::new());
        self.lines.push(body.to_string());
        self
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn build(self) -> String {
        self.lines.join("\n")
    }
}

fn declarations(builder: &mut SourceBuilder, definition: &ShaderDefinition) {
    let uniforms: Vec<String> = definition
        .uniform_arrays
        .iter()
        .map(|array| {
            format!(
                "uniform {} {}[{}];",
                array.type_name,
                array.name,
                array.count()
            )
        })
        .collect();
    builder.section(Some("Uniform arrays"), &uniforms.join("\n"));

    let globals: Vec<String> = definition
        .globals()
        .map(|variable| format!("{} {};", variable.type_name, variable.name))
        .collect();
    builder.section(Some("Non-uniform global variables"), &globals.join("\n"));
}

/// The pieces the generated header stores separately.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProgramParts {
    /// `None` when the prolog was folded into `common`.
    pub prolog: Option<String>,
    pub interfaces: StageInterfaces,
    pub common: String,
}

impl ProgramParts {
    pub fn new(definition: &ShaderDefinition) -> ProgramParts {
        let interfaces = StageInterfaces::new(definition);
        let mut builder = SourceBuilder::default();

        // Without any stage specific code the prolog would be emitted right
        // before the common code anyway, so it joins it.
        let prolog = match definition.prolog() {
            Some(prolog) if interfaces.is_empty() => {
                builder.raw(prolog);
                None
            }
            prolog => prolog.map(str::to_string),
        };

        declarations(&mut builder, definition);
        builder.section(None, &definition.common_code);

        ProgramParts {
            prolog,
            interfaces,
            common: builder.build(),
        }
    }
}

pub fn assemble(definition: &ShaderDefinition, selector: Selector) -> Result<String> {
    definition.check_uniform_arrays()?;

    let stage_code = match selector {
        Selector::WholeProgram => None,
        Selector::Stage { stage, pass } => {
            let code = definition
                .pass(pass)
                .and_then(|it| it.code(stage))
                .ok_or(Error::MissingStageCode { pass, stage })?;
            Some((stage, pass, code))
        }
    };

    let mut builder = SourceBuilder::default();

    if let Some(prolog) = definition.prolog() {
        builder.raw(prolog);
    }

    declarations(&mut builder, definition);

    match stage_code {
        None => {
            let blocks = [
                ("Attributes", definition.attributes()),
                ("Varyings", definition.varyings()),
                ("Outputs", definition.outputs()),
            ];
            for (title, block) in blocks {
                if let Some(block) = block {
                    builder.section(Some(title), block);
                }
            }
        }
        Some((Stage::Vertex, _, _)) => {
            if let Some(attributes) = definition.attributes() {
                builder.section(Some("Attributes"), &qualify(attributes, "in"));
            }
            if let Some(varyings) = definition.varyings() {
                builder.section(Some("Varyings"), &qualify(varyings, "out"));
            }
        }
        Some((Stage::Fragment, _, _)) => {
            if let Some(varyings) = definition.varyings() {
                builder.section(Some("Varyings"), &qualify(varyings, "in"));
            }
            if let Some(outputs) = definition.outputs() {
                builder.section(Some("Outputs"), &qualify(outputs, "out"));
            }
        }
    }

    builder.section(None, &definition.common_code);

    if let Some((stage, pass, code)) = stage_code {
        let title = format!("Pass {} {}", pass, stage.name());
        builder.section(Some(title.as_str()), code);
    }

    Ok(builder.build())
}
