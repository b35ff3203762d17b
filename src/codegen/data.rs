use crate::assemble::ProgramParts;
use crate::codegen::{c_stringify, GenerateSources};
use crate::context::Context;
use crate::error::{Error, Result};
use crate::shader::{ShaderDefinition, Stage, UniformArray};
use crate::util::pascal_case;

pub const FILE_NAME: &str = "demo-data.hpp";

/// `demo-data.hpp`: shader sources as string literals, uniform storage and
/// the defines steering `main.cpp`.
#[derive(Debug, Clone)]
pub struct DemoData<'a> {
    pub shader: &'a ShaderDefinition,
    /// Names of the hooks injected into the main template.
    pub hooks: Vec<String>,
}

impl<'a> DemoData<'a> {
    pub fn new(shader: &'a ShaderDefinition, hooks: impl IntoIterator<Item = String>) -> Self {
        DemoData {
            shader,
            hooks: hooks.into_iter().collect(),
        }
    }
}

fn required_value(context: &Context, key: &str) -> Result<String> {
    context
        .config
        .get_str(key)?
        .ok_or_else(|| Error::MissingConfig(vec![key.to_string()]))
}

/// `HAS_HOOK_<NAME>`, anything that cannot appear in a macro name becomes `_`.
fn hook_macro(hook: &str) -> String {
    let name: String = hook
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c.to_ascii_uppercase() } else { '_' })
        .collect();
    format!("HAS_HOOK_{}", name)
}

fn host_type(type_name: &str) -> &str {
    if type_name.starts_with("sampler") {
        "int"
    } else {
        type_name
    }
}

struct UniformMacros {
    name: String,
    count: String,
    array: String,
}

impl UniformMacros {
    fn new(array: &UniformArray) -> Self {
        let upper = array.type_name.to_uppercase();
        UniformMacros {
            name: format!("{}_UNIFORM_NAME", upper),
            count: format!("{}_UNIFORM_COUNT", upper),
            array: format!("{}Uniforms", array.type_name),
        }
    }
}

fn uniform_arrays(lines: &mut Vec<String>, shader: &ShaderDefinition, debug: bool) {
    let mut locations = vec![];

    for array in &shader.uniform_arrays {
        let macros = UniformMacros::new(array);

        lines.push(format!(
            "#define {} \"{}\"",
            macros.name,
            array.shader_name()
        ));
        lines.push(format!("#define {} {}", macros.count, array.count()));
        lines.push(format!(
            "static {} {}[{}];",
            host_type(&array.type_name),
            macros.array,
            macros.count
        ));

        for (index, variable) in array.variables.iter().enumerate() {
            lines.push(format!(
                "#define uniform{} {}[{}]",
                pascal_case(&variable.name),
                macros.array,
                index
            ));
        }
        lines.push(String::new());

        locations.push(format!(
            "std::cout << \"{} \"{}\": \" << glGetUniformLocation(PROGRAM, {}) << std::endl; \\",
            array.type_name, macros.name, macros.name
        ));
        for index in 0..array.count() {
            locations.push(format!(
                "std::cout << \"  {} \"{}\"[{}]: \" << glGetUniformLocation(PROGRAM, {}\"[{}]\") << std::endl; \\",
                array.type_name, macros.name, index, macros.name, index
            ));
        }
    }

    if debug {
        lines.push("#define DEBUG_DISPLAY_UNIFORM_LOCATIONS(PROGRAM) \\".to_string());
        lines.append(&mut locations);
    } else {
        lines.push("#define DEBUG_DISPLAY_UNIFORM_LOCATIONS(PROGRAM)".to_string());
    }
    lines.push(String::new());
}

fn code_literal(lines: &mut Vec<String>, define: &str, variable: &str, code: &str) {
    lines.push(format!("#define {}", define));
    lines.push(format!("static const char *{} = {};", variable, c_stringify(code)));
    lines.push(String::new());
}

fn shader_sources(lines: &mut Vec<String>, shader: &ShaderDefinition) {
    let parts = ProgramParts::new(shader);

    if let Some(prolog) = &parts.prolog {
        code_literal(lines, "HAS_SHADER_PROLOG_CODE", "shaderPrologCode", prolog);
    }
    if !parts.interfaces.vertex.is_empty() {
        code_literal(
            lines,
            "HAS_SHADER_VERTEX_SPECIFIC_CODE",
            "shaderVertexSpecificCode",
            &parts.interfaces.vertex,
        );
    }
    if !parts.interfaces.fragment.is_empty() {
        code_literal(
            lines,
            "HAS_SHADER_FRAGMENT_SPECIFIC_CODE",
            "shaderFragmentSpecificCode",
            &parts.interfaces.fragment,
        );
    }
    code_literal(lines, "HAS_SHADER_COMMON_CODE", "shaderCommonCode", &parts.common);

    lines.push(format!("#define PASS_COUNT {}", shader.passes.len()));
    lines.push("static const char *shaderPassCodes[] = {".to_string());
    for (index, pass) in shader.passes.iter().enumerate() {
        if pass.is_empty() {
            log::warn!("pass {} defines no shader stage", index);
        }
        for stage in Stage::ALL {
            match pass.code(stage) {
                Some(code) => {
                    lines.push(format!(
                        "#define HAS_SHADER_PASS_{}_{}_CODE",
                        index,
                        stage.uppercase()
                    ));
                    lines.push(format!("{},", c_stringify(code)));
                }
                None => lines.push("nullptr,".to_string()),
            }
        }
    }
    lines.push("};".to_string());
    lines.push(String::new());
}

fn forced_resolution(lines: &mut Vec<String>, width: &str, height: &str) {
    lines.push("#define FORCE_RESOLUTION".to_string());
    lines.push(format!(
        "static const constexpr int resolutionWidth = {};",
        width
    ));
    lines.push(format!(
        "static const constexpr int resolutionHeight = {};",
        height
    ));
}

fn display_settings(lines: &mut Vec<String>, context: &Context) -> Result<()> {
    let config = &context.config;
    let capture = config.is_enabled("capture");

    if capture {
        config.required(&["capture:fps", "capture:width", "capture:height"])?;
        lines.push("#define CAPTURE".to_string());
        lines.push(format!(
            "#define CAPTURE_FPS {}",
            required_value(context, "capture:fps")?
        ));
        forced_resolution(
            lines,
            &required_value(context, "capture:width")?,
            &required_value(context, "capture:height")?,
        );
    } else {
        lines.push("static void captureFrame() {}".to_string());

        let width = config.get_i64("demo:resolution:width")?.unwrap_or(0);
        let height = config.get_i64("demo:resolution:height")?.unwrap_or(0);
        if width > 0 && height > 0 {
            forced_resolution(lines, &width.to_string(), &height.to_string());
        }

        if let Some(scale) = config.get_f64("demo:resolution:scale")? {
            if scale > 0.0 && scale != 1.0 {
                lines.push(format!("#define SCALE_RESOLUTION {}", scale));
            }
        }
    }
    lines.push(String::new());

    let duration = config
        .get("demo:duration")
        .filter(|value| value.is_truthy())
        .map(|value| value.to_string());
    if let Some(duration) = &duration {
        lines.push(format!("#define DURATION {}", duration));
        lines.push(String::new());
    }

    if duration.is_some() || capture || config.get_bool("demo:closeWhenFinished") {
        lines.push("#define CLOSE_WHEN_FINISHED".to_string());
        lines.push(String::new());
    }

    if config.get_bool("demo:loadingBlackScreen") {
        lines.push("#define LOADING_BLACK_SCREEN".to_string());
        lines.push(String::new());
    }

    Ok(())
}

impl GenerateSources for DemoData<'_> {
    fn file_name(&self) -> &'static str {
        FILE_NAME
    }

    fn render(&self, context: &Context) -> Result<String> {
        self.shader.check_uniform_arrays()?;

        let config = &context.config;
        let mut lines = vec!["#pragma once".to_string(), String::new()];

        if config.get_str("demo:audio-synthesizer:tool")?.as_deref() == Some("shader") {
            lines.push("#include \"audio-shader.cpp\"".to_string());
            lines.push("#define AUDIO_TEXTURE".to_string());
            lines.push(String::new());
        }

        if context.mode().is_debug() {
            lines.push("#define DEBUG".to_string());
            lines.push(String::new());

            if config.is_enabled("server") {
                lines.push("#define SERVER".to_string());
                lines.push(format!(
                    "#define SERVER_PORT {}",
                    required_value(context, "server:port")?
                ));
                lines.push(String::new());
            }
        }

        uniform_arrays(&mut lines, self.shader, context.mode().is_debug());
        shader_sources(&mut lines, self.shader);
        display_settings(&mut lines, context)?;

        for hook in &self.hooks {
            lines.push(format!("#define {}", hook_macro(hook)));
        }

        Ok(lines.join("\n"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assemble::tests::sample_definition;
    use crate::codegen::tests::c_unstringify;
    use crate::config::Config;
    use crate::context::BuildMode;

    fn render(config: Config, mode: BuildMode, hooks: &[&str]) -> String {
        let shader = sample_definition();
        let data = DemoData::new(&shader, hooks.iter().map(|it| it.to_string()));
        data.render(&Context::with_mode(config, mode)).unwrap()
    }

    fn literal_after<'t>(text: &'t str, declaration: &str) -> &'t str {
        let start = text.find(declaration).unwrap() + declaration.len();
        let end = start + text[start..].find("\";\n").unwrap() + 1;
        &text[start..end]
    }

    #[test]
    fn uniform_macros() {
        let text = render(Config::new(), BuildMode::Release, &[]);

        assert!(text.contains("#define FLOAT_UNIFORM_NAME \"f\"\n#define FLOAT_UNIFORM_COUNT 2\nstatic float floatUniforms[FLOAT_UNIFORM_COUNT];"));
        assert!(text.contains("#define uniformTime floatUniforms[0]"));
        assert!(text.contains("#define uniformTimeOffset floatUniforms[1]"));
        assert!(text.contains("#define SAMPLER2D_UNIFORM_NAME \"sampler2DUniforms\""));
        assert!(text.contains("static int sampler2DUniforms[SAMPLER2D_UNIFORM_COUNT];"));
        assert!(text.contains("#define uniformNoise sampler2DUniforms[0]"));
        assert!(text.contains("#define DEBUG_DISPLAY_UNIFORM_LOCATIONS(PROGRAM)\n"));
        assert!(!text.contains("std::cout"));
        assert!(!text.contains("#define DEBUG\n"));
    }

    #[test]
    fn debug_lists_uniform_locations() {
        let mut config = Config::new();
        config.set("server:port", 3000);
        let text = render(config, BuildMode::Debug, &[]);

        assert!(text.contains("#define DEBUG\n"));
        assert!(text.contains("#define SERVER\n#define SERVER_PORT 3000\n"));
        assert!(text.contains("#define DEBUG_DISPLAY_UNIFORM_LOCATIONS(PROGRAM) \\\n"));
        assert_eq!(text.matches("glGetUniformLocation").count(), 5);
        assert!(text.contains(
            "std::cout << \"  float \"FLOAT_UNIFORM_NAME\"[1]: \" << glGetUniformLocation(PROGRAM, FLOAT_UNIFORM_NAME\"[1]\") << std::endl; \\\n"
        ));
    }

    #[test]
    fn shader_literals_round_trip() {
        let text = render(Config::new(), BuildMode::Release, &[]);
        let parts = ProgramParts::new(&sample_definition());

        assert!(text.contains("#define HAS_SHADER_PROLOG_CODE\n"));
        assert_eq!(
            c_unstringify(literal_after(&text, "static const char *shaderPrologCode = ")),
            "#version 450"
        );
        assert_eq!(
            c_unstringify(literal_after(&text, "static const char *shaderVertexSpecificCode = ")),
            "in vec2 position;\nout vec2 uv;\n"
        );
        assert_eq!(
            c_unstringify(literal_after(&text, "static const char *shaderCommonCode = ")),
            parts.common
        );
    }

    #[test]
    fn pass_table_marks_missing_stages() {
        let mut shader = sample_definition();
        shader.passes[0].vertex_code = None;
        let data = DemoData::new(&shader, vec![]);
        let text = data
            .render(&Context::with_mode(Config::new(), BuildMode::Release))
            .unwrap();

        assert!(text.contains("#define PASS_COUNT 1\nstatic const char *shaderPassCodes[] = {\nnullptr,\n#define HAS_SHADER_PASS_0_FRAGMENT_CODE\n\"void main() { color = vec4(uv, 0., 1.); }\",\n};"));
        assert!(!text.contains("HAS_SHADER_PASS_0_VERTEX_CODE"));
    }

    #[test]
    fn capture_forces_resolution_and_closing() {
        let mut config = Config::new();
        config
            .set("capture:fps", 60)
            .set("capture:width", 1920)
            .set("capture:height", 1080)
            .set("demo:resolution:scale", 0.5);
        let text = render(config, BuildMode::Release, &[]);

        assert!(text.contains("#define CAPTURE\n#define CAPTURE_FPS 60\n#define FORCE_RESOLUTION\nstatic const constexpr int resolutionWidth = 1920;\nstatic const constexpr int resolutionHeight = 1080;"));
        assert!(!text.contains("captureFrame"));
        assert!(!text.contains("SCALE_RESOLUTION"));
        assert!(text.contains("#define CLOSE_WHEN_FINISHED"));
    }

    #[test]
    fn windowed_settings() {
        let mut config = Config::new();
        config
            .set("demo:resolution:width", 0)
            .set("demo:resolution:height", 720)
            .set("demo:resolution:scale", 0.5)
            .set("demo:duration", 150)
            .set("demo:loadingBlackScreen", true)
            .set("demo:audio-synthesizer:tool", "shader");
        let text = render(config, BuildMode::Release, &["render", "initialization"]);

        assert!(text.starts_with("#pragma once\n\n#include \"audio-shader.cpp\"\n#define AUDIO_TEXTURE\n"));
        assert!(text.contains("static void captureFrame() {}"));
        assert!(!text.contains("FORCE_RESOLUTION"));
        assert!(text.contains("#define SCALE_RESOLUTION 0.5"));
        assert!(text.contains("#define DURATION 150\n\n#define CLOSE_WHEN_FINISHED"));
        assert!(text.contains("#define LOADING_BLACK_SCREEN"));
        assert!(text.ends_with("#define HAS_HOOK_RENDER\n#define HAS_HOOK_INITIALIZATION"));
    }

    #[test]
    fn capture_without_settings_fails() {
        let mut config = Config::new();
        config.set("capture", true);
        let shader = sample_definition();
        let result = DemoData::new(&shader, vec![])
            .render(&Context::with_mode(config, BuildMode::Release));
        assert!(matches!(result, Err(Error::MissingConfig(keys)) if keys.len() == 3));
    }

    #[test]
    fn hook_names_become_valid_macros() {
        let text = render(Config::new(), BuildMode::Release, &["post-process", "render2"]);
        assert!(text.ends_with("#define HAS_HOOK_POST_PROCESS\n#define HAS_HOOK_RENDER2"));
    }

    #[test]
    fn duplicate_uniform_types_are_rejected() {
        let mut shader = sample_definition();
        let again = shader.uniform_arrays[0].clone();
        shader.uniform_arrays.push(again);

        let result = DemoData::new(&shader, vec![])
            .render(&Context::with_mode(Config::new(), BuildMode::Release));
        assert!(matches!(result, Err(Error::DuplicateUniformArray(name)) if name == "float"));
    }
}
