use crate::compile::CompilationSpec;
use crate::context::Context;
use crate::error::{Error, Result};
use crate::preprocess::flatten;
use crate::shader::ShaderDefinition;
use crate::util::normalize_path;
use serde::{Deserialize, Serialize};
use serde_yaml::Value;
use std::path::Path;

pub const MANIFEST_NAME: &str = "demo-definition.yml";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DemoDefinition {
    #[serde(default)]
    pub shader: ShaderDefinition,
    #[serde(default)]
    pub compilation: CompilationSpec,
}

fn file_reference(value: &Value) -> Option<&str> {
    match value {
        Value::Mapping(mapping) if mapping.len() == 1 => {
            mapping.get("file").and_then(Value::as_str)
        }
        _ => None,
    }
}

/// Only code fields (`commonCode`, `fragmentCode`, ...) may reference files.
fn is_code_field(key: &Value) -> bool {
    key.as_str().map_or(false, |key| key.ends_with("Code"))
}

fn resolve_files(value: &mut Value, base: &Path) -> Result<()> {
    match value {
        Value::Mapping(mapping) => {
            for (key, child) in mapping.iter_mut() {
                let reference = if is_code_field(key) {
                    file_reference(child).map(str::to_string)
                } else {
                    None
                };

                match reference {
                    Some(file) => {
                        let path = normalize_path(base.join(file));
                        log::debug!("Loading code from {}", path.display());
                        *child = Value::String(flatten(&path)?);
                    }
                    None => resolve_files(child, base)?,
                }
            }
        }
        Value::Sequence(values) => {
            for child in values.iter_mut() {
                resolve_files(child, base)?;
            }
        }
        _ => {}
    }
    Ok(())
}

impl DemoDefinition {
    /// Parses a manifest, resolving `{ file: <path> }` code fields against
    /// `base` through the include flattener.
    pub fn from_yaml(text: &str, base: impl AsRef<Path>) -> Result<DemoDefinition> {
        let mut document: Value = serde_yaml::from_str(text)?;
        resolve_files(&mut document, base.as_ref())?;
        Ok(serde_yaml::from_value(document)?)
    }

    pub fn load_from_file(path: impl AsRef<Path>, base: impl AsRef<Path>) -> Result<DemoDefinition> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|err| Error::file(path, err))?;
        DemoDefinition::from_yaml(&text, base)
    }

    /// Loads `demo-definition.yml` from the demo directory.
    pub fn load(context: &Context) -> Result<DemoDefinition> {
        let demo_dir = context.demo_dir()?;
        DemoDefinition::load_from_file(demo_dir.join(MANIFEST_NAME), &demo_dir)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::shader::{Stage, VariableKind};

    const MANIFEST: &str = r##"
shader:
  prologCode: "#version 450"
  commonCode:
    file: shaders/common.glsl
  uniformArrays:
    - type: float
      name: floatUniforms
      minifiedName: f
      variables:
        - name: time
          type: float
          kind: uniform
  variables:
    - name: time
      type: float
      kind: uniform
    - name: camera
      type: vec3
      kind: variable
  passes:
    - fragmentCode:
        file: shaders/pass0.frag
compilation:
  asm:
    nasmArgs: [-O2]
    sources:
      - output: build/audio.obj
        source: audio.asm
  cpp:
    clArgs: [/nologo]
    sources:
      - output: build/main.obj
        source: build/main.cpp
        includes: [engine]
    hooks:
      render: "draw();"
  linkArgs: [/SUBSYSTEM:WINDOWS]
"##;

    #[test]
    fn file_references_are_flattened() {
        let root = std::env::temp_dir().join("demo-starch-manifest");
        let shaders = root.join("shaders");
        std::fs::create_dir_all(&shaders).unwrap();
        std::fs::write(shaders.join("noise.glsl"), "float noise() { return 0.; }\n").unwrap();
        std::fs::write(
            shaders.join("common.glsl"),
            "#include \"noise.glsl\"\nfloat hash() { return 1.; }\n",
        )
        .unwrap();
        std::fs::write(shaders.join("pass0.frag"), "void main() {}\n").unwrap();
        std::fs::write(root.join(MANIFEST_NAME), MANIFEST).unwrap();

        let mut config = Config::new();
        config.set("directory", root.clone());
        let demo = DemoDefinition::load(&Context::new(config)).unwrap();

        assert_eq!(
            demo.shader.common_code,
            "float noise() { return 0.; }\n\nfloat hash() { return 1.; }\n"
        );
        assert_eq!(demo.shader.passes[0].code(Stage::Fragment), Some("void main() {}\n"));
        assert!(demo.shader.passes[0].code(Stage::Vertex).is_none());
        assert_eq!(demo.shader.uniform_arrays[0].shader_name(), "f");
        assert_eq!(demo.shader.variables[1].kind, VariableKind::Global);

        assert_eq!(demo.compilation.asm.sources[0].output, "build/audio.obj");
        assert_eq!(demo.compilation.cpp.sources[0].includes, vec!["engine"]);
        assert_eq!(demo.compilation.cpp.hooks["render"], "draw();");
        assert!(demo.compilation.crinkler_args.is_empty());

        std::fs::remove_dir_all(&root).unwrap();
    }

    #[test]
    fn missing_referenced_file() {
        let result = DemoDefinition::from_yaml(
            "shader:\n  commonCode:\n    file: nowhere.glsl\n",
            std::env::temp_dir().join("demo-starch-manifest-missing"),
        );
        assert!(matches!(result, Err(Error::File { .. })));
    }

    #[test]
    fn malformed_yaml() {
        let result = DemoDefinition::from_yaml("shader: [", ".");
        assert!(matches!(result, Err(Error::Yaml(_))));
    }

    #[test]
    fn file_key_outside_code_fields_is_data() {
        let demo = DemoDefinition::from_yaml(
            "compilation:\n  cpp:\n    hooks:\n      file: \"draw();\"\n",
            std::env::temp_dir().join("demo-starch-manifest-hooks"),
        )
        .unwrap();
        assert_eq!(demo.compilation.cpp.hooks["file"], "draw();");
    }

    #[test]
    fn uniform_arrays_keyed_by_type() {
        let demo = DemoDefinition::from_yaml(
            "shader:\n  uniformArrays:\n    float:\n      name: floatUniforms\n      variables: [{ name: time, type: float, kind: uniform }]\n    vec3:\n      name: vec3Uniforms\n",
            ".",
        )
        .unwrap();

        let arrays = &demo.shader.uniform_arrays;
        assert_eq!(arrays.len(), 2);
        assert_eq!(arrays[0].type_name, "float");
        assert_eq!(arrays[0].count(), 1);
        assert_eq!(arrays[1].type_name, "vec3");
    }

    #[test]
    fn repeated_uniform_type_is_rejected() {
        let mapping = DemoDefinition::from_yaml(
            "shader:\n  uniformArrays:\n    float: { name: a }\n    float: { name: b }\n",
            ".",
        );
        assert!(matches!(mapping, Err(Error::Yaml(_))));

        let list = DemoDefinition::from_yaml(
            "shader:\n  uniformArrays:\n    - { type: float, name: a }\n    - { type: float, name: b }\n",
            ".",
        );
        assert!(matches!(list, Err(Error::Yaml(_))));
    }
}
