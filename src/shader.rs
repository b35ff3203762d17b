use crate::error::{Error, Result};
#[cfg(feature = "config-file")]
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Ord, PartialOrd)]
#[cfg_attr(
    feature = "config-file",
    derive(Serialize, Deserialize),
    serde(rename_all = "lowercase")
)]
pub enum Stage {
    Vertex,
    Fragment,
}

impl Stage {
    pub const ALL: [Stage; 2] = [Stage::Vertex, Stage::Fragment];

    pub fn name(&self) -> &'static str {
        match self {
            Stage::Vertex => "vertex",
            Stage::Fragment => "fragment",
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            Stage::Vertex => "vert",
            Stage::Fragment => "frag",
        }
    }

    pub fn uppercase(&self) -> &'static str {
        match self {
            Stage::Vertex => "VERTEX",
            Stage::Fragment => "FRAGMENT",
        }
    }
}

impl Display for Stage {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, Eq, PartialEq)]
#[cfg_attr(
    feature = "config-file",
    derive(Serialize, Deserialize),
    serde(rename_all = "lowercase")
)]
pub enum VariableKind {
    Uniform,
    Const,
    #[cfg_attr(feature = "config-file", serde(other))]
    Global,
}

impl Default for VariableKind {
    fn default() -> Self {
        VariableKind::Global
    }
}

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "config-file", derive(Serialize, Deserialize))]
pub struct Variable {
    pub name: String,
    #[cfg_attr(feature = "config-file", serde(rename = "type", default))]
    pub type_name: String,
    #[cfg_attr(feature = "config-file", serde(default))]
    pub kind: VariableKind,
    #[cfg_attr(feature = "config-file", serde(default = "active_default"))]
    pub active: bool,
}

#[cfg(feature = "config-file")]
fn active_default() -> bool {
    true
}

impl Variable {
    pub fn new(name: impl Into<String>, type_name: impl Into<String>, kind: VariableKind) -> Self {
        Variable {
            name: name.into(),
            type_name: type_name.into(),
            kind,
            active: true,
        }
    }

    /// Plain shader globals; uniforms live in their [`UniformArray`].
    pub fn is_global(&self) -> bool {
        self.active && self.kind != VariableKind::Uniform
    }
}

/// Fixed-size uniform array standing in for individually named uniforms of
/// one GL type.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(
    feature = "config-file",
    derive(Serialize, Deserialize),
    serde(rename_all = "camelCase")
)]
pub struct UniformArray {
    #[cfg_attr(feature = "config-file", serde(rename = "type"))]
    pub type_name: String,
    pub name: String,
    #[cfg_attr(feature = "config-file", serde(default))]
    pub minified_name: Option<String>,
    #[cfg_attr(feature = "config-file", serde(default))]
    pub variables: Vec<Variable>,
}

impl UniformArray {
    /// Name the array has in the shipped shader source.
    pub fn shader_name(&self) -> &str {
        self.minified_name.as_deref().unwrap_or(&self.name)
    }

    pub fn count(&self) -> usize {
        self.variables.len()
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(
    feature = "config-file",
    derive(Serialize, Deserialize),
    serde(rename_all = "camelCase")
)]
pub struct Pass {
    #[cfg_attr(feature = "config-file", serde(default))]
    pub vertex_code: Option<String>,
    #[cfg_attr(feature = "config-file", serde(default))]
    pub fragment_code: Option<String>,
}

impl Pass {
    pub fn code(&self, stage: Stage) -> Option<&str> {
        match stage {
            Stage::Vertex => self.vertex_code.as_deref(),
            Stage::Fragment => self.fragment_code.as_deref(),
        }
        .filter(|code| !code.is_empty())
    }

    /// Stages this pass defines code for, vertex first.
    pub fn stages(&self) -> impl Iterator<Item = Stage> + '_ {
        Stage::ALL
            .into_iter()
            .filter(move |&stage| self.code(stage).is_some())
    }

    pub fn is_empty(&self) -> bool {
        self.stages().next().is_none()
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(
    feature = "config-file",
    derive(Serialize, Deserialize),
    serde(rename_all = "camelCase")
)]
pub struct ShaderDefinition {
    #[cfg_attr(feature = "config-file", serde(default))]
    pub prolog_code: Option<String>,
    #[cfg_attr(feature = "config-file", serde(default))]
    pub common_code: String,
    #[cfg_attr(feature = "config-file", serde(default))]
    pub attributes_code: Option<String>,
    #[cfg_attr(feature = "config-file", serde(default))]
    pub varyings_code: Option<String>,
    #[cfg_attr(feature = "config-file", serde(default))]
    pub outputs_code: Option<String>,
    /// Keyed by GL type name, in declaration order. Written as a mapping
    /// from type name to array in manifests.
    #[cfg_attr(feature = "config-file", serde(default, with = "uniform_array_map"))]
    pub uniform_arrays: Vec<UniformArray>,
    #[cfg_attr(feature = "config-file", serde(default))]
    pub variables: Vec<Variable>,
    #[cfg_attr(feature = "config-file", serde(default))]
    pub passes: Vec<Pass>,
}

/// `uniformArrays` as a mapping from GL type name to array. The list form
/// with an explicit `type` per entry is read too; either way a type may only
/// appear once.
#[cfg(feature = "config-file")]
mod uniform_array_map {
    use super::{UniformArray, Variable};
    use serde::de::{Error as _, MapAccess, SeqAccess, Visitor};
    use serde::ser::SerializeMap;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::fmt::Formatter;

    #[derive(Serialize, Deserialize)]
    #[serde(rename_all = "camelCase")]
    struct Entry {
        name: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        minified_name: Option<String>,
        #[serde(default)]
        variables: Vec<Variable>,
    }

    pub fn serialize<S: Serializer>(arrays: &[UniformArray], serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(arrays.len()))?;
        for array in arrays {
            let entry = Entry {
                name: array.name.clone(),
                minified_name: array.minified_name.clone(),
                variables: array.variables.clone(),
            };
            map.serialize_entry(&array.type_name, &entry)?;
        }
        map.end()
    }

    fn push_unique(arrays: &mut Vec<UniformArray>, array: UniformArray) -> Result<(), String> {
        if arrays.iter().any(|it| it.type_name == array.type_name) {
            return Err(format!(
                "uniform array type {} is declared more than once",
                array.type_name
            ));
        }
        arrays.push(array);
        Ok(())
    }

    struct ArraysVisitor;

    impl<'de> Visitor<'de> for ArraysVisitor {
        type Value = Vec<UniformArray>;

        fn expecting(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
            f.write_str("a mapping from GL type to uniform array")
        }

        fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Self::Value, A::Error> {
            let mut result = vec![];
            while let Some((type_name, entry)) = map.next_entry::<String, Entry>()? {
                let array = UniformArray {
                    type_name,
                    name: entry.name,
                    minified_name: entry.minified_name,
                    variables: entry.variables,
                };
                push_unique(&mut result, array).map_err(A::Error::custom)?;
            }
            Ok(result)
        }

        fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<Self::Value, A::Error> {
            let mut result = vec![];
            while let Some(array) = seq.next_element::<UniformArray>()? {
                push_unique(&mut result, array).map_err(A::Error::custom)?;
            }
            Ok(result)
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<UniformArray>, D::Error> {
        deserializer.deserialize_any(ArraysVisitor)
    }
}

fn non_empty(code: &Option<String>) -> Option<&str> {
    code.as_deref().filter(|code| !code.trim().is_empty())
}

impl ShaderDefinition {
    pub fn prolog(&self) -> Option<&str> {
        non_empty(&self.prolog_code)
    }

    pub fn attributes(&self) -> Option<&str> {
        non_empty(&self.attributes_code)
    }

    pub fn varyings(&self) -> Option<&str> {
        non_empty(&self.varyings_code)
    }

    pub fn outputs(&self) -> Option<&str> {
        non_empty(&self.outputs_code)
    }

    pub fn uniform_array(&self, type_name: &str) -> Option<&UniformArray> {
        self.uniform_arrays
            .iter()
            .find(|array| array.type_name == type_name)
    }

    /// Appends `array`; each GL type owns at most one array.
    pub fn add_uniform_array(&mut self, array: UniformArray) -> Result<()> {
        if self.uniform_array(&array.type_name).is_some() {
            return Err(Error::DuplicateUniformArray(array.type_name));
        }
        self.uniform_arrays.push(array);
        Ok(())
    }

    /// Fails on the first GL type declared by more than one array.
    pub fn check_uniform_arrays(&self) -> Result<()> {
        for array in &self.uniform_arrays {
            let first = self.uniform_array(&array.type_name);
            if !first.map_or(false, |first| std::ptr::eq(first, array)) {
                return Err(Error::DuplicateUniformArray(array.type_name.clone()));
            }
        }
        Ok(())
    }

    pub fn globals(&self) -> impl Iterator<Item = &Variable> {
        self.variables.iter().filter(|variable| variable.is_global())
    }

    pub fn pass(&self, index: usize) -> Option<&Pass> {
        self.passes.get(index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn globals_skip_uniforms_and_inactive() {
        let mut inactive = Variable::new("unused", "float", VariableKind::Global);
        inactive.active = false;

        let definition = ShaderDefinition {
            variables: vec![
                Variable::new("time", "float", VariableKind::Uniform),
                Variable::new("color", "vec3", VariableKind::Global),
                inactive,
                Variable::new("PI", "float", VariableKind::Const),
            ],
            ..Default::default()
        };

        let names: Vec<&str> = definition.globals().map(|v| v.name.as_str()).collect();
        assert_eq!(names, vec!["color", "PI"]);
    }

    #[test]
    fn pass_stages() {
        let pass = Pass {
            vertex_code: Some(String::new()),
            fragment_code: Some("void main() {}".to_string()),
        };
        assert_eq!(pass.stages().collect::<Vec<_>>(), vec![Stage::Fragment]);
        assert!(pass.code(Stage::Vertex).is_none());
        assert!(Pass::default().is_empty());
    }

    #[test]
    fn minified_name_wins() {
        let mut array = UniformArray {
            type_name: "float".to_string(),
            name: "floatUniforms".to_string(),
            minified_name: None,
            variables: vec![],
        };
        assert_eq!(array.shader_name(), "floatUniforms");
        array.minified_name = Some("f".to_string());
        assert_eq!(array.shader_name(), "f");
    }

    fn float_array(name: &str) -> UniformArray {
        UniformArray {
            type_name: "float".to_string(),
            name: name.to_string(),
            minified_name: None,
            variables: vec![Variable::new("time", "float", VariableKind::Uniform)],
        }
    }

    #[test]
    fn one_array_per_type() {
        let mut definition = ShaderDefinition::default();
        definition.add_uniform_array(float_array("floatUniforms")).unwrap();
        assert!(definition.check_uniform_arrays().is_ok());
        assert_eq!(definition.uniform_array("float").unwrap().name, "floatUniforms");

        let result = definition.add_uniform_array(float_array("other"));
        assert!(matches!(result, Err(Error::DuplicateUniformArray(name)) if name == "float"));
        assert_eq!(definition.uniform_arrays.len(), 1);

        definition.uniform_arrays.push(float_array("other"));
        assert!(definition.check_uniform_arrays().is_err());
    }

    #[cfg(feature = "config-file")]
    #[test]
    fn uniform_arrays_read_as_mapping() {
        let definition: ShaderDefinition = serde_yaml::from_str(
            r#"
uniformArrays:
  float:
    name: floatUniforms
    minifiedName: f
    variables:
      - { name: time, type: float, kind: uniform }
  sampler2D:
    name: sampler2DUniforms
"#,
        )
        .unwrap();

        let types: Vec<&str> = definition
            .uniform_arrays
            .iter()
            .map(|it| it.type_name.as_str())
            .collect();
        assert_eq!(types, vec!["float", "sampler2D"]);
        assert_eq!(definition.uniform_array("float").unwrap().shader_name(), "f");

        let text = serde_yaml::to_string(&definition).unwrap();
        let again: ShaderDefinition = serde_yaml::from_str(&text).unwrap();
        assert_eq!(again.uniform_arrays, definition.uniform_arrays);
    }

    #[cfg(feature = "config-file")]
    #[test]
    fn uniform_array_list_rejects_repeated_type() {
        let result = serde_yaml::from_str::<ShaderDefinition>(
            r#"
uniformArrays:
  - { type: float, name: a }
  - { type: float, name: b }
"#,
        );
        let err = result.unwrap_err().to_string();
        assert!(err.contains("uniform array type float is declared more than once"), "{}", err);
    }
}
