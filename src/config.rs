use crate::error::{Error, Result};
use std::collections::BTreeMap;
use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Bool(bool),
    Integer(i64),
    Float(f64),
    String(String),
    List(Vec<Value>),
}

impl Value {
    /// Truthiness as the demo configuration files have always used it.
    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Bool(value) => *value,
            Value::Integer(value) => *value != 0,
            Value::Float(value) => *value != 0.0 && !value.is_nan(),
            Value::String(value) => !value.is_empty(),
            Value::List(_) => true,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(value) => Some(value),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Integer(value) => Some(*value as f64),
            Value::Float(value) => Some(*value),
            Value::String(value) => value.parse().ok(),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Integer(value) => Some(*value),
            Value::Float(value) if value.fract() == 0.0 => Some(*value as i64),
            Value::String(value) => value.parse().ok(),
            _ => None,
        }
    }
}

impl Display for Value {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Value::Bool(value) => Display::fmt(value, f),
            Value::Integer(value) => Display::fmt(value, f),
            Value::Float(value) => Display::fmt(value, f),
            Value::String(value) => f.write_str(value),
            Value::List(values) => {
                let parts: Vec<String> = values.iter().map(|it| it.to_string()).collect();
                f.write_str(&parts.join(","))
            }
        }
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Bool(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Integer(value)
    }
}

impl From<i32> for Value {
    fn from(value: i32) -> Self {
        Value::Integer(value as i64)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Float(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::String(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::String(value)
    }
}

impl From<PathBuf> for Value {
    fn from(value: PathBuf) -> Self {
        Value::String(value.display().to_string())
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(values: Vec<T>) -> Self {
        Value::List(values.into_iter().map(Into::into).collect())
    }
}

/// Resolved key/value build configuration.
///
/// Keys are paths separated with `:` or `.`, so `demo.resolution.width` and
/// `demo:resolution:width` name the same entry.
#[derive(Debug, Clone, Default)]
pub struct Config {
    values: BTreeMap<String, Value>,
}

fn normalize_key(key: &str) -> String {
    key.replace('.', ":")
}

macro_rules! env_field {
    ($config: ident, $key: literal, $env_var: literal) => {
        if let Ok(value) = std::env::var($env_var) {
            $config.set($key, value);
        }
    };
}

macro_rules! default_field {
    ($config: ident, $key: literal, $default: expr) => {
        if !$config.contains($key) {
            $config.set($key, $default);
        }
    };
}

impl Config {
    pub fn new() -> Config {
        Config::default()
    }

    /// Builds the configuration of the demo rooted at `root`.
    ///
    /// `demo.yml` values come first, environment variables win over them and
    /// defaults fill whatever is still missing.
    pub fn init(root: impl AsRef<Path>) -> Result<Config> {
        #[cfg(feature = "config-file")]
        let local: Option<Config> = Config::load_from_file(root.as_ref().join("demo.yml"))?;
        #[cfg(not(feature = "config-file"))]
        let local: Option<Config> = None;

        let mut result = local.unwrap_or_default();

        env_field!(result, "paths:build", "DEMO_BUILD_DIR");
        env_field!(result, "paths:dist", "DEMO_DIST_DIR");
        env_field!(result, "paths:exe", "DEMO_EXE");
        env_field!(result, "directory", "DEMO_DIRECTORY");

        result.fill_defaults(root);
        Ok(result)
    }

    pub(crate) fn fill_defaults(&mut self, root: impl AsRef<Path>) {
        let root = root.as_ref();
        let config = self;

        default_field!(config, "directory", root.to_path_buf());
        default_field!(config, "paths:build", root.join("build"));
        default_field!(config, "paths:dist", root.join("dist"));
        default_field!(config, "paths:exe", root.join("dist").join("demo.exe"));
        default_field!(config, "paths:engine", PathBuf::from("engine"));
        default_field!(config, "tools:cl", "cl");
        default_field!(config, "tools:link", "link");
    }

    #[cfg(feature = "config-file")]
    pub fn load_from_file(path: impl AsRef<Path>) -> Result<Option<Config>> {
        let path = path.as_ref();

        if !path.exists() || !path.is_file() {
            return Ok(None);
        }

        let text = std::fs::read_to_string(path).map_err(|err| Error::file(path, err))?;
        Config::from_yaml(&text).map(Some)
    }

    #[cfg(feature = "config-file")]
    pub fn from_yaml(text: &str) -> Result<Config> {
        let document: serde_yaml::Value = serde_yaml::from_str(text)?;
        let mut result = Config::new();
        flatten_yaml(&mut result, String::new(), document);
        Ok(result)
    }

    pub fn set(&mut self, key: &str, value: impl Into<Value>) -> &mut Config {
        self.values.insert(normalize_key(key), value.into());
        self
    }

    pub fn contains(&self, key: &str) -> bool {
        self.values.contains_key(&normalize_key(key))
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.values.get(&normalize_key(key))
    }

    /// A present scalar is judged by its own truthiness; a key that only
    /// exists as a section (`server:port` set, `server` not) counts as enabled.
    pub fn is_enabled(&self, key: &str) -> bool {
        let key = normalize_key(key);
        match self.values.get(&key) {
            Some(value) => value.is_truthy(),
            None => {
                let prefix = format!("{}:", key);
                self.values
                    .range(prefix.clone()..)
                    .next()
                    .map(|(k, _)| k.starts_with(&prefix))
                    .unwrap_or(false)
            }
        }
    }

    pub fn get_str(&self, key: &str) -> Result<Option<String>> {
        match self.get(key) {
            None => Ok(None),
            Some(Value::List(_)) => Err(Error::InvalidConfig {
                key: key.to_string(),
                expected: "a string",
            }),
            Some(value) => Ok(Some(value.to_string())),
        }
    }

    pub fn get_bool(&self, key: &str) -> bool {
        self.get(key).map(Value::is_truthy).unwrap_or(false)
    }

    pub fn get_i64(&self, key: &str) -> Result<Option<i64>> {
        self.get(key)
            .map(|value| {
                value.as_i64().ok_or_else(|| Error::InvalidConfig {
                    key: key.to_string(),
                    expected: "an integer",
                })
            })
            .transpose()
    }

    pub fn get_f64(&self, key: &str) -> Result<Option<f64>> {
        self.get(key)
            .map(|value| {
                value.as_f64().ok_or_else(|| Error::InvalidConfig {
                    key: key.to_string(),
                    expected: "a number",
                })
            })
            .transpose()
    }

    /// Lists of scalars; a lone scalar reads as a single element list.
    pub fn get_list(&self, key: &str) -> Vec<String> {
        match self.get(key) {
            None => vec![],
            Some(Value::List(values)) => values.iter().map(|it| it.to_string()).collect(),
            Some(value) => vec![value.to_string()],
        }
    }

    pub fn get_path(&self, key: &str) -> Result<PathBuf> {
        self.get_str(key)?
            .map(PathBuf::from)
            .ok_or_else(|| Error::MissingConfig(vec![key.to_string()]))
    }

    /// Fails with every missing key at once.
    pub fn required(&self, keys: &[&str]) -> Result<()> {
        let missing: Vec<String> = keys
            .iter()
            .filter(|key| !self.contains(key))
            .map(|key| key.to_string())
            .collect();

        if missing.is_empty() {
            Ok(())
        } else {
            Err(Error::MissingConfig(missing))
        }
    }
}

#[cfg(feature = "config-file")]
fn flatten_yaml(config: &mut Config, key: String, value: serde_yaml::Value) {
    use serde_yaml::Value as Yaml;

    fn scalar(value: Yaml) -> Option<Value> {
        Some(match value {
            Yaml::Bool(value) => Value::Bool(value),
            Yaml::Number(number) => match number.as_i64() {
                Some(value) => Value::Integer(value),
                None => Value::Float(number.as_f64()?),
            },
            Yaml::String(value) => Value::String(value),
            Yaml::Sequence(values) => Value::List(values.into_iter().filter_map(scalar).collect()),
            Yaml::Tagged(tagged) => scalar(tagged.value)?,
            Yaml::Null | Yaml::Mapping(_) => return None,
        })
    }

    match value {
        Yaml::Mapping(mapping) => {
            for (name, child) in mapping {
                let name = match name {
                    Yaml::String(name) => name,
                    Yaml::Number(number) => number.to_string(),
                    Yaml::Bool(value) => value.to_string(),
                    _ => {
                        log::warn!("ignoring non-scalar configuration key under '{}'", key);
                        continue;
                    }
                };
                let child_key = if key.is_empty() {
                    normalize_key(&name)
                } else {
                    format!("{}:{}", key, normalize_key(&name))
                };
                flatten_yaml(config, child_key, child);
            }
        }
        other => {
            if let Some(value) = scalar(other) {
                config.values.insert(key, value);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn separators_are_interchangeable() {
        let mut config = Config::new();
        config.set("demo.resolution.width", 1920);

        assert_eq!(config.get_i64("demo:resolution:width").unwrap(), Some(1920));
        assert!(config.contains("demo:resolution.width"));
    }

    #[test]
    fn sections_count_as_enabled() {
        let mut config = Config::new();
        config.set("server:port", 3000).set("capture", false);

        assert!(config.is_enabled("server"));
        assert!(!config.is_enabled("capture"));
        assert!(!config.is_enabled("serv"));
        assert!(!config.is_enabled("debug"));
    }

    #[test]
    fn required_reports_all_missing_keys() {
        let mut config = Config::new();
        config.set("tools:nasm", "nasm");

        match config.required(&["tools:nasm", "tools:crinkler", "tools:glew"]) {
            Err(Error::MissingConfig(keys)) => {
                assert_eq!(keys, vec!["tools:crinkler", "tools:glew"])
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn lists_and_type_errors() {
        let mut config = Config::new();
        config
            .set("cl:args", vec!["/O1", "/GS-"])
            .set("link:args", "/NOLOGO")
            .set("demo:duration", "soon");

        assert_eq!(config.get_list("cl:args"), vec!["/O1", "/GS-"]);
        assert_eq!(config.get_list("link:args"), vec!["/NOLOGO"]);
        assert!(config.get_list("crinkler:args").is_empty());
        assert!(matches!(
            config.get_f64("demo:duration"),
            Err(Error::InvalidConfig { .. })
        ));
    }

    #[test]
    fn defaults_do_not_override() {
        let mut config = Config::new();
        config.set("paths:build", "out");
        config.fill_defaults("demo");

        assert_eq!(config.get_path("paths:build").unwrap(), PathBuf::from("out"));
        assert_eq!(config.get_str("tools:cl").unwrap().as_deref(), Some("cl"));
        assert_eq!(
            config.get_path("paths:dist").unwrap(),
            PathBuf::from("demo").join("dist")
        );
    }

    #[cfg(feature = "config-file")]
    #[test]
    fn yaml_is_flattened() {
        let config = Config::from_yaml(
            r#"
debug: true
demo:
  resolution:
    width: 1280
    scale: 0.5
  gl:
    functions: [glGenTextures, glBindTexture]
tools:
  glslangValidator: glslangValidator.exe
"#,
        )
        .unwrap();

        assert!(config.get_bool("debug"));
        assert_eq!(config.get_i64("demo:resolution:width").unwrap(), Some(1280));
        assert_eq!(config.get_f64("demo.resolution.scale").unwrap(), Some(0.5));
        assert_eq!(
            config.get_list("demo:gl:functions"),
            vec!["glGenTextures", "glBindTexture"]
        );
        assert!(config.is_enabled("tools"));
    }
}
