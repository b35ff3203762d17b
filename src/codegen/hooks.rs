use crate::codegen::GenerateSources;
use crate::context::Context;
use crate::error::{Error, Result};
use crate::util::display_path;
use regex::{Captures, Regex};
use std::collections::BTreeMap;
use std::path::PathBuf;

pub const FILE_NAME: &str = "main.cpp";
pub const TEMPLATE_NAME: &str = "main-template.cpp";

lazy_static::lazy_static! {
    /// `/*hook:<name>*/` placeholder left in the main template.
    pub static ref HOOK_PLACEHOLDER: Regex = Regex::new(r"/\*hook:(\w+)\*/").unwrap();
}

/// Replaces every placeholder with the hook of the same name; placeholders
/// without a hook are removed.
pub fn inject_hooks(template: &str, hooks: &BTreeMap<String, String>) -> String {
    HOOK_PLACEHOLDER
        .replace_all(template, |captures: &Captures| {
            let name = &captures[1];
            match hooks.get(name) {
                Some(code) => code.clone(),
                None => {
                    log::debug!("no hook '{}', placeholder removed", name);
                    String::new()
                }
            }
        })
        .into_owned()
}

/// `main.cpp` generated from the engine's main template.
#[derive(Debug, Clone)]
pub struct MainTemplate<'a> {
    pub hooks: &'a BTreeMap<String, String>,
}

impl<'a> MainTemplate<'a> {
    pub fn new(hooks: &'a BTreeMap<String, String>) -> Self {
        MainTemplate { hooks }
    }

    pub fn template_path(context: &Context) -> Result<PathBuf> {
        Ok(context.engine_dir()?.join(TEMPLATE_NAME))
    }
}

impl GenerateSources for MainTemplate<'_> {
    fn file_name(&self) -> &'static str {
        FILE_NAME
    }

    fn render(&self, context: &Context) -> Result<String> {
        let path = MainTemplate::template_path(context)?;
        let template = std::fs::read_to_string(&path).map_err(|err| Error::file(&path, err))?;

        for name in self.hooks.keys() {
            if !template.contains(&format!("/*hook:{}*/", name)) {
                log::warn!(
                    "hook '{}' has no placeholder in {}",
                    name,
                    display_path(&path)
                );
            }
        }

        Ok(inject_hooks(&template, self.hooks))
    }
}
