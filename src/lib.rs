pub mod assemble;
pub mod build;
pub mod codegen;
pub mod compile;
pub mod config;
pub mod context;
pub mod error;
#[cfg(feature = "config-file")]
pub mod manifest;
pub mod preprocess;
pub mod process;
pub mod shader;
pub(crate) mod util;
pub mod validate;

pub mod prelude {
    pub use super::assemble::{assemble, Selector};
    pub use super::build::{build, generate_sources, BuildReport};
    pub use super::codegen::data::DemoData;
    pub use super::codegen::gl::GlBindings;
    pub use super::codegen::hooks::MainTemplate;
    pub use super::codegen::GenerateSources;
    pub use super::compile::{compile, CompilationSpec};
    pub use super::config::Config as StarchConfig;
    pub use super::context::{BuildMode, Context};
    pub use super::error::{Error, Result};
    #[cfg(feature = "config-file")]
    pub use super::manifest::DemoDefinition;
    pub use super::preprocess::flatten;
    pub use super::process::{Invocation, SystemRunner, ToolRunner};
    pub use super::shader::*;
    pub use super::validate::validate;

    #[cfg(feature = "config-file")]
    pub use super::build::build_demo;
}
