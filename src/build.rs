use crate::assemble::{assemble, Selector};
use crate::codegen::data::DemoData;
use crate::codegen::gl::GlBindings;
use crate::codegen::hooks::MainTemplate;
use crate::codegen::GenerateSources;
use crate::compile::{compile, CompilationSpec};
use crate::context::Context;
use crate::error::{Error, Result};
use crate::process::ToolRunner;
use crate::shader::ShaderDefinition;
use crate::util::{display_path, LogResult};
use crate::validate::validate;
use std::path::PathBuf;
use std::time::{Duration, Instant};

/// Whole-program assembly kept next to the generated headers for inspection.
pub const SHADER_DUMP_NAME: &str = "demo-shader.glsl";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildReport {
    pub duration: Duration,
    /// `None` when the executable could not be inspected.
    pub exe_size: Option<u64>,
}

/// Writes every generated source of the demo into the build directory.
pub fn generate_sources(
    context: &Context,
    shader: &ShaderDefinition,
    compilation: &CompilationSpec,
) -> Result<Vec<PathBuf>> {
    let hooks = compilation.cpp.hooks.keys().cloned();

    let mut written = vec![
        GlBindings::from_config(&context.config).generate_sources(context)?,
        DemoData::new(shader, hooks).generate_sources(context)?,
        MainTemplate::new(&compilation.cpp.hooks).generate_sources(context)?,
    ];

    let dump = context.build_dir()?.join(SHADER_DUMP_NAME);
    let program = assemble(shader, Selector::WholeProgram)?;
    std::fs::write(&dump, program).map_err(|err| Error::file(&dump, err))?;
    written.push(dump);

    Ok(written)
}

/// Generates sources, validates shaders when a validator is configured and
/// compiles the executable.
pub fn build<R: ToolRunner>(
    context: &Context,
    runner: &mut R,
    shader: &ShaderDefinition,
    compilation: &CompilationSpec,
) -> Result<BuildReport> {
    let start = Instant::now();
    log::info!("Building demo in {} mode", context.mode());

    generate_sources(context, shader, compilation)?;

    if context.config.contains("tools:glslangValidator") {
        validate(context, runner, shader)?;
    } else {
        log::info!("No shader validator configured, skipping validation");
    }

    compile(context, runner, compilation)?;

    let exe = context.exe_path()?;
    let exe_size = std::fs::metadata(&exe)
        .map(|metadata| metadata.len())
        .map_err(|err| Error::file(&exe, err))
        .ok_or_log();

    let report = BuildReport {
        duration: start.elapsed(),
        exe_size,
    };

    log::info!("Build successful.");
    log::info!(
        "Build duration: {:.1} seconds.",
        report.duration.as_secs_f64()
    );
    match report.exe_size {
        Some(size) => log::info!("Demo size: {} bytes ({}).", size, display_path(&exe)),
        None => log::warn!("Demo size unknown."),
    }

    Ok(report)
}

/// Loads the demo manifest from the demo directory and builds it.
#[cfg(feature = "config-file")]
pub fn build_demo<R: ToolRunner>(context: &Context, runner: &mut R) -> Result<BuildReport> {
    let demo = crate::manifest::DemoDefinition::load(context)?;
    build(context, runner, &demo.shader, &demo.compilation).map_err(|err| {
        log::error!("Build failed.");
        err
    })
}
