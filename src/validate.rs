use crate::assemble::{assemble, Selector};
use crate::context::Context;
use crate::error::{Error, Result, VecErr};
use crate::process::{Invocation, ToolRunner};
use crate::shader::{ShaderDefinition, Stage};
use crate::util::display_path;
use std::path::{Path, PathBuf};

pub const VALIDATOR_TOOL: &str = "glslangValidator";

/// Scratch file a pass stage is written to before validation.
pub fn stage_file(build_dir: &Path, pass: usize, stage: Stage) -> PathBuf {
    build_dir.join(format!("validate_p{}.{}", pass, stage.extension()))
}

/// Checks every stage of every pass with the external validator.
///
/// Failures do not stop the sweep: all stages are attempted and the failures
/// are reported together as [`Error::Validation`].
pub struct ShaderValidator<'a, R: ToolRunner> {
    context: &'a Context,
    runner: &'a mut R,
}

impl<'a, R: ToolRunner> ShaderValidator<'a, R> {
    pub fn new(context: &'a Context, runner: &'a mut R) -> Self {
        ShaderValidator { context, runner }
    }

    fn validate_stage(
        &mut self,
        definition: &ShaderDefinition,
        program: &Path,
        pass: usize,
        stage: Stage,
    ) -> Result<()> {
        let build_dir = self.context.build_dir()?;
        let input = stage_file(&build_dir, pass, stage);
        log::info!(
            "Validating pass #{} {} shader: {}",
            pass,
            stage.extension(),
            display_path(&input)
        );

        let source = assemble(definition, Selector::Stage { stage, pass })?;
        std::fs::write(&input, source).map_err(|err| Error::file(&input, err))?;

        let invocation =
            Invocation::new(VALIDATOR_TOOL, program).arg(input.display().to_string());
        self.runner.run(&invocation)
    }

    pub fn validate(&mut self, definition: &ShaderDefinition) -> Result<()> {
        self.context.config.required(&["tools:glslangValidator"])?;
        let program = self.context.tool(VALIDATOR_TOOL)?;

        let build_dir = self.context.build_dir()?;
        std::fs::create_dir_all(&build_dir).map_err(|err| Error::file(&build_dir, err))?;

        let mut failures = vec![];
        for (index, pass) in definition.passes.iter().enumerate() {
            for stage in pass.stages() {
                if let Err(err) = self.validate_stage(definition, &program, index, stage) {
                    log::error!("pass #{} {} shader: {}", index, stage.name(), err);
                    failures.push(err);
                }
            }
        }

        if failures.is_empty() {
            Ok(())
        } else {
            log::error!("Validation errors. Stopping.");
            Err(Error::Validation(VecErr::from(failures)))
        }
    }
}

pub fn validate<R: ToolRunner>(
    context: &Context,
    runner: &mut R,
    definition: &ShaderDefinition,
) -> Result<()> {
    ShaderValidator::new(context, runner).validate(definition)
}
