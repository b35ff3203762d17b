#[cfg(feature = "config-file")]
use serde::{Deserialize, Serialize};

use crate::context::Context;
use crate::error::Result;
use crate::process::{Invocation, ToolRunner};
use crate::util::dir_arg;
use std::collections::BTreeMap;
use std::fmt::{Display, Formatter};
use std::path::PathBuf;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(
    feature = "config-file",
    derive(Serialize, Deserialize),
    serde(rename_all = "camelCase")
)]
pub struct AssemblySource {
    /// Object file produced from `source`.
    pub output: String,
    pub source: String,
    /// Extra assembler arguments, passed as given.
    #[cfg_attr(feature = "config-file", serde(default))]
    pub includes: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(
    feature = "config-file",
    derive(Serialize, Deserialize),
    serde(rename_all = "camelCase")
)]
pub struct CppSource {
    pub output: String,
    pub source: String,
    /// Include directories, each passed as `/I<dir>`.
    #[cfg_attr(feature = "config-file", serde(default))]
    pub includes: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(
    feature = "config-file",
    derive(Serialize, Deserialize),
    serde(rename_all = "camelCase")
)]
pub struct AsmCompilation {
    #[cfg_attr(feature = "config-file", serde(default))]
    pub nasm_args: Vec<String>,
    #[cfg_attr(feature = "config-file", serde(default))]
    pub sources: Vec<AssemblySource>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(
    feature = "config-file",
    derive(Serialize, Deserialize),
    serde(rename_all = "camelCase")
)]
pub struct CppCompilation {
    #[cfg_attr(feature = "config-file", serde(default))]
    pub cl_args: Vec<String>,
    #[cfg_attr(feature = "config-file", serde(default))]
    pub sources: Vec<CppSource>,
    /// Snippets injected into the main template, by placeholder name.
    #[cfg_attr(feature = "config-file", serde(default))]
    pub hooks: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(
    feature = "config-file",
    derive(Serialize, Deserialize),
    serde(rename_all = "camelCase")
)]
pub struct CompilationSpec {
    #[cfg_attr(feature = "config-file", serde(default))]
    pub asm: AsmCompilation,
    #[cfg_attr(feature = "config-file", serde(default))]
    pub cpp: CppCompilation,
    #[cfg_attr(feature = "config-file", serde(default))]
    pub link_args: Vec<String>,
    #[cfg_attr(feature = "config-file", serde(default))]
    pub crinkler_args: Vec<String>,
}

impl CompilationSpec {
    /// Every object file, assembly outputs first, in declaration order.
    pub fn objects(&self) -> impl Iterator<Item = &str> {
        self.asm
            .sources
            .iter()
            .map(|it| it.output.as_str())
            .chain(self.cpp.sources.iter().map(|it| it.output.as_str()))
    }
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum Phase {
    Assemble,
    Compile,
    Link,
}

impl Display for Phase {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Phase::Assemble => "assemble",
            Phase::Compile => "compile",
            Phase::Link => "link",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Step {
    pub phase: Phase,
    pub invocation: Invocation,
}

fn glew_dir(context: &Context) -> Result<PathBuf> {
    context.tool("glew")
}

fn assemble_steps(context: &Context, spec: &CompilationSpec) -> Result<Vec<Step>> {
    if spec.asm.sources.is_empty() {
        return Ok(vec![]);
    }

    let nasm = context.tool("nasm")?;
    let build_dir = dir_arg(context.build_dir()?);
    let demo_dir = dir_arg(context.demo_dir()?);

    Ok(spec
        .asm
        .sources
        .iter()
        .map(|source| {
            let invocation = Invocation::new("nasm", &nasm)
                .args(spec.asm.nasm_args.iter().cloned())
                .args(source.includes.iter().cloned())
                .args([
                    "-f",
                    "win32",
                    "-i",
                    build_dir.as_str(),
                    "-i",
                    demo_dir.as_str(),
                    "-o",
                    source.output.as_str(),
                    source.source.as_str(),
                ]);
            Step {
                phase: Phase::Assemble,
                invocation,
            }
        })
        .collect())
}

fn compile_steps(context: &Context, spec: &CompilationSpec) -> Result<Vec<Step>> {
    if spec.cpp.sources.is_empty() {
        return Ok(vec![]);
    }

    let cl = context.tool("cl")?;
    let extra_args = context.config.get_list("cl:args");
    let glew_include = format!("/I{}", glew_dir(context)?.join("include").display());
    let debug_args = if context.mode().is_debug() {
        vec![
            "/Zi".to_string(),
            format!("/Fd{}", dir_arg(context.build_dir()?)),
        ]
    } else {
        vec![]
    };

    Ok(spec
        .cpp
        .sources
        .iter()
        .map(|source| {
            let invocation = Invocation::new("cl", &cl)
                .args(spec.cpp.cl_args.iter().cloned())
                .args(source.includes.iter().map(|dir| format!("/I{}", dir)))
                .args(extra_args.iter().cloned())
                .args([
                    glew_include.clone(),
                    "/FA".to_string(),
                    format!("/Fa{}.asm", source.output),
                    "/c".to_string(),
                    format!("/Fo{}", source.output),
                ])
                .args(debug_args.iter().cloned())
                .arg(source.source.as_str());
            Step {
                phase: Phase::Compile,
                invocation,
            }
        })
        .collect())
}

fn link_step(context: &Context, spec: &CompilationSpec) -> Result<Step> {
    let out_arg = format!("/OUT:{}", context.exe_path()?.display());

    let invocation = if context.mode().is_debug() {
        let glew_lib = glew_dir(context)?
            .join("lib")
            .join("Release")
            .join("Win32")
            .join("glew32s.lib");

        Invocation::new("link", context.tool("link")?)
            .args(spec.link_args.iter().cloned())
            .args(context.config.get_list("link:args"))
            .args(["/DEBUG", "/INCREMENTAL:NO"])
            .arg(glew_lib.display().to_string())
            .arg(out_arg)
            .args(spec.objects())
    } else {
        let report = context.build_dir()?.join("stats.html");

        Invocation::new("crinkler", context.tool("crinkler")?)
            .args(spec.crinkler_args.iter().cloned())
            .args(context.config.get_list("crinkler:args"))
            .arg(format!("/REPORT:{}", report.display()))
            .arg(out_arg)
            .args(spec.objects())
    };

    Ok(Step {
        phase: Phase::Link,
        invocation,
    })
}

/// Every tool run of the build, in execution order. Exactly one link step is
/// planned: the linker in debug mode, the packer in release mode.
pub fn plan(context: &Context, spec: &CompilationSpec) -> Result<Vec<Step>> {
    let mut steps = assemble_steps(context, spec)?;
    steps.extend(compile_steps(context, spec)?);
    steps.push(link_step(context, spec)?);
    Ok(steps)
}

pub fn compile<R: ToolRunner>(
    context: &Context,
    runner: &mut R,
    spec: &CompilationSpec,
) -> Result<()> {
    let steps = plan(context, spec)?;

    let mut phase = None;
    for step in &steps {
        if phase != Some(step.phase) {
            log::info!("Running {} phase ({} mode)", step.phase, context.mode());
            phase = Some(step.phase);
        }

        if let Err(err) = runner.run(&step.invocation) {
            log::error!("{} phase aborted: {}", step.phase, err);
            return Err(err);
        }
    }

    Ok(())
}
