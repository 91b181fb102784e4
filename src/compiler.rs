use rayon::iter::{IntoParallelRefIterator, ParallelIterator};
use tracing::Level;

use crate::blueprint::Blueprint;
use crate::config::Configuration;
use crate::error::CompileError;
use crate::graph::Graph;
use crate::ids::{IdAllocator, RandomIds};
use crate::stages::{STAGES, StageContext};
use crate::template::TemplateEngine;

/// Compiles a release configuration into its task graph, with the built-in
/// templates and random task ids.
pub fn compile(config: &Configuration) -> Result<Graph, CompileError> {
    compile_with(config, &TemplateEngine::new(), &mut RandomIds)
}

/// Compiles with a caller-provided template engine and id allocator.
///
/// Stages are visited in their fixed order; a disabled stage is skipped and
/// contributes nothing. On the first error the half-built graph is dropped.
pub fn compile_with(
    config: &Configuration,
    engine: &TemplateEngine,
    ids: &mut dyn IdAllocator,
) -> Result<Graph, CompileError> {
    let span = tracing::span!(
        Level::INFO,
        "compile",
        branch = %config.branch,
        version = %config.version,
        build = config.build_number,
    );
    let _enter = span.enter();

    config.validate()?;

    let mut blueprint = Blueprint::new(ids);

    {
        let mut cx = StageContext::new(config, engine, &mut blueprint);

        for descriptor in &STAGES {
            if !(descriptor.enabled)(config) {
                tracing::debug!(stage = %descriptor.stage, "stage disabled, skipping");
                continue;
            }

            tracing::debug!(stage = %descriptor.stage, "compiling stage");
            (descriptor.build)(&mut cx)?;
        }
    }

    let graph = blueprint.finish()?;

    tracing::info!(
        tasks = graph.len(),
        scopes = graph.scopes().len(),
        "compiled release graph"
    );

    Ok(graph)
}

/// Compiles independent configurations in parallel. Results come back in input
/// order.
pub fn compile_all(configs: &[Configuration]) -> Vec<Result<Graph, CompileError>> {
    let engine = TemplateEngine::new();

    configs
        .par_iter()
        .map(|config| compile_with(config, &engine, &mut RandomIds))
        .collect()
}
