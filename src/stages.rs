//! The release stages, in the one order they are compiled in.
//!
//! Each stage is a descriptor: a predicate over the [`Configuration`] deciding
//! whether the stage takes part, and a builder registering its tasks. Builders
//! only ever depend on tasks registered by stages earlier in [`STAGES`].

use std::fmt;

use petgraph::graph::NodeIndex;

use crate::blueprint::{Blueprint, TaskSpec, Worker};
use crate::config::Configuration;
use crate::error::{CompileError, ConfigError};
use crate::gate::{GateCategory, maybe_insert_gate};
use crate::graph::Priority;
use crate::naming::Namer;
use crate::resolver::{Axis, Resolver};
use crate::template::{Params, TemplateEngine, TemplateKind, shell_command};

const LINUX: Worker = Worker::new("aws-provisioner-v1", "opt-linux64");
const FUNSIZE: Worker = Worker::new("aws-provisioner-v1", "funsize-mar-generator");
const BEETMOVER: Worker = Worker::new("scriptworker-prov-v1", "beetmoverworker-v1");

const CANDIDATES_SCOPE: &str = "project:releng:beetmover:candidates";
const PARTNER_SCOPE: &str = "project:releng:partner-repack";

const EN_US: &str = "en-US";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    Build,
    L10nRepack,
    PartialUpdates,
    Checksums,
    CandidatesUpload,
    PushToReleases,
    PartnerRepacks,
    FinalVerify,
}

impl Stage {
    pub fn as_str(self) -> &'static str {
        match self {
            Stage::Build => "build",
            Stage::L10nRepack => "l10n-repack",
            Stage::PartialUpdates => "partial-updates",
            Stage::Checksums => "checksums",
            Stage::CandidatesUpload => "candidates-upload",
            Stage::PushToReleases => "push-to-releases",
            Stage::PartnerRepacks => "partner-repacks",
            Stage::FinalVerify => "final-verify",
        }
    }

    /// Whether the stage contributes tasks for this configuration.
    pub fn is_enabled(self, config: &Configuration) -> bool {
        (self.descriptor().enabled)(config)
    }

    fn descriptor(self) -> &'static StageDescriptor {
        &STAGES[self as usize]
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

pub(crate) struct StageDescriptor {
    pub stage: Stage,
    pub enabled: fn(&Configuration) -> bool,
    pub build: fn(&mut StageContext<'_, '_>) -> Result<(), CompileError>,
}

pub(crate) static STAGES: [StageDescriptor; 8] = [
    StageDescriptor {
        stage: Stage::Build,
        enabled: |_| true,
        build: build_references,
    },
    StageDescriptor {
        stage: Stage::L10nRepack,
        enabled: |config| !config.l10n.platforms.is_empty(),
        build: l10n_repack,
    },
    StageDescriptor {
        stage: Stage::PartialUpdates,
        enabled: |config| config.features.updates_enabled,
        build: partial_updates,
    },
    StageDescriptor {
        stage: Stage::Checksums,
        enabled: |config| config.features.checksums_enabled,
        build: checksums,
    },
    StageDescriptor {
        stage: Stage::CandidatesUpload,
        enabled: |config| config.features.push_to_candidates_enabled,
        build: candidates_upload,
    },
    StageDescriptor {
        stage: Stage::PushToReleases,
        enabled: |config| config.features.push_to_releases_enabled,
        build: push_to_releases,
    },
    StageDescriptor {
        stage: Stage::PartnerRepacks,
        enabled: |config| {
            config.features.push_to_releases_enabled && !config.partner_repacks_platforms.is_empty()
        },
        build: partner_repacks,
    },
    StageDescriptor {
        stage: Stage::FinalVerify,
        enabled: |config| {
            config.features.push_to_releases_enabled && !config.final_verify_channels.is_empty()
        },
        build: final_verify,
    },
];

/// Shared state handed to every stage builder.
pub(crate) struct StageContext<'c, 'b> {
    pub config: &'c Configuration,
    pub engine: &'c TemplateEngine,
    pub blueprint: &'c mut Blueprint<'b>,
    pub namer: Namer<'c>,
    pub resolver: Resolver<'c>,
}

impl<'c, 'b> StageContext<'c, 'b> {
    pub fn new(
        config: &'c Configuration,
        engine: &'c TemplateEngine,
        blueprint: &'c mut Blueprint<'b>,
    ) -> Self {
        Self {
            config,
            engine,
            blueprint,
            namer: Namer::new(config),
            resolver: Resolver::new(config),
        }
    }

    /// Resolves upstream names and turns them into arena handles.
    fn upstream(&self, stage: Stage, axis: Axis<'_>) -> Result<Vec<NodeIndex>, CompileError> {
        let names = self.resolver.resolve(stage, axis, &*self.blueprint)?;
        self.handles(stage, &names)
    }

    fn handles(&self, stage: Stage, names: &[String]) -> Result<Vec<NodeIndex>, CompileError> {
        names
            .iter()
            .map(|name| {
                self.blueprint
                    .lookup(name)
                    .ok_or_else(|| CompileError::Resolution {
                        stage,
                        name: name.clone(),
                    })
            })
            .collect()
    }

    /// Task id of the first upstream task, passed on to workers that fetch
    /// its artifacts.
    fn upstream_id(&self, handles: &[NodeIndex]) -> Option<String> {
        handles
            .first()
            .map(|&handle| self.blueprint.task(handle).task_id.to_string())
    }

    fn params(&self) -> Params {
        Params::new()
            .with("product", self.config.product.as_str())
            .with("version", self.config.version.as_str())
            .with("build_number", self.config.build_number)
            .with("branch", self.config.branch.as_str())
            .with("repo_path", self.config.repo_path.as_str())
    }

    fn command(&self, kind: TemplateKind, params: &Params) -> Result<Vec<String>, CompileError> {
        Ok(shell_command(self.engine.render(kind, params)?))
    }

    fn add(&mut self, spec: TaskSpec, requires: &[NodeIndex]) -> Result<NodeIndex, CompileError> {
        self.blueprint.add_task(spec, requires)
    }
}

/// en-US builds run outside of the graph, this stage only checks that every
/// platform points at one.
fn build_references(cx: &mut StageContext<'_, '_>) -> Result<(), CompileError> {
    for (platform, build) in &cx.config.en_us.platforms {
        if build.task_id.is_empty() {
            return Err(ConfigError::MissingStageData {
                stage: Stage::Build,
                field: format!("en_US_config.platforms.{platform}.task_id"),
            }
            .into());
        }

        tracing::debug!(platform = %platform, task_id = %build.task_id, "en-US build");
    }

    Ok(())
}

fn l10n_repack(cx: &mut StageContext<'_, '_>) -> Result<(), CompileError> {
    let config = cx.config;

    for (platform, l10n) in config.l10n_platforms() {
        for chunk in l10n.chunk_indices() {
            let requires = cx.upstream(Stage::L10nRepack, Axis::platform(platform).with_chunk(chunk))?;

            let locales = l10n
                .chunk_locales(chunk)
                .iter()
                .map(|locale| {
                    config
                        .l10n
                        .changesets
                        .get(locale)
                        .map(|revision| format!("{locale}:{revision}"))
                        .ok_or_else(|| ConfigError::UndeclaredLocale {
                            platform: platform.to_string(),
                            locale: locale.clone(),
                        })
                })
                .collect::<Result<Vec<_>, _>>()?;

            let params = cx
                .params()
                .with("platform", platform)
                .with("en_us_binary_url", l10n.en_us_binary_url.as_str())
                .with("locales", locales)
                .with("chunk", chunk)
                .with("total_chunks", l10n.chunks);

            let spec = TaskSpec::new(cx.namer.l10n_repack(platform, chunk), LINUX)
                .description(format!("{platform} l10n repack {chunk}/{}", l10n.chunks))
                .priority(Priority::High)
                .scopes(vec![])
                .command(cx.command(TemplateKind::L10nRepack, &params)?)
                .max_run_time(7200);

            cx.add(spec, &requires)?;
        }
    }

    Ok(())
}

fn partial_updates(cx: &mut StageContext<'_, '_>) -> Result<(), CompileError> {
    let config = cx.config;
    let channels = config.release_channels.clone();

    for (platform, build) in &config.en_us.platforms {
        for partial in &config.partial_updates {
            let axis = Axis::platform(platform).with_partial(partial);
            let requires = cx.upstream(Stage::PartialUpdates, axis)?;

            let params = cx
                .params()
                .with("platform", platform.as_str())
                .with("locales", vec![EN_US])
                .with("from_version", partial.version.as_str())
                .with("from_build_number", partial.build_number)
                .with("channels", channels.clone())
                .with("upstream", build.task_id.as_str());

            let spec = TaskSpec::new(cx.namer.en_us_partial_generator(platform, partial), FUNSIZE)
                .description(format!("{platform} en-US partial update from {partial}"))
                .priority(Priority::High)
                .command(cx.command(TemplateKind::PartialUpdate, &params)?)
                .max_run_time(3600);

            cx.add(spec, &requires)?;
        }
    }

    for (platform, l10n) in config.l10n_platforms() {
        for chunk in l10n.chunk_indices() {
            for partial in &config.partial_updates {
                let axis = Axis::platform(platform).with_partial(partial).with_chunk(chunk);
                let requires = cx.upstream(Stage::PartialUpdates, axis)?;

                let mut params = cx
                    .params()
                    .with("platform", platform)
                    .with("locales", l10n.chunk_locales(chunk).to_vec())
                    .with("from_version", partial.version.as_str())
                    .with("from_build_number", partial.build_number)
                    .with("channels", channels.clone());
                if let Some(upstream) = cx.upstream_id(&requires) {
                    params.set("upstream", upstream);
                }

                let spec = TaskSpec::new(
                    cx.namer.l10n_partial_generator(platform, partial, chunk),
                    FUNSIZE,
                )
                .description(format!(
                    "{platform} l10n partial update from {partial}, chunk {chunk}"
                ))
                .priority(Priority::High)
                .command(cx.command(TemplateKind::PartialUpdate, &params)?)
                .max_run_time(3600);

                cx.add(spec, &requires)?;
            }
        }
    }

    Ok(())
}

fn checksums(cx: &mut StageContext<'_, '_>) -> Result<(), CompileError> {
    let requires = cx.upstream(Stage::Checksums, Axis::default())?;

    let platforms: Vec<String> = cx.config.en_us_platforms().map(String::from).collect();
    let params = cx.params().with("platforms", platforms);

    let spec = TaskSpec::new(cx.namer.checksums(), LINUX)
        .description("Generate checksums for the release")
        .priority(Priority::High)
        .scopes(vec![])
        .command(cx.command(TemplateKind::Checksums, &params)?)
        .max_run_time(3600);

    cx.add(spec, &requires)?;
    Ok(())
}

fn candidates_upload(cx: &mut StageContext<'_, '_>) -> Result<(), CompileError> {
    let config = cx.config;
    let updates = Stage::PartialUpdates.is_enabled(config);

    let upload = |name: String, description: String, command: Vec<String>| {
        TaskSpec::new(name, BEETMOVER)
            .description(description)
            .priority(Priority::High)
            .scopes(vec![CANDIDATES_SCOPE.to_string()])
            .command(command)
            .max_run_time(1800)
    };

    for (platform, build) in &config.en_us.platforms {
        let requires = cx.upstream(Stage::CandidatesUpload, Axis::platform(platform))?;
        let params = cx
            .params()
            .with("platform", platform.as_str())
            .with("locale", EN_US)
            .with("upstream", build.task_id.as_str())
            .with("artifacts", build.artifacts.clone());

        let spec = upload(
            cx.namer.en_us_complete_candidates(platform),
            format!("Upload {platform} en-US complete to candidates"),
            cx.command(TemplateKind::PushToCandidates, &params)?,
        );
        cx.add(spec, &requires)?;

        if !updates {
            continue;
        }

        for partial in &config.partial_updates {
            let axis = Axis::platform(platform).with_partial(partial);
            let requires = cx.upstream(Stage::CandidatesUpload, axis)?;

            let mut params = cx
                .params()
                .with("platform", platform.as_str())
                .with("locale", EN_US)
                .with("partial", partial.to_string());
            if let Some(upstream) = cx.upstream_id(&requires) {
                params.set("upstream", upstream);
            }

            let spec = upload(
                cx.namer.en_us_partial_candidates(platform, partial),
                format!("Upload {platform} en-US partial from {partial} to candidates"),
                cx.command(TemplateKind::PushToCandidates, &params)?,
            );
            cx.add(spec, &requires)?;
        }
    }

    for (platform, l10n) in config.l10n_platforms() {
        for chunk in l10n.chunk_indices() {
            let locales = l10n.chunk_locales(chunk).join(",");

            let requires =
                cx.upstream(Stage::CandidatesUpload, Axis::platform(platform).with_chunk(chunk))?;
            let mut params = cx
                .params()
                .with("platform", platform)
                .with("locale", locales.as_str());
            if let Some(upstream) = cx.upstream_id(&requires) {
                params.set("upstream", upstream);
            }

            let spec = upload(
                cx.namer.l10n_complete_candidates(platform, chunk),
                format!("Upload {platform} l10n repack {chunk} to candidates"),
                cx.command(TemplateKind::PushToCandidates, &params)?,
            );
            cx.add(spec, &requires)?;

            if !updates {
                continue;
            }

            for partial in &config.partial_updates {
                let axis = Axis::platform(platform).with_partial(partial).with_chunk(chunk);
                let requires = cx.upstream(Stage::CandidatesUpload, axis)?;

                let mut params = cx
                    .params()
                    .with("platform", platform)
                    .with("locale", locales.as_str())
                    .with("partial", partial.to_string());
                if let Some(upstream) = cx.upstream_id(&requires) {
                    params.set("upstream", upstream);
                }

                let spec = upload(
                    cx.namer.l10n_partial_candidates(platform, partial, chunk),
                    format!("Upload {platform} l10n partial from {partial}, chunk {chunk} to candidates"),
                    cx.command(TemplateKind::PushToCandidates, &params)?,
                );
                cx.add(spec, &requires)?;
            }
        }
    }

    Ok(())
}

fn push_to_releases(cx: &mut StageContext<'_, '_>) -> Result<(), CompileError> {
    let stage = Stage::PushToReleases;
    let predecessors = cx
        .resolver
        .resolve(stage, Axis::default(), &*cx.blueprint)?;

    let requires = match maybe_insert_gate(GateCategory::PushToReleases, cx.config, &predecessors) {
        Some(gate) => {
            let upstream = cx.handles(stage, &gate.requires)?;
            vec![cx.add(gate.spec(), &upstream)?]
        }
        None => cx.handles(stage, &predecessors)?,
    };

    let params = cx
        .params()
        .with("exclude", cx.config.active_exclusions().to_vec());

    let spec = TaskSpec::new(cx.namer.push_to_releases(), LINUX)
        .description("Push candidates to releases")
        .priority(Priority::High)
        .command(cx.command(TemplateKind::PushToReleases, &params)?)
        .max_run_time(3600);

    cx.add(spec, &requires)?;
    Ok(())
}

fn partner_repacks(cx: &mut StageContext<'_, '_>) -> Result<(), CompileError> {
    let config = cx.config;

    for platform in &config.partner_repacks_platforms {
        let requires = cx.upstream(Stage::PartnerRepacks, Axis::platform(platform))?;
        let params = cx.params().with("platform", platform.as_str());

        let spec = TaskSpec::new(cx.namer.partner_repack(platform), LINUX)
            .description(format!("{platform} partner repacks"))
            .priority(Priority::High)
            .scopes(vec![PARTNER_SCOPE.to_string()])
            .command(cx.command(TemplateKind::PartnerRepack, &params)?)
            .max_run_time(7200);

        cx.add(spec, &requires)?;
    }

    Ok(())
}

fn final_verify(cx: &mut StageContext<'_, '_>) -> Result<(), CompileError> {
    let config = cx.config;

    for platform in config.en_us_platforms() {
        for channel in &config.final_verify_channels {
            let requires = cx.upstream(Stage::FinalVerify, Axis::platform(platform))?;
            let params = cx
                .params()
                .with("platform", platform)
                .with("channel", channel.as_str());

            let spec = TaskSpec::new(cx.namer.final_verify(platform, channel), LINUX)
                .description(format!("{platform} final verification on {channel}"))
                .priority(Priority::High)
                .scopes(vec![])
                .command(cx.command(TemplateKind::FinalVerify, &params)?)
                .max_run_time(3600);

            cx.add(spec, &requires)?;
        }
    }

    Ok(())
}
