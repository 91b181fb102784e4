//! Upstream task names per stage.
//!
//! The resolver never holds on to compiled tasks. It rebuilds the expected
//! names from the configuration and checks them against the name table of the
//! [`Blueprint`] built so far. Stages that are switched off contribute nothing,
//! so their names never show up in a `requires` list.

use crate::blueprint::Blueprint;
use crate::config::{Configuration, PartialUpdate};
use crate::error::CompileError;
use crate::naming::Namer;
use crate::stages::Stage;

/// The coordinates of a task along the platform, partial and chunk axes.
#[derive(Debug, Clone, Copy, Default)]
pub struct Axis<'a> {
    pub platform: Option<&'a str>,
    pub partial: Option<&'a PartialUpdate>,
    pub chunk: Option<u32>,
}

impl<'a> Axis<'a> {
    pub fn platform(platform: &'a str) -> Self {
        Self {
            platform: Some(platform),
            ..Self::default()
        }
    }

    pub fn with_partial(mut self, partial: &'a PartialUpdate) -> Self {
        self.partial = Some(partial);
        self
    }

    pub fn with_chunk(mut self, chunk: u32) -> Self {
        self.chunk = Some(chunk);
        self
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Resolver<'a> {
    config: &'a Configuration,
    namer: Namer<'a>,
}

impl<'a> Resolver<'a> {
    pub fn new(config: &'a Configuration) -> Self {
        Self {
            config,
            namer: Namer::new(config),
        }
    }

    /// Upstream names of the task at `axis` within `stage`. Every name must
    /// already be registered in `compiled`, otherwise the stage order or the
    /// configuration is inconsistent.
    pub fn resolve(
        &self,
        stage: Stage,
        axis: Axis<'_>,
        compiled: &Blueprint<'_>,
    ) -> Result<Vec<String>, CompileError> {
        let names = self.upstream(stage, axis);

        if let Some(name) = names.iter().find(|name| !compiled.contains(name)) {
            return Err(CompileError::Resolution {
                stage,
                name: name.clone(),
            });
        }

        Ok(names)
    }

    /// Expected upstream names, without checking that they exist.
    pub fn upstream(&self, stage: Stage, axis: Axis<'_>) -> Vec<String> {
        match stage {
            Stage::Build | Stage::L10nRepack => vec![],
            Stage::PartialUpdates => self.partial_update_inputs(axis),
            Stage::Checksums => self.checksum_inputs(),
            Stage::CandidatesUpload => self.candidate_producer(axis),
            Stage::PushToReleases => self.push_to_releases_inputs(),
            Stage::PartnerRepacks | Stage::FinalVerify => {
                if Stage::PushToReleases.is_enabled(self.config) {
                    vec![self.namer.push_to_releases()]
                } else {
                    vec![]
                }
            }
        }
    }

    fn partial_update_inputs(&self, axis: Axis<'_>) -> Vec<String> {
        match (axis.platform, axis.chunk) {
            (Some(platform), Some(chunk)) if Stage::L10nRepack.is_enabled(self.config) => {
                vec![self.namer.l10n_repack(platform, chunk)]
            }
            _ => vec![],
        }
    }

    /// Artifacts produced inside the graph: repacks and update generators.
    fn checksum_inputs(&self) -> Vec<String> {
        let mut names = Vec::new();

        if Stage::L10nRepack.is_enabled(self.config) {
            for (platform, l10n) in self.config.l10n_platforms() {
                names.extend(
                    l10n.chunk_indices()
                        .map(|chunk| self.namer.l10n_repack(platform, chunk)),
                );
            }
        }

        if Stage::PartialUpdates.is_enabled(self.config) {
            for platform in self.config.en_us_platforms() {
                for partial in &self.config.partial_updates {
                    names.push(self.namer.en_us_partial_generator(platform, partial));
                }
            }

            for (platform, l10n) in self.config.l10n_platforms() {
                for chunk in l10n.chunk_indices() {
                    for partial in &self.config.partial_updates {
                        names.push(self.namer.l10n_partial_generator(platform, partial, chunk));
                    }
                }
            }
        }

        names
    }

    /// The task producing what a candidates upload ships. Complete en-US
    /// uploads ship an external build and have no in-graph producer.
    fn candidate_producer(&self, axis: Axis<'_>) -> Vec<String> {
        let Some(platform) = axis.platform else {
            return vec![];
        };

        match (axis.partial, axis.chunk) {
            (None, None) => vec![],
            (Some(partial), None) if Stage::PartialUpdates.is_enabled(self.config) => {
                vec![self.namer.en_us_partial_generator(platform, partial)]
            }
            (None, Some(chunk)) if Stage::L10nRepack.is_enabled(self.config) => {
                vec![self.namer.l10n_repack(platform, chunk)]
            }
            (Some(partial), Some(chunk)) if Stage::PartialUpdates.is_enabled(self.config) => {
                vec![self.namer.l10n_partial_generator(platform, partial, chunk)]
            }
            _ => vec![],
        }
    }

    /// Everything uploaded to the candidates area, then the checksums:
    /// en-US completes, l10n completes, en-US partials, l10n partials.
    fn push_to_releases_inputs(&self) -> Vec<String> {
        let config = self.config;
        let mut names = Vec::new();

        if Stage::CandidatesUpload.is_enabled(config) {
            names.extend(
                config
                    .en_us_platforms()
                    .map(|platform| self.namer.en_us_complete_candidates(platform)),
            );

            for (platform, l10n) in config.l10n_platforms() {
                names.extend(
                    l10n.chunk_indices()
                        .map(|chunk| self.namer.l10n_complete_candidates(platform, chunk)),
                );
            }

            if Stage::PartialUpdates.is_enabled(config) {
                for platform in config.en_us_platforms() {
                    for partial in &config.partial_updates {
                        names.push(self.namer.en_us_partial_candidates(platform, partial));
                    }
                }

                for (platform, l10n) in config.l10n_platforms() {
                    for partial in &config.partial_updates {
                        for chunk in l10n.chunk_indices() {
                            names.push(self.namer.l10n_partial_candidates(platform, partial, chunk));
                        }
                    }
                }
            }
        }

        if Stage::Checksums.is_enabled(config) {
            names.push(self.namer.checksums());
        }

        names
    }
}
