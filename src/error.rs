use thiserror::Error;

use crate::stages::Stage;
use crate::template::TemplateKind;

/// Everything that can stop a compilation. None of these are transient, a
/// failing compile never yields a partial graph.
#[derive(Debug, Error)]
pub enum CompileError {
    #[error("Invalid configuration:\n{0}")]
    Configuration(#[from] ConfigError),

    #[error("Stage '{stage}' depends on '{name}', which was never compiled")]
    Resolution { stage: Stage, name: String },

    #[error("Error while rendering task payload:\n{0}")]
    Template(#[from] TemplateError),

    #[error("Task '{0}' is registered twice")]
    DuplicateTask(String),

    #[error("Cycle detected in task graph at '{0}'")]
    Cycle(String),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Couldn't parse configuration.\n{0}")]
    Parse(#[from] serde_json::Error),

    #[error("Field '{0}' is required")]
    MissingField(&'static str),

    #[error("Platform '{platform}' used by {referrer} is not declared in en_US_config")]
    UndeclaredPlatform {
        platform: String,
        referrer: &'static str,
    },

    #[error("Locale '{locale}' on platform '{platform}' has no l10n changeset")]
    UndeclaredLocale { platform: String, locale: String },

    #[error("Platform '{platform}' splits {locales} locale(s) into {chunks} chunk(s)")]
    Chunks {
        platform: String,
        chunks: u32,
        locales: usize,
    },

    #[error("Stage '{stage}' is enabled but '{field}' is empty")]
    MissingStageData { stage: Stage, field: String },

    #[error("Final verify channel '{0}' is not a release channel")]
    UnknownChannel(String),

    #[error("Exclusion pattern '{pattern}' is not a valid glob.\n{source}")]
    Exclusion {
        pattern: String,
        source: glob::PatternError,
    },
}

#[derive(Debug, Error)]
pub enum TemplateError {
    #[error("Template '{0}' not found")]
    TemplateNotFound(String),

    #[error("Template '{kind}' is missing parameter '{field}'")]
    MissingParameter {
        kind: TemplateKind,
        field: &'static str,
    },

    #[error("Couldn't register template '{kind}'.\n{source}")]
    Register {
        kind: TemplateKind,
        source: minijinja::Error,
    },

    #[error("Couldn't render template '{kind}'.\n{source}")]
    Render {
        kind: TemplateKind,
        source: minijinja::Error,
    },
}
