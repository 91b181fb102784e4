//! Command line rendering for task payloads.
//!
//! Every task kind owns a small [minijinja] template. Rendering is a pure
//! function of the template and a [`Params`] set: required parameters are
//! checked up front so a missing field is reported by name, optional ones are
//! guarded with `is defined` inside the template.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use minijinja::{AutoEscape, Environment, UndefinedBehavior, Value};

use crate::error::TemplateError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TemplateKind {
    L10nRepack,
    PartialUpdate,
    Checksums,
    PushToCandidates,
    PushToReleases,
    PartnerRepack,
    FinalVerify,
}

impl TemplateKind {
    pub const ALL: [TemplateKind; 7] = [
        TemplateKind::L10nRepack,
        TemplateKind::PartialUpdate,
        TemplateKind::Checksums,
        TemplateKind::PushToCandidates,
        TemplateKind::PushToReleases,
        TemplateKind::PartnerRepack,
        TemplateKind::FinalVerify,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            TemplateKind::L10nRepack => "l10n-repack",
            TemplateKind::PartialUpdate => "partial-update",
            TemplateKind::Checksums => "checksums",
            TemplateKind::PushToCandidates => "push-to-candidates",
            TemplateKind::PushToReleases => "push-to-releases",
            TemplateKind::PartnerRepack => "partner-repack",
            TemplateKind::FinalVerify => "final-verify",
        }
    }

    /// Parameters the template cannot render without.
    pub fn required(self) -> &'static [&'static str] {
        match self {
            TemplateKind::L10nRepack => &[
                "product",
                "version",
                "build_number",
                "branch",
                "platform",
                "en_us_binary_url",
                "locales",
                "chunk",
                "total_chunks",
            ],
            TemplateKind::PartialUpdate => &[
                "product",
                "version",
                "build_number",
                "platform",
                "locales",
                "from_version",
                "from_build_number",
                "channels",
            ],
            TemplateKind::Checksums => &["product", "version", "build_number", "branch", "platforms"],
            TemplateKind::PushToCandidates => {
                &["product", "version", "build_number", "platform", "locale"]
            }
            TemplateKind::PushToReleases => &["product", "version", "build_number"],
            TemplateKind::PartnerRepack => {
                &["product", "version", "build_number", "platform", "repo_path"]
            }
            TemplateKind::FinalVerify => {
                &["product", "version", "build_number", "platform", "channel"]
            }
        }
    }

    fn source(self) -> &'static str {
        match self {
            TemplateKind::L10nRepack => L10N_REPACK,
            TemplateKind::PartialUpdate => PARTIAL_UPDATE,
            TemplateKind::Checksums => CHECKSUMS,
            TemplateKind::PushToCandidates => PUSH_TO_CANDIDATES,
            TemplateKind::PushToReleases => PUSH_TO_RELEASES,
            TemplateKind::PartnerRepack => PARTNER_REPACK,
            TemplateKind::FinalVerify => FINAL_VERIFY,
        }
    }
}

impl fmt::Display for TemplateKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TemplateKind {
    type Err = TemplateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        TemplateKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| TemplateError::TemplateNotFound(s.to_string()))
    }
}

const L10N_REPACK: &str = "\
cd /builds/worker && ./mozharness/scripts/desktop_l10n.py \
--branch {{ branch }} --platform {{ platform }} --product {{ product }} \
--version {{ version }} --build-number {{ build_number }} \
--en-us-binary-url {{ en_us_binary_url }}\
{% for locale in locales %} --locale {{ locale }}{% endfor %} \
--this-chunk {{ chunk }} --total-chunks {{ total_chunks }}";

const PARTIAL_UPDATE: &str = "\
cd /builds/worker && ./funsize/generate_partial.py \
--product {{ product }} --platform {{ platform }} \
--from-version {{ from_version }} --from-build-number {{ from_build_number }} \
--to-version {{ version }} --to-build-number {{ build_number }}\
{% if upstream is defined %} --upstream-task {{ upstream }}{% endif %}\
{% for locale in locales %} --locale {{ locale }}{% endfor %}\
{% for channel in channels %} --channel {{ channel }}{% endfor %}";

const CHECKSUMS: &str = "\
cd /builds/worker && ./mozharness/scripts/release/generate-checksums.py \
--product {{ product }} --version {{ version }} --build-number {{ build_number }} \
--branch {{ branch }}{% for platform in platforms %} --platform {{ platform }}{% endfor %}";

const PUSH_TO_CANDIDATES: &str = "\
cd /builds/worker && ./mozharness/scripts/release/beet-mover.py \
--product {{ product }} --version {{ version }} --build-number {{ build_number }} \
--platform {{ platform }} --locale {{ locale }}\
{% if partial is defined %} --partial {{ partial }}{% endif %}\
{% if upstream is defined %} --taskid {{ upstream }}{% endif %}\
{% if artifacts is defined %}{% for artifact in artifacts %} --artifact {{ artifact }}{% endfor %}{% endif %}";

const PUSH_TO_RELEASES: &str = "\
cd /builds/worker && ./mozharness/scripts/release/push-candidate-to-releases.py \
--product {{ product }} --version {{ version }} --build-number {{ build_number }}\
{% if exclude is defined %}{% for pattern in exclude %} --exclude '{{ pattern }}'{% endfor %}{% endif %}";

const PARTNER_REPACK: &str = "\
cd /builds/worker && ./mozharness/scripts/desktop_partner_repacks.py \
--product {{ product }} --version {{ version }} --build-number {{ build_number }} \
--platform {{ platform }} --repo {{ repo_path }}";

const FINAL_VERIFY: &str = "\
cd /builds/worker && ./tools/release/final-verification.sh \
--product {{ product }} --version {{ version }} --build-number {{ build_number }} \
--platform {{ platform }} --channel {{ channel }}";

/// Named template inputs.
#[derive(Debug, Clone, Default)]
pub struct Params(BTreeMap<&'static str, Value>);

impl Params {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: &'static str, value: impl Into<Value>) -> Self {
        self.set(key, value);
        self
    }

    pub fn set(&mut self, key: &'static str, value: impl Into<Value>) {
        self.0.insert(key, value.into());
    }

    pub fn contains(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }
}

pub struct TemplateEngine {
    env: Environment<'static>,
}

impl TemplateEngine {
    /// An engine with every built-in template registered.
    pub fn new() -> Self {
        let mut engine = Self::empty();

        for kind in TemplateKind::ALL {
            engine
                .env
                .add_template(kind.as_str(), kind.source())
                .expect("Error registering built-in template");
        }

        engine
    }

    /// An engine with no templates at all.
    pub fn empty() -> Self {
        let mut env = Environment::new();
        env.set_undefined_behavior(UndefinedBehavior::Strict);
        env.set_auto_escape_callback(|_| AutoEscape::None);
        Self { env }
    }

    /// Replaces the template used for `kind`.
    pub fn register(
        &mut self,
        kind: TemplateKind,
        source: impl Into<String>,
    ) -> Result<(), TemplateError> {
        self.env
            .add_template_owned(kind.as_str(), source.into())
            .map_err(|source| TemplateError::Register { kind, source })
    }

    pub fn render(&self, kind: TemplateKind, params: &Params) -> Result<String, TemplateError> {
        let template = self
            .env
            .get_template(kind.as_str())
            .map_err(|_| TemplateError::TemplateNotFound(kind.to_string()))?;

        if let Some(field) = kind
            .required()
            .iter()
            .copied()
            .find(|field| !params.contains(field))
        {
            return Err(TemplateError::MissingParameter { kind, field });
        }

        template
            .render(&params.0)
            .map_err(|source| TemplateError::Render { kind, source })
    }

    /// Same as [`render`](Self::render), with the kind given by name.
    pub fn render_named(&self, kind: &str, params: &Params) -> Result<String, TemplateError> {
        self.render(kind.parse()?, params)
    }
}

impl Default for TemplateEngine {
    fn default() -> Self {
        Self::new()
    }
}

/// Wraps a rendered line into the command tokens a worker executes.
pub fn shell_command(line: String) -> Vec<String> {
    vec!["/bin/bash".into(), "-c".into(), line]
}
