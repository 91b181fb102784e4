//! Human approval between a stage and its natural predecessors.

use crate::blueprint::{TaskSpec, Worker};
use crate::config::Configuration;
use crate::naming::Namer;

pub const GATE_WORKER: Worker = Worker::new("null-provisioner", "human-decision");

/// Stages that can wait on a human decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GateCategory {
    PushToReleases,
}

impl GateCategory {
    /// Whether the stage proceeds without a human in the loop.
    pub fn is_automatic(self, config: &Configuration) -> bool {
        match self {
            GateCategory::PushToReleases => config.features.push_to_releases_automatic,
        }
    }

    fn name(self, namer: &Namer<'_>) -> String {
        match self {
            GateCategory::PushToReleases => namer.push_to_releases_gate(),
        }
    }

    fn description(self) -> &'static str {
        match self {
            GateCategory::PushToReleases => "Approve pushing candidates to releases",
        }
    }
}

/// A human decision task. It has no command, the decision is taken outside.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GateNode {
    pub category: GateCategory,
    pub name: String,
    pub requires: Vec<String>,
}

impl GateNode {
    pub fn spec(&self) -> TaskSpec {
        TaskSpec::new(self.name.clone(), GATE_WORKER).description(self.category.description())
    }
}

/// Returns the gate to put in front of the stage, or `None` when the stage is
/// automatic. The gate takes over all of `predecessors`; the caller makes the
/// stage depend on the gate alone.
pub fn maybe_insert_gate(
    category: GateCategory,
    config: &Configuration,
    predecessors: &[String],
) -> Option<GateNode> {
    if category.is_automatic(config) {
        tracing::debug!(?category, "automatic, no gate");
        return None;
    }

    Some(GateNode {
        category,
        name: category.name(&Namer::new(config)),
        requires: predecessors.to_vec(),
    })
}
