//! The compiled task graph and its wire shape.
//!
//! A [`Graph`] is produced once by the [`Blueprint`](crate::blueprint::Blueprint)
//! and never changes afterwards. Tasks refer to each other by [`TaskId`] only,
//! names stay the stable handle for humans and tests.

use std::collections::{BTreeSet, HashMap};
use std::fmt;

use serde::Serialize;

/// Opaque task identifier handed to the queue.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct TaskId(String);

impl TaskId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Highest,
    High,
    Medium,
    Low,
    Lowest,
}

impl Priority {
    pub fn as_str(self) -> &'static str {
        match self {
            Priority::Highest => "highest",
            Priority::High => "high",
            Priority::Medium => "medium",
            Priority::Low => "low",
            Priority::Lowest => "lowest",
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One unit of work, serialized the way the queue expects it.
#[derive(Debug, Clone, Serialize)]
pub struct TaskNode {
    #[serde(rename = "taskId")]
    pub task_id: TaskId,
    pub requires: Vec<TaskId>,
    pub task: TaskDefinition,
}

impl TaskNode {
    pub fn name(&self) -> &str {
        &self.task.metadata.name
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskDefinition {
    pub provisioner_id: String,
    pub worker_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub priority: Option<Priority>,
    /// `None` leaves the key out entirely, which the queue reads as "no
    /// override". `Some(vec![])` explicitly asks for no scopes.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scopes: Option<Vec<String>>,
    pub payload: Payload,
    pub metadata: Metadata,
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Payload {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub command: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_run_time: Option<u32>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Metadata {
    pub name: String,
    pub description: String,
}

/// The compiled release graph.
#[derive(Debug, Clone, Serialize)]
pub struct Graph {
    scopes: BTreeSet<String>,
    tasks: Vec<TaskNode>,
    #[serde(skip)]
    by_name: HashMap<String, usize>,
    #[serde(skip)]
    by_id: HashMap<TaskId, usize>,
}

impl Graph {
    pub(crate) fn new(tasks: Vec<TaskNode>, scopes: BTreeSet<String>) -> Self {
        let by_name = tasks
            .iter()
            .enumerate()
            .map(|(index, task)| (task.name().to_string(), index))
            .collect();

        let by_id = tasks
            .iter()
            .enumerate()
            .map(|(index, task)| (task.task_id.clone(), index))
            .collect();

        Self {
            scopes,
            tasks,
            by_name,
            by_id,
        }
    }

    /// Tasks in the order they were compiled.
    pub fn tasks(&self) -> &[TaskNode] {
        &self.tasks
    }

    pub fn scopes(&self) -> &BTreeSet<String> {
        &self.scopes
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.tasks.iter().map(TaskNode::name)
    }

    pub fn task_by_name(&self, name: &str) -> Option<&TaskNode> {
        self.by_name.get(name).map(|&index| &self.tasks[index])
    }

    pub fn task_by_id(&self, id: &TaskId) -> Option<&TaskNode> {
        self.by_id.get(id).map(|&index| &self.tasks[index])
    }

    /// Upstream task names of `name`, in `requires` order.
    pub fn requires_names(&self, name: &str) -> Option<Vec<&str>> {
        let task = self.task_by_name(name)?;

        task.requires
            .iter()
            .map(|id| self.task_by_id(id).map(TaskNode::name))
            .collect()
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    pub fn to_json_pretty(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

/// Renders the graph as a mermaid flowchart.
impl fmt::Display for Graph {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "graph LR")?;

        for (index, task) in self.tasks.iter().enumerate() {
            let name = task.name().replace('"', "\\\"");
            writeln!(f, "    {index}[\"{name}\"]")?;
        }

        for (index, task) in self.tasks.iter().enumerate() {
            for id in &task.requires {
                if let Some(&source) = self.by_id.get(id) {
                    writeln!(f, "    {source} --> {index}")?;
                }
            }
        }

        Ok(())
    }
}
