use std::collections::HashMap;

use petgraph::Graph as Arena;
use petgraph::algo::toposort;
use petgraph::graph::NodeIndex;

use crate::error::CompileError;
use crate::graph::{Graph, Metadata, Payload, Priority, TaskDefinition, TaskId, TaskNode};
use crate::ids::IdAllocator;
use crate::scopes;

/// A provisioner and worker type pair tasks are scheduled on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Worker {
    pub provisioner: &'static str,
    pub worker_type: &'static str,
}

impl Worker {
    pub const fn new(provisioner: &'static str, worker_type: &'static str) -> Self {
        Self {
            provisioner,
            worker_type,
        }
    }
}

/// Everything about a task except its identity and its edges.
#[derive(Debug, Clone)]
pub struct TaskSpec {
    pub name: String,
    pub description: String,
    pub worker: Worker,
    pub priority: Option<Priority>,
    pub scopes: Option<Vec<String>>,
    pub command: Option<Vec<String>>,
    pub max_run_time: Option<u32>,
}

impl TaskSpec {
    pub fn new(name: String, worker: Worker) -> Self {
        Self {
            name,
            description: String::new(),
            worker,
            priority: None,
            scopes: None,
            command: None,
            max_run_time: None,
        }
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn priority(mut self, priority: Priority) -> Self {
        self.priority = Some(priority);
        self
    }

    /// Explicit scopes. An empty list is kept and serialized as such.
    pub fn scopes(mut self, scopes: Vec<String>) -> Self {
        self.scopes = Some(scopes);
        self
    }

    pub fn command(mut self, command: Vec<String>) -> Self {
        self.command = Some(command);
        self
    }

    pub fn max_run_time(mut self, seconds: u32) -> Self {
        self.max_run_time = Some(seconds);
        self
    }

    fn into_node(self, task_id: TaskId, requires: Vec<TaskId>) -> TaskNode {
        TaskNode {
            task_id,
            requires,
            task: TaskDefinition {
                provisioner_id: self.worker.provisioner.into(),
                worker_type: self.worker.worker_type.into(),
                priority: self.priority,
                scopes: self.scopes,
                payload: Payload {
                    command: self.command,
                    max_run_time: self.max_run_time,
                },
                metadata: Metadata {
                    name: self.name,
                    description: self.description,
                },
            },
        }
    }
}

/// The graph under construction.
///
/// Tasks live in an arena and are addressed by [`NodeIndex`]; a side table maps
/// every registered name to its handle. A task can only depend on handles that
/// already exist, so the arena is acyclic by construction. Once every stage is
/// done, [`finish`](Self::finish) freezes it into an immutable [`Graph`].
pub struct Blueprint<'a> {
    arena: Arena<TaskNode, ()>,
    names: HashMap<String, NodeIndex>,
    ids: &'a mut dyn IdAllocator,
}

impl<'a> Blueprint<'a> {
    pub fn new(ids: &'a mut dyn IdAllocator) -> Self {
        Self {
            arena: Arena::new(),
            names: HashMap::new(),
            ids,
        }
    }

    pub fn len(&self) -> usize {
        self.arena.node_count()
    }

    pub fn is_empty(&self) -> bool {
        self.arena.node_count() == 0
    }

    pub fn lookup(&self, name: &str) -> Option<NodeIndex> {
        self.names.get(name).copied()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.names.contains_key(name)
    }

    pub fn task(&self, handle: NodeIndex) -> &TaskNode {
        &self.arena[handle]
    }

    /// Registers a task downstream of `requires`.
    pub fn add_task(
        &mut self,
        spec: TaskSpec,
        requires: &[NodeIndex],
    ) -> Result<NodeIndex, CompileError> {
        if self.names.contains_key(&spec.name) {
            return Err(CompileError::DuplicateTask(spec.name));
        }

        let task_id = self.ids.allocate(&spec.name);
        let upstream = requires
            .iter()
            .map(|&handle| self.arena[handle].task_id.clone())
            .collect();

        let name = spec.name.clone();
        let index = self.arena.add_node(spec.into_node(task_id, upstream));

        for &dependency in requires {
            self.arena.add_edge(dependency, index, ());
        }

        tracing::debug!(task = %name, requires = requires.len(), "registered task");
        self.names.insert(name, index);

        Ok(index)
    }

    pub fn finish(self) -> Result<Graph, CompileError> {
        toposort(&self.arena, None)
            .map_err(|cycle| CompileError::Cycle(self.arena[cycle.node_id()].name().to_string()))?;

        let (nodes, _) = self.arena.into_nodes_edges();
        let tasks: Vec<TaskNode> = nodes.into_iter().map(|node| node.weight).collect();
        let scopes = scopes::aggregate(&tasks);

        Ok(Graph::new(tasks, scopes))
    }
}
