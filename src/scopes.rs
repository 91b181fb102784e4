//! Graph-wide permission scopes.

use std::collections::BTreeSet;

use crate::graph::TaskNode;

pub fn task_priority(level: impl std::fmt::Display) -> String {
    format!("queue:task-priority:{level}")
}

pub fn define_task(provisioner: &str, worker_type: &str) -> String {
    format!("queue:define-task:{provisioner}/{worker_type}")
}

pub fn create_task(provisioner: &str, worker_type: &str) -> String {
    format!("queue:create-task:{provisioner}/{worker_type}")
}

/// Computes the scopes the graph as a whole needs.
///
/// Every distinct (provisioner, worker type) pair contributes its define and
/// create scopes, every declared priority its priority scope, and each task's
/// explicit scopes are carried over because the queue requires the graph to
/// hold them. The result is a set: compare with subset semantics.
pub fn aggregate<'a>(tasks: impl IntoIterator<Item = &'a TaskNode>) -> BTreeSet<String> {
    let mut scopes = BTreeSet::new();
    let mut pairs = BTreeSet::new();

    for node in tasks {
        let task = &node.task;

        if pairs.insert((task.provisioner_id.as_str(), task.worker_type.as_str())) {
            scopes.insert(define_task(&task.provisioner_id, &task.worker_type));
            scopes.insert(create_task(&task.provisioner_id, &task.worker_type));
        }

        if let Some(priority) = task.priority {
            scopes.insert(task_priority(priority));
        }

        if let Some(extra) = &task.scopes {
            scopes.extend(extra.iter().cloned());
        }
    }

    scopes
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{Metadata, Payload, Priority, TaskDefinition, TaskId};

    fn node(provisioner: &str, worker: &str, priority: Option<Priority>) -> TaskNode {
        TaskNode {
            task_id: TaskId::new("id"),
            requires: vec![],
            task: TaskDefinition {
                provisioner_id: provisioner.into(),
                worker_type: worker.into(),
                priority,
                scopes: None,
                payload: Payload::default(),
                metadata: Metadata {
                    name: "task".into(),
                    description: String::new(),
                },
            },
        }
    }

    #[test]
    fn test_empty() {
        assert!(aggregate(std::iter::empty()).is_empty());
    }

    #[test]
    fn test_pairs_deduplicated() {
        let tasks = [
            node("aws-provisioner-v1", "opt-linux64", Some(Priority::High)),
            node("aws-provisioner-v1", "opt-linux64", Some(Priority::High)),
            node("null-provisioner", "human-decision", None),
        ];

        let scopes = aggregate(&tasks);
        let expected: BTreeSet<String> = [
            "queue:task-priority:high",
            "queue:define-task:aws-provisioner-v1/opt-linux64",
            "queue:create-task:aws-provisioner-v1/opt-linux64",
            "queue:define-task:null-provisioner/human-decision",
            "queue:create-task:null-provisioner/human-decision",
        ]
        .map(String::from)
        .into();

        assert_eq!(scopes, expected);
    }

    #[test]
    fn test_task_scopes_carried() {
        let mut task = node("scriptworker-prov-v1", "beetmoverworker-v1", None);
        task.task.scopes = Some(vec!["project:releng:beetmover:candidates".into()]);

        let scopes = aggregate([&task]);
        assert!(scopes.contains("project:releng:beetmover:candidates"));
        assert!(!scopes.iter().any(|scope| scope.starts_with("queue:task-priority")));
    }
}
