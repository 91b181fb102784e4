use std::collections::BTreeSet;

use releasegraph::{Configuration, Graph, compile};
use serde_json::{Value, json};

const PUSH: &str = "release-mozilla-beta_firefox_push_to_releases";
const GATE: &str = "release-mozilla-beta_firefox_push_to_releases_human_decision";

fn config(automatic: bool, partner_repacks: &[&str]) -> Configuration {
    let document = json!({
        "branch": "mozilla-beta",
        "repo_path": "releases/mozilla-beta",
        "product": "firefox",
        "version": "42.0b2",
        "build_number": 3,
        "checksums_enabled": true,
        "updates_enabled": true,
        "push_to_candidates_enabled": true,
        "push_to_releases_enabled": true,
        "push_to_releases_automatic": automatic,
        "release_channels": ["beta", "release"],
        "final_verify_channels": ["beta", "release"],
        "partner_repacks_platforms": partner_repacks,
        "partial_updates": [
            { "version": "38.0", "build_number": 1 },
            { "version": "37.0", "build_number": 2 }
        ],
        "en_US_config": {
            "platforms": {
                "macosx64": { "task_id": "xyz" },
                "win32": { "task_id": "xyy" }
            }
        },
        "l10n_config": {
            "platforms": {
                "win32": {
                    "en_us_binary_url": "https://queue.taskcluster.net/something/firefox.exe",
                    "locales": ["de", "en-GB", "zh-TW"],
                    "chunks": 1
                },
                "macosx64": {
                    "en_us_binary_url": "https://queue.taskcluster.net/something/firefox.tar.xz",
                    "locales": ["de", "en-GB", "zh-TW"],
                    "chunks": 1
                }
            },
            "changesets": { "de": "default", "en-GB": "default", "zh-TW": "default" }
        }
    });

    Configuration::from_json_str(&document.to_string()).unwrap()
}

fn wire(graph: &Graph, name: &str) -> Option<Value> {
    let value: Value = serde_json::from_str(&graph.to_json().unwrap()).unwrap();
    value["tasks"]
        .as_array()
        .unwrap()
        .iter()
        .find(|task| task["task"]["metadata"]["name"] == name)
        .cloned()
}

fn command(graph: &Graph, name: &str) -> String {
    graph
        .task_by_name(name)
        .unwrap()
        .task
        .payload
        .command
        .as_ref()
        .unwrap()
        .join("")
}

/// Every upload to candidates plus the checksums task, by name.
fn expected_predecessors() -> BTreeSet<String> {
    let mut names = BTreeSet::new();

    for platform in ["macosx64", "win32"] {
        names.insert(format!(
            "release-mozilla-beta_firefox_{platform}_complete_en-US_beetmover_candidates"
        ));
        names.insert(format!(
            "release-mozilla-beta_firefox_{platform}_l10n_repack_beetmover_candidates_1"
        ));

        for (version, build) in [("38.0", 1), ("37.0", 2)] {
            names.insert(format!(
                "release-mozilla-beta_firefox_{platform}_partial_en-US_{version}build{build}_beetmover_candidates"
            ));
            names.insert(format!(
                "release-mozilla-beta_firefox_{platform}_l10n_repack_partial_{version}build{build}_beetmover_candidates_1"
            ));
        }
    }

    names.insert("release-mozilla-beta-firefox_chcksms".into());
    names
}

fn assert_graph_scopes(graph: &Graph) {
    for scope in [
        "queue:task-priority:high",
        "queue:define-task:aws-provisioner-v1/opt-linux64",
        "queue:create-task:aws-provisioner-v1/opt-linux64",
    ] {
        assert!(graph.scopes().contains(scope), "missing {scope}");
    }

    for task in graph.tasks() {
        let pair = format!("{}/{}", task.task.provisioner_id, task.task.worker_type);
        assert!(graph.scopes().contains(&format!("queue:define-task:{pair}")));
        assert!(graph.scopes().contains(&format!("queue:create-task:{pair}")));
    }
}

#[test]
fn human_decision_gates_push() {
    let graph = compile(&config(false, &["win32", "macosx64"])).unwrap();

    let gate = graph.task_by_name(GATE).unwrap();
    assert_eq!(gate.task.provisioner_id, "null-provisioner");
    assert_eq!(gate.task.worker_type, "human-decision");
    assert!(gate.task.payload.command.is_none());

    let push = graph.task_by_name(PUSH).unwrap();
    assert_eq!(push.task.provisioner_id, "aws-provisioner-v1");
    assert_eq!(push.task.worker_type, "opt-linux64");
    assert_eq!(push.requires, std::slice::from_ref(&gate.task_id));

    let gate_requires: BTreeSet<String> = graph
        .requires_names(GATE)
        .unwrap()
        .into_iter()
        .map(String::from)
        .collect();
    assert_eq!(gate.requires.len(), 13);
    assert_eq!(gate_requires, expected_predecessors());

    assert_graph_scopes(&graph);
}

#[test]
fn push_omits_scopes_key() {
    for automatic in [false, true] {
        let graph = compile(&config(automatic, &["win32", "macosx64"])).unwrap();
        let push = wire(&graph, PUSH).unwrap();
        assert!(push["task"].get("scopes").is_none());

        let checksums = wire(&graph, "release-mozilla-beta-firefox_chcksms").unwrap();
        assert_eq!(checksums["task"]["scopes"], json!([]));
    }
}

#[test]
fn automatic_push_has_no_gate() {
    let graph = compile(&config(true, &["win32", "macosx64"])).unwrap();

    assert!(graph.task_by_name(GATE).is_none());
    assert!(wire(&graph, GATE).is_none());

    let requires: BTreeSet<String> = graph
        .requires_names(PUSH)
        .unwrap()
        .into_iter()
        .map(String::from)
        .collect();
    assert_eq!(requires, expected_predecessors());

    assert_graph_scopes(&graph);
}

#[test]
fn version_and_build_number_in_command() {
    for automatic in [false, true] {
        let graph = compile(&config(automatic, &["win32", "macosx64"])).unwrap();
        let command = command(&graph, PUSH);

        assert!(command.contains("--version 42.0b2"));
        assert!(command.contains("--build-number 3"));
    }
}

#[test]
fn exclusions_with_partner_repacks() {
    let graph = compile(&config(true, &["win32", "macosx64"])).unwrap();
    let command = command(&graph, PUSH);

    assert!(command.contains("--exclude '.*-EME-free/.*'"));
    assert!(command.contains("--exclude '.*/win32-sha1/.*'"));
    assert!(command.find("EME-free") < command.find("win32-sha1"));
}

#[test]
fn custom_exclusions_keep_declared_order() {
    let mut config = config(true, &["win32"]);
    config.push_to_releases_exclusions = vec![
        ".*/partner-b/.*".to_string(),
        ".*-EME-free/.*".to_string(),
        ".*/funnelcake/.*".to_string(),
    ];
    config.validate().unwrap();

    let graph = compile(&config).unwrap();
    let command = command(&graph, PUSH);

    assert!(command.ends_with(
        "--build-number 3 --exclude '.*/partner-b/.*' --exclude '.*-EME-free/.*' --exclude '.*/funnelcake/.*'"
    ));
    assert!(!command.contains("win32-sha1"));
}

#[test]
fn no_exclusions_without_partner_repacks() {
    let graph = compile(&config(true, &[])).unwrap();
    let command = command(&graph, PUSH);

    assert!(!command.contains("--exclude '.*-EME-free/.*'"));
    assert!(!command.contains("--exclude '.*/win32-sha1/.*'"));
    assert!(graph.names().all(|name| !name.ends_with("_partner_repack")));
}

#[test]
fn partner_repacks_follow_push() {
    let graph = compile(&config(false, &["win32", "macosx64"])).unwrap();

    for platform in ["win32", "macosx64"] {
        let name = format!("release-mozilla-beta_firefox_{platform}_partner_repack");
        assert_eq!(graph.requires_names(&name).unwrap(), [PUSH]);
        assert_eq!(
            graph.task_by_name(&name).unwrap().task.scopes,
            Some(vec!["project:releng:partner-repack".to_string()])
        );
    }
}

#[test]
fn compiling_twice_is_stable() {
    let config = config(false, &["win32", "macosx64"]);
    let first = compile(&config).unwrap();
    let second = compile(&config).unwrap();

    assert_eq!(
        first.names().collect::<Vec<_>>(),
        second.names().collect::<Vec<_>>()
    );
    for name in first.names() {
        assert_eq!(first.requires_names(name), second.requires_names(name));
    }
    assert_eq!(first.scopes(), second.scopes());
}
