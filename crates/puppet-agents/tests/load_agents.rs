//! Integration tests for loading a directory of agent definition files.

#![allow(clippy::unwrap_used)]

use std::path::PathBuf;

use puppet_agents::{AgentError, MemoryLimits, load_agent_dir};
use puppet_types::AgentId;

fn scratch_dir() -> PathBuf {
    let dir = std::env::temp_dir().join(format!("puppet-agents-{}", uuid::Uuid::now_v7()));
    std::fs::create_dir_all(&dir).unwrap();
    dir
}

#[test]
fn bad_files_are_skipped_and_good_ones_load() {
    let dir = scratch_dir();
    std::fs::write(
        dir.join("a_claudia.json"),
        r#"{ "id": "claudia", "name": "Claudia", "initialMemory": { "coreMemories": ["poet"] } }"#,
    )
    .unwrap();
    std::fs::write(dir.join("b_broken.json"), "{ not json").unwrap();
    std::fs::write(dir.join("c_nameless.json"), r#"{ "id": "nameless" }"#).unwrap();
    std::fs::write(
        dir.join("d_duplicate.json"),
        r#"{ "id": "claudia", "name": "Other Claudia" }"#,
    )
    .unwrap();
    std::fs::write(
        dir.join("e_bob.json"),
        r#"{ "id": "bob", "name": "Bob", "isActive": false }"#,
    )
    .unwrap();
    std::fs::write(dir.join("notes.txt"), "ignored").unwrap();

    let report = load_agent_dir(&dir, MemoryLimits::default()).unwrap();

    let ids: Vec<AgentId> = report.agents.iter().map(|a| a.id.clone()).collect();
    assert_eq!(ids, vec![AgentId::new("claudia"), AgentId::new("bob")]);
    assert_eq!(report.agents.first().unwrap().name, "Claudia");
    assert!(!report.agents.last().unwrap().is_active);

    assert_eq!(report.failures.len(), 3);
    assert!(
        report
            .failures
            .iter()
            .any(|(_, err)| matches!(err, AgentError::Json { .. }))
    );

    std::fs::remove_dir_all(&dir).unwrap();
}

#[test]
fn missing_directory_is_an_io_error() {
    let dir = std::env::temp_dir().join("puppet-agents-does-not-exist-4b1d");
    let err = load_agent_dir(&dir, MemoryLimits::default()).unwrap_err();
    assert!(matches!(err, AgentError::Io { .. }));
}
