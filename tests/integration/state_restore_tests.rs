//! Integration tests for execution state continuity across sessions that
//! share a session id.

use std::sync::Arc;

use agent_session::models::agent::Agent;
use agent_session::models::state::{AgentState, ExecutionState};
use agent_session::orchestrator::AgentSession;
use agent_session::persistence::{db, MemoryStateStore, SqliteStateStore, StateStore};

use super::test_helpers::{
    start_session, state_at, test_config, Failures, Recording, RECORDING,
};

#[tokio::test]
async fn restarted_session_reports_iteration_at_close() {
    let dir = tempfile::tempdir().expect("tempdir");
    let config = test_config(dir.path(), None);
    let store: Arc<dyn StateStore> = Arc::new(MemoryStateStore::new());

    let mut first = AgentSession::new("s1", Arc::clone(&store));
    start_session(&mut first, "local", &config)
        .await
        .expect("first start");
    first
        .controller_mut()
        .expect("controller")
        .set_initial_state(state_at("s1", 4), 10, false);
    first.close().await;

    let mut second = AgentSession::new("s1", Arc::clone(&store));
    start_session(&mut second, "local", &config)
        .await
        .expect("second start");

    let state = second.controller().expect("controller").get_state();
    assert_eq!(state.iteration, 4);
    assert_eq!(state.agent_state, AgentState::Loading);
    assert_eq!(state.resume_state, Some(AgentState::Running));
    second.close().await;
}

#[tokio::test]
async fn missing_state_starts_fresh() {
    let dir = tempfile::tempdir().expect("tempdir");
    let config = test_config(dir.path(), None);
    let mut session = AgentSession::new("s1", Arc::new(MemoryStateStore::new()));

    start_session(&mut session, "local", &config)
        .await
        .expect("start");

    let state = session.controller().expect("controller").get_state();
    assert_eq!(state.iteration, 0);
    assert_eq!(state.resume_state, None);
}

#[tokio::test]
async fn corrupted_state_starts_fresh() {
    let dir = tempfile::tempdir().expect("tempdir");
    let config = test_config(dir.path(), None);
    let store = MemoryStateStore::new();
    store.save("s1", b"{ not json".to_vec()).await.expect("seed");
    let mut session = AgentSession::new("s1", Arc::new(store));

    start_session(&mut session, "local", &config)
        .await
        .expect("start despite corruption");

    assert_eq!(
        session.controller().expect("controller").get_state().iteration,
        0
    );
}

#[tokio::test]
async fn unavailable_store_does_not_block_start() {
    let recording = Recording::new(Failures {
        store_restore: true,
        ..Failures::default()
    });
    let dir = tempfile::tempdir().expect("tempdir");
    let config = test_config(dir.path(), None);
    let mut session = recording.session("s1");

    start_session(&mut session, RECORDING, &config)
        .await
        .expect("start");

    assert!(session.controller().is_some());
    assert_eq!(recording.log.position("controller.set_initial_state"), None);
}

#[tokio::test]
async fn restored_state_cannot_bypass_current_limits() {
    let dir = tempfile::tempdir().expect("tempdir");
    let config = test_config(dir.path(), None);
    let store = MemoryStateStore::new();
    let mut saved = ExecutionState::new("s1", 500, true);
    saved.iteration = 3;
    store
        .save("s1", saved.to_bytes().expect("encode"))
        .await
        .expect("seed");
    let mut session = AgentSession::new("s1", Arc::new(store));

    start_session(&mut session, "local", &config)
        .await
        .expect("start");

    let state = session.controller().expect("controller").get_state();
    assert_eq!(state.iteration, 3);
    assert_eq!(state.max_iterations, 10);
    assert!(!state.confirmation_mode);
}

#[tokio::test]
async fn restore_is_keyed_by_session_not_agent() {
    let dir = tempfile::tempdir().expect("tempdir");
    let config = test_config(dir.path(), None);
    let store: Arc<dyn StateStore> = Arc::new(MemoryStateStore::new());

    let mut first = AgentSession::new("s1", Arc::clone(&store));
    start_session(&mut first, "local", &config)
        .await
        .expect("first start");
    first
        .controller_mut()
        .expect("controller")
        .set_initial_state(state_at("s1", 2), 10, false);
    first.close().await;

    let other_agent = Arc::new(Agent::new("BrowsingAgent", vec![], config.llm.clone()));
    let mut second = AgentSession::new("s1", Arc::clone(&store));
    second
        .start("local", Arc::clone(&config), other_agent, 10, None, None)
        .await
        .expect("second start");

    assert_eq!(
        second.controller().expect("controller").get_state().iteration,
        2
    );

    let mut unrelated = AgentSession::new("s2", Arc::clone(&store));
    start_session(&mut unrelated, "local", &config)
        .await
        .expect("unrelated start");
    assert_eq!(
        unrelated.controller().expect("controller").get_state().iteration,
        0
    );
}

#[tokio::test]
async fn sqlite_store_carries_state_across_sessions() {
    let dir = tempfile::tempdir().expect("tempdir");
    let config = test_config(dir.path(), None);
    let pool = db::connect(&dir.path().join("state.db")).await.expect("db");
    let store: Arc<dyn StateStore> = Arc::new(SqliteStateStore::new(Arc::new(pool)));

    let mut first = AgentSession::new("s1", Arc::clone(&store));
    start_session(&mut first, "local", &config)
        .await
        .expect("first start");
    first
        .controller_mut()
        .expect("controller")
        .set_initial_state(state_at("s1", 9), 10, false);
    first.close().await;

    let mut second = AgentSession::new("s1", Arc::clone(&store));
    start_session(&mut second, "local", &config)
        .await
        .expect("second start");

    let state = second.controller().expect("controller").get_state();
    assert_eq!(state.iteration, 9);
    assert_eq!(state.remaining_iterations(), 1);
}

#[tokio::test]
async fn failed_save_does_not_skip_controller_close() {
    let recording = Recording::new(Failures {
        store_save: true,
        ..Failures::default()
    });
    let dir = tempfile::tempdir().expect("tempdir");
    let config = test_config(dir.path(), None);
    let mut session = recording.session("s1");
    start_session(&mut session, RECORDING, &config)
        .await
        .expect("start");

    session.close().await;

    assert!(session.is_closed());
    assert!(recording.log.position("store.save").is_some());
    assert_eq!(
        recording.log.closes(),
        vec!["controller.close", "runtime.close"]
    );
}
