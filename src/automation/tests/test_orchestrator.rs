// Tests for the polling loop: phase dispatch, ready check, stop and reset

use super::test_helpers::*;
use crate::automation::orchestrator::{AutomationOrchestrator, AutomationStatus};
use crate::automation::phase::{GamePhase, PhaseState, GAMEFLOW_PHASE_PATH};
use crate::automation::ready_check::{READY_CHECK_ACCEPT_PATH, READY_CHECK_PATH};
use crate::config::AutomationSettings;
use crate::lcu::tests::test_helpers::{
  empty_response, fast_policy, json_response, sample_credentials, spawn_gateway,
  FakeCredentialSource, FakeTransport, GatewayHarness,
};
use reqwest::Method;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::sleep;

fn harness() -> (Arc<FakeTransport>, GatewayHarness) {
  let transport = FakeTransport::new();
  let harness = spawn_gateway(
    transport.clone(),
    FakeCredentialSource::always(sample_credentials(5000, "t")),
    fast_policy(),
  );
  (transport, harness)
}

fn ready_check_routes(transport: &FakeTransport, player_response: &str) {
  transport.respond_json(Method::GET, GAMEFLOW_PHASE_PATH, json!("ReadyCheck"));
  transport.respond_json(
    Method::GET,
    READY_CHECK_PATH,
    json!({ "state": "InProgress", "playerResponse": player_response, "timer": 3.0 }),
  );
  transport.respond(Method::POST, READY_CHECK_ACCEPT_PATH, Ok(empty_response(204)));
}

fn auto_accept(delay_ms: u64) -> AutomationSettings {
  let mut settings = AutomationSettings::default();
  settings.auto_accept.enabled = true;
  settings.auto_accept.delay_ms = delay_ms;
  settings
}

#[cfg(test)]
mod ready_check_tests {
  use super::*;

  #[tokio::test(start_paused = true)]
  async fn test_accepts_once_per_ready_check() {
    let (transport, harness) = harness();
    ready_check_routes(&transport, "None");
    let (_settings_tx, settings_rx) = watch::channel(auto_accept(0));
    let mut orchestrator = AutomationOrchestrator::new(harness.gateway.clone(), settings_rx);
    let status = orchestrator.subscribe_status();

    for _ in 0..4 {
      orchestrator.cycle().await;
      sleep(Duration::from_secs(1)).await;
    }

    assert_eq!(
      transport.calls_to(&Method::POST, READY_CHECK_ACCEPT_PATH).len(),
      1
    );
    assert_eq!(*status.borrow(), AutomationStatus::Phase(GamePhase::ReadyCheck));
  }

  #[tokio::test(start_paused = true)]
  async fn test_accept_waits_for_delay() {
    let (transport, harness) = harness();
    ready_check_routes(&transport, "None");
    let (_settings_tx, settings_rx) = watch::channel(auto_accept(2000));
    let mut orchestrator = AutomationOrchestrator::new(harness.gateway.clone(), settings_rx);

    orchestrator.cycle().await;
    sleep(Duration::from_secs(1)).await;
    orchestrator.cycle().await;
    assert!(transport.calls_with_method(&Method::POST).is_empty());

    sleep(Duration::from_millis(1500)).await;
    orchestrator.cycle().await;
    assert_eq!(transport.calls_with_method(&Method::POST).len(), 1);
  }

  #[tokio::test(start_paused = true)]
  async fn test_answered_ready_check_is_left_alone() {
    let (transport, harness) = harness();
    ready_check_routes(&transport, "Declined");
    let (_settings_tx, settings_rx) = watch::channel(auto_accept(0));
    let mut orchestrator = AutomationOrchestrator::new(harness.gateway.clone(), settings_rx);

    orchestrator.cycle().await;
    orchestrator.cycle().await;
    assert!(transport.calls_with_method(&Method::POST).is_empty());
    assert_eq!(transport.calls_to(&Method::GET, READY_CHECK_PATH).len(), 1);
  }

  #[tokio::test(start_paused = true)]
  async fn test_disabled_auto_accept_never_reads_ready_check() {
    let (transport, harness) = harness();
    ready_check_routes(&transport, "None");
    let (_settings_tx, settings_rx) = watch::channel(AutomationSettings::default());
    let mut orchestrator = AutomationOrchestrator::new(harness.gateway.clone(), settings_rx);

    orchestrator.cycle().await;
    assert!(transport.calls_to(&Method::GET, READY_CHECK_PATH).is_empty());
  }

  /// A rejected accept is tried again on the next cycle, then never again.
  #[tokio::test(start_paused = true)]
  async fn test_failed_accept_is_retried() {
    let (transport, harness) = harness();
    ready_check_routes(&transport, "None");
    transport.respond(
      Method::POST,
      READY_CHECK_ACCEPT_PATH,
      Ok(json_response(500, &json!({ "message": "busy" }))),
    );
    let (_settings_tx, settings_rx) = watch::channel(auto_accept(0));
    let mut orchestrator = AutomationOrchestrator::new(harness.gateway.clone(), settings_rx);

    orchestrator.cycle().await;
    assert_eq!(transport.calls_with_method(&Method::POST).len(), 1);

    transport.respond(Method::POST, READY_CHECK_ACCEPT_PATH, Ok(empty_response(204)));
    sleep(Duration::from_secs(1)).await;
    orchestrator.cycle().await;
    sleep(Duration::from_secs(1)).await;
    orchestrator.cycle().await;
    assert_eq!(transport.calls_with_method(&Method::POST).len(), 2);
  }

  /// A second match found after a declined queue pop is accepted again.
  #[tokio::test(start_paused = true)]
  async fn test_new_ready_check_after_phase_change() {
    let (transport, harness) = harness();
    ready_check_routes(&transport, "None");
    let (_settings_tx, settings_rx) = watch::channel(auto_accept(0));
    let mut orchestrator = AutomationOrchestrator::new(harness.gateway.clone(), settings_rx);

    orchestrator.cycle().await;
    transport.respond_json(Method::GET, GAMEFLOW_PHASE_PATH, json!("Matchmaking"));
    orchestrator.cycle().await;
    transport.respond_json(Method::GET, GAMEFLOW_PHASE_PATH, json!("ReadyCheck"));
    orchestrator.cycle().await;

    assert_eq!(transport.calls_with_method(&Method::POST).len(), 2);
  }
}

#[cfg(test)]
mod loop_tests {
  use super::*;

  #[tokio::test(start_paused = true)]
  async fn test_champ_select_window_resets_with_phase() {
    let (transport, harness) = harness();
    transport.respond_json(Method::GET, GAMEFLOW_PHASE_PATH, json!("ChampSelect"));
    transport.respond_json(
      Method::GET,
      crate::automation::session::SESSION_PATH,
      local_pick_session(vec![]),
    );
    transport.respond(Method::PATCH, &action_path(10), Ok(empty_response(204)));
    let (_settings_tx, settings_rx) = watch::channel(automation_settings(vec![], vec![103]));
    let mut orchestrator = AutomationOrchestrator::new(harness.gateway.clone(), settings_rx);

    orchestrator.cycle().await;
    sleep(Duration::from_secs(1)).await;
    orchestrator.cycle().await;
    assert_eq!(transport.calls_with_method(&Method::PATCH).len(), 1);

    // Dodge: back to lobby, then a fresh champ select reusing the action id
    transport.respond_json(Method::GET, GAMEFLOW_PHASE_PATH, json!("Lobby"));
    orchestrator.cycle().await;
    transport.respond_json(Method::GET, GAMEFLOW_PHASE_PATH, json!("ChampSelect"));
    sleep(Duration::from_secs(1)).await;
    orchestrator.cycle().await;
    assert_eq!(transport.calls_with_method(&Method::PATCH).len(), 2);
  }

  /// A failed phase read mid champ select must not reopen the action window.
  #[tokio::test(start_paused = true)]
  async fn test_transient_phase_error_keeps_window() {
    let (transport, harness) = harness();
    transport.respond_json(Method::GET, GAMEFLOW_PHASE_PATH, json!("ChampSelect"));
    transport.respond_json(
      Method::GET,
      crate::automation::session::SESSION_PATH,
      local_pick_session(vec![]),
    );
    transport.respond(Method::PATCH, &action_path(10), Ok(empty_response(204)));
    let mut settings = automation_settings(vec![], vec![103]);
    // Hover only, so the turn stays in progress after the submission
    settings.auto_pick.lock_in = false;
    let (_settings_tx, settings_rx) = watch::channel(settings);
    let mut orchestrator = AutomationOrchestrator::new(harness.gateway.clone(), settings_rx);
    let status = orchestrator.subscribe_status();

    orchestrator.cycle().await;
    assert_eq!(transport.calls_with_method(&Method::PATCH).len(), 1);

    transport.respond(
      Method::GET,
      GAMEFLOW_PHASE_PATH,
      Ok(json_response(500, &json!({ "message": "internal" }))),
    );
    sleep(Duration::from_secs(1)).await;
    orchestrator.cycle().await;
    assert!(matches!(*status.borrow(), AutomationStatus::Unavailable(_)));

    transport.respond_json(Method::GET, GAMEFLOW_PHASE_PATH, json!("ChampSelect"));
    for _ in 0..3 {
      sleep(Duration::from_secs(1)).await;
      orchestrator.cycle().await;
    }
    assert_eq!(transport.calls_with_method(&Method::PATCH).len(), 1);
  }

  #[tokio::test(start_paused = true)]
  async fn test_huge_countdown_does_not_break_cycle() {
    let (transport, harness) = harness();
    transport.respond_json(Method::GET, GAMEFLOW_PHASE_PATH, json!("ChampSelect"));
    transport.respond_json(
      Method::GET,
      crate::automation::session::SESSION_PATH,
      local_pick_session(vec![]),
    );
    let mut settings = automation_settings(vec![], vec![103]);
    settings.auto_pick.countdown_secs = 1e20;
    let (_settings_tx, settings_rx) = watch::channel(settings);
    let mut orchestrator = AutomationOrchestrator::new(harness.gateway.clone(), settings_rx);
    let status = orchestrator.subscribe_status();

    orchestrator.cycle().await;
    sleep(Duration::from_secs(1)).await;
    orchestrator.cycle().await;
    assert_eq!(*status.borrow(), AutomationStatus::Phase(GamePhase::ChampSelect));
    assert!(transport.calls_with_method(&Method::PATCH).is_empty());
  }

  #[tokio::test(start_paused = true)]
  async fn test_errors_do_not_stop_the_loop() {
    let (transport, harness) = harness();
    // No phase route yet: every read is rejected with 404
    let (_settings_tx, settings_rx) = watch::channel(AutomationSettings::default());
    let mut orchestrator = AutomationOrchestrator::new(harness.gateway.clone(), settings_rx);
    let status = orchestrator.subscribe_status();
    let stop = orchestrator.stop_token();

    let handle = tokio::spawn(async move {
      orchestrator.run().await;
      orchestrator
    });

    sleep(Duration::from_millis(2500)).await;
    assert!(matches!(*status.borrow(), AutomationStatus::Unavailable(_)));

    transport.respond_json(Method::GET, GAMEFLOW_PHASE_PATH, json!("Lobby"));
    sleep(Duration::from_millis(2500)).await;
    assert_eq!(*status.borrow(), AutomationStatus::Phase(GamePhase::Lobby));

    stop.cancel();
    let orchestrator = handle.await.unwrap();
    assert_eq!(*status.borrow(), AutomationStatus::Stopped);
    assert_eq!(orchestrator.phase_state(), PhaseState::default());
    assert!(transport.calls_to(&Method::GET, GAMEFLOW_PHASE_PATH).len() >= 3);
  }

  #[tokio::test(start_paused = true)]
  async fn test_stop_exits_promptly_during_wait() {
    let (transport, harness) = harness();
    transport.respond_json(Method::GET, GAMEFLOW_PHASE_PATH, json!("Lobby"));
    let mut settings = AutomationSettings::default();
    settings.poll_interval_ms = 60_000;
    let (_settings_tx, settings_rx) = watch::channel(settings);
    let mut orchestrator = AutomationOrchestrator::new(harness.gateway.clone(), settings_rx);
    let stop = orchestrator.stop_token();

    let handle = tokio::spawn(async move { orchestrator.run().await });
    sleep(Duration::from_millis(500)).await;
    stop.cancel();

    let stopped = tokio::time::timeout(Duration::from_secs(1), handle).await;
    assert!(stopped.is_ok());
    assert_eq!(transport.calls().len(), 1);
  }

  #[tokio::test(start_paused = true)]
  async fn test_settings_changes_apply_next_cycle() {
    let (transport, harness) = harness();
    ready_check_routes(&transport, "None");
    let (settings_tx, settings_rx) = watch::channel(AutomationSettings::default());
    let mut orchestrator = AutomationOrchestrator::new(harness.gateway.clone(), settings_rx);

    orchestrator.cycle().await;
    assert!(transport.calls_with_method(&Method::POST).is_empty());

    settings_tx.send_replace(auto_accept(0));
    orchestrator.cycle().await;
    assert_eq!(transport.calls_with_method(&Method::POST).len(), 1);
  }
}
