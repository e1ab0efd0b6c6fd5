//! End-to-end tests for the modem handle
//!
//! These tests run the full actor against simulated collaborators on a
//! paused clock:
//! - Bring-up to carrier and tear-down back to idle
//! - Synchronous queries and their refusal outside steady states
//! - Deregistration and redial
//! - Event queue overflow, suspend ordering and suspend timeouts

use std::sync::Arc;
use std::time::Duration;

use modem_cellular::{
    ChatError, ModemConfig, ModemError, ModemEvent, ModemInfoType, ModemState, SignalType,
};
use modem_chat::{scripts, AccessTechnology, MatchHandler, RegistrationStatus, ScriptResult};
use modem_sim::{Completion, SimModem, SimModemOptions, SimResponse};

// ============================================================================
// Helper Functions
// ============================================================================

mod helpers {
    use super::*;

    pub const BRING_UP_BOUND: Duration = Duration::from_secs(60);

    pub fn sim() -> SimModem {
        SimModem::spawn(ModemConfig::default(), SimModemOptions::default())
    }

    pub async fn bring_up(sim: &SimModem) {
        sim.modem.resume();
        sim.modem
            .wait_for_state(ModemState::CarrierOn, BRING_UP_BOUND)
            .await
            .unwrap();
    }
}

// ============================================================================
// Lifecycle Tests
// ============================================================================

mod lifecycle_tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn round_trip_keeps_config_and_caches() {
        let sim = helpers::sim();
        let config_before = sim.modem.config().clone();

        helpers::bring_up(&sim).await;
        assert!(sim.parts.link.has_carrier());
        assert_eq!(
            sim.modem.registration_status(AccessTechnology::Lte),
            RegistrationStatus::RegisteredHome
        );

        sim.modem.suspend().await.unwrap();
        assert_eq!(sim.modem.state(), ModemState::Idle);
        assert_eq!(sim.modem.config(), &config_before);
        assert_eq!(sim.modem.modem_info(ModemInfoType::Imei), "350457790000001");
        assert_eq!(
            sim.modem.modem_info(ModemInfoType::Manufacturer),
            "modem-sim"
        );

        // A second bring-up works from the same handle
        helpers::bring_up(&sim).await;
        assert_eq!(sim.parts.link.carrier_on_count(), 2);
        assert_eq!(sim.parts.chat.violations(), 0);
        sim.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn delayed_collaborators_still_bring_up() {
        let options = SimModemOptions {
            completion: Completion::Delayed(Duration::from_millis(20)),
            ..SimModemOptions::default()
        };
        let sim = SimModem::spawn(ModemConfig::default(), options);
        helpers::bring_up(&sim).await;
        sim.modem.suspend().await.unwrap();
        sim.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn modem_without_lines_brings_up() {
        let options = SimModemOptions {
            power_line: false,
            reset_line: false,
            ..SimModemOptions::default()
        };
        let sim = SimModem::spawn(ModemConfig::default(), options);
        helpers::bring_up(&sim).await;
        sim.modem.suspend().await.unwrap();
        assert_eq!(sim.modem.state(), ModemState::Idle);
        sim.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn suspend_while_idle_returns_at_once() {
        let sim = helpers::sim();
        tokio::time::timeout(Duration::from_millis(10), sim.modem.suspend())
            .await
            .unwrap()
            .unwrap();
        sim.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn suspend_waits_for_queued_resume_to_unwind() {
        let sim = helpers::sim();
        sim.modem.resume();
        sim.modem.suspend().await.unwrap();

        // The resume was handled before the suspend that followed it
        assert_eq!(sim.modem.state(), ModemState::Idle);
        let power = sim.parts.power.as_ref().unwrap();
        assert_eq!(power.history(), vec![true, false]);
        assert!(!power.is_active());
        sim.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn suspend_right_after_spawn_waits_for_actor() {
        let sim = helpers::sim();
        sim.modem.suspend().await.unwrap();
        sim.modem.resume();
        sim.modem.suspend().await.unwrap();

        assert_eq!(sim.modem.state(), ModemState::Idle);
        assert_eq!(sim.parts.power.as_ref().unwrap().pulse_count(), 1);
        sim.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn suspend_timeout_reports_state() {
        let config = ModemConfig {
            suspend_timeout_ms: 1_000,
            ..Default::default()
        };
        let sim = SimModem::spawn(config, SimModemOptions::default());
        helpers::bring_up(&sim).await;

        let err = sim.modem.suspend().await.unwrap_err();
        assert!(matches!(
            err,
            ModemError::SuspendTimeout {
                timeout_ms: 1_000,
                ..
            }
        ));

        // Tear-down carries on in the background
        sim.modem
            .wait_for_state(ModemState::Idle, Duration::from_secs(30))
            .await
            .unwrap();
        sim.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn deregistration_redials() {
        let sim = helpers::sim();
        helpers::bring_up(&sim).await;

        sim.modem.events().post(ModemEvent::Deregistered);
        sim.modem
            .wait_for_state(ModemState::RunDialScript, Duration::from_secs(1))
            .await
            .unwrap();
        assert!(!sim.parts.link.has_carrier());

        sim.modem
            .wait_for_state(ModemState::CarrierOn, helpers::BRING_UP_BOUND)
            .await
            .unwrap();
        assert_eq!(sim.parts.link.carrier_on_count(), 2);
        let dials = sim
            .parts
            .chat
            .async_runs()
            .iter()
            .filter(|name| name.as_str() == scripts::DIAL_SCRIPT)
            .count();
        assert_eq!(dials, 2);
        sim.shutdown().await;
    }
}

// ============================================================================
// Query Tests
// ============================================================================

mod query_tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn queries_outside_steady_states_have_no_data() {
        let sim = helpers::sim();

        let err = sim
            .modem
            .run_script(Arc::new(scripts::imsi_script()))
            .await
            .unwrap_err();
        assert!(matches!(err, ModemError::NoData));
        assert!(matches!(
            sim.modem.get_signal(SignalType::Rssi).await,
            Err(ModemError::NoData)
        ));
        assert_eq!(sim.parts.chat.run_count(), 0);
        sim.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn signal_figures_are_converted() {
        let sim = helpers::sim();
        helpers::bring_up(&sim).await;

        assert_eq!(sim.modem.get_signal(SignalType::Rssi).await.unwrap(), -73);
        assert_eq!(sim.modem.get_signal(SignalType::Rsrp).await.unwrap(), -90);
        assert_eq!(sim.modem.get_signal(SignalType::Rsrq).await.unwrap(), -10);
        sim.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn unknown_signal_is_reported() {
        let sim = helpers::sim();
        sim.parts.chat.set_responses(
            scripts::CSQ_SCRIPT,
            vec![SimResponse::new(MatchHandler::Csq, ["+CSQ: ", "99", "99"])],
        );
        helpers::bring_up(&sim).await;

        assert!(matches!(
            sim.modem.get_signal(SignalType::Rssi).await,
            Err(ModemError::SignalUnknown)
        ));
        sim.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn identity_scripts_fill_cache() {
        let sim = helpers::sim();
        helpers::bring_up(&sim).await;

        sim.modem
            .run_script(Arc::new(scripts::imsi_script()))
            .await
            .unwrap();
        sim.modem
            .run_script(Arc::new(scripts::iccid_script()))
            .await
            .unwrap();

        let info = sim.modem.info();
        assert_eq!(info.imsi, "001010123456789");
        assert_eq!(info.iccid, "89882280000012345678");
        sim.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn script_outcomes_map_to_errors() {
        let sim = helpers::sim();
        helpers::bring_up(&sim).await;

        sim.parts
            .chat
            .set_outcome(scripts::IMSI_SCRIPT, ScriptResult::Abort);
        let err = sim
            .modem
            .run_script(Arc::new(scripts::imsi_script()))
            .await
            .unwrap_err();
        assert!(matches!(err, ModemError::Chat(ChatError::Aborted(_))));

        sim.parts
            .chat
            .set_outcome(scripts::ICCID_SCRIPT, ScriptResult::Timeout);
        let err = sim
            .modem
            .run_script(Arc::new(scripts::iccid_script()))
            .await
            .unwrap_err();
        assert!(matches!(err, ModemError::NoData));

        // Synchronous outcomes never reach the state machine
        assert_eq!(sim.modem.state(), ModemState::CarrierOn);
        sim.shutdown().await;
    }
}

// ============================================================================
// Event Queue Tests
// ============================================================================

mod queue_tests {
    use super::*;

    #[tokio::test]
    async fn overflow_drops_exactly_one_event() {
        let sim = helpers::sim();
        let events = sim.modem.events();
        let capacity = sim.modem.config().event_queue_capacity;

        // The actor cannot run until this task yields
        let accepted = (0..=capacity)
            .filter(|_| events.post(ModemEvent::Registered))
            .count();

        assert_eq!(accepted, capacity);
        assert_eq!(sim.modem.dropped_events(), 1);
        sim.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn huge_configured_capacity_still_spawns() {
        let config: ModemConfig =
            serde_json::from_str(r#"{"event_queue_capacity": 18446744073709551615}"#).unwrap();
        let sim = SimModem::spawn(config, SimModemOptions::default());

        helpers::bring_up(&sim).await;
        sim.modem.suspend().await.unwrap();
        assert_eq!(sim.modem.dropped_events(), 0);
        sim.shutdown().await;
    }
}
