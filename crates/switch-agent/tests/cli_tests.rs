use std::sync::Arc;
use std::time::Duration;

use application::{ConnectionManager, LinkOptions};
use clap::Parser;
use domain::protocol::{AlarmAction, TimeOfDay};
use domain::{Command, TargetAddress};
use infrastructure::{SimulatorConfig, SimulatorTransport};
use switch_agent::{Action, Args, send_once, summarize};

#[test]
fn test_no_subcommand_means_run() {
    let args = Args::try_parse_from(["switch-agent"]).unwrap();
    assert!(args.action.is_none());
    assert!(!args.simulate);
}

#[test]
fn test_global_overrides() {
    let args = Args::try_parse_from([
        "switch-agent",
        "--address",
        "78:42:1C:18:E8:0A",
        "--simulate",
        "--timeout-ms",
        "500",
        "on",
    ])
    .unwrap();
    assert_eq!(args.address.as_deref(), Some("78:42:1C:18:E8:0A"));
    assert!(args.simulate);
    assert_eq!(args.timeout_ms, Some(500));
    assert_eq!(args.action, Some(Action::On));
}

#[test]
fn test_alarm_subcommands_map_to_commands() {
    let args = Args::try_parse_from(["switch-agent", "add-alarm", "6:30", "off"]).unwrap();
    assert_eq!(
        args.action.unwrap().command(),
        Some(Command::AddAlarm {
            at: TimeOfDay::from_hms(6, 30, 0).unwrap(),
            action: AlarmAction::RelayOff,
        })
    );

    let args = Args::try_parse_from(["switch-agent", "disable-alarm", "2"]).unwrap();
    assert_eq!(
        args.action.unwrap().command(),
        Some(Command::EnableAlarm {
            index: 2,
            enabled: false
        })
    );
}

#[test]
fn test_bad_time_is_rejected() {
    assert!(Args::try_parse_from(["switch-agent", "set-time", "25:00"]).is_err());
}

#[test]
fn test_run_sends_nothing() {
    assert_eq!(Action::Run.command(), None);
    assert_eq!(Action::Status.command(), Some(Command::GetStatus));
}

#[tokio::test]
async fn test_send_once_against_simulator() {
    let transport = Arc::new(SimulatorTransport::new(SimulatorConfig {
        relay_on: false,
        ..Default::default()
    }));
    let link = Arc::new(ConnectionManager::new(transport, LinkOptions::default()));
    let address = TargetAddress::new("78:42:1C:18:E8:0A").unwrap();

    let replies = send_once(&link, address, &Command::LightOn, Duration::from_millis(300))
        .await
        .unwrap();

    let status = summarize(&replies);
    assert!(status.relay_on);
    assert!(!link.is_connected());
}
