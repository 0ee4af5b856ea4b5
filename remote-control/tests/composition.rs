//! Construction, accessors and scheduling of the composition root

use std::cell::RefCell;
use std::fs;
use std::net::UdpSocket;
use std::path::Path;
use std::rc::Rc;
use std::thread;
use std::time::{Duration, Instant};

use remote_control::backend::BackendError;
use remote_control::event_manager::{Event, EventSource, HookState, SmartcardState};
use remote_control::{Config, ConfigError, RemoteControl, RemoteControlError};

const WAIT: Duration = Duration::from_secs(5);

const NULL_HARDWARE: &str = r#"
[backlight]
backend = "null"

[gpio]
backend = "null"
"#;

fn null_rc() -> RemoteControl {
    let config: Config = NULL_HARDWARE.parse().unwrap();
    RemoteControl::new(&config).unwrap()
}

/// Iterate until `done` holds or the deadline passes
fn iterate_until(rc: &mut RemoteControl, mut done: impl FnMut(&RemoteControl) -> bool) -> bool {
    let deadline = Instant::now() + WAIT;
    while Instant::now() < deadline {
        if done(rc) {
            return true;
        }
        rc.iteration(Some(Duration::from_millis(50)));
    }
    done(rc)
}

// ============================================================================
// Construction
// ============================================================================

#[test]
fn null_hardware_builds_every_backend() {
    let rc = null_rc();

    // Task exits and watchdog are always attached; GPIO only with lines
    assert_eq!(rc.source_count(), 2);
    assert!(rc.net_udp().is_empty());
    assert!(rc.task_manager().is_empty());
    assert!(!rc.gpio().is_watching());
    assert!(!rc.app_watchdog().is_enabled());
}

#[test]
fn null_backends_are_inert() {
    let rc = null_rc();

    assert!(matches!(
        rc.backlight().brightness(),
        Err(BackendError::NotSupported(_))
    ));
    assert!(matches!(
        rc.modem_manager().state(),
        Err(BackendError::NotSupported(_))
    ));
    assert!(matches!(rc.voip().logout(), Err(BackendError::NotSupported(_))));
    assert!(matches!(rc.audio().volume(), Err(BackendError::NotSupported(_))));
    assert!(matches!(
        rc.media_player().play(),
        Err(BackendError::NotSupported(_))
    ));
    assert!(matches!(
        rc.tuner().set_input(1),
        Err(BackendError::NotSupported(_))
    ));
    assert_eq!(rc.smartcard().card_type().unwrap(), None);
    rc.handset().display_clear().unwrap();
    assert!(!rc.usb_handset().is_connected());
}

#[test]
fn invalid_section_aborts_startup() {
    let config: Config = "[watchdog]\ntimeout = \"soon\"\n".parse().unwrap();
    let err = RemoteControl::new(&config).unwrap_err();
    assert!(matches!(
        err,
        RemoteControlError::Config(ConfigError::InvalidSection { ref section, .. })
            if section == "watchdog"
    ));
}

#[test]
fn missing_sysfs_backlight_aborts_startup() {
    let root = tempfile::tempdir().unwrap();
    let config: Config = format!(
        "[backlight]\nbackend = \"sysfs\"\nsysfs_root = {:?}\n",
        root.path().display().to_string()
    )
    .parse()
    .unwrap();

    let err = RemoteControl::new(&config).unwrap_err();
    assert!(matches!(
        err,
        RemoteControlError::Backend {
            name: "backlight",
            ..
        }
    ));
}

#[test]
fn watchdog_autostarts_from_config() {
    let config: Config = format!("{}\n[watchdog]\ntimeout = 60\n", NULL_HARDWARE)
        .parse()
        .unwrap();
    let rc = RemoteControl::new(&config).unwrap();

    assert!(rc.app_watchdog().is_enabled());
    assert_eq!(rc.app_watchdog().timeout(), Some(Duration::from_secs(60)));
    rc.app_watchdog().stop();
}

// ============================================================================
// Scheduling
// ============================================================================

#[test]
fn exited_task_is_reaped_on_iteration() {
    let mut rc = null_rc();
    let pid = rc.task_manager().exec("true").unwrap();

    assert!(iterate_until(&mut rc, |rc| !rc.task_manager().contains(pid)));
}

#[test]
fn quit_handle_stops_run() {
    let mut rc = null_rc();
    let quit = rc.quit_handle();

    let stopper = thread::spawn(move || {
        thread::sleep(Duration::from_millis(50));
        quit.quit();
    });

    rc.run();
    stopper.join().unwrap();
}

#[test]
fn consumer_source_receives_datagrams() {
    let mut rc = null_rc();
    let owner = rc.new_owner();

    let channel = rc.net_udp().create_channel(0, "127.0.0.1", 9).unwrap();
    let port = rc.net_udp().get_channel_by_ref(channel).unwrap().local_port();

    let seen = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&seen);
    let source = rc
        .net_udp()
        .watch_channel(channel, owner, move |reference| sink.borrow_mut().push(reference))
        .unwrap();
    let id = rc.add_source(Box::new(source));
    assert_eq!(rc.net_udp().get_recv_cb_owner(channel).unwrap(), Some(owner));

    let peer = UdpSocket::bind("127.0.0.1:0").unwrap();
    peer.send_to(b"ping", ("127.0.0.1", port)).unwrap();

    assert!(iterate_until(&mut rc, |_| !seen.borrow().is_empty()));
    assert_eq!(seen.borrow()[0], channel);

    let mut buffer = [0u8; 16];
    assert_eq!(rc.net_udp().recv(channel, &mut buffer).unwrap(), 4);
    assert_eq!(&buffer[..4], b"ping");

    assert!(rc.remove_source(id));
    rc.net_udp().destroy_channel(channel);
}

// ============================================================================
// GPIO
// ============================================================================

fn fake_gpio(root: &Path, number: u32, value: &str) {
    let dir = root.join(format!("class/gpio/gpio{}", number));
    fs::create_dir_all(&dir).unwrap();
    fs::write(dir.join("value"), value).unwrap();
}

#[test]
fn gpio_levels_reach_the_event_manager() {
    let root = tempfile::tempdir().unwrap();
    fake_gpio(root.path(), 17, "1\n");
    fake_gpio(root.path(), 22, "1\n");

    let config: Config = format!(
        "[backlight]\nbackend = \"null\"\n\n[gpio]\nsysfs_root = {:?}\nhandset = 17\nsmartcard = 22\n",
        root.path().display().to_string()
    )
    .parse()
    .unwrap();

    let mut rc = RemoteControl::new(&config).unwrap();
    assert_eq!(rc.source_count(), 3);
    assert!(rc.gpio().is_watching());

    assert!(iterate_until(&mut rc, |rc| {
        rc.event_manager().status() & EventSource::Hook.bit() != 0
    }));

    assert_eq!(
        rc.event_manager()
            .get_source_state(EventSource::Hook)
            .unwrap(),
        Event::Hook(HookState::Off)
    );
    assert_eq!(
        rc.event_manager()
            .get_source_state(EventSource::Smartcard)
            .unwrap(),
        Event::Smartcard(SmartcardState::Removed)
    );
}
