//! Property tests for the sysfs backlight and the watchdog state machine

use std::fs;
use std::time::Duration;

use proptest::prelude::*;
use remote_control::backend::{
    AppWatchdog, Backlight, BackendError, SysfsBacklight, WatchdogConfig,
};

fn fake_backlight(max: u32) -> (tempfile::TempDir, SysfsBacklight) {
    let root = tempfile::tempdir().unwrap();
    fs::write(root.path().join("max_brightness"), format!("{}\n", max)).unwrap();
    fs::write(root.path().join("brightness"), "0\n").unwrap();
    fs::write(root.path().join("bl_power"), "0\n").unwrap();
    let backlight = SysfsBacklight::open(root.path()).unwrap();
    (root, backlight)
}

#[derive(Debug, Clone, Copy)]
enum WatchdogOp {
    Start(u64),
    Stop,
    Trigger,
}

fn watchdog_op() -> impl Strategy<Value = WatchdogOp> {
    prop_oneof![
        (0u64..3).prop_map(WatchdogOp::Start),
        Just(WatchdogOp::Stop),
        Just(WatchdogOp::Trigger),
    ]
}

// ============================================================================
// Backlight
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    /// Brightness reads back the last value within range; values above the
    /// maximum are rejected without touching the device
    #[test]
    fn prop_brightness_tracks_last_valid_write(
        max in 1u32..1024,
        writes in prop::collection::vec(0u32..2048, 1..20),
    ) {
        let (_root, backlight) = fake_backlight(max);
        let mut expected = 0;

        for value in writes {
            let result = backlight.set_brightness(value);
            if value <= max {
                prop_assert!(result.is_ok());
                expected = value;
            } else {
                prop_assert!(matches!(result, Err(BackendError::InvalidArgument(_))));
            }
            prop_assert_eq!(backlight.brightness().unwrap(), expected);
        }
    }
}

// ============================================================================
// Watchdog
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    /// The watchdog runs exactly when the last successful start or trigger
    /// came after the last stop, and an interval once set is never lost
    #[test]
    fn prop_watchdog_state_machine(ops in prop::collection::vec(watchdog_op(), 0..30)) {
        let (watchdog, _source) = AppWatchdog::with_action(&WatchdogConfig::default(), || {});
        let mut interval: Option<u64> = None;
        let mut running = false;

        for op in ops {
            match op {
                WatchdogOp::Start(secs) => {
                    if secs > 0 {
                        interval = Some(secs);
                    }
                    let result = watchdog.start(Duration::from_secs(secs));
                    match interval {
                        Some(_) => {
                            prop_assert!(result.is_ok());
                            running = true;
                        }
                        None => prop_assert!(matches!(result, Err(BackendError::InvalidArgument(_)))),
                    }
                }
                WatchdogOp::Stop => {
                    watchdog.stop();
                    running = false;
                }
                WatchdogOp::Trigger => {
                    let result = watchdog.trigger();
                    if running {
                        prop_assert!(result.is_ok());
                    } else {
                        prop_assert!(matches!(result, Err(BackendError::NoDevice(_))));
                    }
                }
            }

            prop_assert_eq!(watchdog.is_enabled(), running);
            prop_assert_eq!(watchdog.timeout(), interval.map(Duration::from_secs));
        }
    }
}
