//! Request dispatch against a live composition root

use std::fs;
use std::net::UdpSocket;
use std::thread;
use std::time::{Duration, Instant};

use nix::errno::Errno;
use remote_control::event_manager::{EventSource, HookState};
use remote_control::{
    dispatch, handle_json, Config, RemoteControl, Request, Response, MAX_SMARTCARD_READ,
};
use rstest::rstest;
use serde_json::json;

fn null_rc() -> RemoteControl {
    let config: Config = "[backlight]\nbackend = \"null\"\n[gpio]\nbackend = \"null\"\n"
        .parse()
        .unwrap();
    RemoteControl::new(&config).unwrap()
}

fn status(errno: Errno) -> Option<i32> {
    Some(-(errno as i32))
}

#[rstest]
#[case(Request::ModemCall { number: "0123".to_string() })]
#[case(Request::VoipGetState)]
#[case(Request::AudioSetVolume { volume: 80 })]
#[case(Request::MediaPlayerPlay)]
#[case(Request::SoundPlay { uri: "file:///ring.wav".to_string() })]
#[case(Request::MixerGetInputSource)]
#[case(Request::TunerSetFrequency { frequency: 567_250_000 })]
#[case(Request::CursorGetTimeout)]
#[case(Request::BacklightGet)]
fn null_capabilities_report_enosys(#[case] request: Request) {
    let rc = null_rc();
    assert_eq!(dispatch(&rc, request).status(), status(Errno::ENOSYS));
}

#[test]
fn smartcard_without_card() {
    let rc = null_rc();
    assert_eq!(
        dispatch(&rc, Request::SmartcardGetType),
        Response::Value(serde_json::Value::Null)
    );
    assert_eq!(
        dispatch(&rc, Request::SmartcardRead { offset: 0, size: 8 }).status(),
        status(Errno::ENODEV)
    );
}

#[test]
fn oversized_reads_return_errors() {
    let rc = null_rc();

    let unknown = json!({
        "method": "net_recv",
        "params": { "channel": -1, "max_size": u64::MAX }
    });
    let reply: Response = serde_json::from_str(&handle_json(&rc, &unknown.to_string())).unwrap();
    assert_eq!(reply.status(), status(Errno::ENOENT));

    let channel = rc
        .net_udp()
        .create_channel(0, "127.0.0.1", 9)
        .unwrap()
        .as_raw();
    let idle = json!({
        "method": "net_recv",
        "params": { "channel": channel, "max_size": u64::MAX }
    });
    let reply: Response = serde_json::from_str(&handle_json(&rc, &idle.to_string())).unwrap();
    assert_eq!(reply, Response::Value(json!([])));

    assert_eq!(
        dispatch(
            &rc,
            Request::SmartcardRead {
                offset: 0,
                size: usize::MAX
            }
        )
        .status(),
        status(Errno::EINVAL)
    );
    assert_eq!(
        dispatch(
            &rc,
            Request::SmartcardRead {
                offset: 0,
                size: MAX_SMARTCARD_READ
            }
        )
        .status(),
        status(Errno::ENODEV)
    );
}

#[test]
fn event_queries() {
    let rc = null_rc();

    assert_eq!(dispatch(&rc, Request::EventGetStatus), Response::Value(json!(0)));
    assert_eq!(
        dispatch(
            &rc,
            Request::EventGetSourceState {
                source: EventSource::Handset
            }
        )
        .status(),
        status(Errno::ENODATA)
    );

    let hook = dispatch(
        &rc,
        Request::EventGetSourceState {
            source: EventSource::Hook,
        },
    );
    let expected = serde_json::to_value(remote_control::event_manager::Event::Hook(
        HookState::On,
    ))
    .unwrap();
    assert_eq!(hook, Response::Value(expected));
}

#[test]
fn task_requests() {
    let rc = null_rc();

    let Response::Value(pid) = dispatch(
        &rc,
        Request::TaskExec {
            command: "sleep 5".to_string(),
        },
    ) else {
        panic!("exec failed");
    };
    let pid = pid.as_i64().unwrap() as i32;

    let Response::Value(list) = dispatch(&rc, Request::TaskList) else {
        panic!("list failed");
    };
    assert_eq!(list, json!([{ "pid": pid, "command": "sleep 5" }]));

    assert_eq!(
        dispatch(&rc, Request::TaskKill { pid, signal: 9 }),
        Response::Ok
    );
    assert_eq!(
        dispatch(&rc, Request::TaskKill { pid, signal: 9 }).status(),
        status(Errno::ESRCH)
    );
    assert_eq!(
        dispatch(
            &rc,
            Request::TaskExec {
                command: "echo 'open".to_string()
            }
        )
        .status(),
        status(Errno::EACCES)
    );
}

#[test]
fn watchdog_requests() {
    let rc = null_rc();

    assert_eq!(
        dispatch(&rc, Request::WatchdogTrigger).status(),
        status(Errno::ENODEV)
    );
    assert_eq!(
        dispatch(&rc, Request::WatchdogStart { interval: 0 }).status(),
        status(Errno::EINVAL)
    );
    assert_eq!(
        dispatch(&rc, Request::WatchdogStart { interval: 60 }),
        Response::Ok
    );
    assert_eq!(dispatch(&rc, Request::WatchdogTrigger), Response::Ok);
    assert_eq!(
        dispatch(&rc, Request::WatchdogIsEnabled),
        Response::Value(json!(true))
    );
    assert_eq!(dispatch(&rc, Request::WatchdogStop), Response::Ok);
}

#[test]
fn udp_requests_over_json() {
    let rc = null_rc();

    let reply = handle_json(
        &rc,
        r#"{"method":"net_create_channel","params":{"local_port":0,"remote_host":"127.0.0.1","remote_port":9}}"#,
    );
    let reply: Response = serde_json::from_str(&reply).unwrap();
    let Response::Value(channel) = reply else {
        panic!("create failed: {:?}", reply);
    };
    let channel = channel.as_i64().unwrap() as i32;

    let port = rc
        .net_udp()
        .get_channel_by_ref(remote_control::net_udp::ChannelRef::from_raw(channel))
        .unwrap()
        .local_port();
    let peer = UdpSocket::bind("127.0.0.1:0").unwrap();
    peer.send_to(&[1, 2, 3], ("127.0.0.1", port)).unwrap();

    let recv = json!({ "method": "net_recv", "params": { "channel": channel, "max_size": 2 } })
        .to_string();
    let deadline = Instant::now() + Duration::from_secs(5);
    let data = loop {
        let reply: Response = serde_json::from_str(&handle_json(&rc, &recv)).unwrap();
        match reply {
            Response::Value(data) if data != json!([]) => break data,
            Response::Value(_) if Instant::now() < deadline => {
                thread::sleep(Duration::from_millis(5))
            }
            other => panic!("recv failed: {:?}", other),
        }
    };
    // Truncated to the requested size
    assert_eq!(data, json!([1, 2]));

    assert_eq!(
        dispatch(&rc, Request::NetDestroyChannel { channel }),
        Response::Ok
    );
    assert_eq!(
        dispatch(
            &rc,
            Request::NetSend {
                channel,
                data: vec![1]
            }
        )
        .status(),
        status(Errno::ENOENT)
    );
}

#[test]
fn malformed_json_is_einval() {
    let rc = null_rc();
    let reply: Response = serde_json::from_str(&handle_json(&rc, "{\"method\":")).unwrap();
    assert_eq!(reply.status(), status(Errno::EINVAL));

    let reply: Response =
        serde_json::from_str(&handle_json(&rc, r#"{"method":"no_such_method"}"#)).unwrap();
    assert_eq!(reply.status(), status(Errno::EINVAL));
}

#[test]
fn sysfs_backlight_over_rpc() {
    let root = tempfile::tempdir().unwrap();
    let dir = root.path().join("class/backlight/panel");
    fs::create_dir_all(&dir).unwrap();
    fs::write(dir.join("max_brightness"), "100\n").unwrap();
    fs::write(dir.join("brightness"), "50\n").unwrap();
    fs::write(dir.join("bl_power"), "0\n").unwrap();

    let config: Config = format!(
        "[backlight]\nbackend = \"sysfs\"\ndevice = \"panel\"\nsysfs_root = {:?}\n",
        root.path().display().to_string()
    )
    .parse()
    .unwrap();
    let rc = RemoteControl::new(&config).unwrap();

    assert_eq!(dispatch(&rc, Request::BacklightGet), Response::Value(json!(50)));
    assert_eq!(
        dispatch(&rc, Request::BacklightSet { brightness: 101 }).status(),
        status(Errno::EINVAL)
    );
    assert_eq!(
        dispatch(&rc, Request::BacklightSet { brightness: 80 }),
        Response::Ok
    );
    assert_eq!(dispatch(&rc, Request::BacklightGet), Response::Value(json!(80)));
    assert_eq!(
        dispatch(&rc, Request::BacklightEnable { enable: false }),
        Response::Ok
    );
    assert_eq!(
        dispatch(&rc, Request::BacklightIsEnabled),
        Response::Value(json!(false))
    );
}
