//! Process lifecycle tests driven through a real main loop

use std::collections::HashSet;
use std::time::{Duration, Instant};

use main_loop::CompositeSource;
use nix::sys::signal::Signal;
use rstest::rstest;
use task_manager::{TaskError, TaskManager, TaskManagerConfig, PID_MIN};

const WAIT: Duration = Duration::from_secs(5);

fn setup() -> (CompositeSource, TaskManager) {
    let mut root = CompositeSource::new();
    let (tasks, exits) = TaskManager::new(TaskManagerConfig::default());
    root.add_child(Box::new(exits));
    (root, tasks)
}

/// Iterate the loop until `done` holds or the deadline passes
fn run_until(root: &mut CompositeSource, done: impl Fn() -> bool) -> bool {
    let deadline = Instant::now() + WAIT;
    while !done() {
        if Instant::now() >= deadline {
            return false;
        }
        root.iteration(Some(Duration::from_millis(50)));
    }
    true
}

#[test]
fn exec_true_then_kill_once() {
    let (_root, tasks) = setup();

    let pid = tasks.exec("true").unwrap();
    assert!(pid >= PID_MIN);

    // No loop iteration has run, so the exit has not been collected yet
    tasks.kill(pid, Signal::SIGTERM as i32).unwrap();

    assert!(matches!(
        tasks.kill(pid, Signal::SIGTERM as i32),
        Err(TaskError::NoSuchProcess(p)) if p == pid
    ));
}

#[test]
fn natural_exit_is_reaped_on_the_loop() {
    let (mut root, tasks) = setup();

    let pid = tasks.exec("true").unwrap();
    assert!(tasks.contains(pid));

    assert!(run_until(&mut root, || !tasks.contains(pid)));
    assert!(matches!(
        tasks.kill(pid, Signal::SIGTERM as i32),
        Err(TaskError::NoSuchProcess(_))
    ));
}

#[test]
fn killed_task_exit_is_tolerated() {
    let (mut root, tasks) = setup();

    let pid = tasks.exec("sleep 30").unwrap();
    tasks.kill(pid, Signal::SIGKILL as i32).unwrap();
    assert!(tasks.is_empty());

    // The late exit notification of the killed child must be a no-op
    let started = Instant::now();
    while started.elapsed() < Duration::from_millis(300) {
        root.iteration(Some(Duration::from_millis(50)));
    }
    assert!(tasks.is_empty());

    let next = tasks.exec("true").unwrap();
    assert_eq!(next, pid + 1);
}

#[test]
fn live_tasks_never_share_a_pid() {
    let (mut root, tasks) = setup();

    let pids: Vec<i32> = (0..8).map(|_| tasks.exec("sleep 5").unwrap()).collect();
    let unique: HashSet<i32> = pids.iter().copied().collect();
    assert_eq!(unique.len(), pids.len());
    assert_eq!(tasks.len(), 8);

    for pid in &pids {
        tasks.kill(*pid, Signal::SIGKILL as i32).unwrap();
    }
    root.iteration(Some(Duration::from_millis(10)));
    assert!(tasks.is_empty());
}

#[test]
fn command_arguments_reach_the_child() {
    let (mut root, tasks) = setup();
    let dir = std::env::temp_dir().join(format!("task-manager-test-{}", std::process::id()));
    let marker = dir.to_string_lossy().to_string();

    let pid = tasks
        .exec(&format!("sh -c 'mkdir \"$0\"' '{}'", marker))
        .unwrap();
    assert!(run_until(&mut root, || !tasks.contains(pid)));

    assert!(dir.is_dir());
    std::fs::remove_dir(&dir).unwrap();
}

#[rstest]
#[case::cleared(false)]
#[case::inherited(true)]
fn child_environment_follows_config(#[case] inherit_env: bool) {
    // HOME is set by every login environment the tests run under
    let Ok(home) = std::env::var("HOME") else {
        return;
    };

    let mut root = CompositeSource::new();
    let config = TaskManagerConfig {
        inherit_env,
        ..TaskManagerConfig::default()
    };
    let (tasks, exits) = TaskManager::new(config);
    root.add_child(Box::new(exits));

    let dir = tempfile::tempdir().unwrap();
    let output = dir.path().join("env");
    let pid = tasks
        .exec(&format!("sh -c 'env > \"$0\"' '{}'", output.display()))
        .unwrap();
    assert!(run_until(&mut root, || !tasks.contains(pid)));

    let env = std::fs::read_to_string(&output).unwrap();
    let has_home = env.lines().any(|line| line == format!("HOME={}", home));
    assert_eq!(has_home, inherit_env);
}

#[test]
fn task_snapshot_reports_command() {
    let (_root, tasks) = setup();
    let pid = tasks.exec("sleep 5").unwrap();

    let info = tasks.tasks();
    assert_eq!(info.len(), 1);
    assert_eq!(info[0].pid, pid);
    assert_eq!(info[0].command, "sleep 5");
    assert!(info[0].os_pid > 0);

    tasks.kill(pid, Signal::SIGKILL as i32).unwrap();
}
