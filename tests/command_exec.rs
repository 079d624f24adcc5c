#![cfg(unix)]

mod common;
use crate::common::{captured_options, init_tracing, with_timeout};

use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::Path;
use std::time::{Duration, Instant};

use tempfile::TempDir;

use runtree::{
    CancelToken, Engine, EngineSettings, Runnable, RuntreeError, Task, cmd, run_in, serial,
};

fn engine_in(root: &Path, tree: impl Into<Runnable>) -> Engine {
    Engine::new(tree).with_settings(EngineSettings {
        root_dir: root.to_path_buf(),
        shutdown_grace: Duration::from_secs(1),
        ..EngineSettings::default()
    })
}

fn sh(script: &str) -> Runnable {
    cmd("sh", ["-c", script])
}

#[tokio::test]
async fn command_output_goes_to_the_context_sink() {
    init_tracing();
    let tmp = TempDir::new().unwrap();
    let task = Task::new("greet", "say hello", sh("echo hello; echo oops >&2"));

    let (options, buffer) = captured_options();
    engine_in(tmp.path(), task)
        .execute(CancelToken::new(), options)
        .await
        .unwrap();

    let out = buffer.contents();
    assert!(out.starts_with(":: greet\n"), "{out}");
    assert!(out.contains("hello\n"));
    assert!(out.contains("oops\n"));
}

#[tokio::test]
async fn commands_run_in_the_bound_directory() {
    init_tracing();
    let tmp = TempDir::new().unwrap();
    for dir in ["a", "b"] {
        fs::create_dir(tmp.path().join(dir)).unwrap();
        fs::write(tmp.path().join(dir).join("marker.txt"), format!("in {dir}\n")).unwrap();
    }
    let filter = run_in(Task::new("show", "print marker", cmd("cat", ["marker.txt"])))
        .include("a")
        .include("b")
        .build()
        .unwrap();

    let (options, buffer) = captured_options();
    engine_in(tmp.path(), filter)
        .execute(CancelToken::new(), options)
        .await
        .unwrap();

    assert_eq!(
        buffer.contents(),
        ":: show [a]\nin a\n:: show [b]\nin b\n"
    );
}

#[tokio::test]
async fn tool_dir_is_prepended_to_path() {
    init_tracing();
    let tmp = TempDir::new().unwrap();
    let bin = tmp.path().join(".runtree/bin");
    fs::create_dir_all(&bin).unwrap();
    let tool = bin.join("runtree-test-tool");
    fs::write(&tool, "#!/bin/sh\necho tool ran\n").unwrap();
    fs::set_permissions(&tool, fs::Permissions::from_mode(0o755)).unwrap();

    let task = Task::new("tool", "managed tool", cmd("runtree-test-tool", Vec::<String>::new()));
    let (options, buffer) = captured_options();
    engine_in(tmp.path(), task)
        .execute(CancelToken::new(), options)
        .await
        .unwrap();

    assert!(buffer.contents().contains("tool ran\n"));
}

#[tokio::test]
async fn non_zero_exit_is_an_error_with_the_code() {
    init_tracing();
    let tmp = TempDir::new().unwrap();
    let task = Task::new("fail", "exits 3", sh("exit 3"));

    let (options, _buffer) = captured_options();
    let err = engine_in(tmp.path(), task)
        .execute(CancelToken::new(), options)
        .await
        .unwrap_err();

    match err {
        RuntreeError::CommandFailed { command, code } => {
            assert_eq!(code, 3);
            assert_eq!(command, "sh -c exit 3");
        }
        other => panic!("expected CommandFailed, got {other:?}"),
    }
}

#[tokio::test]
async fn missing_program_is_a_spawn_error() {
    init_tracing();
    let tmp = TempDir::new().unwrap();
    let task = Task::new(
        "ghost",
        "missing binary",
        cmd("runtree-no-such-program", Vec::<String>::new()),
    );

    let (options, _buffer) = captured_options();
    let err = engine_in(tmp.path(), task)
        .execute(CancelToken::new(), options)
        .await
        .unwrap_err();

    assert!(matches!(err, RuntreeError::Spawn { .. }));
}

#[tokio::test]
async fn cancellation_interrupts_the_process() {
    init_tracing();
    let tmp = TempDir::new().unwrap();
    let task = Task::new("wait", "sleeps", cmd("sleep", ["30"]));
    let cancel = CancelToken::new();
    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(100)).await;
            cancel.cancel();
        });
    }

    let started = Instant::now();
    let (options, _buffer) = captured_options();
    let err = with_timeout(engine_in(tmp.path(), task).execute(cancel, options))
        .await
        .unwrap_err();

    assert!(matches!(err, RuntreeError::Cancelled));
    assert!(started.elapsed() < Duration::from_secs(2));
}

#[tokio::test]
async fn process_ignoring_interrupt_is_killed_after_grace() {
    init_tracing();
    let tmp = TempDir::new().unwrap();
    let task = Task::new("stubborn", "ignores SIGINT", sh("trap '' INT; exec sleep 30"));
    let cancel = CancelToken::new();
    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(200)).await;
            cancel.cancel();
        });
    }

    let started = Instant::now();
    let (options, _buffer) = captured_options();
    let err = with_timeout(engine_in(tmp.path(), task).execute(cancel, options))
        .await
        .unwrap_err();

    assert!(matches!(err, RuntreeError::Cancelled));
    // One second of grace (see `engine_in`) before the kill.
    assert!(started.elapsed() >= Duration::from_secs(1));
}

#[tokio::test]
async fn cancellation_reaches_grandchildren_holding_the_pipes() {
    init_tracing();
    let tmp = TempDir::new().unwrap();
    // `sleep` is not exec'd, so it outlives the shell and keeps stdout open.
    let task = Task::new("nested", "shell with a child", sh("trap '' INT; sleep 8; true"));
    let cancel = CancelToken::new();
    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(200)).await;
            cancel.cancel();
        });
    }

    let started = Instant::now();
    let (options, _buffer) = captured_options();
    let err = with_timeout(engine_in(tmp.path(), task).execute(cancel, options))
        .await
        .unwrap_err();

    assert!(matches!(err, RuntreeError::Cancelled));
    let elapsed = started.elapsed();
    assert!(elapsed >= Duration::from_secs(1), "{elapsed:?}");
    assert!(elapsed < Duration::from_secs(4), "{elapsed:?}");
}

#[tokio::test]
async fn background_child_holding_output_does_not_block_completion() {
    init_tracing();
    let tmp = TempDir::new().unwrap();
    let task = Task::new("spawner", "leaves a child behind", sh("sleep 8 & echo started"));

    let started = Instant::now();
    let (options, buffer) = captured_options();
    with_timeout(engine_in(tmp.path(), task).execute(CancelToken::new(), options))
        .await
        .unwrap();

    assert!(started.elapsed() < Duration::from_secs(4));
    assert!(buffer.contents().contains("started\n"));
}

#[tokio::test]
async fn verbose_mode_echoes_commands() {
    init_tracing();
    let tmp = TempDir::new().unwrap();
    let task = Task::new("echo", "echo hi", cmd("echo", ["hi"]));

    let (mut options, buffer) = captured_options();
    options.verbose = true;
    engine_in(tmp.path(), task)
        .execute(CancelToken::new(), options)
        .await
        .unwrap();

    assert_eq!(buffer.contents(), ":: echo\n$ echo hi\nhi\n");
}

#[tokio::test]
async fn planning_spawns_nothing() {
    init_tracing();
    let tmp = TempDir::new().unwrap();
    let task = Task::new("touch", "creates a file", cmd("touch", ["created.txt"]));

    let plan = engine_in(tmp.path(), serial![task]).plan().await.unwrap();

    assert_eq!(plan.task_names(), vec!["touch"]);
    assert!(!tmp.path().join("created.txt").exists());
}

#[tokio::test]
async fn code_leaves_can_exec_in_the_current_path() {
    init_tracing();
    let tmp = TempDir::new().unwrap();
    fs::create_dir(tmp.path().join("pkg")).unwrap();
    fs::write(tmp.path().join("pkg/name.txt"), "pkg\n").unwrap();

    let task = Task::from_fn("read", "reads name", |ctx| async move {
        ctx.println(format!("path={}", ctx.path()))?;
        ctx.exec("cat", &["name.txt"]).await
    });
    let filter = run_in(task).include("pkg").build().unwrap();

    let (options, buffer) = captured_options();
    engine_in(tmp.path(), filter)
        .execute(CancelToken::new(), options)
        .await
        .unwrap();

    assert_eq!(buffer.contents(), ":: read [pkg]\npath=pkg\npkg\n");
}
