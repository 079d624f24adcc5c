mod common;
use crate::common::{Recorder, captured_options, init_tracing, with_timeout};

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use runtree::{CancelToken, Engine, Parallel, Runnable, RuntreeError, Task, parallel, serial};

/// Task printing `lines` with a pause between each, so that concurrent
/// branches would interleave if output were not buffered.
fn chatty(name: &str, lines: &[&str]) -> Task {
    let lines: Vec<String> = lines.iter().map(|s| s.to_string()).collect();
    Task::from_fn(name, format!("{name} task"), move |ctx| {
        let lines = lines.clone();
        async move {
            for line in lines {
                ctx.println(line)?;
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
            Ok::<(), RuntreeError>(())
        }
    })
}

#[tokio::test]
async fn failure_cancels_siblings_and_surfaces_first_error() {
    init_tracing();
    let rec = Recorder::new();
    let tree = parallel![
        rec.failing_task("lint", "boom"),
        rec.slow_task("test", Duration::from_secs(30)),
    ];

    let (options, _buffer) = captured_options();
    let err = with_timeout(Engine::new(tree).execute(CancelToken::new(), options))
        .await
        .unwrap_err();

    assert_eq!(err.to_string(), "boom");
    let executed = rec.executed();
    assert!(executed.contains(&"lint".to_string()));
    assert!(executed.contains(&"test:cancelled".to_string()));
}

#[tokio::test]
async fn branch_output_is_flushed_as_whole_blocks() {
    init_tracing();
    let tree = parallel![
        chatty("api", &["api 1", "api 2", "api 3"]),
        chatty("web", &["web 1", "web 2", "web 3"]),
    ];

    let (options, buffer) = captured_options();
    Engine::new(tree)
        .execute(CancelToken::new(), options)
        .await
        .unwrap();

    let api = ":: api\napi 1\napi 2\napi 3\n";
    let web = ":: web\nweb 1\nweb 2\nweb 3\n";
    let out = buffer.contents();
    assert!(
        out == format!("{api}{web}") || out == format!("{web}{api}"),
        "interleaved output: {out:?}"
    );
}

#[tokio::test]
async fn failed_branch_output_is_still_flushed() {
    init_tracing();
    let bad = Task::from_fn("bad", "prints then fails", |ctx| async move {
        ctx.println("partial")?;
        Err::<(), RuntreeError>(anyhow::anyhow!("boom").into())
    });
    let good = chatty("good", &["fine"]);

    let (options, buffer) = captured_options();
    let err = Engine::new(parallel![bad, good])
        .execute(CancelToken::new(), options)
        .await
        .unwrap_err();

    assert_eq!(err.to_string(), "boom");
    assert!(buffer.contents().contains(":: bad\npartial\n"));
}

#[tokio::test]
async fn sibling_ignoring_cancellation_completes_and_both_blocks_flush() {
    init_tracing();
    let rec = Recorder::new();
    let finished = Arc::new(AtomicBool::new(false));
    let good = {
        let finished = finished.clone();
        Task::from_fn("good", "ignores cancellation", move |ctx| {
            let finished = finished.clone();
            async move {
                tokio::time::sleep(Duration::from_millis(200)).await;
                ctx.println(format!("done, cancelled={}", ctx.is_cancelled()))?;
                finished.store(true, Ordering::SeqCst);
                Ok::<(), RuntreeError>(())
            }
        })
    };
    let tree = parallel![rec.failing_task("bad", "boom"), good];

    let (options, buffer) = captured_options();
    let err = with_timeout(Engine::new(tree).execute(CancelToken::new(), options))
        .await
        .unwrap_err();

    assert_eq!(err.to_string(), "boom");
    assert!(finished.load(Ordering::SeqCst));
    let out = buffer.contents();
    assert!(out.contains(":: bad\n"), "{out}");
    assert!(out.contains(":: good\ndone, cancelled=true\n"), "{out}");
    assert!(out.find(":: bad") < out.find(":: good"), "{out}");
}

#[tokio::test]
async fn already_ran_tasks_are_dropped_before_fan_out() {
    init_tracing();
    let rec = Recorder::new();
    let build = rec.printing_task("build", "building");
    let test = rec.printing_task("test", "testing");

    let tree = serial![&build, parallel![&build, &test]];
    let (options, buffer) = captured_options();
    Engine::new(tree)
        .execute(CancelToken::new(), options)
        .await
        .unwrap();

    assert_eq!(rec.executed(), vec!["build", "test"]);
    assert_eq!(
        buffer.contents(),
        ":: build\nbuilding\n:: test\ntesting\n"
    );
}

#[tokio::test]
async fn same_task_twice_in_one_group_runs_once() {
    init_tracing();
    let rec = Recorder::new();
    let generate = rec.task("generate");

    let (options, _buffer) = captured_options();
    Engine::new(parallel![&generate, &generate, rec.task("other")])
        .execute(CancelToken::new(), options)
        .await
        .unwrap();

    assert_eq!(rec.count("generate"), 1);
    assert_eq!(rec.count("other"), 1);
}

#[tokio::test]
async fn empty_group_is_a_no_op() {
    let (options, buffer) = captured_options();
    Engine::new(Parallel::new(Vec::<Runnable>::new()))
        .execute(CancelToken::new(), options)
        .await
        .unwrap();
    assert!(buffer.is_empty());
}

#[tokio::test]
async fn outer_cancellation_reaches_every_branch() {
    init_tracing();
    let rec = Recorder::new();
    let tree = parallel![
        rec.slow_task("a", Duration::from_secs(30)),
        rec.slow_task("b", Duration::from_secs(30)),
    ];

    let cancel = CancelToken::new();
    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            cancel.cancel();
        });
    }

    let (options, _buffer) = captured_options();
    let err = with_timeout(Engine::new(tree).execute(cancel, options))
        .await
        .unwrap_err();

    assert!(matches!(err, RuntreeError::Cancelled));
    assert_eq!(rec.count("a:cancelled"), 1);
    assert_eq!(rec.count("b:cancelled"), 1);
}

#[tokio::test]
async fn group_failure_does_not_cancel_the_caller() {
    init_tracing();
    let rec = Recorder::new();
    let cancel = CancelToken::new();

    let (options, _buffer) = captured_options();
    let _ = Engine::new(parallel![rec.failing_task("x", "nope"), rec.task("y")])
        .execute(cancel.clone(), options)
        .await;

    assert!(!cancel.is_cancelled());
}
