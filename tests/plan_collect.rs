mod common;
use crate::common::{Recorder, captured_options, init_tracing};

use std::collections::BTreeSet;

use runtree::engine::{StepKind, render_tree};
use runtree::{CancelToken, Engine, RuntreeError, Task, parallel, run_in, serial};

#[tokio::test]
async fn plan_mirrors_the_static_tree() {
    init_tracing();
    let rec = Recorder::new();
    let tree = serial![
        rec.task("fmt"),
        parallel![rec.task("lint"), rec.task("test")],
    ];

    let plan = Engine::new(tree).plan().await.unwrap();

    assert_eq!(plan.steps().len(), 1);
    let root = &plan.steps()[0];
    assert_eq!(root.kind, StepKind::Serial);
    assert_eq!(root.children.len(), 2);
    assert_eq!(root.children[0].kind, StepKind::Task);
    assert_eq!(root.children[0].name.as_deref(), Some("fmt"));
    assert_eq!(root.children[0].usage.as_deref(), Some("fmt task"));

    let group = &root.children[1];
    assert_eq!(group.kind, StepKind::Parallel);
    let names: Vec<_> = group.children.iter().filter_map(|c| c.name.as_deref()).collect();
    assert_eq!(names, vec!["lint", "test"]);

    assert_eq!(plan.task_names(), vec!["fmt", "lint", "test"]);
}

#[tokio::test]
async fn planning_never_runs_bodies() {
    init_tracing();
    let rec = Recorder::new();
    let tree = serial![rec.task("a"), parallel![rec.task("b"), rec.failing_task("c", "x")]];

    Engine::new(tree).plan().await.unwrap();

    assert!(rec.executed().is_empty());
}

#[tokio::test]
async fn repeated_occurrences_are_marked_deduped() {
    init_tracing();
    let rec = Recorder::new();
    let build = rec.task("build");
    let tree = serial![&build, Task::new("test", "tests", serial![&build, rec.task("unit")])];

    let plan = Engine::new(tree).plan().await.unwrap();

    let build_steps: Vec<_> = plan.steps()[0]
        .walk()
        .filter(|s| s.name.as_deref() == Some("build"))
        .collect();
    assert_eq!(build_steps.len(), 2);
    assert!(!build_steps[0].deduped);
    assert!(build_steps[1].deduped);

    let text = render_tree(&plan);
    assert!(text.contains("build  build task (deduped)"), "{text}");
}

#[tokio::test]
async fn plan_tasks_match_executed_tasks() {
    init_tracing();
    let rec = Recorder::new();
    let shared = rec.task("shared");
    let tree = serial![
        &shared,
        parallel![rec.task("p1"), Task::new("p2", "nested", serial![&shared, rec.task("leaf")])],
        rec.task("last"),
    ];
    let engine = Engine::new(tree);

    let plan = engine.plan().await.unwrap();
    let planned: BTreeSet<String> = plan.steps()[0]
        .walk()
        .filter(|s| s.kind == StepKind::Task && !s.deduped)
        .filter_map(|s| s.name.clone())
        .collect();

    let (options, _buffer) = captured_options();
    engine.execute(CancelToken::new(), options).await.unwrap();

    // `p2` is a composite task: its own body is not a recorder leaf.
    let mut executed: BTreeSet<String> = rec.executed().into_iter().collect();
    executed.insert("p2".to_string());
    assert_eq!(planned, executed);
}

#[tokio::test]
async fn hidden_tasks_are_flagged_and_not_listed() {
    init_tracing();
    let rec = Recorder::new();
    let setup = Task::builder("setup", "prepare", rec.task("inner")).hidden().build();
    let plan = Engine::new(serial![&setup, rec.task("build")]).plan().await.unwrap();

    let setup_step = plan.steps()[0]
        .walk()
        .find(|s| s.name.as_deref() == Some("setup"))
        .unwrap();
    assert!(setup_step.hidden);

    let visible: Vec<_> = plan.visible_tasks(".").iter().map(|t| t.name()).collect();
    assert!(!visible.contains(&"setup"));
    assert!(visible.contains(&"build"));
    assert!(plan.find_task("setup").is_some());
}

fn planned_dedup_flags(plan: &runtree::ExecutionPlan, name: &str) -> Vec<bool> {
    plan.steps()[0]
        .walk()
        .filter(|s| s.name.as_deref() == Some(name))
        .map(|s| s.deduped)
        .collect()
}

#[tokio::test]
async fn root_only_filter_dedups_against_unfiltered_occurrence() {
    init_tracing();
    let rec = Recorder::new();
    let deploy = rec.task("deploy");
    let engine = Engine::new(serial![&deploy, run_in(&deploy).build().unwrap()]);

    let plan = engine.plan().await.unwrap();
    assert_eq!(planned_dedup_flags(&plan, "deploy"), vec![false, true]);

    let (options, _buffer) = captured_options();
    engine.execute(CancelToken::new(), options).await.unwrap();
    assert_eq!(rec.executed(), vec!["deploy"]);
}

#[tokio::test]
async fn filter_over_new_directories_is_not_deduped() {
    init_tracing();
    let rec = Recorder::new();
    let check = rec.task("check");
    let engine = Engine::new(serial![
        &check,
        run_in(&check).include("svc").build().unwrap(),
    ]);

    let plan = engine.plan().await.unwrap();
    assert_eq!(planned_dedup_flags(&plan, "check"), vec![false, false]);

    let (options, _buffer) = captured_options();
    engine.execute(CancelToken::new(), options).await.unwrap();
    assert_eq!(rec.executed(), vec!["check", "check@svc"]);
}

#[tokio::test]
async fn duplicate_task_names_are_a_configuration_error() {
    init_tracing();
    let rec = Recorder::new();
    let tree = serial![rec.task("build"), rec.task("build")];

    let err = Engine::new(tree).plan().await.unwrap_err();
    match err {
        RuntreeError::Config(msg) => assert!(msg.contains("duplicate task name 'build'")),
        other => panic!("expected Config error, got {other:?}"),
    }
}

#[tokio::test]
async fn duplicate_task_names_fail_execution_before_anything_runs() {
    init_tracing();
    let rec = Recorder::new();
    let tree = serial![rec.task("build"), rec.task("build")];

    let (options, _buffer) = captured_options();
    let err = Engine::new(tree)
        .execute(CancelToken::new(), options)
        .await
        .unwrap_err();

    assert!(matches!(err, RuntreeError::Config(_)), "{err:?}");
    assert!(rec.executed().is_empty());
}

#[tokio::test]
async fn skip_everywhere_leaves_task_out_of_the_plan() {
    init_tracing();
    let rec = Recorder::new();
    let filter = run_in(serial![rec.task("build"), rec.task("legacy")])
        .include("svc")
        .skip_task_everywhere("legacy")
        .build()
        .unwrap();
    let engine = Engine::new(filter);

    let plan = engine.plan().await.unwrap();
    assert_eq!(plan.task_names(), vec!["build"]);

    let (options, _buffer) = captured_options();
    engine.execute(CancelToken::new(), options).await.unwrap();
    assert_eq!(rec.executed(), vec!["build@svc"]);
}

#[tokio::test]
async fn json_export_has_steps_and_paths() {
    init_tracing();
    let rec = Recorder::new();
    let filter = run_in(rec.task("test"))
        .include("services/api")
        .include("services/web")
        .build()
        .unwrap();
    let plan = Engine::new(serial![rec.task("fmt"), filter])
        .plan()
        .await
        .unwrap();

    let json: serde_json::Value = serde_json::from_str(&plan.to_json().unwrap()).unwrap();
    assert_eq!(json["steps"][0]["type"], "serial");
    assert_eq!(json["steps"][0]["children"][1]["name"], "test");
    assert_eq!(
        json["paths"]["test"],
        serde_json::json!(["services/api", "services/web"])
    );
    assert!(json["paths"].get("fmt").is_none());
}

#[tokio::test]
async fn shim_dirs_always_include_the_root() {
    init_tracing();
    let rec = Recorder::new();
    let filter = run_in(rec.task("test"))
        .include("b")
        .include("a")
        .build()
        .unwrap();
    let plan = Engine::new(serial![rec.task("fmt"), filter]).plan().await.unwrap();

    assert_eq!(plan.shim_dirs(), vec![".", "a", "b"]);
}
