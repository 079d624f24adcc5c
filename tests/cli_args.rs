use clap::Parser;

use runtree::cli::{CliArgs, Command, LogLevel};
use runtree::config::DEFAULT_CONFIG_FILE;
use runtree::logging::filter_directive;

#[test]
fn defaults_to_running_the_root_tree() {
    let args = CliArgs::try_parse_from(["runtree"]).unwrap();
    assert_eq!(args.config, DEFAULT_CONFIG_FILE);
    assert!(!args.verbose);
    assert!(args.command.is_none());
}

#[test]
fn subcommands_parse() {
    let args = CliArgs::try_parse_from(["runtree", "-v", "run", "fmt", "test"]).unwrap();
    assert!(args.verbose);
    match args.command {
        Some(Command::Run { tasks }) => assert_eq!(tasks, vec!["fmt", "test"]),
        other => panic!("expected run, got {other:?}"),
    }

    let args = CliArgs::try_parse_from(["runtree", "--config", "ci/runtree.toml", "plan", "--json"])
        .unwrap();
    assert_eq!(args.config, "ci/runtree.toml");
    assert!(matches!(args.command, Some(Command::Plan { json: true })));

    assert!(matches!(
        CliArgs::try_parse_from(["runtree", "shims"]).unwrap().command,
        Some(Command::Shims)
    ));
}

#[test]
fn log_level_flag_beats_environment() {
    assert_eq!(filter_directive(Some(LogLevel::Warn), Some("trace")), "warn");
    assert_eq!(filter_directive(None, Some(" DEBUG ")), "debug");
    assert_eq!(
        filter_directive(None, Some("warn,runtree::exec=debug")),
        "warn,runtree::exec=debug"
    );
    assert_eq!(filter_directive(None, Some("runtree=loud")), "info");
    assert_eq!(filter_directive(None, Some("")), "info");
    assert_eq!(filter_directive(None, None), "info");
}
