// tests/output_sink.rs

use std::path::PathBuf;

use freshrun::config::PersistOptions;
use freshrun::output::{FileSinks, LogRecord, OutputSink, RecordKind};

#[test]
fn sequences_are_independent_and_ordered() {
    let sink = OutputSink::detached("api");
    sink.log(LogRecord::new("Built in 0.100 s").with_tag("Build"));
    sink.stdout(LogRecord::new("listening").with_tag("Run"));
    sink.log(LogRecord::new("Has been run in 0.010 s").with_tag("Run"));

    let logs = sink.records(RecordKind::Log);
    assert_eq!(logs.len(), 2);
    assert_eq!(logs[0].message, "Built in 0.100 s");
    assert_eq!(logs[1].kind, RecordKind::Log);
    assert_eq!(sink.count(RecordKind::Stdout), 1);
    assert_eq!(sink.count(RecordKind::Error), 0);
}

#[test]
fn notification_slot_never_blocks() {
    let (sink, mut rx) = OutputSink::new("api", false, None);
    for i in 0..10 {
        sink.error(LogRecord::new(format!("error {i}")));
    }
    assert!(rx.try_recv().is_ok());
    assert!(rx.try_recv().is_err());
    assert_eq!(sink.count(RecordKind::Error), 10);

    drop(rx);
    sink.log(LogRecord::new("nobody listening"));
    assert_eq!(sink.count(RecordKind::Log), 1);
}

#[test]
fn render_includes_name_path_and_output() {
    let record = LogRecord::new("Build failed")
        .with_path("/proj")
        .with_output("main.go:3: undefined: x\n");
    let line = record.render("api");
    assert!(line.contains(" api : Build failed /proj main.go:3: undefined: x"));
    assert!(!line.ends_with('\n'));
}

#[test]
fn blank_output_is_dropped() {
    let record = LogRecord::new("ok").with_output("  \n");
    assert_eq!(record.output, None);
}

#[test]
fn enabled_sequences_are_appended_to_disk() {
    let root = tempfile::tempdir().expect("tempdir");
    let options = PersistOptions {
        outputs: true,
        logs: false,
        errors: true,
        dir: PathBuf::from(".freshrun"),
    };
    let files = FileSinks::from_options(root.path(), &options).expect("some sequence persisted");
    let (sink, _rx) = OutputSink::new("api", false, Some(files));

    sink.stdout(LogRecord::new("hello"));
    sink.stdout(LogRecord::new("again"));
    sink.log(LogRecord::new("not persisted"));
    sink.error(LogRecord::new("boom").with_tag("Build"));

    let dir = root.path().join(".freshrun");
    let outputs = std::fs::read_to_string(dir.join("outputs.log")).expect("outputs.log");
    assert_eq!(outputs.lines().count(), 2);
    assert!(outputs.lines().next().is_some_and(|l| l.ends_with("api : hello")));
    assert!(!dir.join("logs.log").exists());
    let errors = std::fs::read_to_string(dir.join("errors.log")).expect("errors.log");
    assert!(errors.contains("boom"));
}

#[test]
fn nothing_persisted_means_no_file_sinks() {
    let options = PersistOptions::default();
    assert!(FileSinks::from_options(std::path::Path::new("/proj"), &options).is_none());
}
