// tests/config_validation.rs

use std::path::Path;
use std::time::Duration;

use freshrun::config::{ConfigFile, load_and_validate};
use freshrun::errors::FreshrunError;
use freshrun::types::{StepKind, WatchMode, parse_duration};
use freshrun_test_utils::builders::config_from_toml;

fn config_error(src: &str) -> String {
    match config_from_toml(src) {
        Err(FreshrunError::ConfigError(msg)) => msg,
        other => panic!("expected ConfigError, got {other:?}"),
    }
}

#[test]
fn minimal_project_gets_go_defaults() {
    let cfg = config_from_toml(
        r#"
        [[project]]
        name = "api"
        path = "."
        extensions = ["go"]
        "#,
    )
    .expect("valid");

    assert_eq!(cfg.settings.mode, WatchMode::Event);
    let project = cfg.project("api").expect("api");
    assert!(project.extensions.contains(".go"));
    assert_eq!(project.tools.command(StepKind::Build).cmd, "go build");
    assert!(project.tools.enabled(StepKind::Run));
    assert!(!project.tools.enabled(StepKind::Generate));
    assert!(!project.tools.enabled(StepKind::Install));
}

#[test]
fn settings_and_tool_overrides_are_resolved() {
    let cfg = config_from_toml(
        r#"
        [settings]
        mode = "poll"
        poll_interval = "250ms"
        grace_period = "2s"

        [settings.files]
        errors = true

        [[project]]
        name = "api"
        path = "services/api"
        watch = ["cmd", "internal"]
        extensions = [".go", ".tmpl"]
        ignore = ["vendor", "**/*_gen.go"]
        before = ["make deps"]

        [project.tools.generate]
        enabled = true

        [project.tools.run]
        cmd = "./bin/api --dev"
        ready_on_stdout = "listening on :\\d+"
        "#,
    )
    .expect("valid");

    assert_eq!(cfg.settings.mode, WatchMode::Poll);
    assert_eq!(cfg.settings.grace_period, Duration::from_secs(2));
    assert!(cfg.settings.persist.errors);
    assert!(!cfg.settings.persist.outputs);

    let project = &cfg.projects[0];
    assert_eq!(project.poll_interval, Duration::from_millis(250));
    assert_eq!(project.watch_dirs.len(), 2);
    assert!(project.tools.enabled(StepKind::Generate));
    let run = project.tools.command(StepKind::Run);
    assert_eq!(run.cmd, "./bin/api --dev");
    assert!(run
        .ready_on_stdout
        .as_ref()
        .is_some_and(|re| re.is_match("listening on :8080")));
}

#[test]
fn rejects_missing_projects() {
    assert!(config_error("[settings]\necho = false\n").contains("at least one"));
}

#[test]
fn rejects_duplicate_names() {
    let msg = config_error(
        r#"
        [[project]]
        name = "api"
        path = "a"
        extensions = ["go"]

        [[project]]
        name = "api"
        path = "b"
        extensions = ["go"]
        "#,
    );
    assert!(msg.contains("duplicate"));
}

#[test]
fn rejects_missing_root_path() {
    let msg = config_error(
        r#"
        [[project]]
        name = "api"
        extensions = ["go"]
        "#,
    );
    assert!(msg.contains("root `path`"));
}

#[test]
fn rejects_project_without_extensions() {
    let msg = config_error(
        r#"
        [[project]]
        name = "api"
        path = "."
        "#,
    );
    assert!(msg.contains("extension"));
}

#[test]
fn rejects_ready_on_stdout_outside_run() {
    let msg = config_error(
        r#"
        [[project]]
        name = "api"
        path = "."
        extensions = ["go"]

        [project.tools.build]
        ready_on_stdout = "ok"
        "#,
    );
    assert!(msg.contains("only valid for tools.run"));
}

#[test]
fn rejects_bad_durations_and_empty_commands() {
    let msg = config_error(
        r#"
        [settings]
        grace_period = "soon"

        [[project]]
        name = "api"
        path = "."
        extensions = ["go"]
        "#,
    );
    assert!(msg.contains("grace_period"));

    let msg = config_error(
        r#"
        [[project]]
        name = "api"
        path = "."
        extensions = ["go"]

        [project.tools.test]
        cmd = "  "
        "#,
    );
    assert!(msg.contains("empty `cmd`"));
}

#[test]
fn oversized_durations_are_config_errors() {
    assert!(parse_duration("400000000000000000m").is_err());
    assert!(parse_duration("6000000000000000h").is_err());
    assert_eq!(
        parse_duration("5000000000000h").expect("fits"),
        Duration::from_secs(5_000_000_000_000 * 3600)
    );

    let msg = config_error(
        r#"
        [settings]
        poll_interval = "6000000000000000h"

        [[project]]
        name = "api"
        path = "."
        extensions = ["go"]
        "#,
    );
    assert!(msg.contains("poll_interval"));
    assert!(msg.contains("too large"));
}

#[test]
fn relative_roots_are_rebased_on_the_config_dir() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("Freshrun.toml");
    std::fs::write(
        &path,
        r#"
        [[project]]
        name = "api"
        path = "services/api"
        extensions = ["go"]

        [[project]]
        name = "abs"
        path = "/srv/abs"
        extensions = ["go"]
        "#,
    )
    .expect("write");

    let cfg: ConfigFile = load_and_validate(&path).expect("valid").with_base_dir(dir.path());
    assert_eq!(cfg.projects[0].root, dir.path().join("services/api"));
    assert_eq!(cfg.projects[1].root, Path::new("/srv/abs"));
}
