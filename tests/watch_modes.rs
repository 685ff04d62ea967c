// tests/watch_modes.rs

mod common;
use crate::common::{go_module, p, write_event, START};

use std::sync::Arc;
use std::time::Duration;

use notify::event::{AccessKind, MetadataKind, ModifyKind};
use notify::{Event, EventKind};
use proptest::prelude::*;
use tokio::time::{Instant, timeout_at};

use freshrun::config::WatchedProject;
use freshrun::fs::mock::MockFileSystem;
use freshrun::output::OutputSink;
use freshrun::watch::{
    ClassifiedChange, Debouncer, EventWatcher, ManualClock, PathClassifier, PollWatcher,
    RawEventSender, TreeScanner, WatchStrategy,
};
use freshrun_test_utils::builders::ProjectBuilder;
use freshrun_test_utils::with_timeout;

fn project() -> WatchedProject {
    ProjectBuilder::new("demo", common::ROOT)
        .with_ignore("vendor")
        .with_poll_interval(Duration::from_millis(10))
        .build()
}

fn scanned(strategy: &mut dyn WatchStrategy, fs: &MockFileSystem, project: &WatchedProject) {
    let classifier = PathClassifier::new(project);
    TreeScanner::new(fs, project, &classifier)
        .scan(strategy, &OutputSink::detached("demo"))
        .expect("scan");
}

/// Drive a strategy until the debouncer accepts something.
async fn next_accepted(
    strategy: &mut dyn WatchStrategy,
    debouncer: &mut Debouncer,
) -> ClassifiedChange {
    loop {
        let event = strategy
            .next_change(debouncer.watermark())
            .await
            .expect("stream open")
            .expect("no watch error");
        if let Some(change) = debouncer.accept(strategy, &event) {
            return change;
        }
    }
}

#[tokio::test]
async fn event_and_poll_modes_accept_the_same_change() {
    let project = project();

    // Event mode.
    let fs = go_module();
    let clock = ManualClock::new(START);
    let (mut events, tx) = EventWatcher::detached(Arc::new(fs.clone()));
    scanned(&mut events, &fs, &project);
    let mut debouncer = Debouncer::new(PathClassifier::new(&project), Arc::new(clock.clone()));

    clock.set(START + 1);
    fs.touch(p("pkg/util.go"), START + 1);
    tx.send(write_event(&p("pkg/util.go"))).expect("send");
    let from_events = with_timeout(next_accepted(&mut events, &mut debouncer)).await;

    // Poll mode over an identical tree.
    let fs = go_module();
    let clock = ManualClock::new(START);
    let mut poll = PollWatcher::new(
        Arc::new(fs.clone()),
        project.roots(),
        PathClassifier::new(&project),
        project.poll_interval,
    );
    scanned(&mut poll, &fs, &project);
    let mut debouncer = Debouncer::new(PathClassifier::new(&project), Arc::new(clock.clone()));

    clock.set(START + 1);
    fs.touch(p("pkg/util.go"), START + 1);
    let from_poll = with_timeout(next_accepted(&mut poll, &mut debouncer)).await;

    assert_eq!(from_events, from_poll);
    assert_eq!(from_poll.file, p("pkg/util.go"));
    assert_eq!(from_poll.dir, p("pkg"));
}

/// How long a replay step waits for the strategy to surface changes.
const QUIET: Duration = Duration::from_millis(50);

/// Paths of the fixture module that a replay may write to.
const TOUCHABLE: &[&str] = &[
    "main.go",
    "pkg/util.go",
    "pkg/util_test.go",
    "vendor/dep/dep.go",
    ".git/hooks/pre.go",
    "README.md",
    "pkg",
];

#[derive(Debug, Clone)]
enum Mutation {
    /// Rewrite an existing path; `tick` moves the clock a second first.
    Touch { rel: &'static str, tick: bool },
    /// Create a file the scan never registered.
    Create { tick: bool },
}

#[derive(Debug, Clone, Copy)]
enum Mode {
    Event,
    Poll,
}

/// Collect every change the debouncer accepts until the strategy goes quiet.
async fn drain(
    strategy: &mut dyn WatchStrategy,
    debouncer: &mut Debouncer,
) -> Vec<ClassifiedChange> {
    let deadline = Instant::now() + QUIET;
    let mut accepted = Vec::new();
    loop {
        let next = timeout_at(deadline, strategy.next_change(debouncer.watermark())).await;
        let Ok(Some(event)) = next else { break };
        let event = event.expect("no watch error");
        if let Some(change) = debouncer.accept(strategy, &event) {
            accepted.push(change);
        }
    }
    accepted
}

/// Apply `mutations` one at a time to a freshly scanned module and return
/// the accepted changes in order.
async fn replay(mode: Mode, mutations: &[Mutation]) -> Vec<ClassifiedChange> {
    let project = project();
    let fs = go_module();
    let clock = ManualClock::new(START);
    let (mut strategy, events): (Box<dyn WatchStrategy>, Option<RawEventSender>) = match mode {
        Mode::Event => {
            let (watcher, tx) = EventWatcher::detached(Arc::new(fs.clone()));
            (Box::new(watcher), Some(tx))
        }
        Mode::Poll => {
            let watcher = PollWatcher::new(
                Arc::new(fs.clone()),
                project.roots(),
                PathClassifier::new(&project),
                project.poll_interval,
            );
            (Box::new(watcher), None)
        }
    };
    scanned(strategy.as_mut(), &fs, &project);
    let mut debouncer = Debouncer::new(PathClassifier::new(&project), Arc::new(clock.clone()));

    let mut now = START;
    let mut accepted = Vec::new();
    for (i, mutation) in mutations.iter().enumerate() {
        let (path, tick) = match mutation {
            Mutation::Touch { rel, tick } => (p(rel), *tick),
            Mutation::Create { tick } => (p(&format!("pkg/new{i}.go")), *tick),
        };
        if tick {
            now += 1;
            clock.set(now);
        }
        match mutation {
            Mutation::Touch { .. } => fs.touch(&path, now),
            Mutation::Create { .. } => fs.add_file(&path, now),
        }
        if let Some(tx) = &events {
            tx.send(write_event(&path)).expect("send");
        }
        accepted.extend(drain(strategy.as_mut(), &mut debouncer).await);
    }
    accepted
}

#[tokio::test(start_paused = true)]
async fn event_and_poll_modes_agree_on_a_mutation_sequence() {
    let mutations = [
        Mutation::Touch { rel: "main.go", tick: true },
        // Same second as the accepted write.
        Mutation::Touch { rel: "pkg/util.go", tick: false },
        Mutation::Touch { rel: "pkg/util_test.go", tick: true },
        Mutation::Touch { rel: "vendor/dep/dep.go", tick: true },
        Mutation::Touch { rel: "pkg", tick: false },
        Mutation::Create { tick: true },
        Mutation::Touch { rel: "main.go", tick: false },
    ];

    let from_events = replay(Mode::Event, &mutations).await;
    let from_poll = replay(Mode::Poll, &mutations).await;

    assert_eq!(from_events, from_poll);
    let files: Vec<_> = from_poll.iter().map(|c| c.file.clone()).collect();
    assert_eq!(files, vec![p("main.go"), p("pkg/util.go"), p("main.go")]);
    assert_eq!(from_poll[1].observed, p("pkg/util_test.go"));
    assert_eq!(from_poll[1].dir, p("pkg"));
}

fn mutation() -> impl Strategy<Value = Mutation> {
    prop_oneof![
        4 => (prop::sample::select(TOUCHABLE), any::<bool>())
            .prop_map(|(rel, tick)| Mutation::Touch { rel, tick }),
        1 => any::<bool>().prop_map(|tick| Mutation::Create { tick }),
    ]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(48))]

    #[test]
    fn event_and_poll_modes_accept_identical_sequences(
        mutations in proptest::collection::vec(mutation(), 1..16)
    ) {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_time()
            .start_paused(true)
            .build()
            .expect("runtime");
        let (from_events, from_poll) = runtime.block_on(async {
            (
                replay(Mode::Event, &mutations).await,
                replay(Mode::Poll, &mutations).await,
            )
        });
        prop_assert_eq!(from_events, from_poll);
    }
}

#[tokio::test]
async fn metadata_only_events_are_discarded() {
    let project = project();
    let fs = go_module();
    let (mut watcher, tx) = EventWatcher::detached(Arc::new(fs.clone()));
    scanned(&mut watcher, &fs, &project);

    let chmod = Event::new(EventKind::Modify(ModifyKind::Metadata(MetadataKind::Permissions)))
        .add_path(p("main.go"));
    let read = Event::new(EventKind::Access(AccessKind::Any)).add_path(p("main.go"));
    tx.send(Ok(chmod)).expect("send");
    tx.send(Ok(read)).expect("send");
    fs.touch(p("main.go"), START + 5);
    tx.send(write_event(&p("main.go"))).expect("send");

    let event = with_timeout(watcher.next_change(freshrun::watch::Watermark::from_secs(START)))
        .await
        .expect("open")
        .expect("ok");
    assert_eq!(event.path, p("main.go"));
    assert_eq!(freshrun::watch::debounce::unix_secs(event.modified), START + 5);
}

#[tokio::test]
async fn vanished_paths_are_dropped_silently() {
    let fs = go_module();
    let (mut watcher, tx) = EventWatcher::detached(Arc::new(fs.clone()));
    fs.remove(p("main.go"));
    tx.send(write_event(&p("main.go"))).expect("send");
    fs.touch(p("pkg/util.go"), START + 2);
    tx.send(write_event(&p("pkg/util.go"))).expect("send");

    let event = with_timeout(watcher.next_change(freshrun::watch::Watermark::from_secs(START)))
        .await
        .expect("open")
        .expect("ok");
    assert_eq!(event.path, p("pkg/util.go"));
}

#[tokio::test]
async fn poll_walk_skips_ignored_and_hidden_subtrees() {
    let project = project();
    let fs = go_module();
    let mut poll = PollWatcher::new(
        Arc::new(fs.clone()),
        project.roots(),
        PathClassifier::new(&project),
        project.poll_interval,
    );
    scanned(&mut poll, &fs, &project);
    // Even if registered, paths under ignored or hidden dirs must not surface.
    poll.register(&p(".git/hooks/pre.go")).expect("register");
    poll.register(&p("vendor/dep/dep.go")).expect("register");

    fs.touch(p(".git/hooks/pre.go"), START + 3);
    fs.touch(p("vendor/dep/dep.go"), START + 3);
    fs.touch(p("main.go"), START + 3);

    let event = with_timeout(poll.next_change(freshrun::watch::Watermark::from_secs(START)))
        .await
        .expect("open")
        .expect("ok");
    assert_eq!(event.path, p("main.go"));
}
