// tests/restart_token.rs

use std::time::Duration;

use freshrun::exec::RestartToken;
use tokio::time::timeout;

#[tokio::test]
async fn closing_is_level_triggered() {
    let token = RestartToken::new();
    let signal = token.signal();
    assert!(!signal.is_cancelled());

    token.close();
    assert!(signal.is_cancelled());
    // Observed late, still resolves.
    timeout(Duration::from_secs(1), signal.cancelled())
        .await
        .expect("already cancelled");
    timeout(Duration::from_secs(1), signal.cancelled())
        .await
        .expect("still cancelled");
}

#[tokio::test]
async fn replace_cancels_old_generation_only() {
    let mut token = RestartToken::new();
    let first = token.signal();
    assert_eq!(first.generation(), 1);

    let next = token.replace();
    let second = token.signal();

    assert_eq!(next, 2);
    assert!(first.is_cancelled());
    assert!(first.is_superseded());
    assert!(!second.is_cancelled());
    assert!(!second.is_superseded());
    assert!(
        timeout(Duration::from_millis(50), second.cancelled())
            .await
            .is_err(),
        "live generation must not be cancelled"
    );
}

#[tokio::test]
async fn dropping_the_token_cancels_its_signals() {
    let token = RestartToken::new();
    let signal = token.signal();
    drop(token);
    assert!(signal.is_cancelled());
    timeout(Duration::from_secs(1), signal.cancelled())
        .await
        .expect("sender gone");
}

#[test]
fn generations_increase_across_many_restarts() {
    let mut token = RestartToken::new();
    let mut signals = vec![token.signal()];
    for _ in 0..10 {
        token.replace();
        signals.push(token.signal());
    }
    let gens: Vec<u64> = signals.iter().map(|s| s.generation()).collect();
    assert!(gens.windows(2).all(|w| w[0] < w[1]));
    let (live, stale) = signals.split_last().expect("non-empty");
    assert!(!live.is_superseded());
    assert!(stale.iter().all(|s| s.is_superseded() && s.is_cancelled()));
}
