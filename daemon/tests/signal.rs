//! Signals delivered before the supervisor awaits shutdown are not lost.

#![cfg(unix)]

use std::process::Command;
use std::time::Duration;

use marca_daemon::signal::shutdown_signal;

#[tokio::test]
async fn test_signal_before_first_poll_is_held() {
    let shutdown = shutdown_signal().unwrap();

    // Delivered while startup would still be running, before any poll.
    let status = Command::new("kill")
        .args(["-TERM", &std::process::id().to_string()])
        .status()
        .unwrap();
    assert!(status.success());
    tokio::time::sleep(Duration::from_millis(100)).await;

    tokio::time::timeout(Duration::from_secs(5), shutdown)
        .await
        .unwrap();
}
