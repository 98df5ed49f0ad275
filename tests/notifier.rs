//! Notification protocol tests against a mock supervisor socket.

use std::time::Duration;

use lifecycle_notifier::notify::{NotificationMessage, Notifier, NotifyError};

mod common;
use common::MockSupervisor;

#[tokio::test]
async fn test_no_supervisor_sends_nothing() {
    let supervisor = MockSupervisor::bind();
    let notifier = Notifier::with_socket_env(format!("LIFECYCLE_TEST_UNSET_{}", common::unique_id()));

    for message in ["READY=1", "STOPPING=1", "STATUS=idle\nMAINPID=1"] {
        assert!(notifier.send(&NotificationMessage::new(message).unwrap()).is_ok());
    }
    assert!(notifier.reloading().is_ok());

    supervisor.assert_silent().await;
}

#[tokio::test]
async fn test_empty_message_rejected_with_supervisor_present() {
    let supervisor = MockSupervisor::bind();
    let notifier = supervisor.notifier();

    assert!(matches!(
        notifier.send_bytes(b""),
        Err(NotifyError::InvalidArgument(_))
    ));
    supervisor.assert_silent().await;
}

#[tokio::test]
async fn test_unsupported_address_family() {
    for address in ["notify.sock", "run/notify", "tcp://127.0.0.1:1"] {
        let var = format!("LIFECYCLE_TEST_BAD_{}", common::unique_id());
        common::set_env(&var, address);
        let notifier = Notifier::with_socket_env(var);

        assert!(
            matches!(notifier.ready(), Err(NotifyError::UnsupportedAddressFamily(_))),
            "{address} should be rejected"
        );
    }
}

#[tokio::test]
async fn test_convenience_encodings_are_exact() {
    let supervisor = MockSupervisor::bind();
    let notifier = supervisor.notifier();

    notifier.ready().unwrap();
    assert_eq!(supervisor.recv().await, "READY=1");

    notifier.stopping().unwrap();
    assert_eq!(supervisor.recv().await, "STOPPING=1");

    notifier.debug_enabled().unwrap();
    assert_eq!(supervisor.recv().await, "DEBUG=1");

    notifier.status("draining").unwrap();
    assert_eq!(supervisor.recv().await, "STATUS=draining");

    notifier.main_pid(4242).unwrap();
    assert_eq!(supervisor.recv().await, "MAINPID=4242");

    notifier.reloading().unwrap();
    let reloading = supervisor.recv().await;
    assert!(common::monotonic_usec(&reloading) > 0);
    assert!(!reloading.ends_with('\n'));
}

#[tokio::test]
async fn test_one_datagram_per_call() {
    let supervisor = MockSupervisor::bind();
    let notifier = supervisor.notifier();

    for _ in 0..3 {
        notifier.ready().unwrap();
    }
    for _ in 0..3 {
        assert_eq!(supervisor.recv().await, "READY=1");
    }
    supervisor.assert_silent().await;
}

#[tokio::test]
async fn test_reloading_timestamps_increase() {
    let supervisor = MockSupervisor::bind();
    let notifier = supervisor.notifier();

    notifier.reloading().unwrap();
    tokio::time::sleep(Duration::from_millis(10)).await;
    notifier.reloading().unwrap();

    let first = common::monotonic_usec(&supervisor.recv().await);
    let second = common::monotonic_usec(&supervisor.recv().await);
    assert!(second > first, "{second} should be after {first}");
    assert!(second - first >= 10_000);
}

#[tokio::test]
async fn test_supervisor_gone_is_transport_error() {
    let supervisor = MockSupervisor::bind();
    let mut stale = supervisor.address().to_os_string();
    stale.push(".stale");

    // Bind then close: the path exists but nobody listens.
    std::os::unix::net::UnixDatagram::bind(&stale).unwrap();
    let var = format!("LIFECYCLE_TEST_STALE_{}", common::unique_id());
    common::set_env(&var, &stale);
    let notifier = Notifier::with_socket_env(var);

    assert!(matches!(notifier.ready(), Err(NotifyError::Transport(_))));
    drop(supervisor);
}

#[cfg(target_os = "linux")]
#[tokio::test]
async fn test_abstract_namespace_round_trip() {
    let name = format!("lifecycle-notifier-test-{}", common::unique_id());
    let supervisor = MockSupervisor::bind_abstract(&name);

    supervisor.notifier().ready().unwrap();
    assert_eq!(supervisor.recv().await, "READY=1");
}
