//! Behavioural tests for the wallet session state machine

use chrono::Utc;
use rust_decimal::Decimal;
use std::sync::Arc;
use std::time::Duration;

use wallet_session::provider::MockOperation;
use wallet_session::{
    ConfirmationStatus, Direction, ErrorKind, IncomingTransfer, MockProvider, ProviderFailure,
    ProviderInfo, ProviderRegistry, SessionError, SessionEvent, SessionStatus, WalletSession,
};

const ADDRESS: &str = "k:abc123";

fn dec(units: i64, scale: u32) -> Decimal {
    Decimal::new(units, scale)
}

fn mock(latency: Duration) -> Arc<MockProvider> {
    Arc::new(
        MockProvider::new()
            .with_account(ADDRESS, dec(10000, 2))
            .with_latency(latency),
    )
}

fn session_over(mock: Arc<MockProvider>) -> Arc<WalletSession> {
    let registry = ProviderRegistry::new()
        .with_provider(
            ProviderInfo::new("spirekey", "SpireKey", "native wallet").recommended(),
            mock.clone(),
        )
        .with_provider(
            ProviderInfo::new("chainweaver", "Chainweaver", "desktop wallet"),
            mock,
        );
    Arc::new(WalletSession::new(registry))
}

async fn connected() -> (Arc<WalletSession>, Arc<MockProvider>) {
    let mock = mock(Duration::ZERO);
    let session = session_over(mock.clone());
    session.connect("spirekey").await.unwrap();
    (session, mock)
}

async fn assert_balance_defined_iff_connected(session: &WalletSession) {
    let snapshot = session.snapshot().await;
    assert_eq!(snapshot.balance.is_some(), snapshot.status == SessionStatus::Connected);
    if snapshot.status != SessionStatus::Connected {
        assert!(snapshot.transactions.is_empty());
        assert!(snapshot.address.is_none());
    }
}

#[tokio::test]
async fn test_demo_scenario() {
    let (session, _mock) = connected().await;

    let snapshot = session.snapshot().await;
    assert_eq!(snapshot.address.as_deref(), Some(ADDRESS));
    assert_eq!(snapshot.balance, Some(dec(10000, 2)));

    let record = session.send("k:xyz", "30", Some("rent")).await.unwrap();
    assert_eq!(record.direction, Direction::Outgoing);
    assert_eq!(record.amount, dec(30, 0));
    assert_eq!(record.counterparty, "k:xyz");
    assert_eq!(record.memo.as_deref(), Some("rent"));
    assert_eq!(record.confirmation_status, ConfirmationStatus::Pending);
    assert_eq!(session.snapshot().await.balance, Some(dec(7000, 2)));

    let result = session.send("k:xyz", "1000", None).await;
    assert!(matches!(result, Err(SessionError::InsufficientBalance { .. })));

    let snapshot = session.snapshot().await;
    assert_eq!(snapshot.balance, Some(dec(7000, 2)));
    assert_eq!(snapshot.transactions.len(), 1);
}

#[tokio::test]
async fn test_balance_defined_iff_connected_across_lifecycle() {
    let mock = mock(Duration::ZERO);
    let session = session_over(mock.clone());
    assert_balance_defined_iff_connected(&session).await;

    session.connect("spirekey").await.unwrap();
    assert_balance_defined_iff_connected(&session).await;

    session.send("k:xyz", "5", None).await.unwrap();
    let _ = session.send("", "5", None).await;
    assert_balance_defined_iff_connected(&session).await;

    session.disconnect().await.unwrap();
    assert_balance_defined_iff_connected(&session).await;

    mock.fail_next(MockOperation::Connect, ProviderFailure::UserRejected)
        .await;
    let _ = session.connect("spirekey").await;
    assert_balance_defined_iff_connected(&session).await;
}

#[tokio::test]
async fn test_connect_when_connected_is_invalid_state() {
    let (session, mock) = connected().await;
    let before = session.snapshot().await;

    let result = session.connect("chainweaver").await;

    assert!(matches!(
        result,
        Err(SessionError::InvalidState {
            status: SessionStatus::Connected,
            ..
        })
    ));
    assert_eq!(session.snapshot().await, before);
    assert_eq!(mock.calls(MockOperation::Connect), 1);
}

#[tokio::test(start_paused = true)]
async fn test_connect_while_connecting_is_rejected() {
    let mock = mock(Duration::from_secs(2));
    let session = session_over(mock.clone());

    let (first, second) = tokio::join!(session.connect("spirekey"), session.connect("spirekey"));

    assert!(first.is_ok());
    let err = second.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidState);
    assert_eq!(mock.calls(MockOperation::Connect), 1);
    assert_eq!(session.status().await, SessionStatus::Connected);
}

#[tokio::test(start_paused = true)]
async fn test_abandoned_connect_rolls_back() {
    let mock = mock(Duration::from_secs(2));
    let session = session_over(mock.clone());

    let abandoned =
        tokio::time::timeout(Duration::from_millis(500), session.connect("spirekey")).await;
    assert!(abandoned.is_err());

    let snapshot = session.snapshot().await;
    assert_eq!(snapshot.status, SessionStatus::Disconnected);
    assert_eq!(snapshot.provider_id, None);
    assert_balance_defined_iff_connected(&session).await;

    session.connect("spirekey").await.unwrap();
    assert_eq!(session.status().await, SessionStatus::Connected);
    assert_eq!(mock.calls(MockOperation::Connect), 2);
}

#[tokio::test]
async fn test_successful_operations_publish_events() {
    let mock = mock(Duration::ZERO);
    let session = session_over(mock);
    let mut events = session.subscribe();

    session.connect("spirekey").await.unwrap();
    assert_eq!(
        events.recv().await.unwrap(),
        SessionEvent::Connected {
            provider_id: "spirekey".to_string(),
            address: ADDRESS.to_string(),
        }
    );

    let record = session.send("k:xyz", "30", Some("rent")).await.unwrap();
    assert_eq!(
        events.recv().await.unwrap(),
        SessionEvent::TransactionSubmitted { record }
    );

    let signature = session.sign("hello").await.unwrap();
    assert_eq!(
        events.recv().await.unwrap(),
        SessionEvent::MessageSigned { signature }
    );
}

#[tokio::test]
async fn test_unknown_provider_is_validation_error() {
    let mock = mock(Duration::ZERO);
    let session = session_over(mock.clone());

    let result = session.connect("metamask").await;

    assert!(matches!(result, Err(SessionError::Validation(_))));
    assert_eq!(session.status().await, SessionStatus::Disconnected);
    assert_eq!(mock.total_calls(), 0);
}

#[tokio::test]
async fn test_connect_failure_leaves_no_partial_state() {
    let mock = mock(Duration::ZERO);
    let session = session_over(mock.clone());
    let mut events = session.subscribe();
    mock.fail_next(
        MockOperation::Connect,
        ProviderFailure::ProviderUnavailable("extension not installed".to_string()),
    )
    .await;

    let result = session.connect("spirekey").await;

    assert!(matches!(result, Err(SessionError::Provider(_))));
    let snapshot = session.snapshot().await;
    assert_eq!(snapshot.status, SessionStatus::Disconnected);
    assert_eq!(snapshot.provider_id, None);
    assert_eq!(snapshot.address, None);
    assert_eq!(snapshot.balance, None);
    assert!(matches!(
        events.recv().await.unwrap(),
        SessionEvent::ConnectionFailed { .. }
    ));

    // a later attempt is allowed
    session.connect("spirekey").await.unwrap();
    assert_eq!(session.status().await, SessionStatus::Connected);
}

#[tokio::test]
async fn test_send_validation_precedes_provider() {
    let (session, mock) = connected().await;

    for (to, amount) in [
        ("", "10"),
        ("   ", "10"),
        ("k:xyz", ""),
        ("k:xyz", "abc"),
        ("k:xyz", "0"),
        ("k:xyz", "-5"),
    ] {
        let result = session.send(to, amount, None).await;
        assert!(
            matches!(result, Err(SessionError::Validation(_))),
            "expected validation error for ({:?}, {:?})",
            to,
            amount
        );
    }

    assert_eq!(mock.calls(MockOperation::Submit), 0);
    let snapshot = session.snapshot().await;
    assert_eq!(snapshot.balance, Some(dec(100, 0)));
    assert!(snapshot.transactions.is_empty());
}

#[tokio::test]
async fn test_insufficient_balance_skips_provider() {
    let (session, mock) = connected().await;

    let result = session.send("k:xyz", "100.01", None).await;

    match result {
        Err(SessionError::InsufficientBalance {
            requested,
            available,
        }) => {
            assert_eq!(requested, dec(10001, 2));
            assert_eq!(available, dec(100, 0));
        }
        other => panic!("unexpected result: {:?}", other),
    }
    assert_eq!(mock.calls(MockOperation::Submit), 0);

    // the whole balance may be sent
    session.send("k:xyz", "100", None).await.unwrap();
    assert_eq!(session.snapshot().await.balance, Some(Decimal::ZERO));
}

#[tokio::test]
async fn test_provider_failure_on_send_changes_nothing() {
    let (session, mock) = connected().await;
    let mut events = session.subscribe();
    mock.fail_next(MockOperation::Submit, ProviderFailure::NetworkError("node down".to_string()))
        .await;

    let result = session.send("k:xyz", "10", None).await;

    assert!(matches!(
        result,
        Err(SessionError::Transaction(ProviderFailure::NetworkError(_)))
    ));
    let snapshot = session.snapshot().await;
    assert_eq!(snapshot.balance, Some(dec(100, 0)));
    assert!(snapshot.transactions.is_empty());
    assert!(matches!(
        events.recv().await.unwrap(),
        SessionEvent::TransactionFailed { .. }
    ));
}

#[tokio::test]
async fn test_send_requires_connection() {
    let mock = mock(Duration::ZERO);
    let session = session_over(mock.clone());

    let result = session.send("k:xyz", "1", None).await;

    assert_eq!(result.unwrap_err().kind(), ErrorKind::InvalidState);
    assert_eq!(mock.total_calls(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_send_effects_are_atomic() {
    let mock = mock(Duration::from_millis(1500));
    let session = session_over(mock.clone());
    session.connect("spirekey").await.unwrap();

    let task = tokio::spawn({
        let session = session.clone();
        async move { session.send("k:xyz", "30", None).await }
    });

    tokio::time::sleep(Duration::from_millis(700)).await;
    let during = session.snapshot().await;
    assert_eq!(during.balance, Some(dec(100, 0)));
    assert!(during.transactions.is_empty());

    task.await.unwrap().unwrap();
    let after = session.snapshot().await;
    assert_eq!(after.balance, Some(dec(70, 0)));
    assert_eq!(after.transactions.len(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_concurrent_send_is_rejected() {
    let mock = mock(Duration::from_millis(1500));
    let session = session_over(mock.clone());
    session.connect("spirekey").await.unwrap();

    let (first, second) = tokio::join!(
        session.send("k:xyz", "10", None),
        session.send("k:xyz", "10", None)
    );

    assert!(first.is_ok());
    assert!(matches!(second, Err(SessionError::OperationInFlight { .. })));
    assert_eq!(mock.calls(MockOperation::Submit), 1);
    assert_eq!(session.snapshot().await.balance, Some(dec(90, 0)));
}

#[tokio::test(start_paused = true)]
async fn test_disconnect_during_sign_is_rejected() {
    let mock = mock(Duration::from_secs(1));
    let session = session_over(mock.clone());
    session.connect("spirekey").await.unwrap();

    let (signed, disconnected) = tokio::join!(session.sign("hello"), session.disconnect());

    assert!(signed.is_ok());
    assert_eq!(disconnected.unwrap_err().kind(), ErrorKind::InvalidState);
    assert_eq!(session.status().await, SessionStatus::Connected);
}

#[tokio::test]
async fn test_disconnect_clears_session() {
    let (session, _mock) = connected().await;
    session.send("k:xyz", "10", None).await.unwrap();
    let mut events = session.subscribe();

    session.disconnect().await.unwrap();

    let snapshot = session.snapshot().await;
    assert_eq!(snapshot.status, SessionStatus::Disconnected);
    assert_eq!(snapshot.address, None);
    assert_eq!(snapshot.balance, None);
    assert!(snapshot.transactions.is_empty());
    assert_eq!(events.recv().await.unwrap(), SessionEvent::Disconnected);
}

#[tokio::test]
async fn test_reconnect_starts_with_empty_history() {
    let (session, _mock) = connected().await;
    session.send("k:xyz", "10", None).await.unwrap();
    session.send("k:xyz", "5", Some("coffee")).await.unwrap();
    assert_eq!(session.snapshot().await.transactions.len(), 2);

    session.disconnect().await.unwrap();
    session.connect("spirekey").await.unwrap();

    let snapshot = session.snapshot().await;
    assert!(snapshot.transactions.is_empty());
    assert_eq!(snapshot.balance, Some(dec(100, 0)));
}

#[tokio::test]
async fn test_sign_leaves_balance_and_history() {
    let (session, _mock) = connected().await;
    session.send("k:xyz", "10", None).await.unwrap();
    let before = session.snapshot().await;

    let result = session.sign("hello").await.unwrap();

    assert!(!result.signature.is_empty());
    assert_eq!(session.snapshot().await, before);
}

#[tokio::test]
async fn test_sign_rejects_empty_message() {
    let (session, mock) = connected().await;

    assert!(matches!(session.sign("").await, Err(SessionError::Validation(_))));
    assert!(matches!(session.sign(" \n").await, Err(SessionError::Validation(_))));
    assert_eq!(mock.calls(MockOperation::Sign), 0);
}

#[tokio::test]
async fn test_sign_failure_is_signing_error() {
    let (session, mock) = connected().await;
    let mut events = session.subscribe();
    mock.fail_next(MockOperation::Sign, ProviderFailure::UserRejected)
        .await;

    let result = session.sign("hello").await;

    assert!(matches!(
        result,
        Err(SessionError::Signing(ProviderFailure::UserRejected))
    ));
    assert!(matches!(
        events.recv().await.unwrap(),
        SessionEvent::SigningFailed { .. }
    ));
}

#[tokio::test]
async fn test_history_is_most_recent_first() {
    let (session, _mock) = connected().await;

    session.send("k:first", "1", None).await.unwrap();
    session.send("k:second", "1", None).await.unwrap();
    session.send("k:third", "1", None).await.unwrap();

    let counterparties: Vec<String> = session
        .snapshot()
        .await
        .transactions
        .into_iter()
        .map(|r| r.counterparty)
        .collect();
    assert_eq!(counterparties, vec!["k:third", "k:second", "k:first"]);
}

#[tokio::test]
async fn test_sync_credits_incoming_transfers() {
    let (session, mock) = connected().await;
    let mut events = session.subscribe();
    let transfer = IncomingTransfer {
        request_key: "in-1".to_string(),
        from: "k:friend".to_string(),
        amount: dec(25, 0),
        memo: Some("payback".to_string()),
        received_at: Utc::now(),
    };
    mock.push_incoming(transfer.clone()).await;
    mock.push_incoming(transfer).await;

    let report = session.sync().await.unwrap();

    assert_eq!(report.received.len(), 1);
    let snapshot = session.snapshot().await;
    assert_eq!(snapshot.balance, Some(dec(125, 0)));
    assert_eq!(snapshot.transactions[0].direction, Direction::Incoming);
    assert_eq!(snapshot.transactions[0].counterparty, "k:friend");
    assert_eq!(
        snapshot.transactions[0].confirmation_status,
        ConfirmationStatus::Confirmed
    );
    assert!(matches!(
        events.recv().await.unwrap(),
        SessionEvent::TransactionReceived { .. }
    ));
}

#[tokio::test]
async fn test_sync_applies_confirmations_and_refunds() {
    let (session, mock) = connected().await;
    let kept = session.send("k:a", "10", None).await.unwrap();
    let dropped = session.send("k:b", "20", None).await.unwrap();
    mock.set_status(&kept.request_key, ConfirmationStatus::Confirmed)
        .await;
    mock.set_status(&dropped.request_key, ConfirmationStatus::Failed)
        .await;

    let report = session.sync().await.unwrap();

    assert_eq!(report.confirmed, 1);
    assert_eq!(report.failed, 1);
    assert_eq!(report.refunded, dec(20, 0));
    let snapshot = session.snapshot().await;
    assert_eq!(snapshot.balance, Some(dec(90, 0)));
    let status_of = |id| {
        snapshot
            .transactions
            .iter()
            .find(|r| r.id == id)
            .map(|r| r.confirmation_status)
    };
    assert_eq!(status_of(kept.id), Some(ConfirmationStatus::Confirmed));
    assert_eq!(status_of(dropped.id), Some(ConfirmationStatus::Failed));

    // settled records are not polled again
    let polled = mock.calls(MockOperation::Status);
    session.sync().await.unwrap();
    assert_eq!(mock.calls(MockOperation::Status), polled);
}

#[tokio::test]
async fn test_sync_failure_changes_nothing() {
    let (session, mock) = connected().await;
    session.send("k:a", "10", None).await.unwrap();
    mock.push_incoming(IncomingTransfer {
        request_key: "in-1".to_string(),
        from: "k:friend".to_string(),
        amount: dec(5, 0),
        memo: None,
        received_at: Utc::now(),
    })
    .await;
    mock.fail_next(MockOperation::Status, ProviderFailure::Timeout)
        .await;
    let before = session.snapshot().await;

    let result = session.sync().await;

    assert!(matches!(
        result,
        Err(SessionError::Provider(ProviderFailure::Timeout))
    ));
    assert_eq!(session.snapshot().await, before);
}

#[tokio::test]
async fn test_sync_rejects_overflowing_transfer() {
    let (session, mock) = connected().await;
    let incoming = |key: &str, amount: Decimal| IncomingTransfer {
        request_key: key.to_string(),
        from: "k:friend".to_string(),
        amount,
        memo: None,
        received_at: Utc::now(),
    };
    mock.push_incoming(incoming("in-small", dec(5, 0))).await;
    mock.push_incoming(incoming("in-huge", Decimal::MAX)).await;
    let before = session.snapshot().await;

    let result = session.sync().await;

    assert!(matches!(
        result,
        Err(SessionError::Provider(ProviderFailure::MalformedResponse(_)))
    ));
    assert_eq!(session.snapshot().await, before);

    // the session keeps working afterwards
    session.send("k:xyz", "1", None).await.unwrap();
    assert_eq!(session.snapshot().await.balance, Some(dec(99, 0)));
}
