mod common;

use allowance_desk::inventory::{InventoryError, InventoryStorage};
use allowance_desk::model::{OrderStatus, SerialNumber};
use allowance_desk::monitor::{MonitorError, MonitorKind};
use allowance_desk::payment::{reward_amount, TOKEN_UNIT};
use allowance_desk::reservation::{ReservationError, ReservationRequest};
use common::*;
use std::collections::HashSet;
use std::time::Duration;

fn request(count: i64, message: &str) -> ReservationRequest {
    ReservationRequest::new(count, WALLET, message)
}

/// reserve → pay → confirm → retired, rewarded, and listed newest first.
#[tokio::test(start_paused = true)]
async fn test_round_trip_retires_and_lists_newest_first() {
    let ledger = ScriptedLedger::new();
    let rewards = RecordingIssuer::new();
    let system = start(10, ledger.clone(), rewards.clone()).await;

    let first = system.reservations.create(request(2, "first")).await.unwrap();
    ledger.script(&tx(1), vec![Poll::Mined(paid_to_treasury())]);
    system
        .reservations
        .record_payment_reference(first.order_id, tx(1))
        .await
        .unwrap();
    wait_for_order(&system, first.order_id, |s| s == Some(OrderStatus::Completed)).await;

    let second = system.reservations.create(request(3, "second")).await.unwrap();
    assert_eq!(
        second.serial_numbers,
        vec![SerialNumber(3), SerialNumber(4), SerialNumber(5)]
    );
    ledger.script(
        &tx(2),
        vec![Poll::Pending, Poll::Pending, Poll::Mined(paid_to_treasury())],
    );
    system
        .reservations
        .record_payment_reference(second.order_id, tx(2))
        .await
        .unwrap();
    wait_for_order(&system, second.order_id, |s| s == Some(OrderStatus::Completed)).await;

    let report = system.reservations.order_status(second.order_id).await.unwrap();
    assert_eq!(report.serial_numbers, Some(second.serial_numbers.clone()));
    assert_eq!(report.tx_hash, Some(tx(2)));
    assert!(report.reward_tx_hash.is_some());
    assert_eq!(ledger.calls(&tx(2)), 3);

    let history = system.history.list_retired(None).await.unwrap();
    let serials: Vec<u64> = history.iter().map(|r| r.serial_number.0).collect();
    assert_eq!(serials, vec![5, 4, 3, 2, 1]);
    assert_eq!(history[0].message, "second");
    assert_eq!(history[4].tx_hash, Some(tx(1)));

    let issued = rewards.issued.lock().unwrap().clone();
    assert_eq!(issued.len(), 2);
    assert_eq!(issued[1].1, 3 * TOKEN_UNIT);

    let stock = system.inventory.stock().await.unwrap();
    assert_eq!((stock.available, stock.reserved, stock.retired), (5, 0, 5));

    system.shutdown().await.unwrap();
}

/// An order that never gets a payment reference is released after the budget.
#[tokio::test(start_paused = true)]
async fn test_unpaid_reservation_times_out() {
    let system = start(4, ScriptedLedger::new(), RecordingIssuer::new()).await;

    let reservation = system.reservations.create(request(2, "")).await.unwrap();
    assert_eq!(
        system.monitors.active(reservation.order_id).await.unwrap(),
        Some(MonitorKind::Hold)
    );

    tokio::time::sleep(Duration::from_secs(4 * 60)).await;
    let view = system.inventory.order_view(reservation.order_id).await.unwrap();
    assert_eq!(view.map(|v| v.status), Some(OrderStatus::Pending));

    wait_for_order(&system, reservation.order_id, |s| s.is_none()).await;
    let stock = system.inventory.stock().await.unwrap();
    assert_eq!(stock.available, 4);

    // The released units are claimable again, lowest serials first.
    let again = system.reservations.create(request(2, "")).await.unwrap();
    assert_eq!(again.serial_numbers, vec![SerialNumber(1), SerialNumber(2)]);

    system.shutdown().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_reverted_payment_releases_units() {
    let ledger = ScriptedLedger::new();
    let rewards = RecordingIssuer::new();
    let system = start(3, ledger.clone(), rewards.clone()).await;

    let reservation = system.reservations.create(request(1, "")).await.unwrap();
    ledger.script(&tx(7), vec![Poll::Pending, Poll::Mined(reverted())]);
    system
        .reservations
        .record_payment_reference(reservation.order_id, tx(7))
        .await
        .unwrap();
    let before = system.reservations.order_status(reservation.order_id).await.unwrap();
    assert_eq!(before.status, OrderStatus::PaidButNotRetired);

    wait_for_order(&system, reservation.order_id, |s| s.is_none()).await;
    assert_eq!(system.inventory.stock().await.unwrap().available, 3);
    assert!(rewards.issued.lock().unwrap().is_empty());

    system.shutdown().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_payment_to_wrong_address_is_invalid() {
    let ledger = ScriptedLedger::new();
    let system = start(2, ledger.clone(), RecordingIssuer::new()).await;

    let reservation = system.reservations.create(request(2, "")).await.unwrap();
    let mut elsewhere = paid_to_treasury();
    elsewhere.to = Some("0x9999999999999999999999999999999999999999".to_string());
    ledger.script(&tx(8), vec![Poll::Mined(elsewhere)]);
    system
        .reservations
        .record_payment_reference(reservation.order_id, tx(8))
        .await
        .unwrap();

    wait_for_order(&system, reservation.order_id, |s| s.is_none()).await;
    assert_eq!(ledger.calls(&tx(8)), 1);
    system.shutdown().await.unwrap();
}

/// Ledger errors are retried; an error on the last attempt ends in a release.
#[tokio::test(start_paused = true)]
async fn test_ledger_errors_exhaust_budget() {
    let ledger = ScriptedLedger::new();
    let system = start(2, ledger.clone(), RecordingIssuer::new()).await;

    let reservation = system.reservations.create(request(1, "")).await.unwrap();
    ledger.script(&tx(9), vec![Poll::Unreachable]);
    system
        .reservations
        .record_payment_reference(reservation.order_id, tx(9))
        .await
        .unwrap();

    wait_for_order(&system, reservation.order_id, |s| s.is_none()).await;
    assert_eq!(ledger.calls(&tx(9)), 60);
    system.shutdown().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_transient_error_then_success_completes() {
    let ledger = ScriptedLedger::new();
    let system = start(2, ledger.clone(), RecordingIssuer::new()).await;

    let reservation = system.reservations.create(request(1, "")).await.unwrap();
    ledger.script(
        &tx(10),
        vec![
            Poll::Unreachable,
            Poll::Pending,
            Poll::Unreachable,
            Poll::Mined(paid_to_treasury()),
        ],
    );
    system
        .reservations
        .record_payment_reference(reservation.order_id, tx(10))
        .await
        .unwrap();

    wait_for_order(&system, reservation.order_id, |s| s == Some(OrderStatus::Completed)).await;
    system.shutdown().await.unwrap();
}

/// A reward failure is logged and does not undo the retirement.
#[tokio::test(start_paused = true)]
async fn test_reward_failure_keeps_retirement() {
    let ledger = ScriptedLedger::new();
    let system = start(25, ledger.clone(), RecordingIssuer::failing()).await;

    let reservation = system.reservations.create(request(20, "")).await.unwrap();
    ledger.script(&tx(11), vec![Poll::Mined(paid_to_treasury())]);
    system
        .reservations
        .record_payment_reference(reservation.order_id, tx(11))
        .await
        .unwrap();

    wait_for_order(&system, reservation.order_id, |s| s == Some(OrderStatus::Completed)).await;
    let report = system.reservations.order_status(reservation.order_id).await.unwrap();
    assert_eq!(report.reward_tx_hash, None);
    assert_eq!(reward_amount(20), 21 * TOKEN_UNIT);
    system.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_concurrent_claims_never_share_units() {
    let system = start(10, ScriptedLedger::new(), RecordingIssuer::new()).await;

    let mut tasks = Vec::new();
    for _ in 0..5 {
        let reservations = system.reservations.clone();
        tasks.push(tokio::spawn(async move {
            reservations.create(request(3, "")).await
        }));
    }

    let mut claimed = HashSet::new();
    let mut succeeded = 0;
    for task in tasks {
        match task.await.unwrap() {
            Ok(reservation) => {
                succeeded += 1;
                assert_eq!(reservation.serial_numbers.len(), 3);
                for serial in reservation.serial_numbers {
                    assert!(claimed.insert(serial), "serial {serial} claimed twice");
                }
            }
            Err(ReservationError::Inventory(InventoryError::InsufficientInventory {
                requested,
                available,
            })) => {
                assert_eq!(requested, 3);
                assert!(available < 3);
            }
            Err(other) => panic!("unexpected error: {other}"),
        }
    }
    assert_eq!(succeeded, 3);
    assert_eq!(system.inventory.stock().await.unwrap().available, 1);

    system.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_boundaries() {
    let system = start(120, ScriptedLedger::new(), RecordingIssuer::new()).await;

    for count in [0, 100] {
        let err = system.reservations.create(request(count, "")).await.unwrap_err();
        assert!(matches!(err, ReservationError::Validation(_)), "count {count}");
    }
    let stock = system.inventory.stock().await.unwrap();
    assert_eq!(stock.available, 120);

    let reservation = system.reservations.create(request(99, "")).await.unwrap();
    assert_eq!(reservation.serial_numbers.len(), 99);

    system.shutdown().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_one_payment_monitor_per_order() {
    let system = start(3, ScriptedLedger::new(), RecordingIssuer::new()).await;

    let reservation = system.reservations.create(request(1, "")).await.unwrap();
    system
        .reservations
        .record_payment_reference(reservation.order_id, tx(12))
        .await
        .unwrap();
    assert_eq!(
        system.monitors.active(reservation.order_id).await.unwrap(),
        Some(MonitorKind::Payment)
    );

    let second = system
        .reservations
        .record_payment_reference(reservation.order_id, tx(13))
        .await
        .unwrap_err();
    assert!(matches!(
        second,
        ReservationError::Inventory(InventoryError::InvalidState { .. })
    ));

    let direct = system
        .monitors
        .start_payment(reservation.order_id, tx(12), 1)
        .await
        .unwrap_err();
    assert_eq!(direct, MonitorError::AlreadyMonitored(reservation.order_id));
    assert_eq!(system.monitors.active_count().await.unwrap(), 1);

    system.shutdown().await.unwrap();
}

/// A paid order survives a restart: the monitor is re-armed from the store.
#[tokio::test(start_paused = true)]
async fn test_restart_recovers_paid_order() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("allowances.redb");
    let config = config(5);

    let ledger = ScriptedLedger::new();
    let system = start_with(
        &config,
        InventoryStorage::open(&path).unwrap(),
        ledger.clone(),
        RecordingIssuer::new(),
    )
    .await;
    let reservation = system.reservations.create(request(2, "")).await.unwrap();
    system
        .reservations
        .record_payment_reference(reservation.order_id, tx(14))
        .await
        .unwrap();
    system.shutdown().await.unwrap();

    ledger.script(&tx(14), vec![Poll::Mined(paid_to_treasury())]);
    let system = start_with(
        &config,
        InventoryStorage::open(&path).unwrap(),
        ledger.clone(),
        RecordingIssuer::new(),
    )
    .await;
    assert_eq!(
        system.monitors.active(reservation.order_id).await.unwrap(),
        Some(MonitorKind::Payment)
    );
    wait_for_order(&system, reservation.order_id, |s| s == Some(OrderStatus::Completed)).await;

    // Provisioning the same ranges again does not duplicate units.
    assert_eq!(system.inventory.stock().await.unwrap().total(), 5);
    system.shutdown().await.unwrap();
}
