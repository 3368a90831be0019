//! End-to-end chaos runs against an in-process ledger over real TCP.

mod common;

use common::{Behavior, TestLedger};
use std::sync::Arc;
use std::time::Duration;

use ledger_chaos::assertions::assert_conservation;
use ledger_chaos::process::ProcessControl;
use ledger_chaos::{Coordinator, WorkloadDriver, WorkloadParams};
use ledger_types::AccountId;

fn params(transfers: usize, seed: u64) -> WorkloadParams {
    WorkloadParams {
        accounts: 10,
        initial_balance: 10_000,
        transfers,
        max_amount: 100,
        progress_every: 50,
        seed: Some(seed),
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn atomic_ledger_conserves_total_across_crash_cycles() {
    let ledger = TestLedger::new(Behavior::Correct).await;
    let client = ledger.client();

    let report = Coordinator::new(ledger.clone(), Duration::from_millis(30))
        .run(&client, params(300, 1))
        .await
        .expect("run failed");

    let reconciliation = &report.reconciliation;
    assert_eq!(reconciliation.expected, 100_000);
    assert_eq!(reconciliation.observed, 100_000);
    assert!(reconciliation.is_conserved());
    assert!(assert_conservation(reconciliation).passed);
    assert_eq!(reconciliation.accounts.len(), 10);
    assert_eq!(reconciliation.transfers.attempted, 300);
    assert!(report.cycles >= 1);

    // Every started instance was killed before the run returned.
    assert!(!ledger.is_up());
    assert_eq!(ledger.total(), 100_000);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn lost_transfer_responses_do_not_break_conservation() {
    let ledger = TestLedger::new(Behavior::LoseEveryNthTransferResponse(7)).await;
    let client = ledger.client();

    let report = Coordinator::new(ledger.clone(), Duration::from_millis(30))
        .run(&client, params(200, 2))
        .await
        .expect("run failed");

    let stats = report.reconciliation.transfers;
    assert!(stats.failed >= 1, "expected lost responses, got {:?}", stats);
    assert_eq!(stats.applied + stats.declined + stats.failed, stats.attempted);
    assert!(report.reconciliation.is_conserved());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn minting_ledger_is_reported_as_mismatch() {
    let ledger = TestLedger::new(Behavior::MintOnEveryNthTransfer(5)).await;
    let client = ledger.client();

    let report = Coordinator::new(ledger.clone(), Duration::from_millis(30))
        .run(&client, params(100, 3))
        .await
        .expect("run failed");

    let reconciliation = &report.reconciliation;
    assert!(!reconciliation.is_conserved());
    assert!(reconciliation.observed > reconciliation.expected);
    assert_eq!(reconciliation.observed, ledger.total());

    let check = assert_conservation(reconciliation);
    assert!(!check.passed);
    assert!(check.failure_details.is_some());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn phases_run_in_order_and_reads_precede_stop() {
    let ledger = TestLedger::new(Behavior::Correct).await;
    let client = ledger.client();

    let coordinator = Coordinator::new(ledger.clone(), Duration::from_millis(30));
    ledger.observe(coordinator.stop_signal());
    coordinator
        .run(&client, params(50, 4))
        .await
        .expect("run failed");

    let received = ledger.received();
    let last = |op: &str| received.iter().rposition(|r| r.operation == op);
    let first = |op: &str| received.iter().position(|r| r.operation == op);

    let last_put = last("PUT").expect("no PUT");
    let first_transfer = first("TRANSFER").expect("no TRANSFER");
    let last_transfer = last("TRANSFER").expect("no TRANSFER");
    let first_get = first("GET").expect("no GET");
    assert!(last_put < first_transfer);
    assert!(last_transfer < first_get);

    // All balance reads happen while the injector is still cycling.
    assert!(received
        .iter()
        .filter(|r| r.operation == "GET")
        .all(|r| !r.stop_set));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn client_call_survives_a_restart() {
    let ledger = TestLedger::new(Behavior::Correct).await;
    let client = ledger.client();
    let account = AccountId::new("user_1");

    let id = ledger.start().await.unwrap();
    assert!(client.put(&account, 42).await.unwrap());
    ledger.terminate(&id).await.unwrap();

    let restarter = ledger.clone();
    let restart = tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(200)).await;
        restarter.start().await.unwrap()
    });

    // Dials until the service is back, then reads committed state.
    assert_eq!(client.get(&account).await.unwrap(), 42);

    let id = restart.await.unwrap();
    ledger.terminate(&id).await.unwrap();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn lost_put_responses_still_seed_exactly_m() {
    let ledger = TestLedger::new(Behavior::LoseEveryNthPutResponse(3)).await;
    let client = ledger.client();
    let id = ledger.start().await.unwrap();

    let params = params(0, 5);
    let mut driver = WorkloadDriver::new(&client, params.clone());
    let accounts = driver.seed().await;

    assert_eq!(accounts.len(), 10);
    for account in &accounts {
        assert_eq!(ledger.balance(account), Some(params.initial_balance));
    }
    assert_eq!(ledger.total(), params.expected_total());

    let puts = ledger
        .received()
        .iter()
        .filter(|r| r.operation == "PUT")
        .count();
    assert!(puts > accounts.len(), "only {} puts sent", puts);

    ledger.terminate(&id).await.unwrap();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn lost_put_responses_under_chaos_conserve_total() {
    let ledger = TestLedger::new(Behavior::LoseEveryNthPutResponse(2)).await;
    let client = ledger.client();

    let report = Coordinator::new(ledger.clone(), Duration::from_millis(30))
        .run(&client, params(100, 6))
        .await
        .expect("run failed");

    assert!(report.reconciliation.is_conserved());
    assert_eq!(ledger.total(), 100_000);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn shared_client_serves_concurrent_callers() {
    let ledger = TestLedger::new(Behavior::Correct).await;
    let id = ledger.start().await.unwrap();
    let client = Arc::new(ledger.client());

    let a = AccountId::new("user_a");
    let b = AccountId::new("user_b");
    assert!(client.put(&a, 111).await.unwrap());
    assert!(client.put(&b, 222).await.unwrap());

    let reader = |account: AccountId, expected: i32| {
        let client = Arc::clone(&client);
        tokio::spawn(async move {
            for _ in 0..50 {
                assert_eq!(client.get(&account).await.unwrap(), expected);
            }
        })
    };
    let first = reader(a, 111);
    let second = reader(b, 222);

    tokio::time::timeout(Duration::from_secs(30), async {
        first.await.unwrap();
        second.await.unwrap();
    })
    .await
    .expect("concurrent readers hung");

    ledger.terminate(&id).await.unwrap();
}
