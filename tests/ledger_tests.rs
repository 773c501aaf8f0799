mod common;

use std::{
    collections::HashSet,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc, Mutex,
    },
    thread,
};

use common::{assert_close, memory_ledger, memory_ledger_with};
use nucleo_core::{
    aggregation::{filter, totals_by_category, CategoryTotal, TransactionQuery},
    errors::LedgerError,
    ledger::{
        BalancePolicy, Ledger, LedgerOptions, LoadOrigin, TransactionId, TransactionInput,
        TransactionKind,
    },
    storage::{MemoryStore, PersistedState},
};

fn freelance() -> TransactionInput {
    TransactionInput::income(500.0, "Freelance", "Work", "01/06/2025")
}

#[test]
fn seeding_an_empty_store_yields_three_transactions() {
    let (ledger, _store) = memory_ledger();
    let snapshot = ledger.snapshot();
    assert_eq!(snapshot.len(), 3);
    assert_close(snapshot.balance, 295.0);
    assert_eq!(snapshot.next_id, TransactionId(4));
}

#[test]
fn adding_income_raises_balance_and_assigns_next_id() {
    let (ledger, _store) = memory_ledger();
    let id = ledger.add(freelance()).expect("valid").wait().expect("persisted");

    assert_eq!(id, TransactionId(4));
    assert_close(ledger.snapshot().balance, 795.0);
}

#[test]
fn deleting_an_expense_raises_balance() {
    let (ledger, _store) = memory_ledger();
    let removed = ledger
        .delete(TransactionId(1))
        .wait()
        .expect("persisted")
        .expect("seeded transaction exists");

    assert_eq!(removed.amount, -85.0);
    assert_close(ledger.snapshot().balance, 380.0);
}

#[test]
fn seeded_categories_aggregate_in_descending_order() {
    let (ledger, _store) = memory_ledger();
    let totals = totals_by_category(&ledger.snapshot(), None);
    assert_eq!(
        totals,
        vec![
            CategoryTotal {
                category: "Transport".into(),
                total: 120.0
            },
            CategoryTotal {
                category: "Food".into(),
                total: 85.0
            },
        ]
    );
}

#[test]
fn text_filter_finds_supermercado() {
    let (ledger, _store) = memory_ledger();
    let found = filter(&ledger.snapshot(), &TransactionQuery::text("super"));
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].description, "Supermercado");
}

#[test]
fn balance_matches_fold_after_every_operation() {
    let (ledger, _store) = memory_ledger();
    let check = |ledger: &Ledger| {
        let snapshot = ledger.snapshot();
        assert_close(snapshot.balance, snapshot.folded_balance());
    };

    let rent = ledger
        .add(TransactionInput::expense(1200.0, "Aluguel", "Housing", "05/06/2025"))
        .unwrap()
        .into_value();
    check(&ledger);
    let salary = ledger
        .add(TransactionInput::income(4500.0, "Salário", "Work", "05/06/2025"))
        .unwrap()
        .into_value();
    check(&ledger);
    ledger
        .update(
            rent,
            TransactionInput::expense(1150.0, "Aluguel", "Housing", "05/06/2025"),
        )
        .unwrap()
        .into_value();
    check(&ledger);
    ledger
        .update(
            salary,
            TransactionInput::expense(30.0, "Taxa", "Other", "05/06/2025"),
        )
        .unwrap()
        .into_value();
    check(&ledger);
    ledger.delete(TransactionId(2)).into_value();
    check(&ledger);
    ledger.delete(TransactionId(2)).into_value();
    check(&ledger);

    assert_close(ledger.snapshot().balance, -85.0 - 120.0 - 1150.0 - 30.0);
}

#[test]
fn identifiers_are_not_reused_after_delete() {
    let (ledger, _store) = memory_ledger();
    let first = ledger.add(freelance()).unwrap().into_value();
    ledger.delete(first).into_value();
    let second = ledger.add(freelance()).unwrap().into_value();

    assert!(second > first);
    let ids: HashSet<TransactionId> = ledger.snapshot().transactions.iter().map(|t| t.id).collect();
    assert_eq!(ids.len(), ledger.snapshot().len());
}

#[test]
fn identifiers_are_not_reused_after_reload() {
    let (ledger, store) = memory_ledger();
    let added = ledger.add(freelance()).unwrap().into_value();
    ledger.delete(added).wait().expect("persisted");
    drop(ledger);

    let reopened = Ledger::new(Box::new(store), LedgerOptions::default()).unwrap();
    assert_eq!(reopened.initialize().origin, LoadOrigin::Restored);
    let next = reopened.add(freelance()).unwrap().into_value();
    assert_eq!(next, TransactionId(added.0 + 1));
}

#[test]
fn deleting_a_missing_id_is_a_silent_no_op() {
    let (ledger, store) = memory_ledger();
    let notifications = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&notifications);
    let _subscription = ledger.subscribe(move |_| {
        counter.fetch_add(1, Ordering::SeqCst);
    });
    let before = ledger.snapshot();
    let saves_before = store.save_count();

    let removed = ledger.delete(TransactionId(99)).wait().expect("nothing to write");

    assert!(removed.is_none());
    assert_eq!(*ledger.snapshot(), *before);
    assert_eq!(store.save_count(), saves_before);
    assert_eq!(notifications.load(Ordering::SeqCst), 0);
}

#[test]
fn sign_mismatch_is_rejected_without_mutation() {
    let (ledger, _store) = memory_ledger();
    let before = ledger.snapshot();

    let mut wrong = freelance();
    wrong.amount = -500.0;
    assert!(matches!(ledger.add(wrong.clone()), Err(LedgerError::Validation(_))));

    wrong.kind = TransactionKind::Expense;
    wrong.amount = 500.0;
    assert!(matches!(
        ledger.update(TransactionId(1), wrong),
        Err(LedgerError::Validation(_))
    ));

    assert_eq!(*ledger.snapshot(), *before);
}

#[test]
fn update_of_unknown_id_reports_not_found() {
    let (ledger, _store) = memory_ledger();
    let err = ledger
        .update(TransactionId(42), freelance())
        .expect_err("unknown id");
    assert!(matches!(err, LedgerError::NotFound(TransactionId(42))));
    assert_eq!(ledger.snapshot().len(), 3);
}

#[test]
fn update_keeps_position_and_identifier() {
    let (ledger, _store) = memory_ledger();
    ledger
        .update(
            TransactionId(2),
            TransactionInput::income(650.0, "Freelance extra", "Work", "Ontem 09:15"),
        )
        .unwrap()
        .wait()
        .unwrap();

    let snapshot = ledger.snapshot();
    assert_eq!(snapshot.transactions[1].id, TransactionId(2));
    assert_eq!(snapshot.transactions[1].description, "Freelance extra");
    assert_close(snapshot.balance, 445.0);
}

#[test]
fn snapshots_do_not_change_after_later_commits() {
    let (ledger, _store) = memory_ledger();
    let earlier = ledger.snapshot();
    ledger.add(freelance()).unwrap().into_value();

    assert_eq!(earlier.len(), 3);
    assert_close(earlier.balance, 295.0);
    assert_eq!(ledger.snapshot().len(), 4);
}

#[test]
fn subscribers_see_each_commit_until_dropped() {
    let (ledger, _store) = memory_ledger();
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    let subscription = ledger.subscribe(move |snapshot| {
        sink.lock().unwrap().push(snapshot.balance);
    });

    ledger.add(freelance()).unwrap().into_value();
    ledger.delete(TransactionId(1)).into_value();
    subscription.unsubscribe();
    ledger.add(freelance()).unwrap().into_value();

    assert_eq!(*seen.lock().unwrap(), vec![795.0, 880.0]);
}

#[test]
fn channel_subscribers_receive_snapshots_in_order() {
    let (ledger, _store) = memory_ledger();
    let (_subscription, updates) = ledger.subscribe_channel();

    ledger.add(freelance()).unwrap().into_value();
    ledger.delete(TransactionId(3)).into_value();

    let first = updates.try_recv().expect("add published");
    let second = updates.try_recv().expect("delete published");
    assert_eq!(first.len(), 4);
    assert_eq!(second.len(), 3);
    assert!(updates.try_recv().is_err());
}

#[test]
fn unreachable_store_degrades_and_flush_recovers() {
    let store = MemoryStore::new();
    store.set_unreachable(true);
    let ledger = Ledger::new(Box::new(store.clone()), LedgerOptions::default()).unwrap();

    let report = ledger.initialize();
    assert!(matches!(report.origin, LoadOrigin::Degraded { .. }));
    assert!(!report.warnings.is_empty());
    assert_eq!(ledger.snapshot().len(), 3);
    assert!(ledger.is_dirty());

    let commit = ledger.add(freelance()).expect("in-memory add still works");
    let (id, ticket) = commit.into_parts();
    assert!(ticket.wait().expect_err("store still down").is_persistence());
    assert_eq!(ledger.get_by_id(id).map(|t| t.amount), Some(500.0));
    assert!(ledger.is_dirty());
    assert!(ledger.last_persistence_error().is_some());

    store.set_unreachable(false);
    ledger.flush().expect("store reachable again");
    assert!(!ledger.is_dirty());
    let stored = store.stored_state().expect("flushed state");
    assert_eq!(stored.transactions.len(), 4);
    assert_close(stored.balance, 795.0);
}

#[test]
fn drifted_balance_is_reported_and_kept_by_default() {
    let mut state = PersistedState::from_snapshot(&nucleo_core::ledger::seed_snapshot());
    state.balance = 1000.0;
    let ledger = Ledger::new(
        Box::new(MemoryStore::with_state(state)),
        LedgerOptions::default(),
    )
    .unwrap();

    let report = ledger.initialize();
    assert_eq!(report.origin, LoadOrigin::Restored);
    assert_eq!(report.warnings.len(), 1);
    assert_close(ledger.snapshot().balance, 1000.0);
}

#[test]
fn recompute_policy_repairs_drifted_balance() {
    let mut state = PersistedState::from_snapshot(&nucleo_core::ledger::seed_snapshot());
    state.balance = 1000.0;
    let ledger = Ledger::new(
        Box::new(MemoryStore::with_state(state)),
        LedgerOptions {
            balance_policy: BalancePolicy::Recompute,
        },
    )
    .unwrap();

    let report = ledger.initialize();
    assert_eq!(report.warnings.len(), 1);
    assert_close(ledger.snapshot().balance, 295.0);
}

#[test]
fn recompute_policy_is_silent_when_consistent() {
    let (ledger, _store) = memory_ledger_with(LedgerOptions {
        balance_policy: BalancePolicy::Recompute,
    });
    assert_close(ledger.snapshot().balance, 295.0);
    assert!(!ledger.is_dirty());
}

#[test]
fn concurrent_writers_get_unique_ids_and_consistent_balance() {
    let (ledger, store) = memory_ledger();
    let ledger = Arc::new(ledger);

    let handles: Vec<_> = (0..4)
        .map(|worker| {
            let ledger = Arc::clone(&ledger);
            thread::spawn(move || {
                (0..25)
                    .map(|n| {
                        ledger
                            .add(TransactionInput::income(
                                1.0 + n as f64,
                                format!("Job {worker}-{n}"),
                                "Work",
                                "01/06/2025",
                            ))
                            .expect("valid input")
                            .into_value()
                    })
                    .collect::<Vec<_>>()
            })
        })
        .collect();

    let mut ids = HashSet::new();
    for handle in handles {
        for id in handle.join().expect("worker finished") {
            assert!(ids.insert(id), "duplicate id {id}");
        }
    }

    let snapshot = ledger.snapshot();
    assert_eq!(snapshot.len(), 103);
    assert!(snapshot.is_consistent());
    assert_eq!(snapshot.next_id, TransactionId(104));

    ledger.flush().expect("flush");
    assert_eq!(
        store.stored_state().map(|state| state.transactions.len()),
        Some(103)
    );
}
