use criterion::{black_box, criterion_group, criterion_main, BatchSize, Criterion};
use nucleo_core::{
    aggregation::{dashboard, filter, totals_by_category, TransactionQuery, TOP_CATEGORY_LIMIT},
    ledger::{Ledger, LedgerOptions, LedgerSnapshot, TransactionInput, DEFAULT_CATEGORIES},
    storage::{
        json_backend::{load_state_from_path, save_state_to_path},
        MemoryStore, PersistedState,
    },
};
use tempfile::tempdir;

fn sample_input(idx: usize) -> TransactionInput {
    let category = DEFAULT_CATEGORIES[idx % DEFAULT_CATEGORIES.len()];
    let magnitude = 10.0 + (idx % 100) as f64;
    if idx % 4 == 0 {
        TransactionInput::income(magnitude, format!("Receita {idx}"), category, "01/06/2025")
    } else {
        TransactionInput::expense(magnitude, format!("Despesa {idx}"), category, "01/06/2025")
    }
}

fn build_sample_ledger(txn_count: usize) -> Ledger {
    let ledger = Ledger::new(Box::new(MemoryStore::new()), LedgerOptions::default())
        .expect("create ledger");
    ledger.initialize();
    for idx in 0..txn_count {
        ledger
            .add(sample_input(idx))
            .expect("valid input")
            .into_value();
    }
    ledger.flush().expect("flush");
    ledger
}

fn bench_mutations(c: &mut Criterion) {
    c.bench_function("ledger_add_1k", |b| {
        b.iter_batched(
            || Ledger::new(Box::new(MemoryStore::new()), LedgerOptions::default()).unwrap(),
            |ledger| {
                for idx in 0..1_000 {
                    ledger.add(sample_input(idx)).unwrap().into_value();
                }
                ledger.flush().unwrap();
            },
            BatchSize::PerIteration,
        )
    });
}

fn bench_aggregation(c: &mut Criterion) {
    let ledger = build_sample_ledger(black_box(10_000));
    let snapshot = ledger.snapshot();

    c.bench_function("totals_by_category_10k", |b| {
        b.iter(|| black_box(totals_by_category(&snapshot, Some(TOP_CATEGORY_LIMIT))))
    });
    c.bench_function("filter_text_10k", |b| {
        let query = TransactionQuery::text("despesa 99");
        b.iter(|| black_box(filter(&snapshot, &query)))
    });
    c.bench_function("dashboard_10k", |b| b.iter(|| black_box(dashboard(&snapshot))));
}

fn bench_json_io(c: &mut Criterion) {
    let ledger = build_sample_ledger(black_box(10_000));
    let state = PersistedState::from_snapshot(&ledger.snapshot());
    let dir = tempdir().expect("tempdir");
    let file_path = dir.path().join("ledger.json");

    c.bench_function("ledger_save_10k", |b| {
        b.iter(|| save_state_to_path(&state, &file_path).expect("save ledger"))
    });

    save_state_to_path(&state, &file_path).expect("seed");

    c.bench_function("ledger_load_10k", |b| {
        b.iter(|| {
            let loaded: LedgerSnapshot = load_state_from_path(&file_path)
                .expect("load ledger")
                .into_snapshot();
            black_box(loaded);
        })
    });
}

criterion_group!(benches, bench_mutations, bench_aggregation, bench_json_io);
criterion_main!(benches);
