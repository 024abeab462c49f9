use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};

use chrono::{Duration, Utc};

use credit_accounting::StaticChart;
use credit_core::{CustomerId, Entity, OrderId};
use credit_customers::Customer;
use credit_engine::{PaymentRecorder, RecordPaymentRequest, RemainderPolicy};
use credit_engine::{CreditStore, InMemoryCreditStore};
use credit_orders::{CreditOrder, OrderPriority, OrderStatus};
use credit_payments::{allocate, OpenOrder, PaymentMethod};

fn synthetic_order_book(count: usize) -> Vec<OpenOrder> {
    let base = Utc::now();
    (0..count)
        .map(|i| {
            let priority = match i % 4 {
                0 => OrderPriority::Urgent,
                1 => OrderPriority::High,
                2 => OrderPriority::Normal,
                _ => OrderPriority::Low,
            };
            let status = match i % 3 {
                0 => OrderStatus::Delivered,
                1 => OrderStatus::InProduction,
                _ => OrderStatus::Approved,
            };
            let mut order = CreditOrder::place(
                OrderId::new(),
                CustomerId::new(),
                priority,
                base - Duration::days((i % 90) as i64),
                100 + (i as u64 % 37) * 50,
            )
            .unwrap();
            order.set_status(status).unwrap();
            OpenOrder::from_order(&order)
        })
        .collect()
}

fn seeded_recorder(
    order_count: usize,
) -> (
    PaymentRecorder<InMemoryCreditStore, StaticChart>,
    CustomerId,
) {
    let store = InMemoryCreditStore::new();
    let customer =
        Customer::register(CustomerId::new(), "Bench Customer", u64::MAX / 2, Utc::now()).unwrap();
    let customer_id = *customer.id();
    store.insert_customer(customer).unwrap();

    let base = Utc::now();
    for i in 0..order_count {
        let mut order = CreditOrder::place(
            OrderId::new(),
            customer_id,
            OrderPriority::Normal,
            base - Duration::days((i % 90) as i64),
            1_000,
        )
        .unwrap();
        order.set_status(OrderStatus::Delivered).unwrap();
        store.insert_order(order).unwrap();
    }

    (
        PaymentRecorder::new(store, StaticChart::standard()),
        customer_id,
    )
}

fn bench_allocation_policy(c: &mut Criterion) {
    let mut group = c.benchmark_group("allocation_policy");

    for order_count in [10usize, 100, 1_000, 10_000].iter() {
        group.throughput(Throughput::Elements(*order_count as u64));
        group.bench_with_input(
            BenchmarkId::new("waterfall", order_count),
            order_count,
            |b, &count| {
                let book = synthetic_order_book(count);
                let payment: u64 = book.iter().map(|o| o.balance_due).sum::<u64>() / 2;
                b.iter(|| black_box(allocate(black_box(payment), &book)));
            },
        );
    }

    group.finish();
}

fn bench_record_payment(c: &mut Criterion) {
    let mut group = c.benchmark_group("record_payment");
    group.sample_size(200);

    for order_count in [10usize, 100, 1_000].iter() {
        group.bench_with_input(
            BenchmarkId::new("end_to_end", order_count),
            order_count,
            |b, &count| {
                let (recorder, customer_id) = seeded_recorder(count);
                b.iter(|| {
                    let request = RecordPaymentRequest {
                        customer_id,
                        amount: black_box(50),
                        method: PaymentMethod::BankTransfer,
                        date: Utc::now(),
                        explicit_order: None,
                        remainder_policy: RemainderPolicy::HoldAsAdvance,
                        idempotency_key: None,
                    };
                    black_box(recorder.record_payment(&request).unwrap());
                });
            },
        );
    }

    group.finish();
}

fn bench_ledger_replay(c: &mut Criterion) {
    let mut group = c.benchmark_group("ledger_replay");

    for entry_count in [100usize, 1_000, 10_000].iter() {
        group.bench_with_input(
            BenchmarkId::new("full_replay", entry_count),
            entry_count,
            |b, &count| {
                let (recorder, customer_id) = seeded_recorder(8);
                for _ in 0..count {
                    let request = RecordPaymentRequest {
                        customer_id,
                        amount: 1,
                        method: PaymentMethod::Cash,
                        date: Utc::now(),
                        explicit_order: None,
                        remainder_policy: RemainderPolicy::HoldAsAdvance,
                        idempotency_key: None,
                    };
                    recorder.record_payment(&request).unwrap();
                }
                let entries = recorder.store().ledger_entries(customer_id).unwrap();

                b.iter(|| black_box(credit_ledger::replay_balance(black_box(&entries)).unwrap()));
            },
        );
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_allocation_policy,
    bench_record_payment,
    bench_ledger_replay
);
criterion_main!(benches);
