//! Event dispatch + volume accounting hot path.

use chrono::Duration;
use criterion::{black_box, criterion_group, criterion_main, Criterion};
use drover_core::prelude::*;
use drover_core::testing::{order_update, tick};
use rust_decimal_macros::dec;

fn bench_on_order_dispatch(c: &mut Criterion) {
    let mut sup = OrderSupervisor::new(SimGateway::new(), (), ExecutionMode::Backtest);
    sup.on_tick(tick("X", dec!(100), dec!(110), dec!(90)));
    sup.time_limit_order(OrderCommand::Buy, "X", dec!(100), dec!(10), Duration::seconds(3600))
        .unwrap();
    let id = sup.gateway().sent()[0].id.clone();
    let snapshot = order_update(
        &id,
        "X",
        Direction::Long,
        Offset::Open,
        dec!(100),
        dec!(10),
        dec!(1),
        OrderStatus::PartTraded,
    );

    c.bench_function("on_order_dispatch", |b| {
        b.iter(|| sup.on_order(black_box(snapshot.clone())).unwrap())
    });
}

fn bench_volume_accounting(c: &mut Criterion) {
    let mut sup = OrderSupervisor::new(SimGateway::new(), (), ExecutionMode::Backtest);
    sup.on_tick(tick("X", dec!(100), dec!(110), dec!(90)));

    let open = sup
        .make_order(OrderCommand::Buy, "X", dec!(100), dec!(100), PriceType::Limit, false)
        .unwrap()[0]
        .clone();
    sup.on_order(order_update(
        &open,
        "X",
        Direction::Long,
        Offset::Open,
        dec!(100),
        dec!(100),
        dec!(100),
        OrderStatus::AllTraded,
    ))
    .unwrap();
    for _ in 0..8 {
        sup.close_order(&open, dec!(101), Some(dec!(10)), false).unwrap();
    }

    c.bench_function("order_locked_volume_8_closes", |b| {
        b.iter(|| sup.order_locked_volume(black_box(&open)).unwrap())
    });
}

criterion_group!(benches, bench_on_order_dispatch, bench_volume_accounting);
criterion_main!(benches);
