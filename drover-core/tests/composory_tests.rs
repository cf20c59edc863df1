//! Composory supervision: aggressive pricing, expiry-cancel-resend, deferred
//! sends, and the composory-close pool cycle.

use chrono::Duration;
use drover_core::prelude::*;
use drover_core::testing::{at, bar, order_update, tick};
use rust_decimal_macros::dec;

fn supervisor() -> OrderSupervisor<SimGateway, ()> {
    OrderSupervisor::new(SimGateway::new(), (), ExecutionMode::Backtest)
}

#[test]
fn test_composory_repend_covers_missing_volume() {
    let mut sup = supervisor();
    sup.on_tick(tick("X", dec!(100), dec!(110), dec!(90)));

    // First primitive goes out at upperLimit * 0.99.
    let record = sup
        .composory_order(OrderCommand::Buy, "X", dec!(5), Duration::seconds(2))
        .unwrap();
    let first = sup.gateway().sent()[0].clone();
    assert_eq!(first.request.price, dec!(110) * dec!(0.99));
    assert_eq!(first.request.volume, dec!(5));

    // t=1: partial fill.
    let mut tk = tick("X", dec!(100), dec!(110), dec!(90));
    tk.datetime = at(1);
    sup.on_tick(tk);
    sup.on_order(order_update(
        &first.id,
        "X",
        Direction::Long,
        Offset::Open,
        first.request.price,
        dec!(5),
        dec!(2),
        OrderStatus::PartTraded,
    ))
    .unwrap();

    // t=3: periodic sweep cancels the expired primitive.
    let mut tk = tick("X", dec!(100), dec!(110), dec!(90));
    tk.datetime = at(3);
    sup.on_tick(tk);
    sup.check_composory_orders().unwrap();
    assert_eq!(sup.gateway().cancel_count(&first.id), 1);

    // t=4: cancellation lands with a new daily limit in force; the next
    // sweep finishes the first primitive and resends for the missing 3.
    let mut tk = tick("X", dec!(100), dec!(111), dec!(90));
    tk.datetime = at(4);
    sup.on_tick(tk);
    sup.on_order(order_update(
        &first.id,
        "X",
        Direction::Long,
        Offset::Open,
        first.request.price,
        dec!(5),
        dec!(2),
        OrderStatus::Cancelled,
    ))
    .unwrap();
    sup.check_composory_orders().unwrap();

    assert_eq!(sup.gateway().sent().len(), 2);
    let second = &sup.gateway().sent()[1];
    assert_eq!(second.request.volume, dec!(3));
    assert_eq!(second.request.price, dec!(111) * dec!(0.99));

    let info = sup.composory_record(record).unwrap();
    assert!(info.orders.filled.contains(&first.id));
    assert!(info.orders.live.contains(&second.id));
}

#[test]
fn test_composory_without_market_data_defers_until_data_arrives() {
    let mut sup = supervisor();

    let record = sup
        .composory_order(OrderCommand::Short, "Y", dec!(4), Duration::seconds(5))
        .unwrap();
    // No tick, no bar: nothing sent yet, record stays alive.
    assert!(sup.gateway().sent().is_empty());
    assert!(sup.composory_record(record).unwrap().orders.live.is_empty());

    sup.check_composory_orders().unwrap();
    assert!(sup.gateway().sent().is_empty());

    // Once data arrives the sweep sends at lowerLimit * 1.01.
    sup.on_tick(tick("Y", dec!(50), dec!(55), dec!(45)));
    sup.check_composory_orders().unwrap();
    assert_eq!(sup.gateway().sent().len(), 1);
    assert_eq!(sup.gateway().sent()[0].request.price, dec!(45) * dec!(1.01));
    assert_eq!(sup.gateway().sent()[0].request.volume, dec!(4));
}

#[test]
fn test_fully_traded_composory_retires_from_sweep() {
    let mut sup = supervisor();
    sup.on_tick(tick("X", dec!(100), dec!(110), dec!(90)));

    let record = sup
        .composory_order(OrderCommand::Buy, "X", dec!(5), Duration::seconds(5))
        .unwrap();
    let id = sup.gateway().sent()[0].id.clone();
    sup.on_order(order_update(
        &id,
        "X",
        Direction::Long,
        Offset::Open,
        dec!(108.9),
        dec!(5),
        dec!(5),
        OrderStatus::AllTraded,
    ))
    .unwrap();

    sup.check_composory_orders().unwrap();
    // Covered: no resend, and the record is retired (kept in storage).
    assert_eq!(sup.gateway().sent().len(), 1);
    assert!(sup.composory_record(record).unwrap().orders.filled.contains(&id));
    sup.check_composory_orders().unwrap();
    assert_eq!(sup.gateway().sent().len(), 1);
}

#[test]
fn test_composory_close_pool_flattens_open_pack() {
    let mut sup = supervisor();
    sup.on_tick(tick("X", dec!(100), dec!(110), dec!(90)));

    // Open pack fully traded.
    let open = sup
        .make_order(OrderCommand::Buy, "X", dec!(100), dec!(10), PriceType::Limit, false)
        .unwrap()[0]
        .clone();
    sup.on_order(order_update(
        &open,
        "X",
        Direction::Long,
        Offset::Open,
        dec!(100),
        dec!(10),
        dec!(10),
        OrderStatus::AllTraded,
    ))
    .unwrap();

    sup.composory_close(&open).unwrap();
    assert!(sup.order_closed(&open).unwrap());
    assert!(sup
        .close_pool("X", Direction::Long)
        .unwrap()
        .open_ids
        .contains(&open));
    // Terminal origin: no cancel was needed.
    assert!(sup.gateway().cancels().is_empty());

    // End-of-period sweep sends an aggressive SELL for the 10 unlocked.
    let b = bar("X", dec!(101), dec!(99), dec!(100));
    sup.check_on_period_end(&b).unwrap();
    assert_eq!(sup.gateway().sent().len(), 2);
    let close = sup.gateway().sent()[1].clone();
    assert_eq!(close.request.command, OrderCommand::Sell);
    assert_eq!(close.request.volume, dec!(10));
    assert_eq!(close.request.price, dec!(90) * dec!(1.01));

    // Close fills entirely: the pool is discarded on the next sweep.
    sup.on_order(order_update(
        &close.id,
        "X",
        Direction::Short,
        Offset::Close,
        close.request.price,
        dec!(10),
        dec!(10),
        OrderStatus::AllTraded,
    ))
    .unwrap();
    sup.check_on_period_end(&b).unwrap();
    assert!(sup.close_pool("X", Direction::Long).is_none());
    assert_eq!(sup.gateway().sent().len(), 2);
}

#[test]
fn test_composory_close_cancels_live_origin_and_foreign_closes() {
    let mut sup = supervisor();
    sup.on_tick(tick("X", dec!(100), dec!(110), dec!(90)));

    let open = sup
        .make_order(OrderCommand::Buy, "X", dec!(100), dec!(10), PriceType::Limit, false)
        .unwrap()[0]
        .clone();
    sup.on_order(order_update(
        &open,
        "X",
        Direction::Long,
        Offset::Open,
        dec!(100),
        dec!(10),
        dec!(6),
        OrderStatus::PartTraded,
    ))
    .unwrap();

    // An ordinary limit close is resting for part of the fill.
    let plain_close = sup
        .close_order(&open, dec!(102), Some(dec!(2)), false)
        .unwrap()[0]
        .clone();

    // Force-close: the live origin gets cancelled.
    sup.composory_close(&open).unwrap();
    assert_eq!(sup.gateway().cancel_count(&open), 1);

    // The pool sweep cancels the non-composory close (it holds volume the
    // pool now owns) and sends a composory for the unlocked remainder.
    let b = bar("X", dec!(101), dec!(99), dec!(100));
    sup.check_on_period_end(&b).unwrap();
    assert_eq!(sup.gateway().cancel_count(&plain_close), 1);

    let last = sup.gateway().sent().last().unwrap().clone();
    assert_eq!(last.request.command, OrderCommand::Sell);
    // traded 6, closed 0, locked 2 (live plain close) -> 4 unlocked.
    assert_eq!(last.request.volume, dec!(4));
}
