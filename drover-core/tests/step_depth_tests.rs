//! Step and depth supervision: paced chunking, book-sized chunks, and the
//! backtest degradation to a single submission.
//!
//! Pacing tests run in live mode (the pacing clock is the wall clock there)
//! with `wait = 0` and generous expirations, so sweeps are never throttled
//! within a test run.

use chrono::Duration;
use drover_core::prelude::*;
use drover_core::testing::{order_update, tick, tick_with_depth};
use rust_decimal_macros::dec;

fn live_supervisor() -> OrderSupervisor<SimGateway, ()> {
    OrderSupervisor::new(SimGateway::new(), (), ExecutionMode::Live)
}

#[test]
fn test_depth_order_sizes_chunk_from_executable_levels() {
    let mut sup = live_supervisor();
    sup.on_tick(tick_with_depth(
        "X",
        dec!(99.8),
        dec!(110),
        dec!(90),
        &[
            (dec!(99.5), dec!(3)),
            (dec!(99.9), dec!(4)),
            (dec!(100.1), dec!(5)),
        ],
        &[(dec!(99.4), dec!(2))],
    ));

    let record = sup
        .make_depth_order(
            OrderCommand::Buy,
            "X",
            dec!(100),
            dec!(10),
            3,
            Duration::seconds(30),
            Duration::zero(),
        )
        .unwrap();

    sup.check_depth_orders("X").unwrap();
    // Levels 1 and 2 execute against the 100 limit (3 + 4); level 3 at
    // 100.1 does not, so the walk stops there.
    assert_eq!(sup.gateway().sent().len(), 1);
    let child = sup.gateway().sent()[0].clone();
    assert_eq!(child.request.price, dec!(100));
    assert_eq!(child.request.volume, dec!(7));

    let info = sup.depth_record("X", record).unwrap();
    assert!(info.orders.live.contains(&child.id));
    // The child carries both its own expiry tracking and the depth tag.
    let pack = sup.pack(&child.id).unwrap();
    assert!(pack.tracks.contains(&TrackTag::TimeLimit));
    assert!(pack.tracks.contains(&TrackTag::Depth));
}

#[test]
fn test_depth_chunk_capped_by_remaining_volume() {
    let mut sup = live_supervisor();
    sup.on_tick(tick_with_depth(
        "X",
        dec!(99.8),
        dec!(110),
        dec!(90),
        &[(dec!(99.5), dec!(8)), (dec!(99.9), dec!(9))],
        &[],
    ));

    sup.make_depth_order(
        OrderCommand::Buy,
        "X",
        dec!(100),
        dec!(10),
        2,
        Duration::seconds(30),
        Duration::zero(),
    )
    .unwrap();

    sup.check_depth_orders("X").unwrap();
    // 8 + 9 exceeds the 10 target: capped.
    assert_eq!(sup.gateway().sent()[0].request.volume, dec!(10));

    // Everything is locked; a second sweep sends nothing.
    sup.check_depth_orders("X").unwrap();
    assert_eq!(sup.gateway().sent().len(), 1);
}

#[test]
fn test_depth_order_skips_when_book_not_executable() {
    let mut sup = live_supervisor();
    sup.on_tick(tick_with_depth(
        "X",
        dec!(100.5),
        dec!(110),
        dec!(90),
        &[(dec!(100.4), dec!(3))],
        &[],
    ));

    sup.make_depth_order(
        OrderCommand::Buy,
        "X",
        dec!(100),
        dec!(10),
        1,
        Duration::seconds(30),
        Duration::zero(),
    )
    .unwrap();

    sup.check_depth_orders("X").unwrap();
    // Best ask above the limit: no executable volume, nothing sent.
    assert!(sup.gateway().sent().is_empty());
}

#[test]
fn test_step_order_drips_in_chunks() {
    let mut sup = live_supervisor();
    sup.on_tick(tick("X", dec!(100), dec!(110), dec!(90)));

    let record = sup
        .make_step_order(
            OrderCommand::Buy,
            "X",
            dec!(100),
            dec!(7),
            dec!(3),
            Duration::seconds(3600),
            Duration::zero(),
        )
        .unwrap();

    // Chunks: 3, 3, then the 1 remainder; afterwards the target is locked.
    sup.check_step_orders("X").unwrap();
    sup.check_step_orders("X").unwrap();
    sup.check_step_orders("X").unwrap();
    sup.check_step_orders("X").unwrap();
    let volumes: Vec<_> = sup
        .gateway()
        .sent()
        .iter()
        .map(|s| s.request.volume)
        .collect();
    assert_eq!(volumes, vec![dec!(3), dec!(3), dec!(1)]);

    // A finished chunk keeps counting through its traded volume.
    let first = sup.gateway().sent()[0].id.clone();
    sup.on_order(order_update(
        &first,
        "X",
        Direction::Long,
        Offset::Open,
        dec!(100),
        dec!(3),
        dec!(3),
        OrderStatus::AllTraded,
    ))
    .unwrap();
    sup.check_step_orders("X").unwrap();
    assert_eq!(sup.gateway().sent().len(), 3);

    let info = sup.step_record("X", record).unwrap();
    assert!(info.orders.filled.contains(&first));
    assert_eq!(info.orders.live.len(), 2);
}

#[test]
fn test_step_record_retires_once_target_traded() {
    let mut sup = live_supervisor();
    sup.on_tick(tick("X", dec!(100), dec!(110), dec!(90)));

    let record = sup
        .make_step_order(
            OrderCommand::Buy,
            "X",
            dec!(100),
            dec!(4),
            dec!(4),
            Duration::seconds(3600),
            Duration::zero(),
        )
        .unwrap();
    sup.check_step_orders("X").unwrap();
    let id = sup.gateway().sent()[0].id.clone();

    sup.on_order(order_update(
        &id,
        "X",
        Direction::Long,
        Offset::Open,
        dec!(100),
        dec!(4),
        dec!(4),
        OrderStatus::AllTraded,
    ))
    .unwrap();
    // Full target traded: the record removed itself on the event.
    assert!(sup.step_record("X", record).is_none());
}

#[test]
fn test_backtest_degrades_to_single_submission() {
    let mut sup = OrderSupervisor::new(SimGateway::new(), (), ExecutionMode::Backtest);
    sup.on_tick(tick("X", dec!(100), dec!(110), dec!(90)));

    let step = sup
        .make_step_order(
            OrderCommand::Buy,
            "X",
            dec!(100),
            dec!(9),
            dec!(2),
            Duration::seconds(60),
            Duration::seconds(5),
        )
        .unwrap();
    // One whole-volume submission, no sweeping record.
    assert_eq!(sup.gateway().sent().len(), 1);
    assert_eq!(sup.gateway().sent()[0].request.volume, dec!(9));
    assert!(sup.step_record("X", step).is_none());
    let pack = sup.pack(&sup.gateway().sent()[0].id.clone()).unwrap();
    assert!(pack.tracks.contains(&TrackTag::TimeLimit));
    assert!(pack.tracks.contains(&TrackTag::Step));

    let depth = sup
        .make_depth_order(
            OrderCommand::Short,
            "X",
            dec!(100),
            dec!(5),
            3,
            Duration::seconds(60),
            Duration::zero(),
        )
        .unwrap();
    assert_eq!(sup.gateway().sent().len(), 2);
    assert_eq!(sup.gateway().sent()[1].request.volume, dec!(5));
    assert!(sup.depth_record("X", depth).is_none());

    // Sweeps find no records to pace.
    sup.check_step_orders("X").unwrap();
    sup.check_depth_orders("X").unwrap();
    assert_eq!(sup.gateway().sent().len(), 2);
}

#[test]
fn test_expired_records_are_dropped_by_sweep() {
    // Records only pool in live mode; an already-elapsed window makes the
    // first sweep drop the record without ever sending.
    let mut sup = live_supervisor();
    sup.on_tick(tick("X", dec!(100), dec!(110), dec!(90)));
    let record = sup
        .make_step_order(
            OrderCommand::Buy,
            "X",
            dec!(100),
            dec!(7),
            dec!(3),
            Duration::seconds(-1),
            Duration::zero(),
        )
        .unwrap();
    sup.check_step_orders("X").unwrap();
    assert!(sup.step_record("X", record).is_none());
    assert!(sup.gateway().sent().is_empty());
}
