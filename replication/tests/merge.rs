use skirmish_core::{
    catalog::{demo_battle, DEMO_BLUE, DEMO_RED},
    BattleId, CellCoord, Delta, TurnAction, UnitId,
};
use skirmish_replication::{
    Authority, AuthorityConfig, ConnectionState, LoopbackLink, Replica, SyncClient, SyncConfig,
};
use skirmish_world::query;

fn authority_with_moves() -> Authority {
    let mut authority = Authority::new(
        BattleId::new(1),
        AuthorityConfig::default(),
        demo_battle(),
    );
    let _ = authority.open_session("red", DEMO_RED);
    let _ = authority.open_session("blue", DEMO_BLUE);
    let _ = authority
        .submit(
            DEMO_RED,
            &TurnAction::move_unit(UnitId::new(1), CellCoord::new(1, 2)),
        )
        .expect("butcher steps forward");
    authority
}

fn replica_at_ten(log: &[Delta]) -> Replica {
    let mut replica = Replica::new();
    assert_eq!(replica.merge(0, &log[..10]), 10);
    replica
}

#[test]
fn duplicate_delivery_converges_on_the_same_head() {
    let authority = authority_with_moves();
    let log = authority.log().deltas();
    assert_eq!(log.len(), 13);
    let batch = &log[10..13];

    let mut once = replica_at_ten(log);
    let mut twice = replica_at_ten(log);

    assert_eq!(once.merge(10, batch), 3);
    assert_eq!(twice.merge(10, batch), 3);
    assert_eq!(twice.merge(10, batch), 0);

    assert_eq!(once.head(), 13);
    assert_eq!(twice.head(), 13);
    assert_eq!(
        query::snapshot(once.battle()),
        query::snapshot(twice.battle())
    );
    assert_eq!(query::snapshot(once.battle()), authority.snapshot());
}

#[test]
fn out_of_order_delivery_waits_for_the_hole() {
    let authority = authority_with_moves();
    let log = authority.log().deltas();
    let mut replica = replica_at_ten(log);

    assert_eq!(replica.merge(11, &log[11..13]), 0);
    assert_eq!(replica.head(), 10);
    assert_eq!(replica.lag(), 3);

    assert_eq!(replica.merge(10, &log[10..11]), 3);
    assert_eq!(replica.head(), 13);
    assert_eq!(query::snapshot(replica.battle()), authority.snapshot());
}

#[test]
fn late_joiner_fast_forwards_past_a_long_log() {
    let mut authority = authority_with_moves();
    for round in 0..12 {
        let player = if round % 2 == 0 { DEMO_RED } else { DEMO_BLUE };
        let _ = authority
            .submit(player, &TurnAction::end_turn())
            .expect("turn passes");
    }
    let head = authority.log().head();
    assert!(head > 20);

    let config = SyncConfig {
        fast_forward_threshold: 4,
        ..SyncConfig::default()
    };
    let mut late = SyncClient::new("blue", BattleId::new(1), config);
    let state = late.poll(&mut LoopbackLink::new(&authority));

    assert_eq!(state, ConnectionState::Connected);
    assert_eq!(late.replica().head(), head);
    assert_eq!(late.replica().playback_len(), 0);
    assert_eq!(query::snapshot(late.replica().battle()), authority.snapshot());
}

#[test]
fn incremental_client_follows_each_commit() {
    let mut authority = authority_with_moves();
    let mut follower = SyncClient::new("red", BattleId::new(1), SyncConfig::default());
    let _ = follower.poll(&mut LoopbackLink::new(&authority));
    let start = follower.replica().head();

    let _ = authority
        .submit(DEMO_RED, &TurnAction::end_turn())
        .expect("red ends turn");
    let _ = follower.poll(&mut LoopbackLink::new(&authority));

    assert_eq!(follower.replica().head(), authority.log().head());
    assert!(follower.replica().head() > start);
    assert_eq!(
        query::snapshot(follower.replica().battle()),
        authority.snapshot()
    );

    let mut narrated = 0;
    while follower.replica_mut().next_playback().is_some() {
        narrated += 1;
    }
    assert_eq!(narrated, authority.log().head());
}
