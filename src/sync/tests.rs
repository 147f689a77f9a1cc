#![allow(non_snake_case)]

use super::*;
use crate::{
    adapter::in_memory::{
        InMemoryLedger,
        Op,
    },
    types::{
        Choice,
        GameKind,
        GameResult,
        HistoryEntry,
        PlayerStats,
    },
};
use chrono::{
    DateTime,
    Utc,
};
use std::time::Duration;
use tokio::time::sleep;

fn alice() -> Address {
    Address::new([0xa1; 20])
}

fn bob() -> Address {
    Address::new([0xb0; 20])
}

fn collector<T: Send + 'static>() -> (Arc<Mutex<Vec<T>>>, impl FnMut(T) + Send + 'static) {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = seen.clone();
    (seen, move |item| sink.lock().unwrap().push(item))
}

fn count<T>(seen: &Arc<Mutex<Vec<T>>>) -> usize {
    seen.lock().unwrap().len()
}

fn history_entry(game_id: u64) -> HistoryEntry {
    HistoryEntry {
        game_id,
        kind: GameKind::Multi,
        opponent: bob(),
        player_choice: Some(Choice::Paper),
        opponent_choice: Some(Choice::Rock),
        stake: 10,
        token: Address::ZERO,
        result: GameResult::Win,
        payout: 19,
        timestamp: DateTime::<Utc>::from_timestamp(1_700_000_000, 0).unwrap(),
    }
}

#[test]
fn sink__dead_subscription_never_sees_results() {
    // given
    let (seen, callback) = collector::<u32>();
    let sink = Sink::new(callback);
    let liveness = Liveness::new();
    sink.deliver(&liveness, 1);

    // when
    liveness.kill();
    sink.deliver(&liveness, 2);

    // then
    assert_eq!(*seen.lock().unwrap(), vec![1]);
}

#[tokio::test(start_paused = true)]
async fn subscribe_events__delivers_new_events_once() {
    // given
    let ledger = InMemoryLedger::new();
    ledger.set_height(100);
    ledger.push_event(Event::multiplayer_result(1, alice(), 50, 10, 90));
    let sync = LedgerSync::new(ledger.clone(), SyncConfig::default());
    let (seen, on_event) = collector::<Event>();
    let _sub = sync.subscribe_events(on_event);
    sleep(Duration::from_millis(50)).await;

    // when
    let fresh = Event::multiplayer_result(2, bob(), 50, 20, 101);
    ledger.push_event(fresh.clone());
    ledger.set_height(101);
    sleep(Duration::from_secs(2)).await;

    // then
    assert_eq!(*seen.lock().unwrap(), vec![fresh]);
}

#[tokio::test(start_paused = true)]
async fn subscribe_events__survives_transient_failures() {
    // given
    let ledger = InMemoryLedger::new();
    ledger.set_height(100);
    let sync = LedgerSync::new(ledger.clone(), SyncConfig::default());
    let (seen, on_event) = collector::<Event>();
    let _sub = sync.subscribe_events(on_event);
    sleep(Duration::from_millis(50)).await;

    // when
    ledger.fail_next(Op::Height, 3);
    ledger.push_event(Event::multiplayer_result(2, bob(), 50, 20, 101));
    ledger.set_height(101);
    sleep(Duration::from_secs(3)).await;

    // then
    assert_eq!(count(&seen), 1);
}

#[tokio::test(start_paused = true)]
async fn subscribe_game__snapshot_on_change_and_milestone_once() {
    // given
    let ledger = InMemoryLedger::with_account(alice());
    let id = ledger.push_game(GameRecord::open(0, alice(), 100));
    let sync = LedgerSync::new(ledger.clone(), SyncConfig::default());
    let (snapshots, on_snapshot) = collector::<GameRecord>();
    let (milestones, on_milestone) = collector::<Milestone>();
    let _sub = sync.subscribe_game(id, on_snapshot, on_milestone);
    sleep(Duration::from_millis(10)).await;

    // when
    let mut game = ledger.game(id).unwrap();
    game.second = bob();
    game.first_committed = true;
    game.second_committed = true;
    ledger.update_game(game);
    sleep(Duration::from_secs(16)).await;

    // then
    assert_eq!(count(&snapshots), 2);
    assert_eq!(
        *milestones.lock().unwrap(),
        vec![Milestone::BothCommitted { game_id: id }]
    );
}

#[tokio::test(start_paused = true)]
async fn subscribe_game__cancelled_while_read_in_flight_discards_response() {
    // given
    let ledger = InMemoryLedger::with_account(alice());
    let id = ledger.push_game(GameRecord::open(0, alice(), 100));
    ledger.set_game_read_delay(Some(Duration::from_secs(1)));
    let sync = LedgerSync::new(ledger.clone(), SyncConfig::default());
    let (snapshots, on_snapshot) = collector::<GameRecord>();
    let sub = sync.subscribe_game(id, on_snapshot, |_| {});
    sleep(Duration::from_millis(10)).await;
    assert_eq!(ledger.calls(Op::ReadGame), 1);

    // when
    sub.cancel();
    sleep(Duration::from_secs(30)).await;

    // then
    assert_eq!(count(&snapshots), 0);
    assert_eq!(ledger.calls(Op::ReadGame), 1);
    assert_eq!(ledger.outstanding_game_reads(), 0);
}

#[tokio::test(start_paused = true)]
async fn subscribe_lobby__delivers_only_on_change() {
    // given
    let ledger = InMemoryLedger::new();
    ledger.push_game(GameRecord::open(0, alice(), 1));
    let sync = LedgerSync::new(ledger.clone(), SyncConfig::default());
    let (batches, on_batch) = collector::<LobbyView>();
    let _sub = sync.subscribe_lobby(on_batch);

    // when
    sleep(Duration::from_secs(25)).await;
    let after_idle_ticks = count(&batches);
    ledger.push_game(GameRecord::open(0, bob(), 2));
    sleep(Duration::from_secs(10)).await;

    // then
    assert_eq!(after_idle_ticks, 1);
    let batches = batches.lock().unwrap();
    assert_eq!(batches.len(), 2);
    assert_eq!(batches[1].games[0].first, bob());
}

#[tokio::test(start_paused = true)]
async fn subscribe_lobby__refresh_polls_immediately() {
    // given
    let ledger = InMemoryLedger::new();
    let sync = LedgerSync::new(ledger.clone(), SyncConfig::default());
    let (batches, on_batch) = collector::<LobbyView>();
    let sub = sync.subscribe_lobby(on_batch);
    sleep(Duration::from_millis(10)).await;

    // when
    ledger.push_game(GameRecord::open(0, alice(), 1));
    sub.refresh();
    sleep(Duration::from_millis(10)).await;

    // then
    assert_eq!(count(&batches), 2);
    assert_eq!(ledger.calls(Op::GameCount), 2);
}

#[tokio::test(start_paused = true)]
async fn subscribe_lobby__callback_hands_off_through_a_channel() {
    // given
    let ledger = InMemoryLedger::new();
    ledger.push_game(GameRecord::open(0, alice(), 1));
    let sync = LedgerSync::new(ledger.clone(), SyncConfig::default());
    let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();

    // when
    let sub = sync.subscribe_lobby(move |view: LobbyView| {
        let _ = tx.send(view);
    });
    let first = rx.recv().await.unwrap();
    ledger.push_game(GameRecord::open(0, bob(), 2));
    sub.refresh();
    let second = rx.recv().await.unwrap();

    // then
    assert_eq!(first.games.len(), 1);
    assert_eq!(second.games.len(), 2);
}

#[tokio::test]
async fn fetch_history_page__empty_without_a_session() {
    let ledger = InMemoryLedger::new();
    let sync = LedgerSync::new(ledger, SyncConfig::default());
    assert_eq!(sync.fetch_history_page(0).await, Ok(Outcome::Empty));
}

#[tokio::test]
async fn fetch_history_page__pages_the_local_account() {
    // given
    let ledger = InMemoryLedger::with_account(alice());
    for id in 0..13 {
        ledger.push_history(alice(), history_entry(id));
    }
    let sync = LedgerSync::new(ledger, SyncConfig::default());

    // when
    let page = sync.fetch_history_page(1).await.unwrap().into_option().unwrap();

    // then
    assert_eq!(page.entries.len(), 3);
    assert_eq!(page.total, 13);
    assert!(!page.has_next());
}

#[tokio::test]
async fn player_summary__reads_local_account() {
    // given
    let ledger = InMemoryLedger::with_account(bob());
    ledger.set_stats(
        bob(),
        PlayerStats {
            wins: 3,
            losses: 1,
            total_profit: 70,
        },
    );
    let sync = LedgerSync::new(ledger, SyncConfig::default());

    // when
    let summary = sync.player_summary().await.unwrap().into_option().unwrap();

    // then
    assert_eq!(summary.total_games, 4);
    assert_eq!(summary.win_rate_percent, 75.0);
}
