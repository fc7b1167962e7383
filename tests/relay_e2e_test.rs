//! Relay end to end: a real host relay with clients over loopback TCP

use std::time::Duration;

use lan_tetris::net::{
    ClientPeer, NetError, RejectReason, RelayConfig, RelayHandle, TickReport, HOST_ID,
};

const WAIT: Duration = Duration::from_secs(5);

fn local_config(max_clients: usize) -> RelayConfig {
    RelayConfig {
        bind_host: "127.0.0.1".to_string(),
        port: 0,
        max_clients,
        accept_poll_ms: 50,
    }
}

async fn join(relay: &RelayHandle) -> ClientPeer {
    let mut peer = ClientPeer::join(relay.local_addr(), WAIT)
        .await
        .expect("join failed");
    peer.wait_welcome(WAIT).await;
    peer
}

async fn wait_for_players(relay: &RelayHandle, count: usize) {
    tokio::time::timeout(WAIT, async {
        while relay.roster().await.unwrap().len() != count {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("roster never reached the expected size");
}

/// Keep routing with the host alive until `done` accepts a report
async fn route_until<F>(relay: &RelayHandle, host_alive: bool, mut done: F) -> TickReport
where
    F: FnMut(&TickReport) -> bool,
{
    tokio::time::timeout(WAIT, async {
        loop {
            let report = relay
                .poll_and_route("Host", ".".repeat(200), host_alive)
                .await
                .unwrap();
            if done(&report) {
                return report;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("relay never produced the expected report")
}

async fn drain_until<F>(peer: &mut ClientPeer, mut done: F) -> u32
where
    F: FnMut(&ClientPeer) -> bool,
{
    tokio::time::timeout(WAIT, async {
        let mut attacks = 0;
        loop {
            attacks += peer.drain();
            if done(peer) {
                return attacks;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("client never saw the expected state")
}

#[tokio::test]
async fn test_join_assigns_ids_and_names() {
    let relay = RelayHandle::start(local_config(7)).await.unwrap();

    let mut a = join(&relay).await;
    let mut b = join(&relay).await;
    assert_eq!(a.id(), Some(2));
    assert_eq!(b.id(), Some(3));

    a.send_hello("Ann");
    b.send_hello("a name that is far too long");
    let report = route_until(&relay, true, |r| {
        r.roster.get(2) == Some("Ann") && r.roster.get(3) == Some("a name that is f")
    })
    .await;
    assert_eq!(report.roster.get(HOST_ID), Some("Host"));

    drain_until(&mut a, |p| p.view().roster.get(3) == Some("a name that is f")).await;
    relay.shutdown().await;
}

#[tokio::test]
async fn test_two_player_match_host_dies_first() {
    let relay = RelayHandle::start(local_config(7)).await.unwrap();
    let mut peer = join(&relay).await;
    peer.send_hello("Bea");
    route_until(&relay, true, |r| r.roster.get(2) == Some("Bea")).await;

    relay.schedule_start(0.0).unwrap();
    drain_until(&mut peer, |p| p.view().start_at.is_some()).await;

    let report = route_until(&relay, false, |r| r.end.is_some()).await;
    let end = report.end.unwrap();
    assert_eq!(end.winner, Some(2));
    assert_eq!(end.ranking, vec![2, HOST_ID]);
    assert_eq!(end.roster.get(2), Some("Bea"));

    drain_until(&mut peer, |p| p.view().end.is_some()).await;
    assert_eq!(peer.view().end.as_ref().unwrap().winner, Some(2));
    relay.shutdown().await;
}

#[tokio::test]
async fn test_two_player_match_peer_dies_first() {
    let relay = RelayHandle::start(local_config(7)).await.unwrap();
    let mut peer = join(&relay).await;
    wait_for_players(&relay, 2).await;
    relay.schedule_start(0.0).unwrap();
    drain_until(&mut peer, |p| p.view().start_at.is_some()).await;

    peer.send_board(".".repeat(200), false);
    peer.send_dead();

    let report = route_until(&relay, true, |r| r.end.is_some()).await;
    let end = report.end.unwrap();
    assert_eq!(end.winner, Some(HOST_ID));
    assert_eq!(end.ranking, vec![HOST_ID, 2]);
    assert_eq!(report.alive.get(&2), Some(&false));
    relay.shutdown().await;
}

#[tokio::test]
async fn test_solo_match_ends_with_no_winner() {
    let relay = RelayHandle::start(local_config(7)).await.unwrap();
    relay.schedule_start(0.0).unwrap();

    let report = relay
        .poll_and_route("Solo", String::new(), true)
        .await
        .unwrap();
    assert!(report.end.is_none());

    relay.announce_host_death().unwrap();
    let report = route_until(&relay, false, |r| r.end.is_some()).await;
    let end = report.end.unwrap();
    assert_eq!(end.winner, None);
    assert_eq!(end.ranking, vec![HOST_ID]);
    relay.shutdown().await;
}

#[tokio::test]
async fn test_attacks_reach_everyone_but_the_sender() {
    let relay = RelayHandle::start(local_config(7)).await.unwrap();
    let mut a = join(&relay).await;
    let mut b = join(&relay).await;
    wait_for_players(&relay, 3).await;
    relay.schedule_start(0.0).unwrap();

    a.send_attack(3);
    let mut credited = 0;
    route_until(&relay, true, |r| {
        credited += r.attacks;
        credited >= 3
    })
    .await;
    assert_eq!(credited, 3);

    let mut to_b = 0;
    tokio::time::timeout(WAIT, async {
        while to_b < 3 {
            to_b += b.drain();
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .unwrap();
    assert_eq!(to_b, 3);

    relay.broadcast_attack(2).unwrap();
    let mut to_a = 0;
    tokio::time::timeout(WAIT, async {
        while to_a < 2 {
            to_a += a.drain();
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .unwrap();
    assert_eq!(to_a, 2, "the sender must not get its own attack back");
    relay.shutdown().await;
}

#[tokio::test]
async fn test_joining_after_start_is_rejected() {
    let relay = RelayHandle::start(local_config(7)).await.unwrap();
    relay.schedule_start(0.0).unwrap();

    let err = ClientPeer::join(relay.local_addr(), WAIT).await.unwrap_err();
    assert!(
        matches!(err, NetError::Rejected(RejectReason::GameStarted)),
        "unexpected {:?}",
        err
    );
    relay.shutdown().await;
}

#[tokio::test]
async fn test_full_room_is_rejected() {
    let relay = RelayHandle::start(local_config(1)).await.unwrap();
    let _first = join(&relay).await;

    let err = ClientPeer::join(relay.local_addr(), WAIT).await.unwrap_err();
    assert!(
        matches!(err, NetError::Rejected(RejectReason::RoomFull)),
        "unexpected {:?}",
        err
    );
    relay.shutdown().await;
}

#[tokio::test]
async fn test_lobby_disconnect_leaves_roster() {
    let relay = RelayHandle::start(local_config(7)).await.unwrap();
    let mut stays = join(&relay).await;
    let mut leaves = join(&relay).await;
    wait_for_players(&relay, 3).await;
    drain_until(&mut stays, |p| p.view().roster.contains(3)).await;

    leaves.close();
    wait_for_players(&relay, 2).await;
    let roster = relay.roster().await.unwrap();
    assert!(roster.contains(2));
    assert!(!roster.contains(3));

    drain_until(&mut stays, |p| !p.view().roster.contains(3)).await;
    relay.shutdown().await;
}

#[tokio::test]
async fn test_mid_match_disconnect_counts_as_elimination() {
    let relay = RelayHandle::start(local_config(7)).await.unwrap();
    let mut peer = join(&relay).await;
    wait_for_players(&relay, 2).await;
    relay.schedule_start(0.0).unwrap();
    drain_until(&mut peer, |p| p.view().start_at.is_some()).await;

    peer.close();
    let report = route_until(&relay, true, |r| r.end.is_some()).await;
    let end = report.end.unwrap();
    assert_eq!(end.winner, Some(HOST_ID));
    assert_eq!(end.ranking, vec![HOST_ID, 2]);
    relay.shutdown().await;
}

#[tokio::test]
async fn test_shutdown_twice_is_harmless() {
    let relay = RelayHandle::start(local_config(7)).await.unwrap();
    relay.shutdown().await;
    tokio::time::timeout(WAIT, relay.shutdown()).await.unwrap();
    assert!(matches!(relay.roster().await, Err(NetError::RelayClosed)));
}

#[tokio::test]
async fn test_huge_attacks_saturate_instead_of_stopping_the_relay() {
    let relay = RelayHandle::start(local_config(7)).await.unwrap();
    let a = join(&relay).await;
    let b = join(&relay).await;
    wait_for_players(&relay, 3).await;
    relay.schedule_start(0.0).unwrap();

    a.send_attack(3_000_000_000);
    b.send_attack(3_000_000_000);
    let mut credited: u32 = 0;
    route_until(&relay, true, |r| {
        credited = credited.saturating_add(r.attacks);
        credited == u32::MAX
    })
    .await;

    let report = relay
        .poll_and_route("Host", String::new(), true)
        .await
        .unwrap();
    assert!(report.end.is_none());
    assert_eq!(relay.roster().await.unwrap().len(), 3);
    relay.shutdown().await;
}

#[tokio::test]
async fn test_host_death_in_lobby_is_ignored() {
    let relay = RelayHandle::start(local_config(7)).await.unwrap();
    relay.announce_host_death().unwrap();
    relay
        .poll_and_route("Host", String::new(), false)
        .await
        .unwrap();

    relay.schedule_start(0.0).unwrap();
    let report = relay
        .poll_and_route("Host", String::new(), true)
        .await
        .unwrap();
    assert!(report.end.is_none());
    relay.shutdown().await;
}

#[tokio::test]
async fn test_dropping_the_handle_releases_the_port() {
    let relay = RelayHandle::start(local_config(7)).await.unwrap();
    let addr = relay.local_addr();
    drop(relay);

    let listener = tokio::time::timeout(WAIT, async {
        loop {
            match tokio::net::TcpListener::bind(addr).await {
                Ok(listener) => return listener,
                Err(_) => tokio::time::sleep(Duration::from_millis(20)).await,
            }
        }
    })
    .await
    .expect("the relay kept its listener after the last handle was dropped");
    drop(listener);
}
