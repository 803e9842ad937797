//! Turbo session integration test: drives sessions through the coordinator
//! from the lobby to the result, with many clients racing on the same session.
//!
//! Covers: coordinator ↔ session actor ↔ store compare-and-swap ↔ event bus
//! ↔ event history running together.

use turbo_coordination::events::EventHistory;
use turbo_coordination::state::{MemoryStore, SessionStore, SharedSessionStore};
use turbo_coordination::{
    Choice, DecidedBy, EventBus, Session, SharedTurboCoordinator, SwipeDecision, SwipeRequest,
    TurboConfig, TurboCoordinator, TurboError, TurboEvent, TurboState,
};

/// Helper: coordinator over a fresh store with the event log enabled.
fn coordinator_with(config: TurboConfig) -> (SharedTurboCoordinator, SharedSessionStore) {
    let store = MemoryStore::new().shared();
    let bus = EventBus::with_persistence(store.clone()).shared();
    let coordinator = TurboCoordinator::new(store.clone(), bus, config).shared();
    (coordinator, store)
}

fn coordinator() -> (SharedTurboCoordinator, SharedSessionStore) {
    coordinator_with(TurboConfig::default())
}

/// Helper: create a session, join everyone and open the sprint.
async fn sprinting_session(
    coordinator: &SharedTurboCoordinator,
    group_size: u32,
    members: &[&str],
) -> Session {
    let session = coordinator
        .create_session(group_size, Some(members[0].to_string()))
        .await
        .unwrap();
    for member in members {
        coordinator.join(&session.id, member).await.unwrap();
    }
    coordinator.start_briefing(&session.id).await.unwrap();
    coordinator.start_sprint(&session.id).await.unwrap()
}

async fn swipe(
    coordinator: &SharedTurboCoordinator,
    session_id: &str,
    participant: &str,
    activity: &str,
    decision: SwipeDecision,
) -> Session {
    coordinator
        .record_swipe(session_id, participant, activity, decision, activity)
        .await
        .unwrap()
        .session
}

fn phase_changes_to(events: &[TurboEvent], state: TurboState) -> usize {
    events
        .iter()
        .filter(|e| e.entered_state() == Some(state))
        .count()
}

// ── Full flow ──────────────────────────────────────────────────────

#[tokio::test]
async fn test_full_session_flow() {
    let (coordinator, _store) = coordinator();
    let session = sprinting_session(&coordinator, 3, &["alice", "bob", "carol"]).await;
    let id = session.id.clone();
    assert_eq!(session.state, TurboState::Sprint);
    assert_eq!(session.min_swipes_per_person, 8);

    // alice: yes on c0 and c1, no on the rest
    for (i, activity) in ["c0", "c1", "c2", "c3", "c4", "c5", "c6"].iter().enumerate() {
        let decision = if i < 2 { SwipeDecision::Yes } else { SwipeDecision::No };
        let snapshot = swipe(&coordinator, &id, "alice", activity, decision).await;
        assert_eq!(snapshot.state, TurboState::Sprint);
    }

    // bob: yes on c0 and c2; his sixth swipe brings 2 counted members to 13 swipes
    let bob = [
        ("c0", SwipeDecision::Yes),
        ("c1", SwipeDecision::No),
        ("c2", SwipeDecision::Yes),
        ("c3", SwipeDecision::No),
        ("c4", SwipeDecision::No),
    ];
    for (activity, decision) in bob {
        let snapshot = swipe(&coordinator, &id, "bob", activity, decision).await;
        assert_eq!(snapshot.state, TurboState::Sprint);
    }
    let benchmark = coordinator.benchmark(&id).await.unwrap();
    assert_eq!(benchmark.total_swipes, 12);
    assert_eq!(benchmark.swipes_remaining, 1);

    let snapshot = swipe(&coordinator, &id, "bob", "c5", SwipeDecision::No).await;
    assert_eq!(snapshot.state, TurboState::Deathmatch);
    assert!(snapshot.sprint.as_ref().unwrap().benchmark_hit);

    let top2 = snapshot.top2.clone().unwrap();
    assert_eq!(top2[0].id, "c0");
    assert_eq!(top2[1].id, "c1");
    assert_eq!(snapshot.deathmatch.as_ref().unwrap().votes_a, 0);

    // carol never swiped: she may vote but does not count toward the majority
    let after_carol = coordinator.vote(&id, "carol", Choice::B).await.unwrap();
    assert_eq!(after_carol.state, TurboState::Deathmatch);
    let after_alice = coordinator.vote(&id, "alice", Choice::A).await.unwrap();
    assert_eq!(after_alice.state, TurboState::Deathmatch);

    let resolved = coordinator.vote(&id, "bob", Choice::A).await.unwrap();
    assert_eq!(resolved.state, TurboState::Results);
    let result = resolved.result.unwrap();
    assert_eq!(result.winner, Choice::A);
    assert_eq!(result.decided_by, DecidedBy::Vote);
    assert_eq!((result.votes_a, result.votes_b), (2, 1));
    assert_eq!(result.winning_activity.unwrap().id, "c0");

    // Late calls change nothing
    let again = coordinator.force_end(&id, Some(Choice::B)).await.unwrap();
    assert_eq!(again.result.unwrap().winner, Choice::A);
    let err = coordinator.vote(&id, "carol", Choice::A).await.unwrap_err();
    assert!(matches!(err, TurboError::InvalidTransition { .. }));
}

#[tokio::test]
async fn test_history_records_every_phase_once() {
    let (coordinator, store) = coordinator();
    let session = sprinting_session(&coordinator, 2, &["alice", "bob"]).await;
    let id = session.id.clone();

    for participant in ["alice", "bob"] {
        for activity in ["a", "b", "c", "d", "e", "f", "g"] {
            let _ = coordinator
                .record_swipe(&id, participant, activity, SwipeDecision::Yes, activity)
                .await;
        }
    }
    coordinator.force_end(&id, None).await.unwrap();

    let events = EventHistory::new(store).session_events(&id).await.unwrap();
    assert!(matches!(events[0], TurboEvent::SessionCreated { .. }));
    for state in [
        TurboState::Briefing,
        TurboState::Sprint,
        TurboState::Deathmatch,
        TurboState::Results,
    ] {
        assert_eq!(phase_changes_to(&events, state), 1, "{state}");
    }
    assert!(matches!(
        events.last(),
        Some(TurboEvent::SessionResolved { .. })
    ));
}

// ── Concurrency ────────────────────────────────────────────────────

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_swipes_enter_deathmatch_once() {
    let (coordinator, store) = coordinator();
    let members = ["p0", "p1", "p2", "p3", "p4", "p5", "p6", "p7"];
    let session = sprinting_session(&coordinator, 8, &members).await;

    let mut handles = Vec::new();
    for member in members {
        let coordinator = coordinator.clone();
        let id = session.id.clone();
        handles.push(tokio::spawn(async move {
            for i in 0..12 {
                let activity = format!("act-{i}");
                let decision = if i % 3 == 0 { SwipeDecision::Yes } else { SwipeDecision::No };
                match coordinator
                    .record_swipe(&id, member, &activity, decision, &activity)
                    .await
                {
                    Ok(_) => {}
                    Err(TurboError::InvalidTransition { .. }) => break,
                    Err(e) => panic!("unexpected error: {e}"),
                }
            }
        }));
    }
    for handle in handles {
        handle.await.unwrap();
    }

    let snapshot = coordinator.get_session(&session.id).await.unwrap();
    assert_eq!(snapshot.state, TurboState::Deathmatch);

    let events = EventHistory::new(store)
        .session_events(&session.id)
        .await
        .unwrap();
    assert_eq!(phase_changes_to(&events, TurboState::Deathmatch), 1);
    let hits = events
        .iter()
        .filter(|e| matches!(e, TurboEvent::BenchmarkHit { .. }))
        .count();
    assert_eq!(hits, 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_two_coordinators_share_one_store() {
    let store = MemoryStore::new().shared();
    let bus = EventBus::with_persistence(store.clone()).shared();
    let config = TurboConfig {
        max_commit_retries: 100,
        ..TurboConfig::default()
    };
    let first = TurboCoordinator::new(store.clone(), bus.clone(), config.clone()).shared();
    let second = TurboCoordinator::new(store.clone(), bus, config).shared();

    let session = sprinting_session(&first, 4, &["p0", "p1", "p2", "p3"]).await;

    let mut handles = Vec::new();
    for (n, member) in ["p0", "p1", "p2", "p3"].into_iter().enumerate() {
        let coordinator = if n % 2 == 0 { first.clone() } else { second.clone() };
        let id = session.id.clone();
        handles.push(tokio::spawn(async move {
            for i in 0..8 {
                let activity = format!("act-{i}");
                match coordinator
                    .record_swipe(&id, member, &activity, SwipeDecision::Yes, &activity)
                    .await
                {
                    Ok(_) => {}
                    Err(TurboError::InvalidTransition { .. }) => break,
                    Err(e) => panic!("unexpected error: {e}"),
                }
            }
        }));
    }
    for handle in handles {
        handle.await.unwrap();
    }

    let snapshot = store.load_session(&session.id).await.unwrap().unwrap();
    assert_eq!(snapshot.state, TurboState::Deathmatch);

    let swipes = store.list_swipes(&session.id).await.unwrap();
    let counted: u32 = snapshot.members.values().map(|m| m.swipe_count).sum();
    assert_eq!(counted as usize, swipes.len());

    let events = EventHistory::new(store)
        .session_events(&session.id)
        .await
        .unwrap();
    assert_eq!(phase_changes_to(&events, TurboState::Deathmatch), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_votes_resolve_once() {
    let config = TurboConfig {
        sprint_duration_secs: 0,
        ..TurboConfig::default()
    };
    let (coordinator, store) = coordinator_with(config);
    let members = ["p0", "p1", "p2", "p3", "p4"];
    let session = sprinting_session(&coordinator, 5, &members).await;
    let id = session.id.clone();

    // Three swipes each: all five count toward the majority, far below the benchmark
    for member in members {
        for activity in ["x", "y", "z"] {
            let decision = if activity == "z" { SwipeDecision::No } else { SwipeDecision::Yes };
            swipe(&coordinator, &id, member, activity, decision).await;
        }
    }
    let snapshot = coordinator.expire_sprint(&id).await.unwrap();
    assert_eq!(snapshot.state, TurboState::Deathmatch);
    let top2 = snapshot.top2.unwrap();
    assert_eq!((top2[0].id.as_str(), top2[1].id.as_str()), ("x", "y"));

    let mut handles = Vec::new();
    for member in members {
        let coordinator = coordinator.clone();
        let id = id.clone();
        handles.push(tokio::spawn(async move {
            coordinator.vote(&id, member, Choice::B).await
        }));
    }
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) | Err(TurboError::InvalidTransition { .. }) => {}
            Err(e) => panic!("unexpected error: {e}"),
        }
    }

    let resolved = coordinator.get_session(&id).await.unwrap();
    let result = resolved.result.unwrap();
    assert_eq!(result.winner, Choice::B);
    assert_eq!(result.votes_b, 3);
    assert_eq!(result.winning_activity.unwrap().id, "y");

    let events = EventHistory::new(store).session_events(&id).await.unwrap();
    let resolutions = events
        .iter()
        .filter(|e| matches!(e, TurboEvent::SessionResolved { .. }))
        .count();
    assert_eq!(resolutions, 1);
}

// ── Deathmatch ─────────────────────────────────────────────────────

/// Helper: reach the deathmatch with two members who both count.
async fn deathmatch_session(coordinator: &SharedTurboCoordinator) -> Session {
    let session = sprinting_session(coordinator, 2, &["alice", "bob"]).await;
    let id = session.id.clone();
    for participant in ["alice", "bob"] {
        for activity in ["a", "b", "c", "d", "e", "f", "g"] {
            match coordinator
                .record_swipe(&id, participant, activity, SwipeDecision::Yes, activity)
                .await
            {
                Ok(outcome) if outcome.session.state == TurboState::Deathmatch => {
                    return outcome.session
                }
                Ok(_) => {}
                Err(e) => panic!("unexpected error: {e}"),
            }
        }
    }
    panic!("benchmark never met");
}

#[tokio::test]
async fn test_force_end_without_votes_picks_a() {
    let (coordinator, _store) = coordinator();
    let session = deathmatch_session(&coordinator).await;

    let resolved = coordinator.force_end(&session.id, None).await.unwrap();
    let result = resolved.result.unwrap();
    assert_eq!(result.winner, Choice::A);
    assert_eq!(result.decided_by, DecidedBy::Vote);
    assert_eq!((result.votes_a, result.votes_b), (0, 0));
}

#[tokio::test]
async fn test_host_choice_overrides_votes() {
    let (coordinator, _store) = coordinator();
    let session = deathmatch_session(&coordinator).await;

    coordinator.vote(&session.id, "alice", Choice::A).await.unwrap();
    let resolved = coordinator
        .force_end(&session.id, Some(Choice::B))
        .await
        .unwrap();
    let result = resolved.result.unwrap();
    assert_eq!(result.winner, Choice::B);
    assert_eq!(result.decided_by, DecidedBy::Host);
}

#[tokio::test]
async fn test_vote_switch_keeps_totals() {
    let (coordinator, _store) = coordinator();
    let session = deathmatch_session(&coordinator).await;

    let first = coordinator.vote(&session.id, "alice", Choice::A).await.unwrap();
    let dm = first.deathmatch.unwrap();
    assert_eq!((dm.votes_a, dm.votes_b), (1, 0));

    let switched = coordinator.vote(&session.id, "alice", Choice::B).await.unwrap();
    let dm = switched.deathmatch.unwrap();
    assert_eq!((dm.votes_a, dm.votes_b), (0, 1));
    assert_eq!(dm.voters.len(), 1);
}

#[tokio::test]
async fn test_outsider_cannot_vote() {
    let (coordinator, _store) = coordinator();
    let session = deathmatch_session(&coordinator).await;

    let err = coordinator
        .vote(&session.id, "mallory", Choice::A)
        .await
        .unwrap_err();
    assert!(matches!(err, TurboError::UnknownParticipant(_)));
}

// ── Sprint edge cases ──────────────────────────────────────────────

#[tokio::test]
async fn test_repeat_swipes_never_reach_quorum() {
    let (coordinator, _store) = coordinator();
    let session = sprinting_session(&coordinator, 2, &["alice", "bob"]).await;
    let id = session.id.clone();

    let mut last = None;
    for participant in ["alice", "bob"] {
        for _ in 0..3 {
            last = Some(
                coordinator
                    .record_swipe(&id, participant, "only", SwipeDecision::Yes, "Only")
                    .await
                    .unwrap(),
            );
        }
    }

    // Overwrites never raise the count, so no member counts and nothing fires
    let outcome = last.unwrap();
    assert!(outcome.deferred.is_none());
    assert_eq!(outcome.session.members["alice"].swipe_count, 1);
    assert_eq!(outcome.session.state, TurboState::Sprint);
}

#[tokio::test]
async fn test_benchmark_retries_after_skip() {
    let config = TurboConfig {
        quorum_min_swipes: 1,
        ..TurboConfig::default()
    };
    let (coordinator, store) = coordinator_with(config);
    let session = sprinting_session(&coordinator, 2, &["alice", "bob"]).await;
    let id = session.id.clone();

    // One swipe each is enough volume: target = ceil(0.8 * 2 * 1) = 2
    let mut relaxed = store.load_session(&id).await.unwrap().unwrap();
    let expected = relaxed.revision;
    relaxed.min_swipes_per_person = 1;
    relaxed.revision += 1;
    store.compare_and_swap(&relaxed, expected).await.unwrap();

    let rated = |participant: &str, activity: &str| SwipeRequest {
        participant_id: participant.to_string(),
        activity_id: activity.to_string(),
        decision: SwipeDecision::Yes,
        activity_name: activity.to_uppercase(),
        rating: Some(4.5),
    };

    coordinator
        .record_swipe_with(&id, rated("alice", "first"))
        .await
        .unwrap();
    let outcome = coordinator
        .record_swipe_with(&id, rated("bob", "first"))
        .await
        .unwrap();
    assert!(matches!(
        outcome.deferred,
        Some(TurboError::InsufficientCandidates { found: 1 })
    ));
    assert_eq!(outcome.session.state, TurboState::Sprint);
    assert!(outcome.session.sprint.as_ref().unwrap().benchmark_hit);

    let outcome = coordinator
        .record_swipe_with(&id, rated("alice", "second"))
        .await
        .unwrap();
    assert!(outcome.deferred.is_none());
    assert_eq!(outcome.session.state, TurboState::Deathmatch);
    let top2 = outcome.session.top2.unwrap();
    assert_eq!(top2[0].id, "first");
    assert_eq!(top2[0].name, "FIRST");
    assert_eq!(top2[0].rating, Some(4.5));

    let hits = EventHistory::new(store)
        .events_of_type(&id, &["benchmark_hit"])
        .await
        .unwrap();
    assert_eq!(hits.len(), 1);
}

#[tokio::test]
async fn test_swipe_outside_sprint_rejected() {
    let (coordinator, _store) = coordinator();
    let session = coordinator.create_session(4, None).await.unwrap();

    let err = coordinator
        .record_swipe(&session.id, "alice", "a", SwipeDecision::Yes, "A")
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        TurboError::InvalidTransition {
            state: TurboState::Lobby,
            ..
        }
    ));
}

#[tokio::test]
async fn test_swipe_joins_unknown_participant() {
    let (coordinator, _store) = coordinator();
    let session = sprinting_session(&coordinator, 4, &["alice"]).await;

    let snapshot = swipe(&coordinator, &session.id, "dave", "a", SwipeDecision::No).await;
    assert!(snapshot.is_member("dave"));
    assert_eq!(snapshot.members["dave"].swipe_count, 1);
    assert!(snapshot.members["dave"].active);
}

#[tokio::test]
async fn test_overwrite_does_not_count_twice() {
    let (coordinator, store) = coordinator();
    let session = sprinting_session(&coordinator, 4, &["alice"]).await;

    swipe(&coordinator, &session.id, "alice", "a", SwipeDecision::Yes).await;
    let snapshot = swipe(&coordinator, &session.id, "alice", "a", SwipeDecision::No).await;
    assert_eq!(snapshot.members["alice"].swipe_count, 1);

    let swipes = store.list_swipes(&session.id).await.unwrap();
    assert_eq!(swipes.len(), 1);
    assert_eq!(swipes[0].decision, SwipeDecision::No);
}

#[tokio::test]
async fn test_colon_ids_keep_swipes_apart() {
    let (coordinator, store) = coordinator();
    let session = sprinting_session(&coordinator, 4, &["host"]).await;

    swipe(&coordinator, &session.id, "a:b", "c", SwipeDecision::Yes).await;
    let snapshot = swipe(&coordinator, &session.id, "a", "b:c", SwipeDecision::No).await;
    assert_eq!(snapshot.members["a:b"].swipe_count, 1);
    assert_eq!(snapshot.members["a"].swipe_count, 1);

    let mut stored: Vec<(String, String)> = store
        .list_swipes(&session.id)
        .await
        .unwrap()
        .into_iter()
        .map(|s| (s.participant_id, s.activity_id))
        .collect();
    stored.sort();
    assert_eq!(
        stored,
        vec![
            ("a".to_string(), "b:c".to_string()),
            ("a:b".to_string(), "c".to_string()),
        ]
    );
}

// ── Deadlines ──────────────────────────────────────────────────────

#[tokio::test]
async fn test_expire_sprint_before_deadline() {
    let (coordinator, _store) = coordinator();
    let session = sprinting_session(&coordinator, 4, &["alice"]).await;

    let err = coordinator.expire_sprint(&session.id).await.unwrap_err();
    assert!(matches!(err, TurboError::DeadlineNotReached { .. }));
}

#[tokio::test]
async fn test_expire_sprint_single_candidate_wins() {
    let config = TurboConfig {
        sprint_duration_secs: 0,
        ..TurboConfig::default()
    };
    let (coordinator, _store) = coordinator_with(config);
    let session = coordinator.create_session(4, None).await.unwrap();
    coordinator.start_sprint(&session.id).await.unwrap();

    // Deadline already passed; the swipe is still accepted until someone expires the sprint
    swipe(&coordinator, &session.id, "alice", "solo", SwipeDecision::Yes).await;

    let resolved = coordinator.expire_sprint(&session.id).await.unwrap();
    assert_eq!(resolved.state, TurboState::Results);
    let result = resolved.result.unwrap();
    assert_eq!(result.decided_by, DecidedBy::Timeout);
    assert_eq!(result.winner, Choice::A);
    assert_eq!(result.winning_activity.unwrap().id, "solo");

    // Expiring again is a no-op
    let again = coordinator.expire_sprint(&session.id).await.unwrap();
    assert_eq!(again.revision, resolved.revision);
}

#[tokio::test]
async fn test_expire_deathmatch_before_deadline() {
    let (coordinator, _store) = coordinator();
    let session = deathmatch_session(&coordinator).await;

    let err = coordinator
        .expire_deathmatch(&session.id)
        .await
        .unwrap_err();
    assert!(matches!(err, TurboError::DeadlineNotReached { .. }));
}

// ── Membership and lookups ─────────────────────────────────────────

#[tokio::test]
async fn test_join_is_idempotent() {
    let (coordinator, _store) = coordinator();
    let session = coordinator.create_session(4, None).await.unwrap();

    let first = coordinator.join(&session.id, "alice").await.unwrap();
    let second = coordinator.join(&session.id, "alice").await.unwrap();
    assert_eq!(first.revision, second.revision);
    assert_eq!(second.members.len(), 1);
}

#[tokio::test]
async fn test_join_allowed_after_lobby() {
    let (coordinator, _store) = coordinator();
    let session = sprinting_session(&coordinator, 4, &["alice"]).await;

    let joined = coordinator.join(&session.id, "late").await.unwrap();
    assert!(joined.is_member("late"));
    assert_eq!(joined.state, TurboState::Sprint);
}

#[tokio::test]
async fn test_missing_session_and_participant() {
    let (coordinator, _store) = coordinator();

    let err = coordinator.start_briefing("nope").await.unwrap_err();
    assert!(matches!(err, TurboError::NotFound(_)));
    assert_eq!(err.kind(), "not_found");

    let session = coordinator.create_session(4, None).await.unwrap();
    let err = coordinator.join(&session.id, "").await.unwrap_err();
    assert!(matches!(err, TurboError::MissingParticipant));
}

#[tokio::test]
async fn test_briefing_only_from_lobby() {
    let (coordinator, _store) = coordinator();
    let session = sprinting_session(&coordinator, 4, &["alice"]).await;

    let err = coordinator.start_briefing(&session.id).await.unwrap_err();
    assert!(matches!(
        err,
        TurboError::InvalidTransition {
            state: TurboState::Sprint,
            ..
        }
    ));
    let err = coordinator.start_sprint(&session.id).await.unwrap_err();
    assert!(matches!(err, TurboError::InvalidTransition { .. }));
}

// ── Subscriptions ──────────────────────────────────────────────────

#[tokio::test]
async fn test_subscription_follows_to_results() {
    let (coordinator, _store) = coordinator();
    let session = deathmatch_session(&coordinator).await;

    let subscription = coordinator.subscribe(&session.id).await.unwrap();
    let collector = tokio::spawn(async move {
        let mut seen = Vec::new();
        subscription
            .for_each(|snapshot| seen.push((snapshot.revision, snapshot.state)))
            .await;
        seen
    });

    coordinator.vote(&session.id, "alice", Choice::B).await.unwrap();
    coordinator.vote(&session.id, "bob", Choice::B).await.unwrap();

    let seen = tokio::time::timeout(std::time::Duration::from_secs(5), collector)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(seen.first().map(|s| s.1), Some(TurboState::Deathmatch));
    assert_eq!(seen.last().map(|s| s.1), Some(TurboState::Results));
    assert!(seen.windows(2).all(|w| w[0].0 < w[1].0));
}

#[tokio::test]
async fn test_subscriptions_are_scoped_to_session() {
    let (coordinator, _store) = coordinator();
    let watched = coordinator.create_session(4, None).await.unwrap();
    let other = coordinator.create_session(4, None).await.unwrap();

    let mut subscription = coordinator.subscribe(&watched.id).await.unwrap();
    assert_eq!(subscription.next().await.unwrap().id, watched.id);

    coordinator.join(&other.id, "alice").await.unwrap();
    coordinator.join(&watched.id, "bob").await.unwrap();

    let next = subscription.next().await.unwrap();
    assert_eq!(next.id, watched.id);
    assert!(next.is_member("bob"));
}
