//! Integration tests for the round lifecycle

use map_conquest::atlas::Atlas;
use map_conquest::core::config::TimingConfig;
use map_conquest::core::error::PreconditionViolation;
use map_conquest::core::types::{MapPoint, RegionId, TeamId};
use map_conquest::core::GameConfig;
use map_conquest::session::{FireOutcome, GameSession, MatchStage, MatchStateMachine, ScheduledTransition};
use proptest::prelude::*;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

fn grid_atlas(size: usize) -> Atlas {
    Atlas::from_centroids((0..size).map(|i| {
        (
            RegionId::new(format!("R{:02}", i)),
            MapPoint::new((i % 4) as f64 * 50.0, (i / 4) as f64 * 50.0),
        )
    }))
}

fn machine() -> MatchStateMachine {
    MatchStateMachine::new(&GameConfig::default()).with_timing(TimingConfig::immediate())
}

/// Fire until the machine waits for a winner or the game ends
fn drive(
    machine: &MatchStateMachine,
    session: &mut GameSession,
    atlas: &Atlas,
    rng: &mut ChaCha8Rng,
    mut scheduled: ScheduledTransition,
) -> FireOutcome {
    loop {
        match machine.fire(session, scheduled.token, atlas, rng) {
            FireOutcome::NextRound(next) => scheduled = next,
            other => return other,
        }
    }
}

#[test]
fn test_alpha_beta_scenario() {
    let atlas = Atlas::from_centroids([
        (RegionId::new("Alpha"), MapPoint::new(0.0, 0.0)),
        (RegionId::new("Beta"), MapPoint::new(100.0, 0.0)),
    ]);
    let machine = machine();
    let mut session = GameSession::new(&GameConfig::default());
    let mut rng = ChaCha8Rng::seed_from_u64(11);

    let a = machine.add_team(&mut session, "Team A", &RegionId::new("Alpha"), &atlas).unwrap();
    let b = machine.add_team(&mut session, "Team B", &RegionId::new("Beta"), &atlas).unwrap();

    let draw = machine.start(&mut session, &mut rng).unwrap();
    assert!(matches!(
        machine.fire(&mut session, draw.token, &atlas, &mut rng),
        FireOutcome::OpponentDrawn { .. }
    ));
    machine.declare_winner(&mut session, a, &mut rng).unwrap();

    let ledger = session.ledger();
    let team_a = ledger.team(a).unwrap();
    let team_b = ledger.team(b).unwrap();
    let alpha_beta: Vec<&str> = team_a.owned_regions.iter().map(RegionId::as_str).collect();
    assert_eq!(alpha_beta, vec!["Alpha", "Beta"]);
    assert!(team_b.owned_regions.is_empty());
    assert!(team_b.eliminated);
    assert_eq!(team_a.score, 1);
    assert!(ledger.check_invariants(&atlas).is_ok());
}

#[test]
fn test_single_team_start_rejected() {
    let atlas = grid_atlas(4);
    let machine = machine();
    let mut session = GameSession::new(&GameConfig::default());
    let mut rng = ChaCha8Rng::seed_from_u64(1);

    machine.add_team(&mut session, "Solo", &RegionId::new("R00"), &atlas).unwrap();
    let round_before = session.round();

    assert_eq!(
        machine.start(&mut session, &mut rng),
        Err(PreconditionViolation::NotEnoughTeams { available: 1 })
    );
    assert_eq!(session.round(), round_before);
    assert_eq!(session.stage(), MatchStage::Idle);
}

#[test]
fn test_winner_must_be_a_participant() {
    let atlas = grid_atlas(4);
    let machine = machine();
    let mut session = GameSession::new(&GameConfig::default());
    let mut rng = ChaCha8Rng::seed_from_u64(2);
    let ids: Vec<TeamId> = (0..3)
        .map(|i| {
            machine
                .add_team(&mut session, &format!("T{}", i), &RegionId::new(format!("R{:02}", i)), &atlas)
                .unwrap()
        })
        .collect();

    let draw = machine.start(&mut session, &mut rng).unwrap();
    let FireOutcome::OpponentDrawn { acting, opponent } = machine.fire(&mut session, draw.token, &atlas, &mut rng)
    else {
        panic!("opponent should be drawn with three teams");
    };
    let bystander = ids.iter().copied().find(|id| *id != acting && *id != opponent).unwrap();

    assert_eq!(
        machine.declare_winner(&mut session, bystander, &mut rng),
        Err(PreconditionViolation::NotAParticipant(bystander))
    );
    assert_eq!(session.stage(), MatchStage::AwaitingWinner);
    assert_eq!(session.round(), 1);
    assert!(session.history().is_empty());
}

#[test]
fn test_stale_timer_after_clear_is_ignored() {
    let atlas = grid_atlas(4);
    let machine = machine();
    let mut session = GameSession::new(&GameConfig::default());
    let mut rng = ChaCha8Rng::seed_from_u64(3);
    machine.add_team(&mut session, "A", &RegionId::new("R00"), &atlas).unwrap();
    machine.add_team(&mut session, "B", &RegionId::new("R01"), &atlas).unwrap();

    let draw = machine.start(&mut session, &mut rng).unwrap();
    machine.clear(&mut session);

    assert_eq!(machine.fire(&mut session, draw.token, &atlas, &mut rng), FireOutcome::Stale);
    assert_eq!(session.stage(), MatchStage::Idle);
    assert_eq!(session.round(), 1);
    assert!(session.ledger().is_empty());
    assert!(session.pair().is_none());
}

#[test]
fn test_full_game_leaves_one_survivor() {
    let atlas = grid_atlas(12);
    let machine = machine();
    let mut session = GameSession::new(&GameConfig::default());
    let mut rng = ChaCha8Rng::seed_from_u64(2024);
    for i in 0..6 {
        machine
            .add_team(&mut session, &format!("T{}", i), &RegionId::new(format!("R{:02}", i * 2)), &atlas)
            .unwrap();
    }

    let mut scheduled = machine.start(&mut session, &mut rng).unwrap();
    let champion = loop {
        match drive(&machine, &mut session, &atlas, &mut rng, scheduled) {
            FireOutcome::OpponentDrawn { acting, opponent } => {
                let winner = if rng.gen_bool(0.5) { acting } else { opponent };
                scheduled = machine.declare_winner(&mut session, winner, &mut rng).unwrap().next;
            }
            FireOutcome::GameOver { champion } => break champion,
            other => panic!("unexpected outcome {:?}", other),
        }
        assert!(session.round() < 1000, "game should terminate");
    };

    let survivors: Vec<TeamId> = session.ledger().active_teams().map(|t| t.id).collect();
    assert_eq!(survivors.len(), 1);
    assert_eq!(champion, Some(survivors[0]));
    assert_eq!(session.stage(), MatchStage::GameOver);
    assert!(!session.is_active());
    // Regions only change hands, so the survivor holds all six starting homes
    assert_eq!(session.ledger().team(survivors[0]).unwrap().region_count(), 6);
    assert_eq!(session.history().latest().map(|r| r.round), Some(session.round() - 1));
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn prop_rounds_preserve_ownership_rules(seed in any::<u64>()) {
        let atlas = grid_atlas(8);
        let machine = machine();
        let mut session = GameSession::new(&GameConfig::default());
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        for i in 0..5 {
            machine
                .add_team(&mut session, &format!("T{}", i), &RegionId::new(format!("R{:02}", i)), &atlas)
                .unwrap();
        }

        let mut scheduled = machine.start(&mut session, &mut rng).unwrap();
        loop {
            let FireOutcome::OpponentDrawn { acting, opponent } =
                drive(&machine, &mut session, &atlas, &mut rng, scheduled)
            else {
                break;
            };

            let ledger = session.ledger();
            let acting_team = ledger.team(acting).unwrap();
            let opponent_team = ledger.team(opponent).unwrap();
            prop_assert!(!acting_team.eliminated && !opponent_team.eliminated);
            prop_assert_ne!(acting, opponent);

            let winner = if rng.gen_bool(0.5) { acting } else { opponent };
            let loser = if winner == acting { opponent } else { acting };
            let before: Vec<(TeamId, usize, u32)> = ledger
                .teams()
                .iter()
                .map(|t| (t.id, t.region_count(), t.score))
                .collect();

            let resolution = machine.declare_winner(&mut session, winner, &mut rng).unwrap();
            let ledger = session.ledger();
            for (id, regions, score) in before {
                let team = ledger.team(id).unwrap();
                if id == winner {
                    prop_assert_eq!(team.region_count(), regions + 1);
                    prop_assert_eq!(team.score, score + 1);
                } else if id == loser {
                    prop_assert_eq!(team.region_count(), regions - 1);
                    prop_assert_eq!(team.eliminated, team.region_count() == 0);
                } else {
                    prop_assert_eq!(team.region_count(), regions);
                    prop_assert_eq!(team.score, score);
                }
            }
            let moved = resolution.transfer.region.clone().unwrap();
            prop_assert_eq!(ledger.owner_of(&moved), Some(winner));
            prop_assert!(ledger.check_invariants(&atlas).is_ok());
            scheduled = resolution.next;
        }

        prop_assert_eq!(session.ledger().active_count(), 1);
    }
}
