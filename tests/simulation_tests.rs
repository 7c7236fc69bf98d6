//! Whole-level simulations: generated maps, populated with monsters and
//! loot, played through the turn runner.

use delve::generation::utils::{create_rng, place_stairs};
use delve::{
    spawn_companion, spawn_item, Action, Attribute, DungeonGenerator, EncounterGenerator,
    GameState, GenerationConfig, Generator, ItemGenerator, Stat, TurnRunner,
};

fn populated_level(seed: u64) -> TurnRunner {
    let config = GenerationConfig::for_testing(seed);
    let mut rng = create_rng(&config);
    let mut map = DungeonGenerator::default().generate(&config, &mut rng).unwrap();
    let (up, _) = place_stairs(&mut map, &mut rng).unwrap();

    let mut gs = GameState::new(map, seed);
    let player = gs.spawn_player(up);
    if let Some(p) = gs.objects.get_mut(player) {
        p.stats.set(Attribute::HP, Stat::new(10_000));
    }
    EncounterGenerator::new(config.clone())
        .populate(&mut gs, &mut rng)
        .unwrap();
    ItemGenerator::new(config).scatter_items(&mut gs, &mut rng).unwrap();
    TurnRunner::new(gs)
}

fn monster_count(gs: &GameState) -> u64 {
    gs.objects
        .actor_ids()
        .into_iter()
        .filter(|&id| !gs.is_player(id))
        .count() as u64
}

#[test]
fn test_every_actor_acts_exactly_once_per_turn() {
    for seed in [1, 2, 3] {
        let mut runner = populated_level(seed);
        assert!(monster_count(&runner.state) > 0);
        for _ in 0..40 {
            let monsters = monster_count(&runner.state);
            let before = runner.state.actions_taken;
            runner.step(Some(Action::Pass)).unwrap();
            assert_eq!(runner.state.actions_taken - before, monsters + 1);
        }
        assert_eq!(runner.state.turn, 40);
    }
}

#[test]
fn test_node_budget_holds_on_a_busy_level() {
    let mut runner = populated_level(9);
    for _ in 0..25 {
        runner.step(Some(Action::Pass)).unwrap();
        assert!(runner.state.node_evaluations <= delve::config::MAX_NODE_EVALUATIONS);
    }
}

#[test]
fn test_watchdog_brings_loot_home() {
    let mut runner = populated_level(4);
    let gs = &mut runner.state;
    let player = gs.player_id.unwrap();
    let home = gs.position_of(player).unwrap();
    let spot = gs
        .map
        .positions_where(|t| t.is_passable())
        .into_iter()
        .find(|&p| {
            p.is_adjacent(home)
                && gs.objects.occupant_at(p).is_none()
                && gs.objects.items_at(p).is_empty()
        });
    let Some(spot) = spot else {
        return;
    };
    let dog = spawn_companion(gs, "guard dog", spot, player).unwrap();
    let bone = spawn_item(gs, "rock", spot).unwrap();

    for _ in 0..12 {
        runner.step(Some(Action::Pass)).unwrap();
        if runner.state.objects.get(bone).and_then(|o| o.holder) == Some(player) {
            break;
        }
    }
    let holder = runner.state.objects.get(bone).and_then(|o| o.holder);
    assert!(
        holder == Some(player) || holder == Some(dog),
        "the dog never picked the rock up"
    );
}
