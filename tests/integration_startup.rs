//! Integration test to ensure a game can be set up on every kind of level.

use delve::generation::utils::{create_rng, place_stairs};
use delve::{
    draw_river, Action, DelveResult, DungeonGenerator, GameState, GenerationConfig, Generator,
    Map, TileType, TowerGenerator, TurnRunner, UnderwaterCaveGenerator,
};

fn start_on(mut map: Map, config: &GenerationConfig) -> DelveResult<TurnRunner> {
    let mut rng = create_rng(config);
    let entry = match map.positions_where(|t| t == TileType::UpStairs).first() {
        Some(&p) => p,
        None => place_stairs(&mut map, &mut rng)?.0,
    };
    let mut gs = GameState::new(map, config.seed);
    gs.spawn_player(entry);
    Ok(TurnRunner::new(gs))
}

#[test]
fn test_basic_startup() -> DelveResult<()> {
    let config = GenerationConfig::for_testing(12345);
    let mut rng = create_rng(&config);
    let map = DungeonGenerator::default().generate(&config, &mut rng)?;

    let mut runner = start_on(map, &config)?;
    let player = runner.state.player_id.expect("player spawned");
    assert_eq!(runner.state.turn, 0);
    assert!(runner.state.objects.contains(player));
    let pos = runner.state.position_of(player).expect("player placed");
    assert_eq!(runner.state.map.get_tile(pos), Some(TileType::UpStairs));

    runner.step(Some(Action::Pass))?;
    assert_eq!(runner.state.turn, 1);
    assert!(!runner.is_over());
    Ok(())
}

#[test]
fn test_startup_on_every_level_kind() -> DelveResult<()> {
    let config = GenerationConfig::for_testing(777);
    let mut rng = create_rng(&config);

    let mut river = DungeonGenerator::default().generate(&config, &mut rng)?;
    draw_river(&mut river, &mut rng, &config)?;
    let tower = TowerGenerator::default().generate(&config, &mut rng)?;
    let caves = UnderwaterCaveGenerator::default().generate(&config, &mut rng)?;

    for map in [river, tower].into_iter().chain(caves) {
        let mut runner = start_on(map, &config)?;
        assert_eq!(runner.run(3)?, 3);
        assert!(runner.state.player().is_some());
    }
    Ok(())
}
