//! End-to-end trait scenarios played through the turn runner.

use delve::{
    spawn_item, spawn_monster, Action, ActionResult, Attribute, DamageType, DelveResult,
    EventType, GameState, Map, Position, Stat, TileType, Trait, TurnRunner,
};

fn cellar() -> GameState {
    let mut map = Map::new(14, 10, TileType::Wall);
    for y in 1..9 {
        for x in 1..13 {
            map.set_tile(Position::new(x, y), TileType::Floor).unwrap();
        }
    }
    GameState::new(map, 77)
}

fn trait_count(gs: &GameState, id: delve::ObjId, kind: &str) -> usize {
    gs.objects
        .get(id)
        .map(|o| o.traits.count(|t| t.kind() == kind))
        .unwrap_or(0)
}

#[test]
fn test_poison_ticks_then_wears_off() -> DelveResult<()> {
    let mut gs = cellar();
    let player = gs.spawn_player(Position::new(2, 2));
    if let Some(p) = gs.objects.get_mut(player) {
        p.stats.set(Attribute::HP, Stat::new(20));
    }
    gs.apply_trait(Trait::poisoned(0, 2, 3), player)?;

    let mut runner = TurnRunner::new(gs);
    let mut hp = Vec::new();
    for _ in 0..5 {
        runner.step(Some(Action::Pass))?;
        hp.push(runner.state.hp(player));
    }
    assert_eq!(hp, vec![18, 16, 14, 14, 14]);
    assert_eq!(trait_count(&runner.state, player, "Poisoned"), 0);
    assert!(runner.state.events.listeners(EventType::EndOfRound).is_empty());
    Ok(())
}

#[test]
fn test_poison_leaves_a_weak_victim_at_one_hp() -> DelveResult<()> {
    let mut gs = cellar();
    let player = gs.spawn_player(Position::new(2, 2));
    if let Some(p) = gs.objects.get_mut(player) {
        p.stats.set(Attribute::HP, Stat::new(4));
    }
    gs.apply_trait(Trait::poisoned(0, 3, 3), player)?;

    let mut runner = TurnRunner::new(gs);
    let mut hp = Vec::new();
    for _ in 0..4 {
        runner.step(Some(Action::Pass))?;
        hp.push(runner.state.hp(player));
    }
    assert_eq!(hp, vec![1, 1, 1, 1]);
    assert!(!runner.is_over());
    assert_eq!(trait_count(&runner.state, player, "Poisoned"), 0);
    assert!(runner.state.messages.iter().any(|m| m == "You feel better."));
    Ok(())
}

#[test]
fn test_torch_burns_for_its_fuel() -> DelveResult<()> {
    let mut gs = cellar();
    let player = gs.spawn_player(Position::new(2, 2));
    let torch = spawn_item(&mut gs, "torch", Position::new(2, 2))?;
    gs.objects.move_to_inventory(torch, player)?;

    let mut runner = TurnRunner::new(gs);
    assert_eq!(runner.step(Some(Action::UseTorch(torch)))?, ActionResult::Done);
    // the lighting turn already burns one unit
    runner.run(58)?;
    let lit = |gs: &GameState| {
        gs.objects
            .get(torch)
            .and_then(|o| o.traits.find(|t| t.kind() == "Torch").cloned())
    };
    assert!(matches!(lit(&runner.state), Some(Trait::Torch(t)) if t.lit && t.fuel == 1));
    assert_eq!(trait_count(&runner.state, torch, "LightSource"), 1);

    runner.step(Some(Action::Pass))?;
    assert!(matches!(lit(&runner.state), Some(Trait::Torch(t)) if !t.lit && t.fuel == 0));
    assert_eq!(trait_count(&runner.state, torch, "LightSource"), 0);
    assert!(runner
        .state
        .messages
        .iter()
        .any(|m| m == "Your torch burns out."));
    Ok(())
}

#[test]
fn test_ring_grants_until_taken_off() -> DelveResult<()> {
    let mut gs = cellar();
    let player = gs.spawn_player(Position::new(2, 2));
    let ring = spawn_item(&mut gs, "ring of fire warding", Position::new(2, 2))?;
    gs.objects.move_to_inventory(ring, player)?;

    gs.equip(player, ring)?;
    assert!(gs.has_resistance(player, DamageType::Fire));
    let full = gs.damage_after_defences(player, 10, DamageType::Fire);
    assert!(full < 10);

    gs.unequip(player, ring)?;
    assert!(!gs.has_resistance(player, DamageType::Fire));
    assert_eq!(gs.damage_after_defences(player, 10, DamageType::Fire), 10);
    Ok(())
}

#[test]
fn test_zombies_shrug_off_poison() -> DelveResult<()> {
    let mut gs = cellar();
    let zombie = spawn_monster(&mut gs, "zombie", Position::new(6, 5))?;
    let messages = gs.apply_trait(Trait::poisoned(0, 3, 5), zombie)?;
    assert!(messages.is_empty());
    assert_eq!(trait_count(&gs, zombie, "Poisoned"), 0);
    Ok(())
}

#[test]
fn test_rage_wakes_below_half_health() -> DelveResult<()> {
    let mut gs = cellar();
    let berserker = spawn_monster(&mut gs, "berserker", Position::new(6, 5))?;
    let rage = |gs: &GameState| {
        gs.objects
            .get(berserker)
            .and_then(|o| o.traits.find(|t| t.kind() == "Rage").cloned())
    };
    assert!(!rage(&gs).unwrap().is_active(&gs));
    gs.change_hp(berserker, -8);
    assert!(rage(&gs).unwrap().is_active(&gs));
    Ok(())
}
