//! # Turn Runner
//!
//! Drives one game turn: the player acts, every monster runs its plan, then
//! the end-of-round phase ticks the traits and advances the clock.

use crate::{Action, ActionResult, DelveResult, GameState, Planner};
use log::{debug, info};

/// Game state plus the planner that moves its monsters.
#[derive(Debug)]
pub struct TurnRunner {
    pub state: GameState,
    pub planner: Planner,
}

impl TurnRunner {
    pub fn new(state: GameState) -> Self {
        Self {
            state,
            planner: Planner::new(),
        }
    }

    /// True once the player has died.
    pub fn is_over(&self) -> bool {
        self.state
            .player_id
            .map(|id| !self.state.objects.contains(id))
            .unwrap_or(false)
    }

    /// Plays one turn.
    ///
    /// The player's action, when given, goes first. Monsters follow in id
    /// order; one that dies during the turn is skipped. Returns the player's
    /// result, `Done` when there is no player action.
    pub fn step(&mut self, player_action: Option<Action>) -> DelveResult<ActionResult> {
        self.state.refresh_visibility();

        let mut result = ActionResult::Done;
        if let (Some(player), Some(action)) = (self.state.player_id, player_action) {
            if self.state.objects.contains(player) {
                result = self.state.execute(player, action)?;
            }
        }

        for id in self.state.objects.actor_ids() {
            if self.state.is_player(id) || !self.state.objects.contains(id) {
                continue;
            }
            self.planner.take_turn(id, &mut self.state);
            if self.is_over() {
                info!("The player died on turn {}", self.state.turn);
                break;
            }
        }

        self.state.end_of_round();
        let live = &self.state.objects;
        let pruned = self.planner.retain(|id| live.contains(id));
        if pruned > 0 {
            debug!("Pruned {} plans of departed monsters", pruned);
        }
        Ok(result)
    }

    /// Plays several turns with the player passing, stopping at death.
    pub fn run(&mut self, turns: u64) -> DelveResult<u64> {
        let mut played = 0;
        while played < turns && !self.is_over() {
            self.step(Some(Action::Pass))?;
            played += 1;
        }
        Ok(played)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Attitude, GameObject, Map, Position, TileType};

    fn runner() -> TurnRunner {
        let mut map = Map::new(12, 8, TileType::Wall);
        for y in 1..7 {
            for x in 1..11 {
                map.set_tile(Position::new(x, y), TileType::Floor).unwrap();
            }
        }
        TurnRunner::new(GameState::new(map, 5))
    }

    #[test]
    fn test_turn_advances_and_counts_actions() {
        let mut runner = runner();
        runner.state.spawn_player(Position::new(2, 2));
        for i in 0..3 {
            runner.state.spawn(
                GameObject::actor("newt", ':', Position::new(6 + i, 5), 3).with_plan("basic"),
            );
        }
        runner.step(Some(Action::Pass)).unwrap();
        assert_eq!(runner.state.turn, 1);
        assert_eq!(runner.state.actions_taken, 4);
    }

    #[test]
    fn test_monsters_close_in() {
        let mut runner = runner();
        runner.state.spawn_player(Position::new(2, 2));
        let wolf = runner.state.spawn(
            GameObject::actor("wolf", 'w', Position::new(9, 5), 12)
                .with_attitude(Attitude::Aggressive)
                .with_plan("basic"),
        );
        let start = runner.state.position_of(wolf).unwrap().chebyshev_distance(Position::new(2, 2));
        runner.run(3).unwrap();
        let now = runner.state.position_of(wolf).unwrap().chebyshev_distance(Position::new(2, 2));
        assert!(now < start);
    }
}
