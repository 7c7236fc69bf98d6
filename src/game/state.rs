//! # Game State Module
//!
//! The single mutable world aggregate shared by actions, traits and the
//! planner.
//!
//! [`GameState`] owns the current map, the object directory, the event bus,
//! the turn counter, the session RNG and the player's message log. The trait
//! lifecycle (`apply_trait`, `end_of_round`, ...) is implemented on it in
//! [`crate::traits::lifecycle`].

use crate::config::{BLIND_VISION_RADIUS, CLOCK_START_MINUTE, DEFAULT_PLAYER_HEALTH, DEFAULT_VISION_RADIUS};
use crate::{
    calc_visible, has_line_of_sight, AilmentKind, Attitude, Attribute, DamageType, DelveError,
    DelveResult, DijkstraMap, EventBus, GameObject, Map, MoveClass, ObjId, ObjectDb, Position,
    Tag, Trait, TravelCosts,
};
use log::{debug, info};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::collections::{HashMap, HashSet};

/// Central game state.
#[derive(Debug, Clone)]
pub struct GameState {
    pub map: Map,
    pub objects: ObjectDb,
    pub events: EventBus,
    /// Current game turn, advanced by the end-of-round phase
    pub turn: u64,
    pub player_id: Option<ObjId>,
    pub rng: StdRng,
    /// Narrative messages shown to the player, oldest first
    pub messages: Vec<String>,
    /// Named groups of cells, such as a village market
    pub areas: HashMap<String, Vec<Position>>,
    /// Cells the player saw at the last visibility refresh
    pub visible: HashSet<Position>,
    /// Number of actions executed so far
    pub actions_taken: u64,
    /// Value of `actions_taken` when the current monster turn began
    pub action_mark: u64,
    /// Behaviour nodes evaluated during the current monster turn
    pub node_evaluations: u32,
    escape_maps: HashMap<MoveClass, (Position, u64, DijkstraMap)>,
}

impl GameState {
    /// Creates a game state around a map.
    ///
    /// # Examples
    ///
    /// ```
    /// use delve::{GameState, Map, TileType};
    ///
    /// let gs = GameState::new(Map::new(10, 10, TileType::Floor), 7);
    /// assert_eq!(gs.turn, 0);
    /// assert!(gs.player_id.is_none());
    /// ```
    pub fn new(map: Map, seed: u64) -> Self {
        Self {
            map,
            objects: ObjectDb::new(),
            events: EventBus::new(),
            turn: 0,
            player_id: None,
            rng: StdRng::seed_from_u64(seed),
            messages: Vec::new(),
            areas: HashMap::new(),
            visible: HashSet::new(),
            actions_taken: 0,
            action_mark: 0,
            node_evaluations: 0,
            escape_maps: HashMap::new(),
        }
    }

    /// Adds an object to the game, binding its traits to it.
    ///
    /// Each carried trait goes through the regular attach path, so entry
    /// effects run here and the matching exit effects undo them later.
    pub fn spawn(&mut self, obj: GameObject) -> ObjId {
        let id = self.objects.add(obj);
        let Some(obj) = self.objects.get_mut(id) else {
            return id;
        };
        let pending = std::mem::take(&mut obj.traits).take_where(|_| true);
        for entry in pending {
            self.bind_trait(entry.value, id, true);
        }
        debug!("Spawned object {}", id);
        id
    }

    /// Creates the player at a position.
    pub fn spawn_player(&mut self, position: Position) -> ObjId {
        let player = GameObject::actor("player", '@', position, DEFAULT_PLAYER_HEALTH)
            .with_attitude(Attitude::Friendly)
            .with_trait(Trait::tag(Tag::Intelligent));
        let id = self.spawn(player);
        self.player_id = Some(id);
        self.refresh_visibility();
        id
    }

    pub fn is_player(&self, id: ObjId) -> bool {
        self.player_id == Some(id)
    }

    pub fn player(&self) -> Option<&GameObject> {
        self.player_id.and_then(|id| self.objects.get(id))
    }

    pub fn player_position(&self) -> Option<Position> {
        self.player().map(|p| p.position)
    }

    fn object(&self, id: ObjId) -> DelveResult<&GameObject> {
        self.objects
            .get(id)
            .ok_or_else(|| DelveError::InvalidState(format!("No object with id {}", id)))
    }

    pub fn position_of(&self, id: ObjId) -> Option<Position> {
        self.objects.get(id).map(|o| o.position)
    }

    /// Adds a message to the player's log.
    pub fn alert_player(&mut self, text: impl Into<String>) {
        let text = text.into();
        debug!("Message: {}", text);
        self.messages.push(text);
    }

    /// Starts a fresh monster turn for action and node accounting.
    pub fn begin_turn(&mut self) {
        self.action_mark = self.actions_taken;
        self.node_evaluations = 0;
    }

    /// Whether an action was already issued since [`Self::begin_turn`].
    pub fn has_acted_this_turn(&self) -> bool {
        self.actions_taken > self.action_mark
    }

    /// Minutes since midnight on the game clock; one turn is one minute.
    pub fn clock_minutes(&self) -> u64 {
        (CLOCK_START_MINUTE + self.turn) % (24 * 60)
    }

    pub fn hour(&self) -> u32 {
        (self.clock_minutes() / 60) as u32
    }

    /// Name as the player perceives it, honouring disguises.
    pub fn display_name(&self, id: ObjId) -> String {
        match self.objects.get(id) {
            Some(obj) => match obj.traits.find(|t| matches!(t, Trait::Disguise(_))) {
                Some(Trait::Disguise(d)) => d.name.clone(),
                _ => obj.name.clone(),
            },
            None => "something".to_string(),
        }
    }

    /// Picks the player-facing wording for something happening to `id`.
    ///
    /// Returns `None` when the player is neither the subject nor able to see
    /// it.
    pub fn narrate<F>(&self, id: ObjId, you: &str, other: F) -> Option<String>
    where
        F: FnOnce(&str) -> String,
    {
        if self.is_player(id) {
            return Some(you.to_string());
        }
        let pos = self.position_of(id)?;
        if self.visible.contains(&pos) {
            Some(other(&self.display_name(id)))
        } else {
            None
        }
    }

    /// Sends a narrated message to the log when the player would notice it.
    pub fn narrate_to_player<F>(&mut self, id: ObjId, you: &str, other: F)
    where
        F: FnOnce(&str) -> String,
    {
        if let Some(text) = self.narrate(id, you, other) {
            self.alert_player(text);
        }
    }

    pub fn has_tag(&self, id: ObjId, tag: Tag) -> bool {
        self.objects
            .get(id)
            .map(|o| o.has_tag(tag))
            .unwrap_or(false)
    }

    /// Whether an actor suffers from an ailment right now.
    pub fn has_ailment(&self, id: ObjId, kind: AilmentKind) -> bool {
        self.objects
            .get(id)
            .map(|o| {
                o.traits
                    .iter()
                    .any(|t| matches!(t, Trait::Ailment(a) if a.kind == kind))
            })
            .unwrap_or(false)
    }

    pub fn has_immunity(&self, id: ObjId, damage_type: DamageType) -> bool {
        self.objects
            .get(id)
            .map(|o| {
                o.traits.iter().any(|t| match t {
                    Trait::Immunity(w) => w.damage_type == damage_type && t.is_active(self),
                    _ => false,
                })
            })
            .unwrap_or(false)
    }

    pub fn has_resistance(&self, id: ObjId, damage_type: DamageType) -> bool {
        self.objects
            .get(id)
            .map(|o| {
                o.traits.iter().any(|t| match t {
                    Trait::Resistance(w) => w.damage_type == damage_type && t.is_active(self),
                    _ => false,
                })
            })
            .unwrap_or(false)
    }

    /// Damage left after immunities and resistances.
    pub fn damage_after_defences(&self, id: ObjId, amount: i32, damage_type: DamageType) -> i32 {
        if self.has_immunity(id, damage_type) {
            return 0;
        }
        let mut amount = amount;
        if damage_type == DamageType::Fire && self.has_tag(id, Tag::Flammable) {
            amount *= 2;
        }
        if self.has_resistance(id, damage_type) {
            amount /= 2;
        }
        amount.max(0)
    }

    pub fn hp(&self, id: ObjId) -> i32 {
        self.objects.get(id).map(|o| o.hp()).unwrap_or(0)
    }

    /// Adjusts hit points, capped at the maximum. Does not handle death.
    pub fn change_hp(&mut self, id: ObjId, delta: i32) -> i32 {
        self.objects
            .get_mut(id)
            .map(|o| o.stats.change_curr(Attribute::HP, delta))
            .unwrap_or(0)
    }

    /// Deals typed damage and kills the target if it drops to zero.
    ///
    /// Returns the damage actually dealt.
    pub fn deal_damage(&mut self, id: ObjId, amount: i32, damage_type: DamageType) -> i32 {
        if !self.objects.contains(id) {
            return 0;
        }
        let dealt = self.damage_after_defences(id, amount, damage_type);
        if dealt == 0 {
            return 0;
        }
        let remaining = self.change_hp(id, -dealt);
        if remaining <= 0 {
            self.kill(id);
        }
        dealt
    }

    /// Kills an object: its death listeners fire, it drops what it carries,
    /// all its listeners go away and it leaves the directory.
    pub fn kill(&mut self, id: ObjId) {
        if !self.objects.contains(id) {
            return;
        }
        if self.is_player(id) {
            self.alert_player("You die...");
        } else {
            self.narrate_to_player(id, "", |name| format!("The {} dies.", name));
        }
        info!("Object {} ({}) died on turn {}", id, self.display_name(id), self.turn);
        self.dispatch_death(id);
        self.remove_from_game(id);
    }

    /// Takes an object out of the game without a death.
    pub fn vanish(&mut self, id: ObjId) {
        if self.objects.contains(id) {
            debug!("Object {} vanished", id);
            self.remove_from_game(id);
        }
    }

    fn remove_from_game(&mut self, id: ObjId) {
        let Some(obj) = self.objects.get(id) else {
            return;
        };
        let position = obj.position;
        let carried = obj.inventory.clone();
        for item in carried {
            self.unequip_silently(id, item);
            if let Err(err) = self.objects.drop_to_floor(item, position) {
                debug!("Could not drop item {}: {}", item, err);
            }
        }
        self.events.unregister_owner(id);
        self.objects.remove(id);
    }

    /// Vision radius of an actor, counting blindness and carried light.
    pub fn vision_radius(&self, id: ObjId) -> i32 {
        if self.has_ailment(id, AilmentKind::Blind) {
            return BLIND_VISION_RADIUS;
        }
        let Some(obj) = self.objects.get(id) else {
            return 0;
        };
        let own = obj.traits.iter();
        let carried = obj
            .inventory
            .iter()
            .filter_map(|&i| self.objects.get(i))
            .flat_map(|item| item.traits.iter());
        own.chain(carried)
            .filter_map(|t| match t {
                Trait::LightSource(l) => Some(l.radius),
                _ => None,
            })
            .fold(DEFAULT_VISION_RADIUS, i32::max)
    }

    /// Recomputes the player's visible cells.
    pub fn refresh_visibility(&mut self) {
        self.visible = match self.player_id {
            Some(id) => match self.position_of(id) {
                Some(pos) => calc_visible(self.vision_radius(id), pos, &self.map),
                None => HashSet::new(),
            },
            None => HashSet::new(),
        };
    }

    /// Whether an actor can see a cell.
    pub fn can_see(&self, id: ObjId, target: Position) -> bool {
        let Some(pos) = self.position_of(id) else {
            return false;
        };
        pos.euclidean_distance(target) <= self.vision_radius(id) as f64 + 0.5
            && has_line_of_sight(&self.map, pos, target)
    }

    pub fn travel_costs(&self, id: ObjId) -> TravelCosts {
        self.objects
            .get(id)
            .map(TravelCosts::for_object)
            .unwrap_or_else(TravelCosts::walker)
    }

    /// Distance field from the player for a movement class, cached per turn.
    pub fn escape_map(&mut self, class: MoveClass) -> Option<&DijkstraMap> {
        let origin = self.player_position()?;
        let fresh = matches!(
            self.escape_maps.get(&class),
            Some((pos, turn, _)) if *pos == origin && *turn == self.turn
        );
        if !fresh {
            let field = DijkstraMap::new(&self.map, origin, &TravelCosts::for_class(class));
            self.escape_maps.insert(class, (origin, self.turn, field));
        }
        self.escape_maps.get(&class).map(|(_, _, field)| field)
    }

    /// The escape field last computed for a movement class, without
    /// refreshing it.
    pub fn cached_escape_map(&self, class: MoveClass) -> Option<&DijkstraMap> {
        self.escape_maps.get(&class).map(|(_, _, field)| field)
    }

    /// Saving throw: d20 plus the attribute modifier against a difficulty.
    pub fn saving_throw(&mut self, id: ObjId, dc: i32, attr: Attribute) -> bool {
        use rand::Rng;
        let modifier = self.object(id).map(|o| o.stats.modifier(attr)).unwrap_or(0);
        let roll = self.rng.gen_range(1..=20) + modifier;
        debug!("Object {} rolls {} against DC {} ({})", id, roll, dc, attr);
        roll >= dc
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ItemCategory, TileType, WardTrait};

    fn floor_state() -> GameState {
        let mut map = Map::new(12, 12, TileType::Wall);
        for y in 1..11 {
            for x in 1..11 {
                map.set_tile(Position::new(x, y), TileType::Floor).unwrap();
            }
        }
        GameState::new(map, 42)
    }

    #[test]
    fn test_clock() {
        let mut gs = floor_state();
        assert_eq!(gs.hour(), 9);
        gs.turn = 15 * 60;
        assert_eq!(gs.hour(), 0);
    }

    #[test]
    fn test_spawn_binds_traits() {
        let mut gs = floor_state();
        let rat = GameObject::actor("rat", 'r', Position::new(2, 2), 4)
            .with_trait(Trait::poisoned(0, 1, 3));
        let id = gs.spawn(rat);
        let obj = gs.objects.get(id).unwrap();
        assert_eq!(obj.traits.iter().next().unwrap().owner(), Some(id));
        assert!(obj.traits.entries()[0].listener.is_some());
        assert_eq!(gs.events.len(), 1);
    }

    #[test]
    fn test_damage_defences() {
        let mut gs = floor_state();
        let id = gs.spawn(
            GameObject::actor("golem", 'g', Position::new(3, 3), 20)
                .with_trait(Trait::Resistance(WardTrait::permanent(DamageType::Fire)))
                .with_trait(Trait::Immunity(WardTrait::permanent(DamageType::Poison))),
        );
        assert_eq!(gs.deal_damage(id, 7, DamageType::Fire), 3);
        assert_eq!(gs.deal_damage(id, 7, DamageType::Poison), 0);
        assert_eq!(gs.deal_damage(id, 7, DamageType::Blunt), 7);
        assert_eq!(gs.hp(id), 10);
    }

    #[test]
    fn test_kill_drops_inventory_and_listeners() {
        let mut gs = floor_state();
        let orc = gs.spawn(
            GameObject::actor("orc", 'o', Position::new(4, 4), 5)
                .with_trait(Trait::poisoned(0, 1, 10)),
        );
        let coin = gs.spawn(GameObject::item(
            "coin",
            '$',
            ItemCategory::Valuable,
            Position::new(4, 4),
        ));
        gs.objects.move_to_inventory(coin, orc).unwrap();
        assert_eq!(gs.events.len(), 1);

        gs.deal_damage(orc, 9, DamageType::Slashing);
        assert!(!gs.objects.contains(orc));
        assert!(gs.events.is_empty());
        assert_eq!(gs.objects.items_at(Position::new(4, 4)), vec![coin]);
    }

    #[test]
    fn test_visibility_and_narration() {
        let mut gs = floor_state();
        let player = gs.spawn_player(Position::new(2, 2));
        let bat = gs.spawn(GameObject::actor("bat", 'b', Position::new(4, 2), 2));
        gs.refresh_visibility();
        assert!(gs.can_see(player, Position::new(4, 2)));
        assert_eq!(
            gs.narrate(bat, "You flap.", |n| format!("The {} flaps.", n)),
            Some("The bat flaps.".to_string())
        );
        assert_eq!(
            gs.narrate(player, "You flap.", |n| format!("The {} flaps.", n)),
            Some("You flap.".to_string())
        );
    }

    #[test]
    fn test_escape_map_is_cached_per_turn() {
        let mut gs = floor_state();
        gs.spawn_player(Position::new(2, 2));
        let first = gs.escape_map(MoveClass::Walker).unwrap().len();
        assert!(first > 50);
        gs.turn += 1;
        assert_eq!(gs.escape_map(MoveClass::Walker).unwrap().len(), first);
    }
}
