//! Authoritative world state and the fixed-rate simulation step.
//!
//! The `World` is the single shared mutable resource of the server. It is
//! owned exclusively by the game-loop task: connection tasks never touch it
//! directly, they enqueue events that the loop applies between ticks. Within
//! a tick the phases run in a fixed order (replenish food, integrate
//! motion, resolve consumption), so every tick observes a fully consistent
//! player set and food set.

use crate::config::GameConfig;
use crate::physics::{self, Vector2};
use log::info;
use rand::distributions::Alphanumeric;
use rand::Rng;
use shared::{FoodView, PlayerView, ServerMessage, WorldDims};
use std::collections::HashMap;

/// Half-extent of the square region new players spawn in, independent of
/// the full world bounds.
const SPAWN_EXTENT: f32 = 500.0;

/// Mass every player starts with.
const INITIAL_MASS: f32 = 10.0;

/// Length of generated entity ids. 62^12 possible tokens; collisions are
/// treated as effectively impossible rather than detected.
const ID_LEN: usize = 12;

/// A connected player's authoritative record. Mass and experience only ever
/// increase while the record exists; a rejoin starts a brand-new record.
#[derive(Debug, Clone)]
pub struct Player {
    pub id: String,
    pub name: String,
    pub avatar: String,
    pub position: Vector2,
    pub velocity: Vector2,
    pub mass: f32,
    pub xp: f32,
    /// Latest movement intent, each axis in [-1, 1]. Distinct from velocity:
    /// intent is what the client wants, velocity is what the integrator
    /// granted so far.
    pub intent: Vector2,
}

/// A food particle. Immutable once spawned; removal and the mass credit to
/// the consuming player happen in the same step.
#[derive(Debug, Clone)]
pub struct FoodParticle {
    pub id: String,
    pub position: Vector2,
    pub radius: f32,
}

/// The authoritative game state.
#[derive(Debug, Clone)]
pub struct World {
    pub config: GameConfig,
    pub players: HashMap<String, Player>,
    pub food: Vec<FoodParticle>,
    /// Completed simulation steps since startup.
    pub tick: u64,
}

impl World {
    /// Creates a world with the food population already at target, matching
    /// the state a client would observe on the very first snapshot.
    pub fn new(config: GameConfig) -> Self {
        let mut world = World {
            config,
            players: HashMap::new(),
            food: Vec::with_capacity(config.food_target),
            tick: 0,
        };
        world.replenish_food();
        world
    }

    /// Creates a player at a random position inside the central spawn
    /// region and returns its fresh id. Name and avatar are expected to be
    /// sanitized by the caller.
    pub fn spawn_player(&mut self, name: &str, avatar: &str) -> String {
        let id = fresh_id();
        let mut rng = rand::thread_rng();

        let player = Player {
            id: id.clone(),
            name: name.to_string(),
            avatar: avatar.to_string(),
            position: Vector2 {
                x: rng.gen_range(-SPAWN_EXTENT..=SPAWN_EXTENT),
                y: rng.gen_range(-SPAWN_EXTENT..=SPAWN_EXTENT),
            },
            velocity: Vector2::default(),
            mass: INITIAL_MASS,
            xp: 0.0,
            intent: Vector2::default(),
        };

        info!(
            "Player {} ({}) spawned at ({:.0}, {:.0})",
            id, player.name, player.position.x, player.position.y
        );
        self.players.insert(id.clone(), player);
        id
    }

    /// Deletes a player. Safe to call for an id that is already gone.
    pub fn remove_player(&mut self, player_id: &str) {
        if self.players.remove(player_id).is_some() {
            info!("Player {} removed", player_id);
        }
    }

    /// Overwrites a player's movement intent, clamping each axis into
    /// [-1, 1]. Both axes are applied together; an unknown id is a no-op.
    pub fn set_intent(&mut self, player_id: &str, dx: f32, dy: f32) {
        if let Some(player) = self.players.get_mut(player_id) {
            player.intent = Vector2 {
                x: dx.clamp(-1.0, 1.0),
                y: dy.clamp(-1.0, 1.0),
            };
        }
    }

    /// Advances the simulation by one fixed step.
    pub fn step(&mut self, dt: f32) {
        self.replenish_food();
        self.integrate(dt);
        self.resolve_consumption();
        self.tick += 1;
    }

    /// Tops the food population back up to the configured target with
    /// freshly randomized particles.
    fn replenish_food(&mut self) {
        let mut rng = rand::thread_rng();
        let half_w = self.config.world_width / 2.0;
        let half_h = self.config.world_height / 2.0;

        while self.food.len() < self.config.food_target {
            self.food.push(FoodParticle {
                id: fresh_id(),
                position: Vector2 {
                    x: rng.gen_range(-half_w..=half_w),
                    y: rng.gen_range(-half_h..=half_h),
                },
                radius: self.config.food_radius,
            });
        }
    }

    /// Velocity smoothing toward intent, position integration, and boundary
    /// clamping. Players are independent in this phase, so iteration order
    /// does not matter.
    fn integrate(&mut self, dt: f32) {
        let config = self.config;
        let half_w = config.world_width / 2.0;
        let half_h = config.world_height / 2.0;

        for player in self.players.values_mut() {
            let speed = physics::player_speed(player.mass, &config);
            let blend = 1.0 - config.drag;

            player.velocity.x = player.velocity.x * config.drag + player.intent.x * speed * blend;
            player.velocity.y = player.velocity.y * config.drag + player.intent.y * speed * blend;

            // Clamping silently swallows out-of-range motion; no reflection.
            player.position.x = (player.position.x + player.velocity.x * dt).clamp(-half_w, half_w);
            player.position.y = (player.position.y + player.velocity.y * dt).clamp(-half_h, half_h);
        }
    }

    /// Removes every food particle within eating range of a player and
    /// credits its mass. A contended particle goes to the first player in
    /// iteration order; removal is immediate, so it is never counted twice.
    fn resolve_consumption(&mut self) {
        let config = self.config;

        for player in self.players.values_mut() {
            let radius = physics::player_radius(player.mass, &config);

            self.food.retain(|particle| {
                let reach = radius + particle.radius;
                if player.position.distance_squared(&particle.position) <= reach * reach {
                    player.mass += config.food_mass;
                    player.xp += config.food_mass;
                    false
                } else {
                    true
                }
            });
        }
    }

    /// Builds the per-tick snapshot sent to every connection. Velocity and
    /// intent stay out of it.
    pub fn snapshot(&self, t: u64) -> ServerMessage {
        let players = self
            .players
            .values()
            .map(|p| PlayerView {
                id: p.id.clone(),
                name: p.name.clone(),
                avatar: p.avatar.clone(),
                x: p.position.x,
                y: p.position.y,
                mass: p.mass,
                xp: p.xp,
            })
            .collect();

        let foods = self
            .food
            .iter()
            .map(|f| FoodView {
                id: f.id.clone(),
                x: f.position.x,
                y: f.position.y,
                r: f.radius,
            })
            .collect();

        ServerMessage::State {
            t,
            world: WorldDims {
                w: self.config.world_width,
                h: self.config.world_height,
            },
            players,
            foods,
        }
    }
}

/// Generates an opaque entity id: 12 alphanumeric characters from the
/// thread-local RNG.
fn fresh_id() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(ID_LEN)
        .map(char::from)
        .collect()
}
