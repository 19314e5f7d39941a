//! Simulation and world tuning parameters.

use std::time::Duration;

/// Every gameplay constant in one place so the binary can override them
/// without touching simulation code. Listening host and port are supplied
/// separately by the command line.
#[derive(Debug, Clone, Copy)]
pub struct GameConfig {
    /// Simulation ticks per second.
    pub tick_hz: u32,
    /// World width in units. The playfield is centered on the origin.
    pub world_width: f32,
    /// World height in units.
    pub world_height: f32,
    /// Food population restored by the replenish phase at the start of
    /// every tick.
    pub food_target: usize,
    /// Collision radius of a food particle.
    pub food_radius: f32,
    /// Mass and experience credited per consumed particle.
    pub food_mass: f32,
    /// Player collision radius at zero mass.
    pub base_radius: f32,
    /// Top speed of a massless player, in units per second.
    pub base_speed: f32,
    /// Exponential velocity smoothing factor, in (0, 1). Higher values mean
    /// more inertia.
    pub drag: f32,
    /// Radius gained per unit of sqrt(mass).
    pub radius_growth_factor: f32,
    /// Speed penalty per unit of sqrt(mass).
    pub mass_slowdown_factor: f32,
}

impl Default for GameConfig {
    fn default() -> Self {
        GameConfig {
            tick_hz: 20,
            world_width: 4000.0,
            world_height: 4000.0,
            food_target: 1200,
            food_radius: 6.0,
            food_mass: 1.0,
            base_radius: 18.0,
            base_speed: 360.0,
            drag: 0.92,
            radius_growth_factor: 1.6,
            mass_slowdown_factor: 0.09,
        }
    }
}

impl GameConfig {
    /// Wall-clock period between ticks.
    pub fn tick_interval(&self) -> Duration {
        Duration::from_secs_f32(1.0 / self.tick_hz as f32)
    }

    /// Fixed integration step. The simulation always advances by exactly
    /// this much per tick, regardless of scheduling jitter.
    pub fn tick_dt(&self) -> f32 {
        1.0 / self.tick_hz as f32
    }
}
