use crate::config::GameConfig;

///Represents a vector in 2D space.
#[derive(Debug, Clone, Copy, Default)]
pub struct Vector2 {
    ///Value along the x-axis.
    /// Positive direction is to the right.
    pub x: f32,
    ///Value along the y-axis.
    /// Positive direction is up.
    pub y: f32,
}

impl Vector2 {
    ///Returns the squared distance to another point.
    pub fn distance_squared(&self, other: &Vector2) -> f32 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        dx * dx + dy * dy
    }
}

/// Collision radius of a player with the given mass. Sub-linear growth, so
/// a single food pickup never causes a visible jump in size.
pub fn player_radius(mass: f32, config: &GameConfig) -> f32 {
    config.base_radius + mass.sqrt() * config.radius_growth_factor
}

/// Top speed of a player with the given mass. Strictly decreasing in mass,
/// which keeps runaway growth from becoming unstoppable.
pub fn player_speed(mass: f32, config: &GameConfig) -> f32 {
    config.base_speed / (1.0 + mass.sqrt() * config.mass_slowdown_factor)
}
