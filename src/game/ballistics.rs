//! Closed-form projectile hit test
//!
//! Launch and landing happen on the same flat ground line, so the vertical
//! equation `y0 = y0 + v0y*t - g*t^2/2` reduces to `t = 2*v0y/g` and no
//! stepping is needed. A sloped ground would need the general quadratic.

use super::constants::Battlefield;

/// Physical constants a shot is resolved against
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ShotParams {
    pub g: f64,
    pub v0: f64,
    pub cannon_width: f64,
    pub cannonball_width: f64,
}

impl ShotParams {
    /// Half-width of the kill zone around a cannon
    pub fn kill_radius(&self) -> f64 {
        self.cannon_width / 2.0 + self.cannonball_width / 2.0
    }
}

impl From<&Battlefield> for ShotParams {
    fn from(field: &Battlefield) -> Self {
        Self {
            g: field.g,
            v0: field.v0,
            cannon_width: field.cannon_width,
            cannonball_width: field.cannonball_width,
        }
    }
}

/// Stateless ballistics calculations
pub struct Ballistics;

impl Ballistics {
    /// Time until the ball returns to ground level.
    ///
    /// Non-positive vertical speed (or a non-positive `g`) means the ball
    /// never leaves the ground, so the flight time is zero.
    pub fn flight_time(g: f64, v0: f64, angle_deg: f64) -> f64 {
        if g <= 0.0 {
            return 0.0;
        }
        let v0y = v0 * angle_deg.to_radians().sin();
        (2.0 * v0y / g).max(0.0)
    }

    /// X coordinate where a ball fired from `x0` lands
    pub fn landing_x(g: f64, v0: f64, x0: f64, angle_deg: f64) -> f64 {
        let v0x = v0 * angle_deg.to_radians().cos();
        x0 + v0x * Self::flight_time(g, v0, angle_deg)
    }

    /// Open-interval kill zone test; touching the edge is a miss
    pub fn in_kill_zone(landing_x: f64, target_x: f64, kill_radius: f64) -> bool {
        target_x - kill_radius < landing_x && landing_x < target_x + kill_radius
    }

    /// Whether a shot at `angle_deg` from `shooter_x` hits the cannon at `target_x`
    pub fn is_hit(params: &ShotParams, shooter_x: f64, target_x: f64, angle_deg: f64) -> bool {
        let landing = Self::landing_x(params.g, params.v0, shooter_x, angle_deg);
        Self::in_kill_zone(landing, target_x, params.kill_radius())
    }
}
