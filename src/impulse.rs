use crate::grid::{CellKey, SpatialGrid};
use crate::{Particle, Vec2};

pub const IMPULSE_MIN_DIST_SQ: f64 = 1e-6;

/// `slack` must bound how far any particle moved since the grid was rebuilt.
pub fn apply_impulse(
    particles: &mut [Particle],
    grid: &SpatialGrid,
    center: Vec2,
    strength: f64,
    radius: f64,
    slack: f64,
) -> usize {
    if !radius.is_finite() || radius <= 0.0 || !strength.is_finite() || !center.is_finite() {
        return 0;
    }
    let slack = if slack.is_finite() { slack.max(0.0) } else { f64::MAX };
    let (cx, cy) = grid.cell_coords(center);
    let reach = ((radius + slack) / grid.cell_size())
        .ceil()
        .min(i32::MAX as f64) as i64
        + 1;
    let in_reach = |key: CellKey| {
        let (x, y) = key.coords();
        (x as i64 - cx as i64).abs() <= reach && (y as i64 - cy as i64).abs() <= reach
    };
    let radius_sq = radius * radius;
    let mut touched = 0;
    for &key in grid.occupied().iter().filter(|&&key| in_reach(key)) {
        for &i in grid.cell(key) {
            let Some(p) = particles.get_mut(i) else {
                continue;
            };
            let delta = p.position - center;
            let dist_sq = delta.length_squared();
            if dist_sq > radius_sq || dist_sq < IMPULSE_MIN_DIST_SQ {
                continue;
            }
            let dist = dist_sq.sqrt();
            let falloff = 1.0 - dist / radius;
            p.velocity += delta * (falloff * strength / dist);
            touched += 1;
        }
    }
    touched
}
