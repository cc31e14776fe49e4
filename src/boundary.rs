use crate::Vec2;
use std::str::FromStr;
use thiserror::Error;

pub const BOUNDARY_EPSILON: f64 = 0.001;
pub const DEFAULT_WALL_RESTITUTION: f64 = 0.7;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Domain {
    pub width: f64,
    pub height: f64,
}

impl Domain {
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }

    pub fn normalized(self) -> Self {
        let fix = |v: f64| if v.is_finite() && v > 0.0 { v } else { 1.0 };
        Self {
            width: fix(self.width),
            height: fix(self.height),
        }
    }

    pub fn size(&self) -> Vec2 {
        Vec2::new(self.width, self.height)
    }

    pub fn contains(&self, position: Vec2) -> bool {
        position.x >= 0.0
            && position.x <= self.width
            && position.y >= 0.0
            && position.y <= self.height
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BoundaryKind {
    Reflective,
    Periodic,
}

#[derive(Debug, Error)]
#[error("unknown boundary kind `{0}` (expected `reflective` or `periodic`)")]
pub struct ParseBoundaryKindError(String);

impl FromStr for BoundaryKind {
    type Err = ParseBoundaryKindError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "reflective" | "reflect" => Ok(Self::Reflective),
            "periodic" | "wrap" => Ok(Self::Periodic),
            _ => Err(ParseBoundaryKindError(s.to_string())),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BoundaryConfig {
    pub horizontal: BoundaryKind,
    pub vertical: BoundaryKind,
    pub restitution: f64,
    pub jitter: f64,
}

impl Default for BoundaryConfig {
    fn default() -> Self {
        Self::reflective()
    }
}

impl BoundaryConfig {
    pub fn reflective() -> Self {
        Self {
            horizontal: BoundaryKind::Reflective,
            vertical: BoundaryKind::Reflective,
            restitution: DEFAULT_WALL_RESTITUTION,
            jitter: 0.0,
        }
    }

    pub fn periodic() -> Self {
        Self {
            horizontal: BoundaryKind::Periodic,
            vertical: BoundaryKind::Periodic,
            ..Self::reflective()
        }
    }
}

pub fn resolve_axis(
    position: &mut f64,
    velocity: &mut f64,
    limit: f64,
    kind: BoundaryKind,
    restitution: f64,
    jitter: f64,
    noise: f64,
) {
    let inside = *position > 0.0 && *position < limit;
    if inside {
        return;
    }
    match kind {
        BoundaryKind::Reflective => {
            *position = if *position >= limit {
                limit - BOUNDARY_EPSILON
            } else {
                BOUNDARY_EPSILON
            };
            *velocity = -*velocity * restitution + jitter * noise;
        }
        BoundaryKind::Periodic => {
            if *position < 0.0 || *position >= limit {
                let wrapped = position.rem_euclid(limit);
                // rem_euclid can round up to `limit` for tiny negative inputs.
                *position = if wrapped >= limit { 0.0 } else { wrapped };
            }
        }
    }
}

pub fn resolve(
    position: &mut Vec2,
    velocity: &mut Vec2,
    domain: Domain,
    config: BoundaryConfig,
    index: usize,
    step: u64,
) {
    let (nx, ny) = if config.jitter > 0.0 {
        (
            rand_unit(index as u32, step as u32, 0) * 2.0 - 1.0,
            rand_unit(index as u32, step as u32, 1) * 2.0 - 1.0,
        )
    } else {
        (0.0, 0.0)
    };
    resolve_axis(
        &mut position.x,
        &mut velocity.x,
        domain.width,
        config.horizontal,
        config.restitution,
        config.jitter,
        nx,
    );
    resolve_axis(
        &mut position.y,
        &mut velocity.y,
        domain.height,
        config.vertical,
        config.restitution,
        config.jitter,
        ny,
    );
}

fn rand_unit(ix: u32, iy: u32, salt: u32) -> f64 {
    let seed = ix.wrapping_mul(1664525)
        ^ iy.wrapping_mul(1013904223)
        ^ salt.wrapping_mul(2654435761);
    let hashed = mix_u32(seed);
    hashed as f64 / u32::MAX as f64
}

fn mix_u32(mut value: u32) -> u32 {
    value ^= value >> 16;
    value = value.wrapping_mul(0x7feb352d);
    value ^= value >> 15;
    value = value.wrapping_mul(0x846ca68b);
    value ^= value >> 16;
    value
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_close(a: f64, b: f64, tol: f64) {
        assert!(
            (a - b).abs() <= tol,
            "expected {a} to be within {tol} of {b}"
        );
    }

    #[test]
    fn reflective_upper_wall_clamps_and_damps() {
        let mut pos = 100.0 + 0.5;
        let mut vel = 3.0;
        resolve_axis(&mut pos, &mut vel, 100.0, BoundaryKind::Reflective, 0.7, 0.0, 0.0);
        assert!(pos <= 100.0 - BOUNDARY_EPSILON);
        assert_close(vel, -2.1, 1e-12);
    }

    #[test]
    fn reflective_lower_wall_clamps_and_damps() {
        let mut pos = -0.25;
        let mut vel = -2.0;
        resolve_axis(&mut pos, &mut vel, 50.0, BoundaryKind::Reflective, 0.5, 0.0, 0.0);
        assert_eq!(pos, BOUNDARY_EPSILON);
        assert_close(vel, 1.0, 1e-12);
    }

    #[test]
    fn interior_positions_are_untouched() {
        let mut pos = 10.0;
        let mut vel = -4.0;
        resolve_axis(&mut pos, &mut vel, 50.0, BoundaryKind::Reflective, 0.5, 1.0, 1.0);
        assert_eq!((pos, vel), (10.0, -4.0));
    }

    #[test]
    fn periodic_wraps_and_keeps_velocity() {
        let mut pos = 103.0;
        let mut vel = 5.0;
        resolve_axis(&mut pos, &mut vel, 100.0, BoundaryKind::Periodic, 0.7, 0.0, 0.0);
        assert_close(pos, 3.0, 1e-12);
        assert_eq!(vel, 5.0);

        let mut pos = -2.0;
        resolve_axis(&mut pos, &mut vel, 100.0, BoundaryKind::Periodic, 0.7, 0.0, 0.0);
        assert_close(pos, 98.0, 1e-12);
    }

    #[test]
    fn jitter_is_bounded_and_deterministic() {
        let domain = Domain::new(10.0, 10.0);
        let config = BoundaryConfig {
            jitter: 0.05,
            ..BoundaryConfig::reflective()
        };
        for index in 0..200 {
            let mut pos = Vec2::new(10.5, -0.5);
            let mut vel = Vec2::new(2.0, -2.0);
            resolve(&mut pos, &mut vel, domain, config, index, 3);
            assert!(domain.contains(pos));
            assert!((vel.x + 1.4).abs() <= 0.05 + 1e-12);
            assert!((vel.y - 1.4).abs() <= 0.05 + 1e-12);

            let mut pos2 = Vec2::new(10.5, -0.5);
            let mut vel2 = Vec2::new(2.0, -2.0);
            resolve(&mut pos2, &mut vel2, domain, config, index, 3);
            assert_eq!(vel, vel2);
        }
    }

    #[test]
    fn boundary_kind_parses_names() {
        assert_eq!("Reflective".parse::<BoundaryKind>().ok(), Some(BoundaryKind::Reflective));
        assert_eq!(" periodic ".parse::<BoundaryKind>().ok(), Some(BoundaryKind::Periodic));
        assert!("sticky".parse::<BoundaryKind>().is_err());
    }

    #[test]
    fn domain_normalizes_bad_extents() {
        let d = Domain::new(-1.0, f64::NAN).normalized();
        assert_eq!(d, Domain::new(1.0, 1.0));
    }
}
