use crate::boundary::{BoundaryConfig, BoundaryKind, DEFAULT_WALL_RESTITUTION};
use crate::grid::normalize_cell_size;
use crate::parallel::ParallelConfig;
use std::fmt::Display;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value `{value}` for {key}: {reason}")]
    InvalidValue {
        key: &'static str,
        value: String,
        reason: String,
    },
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SimParameters {
    pub interaction_radius: f64,
    pub smoothing_factor: f64,
    pub dampening_factor: f64,
    pub drag_enabled: bool,
    pub attraction_factor: f64,
    pub rest_density: f64,
    pub viscosity: f64,
    pub pressure_multiplier: f64,
    pub gravity: f64,
    pub dt: f64,
    pub mouse_force: f64,
    pub mouse_force_radius: f64,
    pub horizontal_boundary: BoundaryKind,
    pub vertical_boundary: BoundaryKind,
    pub wall_restitution: f64,
    pub boundary_jitter: f64,
    pub parallel: ParallelConfig,
}

impl Default for SimParameters {
    fn default() -> Self {
        Self {
            interaction_radius: 10.0,
            smoothing_factor: 0.10,
            dampening_factor: 0.2,
            drag_enabled: true,
            attraction_factor: -50_000.0,
            rest_density: 1000.0,
            viscosity: 0.8,
            pressure_multiplier: 10.0,
            gravity: 0.0,
            dt: 0.0008,
            mouse_force: 1000.0,
            mouse_force_radius: 100.0,
            horizontal_boundary: BoundaryKind::Reflective,
            vertical_boundary: BoundaryKind::Reflective,
            wall_restitution: DEFAULT_WALL_RESTITUTION,
            boundary_jitter: 0.0,
            parallel: ParallelConfig::default(),
        }
    }
}

fn env_override<T>(key: &'static str, target: &mut T) -> Result<(), ConfigError>
where
    T: FromStr,
    T::Err: Display,
{
    let Ok(raw) = std::env::var(key) else {
        return Ok(());
    };
    match raw.trim().parse::<T>() {
        Ok(value) => {
            *target = value;
            Ok(())
        }
        Err(err) => Err(ConfigError::InvalidValue {
            key,
            value: raw,
            reason: err.to_string(),
        }),
    }
}

impl SimParameters {
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut params = Self::default();
        params.apply_env()?;
        Ok(params)
    }

    pub fn apply_env(&mut self) -> Result<(), ConfigError> {
        env_override("SPH_INTERACTION_RADIUS", &mut self.interaction_radius)?;
        env_override("SPH_SMOOTHING_FACTOR", &mut self.smoothing_factor)?;
        env_override("SPH_DRAG", &mut self.dampening_factor)?;
        env_override("SPH_DRAG_ENABLED", &mut self.drag_enabled)?;
        env_override("SPH_ATTRACTION", &mut self.attraction_factor)?;
        env_override("SPH_REST_DENSITY", &mut self.rest_density)?;
        env_override("SPH_VISCOSITY", &mut self.viscosity)?;
        env_override("SPH_PRESSURE", &mut self.pressure_multiplier)?;
        env_override("SPH_GRAVITY", &mut self.gravity)?;
        env_override("SPH_DT", &mut self.dt)?;
        env_override("SPH_MOUSE_FORCE", &mut self.mouse_force)?;
        env_override("SPH_MOUSE_RADIUS", &mut self.mouse_force_radius)?;
        env_override("SPH_BOUNDARY_X", &mut self.horizontal_boundary)?;
        env_override("SPH_BOUNDARY_Y", &mut self.vertical_boundary)?;
        env_override("SPH_RESTITUTION", &mut self.wall_restitution)?;
        env_override("SPH_JITTER", &mut self.boundary_jitter)?;
        env_override("SPH_WORKERS", &mut self.parallel.num_workers)?;
        env_override("SPH_MIN_BATCH", &mut self.parallel.min_batch_size)?;
        Ok(())
    }

    pub fn normalized(mut self) -> Self {
        let radius = normalize_cell_size(self.interaction_radius);
        if radius != self.interaction_radius {
            log::warn!(
                "interaction radius {} is unusable, using {radius}",
                self.interaction_radius
            );
            self.interaction_radius = radius;
        }
        if !self.smoothing_factor.is_finite() || self.smoothing_factor < 0.0 {
            log::warn!("smoothing factor {} reset to 0", self.smoothing_factor);
            self.smoothing_factor = 0.0;
        }
        if !self.boundary_jitter.is_finite() || self.boundary_jitter < 0.0 {
            self.boundary_jitter = 0.0;
        }
        self.parallel = self.parallel.normalized();
        self
    }

    pub fn boundary(&self) -> BoundaryConfig {
        BoundaryConfig {
            horizontal: self.horizontal_boundary,
            vertical: self.vertical_boundary,
            restitution: self.wall_restitution,
            jitter: self.boundary_jitter,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_reference_tuning() {
        let p = SimParameters::default();
        assert_eq!(p.interaction_radius, 10.0);
        assert_eq!(p.smoothing_factor, 0.10);
        assert_eq!(p.attraction_factor, -50_000.0);
        assert_eq!(p.rest_density, 1000.0);
        assert_eq!(p.dt, 0.0008);
        assert!(p.drag_enabled);
        assert_eq!(p.boundary(), BoundaryConfig::reflective());
    }

    #[test]
    fn normalized_repairs_bad_values() {
        let p = SimParameters {
            interaction_radius: -3.0,
            smoothing_factor: f64::NAN,
            boundary_jitter: -1.0,
            parallel: ParallelConfig {
                num_workers: 0,
                min_batch_size: 0,
            },
            ..SimParameters::default()
        }
        .normalized();
        assert!(p.interaction_radius > 0.0);
        assert_eq!(p.smoothing_factor, 0.0);
        assert_eq!(p.boundary_jitter, 0.0);
        assert!(p.parallel.num_workers >= 1);
        assert_eq!(p.parallel.min_batch_size, 1);
    }

    // Environment variables are process-global; keep every env-touching
    // assertion in this one test.
    #[test]
    fn env_overrides_apply_and_report_bad_values() {
        std::env::set_var("SPH_GRAVITY", "-9.81");
        std::env::set_var("SPH_BOUNDARY_X", "periodic");
        let p = SimParameters::from_env().expect("valid overrides");
        assert_eq!(p.gravity, -9.81);
        assert_eq!(p.horizontal_boundary, BoundaryKind::Periodic);
        assert_eq!(p.vertical_boundary, BoundaryKind::Reflective);

        std::env::set_var("SPH_DT", "fast");
        let err = SimParameters::from_env().unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("SPH_DT"));
        assert!(msg.contains("fast"));

        std::env::remove_var("SPH_GRAVITY");
        std::env::remove_var("SPH_BOUNDARY_X");
        std::env::remove_var("SPH_DT");
    }
}
