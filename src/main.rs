use anyhow::{Context, Result};
use sph2d::{Domain, FluidSim, InitialCondition, SimParameters};

const DEFAULT_PARTICLES: usize = 2000;
const DEFAULT_STEPS: u64 = 600;
const REPORT_EVERY: u64 = 100;

fn env_or<T>(key: &str, default: T) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match std::env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .with_context(|| format!("parsing {key}={raw}")),
        Err(_) => Ok(default),
    }
}

fn main() -> Result<()> {
    env_logger::init();

    let params = SimParameters::from_env().context("reading SPH_* configuration")?;
    let particles = env_or("SPH_PARTICLES", DEFAULT_PARTICLES)?;
    let steps = env_or("SPH_STEPS", DEFAULT_STEPS)?;
    let seed = env_or("SPH_SEED", 0u64)?;
    let width = env_or("SPH_WIDTH", 800.0f64)?;
    let height = env_or("SPH_HEIGHT", 600.0f64)?;
    let condition = if env_or("SPH_MOTION", false)? {
        InitialCondition::RandomMotion
    } else {
        InitialCondition::RandomStill
    };

    let mut sim = FluidSim::with_condition(
        particles,
        Domain::new(width, height),
        params,
        seed,
        condition,
    );
    let params = *sim.parameters();
    log::info!(
        "running {steps} steps with {} particles (h={}, dt={}, gravity={})",
        sim.particles().len(),
        params.interaction_radius,
        params.dt,
        params.gravity
    );

    for step in 1..=steps {
        let stats = sim.step(params.gravity, params.pressure_multiplier, params.dt);
        if step % REPORT_EVERY == 0 || step == steps {
            log::info!(
                "step {step}: pressure mean {:.3} std {:.3}, kinetic energy {:.3}",
                stats.mean,
                stats.std,
                sim.kinetic_energy()
            );
        }
    }

    let momentum = sim.momentum();
    println!(
        "{} particles, {} steps, momentum ({:.4}, {:.4}), kinetic energy {:.4}",
        sim.particles().len(),
        sim.step_count(),
        momentum.x,
        momentum.y,
        sim.kinetic_energy()
    );
    Ok(())
}
