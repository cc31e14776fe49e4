use crate::boundary::{resolve, BoundaryConfig, Domain};
use crate::parallel::ParallelExecutor;
use crate::Particle;

pub fn predict_positions(exec: &ParallelExecutor, particles: &mut [Particle], dt: f64) {
    exec.for_each_mut(particles, |_, p| {
        let next = p.position + p.velocity * dt;
        if next.is_finite() {
            p.position = next;
        }
    });
}

pub fn integrate(
    exec: &ParallelExecutor,
    particles: &mut [Particle],
    dt: f64,
    domain: Domain,
    boundary: BoundaryConfig,
    step: u64,
) {
    exec.for_each_mut(particles, |i, p| {
        let velocity = p.velocity + p.force * (p.inverse_mass() * dt);
        if velocity.is_finite() {
            p.velocity = velocity;
        }
        let position = p.position + p.velocity * dt;
        if position.is_finite() {
            p.position = position;
        }
        resolve(&mut p.position, &mut p.velocity, domain, boundary, i, step);
    });
}
