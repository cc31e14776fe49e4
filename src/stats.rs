use crate::parallel::{AtomicF64, ParallelExecutor};
use crate::Particle;
use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};

pub const PRESSURE_FIXED_SCALE: f64 = 1000.0;

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct PressureStats {
    pub mean: f64,
    pub std: f64,
}

#[derive(Debug, Default)]
pub struct StatsScratch {
    sums: Vec<AtomicI64>,
    partials: Vec<AtomicF64>,
    overflowed: AtomicBool,
}

impl StatsScratch {
    fn prepare(&mut self, slots: usize) {
        let slots = slots.max(1);
        self.sums.resize_with(slots, AtomicI64::default);
        self.partials.resize_with(slots, AtomicF64::default);
        for slot in &self.sums {
            slot.store(0, Ordering::Relaxed);
        }
        self.clear_partials();
        self.overflowed.store(false, Ordering::Relaxed);
    }

    fn clear_partials(&self) {
        for slot in &self.partials {
            slot.store(0.0);
        }
    }

    fn partial_total(&self) -> f64 {
        self.partials.iter().map(AtomicF64::load).sum()
    }
}

fn fixed_point(pressure: f64) -> Option<i64> {
    let scaled = (pressure * PRESSURE_FIXED_SCALE).trunc();
    // `i64::MAX as f64` rounds up to 2^63, so the upper bound is exclusive.
    (scaled.is_finite() && scaled >= i64::MIN as f64 && scaled < i64::MAX as f64)
        .then_some(scaled as i64)
}

fn pressure_mean(exec: &ParallelExecutor, particles: &[Particle], scratch: &StatsScratch) -> f64 {
    let n = particles.len();
    exec.for_each_worker(n, |slot, range| {
        let sum = particles[range]
            .iter()
            .try_fold(0i64, |acc, p| acc.checked_add(fixed_point(p.pressure)?));
        match sum {
            Some(sum) => scratch.sums[slot].store(sum, Ordering::Relaxed),
            None => scratch.overflowed.store(true, Ordering::Relaxed),
        }
    });
    if !scratch.overflowed.load(Ordering::Relaxed) {
        let total: i128 = scratch
            .sums
            .iter()
            .map(|s| i128::from(s.load(Ordering::Relaxed)))
            .sum();
        return total as f64 / (n as f64 * PRESSURE_FIXED_SCALE);
    }

    exec.for_each_worker(n, |slot, range| {
        let partial: f64 = particles[range].iter().map(|p| p.pressure / n as f64).sum();
        scratch.partials[slot].store(partial);
    });
    let mean = scratch.partial_total();
    scratch.clear_partials();
    mean
}

pub fn pressure_stats(
    exec: &ParallelExecutor,
    particles: &[Particle],
    scratch: &mut StatsScratch,
) -> PressureStats {
    let n = particles.len();
    if n == 0 {
        return PressureStats::default();
    }
    scratch.prepare(exec.workers());
    let scratch: &StatsScratch = scratch;

    let mean = pressure_mean(exec, particles, scratch);

    exec.for_each_worker(n, |slot, range| {
        let partial: f64 = particles[range]
            .iter()
            .map(|p| {
                let dev = p.pressure - mean;
                dev * dev
            })
            .sum();
        scratch.partials[slot].store(partial);
    });
    let variance = scratch.partial_total() / n as f64;

    PressureStats {
        mean,
        std: variance.sqrt(),
    }
}
