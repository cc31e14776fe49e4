use crate::Vec2;
use std::f64::consts::PI;

pub const KERNEL_EPSILON: f64 = 1e-9;

const DERIVATIVE_SCALE: f64 = 12.0 / (PI * PI * PI * PI * PI);

#[inline]
pub fn kernel_volume(h: f64) -> f64 {
    (PI + h.powi(4)) / 6.0
}

#[inline]
pub fn kernel(distance: f64, h: f64) -> f64 {
    if distance >= h {
        return 0.0;
    }
    let diff = h - distance;
    diff * diff / kernel_volume(h)
}

#[inline]
pub fn kernel_derivative(distance: f64, h: f64) -> f64 {
    if distance >= h {
        return 0.0;
    }
    (distance - h) * DERIVATIVE_SCALE
}

#[inline]
pub fn smoothed_distance(distance: f64, h: f64, smoothing_factor: f64) -> f64 {
    distance.max(smoothing_factor * h)
}

pub fn density_at(center: Vec2, neighbors: impl IntoIterator<Item = Vec2>, h: f64) -> f64 {
    let h_sq = h * h;
    let mut density = kernel(0.0, h);
    for pos in neighbors {
        let dist_sq = (pos - center).length_squared();
        if dist_sq < h_sq {
            density += kernel(dist_sq.sqrt(), h);
        }
    }
    density
}

pub fn gradient_at(
    center: Vec2,
    neighbors: impl IntoIterator<Item = Vec2>,
    h: f64,
    smoothing_factor: f64,
) -> Vec2 {
    let h_sq = h * h;
    let mut grad = Vec2::zero();
    for pos in neighbors {
        let delta = pos - center;
        let dist_sq = delta.length_squared();
        if dist_sq >= h_sq {
            continue;
        }
        let smoothed = smoothed_distance(dist_sq.sqrt(), h, smoothing_factor);
        if smoothed < KERNEL_EPSILON {
            continue;
        }
        grad += delta * (kernel_derivative(smoothed, h) / smoothed);
    }
    grad
}

pub fn laplacian_at(
    center: Vec2,
    neighbors: impl IntoIterator<Item = Vec2>,
    h: f64,
    smoothing_factor: f64,
) -> f64 {
    let h_sq = h * h;
    let mut laplacian = 0.0;
    for pos in neighbors {
        let dist_sq = (pos - center).length_squared();
        if dist_sq >= h_sq {
            continue;
        }
        let smoothed = smoothed_distance(dist_sq.sqrt(), h, smoothing_factor);
        laplacian += kernel_derivative(smoothed, h);
    }
    laplacian
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
    fn kernel_vanishes_outside_support() {
        for h in [0.5, 1.0, 4.0, 10.0] {
            for scale in [1.0, 1.001, 2.0, 100.0] {
                let d = h * scale;
                assert_eq!(kernel(d, h), 0.0);
                assert_eq!(kernel_derivative(d, h), 0.0);
            }
        }
    }

    #[test]
    fn kernel_positive_and_strictly_decreasing_inside_support() {
        for h in [0.5, 1.0, 4.0, 10.0] {
            let steps = 200;
            let mut prev = f64::INFINITY;
            for k in 0..steps {
                let d = h * k as f64 / steps as f64;
                let w = kernel(d, h);
                assert!(w > 0.0, "kernel({d}, {h}) = {w}");
                assert!(w < prev, "kernel not decreasing at d={d}, h={h}");
                prev = w;
            }
        }
    }

    #[test]
    fn kernel_self_term_is_finite() {
        let w = kernel(0.0, 10.0);
        assert!(w.is_finite());
        assert_close(w, 100.0 / ((PI + 10_000.0) / 6.0), 1e-12);
    }

    #[test]
    fn derivative_is_negative_and_increasing_inside_support() {
        let h = 4.0;
        let mut prev = f64::NEG_INFINITY;
        for k in 0..100 {
            let d = h * k as f64 / 100.0;
            let dw = kernel_derivative(d, h);
            assert!(dw < 0.0);
            assert!(dw > prev);
            prev = dw;
        }
        assert_close(kernel_derivative(0.0, h), -h * 12.0 / PI.powi(5), 1e-12);
    }

    #[test]
    fn smoothed_distance_floors_small_separations() {
        assert_eq!(smoothed_distance(0.0, 10.0, 0.1), 1.0);
        assert_eq!(smoothed_distance(0.5, 10.0, 0.1), 1.0);
        assert_eq!(smoothed_distance(3.0, 10.0, 0.1), 3.0);
    }

    #[test]
    fn density_counts_self_and_in_range_neighbors() {
        let h = 2.0;
        let center = Vec2::new(0.0, 0.0);
        let neighbors = [Vec2::new(1.0, 0.0), Vec2::new(5.0, 0.0)];
        let density = density_at(center, neighbors, h);
        assert_close(density, kernel(0.0, h) + kernel(1.0, h), 1e-12);
    }

    #[test]
    fn gradient_points_toward_neighbor_with_negative_derivative() {
        let h = 4.0;
        let center = Vec2::zero();
        let grad = gradient_at(center, [Vec2::new(2.0, 0.0)], h, 0.1);
        assert!(grad.x < 0.0);
        assert_close(grad.y, 0.0, 1e-15);
        assert_close(grad.x, kernel_derivative(2.0, h), 1e-12);
    }

    #[test]
    fn gradient_of_symmetric_neighbors_cancels() {
        let h = 4.0;
        let grad = gradient_at(
            Vec2::zero(),
            [Vec2::new(1.0, 0.0), Vec2::new(-1.0, 0.0), Vec2::new(0.0, 2.0), Vec2::new(0.0, -2.0)],
            h,
            0.1,
        );
        assert_close(grad.x, 0.0, 1e-12);
        assert_close(grad.y, 0.0, 1e-12);
    }

    #[test]
    fn laplacian_uses_smoothed_floor() {
        let h = 10.0;
        let near = laplacian_at(Vec2::zero(), [Vec2::new(0.01, 0.0)], h, 0.2);
        assert_close(near, kernel_derivative(2.0, h), 1e-12);
        let outside = laplacian_at(Vec2::zero(), [Vec2::new(20.0, 0.0)], h, 0.2);
        assert_eq!(outside, 0.0);
    }
}
