//! Point-in-radius test around a fixed mall center.
//!
//! Distances are geodesic on the WGS-84 ellipsoid (Vincenty's inverse
//! formula), falling back to a great-circle estimate for the rare
//! near-antipodal pairs where the iteration does not converge.

use serde::{Deserialize, Serialize};

/// WGS-84 semi-major axis in meters.
const WGS84_A: f64 = 6_378_137.0;
/// WGS-84 flattening.
const WGS84_F: f64 = 1.0 / 298.257_223_563;
/// Mean earth radius used by the great-circle fallback.
const MEAN_EARTH_RADIUS_M: f64 = 6_371_008.8;
const MAX_ITERATIONS: usize = 200;
const CONVERGENCE: f64 = 1e-12;

/// Phoenix Mall, Chennai.
pub const DEFAULT_CENTER: Coordinate = Coordinate {
    latitude: 13.087_800,
    longitude: 80.278_500,
};
pub const DEFAULT_RADIUS_METERS: f64 = 500.0;

/// Latitude/longitude in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinate {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    /// Geodesic distance to `other` in meters.
    pub fn distance_to(&self, other: &Coordinate) -> f64 {
        vincenty_inverse(self, other).unwrap_or_else(|| great_circle(self, other))
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Geofence {
    pub center: Coordinate,
    pub radius_meters: f64,
}

impl Default for Geofence {
    fn default() -> Self {
        Self {
            center: DEFAULT_CENTER,
            radius_meters: DEFAULT_RADIUS_METERS,
        }
    }
}

impl Geofence {
    pub fn new(center: Coordinate, radius_meters: f64) -> Self {
        Self {
            center,
            radius_meters,
        }
    }

    /// True iff `point` lies within the radius (boundary inclusive).
    pub fn contains(&self, point: &Coordinate) -> bool {
        point.distance_to(&self.center) <= self.radius_meters
    }

    pub fn is_inside(&self, latitude: f64, longitude: f64) -> bool {
        self.contains(&Coordinate::new(latitude, longitude))
    }
}

fn vincenty_inverse(p1: &Coordinate, p2: &Coordinate) -> Option<f64> {
    let b = WGS84_A * (1.0 - WGS84_F);
    let l = (p2.longitude - p1.longitude).to_radians();
    let u1 = ((1.0 - WGS84_F) * p1.latitude.to_radians().tan()).atan();
    let u2 = ((1.0 - WGS84_F) * p2.latitude.to_radians().tan()).atan();
    let (sin_u1, cos_u1) = u1.sin_cos();
    let (sin_u2, cos_u2) = u2.sin_cos();

    let mut lambda = l;
    for _ in 0..MAX_ITERATIONS {
        let (sin_lambda, cos_lambda) = lambda.sin_cos();
        let sin_sigma = ((cos_u2 * sin_lambda).powi(2)
            + (cos_u1 * sin_u2 - sin_u1 * cos_u2 * cos_lambda).powi(2))
        .sqrt();
        if sin_sigma == 0.0 {
            // coincident points
            return Some(0.0);
        }
        let cos_sigma = sin_u1 * sin_u2 + cos_u1 * cos_u2 * cos_lambda;
        let sigma = sin_sigma.atan2(cos_sigma);
        let sin_alpha = cos_u1 * cos_u2 * sin_lambda / sin_sigma;
        let cos_sq_alpha = 1.0 - sin_alpha * sin_alpha;
        // equatorial line
        let cos_2sigma_m = if cos_sq_alpha == 0.0 {
            0.0
        } else {
            cos_sigma - 2.0 * sin_u1 * sin_u2 / cos_sq_alpha
        };
        let c = WGS84_F / 16.0 * cos_sq_alpha * (4.0 + WGS84_F * (4.0 - 3.0 * cos_sq_alpha));
        let previous = lambda;
        lambda = l
            + (1.0 - c)
                * WGS84_F
                * sin_alpha
                * (sigma
                    + c * sin_sigma
                        * (cos_2sigma_m + c * cos_sigma * (-1.0 + 2.0 * cos_2sigma_m.powi(2))));

        if (lambda - previous).abs() < CONVERGENCE {
            let u_sq = cos_sq_alpha * (WGS84_A * WGS84_A - b * b) / (b * b);
            let big_a =
                1.0 + u_sq / 16384.0 * (4096.0 + u_sq * (-768.0 + u_sq * (320.0 - 175.0 * u_sq)));
            let big_b = u_sq / 1024.0 * (256.0 + u_sq * (-128.0 + u_sq * (74.0 - 47.0 * u_sq)));
            let delta_sigma = big_b
                * sin_sigma
                * (cos_2sigma_m
                    + big_b / 4.0
                        * (cos_sigma * (-1.0 + 2.0 * cos_2sigma_m.powi(2))
                            - big_b / 6.0
                                * cos_2sigma_m
                                * (-3.0 + 4.0 * sin_sigma.powi(2))
                                * (-3.0 + 4.0 * cos_2sigma_m.powi(2))));
            return Some(b * big_a * (sigma - delta_sigma));
        }
    }
    None
}

fn great_circle(p1: &Coordinate, p2: &Coordinate) -> f64 {
    let phi1 = p1.latitude.to_radians();
    let phi2 = p2.latitude.to_radians();
    let d_phi = phi2 - phi1;
    let d_lambda = (p2.longitude - p1.longitude).to_radians();
    let h = (d_phi / 2.0).sin().powi(2) + phi1.cos() * phi2.cos() * (d_lambda / 2.0).sin().powi(2);
    2.0 * MEAN_EARTH_RADIUS_M * h.sqrt().min(1.0).asin()
}
