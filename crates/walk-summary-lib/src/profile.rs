//! Elevation profile resampling
//!
//! Recorded tracks are unevenly spaced: a GPS logger left running at a cafe produces hundreds
//! of points in one spot, a fast descent only a few. Sampling every n-th point would bias the
//! profile towards the dense stretches, so samples are instead placed by distance. After every
//! sample the remaining route length is divided evenly among the remaining sample slots, and
//! the next sample is taken at the first point past that distance.
//!
//! Samples are encoded with the polyline codec after scaling both distance and elevation by
//! `1e-5`, which makes the codec's 5 decimal digits correspond to whole meters.

use crate::{GeoPoint, Result, WalkError, polyline};

/// Scale applied to `(distance, elevation)` pairs before polyline encoding
pub const PROFILE_SCALE: f64 = 1e-5;

/// Default maximum number of samples in a profile
pub const DEFAULT_SAMPLE_COUNT: usize = 100;

/// A single point of the elevation profile
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ElevationSample {
    /// Distance along the route from the first elevation-bearing point, in meters
    pub distance_m: f64,
    /// Elevation in meters
    pub elevation_m: f64,
}

/// Result of resampling a track's elevations
#[derive(Clone, Debug, PartialEq)]
pub struct ElevationProfile {
    /// Sum of all positive elevation deltas, unrounded
    pub ascent_m: f64,
    /// Emitted samples, non-decreasing in distance
    pub samples: Vec<ElevationSample>,
    /// Samples encoded as a scaled polyline
    pub encoded: String,
}

impl ElevationProfile {
    /// Decode an encoded profile back into whole meters
    pub fn decode(encoded: &str) -> Result<Vec<ElevationSample>> {
        let pairs: Vec<[f64; 2]> = polyline::decode(encoded)?;
        Ok(pairs
            .into_iter()
            .map(|[d, e]| ElevationSample {
                distance_m: (d / PROFILE_SCALE).round(),
                elevation_m: (e / PROFILE_SCALE).round(),
            })
            .collect())
    }
}

/// Collects samples and hands out the distance at which to take the next one
struct Sampler {
    samples: Vec<ElevationSample>,
    target_count: usize,
    total_length_m: f64,
}

impl Sampler {
    fn new(total_length_m: f64, target_count: usize) -> Self {
        Self {
            samples: Vec::with_capacity(target_count.max(2)),
            target_count,
            total_length_m,
        }
    }

    /// Record a sample and return the distance of the next one
    fn emit(&mut self, distance_m: f64, elevation_m: f64) -> f64 {
        self.samples.push(ElevationSample {
            distance_m,
            elevation_m,
        });

        // The last slot always goes to the final point
        let remaining_slots = self.target_count.saturating_sub(self.samples.len());
        if remaining_slots <= 1 {
            return f64::INFINITY;
        }

        distance_m + (self.total_length_m - distance_m) / remaining_slots as f64
    }
}

/// Resample the elevations of `points` into at most `target_count` distance-spaced samples
///
/// # Arguments
/// * `points` - Route points in traversal order; points without elevation are skipped
/// * `total_length_m` - Length of the route used to spread the samples
/// * `target_count` - Maximum number of samples (at least two are always produced when two
///   or more points carry elevation)
///
/// # Returns
/// The profile, or `WalkError::NoElevationData` if no point carries an elevation
pub fn resample(
    points: &[GeoPoint],
    total_length_m: f64,
    target_count: usize,
) -> Result<ElevationProfile> {
    #[cfg(feature = "profiling")]
    profiling::scope!("profile::resample");

    let filtered: Vec<(GeoPoint, f64)> = points
        .iter()
        .filter_map(|p| p.elevation().map(|e| (*p, e)))
        .collect();
    let Some(&(_, first_elevation)) = filtered.first() else {
        return Err(WalkError::NoElevationData);
    };

    let mut sampler = Sampler::new(total_length_m, target_count);
    let mut next_sample_m = sampler.emit(0.0, first_elevation);
    let mut elapsed_m = 0.0;
    let mut ascent_m = 0.0;
    let last_pair = filtered.len().saturating_sub(2);

    for (i, pair) in filtered.windows(2).enumerate() {
        let (prev, prev_elevation) = pair[0];
        let (curr, curr_elevation) = pair[1];

        ascent_m += (curr_elevation - prev_elevation).max(0.0);
        elapsed_m += prev.distance_m(&curr);

        if elapsed_m > next_sample_m || i == last_pair {
            next_sample_m = sampler.emit(elapsed_m, curr_elevation);
        }
    }

    let scaled: Vec<[f64; 2]> = sampler
        .samples
        .iter()
        .map(|s| [s.distance_m * PROFILE_SCALE, s.elevation_m * PROFILE_SCALE])
        .collect();

    tracing::debug!(
        "Resampled {} elevation points into {} samples (ascent {:.1} m)",
        filtered.len(),
        sampler.samples.len(),
        ascent_m
    );

    Ok(ElevationProfile {
        ascent_m,
        encoded: polyline::encode(&scaled),
        samples: sampler.samples,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::track::path_length_m;

    fn point(lat: f64, lon: f64, elevation: f64) -> GeoPoint {
        GeoPoint::with_elevation_m(lat, lon, elevation).unwrap()
    }

    /// Hilly walk with a deterministic but irregular spacing
    fn generate_walk(n: usize) -> Vec<GeoPoint> {
        let mut lon = 0.0;
        (0..n)
            .map(|i| {
                let t = i as f64;
                lon += 0.0001 + 0.0004 * (t * 0.37).sin().abs();
                point(45.0 + 0.001 * (t * 0.1).cos(), lon, 300.0 + 80.0 * (t * 0.05).sin())
            })
            .collect()
    }

    #[test]
    fn test_three_point_example() {
        let points = vec![
            point(0.0, 0.0, 0.0),
            point(0.0, 0.001, 5.0),
            point(0.0, 0.002, 3.0),
        ];
        let length = path_length_m(&points).round();
        assert_eq!(length, 222.0);

        let profile = resample(&points, length, 2).unwrap();
        assert_eq!(profile.ascent_m, 5.0);
        assert_eq!(profile.samples.len(), 2);
        assert_eq!(profile.samples[0].distance_m, 0.0);
        assert_eq!(profile.samples[0].elevation_m, 0.0);
        assert!((profile.samples[1].distance_m - 222.39).abs() < 0.01);
        assert_eq!(profile.samples[1].elevation_m, 3.0);

        let decoded = ElevationProfile::decode(&profile.encoded).unwrap();
        assert_eq!(decoded.len(), 2);
        assert_eq!(decoded[1].distance_m, 222.0);
        assert_eq!(decoded[1].elevation_m, 3.0);
    }

    #[test]
    fn test_ascent_sums_positive_deltas() {
        let points = vec![
            point(0.0, 0.0, 10.0),
            point(0.0, 0.0005, 15.0),
            point(0.0, 0.003, 12.0),
            point(0.0, 0.0031, 20.0),
        ];
        let profile = resample(&points, path_length_m(&points), 100).unwrap();
        assert_eq!(profile.ascent_m, 13.0);
    }

    #[test]
    fn test_descent_only_has_zero_ascent() {
        let points: Vec<GeoPoint> = (0..10)
            .map(|i| point(0.0, i as f64 * 0.001, 100.0 - i as f64))
            .collect();
        let profile = resample(&points, path_length_m(&points), 5).unwrap();
        assert_eq!(profile.ascent_m, 0.0);
    }

    #[test]
    fn test_sample_count_bounds() {
        let points = generate_walk(500);
        let length = path_length_m(&points);

        for target in [0, 1, 2, 3, 10, 100, 499, 500, 1000] {
            let profile = resample(&points, length, target).unwrap();
            let samples = &profile.samples;

            assert!(samples.len() >= 2, "target={target}");
            assert!(samples.len() <= target.max(2), "target={target}");
            assert!(samples.len() <= points.len(), "target={target}");
            assert_eq!(samples[0].distance_m, 0.0);
            assert!((samples.last().unwrap().distance_m - length).abs() < 1e-6);
            assert!(
                samples.windows(2).all(|w| w[0].distance_m <= w[1].distance_m),
                "target={target}"
            );
        }
    }

    #[test]
    fn test_saturates_at_target_count() {
        let points = generate_walk(1000);
        let profile = resample(&points, path_length_m(&points), 100).unwrap();
        assert_eq!(profile.samples.len(), 100);
    }

    #[test]
    fn test_samples_follow_distance_not_point_density() {
        // 100 points over the first ~100 m, then 9 points spread over ~900 m
        let mut points: Vec<GeoPoint> = (0..100)
            .map(|i| point(0.0, i as f64 * 0.000_009, 50.0))
            .collect();
        let dense_end = points[99].longitude();
        points.extend((1..=9).map(|i| point(0.0, dense_end + i as f64 * 0.0009, 60.0)));

        let profile = resample(&points, path_length_m(&points), 10).unwrap();
        let in_dense_part = profile
            .samples
            .iter()
            .filter(|s| s.distance_m < 100.0)
            .count();
        assert_eq!(in_dense_part, 1);
        assert!(profile.samples.len() >= 8);
    }

    #[test]
    fn test_points_without_elevation_are_skipped() {
        let points = vec![
            point(0.0, 0.0, 10.0),
            GeoPoint::new(0.0, 0.001).unwrap(),
            point(0.0, 0.002, 20.0),
        ];
        let profile = resample(&points, 222.0, 100).unwrap();
        assert_eq!(profile.ascent_m, 10.0);
        assert_eq!(profile.samples.len(), 2);
    }

    #[test]
    fn test_no_elevation_fails() {
        let points = vec![GeoPoint::new(0.0, 0.0).unwrap(), GeoPoint::new(0.0, 0.001).unwrap()];
        assert!(matches!(
            resample(&points, 111.0, 100),
            Err(WalkError::NoElevationData)
        ));
    }

    #[test]
    fn test_single_point() {
        let points = vec![point(10.0, 10.0, 123.0)];
        let profile = resample(&points, 0.0, 100).unwrap();
        assert_eq!(profile.samples.len(), 1);
        assert_eq!(profile.ascent_m, 0.0);
        assert_eq!(
            ElevationProfile::decode(&profile.encoded).unwrap()[0].elevation_m,
            123.0
        );
    }
}
