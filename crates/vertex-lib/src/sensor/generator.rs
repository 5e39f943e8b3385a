//! Synthetic multi-sensor windows
//!
//! Produces plausible-shaped smoke-test input: each cell is drawn uniformly
//! from its feature's range. Unseeded windows differ on every call; pass a
//! seed for a reproducible window.

use crate::models::{InputTensor, PredictionRequest, SensorRow, NUM_FEATURES, NUM_TIMESTEPS};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

/// Name, unit and valid closed range of one sensor feature
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FeatureSpec {
    pub name: &'static str,
    pub unit: &'static str,
    pub min: f64,
    pub max: f64,
}

impl FeatureSpec {
    const fn new(name: &'static str, unit: &'static str, min: f64, max: f64) -> Self {
        Self { name, unit, min, max }
    }

    pub fn contains(&self, value: f64) -> bool {
        (self.min..=self.max).contains(&value)
    }
}

/// Features in the column order the model expects
pub const SENSOR_FEATURES: [FeatureSpec; NUM_FEATURES] = [
    FeatureSpec::new("accel_x", "m/s²", -10.0, 10.0),
    FeatureSpec::new("accel_y", "m/s²", -10.0, 10.0),
    FeatureSpec::new("accel_z", "m/s²", -10.0, 10.0),
    FeatureSpec::new("gyro_x", "°/s", -250.0, 250.0),
    FeatureSpec::new("gyro_y", "°/s", -250.0, 250.0),
    FeatureSpec::new("gyro_z", "°/s", -250.0, 250.0),
    FeatureSpec::new("mag_x", "µT", -50.0, 50.0),
    FeatureSpec::new("mag_y", "µT", -50.0, 50.0),
    FeatureSpec::new("mag_z", "µT", -50.0, 50.0),
    FeatureSpec::new("heart_rate", "bpm", 60.0, 100.0),
    FeatureSpec::new("spo2", "%", 95.0, 100.0),
    FeatureSpec::new("temperature", "°C", 20.0, 40.0),
    FeatureSpec::new("pressure", "hPa", 900.0, 1100.0),
    FeatureSpec::new("humidity", "%", 30.0, 70.0),
    FeatureSpec::new("altitude", "m", 0.0, 1000.0),
];

/// Draw one window from the given random source
pub fn generate_window<R: Rng>(rng: &mut R) -> InputTensor {
    let rows: Vec<SensorRow> = (0..NUM_TIMESTEPS)
        .map(|_| {
            std::array::from_fn(|i| {
                let feature = &SENSOR_FEATURES[i];
                rng.gen_range(feature.min..=feature.max)
            })
        })
        .collect();
    InputTensor::from_generated(rows)
}

/// Draw one window, reproducibly when a seed is given
pub fn synthetic_window(seed: Option<u64>) -> InputTensor {
    match seed {
        Some(seed) => generate_window(&mut ChaCha8Rng::seed_from_u64(seed)),
        None => generate_window(&mut rand::thread_rng()),
    }
}

/// A batch of one synthetic window
pub fn synthetic_request(seed: Option<u64>) -> PredictionRequest {
    PredictionRequest::single(synthetic_window(seed))
}
