//! Sensor window input: synthetic generation and file loading

mod generator;
mod input;

pub use generator::{
    generate_window, synthetic_request, synthetic_window, FeatureSpec, SENSOR_FEATURES,
};
pub use input::{input_template, load_input, parse_input};
