use std::fs;
use std::path::Path;

use serde::Deserialize;

pub(crate) const TUNING_ENV_VAR: &str = "COURIER_TUNING";

/// Vehicle handling. Speeds are tiles per second, turn rate radians per second.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub(crate) struct DrivingTuning {
    pub(crate) max_speed: f32,
    pub(crate) max_reverse_speed: f32,
    pub(crate) acceleration: f32,
    pub(crate) braking: f32,
    pub(crate) rolling_friction: f32,
    pub(crate) turn_rate: f32,
    pub(crate) vehicle_radius: f32,
}

impl Default for DrivingTuning {
    fn default() -> Self {
        Self {
            max_speed: 6.0,
            max_reverse_speed: 2.0,
            acceleration: 4.0,
            braking: 8.0,
            rolling_friction: 2.0,
            turn_rate: 2.5,
            vehicle_radius: 0.25,
        }
    }
}

type TuningResult<T> = Result<T, String>;

pub(crate) fn load_tuning(path: &Path) -> TuningResult<DrivingTuning> {
    let raw = fs::read_to_string(path)
        .map_err(|error| format!("read tuning '{}': {error}", path.display()))?;
    parse_tuning_json(&raw)
}

fn parse_tuning_json(raw: &str) -> TuningResult<DrivingTuning> {
    let mut deserializer = serde_json::Deserializer::from_str(raw);
    let tuning: DrivingTuning = match serde_path_to_error::deserialize(&mut deserializer) {
        Ok(tuning) => tuning,
        Err(error) => {
            let path = error.path().to_string();
            let source = error.into_inner();
            return if path.is_empty() || path == "." {
                Err(format!("parse tuning json: {source}"))
            } else {
                Err(format!("parse tuning json at {path}: {source}"))
            };
        }
    };
    validate_tuning(&tuning)?;
    Ok(tuning)
}

fn validate_tuning(tuning: &DrivingTuning) -> TuningResult<()> {
    let fields = [
        ("max_speed", tuning.max_speed),
        ("max_reverse_speed", tuning.max_reverse_speed),
        ("acceleration", tuning.acceleration),
        ("braking", tuning.braking),
        ("rolling_friction", tuning.rolling_friction),
        ("turn_rate", tuning.turn_rate),
        ("vehicle_radius", tuning.vehicle_radius),
    ];
    for (name, value) in fields {
        if !value.is_finite() || value < 0.0 {
            return Err(format!(
                "validation failed at {name}: expected a non-negative number, got {value}"
            ));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_fields_keep_defaults() {
        let tuning = parse_tuning_json(r#"{"max_speed": 9.5}"#).expect("tuning");
        assert_eq!(tuning.max_speed, 9.5);
        assert_eq!(tuning.turn_rate, DrivingTuning::default().turn_rate);
    }

    #[test]
    fn errors_name_the_offending_field() {
        let error = parse_tuning_json(r#"{"turn_rate": "fast"}"#).expect_err("type error");
        assert!(error.contains("at turn_rate"), "{error}");

        let error = parse_tuning_json(r#"{"top_speed": 3}"#).expect_err("unknown field");
        assert!(error.contains("top_speed"), "{error}");

        let error = parse_tuning_json(r#"{"braking": -1}"#).expect_err("negative");
        assert!(error.contains("validation failed at braking"), "{error}");
    }
}
