//! Runtime-tunable circle detection parameters

use crate::error::VisionError;
use serde::{Deserialize, Serialize};

/// Parameters of the circular Hough detector.
///
/// Field names on the wire follow the HTTP API (`minDist`, `param1`,
/// `param2`); the descriptive names are accepted as aliases. Missing fields
/// take their defaults, so an update always replaces the whole set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectionParameters {
    pub min_radius: i32,
    pub max_radius: i32,
    /// Inverse accumulator resolution; 1 means full image resolution
    pub dp: f64,
    /// Minimum distance between accepted circle centres
    #[serde(rename = "minDist", alias = "min_distance")]
    pub min_distance: f64,
    /// Upper Canny threshold; the lower one is half of it
    #[serde(rename = "param1", alias = "edge_threshold")]
    pub edge_threshold: f64,
    /// Votes a centre (and its radius) needs to be accepted
    #[serde(rename = "param2", alias = "accumulator_threshold")]
    pub accumulator_threshold: f64,
}

impl Default for DetectionParameters {
    fn default() -> Self {
        Self {
            min_radius: 15,
            max_radius: 30,
            dp: 1.2,
            min_distance: 50.0,
            edge_threshold: 100.0,
            accumulator_threshold: 30.0,
        }
    }
}

impl DetectionParameters {
    /// Reject malformed sets. An inverted radius range is allowed and simply
    /// produces no detections.
    pub fn validate(&self) -> Result<(), VisionError> {
        let positive = |name: &str, value: f64| {
            if value.is_finite() && value > 0.0 {
                Ok(())
            } else {
                Err(VisionError::InvalidParameters(format!(
                    "{} must be a finite positive number, got {}",
                    name, value
                )))
            }
        };

        positive("dp", self.dp)?;
        positive("minDist", self.min_distance)?;
        positive("param1", self.edge_threshold)?;
        positive("param2", self.accumulator_threshold)?;

        if self.min_radius < 0 || self.max_radius < 0 {
            return Err(VisionError::InvalidParameters(format!(
                "radii must be non-negative, got min_radius={} max_radius={}",
                self.min_radius, self.max_radius
            )));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_defaults() {
        let params = DetectionParameters::default();
        assert_eq!(params.min_radius, 15);
        assert_eq!(params.max_radius, 30);
        assert_eq!(params.dp, 1.2);
        assert_eq!(params.min_distance, 50.0);
        assert_eq!(params.edge_threshold, 100.0);
        assert_eq!(params.accumulator_threshold, 30.0);
        assert!(params.validate().is_ok());
    }

    #[test]
    fn test_wire_names() {
        let params: DetectionParameters = serde_json::from_value(json!({
            "min_radius": 10,
            "max_radius": 40,
            "dp": 1.5,
            "minDist": 20,
            "param1": 80,
            "param2": 25
        }))
        .unwrap();
        assert_eq!(params.min_radius, 10);
        assert_eq!(params.max_radius, 40);
        assert_eq!(params.min_distance, 20.0);
        assert_eq!(params.edge_threshold, 80.0);
        assert_eq!(params.accumulator_threshold, 25.0);

        let value = serde_json::to_value(&params).unwrap();
        assert_eq!(value["minDist"], json!(20.0));
        assert_eq!(value["param2"], json!(25.0));
    }

    #[test]
    fn test_aliases_and_missing_fields() {
        let params: DetectionParameters = serde_json::from_value(json!({
            "min_distance": 33,
            "edge_threshold": 90
        }))
        .unwrap();
        assert_eq!(params.min_distance, 33.0);
        assert_eq!(params.edge_threshold, 90.0);
        assert_eq!(params.max_radius, 30);
    }

    #[test]
    fn test_rejects_malformed() {
        let bad = [
            DetectionParameters { dp: 0.0, ..Default::default() },
            DetectionParameters { dp: f64::NAN, ..Default::default() },
            DetectionParameters { min_distance: -1.0, ..Default::default() },
            DetectionParameters { accumulator_threshold: 0.0, ..Default::default() },
            DetectionParameters { min_radius: -5, ..Default::default() },
        ];
        for params in bad {
            assert!(
                matches!(params.validate(), Err(VisionError::InvalidParameters(_))),
                "{:?}",
                params
            );
        }
    }

    #[test]
    fn test_accepts_inverted_radius_range() {
        let params = DetectionParameters {
            min_radius: 40,
            max_radius: 10,
            ..Default::default()
        };
        assert!(params.validate().is_ok());
    }
}
