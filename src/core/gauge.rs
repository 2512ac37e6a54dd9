//! Gauge projection
//!
//! A gauge names a variable key plus the two fields inside its payload that
//! hold the current and maximum values:
//!
//! ```toml
//! [[gauges]]
//! name = "HP"
//! variable_key = "Char.Vitals"
//! current_field = "hp"
//! max_field = "maxhp"
//! color_class = "red"
//! ```

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::variables::VariableStore;

/// Static gauge configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GaugeDef {
    /// Label shown next to the values
    pub name: String,
    #[serde(alias = "message")]
    pub variable_key: String,
    #[serde(alias = "value")]
    pub current_field: String,
    #[serde(alias = "max")]
    pub max_field: String,
    #[serde(alias = "color", default)]
    pub color_class: String,
}

/// A displayable gauge value
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GaugeReading {
    pub current: f64,
    pub max: f64,
    /// `current / max`, not clamped
    pub fraction: f64,
}

impl GaugeReading {
    /// Fraction clamped to `0.0..=1.0` for drawing bars
    pub fn clamped(&self) -> f64 {
        self.fraction.clamp(0.0, 1.0)
    }
}

/// Compute the reading for `gauge`.
///
/// Returns `None` ("no data") when the key is absent, either field is missing
/// or not a number, or the maximum is zero.
pub fn project(gauge: &GaugeDef, variables: &VariableStore) -> Option<GaugeReading> {
    let payload = variables.get(&gauge.variable_key)?;
    let current = numeric_field(payload, &gauge.current_field)?;
    let max = numeric_field(payload, &gauge.max_field)?;

    if max == 0.0 {
        return None;
    }

    Some(GaugeReading {
        current,
        max,
        fraction: current / max,
    })
}

fn numeric_field(payload: &Value, field: &str) -> Option<f64> {
    payload.get(field)?.as_f64()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn hp_gauge(key: &str, cur: &str, max: &str) -> GaugeDef {
        GaugeDef {
            name: "HP".to_string(),
            variable_key: key.to_string(),
            current_field: cur.to_string(),
            max_field: max.to_string(),
            color_class: "red".to_string(),
        }
    }

    #[test]
    fn test_projects_fraction() {
        let mut vars = VariableStore::new();
        vars.set("vitals", json!({"hp": 50, "maxhp": 100}));

        let reading = project(&hp_gauge("vitals", "hp", "maxhp"), &vars);
        assert_eq!(reading, Some(GaugeReading { current: 50.0, max: 100.0, fraction: 0.5 }));
    }

    #[test]
    fn test_missing_key_is_no_data() {
        let vars = VariableStore::new();
        assert_eq!(project(&hp_gauge("vitals", "hp", "maxhp"), &vars), None);
    }

    #[test]
    fn test_missing_or_non_numeric_field_is_no_data() {
        let mut vars = VariableStore::new();
        vars.set("vitals", json!({"hp": "lots", "maxhp": 100}));
        assert_eq!(project(&hp_gauge("vitals", "hp", "maxhp"), &vars), None);

        vars.set("vitals", json!({"hp": 10}));
        assert_eq!(project(&hp_gauge("vitals", "hp", "maxhp"), &vars), None);

        vars.set("vitals", json!(42));
        assert_eq!(project(&hp_gauge("vitals", "hp", "maxhp"), &vars), None);
    }

    #[test]
    fn test_zero_max_is_no_data() {
        let mut vars = VariableStore::new();
        vars.set("hp", json!({"cur": 0, "max": 0}));
        assert_eq!(project(&hp_gauge("hp", "cur", "max"), &vars), None);
    }

    #[test]
    fn test_overfull_gauge_clamps_for_drawing() {
        let mut vars = VariableStore::new();
        vars.set("vitals", json!({"sp": 30.0, "maxsp": 20}));

        let reading = project(&hp_gauge("vitals", "sp", "maxsp"), &vars).unwrap();
        assert_eq!(reading.fraction, 1.5);
        assert_eq!(reading.clamped(), 1.0);
    }

    #[test]
    fn test_legacy_field_names() {
        let gauge: GaugeDef = toml::from_str(
            r#"
            name = "Mana"
            message = "Char.Vitals"
            value = "sp"
            max = "maxsp"
            color = "blue"
            "#,
        )
        .unwrap();

        assert_eq!(gauge.variable_key, "Char.Vitals");
        assert_eq!(gauge.current_field, "sp");
        assert_eq!(gauge.max_field, "maxsp");
        assert_eq!(gauge.color_class, "blue");
    }
}
