use anyhow::{bail, Context, Result};
use sim_core::Constants;
use std::collections::HashMap;

/// Replaces `Constants` fields by name. Values are type-checked by
/// deserializing the patched object, so a string for a float field fails.
pub fn apply_overrides(
    constants: &mut Constants,
    overrides: &HashMap<String, serde_json::Value>,
) -> Result<()> {
    if overrides.is_empty() {
        return Ok(());
    }
    let mut value = serde_json::to_value(&*constants).context("serializing constants")?;
    let Some(fields) = value.as_object_mut() else {
        bail!("constants did not serialize to an object");
    };

    // Sorted so error messages are stable.
    let mut keys: Vec<&String> = overrides.keys().collect();
    keys.sort();
    for key in keys {
        if !fields.contains_key(key.as_str()) {
            let mut valid: Vec<&str> = fields.keys().map(String::as_str).collect();
            valid.sort_unstable();
            bail!(
                "unknown override key '{key}'. Valid keys: {}",
                valid.join(", ")
            );
        }
        fields.insert(key.clone(), overrides[key].clone());
    }

    *constants = serde_json::from_value(value)
        .with_context(|| format!("override value has the wrong type: {overrides:?}"))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn default_constants() -> Constants {
        serde_json::from_str(include_str!("../../../content/constants.json")).unwrap()
    }

    #[test]
    fn test_apply_f32_override() {
        let mut constants = default_constants();
        let overrides = HashMap::from([("flood_base_rate".to_string(), serde_json::json!(0.5))]);
        apply_overrides(&mut constants, &overrides).unwrap();
        assert!((constants.flood_base_rate - 0.5).abs() < f32::EPSILON);
    }

    #[test]
    fn test_apply_integer_override() {
        let mut constants = default_constants();
        let overrides = HashMap::from([(
            "bottleneck_max_steps".to_string(),
            serde_json::json!(9),
        )]);
        apply_overrides(&mut constants, &overrides).unwrap();
        assert_eq!(constants.bottleneck_max_steps, 9);
    }

    #[test]
    fn test_untouched_fields_survive() {
        let mut constants = default_constants();
        let before = constants.radar_board_size;
        let overrides = HashMap::from([("stress_max".to_string(), serde_json::json!(50.0))]);
        apply_overrides(&mut constants, &overrides).unwrap();
        assert_eq!(constants.radar_board_size, before);
    }

    #[test]
    fn test_unknown_key_errors() {
        let mut constants = default_constants();
        let overrides = HashMap::from([("nonexistent_field".to_string(), serde_json::json!(1.0))]);
        let err = apply_overrides(&mut constants, &overrides)
            .unwrap_err()
            .to_string();
        assert!(err.contains("unknown override key"));
        assert!(err.contains("nonexistent_field"));
        assert!(err.contains("flood_base_rate"));
    }

    #[test]
    fn test_type_mismatch_errors() {
        let mut constants = default_constants();
        let overrides = HashMap::from([(
            "radar_board_size".to_string(),
            serde_json::json!("not_a_number"),
        )]);
        assert!(apply_overrides(&mut constants, &overrides).is_err());
    }
}
