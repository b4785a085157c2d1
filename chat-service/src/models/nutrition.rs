//! Nutrition context attached to chat requests.
//!
//! Clients send whatever their local state holds, so every level is
//! optional and wrongly shaped values degrade to "absent" instead of
//! rejecting the request.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::value::RawValue;
use serde_json::Value;

/// Macro values for one role (target, consumed or remaining).
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct MacroSet {
    #[serde(default, deserialize_with = "lenient_number")]
    pub kcal: Option<f64>,
    #[serde(default, deserialize_with = "lenient_number")]
    pub protein: Option<f64>,
    #[serde(default, deserialize_with = "lenient_number")]
    pub carb: Option<f64>,
    #[serde(default, deserialize_with = "lenient_number")]
    pub fat: Option<f64>,
}

/// The user's day: what they aim for, what they ate and what is left.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NutritionContext {
    #[serde(default, deserialize_with = "lenient")]
    pub targets: Option<MacroSet>,
    #[serde(default, deserialize_with = "lenient")]
    pub totals: Option<MacroSet>,
    #[serde(default, deserialize_with = "lenient")]
    pub remaining: Option<MacroSet>,
}

/// Parse raw JSON text as `T`, falling back to `T::default()` on any error.
pub(crate) fn parse_or_default<T>(raw: &RawValue) -> T
where
    T: DeserializeOwned + Default,
{
    serde_json::from_str(raw.get()).unwrap_or_default()
}

/// Deserialize `T`, falling back to `T::default()` when the JSON value has
/// the wrong shape.
///
/// The value is captured as raw text first, so a nested value serde_json
/// cannot represent (`1e400`) only affects its own field.
pub(crate) fn lenient<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned + Default,
{
    let raw = Box::<RawValue>::deserialize(deserializer)?;
    Ok(parse_or_default(&raw))
}

/// Accept JSON numbers and numeric strings; anything else is absent.
fn lenient_number<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Box::<RawValue>::deserialize(deserializer)?;
    let number = match serde_json::from_str::<Value>(raw.get()) {
        Ok(Value::Number(n)) => n.as_f64(),
        Ok(Value::String(s)) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    Ok(number.filter(|v| v.is_finite()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn parse(value: Value) -> NutritionContext {
        serde_json::from_str(&value.to_string()).expect("context never fails to parse")
    }

    #[test]
    fn parses_partial_sets() {
        let ctx = parse(json!({ "targets": { "kcal": 2000, "protein": 120.5 } }));
        let targets = ctx.targets.unwrap();
        assert_eq!(targets.kcal, Some(2000.0));
        assert_eq!(targets.protein, Some(120.5));
        assert_eq!(targets.carb, None);
        assert!(ctx.totals.is_none());
        assert!(ctx.remaining.is_none());
    }

    #[test]
    fn numeric_strings_are_accepted() {
        let ctx = parse(json!({ "totals": { "kcal": " 1500.4 ", "fat": "abc" } }));
        let totals = ctx.totals.unwrap();
        assert_eq!(totals.kcal, Some(1500.4));
        assert_eq!(totals.fat, None);
    }

    #[test]
    fn non_numeric_values_are_absent() {
        let ctx = parse(json!({
            "remaining": { "kcal": null, "protein": true, "carb": [1], "fat": { "g": 3 } }
        }));
        assert_eq!(ctx.remaining, Some(MacroSet::default()));
    }

    #[test]
    fn non_finite_strings_are_absent() {
        let ctx = parse(json!({ "targets": { "kcal": "Infinity", "fat": "NaN" } }));
        assert_eq!(ctx.targets, Some(MacroSet::default()));
    }

    #[test]
    fn wrongly_shaped_sets_are_absent() {
        let ctx = parse(json!({ "targets": 5, "totals": "x", "remaining": false }));
        assert_eq!(ctx, NutritionContext::default());
    }

    #[test]
    fn out_of_range_numbers_only_drop_their_field() {
        let ctx: NutritionContext = serde_json::from_str(
            r#"{"targets":{"kcal":1e400,"protein":120},"totals":{"kcal":-1e400}}"#,
        )
        .expect("context never fails to parse");
        let targets = ctx.targets.unwrap();
        assert_eq!(targets.kcal, None);
        assert_eq!(targets.protein, Some(120.0));
        assert_eq!(ctx.totals, Some(MacroSet::default()));
    }
}
