//! System prompt construction.
//!
//! The nutrition prompt grounds the model in the user's current day: twelve
//! figures (four macros for target, consumed and remaining), each rounded to
//! a whole number. Missing or unusable figures render as `0`; building a
//! prompt never fails.

use crate::models::{MacroSet, NutritionContext};
use std::fmt::Write;

/// Static persona used when a relay is configured without context support.
pub const PERSONA_PROMPT: &str = "Sen HealthPilot adında bir beslenme ve fitness asistanısın. \
Kullanıcılara kişisel beslenme, makro takibi, spor sonrası beslenme gibi konularda \
Türkçe ve samimi bir dille öneriler ver.";

const PREAMBLE: &str = "Sen HealthPilot isimli akıllı bir beslenme asistanısın.
Türkçe konuş; kısa, net ve doğal cevaplar ver.
Aynı bilgiyi tekrar etme, robot gibi konuşma ve ondalıklı sayı kullanma.

Bugünün durumu:";

type Field = fn(&MacroSet) -> Option<f64>;

/// (label, unit, field) per macro category, in display order.
const CATEGORIES: [(&str, &str, Field); 4] = [
    ("Kalori", "kcal", |m| m.kcal),
    ("Protein", "g", |m| m.protein),
    ("Karbonhidrat", "g", |m| m.carb),
    ("Yağ", "g", |m| m.fat),
];

/// Build the context-aware system prompt.
pub fn build_system_prompt(context: Option<&NutritionContext>) -> String {
    let context = context.cloned().unwrap_or_default();
    let roles = [
        ("Hedef", context.targets.unwrap_or_default()),
        ("Alınan", context.totals.unwrap_or_default()),
        ("Kalan", context.remaining.unwrap_or_default()),
    ];

    let mut prompt = String::from(PREAMBLE);
    for (label, unit, field) in CATEGORIES {
        prompt.push('\n');
        for (role, set) in &roles {
            // Writing into a String cannot fail.
            let _ = write!(
                prompt,
                "\n{} {}: {} {}",
                role,
                label,
                display_value(field(set)),
                unit
            );
        }
    }
    prompt.push('\n');
    prompt
}

/// Round half up, toward positive infinity: `2.5 -> 3`, `-2.5 -> -2`.
///
/// Computed from the fractional part rather than `floor(v + 0.5)` so values
/// just below one half (`0.49999999999999994`) do not carry into the next
/// integer. Negative zero is normalised to zero.
pub fn round_half_up(value: f64) -> f64 {
    let floor = value.floor();
    let rounded = if value - floor >= 0.5 { floor + 1.0 } else { floor };
    if rounded == 0.0 {
        0.0
    } else {
        rounded
    }
}

fn display_value(value: Option<f64>) -> String {
    let value = value.filter(|v| v.is_finite()).unwrap_or(0.0);
    format!("{:.0}", round_half_up(value))
}
