//! Built-in aggregate functions registered into every formula engine.
//!
//! The `v*` builtins take an array (usually an expanded range) and fold its
//! numeric elements: integers, floats, and strings that parse as numbers.
//! Everything else is skipped, and an empty fold yields 0.

use rhai::{Array, Dynamic, Engine};

use crate::engine::format_number;

/// Create a Rhai engine with the formula builtins registered.
pub(crate) fn new_engine() -> Engine {
    let mut engine = Engine::new();
    register_builtins(&mut engine);
    engine
}

/// Register all built-in functions into the Rhai engine.
pub(crate) fn register_builtins(engine: &mut Engine) {
    engine.register_fn("vsum", |items: Array| -> f64 {
        numeric_values(&items).iter().sum()
    });

    engine.register_fn("vmean", |items: Array| -> f64 {
        let values = numeric_values(&items);
        if values.is_empty() {
            return 0.0;
        }
        values.iter().sum::<f64>() / values.len() as f64
    });

    engine.register_fn("vmax", |items: Array| -> f64 {
        numeric_values(&items)
            .into_iter()
            .fold(None, |acc: Option<f64>, v| {
                Some(match acc {
                    Some(max) if max >= v => max,
                    _ => v,
                })
            })
            .unwrap_or(0.0)
    });

    engine.register_fn("vmin", |items: Array| -> f64 {
        numeric_values(&items)
            .into_iter()
            .fold(None, |acc: Option<f64>, v| {
                Some(match acc {
                    Some(min) if min <= v => min,
                    _ => v,
                })
            })
            .unwrap_or(0.0)
    });

    engine.register_fn("vmedian", |items: Array| -> f64 {
        let mut values = numeric_values(&items);
        if values.is_empty() {
            return 0.0;
        }
        values.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
        let n = values.len();
        if n % 2 == 0 {
            (values[n / 2 - 1] + values[n / 2]) / 2.0
        } else {
            values[n / 2]
        }
    });

    engine.register_fn("exp", |x: f64| -> f64 { x.exp() });
    engine.register_fn("exp", |x: i64| -> f64 { (x as f64).exp() });

    // Cells substitute as floats; concatenating them must render "123",
    // not Rhai's "123.0".
    engine.register_fn("+", |s: &str, x: f64| format!("{s}{}", format_number(x)));
    engine.register_fn("+", |x: f64, s: &str| format!("{}{s}", format_number(x)));
}

/// Extract the numeric elements of an array, skipping everything that is
/// neither a number nor a string that parses as one.
fn numeric_values(items: &Array) -> Vec<f64> {
    items.iter().filter_map(as_number).collect()
}

fn as_number(value: &Dynamic) -> Option<f64> {
    if let Ok(n) = value.as_float() {
        return Some(n);
    }
    if let Ok(n) = value.as_int() {
        return Some(n as f64);
    }
    if value.is_string() {
        return value.clone().into_string().ok()?.parse().ok();
    }
    None
}
