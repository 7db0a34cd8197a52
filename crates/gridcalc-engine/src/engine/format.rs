use rhai::Dynamic;

/// Format an evaluation result for writing back into a cell.
///
/// Integral floats print without a fractional point; other floats use the
/// shortest round-trippable decimal. Booleans are `true`/`false`; strings
/// pass through verbatim.
pub fn format_dynamic(value: &Dynamic) -> String {
    if let Ok(n) = value.as_float() {
        format_number(n)
    } else if let Ok(n) = value.as_int() {
        n.to_string()
    } else if let Ok(b) = value.as_bool() {
        if b { "true" } else { "false" }.to_string()
    } else if let Ok(s) = value.clone().into_string() {
        s
    } else {
        value.to_string()
    }
}

/// Format a float result for a cell.
pub fn format_number(n: f64) -> String {
    if n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        n.to_string()
    }
}
