use serde_json::Value;

/// Amounts are plain floating-point rupees.
pub type Amount = f64;

pub const CURRENCY_SYMBOL: &str = "₹";

/// Fractions closer to zero than this render as whole numbers.
const WHOLE_EPSILON: f64 = 1e-6;

/// Coerce a float into a usable amount. NaN and infinities become 0.
pub fn coerce_amount(value: f64) -> Amount {
    if value.is_finite() { value } else { 0.0 }
}

/// Coerce a loosely typed JSON value into an amount.
/// Numbers pass through, numeric strings are parsed, `true` is 1,
/// everything else is 0.
pub fn coerce_amount_value(value: &Value) -> Amount {
    match value {
        Value::Number(n) => coerce_amount(n.as_f64().unwrap_or(0.0)),
        Value::String(s) => coerce_amount_str(s),
        Value::Bool(true) => 1.0,
        _ => 0.0,
    }
}

/// Parse a user-supplied amount string. Blank or non-numeric input is 0.
pub fn coerce_amount_str(input: &str) -> Amount {
    let input = input.trim();
    if input.is_empty() {
        return 0.0;
    }
    input.parse::<f64>().map(coerce_amount).unwrap_or(0.0)
}

/// Format an amount for display.
/// Example: 1234.0 -> "₹1,234", 1234.5 -> "₹1,234.50", -20.0 -> "-₹20"
pub fn format_amount(value: Amount) -> String {
    let value = coerce_amount(value);
    let whole = (value - value.round()).abs() < WHOLE_EPSILON;
    let rendered = if whole {
        format!("{:.0}", value.round().abs())
    } else {
        format!("{:.2}", value.abs())
    };

    let (int_part, frac_part) = match rendered.split_once('.') {
        Some((i, f)) => (i, Some(f)),
        None => (rendered.as_str(), None),
    };

    let negative = value < 0.0 && rendered.chars().any(|c| c != '0' && c != '.');
    let sign = if negative { "-" } else { "" };
    let grouped = group_thousands(int_part);

    match frac_part {
        Some(frac) => format!("{}{}{}.{}", sign, CURRENCY_SYMBOL, grouped, frac),
        None => format!("{}{}{}", sign, CURRENCY_SYMBOL, grouped),
    }
}

/// Coerce a JSON value and format it.
pub fn format_amount_value(value: &Value) -> String {
    format_amount(coerce_amount_value(value))
}

fn group_thousands(digits: &str) -> String {
    let len = digits.len();
    let mut out = String::with_capacity(len + len / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (len - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}
