//! Number formatting for the reception table

/// Formats with a thousands separator (space) and the given decimal separator
///
/// # Examples
///
/// ```rust,ignore
/// assert_eq!(format_grouped(1234.567, 2, '.'), "1 234.57");
/// assert_eq!(format_grouped(1234.567, 2, ','), "1 234,57");
/// ```
pub fn format_grouped(value: f64, decimals: usize, decimal_sep: char) -> String {
    let formatted = format!("{:.*}", decimals, value);
    let (integer_part, decimal_part) = match formatted.split_once('.') {
        Some((i, d)) => (i, Some(d)),
        None => (formatted.as_str(), None),
    };
    let (sign, digits) = match integer_part.strip_prefix('-') {
        Some(rest) => ("-", rest),
        None => ("", integer_part),
    };

    let mut grouped = String::new();
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(' ');
        }
        grouped.push(c);
    }

    match decimal_part {
        Some(d) => format!("{}{}{}{}", sign, grouped, decimal_sep, d),
        None => format!("{}{}", sign, grouped),
    }
}

/// Line amounts: two decimals, point separator
pub fn format_amount(value: f64) -> String {
    format_grouped(value, 2, '.')
}

/// Order-level received amount, French locale style
pub fn format_amount_fr(value: f64) -> String {
    format_grouped(value, 2, ',')
}

/// Progress rate, e.g. "71.50%"
pub fn format_percent(value: f64) -> String {
    format!("{:.2}%", value)
}

/// Signed increment for confirmation summaries: "+5", "-2.5"
pub fn format_increment(value: f64) -> String {
    let text = contracts::shared::number::display_quantity(value);
    if value > 0.0 {
        format!("+{}", text)
    } else {
        text
    }
}
