/// Symbol for a supported currency code; unknown codes are shown as the code.
pub fn currency_symbol(code: &str) -> &str {
    match code {
        "USD" => "$",
        "EUR" => "€",
        "GBP" => "£",
        "JPY" => "¥",
        "CAD" => "C$",
        "AUD" => "A$",
        other => other,
    }
}

/// Format a money amount, e.g. `-$12.50`. Yen has no minor unit.
pub fn format_amount(amount: f64, currency: &str) -> String {
    let symbol = currency_symbol(currency);
    let sign = if amount < 0.0 { "-" } else { "" };
    let decimals = if currency == "JPY" { 0 } else { 2 };
    let separator = if symbol == currency { " " } else { "" };
    format!("{}{}{}{:.*}", sign, symbol, separator, decimals, amount.abs())
}

/// Truncate a string to a maximum length, adding ellipsis if needed
pub fn truncate_string(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else if max_len <= 3 {
        s.chars().take(max_len).collect()
    } else {
        let truncated: String = s.chars().take(max_len - 3).collect();
        format!("{}...", truncated)
    }
}

/// Format a date string to a more readable format
pub fn format_date(date: &str) -> String {
    if let Ok(dt) = chrono::DateTime::parse_from_rfc3339(date) {
        dt.format("%b %d, %Y").to_string()
    } else if let Ok(day) = chrono::NaiveDate::parse_from_str(date, "%Y-%m-%d") {
        day.format("%b %d, %Y").to_string()
    } else {
        date.to_string()
    }
}
