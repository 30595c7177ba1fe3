/// Truncate a string to a maximum number of characters, adding ellipsis if needed
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

/// Whole amounts without decimals, everything else to two places.
pub fn format_amount(amount: f64) -> String {
    if amount.fract() == 0.0 {
        format!("{:.0}", amount)
    } else {
        format!("{:.2}", amount)
    }
}

/// Amount with the rupee sign, as shown in the expense list
pub fn format_money(amount: f64) -> String {
    format!("₹{}", format_amount(amount))
}

/// Session countdown as `m:ss`. Negative values show as `0:00`.
pub fn format_remaining(seconds: i64) -> String {
    let seconds = seconds.max(0);
    format!("{}:{:02}", seconds / 60, seconds % 60)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_string() {
        assert_eq!(truncate_string("Hello", 10), "Hello");
        assert_eq!(truncate_string("Hello World", 8), "Hello...");
        assert_eq!(truncate_string("Hi", 2), "Hi");
        assert_eq!(truncate_string("₹₹₹₹₹₹", 5), "₹₹...");
    }

    #[test]
    fn test_format_money() {
        assert_eq!(format_money(200.0), "₹200");
        assert_eq!(format_money(12.5), "₹12.50");
        assert_eq!(format_amount(10_000.0), "10000");
    }

    #[test]
    fn test_format_remaining() {
        assert_eq!(format_remaining(300), "5:00");
        assert_eq!(format_remaining(61), "1:01");
        assert_eq!(format_remaining(-3), "0:00");
    }
}
