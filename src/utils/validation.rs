use regex::Regex;

pub fn validate_mobile(mobile: &str) -> bool {
    let re = Regex::new(r"^[6-9]\d{9}$").unwrap();
    re.is_match(mobile)
}

pub fn validate_email(email: &str) -> bool {
    let re = Regex::new(r"^[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}$").unwrap();
    re.is_match(email)
}

pub fn validate_pincode(pincode: &str) -> bool {
    let re = Regex::new(r"^\d{6}$").unwrap();
    re.is_match(pincode)
}

/// Positive, finite numeric input (price, built-up area).
pub fn parse_positive_number(value: &str) -> Option<f64> {
    match value.trim().parse::<f64>() {
        Ok(n) if n.is_finite() && n > 0.0 => Some(n),
        _ => None,
    }
}

pub fn parse_count(value: &str) -> Option<u32> {
    value.trim().parse::<u32>().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mobile_requires_ten_digits_with_valid_lead() {
        assert!(validate_mobile("9876543210"));
        assert!(validate_mobile("6000000000"));
        assert!(!validate_mobile("5876543210"));
        assert!(!validate_mobile("987654321"));
        assert!(!validate_mobile("98765432100"));
        assert!(!validate_mobile("98765o3210"));
    }

    #[test]
    fn pincode_is_exactly_six_digits() {
        assert!(validate_pincode("400001"));
        assert!(!validate_pincode("4000011"));
        assert!(!validate_pincode("40001"));
        assert!(!validate_pincode("40000a"));
    }

    #[test]
    fn positive_number_rejects_zero_and_garbage() {
        assert_eq!(parse_positive_number("2500000"), Some(2500000.0));
        assert_eq!(parse_positive_number(" 950.5 "), Some(950.5));
        assert_eq!(parse_positive_number("0"), None);
        assert_eq!(parse_positive_number("-12"), None);
        assert_eq!(parse_positive_number("abc"), None);
    }

    #[test]
    fn count_parses_non_negative_integers_only() {
        assert_eq!(parse_count("0"), Some(0));
        assert_eq!(parse_count("3"), Some(3));
        assert_eq!(parse_count("-1"), None);
        assert_eq!(parse_count("two"), None);
    }
}
