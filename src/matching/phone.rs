// src/matching/phone.rs
use log::debug;
use once_cell::sync::Lazy;
use regex::Regex;

/// E.164 allows at most 15 digits including the country code.
const E164_MAX_DIGITS: usize = 15;
const E164_MIN_DIGITS: usize = 8;

static EXTENSION: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\s*(?:ext\.?|extension|x|#)\s*\d+\s*$").expect("static extension regex")
});

/// Parses a phone number into E.164 (`+<country><number>`).
///
/// International numbers must carry their country code (`+` or `00`
/// prefix). Bare 10-digit numbers, and 11-digit numbers with a leading `1`,
/// are read as North American. Anything else returns an empty string.
pub fn normalize_phone(phone: &str) -> String {
    let without_ext = EXTENSION.replace(phone.trim(), "");
    let trimmed = without_ext.trim();

    if trimmed
        .chars()
        .any(|c| !(c.is_ascii_digit() || c.is_whitespace() || "+-().".contains(c)))
    {
        debug!("Phone number '{}' contains non-numeric characters, considered unusable.", phone);
        return String::new();
    }

    let digits: String = trimmed.chars().filter(|c| c.is_ascii_digit()).collect();
    let international = if trimmed.starts_with('+') {
        Some(digits.clone())
    } else {
        digits.strip_prefix("00").map(str::to_string)
    };

    let e164_digits = match international {
        Some(d) if d.starts_with('0') => None,
        Some(d) => Some(d),
        None if digits.len() == 10 && !digits.starts_with(['0', '1']) => Some(format!("1{}", digits)),
        None if digits.len() == 11 && digits.starts_with('1') => Some(digits.clone()),
        None => None,
    };

    match e164_digits {
        Some(d) if (E164_MIN_DIGITS..=E164_MAX_DIGITS).contains(&d.len()) => format!("+{}", d),
        _ => {
            debug!("Phone number '{}' could not be parsed to E.164.", phone);
            String::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_north_american_formats() {
        assert_eq!(normalize_phone("(206) 555-0143"), "+12065550143");
        assert_eq!(normalize_phone("206.555.0143"), "+12065550143");
        assert_eq!(normalize_phone("1-206-555-0143"), "+12065550143");
        assert_eq!(normalize_phone("206-555-0143 ext. 12"), "+12065550143");
    }

    #[test]
    fn test_international_formats() {
        assert_eq!(normalize_phone("+44 20 7946 0958"), "+442079460958");
        assert_eq!(normalize_phone("0044 20 7946 0958"), "+442079460958");
    }

    #[test]
    fn test_unparseable_numbers_become_empty() {
        assert_eq!(normalize_phone(""), "");
        assert_eq!(normalize_phone("555-0143"), "");
        assert_eq!(normalize_phone("call me"), "");
        assert_eq!(normalize_phone("+1234"), "");
        assert_eq!(normalize_phone("+1 206 555 0143 9999 99"), "");
    }
}
