//! Price and postal code grammars
//!
//! Price input accepts plain integers, space-grouped thousands, an optional
//! currency marker before or after the number and an optional decimal part
//! separated by `.` or `,`; amounts round to the nearest whole euro. A
//! recognized give-away token turns the listing into a give-away instead of
//! a sale. Note that "ilmainen" is intentionally not a give-away token: it
//! describes a price, not a trade type, and is rejected like any other
//! non-numeric input.

use std::sync::LazyLock;

use regex::Regex;

/// Outcome of parsing a user's price reply
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PriceInput {
    /// Whole euros, rounded to nearest
    Amount(u32),
    /// Give the item away for free
    GiveAway,
}

static PRICE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:(?:€|eur|euro|euroa|e)\s*)?(\d[\d ]*)(?:[.,](\d{1,2}))?\s*(?:€|eur|euro|euroa|e)?$")
        .expect("price regex is valid")
});

const GIVE_AWAY_TOKENS: &[&str] = &["annetaan", "give away", "giveaway"];

/// Parse a price reply; `None` means re-prompt
pub fn parse_price(input: &str) -> Option<PriceInput> {
    let normalized = input.trim().to_lowercase();
    let collapsed = normalized.split_whitespace().collect::<Vec<_>>().join(" ");

    if GIVE_AWAY_TOKENS.contains(&collapsed.as_str()) {
        return Some(PriceInput::GiveAway);
    }

    let caps = PRICE_RE.captures(&normalized)?;

    let whole: u64 = caps
        .get(1)?
        .as_str()
        .chars()
        .filter(|c| c.is_ascii_digit())
        .collect::<String>()
        .parse()
        .ok()?;

    let cents: u64 = match caps.get(2) {
        Some(frac) => {
            let digits = frac.as_str();
            let value: u64 = digits.parse().ok()?;
            if digits.len() == 1 { value * 10 } else { value }
        }
        None => 0,
    };

    let total_cents = whole.checked_mul(100)?.checked_add(cents)?;
    let euros = (total_cents + 50) / 100;
    u32::try_from(euros).ok().map(PriceInput::Amount)
}

/// Validate a postal code reply: exactly five ASCII digits
pub fn parse_postal_code(input: &str) -> Option<&str> {
    let trimmed = input.trim();
    if trimmed.len() == 5 && trimmed.bytes().all(|b| b.is_ascii_digit()) {
        Some(trimmed)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_plain_integers() {
        assert_eq!(parse_price("50"), Some(PriceInput::Amount(50)));
        assert_eq!(parse_price("  7 "), Some(PriceInput::Amount(7)));
        assert_eq!(parse_price("0"), Some(PriceInput::Amount(0)));
    }

    #[test]
    fn test_currency_markers() {
        assert_eq!(parse_price("50€"), Some(PriceInput::Amount(50)));
        assert_eq!(parse_price("50 €"), Some(PriceInput::Amount(50)));
        assert_eq!(parse_price("€50"), Some(PriceInput::Amount(50)));
        assert_eq!(parse_price("50e"), Some(PriceInput::Amount(50)));
        assert_eq!(parse_price("1 000 eur"), Some(PriceInput::Amount(1000)));
        assert_eq!(parse_price("12 euroa"), Some(PriceInput::Amount(12)));
    }

    #[test]
    fn test_decimals_round_to_nearest() {
        assert_eq!(parse_price("99,99€"), Some(PriceInput::Amount(100)));
        assert_eq!(parse_price("99.49"), Some(PriceInput::Amount(99)));
        assert_eq!(parse_price("99.50"), Some(PriceInput::Amount(100)));
        assert_eq!(parse_price("5,5"), Some(PriceInput::Amount(6)));
    }

    #[test]
    fn test_give_away_tokens() {
        assert_eq!(parse_price("annetaan"), Some(PriceInput::GiveAway));
        assert_eq!(parse_price("Give Away"), Some(PriceInput::GiveAway));
        assert_eq!(parse_price("GIVEAWAY"), Some(PriceInput::GiveAway));
    }

    #[test]
    fn test_rejected_inputs() {
        assert_eq!(parse_price("ilmainen"), None);
        assert_eq!(parse_price("fifty"), None);
        assert_eq!(parse_price(""), None);
        assert_eq!(parse_price("12.345"), None);
        assert_eq!(parse_price("-5"), None);
        assert_eq!(parse_price("5 eur 5"), None);
    }

    #[test]
    fn test_postal_code() {
        assert_eq!(parse_postal_code("00100"), Some("00100"));
        assert_eq!(parse_postal_code(" 33720 "), Some("33720"));
        assert_eq!(parse_postal_code("001"), None);
        assert_eq!(parse_postal_code("ABCDE"), None);
        assert_eq!(parse_postal_code("001000"), None);
        assert_eq!(parse_postal_code("0010o"), None);
    }

    proptest! {
        #[test]
        fn prop_integer_amounts_parse(amount in 0u32..10_000_000) {
            prop_assert_eq!(parse_price(&amount.to_string()), Some(PriceInput::Amount(amount)));
        }

        #[test]
        fn prop_suffix_currency_never_changes_amount(amount in 0u32..1_000_000) {
            let with_suffix = format!("{amount} eur");
            prop_assert_eq!(parse_price(&with_suffix), Some(PriceInput::Amount(amount)));
        }

        #[test]
        fn prop_two_digit_decimals_round(whole in 0u32..100_000, cents in 0u32..100) {
            let text = format!("{whole},{cents:02}");
            let expected = if cents >= 50 { whole + 1 } else { whole };
            prop_assert_eq!(parse_price(&text), Some(PriceInput::Amount(expected)));
        }

        #[test]
        fn prop_postal_accepts_exactly_five_digits(code in 0u32..100_000) {
            let text = format!("{code:05}");
            prop_assert!(parse_postal_code(&text).is_some());
        }
    }
}
