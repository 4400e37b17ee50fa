//! Persian digit rendering and column padding for receipt rows

/// Reference label the count column is aligned against ("count")
pub const COUNT_LABEL: &str = "تعداد";

const PERSIAN_DIGITS: [char; 10] = ['۰', '۱', '۲', '۳', '۴', '۵', '۶', '۷', '۸', '۹'];

/// Replace every ASCII digit with its Persian glyph
///
/// Non-digit characters pass through untouched, so applying this to an
/// already converted string is a no-op.
pub fn to_locale_digits(s: &str) -> String {
    s.chars()
        .map(|c| {
            if c.is_ascii_digit() {
                PERSIAN_DIGITS[(c as u8 - b'0') as usize]
            } else {
                c
            }
        })
        .collect()
}

/// Left-pad with spaces to the character length of [`COUNT_LABEL`]
///
/// Longer input is returned unchanged.
pub fn pad_label(s: &str) -> String {
    let target = COUNT_LABEL.chars().count();
    let len = s.chars().count();
    if len >= target {
        return s.to_string();
    }
    format!("{}{}", " ".repeat(target - len), s)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_to_locale_digits() {
        assert_eq!(to_locale_digits("021-9696"), "۰۲۱-۹۶۹۶");
        assert_eq!(to_locale_digits("1399/04/04-03:27"), "۱۳۹۹/۰۴/۰۴-۰۳:۲۷");
        assert_eq!(to_locale_digits("abc"), "abc");
        assert_eq!(to_locale_digits(""), "");
    }

    #[test]
    fn test_to_locale_digits_preserves_char_count() {
        let input = "tracking 112313424 / 2.50";
        assert_eq!(
            to_locale_digits(input).chars().count(),
            input.chars().count()
        );
    }

    #[test]
    fn test_to_locale_digits_idempotent() {
        for s in ["0123456789", "12.5 kg", "۱۲", "x9y8", ""] {
            let once = to_locale_digits(s);
            assert_eq!(to_locale_digits(&once), once);
            assert!(!once.chars().any(|c| c.is_ascii_digit()));
        }
    }

    #[test]
    fn test_pad_label() {
        assert_eq!(pad_label("۴"), "    ۴");
        assert_eq!(pad_label("۱۶"), "   ۱۶");
        assert_eq!(pad_label(""), "     ");
        assert_eq!(pad_label("123456"), "123456");
    }

    #[test]
    fn test_pad_label_length() {
        let target = COUNT_LABEL.chars().count();
        for s in ["", "1", "12345", "1234567", "۱۲۳"] {
            let padded = pad_label(s);
            let len = padded.chars().count();
            assert!(len >= target);
            if s.chars().count() < target {
                assert_eq!(len, target);
            }
        }
    }
}
