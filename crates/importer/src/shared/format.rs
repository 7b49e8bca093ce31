/// Группирует цифры целой части по три, разделитель `sep`
///
/// # Примеры
/// ```ignore
/// assert_eq!(group_thousands("1234567", ','), "1,234,567");
/// assert_eq!(group_thousands("-42", ','), "-42");
/// ```
pub fn group_thousands(digits: &str, sep: char) -> String {
    let (sign, digits) = match digits.strip_prefix('-') {
        Some(rest) => ("-", rest),
        None => ("", digits),
    };
    let mut result = String::new();
    for (i, ch) in digits.chars().rev().enumerate() {
        if i > 0 && i % 3 == 0 {
            result.push(sep);
        }
        result.push(ch);
    }
    let grouped: String = result.chars().rev().collect();
    format!("{}{}", sign, grouped)
}

/// Форматирует f64 так же, как `str()` формульного языка:
/// целые значения с `.0`, экспонента вне диапазона [1e-4, 1e16)
pub fn format_float(value: f64) -> String {
    if value.is_nan() {
        return "nan".to_string();
    }
    if value.is_infinite() {
        return if value > 0.0 { "inf" } else { "-inf" }.to_string();
    }
    if value == 0.0 {
        return if value.is_sign_negative() { "-0.0" } else { "0.0" }.to_string();
    }

    let abs = value.abs();
    if !(1e-4..1e16).contains(&abs) {
        // Rust: "1e20", "1.5e-7" -> "1e+20", "1.5e-07"
        let raw = format!("{:e}", value);
        return match raw.split_once('e') {
            Some((mantissa, exp)) => {
                let (exp_sign, exp_digits) = match exp.strip_prefix('-') {
                    Some(d) => ('-', d),
                    None => ('+', exp),
                };
                format!("{}e{}{:0>2}", mantissa, exp_sign, exp_digits)
            }
            None => raw,
        };
    }

    if value.fract() == 0.0 {
        format!("{:.1}", value)
    } else {
        format!("{}", value)
    }
}

/// Число без хвостового `.0` для целых значений (ячейки таблицы, пороги в тексте)
pub fn format_plain_number(value: f64) -> String {
    if value.is_finite() && value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        format!("{}", value)
    }
}

/// Разбирает числовую строку поставщика: пробелы, `$` и разделители тысяч игнорируются
pub fn parse_number(raw: &str) -> Option<f64> {
    let cleaned: String = raw
        .trim()
        .chars()
        .filter(|c| !matches!(c, '$' | ',' | ' ' | '\u{a0}'))
        .collect();
    if cleaned.is_empty() {
        return None;
    }
    cleaned.parse::<f64>().ok().filter(|v| v.is_finite())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_group_thousands() {
        assert_eq!(group_thousands("0", ','), "0");
        assert_eq!(group_thousands("42", ','), "42");
        assert_eq!(group_thousands("999", ','), "999");
        assert_eq!(group_thousands("1000", ','), "1,000");
        assert_eq!(group_thousands("1234567", '.'), "1.234.567");
        assert_eq!(group_thousands("-1234567", ','), "-1,234,567");
    }

    #[test]
    fn test_format_float() {
        assert_eq!(format_float(36.0), "36.0");
        assert_eq!(format_float(43.56), "43.56");
        assert_eq!(format_float(0.1 + 0.2), "0.30000000000000004");
        assert_eq!(format_float(-2.5), "-2.5");
        assert_eq!(format_float(1e20), "1e+20");
        assert_eq!(format_float(1.5e-7), "1.5e-07");
        assert_eq!(format_float(0.0), "0.0");
    }

    #[test]
    fn test_format_plain_number() {
        assert_eq!(format_plain_number(150.0), "150");
        assert_eq!(format_plain_number(2.5), "2.5");
    }

    #[test]
    fn test_parse_number() {
        assert_eq!(parse_number("100"), Some(100.0));
        assert_eq!(parse_number(" $1,234.50 "), Some(1234.5));
        assert_eq!(parse_number("N/A"), None);
        assert_eq!(parse_number(""), None);
        assert_eq!(parse_number("inf"), None);
    }
}
