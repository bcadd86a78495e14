/// Parse a sheet cell that may use either "1.234,56" or "1,234.56" formatting
///
/// Everything except digits, `,`, `.` and `-` is dropped first, so currency
/// symbols and spaces are tolerated. The rightmost separator is the decimal
/// point when both kinds are present. A lone comma is a decimal comma. A
/// separator repeated with no other kind present is a thousands separator.
/// A minus sign is only accepted in front. Strings without digits, stray
/// minus signs ("10-12", "2024-01-05") and non-finite results are missing.
pub fn parse_localized_number(raw: &str) -> Option<f64> {
    let cleaned: String = raw
        .chars()
        .filter(|c| c.is_ascii_digit() || matches!(c, ',' | '.' | '-'))
        .collect();

    if !cleaned.chars().any(|c| c.is_ascii_digit()) {
        return None;
    }

    let negative = cleaned.starts_with('-');
    if cleaned.matches('-').count() > usize::from(negative) {
        return None;
    }
    let commas = cleaned.matches(',').count();
    let dots = cleaned.matches('.').count();

    let decimal_pos = match (commas, dots) {
        (0, 0) => None,
        (_, 0) if commas == 1 => cleaned.rfind(','),
        (0, _) if dots == 1 => cleaned.rfind('.'),
        (0, _) | (_, 0) => None,
        _ => cleaned.rfind(',').max(cleaned.rfind('.')),
    };

    let mut normalized = String::with_capacity(cleaned.len() + 1);
    if negative {
        normalized.push('-');
    }
    for (i, c) in cleaned.char_indices() {
        match c {
            '0'..='9' => normalized.push(c),
            ',' | '.' if Some(i) == decimal_pos => normalized.push('.'),
            _ => {}
        }
    }

    normalized.parse::<f64>().ok().filter(|v| v.is_finite())
}
