// Human-readable size tokens ("123.4MiB", "~45MB") to exact byte counts

/// Unit suffixes, longest first so "KIB" is tried before "B"
const UNITS: &[(&str, f64)] = &[
    ("KIB", 1024.0),
    ("MIB", 1024.0 * 1024.0),
    ("GIB", 1024.0 * 1024.0 * 1024.0),
    ("KB", 1000.0),
    ("MB", 1000.0 * 1000.0),
    ("GB", 1000.0 * 1000.0 * 1000.0),
    ("B", 1.0),
];

/// Parse a size token into bytes.
///
/// Units are case-insensitive; KiB/MiB/GiB are powers of 1024, KB/MB/GB powers
/// of 1000, and a bare `B` or no suffix means bytes. A leading `~` marks an
/// approximate size and is ignored. Fractions are truncated after scaling.
/// Returns `None` for empty input, a non-numeric amount or an unknown unit.
pub fn parse_size(token: &str) -> Option<u64> {
    let token = token.trim();
    let token = token.strip_prefix('~').unwrap_or(token).trim();
    if token.is_empty() {
        return None;
    }

    let upper = token.to_uppercase();
    let (amount, multiplier) = UNITS
        .iter()
        .find_map(|(suffix, mult)| upper.strip_suffix(suffix).map(|rest| (rest, *mult)))
        .unwrap_or((upper.as_str(), 1.0));

    let value = parse_amount(amount.trim())?;
    Some((value * multiplier) as u64)
}

/// Strictly `digits[.digits]`: rejects signs, exponents, "inf" and "nan"
fn parse_amount(amount: &str) -> Option<f64> {
    let mut parts = amount.splitn(2, '.');
    let whole = parts.next()?;
    let frac = parts.next();

    let all_digits = |s: &str| !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit());
    if !all_digits(whole) || frac.is_some_and(|f| !all_digits(f)) {
        return None;
    }

    amount.parse::<f64>().ok()
}

/// True when the token carries an explicit byte unit (KiB, MB, B, ...)
fn has_unit(token: &str) -> bool {
    token
        .trim_start_matches('~')
        .chars()
        .last()
        .is_some_and(|c| c.eq_ignore_ascii_case(&'b'))
}

/// Find the size of a table row by trying each whitespace token in turn.
///
/// Tokens with an explicit unit are preferred. Only when none of them parses
/// does the scan fall back to the first bare number, which may well be a
/// frame rate or channel count rather than a size.
pub fn extract_size_bytes(row: &str) -> Option<u64> {
    let tokens: Vec<&str> = row.split_whitespace().collect();

    tokens
        .iter()
        .filter(|t| has_unit(t))
        .find_map(|t| parse_size(t))
        .or_else(|| tokens.iter().find_map(|t| parse_size(t)))
}
