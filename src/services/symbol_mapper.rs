/// Convert a sheet ticker into the provider symbol for an exchange
///
/// "thyao" -> "THYAO.IS". Already-suffixed input is left alone so the
/// mapping is idempotent; empty input maps to an empty string.
pub fn map_symbol(ticker: &str, suffix: &str) -> String {
    let ticker = ticker.trim().to_uppercase();
    if ticker.is_empty() {
        return ticker;
    }

    let suffix = suffix.trim().to_uppercase();
    if suffix.is_empty() || ticker.ends_with(&suffix) {
        ticker
    } else {
        format!("{}{}", ticker, suffix)
    }
}
