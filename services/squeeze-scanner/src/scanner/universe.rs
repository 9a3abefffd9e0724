//! Symbol universes and request symbol resolution.

use squeeze_common::ScannerConfig;

use crate::error::ScanError;

/// Scanned when a standard request names no symbols.
pub const DEFAULT_WATCHLIST: &[&str] = &[
    "GME", "AMC", "BBBY", "ATER", "PROG", "SPRT", "DWAC", "PHUN", "BYND", "NKLA", "RIDE", "WKHS",
    "LCID", "RIVN", "PTON", "ROKU", "AAPL", "TSLA", "NVDA", "MSFT", "GOOGL", "AMZN", "META", "NFLX",
    "RDBX", "ENVX", "HYLN", "FCEL", "PLUG", "CLSK", "RIOT", "MARA",
];

/// Broad universe for expanded scans, most squeeze-prone names first.
pub const EXPANDED_UNIVERSE: &[&str] = &[
    // Meme and squeeze favorites
    "GME", "AMC", "BBBY", "ATER", "PROG", "SPRT", "IRNT", "OPAD", "GREE", "PHUN",
    "DWAC", "BKKT", "MARK", "BENE", "KOSS", "EXPR", "NAKD", "SNDL", "TLRY", "ACB",
    // High short interest
    "BYND", "NKLA", "RIDE", "WKHS", "GOEV", "CANOO", "ARVL", "LCID", "RIVN", "FSLY",
    "PTON", "MRNA", "NVAX", "BNTX", "TDOC", "ZM", "NFLX", "ROKU", "DKNG", "PENN",
    // Small and mid caps
    "RDBX", "REDX", "BOXD", "TKAT", "JYNT", "ENVX", "VLTA", "AEVA", "HYLN", "SHLS",
    "FCEL", "PLUG", "BLNK", "CHPT", "EVGO", "DCFC", "CLSK", "RIOT", "MARA", "BITF",
    // Large caps
    "AAPL", "TSLA", "NVDA", "MSFT", "GOOGL", "GOOG", "AMZN", "META", "BABA",
    "CRM", "ADBE", "ORCL", "NOW", "INTU", "AMAT", "LRCX", "KLAC", "MCHP", "MRVL",
    // Financials
    "JPM", "BAC", "WFC", "C", "GS", "MS", "SCHW", "USB", "PNC", "TFC",
    // Healthcare
    "JNJ", "PFE", "UNH", "ABBV", "TMO", "DHR", "ABT", "BMY", "LLY", "MRK",
    "GILD", "AMGN", "BIIB", "VRTX", "REGN", "CELG", "ILMN", "ISRG", "DXCM", "ALGN",
    // Energy
    "XOM", "CVX", "COP", "EOG", "SLB", "HAL", "OXY", "MPC", "VLO", "PSX",
];

/// Append `symbol` unless already present.
fn push_unique(out: &mut Vec<String>, symbol: String) {
    if !out.contains(&symbol) {
        out.push(symbol);
    }
}

/// Trim, upper-case and de-duplicate request symbols, keeping first
/// occurrences in order. A blank symbol rejects the whole request.
pub fn normalize_symbols(symbols: &[String]) -> Result<Vec<String>, ScanError> {
    let mut out = Vec::with_capacity(symbols.len());

    for (index, raw) in symbols.iter().enumerate() {
        let symbol = raw.trim().to_uppercase();
        if symbol.is_empty() {
            return Err(ScanError::MalformedRequest(format!("symbol at position {index} is empty")));
        }
        push_unique(&mut out, symbol);
    }

    Ok(out)
}

/// Resolve the symbols a scan covers.
///
/// * standard, no symbols: the default watchlist
/// * standard, symbols: exactly those
/// * expanded, no symbols: the first `expanded_default_cap` of the expanded universe
/// * expanded, symbols: those plus the first `expanded_merge_cap` of the expanded universe
pub fn resolve_universe(
    symbols: &[String],
    use_expanded: bool,
    config: &ScannerConfig,
) -> Result<Vec<String>, ScanError> {
    let requested = normalize_symbols(symbols)?;

    let universe = match (use_expanded, requested.is_empty()) {
        (false, true) => DEFAULT_WATCHLIST.iter().map(|s| s.to_string()).collect(),
        (false, false) => requested,
        (true, true) => EXPANDED_UNIVERSE
            .iter()
            .take(config.expanded_default_cap)
            .map(|s| s.to_string())
            .collect(),
        (true, false) => {
            let mut merged = requested;
            for symbol in EXPANDED_UNIVERSE.iter().take(config.expanded_merge_cap) {
                push_unique(&mut merged, symbol.to_string());
            }
            merged
        }
    };

    Ok(universe)
}
