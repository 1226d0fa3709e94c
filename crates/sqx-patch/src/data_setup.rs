//! The `data_setup` section: instrument, date range and backtest costs.
//!
//! Unlike the other sections its keys spread over several anchors:
//!
//! - `symbol` and `timeframe` share the text of `.//Symbol`, written as
//!   `<symbol>_<timeframe>`
//! - `date_from` / `date_to` are the `From` / `To` children of `.//Data`
//! - `spread` / `slippage` are the `Spread` / `Slippage` children of
//!   `.//BacktestSettings`

use sqx_xml::XmlPath;

/// A recognized `data_setup` key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataField {
    Symbol,
    Timeframe,
    DateFrom,
    DateTo,
    Spread,
    Slippage,
}

/// Where a [`DataField`] is stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DataTarget {
    /// One half of the `.//Symbol` text.
    SymbolPart,

    /// A child element `tag` of the anchor.
    Child { anchor: &'static str, tag: &'static str },
}

impl DataField {
    pub fn from_key(key: &str) -> Option<Self> {
        match key {
            "symbol" => Some(DataField::Symbol),
            "timeframe" => Some(DataField::Timeframe),
            "date_from" => Some(DataField::DateFrom),
            "date_to" => Some(DataField::DateTo),
            "spread" => Some(DataField::Spread),
            "slippage" => Some(DataField::Slippage),
            _ => None,
        }
    }

    pub fn target(self) -> DataTarget {
        match self {
            DataField::Symbol | DataField::Timeframe => DataTarget::SymbolPart,
            DataField::DateFrom => DataTarget::Child { anchor: "Data", tag: "From" },
            DataField::DateTo => DataTarget::Child { anchor: "Data", tag: "To" },
            DataField::Spread => DataTarget::Child {
                anchor: "BacktestSettings",
                tag: "Spread",
            },
            DataField::Slippage => DataTarget::Child {
                anchor: "BacktestSettings",
                tag: "Slippage",
            },
        }
    }
}

impl DataTarget {
    /// Path to the element this target lives in, relative to the root.
    pub fn anchor_path(&self) -> XmlPath {
        match self {
            DataTarget::SymbolPart => XmlPath::descendant(SYMBOL_TAG),
            DataTarget::Child { anchor, .. } => XmlPath::descendant(*anchor),
        }
    }
}

pub const SYMBOL_TAG: &str = "Symbol";

/// Compose the `.//Symbol` text from the configured halves.
///
/// A missing half is taken from `current`. A configured half that `current`
/// already starts or ends with marks the split point, so symbols containing
/// underscores keep their shape across repeated runs; otherwise `current`
/// is split on its last underscore. Returns `None` when neither half is
/// configured, or when only the timeframe is and there is no current text
/// to take the symbol from.
///
/// ```rust
/// use sqx_patch::data_setup::combine_symbol;
///
/// let combined = combine_symbol(None, Some("EURUSD"), Some("M15"));
/// assert_eq!(combined.as_deref(), Some("EURUSD_M15"));
///
/// let combined = combine_symbol(Some("EURUSD_H1"), None, Some("M15"));
/// assert_eq!(combined.as_deref(), Some("EURUSD_M15"));
///
/// let combined = combine_symbol(Some("EURUSD_H1"), Some("GBPUSD"), None);
/// assert_eq!(combined.as_deref(), Some("GBPUSD_H1"));
///
/// let combined = combine_symbol(Some("US_500"), Some("US_500"), None);
/// assert_eq!(combined.as_deref(), Some("US_500"));
/// ```
pub fn combine_symbol(
    current: Option<&str>,
    symbol: Option<&str>,
    timeframe: Option<&str>,
) -> Option<String> {
    if symbol.is_none() && timeframe.is_none() {
        return None;
    }
    let (current_symbol, current_timeframe) = match current {
        Some(text) => {
            let (symbol, timeframe) = split_symbol(text, symbol, timeframe);
            (Some(symbol), timeframe)
        }
        None => (None, None),
    };
    match (symbol.or(current_symbol), timeframe.or(current_timeframe)) {
        (Some(symbol), Some(timeframe)) => Some(format!("{symbol}_{timeframe}")),
        (Some(symbol), None) => Some(symbol.to_string()),
        (None, _) => None,
    }
}

/// Split `EURUSD_M15` into (`EURUSD`, `M15`); text without an underscore is
/// all symbol.
///
/// The configured halves take precedence over the last underscore: with
/// `symbol = US_500`, `US_500` is all symbol and `US_500_H1` splits after
/// `US_500`.
fn split_symbol<'a>(
    text: &'a str,
    symbol: Option<&str>,
    timeframe: Option<&str>,
) -> (&'a str, Option<&'a str>) {
    if let Some(symbol) = symbol {
        if text == symbol {
            return (text, None);
        }
        if let Some(rest) = text.strip_prefix(symbol).and_then(|rest| rest.strip_prefix('_')) {
            return (&text[..symbol.len()], Some(rest));
        }
    }
    let head = timeframe
        .and_then(|timeframe| text.strip_suffix(timeframe))
        .and_then(|head| head.strip_suffix('_'));
    if let Some(head) = head {
        return (head, Some(&text[head.len() + 1..]));
    }
    match text.rsplit_once('_') {
        Some((symbol, timeframe)) => (symbol, Some(timeframe)),
        None => (text, None),
    }
}
