// Numeric coercion for raw stat strings.
//
// The scrape pipeline writes every stat as the raw text the site rendered.
// Consumers that need numbers plug a `Coercer` into their load step instead
// of re-implementing percent stripping per column.

/// A single coerced cell.
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    Number(f64),
    Text(String),
    Missing,
}

impl CellValue {
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            CellValue::Number(n) => Some(*n),
            _ => None,
        }
    }
}

pub trait Coercer {
    fn coerce(&self, column: &str, raw: &str) -> CellValue;
}

/// Default coercion: trims, strips one trailing `%`, and parses as `f64`.
/// Non-finite parses and anything non-numeric stay as text.
#[derive(Debug, Clone, Copy, Default)]
pub struct NumericCoercer;

impl Coercer for NumericCoercer {
    fn coerce(&self, _column: &str, raw: &str) -> CellValue {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return CellValue::Missing;
        }
        let numeric = trimmed.strip_suffix('%').unwrap_or(trimmed).trim();
        match numeric.parse::<f64>() {
            Ok(n) if n.is_finite() => CellValue::Number(n),
            _ => CellValue::Text(trimmed.to_string()),
        }
    }
}

/// Coerce a whole row of `(column, raw)` pairs.
pub fn coerce_row<'a, C, I>(coercer: &C, row: I) -> Vec<(String, CellValue)>
where
    C: Coercer + ?Sized,
    I: IntoIterator<Item = (&'a str, &'a str)>,
{
    row.into_iter()
        .map(|(col, raw)| (col.to_string(), coercer.coerce(col, raw)))
        .collect()
}
