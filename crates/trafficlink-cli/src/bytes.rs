//! Byte-list parsing for command-line input.

use crate::CliError;

/// Parse byte values separated by spaces or commas.
///
/// Each value is decimal or `0x` hexadecimal. Values are not range-checked
/// here; the engine masks them to 8 bits.
pub fn parse_byte_list(input: &str) -> Result<Vec<i64>, CliError> {
    input
        .split(|c: char| c == ',' || c.is_whitespace())
        .filter(|token| !token.is_empty())
        .map(parse_value)
        .collect()
}

/// Parse every argument with [`parse_byte_list`] and concatenate.
pub fn parse_byte_args(args: &[String]) -> Result<Vec<i64>, CliError> {
    let mut out = Vec::new();
    for arg in args {
        out.extend(parse_byte_list(arg)?);
    }
    Ok(out)
}

/// Parse a hex string; spaces, colons and dashes are ignored.
pub fn parse_hex(input: &str) -> Result<Vec<i64>, CliError> {
    let digits: String = input.chars().filter(|c| !matches!(c, ' ' | ':' | '-')).collect();
    let decoded = hex::decode(&digits).map_err(|e| CliError::InvalidBytes(format!("{input:?}: {e}")))?;
    Ok(decoded.into_iter().map(i64::from).collect())
}

fn parse_value(token: &str) -> Result<i64, CliError> {
    let parsed = match token.strip_prefix("0x").or_else(|| token.strip_prefix("0X")) {
        Some(digits) => i64::from_str_radix(digits, 16),
        None => token.parse(),
    };
    parsed.map_err(|_| CliError::InvalidBytes(format!("{token:?} is not a byte value")))
}
