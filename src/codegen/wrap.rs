use anyhow::Result;

use super::error::GenerationError;

fn is_break(c: u8, commaok: bool) -> bool {
    c.is_ascii_whitespace() || matches!(c, b'+' | b'-' | b'*' | b'/' | b'=' | b'^') || (commaok && c == b',')
}

/// Append `line` to `out`, splitting it so no piece is longer than `limit`.
///
/// Embedded newlines that fall within the limit are honoured. Otherwise the
/// line is split at the last break character at or before the limit; the
/// break character starts the next piece, and `brk` is written between the
/// two. A line with no break character before the limit is an error.
pub fn wrap_into(
    out: &mut String,
    line: &str,
    limit: usize,
    addcr: bool,
    commaok: bool,
    brk: &str,
) -> Result<()> {
    let mut rest = line;
    loop {
        if limit == 0 || rest.len() <= limit {
            out.push_str(rest);
            if addcr {
                out.push('\n');
            }
            return Ok(());
        }

        if let Some(nl) = rest.find('\n').filter(|&nl| nl <= limit) {
            out.push_str(&rest[..nl]);
            out.push('\n');
            rest = &rest[nl + 1..];
            continue;
        }

        let bytes = rest.as_bytes();
        let end = (1..=limit).rev().find(|&i| is_break(bytes[i], commaok));
        match end {
            Some(end) => {
                out.push_str(&rest[..end]);
                out.push_str(brk);
                rest = &rest[end..];
            }
            None => {
                return Err(GenerationError::UnwrappableLine(format!(
                    "could not wrap long line:\n{}",
                    line
                ))
                .into())
            }
        }
    }
}
