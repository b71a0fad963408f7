use crate::backup::result_error::error::Error;
use crate::backup::result_error::result::Result;

/// Arguments placed before the paths: one directory level, sizes in bytes.
pub const DU_ARGS: [&str; 2] = ["--max-depth=1", "--block-size=1"];

/// Reads the leading byte count of the last row of a `du` report.
///
/// `du` visits its arguments in order and prints each argument's total after
/// its children, so the last row is the total of the last path given.
pub fn parse_last_row_bytes(tool: &str, output: &str) -> Result<u64> {
    let last = output
        .lines()
        .filter(|l| !l.trim().is_empty())
        .last()
        .ok_or_else(|| Error::parse_error(tool, "empty report"))?;

    let mut fields = last.split_whitespace();
    let size = fields
        .next()
        .ok_or_else(|| Error::parse_error(tool, format!("no size in row {last:?}")))?;
    if fields.next().is_none() {
        return Err(Error::parse_error(tool, format!("no path in row {last:?}")));
    }

    size.parse()
        .map_err(|e| Error::parse_error(tool, format!("bad size {size:?} in row {last:?}: {e}")))
}
