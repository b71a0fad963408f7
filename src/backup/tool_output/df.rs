use crate::backup::result_error::error::Error;
use crate::backup::result_error::result::Result;

/// Arguments placed before the device so sizes come out in bytes, one row per
/// filesystem.
pub const DF_ARGS: [&str; 2] = ["-P", "--block-size=1"];

/// Extracts the free byte count of `device` from a `df` report.
///
/// The row must start with the device name followed by three integer
/// columns; the third is the free space.
pub fn parse_free_bytes(tool: &str, device: &str, output: &str) -> Result<u64> {
    output
        .lines()
        .filter_map(|line| {
            let mut columns = line.split_whitespace();
            if columns.next() != Some(device) {
                return None;
            }
            let numbers: Vec<u64> = columns
                .take(3)
                .map_while(|c| c.parse().ok())
                .collect();
            (numbers.len() == 3).then(|| numbers[2])
        })
        .next()
        .ok_or_else(|| {
            Error::parse_error(
                tool,
                format!("no row with three numeric columns for {device}"),
            )
        })
}
