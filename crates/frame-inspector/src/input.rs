//! Hex dump input: one frame per line

use anyhow::{Context, Result};
use std::io::BufRead;

/// Decode one input line. Blank lines and `#` comments yield `None`;
/// whitespace, `:` separators and a leading `0x` are ignored.
pub fn parse_line(line: &str) -> Option<Result<Vec<u8>>> {
    let text = line.split('#').next().unwrap_or("").trim();
    if text.is_empty() {
        return None;
    }
    let text = text.strip_prefix("0x").unwrap_or(text);
    let digits: String = text.chars().filter(|c| !c.is_whitespace() && *c != ':').collect();
    Some(hex::decode(&digits).with_context(|| format!("invalid hex frame: {}", text)))
}

/// Numbered frames from a reader; line numbers start at 1
pub fn frames<R: BufRead>(reader: R) -> impl Iterator<Item = (usize, Result<Vec<u8>>)> {
    reader.lines().enumerate().filter_map(|(idx, line)| {
        let line_no = idx + 1;
        match line {
            Ok(line) => parse_line(&line).map(|frame| (line_no, frame)),
            Err(err) => Some((line_no, Err(anyhow::Error::new(err).context("read failed")))),
        }
    })
}
