// Text/binary file sniffing

use std::fs::File;
use std::io::{self, Read};
use std::path::Path;

/// How much of the file the heuristic looks at
const SNIFF_BLOCK_SIZE: usize = 512;

/// Fraction of non-text bytes above which a file counts as binary
const BINARY_FRACTION: f64 = 0.30;

/// Guess whether `path` is a text file from its first block.
///
/// A NUL byte means binary; an empty file counts as text; otherwise the
/// file is binary when more than 30 % of the block falls outside
/// printable ASCII plus the usual whitespace controls.
pub fn is_text_file(path: &Path) -> io::Result<bool> {
    let mut block = vec![0u8; SNIFF_BLOCK_SIZE];
    let read = File::open(path)?.read(&mut block)?;
    block.truncate(read);

    if block.is_empty() {
        return Ok(true);
    }
    if block.contains(&0) {
        return Ok(false);
    }

    let non_text = block.iter().filter(|&&b| !is_text_byte(b)).count();
    Ok(non_text as f64 / block.len() as f64 <= BINARY_FRACTION)
}

fn is_text_byte(b: u8) -> bool {
    (32..127).contains(&b) || matches!(b, b'\n' | b'\r' | b'\t' | 0x0c | 0x08)
}
