//! Open load inputs: plain files, gzip files (sniffed by magic bytes), or stdin.

use anyhow::{Context, Result};
use flate2::read::MultiGzDecoder;
use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::Path;

const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];
const READ_BUF_SIZE: usize = 1024 * 1024;

/// Boxed line source handed to the pipeline.
pub type InputSource = Box<dyn BufRead + Send>;

/// True when `path` names stdin.
pub fn is_stdin(path: &Path) -> bool {
    path.as_os_str() == "-"
}

/// Open `path` for line reading, transparently decompressing gzip (including concatenated members).
pub fn open_input(path: &Path) -> Result<InputSource> {
    if is_stdin(path) {
        return Ok(Box::new(BufReader::with_capacity(READ_BUF_SIZE, io::stdin())));
    }
    let file = File::open(path).with_context(|| format!("open input {}", path.display()))?;
    let mut raw = BufReader::with_capacity(READ_BUF_SIZE, file);
    let is_gzip = raw
        .fill_buf()
        .with_context(|| format!("read input {}", path.display()))?
        .starts_with(&GZIP_MAGIC);
    if is_gzip {
        log::debug!("{}: gzip input", path.display());
        Ok(Box::new(BufReader::with_capacity(
            READ_BUF_SIZE,
            MultiGzDecoder::new(raw),
        )))
    } else {
        Ok(Box::new(raw))
    }
}
