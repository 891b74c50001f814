pub mod fasta_reader;
pub mod fastq_reader;
pub mod tabular_output;

use flate2::read::GzDecoder;
use std::fs::File;
use std::io::{self, BufReader, Read};
use std::path::Path;

const BUFFER_SIZE: usize = 4 * 1024 * 1024; // 4MB buffer

/// Open a sequence file, decompressing when the name ends in `.gz`.
pub(crate) fn open_input(path: &Path) -> io::Result<BufReader<Box<dyn Read>>> {
    let file = File::open(path)?;
    let reader: Box<dyn Read> = if has_extension(path, "gz") {
        log::debug!("Reading {} through gzip decompression", path.display());
        Box::new(GzDecoder::new(file))
    } else {
        Box::new(file)
    };
    Ok(BufReader::with_capacity(BUFFER_SIZE, reader))
}

fn has_extension(path: &Path, ext: &str) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case(ext))
}

/// True for `.fq`, `.fastq` and their gzipped forms.
pub fn is_fastq_path(path: &Path) -> bool {
    let stem_path;
    let path = if has_extension(path, "gz") {
        stem_path = path.with_extension("");
        stem_path.as_path()
    } else {
        path
    };
    has_extension(path, "fq") || has_extension(path, "fastq")
}
