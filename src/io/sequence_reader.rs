// Sequence loading via bio::io::{fasta, fastq}
//
// - Format picked from the file extension (.fq/.fastq → FASTQ, else FASTA)
// - .gz inputs decoded with flate2's MultiGzDecoder, which also handles
//   BGZF (concatenated gzip members)
// - Sequences are encoded to numeric codes on load; names keep the record id

use std::fs::File;
use std::io::{self, BufReader, Read as IoRead};
use std::path::Path;

use bio::io::{fasta, fastq};
use flate2::read::MultiGzDecoder;

use crate::error::{MapError, Result};
use crate::sequence::{Contig, Read};

const BUFFER_SIZE: usize = 4 * 1024 * 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SequenceFormat {
    Fasta,
    Fastq,
}

/// Format implied by the file name, ignoring a trailing `.gz`
pub fn detect_format(path: &Path) -> SequenceFormat {
    let name = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or_default()
        .to_ascii_lowercase();
    let name = name.strip_suffix(".gz").unwrap_or(&name);
    if name.ends_with(".fq") || name.ends_with(".fastq") {
        SequenceFormat::Fastq
    } else {
        SequenceFormat::Fasta
    }
}

fn is_gzipped(path: &Path) -> bool {
    path.extension().and_then(|e| e.to_str()) == Some("gz")
}

/// Open a file, transparently decompressing `.gz`
fn open_input(path: &Path) -> io::Result<Box<dyn IoRead>> {
    let file = File::open(path)?;
    if is_gzipped(path) {
        log::debug!("Reading {} through gzip decoder", path.display());
        Ok(Box::new(BufReader::with_capacity(BUFFER_SIZE, MultiGzDecoder::new(file))))
    } else {
        Ok(Box::new(BufReader::with_capacity(BUFFER_SIZE, file)))
    }
}

fn parse_error(path: &Path, msg: impl ToString) -> MapError {
    MapError::Parse {
        path: path.display().to_string(),
        msg: msg.to_string(),
    }
}

/// `(name, ascii sequence)` records of a FASTA or FASTQ file
pub fn read_records(path: &Path) -> Result<Vec<(String, Vec<u8>)>> {
    let input = open_input(path)?;
    let mut records = Vec::new();

    match detect_format(path) {
        SequenceFormat::Fasta => {
            for record in fasta::Reader::new(input).records() {
                let record = record.map_err(|e| parse_error(path, e))?;
                records.push((record.id().to_string(), record.seq().to_vec()));
            }
        }
        SequenceFormat::Fastq => {
            for record in fastq::Reader::new(input).records() {
                let record = record.map_err(|e| parse_error(path, e))?;
                records.push((record.id().to_string(), record.seq().to_vec()));
            }
        }
    }

    log::debug!("Loaded {} records from {}", records.len(), path.display());
    Ok(records)
}

/// Load reference contigs, ids in file order
pub fn read_contigs(path: &Path) -> Result<Vec<Contig>> {
    let contigs: Vec<Contig> = read_records(path)?
        .into_iter()
        .enumerate()
        .map(|(id, (name, seq))| Contig::new(id, name, &seq))
        .collect();
    if contigs.is_empty() {
        return Err(MapError::InvalidInput(format!(
            "no reference sequences in {}",
            path.display()
        )));
    }
    Ok(contigs)
}

/// Load reads, ids in file order
pub fn read_reads(path: &Path) -> Result<Vec<Read>> {
    Ok(read_records(path)?
        .into_iter()
        .enumerate()
        .map(|(id, (name, seq))| Read::new(id, name, &seq))
        .collect())
}
