// Tab-separated match report
//
// read_name  read_len  contig_name  contig_begin  contig_end  strand  edit_distance  percent_identity
//
// Reverse-strand matches list the contig coordinates end first so the
// columns read in the direction of the read.

use std::io::Write;

use crate::error::{MapError, Result};
use crate::pipeline::MatchStore;
use crate::sequence::{Contig, Orientation, Read};
use crate::verify::Match;

/// One report line without the trailing newline
pub fn format_match(m: &Match, read: &Read, contig: &Contig) -> String {
    let (first, second) = match m.orientation {
        Orientation::Forward => (m.begin, m.end),
        Orientation::ReverseComplement => (m.end, m.begin),
    };
    format!(
        "{}\t{}\t{}\t{}\t{}\t{}\t{}\t{:.2}",
        read.name,
        read.len(),
        contig.name,
        first,
        second,
        m.orientation.strand_char(),
        m.edit_distance,
        m.percent_identity(read.len())
    )
}

/// Write every match of `store`, in store order.
///
/// Reads and contigs are looked up by id (their position in the slices).
pub fn write_matches<W: Write>(out: &mut W, store: &MatchStore, reads: &[Read], contigs: &[Contig]) -> Result<()> {
    for m in store {
        let read = reads
            .get(m.read_id)
            .ok_or_else(|| MapError::InvalidInput(format!("match {} refers to unknown read {}", m.id, m.read_id)))?;
        let contig = contigs
            .get(m.contig_id)
            .ok_or_else(|| MapError::InvalidInput(format!("match {} refers to unknown contig {}", m.id, m.contig_id)))?;
        writeln!(out, "{}", format_match(m, read, contig))?;
    }
    out.flush()?;
    Ok(())
}
