// Sequence containers and nucleotide encoding
//
// Contigs and reads are stored as numeric codes (A=0, C=1, G=2, T=3, N=4)
// so the seed index can pack q-grams 2 bits per base and the verifier can
// build its match masks with a direct table lookup.

use std::borrow::Cow;
use std::fmt;
use std::ops::Range;

/// Code used for N and any other non-ACGT character
pub const N_CODE: u8 = 4;

/// Number of distinct codes (ACGT + N)
pub const ALPHABET_SIZE: usize = 5;

// Function to convert a base character to its 0-3 encoding
// A=0, C=1, G=2, T=3, N=4
#[inline(always)]
pub fn base_to_code(base: u8) -> u8 {
    match base {
        b'A' | b'a' => 0,
        b'C' | b'c' => 1,
        b'G' | b'g' => 2,
        b'T' | b't' => 3,
        _ => N_CODE,
    }
}

#[inline(always)]
pub fn code_to_base(code: u8) -> u8 {
    match code {
        0 => b'A',
        1 => b'C',
        2 => b'G',
        3 => b'T',
        _ => b'N',
    }
}

// Complement of a code; N stays N
#[inline(always)]
pub fn complement_code(code: u8) -> u8 {
    match code {
        0 => 3,
        1 => 2,
        2 => 1,
        3 => 0,
        _ => N_CODE,
    }
}

/// Encode an ASCII sequence (case-insensitive) to numeric codes
#[inline]
pub fn encode_sequence(seq: &[u8]) -> Vec<u8> {
    seq.iter().map(|&b| base_to_code(b)).collect()
}

/// Reverse complement of an encoded sequence
#[inline]
pub fn reverse_complement_sequence(codes: &[u8]) -> Vec<u8> {
    codes.iter().rev().map(|&c| complement_code(c)).collect()
}

/// Maximum number of errors tolerated for a read of `len` bases.
///
/// `ceil(len * error_rate)`. The product is nudged down by a small epsilon
/// so that rates like 0.1 on a 100bp read give 10 and not 11.
#[inline]
pub fn max_errors(len: usize, error_rate: f64) -> usize {
    if error_rate <= 0.0 || len == 0 {
        return 0;
    }
    let errors = (len as f64 * error_rate - 1e-9).ceil();
    if errors <= 0.0 {
        0
    } else {
        (errors as usize).min(len)
    }
}

/// Strand of a contig scan
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Orientation {
    Forward,
    ReverseComplement,
}

impl Orientation {
    pub fn strand_char(self) -> char {
        match self {
            Orientation::Forward => 'F',
            Orientation::ReverseComplement => 'R',
        }
    }
}

impl fmt::Display for Orientation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Orientation::Forward => write!(f, "fwd"),
            Orientation::ReverseComplement => write!(f, "rev"),
        }
    }
}

/// Reference sequence
#[derive(Debug, Clone)]
pub struct Contig {
    pub id: usize,
    pub name: String,
    pub seq: Vec<u8>,
}

impl Contig {
    /// Build a contig from an ASCII sequence
    pub fn new(id: usize, name: impl Into<String>, ascii: &[u8]) -> Self {
        Self {
            id,
            name: name.into(),
            seq: encode_sequence(ascii),
        }
    }

    pub fn len(&self) -> usize {
        self.seq.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seq.is_empty()
    }

    /// Read-only view of this contig in the given orientation.
    ///
    /// The forward view borrows the stored sequence. The reverse view owns a
    /// freshly computed reverse complement, so the shared contig is never
    /// flipped in place while other passes might read it.
    pub fn view(&self, orientation: Orientation) -> ContigView<'_> {
        let seq = match orientation {
            Orientation::Forward => Cow::Borrowed(self.seq.as_slice()),
            Orientation::ReverseComplement => Cow::Owned(reverse_complement_sequence(&self.seq)),
        };
        ContigView {
            contig_id: self.id,
            orientation,
            seq,
        }
    }
}

/// One orientation of a contig as seen by a mapping pass
#[derive(Debug)]
pub struct ContigView<'a> {
    pub contig_id: usize,
    pub orientation: Orientation,
    seq: Cow<'a, [u8]>,
}

impl ContigView<'_> {
    pub fn seq(&self) -> &[u8] {
        &self.seq
    }

    pub fn len(&self) -> usize {
        self.seq.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seq.is_empty()
    }

    /// Convert a `[begin, end)` span in view coordinates to forward-strand
    /// coordinates.
    pub fn to_forward(&self, begin: usize, end: usize) -> (usize, usize) {
        match self.orientation {
            Orientation::Forward => (begin, end),
            Orientation::ReverseComplement => (self.len() - end, self.len() - begin),
        }
    }

    /// Mirror forward-strand excluded ranges into this view's coordinates.
    /// The result is sorted by begin position.
    pub fn map_ranges(&self, ranges: &[Range<usize>]) -> Vec<Range<usize>> {
        let len = self.len();
        let mut mapped: Vec<Range<usize>> = ranges
            .iter()
            .map(|r| {
                let (b, e) = (r.start.min(len), r.end.min(len));
                match self.orientation {
                    Orientation::Forward => b..e,
                    Orientation::ReverseComplement => (len - e)..(len - b),
                }
            })
            .filter(|r| !r.is_empty())
            .collect();
        mapped.sort_by_key(|r| (r.start, r.end));
        mapped
    }
}

/// Query sequence
#[derive(Debug, Clone)]
pub struct Read {
    pub id: usize,
    pub name: String,
    pub seq: Vec<u8>,
}

impl Read {
    /// Build a read from an ASCII sequence
    pub fn new(id: usize, name: impl Into<String>, ascii: &[u8]) -> Self {
        Self {
            id,
            name: name.into(),
            seq: encode_sequence(ascii),
        }
    }

    pub fn len(&self) -> usize {
        self.seq.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seq.is_empty()
    }
}

/// Build reads with ids `0..n` and names `read{i}` from ASCII sequences
pub fn reads_from_ascii<S: AsRef<[u8]>>(seqs: &[S]) -> Vec<Read> {
    seqs.iter()
        .enumerate()
        .map(|(i, s)| Read::new(i, format!("read{}", i), s.as_ref()))
        .collect()
}
