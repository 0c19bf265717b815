//! Reader and writer for FAISS `IndexFlat` files.
//!
//! Layout (little endian): fourcc, `d: i32`, `ntotal: i64`, two `i64`
//! placeholders, `is_trained: u8`, `metric_type: i32`, `metric_arg: f32` when
//! `metric_type > 1`, then a `u64` float count and `ntotal * d` floats.

use crate::error::StorageError;
use std::fmt;
use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;
use tracing::debug;

const FOURCC_INNER_PRODUCT: &[u8; 4] = b"IxFI";
const FOURCC_L2: &[u8; 4] = b"IxF2";
const FOURCC_OTHER: &[u8; 4] = b"IxFl";
const HEADER_DUMMY: i64 = 1 << 20;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Metric {
    InnerProduct,
    L2,
    Other(i32, Option<f32>),
}

impl Metric {
    fn code(&self) -> i32 {
        match self {
            Metric::InnerProduct => 0,
            Metric::L2 => 1,
            Metric::Other(code, _) => *code,
        }
    }

    fn fourcc(&self) -> &'static [u8; 4] {
        match self {
            Metric::InnerProduct => FOURCC_INNER_PRODUCT,
            Metric::L2 => FOURCC_L2,
            Metric::Other(..) => FOURCC_OTHER,
        }
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Metric::InnerProduct => f.write_str("inner_product"),
            Metric::L2 => f.write_str("l2"),
            Metric::Other(code, None) => write!(f, "metric({})", code),
            Metric::Other(code, Some(arg)) => write!(f, "metric({}, {})", code, arg),
        }
    }
}

/// Raw rows of a flat index, row-major.
#[derive(Debug, Clone)]
pub struct FlatVectors {
    pub dimension: usize,
    pub metric: Metric,
    pub data: Vec<f32>,
}

impl FlatVectors {
    pub fn len(&self) -> usize {
        if self.dimension == 0 {
            0
        } else {
            self.data.len() / self.dimension
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn rows(&self) -> impl Iterator<Item = &[f32]> {
        self.data.chunks_exact(self.dimension.max(1))
    }
}

pub fn load_flat_index(path: &Path) -> Result<FlatVectors, StorageError> {
    let file = File::open(path)?;
    let vectors = read_flat_index(BufReader::new(file))?;
    debug!(
        path = %path.display(),
        rows = vectors.len(),
        dimension = vectors.dimension,
        "read flat index"
    );
    Ok(vectors)
}

pub fn read_flat_index<R: Read>(mut r: R) -> Result<FlatVectors, StorageError> {
    let mut fourcc = [0u8; 4];
    r.read_exact(&mut fourcc)?;
    if ![FOURCC_INNER_PRODUCT, FOURCC_L2, FOURCC_OTHER].contains(&&fourcc) {
        return Err(StorageError::UnsupportedIndex(
            String::from_utf8_lossy(&fourcc).into_owned(),
        ));
    }

    let d = read_i32(&mut r)?;
    let ntotal = read_i64(&mut r)?;
    let _ = read_i64(&mut r)?;
    let _ = read_i64(&mut r)?;
    let _is_trained = read_u8(&mut r)?;
    let metric_code = read_i32(&mut r)?;
    let metric = match metric_code {
        0 => Metric::InnerProduct,
        1 => Metric::L2,
        code => {
            let arg = if code > 1 { Some(read_f32(&mut r)?) } else { None };
            Metric::Other(code, arg)
        }
    };

    if d <= 0 {
        return Err(StorageError::CorruptIndex(format!("dimension {}", d)));
    }
    if ntotal < 0 {
        return Err(StorageError::CorruptIndex(format!("ntotal {}", ntotal)));
    }
    let dimension = d as usize;
    let expected = dimension
        .checked_mul(ntotal as usize)
        .ok_or_else(|| StorageError::CorruptIndex("size overflow".into()))?;

    let count = read_u64(&mut r)? as usize;
    if count != expected {
        return Err(StorageError::CorruptIndex(format!(
            "expected {} floats, header says {}",
            expected, count
        )));
    }

    let byte_len = expected
        .checked_mul(4)
        .ok_or_else(|| StorageError::CorruptIndex("size overflow".into()))?;
    let mut raw = Vec::new();
    r.by_ref().take(byte_len as u64).read_to_end(&mut raw)?;
    if raw.len() != byte_len {
        return Err(StorageError::CorruptIndex(format!(
            "truncated vector data: {} of {} bytes",
            raw.len(),
            byte_len
        )));
    }
    let data = raw
        .chunks_exact(4)
        .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
        .collect();

    Ok(FlatVectors {
        dimension,
        metric,
        data,
    })
}

pub fn save_flat_index(path: &Path, vectors: &FlatVectors) -> Result<(), StorageError> {
    let mut w = BufWriter::new(File::create(path)?);
    write_flat_index(&mut w, vectors)?;
    w.flush()?;
    Ok(())
}

pub fn write_flat_index<W: Write>(w: &mut W, vectors: &FlatVectors) -> Result<(), StorageError> {
    if vectors.dimension == 0 || vectors.data.len() % vectors.dimension != 0 {
        return Err(StorageError::CorruptIndex(format!(
            "{} floats do not fill rows of {}",
            vectors.data.len(),
            vectors.dimension
        )));
    }
    w.write_all(vectors.metric.fourcc())?;
    w.write_all(&(vectors.dimension as i32).to_le_bytes())?;
    w.write_all(&(vectors.len() as i64).to_le_bytes())?;
    w.write_all(&HEADER_DUMMY.to_le_bytes())?;
    w.write_all(&HEADER_DUMMY.to_le_bytes())?;
    w.write_all(&[1u8])?;
    w.write_all(&vectors.metric.code().to_le_bytes())?;
    if let Metric::Other(code, arg) = vectors.metric {
        if code > 1 {
            w.write_all(&arg.unwrap_or(0.0).to_le_bytes())?;
        }
    }
    w.write_all(&(vectors.data.len() as u64).to_le_bytes())?;
    for x in &vectors.data {
        w.write_all(&x.to_le_bytes())?;
    }
    Ok(())
}

fn read_u8<R: Read>(r: &mut R) -> Result<u8, StorageError> {
    let mut b = [0u8; 1];
    r.read_exact(&mut b)?;
    Ok(b[0])
}

fn read_i32<R: Read>(r: &mut R) -> Result<i32, StorageError> {
    let mut b = [0u8; 4];
    r.read_exact(&mut b)?;
    Ok(i32::from_le_bytes(b))
}

fn read_f32<R: Read>(r: &mut R) -> Result<f32, StorageError> {
    let mut b = [0u8; 4];
    r.read_exact(&mut b)?;
    Ok(f32::from_le_bytes(b))
}

fn read_i64<R: Read>(r: &mut R) -> Result<i64, StorageError> {
    let mut b = [0u8; 8];
    r.read_exact(&mut b)?;
    Ok(i64::from_le_bytes(b))
}

fn read_u64<R: Read>(r: &mut R) -> Result<u64, StorageError> {
    let mut b = [0u8; 8];
    r.read_exact(&mut b)?;
    Ok(u64::from_le_bytes(b))
}
