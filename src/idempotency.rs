use sha2::{Digest, Sha256};

use crate::types::RawTable;

const UNIT_SEP: u8 = 0x1f;
const RECORD_SEP: u8 = 0x1e;
const TABLE_SEP: u8 = 0x1d;

/// SHA-256 over the raw input tables, hex encoded.
///
/// Covers source ids, headers and every cell in order, with separator bytes between
/// cells, rows and tables so shifted boundaries hash differently.
pub fn compute_input_digest(tables: &[RawTable]) -> String {
    let mut hasher = Sha256::new();
    for table in tables {
        hasher.update(table.source_id.as_bytes());
        hasher.update([RECORD_SEP]);
        for row in std::iter::once(&table.headers).chain(&table.rows) {
            for cell in row {
                hasher.update(cell.as_bytes());
                hasher.update([UNIT_SEP]);
            }
            hasher.update([RECORD_SEP]);
        }
        hasher.update([TABLE_SEP]);
    }
    hex::encode(hasher.finalize())
}
