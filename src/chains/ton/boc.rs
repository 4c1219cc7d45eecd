//! Bag-of-cells serialization
//!
//! Only the generic `b5ee9c72` container with ordinary cells and a single root
//! is produced. Parsing accepts the optional index and CRC32C and rejects
//! references that do not point strictly forward, which rules out cycles.

use super::cell::{Cell, CellBuilder, MAX_REFS};
use crate::error::{Result, WasmWalletError};
use crate::primitives::bytes::{decode_base64, encode_base64};
use crate::primitives::checksum::crc32c;
use std::collections::HashMap;

const BOC_MAGIC: [u8; 4] = [0xb5, 0xee, 0x9c, 0x72];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BocOptions {
    pub has_idx: bool,
    pub has_crc32: bool,
}

impl Default for BocOptions {
    fn default() -> Self {
        BocOptions {
            has_idx: false,
            has_crc32: true,
        }
    }
}

fn bytes_for(value: usize) -> usize {
    let bits = usize::BITS - value.leading_zeros();
    (bits as usize).div_ceil(8).max(1)
}

fn write_uint(out: &mut Vec<u8>, value: usize, width: usize) {
    let bytes = (value as u64).to_be_bytes();
    out.extend_from_slice(&bytes[8 - width..]);
}

/// Parents before children; a cell reached again from a later parent moves to
/// the end together with its subtree
fn topological_order(root: &Cell) -> Vec<Cell> {
    fn move_to_end(order: &mut Vec<Cell>, index: &mut HashMap<[u8; 32], usize>, hash: [u8; 32]) {
        let Some(&target) = index.get(&hash) else {
            return;
        };
        for position in index.values_mut() {
            if *position > target {
                *position -= 1;
            }
        }
        let cell = order.remove(target);
        index.insert(hash, order.len());
        order.push(cell.clone());
        for child in cell.refs() {
            move_to_end(order, index, child.hash());
        }
    }

    fn walk(
        cell: &Cell,
        parent: Option<[u8; 32]>,
        order: &mut Vec<Cell>,
        index: &mut HashMap<[u8; 32], usize>,
    ) {
        let hash = cell.hash();
        if let Some(&seen) = index.get(&hash) {
            if let Some(parent) = parent {
                if index.get(&parent).is_some_and(|&p| p > seen) {
                    move_to_end(order, index, hash);
                }
            }
            return;
        }
        index.insert(hash, order.len());
        order.push(cell.clone());
        for child in cell.refs() {
            walk(child, Some(hash), order, index);
        }
    }

    let mut order = Vec::new();
    let mut index = HashMap::new();
    walk(root, None, &mut order, &mut index);
    order
}

pub fn serialize_boc(root: &Cell, options: BocOptions) -> Result<Vec<u8>> {
    let order = topological_order(root);
    let index: HashMap<[u8; 32], usize> = order
        .iter()
        .enumerate()
        .map(|(i, cell)| (cell.hash(), i))
        .collect();

    let cells_num = order.len();
    let size_bytes = bytes_for(cells_num);
    if size_bytes > 4 {
        return Err(WasmWalletError::overflow("too many cells for a bag of cells"));
    }

    let mut cells_data = Vec::new();
    let mut offsets = Vec::with_capacity(cells_num);
    for cell in &order {
        cells_data.push(cell.d1());
        cells_data.push(cell.d2());
        cells_data.extend_from_slice(&cell.padded_data());
        for child in cell.refs() {
            let child_index = index
                .get(&child.hash())
                .copied()
                .ok_or_else(|| WasmWalletError::overflow("child missing from cell order"))?;
            write_uint(&mut cells_data, child_index, size_bytes);
        }
        offsets.push(cells_data.len());
    }

    let full_size = cells_data.len();
    let offset_bytes = bytes_for(full_size);

    let mut out = Vec::with_capacity(full_size + 32);
    out.extend_from_slice(&BOC_MAGIC);
    out.push(
        (u8::from(options.has_idx) << 7) | (u8::from(options.has_crc32) << 6) | size_bytes as u8,
    );
    out.push(offset_bytes as u8);
    write_uint(&mut out, cells_num, size_bytes);
    write_uint(&mut out, 1, size_bytes);
    write_uint(&mut out, 0, size_bytes);
    write_uint(&mut out, full_size, offset_bytes);
    write_uint(&mut out, 0, size_bytes);
    if options.has_idx {
        for offset in offsets {
            write_uint(&mut out, offset, offset_bytes);
        }
    }
    out.extend_from_slice(&cells_data);
    if options.has_crc32 {
        let crc = crc32c(&out);
        out.extend_from_slice(&crc.to_le_bytes());
    }
    Ok(out)
}

pub fn to_boc(root: &Cell) -> Result<Vec<u8>> {
    serialize_boc(root, BocOptions::default())
}

pub fn to_boc_base64(root: &Cell) -> Result<String> {
    Ok(encode_base64(&to_boc(root)?))
}

struct Reader<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn take(&mut self, n: usize) -> Result<&'a [u8]> {
        let slice = self
            .pos
            .checked_add(n)
            .and_then(|end| self.bytes.get(self.pos..end))
            .ok_or_else(|| WasmWalletError::Validation("Truncated bag of cells".into()))?;
        self.pos += n;
        Ok(slice)
    }

    fn remaining(&self) -> usize {
        self.bytes.len().saturating_sub(self.pos)
    }

    fn uint(&mut self, width: usize) -> Result<usize> {
        Ok(self
            .take(width)?
            .iter()
            .fold(0usize, |acc, b| (acc << 8) | *b as usize))
    }
}

struct RawCell {
    data: Vec<u8>,
    bit_len: usize,
    refs: Vec<usize>,
}

fn invalid(msg: &str) -> WasmWalletError {
    WasmWalletError::Validation(format!("Invalid bag of cells: {}", msg))
}

/// Parse a BoC and return its first root
pub fn parse_boc(bytes: &[u8]) -> Result<Cell> {
    if bytes.len() < 4 || bytes[..4] != BOC_MAGIC {
        return Err(invalid("unknown magic"));
    }

    let mut reader = Reader { bytes, pos: 4 };
    let flags = reader.take(1)?[0];
    let has_idx = flags & 0x80 != 0;
    let has_crc32 = flags & 0x40 != 0;
    let size_bytes = (flags & 0x07) as usize;
    if !(1..=4).contains(&size_bytes) {
        return Err(invalid("ref size"));
    }
    let offset_bytes = reader.uint(1)?;
    if !(1..=8).contains(&offset_bytes) {
        return Err(invalid("offset size"));
    }

    if has_crc32 {
        if bytes.len() < 4 {
            return Err(invalid("missing crc"));
        }
        let (body, crc) = bytes.split_at(bytes.len() - 4);
        if crc32c(body).to_le_bytes() != crc {
            return Err(invalid("crc mismatch"));
        }
        reader.bytes = body;
    }

    let cells_num = reader.uint(size_bytes)?;
    let roots_num = reader.uint(size_bytes)?;
    let absent_num = reader.uint(size_bytes)?;
    let total_size = reader.uint(offset_bytes)?;
    if roots_num == 0 || absent_num != 0 || cells_num == 0 {
        return Err(invalid("unsupported root or absent counts"));
    }
    let root_index = reader.uint(size_bytes)?;
    for _ in 1..roots_num {
        reader.uint(size_bytes)?;
    }
    if root_index >= cells_num {
        return Err(invalid("root index out of range"));
    }
    if has_idx {
        let index_len = cells_num
            .checked_mul(offset_bytes)
            .ok_or_else(|| invalid("index size"))?;
        reader.take(index_len)?;
    }

    // every cell takes at least its two descriptor bytes
    if cells_num > reader.remaining() / 2 {
        return Err(invalid("cell count exceeds data"));
    }
    let data_end = reader
        .pos
        .checked_add(total_size)
        .ok_or_else(|| invalid("data size"))?;
    let mut raw_cells = Vec::with_capacity(cells_num);
    for current in 0..cells_num {
        let d1 = reader.take(1)?[0];
        let d2 = reader.take(1)?[0] as usize;
        if d1 & 0b1111_1000 != 0 {
            return Err(WasmWalletError::unsupported(
                "exotic cells, levels and stored hashes",
            ));
        }
        let refs_count = (d1 & 0x07) as usize;
        if refs_count > MAX_REFS {
            return Err(invalid("too many refs"));
        }
        let data_len = d2.div_ceil(2);
        let mut data = reader.take(data_len)?.to_vec();
        let bit_len = if d2 % 2 == 0 {
            data_len * 8
        } else {
            let last = data.last_mut().ok_or_else(|| invalid("empty padded data"))?;
            if *last == 0 {
                return Err(invalid("missing completion tag"));
            }
            let tag_pos = last.trailing_zeros() as usize;
            *last &= !(1u8 << tag_pos);
            data_len * 8 - tag_pos - 1
        };
        let mut refs = Vec::with_capacity(refs_count);
        for _ in 0..refs_count {
            let r = reader.uint(size_bytes)?;
            if r <= current {
                return Err(invalid("reference does not point forward (cycle)"));
            }
            if r >= cells_num {
                return Err(invalid("reference out of range"));
            }
            refs.push(r);
        }
        raw_cells.push(RawCell {
            data,
            bit_len,
            refs,
        });
    }
    if reader.pos != data_end {
        return Err(invalid("cell data size mismatch"));
    }

    let mut built: Vec<Option<Cell>> = vec![None; cells_num];
    for (i, raw) in raw_cells.iter().enumerate().rev() {
        let mut b = CellBuilder::new();
        b.store_bits(&raw.data, raw.bit_len)?;
        for r in &raw.refs {
            let child = built[*r].clone().ok_or_else(|| invalid("unresolved reference"))?;
            b.store_ref(child)?;
        }
        built[i] = Some(b.build()?);
    }
    built[root_index]
        .take()
        .ok_or_else(|| invalid("unresolved root"))
}

pub fn parse_boc_base64(value: &str) -> Result<Cell> {
    parse_boc(&decode_base64(value)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_tree() -> Cell {
        let mut leaf = CellBuilder::new();
        leaf.store_uint(0xabc, 12).unwrap();
        let leaf = leaf.build().unwrap();

        let mut mid = CellBuilder::new();
        mid.store_uint(1, 1).unwrap().store_ref(leaf.clone()).unwrap();
        let mid = mid.build().unwrap();

        let mut root = CellBuilder::new();
        root.store_uint(0xdeadbeef, 32)
            .unwrap()
            .store_ref(mid)
            .unwrap()
            .store_ref(leaf)
            .unwrap();
        root.build().unwrap()
    }

    #[test]
    fn test_empty_cell_boc() {
        let boc = to_boc(&Cell::empty()).unwrap();
        assert_eq!(hex::encode(&boc), "b5ee9c724101010100020000004cacb9cd");
        assert_eq!(to_boc_base64(&Cell::empty()).unwrap(), "te6cckEBAQEAAgAAAEysuc0=");
        assert_eq!(parse_boc(&boc).unwrap(), Cell::empty());
    }

    #[test]
    fn test_shared_child_moves_after_deepest_parent() {
        let root = sample_tree();
        let order = topological_order(&root);
        assert_eq!(order.len(), 3);
        // root, mid, leaf: the leaf is first reached through mid
        assert_eq!(order[0], root);
        assert_eq!(order[1].bit_len(), 1);
        assert_eq!(order[2].bit_len(), 12);
    }

    #[test]
    fn test_roundtrip_with_index() {
        let root = sample_tree();
        for options in [
            BocOptions::default(),
            BocOptions {
                has_idx: true,
                has_crc32: false,
            },
        ] {
            let boc = serialize_boc(&root, options).unwrap();
            let parsed = parse_boc(&boc).unwrap();
            assert_eq!(parsed.hash(), root.hash());
            assert_eq!(parsed.depth(), 2);
        }
        let b64 = to_boc_base64(&root).unwrap();
        assert_eq!(parse_boc_base64(&b64).unwrap(), root);
    }

    #[test]
    fn test_rejects_corruption() {
        let mut boc = to_boc(&sample_tree()).unwrap();
        let last = boc.len() - 5;
        boc[last] ^= 0x01;
        assert!(parse_boc(&boc).is_err());
        assert!(parse_boc(&[0u8; 8]).is_err());
    }

    #[test]
    fn test_rejects_hostile_cell_count() {
        // 0x7fffffff cells declared in a 23-byte container
        let bytes = hex::decode("b5ee9c7204017fffffff00000001000000000000000000").unwrap();
        assert!(matches!(
            parse_boc(&bytes),
            Err(WasmWalletError::Validation(_))
        ));

        // total data size at the top of the offset range
        let bytes = hex::decode(
            "b5ee9c720408000000010000000100000000ffffffffffffffff000000000000",
        )
        .unwrap();
        assert!(parse_boc(&bytes).is_err());
    }

    #[test]
    fn test_rejects_oversized_index() {
        // indexed, 8-byte offsets, about a billion cells
        let mut bytes = hex::decode("b5ee9c728408").unwrap();
        bytes.extend_from_slice(&[0x3f, 0xff, 0xff, 0xff]);
        bytes.extend_from_slice(&[0, 0, 0, 1, 0, 0, 0, 0]);
        bytes.extend_from_slice(&[0; 8]);
        bytes.extend_from_slice(&[0, 0, 0, 0]);
        assert!(parse_boc(&bytes).is_err());
    }

    #[test]
    fn test_rejects_truncated_header() {
        let bytes = hex::decode("b5ee9c720401").unwrap();
        assert!(parse_boc(&bytes).is_err());
    }

    #[test]
    fn test_rejects_backward_reference() {
        // two cells, the second referencing the first
        let boc = [
            0xb5, 0xee, 0x9c, 0x72, 0x01, 0x01, 0x02, 0x01, 0x00, 0x05, 0x00, // header
            0x00, 0x00, // cell 0: no refs, no data
            0x01, 0x00, 0x00, // cell 1: one ref to cell 0
        ];
        let err = parse_boc(&boc).unwrap_err();
        assert!(err.to_string().contains("cycle"));

        let self_ref = [
            0xb5, 0xee, 0x9c, 0x72, 0x01, 0x01, 0x01, 0x01, 0x00, 0x03, 0x00, 0x01, 0x00, 0x00,
        ];
        assert!(parse_boc(&self_ref).is_err());
    }
}
