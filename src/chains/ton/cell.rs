//! Ordinary TON cells
//!
//! A cell holds up to 1023 data bits and up to 4 references. Builders are
//! consumed by [`CellBuilder::build`]; the resulting [`Cell`] is immutable and
//! shares its children, so DAGs are cheap to clone.

use super::address::TonAddress;
use crate::error::{Result, WasmWalletError};
use sha2::{Digest, Sha256};
use std::fmt;
use std::sync::Arc;

pub const MAX_BITS: usize = 1023;
pub const MAX_REFS: usize = 4;
/// Coins are `VarUInteger 16`: a 4-bit byte length, so at most 15 bytes
const MAX_COIN_BYTES: usize = 15;

struct CellInner {
    data: Vec<u8>,
    bit_len: usize,
    refs: Vec<Cell>,
    hash: [u8; 32],
    depth: u16,
}

/// Immutable, reference-counted cell
#[derive(Clone)]
pub struct Cell(Arc<CellInner>);

impl Cell {
    /// A cell with no bits and no refs
    pub fn empty() -> Cell {
        // cannot overflow
        CellBuilder::new().finish()
    }

    pub fn bit_len(&self) -> usize {
        self.0.bit_len
    }

    /// Data bytes, the last one zero-padded when `bit_len` is not a multiple of 8
    pub fn data(&self) -> &[u8] {
        &self.0.data
    }

    pub fn refs(&self) -> &[Cell] {
        &self.0.refs
    }

    pub fn hash(&self) -> [u8; 32] {
        self.0.hash
    }

    pub fn depth(&self) -> u16 {
        self.0.depth
    }

    /// Refs descriptor; level and exotic bits are always zero here
    pub(crate) fn d1(&self) -> u8 {
        self.0.refs.len() as u8
    }

    /// Bits descriptor: `floor(b / 8) + ceil(b / 8)`
    pub(crate) fn d2(&self) -> u8 {
        let b = self.0.bit_len;
        (b / 8 + b.div_ceil(8)) as u8
    }

    /// Data with the completion tag applied to an incomplete last byte
    pub(crate) fn padded_data(&self) -> Vec<u8> {
        padded(&self.0.data, self.0.bit_len)
    }

    /// Read-only cursor over the cell's bits and refs
    pub fn parse(&self) -> CellSlice<'_> {
        CellSlice {
            cell: self,
            bit_pos: 0,
            ref_pos: 0,
        }
    }
}

impl PartialEq for Cell {
    fn eq(&self, other: &Self) -> bool {
        self.0.hash == other.0.hash
    }
}

impl Eq for Cell {}

impl fmt::Debug for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Cell")
            .field("bits", &self.0.bit_len)
            .field("refs", &self.0.refs.len())
            .field("hash", &hex::encode(self.0.hash))
            .finish()
    }
}

fn padded(data: &[u8], bit_len: usize) -> Vec<u8> {
    let mut out = data[..bit_len.div_ceil(8)].to_vec();
    if bit_len % 8 != 0 {
        if let Some(last) = out.last_mut() {
            *last |= 0x80 >> (bit_len % 8);
        }
    }
    out
}

fn representation_hash(data: &[u8], bit_len: usize, refs: &[Cell]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update([refs.len() as u8, (bit_len / 8 + bit_len.div_ceil(8)) as u8]);
    hasher.update(padded(data, bit_len));
    for r in refs {
        hasher.update(r.depth().to_be_bytes());
    }
    for r in refs {
        hasher.update(r.hash());
    }
    hasher.finalize().into()
}

/// Accumulates bits and refs for a new cell
#[derive(Debug, Clone, Default)]
pub struct CellBuilder {
    data: Vec<u8>,
    bit_len: usize,
    refs: Vec<Cell>,
}

impl CellBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn refs_used(&self) -> usize {
        self.refs.len()
    }

    pub fn available_bits(&self) -> usize {
        MAX_BITS - self.bit_len
    }

    fn ensure_bits(&self, n: usize) -> Result<()> {
        if n > self.available_bits() {
            return Err(WasmWalletError::overflow(format!(
                "cell bits exceeded: {} + {} > {}",
                self.bit_len, n, MAX_BITS
            )));
        }
        Ok(())
    }

    fn push_bit(&mut self, bit: bool) {
        if self.bit_len % 8 == 0 {
            self.data.push(0);
        }
        if bit {
            let last = self.data.len() - 1;
            self.data[last] |= 0x80 >> (self.bit_len % 8);
        }
        self.bit_len += 1;
    }

    pub fn store_bit(&mut self, bit: bool) -> Result<&mut Self> {
        self.ensure_bits(1)?;
        self.push_bit(bit);
        Ok(self)
    }

    /// Store the first `bit_len` bits of `bytes`, most significant first
    pub fn store_bits(&mut self, bytes: &[u8], bit_len: usize) -> Result<&mut Self> {
        if bit_len > bytes.len() * 8 {
            return Err(WasmWalletError::overflow("bit length exceeds source bytes"));
        }
        self.ensure_bits(bit_len)?;
        if self.bit_len % 8 == 0 && bit_len % 8 == 0 {
            self.data.extend_from_slice(&bytes[..bit_len / 8]);
            self.bit_len += bit_len;
        } else {
            for i in 0..bit_len {
                self.push_bit(bytes[i / 8] & (0x80 >> (i % 8)) != 0);
            }
        }
        Ok(self)
    }

    pub fn store_bytes(&mut self, bytes: &[u8]) -> Result<&mut Self> {
        self.store_bits(bytes, bytes.len() * 8)
    }

    /// Unsigned big-endian integer in exactly `bits` bits
    pub fn store_uint(&mut self, value: u128, bits: usize) -> Result<&mut Self> {
        if bits > 128 || (bits < 128 && value >> bits != 0) {
            return Err(WasmWalletError::overflow(format!(
                "{} does not fit in {} bits",
                value, bits
            )));
        }
        self.ensure_bits(bits)?;
        for i in (0..bits).rev() {
            self.push_bit((value >> i) & 1 == 1);
        }
        Ok(self)
    }

    /// Two's complement integer in exactly `bits` bits
    pub fn store_int(&mut self, value: i64, bits: usize) -> Result<&mut Self> {
        if bits == 0 || bits > 64 {
            return Err(WasmWalletError::overflow(format!("invalid int width {}", bits)));
        }
        let min = -(1i128 << (bits - 1));
        let max = (1i128 << (bits - 1)) - 1;
        if (value as i128) < min || (value as i128) > max {
            return Err(WasmWalletError::overflow(format!(
                "{} does not fit in {} signed bits",
                value, bits
            )));
        }
        let raw = (value as u64 as u128) & ((1u128 << bits) - 1);
        self.store_uint(raw, bits)
    }

    /// `VarUInteger 16` amount in nanotons
    pub fn store_coins(&mut self, amount: u128) -> Result<&mut Self> {
        let len = (128 - amount.leading_zeros() as usize).div_ceil(8);
        if len > MAX_COIN_BYTES {
            return Err(WasmWalletError::overflow(format!(
                "coin amount {} exceeds 120 bits",
                amount
            )));
        }
        self.store_uint(len as u128, 4)?;
        self.store_uint(amount, len * 8)
    }

    /// `MsgAddress`: `addr_none` for `None`, `addr_std` otherwise
    pub fn store_address(&mut self, address: Option<&TonAddress>) -> Result<&mut Self> {
        match address {
            None => self.store_uint(0, 2),
            Some(address) => {
                let workchain = i8::try_from(address.workchain).map_err(|_| {
                    WasmWalletError::overflow(format!("workchain {} exceeds int8", address.workchain))
                })?;
                self.store_uint(0b100, 3)?;
                self.store_int(workchain as i64, 8)?;
                self.store_bytes(&address.hash)
            }
        }
    }

    pub fn store_ref(&mut self, cell: Cell) -> Result<&mut Self> {
        if self.refs.len() >= MAX_REFS {
            return Err(WasmWalletError::overflow(format!(
                "cell refs exceeded: at most {}",
                MAX_REFS
            )));
        }
        self.refs.push(cell);
        Ok(self)
    }

    /// `Maybe ^Cell`
    pub fn store_maybe_ref(&mut self, cell: Option<Cell>) -> Result<&mut Self> {
        match cell {
            Some(cell) => {
                self.store_bit(true)?;
                self.store_ref(cell)
            }
            None => self.store_bit(false),
        }
    }

    /// Append another cell's bits and refs inline
    pub fn store_slice(&mut self, cell: &Cell) -> Result<&mut Self> {
        if self.refs.len() + cell.refs().len() > MAX_REFS {
            return Err(WasmWalletError::overflow("cell refs exceeded while inlining"));
        }
        self.store_bits(cell.data(), cell.bit_len())?;
        self.refs.extend(cell.refs().iter().cloned());
        Ok(self)
    }

    /// Append another builder's bits and refs inline
    pub fn store_builder(&mut self, other: &CellBuilder) -> Result<&mut Self> {
        if self.refs.len() + other.refs.len() > MAX_REFS {
            return Err(WasmWalletError::overflow("cell refs exceeded while inlining"));
        }
        self.store_bits(&other.data, other.bit_len)?;
        self.refs.extend(other.refs.iter().cloned());
        Ok(self)
    }

    pub fn build(self) -> Result<Cell> {
        if self.bit_len > MAX_BITS || self.refs.len() > MAX_REFS {
            return Err(WasmWalletError::overflow("cell capacity exceeded"));
        }
        Ok(self.finish())
    }

    fn finish(self) -> Cell {
        let depth = self
            .refs
            .iter()
            .map(|r| r.depth() + 1)
            .max()
            .unwrap_or(0);
        let hash = representation_hash(&self.data, self.bit_len, &self.refs);
        Cell(Arc::new(CellInner {
            data: self.data,
            bit_len: self.bit_len,
            refs: self.refs,
            hash,
            depth,
        }))
    }
}

/// Cursor for reading a cell back
#[derive(Debug, Clone)]
pub struct CellSlice<'a> {
    cell: &'a Cell,
    bit_pos: usize,
    ref_pos: usize,
}

impl<'a> CellSlice<'a> {
    pub fn remaining_bits(&self) -> usize {
        self.cell.bit_len() - self.bit_pos
    }

    pub fn remaining_refs(&self) -> usize {
        self.cell.refs().len() - self.ref_pos
    }

    pub fn load_bit(&mut self) -> Result<bool> {
        if self.remaining_bits() == 0 {
            return Err("cell underflow".into());
        }
        let bit = self.cell.data()[self.bit_pos / 8] & (0x80 >> (self.bit_pos % 8)) != 0;
        self.bit_pos += 1;
        Ok(bit)
    }

    pub fn load_uint(&mut self, bits: usize) -> Result<u128> {
        if bits > 128 {
            return Err(WasmWalletError::overflow(format!("cannot load {} bits as uint", bits)));
        }
        if bits > self.remaining_bits() {
            return Err("cell underflow".into());
        }
        let mut value = 0u128;
        for _ in 0..bits {
            value = (value << 1) | self.load_bit()? as u128;
        }
        Ok(value)
    }

    pub fn load_int(&mut self, bits: usize) -> Result<i64> {
        if bits == 0 || bits > 64 {
            return Err(WasmWalletError::overflow(format!("invalid int width {}", bits)));
        }
        let raw = self.load_uint(bits)? as u64;
        let shift = 64 - bits;
        Ok(((raw << shift) as i64) >> shift)
    }

    pub fn load_bytes(&mut self, len: usize) -> Result<Vec<u8>> {
        (0..len)
            .map(|_| -> Result<u8> { Ok(self.load_uint(8)? as u8) })
            .collect()
    }

    pub fn load_coins(&mut self) -> Result<u128> {
        let len = self.load_uint(4)? as usize;
        self.load_uint(len * 8)
    }

    pub fn load_address(&mut self) -> Result<Option<TonAddress>> {
        match self.load_uint(2)? {
            0b00 => Ok(None),
            0b10 => {
                if self.load_bit()? {
                    return Err(WasmWalletError::unsupported("anycast addresses"));
                }
                let workchain = self.load_int(8)? as i32;
                let hash: [u8; 32] = self
                    .load_bytes(32)?
                    .try_into()
                    .map_err(|_| WasmWalletError::Validation("address hash".into()))?;
                Ok(Some(TonAddress { workchain, hash }))
            }
            other => Err(WasmWalletError::unsupported(format!(
                "address tag {:02b}",
                other
            ))),
        }
    }

    pub fn load_ref(&mut self) -> Result<&'a Cell> {
        let cell = self
            .cell
            .refs()
            .get(self.ref_pos)
            .ok_or_else(|| WasmWalletError::Validation("cell has no more refs".into()))?;
        self.ref_pos += 1;
        Ok(cell)
    }

    pub fn load_maybe_ref(&mut self) -> Result<Option<&'a Cell>> {
        if self.load_bit()? {
            Ok(Some(self.load_ref()?))
        } else {
            Ok(None)
        }
    }

    /// Whole bytes of a snake-encoded string starting here, following refs
    pub fn load_snake_bytes(&mut self) -> Result<Vec<u8>> {
        let mut out = self.load_bytes(self.remaining_bits() / 8)?;
        let mut next = if self.remaining_refs() > 0 {
            Some(self.load_ref()?)
        } else {
            None
        };
        while let Some(cell) = next {
            let mut slice = cell.parse();
            out.extend(slice.load_bytes(slice.remaining_bits() / 8)?);
            next = cell.refs().first();
        }
        Ok(out)
    }
}

/// Bytes split across a chain of cells, each continuing in its first ref
pub fn snake_cell(prefix: &CellBuilder, bytes: &[u8]) -> Result<Cell> {
    let first_capacity = prefix.available_bits() / 8;
    let tail_capacity = MAX_BITS / 8;
    let (head, rest) = bytes.split_at(first_capacity.min(bytes.len()));

    let mut tail: Option<Cell> = None;
    let chunks: Vec<&[u8]> = rest.chunks(tail_capacity).collect();
    for chunk in chunks.into_iter().rev() {
        let mut b = CellBuilder::new();
        b.store_bytes(chunk)?;
        if let Some(next) = tail.take() {
            b.store_ref(next)?;
        }
        tail = Some(b.build()?);
    }

    let mut b = prefix.clone();
    b.store_bytes(head)?;
    if let Some(next) = tail {
        b.store_ref(next)?;
    }
    b.build()
}
