use std::collections::BTreeMap;

use tracing::debug;

use crate::codec::decode;
use crate::error::{CodecError, Result};
use crate::types::{BaseType, WordOrder};
use crate::value::{TypedValue, Value};

/// Sparse holding-register memory.
///
/// Multi-register values occupy consecutive addresses starting at their base
/// address, in the order the codec produced them. Registers never written
/// read back as zero.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RegisterMap {
    registers: BTreeMap<u16, u16>,
}

impl RegisterMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store the encoded words of `value` starting at `address`.
    pub fn write_value(&mut self, address: u16, value: &TypedValue) -> Result<()> {
        self.write_words(address, &value.encode())
    }

    /// Store raw words starting at `address`.
    pub fn write_words(&mut self, address: u16, words: &[u16]) -> Result<()> {
        check_span(address, words.len())?;
        for (offset, word) in words.iter().enumerate() {
            self.registers.insert(address + offset as u16, *word);
        }
        debug!(address, count = words.len(), "wrote registers");
        Ok(())
    }

    /// Read `count` consecutive words starting at `address`.
    pub fn read_words(&self, address: u16, count: usize) -> Result<Vec<u16>> {
        check_span(address, count)?;
        Ok((0..count)
            .map(|offset| self.get(address + offset as u16))
            .collect())
    }

    /// Decode the value of `base_type` stored at `address`.
    pub fn read_value(&self, address: u16, base_type: BaseType, word_order: WordOrder) -> Result<Value> {
        let words = self.read_words(address, base_type.register_count())?;
        decode(&words, base_type, word_order)
    }

    /// A single register, zero when never written.
    pub fn get(&self, address: u16) -> u16 {
        self.registers.get(&address).copied().unwrap_or(0)
    }

    /// Number of registers that have been written.
    pub fn len(&self) -> usize {
        self.registers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.registers.is_empty()
    }

    pub fn clear(&mut self) {
        self.registers.clear();
    }

    /// Written registers in address order.
    pub fn iter(&self) -> impl Iterator<Item = (u16, u16)> + '_ {
        self.registers.iter().map(|(addr, word)| (*addr, *word))
    }
}

fn check_span(address: u16, count: usize) -> Result<()> {
    let last = usize::from(address) + count.saturating_sub(1);
    if last > usize::from(u16::MAX) {
        return Err(CodecError::AddressOverflow { address, count });
    }
    Ok(())
}
