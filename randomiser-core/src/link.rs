//! Memory-address protocol spoken with a running game. Transport is left to
//! whoever implements [`EmulatorMemory`].

use std::collections::BTreeSet;

use log::{debug, info};

use crate::items::GOAL_LOCATION;
use crate::layout::*;
use crate::{RandomiserError, Result};

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum MemoryDomain {
    Rom,
    Ewram,
}

pub trait EmulatorMemory {
    fn read(&mut self, domain: MemoryDomain, addr: u32, len: usize) -> Result<Vec<u8>>;
    fn write(&mut self, domain: MemoryDomain, addr: u32, bytes: &[u8]) -> Result<()>;
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum RomStatus {
    /// Not this game at all.
    Foreign,
    /// The right game, but no slot name has been written into it.
    Unpatched,
    Patched { slot_name: String },
}

fn strip_nul(bytes: &[u8]) -> Vec<u8> {
    bytes.iter().copied().filter(|b| *b != 0).collect()
}

pub fn validate_rom<M: EmulatorMemory>(mem: &mut M) -> Result<RomStatus> {
    let raw = mem.read(MemoryDomain::Rom, ROM_NAME_OFFS as u32, ROM_NAME_SIZE)?;
    let Ok(name) = String::from_utf8(strip_nul(&raw)) else {
        return Ok(RomStatus::Foreign);
    };
    if !name.starts_with(ROM_NAME_PREFIX) {
        return Ok(RomStatus::Foreign);
    }
    if name != VANILLA_ROM_NAME {
        info!("unsupported revision {name}");
        return Ok(RomStatus::Foreign);
    }
    match read_slot_name(mem)? {
        Some(slot_name) => Ok(RomStatus::Patched { slot_name }),
        None => {
            info!("ROM has no slot name; generate a package and apply it first");
            Ok(RomStatus::Unpatched)
        }
    }
}

pub fn read_slot_name<M: EmulatorMemory>(mem: &mut M) -> Result<Option<String>> {
    let raw = mem.read(MemoryDomain::Rom, SLOT_NAME_OFFS as u32, SLOT_NAME_SIZE)?;
    let name = String::from_utf8(strip_nul(&raw))
        .map_err(|e| RandomiserError::Patch(format!("slot name is not UTF-8: {e}")))?;
    Ok((!name.is_empty()).then_some(name))
}

/// Bit `i` of the flag field is location `i`.
pub fn checked_locations(flags: &[u8]) -> BTreeSet<u16> {
    let mut out = BTreeSet::new();
    for (byte_i, byte) in flags.iter().enumerate() {
        for bit in 0..8 {
            if byte & (1 << bit) != 0 {
                out.insert((byte_i * 8 + bit) as u16);
            }
        }
    }
    out
}

#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct LinkStatus {
    pub new_checks: BTreeSet<u16>,
    pub delivered: Option<u16>,
    pub goal: bool,
}

#[derive(Clone, Debug, Default)]
pub struct LinkSession {
    /// Host-side list of received item ids, in order.
    pub received: Vec<u16>,
    checked: BTreeSet<u16>,
}

impl LinkSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn checked(&self) -> &BTreeSet<u16> {
        &self.checked
    }

    /// Hands the game its next item if the mailbox is empty and the game is
    /// behind. Only call this while the game is in a state that reads it.
    pub fn deliver_next_item<M: EmulatorMemory>(&self, mem: &mut M) -> Result<Option<u16>> {
        let filled = mem.read(MemoryDomain::Ewram, ARCHIPELAGO_RECEIVED_ITEM_ADDR + 2, 1)?;
        if filled.first().copied().unwrap_or(0) != 0 {
            return Ok(None);
        }
        let count = mem.read(MemoryDomain::Ewram, ARCHIPELAGO_NUM_RECEIVED_ITEMS_ADDR, 4)?;
        let count = match count[..] {
            [a, b, c, d] => u32::from_le_bytes([a, b, c, d]) as usize,
            _ => return Err(RandomiserError::Patch("short read of item counter".to_string())),
        };
        let Some(&item) = self.received.get(count) else {
            return Ok(None);
        };
        mem.write(
            MemoryDomain::Ewram,
            ARCHIPELAGO_RECEIVED_ITEM_ADDR,
            &item.to_le_bytes(),
        )?;
        mem.write(MemoryDomain::Ewram, ARCHIPELAGO_RECEIVED_ITEM_ADDR + 2, &[1])?;
        debug!("delivered item {item} as #{count}");
        Ok(Some(item))
    }

    pub fn poll<M: EmulatorMemory>(&mut self, mem: &mut M, deliver: bool) -> Result<LinkStatus> {
        let delivered = if deliver {
            self.deliver_next_item(mem)?
        } else {
            None
        };

        let flags = mem.read(MemoryDomain::Ewram, FLAGS_OFFSET, FLAGS_SIZE)?;
        let checked = checked_locations(&flags);
        let new_checks: BTreeSet<u16> = checked.difference(&self.checked).copied().collect();
        let goal = checked.contains(&GOAL_LOCATION);
        if !new_checks.is_empty() {
            info!("{} new location checks", new_checks.len());
        }
        self.checked = checked;

        Ok(LinkStatus {
            new_checks,
            delivered,
            goal,
        })
    }
}
