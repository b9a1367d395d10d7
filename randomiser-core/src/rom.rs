use std::path::Path;

use crate::layout::{COORD_FLAGS_MASK, COORD_MASK, ROM_BASE_ADDRESS};
use crate::{RandomiserError, Result};

/// Owned, bounds-checked view of a full ROM image.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Rom {
    pub data: Vec<u8>,
}

impl Rom {
    pub fn new(data: Vec<u8>) -> Self {
        Rom { data }
    }

    pub fn load(path: &Path) -> Result<Self> {
        let data = std::fs::read(path)?;
        Ok(Rom::new(data))
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    fn check(&self, addr: usize, len: usize) -> Result<()> {
        match addr.checked_add(len) {
            Some(end) if end <= self.data.len() => Ok(()),
            _ => Err(RandomiserError::OutOfBounds { addr, len }),
        }
    }

    pub fn read_u8(&self, addr: usize) -> Result<u8> {
        self.check(addr, 1)?;
        Ok(self.data[addr])
    }

    pub fn read_u16(&self, addr: usize) -> Result<u16> {
        self.check(addr, 2)?;
        Ok(u16::from_le_bytes([self.data[addr], self.data[addr + 1]]))
    }

    pub fn read_u32(&self, addr: usize) -> Result<u32> {
        self.check(addr, 4)?;
        Ok(u32::from_le_bytes([
            self.data[addr],
            self.data[addr + 1],
            self.data[addr + 2],
            self.data[addr + 3],
        ]))
    }

    pub fn read_n(&self, addr: usize, n: usize) -> Result<&[u8]> {
        self.check(addr, n)?;
        Ok(&self.data[addr..addr + n])
    }

    pub fn write_u8(&mut self, addr: usize, value: u8) -> Result<()> {
        self.check(addr, 1)?;
        self.data[addr] = value;
        Ok(())
    }

    pub fn write_u16(&mut self, addr: usize, value: u16) -> Result<()> {
        self.write_n(addr, &value.to_le_bytes())
    }

    pub fn write_n(&mut self, addr: usize, bytes: &[u8]) -> Result<()> {
        self.check(addr, bytes.len())?;
        self.data[addr..addr + bytes.len()].copy_from_slice(bytes);
        Ok(())
    }

    /// ORs `mask` into the byte at `addr`.
    pub fn set_bits(&mut self, addr: usize, mask: u8) -> Result<()> {
        let old = self.read_u8(addr)?;
        self.write_u8(addr, old | mask)
    }

    /// Rewrites the packed coordinate at `addr`, keeping the flag nibble.
    pub fn rewrite_coords(&mut self, addr: usize, x: u8, y: u8) -> Result<()> {
        let old = self.read_u16(addr)?;
        self.write_u16(addr, encode_coords(x, y) | (old & COORD_FLAGS_MASK))
    }

    /// Translates a GBA bus address into a ROM offset, if it lands inside
    /// the image.
    pub fn offset_of(&self, gba_addr: u32) -> Option<usize> {
        let offs = gba_addr.checked_sub(ROM_BASE_ADDRESS)? as usize;
        (offs < self.data.len()).then_some(offs)
    }
}

pub fn encode_coords(x: u8, y: u8) -> u16 {
    ((y as u16) << 6 | x as u16) & COORD_MASK
}

pub fn decode_coords(raw: u16) -> (u8, u8) {
    ((raw & 0x3F) as u8, ((raw >> 6) & 0x3F) as u8)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn coords_round_trip() {
        for x in 0..=63u8 {
            for y in 0..=63u8 {
                assert_eq!(decode_coords(encode_coords(x, y)), (x, y));
            }
        }
    }

    #[test]
    fn rewrite_coords_keeps_flag_nibble() {
        let mut rom = Rom::new(vec![0; 4]);
        rom.write_u16(0, 0xA000 | encode_coords(1, 2)).unwrap();
        rom.rewrite_coords(0, 17, 40).unwrap();
        let raw = rom.read_u16(0).unwrap();
        assert_eq!(raw & 0xF000, 0xA000);
        assert_eq!(decode_coords(raw), (17, 40));
    }

    #[test]
    fn reads_past_end_are_errors() {
        let rom = Rom::new(vec![1, 2, 3]);
        assert_eq!(rom.read_u16(1).unwrap(), 0x0302);
        assert!(matches!(
            rom.read_u16(2),
            Err(RandomiserError::OutOfBounds { addr: 2, len: 2 })
        ));
        assert!(rom.read_u32(usize::MAX).is_err());
    }

    #[test]
    fn offset_of_rejects_addresses_outside_image() {
        let rom = Rom::new(vec![0; 0x100]);
        assert_eq!(rom.offset_of(0x0800_0010), Some(0x10));
        assert_eq!(rom.offset_of(0x0800_0100), None);
        assert_eq!(rom.offset_of(0x0200_0000), None);
    }
}
