// Synthetic image laid out like the fixture chapters. Included by the unit
// test helpers and the integration tests so both run against the same bytes;
// the includer brings `Rom`, `encode_coords` and the layout constants into
// scope.

pub const PROLOGUE_PLAYER: usize = 0x8B0000;
pub const PROLOGUE_ENEMY: usize = 0x8B0100;
pub const CH1_ALLY: usize = 0x8B0200;
pub const CH1_ENEMY: usize = 0x8B0300;
pub const CH2_ENEMY: usize = 0x8B0400;
pub const REDA_TABLE: usize = 0x8B1000;

pub const GENERIC: u8 = 0x80;
pub const VULNERARY: u8 = 0x6C;

pub const PLAYER: u8 = 0x00;
pub const NPC: u8 = 0x02;
pub const ENEMY: u8 = 0x04;
pub const AUTOLEVEL: u8 = 0x01;

pub fn unit(index: usize, base: usize) -> usize {
    base + index * CHAPTER_UNIT_SIZE
}

pub fn write_unit(rom: &mut Rom, addr: usize, char_id: u8, job: u8, flags: u8, items: &[u8]) {
    rom.write_u8(addr + UNIT_CHAR_INDEX, char_id).unwrap();
    rom.write_u8(addr + UNIT_JOB_INDEX, job).unwrap();
    rom.write_u8(addr + UNIT_FLAGS_INDEX, flags).unwrap();
    rom.write_u16(addr + COORDS_INDEX, 0x1000 | encode_coords(2, 3))
        .unwrap();
    rom.write_n(addr + INVENTORY_INDEX, items).unwrap();
}

pub fn rom() -> Rom {
    let mut rom = Rom::new(vec![0; ROM_SIZE]);
    rom.write_n(ROM_NAME_OFFS, VANILLA_ROM_NAME.as_bytes()).unwrap();

    // Prologue: Eirika, Seth, Vanessa.
    write_unit(&mut rom, unit(0, PROLOGUE_PLAYER), 1, 0x02, PLAYER, &[9, VULNERARY]);
    write_unit(&mut rom, unit(1, PROLOGUE_PLAYER), 2, 0x07, PLAYER, &[22, 3]);
    write_unit(&mut rom, unit(2, PROLOGUE_PLAYER), 3, 0x3F, PLAYER, &[20]);

    write_unit(&mut rom, unit(0, PROLOGUE_ENEMY), GENERIC, 0x1F, ENEMY | AUTOLEVEL, &[31]);
    write_unit(&mut rom, unit(1, PROLOGUE_ENEMY), GENERIC, 0x19, ENEMY | AUTOLEVEL, &[45]);
    write_unit(&mut rom, unit(2, PROLOGUE_ENEMY), 68, 0x1F, ENEMY, &[32, VULNERARY]);
    write_unit(&mut rom, unit(3, PROLOGUE_ENEMY), GENERIC, 0x13, ENEMY | AUTOLEVEL, &[1]);

    // Chapter 1: Ross and a dancer, then Breguet, a moving mage and a
    // denylisted unit.
    write_unit(&mut rom, unit(0, CH1_ALLY), 10, 0x1F, NPC, &[31]);
    write_unit(&mut rom, unit(1, CH1_ALLY), 0x0C, 0x4D, NPC, &[VULNERARY]);

    write_unit(&mut rom, unit(0, CH1_ENEMY), 69, 0x09, ENEMY, &[22]);
    rom.write_n(unit(0, CH1_ENEMY) + AI_INDEX, &[3, 0, 9, 0]).unwrap();

    let mage = unit(1, CH1_ENEMY);
    write_unit(&mut rom, mage, GENERIC, 0x25, ENEMY | AUTOLEVEL, &[56]);
    rom.write_u8(mage + REDA_COUNT_INDEX, 2).unwrap();
    rom.write_n(mage + REDA_PTR_INDEX, &(0x0800_0000u32 + REDA_TABLE as u32).to_le_bytes())
        .unwrap();
    for i in 0..2 {
        rom.write_u16(REDA_TABLE + i * REDA_SIZE, 0x2000 | encode_coords(1, 1))
            .unwrap();
    }

    write_unit(&mut rom, unit(2, CH1_ENEMY), GENERIC, DEMON_KING_JOB, ENEMY, &[69]);

    // Chapter 2: Breguet again (alias id), a pegasus that may not fly, Seth.
    write_unit(&mut rom, unit(0, CH2_ENEMY), 70, 0x09, ENEMY, &[20]);
    write_unit(&mut rom, unit(1, CH2_ENEMY), GENERIC, 0x3F, ENEMY | AUTOLEVEL, &[20]);
    write_unit(&mut rom, unit(2, CH2_ENEMY), 2, 0x07, PLAYER, &[3]);

    // Lord class bases.
    rom.write_n(job_entry(EIRIKA_LORD) + JOB_STATS_OFFSET, &[16, 4, 8, 9, 3, 1])
        .unwrap();
    rom.write_n(job_entry(EPHRAIM_LORD) + JOB_STATS_OFFSET, &[18, 5, 6, 7, 5, 0])
        .unwrap();

    // A few impassable costs, important and not.
    let entry = |i: usize| MOVEMENT_COST_TABLE_BASE + i * MOVEMENT_COST_ENTRY_SIZE;
    rom.write_u8(entry(0) + 18, MOVEMENT_COST_IMPASSABLE).unwrap();
    rom.write_u8(entry(5) + 22, MOVEMENT_COST_IMPASSABLE).unwrap();
    rom.write_u8(entry(5), MOVEMENT_COST_IMPASSABLE).unwrap();
    rom.write_u8(entry(48) + 62, MOVEMENT_COST_IMPASSABLE).unwrap();
    rom.write_u8(entry(7) + 17, 4).unwrap();

    rom
}
