//! Fixed offsets and strides inside the Sacred Stones (U) image.
//!
//! Everything here must match the target binary exactly; none of it is
//! configurable at runtime.

pub const ROM_SIZE: usize = 0x100_0000;
pub const ROM_BASE_ADDRESS: u32 = 0x0800_0000;

pub const ROM_NAME_OFFS: usize = 0xA0;
pub const ROM_NAME_SIZE: usize = 16;
pub const VANILLA_ROM_NAME: &str = "FIREEMBLEM2EBE8E";
pub const ROM_NAME_PREFIX: &str = "FIREEMBLEM2E";

// Chapter unit (spawn record) layout.
pub const CHAPTER_UNIT_SIZE: usize = 20;
pub const UNIT_CHAR_INDEX: usize = 0;
pub const UNIT_JOB_INDEX: usize = 1;
pub const UNIT_FLAGS_INDEX: usize = 3;
pub const COORDS_INDEX: usize = 4;
pub const REDA_COUNT_INDEX: usize = 7;
pub const REDA_PTR_INDEX: usize = 8;
pub const INVENTORY_INDEX: usize = 0xC;
pub const INVENTORY_SIZE: usize = 4;
pub const AI_INDEX: usize = 0x10;
pub const AI_SIZE: usize = 4;
pub const REDA_SIZE: usize = 8;

// Bits 1 and 2 of the flags byte hold the affiliation; both clear means player.
pub const AFFILIATION_MASK: u8 = 0b0110;
pub const AUTOLEVEL_MASK: u8 = 0b0001;

pub const COORD_MASK: u16 = 0x0FFF;
pub const COORD_FLAGS_MASK: u16 = 0xF000;
pub const COORD_MAX: u8 = 63;

// Character table.
pub const CHARACTER_TABLE_BASE: usize = 0x803D30;
pub const CHARACTER_SIZE: usize = 52;
pub const CHARACTER_STATS_OFFSET: usize = 12;
pub const CHARACTER_WRANK_OFFSET: usize = 20;
pub const CHARACTER_WRANK_COUNT: usize = 8;
pub const CHAR_ABILITY_4_OFFSET: usize = 43;

// Job (class) table.
pub const JOB_TABLE_BASE: usize = 0x807110;
pub const JOB_SIZE: usize = 84;
pub const JOB_STATS_OFFSET: usize = 11;
pub const JOB_ABILITY_1_OFFSET: usize = 40;
pub const JOB_MOUNTED_AID: u8 = 1 << 0;

// HP, Str, Skl, Spd, Def, Res (luck is left alone).
pub const STATS_COUNT: usize = 6;

// Item table.
pub const ITEM_TABLE_BASE: usize = 0x809B10;
pub const ITEM_SIZE: usize = 36;
pub const ITEM_ABILITY_1_INDEX: usize = 8;
pub const UNBREAKABLE_FLAG: u8 = 1 << 3;

// Movement cost tables.
pub const MOVEMENT_COST_TABLE_BASE: usize = 0x80B808;
pub const MOVEMENT_COST_ENTRY_SIZE: usize = 65;
pub const MOVEMENT_COST_ENTRY_COUNT: usize = 49;
pub const MOVEMENT_COST_IMPASSABLE: u8 = 255;
pub const MOVEMENT_COST_SENTINEL: u8 = 31;

pub const IMPORTANT_TERRAIN_TYPES: [usize; 22] = [
    14, // Thicket
    15, // Sand
    16, // Desert
    17, // River
    18, // Mountain
    19, // Peak
    20, // Bridge
    21, // Bridge 2
    22, // Sea
    23, // Lake
    26, // Fence 1
    39, // Cliff
    47, // Building 2
    51, // Fence 2
    54, // Sky
    55, // Deeps
    57, // Inn
    58, // Barrel
    59, // Bone
    60, // Dark
    61, // Water
    62, // Gunnels
];

// Lords.
pub const EIRIKA: u8 = 1;
pub const EIRIKA_LORD: u8 = 2;
pub const EIRIKA_LOCK: u8 = 1 << 4;
pub const EPHRAIM: u8 = 15;
pub const EPHRAIM_LORD: u8 = 1;
pub const EPHRAIM_LOCK: u8 = 1 << 5;

// Scripted events.
pub const EIRIKA_RAPIER_OFFSET: usize = 0x9EF088;
pub const ROSS_CH2_HP_OFFSET: usize = 0x9F03B8;
pub const ROSS_CH2_HP: u8 = 15;

// Enemy-only classes that must never be handed out or replaced.
pub const DEMON_KING_JOB: u8 = 0x66;
pub const NON_RANDOMIZABLE_JOBS: [u8; 1] = [DEMON_KING_JOB];

pub const HOLY_WEAPON_IDS: [u8; 9] = [
    0x85, // Sieglinde
    0x92, // Siegmund
    0x4A, // Gleipnir
    0x93, // Garm
    0x94, // Nidhogg
    0x8E, // Vidofnir
    0x3E, // Excalibur
    0x91, // Audhulma
    0x87, // Ivaldi
];

// Per-seed data written through tokens rather than the shared delta.
pub const SLOT_NAME_OFFS: usize = 0xEFD05C;
pub const SLOT_NAME_SIZE: usize = 64;
pub const SUPER_DEMON_KING_OFFS: usize = 0xEFD09C;
pub const LOCATION_INFO_OFFS: usize = 0xEFD0A0;
pub const LOCATION_INFO_SIZE: usize = 4;

// Live link (EWRAM addresses).
pub const ARCHIPELAGO_RECEIVED_ITEM_ADDR: u32 = 0x026E44;
pub const ARCHIPELAGO_NUM_RECEIVED_ITEMS_ADDR: u32 = 0x026E48;
pub const FLAGS_OFFSET: u32 = 0x026E3C;
pub const FLAGS_SIZE: usize = 8;

pub fn character_entry(char_id: u8) -> usize {
    CHARACTER_TABLE_BASE + char_id as usize * CHARACTER_SIZE
}

pub fn job_entry(job_id: u8) -> usize {
    JOB_TABLE_BASE + job_id as usize * JOB_SIZE
}

pub fn item_entry(item_id: u8) -> usize {
    ITEM_TABLE_BASE + item_id as usize * ITEM_SIZE
}

pub fn location_info(local_id: u16) -> usize {
    LOCATION_INFO_OFFS + local_id as usize * LOCATION_INFO_SIZE
}
