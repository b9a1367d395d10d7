#![allow(dead_code)]

use std::path::Path;

use fe8_randomiser_core::catalog::{
    Catalog, CHAPTER_UNIT_BLOCKS, CHARACTERS, JOB_DATA, WEAPON_DATA,
};
use fe8_randomiser_core::layout::*;
use fe8_randomiser_core::rom::{encode_coords, Rom};

pub const FIXTURES: [(&str, &str); 4] = [
    (WEAPON_DATA, include_str!("../fixtures/weapondata.json")),
    (JOB_DATA, include_str!("../fixtures/jobdata.json")),
    (CHARACTERS, include_str!("../fixtures/characters.json")),
    (CHAPTER_UNIT_BLOCKS, include_str!("../fixtures/chapter_unit_blocks.json")),
];

pub fn catalog() -> Catalog {
    Catalog::from_json(FIXTURES[0].1, FIXTURES[1].1, FIXTURES[2].1, FIXTURES[3].1).unwrap()
}

pub fn write_fixtures(dir: &Path) {
    for (name, text) in FIXTURES {
        std::fs::write(dir.join(name), text).unwrap();
    }
}

include!("../fixtures/image.rs");
