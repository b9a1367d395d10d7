//! Fixture catalog and the shared synthetic image.

use crate::catalog::Catalog;
use crate::layout::*;
use crate::rom::{encode_coords, Rom};

pub const WEAPONS: &str = include_str!("../tests/fixtures/weapondata.json");
pub const JOBS: &str = include_str!("../tests/fixtures/jobdata.json");
pub const CHARACTERS: &str = include_str!("../tests/fixtures/characters.json");
pub const CHAPTERS: &str = include_str!("../tests/fixtures/chapter_unit_blocks.json");

pub fn catalog() -> Catalog {
    Catalog::from_json(WEAPONS, JOBS, CHARACTERS, CHAPTERS).unwrap()
}

include!("../tests/fixtures/image.rs");
