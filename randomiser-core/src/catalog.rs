//! Static weapon, job, character and chapter tables.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::fs;
use std::io::Read;
use std::marker::PhantomData;
use std::path::Path;

use flate2::read::GzDecoder;
use log::{debug, info};
use serde::de::{MapAccess, Visitor};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::logic::BlockLogic;
use crate::{RandomiserError, Result};

pub const WEAPON_DATA: &str = "weapondata.json";
pub const JOB_DATA: &str = "jobdata.json";
pub const CHARACTERS: &str = "characters.json";
pub const CHAPTER_UNIT_BLOCKS: &str = "chapter_unit_blocks.json";

/// Dark has no E-rank tome, so these are also offered at E.
pub const E_RANK_FALLBACKS: [&str; 1] = ["Flux"];

#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum WeaponKind {
    Sword,
    Lance,
    Axe,
    Bow,
    Staff,
    Anima,
    Light,
    Dark,
    Item,
    #[serde(rename = "Monster Weapon")]
    MonsterWeapon,
    Ring,
    Dragonstone,
}

impl WeaponKind {
    /// Index used by the game for this kind.
    pub fn id(self) -> u8 {
        match self {
            WeaponKind::Sword => 0x00,
            WeaponKind::Lance => 0x01,
            WeaponKind::Axe => 0x02,
            WeaponKind::Bow => 0x03,
            WeaponKind::Staff => 0x04,
            WeaponKind::Anima => 0x05,
            WeaponKind::Light => 0x06,
            WeaponKind::Dark => 0x07,
            WeaponKind::Item => 0x09,
            WeaponKind::MonsterWeapon => 0x0B,
            WeaponKind::Ring => 0x0C,
            WeaponKind::Dragonstone => 0x11,
        }
    }

    pub fn is_damaging(self) -> bool {
        !matches!(self, WeaponKind::Staff | WeaponKind::Item | WeaponKind::Ring)
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum WeaponRank {
    E,
    D,
    C,
    B,
    A,
    S,
}

impl WeaponRank {
    /// Weapon experience needed for this rank.
    pub fn value(self) -> u8 {
        match self {
            WeaponRank::E => 0x01,
            WeaponRank::D => 0x1F,
            WeaponRank::C => 0x47,
            WeaponRank::B => 0x79,
            WeaponRank::A => 0xB5,
            WeaponRank::S => 0xFB,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct WeaponRecord {
    pub id: u8,
    pub name: String,
    pub rank: WeaponRank,
    pub kind: WeaponKind,
    /// Job tags required to wield this weapon.
    #[serde(default)]
    pub locks: BTreeSet<String>,
}

/// Enemy-only dark magic missing from the weapon table. Re-rolled at their
/// rank like any other weapon, and kept as a candidate for jobs wielding Dark.
const MONSTER_DARKS: [(u8, &str, WeaponRank); 5] = [
    (0xAB, "Demon Surge", WeaponRank::B),
    (0xAC, "Shadowshot", WeaponRank::A),
    (0xB3, "Evil Eye", WeaponRank::D),
    (0xB4, "Crimson Eye", WeaponRank::B),
    (0xB5, "Stone", WeaponRank::B),
];

pub fn monster_dark(id: u8) -> Option<WeaponRecord> {
    MONSTER_DARKS
        .iter()
        .find(|(dark_id, _, _)| *dark_id == id)
        .map(|(id, name, rank)| WeaponRecord {
            id: *id,
            name: name.to_string(),
            rank: *rank,
            kind: WeaponKind::Dark,
            locks: BTreeSet::new(),
        })
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct JobRecord {
    pub id: u8,
    pub name: String,
    pub is_promoted: bool,
    pub usable_weapons: BTreeSet<WeaponKind>,
    pub tags: BTreeSet<String>,
}

impl JobRecord {
    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.contains(tag)
    }

    pub fn can_use(&self, kind: WeaponKind) -> bool {
        self.usable_weapons.contains(&kind)
    }

    pub fn can_fight(&self) -> bool {
        self.usable_weapons.iter().any(|k| k.is_damaging())
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CharacterEntry {
    pub ids: Vec<u8>,
    #[serde(default)]
    pub tags: BTreeSet<String>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UnitBlock {
    pub name: String,
    pub base: usize,
    pub count: usize,
    pub logic: BlockLogic,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Chapter {
    pub name: String,
    pub blocks: Vec<UnitBlock>,
}

/// Map entries in document order.
///
/// Chapter and group-rule order feeds the RNG, so it must not depend on
/// hashing or key sorting.
#[derive(Clone, Debug, Default)]
pub struct OrderedEntries<V>(pub Vec<(String, V)>);

impl<'de, V: Deserialize<'de>> Deserialize<'de> for OrderedEntries<V> {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct EntriesVisitor<V>(PhantomData<V>);

        impl<'de, V: Deserialize<'de>> Visitor<'de> for EntriesVisitor<V> {
            type Value = OrderedEntries<V>;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a map")
            }

            fn visit_map<A>(self, mut map: A) -> std::result::Result<Self::Value, A::Error>
            where
                A: MapAccess<'de>,
            {
                let mut entries = Vec::with_capacity(map.size_hint().unwrap_or(0));
                while let Some((key, value)) = map.next_entry::<String, V>()? {
                    entries.push((key, value));
                }
                Ok(OrderedEntries(entries))
            }
        }

        deserializer.deserialize_map(EntriesVisitor(PhantomData))
    }
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct RawUnitBlock {
    name: String,
    base: usize,
    count: usize,
    #[serde(default)]
    logic: OrderedEntries<Value>,
}

#[derive(Clone, Debug)]
pub struct Catalog {
    pub weapons_by_id: BTreeMap<u8, WeaponRecord>,
    pub weapons_by_name: BTreeMap<String, u8>,
    pub weapons_by_rank: BTreeMap<WeaponRank, Vec<WeaponRecord>>,
    /// Only jobs that can wield something; anything else is left alone.
    pub jobs_by_id: BTreeMap<u8, JobRecord>,
    pub promoted_jobs: Vec<JobRecord>,
    pub unpromoted_jobs: Vec<JobRecord>,
    pub characters: BTreeMap<String, CharacterEntry>,
    pub chapters: Vec<Chapter>,
}

fn parse_document<T: serde::de::DeserializeOwned>(file: &str, text: &str) -> Result<T> {
    serde_json::from_str(text).map_err(|source| RandomiserError::Catalog {
        file: file.to_string(),
        source,
    })
}

fn read_document(data_dir: &Path, name: &str) -> Result<String> {
    let plain = data_dir.join(name);
    if plain.exists() {
        return Ok(fs::read_to_string(plain)?);
    }

    let gz = data_dir.join(format!("{name}.gz"));
    if gz.exists() {
        let raw = fs::read(gz)?;
        let mut decoder = GzDecoder::new(raw.as_slice());
        let mut out = String::new();
        decoder.read_to_string(&mut out)?;
        return Ok(out);
    }

    Err(std::io::Error::new(
        std::io::ErrorKind::NotFound,
        format!("missing data file {} under {}", name, data_dir.display()),
    )
    .into())
}

impl Catalog {
    pub fn load(data_dir: &Path) -> Result<Self> {
        let weapons = read_document(data_dir, WEAPON_DATA)?;
        let jobs = read_document(data_dir, JOB_DATA)?;
        let characters = read_document(data_dir, CHARACTERS)?;
        let chapters = read_document(data_dir, CHAPTER_UNIT_BLOCKS)?;
        Catalog::from_json(&weapons, &jobs, &characters, &chapters)
    }

    pub fn from_json(weapons: &str, jobs: &str, characters: &str, chapters: &str) -> Result<Self> {
        let weapon_data: Vec<WeaponRecord> = parse_document(WEAPON_DATA, weapons)?;
        let job_data: Vec<JobRecord> = parse_document(JOB_DATA, jobs)?;
        let characters: BTreeMap<String, CharacterEntry> = parse_document(CHARACTERS, characters)?;
        let raw_chapters: OrderedEntries<Vec<RawUnitBlock>> =
            parse_document(CHAPTER_UNIT_BLOCKS, chapters)?;

        let mut weapons_by_id = BTreeMap::new();
        let mut weapons_by_name = BTreeMap::new();
        let mut weapons_by_rank: BTreeMap<WeaponRank, Vec<WeaponRecord>> = BTreeMap::new();
        for weapon in weapon_data {
            if weapons_by_id.contains_key(&weapon.id) {
                return Err(RandomiserError::Config(format!(
                    "duplicate weapon id 0x{:02X} ({})",
                    weapon.id, weapon.name
                )));
            }
            weapons_by_name.insert(weapon.name.clone(), weapon.id);
            weapons_by_rank.entry(weapon.rank).or_default().push(weapon.clone());
            weapons_by_id.insert(weapon.id, weapon);
        }

        for name in E_RANK_FALLBACKS {
            let id = weapons_by_name.get(name).ok_or_else(|| {
                RandomiserError::Config(format!("fallback weapon {name} missing from {WEAPON_DATA}"))
            })?;
            let fallback = weapons_by_id[id].clone();
            let bucket = weapons_by_rank.entry(WeaponRank::E).or_default();
            if !bucket.iter().any(|w| w.id == fallback.id) {
                bucket.push(fallback);
            }
        }

        let mut jobs_by_id = BTreeMap::new();
        let mut promoted_jobs = Vec::new();
        let mut unpromoted_jobs = Vec::new();
        for job in job_data {
            if job.usable_weapons.is_empty() {
                debug!("job {} (0x{:02X}) wields nothing; not managed", job.name, job.id);
                continue;
            }
            if jobs_by_id.contains_key(&job.id) {
                return Err(RandomiserError::Config(format!(
                    "duplicate job id 0x{:02X} ({})",
                    job.id, job.name
                )));
            }
            if !job.has_tag("no_rando") {
                if job.is_promoted {
                    promoted_jobs.push(job.clone());
                } else {
                    unpromoted_jobs.push(job.clone());
                }
            }
            jobs_by_id.insert(job.id, job);
        }

        let mut seen_ids = BTreeMap::new();
        for (name, entry) in &characters {
            for id in &entry.ids {
                if let Some(other) = seen_ids.insert(*id, name) {
                    return Err(RandomiserError::Config(format!(
                        "character id 0x{id:02X} is claimed by both {other} and {name}"
                    )));
                }
            }
        }

        let mut chapters = Vec::with_capacity(raw_chapters.0.len());
        for (chapter_name, raw_blocks) in raw_chapters.0 {
            let mut blocks = Vec::with_capacity(raw_blocks.len());
            for raw in raw_blocks {
                let logic = BlockLogic::parse(&raw.logic.0, raw.count).map_err(|e| {
                    RandomiserError::Config(format!("{chapter_name}/{}: {e}", raw.name))
                })?;
                blocks.push(UnitBlock {
                    name: raw.name,
                    base: raw.base,
                    count: raw.count,
                    logic,
                });
            }
            chapters.push(Chapter {
                name: chapter_name,
                blocks,
            });
        }

        info!(
            "catalog: {} weapons, {} jobs ({} promoted, {} unpromoted), {} characters, {} chapters",
            weapons_by_id.len(),
            jobs_by_id.len(),
            promoted_jobs.len(),
            unpromoted_jobs.len(),
            characters.len(),
            chapters.len()
        );

        Ok(Catalog {
            weapons_by_id,
            weapons_by_name,
            weapons_by_rank,
            jobs_by_id,
            promoted_jobs,
            unpromoted_jobs,
            characters,
            chapters,
        })
    }

    pub fn weapon(&self, id: u8) -> Option<&WeaponRecord> {
        self.weapons_by_id.get(&id)
    }

    pub fn weapon_by_name(&self, name: &str) -> Option<&WeaponRecord> {
        self.weapons_by_name
            .get(name)
            .and_then(|id| self.weapons_by_id.get(id))
    }

    pub fn weapons_of_rank(&self, rank: WeaponRank) -> &[WeaponRecord] {
        self.weapons_by_rank
            .get(&rank)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn job(&self, id: u8) -> Option<&JobRecord> {
        self.jobs_by_id.get(&id)
    }

    /// Randomizable jobs of the same promotion tier.
    pub fn job_pool(&self, promoted: bool) -> &[JobRecord] {
        if promoted {
            &self.promoted_jobs
        } else {
            &self.unpromoted_jobs
        }
    }
}
