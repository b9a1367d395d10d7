use std::collections::{BTreeMap, BTreeSet};

use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::RandomiserSettings;

pub(crate) const LOCATIONS: [(&str, u16); 34] = [
    ("Complete Prologue", 0),
    ("Complete Chapter 1", 1),
    ("Complete Chapter 2", 2),
    ("Complete Chapter 3", 3),
    ("Complete Chapter 4", 4),
    ("Complete Chapter 5", 5),
    ("Complete Chapter 5x", 6),
    ("Complete Chapter 6", 7),
    ("Complete Chapter 7", 8),
    ("Complete Chapter 8", 9),
    ("Complete Chapter 9", 10),
    ("Complete Chapter 10", 11),
    ("Complete Chapter 11", 12),
    ("Complete Chapter 12", 13),
    ("Complete Chapter 13", 14),
    ("Complete Chapter 14", 15),
    ("Complete Chapter 15", 16),
    ("Complete Chapter 16", 17),
    ("Complete Chapter 17", 18),
    ("Complete Chapter 18", 19),
    ("Complete Chapter 19", 20),
    ("Complete Chapter 20", 21),
    ("Defeat Lyon", 22),
    ("Defeat Formortiis", 23),
    ("Sieglinde Received", 24),
    ("Siegmund Received", 25),
    ("Gleipnir Received", 26),
    ("Garm Received", 27),
    ("Nidhogg Received", 28),
    ("Vidofnir Received", 29),
    ("Excalibur Received", 30),
    ("Audhulma Received", 31),
    ("Ivaldi Received", 32),
    ("Latona Received", 33),
];

pub(crate) const ITEMS: [(&str, u16); 19] = [
    ("Progressive Level Cap", 0),
    ("Progressive Weapon Level (Sword)", 1),
    ("Progressive Weapon Level (Lance)", 2),
    ("Progressive Weapon Level (Axe)", 3),
    ("Progressive Weapon Level (Bow)", 4),
    ("Progressive Weapon Level (Staff)", 5),
    ("Progressive Weapon Level (Anima)", 6),
    ("Progressive Weapon Level (Light)", 7),
    ("Progressive Weapon Level (Dark)", 8),
    ("Sieglinde", 9),
    ("Siegmund", 10),
    ("Gleipnir", 11),
    ("Garm", 12),
    ("Nidhogg", 13),
    ("Vidofnir", 14),
    ("Excalibur", 15),
    ("Audhulma", 16),
    ("Ivaldi", 17),
    ("Latona", 18),
];

/// Holy weapons and the weapon type each one needs.
pub(crate) const HOLY_WEAPONS: [(&str, &str); 10] = [
    ("Sieglinde", "Sword"),
    ("Siegmund", "Lance"),
    ("Gleipnir", "Dark"),
    ("Garm", "Axe"),
    ("Nidhogg", "Bow"),
    ("Vidofnir", "Lance"),
    ("Excalibur", "Anima"),
    ("Audhulma", "Sword"),
    ("Ivaldi", "Light"),
    ("Latona", "Staff"),
];

pub(crate) const EXCLUDABLE_HOLY_WEAPON: &str = "Latona";

pub(crate) const WEAPON_TYPES: [&str; 8] =
    ["Sword", "Lance", "Axe", "Bow", "Anima", "Light", "Dark", "Staff"];

pub const LEVEL_CAP_ITEM: &str = "Progressive Level Cap";
pub const GOAL_LOCATION: u16 = 23;
pub const BASE_LEVEL_CAP: u8 = 10;
pub const MAX_LEVEL_CAP: u8 = 40;
pub const LEVEL_CAP_STEP: u8 = 5;
pub const NUM_LEVELCAPS: usize = ((MAX_LEVEL_CAP - BASE_LEVEL_CAP) / LEVEL_CAP_STEP) as usize;
pub const NUM_WEAPON_LEVELS: usize = 3;

pub fn location_id(name: &str) -> Option<u16> {
    LOCATIONS.iter().find(|(n, _)| *n == name).map(|(_, id)| *id)
}

pub fn location_name(id: u16) -> Option<&'static str> {
    LOCATIONS.iter().find(|(_, i)| *i == id).map(|(n, _)| *n)
}

pub fn item_id(name: &str) -> Option<u16> {
    ITEMS.iter().find(|(n, _)| *n == name).map(|(_, id)| *id)
}

pub fn item_name(id: u16) -> Option<&'static str> {
    ITEMS.iter().find(|(_, i)| *i == id).map(|(n, _)| *n)
}

pub fn weapon_level_item(weapon_type: &str) -> String {
    format!("Progressive Weapon Level ({weapon_type})")
}

pub fn holy_weapon_type(name: &str) -> Option<&'static str> {
    HOLY_WEAPONS.iter().find(|(n, _)| *n == name).map(|(_, t)| *t)
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Classification {
    Progression,
    Useful,
}

#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct PoolItem {
    pub name: String,
    pub id: u16,
    pub classification: Classification,
}

#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize)]
pub struct ItemPool {
    pub items: Vec<PoolItem>,
    /// Holy weapons the final boss expects to be usable.
    pub required_holy_weapons: Vec<String>,
}

impl ItemPool {
    pub fn count(&self, name: &str) -> usize {
        self.items.iter().filter(|i| i.name == name).count()
    }

    pub fn progression(&self) -> impl Iterator<Item = &PoolItem> {
        self.items
            .iter()
            .filter(|i| i.classification == Classification::Progression)
    }
}

/// What ended up at a location, as decided by the host.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PlacedItem {
    /// One of this world's items; the game hands it out itself.
    Own { item: u16 },
    /// Belongs to another player; the host delivers it.
    Remote,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct ItemPlacement {
    pub location: u16,
    #[serde(flatten)]
    pub item: PlacedItem,
}

/// Level uncaps needed to reach `min_endgame_level_cap` from the base cap.
pub fn needed_level_uncaps(min_endgame_level_cap: u8) -> usize {
    (min_endgame_level_cap.saturating_sub(BASE_LEVEL_CAP) / LEVEL_CAP_STEP) as usize
}

/// Picks `required_holy_weapons` distinct holy weapons.
pub fn choose_holy_weapons<R: Rng>(settings: &RandomiserSettings, rng: &mut R) -> Vec<String> {
    let pool: Vec<&str> = HOLY_WEAPONS
        .iter()
        .map(|(name, _)| *name)
        .filter(|name| !(settings.exclude_latona && *name == EXCLUDABLE_HOLY_WEAPON))
        .collect();
    pool.choose_multiple(rng, settings.required_holy_weapons as usize)
        .map(|name| name.to_string())
        .collect()
}

pub fn build_item_pool<R: Rng>(settings: &RandomiserSettings, rng: &mut R) -> ItemPool {
    let mut pool = ItemPool::default();
    let mut push = |name: String, classification: Classification| {
        let id = item_id(&name).unwrap_or_default();
        pool.items.push(PoolItem {
            name,
            id,
            classification,
        });
    };

    let uncaps = needed_level_uncaps(settings.min_endgame_level_cap);
    for i in 0..NUM_LEVELCAPS {
        let classification = if i < uncaps {
            Classification::Progression
        } else {
            Classification::Useful
        };
        push(LEVEL_CAP_ITEM.to_string(), classification);
    }

    let holy = choose_holy_weapons(settings, rng);
    let needed_types: BTreeSet<&str> = holy.iter().filter_map(|w| holy_weapon_type(w)).collect();

    for weapon_type in WEAPON_TYPES {
        let classification = if needed_types.contains(weapon_type) {
            Classification::Progression
        } else {
            Classification::Useful
        };
        for _ in 0..NUM_WEAPON_LEVELS {
            push(weapon_level_item(weapon_type), classification);
        }
    }

    for (name, _) in HOLY_WEAPONS {
        let classification = if holy.iter().any(|h| h == name) {
            Classification::Progression
        } else {
            Classification::Useful
        };
        push(name.to_string(), classification);
    }

    pool.required_holy_weapons = holy;
    pool
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Serialize)]
pub enum Region {
    BeforeRoutesplit,
    Routesplit,
    PostRoutesplit,
    /// Everything but the final boss when level caps are not smoothed.
    MainCampaign,
    FinalBoss,
}

impl Region {
    /// Level cap needed to enter this region, if smoothing gates it.
    pub fn level_cap_required(self) -> u8 {
        match self {
            Region::BeforeRoutesplit | Region::MainCampaign => BASE_LEVEL_CAP,
            Region::Routesplit => 15,
            Region::PostRoutesplit => 25,
            Region::FinalBoss => BASE_LEVEL_CAP,
        }
    }
}

pub fn region_of(location: u16, smooth_level_caps: bool) -> Option<Region> {
    let name = location_name(location)?;
    if location == GOAL_LOCATION {
        return Some(Region::FinalBoss);
    }
    if !smooth_level_caps {
        return Some(Region::MainCampaign);
    }
    let region = match name {
        "Complete Chapter 9" | "Complete Chapter 10" | "Complete Chapter 11"
        | "Complete Chapter 12" | "Complete Chapter 13" | "Complete Chapter 14"
        | "Complete Chapter 15" | "Garm Received" | "Gleipnir Received"
        | "Audhulma Received" | "Excalibur Received" => Region::Routesplit,
        "Complete Chapter 16" | "Complete Chapter 17" | "Complete Chapter 18"
        | "Complete Chapter 19" | "Complete Chapter 20" | "Defeat Lyon"
        | "Sieglinde Received" | "Siegmund Received" | "Nidhogg Received"
        | "Vidofnir Received" | "Ivaldi Received" | "Latona Received" => Region::PostRoutesplit,
        _ => Region::BeforeRoutesplit,
    };
    Some(region)
}

pub fn level_cap(collected: &BTreeMap<String, usize>) -> u8 {
    let uncaps = collected.get(LEVEL_CAP_ITEM).copied().unwrap_or(0);
    BASE_LEVEL_CAP.saturating_add((uncaps.min(NUM_LEVELCAPS) as u8) * LEVEL_CAP_STEP)
}

pub fn region_accessible(region: Region, collected: &BTreeMap<String, usize>) -> bool {
    level_cap(collected) >= region.level_cap_required()
}

/// Whether `location` can be checked while holding `collected`. Unknown
/// locations are never reachable.
pub fn location_accessible(
    location: u16,
    collected: &BTreeMap<String, usize>,
    smooth_level_caps: bool,
) -> bool {
    region_of(location, smooth_level_caps).is_some_and(|region| region_accessible(region, collected))
}

/// Whether a player holding `collected` can be expected to beat the final boss.
pub fn can_defeat_final_boss(
    collected: &BTreeMap<String, usize>,
    pool: &ItemPool,
    settings: &RandomiserSettings,
) -> bool {
    if level_cap(collected) < settings.min_endgame_level_cap {
        return false;
    }
    let mut needed_types = BTreeSet::new();
    for weapon in &pool.required_holy_weapons {
        if collected.get(weapon).copied().unwrap_or(0) == 0 {
            return false;
        }
        needed_types.extend(holy_weapon_type(weapon));
    }
    needed_types.into_iter().all(|weapon_type| {
        collected
            .get(&weapon_level_item(weapon_type))
            .copied()
            .unwrap_or(0)
            >= NUM_WEAPON_LEVELS
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{rngs::StdRng, SeedableRng};

    #[test]
    fn ids_are_dense_and_unique() {
        for (i, (name, id)) in LOCATIONS.iter().enumerate() {
            assert_eq!(*id as usize, i);
            assert_eq!(location_id(name), Some(*id));
        }
        for (i, (name, id)) in ITEMS.iter().enumerate() {
            assert_eq!(*id as usize, i);
            assert_eq!(item_name(*id), Some(*name));
        }
        assert_eq!(location_name(GOAL_LOCATION), Some("Defeat Formortiis"));
        for (weapon, weapon_type) in HOLY_WEAPONS {
            assert!(item_id(weapon).is_some());
            assert!(item_id(&weapon_level_item(weapon_type)).is_some());
        }
    }

    #[test]
    fn pool_shape_follows_settings() {
        let settings = RandomiserSettings {
            min_endgame_level_cap: 25,
            required_holy_weapons: 3,
            ..RandomiserSettings::default()
        };
        let mut rng = StdRng::seed_from_u64(8);
        let pool = build_item_pool(&settings, &mut rng);

        assert_eq!(pool.items.len(), NUM_LEVELCAPS + 8 * NUM_WEAPON_LEVELS + 10);
        assert_eq!(pool.count(LEVEL_CAP_ITEM), NUM_LEVELCAPS);
        let progression_caps = pool
            .progression()
            .filter(|i| i.name == LEVEL_CAP_ITEM)
            .count();
        assert_eq!(progression_caps, 3);

        let holy: BTreeSet<&String> = pool.required_holy_weapons.iter().collect();
        assert_eq!(holy.len(), 3);
        assert!(!holy.iter().any(|w| *w == EXCLUDABLE_HOLY_WEAPON));
        for weapon in &pool.required_holy_weapons {
            let level = weapon_level_item(holy_weapon_type(weapon).unwrap());
            assert!(pool
                .progression()
                .filter(|i| i.name == level)
                .count()
                == NUM_WEAPON_LEVELS);
        }
    }

    #[test]
    fn nine_holy_weapons_fill_the_pool_without_latona() {
        let settings = RandomiserSettings {
            required_holy_weapons: 9,
            exclude_latona: true,
            ..RandomiserSettings::default()
        };
        let mut rng = StdRng::seed_from_u64(1);
        let holy = choose_holy_weapons(&settings, &mut rng);
        assert_eq!(holy.len(), 9);
        assert!(!holy.iter().any(|w| w == EXCLUDABLE_HOLY_WEAPON));
    }

    #[test]
    fn final_boss_needs_caps_weapons_and_ranks() {
        let settings = RandomiserSettings {
            min_endgame_level_cap: 20,
            ..RandomiserSettings::default()
        };
        let pool = ItemPool {
            items: Vec::new(),
            required_holy_weapons: vec!["Garm".to_string()],
        };
        let mut collected = BTreeMap::new();
        collected.insert(LEVEL_CAP_ITEM.to_string(), 2);
        collected.insert("Garm".to_string(), 1);
        assert!(!can_defeat_final_boss(&collected, &pool, &settings));
        collected.insert(weapon_level_item("Axe"), NUM_WEAPON_LEVELS);
        assert!(can_defeat_final_boss(&collected, &pool, &settings));
        collected.insert(LEVEL_CAP_ITEM.to_string(), 1);
        assert!(!can_defeat_final_boss(&collected, &pool, &settings));
    }

    #[test]
    fn regions_follow_smoothing() {
        assert_eq!(region_of(0, true), Some(Region::BeforeRoutesplit));
        assert_eq!(region_of(27, true), Some(Region::Routesplit));
        assert_eq!(region_of(21, true), Some(Region::PostRoutesplit));
        assert_eq!(region_of(21, false), Some(Region::MainCampaign));
        assert_eq!(region_of(GOAL_LOCATION, false), Some(Region::FinalBoss));
        assert_eq!(region_of(99, true), None);
    }

    #[test]
    fn level_caps_gate_smoothed_regions() {
        let mut collected = BTreeMap::new();
        assert!(location_accessible(0, &collected, true));
        assert!(!location_accessible(27, &collected, true));
        assert!(!location_accessible(21, &collected, true));
        // Without smoothing only the final boss check is special.
        assert!(location_accessible(21, &collected, false));
        assert!(!location_accessible(99, &collected, false));

        collected.insert(LEVEL_CAP_ITEM.to_string(), 1);
        assert!(region_accessible(Region::Routesplit, &collected));
        assert!(!region_accessible(Region::PostRoutesplit, &collected));

        collected.insert(LEVEL_CAP_ITEM.to_string(), 3);
        assert!(location_accessible(21, &collected, true));
        assert!(region_accessible(Region::FinalBoss, &collected));
    }

    #[test]
    fn placements_read_from_json() {
        let placements: Vec<ItemPlacement> = serde_json::from_str(
            r#"[{"location": 0, "kind": "own", "item": 9}, {"location": 5, "kind": "remote"}]"#,
        )
        .unwrap();
        assert_eq!(placements[0].item, PlacedItem::Own { item: 9 });
        assert_eq!(placements[1].item, PlacedItem::Remote);
    }
}
