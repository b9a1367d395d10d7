//! Passes that run on the image after every spawn record has been randomized.

use log::{error, info, warn};
use rand::seq::SliceRandom;
use rand::Rng;

use crate::catalog::Catalog;
use crate::characters::CharacterStore;
use crate::eligibility::MONSTER_TAG;
use crate::layout::*;
use crate::logic::SpawnLogic;
use crate::rom::Rom;
use crate::units::select_new_item;
use crate::{RandomiserError, Result};

const RAPIER_REPLACEMENT: &str = "Steel Blade";
const SUPPORT_FALLBACKS: [&str; 3] = ["Heal", "Mend", "Recover"];
const EASIER_5X_CHARACTERS: [&str; 3] = ["Ephraim", "Forde", "Kyle"];
const EASIER_5X_BONUS: u8 = 3;
const LORD_SHIFT_MAX: u8 = 4;

/// Makes the important impassable terrain types passable at a high cost so
/// that randomized classes cannot be stranded on their spawn tile.
///
/// Returns the number of bytes changed.
pub fn fix_movement_costs(rom: &mut Rom) -> Result<usize> {
    let mut changed = 0;
    for i in 0..MOVEMENT_COST_ENTRY_COUNT {
        let entry = MOVEMENT_COST_TABLE_BASE + i * MOVEMENT_COST_ENTRY_SIZE;
        for terrain in IMPORTANT_TERRAIN_TYPES {
            if rom.read_u8(entry + terrain)? == MOVEMENT_COST_IMPASSABLE {
                rom.write_u8(entry + terrain, MOVEMENT_COST_SENTINEL)?;
                changed += 1;
            }
        }
    }
    info!("movement costs: {changed} impassable entries relaxed");
    Ok(changed)
}

/// Moves part of each lord class's bases onto the lord personally and locks
/// them to their class.
pub fn tweak_lords<R: Rng>(rom: &mut Rom, rng: &mut R) -> Result<()> {
    for (char_id, job_id, lock) in [
        (EIRIKA, EIRIKA_LORD, EIRIKA_LOCK),
        (EPHRAIM, EPHRAIM_LORD, EPHRAIM_LOCK),
    ] {
        let personal = character_entry(char_id) + CHARACTER_STATS_OFFSET;
        let class = job_entry(job_id) + JOB_STATS_OFFSET;
        for i in 0..STATS_COUNT {
            let roll = rng.gen_range(0..=LORD_SHIFT_MAX);
            let class_base = rom.read_u8(class + i)?;
            let shift = roll.min(class_base);
            rom.write_u8(class + i, class_base - shift)?;
            let old = rom.read_u8(personal + i)?;
            rom.write_u8(personal + i, old.saturating_add(shift))?;
        }
        rom.set_bits(character_entry(char_id) + CHAR_ABILITY_4_OFFSET, lock)?;
    }
    Ok(())
}

/// Re-rolls items handed out by scripted events against the classes chosen
/// for their recipients.
pub fn apply_cutscene_fixes<R: Rng>(
    rom: &mut Rom,
    catalog: &Catalog,
    store: &CharacterStore,
    rng: &mut R,
) -> Result<()> {
    match store.get_by_name("Eirika") {
        Some(job) => {
            let rapier = if job.can_fight() {
                let blade = catalog.weapon_by_name(RAPIER_REPLACEMENT).ok_or_else(|| {
                    RandomiserError::Config(format!("{RAPIER_REPLACEMENT} missing from catalog"))
                })?;
                select_new_item(catalog, job, blade.id, &SpawnLogic::default(), rng)?
            } else {
                let staves: Vec<u8> = SUPPORT_FALLBACKS
                    .iter()
                    .filter_map(|name| catalog.weapon_by_name(name))
                    .map(|w| w.id)
                    .collect();
                *staves.choose(rng).ok_or_else(|| {
                    RandomiserError::Config("no support fallback weapons in catalog".to_string())
                })?
            };
            rom.write_u8(EIRIKA_RAPIER_OFFSET, rapier)?;
        }
        None => warn!("Eirika has no class assigned; cutscene rapier left alone"),
    }

    // Vanessa may not be able to carry Ross out of chapter 2.
    rom.write_u8(ROSS_CH2_HP_OFFSET, ROSS_CH2_HP)
}

pub fn apply_5x_buffs(rom: &mut Rom, store: &CharacterStore) -> Result<()> {
    for name in EASIER_5X_CHARACTERS {
        let Some(ids) = store.lookup_ids(name) else {
            error!("apply_5x_buffs: unable to look up ids for {name}");
            continue;
        };
        for &char_id in ids {
            let stats = character_entry(char_id) + CHARACTER_STATS_OFFSET;
            for i in 0..STATS_COUNT {
                let old = rom.read_u8(stats + i)?;
                rom.write_u8(stats + i, old.saturating_add(EASIER_5X_BONUS))?;
            }
        }
    }
    Ok(())
}

/// Lets monster classes rescue and be rescued like mounted units.
pub fn mark_monsters_mounted(rom: &mut Rom, catalog: &Catalog) -> Result<()> {
    for job in catalog.jobs_by_id.values().filter(|j| j.has_tag(MONSTER_TAG)) {
        rom.set_bits(job_entry(job.id) + JOB_ABILITY_1_OFFSET, JOB_MOUNTED_AID)?;
    }
    Ok(())
}

pub fn apply_unbreakable_holy_weapons(rom: &mut Rom) -> Result<()> {
    for id in HOLY_WEAPON_IDS {
        rom.set_bits(item_entry(id) + ITEM_ABILITY_1_INDEX, UNBREAKABLE_FLAG)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support;
    use rand::{rngs::StdRng, SeedableRng};

    #[test]
    fn movement_fix_is_idempotent_and_targeted() {
        let mut rom = test_support::rom();
        assert_eq!(fix_movement_costs(&mut rom).unwrap(), 3);
        let once = rom.clone();
        assert_eq!(fix_movement_costs(&mut rom).unwrap(), 0);
        assert!(rom == once);

        let entry = |i: usize| MOVEMENT_COST_TABLE_BASE + i * MOVEMENT_COST_ENTRY_SIZE;
        assert_eq!(rom.read_u8(entry(0) + 18).unwrap(), MOVEMENT_COST_SENTINEL);
        assert_eq!(rom.read_u8(entry(48) + 62).unwrap(), MOVEMENT_COST_SENTINEL);
        // Plains are not an important terrain type.
        assert_eq!(rom.read_u8(entry(5)).unwrap(), MOVEMENT_COST_IMPASSABLE);
        assert_eq!(rom.read_u8(entry(7) + 17).unwrap(), 4);
    }

    #[test]
    fn lord_stats_move_from_class_to_character() {
        let base = test_support::rom();
        let mut rom = base.clone();
        let mut rng = StdRng::seed_from_u64(77);
        tweak_lords(&mut rom, &mut rng).unwrap();

        for (char_id, job_id, lock) in [
            (EIRIKA, EIRIKA_LORD, EIRIKA_LOCK),
            (EPHRAIM, EPHRAIM_LORD, EPHRAIM_LOCK),
        ] {
            let personal = character_entry(char_id) + CHARACTER_STATS_OFFSET;
            let class = job_entry(job_id) + JOB_STATS_OFFSET;
            for i in 0..STATS_COUNT {
                let before = base.read_u8(class + i).unwrap();
                let shifted = rom.read_u8(personal + i).unwrap();
                assert!(shifted <= LORD_SHIFT_MAX.min(before));
                assert_eq!(rom.read_u8(class + i).unwrap() + shifted, before);
            }
            let ability = rom.read_u8(character_entry(char_id) + CHAR_ABILITY_4_OFFSET).unwrap();
            assert_eq!(ability & lock, lock);
        }
    }

    #[test]
    fn rapier_follows_eirikas_class() {
        let catalog = test_support::catalog();
        let mut store = CharacterStore::new(&catalog.characters);
        store.set_by_name("Eirika", catalog.job(25).unwrap());
        let mut rom = test_support::rom();
        let mut rng = StdRng::seed_from_u64(0);
        apply_cutscene_fixes(&mut rom, &catalog, &store, &mut rng).unwrap();
        assert_eq!(rom.read_u8(EIRIKA_RAPIER_OFFSET).unwrap(), 49); // Killer Bow
        assert_eq!(rom.read_u8(ROSS_CH2_HP_OFFSET).unwrap(), ROSS_CH2_HP);
    }

    #[test]
    fn staff_only_eirika_gets_a_staff() {
        let catalog = test_support::catalog();
        let mut store = CharacterStore::new(&catalog.characters);
        store.set_by_name("Eirika", catalog.job(45).unwrap());
        let mut rom = test_support::rom();
        let mut rng = StdRng::seed_from_u64(3);
        apply_cutscene_fixes(&mut rom, &catalog, &store, &mut rng).unwrap();
        assert!([75, 76, 77].contains(&rom.read_u8(EIRIKA_RAPIER_OFFSET).unwrap()));
    }

    #[test]
    fn easier_5x_buffs_named_characters_only() {
        let catalog = test_support::catalog();
        let store = CharacterStore::new(&catalog.characters);
        let mut rom = test_support::rom();
        apply_5x_buffs(&mut rom, &store).unwrap();
        for id in [EPHRAIM, 14, 16] {
            let stats = character_entry(id) + CHARACTER_STATS_OFFSET;
            assert_eq!(rom.read_n(stats, STATS_COUNT).unwrap(), &[3; STATS_COUNT]);
        }
        let seth = character_entry(2) + CHARACTER_STATS_OFFSET;
        assert_eq!(rom.read_n(seth, STATS_COUNT).unwrap(), &[0; STATS_COUNT]);
    }

    #[test]
    fn monster_and_holy_weapon_toggles_are_idempotent() {
        let catalog = test_support::catalog();
        let mut rom = test_support::rom();
        mark_monsters_mounted(&mut rom, &catalog).unwrap();
        apply_unbreakable_holy_weapons(&mut rom).unwrap();
        let once = rom.clone();
        mark_monsters_mounted(&mut rom, &catalog).unwrap();
        apply_unbreakable_holy_weapons(&mut rom).unwrap();
        assert!(rom == once);

        for id in [90, 94, DEMON_KING_JOB] {
            let ability = rom.read_u8(job_entry(id) + JOB_ABILITY_1_OFFSET).unwrap();
            assert_eq!(ability & JOB_MOUNTED_AID, JOB_MOUNTED_AID);
        }
        assert_eq!(rom.read_u8(job_entry(5) + JOB_ABILITY_1_OFFSET).unwrap(), 0);
        for id in HOLY_WEAPON_IDS {
            let ability = rom.read_u8(item_entry(id) + ITEM_ABILITY_1_INDEX).unwrap();
            assert_eq!(ability, UNBREAKABLE_FLAG);
        }
    }
}
