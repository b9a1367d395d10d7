//! Class and inventory randomization over chapter spawn records.

use log::{debug, error, info, warn};
use rand::seq::SliceRandom;
use rand::Rng;

use crate::catalog::{monster_dark, Catalog, Chapter, JobRecord, UnitBlock, WeaponKind};
use crate::characters::CharacterStore;
use crate::eligibility::{job_is_eligible, weapon_is_usable};
use crate::layout::*;
use crate::logic::{LogicFlag, Nudges, SpawnLogic};
use crate::rom::Rom;
use crate::{RandomiserError, Result};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct UnitOptions {
    pub player_unit_rando: bool,
    pub player_unit_monsters: bool,
}

impl Default for UnitOptions {
    fn default() -> Self {
        UnitOptions {
            player_unit_rando: true,
            player_unit_monsters: false,
        }
    }
}

pub struct UnitRandomizer<'a> {
    catalog: &'a Catalog,
    options: UnitOptions,
    store: CharacterStore,
    randomized: usize,
}

impl<'a> UnitRandomizer<'a> {
    pub fn new(catalog: &'a Catalog, options: UnitOptions) -> Self {
        UnitRandomizer {
            catalog,
            options,
            store: CharacterStore::new(&catalog.characters),
            randomized: 0,
        }
    }

    pub fn store(&self) -> &CharacterStore {
        &self.store
    }

    pub fn into_store(self) -> CharacterStore {
        self.store
    }

    /// Runs every chapter in catalog order.
    pub fn randomize_chapters<R: Rng>(&mut self, rom: &mut Rom, rng: &mut R) -> Result<()> {
        let catalog = self.catalog;
        for chapter in &catalog.chapters {
            self.randomize_chapter(rom, chapter, rng)?;
        }
        info!(
            "randomized {} spawn records, {} characters assigned",
            self.randomized,
            self.store.assignments().len()
        );
        Ok(())
    }

    pub fn randomize_chapter<R: Rng>(
        &mut self,
        rom: &mut Rom,
        chapter: &Chapter,
        rng: &mut R,
    ) -> Result<()> {
        for block in &chapter.blocks {
            if let Err(e) = self.randomize_block(rom, block, rng) {
                error!("crash dump: block {}/{}: {}", chapter.name, block.name, e);
                return Err(RandomiserError::Logic {
                    chapter: chapter.name.clone(),
                    block: block.name.clone(),
                    source: Box::new(e),
                });
            }
        }
        Ok(())
    }

    pub fn randomize_block<R: Rng>(
        &mut self,
        rom: &mut Rom,
        block: &UnitBlock,
        rng: &mut R,
    ) -> Result<()> {
        let records = block.logic.expand(rng);
        for (i, logic) in records.into_iter().enumerate() {
            let offset = block.base + i * CHAPTER_UNIT_SIZE;
            if offset + CHAPTER_UNIT_SIZE > rom.len() {
                warn!("{}[{i}] at 0x{offset:X} lies outside the image; skipped", block.name);
                continue;
            }

            if let Some(nudges) = &logic.nudges {
                apply_nudges(rom, offset, nudges)?;
            }
            if logic.ignore() {
                continue;
            }
            self.randomize_unit(rom, offset, logic, rng)?;
        }
        Ok(())
    }

    pub fn randomize_unit<R: Rng>(
        &mut self,
        rom: &mut Rom,
        offset: usize,
        mut logic: SpawnLogic,
        rng: &mut R,
    ) -> Result<()> {
        let catalog = self.catalog;
        let unit = rom.read_n(offset, CHAPTER_UNIT_SIZE)?.to_vec();
        let char_id = unit[UNIT_CHAR_INDEX];
        let job_id = unit[UNIT_JOB_INDEX];

        let Some(job) = catalog.job(job_id) else {
            debug!("0x{offset:X}: job 0x{job_id:02X} not managed");
            return Ok(());
        };
        if NON_RANDOMIZABLE_JOBS.contains(&job_id) {
            debug!("0x{offset:X}: job {} is never randomized", job.name);
            return Ok(());
        }

        for tag in self.store.tags_by_id(char_id) {
            if let Some(flag) = LogicFlag::parse(tag) {
                logic.imply(&flag);
            }
        }

        let flags = unit[UNIT_FLAGS_INDEX];
        let is_player = flags & AFFILIATION_MASK == 0;
        let autolevel = flags & AUTOLEVEL_MASK != 0;
        let player_controlled = logic.player.unwrap_or(is_player);

        if player_controlled && !self.options.player_unit_rando {
            self.store.set_by_id(char_id, job);
            return Ok(());
        }

        let forbid_monsters = player_controlled && !self.options.player_unit_monsters;
        let stored = self.store.get_by_id(char_id).cloned();
        let new_job = match stored {
            Some(stored) => stored,
            None => {
                let chosen = self.select_job(job, &logic, forbid_monsters, rng)?.clone();
                if !logic.no_store() {
                    self.store.set_by_id(char_id, &chosen);
                }
                chosen
            }
        };

        let mut inventory = [0u8; INVENTORY_SIZE];
        for (slot, item) in unit[INVENTORY_INDEX..INVENTORY_INDEX + INVENTORY_SIZE]
            .iter()
            .enumerate()
        {
            inventory[slot] = select_new_item(catalog, &new_job, *item, &logic, rng)?;
        }

        rom.write_u8(offset + UNIT_JOB_INDEX, new_job.id)?;
        rom.write_n(offset + INVENTORY_INDEX, &inventory)?;

        if let Some(swap) = logic.ai {
            let addr = offset + AI_INDEX + swap.slot;
            if rom.read_u8(addr)? == swap.from {
                rom.write_u8(addr, swap.to)?;
            }
        }

        if !player_controlled && !autolevel && self.store.contains_by_id(char_id) {
            self.backfill_weapon_ranks(rom, char_id, &inventory)?;
        }

        self.randomized += 1;
        Ok(())
    }

    /// Draws a same-tier job eligible under `logic`.
    pub fn select_job<R: Rng>(
        &self,
        job: &JobRecord,
        logic: &SpawnLogic,
        forbid_monsters: bool,
        rng: &mut R,
    ) -> Result<&'a JobRecord> {
        let catalog = self.catalog;
        let choices: Vec<&JobRecord> = catalog
            .job_pool(job.is_promoted)
            .iter()
            .filter(|candidate| job_is_eligible(candidate, logic, forbid_monsters))
            .collect();

        match choices.choose(rng) {
            Some(choice) => Ok(*choice),
            None => {
                error!("LOGIC ERROR: no viable jobs");
                error!("  job: {}", job.name);
                error!("  logic: {logic}");
                Err(RandomiserError::NoEligibleJob {
                    job: job.name.clone(),
                    logic: logic.to_string(),
                })
            }
        }
    }

    /// Raises the character's weapon ranks so that it can wield its new
    /// inventory. Ranks are never lowered.
    fn backfill_weapon_ranks(&self, rom: &mut Rom, char_id: u8, inventory: &[u8]) -> Result<()> {
        let wranks = character_entry(char_id) + CHARACTER_WRANK_OFFSET;
        for item in inventory {
            let Some(weapon) = self.catalog.weapon(*item) else {
                continue;
            };
            let kind = weapon.kind.id() as usize;
            if kind >= CHARACTER_WRANK_COUNT {
                continue;
            }
            let old = rom.read_u8(wranks + kind)?;
            rom.write_u8(wranks + kind, old.max(weapon.rank.value()))?;
        }
        Ok(())
    }
}

/// Replaces a weapon with one of the same rank usable by `job`; anything
/// that is not a weapon is returned unchanged.
pub fn select_new_item<R: Rng>(
    catalog: &Catalog,
    job: &JobRecord,
    item_id: u8,
    logic: &SpawnLogic,
    rng: &mut R,
) -> Result<u8> {
    let (original, is_monster_dark) = match catalog.weapon(item_id) {
        Some(weapon) => (weapon.clone(), false),
        None => match monster_dark(item_id) {
            Some(dark) => (dark, true),
            None => return Ok(item_id),
        },
    };

    let mut choices: Vec<u8> = catalog
        .weapons_of_rank(original.rank)
        .iter()
        .filter(|w| weapon_is_usable(w, job, logic))
        .map(|w| w.id)
        .collect();
    if is_monster_dark && job.can_use(WeaponKind::Dark) {
        choices.push(original.id);
    }

    match choices.choose(rng) {
        Some(id) => Ok(*id),
        None => {
            error!("LOGIC ERROR: no viable weapons");
            error!("  job: {}", job.name);
            error!("  rank: {:?}", original.rank);
            error!("  logic: {logic}");
            Err(RandomiserError::NoEligibleWeapon {
                job: job.name.clone(),
                rank: original.rank,
                logic: logic.to_string(),
            })
        }
    }
}

/// Rewrites the spawn coordinate and scripted move destinations of the
/// record at `offset`.
pub fn apply_nudges(rom: &mut Rom, offset: usize, nudges: &Nudges) -> Result<()> {
    if let Some((x, y)) = nudges.start {
        rom.rewrite_coords(offset + COORDS_INDEX, x, y)?;
    }
    if nudges.end.is_none() && nudges.moves.is_empty() {
        return Ok(());
    }

    let count = rom.read_u8(offset + REDA_COUNT_INDEX)? as usize;
    let ptr = rom.read_u32(offset + REDA_PTR_INDEX)?;
    let Some(redas) = rom.offset_of(ptr) else {
        warn!("0x{offset:X}: move pointer 0x{ptr:08X} outside the image; nudges skipped");
        return Ok(());
    };

    let end = nudges.end.and_then(|coords| match count.checked_sub(1) {
        Some(last) => Some((last, coords)),
        None => {
            warn!("0x{offset:X}: end nudge on a unit without moves");
            None
        }
    });
    for (index, (x, y)) in nudges.moves.iter().map(|(&i, &c)| (i, c)).chain(end) {
        if index >= count {
            warn!("0x{offset:X}: nudge for move {index} but only {count} moves");
            continue;
        }
        let addr = redas + index * REDA_SIZE;
        if addr + 2 > rom.len() {
            warn!("0x{offset:X}: move {index} at 0x{addr:X} runs past the image; skipped");
            continue;
        }
        rom.rewrite_coords(addr, x, y)?;
    }
    Ok(())
}
