use log::{info, warn};
use rand::{rngs::StdRng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

pub mod catalog;
pub mod characters;
pub mod eligibility;
pub mod fixups;
pub mod items;
pub mod layout;
pub mod link;
pub mod logic;
pub mod patch;
pub mod rom;
pub mod units;

#[cfg(test)]
mod test_support;

use catalog::{Catalog, WeaponRank};
use characters::CharacterStore;
use items::{build_item_pool, ItemPlacement, ItemPool, BASE_LEVEL_CAP, LEVEL_CAP_STEP, MAX_LEVEL_CAP};
use patch::{create_ips_patch, seed_tokens, PatchPackage, TokenList, PACKAGE_EXTENSION};
use rom::Rom;
use units::{UnitOptions, UnitRandomizer};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RandomiserSettings {
    pub seed: u64,
    pub player_name: String,
    pub player_unit_rando: bool,
    pub player_unit_monsters: bool,
    pub super_demon_king: bool,
    pub smooth_level_caps: bool,
    pub min_endgame_level_cap: u8,
    pub required_holy_weapons: u8,
    pub exclude_latona: bool,
    pub easier_5x: bool,
    pub unbreakable_regalia: bool,
    pub debug: bool,
    /// Unmodified base image.
    pub input_path: PathBuf,
    /// Directory holding the catalog JSON documents.
    pub data_dir: PathBuf,
    pub output_path: PathBuf,
    pub placements_path: Option<PathBuf>,
}

impl Default for RandomiserSettings {
    fn default() -> Self {
        RandomiserSettings {
            seed: 0,
            player_name: "Player".to_string(),
            player_unit_rando: true,
            player_unit_monsters: false,
            super_demon_king: false,
            smooth_level_caps: true,
            min_endgame_level_cap: MAX_LEVEL_CAP,
            required_holy_weapons: 0,
            exclude_latona: true,
            easier_5x: false,
            unbreakable_regalia: false,
            debug: false,
            input_path: PathBuf::new(),
            data_dir: PathBuf::from("data"),
            output_path: PathBuf::from("output"),
            placements_path: None,
        }
    }
}

pub const MAX_REQUIRED_HOLY_WEAPONS: u8 = 9;

impl RandomiserSettings {
    /// Checks ranges and rounds the endgame level cap up to a whole number
    /// of uncaps.
    pub fn normalized(&self) -> Result<Self> {
        if !(BASE_LEVEL_CAP..=MAX_LEVEL_CAP).contains(&self.min_endgame_level_cap) {
            return Err(RandomiserError::Config(format!(
                "min_endgame_level_cap must be within {BASE_LEVEL_CAP}..={MAX_LEVEL_CAP}, got {}",
                self.min_endgame_level_cap
            )));
        }
        if self.required_holy_weapons > MAX_REQUIRED_HOLY_WEAPONS {
            return Err(RandomiserError::Config(format!(
                "required_holy_weapons must be at most {MAX_REQUIRED_HOLY_WEAPONS}, got {}",
                self.required_holy_weapons
            )));
        }
        let mut out = self.clone();
        let over = (out.min_endgame_level_cap - BASE_LEVEL_CAP) % LEVEL_CAP_STEP;
        if over != 0 {
            out.min_endgame_level_cap += LEVEL_CAP_STEP - over;
        }
        Ok(out)
    }

    pub fn unit_options(&self) -> UnitOptions {
        UnitOptions {
            player_unit_rando: self.player_unit_rando,
            player_unit_monsters: self.player_unit_monsters,
        }
    }
}

#[derive(Debug, Error)]
pub enum RandomiserError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse {file}: {source}")]
    Catalog {
        file: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("configuration error: {0}")]
    Config(String),
    #[error("no eligible job to replace {job} under {logic}")]
    NoEligibleJob { job: String, logic: String },
    #[error("no eligible {rank:?}-rank weapon for {job} under {logic}")]
    NoEligibleWeapon {
        job: String,
        rank: WeaponRank,
        logic: String,
    },
    #[error("in {chapter}/{block}: {source}")]
    Logic {
        chapter: String,
        block: String,
        #[source]
        source: Box<RandomiserError>,
    },
    #[error("access of {len} bytes at 0x{addr:X} is outside the image")]
    OutOfBounds { addr: usize, len: usize },
    #[error("patch error: {0}")]
    Patch(String),
    #[error("zip error: {0}")]
    Zip(#[from] zip::result::ZipError),
}

pub type Result<T> = std::result::Result<T, RandomiserError>;

/// Everything produced for one seed, before anything touches the disk.
#[derive(Debug, Clone)]
pub struct GeneratedSeed {
    pub settings: RandomiserSettings,
    pub base: Rom,
    /// Base plus every randomization pass; what the shared delta describes.
    pub randomized: Rom,
    /// Randomized image with the per-seed tokens applied.
    pub patched: Rom,
    pub store: CharacterStore,
    pub pool: ItemPool,
    pub tokens: TokenList,
}

impl GeneratedSeed {
    pub fn package(&self) -> Result<PatchPackage> {
        let delta = create_ips_patch(&self.base.data, &self.randomized.data)?;
        Ok(PatchPackage::new(
            &self.settings,
            &self.base,
            delta,
            self.tokens.clone(),
        ))
    }

    pub fn spoiler_log(&self) -> String {
        let holy = if self.pool.required_holy_weapons.is_empty() {
            "none".to_string()
        } else {
            self.pool.required_holy_weapons.join(", ")
        };
        let mut lines = vec![
            format!("FE8 Randomiser seed: {}", self.settings.seed),
            format!("player: {}", self.settings.player_name),
            format!(
                "min_endgame_level_cap: {}",
                self.settings.min_endgame_level_cap
            ),
            format!("required holy weapons: {holy}"),
            "class assignments:".to_string(),
        ];
        lines.extend(
            self.store
                .assignments()
                .iter()
                .map(|(name, job)| format!("  {name}: {} (0x{:02X})", job.name, job.id)),
        );
        lines.push(format!(
            "item pool: {} items, {} progression",
            self.pool.items.len(),
            self.pool.progression().count()
        ));
        let mut log = lines.join("\n");
        log.push('\n');
        log
    }
}

/// Runs every pass over a copy of `base`. Deterministic in `settings.seed`.
pub fn generate(
    base: &Rom,
    catalog: &Catalog,
    settings: &RandomiserSettings,
    placements: &[ItemPlacement],
) -> Result<GeneratedSeed> {
    let settings = settings.normalized()?;
    let mut rng = StdRng::seed_from_u64(settings.seed);
    let mut rom = base.clone();

    let mut randomizer = UnitRandomizer::new(catalog, settings.unit_options());
    randomizer.randomize_chapters(&mut rom, &mut rng)?;
    let store = randomizer.into_store();

    fixups::fix_movement_costs(&mut rom)?;
    fixups::apply_cutscene_fixes(&mut rom, catalog, &store, &mut rng)?;
    fixups::tweak_lords(&mut rom, &mut rng)?;

    if settings.easier_5x {
        fixups::apply_5x_buffs(&mut rom, &store)?;
    }
    if settings.player_unit_monsters {
        fixups::mark_monsters_mounted(&mut rom, catalog)?;
    }
    if settings.unbreakable_regalia {
        fixups::apply_unbreakable_holy_weapons(&mut rom)?;
    }

    let pool = build_item_pool(&settings, &mut rng);
    let tokens = seed_tokens(&settings, placements)?;
    let mut patched = rom.clone();
    tokens.apply(&mut patched)?;

    Ok(GeneratedSeed {
        settings,
        base: base.clone(),
        randomized: rom,
        patched,
        store,
        pool,
        tokens,
    })
}

pub fn load_placements(path: &Path) -> Result<Vec<ItemPlacement>> {
    let text = fs::read_to_string(path)?;
    serde_json::from_str(&text).map_err(|source| RandomiserError::Catalog {
        file: path.display().to_string(),
        source,
    })
}

/// Reads the inputs named by `settings`, generates the seed and writes the
/// package. Returns the package path.
pub fn run(settings: RandomiserSettings) -> Result<PathBuf> {
    if !settings.input_path.exists() {
        return Err(RandomiserError::Config(format!(
            "Input path does not exist: {}",
            settings.input_path.display()
        )));
    }

    let base = Rom::load(&settings.input_path)?;
    if base.len() != layout::ROM_SIZE {
        return Err(RandomiserError::Config(format!(
            "{} is {} bytes, expected {}",
            settings.input_path.display(),
            base.len(),
            layout::ROM_SIZE
        )));
    }
    let name = base.read_n(layout::ROM_NAME_OFFS, layout::ROM_NAME_SIZE)?;
    if name != layout::VANILLA_ROM_NAME.as_bytes() {
        warn!(
            "unexpected ROM name {:?}; continuing",
            String::from_utf8_lossy(name)
        );
    }

    let catalog = Catalog::load(&settings.data_dir)?;
    let placements = match &settings.placements_path {
        Some(path) => load_placements(path)?,
        None => {
            info!("no placements given; every location sends a remote item");
            Vec::new()
        }
    };

    let generated = generate(&base, &catalog, &settings, &placements)?;
    let package = generated.package()?.to_zip()?;

    // Per-seed subfolder so runs do not collide.
    let out_root = settings
        .output_path
        .join(format!("FE8Randomiser_{}", settings.seed));
    fs::create_dir_all(&out_root)?;

    let package_path = out_root.join(format!("fe8_{}.{PACKAGE_EXTENSION}", settings.seed));
    fs::write(&package_path, package)?;
    info!("wrote {}", package_path.display());

    if settings.debug {
        fs::write(out_root.join("spoiler_log.txt"), generated.spoiler_log())?;
    }

    Ok(package_path)
}
