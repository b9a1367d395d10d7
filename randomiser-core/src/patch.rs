//! Patch output: an IPS delta for the randomized image plus per-seed write
//! tokens, bundled in a zip package.

use std::io::{Cursor, Read, Write};

use log::info;
use serde::{Deserialize, Serialize};
use zip::write::FileOptions;
use zip::{CompressionMethod, DateTime, ZipArchive, ZipWriter};

use crate::items::{ItemPlacement, PlacedItem, LOCATIONS};
use crate::layout::{location_info, SLOT_NAME_OFFS, SLOT_NAME_SIZE, SUPER_DEMON_KING_OFFS};
use crate::rom::Rom;
use crate::{RandomiserError, RandomiserSettings, Result};

pub const MANIFEST_FILE: &str = "manifest.json";
pub const DELTA_FILE: &str = "base_patch.ips";
pub const TOKEN_FILE: &str = "token_data.bin";
pub const OPTIONS_FILE: &str = "options.json";
pub const PACKAGE_EXTENSION: &str = "apfe8";
pub const GAME_NAME: &str = "Fire Emblem Sacred Stones";
pub const PACKAGE_VERSION: u32 = 1;

const IPS_HEADER: &[u8] = b"PATCH";
const IPS_FOOTER: &[u8] = b"EOF";
const IPS_EOF_OFFSET: usize = 0x454F46;
const IPS_MAX_CHUNK: usize = 0xFFFF;
const IPS_MAX_OFFSET: usize = 0xFF_FFFF;

pub const AP_ITEM_KIND: u16 = 1;
pub const SELF_ITEM_KIND: u16 = 2;

#[derive(Clone, Copy)]
struct Chunk {
    start: usize,
    end: usize,
}

fn get_next_chunk(mut pos: usize, old: &[u8], new: &[u8]) -> Chunk {
    while pos < old.len() && old[pos] == new[pos] {
        pos += 1;
    }
    let start = pos;
    while pos < old.len() && old[pos] != new[pos] {
        pos += 1;
    }
    Chunk { start, end: pos }
}

/// Splits a changed run into records the format can express. A record may
/// not start at the offset that spells "EOF", so such a start is pulled back
/// by one byte.
fn push_split_chunks(chunks: &mut Vec<Chunk>, chunk: Chunk) {
    let mut start = chunk.start;
    if start == IPS_EOF_OFFSET {
        start -= 1;
    }
    while start < chunk.end {
        let mut end = (start + IPS_MAX_CHUNK).min(chunk.end);
        if end == IPS_EOF_OFFSET && end < chunk.end {
            end -= 1;
        }
        chunks.push(Chunk { start, end });
        start = end;
    }
}

fn get_chunks(old: &[u8], new: &[u8]) -> Vec<Chunk> {
    let mut pos = 0;
    let mut chunks = Vec::new();
    while pos < old.len() {
        let chunk = get_next_chunk(pos, old, new);
        if chunk.start != chunk.end {
            push_split_chunks(&mut chunks, chunk);
        }
        pos = chunk.end;
    }
    chunks
}

pub fn create_ips_patch(old: &[u8], new: &[u8]) -> Result<Vec<u8>> {
    if old.len() != new.len() {
        return Err(RandomiserError::Patch(format!(
            "image size changed from {} to {} bytes",
            old.len(),
            new.len()
        )));
    }
    if old.len() > IPS_MAX_OFFSET + 1 {
        return Err(RandomiserError::Patch(format!(
            "{} bytes is too large for 24-bit offsets",
            old.len()
        )));
    }

    let mut out = Vec::new();
    out.extend(IPS_HEADER);
    for chunk in get_chunks(old, new) {
        out.extend(&(chunk.start as u32).to_be_bytes()[1..4]);
        let size = chunk.end - chunk.start;
        out.extend(&(size as u16).to_be_bytes());
        out.extend(&new[chunk.start..chunk.end]);
    }
    out.extend(IPS_FOOTER);
    Ok(out)
}

struct TokenReader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> TokenReader<'a> {
    fn take(&mut self, n: usize) -> Result<&'a [u8]> {
        let end = self
            .pos
            .checked_add(n)
            .filter(|end| *end <= self.data.len())
            .ok_or_else(|| RandomiserError::Patch(format!("truncated at byte {}", self.pos)))?;
        let out = &self.data[self.pos..end];
        self.pos = end;
        Ok(out)
    }

    fn le_u32(&mut self) -> Result<u32> {
        let b = self.take(4)?;
        Ok(u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
    }
}

/// Applies an IPS patch in place. Records must stay inside the image.
pub fn apply_ips_patch(rom: &mut Rom, patch: &[u8]) -> Result<()> {
    let patch = ips::Patch::parse(patch)
        .map_err(|e| RandomiserError::Patch(format!("unable to parse delta: {e}")))?;
    for hunk in patch.hunks() {
        rom.write_n(hunk.offset(), hunk.payload()).map_err(|_| {
            RandomiserError::Patch(format!(
                "record at 0x{:06X} runs past the image",
                hunk.offset()
            ))
        })?;
    }
    Ok(())
}

pub const TOKEN_WRITE: u8 = 0;

/// A literal write replayed after the delta.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WriteToken {
    pub offset: u32,
    pub data: Vec<u8>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TokenList {
    pub tokens: Vec<WriteToken>,
}

impl TokenList {
    pub fn write_bytes(&mut self, offset: usize, data: &[u8]) {
        self.tokens.push(WriteToken {
            offset: offset as u32,
            data: data.to_vec(),
        });
    }

    pub fn write_byte(&mut self, offset: usize, value: u8) {
        self.write_bytes(offset, &[value]);
    }

    pub fn write_short_le(&mut self, offset: usize, value: u16) {
        self.write_bytes(offset, &value.to_le_bytes());
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::new();
        out.extend((self.tokens.len() as u32).to_le_bytes());
        for token in &self.tokens {
            out.push(TOKEN_WRITE);
            out.extend(token.offset.to_le_bytes());
            out.extend((token.data.len() as u32).to_le_bytes());
            out.extend(&token.data);
        }
        out
    }

    pub fn decode(data: &[u8]) -> Result<TokenList> {
        let mut reader = TokenReader { data, pos: 0 };
        let count = reader.le_u32()?;
        let mut tokens = Vec::new();
        for _ in 0..count {
            let kind = reader.take(1)?[0];
            if kind != TOKEN_WRITE {
                return Err(RandomiserError::Patch(format!("unknown token type {kind}")));
            }
            let offset = reader.le_u32()?;
            let len = reader.le_u32()? as usize;
            let data = reader.take(len)?.to_vec();
            tokens.push(WriteToken { offset, data });
        }
        if reader.pos != data.len() {
            return Err(RandomiserError::Patch("trailing bytes after tokens".to_string()));
        }
        Ok(TokenList { tokens })
    }

    /// Replays the tokens in order; later writes win.
    pub fn apply(&self, rom: &mut Rom) -> Result<()> {
        for token in &self.tokens {
            rom.write_n(token.offset as usize, &token.data)?;
        }
        Ok(())
    }
}

/// Slot name bytes, cut to fit the NUL-terminated slot on a char boundary.
pub fn slot_name_bytes(player_name: &str) -> Vec<u8> {
    let mut end = player_name.len().min(SLOT_NAME_SIZE - 1);
    while !player_name.is_char_boundary(end) {
        end -= 1;
    }
    let mut out = player_name.as_bytes()[..end].to_vec();
    out.resize(SLOT_NAME_SIZE, 0);
    out
}

/// Per-seed data kept out of the shared delta: the slot name, what each
/// location gives, and the final boss toggle.
pub fn seed_tokens(settings: &RandomiserSettings, placements: &[ItemPlacement]) -> Result<TokenList> {
    let mut tokens = TokenList::default();
    tokens.write_bytes(SLOT_NAME_OFFS, &slot_name_bytes(&settings.player_name));

    for placement in placements {
        if !LOCATIONS.iter().any(|(_, id)| *id == placement.location) {
            return Err(RandomiserError::Config(format!(
                "placement for unknown location {}",
                placement.location
            )));
        }
    }

    for (_, location) in LOCATIONS {
        let info = location_info(location);
        let placed = placements
            .iter()
            .rev()
            .find(|p| p.location == location)
            .map(|p| p.item)
            .unwrap_or(PlacedItem::Remote);
        match placed {
            PlacedItem::Own { item } => {
                tokens.write_short_le(info, SELF_ITEM_KIND);
                tokens.write_short_le(info + 2, item);
            }
            PlacedItem::Remote => tokens.write_short_le(info, AP_ITEM_KIND),
        }
    }

    tokens.write_byte(SUPER_DEMON_KING_OFFS, settings.super_demon_king as u8);
    Ok(tokens)
}

/// Resolved toggles shipped next to the patch.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatchOptions {
    pub player_unit_rando: bool,
    pub player_unit_monsters: bool,
    pub super_demon_king: bool,
    pub smooth_level_caps: bool,
    pub min_endgame_level_cap: u8,
    pub required_holy_weapons: u8,
    pub exclude_latona: bool,
    pub easier_5x: bool,
    pub unbreakable_regalia: bool,
}

impl From<&RandomiserSettings> for PatchOptions {
    fn from(settings: &RandomiserSettings) -> Self {
        PatchOptions {
            player_unit_rando: settings.player_unit_rando,
            player_unit_monsters: settings.player_unit_monsters,
            super_demon_king: settings.super_demon_king,
            smooth_level_caps: settings.smooth_level_caps,
            min_endgame_level_cap: settings.min_endgame_level_cap,
            required_holy_weapons: settings.required_holy_weapons,
            exclude_latona: settings.exclude_latona,
            easier_5x: settings.easier_5x,
            unbreakable_regalia: settings.unbreakable_regalia,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcedureStep {
    pub step: String,
    pub file: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackageManifest {
    pub game: String,
    pub version: u32,
    pub player_name: String,
    pub seed: u64,
    pub base_size: usize,
    pub procedure: Vec<ProcedureStep>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PatchPackage {
    pub manifest: PackageManifest,
    pub delta: Vec<u8>,
    pub tokens: TokenList,
    pub options: PatchOptions,
}

impl PatchPackage {
    pub fn new(
        settings: &RandomiserSettings,
        base: &Rom,
        delta: Vec<u8>,
        tokens: TokenList,
    ) -> Self {
        let step = |step: &str, file: &str| ProcedureStep {
            step: step.to_string(),
            file: file.to_string(),
        };
        PatchPackage {
            manifest: PackageManifest {
                game: GAME_NAME.to_string(),
                version: PACKAGE_VERSION,
                player_name: settings.player_name.clone(),
                seed: settings.seed,
                base_size: base.len(),
                procedure: vec![step("apply_ips", DELTA_FILE), step("apply_tokens", TOKEN_FILE)],
            },
            delta,
            tokens,
            options: PatchOptions::from(settings),
        }
    }

    pub fn to_zip(&self) -> Result<Vec<u8>> {
        let manifest = serde_json::to_vec_pretty(&self.manifest)
            .map_err(|e| RandomiserError::Patch(e.to_string()))?;
        let options = serde_json::to_vec(&self.options)
            .map_err(|e| RandomiserError::Patch(e.to_string()))?;

        let file_options = FileOptions::default()
            .compression_method(CompressionMethod::Deflated)
            .last_modified_time(DateTime::default());
        let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
        for (name, data) in [
            (MANIFEST_FILE, manifest),
            (DELTA_FILE, self.delta.clone()),
            (TOKEN_FILE, self.tokens.encode()),
            (OPTIONS_FILE, options),
        ] {
            zip.start_file(name, file_options)?;
            zip.write_all(&data)?;
        }
        Ok(zip.finish()?.into_inner())
    }

    pub fn from_zip(bytes: &[u8]) -> Result<Self> {
        let mut archive = ZipArchive::new(Cursor::new(bytes))?;
        let mut read = |name: &str| -> Result<Vec<u8>> {
            let mut file = archive.by_name(name)?;
            let mut out = Vec::new();
            file.read_to_end(&mut out)?;
            Ok(out)
        };

        let manifest: PackageManifest = serde_json::from_slice(&read(MANIFEST_FILE)?)
            .map_err(|e| RandomiserError::Patch(format!("{MANIFEST_FILE}: {e}")))?;
        if manifest.game != GAME_NAME || manifest.version != PACKAGE_VERSION {
            return Err(RandomiserError::Patch(format!(
                "package is for {} v{}",
                manifest.game, manifest.version
            )));
        }
        let delta = read(DELTA_FILE)?;
        let tokens = TokenList::decode(&read(TOKEN_FILE)?)?;
        let options: PatchOptions = serde_json::from_slice(&read(OPTIONS_FILE)?)
            .map_err(|e| RandomiserError::Patch(format!("{OPTIONS_FILE}: {e}")))?;
        Ok(PatchPackage {
            manifest,
            delta,
            tokens,
            options,
        })
    }

    /// Rebuilds the patched image from `base`.
    pub fn apply(&self, base: &Rom) -> Result<Rom> {
        if base.len() != self.manifest.base_size {
            return Err(RandomiserError::Patch(format!(
                "base image is {} bytes, package expects {}",
                base.len(),
                self.manifest.base_size
            )));
        }
        let mut rom = base.clone();
        apply_ips_patch(&mut rom, &self.delta)?;
        self.tokens.apply(&mut rom)?;
        info!(
            "applied {} delta bytes and {} tokens",
            self.delta.len(),
            self.tokens.tokens.len()
        );
        Ok(rom)
    }
}

pub fn apply_package(base: &Rom, package: &[u8]) -> Result<Rom> {
    PatchPackage::from_zip(package)?.apply(base)
}
