//! Typed per-record constraints for chapter unit blocks.
//!
//! Block logic in `chapter_unit_blocks.json` is keyed either by a record
//! index (`"3": {...}`) or by a flag name that is broadcast across the block
//! (`"must_fight": {"at_least": 2}` or `"no_store": true`). Both are parsed
//! into closed types here so that a typo in the data is a load-time error
//! rather than a silently ignored key.

use std::collections::BTreeMap;
use std::fmt;

use rand::Rng;
use serde::Serialize;
use serde_json::Value;

use crate::layout::{AI_SIZE, COORD_MAX};

#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum LogicFlag {
    MustFly,
    MustFight,
    NoStore,
    Ignore,
    Player,
    /// `no_<tag>`: jobs carrying `tag` are ineligible.
    Forbid(String),
}

impl LogicFlag {
    pub fn parse(key: &str) -> Option<LogicFlag> {
        match key {
            "must_fly" => Some(LogicFlag::MustFly),
            "must_fight" => Some(LogicFlag::MustFight),
            "no_store" => Some(LogicFlag::NoStore),
            "ignore" => Some(LogicFlag::Ignore),
            "player" => Some(LogicFlag::Player),
            // `no_fly` predates the generic form and pairs with `must_fly`.
            "no_fly" => Some(LogicFlag::Forbid("flying".to_string())),
            _ => key
                .strip_prefix("no_")
                .filter(|tag| !tag.is_empty())
                .map(|tag| LogicFlag::Forbid(tag.to_string())),
        }
    }

    pub fn name(&self) -> String {
        match self {
            LogicFlag::MustFly => "must_fly".to_string(),
            LogicFlag::MustFight => "must_fight".to_string(),
            LogicFlag::NoStore => "no_store".to_string(),
            LogicFlag::Ignore => "ignore".to_string(),
            LogicFlag::Player => "player".to_string(),
            LogicFlag::Forbid(tag) => format!("no_{tag}"),
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct Nudges {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start: Option<(u8, u8)>,
    /// Destination of the last scripted move.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end: Option<(u8, u8)>,
    /// Destinations of individual scripted moves, by index.
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub moves: BTreeMap<usize, (u8, u8)>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct AiSwap {
    pub slot: usize,
    pub from: u8,
    pub to: u8,
}

/// Accumulated constraints for a single spawn record.
///
/// Flags are tri-state: `None` means "not mentioned", which lets character
/// tags imply a flag without overriding an explicit `false` on the record.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct SpawnLogic {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub must_fly: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub must_fight: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub no_store: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ignore: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub player: Option<bool>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub forbidden: BTreeMap<String, bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nudges: Option<Nudges>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ai: Option<AiSwap>,
}

impl SpawnLogic {
    pub fn flag(&self, flag: &LogicFlag) -> Option<bool> {
        match flag {
            LogicFlag::MustFly => self.must_fly,
            LogicFlag::MustFight => self.must_fight,
            LogicFlag::NoStore => self.no_store,
            LogicFlag::Ignore => self.ignore,
            LogicFlag::Player => self.player,
            LogicFlag::Forbid(tag) => self.forbidden.get(tag).copied(),
        }
    }

    pub fn set_flag(&mut self, flag: &LogicFlag, value: bool) {
        match flag {
            LogicFlag::MustFly => self.must_fly = Some(value),
            LogicFlag::MustFight => self.must_fight = Some(value),
            LogicFlag::NoStore => self.no_store = Some(value),
            LogicFlag::Ignore => self.ignore = Some(value),
            LogicFlag::Player => self.player = Some(value),
            LogicFlag::Forbid(tag) => {
                self.forbidden.insert(tag.clone(), value);
            }
        }
    }

    /// Sets `flag` unless the record already states it explicitly.
    pub fn imply(&mut self, flag: &LogicFlag) {
        if self.flag(flag).is_none() {
            self.set_flag(flag, true);
        }
    }

    pub fn must_fly(&self) -> bool {
        self.must_fly.unwrap_or(false)
    }

    pub fn must_fight(&self) -> bool {
        self.must_fight.unwrap_or(false)
    }

    pub fn no_store(&self) -> bool {
        self.no_store.unwrap_or(false)
    }

    pub fn ignore(&self) -> bool {
        self.ignore.unwrap_or(false)
    }

    pub fn forbidden_tags(&self) -> impl Iterator<Item = &str> {
        self.forbidden
            .iter()
            .filter(|(_, on)| **on)
            .map(|(tag, _)| tag.as_str())
    }

    pub fn from_value(value: &Value) -> Result<SpawnLogic, String> {
        let obj = value
            .as_object()
            .ok_or_else(|| format!("record logic must be an object, got {value}"))?;
        let mut logic = SpawnLogic::default();
        for (key, v) in obj {
            match key.as_str() {
                "nudges" | "nudge" => logic.nudges = Some(parse_nudges(v)?),
                "ai" => logic.ai = Some(parse_ai_swap(v)?),
                _ => {
                    let flag = LogicFlag::parse(key)
                        .ok_or_else(|| format!("unknown logic key `{key}`"))?;
                    let on = v
                        .as_bool()
                        .ok_or_else(|| format!("logic flag `{key}` must be a boolean"))?;
                    logic.set_flag(&flag, on);
                }
            }
        }
        Ok(logic)
    }
}

impl fmt::Display for SpawnLogic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match serde_json::to_string_pretty(self) {
            Ok(s) => f.write_str(&s),
            Err(_) => write!(f, "{self:?}"),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Selection {
    All(bool),
    AtLeast(usize),
}

/// A flag broadcast over the records of one block.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GroupRule {
    pub flag: LogicFlag,
    pub selection: Selection,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct BlockLogic {
    pub records: Vec<SpawnLogic>,
    /// In document order; `AtLeast` draws depend on it.
    pub groups: Vec<GroupRule>,
}

impl BlockLogic {
    pub fn parse(entries: &[(String, Value)], count: usize) -> Result<BlockLogic, String> {
        let mut block = BlockLogic {
            records: vec![SpawnLogic::default(); count],
            groups: Vec::new(),
        };
        for (key, value) in entries {
            if let Ok(index) = key.parse::<usize>() {
                if index >= count {
                    return Err(format!("record index {index} out of range (count {count})"));
                }
                block.records[index] = SpawnLogic::from_value(value)?;
                continue;
            }

            let flag = LogicFlag::parse(key).ok_or_else(|| format!("unknown group rule `{key}`"))?;
            let selection = match value {
                Value::Bool(on) => Selection::All(*on),
                Value::Object(obj) => {
                    let n = obj
                        .get("at_least")
                        .and_then(Value::as_u64)
                        .ok_or_else(|| format!("group rule `{key}` needs an integer `at_least`"))?
                        as usize;
                    if obj.len() != 1 {
                        return Err(format!("group rule `{key}` has unknown fields"));
                    }
                    if n > count {
                        return Err(format!(
                            "group rule `{key}` wants at least {n} of {count} records"
                        ));
                    }
                    Selection::AtLeast(n)
                }
                other => return Err(format!("group rule `{key}` has invalid value {other}")),
            };
            block.groups.push(GroupRule { flag, selection });
        }
        Ok(block)
    }

    /// Expands group rules into per-record flags, drawing subsets from `rng`.
    pub fn expand<R: Rng>(&self, rng: &mut R) -> Vec<SpawnLogic> {
        let mut records = self.records.clone();
        for rule in &self.groups {
            match rule.selection {
                Selection::All(on) => {
                    for logic in records.iter_mut() {
                        logic.set_flag(&rule.flag, on);
                    }
                }
                Selection::AtLeast(n) => {
                    for i in rand::seq::index::sample(rng, records.len(), n).into_vec() {
                        records[i].set_flag(&rule.flag, true);
                    }
                }
            }
        }
        records
    }
}

fn parse_coords(value: &Value) -> Result<(u8, u8), String> {
    let pair = value
        .as_array()
        .filter(|a| a.len() == 2)
        .ok_or_else(|| format!("coordinates must be [x, y], got {value}"))?;
    let mut out = [0u8; 2];
    for (slot, v) in out.iter_mut().zip(pair) {
        *slot = v
            .as_u64()
            .filter(|c| *c <= COORD_MAX as u64)
            .ok_or_else(|| format!("coordinate {v} outside 0..={COORD_MAX}"))? as u8;
    }
    Ok((out[0], out[1]))
}

fn parse_nudges(value: &Value) -> Result<Nudges, String> {
    let obj = value
        .as_object()
        .ok_or_else(|| "nudges must be an object".to_string())?;
    let mut nudges = Nudges::default();
    for (key, v) in obj {
        let coords = parse_coords(v)?;
        match key.as_str() {
            "start" => nudges.start = Some(coords),
            "end" => nudges.end = Some(coords),
            _ => {
                let index = key
                    .parse::<usize>()
                    .map_err(|_| format!("unknown nudge target `{key}`"))?;
                nudges.moves.insert(index, coords);
            }
        }
    }
    Ok(nudges)
}

fn parse_ai_swap(value: &Value) -> Result<AiSwap, String> {
    let obj = value
        .as_object()
        .ok_or_else(|| "ai substitution must be an object".to_string())?;
    let byte = |name: &str| -> Result<u8, String> {
        obj.get(name)
            .and_then(Value::as_u64)
            .and_then(|v| u8::try_from(v).ok())
            .ok_or_else(|| format!("ai substitution needs a byte `{name}`"))
    };
    let slot = match obj.get("slot") {
        None => 0,
        Some(v) => v
            .as_u64()
            .map(|s| s as usize)
            .filter(|s| *s < AI_SIZE)
            .ok_or_else(|| format!("ai slot must be below {AI_SIZE}"))?,
    };
    Ok(AiSwap {
        slot,
        from: byte("from")?,
        to: byte("to")?,
    })
}
