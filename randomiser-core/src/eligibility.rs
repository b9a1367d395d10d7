//! Pure predicates deciding which jobs and weapons a spawn record may take.

use crate::catalog::{JobRecord, WeaponKind, WeaponRecord};
use crate::layout::NON_RANDOMIZABLE_JOBS;
use crate::logic::SpawnLogic;

pub const MONSTER_TAG: &str = "monster";
pub const FLYING_TAG: &str = "flying";

/// `forbid_monsters` is set when player monsters are disabled and the record
/// is player-controlled.
pub fn job_is_eligible(job: &JobRecord, logic: &SpawnLogic, forbid_monsters: bool) -> bool {
    if logic.forbidden_tags().any(|tag| job.has_tag(tag)) {
        return false;
    }
    if forbid_monsters && job.has_tag(MONSTER_TAG) {
        return false;
    }
    if NON_RANDOMIZABLE_JOBS.contains(&job.id) {
        return false;
    }
    if logic.must_fly() && !job.has_tag(FLYING_TAG) {
        return false;
    }
    if logic.must_fight() && !job.can_fight() {
        return false;
    }
    true
}

pub fn weapon_is_usable(weapon: &WeaponRecord, job: &JobRecord, logic: &SpawnLogic) -> bool {
    if !job.can_use(weapon.kind) {
        return false;
    }
    if weapon.locks.iter().any(|lock| !job.has_tag(lock)) {
        return false;
    }
    if logic.must_fight()
        && matches!(
            weapon.kind,
            WeaponKind::Item | WeaponKind::Staff | WeaponKind::Ring
        )
    {
        return false;
    }
    true
}
