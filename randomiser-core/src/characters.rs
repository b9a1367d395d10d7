use std::collections::{BTreeMap, BTreeSet};

use crate::catalog::{CharacterEntry, JobRecord};

static NO_TAGS: BTreeSet<String> = BTreeSet::new();

/// Class assignments keyed by canonical character name, so every id a
/// character appears under resolves to the same class for the whole pass.
#[derive(Clone, Debug, Default)]
pub struct CharacterStore {
    names_by_id: BTreeMap<u8, String>,
    ids_by_name: BTreeMap<String, Vec<u8>>,
    tags: BTreeMap<String, BTreeSet<String>>,
    jobs: BTreeMap<String, JobRecord>,
}

impl CharacterStore {
    pub fn new(characters: &BTreeMap<String, CharacterEntry>) -> Self {
        let mut store = CharacterStore::default();
        for (name, entry) in characters {
            for id in &entry.ids {
                store.names_by_id.insert(*id, name.clone());
            }
            store.ids_by_name.insert(name.clone(), entry.ids.clone());
            store.tags.insert(name.clone(), entry.tags.clone());
        }
        store
    }

    pub fn lookup_name(&self, char_id: u8) -> Option<&str> {
        self.names_by_id.get(&char_id).map(String::as_str)
    }

    pub fn lookup_ids(&self, name: &str) -> Option<&[u8]> {
        self.ids_by_name.get(name).map(Vec::as_slice)
    }

    pub fn tags_by_id(&self, char_id: u8) -> &BTreeSet<String> {
        self.lookup_name(char_id)
            .map(|name| self.tags_by_name(name))
            .unwrap_or(&NO_TAGS)
    }

    pub fn tags_by_name(&self, name: &str) -> &BTreeSet<String> {
        self.tags.get(name).unwrap_or(&NO_TAGS)
    }

    pub fn get_by_id(&self, char_id: u8) -> Option<&JobRecord> {
        self.lookup_name(char_id)
            .and_then(|name| self.get_by_name(name))
    }

    pub fn get_by_name(&self, name: &str) -> Option<&JobRecord> {
        self.jobs.get(name)
    }

    /// Records `job` for the character behind `char_id`. Unknown ids and
    /// characters that already have a class are left alone.
    pub fn set_by_id(&mut self, char_id: u8, job: &JobRecord) {
        if let Some(name) = self.names_by_id.get(&char_id).cloned() {
            self.set_by_name(&name, job);
        }
    }

    pub fn set_by_name(&mut self, name: &str, job: &JobRecord) {
        if !self.ids_by_name.contains_key(name) {
            return;
        }
        self.jobs
            .entry(name.to_string())
            .or_insert_with(|| job.clone());
    }

    pub fn contains_by_id(&self, char_id: u8) -> bool {
        self.get_by_id(char_id).is_some()
    }

    pub fn contains_by_name(&self, name: &str) -> bool {
        self.jobs.contains_key(name)
    }

    pub fn assignments(&self) -> &BTreeMap<String, JobRecord> {
        &self.jobs
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support;

    fn store() -> (CharacterStore, crate::catalog::Catalog) {
        let catalog = test_support::catalog();
        (CharacterStore::new(&catalog.characters), catalog)
    }

    #[test]
    fn aliases_share_one_assignment() {
        let (mut store, catalog) = store();
        let knight = catalog.job(0x09).unwrap();
        store.set_by_id(69, knight);
        assert_eq!(store.lookup_name(70), Some("Breguet"));
        assert_eq!(store.get_by_id(70).unwrap().id, 0x09);
        assert!(store.contains_by_name("Breguet"));
    }

    #[test]
    fn first_assignment_wins() {
        let (mut store, catalog) = store();
        store.set_by_name("Seth", catalog.job(0x07).unwrap());
        store.set_by_id(2, catalog.job(0x29).unwrap());
        assert_eq!(store.get_by_name("Seth").unwrap().id, 0x07);
    }

    #[test]
    fn unknown_characters_are_ignored() {
        let (mut store, catalog) = store();
        store.set_by_id(0x80, catalog.job(0x05).unwrap());
        store.set_by_name("Nobody", catalog.job(0x05).unwrap());
        assert!(!store.contains_by_id(0x80));
        assert!(store.assignments().is_empty());
        assert!(store.tags_by_id(0x80).is_empty());
        assert!(store.tags_by_name("Nobody").is_empty());
        assert_eq!(store.lookup_ids("Nobody"), None);
    }

    #[test]
    fn tags_resolve_through_ids() {
        let (store, _) = store();
        assert!(store.tags_by_id(3).contains("must_fly"));
        assert!(store.tags_by_name("Ross").contains("must_fight"));
        assert_eq!(store.lookup_ids("Breguet"), Some(&[69, 70][..]));
    }
}
