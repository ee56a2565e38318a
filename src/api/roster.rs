//! Purpose: Orchestrate roster reads and writes over a record store.
//! Exports: `LocalRoster`.
//! Role: Validate, derive, then persist for writes; scan, filter, paginate
//! for reads. Mirrors the HTTP surface one-to-one.
//! Invariants: No write reaches the store without passing validation.
//! Invariants: Updates build a fresh record and replace it whole; the stored
//! value is never half-mutated.
//! Invariants: Every list/count call re-reads the full set; nothing is cached.

use crate::core::error::{Error, ErrorKind};
use crate::core::level::derive_progress;
use crate::core::page::{self, PageSpec};
use crate::core::player::{NewPlayer, Player, PlayerPatch};
use crate::core::query::{self, Criteria};
use crate::core::store::PlayerStore;
use crate::core::validate;

pub struct LocalRoster<S> {
    store: S,
}

impl<S: PlayerStore> LocalRoster<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn create_player(&self, new: NewPlayer) -> Result<Player, Error> {
        validate::check_new_player(&new)?;
        let (level, until_next_level) = derive_progress(new.experience);
        self.store.insert(Player {
            id: 0,
            name: new.name,
            title: new.title,
            race: new.race,
            profession: new.profession,
            birthday: new.birthday,
            banned: new.banned,
            experience: new.experience,
            level,
            until_next_level,
        })
    }

    pub fn player_by_id(&self, id: i64) -> Result<Player, Error> {
        if id <= 0 {
            return Err(Error::new(ErrorKind::Usage)
                .with_message("player id must be positive")
                .with_id(id));
        }
        self.store.fetch(id)?.ok_or_else(|| {
            Error::new(ErrorKind::NotFound)
                .with_message("no player with this id")
                .with_id(id)
        })
    }

    pub fn update_player(&self, id: i64, patch: PlayerPatch) -> Result<Player, Error> {
        let current = self.player_by_id(id)?;
        validate::check_patch(&patch)?;
        let updated = apply_patch(current, patch);
        self.store.replace(&updated)?;
        Ok(updated)
    }

    pub fn delete_player(&self, id: i64) -> Result<(), Error> {
        let player = self.player_by_id(id)?;
        self.store.delete(player.id)?;
        Ok(())
    }

    pub fn list_players(&self, criteria: &Criteria, page: &PageSpec) -> Result<Vec<Player>, Error> {
        let all = self.store.scan_all()?;
        Ok(page::paginate(query::filter(all, criteria), page))
    }

    /// Size of the filtered set before pagination.
    pub fn count_players(&self, criteria: &Criteria) -> Result<usize, Error> {
        let all = self.store.scan_all()?;
        Ok(query::filter(all, criteria).len())
    }
}

/// Merge a validated patch over the current record. The derived pair is
/// recomputed from whichever experience value ends up effective.
fn apply_patch(current: Player, patch: PlayerPatch) -> Player {
    let experience = patch.experience.unwrap_or(current.experience);
    let (level, until_next_level) = derive_progress(experience);
    Player {
        id: current.id,
        name: patch.name.unwrap_or(current.name),
        title: patch.title.unwrap_or(current.title),
        race: patch.race.unwrap_or(current.race),
        profession: patch.profession.unwrap_or(current.profession),
        birthday: patch.birthday.unwrap_or(current.birthday),
        banned: patch.banned.unwrap_or(current.banned),
        experience,
        level,
        until_next_level,
    }
}

#[cfg(test)]
mod tests {
    use super::LocalRoster;
    use crate::core::error::ErrorKind;
    use crate::core::page::PageSpec;
    use crate::core::player::{NewPlayer, PlayerOrder, PlayerPatch, Profession, Race};
    use crate::core::query::Criteria;
    use crate::core::store::MemoryStore;

    fn roster() -> LocalRoster<MemoryStore> {
        LocalRoster::new(MemoryStore::new())
    }

    fn new_player(name: &str, experience: i32) -> NewPlayer {
        NewPlayer {
            name: name.to_string(),
            title: format!("{name} of the roster"),
            race: Race::Elf,
            profession: Profession::Sorcerer,
            birthday: 1_200_000_000_000,
            banned: false,
            experience,
        }
    }

    #[test]
    fn create_derives_level_fields() {
        let roster = roster();
        let player = roster.create_player(new_player("Elrond", 500)).expect("create");
        assert_eq!(player.id, 1);
        assert_eq!(player.level, 2);
        assert_eq!(player.until_next_level, 100);
    }

    #[test]
    fn create_rejects_invalid_payload_without_persisting() {
        let roster = roster();
        let mut bad = new_player("Celebrimbor", 0);
        bad.name = "thirteen-chars".to_string();
        let err = roster.create_player(bad).expect_err("invalid");
        assert_eq!(err.kind(), ErrorKind::Validation);
        assert_eq!(roster.count_players(&Criteria::default()).expect("count"), 0);
    }

    #[test]
    fn get_distinguishes_bad_id_from_missing_id() {
        let roster = roster();
        assert_eq!(
            roster.player_by_id(0).expect_err("bad id").kind(),
            ErrorKind::Usage
        );
        assert_eq!(
            roster.player_by_id(-5).expect_err("bad id").kind(),
            ErrorKind::Usage
        );
        assert_eq!(
            roster.player_by_id(41).expect_err("missing").kind(),
            ErrorKind::NotFound
        );
    }

    #[test]
    fn update_with_only_experience_keeps_other_fields() {
        let roster = roster();
        let created = roster.create_player(new_player("Galadriel", 10)).expect("create");

        let patch = PlayerPatch {
            experience: Some(700),
            ..PlayerPatch::default()
        };
        let updated = roster.update_player(created.id, patch).expect("update");

        assert_eq!(updated.name, created.name);
        assert_eq!(updated.title, created.title);
        assert_eq!(updated.race, created.race);
        assert_eq!(updated.birthday, created.birthday);
        assert_eq!(updated.experience, 700);
        assert_eq!(updated.level, 3);
        assert_eq!(updated.until_next_level, 300);
    }

    #[test]
    fn invalid_field_rejects_whole_update() {
        let roster = roster();
        let created = roster.create_player(new_player("Thranduil", 10)).expect("create");

        let patch = PlayerPatch {
            title: Some("t".repeat(31)),
            experience: Some(700),
            ..PlayerPatch::default()
        };
        let err = roster.update_player(created.id, patch).expect_err("invalid");
        assert_eq!(err.kind(), ErrorKind::Validation);

        let stored = roster.player_by_id(created.id).expect("get");
        assert_eq!(stored.experience, 10, "valid half of the patch must not land");
        assert_eq!(stored.title, created.title);
    }

    #[test]
    fn empty_patch_is_a_no_op_update() {
        let roster = roster();
        let created = roster.create_player(new_player("Cirdan", 250)).expect("create");
        let updated = roster
            .update_player(created.id, PlayerPatch::default())
            .expect("update");
        assert_eq!(updated, created);
    }

    #[test]
    fn delete_is_gated_by_get() {
        let roster = roster();
        let created = roster.create_player(new_player("Glorfindel", 0)).expect("create");
        roster.delete_player(created.id).expect("delete");
        assert_eq!(
            roster.player_by_id(created.id).expect_err("gone").kind(),
            ErrorKind::NotFound
        );
        assert_eq!(
            roster.delete_player(created.id).expect_err("gone").kind(),
            ErrorKind::NotFound
        );
    }

    #[test]
    fn list_filters_sorts_and_pages_while_count_ignores_paging() {
        let roster = roster();
        for (name, experience) in [
            ("Aragorn", 500),
            ("Boromir", 10),
            ("Faramir", 300),
            ("Eomer", 450),
            ("Theoden", 900),
        ] {
            roster.create_player(new_player(name, experience)).expect("create");
        }

        let criteria = Criteria {
            min_experience: Some(100),
            order: Some(PlayerOrder::Experience),
            ..Criteria::default()
        };
        let page = PageSpec {
            number: Some(1),
            size: Some(2),
        };
        let listed = roster.list_players(&criteria, &page).expect("list");
        let experience: Vec<i32> = listed.iter().map(|player| player.experience).collect();
        assert_eq!(experience, [500, 900]);

        assert_eq!(roster.count_players(&criteria).expect("count"), 4);
    }

    #[test]
    fn derived_pair_stays_consistent_in_the_store() {
        let roster = roster();
        let created = roster.create_player(new_player("Eowyn", 99)).expect("create");
        assert_eq!(created.level, 0);

        roster
            .update_player(
                created.id,
                PlayerPatch {
                    experience: Some(100),
                    ..PlayerPatch::default()
                },
            )
            .expect("update");

        let stored = roster.player_by_id(created.id).expect("get");
        assert_eq!(stored.level, 1);
        assert_eq!(stored.until_next_level, 50 * 2 * 3 - 100);
    }
}
