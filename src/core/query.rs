//! Purpose: Filter and order the full record set for list/count calls.
//! Exports: `Criteria`, `filter`.
//! Role: Pure in-memory query engine; storage never pre-filters.
//! Invariants: Supplied criteria compose by logical AND; absent criteria
//! impose no constraint. Sorting is stable and ascending only.
//! Invariants: Birthday bounds are exclusive; numeric ranges are inclusive.

use crate::core::player::{Player, PlayerOrder, Profession, Race};

/// Optional filter predicates plus an optional sort key. `Default` supplies
/// the unconstrained criteria set.
#[derive(Clone, Debug, Default)]
pub struct Criteria {
    /// Substring match against the record's name.
    pub name: Option<String>,
    /// Substring match against the record's title.
    pub title: Option<String>,
    pub race: Option<Race>,
    pub profession: Option<Profession>,
    /// Epoch millis; passes only records born strictly after this instant.
    pub born_after: Option<i64>,
    /// Epoch millis; passes only records born strictly before this instant.
    pub born_before: Option<i64>,
    pub banned: Option<bool>,
    pub min_experience: Option<i32>,
    pub max_experience: Option<i32>,
    pub min_level: Option<i32>,
    pub max_level: Option<i32>,
    pub order: Option<PlayerOrder>,
}

impl Criteria {
    pub fn matches(&self, player: &Player) -> bool {
        if let Some(name) = &self.name {
            if !player.name.contains(name.as_str()) {
                return false;
            }
        }
        if let Some(title) = &self.title {
            if !player.title.contains(title.as_str()) {
                return false;
            }
        }
        if let Some(race) = self.race {
            if player.race != race {
                return false;
            }
        }
        if let Some(profession) = self.profession {
            if player.profession != profession {
                return false;
            }
        }
        if let Some(after) = self.born_after {
            if player.birthday <= after {
                return false;
            }
        }
        if let Some(before) = self.born_before {
            if player.birthday >= before {
                return false;
            }
        }
        if let Some(banned) = self.banned {
            if player.banned != banned {
                return false;
            }
        }
        if let Some(min) = self.min_experience {
            if player.experience < min {
                return false;
            }
        }
        if let Some(max) = self.max_experience {
            if player.experience > max {
                return false;
            }
        }
        if let Some(min) = self.min_level {
            if player.level < min {
                return false;
            }
        }
        if let Some(max) = self.max_level {
            if player.level > max {
                return false;
            }
        }
        true
    }
}

/// Keep every record matching all supplied criteria, then sort by the order
/// key if one was supplied. Without an order key the store's enumeration
/// order is preserved as-is.
pub fn filter(players: Vec<Player>, criteria: &Criteria) -> Vec<Player> {
    let mut players: Vec<Player> = players
        .into_iter()
        .filter(|player| criteria.matches(player))
        .collect();
    if let Some(order) = criteria.order {
        match order {
            PlayerOrder::Id => players.sort_by_key(|player| player.id),
            PlayerOrder::Name => players.sort_by(|a, b| a.name.cmp(&b.name)),
            PlayerOrder::Experience => players.sort_by_key(|player| player.experience),
            PlayerOrder::Birthday => players.sort_by_key(|player| player.birthday),
            PlayerOrder::Level => players.sort_by_key(|player| player.level),
        }
    }
    players
}

#[cfg(test)]
mod tests {
    use super::{Criteria, filter};
    use crate::core::level::derive_progress;
    use crate::core::player::{Player, PlayerOrder, Profession, Race};

    fn player(id: i64, name: &str, experience: i32) -> Player {
        let (level, until_next_level) = derive_progress(experience);
        Player {
            id,
            name: name.to_string(),
            title: format!("{name} the tested"),
            race: Race::Human,
            profession: Profession::Warrior,
            birthday: 1_000_000_000_000 + id,
            banned: false,
            experience,
            level,
            until_next_level,
        }
    }

    fn roster() -> Vec<Player> {
        vec![
            player(1, "Aragorn", 500),
            player(2, "Legolas", 10),
            player(3, "Gimli", 300),
        ]
    }

    #[test]
    fn name_filter_matches_substring() {
        let criteria = Criteria {
            name: Some("ago".to_string()),
            ..Criteria::default()
        };
        let result = filter(roster(), &criteria);
        assert_eq!(result.len(), 1);
        assert_eq!(result[0].name, "Aragorn");
    }

    #[test]
    fn empty_criteria_keep_everything_in_order() {
        let result = filter(roster(), &Criteria::default());
        let ids: Vec<i64> = result.iter().map(|player| player.id).collect();
        assert_eq!(ids, [1, 2, 3]);
    }

    #[test]
    fn criteria_compose_by_and() {
        let unconstrained = filter(roster(), &Criteria::default()).len();
        let one = Criteria {
            min_experience: Some(100),
            ..Criteria::default()
        };
        let two = Criteria {
            min_experience: Some(100),
            name: Some("G".to_string()),
            ..Criteria::default()
        };
        let with_one = filter(roster(), &one).len();
        let with_two = filter(roster(), &two).len();
        assert!(with_one <= unconstrained);
        assert!(with_two <= with_one);
        assert_eq!(with_two, 1);
    }

    #[test]
    fn birthday_bounds_are_exclusive() {
        let players = roster();
        let exact = players[0].birthday;
        let after = Criteria {
            born_after: Some(exact),
            ..Criteria::default()
        };
        assert!(
            filter(players.clone(), &after)
                .iter()
                .all(|player| player.birthday > exact)
        );

        let before = Criteria {
            born_before: Some(exact),
            ..Criteria::default()
        };
        assert!(
            filter(players, &before)
                .iter()
                .all(|player| player.birthday < exact)
        );
    }

    #[test]
    fn experience_range_is_inclusive() {
        let criteria = Criteria {
            min_experience: Some(10),
            max_experience: Some(300),
            ..Criteria::default()
        };
        let ids: Vec<i64> = filter(roster(), &criteria)
            .iter()
            .map(|player| player.id)
            .collect();
        assert_eq!(ids, [2, 3]);
    }

    #[test]
    fn banned_filter_matches_equality() {
        let mut players = roster();
        players[1].banned = true;
        let criteria = Criteria {
            banned: Some(true),
            ..Criteria::default()
        };
        let result = filter(players, &criteria);
        assert_eq!(result.len(), 1);
        assert_eq!(result[0].id, 2);
    }

    #[test]
    fn sort_by_experience_ascends() {
        let criteria = Criteria {
            order: Some(PlayerOrder::Experience),
            ..Criteria::default()
        };
        let experience: Vec<i32> = filter(roster(), &criteria)
            .iter()
            .map(|player| player.experience)
            .collect();
        assert_eq!(experience, [10, 300, 500]);
    }

    #[test]
    fn sort_by_name_ascends() {
        let criteria = Criteria {
            order: Some(PlayerOrder::Name),
            ..Criteria::default()
        };
        let names: Vec<String> = filter(roster(), &criteria)
            .into_iter()
            .map(|player| player.name)
            .collect();
        assert_eq!(names, ["Aragorn", "Gimli", "Legolas"]);
    }

    #[test]
    fn sort_preserves_order_of_equal_keys() {
        let mut players = roster();
        for player in &mut players {
            player.level = 1;
        }
        let criteria = Criteria {
            order: Some(PlayerOrder::Level),
            ..Criteria::default()
        };
        let ids: Vec<i64> = filter(players, &criteria)
            .iter()
            .map(|player| player.id)
            .collect();
        assert_eq!(ids, [1, 2, 3]);
    }
}
