//! Purpose: Define the player entity, its closed enumerations, and write payloads.
//! Exports: `Player`, `Race`, `Profession`, `PlayerOrder`, `NewPlayer`, `PlayerPatch`.
//! Role: Stable record envelope aligned with the HTTP and CLI contract.
//! Invariants: Wire fields are camelCase; enumerants are UPPERCASE; birthday is epoch millis.
//! Invariants: Derived fields (`level`, `untilNextLevel`) never appear in write payloads.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Race {
    Human,
    Dwarf,
    Elf,
    Giant,
    Orc,
    Troll,
    Hobbit,
}

impl Race {
    pub fn as_str(self) -> &'static str {
        match self {
            Race::Human => "HUMAN",
            Race::Dwarf => "DWARF",
            Race::Elf => "ELF",
            Race::Giant => "GIANT",
            Race::Orc => "ORC",
            Race::Troll => "TROLL",
            Race::Hobbit => "HOBBIT",
        }
    }
}

impl fmt::Display for Race {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Race {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.to_ascii_uppercase().as_str() {
            "HUMAN" => Ok(Race::Human),
            "DWARF" => Ok(Race::Dwarf),
            "ELF" => Ok(Race::Elf),
            "GIANT" => Ok(Race::Giant),
            "ORC" => Ok(Race::Orc),
            "TROLL" => Ok(Race::Troll),
            "HOBBIT" => Ok(Race::Hobbit),
            _ => Err(format!("unknown race: {value}")),
        }
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Profession {
    Warrior,
    Rogue,
    Sorcerer,
    Cleric,
    Paladin,
    Nazgul,
    Warlock,
    Druid,
}

impl Profession {
    pub fn as_str(self) -> &'static str {
        match self {
            Profession::Warrior => "WARRIOR",
            Profession::Rogue => "ROGUE",
            Profession::Sorcerer => "SORCERER",
            Profession::Cleric => "CLERIC",
            Profession::Paladin => "PALADIN",
            Profession::Nazgul => "NAZGUL",
            Profession::Warlock => "WARLOCK",
            Profession::Druid => "DRUID",
        }
    }
}

impl fmt::Display for Profession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Profession {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.to_ascii_uppercase().as_str() {
            "WARRIOR" => Ok(Profession::Warrior),
            "ROGUE" => Ok(Profession::Rogue),
            "SORCERER" => Ok(Profession::Sorcerer),
            "CLERIC" => Ok(Profession::Cleric),
            "PALADIN" => Ok(Profession::Paladin),
            "NAZGUL" => Ok(Profession::Nazgul),
            "WARLOCK" => Ok(Profession::Warlock),
            "DRUID" => Ok(Profession::Druid),
            _ => Err(format!("unknown profession: {value}")),
        }
    }
}

/// Sort key for listings. Ascending only; ties keep their relative order.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum PlayerOrder {
    Id,
    Name,
    Experience,
    Birthday,
    Level,
}

impl PlayerOrder {
    pub fn as_str(self) -> &'static str {
        match self {
            PlayerOrder::Id => "ID",
            PlayerOrder::Name => "NAME",
            PlayerOrder::Experience => "EXPERIENCE",
            PlayerOrder::Birthday => "BIRTHDAY",
            PlayerOrder::Level => "LEVEL",
        }
    }
}

impl fmt::Display for PlayerOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PlayerOrder {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.to_ascii_uppercase().as_str() {
            "ID" => Ok(PlayerOrder::Id),
            "NAME" => Ok(PlayerOrder::Name),
            "EXPERIENCE" => Ok(PlayerOrder::Experience),
            "BIRTHDAY" => Ok(PlayerOrder::Birthday),
            "LEVEL" => Ok(PlayerOrder::Level),
            _ => Err(format!("unknown order: {value}")),
        }
    }
}

/// A stored roster record. `level` and `until_next_level` are derived from
/// `experience` and are recomputed on every accepted write.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Player {
    pub id: i64,
    pub name: String,
    pub title: String,
    pub race: Race,
    pub profession: Profession,
    /// Epoch milliseconds, UTC.
    pub birthday: i64,
    pub banned: bool,
    pub experience: i32,
    pub level: i32,
    pub until_next_level: i32,
}

/// Create payload. Carries no id and no derived fields; unknown wire fields
/// (including client-sent `level`/`untilNextLevel`) are ignored.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewPlayer {
    pub name: String,
    pub title: String,
    pub race: Race,
    pub profession: Profession,
    pub birthday: i64,
    #[serde(default)]
    pub banned: bool,
    pub experience: i32,
}

/// Partial-update payload. Absent fields leave the stored value untouched.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub race: Option<Race>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub profession: Option<Profession>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub birthday: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub banned: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub experience: Option<i32>,
}

#[cfg(test)]
mod tests {
    use super::{NewPlayer, Player, PlayerOrder, PlayerPatch, Profession, Race};
    use serde_json::json;

    #[test]
    fn player_wire_shape_is_camel_case() {
        let player = Player {
            id: 7,
            name: "Aragorn".to_string(),
            title: "Heir of Isildur".to_string(),
            race: Race::Human,
            profession: Profession::Warrior,
            birthday: 1_000_000_000_000,
            banned: false,
            experience: 500,
            level: 2,
            until_next_level: 100,
        };
        let value = serde_json::to_value(&player).expect("serialize");
        assert_eq!(
            value,
            json!({
                "id": 7,
                "name": "Aragorn",
                "title": "Heir of Isildur",
                "race": "HUMAN",
                "profession": "WARRIOR",
                "birthday": 1_000_000_000_000_i64,
                "banned": false,
                "experience": 500,
                "level": 2,
                "untilNextLevel": 100,
            })
        );
    }

    #[test]
    fn enums_parse_case_insensitively() {
        assert_eq!("hobbit".parse::<Race>().expect("race"), Race::Hobbit);
        assert_eq!(
            "Nazgul".parse::<Profession>().expect("profession"),
            Profession::Nazgul
        );
        assert_eq!(
            "birthday".parse::<PlayerOrder>().expect("order"),
            PlayerOrder::Birthday
        );
        assert!("ENT".parse::<Race>().is_err());
    }

    #[test]
    fn patch_ignores_unknown_and_derived_fields() {
        let patch: PlayerPatch = serde_json::from_value(json!({
            "experience": 9000,
            "level": 99,
            "untilNextLevel": 1,
        }))
        .expect("deserialize");
        assert_eq!(patch.experience, Some(9000));
        assert!(patch.name.is_none());
    }

    #[test]
    fn new_player_banned_defaults_to_false() {
        let new: NewPlayer = serde_json::from_value(json!({
            "name": "Frodo",
            "title": "Ring-bearer",
            "race": "HOBBIT",
            "profession": "ROGUE",
            "birthday": 946_684_800_001_i64,
            "experience": 0,
        }))
        .expect("deserialize");
        assert!(!new.banned);
    }

    #[test]
    fn patch_serializes_only_present_fields() {
        let patch = PlayerPatch {
            experience: Some(100),
            ..PlayerPatch::default()
        };
        let value = serde_json::to_value(&patch).expect("serialize");
        assert_eq!(value, json!({ "experience": 100 }));
    }
}
