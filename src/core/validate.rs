//! Purpose: Field-level validity rules for roster writes.
//! Exports: per-field predicates plus `check_new_player` and `check_patch`.
//! Role: The only gate between incoming payloads and the record store.
//! Invariants: Predicates are pure; a payload check reports the first failing
//! field as one combined `Validation` error and commits nothing.
//! Invariants: Birthday bounds are exclusive at both ends.

use crate::core::error::{Error, ErrorKind};
use crate::core::player::{NewPlayer, PlayerPatch};

pub const NAME_MAX_CHARS: usize = 12;
pub const TITLE_MAX_CHARS: usize = 30;
pub const EXPERIENCE_MAX: i32 = 10_000_000;

/// 2000-01-01T00:00:00Z in epoch milliseconds. Valid birthdays are strictly
/// after this instant.
pub const BIRTHDAY_MIN_EXCLUSIVE_MS: i64 = 946_684_800_000;

/// 3000-01-01T00:00:00Z in epoch milliseconds. Valid birthdays are strictly
/// before this instant.
pub const BIRTHDAY_MAX_EXCLUSIVE_MS: i64 = 32_503_680_000_000;

pub fn name_is_valid(name: &str) -> bool {
    !name.is_empty() && name.chars().count() <= NAME_MAX_CHARS
}

pub fn title_is_valid(title: &str) -> bool {
    !title.is_empty() && title.chars().count() <= TITLE_MAX_CHARS
}

pub fn experience_is_valid(experience: i32) -> bool {
    (0..=EXPERIENCE_MAX).contains(&experience)
}

pub fn birthday_is_valid(birthday_ms: i64) -> bool {
    birthday_ms > BIRTHDAY_MIN_EXCLUSIVE_MS && birthday_ms < BIRTHDAY_MAX_EXCLUSIVE_MS
}

/// Full create check: name, title, experience, and birthday must each pass.
/// Race, profession, and banned are well-formed by construction.
pub fn check_new_player(new: &NewPlayer) -> Result<(), Error> {
    if !name_is_valid(&new.name) {
        return Err(invalid("name", "name must be 1..=12 characters"));
    }
    if !title_is_valid(&new.title) {
        return Err(invalid("title", "title must be 1..=30 characters"));
    }
    if !experience_is_valid(new.experience) {
        return Err(invalid("experience", "experience must be in 0..=10000000"));
    }
    if !birthday_is_valid(new.birthday) {
        return Err(invalid(
            "birthday",
            "birthday must fall strictly between years 2000 and 3000",
        ));
    }
    Ok(())
}

/// Patch check: only present fields are validated; one invalid field rejects
/// the whole patch.
pub fn check_patch(patch: &PlayerPatch) -> Result<(), Error> {
    if let Some(name) = &patch.name {
        if !name_is_valid(name) {
            return Err(invalid("name", "name must be 1..=12 characters"));
        }
    }
    if let Some(title) = &patch.title {
        if !title_is_valid(title) {
            return Err(invalid("title", "title must be 1..=30 characters"));
        }
    }
    if let Some(experience) = patch.experience {
        if !experience_is_valid(experience) {
            return Err(invalid("experience", "experience must be in 0..=10000000"));
        }
    }
    if let Some(birthday) = patch.birthday {
        if !birthday_is_valid(birthday) {
            return Err(invalid(
                "birthday",
                "birthday must fall strictly between years 2000 and 3000",
            ));
        }
    }
    Ok(())
}

fn invalid(field: &'static str, message: &'static str) -> Error {
    Error::new(ErrorKind::Validation)
        .with_message(message)
        .with_field(field)
}
