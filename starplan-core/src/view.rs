use serde::{Deserialize, Serialize};

use crate::{Error, Group, Result, Semester, StudyProgram};

/// Saved view preferences decoded from the `myview` cookie.
///
/// The boolean display flags and `act`/`sel`/`cb` are opaque to this client
/// and kept only so they can be passed back unchanged.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SavedView {
    pub lan: String,
    pub acc: bool,
    pub act: String,
    pub sel: String,
    /// `pu`
    pub semester_id: i64,
    /// `og`
    pub study_program_id: i64,
    /// `pg`
    pub group_short_name: String,
    pub sd: bool,
    pub loc: i64,
    pub sa: bool,
    pub cb: String,
}

impl SavedView {
    /// Decode a raw `myview` cookie value.
    ///
    /// Only `%3D` and `%26` are unescaped. Unknown keys are ignored, absent
    /// keys keep their zero value. A recognized key with an unparseable value
    /// is an error.
    pub fn from_cookie_value(raw: &str) -> Result<Self> {
        let decoded = raw.replace("%3D", "=").replace("%26", "&");
        let mut view = Self::default();

        for pair in decoded.split('&').filter(|p| !p.is_empty()) {
            let (key, value) = pair.split_once('=').ok_or_else(|| Error::SavedView {
                key: pair.to_string(),
                value: String::new(),
            })?;

            match key {
                "lan" => view.lan = value.to_string(),
                "acc" => view.acc = parse_bool(key, value)?,
                "act" => view.act = value.to_string(),
                "sel" => view.sel = value.to_string(),
                "pu" => view.semester_id = parse_int(key, value)?,
                "og" => view.study_program_id = parse_int(key, value)?,
                "pg" => view.group_short_name = value.to_string(),
                "sd" => view.sd = parse_bool(key, value)?,
                "loc" => view.loc = parse_int(key, value)?,
                "sa" => view.sa = parse_bool(key, value)?,
                "cb" => view.cb = value.to_string(),
                _ => tracing::debug!("Ignoring unknown saved view key '{}'", key),
            }
        }

        Ok(view)
    }

    /// Semester with the saved id, otherwise the first one
    pub fn select_semester<'a>(&self, semesters: &'a [Semester]) -> Option<&'a Semester> {
        semesters
            .iter()
            .find(|s| s.id == self.semester_id)
            .or_else(|| semesters.first())
    }

    /// Study program with the saved id, otherwise the first one
    pub fn select_study_program<'a>(
        &self,
        programs: &'a [StudyProgram],
    ) -> Option<&'a StudyProgram> {
        programs
            .iter()
            .find(|p| p.id == self.study_program_id)
            .or_else(|| programs.first())
    }

    /// Group with the saved short name, otherwise the first one
    pub fn select_group<'a>(&self, groups: &'a [Group]) -> Option<&'a Group> {
        groups
            .iter()
            .find(|g| g.short_name == self.group_short_name)
            .or_else(|| groups.first())
    }
}

fn parse_bool(key: &str, value: &str) -> Result<bool> {
    match value {
        "true" => Ok(true),
        "false" => Ok(false),
        _ => Err(invalid(key, value)),
    }
}

fn parse_int(key: &str, value: &str) -> Result<i64> {
    value.parse().map_err(|_| invalid(key, value))
}

fn invalid(key: &str, value: &str) -> Error {
    Error::SavedView {
        key: key.to_string(),
        value: value.to_string(),
    }
}
