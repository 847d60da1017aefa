//! Row classification and grouping.
//!
//! MAST publishes several files per exposure (summed spectra, per-photon
//! files, calibration products). Rows are grouped in two steps:
//!
//! 1. by `obs_id`;
//! 2. inside an `obs_id`, by access name: the file name with the `_ph_*`,
//!    `_sum*` and `_imcscor*` tails removed. `_imcscor` files are
//!    auxiliary ("untimed"); everything else is a timed exposure.
//!
//! Each access-name sub-group takes its timestamp from its first timed row
//! (or from its only row, whatever its kind). All rows that end up with the
//! same `(obs_id, timestamp)` pair form one observation.
//!
//! A sub-group with no usable timestamp cannot be placed; it is reported in
//! [`Grouping::orphans`] and left out of the output.

use crate::error::ValidationError;
use crate::row::RawRow;
use crate::uri::encode_segment;
use std::collections::BTreeMap;
use std::fmt;
use tracing::{debug, warn};

/// A row plus everything grouping derived from it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassifiedRow {
    pub row: RawRow,
    /// `date_obs` with whitespace runs replaced by `_`; `None` when blank.
    pub at_time: Option<String>,
    pub access_name: String,
    /// `obs_id`, `obs_id_d` or `obs_id_a` depending on the day/night marker
    /// in the access URL.
    pub day_night_key: String,
    /// `false` for `_imcscor` auxiliary files.
    pub timed: bool,
}

/// Identity of one output observation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MergeKey {
    pub group_id: String,
    pub at_time: String,
}

impl MergeKey {
    /// Label usable as a single file-name component. Distinct keys give
    /// distinct labels.
    pub fn file_label(&self) -> String {
        encode_segment(&self.to_string())
    }
}

impl fmt::Display for MergeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={}", self.group_id, self.at_time)
    }
}

#[derive(Debug, Default)]
pub struct Grouping {
    /// Rows per observation, in input order.
    pub groups: BTreeMap<MergeKey, Vec<ClassifiedRow>>,
    /// Sub-groups that could not be given a timestamp.
    pub orphans: Vec<ValidationError>,
}

impl Grouping {
    pub fn row_count(&self) -> usize {
        self.groups.values().map(Vec::len).sum()
    }
}

/// Mandatory fields: a non-empty `obs_id` and a non-blank `access_url`.
pub fn validate_row(row: &RawRow) -> Result<(), ValidationError> {
    if row.obs_id.is_empty() {
        return Err(ValidationError::MissingObsId { line: row.line });
    }
    if row.access_url.trim().is_empty() {
        return Err(ValidationError::MissingAccessUrl {
            line: row.line,
            obs_id: row.obs_id.clone(),
        });
    }
    Ok(())
}

/// File-family key of an access URL and whether the file is a timed
/// exposure (`true`) or an `_imcscor` auxiliary file (`false`).
pub fn access_name_key(access_url: &str) -> (String, bool) {
    let file_name = access_url.rsplit('/').next().unwrap_or(access_url);
    let mut name = file_name.split("_ph_").next().unwrap_or(file_name);
    if let Some(idx) = name.find("_sum") {
        name = &name[..idx];
    }
    match name.find("_imcscor") {
        Some(idx) => (name[..idx].to_string(), false),
        None => (name.to_string(), true),
    }
}

/// Day/night qualified key: `<obs_id>_d` for day files, `<obs_id>_a` for
/// `_a`/`_n` files, `obs_id` otherwise.
pub fn day_night_key(obs_id: &str, access_url: &str) -> String {
    if access_url.contains(&format!("{obs_id}_d")) {
        format!("{obs_id}_d")
    } else if access_url.contains(&format!("{obs_id}_a"))
        || access_url.contains(&format!("{obs_id}_n"))
    {
        format!("{obs_id}_a")
    } else {
        obs_id.to_string()
    }
}

pub fn at_time_key(date_obs: &str) -> Option<String> {
    let parts: Vec<&str> = date_obs.split_whitespace().collect();
    if parts.is_empty() {
        None
    } else {
        Some(parts.join("_"))
    }
}

pub fn classify_row(row: RawRow) -> Result<ClassifiedRow, ValidationError> {
    validate_row(&row)?;
    let (access_name, timed) = access_name_key(&row.access_url);
    let day_night_key = day_night_key(&row.obs_id, &row.access_url);
    let at_time = at_time_key(&row.date_obs);
    Ok(ClassifiedRow {
        row,
        at_time,
        access_name,
        day_night_key,
        timed,
    })
}

/// Group classified rows into observations.
///
/// With `by_day_night` the first grouping level is the day/night key
/// instead of the bare `obs_id`.
pub fn group_rows(rows: Vec<ClassifiedRow>, by_day_night: bool) -> Grouping {
    let mut by_group: BTreeMap<String, Vec<usize>> = BTreeMap::new();
    for (idx, row) in rows.iter().enumerate() {
        let key = if by_day_night {
            row.day_night_key.clone()
        } else {
            row.row.obs_id.clone()
        };
        by_group.entry(key).or_default().push(idx);
    }

    let mut assigned: BTreeMap<MergeKey, Vec<usize>> = BTreeMap::new();
    let mut orphans = Vec::new();

    for (group_id, members) in by_group {
        let mut by_name: BTreeMap<&str, Vec<usize>> = BTreeMap::new();
        for &idx in &members {
            by_name
                .entry(rows[idx].access_name.as_str())
                .or_default()
                .push(idx);
        }

        for (access_name, sub) in by_name {
            let sole = sub.len() == 1;
            let at_time = sub
                .iter()
                .map(|&idx| &rows[idx])
                .filter(|r| sole || r.timed)
                .find_map(|r| r.at_time.clone());

            match at_time {
                Some(at_time) => {
                    debug!(
                        group = %group_id,
                        access_name,
                        %at_time,
                        rows = sub.len(),
                        "access-name sub-group"
                    );
                    let key = MergeKey {
                        group_id: group_id.clone(),
                        at_time,
                    };
                    assigned.entry(key).or_default().extend(sub);
                }
                None => {
                    let orphan = ValidationError::MissingTimestamp {
                        group_id: group_id.clone(),
                        access_name: access_name.to_string(),
                        rows: sub.len(),
                    };
                    warn!(%orphan, "dropping rows without a timestamp");
                    orphans.push(orphan);
                }
            }
        }
    }

    let mut slots: Vec<Option<ClassifiedRow>> = rows.into_iter().map(Some).collect();
    let groups = assigned
        .into_iter()
        .map(|(key, mut idxs)| {
            idxs.sort_unstable();
            let bundle = idxs
                .into_iter()
                .filter_map(|idx| slots[idx].take())
                .collect();
            (key, bundle)
        })
        .collect();

    Grouping { groups, orphans }
}
