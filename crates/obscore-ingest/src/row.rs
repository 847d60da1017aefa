//! ObsCore rows and the pipe-separated reader.
//!
//! The MAST dump has no header line, so the reader relies on a fixed column
//! order ([`RowLayout`]). Every cell is kept as its raw string; typing
//! happens later, where a value is aggregated or turned into a literal.

use crate::error::{ObsCoreError, Result};
use std::collections::HashSet;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use tracing::debug;

macro_rules! obscore_columns {
    ($($variant:ident => $field:ident),* $(,)?) => {
        /// One ObsCore column.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub enum Field {
            $($variant),*
        }

        impl Field {
            /// All columns, in the default file order.
            pub const ALL: &'static [Field] = &[$(Field::$variant),*];

            pub fn name(self) -> &'static str {
                match self {
                    $(Field::$variant => stringify!($field)),*
                }
            }
        }

        /// One table row. `line` is the 1-based source line (0 for rows
        /// built in memory).
        #[derive(Debug, Clone, Default, PartialEq, Eq)]
        pub struct RawRow {
            pub line: usize,
            $(pub $field: String),*
        }

        impl RawRow {
            pub fn get(&self, field: Field) -> &str {
                match field {
                    $(Field::$variant => &self.$field),*
                }
            }

            fn slot(&mut self, field: Field) -> &mut String {
                match field {
                    $(Field::$variant => &mut self.$field),*
                }
            }
        }
    };
}

obscore_columns! {
    ObsId => obs_id,
    AccessUrl => access_url,
    DateObs => date_obs,
    TExptime => t_exptime,
    SResolution => s_resolution,
    TResolution => t_resolution,
    EmMin => em_min,
    EmMax => em_max,
    Title => title,
    SFov => s_fov,
    TargetName => target_name,
    SRa => s_ra,
    SDec => s_dec,
    SRegion => s_region,
    TelescopeName => telescope_name,
    Instrument => instrument,
    DataproductType => dataproduct_type,
    CreationDate => creation_date,
    CalibLevel => calib_level,
    AccessFormat => access_format,
    ObsPublisherDid => obs_publisher_did,
    ObsCreatorName => obs_creator_name,
    ObsCollection => obs_collection,
}

impl Field {
    pub fn from_name(name: &str) -> Option<Field> {
        Field::ALL.iter().copied().find(|f| f.name() == name)
    }
}

/// Column order of the input file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowLayout {
    columns: Vec<Field>,
}

impl Default for RowLayout {
    fn default() -> Self {
        Self {
            columns: Field::ALL.to_vec(),
        }
    }
}

impl RowLayout {
    /// Build a layout from column names. Every field must appear exactly once.
    pub fn from_names<S: AsRef<str>>(names: &[S]) -> Result<Self> {
        let mut columns = Vec::with_capacity(names.len());
        let mut seen = HashSet::new();
        for name in names {
            let name = name.as_ref().trim();
            let field = Field::from_name(name).ok_or_else(|| {
                ObsCoreError::Configuration(format!("unknown ObsCore column {name:?}"))
            })?;
            if !seen.insert(field) {
                return Err(ObsCoreError::Configuration(format!(
                    "column {name:?} listed twice"
                )));
            }
            columns.push(field);
        }

        let missing: Vec<&str> = Field::ALL
            .iter()
            .filter(|f| !seen.contains(*f))
            .map(|f| f.name())
            .collect();
        if !missing.is_empty() {
            return Err(ObsCoreError::Configuration(format!(
                "column layout is missing: {}",
                missing.join(", ")
            )));
        }

        Ok(Self { columns })
    }

    pub fn columns(&self) -> &[Field] {
        &self.columns
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }
}

/// Parse one line of the table. `line_no` is only used for diagnostics.
pub fn parse_psv_line(line: &str, layout: &RowLayout, line_no: usize) -> Result<RawRow> {
    let line = line.trim_end_matches(['\n', '\r']);
    let cells: Vec<&str> = line.split('|').collect();
    if cells.len() != layout.len() {
        return Err(ObsCoreError::Parse {
            line: line_no,
            expected: layout.len(),
            found: cells.len(),
        });
    }

    let mut row = RawRow {
        line: line_no,
        ..RawRow::default()
    };
    for (field, cell) in layout.columns().iter().zip(cells) {
        *row.slot(*field) = cell.to_string();
    }
    Ok(row)
}

/// Text of one raw line. Legacy dumps mix UTF-8 with Latin-1 cells; a line
/// that is not valid UTF-8 is read as Latin-1.
pub fn decode_line(bytes: Vec<u8>) -> String {
    match String::from_utf8(bytes) {
        Ok(text) => text,
        Err(err) => err.into_bytes().into_iter().map(char::from).collect(),
    }
}

/// Read every row of an ObsCore file. Blank lines are ignored.
pub fn read_obscore_file(path: &Path, layout: &RowLayout) -> Result<Vec<RawRow>> {
    let file = File::open(path).map_err(|e| ObsCoreError::io(path, e))?;
    let mut reader = BufReader::new(file);

    let mut rows = Vec::new();
    let mut buf = Vec::new();
    let mut line_no = 0;
    loop {
        buf.clear();
        let read = reader
            .read_until(b'\n', &mut buf)
            .map_err(|e| ObsCoreError::io(path, e))?;
        if read == 0 {
            break;
        }
        line_no += 1;

        if std::str::from_utf8(&buf).is_err() {
            debug!(line = line_no, "line is not UTF-8, reading it as Latin-1");
        }
        let line = decode_line(std::mem::take(&mut buf));
        if line.trim().is_empty() {
            continue;
        }
        rows.push(parse_psv_line(&line, layout, line_no)?);
    }
    Ok(rows)
}
