//! MAST ObsCore → RDF conversion.
//!
//! This crate turns the pipe-separated ObsCore metadata table published by
//! MAST into one RDF graph per observation:
//!
//! - rows are read into typed [`RawRow`]s ([`row`]),
//! - classified and grouped into merge bundles ([`grouping`]),
//! - each bundle is collapsed into one `Observation` node plus one `Datum`
//!   node per file ([`observation`]), with numeric columns aggregated by
//!   [`stats`],
//! - and the graph is written as RDF/XML or N3 ([`serialize`]).
//!
//! Identifiers are minted by [`uri::UriScheme`] and are a pure function of
//! the input values, so reprocessing the same table yields the same URIs.
//!
//! [`pipeline::run`] drives the whole conversion for one input file.

pub mod config;
pub mod convert;
pub mod error;
pub mod grouping;
pub mod observation;
pub mod pipeline;
pub mod rdf;
pub mod row;
pub mod serialize;
pub mod stats;
pub mod uri;
pub mod vocab;

pub use config::{ConvertConfig, InvalidRowPolicy};
pub use error::{ConversionError, ObsCoreError, Result, ValidationError};
pub use grouping::{group_rows, ClassifiedRow, Grouping, MergeKey};
pub use observation::{ObservationBuilder, ObservationIndex};
pub use pipeline::{run, RunSummary};
pub use rdf::{ObsGraph, RdfLiteral, RdfNode, RdfObject, RdfStatement};
pub use row::{Field, RawRow, RowLayout};
pub use serialize::OutputFormat;
pub use uri::UriScheme;
