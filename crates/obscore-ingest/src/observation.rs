//! Observation graph builder.
//!
//! One merge bundle becomes one `adsobsv:Observation` with aggregated
//! properties, plus one `adsobsv:Datum` per row.

use crate::convert::{self, double_literal, duration_literal};
use crate::error::{ConversionError, ObsCoreError, Result, ValidationError};
use crate::grouping::{validate_row, ClassifiedRow, MergeKey};
use crate::rdf::{ObsGraph, RdfLiteral, RdfNode};
use crate::row::{Field, RawRow};
use crate::stats::{dispersion, maximum};
use crate::uri::{is_ivoa_uri, sanitize_iri, UriScheme, OBSERVATORY};
use crate::vocab::{adsbase, adsobsv, em_domains, pav};
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::Path;
use tracing::{debug, warn};

/// Observation URI → its Datum URIs, in bundle order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ObservationIndex {
    entries: BTreeMap<String, Vec<String>>,
}

impl ObservationIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, observation: String, datums: Vec<String>) {
        self.entries.insert(observation, datums);
    }

    pub fn get(&self, observation: &str) -> Option<&[String]> {
        self.entries.get(observation).map(Vec::as_slice)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).map_err(|e| ObsCoreError::Serialization(e.to_string()))
    }

    pub fn write_to(&self, path: &Path) -> Result<()> {
        let mut json = self.to_json()?;
        json.push('\n');
        std::fs::write(path, json).map_err(|e| ObsCoreError::io(path, e))
    }
}

/// `adsbase:dataType` value for an ObsCore `dataproduct_type`.
pub fn data_product_type(dataproduct_type: &str) -> &'static str {
    if dataproduct_type.contains("Spectrum.") {
        "spectra"
    } else {
        // "Image." and anything unrecognised
        "image"
    }
}

/// Rows that drive the aggregated values: the timed exposures, or the
/// whole bundle when it has a single row or no timed row at all.
pub fn primary_rows(bundle: &[ClassifiedRow]) -> Vec<&RawRow> {
    if bundle.len() > 1 {
        let timed: Vec<&RawRow> = bundle.iter().filter(|r| r.timed).map(|r| &r.row).collect();
        if !timed.is_empty() {
            return timed;
        }
    }
    bundle.iter().map(|r| &r.row).collect()
}

fn column<'r>(rows: &[&'r RawRow], field: Field) -> Vec<&'r str> {
    rows.iter().map(|r| r.get(field)).collect()
}

fn add_converted(
    graph: &mut ObsGraph,
    subject: &RdfNode,
    predicate: &str,
    converted: std::result::Result<Option<RdfLiteral>, ConversionError>,
) {
    match converted {
        Ok(literal) => graph.add_literal(subject, predicate, literal),
        Err(err) => warn!(property = predicate, %err, "omitting unconvertible value"),
    }
}

pub struct ObservationBuilder<'a> {
    uris: &'a UriScheme,
}

impl<'a> ObservationBuilder<'a> {
    pub fn new(uris: &'a UriScheme) -> Self {
        Self { uris }
    }

    /// Build the graph for one merge bundle and record its Datum URIs in
    /// `index`.
    pub fn build(
        &self,
        key: &MergeKey,
        bundle: &[ClassifiedRow],
        index: &mut ObservationIndex,
    ) -> Result<ObsGraph> {
        if bundle.is_empty() {
            return Err(ValidationError::EmptyBundle {
                group: key.to_string(),
            }
            .into());
        }
        for r in bundle {
            validate_row(&r.row)?;
        }

        let mut graph = ObsGraph::new();
        let obs_uri = self.uris.observation(&key.to_string());
        let obs = RdfNode::iri(obs_uri.clone());
        graph.add_type(&obs, adsobsv::OBSERVATION);

        let mut datums = Vec::with_capacity(bundle.len());
        for r in bundle {
            let datum = self.add_datum(&mut graph, &obs, key, &r.row);
            datums.push(datum);
        }

        let primary = primary_rows(bundle);
        self.add_aggregates(&mut graph, &obs, key, &primary);
        self.add_links(&mut graph, &obs, bundle, &primary);

        debug!(
            observation = %key,
            rows = bundle.len(),
            primary = primary.len(),
            statements = graph.len(),
            "built observation graph"
        );
        index.record(obs_uri, datums);
        Ok(graph)
    }

    fn add_datum(
        &self,
        graph: &mut ObsGraph,
        obs: &RdfNode,
        key: &MergeKey,
        row: &RawRow,
    ) -> String {
        let datum_uri = self.uris.datum(&key.group_id, &row.access_url);
        let datum = RdfNode::iri(datum_uri.clone());

        graph.add(obs, adsobsv::OBSERVATION_ID, RdfLiteral::plain(&row.obs_id));
        graph.add_type(&datum, adsobsv::DATUM);
        graph.add(obs, adsobsv::HAS_DATA_PRODUCT, datum.clone());
        graph.add(&datum, adsobsv::FOR_OBSERVATION, obs.clone());
        graph.add(&datum, adsobsv::DATA_PRODUCT_ID, RdfLiteral::plain(&row.obs_id));
        graph.add(
            &datum,
            adsobsv::DATA_URL,
            RdfNode::iri(sanitize_iri(&row.access_url)),
        );

        add_converted(
            graph,
            &datum,
            pav::CREATED_ON,
            convert::as_date_time(&row.creation_date),
        );
        add_converted(
            graph,
            &datum,
            adsobsv::CALIB_LEVEL,
            convert::as_int(&row.calib_level),
        );
        graph.add(
            &datum,
            adsbase::DATA_TYPE,
            RdfLiteral::plain(data_product_type(&row.dataproduct_type)),
        );
        graph.add_literal(&datum, adsobsv::DATA_FORMAT, convert::plain(&row.access_format));

        if !row.obs_publisher_did.trim().is_empty() {
            graph.add(
                &datum,
                adsbase::HAS_IVOA_IDENTIFIER,
                RdfNode::iri(sanitize_iri(&row.obs_publisher_did)),
            );
        }

        let creator = row.obs_creator_name.trim();
        if !creator.is_empty() {
            graph.add(
                obs,
                adsobsv::OBSERVATION_MADE_BY,
                RdfNode::iri(self.uris.creator(creator)),
            );
        }

        let collection = row.obs_collection.trim();
        if !collection.is_empty() {
            let coll = RdfNode::iri(self.uris.collection(collection));
            if is_ivoa_uri(collection) {
                debug!(collection, "using IVOA identifier for collection");
            }
            graph.add(&datum, adsobsv::FROM_DATA_COLLECTION, coll.clone());
            graph.add_type(&coll, adsobsv::DATA_COLLECTION);
            graph.add(&coll, adsbase::NAME, RdfLiteral::plain(collection));
        }

        datum_uri
    }

    fn add_aggregates(
        &self,
        graph: &mut ObsGraph,
        obs: &RdfNode,
        key: &MergeKey,
        primary: &[&RawRow],
    ) {
        let first = primary[0];

        add_converted(graph, obs, adsbase::AT_TIME, convert::as_date_time(&first.date_obs));

        let exptime = maximum(&column(primary, Field::TExptime));
        debug!(observation = %key, ?exptime, "t_exptime maximum");
        if let Some(seconds) = exptime {
            graph.add_literal(obs, adsobsv::OBSERVED_TIME, duration_literal(seconds));
            graph.add(obs, adsobsv::T_EXPTIME, double_literal(seconds));
        }

        let t_resolution = maximum(&column(primary, Field::TResolution));
        debug!(observation = %key, ?t_resolution, "t_resolution maximum");
        if let Some(value) = t_resolution {
            graph.add(obs, adsobsv::T_RESOLUTION, double_literal(value));
        }

        let mean_of = |field: Field| {
            let spread = dispersion(&column(primary, field));
            match spread {
                Some(d) => debug!(
                    observation = %key,
                    column = field.name(),
                    mean = d.mean,
                    percent = d.percent,
                    "aggregated"
                ),
                None => debug!(observation = %key, column = field.name(), "no numeric data"),
            }
            spread.map(|d| d.mean)
        };

        let s_resolution = mean_of(Field::SResolution);
        let em_min = mean_of(Field::EmMin);
        let em_max = mean_of(Field::EmMax);
        let fov = mean_of(Field::SFov);
        let ra = mean_of(Field::SRa);
        let dec = mean_of(Field::SDec);

        if let Some(v) = s_resolution {
            graph.add(obs, adsobsv::RESOLUTION, double_literal(v));
        }
        if let Some(v) = em_min {
            graph.add(obs, adsobsv::WAVELENGTH_START, double_literal(v));
        }
        if let Some(v) = em_max {
            graph.add(obs, adsobsv::WAVELENGTH_END, double_literal(v));
        }
        graph.add_literal(obs, adsbase::TITLE, convert::plain(&first.title));
        if let Some(v) = fov {
            graph.add(obs, adsobsv::FOV, double_literal(v));
        }

        let target = first.target_name.trim();
        if !target.is_empty() {
            let node = RdfNode::iri(self.uris.target(target));
            graph.add(obs, adsbase::TARGET, node.clone());
            graph.add_type(&node, adsobsv::ASTRONOMICAL_SOURCE_NAME);
            graph.add(&node, adsbase::NAME, RdfLiteral::plain(target));
        }

        if let (Some(lo), Some(hi)) = (em_min, em_max) {
            for domain in em_domains(lo, hi) {
                graph.add(obs, adsobsv::WAVELENGTH_DOMAIN, RdfNode::iri(domain.iri()));
            }
        }

        let has_position = !first.s_ra.trim().is_empty() && !first.s_dec.trim().is_empty();
        if let (true, Some(ra), Some(dec)) = (has_position, ra, dec) {
            let pointing = graph.new_blank_node();
            graph.add(obs, adsobsv::ASSOCIATED_POSITION, pointing.clone());
            graph.add_type(&pointing, adsobsv::POINTING);
            graph.add(&pointing, adsobsv::RA, double_literal(ra));
            graph.add(&pointing, adsobsv::DEC, double_literal(dec));
        }

        let region = first.s_region.trim();
        if !region.is_empty() {
            let footprint = graph.new_blank_node();
            graph.add(obs, adsobsv::ASSOCIATED_FOOTPRINT, footprint.clone());
            graph.add_type(&footprint, adsobsv::FOOTPRINT);
            graph.add(&footprint, adsobsv::S_REGION, RdfLiteral::plain(region));
        }
    }

    fn add_links(
        &self,
        graph: &mut ObsGraph,
        obs: &RdfNode,
        bundle: &[ClassifiedRow],
        primary: &[&RawRow],
    ) {
        graph.add(
            obs,
            adsobsv::AT_OBSERVATORY,
            RdfNode::iri(self.uris.observatory(OBSERVATORY)),
        );

        let telescope = primary[0].telescope_name.trim();
        if !telescope.is_empty() {
            graph.add(
                obs,
                adsobsv::AT_TELESCOPE,
                RdfNode::iri(self.uris.telescope(telescope)),
            );
        }

        // graph de-duplicates repeated instruments
        for r in bundle {
            let instrument = r.row.instrument.trim();
            if !instrument.is_empty() {
                graph.add(
                    obs,
                    adsbase::USING_INSTRUMENT,
                    RdfNode::iri(self.uris.instrument(instrument)),
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grouping::classify_row;
    use crate::rdf::RdfObject;
    use crate::vocab::{rdf, xsd, EmDomain};

    fn hut_row(file: &str, exptime: &str) -> RawRow {
        RawRow {
            line: 1,
            obs_id: "hut0101".to_string(),
            access_url: format!("http://archive.stsci.edu/pub/hut/{file}"),
            date_obs: "1990-12-03 10:00:00".to_string(),
            t_exptime: exptime.to_string(),
            s_resolution: "3.5".to_string(),
            t_resolution: "1".to_string(),
            em_min: "8.25e-8".to_string(),
            em_max: "1.85e-7".to_string(),
            title: "Far UV spectrum".to_string(),
            s_fov: "0.005".to_string(),
            target_name: "NGC 1068".to_string(),
            s_ra: "40.67".to_string(),
            s_dec: "-0.013".to_string(),
            s_region: "CIRCLE ICRS 40.67 -0.013 0.0025".to_string(),
            telescope_name: "HUT".to_string(),
            instrument: "HUT".to_string(),
            dataproduct_type: "Spectrum.1d".to_string(),
            creation_date: "1995-03-15 01:02:03".to_string(),
            calib_level: "2".to_string(),
            access_format: "application/fits".to_string(),
            obs_publisher_did: "ivo://mast.stsci/hut?hut0101".to_string(),
            obs_creator_name: "Kriss".to_string(),
            obs_collection: "HUT".to_string(),
        }
    }

    fn bundle(rows: Vec<RawRow>) -> Vec<ClassifiedRow> {
        rows.into_iter().map(|r| classify_row(r).unwrap()).collect()
    }

    fn key() -> MergeKey {
        MergeKey {
            group_id: "hut0101".to_string(),
            at_time: "1990-12-03_10:00:00".to_string(),
        }
    }

    fn build(rows: Vec<RawRow>) -> (ObsGraph, ObservationIndex, RdfNode) {
        let uris = UriScheme::default();
        let mut index = ObservationIndex::new();
        let graph = ObservationBuilder::new(&uris)
            .build(&key(), &bundle(rows), &mut index)
            .unwrap();
        let obs = RdfNode::iri(uris.observation(&key().to_string()));
        (graph, index, obs)
    }

    fn lit(graph: &ObsGraph, subject: &RdfNode, predicate: &str) -> Option<RdfLiteral> {
        graph.objects(subject, predicate).find_map(|o| match o {
            RdfObject::Literal(l) => Some(l.clone()),
            RdfObject::Node(_) => None,
        })
    }

    #[test]
    fn exposure_time_is_the_maximum() {
        let (graph, _, obs) = build(vec![
            hut_row("hut0101_a_sum.fits", "10.0"),
            hut_row("hut0101_a_ph_001.fits", "20.0"),
        ]);
        assert_eq!(
            lit(&graph, &obs, adsobsv::T_EXPTIME),
            Some(RdfLiteral::typed("20", xsd::DOUBLE))
        );
        assert_eq!(
            lit(&graph, &obs, adsobsv::OBSERVED_TIME),
            Some(RdfLiteral::typed("PT20S", xsd::DURATION))
        );
    }

    #[test]
    fn auxiliary_rows_do_not_drive_aggregates() {
        let mut aux = hut_row("hut0101_a_imcscor.fits", "500");
        aux.s_ra = "41.0".to_string();
        let (graph, index, obs) = build(vec![aux, hut_row("hut0101_a_sum.fits", "10")]);

        assert_eq!(
            lit(&graph, &obs, adsobsv::T_EXPTIME),
            Some(RdfLiteral::typed("10", xsd::DOUBLE))
        );
        let pointing = graph.objects(&obs, adsobsv::ASSOCIATED_POSITION).next().unwrap();
        let RdfObject::Node(pointing) = pointing else {
            panic!("pointing must be a node");
        };
        assert_eq!(
            lit(&graph, pointing, adsobsv::RA),
            Some(RdfLiteral::typed("40.67", xsd::DOUBLE))
        );
        // both files still become data products
        assert_eq!(index.get(obs.as_iri().unwrap()).unwrap().len(), 2);
    }

    #[test]
    fn singular_fields_come_from_the_first_primary_row() {
        let mut aux = hut_row("hut0101_a_imcscor.fits", "500");
        aux.title = "Calibration frame".to_string();
        aux.target_name = "DARK".to_string();
        let (graph, _, obs) = build(vec![aux, hut_row("hut0101_a_sum.fits", "10")]);

        assert_eq!(
            lit(&graph, &obs, adsbase::TITLE).map(|l| l.lexical),
            Some("Far UV spectrum".to_string())
        );
        let uris = UriScheme::default();
        assert!(graph.contains(
            &obs,
            adsbase::TARGET,
            &RdfNode::iri(uris.target("NGC 1068")).into()
        ));
        assert!(!graph.contains(
            &obs,
            adsbase::TARGET,
            &RdfNode::iri(uris.target("DARK")).into()
        ));
    }

    #[test]
    fn single_auxiliary_row_is_primary() {
        let (graph, _, obs) = build(vec![hut_row("hut0101_imcscor.fits", "42")]);
        assert_eq!(
            lit(&graph, &obs, adsobsv::T_EXPTIME),
            Some(RdfLiteral::typed("42", xsd::DOUBLE))
        );
        assert_eq!(
            lit(&graph, &obs, adsbase::AT_TIME),
            Some(RdfLiteral::typed("1990-12-03T10:00:00", xsd::DATE_TIME))
        );
    }

    #[test]
    fn observation_links_and_wavelengths() {
        let (graph, _, obs) = build(vec![hut_row("hut0101_sum.fits", "10")]);
        let uris = UriScheme::default();

        assert!(graph.contains(&obs, rdf::TYPE, &RdfNode::iri(adsobsv::OBSERVATION).into()));
        assert!(graph.contains(
            &obs,
            adsobsv::AT_OBSERVATORY,
            &RdfNode::iri(uris.observatory("MAST")).into()
        ));
        assert!(graph.contains(
            &obs,
            adsobsv::AT_TELESCOPE,
            &RdfNode::iri(uris.telescope("HUT")).into()
        ));
        assert!(graph.contains(
            &obs,
            adsobsv::OBSERVATION_MADE_BY,
            &RdfNode::iri(uris.creator("Kriss")).into()
        ));

        let domains: Vec<_> = graph.objects(&obs, adsobsv::WAVELENGTH_DOMAIN).collect();
        assert_eq!(
            domains,
            vec![
                &RdfObject::Node(RdfNode::iri(EmDomain::Euv.iri())),
                &RdfObject::Node(RdfNode::iri(EmDomain::Uv.iri())),
            ]
        );
        assert_eq!(
            lit(&graph, &obs, adsobsv::WAVELENGTH_END),
            Some(RdfLiteral::typed("0.000000185", xsd::DOUBLE))
        );

        let target = RdfNode::iri(uris.target("NGC 1068"));
        assert!(graph.contains(&obs, adsbase::TARGET, &target.clone().into()));
        assert_eq!(
            lit(&graph, &target, adsbase::NAME),
            Some(RdfLiteral::plain("NGC 1068"))
        );
    }

    #[test]
    fn datum_properties() {
        let (graph, index, obs) = build(vec![hut_row("hut0101_sum.fits", "10")]);
        let datums = index.get(obs.as_iri().unwrap()).unwrap();
        let datum = RdfNode::iri(datums[0].clone());

        assert!(graph.contains(&datum, adsobsv::FOR_OBSERVATION, &obs.clone().into()));
        assert!(graph.contains(&obs, adsobsv::HAS_DATA_PRODUCT, &datum.clone().into()));
        assert_eq!(
            lit(&graph, &datum, adsbase::DATA_TYPE),
            Some(RdfLiteral::plain("spectra"))
        );
        assert_eq!(
            lit(&graph, &datum, adsobsv::CALIB_LEVEL),
            Some(RdfLiteral::typed("2", xsd::INT))
        );
        assert_eq!(
            lit(&graph, &datum, pav::CREATED_ON),
            Some(RdfLiteral::typed("1995-03-15T01:02:03", xsd::DATE_TIME))
        );
        assert!(graph.contains(
            &datum,
            adsobsv::DATA_URL,
            &RdfNode::iri("http://archive.stsci.edu/pub/hut/hut0101_sum.fits").into()
        ));
        assert!(graph.contains(
            &datum,
            adsbase::HAS_IVOA_IDENTIFIER,
            &RdfNode::iri("ivo://mast.stsci/hut?hut0101").into()
        ));
    }

    #[test]
    fn ivoa_collection_is_used_verbatim() {
        let mut row = hut_row("hut0101_sum.fits", "10");
        row.obs_collection = "ivo://mast.stsci/hut".to_string();
        let (graph, index, obs) = build(vec![row]);
        let datum = RdfNode::iri(index.get(obs.as_iri().unwrap()).unwrap()[0].clone());
        let coll = RdfNode::iri("ivo://mast.stsci/hut");

        assert!(graph.contains(&datum, adsobsv::FROM_DATA_COLLECTION, &coll.clone().into()));
        assert!(graph.contains(&coll, rdf::TYPE, &RdfNode::iri(adsobsv::DATA_COLLECTION).into()));
    }

    #[test]
    fn distinct_instruments_are_all_linked() {
        let mut second = hut_row("hut0101_b_sum.fits", "10");
        second.instrument = "FOS".to_string();
        let (graph, _, obs) = build(vec![
            hut_row("hut0101_a_sum.fits", "10"),
            second,
            hut_row("hut0101_c_sum.fits", "10"),
        ]);
        assert_eq!(graph.objects(&obs, adsbase::USING_INSTRUMENT).count(), 2);
    }

    #[test]
    fn unconvertible_values_are_omitted() {
        let mut row = hut_row("hut0101_sum.fits", "n/a");
        row.creation_date = "someday".to_string();
        row.s_fov = "".to_string();
        let (graph, index, obs) = build(vec![row]);
        let datum = RdfNode::iri(index.get(obs.as_iri().unwrap()).unwrap()[0].clone());

        assert_eq!(lit(&graph, &obs, adsobsv::T_EXPTIME), None);
        assert_eq!(lit(&graph, &obs, adsobsv::FOV), None);
        assert_eq!(lit(&graph, &datum, pav::CREATED_ON), None);
        // the rest of the observation is still there
        assert!(lit(&graph, &obs, adsbase::TITLE).is_some());
    }

    #[test]
    fn empty_bundle_and_invalid_rows_are_rejected() {
        let uris = UriScheme::default();
        let builder = ObservationBuilder::new(&uris);
        let mut index = ObservationIndex::new();

        let err = builder.build(&key(), &[], &mut index).unwrap_err();
        assert!(matches!(
            err,
            ObsCoreError::Validation(ValidationError::EmptyBundle { .. })
        ));

        let mut rows = bundle(vec![hut_row("hut0101_sum.fits", "10")]);
        rows[0].row.access_url = " ".to_string();
        let err = builder.build(&key(), &rows, &mut index).unwrap_err();
        assert!(matches!(
            err,
            ObsCoreError::Validation(ValidationError::MissingAccessUrl { .. })
        ));
        assert!(index.is_empty());
    }

    #[test]
    fn data_product_types() {
        assert_eq!(data_product_type("Spectrum.foo"), "spectra");
        assert_eq!(data_product_type("Image.bar"), "image");
        assert_eq!(data_product_type("timeseries"), "image");
    }

    #[test]
    fn index_serializes_as_sorted_json_object() {
        let mut index = ObservationIndex::new();
        index.record("http://x/b/".to_string(), vec!["d2".to_string(), "d1".to_string()]);
        index.record("http://x/a/".to_string(), vec!["d3".to_string()]);

        let value: serde_json::Value = serde_json::from_str(&index.to_json().unwrap()).unwrap();
        assert_eq!(
            value,
            serde_json::json!({"http://x/a/": ["d3"], "http://x/b/": ["d2", "d1"]})
        );
        let keys: Vec<_> = value.as_object().unwrap().keys().cloned().collect();
        assert_eq!(keys, vec!["http://x/a/", "http://x/b/"]);
    }
}
