//! Graph serialization (N3 / RDF/XML) and read-back through Sophia.
//!
//! One block per subject, subjects in the order the builder created them.
//! Written files can be re-read with [`parse_statements`] to confirm that a
//! standard parser accepts them.

use crate::error::{ObsCoreError, Result};
use crate::rdf::{ObsGraph, RdfLiteral, RdfNode, RdfObject};
use crate::vocab::{rdf, PREFIXES};
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;
use sophia::api::prelude::*;
use std::collections::BTreeMap;
use std::convert::Infallible;
use std::fmt;
use std::path::Path;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum OutputFormat {
    /// RDF/XML (`rdf`)
    #[default]
    RdfXml,
    /// Turtle-compatible N3 (`n3`)
    N3,
}

impl OutputFormat {
    pub fn extension(self) -> &'static str {
        match self {
            OutputFormat::RdfXml => "rdf",
            OutputFormat::N3 => "n3",
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

impl FromStr for OutputFormat {
    type Err = ObsCoreError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "rdf" => Ok(OutputFormat::RdfXml),
            "n3" => Ok(OutputFormat::N3),
            other => Err(ObsCoreError::Configuration(format!(
                "unsupported output format {other:?} (expected rdf or n3)"
            ))),
        }
    }
}

// ============================================================================
// N3
// ============================================================================

fn is_pn_local(local: &str) -> bool {
    let mut chars = local.chars();
    let Some(first) = chars.next() else {
        return false;
    };
    (first.is_ascii_alphabetic() || first == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
}

fn n3_iri(iri: &str) -> String {
    for (prefix, ns) in PREFIXES {
        if let Some(local) = iri.strip_prefix(ns) {
            if is_pn_local(local) {
                return format!("{prefix}:{local}");
            }
        }
    }
    format!("<{iri}>")
}

fn n3_string(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('"');
    for c in s.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c => out.push(c),
        }
    }
    out.push('"');
    out
}

fn n3_node(node: &RdfNode) -> String {
    match node {
        RdfNode::Iri(iri) => n3_iri(iri),
        RdfNode::BlankNode(id) => format!("_:{id}"),
    }
}

fn n3_literal(lit: &RdfLiteral) -> String {
    match &lit.datatype {
        Some(dt) => format!("{}^^{}", n3_string(&lit.lexical), n3_iri(dt)),
        None => n3_string(&lit.lexical),
    }
}

pub fn to_n3(graph: &ObsGraph) -> String {
    let mut out = String::with_capacity(64 * graph.len() + 512);
    for (prefix, ns) in PREFIXES {
        out.push_str(&format!("@prefix {prefix}: <{ns}> .\n"));
    }
    out.push('\n');

    for (subject, statements) in graph.by_subject() {
        out.push_str(&n3_node(subject));
        for (i, stmt) in statements.iter().enumerate() {
            out.push_str(if i == 0 { "\n    " } else { " ;\n    " });
            if stmt.predicate_iri == rdf::TYPE {
                out.push('a');
            } else {
                out.push_str(&n3_iri(&stmt.predicate_iri));
            }
            out.push(' ');
            match &stmt.object {
                RdfObject::Node(node) => out.push_str(&n3_node(node)),
                RdfObject::Literal(lit) => out.push_str(&n3_literal(lit)),
            }
        }
        out.push_str(" .\n\n");
    }
    out
}

// ============================================================================
// RDF/XML
// ============================================================================

fn is_nc_name(local: &str) -> bool {
    let mut chars = local.chars();
    let Some(first) = chars.next() else {
        return false;
    };
    (first.is_alphabetic() || first == '_')
        && chars.all(|c| c.is_alphanumeric() || matches!(c, '_' | '-' | '.'))
}

fn split_predicate(iri: &str) -> Result<(&str, &str)> {
    let idx = iri.rfind(['#', '/']).ok_or_else(|| {
        ObsCoreError::Serialization(format!("predicate {iri} has no namespace part"))
    })?;
    let (ns, local) = iri.split_at(idx + 1);
    if !is_nc_name(local) {
        return Err(ObsCoreError::Serialization(format!(
            "predicate {iri} cannot be written as an XML element name"
        )));
    }
    Ok((ns, local))
}

fn xml_err<E: fmt::Display>(err: E) -> ObsCoreError {
    ObsCoreError::Serialization(format!("RDF/XML: {err}"))
}

pub fn to_rdf_xml(graph: &ObsGraph) -> Result<String> {
    // Namespace → prefix, with generated prefixes for anything unknown.
    let mut prefixes: BTreeMap<String, String> = PREFIXES
        .iter()
        .map(|(prefix, ns)| (ns.to_string(), prefix.to_string()))
        .collect();
    let mut qnames: BTreeMap<&str, String> = BTreeMap::new();
    for stmt in graph.statements() {
        if qnames.contains_key(stmt.predicate_iri.as_str()) {
            continue;
        }
        let (ns, local) = split_predicate(&stmt.predicate_iri)?;
        let next = format!("ns{}", prefixes.len());
        let prefix = prefixes.entry(ns.to_string()).or_insert(next);
        qnames.insert(&stmt.predicate_iri, format!("{prefix}:{local}"));
    }

    let mut writer = Writer::new_with_indent(Vec::new(), b' ', 2);
    writer
        .write_event(Event::Decl(BytesDecl::new("1.0", Some("utf-8"), None)))
        .map_err(xml_err)?;

    let mut root = BytesStart::new("rdf:RDF");
    for (ns, prefix) in &prefixes {
        let attr = format!("xmlns:{prefix}");
        root.push_attribute((attr.as_str(), ns.as_str()));
    }
    writer.write_event(Event::Start(root)).map_err(xml_err)?;

    for (subject, statements) in graph.by_subject() {
        let mut desc = BytesStart::new("rdf:Description");
        match subject {
            RdfNode::Iri(iri) => desc.push_attribute(("rdf:about", iri.as_str())),
            RdfNode::BlankNode(id) => desc.push_attribute(("rdf:nodeID", id.as_str())),
        }
        writer.write_event(Event::Start(desc)).map_err(xml_err)?;

        for stmt in statements {
            let qname = qnames[stmt.predicate_iri.as_str()].as_str();
            let mut element = BytesStart::new(qname);
            match &stmt.object {
                RdfObject::Node(RdfNode::Iri(iri)) => {
                    element.push_attribute(("rdf:resource", iri.as_str()));
                    writer.write_event(Event::Empty(element)).map_err(xml_err)?;
                }
                RdfObject::Node(RdfNode::BlankNode(id)) => {
                    element.push_attribute(("rdf:nodeID", id.as_str()));
                    writer.write_event(Event::Empty(element)).map_err(xml_err)?;
                }
                RdfObject::Literal(lit) => {
                    if let Some(dt) = &lit.datatype {
                        element.push_attribute(("rdf:datatype", dt.as_str()));
                    }
                    writer.write_event(Event::Start(element)).map_err(xml_err)?;
                    writer
                        .write_event(Event::Text(BytesText::new(&lit.lexical)))
                        .map_err(xml_err)?;
                    writer
                        .write_event(Event::End(BytesEnd::new(qname)))
                        .map_err(xml_err)?;
                }
            }
        }

        writer
            .write_event(Event::End(BytesEnd::new("rdf:Description")))
            .map_err(xml_err)?;
    }

    writer
        .write_event(Event::End(BytesEnd::new("rdf:RDF")))
        .map_err(xml_err)?;

    let mut bytes = writer.into_inner();
    bytes.push(b'\n');
    String::from_utf8(bytes).map_err(xml_err)
}

// ============================================================================
// Files
// ============================================================================

pub fn serialize_graph(graph: &ObsGraph, format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::N3 => Ok(to_n3(graph)),
        OutputFormat::RdfXml => to_rdf_xml(graph),
    }
}

/// Serialize `graph` and write it to `path` (the file is replaced).
pub fn write_graph(graph: &ObsGraph, path: &Path, format: OutputFormat) -> Result<()> {
    let text = serialize_graph(graph, format)?;
    std::fs::write(path, text).map_err(|e| ObsCoreError::io(path, e))
}

// ============================================================================
// Read-back
// ============================================================================

fn term_text<T: Term>(term: &T) -> String {
    if let Some(iri) = term.iri() {
        format!("<{}>", iri.as_str())
    } else if let Some(id) = term.bnode_id() {
        format!("_:{}", id.as_str())
    } else if let Some(lexical) = term.lexical_form() {
        match term.datatype() {
            Some(dt) => format!("\"{}\"^^<{}>", &*lexical, dt.as_str()),
            None => format!("\"{}\"", &*lexical),
        }
    } else {
        String::new()
    }
}

/// Parse serialized RDF back into `(subject, predicate, object)` display
/// strings (`<iri>`, `_:id`, `"lexical"^^<datatype>`).
pub fn parse_statements(bytes: &[u8], format: OutputFormat) -> Result<Vec<[String; 3]>> {
    let reader = std::io::BufReader::new(std::io::Cursor::new(bytes));
    let mut out: Vec<[String; 3]> = Vec::new();

    match format {
        OutputFormat::N3 => {
            let mut parser = sophia::turtle::parser::turtle::parse_bufread(reader);
            parser
                .try_for_each_triple(|t| -> std::result::Result<(), Infallible> {
                    out.push([term_text(&t.s()), term_text(&t.p()), term_text(&t.o())]);
                    Ok(())
                })
                .map_err(|e| ObsCoreError::Serialization(format!("N3 does not parse: {e}")))?;
        }
        OutputFormat::RdfXml => {
            let mut parser = sophia::xml::parser::parse_bufread(reader);
            parser
                .try_for_each_triple(|t| -> std::result::Result<(), Infallible> {
                    out.push([term_text(&t.s()), term_text(&t.p()), term_text(&t.o())]);
                    Ok(())
                })
                .map_err(|e| {
                    ObsCoreError::Serialization(format!("RDF/XML does not parse: {e}"))
                })?;
        }
    }
    Ok(out)
}

/// Re-read a written graph file; returns its triple count.
pub fn verify_graph_file(path: &Path, format: OutputFormat) -> Result<usize> {
    let bytes = std::fs::read(path).map_err(|e| ObsCoreError::io(path, e))?;
    Ok(parse_statements(&bytes, format)?.len())
}
