//! Minimal RDF term model and an insertion-ordered graph.
//!
//! Graphs here are small (one observation each), so a `Vec` of statements
//! plus a set for de-duplication is enough. Keeping insertion order makes
//! the serialized output follow the order in which the builder emits
//! properties, which keeps diffs between runs readable.

use crate::vocab::rdf;
use std::collections::{HashMap, HashSet};

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum RdfNode {
    Iri(String),
    BlankNode(String),
}

impl RdfNode {
    pub fn iri(iri: impl Into<String>) -> Self {
        RdfNode::Iri(iri.into())
    }

    pub fn as_iri(&self) -> Option<&str> {
        match self {
            RdfNode::Iri(iri) => Some(iri),
            RdfNode::BlankNode(_) => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RdfLiteral {
    pub lexical: String,
    pub datatype: Option<String>,
}

impl RdfLiteral {
    pub fn plain(lexical: impl Into<String>) -> Self {
        Self {
            lexical: lexical.into(),
            datatype: None,
        }
    }

    pub fn typed(lexical: impl Into<String>, datatype: &str) -> Self {
        Self {
            lexical: lexical.into(),
            datatype: Some(datatype.to_string()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum RdfObject {
    Node(RdfNode),
    Literal(RdfLiteral),
}

impl From<RdfNode> for RdfObject {
    fn from(node: RdfNode) -> Self {
        RdfObject::Node(node)
    }
}

impl From<RdfLiteral> for RdfObject {
    fn from(lit: RdfLiteral) -> Self {
        RdfObject::Literal(lit)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RdfStatement {
    pub subject: RdfNode,
    pub predicate_iri: String,
    pub object: RdfObject,
}

#[derive(Debug, Clone, Default)]
pub struct ObsGraph {
    statements: Vec<RdfStatement>,
    seen: HashSet<RdfStatement>,
    next_bnode: usize,
}

impl ObsGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a statement; returns `false` if it was already present.
    pub fn add(
        &mut self,
        subject: &RdfNode,
        predicate_iri: &str,
        object: impl Into<RdfObject>,
    ) -> bool {
        let stmt = RdfStatement {
            subject: subject.clone(),
            predicate_iri: predicate_iri.to_string(),
            object: object.into(),
        };
        if !self.seen.insert(stmt.clone()) {
            return false;
        }
        self.statements.push(stmt);
        true
    }

    pub fn add_type(&mut self, subject: &RdfNode, class_iri: &str) -> bool {
        self.add(subject, rdf::TYPE, RdfNode::iri(class_iri))
    }

    /// Add `subject predicate literal` when a literal is present.
    pub fn add_literal(
        &mut self,
        subject: &RdfNode,
        predicate_iri: &str,
        literal: Option<RdfLiteral>,
    ) {
        if let Some(literal) = literal {
            self.add(subject, predicate_iri, literal);
        }
    }

    /// Fresh blank node, unique within this graph.
    pub fn new_blank_node(&mut self) -> RdfNode {
        let node = RdfNode::BlankNode(format!("b{}", self.next_bnode));
        self.next_bnode += 1;
        node
    }

    pub fn statements(&self) -> &[RdfStatement] {
        &self.statements
    }

    pub fn len(&self) -> usize {
        self.statements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.statements.is_empty()
    }

    pub fn contains(&self, subject: &RdfNode, predicate_iri: &str, object: &RdfObject) -> bool {
        self.statements.iter().any(|s| {
            &s.subject == subject && s.predicate_iri == predicate_iri && &s.object == object
        })
    }

    /// Objects of `subject predicate ?o`, in insertion order.
    pub fn objects<'a>(
        &'a self,
        subject: &'a RdfNode,
        predicate_iri: &'a str,
    ) -> impl Iterator<Item = &'a RdfObject> + 'a {
        self.statements
            .iter()
            .filter(move |s| &s.subject == subject && s.predicate_iri == predicate_iri)
            .map(|s| &s.object)
    }

    /// Subjects in order of first appearance, each with its statements.
    pub fn by_subject(&self) -> Vec<(&RdfNode, Vec<&RdfStatement>)> {
        let mut order: Vec<&RdfNode> = Vec::new();
        let mut index: HashMap<&RdfNode, usize> = HashMap::new();
        let mut groups: Vec<Vec<&RdfStatement>> = Vec::new();
        for stmt in &self.statements {
            let slot = *index.entry(&stmt.subject).or_insert_with(|| {
                order.push(&stmt.subject);
                groups.push(Vec::new());
                groups.len() - 1
            });
            groups[slot].push(stmt);
        }
        order.into_iter().zip(groups).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duplicate_statements_are_dropped() {
        let mut g = ObsGraph::new();
        let s = RdfNode::iri("http://example.org/s");
        assert!(g.add(&s, "http://example.org/p", RdfLiteral::plain("x")));
        assert!(!g.add(&s, "http://example.org/p", RdfLiteral::plain("x")));
        assert!(g.add(&s, "http://example.org/p", RdfLiteral::plain("y")));
        assert_eq!(g.len(), 2);
    }

    #[test]
    fn blank_nodes_are_unique() {
        let mut g = ObsGraph::new();
        let a = g.new_blank_node();
        let b = g.new_blank_node();
        assert_ne!(a, b);
        assert_eq!(a.as_iri(), None);
    }

    #[test]
    fn groups_by_subject_in_first_appearance_order() {
        let mut g = ObsGraph::new();
        let a = RdfNode::iri("http://example.org/a");
        let b = RdfNode::iri("http://example.org/b");
        g.add_type(&b, "http://example.org/B");
        g.add_type(&a, "http://example.org/A");
        g.add(&b, "http://example.org/p", a.clone());

        let grouped = g.by_subject();
        assert_eq!(grouped.len(), 2);
        assert_eq!(grouped[0].0, &b);
        assert_eq!(grouped[0].1.len(), 2);
        assert_eq!(grouped[1].0, &a);
    }

    #[test]
    fn objects_filters_by_subject_and_predicate() {
        let mut g = ObsGraph::new();
        let s = RdfNode::iri("http://example.org/s");
        g.add(&s, "http://example.org/p", RdfLiteral::plain("1"));
        g.add(&s, "http://example.org/q", RdfLiteral::plain("2"));
        g.add(&s, "http://example.org/p", RdfLiteral::plain("3"));

        let found: Vec<_> = g.objects(&s, "http://example.org/p").collect();
        assert_eq!(
            found,
            vec![
                &RdfObject::Literal(RdfLiteral::plain("1")),
                &RdfObject::Literal(RdfLiteral::plain("3")),
            ]
        );
        assert!(g.contains(&s, "http://example.org/q", &RdfLiteral::plain("2").into()));
    }
}
