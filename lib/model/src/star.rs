use oxrdf::{NamedNode, Variable};
use spargebra::term::TermPattern;
use std::collections::BTreeSet;
use std::fmt;

/// The subject slot of a [StarPattern].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum StarSubject {
    /// A free subject variable (the common case).
    Variable(Variable),
    /// A bound subject. The pattern forms a singleton star keyed by the IRI.
    Constant(NamedNode),
}

impl StarSubject {
    /// Returns the stable identifier used to key the star inside one query.
    ///
    /// Variables render as `?name`, constants as their IRI. Identifiers are
    /// compared lexicographically wherever the planner needs a tie-break.
    pub fn id(&self) -> String {
        match self {
            StarSubject::Variable(variable) => variable.to_string(),
            StarSubject::Constant(node) => node.as_str().to_owned(),
        }
    }

    pub fn as_variable(&self) -> Option<&Variable> {
        match self {
            StarSubject::Variable(variable) => Some(variable),
            StarSubject::Constant(_) => None,
        }
    }
}

impl fmt::Display for StarSubject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StarSubject::Variable(variable) => write!(f, "{variable}"),
            StarSubject::Constant(node) => write!(f, "{node}"),
        }
    }
}

/// One `(predicate, object)` pair of a star.
///
/// The predicate is always a bound IRI. The object may be a variable or a
/// constant term; only variable objects participate in joins and projection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StarProperty {
    pub predicate: NamedNode,
    pub object: TermPattern,
}

impl StarProperty {
    pub fn new(predicate: NamedNode, object: TermPattern) -> Self {
        Self { predicate, object }
    }

    /// Returns the object variable, if the object slot is free.
    pub fn object_variable(&self) -> Option<&Variable> {
        match &self.object {
            TermPattern::Variable(variable) => Some(variable),
            _ => None,
        }
    }
}

/// A group of triple patterns sharing one subject.
///
/// Stars are the planning granule: sources are resolved per star, relations
/// are fetched per star, and the join graph connects stars through shared
/// variables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StarPattern {
    subject: StarSubject,
    properties: Vec<StarProperty>,
}

impl StarPattern {
    pub fn new(subject: StarSubject, properties: Vec<StarProperty>) -> Self {
        Self { subject, properties }
    }

    pub fn subject(&self) -> &StarSubject {
        &self.subject
    }

    /// The stable identifier of this star inside one query.
    pub fn id(&self) -> String {
        self.subject.id()
    }

    pub fn properties(&self) -> &[StarProperty] {
        &self.properties
    }

    /// The set of predicates this star touches, deduplicated.
    pub fn predicates(&self) -> BTreeSet<&NamedNode> {
        self.properties.iter().map(|p| &p.predicate).collect()
    }

    /// All object variables of this star.
    pub fn object_variables(&self) -> impl Iterator<Item = &Variable> {
        self.properties.iter().filter_map(StarProperty::object_variable)
    }

    /// Returns whether `variable` is bound by this star, as subject or object.
    pub fn binds(&self, variable: &Variable) -> bool {
        self.subject.as_variable() == Some(variable)
            || self.object_variables().any(|v| v == variable)
    }

    pub fn len(&self) -> usize {
        self.properties.len()
    }

    pub fn is_empty(&self) -> bool {
        self.properties.is_empty()
    }
}

impl fmt::Display for StarPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {{", self.subject)?;
        for (i, property) in self.properties.iter().enumerate() {
            if i > 0 {
                write!(f, " ;")?;
            }
            write!(f, " {} {}", property.predicate, property.object)?;
        }
        write!(f, " }}")
    }
}

/// Where a variable was bound inside a query.
///
/// The map from variables to origins must be total: clauses such as
/// `ORDER BY` reference variables, not star/predicate pairs, and have to be
/// translated back to the star that binds them.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub enum VariableOrigin {
    /// The variable is the subject of `star`.
    Subject { star: String },
    /// The variable is the object bound by `predicate` inside `star`.
    Object { star: String, predicate: NamedNode },
}

impl VariableOrigin {
    pub fn star(&self) -> &str {
        match self {
            VariableOrigin::Subject { star } | VariableOrigin::Object { star, .. } => star,
        }
    }

    pub fn predicate(&self) -> Option<&NamedNode> {
        match self {
            VariableOrigin::Subject { .. } => None,
            VariableOrigin::Object { predicate, .. } => Some(predicate),
        }
    }
}
