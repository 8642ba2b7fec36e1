use crate::error::DataTypeParseError;
use oxrdf::vocab::{rdf, xsd};
use oxrdf::NamedNodeRef;
use std::fmt;
use std::str::FromStr;

/// The datatype a physical source reports for the values of one predicate.
///
/// This is deliberately a small, closed set: it only has to cover what the
/// source catalogs of the supported formats can declare, not the full XSD
/// hierarchy. Everything a source cannot express natively is reported as
/// [SourceDataType::String].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum SourceDataType {
    Boolean,
    Int,
    Long,
    Decimal,
    Double,
    String,
    /// A language-tagged string. Promotes with [SourceDataType::String].
    LangString,
    Date,
    DateTime,
    /// A link to another resource. Structural, collapses to string.
    Iri,
    /// An anonymous node. Structural, collapses to string.
    BlankNode,
}

impl SourceDataType {
    /// Returns whether this datatype is part of the numeric lattice.
    pub fn is_numeric(self) -> bool {
        matches!(
            self,
            SourceDataType::Int
                | SourceDataType::Long
                | SourceDataType::Decimal
                | SourceDataType::Double
        )
    }

    /// Returns whether this is one of the two structural node kinds.
    ///
    /// The execution substrate has no native representation for links or
    /// anonymous nodes, so both are normalized to strings before promotion.
    pub fn is_structural(self) -> bool {
        matches!(self, SourceDataType::Iri | SourceDataType::BlankNode)
    }

    /// Normalizes structural node kinds to [SourceDataType::String].
    pub fn normalized(self) -> Self {
        if self.is_structural() {
            SourceDataType::String
        } else {
            self
        }
    }

    /// Computes the least upper bound of two datatypes, if one exists.
    ///
    /// Structural kinds are normalized first. Within the numeric lattice
    /// `Int < Long < Decimal < Double` the larger type wins. Language-tagged
    /// strings promote with plain strings to plain strings. Any remaining
    /// mixture (e.g. a numeric and a non-numeric type) has no common
    /// representation and yields `None`.
    pub fn promote(self, other: Self) -> Option<Self> {
        let lhs = self.normalized();
        let rhs = other.normalized();

        if lhs == rhs {
            return Some(lhs);
        }

        if lhs.is_numeric() && rhs.is_numeric() {
            return Some(numeric_rank_to_type(numeric_rank(lhs).max(numeric_rank(rhs))));
        }

        match (lhs, rhs) {
            (SourceDataType::String, SourceDataType::LangString)
            | (SourceDataType::LangString, SourceDataType::String) => {
                Some(SourceDataType::String)
            }
            (SourceDataType::Date, SourceDataType::DateTime)
            | (SourceDataType::DateTime, SourceDataType::Date) => {
                Some(SourceDataType::DateTime)
            }
            _ => None,
        }
    }

    /// Returns the XSD (or RDF) datatype IRI corresponding to this datatype.
    pub fn datatype_iri(self) -> NamedNodeRef<'static> {
        match self {
            SourceDataType::Boolean => xsd::BOOLEAN,
            SourceDataType::Int => xsd::INT,
            SourceDataType::Long => xsd::LONG,
            SourceDataType::Decimal => xsd::DECIMAL,
            SourceDataType::Double => xsd::DOUBLE,
            SourceDataType::String => xsd::STRING,
            SourceDataType::LangString => rdf::LANG_STRING,
            SourceDataType::Date => xsd::DATE,
            SourceDataType::DateTime => xsd::DATE_TIME,
            SourceDataType::Iri | SourceDataType::BlankNode => xsd::ANY_URI,
        }
    }
}

fn numeric_rank(datatype: SourceDataType) -> u8 {
    match datatype {
        SourceDataType::Int => 0,
        SourceDataType::Long => 1,
        SourceDataType::Decimal => 2,
        SourceDataType::Double => 3,
        _ => unreachable!("caller checked is_numeric"),
    }
}

fn numeric_rank_to_type(rank: u8) -> SourceDataType {
    match rank {
        0 => SourceDataType::Int,
        1 => SourceDataType::Long,
        2 => SourceDataType::Decimal,
        _ => SourceDataType::Double,
    }
}

impl fmt::Display for SourceDataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SourceDataType::Boolean => "boolean",
            SourceDataType::Int => "int",
            SourceDataType::Long => "long",
            SourceDataType::Decimal => "decimal",
            SourceDataType::Double => "double",
            SourceDataType::String => "string",
            SourceDataType::LangString => "langString",
            SourceDataType::Date => "date",
            SourceDataType::DateTime => "dateTime",
            SourceDataType::Iri => "iri",
            SourceDataType::BlankNode => "blankNode",
        };
        f.write_str(name)
    }
}

impl FromStr for SourceDataType {
    type Err = DataTypeParseError;

    /// Parses the short datatype names used in source catalogs.
    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Ok(match value {
            "boolean" => SourceDataType::Boolean,
            "int" | "integer" => SourceDataType::Int,
            "long" => SourceDataType::Long,
            "decimal" => SourceDataType::Decimal,
            "double" | "float" => SourceDataType::Double,
            "string" => SourceDataType::String,
            "langString" => SourceDataType::LangString,
            "date" => SourceDataType::Date,
            "dateTime" | "timestamp" => SourceDataType::DateTime,
            "iri" => SourceDataType::Iri,
            "blankNode" => SourceDataType::BlankNode,
            _ => return Err(DataTypeParseError::msg(value)),
        })
    }
}

impl TryFrom<NamedNodeRef<'_>> for SourceDataType {
    type Error = DataTypeParseError;

    /// Maps an XSD datatype IRI to a source datatype.
    fn try_from(datatype: NamedNodeRef<'_>) -> Result<Self, Self::Error> {
        Ok(if datatype == xsd::BOOLEAN {
            SourceDataType::Boolean
        } else if datatype == xsd::INT {
            SourceDataType::Int
        } else if datatype == xsd::INTEGER || datatype == xsd::LONG {
            SourceDataType::Long
        } else if datatype == xsd::DECIMAL {
            SourceDataType::Decimal
        } else if datatype == xsd::DOUBLE || datatype == xsd::FLOAT {
            SourceDataType::Double
        } else if datatype == xsd::STRING || datatype == xsd::ANY_URI {
            SourceDataType::String
        } else if datatype == rdf::LANG_STRING {
            SourceDataType::LangString
        } else if datatype == xsd::DATE {
            SourceDataType::Date
        } else if datatype == xsd::DATE_TIME {
            SourceDataType::DateTime
        } else {
            return Err(DataTypeParseError::msg(datatype.as_str()));
        })
    }
}
