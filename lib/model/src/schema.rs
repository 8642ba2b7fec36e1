use crate::datatype::SourceDataType;
use oxrdf::Variable;
use std::fmt;

/// How a variable's value is computed from the source's native binding.
///
/// Most variables read a column directly. Derived values wrap the inner
/// definition: structural terms are cast to their string form, language-tagged
/// literals are reduced to their lexical form, and `LanguageTag` extracts the
/// tag itself. Whichever backend implements the execution contract evaluates
/// the definition once per output row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValueDefinition {
    /// Read the named source column as-is.
    Column(String),
    /// Render the inner value as a plain string.
    CastToString(Box<ValueDefinition>),
    /// The lexical form of a language-tagged literal, without its tag.
    LexicalForm(Box<ValueDefinition>),
    /// The language tag of a language-tagged literal.
    LanguageTag(Box<ValueDefinition>),
}

impl ValueDefinition {
    pub fn column(name: impl Into<String>) -> Self {
        ValueDefinition::Column(name.into())
    }

    /// The source column this definition ultimately reads.
    pub fn source_column(&self) -> &str {
        match self {
            ValueDefinition::Column(name) => name,
            ValueDefinition::CastToString(inner)
            | ValueDefinition::LexicalForm(inner)
            | ValueDefinition::LanguageTag(inner) => inner.source_column(),
        }
    }

    /// Whether this definition is a plain column read.
    pub fn is_identity(&self) -> bool {
        matches!(self, ValueDefinition::Column(_))
    }
}

impl fmt::Display for ValueDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValueDefinition::Column(name) => f.write_str(name),
            ValueDefinition::CastToString(inner) => write!(f, "str({inner})"),
            ValueDefinition::LexicalForm(inner) => write!(f, "lex({inner})"),
            ValueDefinition::LanguageTag(inner) => write!(f, "lang({inner})"),
        }
    }
}

/// One column of a reconciled source schema.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnMapping {
    pub variable: Variable,
    pub data_type: SourceDataType,
    pub nullable: bool,
    pub definition: ValueDefinition,
}

/// The target relational schema for one physical source within one query.
///
/// Computed once per source, consumed immediately to build that source's
/// typed relation, then discarded. Column order follows the order the
/// variables were passed to the reconciler.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SchemaMapping {
    columns: Vec<ColumnMapping>,
}

impl SchemaMapping {
    pub fn new(columns: Vec<ColumnMapping>) -> Self {
        Self { columns }
    }

    pub fn columns(&self) -> &[ColumnMapping] {
        &self.columns
    }

    pub fn column(&self, variable: &Variable) -> Option<&ColumnMapping> {
        self.columns.iter().find(|c| &c.variable == variable)
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }
}

impl fmt::Display for SchemaMapping {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[")?;
        for (i, column) in self.columns.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(
                f,
                "{}: {}{}",
                column.variable.as_str(),
                column.data_type,
                if column.nullable { "?" } else { "" }
            )?;
            if !column.definition.is_identity() {
                write!(f, " = {}", column.definition)?;
            }
        }
        write!(f, "]")
    }
}
