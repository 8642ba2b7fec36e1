use crate::datatype::SourceDataType;
use oxrdf::NamedNode;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

/// The physical format of a data source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SourceFormat {
    Csv,
    Parquet,
    Json,
    Jdbc,
}

impl fmt::Display for SourceFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SourceFormat::Csv => "csv",
            SourceFormat::Parquet => "parquet",
            SourceFormat::Json => "json",
            SourceFormat::Jdbc => "jdbc",
        };
        f.write_str(name)
    }
}

/// Describes one physical data source and what it can serve.
///
/// Descriptors are produced by an external catalog loader and are read-only
/// afterwards. `datatypes` records, per predicate the source can serve, the
/// datatype the source reports for it; `null_counts` records how many bindings
/// of that predicate were observed unbound when the catalog was built. The
/// reconciler consumes both before any fetch happens.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataSourceDescriptor {
    id: String,
    path: String,
    format: SourceFormat,
    options: BTreeMap<String, String>,
    datatypes: BTreeMap<NamedNode, SourceDataType>,
    null_counts: BTreeMap<NamedNode, u64>,
}

impl DataSourceDescriptor {
    pub fn new(
        id: impl Into<String>,
        path: impl Into<String>,
        format: SourceFormat,
        options: BTreeMap<String, String>,
        datatypes: BTreeMap<NamedNode, SourceDataType>,
        null_counts: BTreeMap<NamedNode, u64>,
    ) -> Self {
        Self {
            id: id.into(),
            path: path.into(),
            format,
            options,
            datatypes,
            null_counts,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn format(&self) -> SourceFormat {
        self.format
    }

    pub fn options(&self) -> &BTreeMap<String, String> {
        &self.options
    }

    /// Returns whether this source can serve `predicate`.
    pub fn serves(&self, predicate: &NamedNode) -> bool {
        self.datatypes.contains_key(predicate)
    }

    /// The datatype this source reports for `predicate`, if it serves it.
    pub fn datatype(&self, predicate: &NamedNode) -> Option<SourceDataType> {
        self.datatypes.get(predicate).copied()
    }

    /// All predicate/datatype pairs this source can serve.
    pub fn datatypes(&self) -> &BTreeMap<NamedNode, SourceDataType> {
        &self.datatypes
    }

    /// The number of unbound values observed for `predicate`.
    pub fn null_count(&self, predicate: &NamedNode) -> u64 {
        self.null_counts.get(predicate).copied().unwrap_or(0)
    }
}

/// The catalog of all physical sources known for one deployment.
///
/// Built once from an external configuration, then only read. Lookups go
/// through a predicate index so that resolving a star does not scan every
/// descriptor.
#[derive(Debug, Clone, Default)]
pub struct SourceCatalog {
    sources: Vec<Arc<DataSourceDescriptor>>,
    by_predicate: BTreeMap<NamedNode, Vec<usize>>,
}

impl SourceCatalog {
    pub fn new(sources: Vec<DataSourceDescriptor>) -> Self {
        let sources: Vec<_> = sources.into_iter().map(Arc::new).collect();
        let mut by_predicate: BTreeMap<NamedNode, Vec<usize>> = BTreeMap::new();
        for (index, source) in sources.iter().enumerate() {
            for predicate in source.datatypes().keys() {
                by_predicate.entry(predicate.clone()).or_default().push(index);
            }
        }
        Self { sources, by_predicate }
    }

    pub fn len(&self) -> usize {
        self.sources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }

    pub fn sources(&self) -> impl Iterator<Item = &Arc<DataSourceDescriptor>> {
        self.sources.iter()
    }

    /// All sources capable of serving `predicate`, in catalog order.
    pub fn sources_for(
        &self,
        predicate: &NamedNode,
    ) -> impl Iterator<Item = &Arc<DataSourceDescriptor>> {
        self.by_predicate
            .get(predicate)
            .into_iter()
            .flatten()
            .map(|&index| &self.sources[index])
    }
}
