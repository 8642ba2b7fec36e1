//! Derives one target relational schema from the datatypes a set of sources
//! report for the variables of a star.

use crate::error::PlanError;
use starlake_model::{
    ColumnMapping, SchemaMapping, SourceDataType, ValueDefinition, Variable,
};
use std::collections::BTreeMap;

/// Reconciles the observed datatypes of `variables` into one schema mapping.
///
/// Per variable this computes the promoted datatype (least upper bound over
/// everything observed, with structural kinds collapsed to string first), the
/// nullability flag, and the value-definition expression describing how the
/// backend computes the value from the source's native binding. Column order
/// follows `variables`.
///
/// A variable without any observation is typed as a nullable string; this
/// happens for subject variables of stars whose catalog carries no entity
/// datatype.
pub fn reconcile(
    variables: &[Variable],
    observed: &BTreeMap<Variable, Vec<SourceDataType>>,
    null_counts: &BTreeMap<Variable, u64>,
) -> Result<SchemaMapping, PlanError> {
    let columns = variables
        .iter()
        .map(|variable| {
            let observations = observed.get(variable).map_or(&[] as &[_], Vec::as_slice);
            let data_type = promote_all(variable, observations)?;
            let nullable = observations.is_empty()
                || null_counts.get(variable).copied().unwrap_or(0) > 0;
            let definition = derive_definition(variable, observations);
            Ok(ColumnMapping {
                variable: variable.clone(),
                data_type,
                nullable,
                definition,
            })
        })
        .collect::<Result<Vec<_>, PlanError>>()?;

    Ok(SchemaMapping::new(columns))
}

fn promote_all(
    variable: &Variable,
    observations: &[SourceDataType],
) -> Result<SourceDataType, PlanError> {
    let mut iter = observations.iter().copied();
    let Some(first) = iter.next() else {
        return Ok(SourceDataType::String);
    };

    let mut promoted = first.normalized();
    for observation in iter {
        promoted = promoted.promote(observation).ok_or(PlanError::TypeConflict {
            variable: variable.clone(),
            left: promoted,
            right: observation,
        })?;
    }
    Ok(promoted)
}

/// Picks the value-definition expression for one variable.
///
/// A structural observation needs a cast to the string form; a
/// language-tagged observation reduces to its lexical form; everything else
/// is a direct column read.
fn derive_definition(variable: &Variable, observations: &[SourceDataType]) -> ValueDefinition {
    let column = ValueDefinition::column(variable.as_str());
    if observations.iter().any(|o| o.is_structural()) {
        ValueDefinition::CastToString(Box::new(column))
    } else if observations.contains(&SourceDataType::LangString) {
        ValueDefinition::LexicalForm(Box::new(column))
    } else {
        column
    }
}
