//! A small in-memory backend for end-to-end tests.
//!
//! Sources are registered as entity tables keyed by the descriptor id. Each
//! entity is a subject id plus its property values, which is enough to
//! exercise fetching, filtering, joining and the post-processing operations
//! over typed rows.

use spargebra::algebra::Expression;
use starlake::{
    BackendError, ExecutionBackend, FetchedRelation, JoinStep, MaterializedResult, OrderKey,
    ResolvedStar, ResultColumn, ResultValue, SelectedColumn, SortOrder, StarFetchParams,
    StarPattern, Variable,
};
use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};

pub struct Entity {
    id: String,
    values: BTreeMap<String, ResultValue>,
}

pub fn entity(id: &str, values: &[(&str, ResultValue)]) -> Entity {
    Entity {
        id: id.to_owned(),
        values: values
            .iter()
            .map(|(predicate, value)| ((*predicate).to_owned(), value.clone()))
            .collect(),
    }
}

/// A fully materialized relation; every operation copies rows eagerly.
#[derive(Debug, Clone)]
pub struct Relation {
    columns: Vec<ResultColumn>,
    rows: Vec<Vec<ResultValue>>,
}

impl Relation {
    fn column_index(&self, name: &str) -> Result<usize, BackendError> {
        self.columns
            .iter()
            .position(|column| column.name == name)
            .ok_or_else(|| BackendError::msg(format!("unknown column {name}")))
    }
}

#[derive(Default)]
pub struct MemBackend {
    tables: BTreeMap<String, Vec<Entity>>,
}

impl MemBackend {
    pub fn with_table(mut self, source_id: &str, entities: Vec<Entity>) -> Self {
        self.tables.insert(source_id.to_owned(), entities);
        self
    }
}

#[async_trait::async_trait]
impl ExecutionBackend for MemBackend {
    type Relation = Relation;

    async fn fetch(
        &self,
        star: &StarPattern,
        resolved: &ResolvedStar,
        params: StarFetchParams<'_>,
    ) -> Result<FetchedRelation<Self::Relation>, BackendError> {
        let entities = resolved
            .sources()
            .iter()
            .find_map(|source| self.tables.get(source.descriptor().id()))
            .ok_or_else(|| {
                BackendError::msg(format!("no table registered for star {}", star.id()))
            })?;

        let columns: Vec<ResultColumn> = params
            .schema
            .columns()
            .iter()
            .map(|column| ResultColumn {
                name: column.variable.as_str().to_owned(),
                data_type: column.data_type,
                nullable: column.nullable,
            })
            .collect();

        let mut relation = Relation {
            columns,
            rows: Vec::new(),
        };
        for entity in entities {
            let mut row = Vec::with_capacity(relation.columns.len());
            for column in params.schema.columns() {
                row.push(entity_value(star, entity, &column.variable)?);
            }
            if passes_filters(&relation, &row, params.filters)? {
                relation.rows.push(row);
            }
        }

        Ok(FetchedRelation {
            relation,
            filters_applied: params.filters.len(),
        })
    }

    async fn join(
        &self,
        sequence: &[JoinStep],
        mut relations: BTreeMap<String, Self::Relation>,
    ) -> Result<Self::Relation, BackendError> {
        let first = sequence
            .first()
            .ok_or_else(|| BackendError::msg("empty join sequence"))?;
        let mut current = relations
            .remove(&first.left)
            .ok_or_else(|| BackendError::msg(format!("missing relation {}", first.left)))?;
        for step in sequence {
            let right = relations
                .remove(&step.right)
                .ok_or_else(|| BackendError::msg(format!("missing relation {}", step.right)))?;
            current = equi_join(current, right, &step.variable)?;
        }
        Ok(current)
    }

    fn group_by(
        &self,
        relation: Self::Relation,
        variables: &[Variable],
    ) -> Result<Self::Relation, BackendError> {
        let indices = variables
            .iter()
            .map(|variable| relation.column_index(variable.as_str()))
            .collect::<Result<Vec<_>, _>>()?;
        let mut seen = BTreeSet::new();
        let rows = relation
            .rows
            .into_iter()
            .filter(|row| {
                let key: Vec<String> = indices.iter().map(|i| row[*i].to_string()).collect();
                seen.insert(key)
            })
            .collect();
        Ok(Relation {
            columns: relation.columns,
            rows,
        })
    }

    fn order_by(
        &self,
        mut relation: Self::Relation,
        keys: &[OrderKey],
    ) -> Result<Self::Relation, BackendError> {
        let indices = keys
            .iter()
            .map(|key| Ok((relation.column_index(key.variable.as_str())?, key.order)))
            .collect::<Result<Vec<_>, BackendError>>()?;
        relation.rows.sort_by(|left, right| {
            for (index, order) in &indices {
                let ordering = compare(&left[*index], &right[*index]);
                let ordering = match order {
                    SortOrder::Ascending => ordering,
                    SortOrder::Descending => ordering.reverse(),
                };
                if ordering != Ordering::Equal {
                    return ordering;
                }
            }
            Ordering::Equal
        });
        Ok(relation)
    }

    fn project(
        &self,
        relation: Self::Relation,
        columns: &[SelectedColumn],
        distinct: bool,
    ) -> Result<Self::Relation, BackendError> {
        let indices = columns
            .iter()
            .map(|column| relation.column_index(column.variable.as_str()))
            .collect::<Result<Vec<_>, _>>()?;
        let projected_columns = indices
            .iter()
            .map(|i| relation.columns[*i].clone())
            .collect();
        let mut seen = BTreeSet::new();
        let rows = relation
            .rows
            .into_iter()
            .map(|row| {
                indices
                    .iter()
                    .map(|i| row[*i].clone())
                    .collect::<Vec<_>>()
            })
            .filter(|row| {
                if !distinct {
                    return true;
                }
                let key: Vec<String> = row.iter().map(ToString::to_string).collect();
                seen.insert(key)
            })
            .collect();
        Ok(Relation {
            columns: projected_columns,
            rows,
        })
    }

    fn limit(
        &self,
        mut relation: Self::Relation,
        limit: usize,
    ) -> Result<Self::Relation, BackendError> {
        relation.rows.truncate(limit);
        Ok(relation)
    }

    async fn run(&self, relation: Self::Relation) -> Result<MaterializedResult, BackendError> {
        Ok(MaterializedResult::new(relation.columns, relation.rows))
    }
}

fn entity_value(
    star: &StarPattern,
    entity: &Entity,
    variable: &Variable,
) -> Result<ResultValue, BackendError> {
    if star.subject().as_variable() == Some(variable) {
        return Ok(ResultValue::String(entity.id.clone()));
    }
    let predicate = star
        .properties()
        .iter()
        .find(|property| property.object_variable() == Some(variable))
        .map(|property| property.predicate.as_str())
        .ok_or_else(|| BackendError::msg(format!("variable {variable} not bound by star")))?;
    Ok(entity
        .values
        .get(predicate)
        .cloned()
        .unwrap_or(ResultValue::Null))
}

fn equi_join(
    left: Relation,
    right: Relation,
    variable: &Variable,
) -> Result<Relation, BackendError> {
    let left_key = left.column_index(variable.as_str())?;
    let right_key = right.column_index(variable.as_str())?;

    let mut columns = left.columns.clone();
    let kept: Vec<usize> = right
        .columns
        .iter()
        .enumerate()
        .filter(|(_, column)| !left.columns.iter().any(|c| c.name == column.name))
        .map(|(i, column)| {
            columns.push(column.clone());
            i
        })
        .collect();

    let mut rows = Vec::new();
    for left_row in &left.rows {
        if left_row[left_key].is_null() {
            continue;
        }
        for right_row in &right.rows {
            if left_row[left_key] != right_row[right_key] {
                continue;
            }
            let mut row = left_row.clone();
            row.extend(kept.iter().map(|i| right_row[*i].clone()));
            rows.push(row);
        }
    }
    Ok(Relation { columns, rows })
}

fn passes_filters(
    relation: &Relation,
    row: &[ResultValue],
    filters: &[Expression],
) -> Result<bool, BackendError> {
    for filter in filters {
        if !evaluate(filter, relation, row)? {
            return Ok(false);
        }
    }
    Ok(true)
}

fn evaluate(
    expression: &Expression,
    relation: &Relation,
    row: &[ResultValue],
) -> Result<bool, BackendError> {
    match expression {
        Expression::And(left, right) => {
            Ok(evaluate(left, relation, row)? && evaluate(right, relation, row)?)
        }
        Expression::Or(left, right) => {
            Ok(evaluate(left, relation, row)? || evaluate(right, relation, row)?)
        }
        Expression::Not(inner) => Ok(!evaluate(inner, relation, row)?),
        Expression::Equal(left, right) => Ok(matches!(
            compare(&operand(left, relation, row)?, &operand(right, relation, row)?),
            Ordering::Equal
        )),
        Expression::Greater(left, right) => Ok(matches!(
            compare(&operand(left, relation, row)?, &operand(right, relation, row)?),
            Ordering::Greater
        )),
        Expression::GreaterOrEqual(left, right) => Ok(!matches!(
            compare(&operand(left, relation, row)?, &operand(right, relation, row)?),
            Ordering::Less
        )),
        Expression::Less(left, right) => Ok(matches!(
            compare(&operand(left, relation, row)?, &operand(right, relation, row)?),
            Ordering::Less
        )),
        Expression::LessOrEqual(left, right) => Ok(!matches!(
            compare(&operand(left, relation, row)?, &operand(right, relation, row)?),
            Ordering::Greater
        )),
        _ => Err(BackendError::msg("unsupported filter expression")),
    }
}

fn operand(
    expression: &Expression,
    relation: &Relation,
    row: &[ResultValue],
) -> Result<ResultValue, BackendError> {
    match expression {
        Expression::Variable(variable) => {
            let index = relation.column_index(variable.as_str())?;
            Ok(row[index].clone())
        }
        Expression::Literal(literal) => {
            let lexical = literal.value();
            if let Ok(value) = lexical.parse::<i64>() {
                Ok(ResultValue::Int(value))
            } else if let Ok(value) = lexical.parse::<f64>() {
                Ok(ResultValue::Double(value))
            } else {
                Ok(ResultValue::String(lexical.to_owned()))
            }
        }
        _ => Err(BackendError::msg("unsupported filter operand")),
    }
}

#[allow(clippy::cast_precision_loss)]
fn compare(left: &ResultValue, right: &ResultValue) -> Ordering {
    match (left, right) {
        (ResultValue::Null, ResultValue::Null) => Ordering::Equal,
        (ResultValue::Null, _) => Ordering::Less,
        (_, ResultValue::Null) => Ordering::Greater,
        (ResultValue::Int(l), ResultValue::Int(r)) => l.cmp(r),
        (ResultValue::Double(l), ResultValue::Double(r)) => {
            l.partial_cmp(r).unwrap_or(Ordering::Equal)
        }
        (ResultValue::Int(l), ResultValue::Double(r)) => {
            (*l as f64).partial_cmp(r).unwrap_or(Ordering::Equal)
        }
        (ResultValue::Double(l), ResultValue::Int(r)) => {
            l.partial_cmp(&(*r as f64)).unwrap_or(Ordering::Equal)
        }
        (ResultValue::Boolean(l), ResultValue::Boolean(r)) => l.cmp(r),
        (ResultValue::String(l), ResultValue::String(r)) => l.cmp(r),
        _ => left.to_string().cmp(&right.to_string()),
    }
}
