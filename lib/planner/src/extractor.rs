//! Parses query text into the star-shaped intermediate form the planner
//! consumes.
//!
//! The extractor strips the non-standard `TRANSFORM(...)` clause before
//! handing the remaining text to `spargebra`, walks the resulting algebra to
//! collect triple patterns and the surrounding clauses, and groups the triple
//! patterns into stars by subject.

use crate::error::PlanError;
use rustc_hash::FxHashMap;
use spargebra::algebra::{Expression, GraphPattern, OrderExpression};
use spargebra::term::{NamedNodePattern, TermPattern, TriplePattern};
use spargebra::Query;
use starlake_model::{
    NamedNode, StarPattern, StarProperty, StarSubject, Transform, TransformOp, TransformSide,
    Variable, VariableOrigin,
};
use std::collections::{BTreeMap, BTreeSet};

/// The sort direction of one `ORDER BY` key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    Ascending,
    Descending,
}

/// One `ORDER BY` key. Only plain variables are supported as keys.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderKey {
    pub variable: Variable,
    pub order: SortOrder,
}

/// The star-shaped decomposition of one query.
///
/// All members are immutable once constructed. Stars keep the order in which
/// their subjects first appear in the query text so that downstream stages
/// are deterministic.
#[derive(Debug, Clone)]
pub struct ExtractedQuery {
    stars: Vec<StarPattern>,
    filters: BTreeMap<String, Vec<Expression>>,
    projection: Vec<Variable>,
    distinct: bool,
    order_by: Vec<OrderKey>,
    group_by: Vec<Variable>,
    limit: Option<usize>,
    transforms: Vec<Transform>,
    origins: BTreeMap<Variable, VariableOrigin>,
}

impl ExtractedQuery {
    pub fn stars(&self) -> &[StarPattern] {
        &self.stars
    }

    pub fn star(&self, id: &str) -> Option<&StarPattern> {
        self.stars.iter().find(|star| star.id() == id)
    }

    /// The filters attributable to the given star.
    pub fn filters_for(&self, star_id: &str) -> &[Expression] {
        self.filters.get(star_id).map_or(&[], Vec::as_slice)
    }

    /// The number of filter predicates that will be applied to the star.
    pub fn filter_count(&self, star_id: &str) -> usize {
        self.filters_for(star_id).len()
    }

    pub fn projection(&self) -> &[Variable] {
        &self.projection
    }

    pub fn distinct(&self) -> bool {
        self.distinct
    }

    pub fn order_by(&self) -> &[OrderKey] {
        &self.order_by
    }

    pub fn group_by(&self) -> &[Variable] {
        &self.group_by
    }

    pub fn limit(&self) -> Option<usize> {
        self.limit
    }

    pub fn transforms(&self) -> &[Transform] {
        &self.transforms
    }

    /// The total map from every query variable to its canonical origin.
    pub fn origins(&self) -> &BTreeMap<Variable, VariableOrigin> {
        &self.origins
    }

    pub fn origin(&self, variable: &Variable) -> Option<&VariableOrigin> {
        self.origins.get(variable)
    }
}

/// Parses `query_text` into its star-shaped decomposition.
///
/// This is a pure function: it either returns the complete decomposition or a
/// [PlanError::MalformedQuery]; nothing is dropped silently.
pub fn extract(query_text: &str, base_iri: Option<&str>) -> Result<ExtractedQuery, PlanError> {
    let (stripped, transforms) = strip_transform(query_text)?;
    let query = Query::parse(&stripped, base_iri)?;

    let Query::Select { pattern, .. } = query else {
        return Err(PlanError::malformed("only SELECT queries are supported"));
    };

    let mut parts = RawParts::default();
    collect_pattern(&pattern, &mut parts)?;

    let stars = group_stars(parts.triples)?;
    let origins = canonical_origins(&stars);

    let projection = match parts.projection {
        Some(variables) => variables,
        // SELECT * projects every variable, in canonical order.
        None => origins.keys().cloned().collect(),
    };
    for variable in &projection {
        if !origins.contains_key(variable) {
            return Err(PlanError::malformed(format!(
                "projected variable {variable} is never bound by a triple pattern"
            )));
        }
    }

    let order_by = convert_order_keys(&parts.order_by, &origins)?;
    for variable in &parts.group_by {
        if !origins.contains_key(variable) {
            return Err(PlanError::malformed(format!(
                "GROUP BY variable {variable} is never bound by a triple pattern"
            )));
        }
    }

    let filters = attribute_filters(parts.filters, &stars, &origins)?;

    Ok(ExtractedQuery {
        stars,
        filters,
        projection,
        distinct: parts.distinct,
        order_by,
        group_by: parts.group_by,
        limit: parts.limit,
        transforms,
        origins,
    })
}

#[derive(Debug, Default)]
struct RawParts {
    triples: Vec<TriplePattern>,
    filters: Vec<Expression>,
    projection: Option<Vec<Variable>>,
    distinct: bool,
    order_by: Vec<OrderExpression>,
    group_by: Vec<Variable>,
    limit: Option<usize>,
}

fn collect_pattern(pattern: &GraphPattern, parts: &mut RawParts) -> Result<(), PlanError> {
    match pattern {
        GraphPattern::Bgp { patterns } => {
            parts.triples.extend(patterns.iter().cloned());
            Ok(())
        }
        GraphPattern::Join { left, right } => {
            collect_pattern(left, parts)?;
            collect_pattern(right, parts)
        }
        GraphPattern::Filter { expr, inner } => {
            parts.filters.push(expr.clone());
            collect_pattern(inner, parts)
        }
        GraphPattern::Project { inner, variables } => {
            parts.projection = Some(variables.clone());
            collect_pattern(inner, parts)
        }
        GraphPattern::Distinct { inner } | GraphPattern::Reduced { inner } => {
            parts.distinct = true;
            collect_pattern(inner, parts)
        }
        GraphPattern::OrderBy { inner, expression } => {
            parts.order_by = expression.clone();
            collect_pattern(inner, parts)
        }
        GraphPattern::Slice {
            inner,
            start,
            length,
        } => {
            if *start > 0 {
                return Err(PlanError::malformed("OFFSET is not supported"));
            }
            parts.limit = *length;
            collect_pattern(inner, parts)
        }
        GraphPattern::Group {
            inner,
            variables,
            aggregates,
        } => {
            if !aggregates.is_empty() {
                return Err(PlanError::malformed("aggregates are not supported"));
            }
            parts.group_by = variables.clone();
            collect_pattern(inner, parts)
        }
        _ => Err(PlanError::malformed(
            "query uses a SPARQL construct outside the supported conjunctive fragment",
        )),
    }
}

/// Groups triple patterns into stars by their subject, keeping the order in
/// which subjects first appear.
fn group_stars(triples: Vec<TriplePattern>) -> Result<Vec<StarPattern>, PlanError> {
    if triples.is_empty() {
        return Err(PlanError::malformed("query contains no triple patterns"));
    }

    let mut order: Vec<(StarSubject, Vec<StarProperty>)> = Vec::new();
    let mut index: FxHashMap<String, usize> = FxHashMap::default();

    for triple in triples {
        let subject = match &triple.subject {
            TermPattern::Variable(variable) => StarSubject::Variable(variable.clone()),
            TermPattern::NamedNode(node) => StarSubject::Constant(node.clone()),
            _ => {
                return Err(PlanError::malformed(
                    "only variables and IRIs are supported as subjects",
                ))
            }
        };
        let predicate = match &triple.predicate {
            NamedNodePattern::NamedNode(node) => node.clone(),
            NamedNodePattern::Variable(variable) => {
                return Err(PlanError::malformed(format!(
                    "predicate variable {variable} cannot be resolved against a source catalog"
                )))
            }
        };
        match &triple.object {
            TermPattern::Variable(_) | TermPattern::NamedNode(_) | TermPattern::Literal(_) => {}
            _ => {
                return Err(PlanError::malformed(
                    "only variables, IRIs and literals are supported as objects",
                ))
            }
        }

        let property = StarProperty::new(predicate, triple.object.clone());
        let key = subject.id();
        match index.get(&key) {
            Some(&i) => order[i].1.push(property),
            None => {
                index.insert(key, order.len());
                order.push((subject, vec![property]));
            }
        }
    }

    Ok(order
        .into_iter()
        .map(|(subject, properties)| StarPattern::new(subject, properties))
        .collect())
}

/// Builds the total variable-to-origin map.
///
/// A variable bound by several star/predicate pairs (a join variable) is
/// canonicalized to the lexicographically smallest object binding; variables
/// only ever used as subjects map to their star's subject origin.
fn canonical_origins(stars: &[StarPattern]) -> BTreeMap<Variable, VariableOrigin> {
    let mut origins: BTreeMap<Variable, VariableOrigin> = BTreeMap::new();

    for star in stars {
        if let Some(variable) = star.subject().as_variable() {
            let origin = VariableOrigin::Subject { star: star.id() };
            origins
                .entry(variable.clone())
                .and_modify(|existing| {
                    if matches!(existing, VariableOrigin::Subject { .. }) && *existing > origin {
                        *existing = origin.clone();
                    }
                })
                .or_insert(origin);
        }
        for property in star.properties() {
            let Some(variable) = property.object_variable() else {
                continue;
            };
            let origin = VariableOrigin::Object {
                star: star.id(),
                predicate: property.predicate.clone(),
            };
            origins
                .entry(variable.clone())
                .and_modify(|existing| match existing {
                    // Object bindings name a concrete column and win over
                    // subject bindings.
                    VariableOrigin::Subject { .. } => *existing = origin.clone(),
                    VariableOrigin::Object { .. } => {
                        if *existing > origin {
                            *existing = origin.clone();
                        }
                    }
                })
                .or_insert(origin);
        }
    }

    origins
}

fn convert_order_keys(
    order_by: &[OrderExpression],
    origins: &BTreeMap<Variable, VariableOrigin>,
) -> Result<Vec<OrderKey>, PlanError> {
    order_by
        .iter()
        .map(|expression| {
            let (variable, order) = match expression {
                OrderExpression::Asc(Expression::Variable(v)) => (v, SortOrder::Ascending),
                OrderExpression::Desc(Expression::Variable(v)) => (v, SortOrder::Descending),
                OrderExpression::Asc(_) | OrderExpression::Desc(_) => {
                    return Err(PlanError::malformed(
                        "only variables are supported as ORDER BY keys",
                    ))
                }
            };
            if !origins.contains_key(variable) {
                return Err(PlanError::malformed(format!(
                    "ORDER BY variable {variable} is never bound by a triple pattern"
                )));
            }
            Ok(OrderKey {
                variable: variable.clone(),
                order,
            })
        })
        .collect()
}

/// Assigns every filter to the single star that binds its variables.
///
/// The execution contract applies filters at fetch time, so a filter whose
/// variables span two stars has no place to run and is rejected.
fn attribute_filters(
    filters: Vec<Expression>,
    stars: &[StarPattern],
    origins: &BTreeMap<Variable, VariableOrigin>,
) -> Result<BTreeMap<String, Vec<Expression>>, PlanError> {
    let mut per_star: BTreeMap<String, Vec<Expression>> = BTreeMap::new();

    for filter in filters {
        let mut variables = BTreeSet::new();
        collect_expression_variables(&filter, &mut variables)?;
        if variables.is_empty() {
            return Err(PlanError::malformed(
                "filter does not reference any variable",
            ));
        }

        for variable in &variables {
            if !origins.contains_key(variable) {
                return Err(PlanError::malformed(format!(
                    "filter variable {variable} is never bound by a triple pattern"
                )));
            }
        }

        // A join variable is bound by several stars, so look for any star
        // that binds every variable of the filter. First match in extraction
        // order keeps the attribution deterministic.
        let target = stars
            .iter()
            .find(|star| variables.iter().all(|variable| star.binds(variable)))
            .ok_or_else(|| {
                PlanError::malformed(
                    "filters spanning multiple star patterns are not supported",
                )
            })?;
        per_star.entry(target.id()).or_default().push(filter);
    }

    Ok(per_star)
}

/// Collects the variables referenced by a filter expression.
pub(crate) fn filter_variables(
    expression: &Expression,
    out: &mut BTreeSet<Variable>,
) -> Result<(), PlanError> {
    collect_expression_variables(expression, out)
}

fn collect_expression_variables(
    expression: &Expression,
    out: &mut BTreeSet<Variable>,
) -> Result<(), PlanError> {
    match expression {
        Expression::NamedNode(_) | Expression::Literal(_) => Ok(()),
        Expression::Variable(variable) | Expression::Bound(variable) => {
            out.insert(variable.clone());
            Ok(())
        }
        Expression::Or(lhs, rhs)
        | Expression::And(lhs, rhs)
        | Expression::Equal(lhs, rhs)
        | Expression::SameTerm(lhs, rhs)
        | Expression::Greater(lhs, rhs)
        | Expression::GreaterOrEqual(lhs, rhs)
        | Expression::Less(lhs, rhs)
        | Expression::LessOrEqual(lhs, rhs)
        | Expression::Add(lhs, rhs)
        | Expression::Subtract(lhs, rhs)
        | Expression::Multiply(lhs, rhs)
        | Expression::Divide(lhs, rhs) => {
            collect_expression_variables(lhs, out)?;
            collect_expression_variables(rhs, out)
        }
        Expression::UnaryPlus(inner)
        | Expression::UnaryMinus(inner)
        | Expression::Not(inner) => collect_expression_variables(inner, out),
        Expression::In(needle, haystack) => {
            collect_expression_variables(needle, out)?;
            for expression in haystack {
                collect_expression_variables(expression, out)?;
            }
            Ok(())
        }
        Expression::If(cond, then, otherwise) => {
            collect_expression_variables(cond, out)?;
            collect_expression_variables(then, out)?;
            collect_expression_variables(otherwise, out)
        }
        Expression::Coalesce(expressions) => {
            for expression in expressions {
                collect_expression_variables(expression, out)?;
            }
            Ok(())
        }
        Expression::FunctionCall(_, arguments) => {
            for argument in arguments {
                collect_expression_variables(argument, out)?;
            }
            Ok(())
        }
        Expression::Exists(_) => Err(PlanError::malformed(
            "EXISTS filters are not supported",
        )),
    }
}

/// Removes the `TRANSFORM(...)` clause from the query text, if present, and
/// parses its content.
///
/// The clause is not part of the base grammar, so it has to go before the
/// standard parser sees the text.
fn strip_transform(query_text: &str) -> Result<(String, Vec<Transform>), PlanError> {
    const KEYWORD: &str = "TRANSFORM";

    let Some(start) = query_text.find(KEYWORD) else {
        return Ok((query_text.to_owned(), Vec::new()));
    };

    let after_keyword = &query_text[start + KEYWORD.len()..];
    let trimmed = after_keyword.trim_start();
    if !trimmed.starts_with('(') {
        return Err(PlanError::malformed("expected '(' after TRANSFORM"));
    }
    let open_offset = start + KEYWORD.len() + (after_keyword.len() - trimmed.len());

    let mut depth = 0usize;
    let mut close_offset = None;
    for (i, c) in query_text[open_offset..].char_indices() {
        match c {
            '(' => depth += 1,
            ')' => {
                depth -= 1;
                if depth == 0 {
                    close_offset = Some(open_offset + i);
                    break;
                }
            }
            _ => {}
        }
    }
    let close_offset = close_offset
        .ok_or_else(|| PlanError::malformed("unbalanced parentheses in TRANSFORM clause"))?;

    let body = &query_text[open_offset + 1..close_offset];
    let transforms = parse_transform_body(body)?;

    let mut remaining = String::with_capacity(query_text.len());
    remaining.push_str(&query_text[..start]);
    remaining.push_str(&query_text[close_offset + 1..]);
    Ok((remaining, transforms))
}

fn parse_transform_body(body: &str) -> Result<Vec<Transform>, PlanError> {
    body.split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(parse_transform_item)
        .collect()
}

/// Parses one transform item of the form `?left?right.side.op...`, e.g.
/// `?book?author.l.scl(2).toInt`.
fn parse_transform_item(item: &str) -> Result<Transform, PlanError> {
    let rest = item
        .strip_prefix('?')
        .ok_or_else(|| PlanError::malformed(format!("invalid transform item '{item}'")))?;
    let second = rest
        .find('?')
        .ok_or_else(|| PlanError::malformed(format!("transform '{item}' needs two variables")))?;
    let left = parse_transform_variable(&rest[..second])?;

    let rest = &rest[second + 1..];
    let dot = rest
        .find('.')
        .ok_or_else(|| PlanError::malformed(format!("transform '{item}' has no operations")))?;
    let right = parse_transform_variable(&rest[..dot])?;

    let mut segments = rest[dot + 1..].split('.');
    let side = match segments.next() {
        Some("l") => TransformSide::Left,
        Some("r") => TransformSide::Right,
        _ => {
            return Err(PlanError::malformed(format!(
                "transform '{item}' must name a side ('l' or 'r')"
            )))
        }
    };

    let ops = segments
        .map(|segment| parse_transform_op(segment, item))
        .collect::<Result<Vec<_>, _>>()?;
    if ops.is_empty() {
        return Err(PlanError::malformed(format!(
            "transform '{item}' has no operations"
        )));
    }

    Ok(Transform {
        left_variable: left,
        right_variable: right,
        side,
        ops,
    })
}

fn parse_transform_variable(name: &str) -> Result<Variable, PlanError> {
    Variable::new(name.trim())
        .map_err(|e| PlanError::malformed(format!("invalid transform variable: {e}")))
}

fn parse_transform_op(segment: &str, item: &str) -> Result<TransformOp, PlanError> {
    let segment = segment.trim();
    if segment == "toInt" {
        return Ok(TransformOp::ToInt);
    }
    if segment == "toStr" {
        return Ok(TransformOp::ToString);
    }
    if let Some(factor) = segment
        .strip_prefix("scl(")
        .and_then(|rest| rest.strip_suffix(')'))
    {
        let factor = factor.trim().trim_start_matches("_*");
        let factor = factor.parse::<i64>().map_err(|_| {
            PlanError::malformed(format!("invalid scale factor in transform '{item}'"))
        })?;
        return Ok(TransformOp::Scale(factor));
    }
    Err(PlanError::malformed(format!(
        "unknown transform operation '{segment}' in '{item}'"
    )))
}
