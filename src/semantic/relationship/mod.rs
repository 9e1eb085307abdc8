//! Relationship query compiler.
//!
//! The RelationshipCheck pass compiles each declared relationship of an
//! object in turn:
//!
//! 1. **Parse** the query text into an [`Expr`]
//! 2. **Bind** every attribute reference to `this`, the related object or a
//!    third object ([`bind`])
//! 3. **Check** parameters and order-by ([`params`])
//! 4. **Classify** the join into equality pairs and filters ([`classify`])
//! 5. **Reverse** the query when a reverse name is declared
//!
//! Once every object has been compiled, [`finish_relationships`] works on
//! the whole model: reverse relationships are installed on their related
//! objects, dependency is downgraded where it cannot hold, implied indices
//! are added, each join is resolved to an index, and attribute owners are
//! chosen ([`ownership`]).

pub mod bind;
pub mod classify;
pub mod ownership;
pub mod params;

use std::collections::BTreeSet;

use serde::Serialize;

use crate::dsl::{self, reverse::reverse_text, Expr, Severity, Spanned};
use crate::model::raw::RawRelationship;
use crate::model::types::{Cardinality, SemanticType};

use super::context::{ObjectId, ResolutionContext};
use super::error::{ErrorReport, ObjectErrors};
use super::index::add_implied_index;
use super::object::ObjectType;

use bind::Binder;
use classify::classify;
use params::{check_parameters, resolve_order_by};

// ============================================================================
// Types
// ============================================================================

/// How a to-one navigation finds its target.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum IndexResolution {
    PrimaryKey,
    UniqueIndex(String),
    Scan,
}

/// `this.<this_attribute> = Related.<related_attribute>`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EqualityPair {
    pub this_attribute: String,
    pub related_attribute: String,
}

/// Shape of a bound join.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JoinAnalysis {
    /// No object other than `this` and the related object is referenced.
    pub depends_only_on_from_to: bool,
    pub third_objects: Vec<String>,
    pub equality_pairs: Vec<EqualityPair>,
    /// Only equality pairs (and edge points) appear in the top-level conjunction.
    pub pure_equality: bool,
    pub has_filters: bool,
    pub has_parameters: bool,
    /// Results can be cached by the join attribute values alone.
    pub cacheable: bool,
    pub index_resolution: IndexResolution,
}

/// A declared relationship parameter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Parameter {
    pub ty: SemanticType,
    pub name: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SortDirection {
    Asc,
    Desc,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OrderBy {
    pub attribute: String,
    pub direction: SortDirection,
}

/// A compiled relationship.
#[derive(Debug, Clone, Serialize)]
pub struct Relationship {
    pub name: String,
    pub from: ObjectId,
    pub from_name: String,
    pub related: ObjectId,
    pub related_name: String,
    pub cardinality: Cardinality,
    pub query: String,
    pub ast: Spanned<Expr>,
    pub reverse_name: Option<String>,
    /// Query text as seen from the related object.
    pub reverse_query: Option<String>,
    pub reverse_ast: Option<Spanned<Expr>>,
    pub related_is_dependent: bool,
    pub order_by: Vec<OrderBy>,
    pub parameters: Vec<Parameter>,
    pub foreign_key: bool,
    pub direct_reference: bool,
    pub has_setter: bool,
    pub analysis: JoinAnalysis,
    /// Installed on the related side of another object's relationship.
    pub is_reverse: bool,
    pub inherited: bool,
}

impl Relationship {
    /// Attributes of `this` that take part in equality pairs.
    pub fn this_attributes(&self) -> Vec<String> {
        self.analysis
            .equality_pairs
            .iter()
            .map(|p| p.this_attribute.clone())
            .collect()
    }

    /// Attributes of the related object that take part in equality pairs.
    pub fn related_attributes(&self) -> Vec<String> {
        self.analysis
            .equality_pairs
            .iter()
            .map(|p| p.related_attribute.clone())
            .collect()
    }
}

// ============================================================================
// Per-object pass
// ============================================================================

/// RelationshipCheck pass for one object.
///
/// Successfully compiled relationships replace the object's relationship
/// list; the rest are reported under their own name.
pub fn check_relationships(ctx: &mut ResolutionContext, id: ObjectId) -> ObjectErrors {
    let object = ctx.object(id);
    let mut errors = ObjectErrors::new(object.name.clone());
    let mut compiled = Vec::new();
    let mut warnings = Vec::new();

    for source in &object.relationship_sources {
        let raw = &source.raw;
        match compile(ctx, object, raw, &mut warnings) {
            Ok(mut rel) => {
                rel.inherited = source.inherited;
                compiled.push(rel);
            }
            Err(messages) => {
                for message in messages {
                    errors.add_relationship(&raw.name, message);
                }
            }
        }
    }

    let name = object.name.clone();
    for warning in warnings {
        ctx.warn(&name, warning);
    }
    ctx.object_mut(id).relationships = compiled;
    errors
}

fn compile(
    ctx: &ResolutionContext,
    this: &ObjectType,
    raw: &RawRelationship,
    warnings: &mut Vec<String>,
) -> Result<Relationship, Vec<String>> {
    let mut errors = Vec::new();

    let Some(related_id) = ctx.lookup(&raw.related) else {
        return Err(vec![format!(
            "related object {} of relationship {} is not defined; it may be missing from the schema manifest",
            raw.related, raw.name
        )]);
    };
    let related = ctx.object(related_id);

    let cardinality = raw.cardinality;
    if cardinality.is_none() {
        errors.push(format!("relationship {} has no cardinality", raw.name));
    }

    let parsed = dsl::parse(&raw.query);
    for diag in &parsed.diagnostics {
        match diag.severity {
            Severity::Error => errors.push(format!("cannot parse query '{}': {}", raw.query, diag.message)),
            Severity::Warning => warnings.push(format!("relationship {}: {}", raw.name, diag.message)),
        }
    }
    let (Some(cardinality), Some(ast)) = (cardinality, parsed.query) else {
        return Err(errors);
    };
    if !errors.is_empty() {
        return Err(errors);
    }

    errors.extend(Binder::new(ctx, this, related).bind(&ast.value));
    if !errors.is_empty() {
        return Err(errors);
    }

    let params = check_parameters(raw.parameters.as_deref(), &ast.value.params());
    errors.extend(params.errors);
    warnings.extend(
        params
            .warnings
            .into_iter()
            .map(|w| format!("relationship {}: {}", raw.name, w)),
    );
    let order_by = match resolve_order_by(raw.order_by.as_deref(), related) {
        Ok(order) => order,
        Err(e) => {
            errors.extend(e);
            Vec::new()
        }
    };

    let analysis = classify(&ast.value, &related.name);

    let mut reverse_query = None;
    let mut reverse_ast = None;
    if raw.reverse_name.is_some() {
        let text = reverse_text(&ast.value, &this.name, &related.name);
        let reparsed = dsl::parse(&text);
        match reparsed.query {
            Some(expr) if !reparsed.has_errors() => {
                errors.extend(Binder::new(ctx, related, this).bind(&expr.value));
                reverse_query = Some(text);
                reverse_ast = Some(expr);
            }
            _ => {
                tracing::error!(
                    relationship = %raw.name,
                    reverse = %text,
                    "synthesized reverse query does not parse"
                );
                errors.push(format!("cannot build the reverse of relationship {}: '{}'", raw.name, text));
            }
        }
    }

    let direct_reference = match raw.direct_reference {
        Some(true) if !analysis.depends_only_on_from_to => {
            warnings.push(format!(
                "relationship {} joins through {} and cannot be a direct reference",
                raw.name,
                analysis.third_objects.join(", ")
            ));
            false
        }
        Some(value) => value,
        None => false,
    };

    if !errors.is_empty() {
        return Err(errors);
    }

    Ok(Relationship {
        name: raw.name.clone(),
        from: this.id,
        from_name: this.name.clone(),
        related: related_id,
        related_name: related.name.clone(),
        cardinality,
        query: raw.query.clone(),
        ast,
        reverse_name: raw.reverse_name.clone(),
        reverse_query,
        reverse_ast,
        related_is_dependent: raw.related_is_dependent,
        order_by,
        parameters: params.parameters,
        foreign_key: raw.foreign_key.unwrap_or(true),
        direct_reference,
        has_setter: raw
            .has_setter
            .unwrap_or(raw.related_is_dependent || cardinality.is_to_one()),
        analysis,
        is_reverse: false,
        inherited: false,
    })
}

// ============================================================================
// Whole-model finish
// ============================================================================

/// Cross-object relationship work, run once every object has been compiled.
pub fn finish_relationships(ctx: &mut ResolutionContext, report: &mut ErrorReport) {
    install_reverses(ctx, report);
    downgrade_dependencies(ctx);
    add_implied_indices(ctx);
    resolve_indices(ctx);
    ownership::assign_owners(ctx);
}

fn install_reverses(ctx: &mut ResolutionContext, report: &mut ErrorReport) {
    let mut forwards: Vec<Relationship> = Vec::new();
    for id in ctx.processing_order() {
        forwards.extend(
            ctx.object(id)
                .relationships
                .iter()
                .filter(|r| !r.inherited && !r.is_reverse && r.reverse_name.is_some())
                .cloned(),
        );
    }

    for forward in forwards {
        let (Some(name), Some(query), Some(ast)) = (
            forward.reverse_name.clone(),
            forward.reverse_query.clone(),
            forward.reverse_ast.clone(),
        ) else {
            continue;
        };
        let target = ctx.object(forward.related);
        if target.relationship(&name).is_some() || target.field(&name).is_some() {
            report.add_relationship(
                &forward.from_name,
                &forward.name,
                format!(
                    "reverse relationship name {} clashes with an existing relationship or attribute in {}",
                    name, target.name
                ),
            );
            continue;
        }

        let cardinality = forward.cardinality.reverse();
        let analysis = classify(&ast.value, &forward.from_name);
        let reverse = Relationship {
            name,
            from: forward.related,
            from_name: forward.related_name.clone(),
            related: forward.from,
            related_name: forward.from_name.clone(),
            cardinality,
            query,
            ast,
            reverse_name: Some(forward.name.clone()),
            reverse_query: Some(forward.query.clone()),
            reverse_ast: Some(forward.ast.clone()),
            related_is_dependent: false,
            order_by: Vec::new(),
            parameters: forward.parameters.clone(),
            foreign_key: forward.foreign_key,
            direct_reference: false,
            has_setter: cardinality.is_to_one(),
            analysis,
            is_reverse: true,
            inherited: false,
        };
        tracing::debug!(
            object = %reverse.from_name,
            relationship = %reverse.name,
            query = %reverse.query,
            "installed reverse relationship"
        );
        ctx.object_mut(forward.related).relationships.push(reverse);
    }
}

/// Why a relationship declared dependent cannot be one, if it cannot.
fn dependency_problem(this: &ObjectType, rel: &Relationship) -> Option<String> {
    if rel.cardinality == Cardinality::ManyToMany {
        return Some("a many-to-many relationship cannot be dependent".to_string());
    }
    if !rel.analysis.depends_only_on_from_to {
        return Some(format!("it joins through {}", rel.analysis.third_objects.join(", ")));
    }
    let joined: BTreeSet<String> = rel.this_attributes().into_iter().collect();
    let pk = this.plain_key(&this.primary_key_names());
    if pk.is_empty() || !pk.iter().all(|a| joined.contains(a)) {
        return Some(format!("its query does not join on the primary key of {}", this.name));
    }
    None
}

fn downgrade_dependencies(ctx: &mut ResolutionContext) {
    let mut downgrades = Vec::new();
    for object in ctx.objects() {
        for (idx, rel) in object.relationships.iter().enumerate() {
            if !rel.related_is_dependent {
                continue;
            }
            if let Some(problem) = dependency_problem(object, rel) {
                downgrades.push((object.id, idx, rel.name.clone(), problem));
            }
        }
    }
    for (id, idx, name, problem) in downgrades {
        let object_name = ctx.object(id).name.clone();
        ctx.warn(
            &object_name,
            format!("relationship {} is not treated as dependent: {}", name, problem),
        );
        ctx.object_mut(id).relationships[idx].related_is_dependent = false;
    }
}

fn add_implied_indices(ctx: &mut ResolutionContext) {
    let mut implied = Vec::new();
    for id in ctx.processing_order() {
        for rel in &ctx.object(id).relationships {
            if rel.analysis.pure_equality && rel.analysis.depends_only_on_from_to {
                implied.push((rel.related, rel.name.clone(), rel.related_attributes()));
            }
        }
    }
    for (target, relationship, attributes) in implied {
        if let Some(index) = add_implied_index(ctx.object_mut(target), &relationship, &attributes) {
            tracing::debug!(
                object = %ctx.object(target).name,
                index = %index,
                relationship = %relationship,
                "added relationship index"
            );
        }
    }
}

/// Index a navigation of `rel` can use on `related`.
pub fn resolve_index(related: &ObjectType, rel: &Relationship) -> IndexResolution {
    let set: BTreeSet<String> = related
        .plain_key(&rel.related_attributes())
        .into_iter()
        .collect();
    if set.is_empty() {
        return IndexResolution::Scan;
    }
    let plain = |attrs: &[String]| -> BTreeSet<String> { related.plain_key(attrs).into_iter().collect() };
    if related.primary_key_index().is_some_and(|pk| plain(&pk.attributes) == set) {
        return IndexResolution::PrimaryKey;
    }
    related
        .indices
        .iter()
        .filter(|i| i.unique && !i.primary_key)
        .find(|i| plain(&i.attributes) == set)
        .map(|i| IndexResolution::UniqueIndex(i.name.clone()))
        .unwrap_or(IndexResolution::Scan)
}

fn resolve_indices(ctx: &mut ResolutionContext) {
    let mut resolved = Vec::new();
    for object in ctx.objects() {
        for (idx, rel) in object.relationships.iter().enumerate() {
            let resolution = resolve_index(ctx.object(rel.related), rel);
            if rel.cardinality.is_to_one() && resolution == IndexResolution::Scan {
                resolved.push((
                    object.id,
                    idx,
                    resolution,
                    Some(format!(
                        "Relationship {} in object {} is declared as -to-one, but does not match a unique index in {}",
                        rel.name, object.name, rel.related_name
                    )),
                ));
            } else {
                resolved.push((object.id, idx, resolution, None));
            }
        }
    }
    for (id, idx, resolution, warning) in resolved {
        if let Some(warning) = warning {
            let name = ctx.object(id).name.clone();
            ctx.warn(&name, warning);
        }
        ctx.object_mut(id).relationships[idx].analysis.index_resolution = resolution;
    }
}
