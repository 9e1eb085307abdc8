//! Resolution context: the arena every pass reads and writes through.
//!
//! Objects live in a `Vec` addressed by [`ObjectId`]. Relationships and
//! superclass links hold ids, never references, so the object graph can be
//! cyclic (an object and its reverse relationship) without shared
//! ownership. The inheritance hierarchy is also kept as a petgraph
//! `DiGraph` (superclass -> subclass) for depth and cycle queries.

use std::collections::HashMap;

use petgraph::algo::tarjan_scc;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::Direction;
use serde::Serialize;

use crate::config::GenerationSettings;
use crate::model::raw::{RawEmbeddedValueType, RawEnumeration, RawInterface, RawSchema};

use super::error::Warning;
use super::object::ObjectType;

/// Handle to an object in a [`ResolutionContext`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct ObjectId(pub usize);

/// Owns every object for the duration of one compilation.
#[derive(Debug)]
pub struct ResolutionContext {
    objects: Vec<ObjectType>,

    /// Index: object name -> id (first declaration wins)
    by_name: HashMap<String, ObjectId>,

    /// superclass -> subclass edges
    hierarchy: DiGraph<ObjectId, ()>,
    nodes: Vec<NodeIndex>,

    embedded_types: HashMap<String, RawEmbeddedValueType>,
    enumerations: HashMap<String, RawEnumeration>,
    interfaces: HashMap<String, RawInterface>,

    /// Problems found while building the arena, reported by NameCheck.
    registration_errors: HashMap<ObjectId, Vec<String>>,

    settings: GenerationSettings,
    warnings: Vec<Warning>,
}

impl ResolutionContext {
    /// Register every object of the schema and link the hierarchy.
    ///
    /// Unknown superclasses and inheritance cycles are recorded and the
    /// offending link dropped, so later passes always see a forest.
    pub fn new(schema: RawSchema, settings: GenerationSettings) -> Self {
        let mut ctx = Self {
            objects: Vec::with_capacity(schema.objects.len()),
            by_name: HashMap::new(),
            hierarchy: DiGraph::new(),
            nodes: Vec::new(),
            embedded_types: HashMap::new(),
            enumerations: HashMap::new(),
            interfaces: HashMap::new(),
            registration_errors: HashMap::new(),
            settings,
            warnings: Vec::new(),
        };

        for raw in schema.objects {
            let id = ObjectId(ctx.objects.len());
            let table = raw
                .table
                .clone()
                .unwrap_or_else(|| ctx.settings.default_table_naming.table_for(&raw.name));
            if ctx.by_name.contains_key(&raw.name) {
                ctx.registration_errors
                    .entry(id)
                    .or_default()
                    .push(format!("duplicate object name {}", raw.name));
            } else {
                ctx.by_name.insert(raw.name.clone(), id);
            }
            let mut object = ObjectType::new(id, raw, table);
            object.initialize_primitives_to_null = object
                .raw
                .initialize_primitives_to_null
                .unwrap_or(ctx.settings.initialize_primitives_to_null);
            object.off_heap_requested = object.raw.off_heap.unwrap_or(ctx.settings.off_heap);
            ctx.objects.push(object);
            ctx.nodes.push(ctx.hierarchy.add_node(id));
        }
        for t in schema.embedded_value_types {
            ctx.embedded_types.insert(t.name.clone(), t);
        }
        for e in schema.enumerations {
            ctx.enumerations.insert(e.name.clone(), e);
        }
        for i in schema.interfaces {
            ctx.interfaces.insert(i.name.clone(), i);
        }

        ctx.link_hierarchy();
        ctx
    }

    fn link_hierarchy(&mut self) {
        for idx in 0..self.objects.len() {
            let id = ObjectId(idx);
            let Some(super_name) = self.objects[idx].raw.superclass.clone() else {
                continue;
            };
            match self.by_name.get(&super_name) {
                Some(&super_id) => {
                    self.hierarchy.add_edge(self.nodes[super_id.0], self.nodes[idx], ());
                    self.objects[idx].superclass = Some(super_id);
                }
                None => self.registration_errors.entry(id).or_default().push(format!(
                    "superclass {} of {} is not defined; it may be missing from the schema manifest",
                    super_name, self.objects[idx].name
                )),
            }
        }

        for scc in tarjan_scc(&self.hierarchy) {
            let is_cycle = scc.len() > 1
                || self.hierarchy.edges_connecting(scc[0], scc[0]).next().is_some();
            if !is_cycle {
                continue;
            }
            let mut names: Vec<String> = scc
                .iter()
                .map(|n| self.objects[self.hierarchy[*n].0].name.clone())
                .collect();
            names.sort();
            for node in &scc {
                let id = self.hierarchy[*node];
                self.registration_errors.entry(id).or_default().push(format!(
                    "circular superclass chain: {}",
                    names.join(" -> ")
                ));
                self.objects[id.0].superclass = None;
            }
        }

        for idx in 0..self.objects.len() {
            let depth = self.superclass_chain(ObjectId(idx)).len();
            self.objects[idx].depth = depth;
        }
    }

    pub fn settings(&self) -> &GenerationSettings {
        &self.settings
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    pub fn ids(&self) -> impl Iterator<Item = ObjectId> {
        (0..self.objects.len()).map(ObjectId)
    }

    pub fn object(&self, id: ObjectId) -> &ObjectType {
        &self.objects[id.0]
    }

    pub fn object_mut(&mut self, id: ObjectId) -> &mut ObjectType {
        &mut self.objects[id.0]
    }

    pub fn objects(&self) -> impl Iterator<Item = &ObjectType> {
        self.objects.iter()
    }

    pub fn lookup(&self, name: &str) -> Option<ObjectId> {
        self.by_name.get(name).copied()
    }

    /// Objects in ascending (hierarchy depth, name) order: every superclass
    /// comes before its subclasses, and ties are stable across runs.
    pub fn processing_order(&self) -> Vec<ObjectId> {
        let mut ids: Vec<ObjectId> = self.ids().collect();
        ids.sort_by(|a, b| {
            let (oa, ob) = (self.object(*a), self.object(*b));
            (oa.depth, &oa.name, a.0).cmp(&(ob.depth, &ob.name, b.0))
        });
        ids
    }

    /// Superclasses from nearest to root.
    pub fn superclass_chain(&self, id: ObjectId) -> Vec<ObjectId> {
        let mut chain = Vec::new();
        let mut current = self.object(id).superclass;
        while let Some(next) = current {
            if next == id || chain.contains(&next) {
                break;
            }
            chain.push(next);
            current = self.object(next).superclass;
        }
        chain
    }

    /// Direct subclasses.
    pub fn subclasses(&self, id: ObjectId) -> Vec<ObjectId> {
        let mut subs: Vec<ObjectId> = self
            .hierarchy
            .neighbors_directed(self.nodes[id.0], Direction::Outgoing)
            .map(|n| self.hierarchy[n])
            .filter(|sub| self.object(*sub).superclass == Some(id))
            .collect();
        subs.sort();
        subs
    }

    pub fn embedded_type(&self, name: &str) -> Option<&RawEmbeddedValueType> {
        self.embedded_types.get(name)
    }

    pub fn enumeration(&self, name: &str) -> Option<&RawEnumeration> {
        self.enumerations.get(name)
    }

    pub fn interface(&self, name: &str) -> Option<&RawInterface> {
        self.interfaces.get(name)
    }

    /// Objects declaring `interface` directly.
    pub fn implementors(&self, interface: &str) -> Vec<ObjectId> {
        self.objects
            .iter()
            .filter(|o| o.interfaces.iter().any(|i| i == interface))
            .map(|o| o.id)
            .collect()
    }

    pub(crate) fn registration_errors(&self, id: ObjectId) -> &[String] {
        self.registration_errors
            .get(&id)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn warn(&mut self, object: &str, message: impl Into<String>) {
        let message = message.into();
        tracing::warn!(object = %object, "{}", message);
        self.warnings.push(Warning {
            object: object.to_string(),
            message,
        });
    }

    pub fn warnings(&self) -> &[Warning] {
        &self.warnings
    }

    pub fn take_warnings(&mut self) -> Vec<Warning> {
        std::mem::take(&mut self.warnings)
    }
}
