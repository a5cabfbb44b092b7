// src/core/args_group.rs

//! # ArgsGroup
//!
//! A node of the configuration tree. Attributes keep their declaration order, which is the
//! order in which the parser resolves them. Before resolution an attribute is usually an
//! [`Arg`]; afterwards it is a plain [`ConfigValue`]. Fixed values and nested groups are
//! never touched by the parser.

use crate::constants::PATH_SEPARATOR;
use crate::core::arg::{Arg, is_valid_name};
use crate::core::error::{ConfigError, ConfigResult};
use crate::core::value::ConfigValue;
use indexmap::IndexMap;
use serde::Serialize;
use std::collections::VecDeque;

/// `parent.field`
pub(crate) fn join_path(parent: &str, field: &str) -> String {
    format!("{}{}{}", parent, PATH_SEPARATOR, field)
}

// --- DATA STRUCTS ---

/// What a field of a group holds.
#[derive(Debug, Clone)]
pub enum Attribute {
    /// Not resolved yet.
    Arg(Arg),
    /// What an `Arg` became once resolved.
    Value(ConfigValue),
    /// A non-`Arg` setting declared with the group.
    Fixed(ConfigValue),
    /// A nested group.
    Group(ArgsGroup),
}

/// Order of [`ArgsGroup::all_groups`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Traversal {
    /// Pre-order: a group, then its whole subtree, then its next sibling.
    #[default]
    DepthFirst,
    /// Level by level.
    BreadthFirst,
}

/// Export shape: scalars and nested mappings, in declaration order.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum NestedValue {
    /// A leaf.
    Value(ConfigValue),
    /// A group, by field name.
    Group(IndexMap<String, NestedValue>),
}

/// A named node of the configuration tree.
#[derive(Debug, Clone)]
pub struct ArgsGroup {
    name: String,
    description: Option<String>,
    field_name: Option<String>,
    attributes: IndexMap<String, Attribute>,
    consumed: bool,
}

/// Collects the attributes of an [`ArgsGroup`]; everything is checked in [`Self::build`].
#[derive(Debug)]
pub struct ArgsGroupBuilder {
    name: String,
    description: Option<String>,
    field_name: Option<String>,
    attributes: Vec<(String, Attribute)>,
}

// --- IMPLEMENTATIONS ---

impl Attribute {
    /// Resolved and fixed values both count as configs.
    pub fn as_value(&self) -> Option<&ConfigValue> {
        match self {
            Self::Value(value) | Self::Fixed(value) => Some(value),
            _ => None,
        }
    }

    /// The `Arg`, while unresolved.
    pub fn as_arg(&self) -> Option<&Arg> {
        match self {
            Self::Arg(arg) => Some(arg),
            _ => None,
        }
    }

    /// The nested group, if this is one.
    pub fn as_group(&self) -> Option<&ArgsGroup> {
        match self {
            Self::Group(group) => Some(group),
            _ => None,
        }
    }
}

impl ArgsGroupBuilder {
    /// Shown next to the group in help and tree output.
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Name under which the group is attached when it is spawned. Required for spawnable groups.
    pub fn field_name(mut self, field_name: impl Into<String>) -> Self {
        self.field_name = Some(field_name.into());
        self
    }

    /// Adds an `Arg` stored under its own name.
    pub fn arg(self, arg: Arg) -> Self {
        let field = arg.name().to_string();
        self.arg_as(field, arg)
    }

    /// Adds an `Arg` under a field name different from its flag.
    pub fn arg_as(mut self, field: impl Into<String>, arg: Arg) -> Self {
        self.attributes.push((field.into(), Attribute::Arg(arg)));
        self
    }

    /// Adds a value the parser never touches.
    pub fn fixed(mut self, field: impl Into<String>, value: impl Into<ConfigValue>) -> Self {
        self.attributes
            .push((field.into(), Attribute::Fixed(value.into())));
        self
    }

    /// Nests a built group under `field`.
    pub fn child(mut self, field: impl Into<String>, group: ArgsGroup) -> Self {
        self.attributes.push((field.into(), Attribute::Group(group)));
        self
    }

    /// Validates names and every `Arg` declaration, coercing literals to their declared types.
    pub fn build(self) -> ConfigResult<ArgsGroup> {
        let Self {
            name,
            description,
            field_name,
            attributes: declared,
        } = self;

        if name.trim().is_empty() {
            return Err(ConfigError::MissingRequiredSpecification {
                path: "<unnamed>".to_string(),
                missing: "name",
            });
        }
        if let Some(field) = &field_name
            && !is_valid_name(field)
        {
            return Err(ConfigError::InvalidDeclaration {
                path: name,
                reason: format!("'{}' is not a valid field name", field),
            });
        }

        let mut attributes = IndexMap::with_capacity(declared.len());
        for (field, mut attribute) in declared {
            if field.trim().is_empty() {
                return Err(ConfigError::MissingRequiredSpecification {
                    path: name,
                    missing: "name",
                });
            }
            let path = join_path(&name, &field);
            if !is_valid_name(&field) {
                return Err(ConfigError::InvalidDeclaration {
                    path,
                    reason: format!("'{}' is not a valid field name", field),
                });
            }
            if attributes.contains_key(&field) {
                return Err(ConfigError::NameCollision { path: name, field });
            }
            if let Attribute::Arg(arg) = &mut attribute {
                arg.validate_declaration(&path)?;
            }
            attributes.insert(field, attribute);
        }

        log::trace!("Built ArgsGroup '{}' with {} attributes", name, attributes.len());
        Ok(ArgsGroup {
            name,
            description,
            field_name,
            attributes,
            consumed: false,
        })
    }
}

impl ArgsGroup {
    /// Starts a group named `name`.
    pub fn builder(name: impl Into<String>) -> ArgsGroupBuilder {
        ArgsGroupBuilder {
            name: name.into(),
            description: None,
            field_name: None,
            attributes: Vec::new(),
        }
    }

    /// The group's name, e.g. `TrainerConfig`.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The description, if any.
    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    /// Field under which a spawned group is attached.
    pub fn field_name(&self) -> Option<&str> {
        self.field_name.as_deref()
    }

    /// `true` once the parser has resolved every `Arg` of this group.
    pub fn is_consumed(&self) -> bool {
        self.consumed
    }

    /// Every attribute, in order.
    pub fn attributes(&self) -> impl Iterator<Item = (&str, &Attribute)> + Clone {
        self.attributes.iter().map(|(field, attr)| (field.as_str(), attr))
    }

    /// Unresolved `Arg`s, in declaration order. Each call starts over.
    pub fn own_args(&self) -> impl Iterator<Item = (&str, &Arg)> + Clone {
        self.attributes()
            .filter_map(|(field, attr)| attr.as_arg().map(|arg| (field, arg)))
    }

    /// Direct child groups, in declaration (or attachment) order.
    pub fn own_children(&self) -> impl Iterator<Item = (&str, &ArgsGroup)> + Clone {
        self.attributes()
            .filter_map(|(field, attr)| attr.as_group().map(|group| (field, group)))
    }

    /// Resolved and fixed values of this group only.
    pub fn own_values(&self) -> impl Iterator<Item = (&str, &ConfigValue)> + Clone {
        self.attributes()
            .filter_map(|(field, attr)| attr.as_value().map(|value| (field, value)))
    }

    /// The attribute stored under `field` in this group.
    pub fn get(&self, field: &str) -> Option<&Attribute> {
        self.attributes.get(field)
    }

    /// A resolved or fixed value of this group.
    pub fn value(&self, field: &str) -> Option<&ConfigValue> {
        self.get(field).and_then(Attribute::as_value)
    }

    /// A direct child group.
    pub fn child(&self, field: &str) -> Option<&ArgsGroup> {
        self.get(field).and_then(Attribute::as_group)
    }

    /// Walks a dotted path of field names, e.g. `trainer_config.optimizer_config.lr`.
    pub fn lookup(&self, dotted: &str) -> Option<&Attribute> {
        let Some((parents, last)) = dotted.rsplit_once(PATH_SEPARATOR) else {
            return self.get(dotted);
        };
        let mut group = self;
        for segment in parents.split(PATH_SEPARATOR) {
            group = group.child(segment)?;
        }
        group.get(last)
    }

    /// Grafts `group` under `field`, after every existing attribute.
    pub fn attach_child(&mut self, field: impl Into<String>, group: ArgsGroup) -> ConfigResult<()> {
        let field = field.into();
        if self.attributes.contains_key(&field) {
            return Err(ConfigError::NameCollision {
                path: self.name.clone(),
                field,
            });
        }
        log::debug!("Attaching '{}' ({}) under '{}'", field, group.name, self.name);
        self.attributes.insert(field, Attribute::Group(group));
        Ok(())
    }

    // MARK: Tree queries

    /// Unresolved `Arg`s of this group.
    pub fn num_args(&self) -> usize {
        self.own_args().count()
    }

    /// Resolved plus fixed values.
    pub fn num_configs(&self) -> usize {
        self.own_values().count()
    }

    /// Direct child groups.
    pub fn num_groups(&self) -> usize {
        self.own_children().count()
    }

    /// Every descendant group (not `self`), in the requested order.
    pub fn all_groups(&self, order: Traversal) -> Vec<&ArgsGroup> {
        match order {
            Traversal::DepthFirst => {
                let mut result = Vec::new();
                self.collect_depth_first(&mut result);
                result
            }
            Traversal::BreadthFirst => {
                let mut result = Vec::new();
                let mut queue: VecDeque<&ArgsGroup> =
                    self.own_children().map(|(_, group)| group).collect();
                while let Some(group) = queue.pop_front() {
                    result.push(group);
                    queue.extend(group.own_children().map(|(_, child)| child));
                }
                result
            }
        }
    }

    fn collect_depth_first<'a>(&'a self, result: &mut Vec<&'a ArgsGroup>) {
        for (_, child) in self.own_children() {
            result.push(child);
            child.collect_depth_first(result);
        }
    }

    /// Unresolved `Arg`s in the whole subtree.
    pub fn total_args(&self) -> usize {
        self.num_args()
            + self
                .all_groups(Traversal::DepthFirst)
                .iter()
                .map(|group| group.num_args())
                .sum::<usize>()
    }

    // MARK: Export

    /// Values and nested groups over the current state. Unresolved `Arg`s are left out.
    pub fn to_nested_mapping(&self) -> IndexMap<String, NestedValue> {
        self.attributes
            .iter()
            .filter_map(|(field, attr)| match attr {
                Attribute::Value(value) | Attribute::Fixed(value) => {
                    Some((field.clone(), NestedValue::Value(value.clone())))
                }
                Attribute::Group(group) => {
                    Some((field.clone(), NestedValue::Group(group.to_nested_mapping())))
                }
                Attribute::Arg(_) => None,
            })
            .collect()
    }

    /// Every value of the tree in one level, for experiment loggers. Groups are visited
    /// depth-first after the root; a field repeated deeper in the tree overwrites the earlier one.
    pub fn to_flat_mapping(&self) -> IndexMap<String, ConfigValue> {
        let mut flat = IndexMap::new();
        let groups = std::iter::once(self).chain(self.all_groups(Traversal::DepthFirst));
        for group in groups {
            for (field, value) in group.own_values() {
                flat.insert(field.to_string(), value.clone());
            }
        }
        flat
    }

    /// [`Self::to_nested_mapping`] as indented JSON.
    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(&self.to_nested_mapping())
    }

    // MARK: Parser access

    pub(crate) fn len(&self) -> usize {
        self.attributes.len()
    }

    pub(crate) fn attribute_at(&self, index: usize) -> Option<(&str, &Attribute)> {
        self.attributes
            .get_index(index)
            .map(|(field, attr)| (field.as_str(), attr))
    }

    pub(crate) fn attribute_at_mut(&mut self, index: usize) -> Option<(&str, &mut Attribute)> {
        self.attributes
            .get_index_mut(index)
            .map(|(field, attr)| (field.as_str(), attr))
    }

    pub(crate) fn args_mut(&mut self) -> impl Iterator<Item = &mut Arg> {
        self.attributes.values_mut().filter_map(|attr| match attr {
            Attribute::Arg(arg) => Some(arg),
            _ => None,
        })
    }

    pub(crate) fn children_mut(&mut self) -> impl Iterator<Item = &mut ArgsGroup> {
        self.attributes.values_mut().filter_map(|attr| match attr {
            Attribute::Group(group) => Some(group),
            _ => None,
        })
    }

    /// Replaces the `Arg` at `index` by its resolved value. Returns `false` if there is no `Arg` there.
    pub(crate) fn commit(&mut self, index: usize, value: ConfigValue) -> bool {
        match self.attributes.get_index_mut(index) {
            Some((_, slot @ Attribute::Arg(_))) => {
                *slot = Attribute::Value(value);
                true
            }
            _ => false,
        }
    }

    pub(crate) fn mark_consumed(&mut self) {
        self.consumed = true;
    }
}

// MARK: --- UNIT TESTS ---
