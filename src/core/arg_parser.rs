// src/core/arg_parser.rs

//! # ArgParser
//!
//! The resolution engine. It is the only component that knows about traversal order:
//!
//! 1. **Pivot pass** (optional): shared tables `pivot value -> {arg -> value}` annotate every
//!    matching `Arg` that has no dynamic defaults of its own. Tables stay registered and also
//!    annotate subtrees spawned later in the pass.
//! 2. **Static validation**: every `Arg` gets a sequence number in traversal order, including
//!    the `Arg`s of every subtree that could be spawned (placed right after the spawning `Arg`).
//!    Dependency cycles, forward references, dangling references and duplicate flags are
//!    rejected before a single value is read.
//! 3. **Resolution**: attributes are visited in declaration order, a child group is finished
//!    before its next sibling, each `Arg` is replaced by its value (user > dynamic > standard)
//!    and spawned subtrees are grafted and resolved immediately.
//! 4. **Leftovers**: any argument no `Arg` claimed aborts the pass.

use crate::constants::MAX_SPAWN_DEPTH;
use crate::core::arg::{Arg, GroupFactory, ValueSource};
use crate::core::args_group::{ArgsGroup, Attribute, Traversal, join_path};
use crate::core::cli_input::CliInput;
use crate::core::dynamic_defaults::{DefaultsTable, DynamicDefaults, KeyedDefaults};
use crate::core::error::{ConfigError, ConfigResult, DependencyIssue};
use crate::core::value::ConfigValue;
use indexmap::IndexMap;
use std::collections::HashSet;

// --- DATA STRUCTS ---

/// One entry of the resolution ledger.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedArg {
    /// Dotted path of the `Arg` at the time it was resolved.
    pub path: String,
    /// The value after coercion.
    pub value: ConfigValue,
    /// Where the value came from.
    pub source: ValueSource,
}

/// Drives one resolution pass over a tree it borrows exclusively.
#[derive(Debug)]
pub struct ArgParser<'a> {
    root: &'a mut ArgsGroup,
    state: PassState,
}

/// Everything the pass owns besides the tree.
#[derive(Debug, Default)]
struct PassState {
    input: CliInput,
    /// Resolved values keyed by `Arg` name, in resolution order.
    resolved: IndexMap<String, ResolvedArg>,
    /// Pivot tables in registration order.
    tables: Vec<KeyedDefaults>,
}

#[derive(Debug)]
struct Declared {
    seq: usize,
    path: String,
    depends_on: Option<String>,
    speculative: bool,
}

/// Assigns sequence numbers during static validation.
#[derive(Debug)]
struct Sequencer<'t> {
    tables: &'t [KeyedDefaults],
    next_seq: usize,
    declared: IndexMap<String, Declared>,
}

// --- IMPLEMENTATIONS ---

impl<'a> ArgParser<'a> {
    /// Parser over an explicit list of tokens, without the program name.
    pub fn new<I, S>(root: &'a mut ArgsGroup, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::with_input(root, CliInput::new(args))
    }

    /// Reads the process arguments, skipping the program name.
    pub fn from_env(root: &'a mut ArgsGroup) -> Self {
        Self::new(root, std::env::args().skip(1))
    }

    /// Splits `line` with shell quoting rules.
    pub fn from_command_line(root: &'a mut ArgsGroup, line: &str) -> ConfigResult<Self> {
        Ok(Self::with_input(root, CliInput::from_command_line(line)?))
    }

    /// Parser over tokens already wrapped in a [`CliInput`].
    pub fn with_input(root: &'a mut ArgsGroup, input: CliInput) -> Self {
        Self {
            root,
            state: PassState {
                input,
                ..PassState::default()
            },
        }
    }

    /// The tree being resolved.
    pub fn root(&self) -> &ArgsGroup {
        &*self.root
    }

    /// The values resolved so far, keyed by `Arg` name, in resolution order.
    pub fn resolved_values(&self) -> &IndexMap<String, ResolvedArg> {
        &self.state.resolved
    }

    // MARK: Pivot pass

    /// Registers `tables` keyed on `pivot` and annotates every matching `Arg` of the tree.
    /// Returns how many `Arg`s received dynamic defaults. Tables with flat rows are rejected.
    pub fn apply_dynamic_defaults<I>(&mut self, pivot: &str, tables: I) -> ConfigResult<usize>
    where
        I: IntoIterator<Item = DefaultsTable>,
    {
        if !contains_arg(&*self.root, pivot) {
            return Err(ConfigError::UnknownPivotField(pivot.to_string()));
        }
        let tables: Vec<DefaultsTable> = tables.into_iter().collect();
        // Flat rows name no `Arg`; they only make sense attached to a single one.
        if tables.iter().any(DefaultsTable::has_flat_rows) {
            return Err(ConfigError::TableFormat {
                origin: format!("table keyed on '{}'", pivot),
                message: "flat rows cannot be shared by the pivot pass; attach the table to its Arg \
                          with `dynamic_defaults_from`"
                    .to_string(),
            });
        }
        for table in tables {
            log::debug!("Registering table keyed on '{}' for {:?}", pivot, table.arg_names());
            self.state.tables.push(KeyedDefaults::with_table(pivot, table));
        }
        let annotated = annotate_group(&mut *self.root, &self.state.tables);
        log::debug!(
            "Pivot pass on '{}' annotated {} Args ({} tables registered)",
            pivot,
            annotated,
            self.state.tables.len()
        );
        Ok(annotated)
    }

    /// Same as [`Self::apply_dynamic_defaults`] for a table that carries its own pivot.
    pub fn apply_keyed_defaults(&mut self, table: &KeyedDefaults) -> ConfigResult<usize> {
        self.apply_dynamic_defaults(table.field(), [table.table().clone()])
    }

    // MARK: Static validation

    /// Checks ordering, cycles and flag uniqueness without reading any argument.
    pub fn validate(&self) -> ConfigResult<()> {
        let mut sequencer = Sequencer {
            tables: &self.state.tables,
            next_seq: 0,
            declared: IndexMap::new(),
        };
        sequencer.visit_group(&*self.root, self.root.name(), false, 0)?;
        sequencer.check_dependencies(&self.state.resolved)?;
        log::debug!(
            "Static validation passed: {} Args sequenced",
            sequencer.declared.len()
        );
        Ok(())
    }

    // MARK: Resolution

    /// Validates, then resolves the whole tree in place.
    pub fn parse_args_recursively(&mut self) -> ConfigResult<()> {
        self.validate()?;

        let Self { root, state } = self;
        let path = root.name().to_string();
        log::debug!("Resolving configuration tree from '{}'", path);
        state.resolve_group(&mut **root, &path)?;

        if !state.input.all_consumed() {
            return Err(ConfigError::UnexpectedArguments(state.input.unconsumed().join(" ")));
        }
        log::debug!("Resolved {} Args", state.resolved.len());
        Ok(())
    }

    // MARK: Help surface

    /// The flag registrations of every unresolved `Arg`, one help heading per group.
    pub fn command(&self) -> clap::Command {
        let mut command = clap::Command::new(self.root.name().to_string())
            .about(
                self.root
                    .description()
                    .map_or_else(|| t!("parser.about").to_string(), str::to_string),
            )
            .disable_help_flag(true)
            .disable_version_flag(true);

        let mut seen = HashSet::new();
        let groups = std::iter::once(&*self.root).chain(self.root.all_groups(Traversal::DepthFirst));
        for group in groups {
            for (_, arg) in group.own_args() {
                // Duplicates are reported by `validate`; clap would panic on them.
                if seen.insert(arg.name().to_string()) {
                    command = command.arg(arg.declare().help_heading(group.name().to_string()));
                }
            }
        }
        command
    }

    /// Rendered help of [`Self::command`].
    pub fn help(&self) -> String {
        self.command().render_help().to_string()
    }
}

impl PassState {
    fn resolve_group(&mut self, group: &mut ArgsGroup, path: &str) -> ConfigResult<()> {
        log::trace!("Entering group '{}' at '{}'", group.name(), path);
        let mut index = 0;
        while index < group.len() {
            let Some((field, attribute)) = group.attribute_at(index) else {
                break;
            };
            let field_path = join_path(path, field);

            match attribute {
                Attribute::Arg(arg) => {
                    let arg = arg.clone();
                    let value = self.resolve_arg(&arg, &field_path)?;
                    group.commit(index, value.clone());
                    if let Some(factory) = arg.spawn_for(&value) {
                        self.spawn(group, path, &arg, factory)?;
                    }
                }
                Attribute::Group(child) if !child.is_consumed() => {
                    if let Some((_, Attribute::Group(child))) = group.attribute_at_mut(index) {
                        self.resolve_group(child, &field_path)?;
                    }
                }
                _ => {}
            }
            index += 1;
        }
        group.mark_consumed();
        Ok(())
    }

    fn resolve_arg(&mut self, arg: &Arg, path: &str) -> ConfigResult<ConfigValue> {
        let user = match arg.get_action().flag_value() {
            Some(flag_value) => self
                .input
                .consume_flag(arg.name())
                .then_some(ConfigValue::Bool(flag_value)),
            None => match self.input.consume_value(arg.name())? {
                Some(raw) => Some(
                    arg.parse_user(&raw)
                        .map_err(|violation| violation.into_error(path, arg.help_text()))?,
                ),
                None => None,
            },
        };

        let dynamic = match arg.get_dynamic_defaults() {
            Some(defaults) => {
                let pivot = self.resolved.get(defaults.field()).ok_or_else(|| {
                    ConfigError::UnresolvedDependency {
                        path: path.to_string(),
                        field: defaults.field().to_string(),
                        issue: DependencyIssue::ResolvesLater,
                    }
                })?;
                defaults.lookup(&pivot.value)
            }
            None => None,
        };

        let resolved = arg
            .resolve(user, dynamic)
            .map_err(|violation| violation.into_error(path, arg.help_text()))?;
        log::debug!("{} = {} ({})", path, resolved.value, resolved.source);

        self.resolved.insert(
            arg.name().to_string(),
            ResolvedArg {
                path: path.to_string(),
                value: resolved.value.clone(),
                source: resolved.source,
            },
        );
        Ok(resolved.value)
    }

    /// Builds the subtree registered for the value `arg` just took, resolves it and attaches
    /// it to the group owning `arg`.
    fn spawn(
        &mut self,
        owner: &mut ArgsGroup,
        owner_path: &str,
        arg: &Arg,
        factory: GroupFactory,
    ) -> ConfigResult<()> {
        let mut spawned = factory()?;
        let field = spawned
            .field_name()
            .ok_or_else(|| ConfigError::MissingRequiredSpecification {
                path: join_path(owner_path, spawned.name()),
                missing: "field_name",
            })?
            .to_string();
        if owner.get(&field).is_some() {
            return Err(ConfigError::NameCollision {
                path: owner_path.to_string(),
                field,
            });
        }

        annotate_group(&mut spawned, &self.tables);
        log::debug!(
            "'{}' spawned '{}' as '{}'",
            arg.name(),
            spawned.name(),
            join_path(owner_path, &field)
        );
        self.resolve_group(&mut spawned, &join_path(owner_path, &field))?;
        owner.attach_child(field, spawned)
    }
}

impl Sequencer<'_> {
    fn visit_group(
        &mut self,
        group: &ArgsGroup,
        path: &str,
        speculative: bool,
        depth: usize,
    ) -> ConfigResult<()> {
        for (field, attribute) in group.attributes() {
            let field_path = join_path(path, field);
            match attribute {
                Attribute::Arg(arg) => {
                    self.declare(arg, &field_path, speculative)?;
                    for (_, factory) in arg.spawn_registry() {
                        self.visit_spawn(*factory, path, depth + 1)?;
                    }
                }
                Attribute::Group(child) => {
                    self.visit_group(child, &field_path, speculative, depth)?;
                }
                Attribute::Value(_) | Attribute::Fixed(_) => {}
            }
        }
        Ok(())
    }

    fn visit_spawn(&mut self, factory: GroupFactory, owner_path: &str, depth: usize) -> ConfigResult<()> {
        if depth > MAX_SPAWN_DEPTH {
            return Err(ConfigError::SpawnDepthExceeded {
                depth: MAX_SPAWN_DEPTH,
                path: owner_path.to_string(),
            });
        }
        let mut group = factory()?;
        let field = group
            .field_name()
            .ok_or_else(|| ConfigError::MissingRequiredSpecification {
                path: join_path(owner_path, group.name()),
                missing: "field_name",
            })?
            .to_string();
        annotate_group(&mut group, self.tables);
        self.visit_group(&group, &join_path(owner_path, &field), true, depth)
    }

    fn declare(&mut self, arg: &Arg, path: &str, speculative: bool) -> ConfigResult<()> {
        if let Some(existing) = self.declared.get(arg.name()) {
            // Alternative subtrees of the same value never coexist.
            if existing.speculative && speculative {
                return Ok(());
            }
            return Err(ConfigError::DuplicateFlag {
                flag: arg.name().to_string(),
                first: existing.path.clone(),
                second: path.to_string(),
            });
        }
        self.declared.insert(
            arg.name().to_string(),
            Declared {
                seq: self.next_seq,
                path: path.to_string(),
                depends_on: arg.depends_on().map(str::to_string),
                speculative,
            },
        );
        self.next_seq += 1;
        Ok(())
    }

    fn check_dependencies(&self, already_resolved: &IndexMap<String, ResolvedArg>) -> ConfigResult<()> {
        for (name, declared) in &self.declared {
            if let (Some(field), Some(chain)) = (&declared.depends_on, self.find_cycle(name)) {
                return Err(ConfigError::UnresolvedDependency {
                    path: declared.path.clone(),
                    field: field.clone(),
                    issue: DependencyIssue::Cycle(chain),
                });
            }
        }

        for declared in self.declared.values() {
            let Some(field) = &declared.depends_on else {
                continue;
            };
            if already_resolved.contains_key(field) {
                continue;
            }
            let issue = match self.declared.get(field) {
                None => DependencyIssue::NotDeclared,
                Some(target) if target.seq >= declared.seq => DependencyIssue::ResolvesLater,
                Some(_) => continue,
            };
            return Err(ConfigError::UnresolvedDependency {
                path: declared.path.clone(),
                field: field.clone(),
                issue,
            });
        }
        Ok(())
    }

    /// The dependency chain starting at `start`, if it loops back to `start`.
    fn find_cycle(&self, start: &str) -> Option<String> {
        let mut chain = vec![start];
        let mut current = start;
        while let Some(next) = self
            .declared
            .get(current)
            .and_then(|declared| declared.depends_on.as_deref())
        {
            if next == start {
                chain.push(next);
                return Some(chain.join(" -> "));
            }
            if chain.contains(&next) {
                // A loop that does not pass through `start`; reported from one of its members.
                return None;
            }
            chain.push(next);
            current = next;
        }
        None
    }
}

fn contains_arg(group: &ArgsGroup, name: &str) -> bool {
    group.own_args().any(|(_, arg)| arg.name() == name)
        || group.own_children().any(|(_, child)| contains_arg(child, name))
}

/// Column of `arg_name` across every table, earlier tables first.
fn project(tables: &[KeyedDefaults], arg_name: &str) -> Option<DynamicDefaults> {
    let mut merged: Option<DynamicDefaults> = None;
    for table in tables.iter().filter(|table| table.field() != arg_name) {
        let Some(column) = table.record_column(arg_name) else {
            continue;
        };
        match &mut merged {
            Some(existing) => {
                if !existing.merge(&column) {
                    log::debug!(
                        "'{}' already keyed on '{}', ignoring table keyed on '{}'",
                        arg_name,
                        existing.field(),
                        column.field()
                    );
                }
            }
            None => merged = Some(column),
        }
    }
    merged
}

fn annotate_group(group: &mut ArgsGroup, tables: &[KeyedDefaults]) -> usize {
    if tables.is_empty() {
        return 0;
    }
    let mut annotated = 0;
    for arg in group.args_mut() {
        let Some(column) = project(tables, arg.name()) else {
            continue;
        };
        if arg.annotate_dynamic_defaults(column) {
            annotated += 1;
        } else {
            log::debug!("'{}' keeps its own dynamic defaults", arg.name());
        }
    }
    for child in group.children_mut() {
        annotated += annotate_group(child, tables);
    }
    annotated
}

// MARK: --- UNIT TESTS ---
