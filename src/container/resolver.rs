//! Constructor argument resolution.
//!
//! # Algorithm
//! ```text
//! resolve_arguments(target, supplied):
//!     1. read target's declared parameter types (declaration order)
//!     2. supplied objects whose exact type is a parameter type claim it
//!        (first object of a type wins; values never claim)
//!     3. for each parameter:
//!          claimed            → the claiming object
//!          container supplies → recursive resolve through the cache
//!          otherwise          → next unconsumed supplied argument (FIFO)
//!     4. one argument per parameter; surplus supplied arguments are dropped
//! ```
//!
//! Transient resolution only makes the requested type itself fresh; its
//! dependencies are shared services and always come from the cache.
//!
//! Positional consumption means argument order matters: a value supplied in
//! the wrong slot reaches the constructor as the wrong type and fails with
//! `ResolveError::ArgumentType`.

use std::any::TypeId;
use std::collections::{HashMap, VecDeque};

use crate::container::args::{Args, Argument, Instance};
use crate::container::error::ResolveError;
use crate::container::key::TypeKey;
use crate::container::registry::{Constructor, Container, DEFAULT_ALIAS};

/// How a single resolution uses the cache and which arguments it supplies.
#[derive(Debug, Clone)]
pub struct ResolveOptions {
    alias: String,
    arguments: Vec<Argument>,
    cached: bool,
}

impl ResolveOptions {
    /// Reuse and populate the instance cache.
    pub fn cached() -> Self {
        Self {
            alias: DEFAULT_ALIAS.to_string(),
            arguments: Vec::new(),
            cached: true,
        }
    }

    /// Build a fresh instance of the target itself; dependencies still come from the cache.
    pub fn transient() -> Self {
        Self {
            cached: false,
            ..Self::cached()
        }
    }

    pub fn alias(mut self, alias: impl Into<String>) -> Self {
        self.alias = alias.into();
        self
    }

    pub fn with_arguments(mut self, arguments: Vec<Argument>) -> Self {
        self.arguments = arguments;
        self
    }

    pub fn is_cached(&self) -> bool {
        self.cached
    }
}

impl Default for ResolveOptions {
    fn default() -> Self {
        Self::cached()
    }
}

impl Container {
    /// Build (or fetch) an instance of `key`.
    pub fn resolve(&self, key: &TypeKey, options: ResolveOptions) -> Result<Instance, ResolveError> {
        let mut stack = Vec::new();
        self.resolve_in(key, options, &mut stack)
    }

    /// Ordered constructor arguments for `target`, one per declared parameter.
    pub fn resolve_arguments(&self, target: &TypeKey, supplied: Vec<Argument>) -> Result<Vec<Instance>, ResolveError> {
        let constructor = self.constructor(target, DEFAULT_ALIAS)?;
        let mut stack = vec![*target];
        self.arguments_for(constructor, supplied, &mut stack)
    }

    fn resolve_in(
        &self,
        key: &TypeKey,
        options: ResolveOptions,
        stack: &mut Vec<TypeKey>,
    ) -> Result<Instance, ResolveError> {
        let ResolveOptions {
            alias,
            arguments,
            cached,
        } = options;

        if cached {
            if let Some(instance) = self.cached_instance(key, &alias) {
                tracing::trace!(type_name = key.name(), alias = %alias, "Instance cache hit");
                return Ok(instance);
            }
        }

        let Some(constructor) = self.constructors.get(&key.id()) else {
            // Instances placed with `set` satisfy transient requests too.
            return self
                .cached_instance(key, &alias)
                .ok_or_else(|| not_found(key, &alias));
        };

        if stack.contains(key) {
            let mut path: Vec<&'static str> = stack.iter().map(TypeKey::name).collect();
            path.push(key.name());
            return Err(ResolveError::Cycle { path });
        }

        stack.push(*key);
        let resolved = self.arguments_for(constructor, arguments, stack);
        stack.pop();

        let mut args = Args::new(constructor.key, resolved?);
        let instance = (constructor.factory)(&mut args)?;
        tracing::trace!(type_name = key.name(), cached, "Instance built");

        if cached {
            // Concurrent first builds keep whichever instance landed first.
            let entry = self.instances.entry((key.id(), alias)).or_insert(instance);
            return Ok(entry.value().clone());
        }
        Ok(instance)
    }

    fn arguments_for(
        &self,
        constructor: &Constructor,
        supplied: Vec<Argument>,
        stack: &mut Vec<TypeKey>,
    ) -> Result<Vec<Instance>, ResolveError> {
        let params = &constructor.params;

        let mut claimed: HashMap<TypeId, Instance> = HashMap::new();
        let mut queue: VecDeque<Instance> = VecDeque::with_capacity(supplied.len());
        for argument in supplied {
            let key = argument.key();
            if argument.is_object() && params.contains(&key) && !claimed.contains_key(&key.id()) {
                claimed.insert(key.id(), argument.into_instance());
            } else {
                queue.push_back(argument.into_instance());
            }
        }

        let mut resolved = Vec::with_capacity(params.len());
        for (position, param) in params.iter().enumerate() {
            if let Some(instance) = claimed.get(&param.id()) {
                resolved.push(instance.clone());
            } else if self.has(param) {
                resolved.push(self.resolve_in(param, ResolveOptions::cached(), stack)?);
            } else if let Some(instance) = queue.pop_front() {
                resolved.push(instance);
            } else {
                return Err(ResolveError::MissingArgument {
                    target: constructor.key.name(),
                    position,
                });
            }
        }

        if !queue.is_empty() {
            tracing::trace!(
                type_name = constructor.key.name(),
                dropped = queue.len(),
                "Surplus supplied arguments dropped"
            );
        }
        Ok(resolved)
    }

    fn constructor(&self, key: &TypeKey, alias: &str) -> Result<&Constructor, ResolveError> {
        self.constructors
            .get(&key.id())
            .ok_or_else(|| not_found(key, alias))
    }

    fn cached_instance(&self, key: &TypeKey, alias: &str) -> Option<Instance> {
        self.instances
            .get(&(key.id(), alias.to_string()))
            .map(|entry| entry.value().clone())
    }
}

fn not_found(key: &TypeKey, alias: &str) -> ResolveError {
    ResolveError::NotFound {
        type_name: key.name(),
        alias: alias.to_string(),
    }
}
