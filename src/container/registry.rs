//! Instance registry and constructor table.
//!
//! # Responsibilities
//! - Hold one constructor per registered type (declared deps + factory)
//! - Cache built instances per (type, alias)
//! - Record which pipeline capabilities a type implements
//! - Map configuration names to type keys

use std::any::TypeId;
use std::collections::HashMap;
use std::marker::PhantomData;
use std::sync::Arc;

use dashmap::DashMap;

use crate::container::args::{Args, Argument, Instance};
use crate::container::error::ResolveError;
use crate::container::key::{Capability, TypeKey};
use crate::container::resolver::ResolveOptions;
use crate::pipeline::controller::{Controller, ControllerBase};
use crate::pipeline::handler::{RequestHandler, RouteHandler};
use crate::pipeline::middleware::Middleware;

/// Alias used when the caller does not name one.
pub const DEFAULT_ALIAS: &str = "default";

pub(crate) type Factory = Arc<dyn Fn(&mut Args) -> Result<Instance, ResolveError> + Send + Sync>;

type MiddlewareCaster = fn(Instance) -> Option<Arc<dyn Middleware>>;
type ControllerCaster = fn(Instance) -> Option<Arc<dyn Controller>>;
type HandlerCaster = fn(Instance) -> Option<Arc<dyn RequestHandler>>;

/// A type that declares its constructor dependencies.
///
/// `dependencies` lists parameter types in declaration order; `construct`
/// receives one argument per entry, in the same order.
pub trait Injectable: Send + Sync + Sized + 'static {
    fn dependencies() -> Vec<TypeKey> {
        Vec::new()
    }

    fn construct(args: &mut Args) -> Result<Self, ResolveError>;
}

#[derive(Default, Clone, Copy)]
pub(crate) struct Casters {
    middleware: Option<MiddlewareCaster>,
    controller: Option<ControllerCaster>,
    handler: Option<HandlerCaster>,
}

pub(crate) struct Constructor {
    pub(crate) key: TypeKey,
    pub(crate) params: Vec<TypeKey>,
    pub(crate) factory: Factory,
    casters: Casters,
}

/// Process-wide dependency container.
///
/// Constructors are registered during startup through `&mut self`; once the
/// container is shared behind an `Arc`, only the instance cache changes.
pub struct Container {
    pub(crate) constructors: HashMap<TypeId, Constructor>,
    names: HashMap<String, TypeKey>,
    pub(crate) instances: DashMap<(TypeId, String), Instance>,
}

impl Container {
    /// Create a container with the pipeline's own types registered.
    pub fn new() -> Self {
        let mut container = Self {
            constructors: HashMap::new(),
            names: HashMap::new(),
            instances: DashMap::new(),
        };
        container.register::<ControllerBase>();
        container.register::<RouteHandler>().as_handler();
        container
    }

    /// Register `T` using its declared dependencies.
    pub fn register<T: Injectable>(&mut self) -> Registration<'_, T> {
        let factory: Factory =
            Arc::new(|args: &mut Args| T::construct(args).map(|built| Arc::new(built) as Instance));
        self.insert_constructor::<T>(T::dependencies(), factory)
    }

    /// Register `T` built through `Default`, with no dependencies.
    pub fn register_default<T: Default + Send + Sync + 'static>(&mut self) -> Registration<'_, T> {
        let factory: Factory = Arc::new(|_: &mut Args| Ok(Arc::new(T::default()) as Instance));
        self.insert_constructor::<T>(Vec::new(), factory)
    }

    /// Register `T` with an explicit dependency list and factory function.
    pub fn register_factory<T, F>(&mut self, dependencies: Vec<TypeKey>, factory: F) -> Registration<'_, T>
    where
        T: Send + Sync + 'static,
        F: Fn(&mut Args) -> Result<T, ResolveError> + Send + Sync + 'static,
    {
        let factory: Factory =
            Arc::new(move |args: &mut Args| factory(args).map(|built| Arc::new(built) as Instance));
        self.insert_constructor::<T>(dependencies, factory)
    }

    fn insert_constructor<T: Send + Sync + 'static>(
        &mut self,
        params: Vec<TypeKey>,
        factory: Factory,
    ) -> Registration<'_, T> {
        let key = TypeKey::of::<T>();
        tracing::debug!(type_name = key.name(), dependencies = params.len(), "Registered constructor");

        let casters = self
            .constructors
            .get(&key.id())
            .map(|existing| existing.casters)
            .unwrap_or_default();
        self.constructors.insert(
            key.id(),
            Constructor {
                key,
                params,
                factory,
                casters,
            },
        );
        self.names.insert(key.name().to_string(), key);
        self.names.entry(key.short_name().to_string()).or_insert(key);

        Registration {
            container: self,
            key,
            _marker: PhantomData,
        }
    }

    /// Look a type up by a registered name.
    pub fn lookup(&self, name: &str) -> Option<TypeKey> {
        self.names.get(name).copied()
    }

    /// True when a constructor is registered for `key`.
    pub fn is_constructible(&self, key: &TypeKey) -> bool {
        self.constructors.contains_key(&key.id())
    }

    /// True when the container can supply `key` under the default alias.
    pub fn has(&self, key: &TypeKey) -> bool {
        self.is_constructible(key) || self.is_initialized(key, DEFAULT_ALIAS)
    }

    /// True when an instance is cached for (`key`, `alias`).
    pub fn is_initialized(&self, key: &TypeKey, alias: &str) -> bool {
        self.instances.contains_key(&(key.id(), alias.to_string()))
    }

    /// True when `key` was registered with `capability`.
    pub fn implements(&self, key: &TypeKey, capability: Capability) -> bool {
        self.constructors.get(&key.id()).is_some_and(|constructor| {
            let casters = constructor.casters;
            match capability {
                Capability::Middleware => casters.middleware.is_some(),
                Capability::Controller => casters.controller.is_some(),
                Capability::Handler => casters.handler.is_some(),
            }
        })
    }

    /// Store `instance` under the default alias, replacing any previous one.
    pub fn set<T: Send + Sync + 'static>(&self, instance: Arc<T>) {
        self.set_as(instance, DEFAULT_ALIAS);
    }

    /// Store `instance` under `alias`, replacing any previous one.
    pub fn set_as<T: Send + Sync + 'static>(&self, instance: Arc<T>, alias: &str) {
        let key = TypeKey::of::<T>();
        tracing::debug!(type_name = key.name(), alias, "Instance set");
        self.instances.insert((key.id(), alias.to_string()), instance);
    }

    /// Cached instance of `T` under the default alias, built on first use.
    pub fn get<T: Send + Sync + 'static>(&self) -> Result<Arc<T>, ResolveError> {
        self.get_as::<T>(DEFAULT_ALIAS)
    }

    /// Cached instance of `T` under `alias`, built on first use.
    pub fn get_as<T: Send + Sync + 'static>(&self, alias: &str) -> Result<Arc<T>, ResolveError> {
        let instance = self.resolve(&TypeKey::of::<T>(), ResolveOptions::cached().alias(alias))?;
        downcast::<T>(instance)
    }

    /// Fresh instance of `T` that is never stored in the cache. Its dependencies are shared.
    pub fn make<T: Send + Sync + 'static>(&self, arguments: Vec<Argument>) -> Result<Arc<T>, ResolveError> {
        let instance = self.resolve(
            &TypeKey::of::<T>(),
            ResolveOptions::transient().with_arguments(arguments),
        )?;
        downcast::<T>(instance)
    }

    /// Fresh owned instance of `T`.
    pub fn make_owned<T: Clone + Send + Sync + 'static>(
        &self,
        arguments: Vec<Argument>,
    ) -> Result<T, ResolveError> {
        let shared = self.make::<T>(arguments)?;
        Ok(Arc::try_unwrap(shared).unwrap_or_else(|shared| (*shared).clone()))
    }

    /// Shared middleware instance for `key`.
    pub fn middleware(&self, key: &TypeKey) -> Result<Arc<dyn Middleware>, ResolveError> {
        let cast = self
            .casters(key)
            .middleware
            .ok_or_else(|| missing_capability(key, Capability::Middleware))?;
        let instance = self.resolve(key, ResolveOptions::cached())?;
        cast(instance).ok_or(ResolveError::TypeMismatch { expected: key.name() })
    }

    /// Fresh controller instance for `key`, built from its own dependencies.
    pub fn controller(&self, key: &TypeKey) -> Result<Arc<dyn Controller>, ResolveError> {
        let cast = self
            .casters(key)
            .controller
            .ok_or_else(|| missing_capability(key, Capability::Controller))?;
        let instance = self.resolve(key, ResolveOptions::transient())?;
        cast(instance).ok_or(ResolveError::TypeMismatch { expected: key.name() })
    }

    /// Fresh request handler for `key`, built with the supplied arguments.
    pub fn handler(
        &self,
        key: &TypeKey,
        arguments: Vec<Argument>,
    ) -> Result<Arc<dyn RequestHandler>, ResolveError> {
        let cast = self
            .casters(key)
            .handler
            .ok_or_else(|| missing_capability(key, Capability::Handler))?;
        let instance = self.resolve(key, ResolveOptions::transient().with_arguments(arguments))?;
        cast(instance).ok_or(ResolveError::TypeMismatch { expected: key.name() })
    }

    fn casters(&self, key: &TypeKey) -> Casters {
        self.constructors
            .get(&key.id())
            .map(|constructor| constructor.casters)
            .unwrap_or_default()
    }
}

impl Default for Container {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Container {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Container")
            .field("constructors", &self.constructors.len())
            .field("instances", &self.instances.len())
            .finish()
    }
}

/// Builder returned by the `register*` methods.
pub struct Registration<'a, T> {
    container: &'a mut Container,
    key: TypeKey,
    _marker: PhantomData<fn() -> T>,
}

impl<'a, T: Send + Sync + 'static> Registration<'a, T> {
    pub fn key(&self) -> TypeKey {
        self.key
    }

    /// Make the type reachable under an extra configuration name.
    pub fn named(self, name: impl Into<String>) -> Self {
        self.container.names.insert(name.into(), self.key);
        self
    }

    pub fn as_middleware(mut self) -> Self
    where
        T: Middleware,
    {
        self.casters_mut(|casters| casters.middleware = Some(cast_middleware::<T>));
        self
    }

    pub fn as_controller(mut self) -> Self
    where
        T: Controller,
    {
        self.casters_mut(|casters| casters.controller = Some(cast_controller::<T>));
        self
    }

    pub fn as_handler(mut self) -> Self
    where
        T: RequestHandler,
    {
        self.casters_mut(|casters| casters.handler = Some(cast_handler::<T>));
        self
    }

    fn casters_mut(&mut self, apply: impl FnOnce(&mut Casters)) {
        if let Some(constructor) = self.container.constructors.get_mut(&self.key.id()) {
            apply(&mut constructor.casters);
        }
    }
}

fn cast_middleware<T: Middleware>(instance: Instance) -> Option<Arc<dyn Middleware>> {
    instance.downcast::<T>().ok().map(|typed| typed as Arc<dyn Middleware>)
}

fn cast_controller<T: Controller>(instance: Instance) -> Option<Arc<dyn Controller>> {
    instance.downcast::<T>().ok().map(|typed| typed as Arc<dyn Controller>)
}

fn cast_handler<T: RequestHandler>(instance: Instance) -> Option<Arc<dyn RequestHandler>> {
    instance.downcast::<T>().ok().map(|typed| typed as Arc<dyn RequestHandler>)
}

fn missing_capability(key: &TypeKey, capability: Capability) -> ResolveError {
    ResolveError::MissingCapability {
        type_name: key.name(),
        capability,
    }
}

fn downcast<T: Send + Sync + 'static>(instance: Instance) -> Result<Arc<T>, ResolveError> {
    instance.downcast::<T>().map_err(|_| ResolveError::TypeMismatch {
        expected: std::any::type_name::<T>(),
    })
}
