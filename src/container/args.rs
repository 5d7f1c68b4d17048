//! Supplied and resolved constructor arguments.

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use crate::container::error::ResolveError;
use crate::container::key::TypeKey;

/// A type-erased shared instance.
pub type Instance = Arc<dyn Any + Send + Sync>;

/// An argument supplied by the caller of a resolution.
///
/// Objects take part in type claiming: a constructor parameter of the same
/// exact type receives the object instead of an auto-resolved instance.
/// Values are only ever consumed positionally.
#[derive(Clone)]
pub enum Argument {
    Object { key: TypeKey, instance: Instance },
    Value { key: TypeKey, instance: Instance },
}

impl Argument {
    pub fn object<T: Send + Sync + 'static>(instance: Arc<T>) -> Self {
        Argument::Object {
            key: TypeKey::of::<T>(),
            instance,
        }
    }

    pub fn value<T: Send + Sync + 'static>(value: T) -> Self {
        Argument::Value {
            key: TypeKey::of::<T>(),
            instance: Arc::new(value),
        }
    }

    pub fn key(&self) -> TypeKey {
        match self {
            Argument::Object { key, .. } | Argument::Value { key, .. } => *key,
        }
    }

    pub fn is_object(&self) -> bool {
        matches!(self, Argument::Object { .. })
    }

    pub(crate) fn into_instance(self) -> Instance {
        match self {
            Argument::Object { instance, .. } | Argument::Value { instance, .. } => instance,
        }
    }
}

impl fmt::Debug for Argument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Argument::Object { key, .. } => write!(f, "Object({})", key.name()),
            Argument::Value { key, .. } => write!(f, "Value({})", key.name()),
        }
    }
}

/// Ordered arguments handed to a constructor, one per declared dependency.
pub struct Args {
    target: TypeKey,
    values: std::vec::IntoIter<Instance>,
    position: usize,
}

impl Args {
    pub(crate) fn new(target: TypeKey, values: Vec<Instance>) -> Self {
        Self {
            target,
            values: values.into_iter(),
            position: 0,
        }
    }

    /// The type being constructed.
    pub fn target(&self) -> TypeKey {
        self.target
    }

    pub fn remaining(&self) -> usize {
        self.values.len()
    }

    /// Take the next argument as a shared instance of `T`.
    pub fn next<T: Send + Sync + 'static>(&mut self) -> Result<Arc<T>, ResolveError> {
        let position = self.position;
        self.position += 1;
        let instance = self.values.next().ok_or(ResolveError::MissingArgument {
            target: self.target.name(),
            position,
        })?;
        instance.downcast::<T>().map_err(|_| ResolveError::ArgumentType {
            target: self.target.name(),
            position,
            expected: std::any::type_name::<T>(),
        })
    }

    /// Take the next argument by value, cloning only if it is still shared.
    pub fn next_owned<T: Clone + Send + Sync + 'static>(&mut self) -> Result<T, ResolveError> {
        let shared = self.next::<T>()?;
        Ok(Arc::try_unwrap(shared).unwrap_or_else(|shared| (*shared).clone()))
    }
}
