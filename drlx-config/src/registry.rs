//! Name-to-variant registry for the polymorphic `method` section.

use std::collections::HashMap;
use std::fmt;
use std::sync::RwLock;

use tracing::{debug, warn};

use crate::method::{BaseMethodConfig, DdpoConfig, MethodConfig, MethodVariant, build_variant};
use crate::node::Mapping;
use crate::{ConfigError, ConfigResult};

/// Constructor stored for a registered method name.
pub type MethodFactory = fn(Mapping) -> ConfigResult<MethodConfig>;

/// Registry entry describing how to build one method variant.
#[derive(Clone, Copy)]
pub struct MethodDescriptor {
    type_name: &'static str,
    factory: MethodFactory,
}

impl MethodDescriptor {
    /// Returns the type name of the registered variant.
    #[must_use]
    pub const fn type_name(&self) -> &'static str {
        self.type_name
    }

    /// Builds the variant from the `method` section mapping.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Schema`] when the mapping does not fit the variant.
    pub fn build(&self, mapping: Mapping) -> ConfigResult<MethodConfig> {
        (self.factory)(mapping)
    }
}

impl fmt::Debug for MethodDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MethodDescriptor")
            .field("type_name", &self.type_name)
            .finish_non_exhaustive()
    }
}

/// Registry that maps lowercase method names to variant descriptors.
///
/// Registering a name twice replaces the earlier entry; this is how user code
/// overrides a built-in method. Registration is expected to happen while the
/// registry is being set up, before it is shared; concurrent registration is
/// unsupported even though the interior lock keeps it memory-safe.
#[derive(Default)]
pub struct MethodRegistry {
    inner: RwLock<HashMap<String, MethodDescriptor>>,
}

impl fmt::Debug for MethodRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut debug = f.debug_struct("MethodRegistry");
        match self.names() {
            Ok(names) => debug.field("registered", &names),
            Err(_) => debug.field("registered", &"<poisoned>"),
        };
        debug.finish()
    }
}

impl MethodRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a registry holding the built-in methods: `methodconfig` and
    /// `ddpo`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Registration`] if the fresh registry cannot be
    /// written, which only happens when its lock is poisoned.
    pub fn with_builtin_methods() -> ConfigResult<Self> {
        let registry = Self::new();
        registry.register::<BaseMethodConfig>(None)?;
        registry.register::<DdpoConfig>(Some("ddpo"))?;
        Ok(registry)
    }

    /// Registers variant `V` under `name`, or under its lowercased type name
    /// when `name` is `None`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Registration`] if the registry lock is poisoned.
    /// Duplicate names are not an error.
    pub fn register<V: MethodVariant>(&self, name: Option<&str>) -> ConfigResult<()> {
        let name = name.unwrap_or(V::TYPE_NAME);
        self.register_factory(name, V::TYPE_NAME, build_variant::<V>)
    }

    /// Registers a hand-written factory under `name`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Registration`] if the registry lock is poisoned.
    pub fn register_factory(
        &self,
        name: &str,
        type_name: &'static str,
        factory: MethodFactory,
    ) -> ConfigResult<()> {
        let key = name.to_lowercase();
        let mut inner = self.inner.write().map_err(|_| ConfigError::Registration {
            reason: "method registry lock poisoned".into(),
        })?;

        let descriptor = MethodDescriptor { type_name, factory };
        if let Some(previous) = inner.insert(key.clone(), descriptor) {
            warn!(
                method = %key,
                previous = previous.type_name,
                replacement = type_name,
                "method registration overwritten"
            );
        } else {
            debug!(method = %key, type_name, "registered method");
        }
        Ok(())
    }

    /// Looks up the descriptor registered under `name`, ignoring case.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::UnknownMethod`] if nothing is registered under
    /// the name, or [`ConfigError::Registration`] if the lock is poisoned.
    pub fn resolve(&self, name: &str) -> ConfigResult<MethodDescriptor> {
        let inner = self.inner.read().map_err(|_| ConfigError::Registration {
            reason: "method registry lock poisoned".into(),
        })?;
        inner
            .get(&name.to_lowercase())
            .copied()
            .ok_or_else(|| ConfigError::UnknownMethod {
                name: name.to_owned(),
            })
    }

    /// Returns `true` if a variant is registered under `name`, ignoring case.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Registration`] if the registry lock is poisoned.
    pub fn contains(&self, name: &str) -> ConfigResult<bool> {
        match self.resolve(name) {
            Ok(_) => Ok(true),
            Err(ConfigError::UnknownMethod { .. }) => Ok(false),
            Err(err) => Err(err),
        }
    }

    /// Lists registered names in sorted order.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Registration`] if the registry lock is poisoned.
    pub fn names(&self) -> ConfigResult<Vec<String>> {
        let inner = self.inner.read().map_err(|_| ConfigError::Registration {
            reason: "method registry lock poisoned".into(),
        })?;
        let mut names: Vec<_> = inner.keys().cloned().collect();
        names.sort_unstable();
        Ok(names)
    }
}
