use crate::config::CompileMode;
use std::any::{type_name, Any};
use std::collections::{BTreeMap, HashMap};
use std::path::PathBuf;
use std::sync::{Arc, OnceLock, RwLock, RwLockReadGuard, RwLockWriteGuard};
use thiserror::Error;

type Instance = Arc<dyn Any + Send + Sync>;
type Factory = dyn Fn(&Container) -> Result<Instance, ContainerError> + Send + Sync;

/// Container error type
#[derive(Debug, Error)]
pub enum ContainerError {
    #[error("Binding not found: {name}")]
    NotFound { name: String },

    #[error("Binding '{name}' does not hold a {expected}")]
    TypeMismatch { name: String, expected: &'static str },

    #[error("Alias cycle detected at '{alias}'")]
    AliasCycle { alias: String },

    #[error("Factory for '{name}' failed: {message}")]
    FactoryFailed { name: String, message: String },
}

impl ContainerError {
    pub fn factory_failed(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::FactoryFailed {
            name: name.into(),
            message: message.into(),
        }
    }
}

/// Lazily constructed singleton binding
struct Binding {
    factory: Box<Factory>,
    instance: OnceLock<Instance>,
}

/// Name-keyed dependency injection container.
///
/// Bindings are singletons built on first use. Aliases point at binding names
/// and autoloads map a namespace prefix onto a directory.
pub struct Container {
    mode: CompileMode,
    bindings: RwLock<HashMap<String, Arc<Binding>>>,
    aliases: RwLock<HashMap<String, String>>,
    autoloads: RwLock<BTreeMap<String, PathBuf>>,
}

impl Container {
    /// Create an empty container for the given compile mode
    pub fn new(mode: CompileMode) -> Self {
        Self {
            mode,
            bindings: RwLock::new(HashMap::new()),
            aliases: RwLock::new(HashMap::new()),
            autoloads: RwLock::new(BTreeMap::new()),
        }
    }

    pub fn compile_mode(&self) -> CompileMode {
        self.mode
    }

    /// Bind a singleton factory under `name`. The factory runs on first use.
    pub fn singleton<T, F>(&self, name: impl Into<String>, factory: F)
    where
        T: Any + Send + Sync,
        F: Fn(&Container) -> Result<T, ContainerError> + Send + Sync + 'static,
    {
        let name = name.into();
        let binding = Binding {
            factory: Box::new(move |container: &Container| {
                factory(container).map(|value| Arc::new(value) as Instance)
            }),
            instance: OnceLock::new(),
        };

        if write(&self.bindings).insert(name.clone(), Arc::new(binding)).is_some() {
            tracing::debug!("Rebinding '{}'", name);
        }
    }

    /// Point `alias` at the binding `name`. A later alias replaces an earlier one.
    pub fn alias(&self, name: impl Into<String>, alias: impl Into<String>) {
        let (name, alias) = (name.into(), alias.into());
        if let Some(previous) = write(&self.aliases).insert(alias.clone(), name.clone()) {
            if previous != name {
                tracing::debug!("Alias '{}' moved from '{}' to '{}'", alias, previous, name);
            }
        }
    }

    /// Resolve anything under `namespace` from files in `directory`
    pub fn autoload(&self, directory: impl Into<PathBuf>, namespace: impl Into<String>) {
        write(&self.autoloads).insert(namespace.into(), directory.into());
    }

    /// Follow aliases until a binding name is reached
    pub fn resolve_name(&self, name: &str) -> Result<String, ContainerError> {
        let aliases = read(&self.aliases);

        let mut current = name.to_string();
        let mut hops = 0;
        while let Some(target) = aliases.get(&current) {
            if target == &current {
                break;
            }
            hops += 1;
            if hops > aliases.len() {
                return Err(ContainerError::AliasCycle {
                    alias: name.to_string(),
                });
            }
            current = target.clone();
        }

        Ok(current)
    }

    /// Resolve a binding by name or alias
    pub fn use_binding(&self, name: &str) -> Result<Instance, ContainerError> {
        let resolved = self.resolve_name(name)?;

        // Clone the binding out so the factory may resolve other bindings.
        let binding = read(&self.bindings).get(&resolved).cloned();

        let binding = binding.ok_or_else(|| ContainerError::NotFound {
            name: name.to_string(),
        })?;

        if let Some(instance) = binding.instance.get() {
            return Ok(Arc::clone(instance));
        }

        let instance = (binding.factory)(self)?;
        Ok(Arc::clone(binding.instance.get_or_init(|| instance)))
    }

    /// Resolve a binding and downcast it
    pub fn make<T: Any + Send + Sync>(&self, name: &str) -> Result<Arc<T>, ContainerError> {
        self.use_binding(name)?
            .downcast::<T>()
            .map_err(|_| ContainerError::TypeMismatch {
                name: name.to_string(),
                expected: type_name::<T>(),
            })
    }

    /// Check if a name or alias resolves to a binding
    pub fn has_binding(&self, name: &str) -> bool {
        let Ok(resolved) = self.resolve_name(name) else {
            return false;
        };
        read(&self.bindings).contains_key(&resolved)
    }

    /// Binding name an alias points at
    pub fn alias_target(&self, alias: &str) -> Option<String> {
        read(&self.aliases).get(alias).cloned()
    }

    /// File path for a namespaced identifier such as `App/Models/User`
    pub fn resolve_autoload(&self, identifier: &str) -> Option<PathBuf> {
        let autoloads = read(&self.autoloads);

        autoloads
            .iter()
            .filter_map(|(namespace, directory)| {
                if identifier == namespace {
                    Some((namespace.len(), directory.clone()))
                } else {
                    identifier
                        .strip_prefix(namespace.as_str())
                        .and_then(|rest| rest.strip_prefix('/'))
                        .map(|rest| (namespace.len(), directory.join(rest)))
                }
            })
            .max_by_key(|(len, _)| *len)
            .map(|(_, path)| path)
    }

    /// Registered autoload namespaces and their directories
    pub fn autoloads(&self) -> BTreeMap<String, PathBuf> {
        read(&self.autoloads).clone()
    }

    /// Names of all bindings, sorted
    pub fn binding_names(&self) -> Vec<String> {
        let mut names: Vec<String> = read(&self.bindings).keys().cloned().collect();
        names.sort();
        names
    }

    pub fn binding_count(&self) -> usize {
        read(&self.bindings).len()
    }
}

// A panic while a lock was held leaves the maps themselves consistent; every
// write is a single insert.
fn read<T>(lock: &RwLock<T>) -> RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn write<T>(lock: &RwLock<T>) -> RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl Default for Container {
    fn default() -> Self {
        Self::new(CompileMode::default())
    }
}

impl std::fmt::Debug for Container {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Container")
            .field("mode", &self.mode)
            .field("binding_count", &self.binding_count())
            .field("autoloads", &self.autoloads())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Debug)]
    struct Greeter {
        greeting: String,
    }

    #[test]
    fn test_singleton_factory_runs_once() {
        let container = Container::default();
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);

        container.singleton("greeter", move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(Greeter {
                greeting: "hello".to_string(),
            })
        });

        let first = container.make::<Greeter>("greeter").unwrap();
        let second = container.make::<Greeter>("greeter").unwrap();

        assert_eq!(first.greeting, "hello");
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_factory_can_resolve_other_bindings() {
        let container = Container::default();
        container.singleton("greeting", |_| Ok("hi".to_string()));
        container.singleton("greeter", |c| {
            let greeting = c.make::<String>("greeting")?;
            Ok(Greeter {
                greeting: greeting.as_ref().clone(),
            })
        });

        assert_eq!(container.make::<Greeter>("greeter").unwrap().greeting, "hi");
    }

    #[test]
    fn test_alias_resolution_and_override() {
        let container = Container::default();
        container.singleton("A", |_| Ok(1u32));
        container.singleton("B", |_| Ok(2u32));

        container.alias("A", "Short");
        assert_eq!(*container.make::<u32>("Short").unwrap(), 1);

        container.alias("B", "Short");
        assert_eq!(*container.make::<u32>("Short").unwrap(), 2);
        assert_eq!(container.alias_target("Short").as_deref(), Some("B"));
    }

    #[test]
    fn test_writes_survive_a_poisoned_lock() {
        let container = Arc::new(Container::default());
        let poisoner = Arc::clone(&container);
        let _ = std::thread::spawn(move || {
            let _aliases = poisoner.aliases.write().unwrap();
            let _autoloads = poisoner.autoloads.write().unwrap();
            panic!("poisoning container locks");
        })
        .join();
        assert!(container.aliases.is_poisoned());

        container.singleton("A", |_| Ok(1u32));
        container.alias("A", "Short");
        container.autoload("/srv/app/app", "App");

        assert_eq!(container.alias_target("Short").as_deref(), Some("A"));
        assert_eq!(*container.make::<u32>("Short").unwrap(), 1);
        assert_eq!(container.autoloads().len(), 1);
    }

    #[test]
    fn test_alias_cycle_is_reported() {
        let container = Container::default();
        container.alias("X", "Y");
        container.alias("Y", "X");

        assert!(matches!(
            container.use_binding("X"),
            Err(ContainerError::AliasCycle { .. })
        ));
    }

    #[test]
    fn test_missing_and_mismatched_bindings() {
        let container = Container::default();
        container.singleton("number", |_| Ok(7u64));

        assert!(matches!(
            container.use_binding("missing"),
            Err(ContainerError::NotFound { .. })
        ));
        assert!(matches!(
            container.make::<String>("number"),
            Err(ContainerError::TypeMismatch { .. })
        ));
        assert!(!container.has_binding("missing"));
        assert!(container.has_binding("number"));
    }

    #[test]
    fn test_autoload_resolution_prefers_longest_namespace() {
        let container = Container::default();
        container.autoload("/srv/app/app", "App");
        container.autoload("/srv/app/domain/billing", "App/Billing");

        assert_eq!(
            container.resolve_autoload("App/Models/User"),
            Some(PathBuf::from("/srv/app/app/Models/User"))
        );
        assert_eq!(
            container.resolve_autoload("App/Billing/Invoice"),
            Some(PathBuf::from("/srv/app/domain/billing/Invoice"))
        );
        assert_eq!(container.resolve_autoload("Apple/Pie"), None);
    }
}
