use std::collections::HashMap;
use std::sync::Arc;

use arc_swap::ArcSwap;

/// Read access to string parameters.
pub trait ParamSource: Send + Sync {
    fn get(&self, name: &str) -> Option<String>;

    /// Looks up `name`, falling back to `default` if it is unset.
    fn get_or(&self, name: &str, default: &str) -> String {
        self.get(name).unwrap_or_else(|| default.to_string())
    }
}

/// Process wide parameter tree, keyed by `/` separated paths.
///
/// Readers load a snapshot without locking; `set` swaps in an updated copy.
#[derive(Clone, Default)]
pub struct ParamStore {
    params: Arc<ArcSwap<HashMap<String, String>>>,
}

impl ParamStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self, path: &str, value: &str) {
        self.params.rcu(|params| {
            let mut params = HashMap::clone(params);
            params.insert(path.to_string(), value.to_string());
            params
        });
    }

    /// Parses `key=value` as given on the command line and stores it.
    pub fn set_from_arg(&self, arg: &str) -> Result<(), String> {
        match arg.split_once('=') {
            Some((key, value)) if !key.trim().is_empty() => {
                self.set(key.trim(), value.trim());
                Ok(())
            }
            _ => Err(format!("expected key=value, got '{}'", arg)),
        }
    }

    /// View of the subtree below `namespace`.
    pub fn scoped(&self, namespace: &str) -> Scoped {
        Scoped {
            store: self.clone(),
            namespace: namespace.trim_matches('/').to_string(),
        }
    }
}

impl ParamSource for ParamStore {
    fn get(&self, name: &str) -> Option<String> {
        self.params.load().get(name).cloned()
    }
}

pub struct Scoped {
    store: ParamStore,
    namespace: String,
}

impl ParamSource for Scoped {
    fn get(&self, name: &str) -> Option<String> {
        self.store.get(&format!("{}/{}", self.namespace, name))
    }
}
