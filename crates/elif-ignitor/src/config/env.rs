use std::collections::HashMap;

/// Environment variable name for the listen host
pub const HOST_KEY: &str = "HOST";

/// Environment variable name for the listen port
pub const PORT_KEY: &str = "PORT";

/// Host used when `HOST` is not set
pub const DEFAULT_HOST: &str = "127.0.0.1";

/// Port used when `PORT` is not set
pub const DEFAULT_PORT: u16 = 3000;

/// Read-only view over environment values
pub trait Env: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;
}

/// Environment backed by the process environment
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessEnv;

impl Env for ProcessEnv {
    fn get(&self, key: &str) -> Option<String> {
        std::env::var(key).ok()
    }
}

/// In-memory environment, mostly useful in tests
#[derive(Debug, Clone, Default)]
pub struct MapEnv {
    values: HashMap<String, String>,
}

impl MapEnv {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a value
    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.values.insert(key.into(), value.into());
        self
    }
}

impl Env for MapEnv {
    fn get(&self, key: &str) -> Option<String> {
        self.values.get(key).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    fn test_map_env_lookup() {
        let env = MapEnv::new().with(PORT_KEY, "4000");

        assert_eq!(env.get(PORT_KEY).as_deref(), Some("4000"));
        assert_eq!(env.get(HOST_KEY), None);
    }

    #[test]
    #[serial]
    fn test_process_env_reads_variables() {
        std::env::set_var("ELIF_IGNITOR_ENV_PROBE", "on");
        assert_eq!(ProcessEnv.get("ELIF_IGNITOR_ENV_PROBE").as_deref(), Some("on"));

        std::env::remove_var("ELIF_IGNITOR_ENV_PROBE");
        assert_eq!(ProcessEnv.get("ELIF_IGNITOR_ENV_PROBE"), None);
    }
}
