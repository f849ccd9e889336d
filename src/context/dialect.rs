//! Language dialect handed to the compilers

use super::config::QueryConfig;

/// Language options consulted while compiling expressions
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dialect {
    /// Object and array literals are allowed
    pub extended_language: bool,
    /// Property read as the key of a value inserted without KEY
    pub key_attribute: String,
}

impl Default for Dialect {
    fn default() -> Self {
        Self {
            extended_language: true,
            key_attribute: "key".to_string(),
        }
    }
}

impl From<&QueryConfig> for Dialect {
    fn from(config: &QueryConfig) -> Self {
        Self {
            extended_language: config.extended_language,
            key_attribute: config.key_attribute.clone(),
        }
    }
}
