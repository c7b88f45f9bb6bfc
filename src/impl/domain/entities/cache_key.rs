use std::fmt;

use super::filter_state::PropertyFilter;

/// Cache entry key: `<namespace>:all` for every property, or
/// `<namespace>:p:<id>` for one. The tag keeps a property literally named
/// `all` away from the all-properties entry.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    namespace: String,
    scope: String,
}

impl CacheKey {
    pub fn new(namespace: &str, property_filter: &PropertyFilter) -> Self {
        Self {
            namespace: namespace.to_string(),
            scope: match property_filter {
                PropertyFilter::All => "all".to_string(),
                PropertyFilter::Property(id) => format!("p:{id}"),
            },
        }
    }

    pub fn as_string(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.namespace, self.scope)
    }
}
