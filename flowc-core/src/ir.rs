use serde::{Deserialize, Serialize};

use crate::deployment::ApiType;

/// Format-neutral intermediate representation of an API, produced by a
/// spec parser and consumed by the translator. Transient: built at
/// deploy time, never persisted.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Ir {
    pub metadata: IrMetadata,
    #[serde(default)]
    pub routes: Vec<IrRoute>,
    #[serde(default)]
    pub servers: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IrMetadata {
    pub api_type: ApiType,
    pub base_path: String,
}

impl Default for IrMetadata {
    fn default() -> Self {
        Self {
            api_type: ApiType::Rest,
            base_path: "/".to_string(),
        }
    }
}

/// A single route extracted from the source spec. For non-REST types
/// only the fields that are meaningful for that type are populated
/// (`method` for RPC methods, `path` for top-level GraphQL fields, etc.).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IrRoute {
    pub path: String,

    #[serde(default)]
    pub methods: Vec<String>,

    #[serde(default)]
    pub operation_id: Option<String>,
}

impl Ir {
    /// Normalize `base_path`: ensure a leading `/`, strip a trailing `/`
    /// except for the root path itself.
    pub fn normalize_base_path(raw: &str) -> String {
        let mut path = raw.trim().to_string();
        if !path.starts_with('/') {
            path = format!("/{path}");
        }
        if path.len() > 1 && path.ends_with('/') {
            path.pop();
        }
        path
    }

    /// Routes ordered as declared, except that among routes sharing a
    /// common path prefix, longer prefixes are ordered first.
    pub fn ordered_routes(&self) -> Vec<&IrRoute> {
        let mut routes: Vec<&IrRoute> = self.routes.iter().collect();
        routes.sort_by(|a, b| {
            if nests(&a.path, &b.path) {
                b.path.len().cmp(&a.path.len())
            } else {
                std::cmp::Ordering::Equal
            }
        });
        routes
    }
}

/// True when one path's `'/'`-delimited segments are a genuine prefix of
/// the other's, e.g. `/users` nests under `/users/:id` but `/zzz` and
/// `/a` share nothing despite both starting with `/`.
fn nests(a: &str, b: &str) -> bool {
    let a_segs: Vec<&str> = a.split('/').filter(|s| !s.is_empty()).collect();
    let b_segs: Vec<&str> = b.split('/').filter(|s| !s.is_empty()).collect();
    let shorter = a_segs.len().min(b_segs.len());
    shorter > 0 && a_segs[..shorter] == b_segs[..shorter]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_base_path_adds_leading_slash() {
        assert_eq!(Ir::normalize_base_path("v1"), "/v1");
    }

    #[test]
    fn test_normalize_base_path_strips_trailing_slash() {
        assert_eq!(Ir::normalize_base_path("/v1/"), "/v1");
    }

    #[test]
    fn test_normalize_base_path_keeps_root() {
        assert_eq!(Ir::normalize_base_path("/"), "/");
    }

    #[test]
    fn test_ordered_routes_prefers_longer_shared_prefix() {
        let ir = Ir {
            metadata: IrMetadata::default(),
            routes: vec![
                IrRoute { path: "/users".into(), methods: vec!["GET".into()], operation_id: None },
                IrRoute { path: "/users/:id".into(), methods: vec!["GET".into()], operation_id: None },
            ],
            servers: vec![],
        };
        let ordered = ir.ordered_routes();
        assert_eq!(ordered[0].path, "/users/:id");
    }

    #[test]
    fn test_ordered_routes_preserves_declared_order_for_unrelated_paths() {
        let ir = Ir {
            metadata: IrMetadata::default(),
            routes: vec![
                IrRoute { path: "/zzz".into(), methods: vec!["GET".into()], operation_id: None },
                IrRoute { path: "/a".into(), methods: vec!["GET".into()], operation_id: None },
            ],
            servers: vec![],
        };
        let ordered = ir.ordered_routes();
        assert_eq!(ordered[0].path, "/zzz");
        assert_eq!(ordered[1].path, "/a");
    }
}
