use std::collections::HashMap;

use flowc_core::deployment::ApiType;
use flowc_core::ir::{Ir, IrMetadata, IrRoute};
use flowc_core::FlowcError;

/// A parser is a pure function of `(bytes) -> IR` and may fail. Each
/// implements only the handful of fields the translator actually needs —
/// full schema validation of OpenAPI/AsyncAPI/proto/GraphQL is out of
/// scope.
pub trait SpecParser: Send + Sync {
    fn parse(&self, bytes: &[u8]) -> Result<Ir, FlowcError>;
}

/// `apiType -> parser` mapping used by the bundle loader to dispatch the
/// raw spec file it extracted.
pub struct ParserRegistry {
    parsers: HashMap<ApiType, Box<dyn SpecParser>>,
}

impl ParserRegistry {
    pub fn with_defaults() -> Self {
        let mut parsers: HashMap<ApiType, Box<dyn SpecParser>> = HashMap::new();
        parsers.insert(ApiType::Rest, Box::new(RestParser));
        parsers.insert(ApiType::Websocket, Box::new(WebsocketParser));
        parsers.insert(ApiType::Grpc, Box::new(GrpcParser));
        parsers.insert(ApiType::Graphql, Box::new(GraphqlParser));
        Self { parsers }
    }

    pub fn get(&self, api_type: ApiType) -> Option<&dyn SpecParser> {
        self.parsers.get(&api_type).map(|p| p.as_ref())
    }

    pub fn register(&mut self, api_type: ApiType, parser: Box<dyn SpecParser>) {
        self.parsers.insert(api_type, parser);
    }
}

impl Default for ParserRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}

/// Reads a minimal OpenAPI-shaped YAML document: `paths` and, per path,
/// the HTTP methods present as keys.
pub struct RestParser;

impl SpecParser for RestParser {
    fn parse(&self, bytes: &[u8]) -> Result<Ir, FlowcError> {
        let doc: serde_yaml::Value = serde_yaml::from_slice(bytes)
            .map_err(|e| FlowcError::ParseFailed(format!("rest spec: {e}")))?;

        let servers = doc
            .get("servers")
            .and_then(|v| v.as_sequence())
            .map(|seq| {
                seq.iter()
                    .filter_map(|s| s.get("url").and_then(|u| u.as_str()).map(str::to_string))
                    .collect()
            })
            .unwrap_or_default();

        let mut routes = Vec::new();
        if let Some(paths) = doc.get("paths").and_then(|v| v.as_mapping()) {
            for (path_key, methods) in paths {
                let Some(path) = path_key.as_str() else { continue };
                let Some(methods) = methods.as_mapping() else { continue };
                let mut allowed = Vec::new();
                let mut operation_id = None;
                for (method_key, operation) in methods {
                    let Some(method) = method_key.as_str() else { continue };
                    if !HTTP_METHODS.contains(&method.to_ascii_lowercase().as_str()) {
                        continue;
                    }
                    allowed.push(method.to_ascii_uppercase());
                    if operation_id.is_none() {
                        operation_id = operation
                            .get("operationId")
                            .and_then(|v| v.as_str())
                            .map(str::to_string);
                    }
                }
                routes.push(IrRoute {
                    path: path.to_string(),
                    methods: allowed,
                    operation_id,
                });
            }
        }

        Ok(Ir {
            metadata: IrMetadata {
                api_type: ApiType::Rest,
                base_path: "/".to_string(),
            },
            routes,
            servers,
        })
    }
}

const HTTP_METHODS: &[&str] = &[
    "get", "post", "put", "delete", "patch", "head", "options", "trace",
];

/// Extracts only server/channel URLs from an AsyncAPI-shaped YAML
/// document; deliberately shallow.
pub struct WebsocketParser;

impl SpecParser for WebsocketParser {
    fn parse(&self, bytes: &[u8]) -> Result<Ir, FlowcError> {
        let doc: serde_yaml::Value = serde_yaml::from_slice(bytes)
            .map_err(|e| FlowcError::ParseFailed(format!("asyncapi spec: {e}")))?;

        let servers = doc
            .get("servers")
            .and_then(|v| v.as_mapping())
            .map(|m| {
                m.values()
                    .filter_map(|s| s.get("url").and_then(|u| u.as_str()).map(str::to_string))
                    .collect()
            })
            .unwrap_or_default();

        let routes = doc
            .get("channels")
            .and_then(|v| v.as_mapping())
            .map(|m| {
                m.keys()
                    .filter_map(|k| k.as_str())
                    .map(|channel| IrRoute {
                        path: channel.to_string(),
                        methods: vec![],
                        operation_id: None,
                    })
                    .collect()
            })
            .unwrap_or_default();

        Ok(Ir {
            metadata: IrMetadata {
                api_type: ApiType::Websocket,
                base_path: "/".to_string(),
            },
            routes,
            servers,
        })
    }
}

/// Extracts RPC method names from a `.proto` file by regex; does not
/// build a full protobuf AST.
pub struct GrpcParser;

impl SpecParser for GrpcParser {
    fn parse(&self, bytes: &[u8]) -> Result<Ir, FlowcError> {
        let text = std::str::from_utf8(bytes)
            .map_err(|e| FlowcError::ParseFailed(format!("proto spec is not valid utf8: {e}")))?;

        let rpc_re = regex::Regex::new(r"rpc\s+(\w+)\s*\(").unwrap();
        let routes = rpc_re
            .captures_iter(text)
            .map(|cap| IrRoute {
                path: format!("/{}", &cap[1]),
                methods: vec!["POST".to_string()],
                operation_id: Some(cap[1].to_string()),
            })
            .collect();

        Ok(Ir {
            metadata: IrMetadata {
                api_type: ApiType::Grpc,
                base_path: "/".to_string(),
            },
            routes,
            servers: vec![],
        })
    }
}

/// Extracts top-level `Query`/`Mutation` field names from a GraphQL SDL
/// document by regex.
pub struct GraphqlParser;

impl SpecParser for GraphqlParser {
    fn parse(&self, bytes: &[u8]) -> Result<Ir, FlowcError> {
        let text = std::str::from_utf8(bytes)
            .map_err(|e| FlowcError::ParseFailed(format!("graphql spec is not valid utf8: {e}")))?;

        let block_re = regex::Regex::new(r"(?s)type\s+(Query|Mutation)\s*\{([^}]*)\}").unwrap();
        let field_re = regex::Regex::new(r"(?m)^\s*(\w+)\s*(\([^)]*\))?\s*:").unwrap();

        let mut routes = Vec::new();
        for block in block_re.captures_iter(text) {
            let root = &block[1];
            let body = &block[2];
            for field in field_re.captures_iter(body) {
                let name = field[1].to_string();
                routes.push(IrRoute {
                    path: format!("/{}", name),
                    methods: vec![if root == "Mutation" {
                        "POST".to_string()
                    } else {
                        "GET".to_string()
                    }],
                    operation_id: Some(name),
                });
            }
        }

        Ok(Ir {
            metadata: IrMetadata {
                api_type: ApiType::Graphql,
                base_path: "/".to_string(),
            },
            routes,
            servers: vec![],
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rest_parser_extracts_routes() {
        let yaml = br#"
servers:
  - url: http://localhost
paths:
  /users:
    get:
      operationId: listUsers
    post: {}
  /users/{id}:
    get: {}
"#;
        let ir = RestParser.parse(yaml).unwrap();
        assert_eq!(ir.servers, vec!["http://localhost".to_string()]);
        assert_eq!(ir.routes.len(), 2);
        let users = ir.routes.iter().find(|r| r.path == "/users").unwrap();
        assert_eq!(users.methods.len(), 2);
        assert_eq!(users.operation_id.as_deref(), Some("listUsers"));
    }

    #[test]
    fn test_websocket_parser_extracts_channels() {
        let yaml = br#"
servers:
  production:
    url: ws://localhost
channels:
  user/signedup:
    subscribe: {}
"#;
        let ir = WebsocketParser.parse(yaml).unwrap();
        assert_eq!(ir.servers, vec!["ws://localhost".to_string()]);
        assert_eq!(ir.routes[0].path, "user/signedup");
    }

    #[test]
    fn test_grpc_parser_extracts_methods() {
        let proto = b"service Greeter {\n  rpc SayHello (HelloRequest) returns (HelloReply);\n}";
        let ir = GrpcParser.parse(proto).unwrap();
        assert_eq!(ir.routes.len(), 1);
        assert_eq!(ir.routes[0].operation_id.as_deref(), Some("SayHello"));
    }

    #[test]
    fn test_graphql_parser_extracts_query_and_mutation_fields() {
        let sdl = b"type Query {\n  users: [User]\n}\ntype Mutation {\n  createUser(name: String): User\n}";
        let ir = GraphqlParser.parse(sdl).unwrap();
        assert_eq!(ir.routes.len(), 2);
        let create = ir.routes.iter().find(|r| r.path == "/createUser").unwrap();
        assert_eq!(create.methods, vec!["POST".to_string()]);
    }

    #[test]
    fn test_registry_has_all_four_defaults() {
        let registry = ParserRegistry::with_defaults();
        assert!(registry.get(ApiType::Rest).is_some());
        assert!(registry.get(ApiType::Websocket).is_some());
        assert!(registry.get(ApiType::Grpc).is_some());
        assert!(registry.get(ApiType::Graphql).is_some());
    }
}
