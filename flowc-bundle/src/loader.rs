use std::io::{Cursor, Read};

use flowc_core::deployment::{ApiType, BundleManifest};
use flowc_core::ir::Ir;
use flowc_core::FlowcError;
use tracing::{info, warn};

use crate::parser::ParserRegistry;

/// Bounded input size for an uploaded bundle.
pub const MAX_BUNDLE_BYTES: usize = 32 * 1024 * 1024;

/// Output of loading a bundle: the validated manifest, the raw bytes of
/// whichever spec file was dispatched, and the IR the parser produced.
#[derive(Debug, Clone)]
pub struct LoadedBundle {
    pub manifest: BundleManifest,
    pub raw_spec: Vec<u8>,
    pub ir: Ir,
}

struct SpecCandidate {
    api_type: ApiType,
    bytes: Vec<u8>,
}

/// Opens `bytes` as a zip, extracts the manifest and the API type's spec
/// file, parses both, and returns the loaded bundle. Never touches the
/// repository or the translator — this is pure bytes-in, bundle-out.
pub fn load_bundle(bytes: &[u8], registry: &ParserRegistry) -> Result<LoadedBundle, FlowcError> {
    if bytes.len() > MAX_BUNDLE_BYTES {
        return Err(FlowcError::BundleInvalid(format!(
            "bundle exceeds {MAX_BUNDLE_BYTES} bytes"
        )));
    }

    let reader = Cursor::new(bytes);
    let mut archive = zip::ZipArchive::new(reader)
        .map_err(|e| FlowcError::BundleInvalid(format!("not a valid zip: {e}")))?;

    let mut manifest_bytes: Option<Vec<u8>> = None;
    let mut candidates: Vec<SpecCandidate> = Vec::new();

    for i in 0..archive.len() {
        let mut entry = archive
            .by_index(i)
            .map_err(|e| FlowcError::BundleInvalid(format!("corrupt zip entry: {e}")))?;
        if entry.is_dir() {
            continue;
        }
        let basename = match std::path::Path::new(entry.name()).file_name() {
            Some(name) => name.to_string_lossy().to_lowercase(),
            None => continue,
        };

        let mut contents = Vec::new();
        entry
            .read_to_end(&mut contents)
            .map_err(|e| FlowcError::BundleInvalid(format!("failed reading {basename}: {e}")))?;

        if basename == "flowc.yaml" || basename == "flowc.yml" {
            manifest_bytes = Some(contents);
            continue;
        }
        if let Some(api_type) = classify_spec_file(&basename) {
            candidates.push(SpecCandidate {
                api_type,
                bytes: contents,
            });
        }
    }

    let manifest_bytes = manifest_bytes
        .ok_or_else(|| FlowcError::BundleInvalid("missing flowc.yaml manifest".to_string()))?;

    let manifest = parse_manifest(&manifest_bytes, &candidates)?;

    let spec = candidates
        .iter()
        .find(|c| c.api_type == manifest.api_type)
        .ok_or_else(|| {
            FlowcError::SpecUnsupported(format!(
                "no spec file present for declared apiType {:?}",
                manifest.api_type
            ))
        })?;

    let parser = registry.get(manifest.api_type).ok_or_else(|| {
        FlowcError::SpecUnsupported(format!("no parser registered for {:?}", manifest.api_type))
    })?;

    let mut ir = parser.parse(&spec.bytes)?;
    ir.metadata.base_path = Ir::normalize_base_path(&manifest.context);

    info!(
        name = %manifest.name,
        api_type = ?manifest.api_type,
        route_count = ir.routes.len(),
        "bundle loaded"
    );

    Ok(LoadedBundle {
        manifest,
        raw_spec: spec.bytes.clone(),
        ir,
    })
}

/// Lists the non-directory entry names in a zip without parsing anything,
/// for the admin `/validate` endpoint's quick sanity check.
pub fn list_entries(bytes: &[u8]) -> Result<Vec<String>, FlowcError> {
    if bytes.len() > MAX_BUNDLE_BYTES {
        return Err(FlowcError::BundleInvalid(format!(
            "bundle exceeds {MAX_BUNDLE_BYTES} bytes"
        )));
    }
    let reader = Cursor::new(bytes);
    let archive = zip::ZipArchive::new(reader)
        .map_err(|e| FlowcError::BundleInvalid(format!("not a valid zip: {e}")))?;
    Ok(archive
        .file_names()
        .map(|name| name.to_string())
        .filter(|name| !name.ends_with('/'))
        .collect())
}

fn classify_spec_file(basename: &str) -> Option<ApiType> {
    match basename {
        "openapi.yaml" | "openapi.yml" | "swagger.yaml" | "swagger.yml" => Some(ApiType::Rest),
        "asyncapi.yaml" | "asyncapi.yml" => Some(ApiType::Websocket),
        _ if basename.ends_with(".proto") => Some(ApiType::Grpc),
        _ if basename.ends_with(".graphql") || basename.ends_with(".gql") => Some(ApiType::Graphql),
        _ => None,
    }
}

fn parse_manifest(
    bytes: &[u8],
    candidates: &[SpecCandidate],
) -> Result<BundleManifest, FlowcError> {
    let raw: serde_yaml::Value =
        serde_yaml::from_slice(bytes).map_err(|e| FlowcError::BundleInvalid(format!("manifest: {e}")))?;

    let explicit_api_type = raw.get("apiType").is_some();

    let mut manifest: BundleManifest = serde_yaml::from_value(raw)
        .map_err(|e| FlowcError::BundleInvalid(format!("manifest: {e}")))?;

    if manifest.name.is_empty() {
        return Err(FlowcError::BundleInvalid("manifest missing name".to_string()));
    }
    if manifest.version.is_empty() {
        return Err(FlowcError::BundleInvalid("manifest missing version".to_string()));
    }
    if manifest.context.is_empty() {
        return Err(FlowcError::BundleInvalid("manifest missing context".to_string()));
    }
    if manifest.upstream.host.is_empty() {
        return Err(FlowcError::BundleInvalid(
            "manifest missing upstream.host".to_string(),
        ));
    }
    if manifest.upstream.port == 0 {
        return Err(FlowcError::BundleInvalid(
            "manifest missing upstream.port".to_string(),
        ));
    }
    if manifest.gateway.gateway_id.is_none() && manifest.gateway.node_id.is_none() {
        return Err(FlowcError::BundleInvalid(
            "manifest gateway binding requires gatewayId or nodeId".to_string(),
        ));
    }
    if manifest.gateway.environment.is_empty() {
        return Err(FlowcError::BundleInvalid(
            "manifest gateway binding missing environment".to_string(),
        ));
    }

    if !explicit_api_type {
        match ApiType::detect_priority()
            .into_iter()
            .find(|t| candidates.iter().any(|c| c.api_type == *t))
        {
            Some(detected) => manifest.api_type = detected,
            None => warn!(name = %manifest.name, "no spec file present to auto-detect apiType from, defaulting to rest"),
        }
    }

    Ok(manifest)
}
