use arc_swap::ArcSwap;
use dashmap::DashMap;
use flowc_core::resource::{Cluster, Endpoint, ProxyListener, ResourceBundle, RouteConfiguration, SnapshotTuple};
use std::sync::Arc;
use tracing::info;

/// A bulk, atomic mutation applied to one node's snapshot. All additions
/// and removals take effect together under a single version bump.
#[derive(Debug, Clone, Default)]
pub struct BulkUpdate {
    pub add_listeners: Vec<ProxyListener>,
    pub add_routes: Vec<RouteConfiguration>,
    pub add_clusters: Vec<Cluster>,
    pub add_endpoints: Vec<Endpoint>,
    pub remove_listener_names: Vec<String>,
    pub remove_route_names: Vec<String>,
    pub remove_cluster_names: Vec<String>,
    pub remove_endpoint_keys: Vec<(String, String, u16)>,
}

/// Per-`nodeId` versioned resource cache, the boundary the (external)
/// proxy transport reads through. No partial snapshot is ever observable:
/// every mutation replaces the whole tuple with `ArcSwap::store`, and the
/// version is strictly monotonic per node, mirroring the compiled-router
/// swap pattern used for the hot-path route table.
pub struct SnapshotCache {
    nodes: DashMap<String, Arc<ArcSwap<SnapshotTuple>>>,
}

impl SnapshotCache {
    pub fn new() -> Self {
        Self {
            nodes: DashMap::new(),
        }
    }

    /// Current snapshot for a node, or `None` if the node has never been
    /// published to (or has been removed).
    pub fn get(&self, node_id: &str) -> Option<SnapshotTuple> {
        self.nodes.get(node_id).map(|slot| (**slot.load()).clone())
    }

    /// Overlay a deployment's resource bundle onto the node's current
    /// snapshot and bump the version once.
    pub fn deploy_api(&self, node_id: &str, bundle: &ResourceBundle) {
        self.mutate(node_id, |tuple| {
            for listener in &bundle.listeners {
                upsert(&mut tuple.listeners, listener.clone(), |l| &l.name);
            }
            for route in &bundle.routes {
                merge_route_configuration(&mut tuple.routes, route.clone());
            }
            for cluster in &bundle.clusters {
                upsert(&mut tuple.clusters, cluster.clone(), |c| &c.name);
            }
            for endpoint in &bundle.endpoints {
                upsert_endpoint(&mut tuple.endpoints, endpoint.clone());
            }
        });
        info!(node_id, "snapshot updated via deployAPI");
    }

    /// Apply a batch of additions and removals atomically, bumping the
    /// version exactly once regardless of how many resources changed.
    pub fn bulk_update(&self, node_id: &str, update: BulkUpdate) {
        self.mutate(node_id, |tuple| {
            tuple
                .listeners
                .retain(|l| !update.remove_listener_names.contains(&l.name));
            tuple
                .routes
                .retain(|r| !update.remove_route_names.contains(&r.name));
            tuple
                .clusters
                .retain(|c| !update.remove_cluster_names.contains(&c.name));
            tuple.endpoints.retain(|e| {
                !update
                    .remove_endpoint_keys
                    .iter()
                    .any(|(cluster, host, port)| {
                        &e.cluster_name == cluster && &e.host == host && e.port == *port
                    })
            });

            for listener in update.add_listeners.iter().cloned() {
                upsert(&mut tuple.listeners, listener, |l| &l.name);
            }
            for route in update.add_routes.iter().cloned() {
                upsert(&mut tuple.routes, route, |r| &r.name);
            }
            for cluster in update.add_clusters.iter().cloned() {
                upsert(&mut tuple.clusters, cluster, |c| &c.name);
            }
            for endpoint in update.add_endpoints.iter().cloned() {
                upsert_endpoint(&mut tuple.endpoints, endpoint);
            }
        });
        info!(node_id, "snapshot bulk-updated");
    }

    /// Convenience for single-listener regeneration, e.g. after an
    /// environment is added to a listener.
    pub fn add_listener(&self, node_id: &str, name: &str, listener: ProxyListener) {
        debug_assert_eq!(listener.name, name);
        self.mutate(node_id, |tuple| {
            upsert(&mut tuple.listeners, listener.clone(), |l| &l.name);
        });
    }

    /// Drop the entire entry for a node, e.g. on gateway delete.
    pub fn remove_node(&self, node_id: &str) {
        self.nodes.remove(node_id);
        info!(node_id, "snapshot entry removed");
    }

    fn mutate(&self, node_id: &str, f: impl FnOnce(&mut SnapshotTuple)) {
        let slot = self
            .nodes
            .entry(node_id.to_string())
            .or_insert_with(|| Arc::new(ArcSwap::new(Arc::new(SnapshotTuple::default()))))
            .clone();
        let current = slot.load();
        let mut next = (**current).clone();
        f(&mut next);
        next.version = current.version + 1;
        slot.store(Arc::new(next));
    }
}

impl Default for SnapshotCache {
    fn default() -> Self {
        Self::new()
    }
}

/// Merges a deployment's route configuration into the node's existing one
/// of the same name, rather than replacing it outright: deployment routes
/// are *added into* the environment's route configuration (§4.3), so a
/// second deployment under the same environment must not erase the first.
fn merge_route_configuration(configs: &mut Vec<RouteConfiguration>, incoming: RouteConfiguration) {
    match configs.iter_mut().find(|c| c.name == incoming.name) {
        Some(existing) => {
            for incoming_vh in incoming.virtual_hosts {
                match existing.virtual_hosts.iter_mut().find(|vh| vh.name == incoming_vh.name) {
                    Some(existing_vh) => {
                        for route in incoming_vh.routes {
                            upsert(&mut existing_vh.routes, route, |r| &r.path_prefix);
                        }
                    }
                    None => existing.virtual_hosts.push(incoming_vh),
                }
            }
        }
        None => configs.push(incoming),
    }
}

fn upsert<T: Clone>(items: &mut Vec<T>, item: T, key: impl Fn(&T) -> &String) {
    let new_key = key(&item).clone();
    if let Some(existing) = items.iter_mut().find(|existing| key(existing) == &new_key) {
        *existing = item;
    } else {
        items.push(item);
    }
}

fn upsert_endpoint(items: &mut Vec<Endpoint>, item: Endpoint) {
    if let Some(existing) = items
        .iter_mut()
        .find(|e| e.cluster_name == item.cluster_name && e.host == item.host && e.port == item.port)
    {
        *existing = item;
    } else {
        items.push(item);
    }
}
