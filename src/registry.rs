use std::sync::{Arc, Mutex};

use lilv::{World, node::Node, plugin::Plugin};
use tracing::{debug, info};

use crate::check::{Issue, PluginCheck, PluginKind, check_plugin};
use crate::features::BlockLengths;
use crate::proc::{describe_ports, plugin_feature_uris};
use crate::urid::{CommonUrids, UridMap};
use crate::worker::{LV2_WORKER__INTERFACE, WorkerMode};

/// URI nodes resolved once so the per-plugin paths never rebuild them.
pub struct UriNodes {
    pub input_port: Node,
    pub output_port: Node,
    pub audio_port: Node,
    pub control_port: Node,
    pub cv_port: Node,
    pub atom_port: Node,
    pub event_port: Node,
    pub connection_optional: Node,
    pub integer: Node,
    pub enumeration: Node,
    pub toggled: Node,
    pub worker_interface: Node,
}

impl UriNodes {
    fn resolve(world: &World) -> Self {
        Self {
            input_port: world.new_uri("http://lv2plug.in/ns/lv2core#InputPort"),
            output_port: world.new_uri("http://lv2plug.in/ns/lv2core#OutputPort"),
            audio_port: world.new_uri("http://lv2plug.in/ns/lv2core#AudioPort"),
            control_port: world.new_uri("http://lv2plug.in/ns/lv2core#ControlPort"),
            cv_port: world.new_uri("http://lv2plug.in/ns/lv2core#CVPort"),
            atom_port: world.new_uri("http://lv2plug.in/ns/ext/atom#AtomPort"),
            event_port: world.new_uri("http://lv2plug.in/ns/ext/event#EventPort"),
            connection_optional: world.new_uri("http://lv2plug.in/ns/lv2core#connectionOptional"),
            integer: world.new_uri("http://lv2plug.in/ns/lv2core#integer"),
            enumeration: world.new_uri("http://lv2plug.in/ns/lv2core#enumeration"),
            toggled: world.new_uri("http://lv2plug.in/ns/lv2core#toggled"),
            worker_interface: world.new_uri(LV2_WORKER__INTERFACE),
        }
    }
}

/// Discovery listing entry for one hostable plugin.
#[derive(Debug, Clone, PartialEq)]
pub struct PluginInfo {
    pub uri: String,
    pub name: String,
    pub class_label: String,
    pub kind: PluginKind,
    pub audio_inputs: usize,
    pub audio_outputs: usize,
    pub issues: Vec<Issue>,
}

/// Owns the lilv world and everything shared between plugin instances:
/// the URID map, resolved URI nodes, the work lock, and host settings.
/// There is exactly one per host; instances borrow it at construction.
pub struct Lv2Context {
    world: World,
    nodes: UriNodes,
    urid_map: Arc<UridMap>,
    urids: CommonUrids,
    work_lock: Arc<Mutex<()>>,
    sample_rate: f64,
    block_lengths: BlockLengths,
    worker_mode: WorkerMode,
}

impl Lv2Context {
    pub fn new(sample_rate: f64, block_lengths: BlockLengths, worker_mode: WorkerMode) -> Self {
        let world = World::new();
        world.load_all();
        let nodes = UriNodes::resolve(&world);
        let urid_map = Arc::new(UridMap::new());
        let urids = CommonUrids::resolve(&urid_map);
        info!(sample_rate, ?worker_mode, "LV2 world loaded");
        Self {
            world,
            nodes,
            urid_map,
            urids,
            work_lock: Arc::new(Mutex::new(())),
            sample_rate,
            block_lengths,
            worker_mode,
        }
    }

    pub fn with_defaults(sample_rate: f64) -> Self {
        Self::new(sample_rate, BlockLengths::default(), WorkerMode::Threaded)
    }

    pub fn world(&self) -> &World {
        &self.world
    }

    pub fn nodes(&self) -> &UriNodes {
        &self.nodes
    }

    pub fn urid_map(&self) -> &Arc<UridMap> {
        &self.urid_map
    }

    pub fn common_urids(&self) -> &CommonUrids {
        &self.urids
    }

    pub fn work_lock(&self) -> &Arc<Mutex<()>> {
        &self.work_lock
    }

    pub fn sample_rate(&self) -> f64 {
        self.sample_rate
    }

    pub fn block_lengths(&self) -> BlockLengths {
        self.block_lengths
    }

    pub fn worker_mode(&self) -> WorkerMode {
        self.worker_mode
    }

    /// Inline workers suit offline rendering; new instances pick the
    /// mode up at construction.
    pub fn set_worker_mode(&mut self, mode: WorkerMode) {
        self.worker_mode = mode;
    }

    pub fn plugin_by_uri(&self, uri: &str) -> Option<Plugin> {
        let node = self.world.new_uri(uri);
        self.world.plugins().plugin(&node)
    }

    /// Runs the port and feature checks without instantiating.
    pub fn validate(&self, uri: &str) -> Result<PluginCheck, String> {
        let plugin = self
            .plugin_by_uri(uri)
            .ok_or_else(|| format!("Plugin not found for URI: {uri}"))?;
        if !plugin.verify() {
            return Err(format!("Plugin failed verification: {uri}"));
        }
        let descs = describe_ports(&plugin, &self.nodes);
        let required = plugin_feature_uris(&plugin);
        Ok(check_plugin(&descs, &required))
    }

    /// All installed plugins the host can actually run, sorted by URI.
    /// Plugins with blocking issues are filtered out; non-blocking
    /// issues ride along in the entry.
    pub fn list_plugins(&self) -> Vec<PluginInfo> {
        let mut infos: Vec<PluginInfo> = self
            .world
            .plugins()
            .iter()
            .filter(|plugin| plugin.verify())
            .filter_map(|plugin| {
                let uri = plugin.uri().as_uri()?.to_string();
                let descs = describe_ports(&plugin, &self.nodes);
                let required = plugin_feature_uris(&plugin);
                let check = check_plugin(&descs, &required);
                if check.is_blocked() {
                    debug!(%uri, issues = ?check.issues, "plugin not hostable");
                    return None;
                }
                let name = plugin.name().as_str().unwrap_or(&uri).to_string();
                let class_label = plugin
                    .class()
                    .label()
                    .as_str()
                    .unwrap_or("Unknown")
                    .to_string();
                Some(PluginInfo {
                    uri,
                    name,
                    class_label,
                    kind: check.kind,
                    audio_inputs: check.audio_inputs,
                    audio_outputs: check.audio_outputs,
                    issues: check.issues,
                })
            })
            .collect();
        infos.sort_by(|a, b| a.uri.cmp(&b.uri));
        infos
    }
}

impl std::fmt::Debug for Lv2Context {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Lv2Context")
            .field("sample_rate", &self.sample_rate)
            .field("worker_mode", &self.worker_mode)
            .finish()
    }
}
