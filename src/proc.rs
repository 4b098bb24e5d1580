use std::collections::{BTreeMap, HashMap};
use std::os::raw::c_void;
use std::ptr;

use lilv::{instance::ActiveInstance, plugin::Plugin};
use lv2_raw::LV2Feature;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::check::{
    PluginCheck, PluginKind, PortDesc, PortFlow, PortKind, check_plugin, classify_port,
};
use crate::features::InstanceFeatures;
use crate::models::{Control, Model};
use crate::ports::{
    Port, StereoPortRef, assign_stereo_slots, copy_buffers_from_host, copy_buffers_to_host,
};
use crate::registry::{Lv2Context, UriNodes};
use crate::sync::UnsafeMutex;
use crate::worker::{
    LV2_WORKER__INTERFACE, LV2_WORKER_ERR_NO_SPACE, LV2_WORKER_ERR_UNKNOWN, LV2_WORKER_SUCCESS,
    Lv2WorkerInterface, Lv2WorkerRespondFunc, Lv2WorkerStatus, Responder, WorkHandler, Worker,
    worker_respond_callback,
};

type Lv2Handle = *mut c_void;
type Lv2StateHandle = *mut c_void;
type Lv2StateStatus = u32;
const LV2_STATE_STATUS_SUCCESS: Lv2StateStatus = 0;
const LV2_STATE_STATUS_ERR_NO_PROPERTY: Lv2StateStatus = 5;
const LV2_STATE__INTERFACE: &str = "http://lv2plug.in/ns/ext/state#interface";

type Lv2StateStoreFn = Option<
    unsafe extern "C" fn(
        handle: Lv2StateHandle,
        key: u32,
        value: *const c_void,
        size: usize,
        type_: u32,
        flags: u32,
    ) -> Lv2StateStatus,
>;
type Lv2StateRetrieveFn = Option<
    unsafe extern "C" fn(
        handle: Lv2StateHandle,
        key: u32,
        size: *mut usize,
        type_: *mut u32,
        flags: *mut u32,
    ) -> *const c_void,
>;

#[repr(C)]
struct Lv2StateInterface {
    save: Option<
        unsafe extern "C" fn(
            instance: Lv2Handle,
            store: Lv2StateStoreFn,
            handle: Lv2StateHandle,
            flags: u32,
            features: *const *const LV2Feature,
        ) -> Lv2StateStatus,
    >,
    restore: Option<
        unsafe extern "C" fn(
            instance: Lv2Handle,
            retrieve: Lv2StateRetrieveFn,
            handle: Lv2StateHandle,
            flags: u32,
            features: *const *const LV2Feature,
        ) -> Lv2StateStatus,
    >,
}

/// One key/value pair from the plugin's state interface, with the URIDs
/// unmapped so the snapshot survives across processes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateProperty {
    pub key: String,
    pub type_uri: String,
    pub flags: u32,
    pub value: Vec<u8>,
}

/// Serializable snapshot of one plugin instance: control values by port
/// symbol plus whatever the plugin stores through `state:interface`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PluginState {
    pub controls: BTreeMap<String, f32>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub properties: Vec<StateProperty>,
}

#[derive(Debug, Clone)]
struct RawStateProperty {
    key: u32,
    type_: u32,
    flags: u32,
    value: Vec<u8>,
}

struct StateSaveContext {
    properties: Vec<RawStateProperty>,
}

struct StateRestoreContext {
    properties: Vec<RawStateProperty>,
    by_key: HashMap<u32, usize>,
}

extern "C" fn state_store_callback(
    handle: Lv2StateHandle,
    key: u32,
    value: *const c_void,
    size: usize,
    type_: u32,
    flags: u32,
) -> Lv2StateStatus {
    if handle.is_null() || value.is_null() || size == 0 {
        return LV2_STATE_STATUS_ERR_NO_PROPERTY;
    }
    let ctx = unsafe { &mut *(handle as *mut StateSaveContext) };
    let bytes = unsafe { std::slice::from_raw_parts(value.cast::<u8>(), size) };
    ctx.properties.push(RawStateProperty {
        key,
        type_,
        flags,
        value: bytes.to_vec(),
    });
    LV2_STATE_STATUS_SUCCESS
}

extern "C" fn state_retrieve_callback(
    handle: Lv2StateHandle,
    key: u32,
    size: *mut usize,
    type_: *mut u32,
    flags: *mut u32,
) -> *const c_void {
    if handle.is_null() {
        return ptr::null();
    }
    let ctx = unsafe { &mut *(handle as *mut StateRestoreContext) };
    let Some(idx) = ctx.by_key.get(&key).copied() else {
        return ptr::null();
    };
    let Some(prop) = ctx.properties.get(idx) else {
        return ptr::null();
    };
    if !size.is_null() {
        unsafe {
            *size = prop.value.len();
        }
    }
    if !type_.is_null() {
        unsafe {
            *type_ = prop.type_;
        }
    }
    if !flags.is_null() {
        unsafe {
            *flags = prop.flags;
        }
    }
    prop.value.as_ptr().cast::<c_void>()
}

/// Handler that forwards worker jobs into the plugin's worker interface.
/// Copies of the raw pointers exist on both the scheduling side and the
/// worker thread; the work lock serializes the calls that need it.
#[derive(Clone, Copy)]
pub(crate) struct PluginWorkHandler {
    handle: Lv2Handle,
    work: Option<
        unsafe extern "C" fn(
            handle: Lv2Handle,
            respond: Lv2WorkerRespondFunc,
            respond_handle: *mut c_void,
            size: u32,
            data: *const c_void,
        ) -> Lv2WorkerStatus,
    >,
    work_response:
        Option<unsafe extern "C" fn(Lv2Handle, u32, *const c_void) -> Lv2WorkerStatus>,
    end_run: Option<unsafe extern "C" fn(Lv2Handle)>,
}

unsafe impl Send for PluginWorkHandler {}

impl WorkHandler for PluginWorkHandler {
    fn work(&mut self, responder: &mut Responder, data: &[u8]) -> Result<(), String> {
        let Some(work) = self.work else {
            return Ok(());
        };
        let data_ptr = if data.is_empty() {
            ptr::null()
        } else {
            data.as_ptr().cast::<c_void>()
        };
        let status = unsafe {
            work(
                self.handle,
                Some(worker_respond_callback),
                (responder as *mut Responder).cast::<c_void>(),
                data.len() as u32,
                data_ptr,
            )
        };
        if status == LV2_WORKER_SUCCESS {
            Ok(())
        } else {
            Err(format!("plugin work returned status {status}"))
        }
    }

    fn work_response(&mut self, data: &[u8]) -> Result<(), String> {
        let Some(work_response) = self.work_response else {
            return Ok(());
        };
        let status = unsafe {
            work_response(
                self.handle,
                data.len() as u32,
                data.as_ptr().cast::<c_void>(),
            )
        };
        if status == LV2_WORKER_SUCCESS {
            Ok(())
        } else {
            Err(format!("plugin work_response returned status {status}"))
        }
    }

    fn end_run(&mut self) {
        if let Some(end_run) = self.end_run {
            unsafe { end_run(self.handle) };
        }
    }
}

/// Trampoline behind the worker:schedule feature. The handle points at
/// the boxed worker cell owned by the processor.
pub(crate) unsafe extern "C" fn plugin_schedule_callback(
    handle: *mut c_void,
    size: u32,
    data: *const c_void,
) -> Lv2WorkerStatus {
    if handle.is_null() || size == 0 || data.is_null() {
        return LV2_WORKER_ERR_UNKNOWN;
    }
    let cell = unsafe { &*(handle as *const UnsafeMutex<Worker<PluginWorkHandler>>) };
    let bytes = unsafe { std::slice::from_raw_parts(data.cast::<u8>(), size as usize) };
    match cell.lock().schedule(bytes) {
        Ok(()) => LV2_WORKER_SUCCESS,
        Err(_) => LV2_WORKER_ERR_NO_SPACE,
    }
}

/// One hosted plugin instance with its bound ports and models.
pub struct Processor {
    uri: String,
    name: String,
    check: PluginCheck,
    ports: Vec<Port>,
    controls: Vec<Control>,
    inputs: StereoPortRef,
    outputs: StereoPortRef,
    worker: Option<Box<UnsafeMutex<Worker<PluginWorkHandler>>>>,
    instance: Option<ActiveInstance>,
    features: InstanceFeatures,
    max_frames: usize,
}

unsafe impl Send for Processor {}

impl std::fmt::Debug for Processor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Processor")
            .field("uri", &self.uri)
            .field("audio_inputs", &self.check.audio_inputs)
            .field("audio_outputs", &self.check.audio_outputs)
            .finish()
    }
}

impl Processor {
    pub fn new(ctx: &Lv2Context, uri: &str) -> Result<Self, String> {
        let plugin = ctx
            .plugin_by_uri(uri)
            .ok_or_else(|| format!("Plugin not found for URI: {uri}"))?;
        if !plugin.verify() {
            return Err(format!("Plugin failed verification: {uri}"));
        }

        let descs = describe_ports(&plugin, ctx.nodes());
        let required = plugin_feature_uris(&plugin);
        let check = check_plugin(&descs, &required);
        if check.is_blocked() {
            let summary = check
                .issues
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join("; ");
            return Err(format!("Cannot host '{uri}': {summary}"));
        }
        for issue in &check.issues {
            debug!(%uri, %issue, "port issue");
        }

        let mut features = InstanceFeatures::build(
            ctx.urid_map().clone(),
            ctx.block_lengths(),
            plugin_schedule_callback,
        )?;
        let instance = {
            let feature_refs = features.features();
            unsafe { plugin.instantiate(ctx.sample_rate(), feature_refs) }
        }
        .ok_or_else(|| {
            if required.is_empty() {
                format!("Failed to instantiate '{uri}'")
            } else {
                format!(
                    "Failed to instantiate '{uri}'. Required features: {}",
                    required.join(", ")
                )
            }
        })?;

        let max_frames = ctx.block_lengths().max as usize;
        let mut ports = Vec::with_capacity(descs.len());
        let mut controls = Vec::new();
        for desc in &descs {
            let (meta, _) = classify_port(desc);
            let takes_model = matches!(meta.kind, PortKind::Control | PortKind::Cv);
            if takes_model && meta.flow == PortFlow::Input && meta.used {
                controls.push(Control {
                    symbol: meta.symbol.clone(),
                    name: meta.name.clone(),
                    port_slot: ports.len(),
                    model: Model::for_port(&meta),
                });
            }
            ports.push(Port::from_meta(meta, max_frames));
        }
        let (inputs, outputs) = assign_stereo_slots(&ports);

        let active = unsafe { instance.activate() };

        let worker = if plugin.has_extension_data(&ctx.nodes().worker_interface) {
            let iface = unsafe {
                active
                    .instance()
                    .extension_data::<Lv2WorkerInterface>(LV2_WORKER__INTERFACE)
            };
            iface.map(|ptr| {
                let iface = unsafe { ptr.as_ref() };
                let handler = PluginWorkHandler {
                    handle: active.instance().handle() as Lv2Handle,
                    work: iface.work,
                    work_response: iface.work_response,
                    end_run: iface.end_run,
                };
                Box::new(UnsafeMutex::new(Worker::new(
                    handler,
                    ctx.worker_mode(),
                    ctx.work_lock().clone(),
                )))
            })
        } else {
            None
        };
        if let Some(worker) = &worker {
            let handle = &**worker as *const UnsafeMutex<Worker<PluginWorkHandler>>;
            features.set_worker_handle(handle.cast_mut().cast::<c_void>());
        }

        let name = plugin
            .name()
            .as_str()
            .map(str::to_string)
            .unwrap_or_else(|| uri.to_string());
        let mut proc = Self {
            uri: uri.to_string(),
            name,
            check,
            ports,
            controls,
            inputs,
            outputs,
            worker,
            instance: Some(active),
            features,
            max_frames,
        };
        proc.connect_ports();
        Ok(proc)
    }

    pub fn uri(&self) -> &str {
        &self.uri
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> PluginKind {
        self.check.kind
    }

    pub fn check(&self) -> &PluginCheck {
        &self.check
    }

    pub fn audio_input_count(&self) -> usize {
        self.check.audio_inputs
    }

    pub fn audio_output_count(&self) -> usize {
        self.check.audio_outputs
    }

    /// Host channels this instance covers, per the wider of its two
    /// sides. Always at least one.
    pub fn host_channels(&self) -> usize {
        host_channel_count(self.inputs, self.outputs)
    }

    pub fn max_frames(&self) -> usize {
        self.max_frames
    }

    pub fn controls(&self) -> &[Control] {
        &self.controls
    }

    pub fn controls_mut(&mut self) -> &mut [Control] {
        &mut self.controls
    }

    pub fn control(&self, symbol: &str) -> Option<&Control> {
        self.controls.iter().find(|c| c.symbol == symbol)
    }

    pub fn set_control(&mut self, symbol: &str, value: f32) -> Result<(), String> {
        let Some(control) = self.controls.iter().find(|c| c.symbol == symbol) else {
            return Err(format!(
                "Unknown control port '{symbol}' on '{}'",
                self.uri
            ));
        };
        control.model.set_value(value);
        Ok(())
    }

    /// Fills this instance's audio inputs from an interleaved host
    /// buffer, reading `span` host channels starting at `offset`.
    pub fn copy_from_host(
        &mut self,
        host: &[f32],
        offset: usize,
        span: usize,
        stride: usize,
        frames: usize,
    ) {
        copy_buffers_from_host(
            &mut self.ports,
            self.inputs,
            host,
            offset,
            span,
            stride,
            frames.min(self.max_frames),
        );
    }

    pub fn copy_to_host(
        &self,
        host: &mut [f32],
        offset: usize,
        span: usize,
        stride: usize,
        frames: usize,
    ) {
        copy_buffers_to_host(
            &self.ports,
            self.outputs,
            host,
            offset,
            span,
            stride,
            frames.min(self.max_frames),
        );
    }

    /// Runs the plugin for one cycle. Model values and input buffers
    /// must already be in place; call [`Processor::emit_responses`]
    /// after the outputs are copied out.
    pub fn run(&mut self, frames: usize) {
        let frames = frames.min(self.max_frames);
        if let Some(instance) = self.instance.as_mut() {
            unsafe {
                instance.run(frames);
            }
        }
    }

    /// Drains worker responses into the plugin and ends the cycle.
    pub fn emit_responses(&mut self) {
        if let Some(worker) = self.worker.as_ref() {
            worker.lock().emit_responses();
        }
    }

    /// Pushes the current model values into the bound control cells and
    /// CV buffers.
    pub fn apply_models(&mut self) {
        for control in &self.controls {
            match &mut self.ports[control.port_slot] {
                Port::Control(port) => *port.value = control.model.value(),
                // CV inputs get the scalar broadcast over the cycle.
                Port::Cv(port) => port.buf.fill(control.model.value()),
                _ => {}
            }
        }
    }

    fn connect_ports(&mut self) {
        let Some(instance) = self.instance.as_mut() else {
            return;
        };
        for port in self.ports.iter_mut() {
            let index = port.meta().index;
            let ptr = port.data_ptr();
            unsafe {
                instance.instance_mut().connect_port_mut(index, ptr);
            }
        }
    }

    pub fn snapshot(&self) -> PluginState {
        let mut state = PluginState {
            controls: self
                .controls
                .iter()
                .map(|c| (c.symbol.clone(), c.model.value()))
                .collect(),
            properties: vec![],
        };
        let Some(interface) = self.state_interface() else {
            return state;
        };
        let Some(save_fn) = interface.save else {
            return state;
        };

        let mut ctx = StateSaveContext { properties: vec![] };
        let features = self.state_feature_ptrs();
        let status = unsafe {
            save_fn(
                self.instance_handle(),
                Some(state_store_callback),
                (&mut ctx as *mut StateSaveContext).cast::<c_void>(),
                0,
                features.as_ptr(),
            )
        };
        if status != LV2_STATE_STATUS_SUCCESS {
            warn!(uri = %self.uri, status, "state save failed");
            return state;
        }

        let map = self.features.urid().urid_map();
        state.properties = ctx
            .properties
            .into_iter()
            .filter_map(|p| {
                Some(StateProperty {
                    key: map.unmap(p.key)?,
                    type_uri: map.unmap(p.type_)?,
                    flags: p.flags,
                    value: p.value,
                })
            })
            .collect();
        state
    }

    pub fn restore(&mut self, state: &PluginState) -> Result<(), String> {
        for (symbol, value) in &state.controls {
            if self.set_control(symbol, *value).is_err() {
                warn!(uri = %self.uri, %symbol, "snapshot names a control this plugin lacks");
            }
        }
        if state.properties.is_empty() {
            return Ok(());
        }
        let Some(interface) = self.state_interface() else {
            return Ok(());
        };
        let Some(restore_fn) = interface.restore else {
            return Ok(());
        };

        let map = self.features.urid().urid_map().clone();
        let mut properties: Vec<RawStateProperty> = vec![];
        let mut by_key: HashMap<u32, usize> = HashMap::new();
        for prop in &state.properties {
            let key = map.map(&prop.key);
            let type_ = map.map(&prop.type_uri);
            if key == 0 || type_ == 0 {
                continue;
            }
            by_key.insert(key, properties.len());
            properties.push(RawStateProperty {
                key,
                type_,
                flags: prop.flags,
                value: prop.value.clone(),
            });
        }
        let mut ctx = StateRestoreContext { properties, by_key };
        let features = self.state_feature_ptrs();

        let status = unsafe {
            restore_fn(
                self.instance_handle(),
                Some(state_retrieve_callback),
                (&mut ctx as *mut StateRestoreContext).cast::<c_void>(),
                0,
                features.as_ptr(),
            )
        };
        if status == LV2_STATE_STATUS_SUCCESS {
            Ok(())
        } else {
            Err(format!(
                "State restore failed for '{}': status {status}",
                self.uri
            ))
        }
    }

    /// Replaces this instance with a freshly instantiated one carrying
    /// the same state. Exclusive access guarantees no cycle is running.
    pub fn reload(&mut self, ctx: &Lv2Context) -> Result<(), String> {
        let state = self.snapshot();
        let mut fresh = Processor::new(ctx, &self.uri)?;
        fresh.restore(&state)?;
        *self = fresh;
        Ok(())
    }

    fn state_interface(&self) -> Option<&Lv2StateInterface> {
        let instance = self.instance.as_ref()?;
        let ptr = unsafe {
            instance
                .instance()
                .extension_data::<Lv2StateInterface>(LV2_STATE__INTERFACE)?
        };
        Some(unsafe { ptr.as_ref() })
    }

    fn instance_handle(&self) -> Lv2Handle {
        self.instance
            .as_ref()
            .map(|i| i.instance().handle() as Lv2Handle)
            .unwrap_or(ptr::null_mut())
    }

    fn state_feature_ptrs(&self) -> [*const LV2Feature; 3] {
        [
            self.features.urid().map_feature() as *const LV2Feature,
            self.features.urid().unmap_feature() as *const LV2Feature,
            ptr::null(),
        ]
    }
}

impl Drop for Processor {
    fn drop(&mut self) {
        // Worker first: its thread may still call into the instance.
        self.worker = None;
        if let Some(active) = self.instance.take() {
            let _ = unsafe { active.deactivate() };
        }
    }
}

pub(crate) fn host_channel_count(inputs: StereoPortRef, outputs: StereoPortRef) -> usize {
    fn side(r: StereoPortRef) -> usize {
        r.left.is_some() as usize + r.right.is_some() as usize
    }
    side(inputs).max(side(outputs)).max(1)
}

pub(crate) fn plugin_feature_uris(plugin: &Plugin) -> Vec<String> {
    plugin
        .required_features()
        .iter()
        .filter_map(|feature| {
            feature
                .as_uri()
                .map(str::to_string)
                .or_else(|| feature.as_str().map(str::to_string))
        })
        .collect()
}

pub(crate) fn describe_ports(plugin: &Plugin, nodes: &UriNodes) -> Vec<PortDesc> {
    let mut descs = Vec::with_capacity(plugin.ports_count());
    for port in plugin.iter_ports() {
        let index = port.index();
        let range = port.range();
        let fallback = format!("port_{index}");
        let symbol = port
            .symbol()
            .and_then(|node| node.as_str().map(str::to_string))
            .unwrap_or_else(|| fallback.clone());
        let name = port
            .name()
            .and_then(|node| node.as_str().map(str::to_string))
            .unwrap_or(fallback);
        descs.push(PortDesc {
            index,
            symbol,
            name,
            is_input: port.is_a(&nodes.input_port),
            is_output: port.is_a(&nodes.output_port),
            is_control: port.is_a(&nodes.control_port),
            is_audio: port.is_a(&nodes.audio_port),
            is_cv: port.is_a(&nodes.cv_port),
            is_event: port.is_a(&nodes.atom_port) || port.is_a(&nodes.event_port),
            optional: port.has_property(&nodes.connection_optional),
            integer: port.has_property(&nodes.integer),
            enumeration: port.has_property(&nodes.enumeration),
            toggled: port.has_property(&nodes.toggled),
            default: range.default.and_then(|node| node.as_float()),
            minimum: range.minimum.and_then(|node| node.as_float()),
            maximum: range.maximum.and_then(|node| node.as_float()),
        });
    }
    descs
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plugin_state_serializes_round_trip() {
        let mut state = PluginState::default();
        state.controls.insert("gain".into(), 0.5);
        state.controls.insert("freq".into(), 440.0);
        state.properties.push(StateProperty {
            key: "urn:example:blob".into(),
            type_uri: "http://lv2plug.in/ns/ext/atom#Chunk".into(),
            flags: 0,
            value: vec![1, 2, 3],
        });
        let json = serde_json::to_string(&state).expect("serialize");
        let back: PluginState = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(back, state);
    }

    #[test]
    fn plugin_state_without_properties_omits_the_field() {
        let mut state = PluginState::default();
        state.controls.insert("gain".into(), 1.0);
        let json = serde_json::to_string(&state).expect("serialize");
        assert!(!json.contains("properties"));
    }

    #[test]
    fn schedule_callback_rejects_null_handle() {
        let status = unsafe { plugin_schedule_callback(ptr::null_mut(), 0, ptr::null()) };
        assert_eq!(status, LV2_WORKER_ERR_UNKNOWN);
    }

    #[test]
    fn schedule_callback_rejects_null_data_with_size() {
        let marker = 0u8;
        let status = unsafe {
            plugin_schedule_callback((&marker as *const u8).cast_mut().cast(), 4, ptr::null())
        };
        assert_eq!(status, LV2_WORKER_ERR_UNKNOWN);
    }

    #[test]
    fn state_callbacks_round_trip_properties() {
        let mut save = StateSaveContext { properties: vec![] };
        let payload = [7u8, 8, 9];
        let status = state_store_callback(
            (&mut save as *mut StateSaveContext).cast::<c_void>(),
            11,
            payload.as_ptr().cast::<c_void>(),
            payload.len(),
            22,
            1,
        );
        assert_eq!(status, LV2_STATE_STATUS_SUCCESS);
        assert_eq!(save.properties.len(), 1);

        let mut by_key = HashMap::new();
        by_key.insert(11, 0);
        let mut restore = StateRestoreContext {
            properties: save.properties,
            by_key,
        };
        let mut size = 0usize;
        let mut type_ = 0u32;
        let mut flags = 0u32;
        let value = state_retrieve_callback(
            (&mut restore as *mut StateRestoreContext).cast::<c_void>(),
            11,
            &mut size,
            &mut type_,
            &mut flags,
        );
        assert!(!value.is_null());
        assert_eq!((size, type_, flags), (3, 22, 1));
        let bytes = unsafe { std::slice::from_raw_parts(value.cast::<u8>(), size) };
        assert_eq!(bytes, &payload);

        let missing = state_retrieve_callback(
            (&mut restore as *mut StateRestoreContext).cast::<c_void>(),
            99,
            ptr::null_mut(),
            ptr::null_mut(),
            ptr::null_mut(),
        );
        assert!(missing.is_null());
    }

    #[test]
    fn store_callback_rejects_empty_values() {
        let mut save = StateSaveContext { properties: vec![] };
        let status = state_store_callback(
            (&mut save as *mut StateSaveContext).cast::<c_void>(),
            11,
            ptr::null(),
            0,
            22,
            0,
        );
        assert_eq!(status, LV2_STATE_STATUS_ERR_NO_PROPERTY);
    }

    #[test]
    fn channel_consumption_takes_the_wider_side() {
        let stereo = StereoPortRef {
            left: Some(0),
            right: Some(1),
        };
        let mono = StereoPortRef {
            left: Some(0),
            right: None,
        };
        let none = StereoPortRef::default();
        assert_eq!(host_channel_count(stereo, stereo), 2);
        assert_eq!(host_channel_count(mono, stereo), 2);
        assert_eq!(host_channel_count(mono, mono), 1);
        assert_eq!(host_channel_count(none, stereo), 2);
        assert_eq!(host_channel_count(none, none), 1);
    }
}
