use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::check::PluginKind;
use crate::proc::{PluginState, Processor};
use crate::registry::Lv2Context;

/// Persisted form of a [`ControlGroup`]: link flags plus one state per
/// member instance.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GroupSettings {
    pub plugin_uri: String,
    pub link_all: bool,
    pub links: Vec<bool>,
    pub channels: Vec<PluginState>,
}

/// A bank of plugin instances covering a fixed host channel count.
///
/// A stereo plugin needs one instance for two host channels, a mono one
/// needs one per channel; the group instantiates until every channel is
/// covered and fans each cycle out across the members. Controls of the
/// members can be linked so they move together.
pub struct ControlGroup {
    uri: String,
    procs: Vec<Processor>,
    channels: usize,
    channels_per_proc: usize,
    plan: Vec<(usize, usize)>,
    link_all: bool,
    links: Vec<bool>,
}

impl ControlGroup {
    pub fn new(ctx: &Lv2Context, uri: &str, channels: usize) -> Result<Self, String> {
        if channels == 0 || channels % 2 != 0 {
            return Err(format!(
                "Channel count must be a positive multiple of two, got {channels}"
            ));
        }
        let first = Processor::new(ctx, uri)?;
        let plan = channel_plan(channels, first.host_channels());
        let channels_per_proc = plan[0].1;
        let mut procs = vec![first];
        while procs.len() < plan.len() {
            procs.push(Processor::new(ctx, uri)?);
        }
        debug!(uri, instances = procs.len(), channels, "control group built");

        let control_count = procs[0].controls().len();
        let mut group = Self {
            uri: uri.to_string(),
            procs,
            channels,
            channels_per_proc,
            plan,
            link_all: false,
            links: vec![false; control_count],
        };
        if group.procs.len() > 1 {
            group.set_link_all(true);
        }
        Ok(group)
    }

    pub fn uri(&self) -> &str {
        &self.uri
    }

    pub fn kind(&self) -> PluginKind {
        self.procs[0].kind()
    }

    pub fn channels(&self) -> usize {
        self.channels
    }

    pub fn channels_per_proc(&self) -> usize {
        self.channels_per_proc
    }

    pub fn procs(&self) -> &[Processor] {
        &self.procs
    }

    pub fn procs_mut(&mut self) -> &mut [Processor] {
        &mut self.procs
    }

    pub fn control_count(&self) -> usize {
        self.links.len()
    }

    pub fn link_all(&self) -> bool {
        self.link_all
    }

    pub fn is_linked(&self, index: usize) -> bool {
        self.links.get(index).copied().unwrap_or(false)
    }

    /// Links or unlinks one control across all members. Linking shares
    /// the first member's value cell; unlinking leaves each member at
    /// the value it currently shows. Unlinking anything clears the
    /// link-all flag.
    pub fn link_port(&mut self, index: usize, linked: bool) -> Result<(), String> {
        if index >= self.links.len() {
            return Err(format!(
                "Control index {index} out of range for '{}'",
                self.uri
            ));
        }
        if linked {
            let master = self.procs[0].controls()[index].model.clone();
            for proc in &mut self.procs[1..] {
                proc.controls_mut()[index].model.link_to(&master);
            }
        } else {
            self.link_all = false;
            for proc in &mut self.procs[1..] {
                proc.controls_mut()[index].model.unlink();
            }
        }
        self.links[index] = linked;
        Ok(())
    }

    pub fn set_link_all(&mut self, linked: bool) {
        for index in 0..self.links.len() {
            let _ = self.link_port(index, linked);
        }
        self.link_all = linked;
    }

    /// Sets a control on one member channel group; linked controls
    /// propagate to every member through the shared cell.
    pub fn set_control(&mut self, member: usize, symbol: &str, value: f32) -> Result<(), String> {
        let proc = self
            .procs
            .get_mut(member)
            .ok_or_else(|| format!("No member {member} in group '{}'", self.uri))?;
        proc.set_control(symbol, value)
    }

    pub fn control_value(&self, member: usize, symbol: &str) -> Option<f32> {
        self.procs
            .get(member)?
            .control(symbol)
            .map(|c| c.model.value())
    }

    /// One audio cycle over interleaved host buffers with `channels()`
    /// floats per frame. Per member: models, inputs, run, outputs,
    /// worker responses.
    pub fn run(&mut self, host_in: &[f32], host_out: &mut [f32], frames: usize) {
        let stride = self.channels;
        for (proc, &(offset, span)) in self.procs.iter_mut().zip(&self.plan) {
            proc.apply_models();
            proc.copy_from_host(host_in, offset, span, stride, frames);
            proc.run(frames);
            proc.copy_to_host(host_out, offset, span, stride, frames);
            proc.emit_responses();
        }
    }

    /// Rebuilds every member instance, carrying state across.
    pub fn reload(&mut self, ctx: &Lv2Context) -> Result<(), String> {
        let settings = self.save_settings();
        for proc in &mut self.procs {
            proc.reload(ctx)?;
        }
        self.apply_settings(&settings)
    }

    pub fn save_settings(&self) -> GroupSettings {
        GroupSettings {
            plugin_uri: self.uri.clone(),
            link_all: self.link_all,
            links: self.links.clone(),
            channels: self.procs.iter().map(Processor::snapshot).collect(),
        }
    }

    pub fn apply_settings(&mut self, settings: &GroupSettings) -> Result<(), String> {
        if !settings.plugin_uri.is_empty() && settings.plugin_uri != self.uri {
            return Err(format!(
                "Settings are for '{}', group hosts '{}'",
                settings.plugin_uri, self.uri
            ));
        }
        // Values first, then links: linking re-shares the first
        // member's cell, so linked controls end on its value.
        let last = settings.channels.last();
        for (i, proc) in self.procs.iter_mut().enumerate() {
            if let Some(state) = settings.channels.get(i).or(last) {
                proc.restore(state)?;
            }
        }
        for (index, linked) in settings.links.iter().enumerate() {
            if index >= self.links.len() {
                warn!(uri = %self.uri, index, "settings name more controls than the plugin has");
                break;
            }
            self.link_port(index, *linked)?;
        }
        self.link_all = settings.link_all;
        Ok(())
    }

    pub fn save_file(&self, path: &Path) -> Result<(), String> {
        let json = serde_json::to_string_pretty(&self.save_settings())
            .map_err(|e| format!("Failed to serialize settings: {e}"))?;
        std::fs::write(path, json).map_err(|e| format!("Failed to write {}: {e}", path.display()))
    }

    /// Loads either a single settings document or a preset directory
    /// with `chan0/`, `chan1/`, ... subdirectories each holding a state
    /// file for one member.
    pub fn load_file(&mut self, path: &Path) -> Result<(), String> {
        if path.is_dir() {
            let mut settings = self.save_settings();
            for (i, slot) in settings.channels.iter_mut().enumerate() {
                let chan = path.join(format!("chan{i}")).join(STATE_FILE);
                if !chan.exists() {
                    continue;
                }
                let json = std::fs::read_to_string(&chan)
                    .map_err(|e| format!("Failed to read {}: {e}", chan.display()))?;
                *slot = serde_json::from_str(&json)
                    .map_err(|e| format!("Malformed state in {}: {e}", chan.display()))?;
            }
            return self.apply_settings(&settings);
        }
        let json = std::fs::read_to_string(path)
            .map_err(|e| format!("Failed to read {}: {e}", path.display()))?;
        let settings: GroupSettings = serde_json::from_str(&json)
            .map_err(|e| format!("Malformed settings in {}: {e}", path.display()))?;
        self.apply_settings(&settings)
    }

    /// Writes one `chanN/` state directory per member into a preset
    /// directory.
    pub fn save_split(&self, dir: &Path) -> Result<(), String> {
        for (i, proc) in self.procs.iter().enumerate() {
            let chan_dir = dir.join(format!("chan{i}"));
            std::fs::create_dir_all(&chan_dir)
                .map_err(|e| format!("Failed to create {}: {e}", chan_dir.display()))?;
            let chan = chan_dir.join(STATE_FILE);
            let json = serde_json::to_string_pretty(&proc.snapshot())
                .map_err(|e| format!("Failed to serialize member {i}: {e}"))?;
            std::fs::write(&chan, json)
                .map_err(|e| format!("Failed to write {}: {e}", chan.display()))?;
        }
        Ok(())
    }
}

const STATE_FILE: &str = "state.json";

/// Channel coverage for a group: `(offset, span)` per member, where
/// `per_proc` is how many host channels one instance handles.
fn channel_plan(total: usize, per_proc: usize) -> Vec<(usize, usize)> {
    let per = per_proc.clamp(1, 2);
    let mut plan = Vec::new();
    let mut offset = 0;
    while offset < total {
        let span = per.min(total - offset);
        plan.push((offset, span));
        offset += span;
    }
    plan
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    #[test]
    fn stereo_plugin_covers_two_channels_per_member() {
        assert_eq!(channel_plan(2, 2), vec![(0, 2)]);
        assert_eq!(channel_plan(4, 2), vec![(0, 2), (2, 2)]);
    }

    #[test]
    fn mono_plugin_needs_one_member_per_channel() {
        assert_eq!(channel_plan(2, 1), vec![(0, 1), (1, 1)]);
        assert_eq!(channel_plan(4, 1), vec![(0, 1), (1, 1), (2, 1), (3, 1)]);
    }

    #[test]
    fn odd_remainder_gets_a_narrow_member() {
        assert_eq!(channel_plan(3, 2), vec![(0, 2), (2, 1)]);
    }

    #[test]
    fn settings_serialize_round_trip() {
        let mut controls = BTreeMap::new();
        controls.insert("gain".to_string(), 0.8);
        let settings = GroupSettings {
            plugin_uri: "urn:example:plugin".into(),
            link_all: true,
            links: vec![true, false],
            channels: vec![
                PluginState {
                    controls: controls.clone(),
                    properties: vec![],
                },
                PluginState {
                    controls,
                    properties: vec![],
                },
            ],
        };
        let json = serde_json::to_string(&settings).expect("serialize");
        let back: GroupSettings = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(back, settings);
    }
}
