use std::fmt;

/// Direction of a port as declared by the plugin.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PortFlow {
    Unknown,
    Input,
    Output,
}

/// Data carried by a port. All LV2 port data is float-based; this is the
/// connection-point kind, not a sample format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PortKind {
    Unknown,
    Control,
    Audio,
    Event,
    Cv,
}

/// Visualization hint for control ports, derived from declared boolean
/// properties in priority order: integer > enumeration > toggled > none.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PortVis {
    None,
    Integer,
    Enumeration,
    Toggled,
}

/// Declared facts about one port, as read from the plugin description.
///
/// This is the classifier's only input; it can be filled from lilv
/// introspection or constructed directly.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PortDesc {
    pub index: usize,
    pub symbol: String,
    pub name: String,
    pub is_input: bool,
    pub is_output: bool,
    pub is_control: bool,
    pub is_audio: bool,
    pub is_cv: bool,
    pub is_event: bool,
    pub optional: bool,
    pub integer: bool,
    pub enumeration: bool,
    pub toggled: bool,
    pub default: Option<f32>,
    pub minimum: Option<f32>,
    pub maximum: Option<f32>,
}

/// Typed per-port metadata produced by classification. Immutable after
/// plugin-instance construction.
#[derive(Debug, Clone, PartialEq)]
pub struct PortMeta {
    pub index: usize,
    pub symbol: String,
    pub name: String,
    pub flow: PortFlow,
    pub kind: PortKind,
    pub vis: PortVis,
    pub def: f32,
    pub min: f32,
    pub max: f32,
    pub optional: bool,
    pub used: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IssueKind {
    UnknownPortFlow,
    UnknownPortType,
    /// Port type recognized but not supported (CV, event).
    BadPortType,
    PortHasNoDefault,
    PortHasNoMin,
    PortHasNoMax,
    TooManyInputChannels,
    TooManyOutputChannels,
    NoOutputChannel,
    NoMonoSupport,
    FeatureNotSupported,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Issue {
    pub kind: IssueKind,
    pub info: String,
}

impl Issue {
    pub fn new(kind: IssueKind, info: impl Into<String>) -> Self {
        Self {
            kind,
            info: info.into(),
        }
    }
}

impl fmt::Display for Issue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.info.is_empty() {
            write!(f, "{:?}", self.kind)
        } else {
            write!(f, "{:?}: {}", self.kind, self.info)
        }
    }
}

/// Overall plugin classification after the whole-plugin check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PluginKind {
    /// Channel layout the host cannot use.
    Undefined,
    Effect,
    Instrument,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PluginCheck {
    pub kind: PluginKind,
    pub audio_inputs: usize,
    pub audio_outputs: usize,
    pub issues: Vec<Issue>,
}

impl PluginCheck {
    pub fn is_blocked(&self) -> bool {
        self.issues.iter().any(|issue| {
            matches!(
                issue.kind,
                IssueKind::TooManyInputChannels
                    | IssueKind::TooManyOutputChannels
                    | IssueKind::FeatureNotSupported
            )
        })
    }
}

/// Features this host provides at instantiation time.
pub const HOST_SUPPORTED_FEATURES: &[&str] = &[
    "http://lv2plug.in/ns/ext/urid#map",
    "http://lv2plug.in/ns/ext/urid#unmap",
    "http://lv2plug.in/ns/ext/worker#schedule",
    "http://lv2plug.in/ns/ext/options#options",
    "http://lv2plug.in/ns/ext/buf-size#boundedBlockLength",
];

/// Classifies one port: best-effort, deterministic, collects every issue
/// in a single pass instead of aborting on the first.
pub fn classify_port(desc: &PortDesc) -> (PortMeta, Vec<Issue>) {
    let mut issues = Vec::new();
    let mut used = true;

    let flow = if desc.is_input {
        PortFlow::Input
    } else if desc.is_output {
        PortFlow::Output
    } else {
        if desc.optional {
            used = false;
        } else {
            issues.push(Issue::new(IssueKind::UnknownPortFlow, desc.symbol.as_str()));
        }
        PortFlow::Unknown
    };

    let kind = if desc.is_control {
        PortKind::Control
    } else if desc.is_audio {
        PortKind::Audio
    } else if desc.is_cv {
        issues.push(Issue::new(
            IssueKind::BadPortType,
            format!("cv port \"{}\" not supported", desc.symbol),
        ));
        PortKind::Cv
    } else if desc.is_event {
        used = false;
        if !desc.optional {
            issues.push(Issue::new(
                IssueKind::BadPortType,
                format!("event port \"{}\" not supported", desc.symbol),
            ));
        }
        PortKind::Event
    } else {
        if desc.optional {
            used = false;
        } else {
            issues.push(Issue::new(IssueKind::UnknownPortType, desc.symbol.as_str()));
        }
        PortKind::Unknown
    };

    let vis = if desc.integer {
        PortVis::Integer
    } else if desc.enumeration {
        PortVis::Enumeration
    } else if desc.toggled {
        PortVis::Toggled
    } else {
        PortVis::None
    };

    if kind == PortKind::Control && flow == PortFlow::Input {
        if desc.default.is_none() {
            issues.push(Issue::new(IssueKind::PortHasNoDefault, desc.symbol.as_str()));
        }
        // Toggled ports only need a default; 0/1 bounds are implied.
        if vis != PortVis::Toggled {
            if desc.minimum.is_none() {
                issues.push(Issue::new(IssueKind::PortHasNoMin, desc.symbol.as_str()));
            }
            if desc.maximum.is_none() {
                issues.push(Issue::new(IssueKind::PortHasNoMax, desc.symbol.as_str()));
            }
        }
    }

    let def = desc.default.unwrap_or(0.0);
    let mut min = desc.minimum.unwrap_or(0.0);
    let mut max = desc.maximum.unwrap_or(1.0);
    if vis == PortVis::Toggled && desc.minimum.is_none() && desc.maximum.is_none() {
        min = 0.0;
        max = 1.0;
    }
    if !matches!(min.partial_cmp(&max), Some(std::cmp::Ordering::Less)) {
        min = def - 1.0;
        max = def + 1.0;
    }

    let meta = PortMeta {
        index: desc.index,
        symbol: desc.symbol.clone(),
        name: desc.name.clone(),
        flow,
        kind,
        vis,
        def,
        min,
        max,
        optional: desc.optional,
        used,
    };
    (meta, issues)
}

/// Aggregates per-port classification into a whole-plugin verdict.
///
/// Pure: same descriptions and feature list always produce the same
/// result. Blocking issues exclude the plugin from discovery listings.
pub fn check_plugin(descs: &[PortDesc], required_features: &[String]) -> PluginCheck {
    let mut issues = Vec::new();
    let mut audio_inputs = 0usize;
    let mut audio_outputs = 0usize;

    for desc in descs {
        let (meta, mut port_issues) = classify_port(desc);
        issues.append(&mut port_issues);
        if meta.kind == PortKind::Audio {
            match meta.flow {
                PortFlow::Input => audio_inputs += 1,
                PortFlow::Output => audio_outputs += 1,
                PortFlow::Unknown => {}
            }
        }
    }

    if audio_inputs > 2 {
        issues.push(Issue::new(
            IssueKind::TooManyInputChannels,
            audio_inputs.to_string(),
        ));
    }
    if audio_outputs > 2 {
        issues.push(Issue::new(
            IssueKind::TooManyOutputChannels,
            audio_outputs.to_string(),
        ));
    }
    if audio_outputs == 0 {
        issues.push(Issue::new(IssueKind::NoOutputChannel, ""));
    }
    // Mono-to-mono only; 1x2 and 2x1 are handled by channel spreading.
    if audio_inputs == 1 && audio_outputs == 1 {
        issues.push(Issue::new(IssueKind::NoMonoSupport, ""));
    }
    for feature in required_features {
        if !HOST_SUPPORTED_FEATURES.contains(&feature.as_str()) {
            issues.push(Issue::new(IssueKind::FeatureNotSupported, feature.as_str()));
        }
    }

    let kind = if audio_inputs > 2 || audio_outputs > 2 {
        PluginKind::Undefined
    } else if audio_inputs > 0 {
        PluginKind::Effect
    } else {
        PluginKind::Instrument
    };

    PluginCheck {
        kind,
        audio_inputs,
        audio_outputs,
        issues,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn audio_port(index: usize, input: bool) -> PortDesc {
        PortDesc {
            index,
            symbol: format!("audio_{index}"),
            name: format!("Audio {index}"),
            is_input: input,
            is_output: !input,
            is_audio: true,
            ..Default::default()
        }
    }

    fn control_port(index: usize) -> PortDesc {
        PortDesc {
            index,
            symbol: format!("ctl_{index}"),
            name: format!("Control {index}"),
            is_input: true,
            is_control: true,
            default: Some(0.5),
            minimum: Some(0.0),
            maximum: Some(1.0),
            ..Default::default()
        }
    }

    #[test]
    fn classification_is_deterministic() {
        let desc = control_port(3);
        let first = classify_port(&desc);
        let second = classify_port(&desc);
        assert_eq!(first, second);
    }

    #[test]
    fn control_port_reads_range() {
        let (meta, issues) = classify_port(&control_port(0));
        assert!(issues.is_empty());
        assert_eq!(meta.flow, PortFlow::Input);
        assert_eq!(meta.kind, PortKind::Control);
        assert_eq!(meta.vis, PortVis::None);
        assert_eq!((meta.def, meta.min, meta.max), (0.5, 0.0, 1.0));
        assert!(meta.used);
    }

    #[test]
    fn missing_range_values_are_each_flagged() {
        let mut desc = control_port(0);
        desc.default = None;
        desc.minimum = None;
        desc.maximum = None;
        let (_, issues) = classify_port(&desc);
        let kinds: Vec<IssueKind> = issues.iter().map(|i| i.kind).collect();
        assert_eq!(
            kinds,
            vec![
                IssueKind::PortHasNoDefault,
                IssueKind::PortHasNoMin,
                IssueKind::PortHasNoMax,
            ]
        );
    }

    #[test]
    fn toggled_port_only_requires_default() {
        let mut desc = control_port(0);
        desc.toggled = true;
        desc.minimum = None;
        desc.maximum = None;
        desc.default = Some(1.0);
        let (meta, issues) = classify_port(&desc);
        assert!(issues.is_empty());
        assert_eq!(meta.vis, PortVis::Toggled);
        assert_eq!((meta.min, meta.max), (0.0, 1.0));
    }

    #[test]
    fn vis_priority_is_integer_enumeration_toggled() {
        let mut desc = control_port(0);
        desc.integer = true;
        desc.enumeration = true;
        desc.toggled = true;
        assert_eq!(classify_port(&desc).0.vis, PortVis::Integer);
        desc.integer = false;
        assert_eq!(classify_port(&desc).0.vis, PortVis::Enumeration);
        desc.enumeration = false;
        assert_eq!(classify_port(&desc).0.vis, PortVis::Toggled);
    }

    #[test]
    fn unknown_flow_on_optional_port_is_just_unused() {
        let mut desc = control_port(0);
        desc.is_input = false;
        desc.optional = true;
        let (meta, issues) = classify_port(&desc);
        assert!(issues.is_empty());
        assert!(!meta.used);
        assert_eq!(meta.flow, PortFlow::Unknown);
    }

    #[test]
    fn unknown_flow_on_mandatory_port_is_flagged() {
        let mut desc = control_port(0);
        desc.is_input = false;
        let (_, issues) = classify_port(&desc);
        assert!(issues.iter().any(|i| i.kind == IssueKind::UnknownPortFlow));
    }

    #[test]
    fn cv_port_is_recognized_but_flagged() {
        let mut desc = audio_port(0, true);
        desc.is_audio = false;
        desc.is_cv = true;
        let (meta, issues) = classify_port(&desc);
        assert_eq!(meta.kind, PortKind::Cv);
        assert!(issues.iter().any(|i| i.kind == IssueKind::BadPortType));
    }

    #[test]
    fn degenerate_range_is_widened_around_default() {
        let mut desc = control_port(0);
        desc.default = Some(2.0);
        desc.minimum = Some(5.0);
        desc.maximum = Some(5.0);
        let (meta, _) = classify_port(&desc);
        assert!(meta.min < meta.max);
        assert_eq!((meta.min, meta.max), (1.0, 3.0));
    }

    #[test]
    fn three_by_two_plugin_is_undefined() {
        let descs = vec![
            audio_port(0, true),
            audio_port(1, true),
            audio_port(2, true),
            audio_port(3, false),
            audio_port(4, false),
        ];
        let check = check_plugin(&descs, &[]);
        assert_eq!(check.kind, PluginKind::Undefined);
        assert_eq!((check.audio_inputs, check.audio_outputs), (3, 2));
        assert!(
            check
                .issues
                .iter()
                .any(|i| i.kind == IssueKind::TooManyInputChannels)
        );
        assert!(
            !check
                .issues
                .iter()
                .any(|i| i.kind == IssueKind::TooManyOutputChannels)
        );
        assert!(check.is_blocked());
    }

    #[test]
    fn mono_to_mono_is_unsupported() {
        let descs = vec![audio_port(0, true), audio_port(1, false)];
        let check = check_plugin(&descs, &[]);
        assert!(check.issues.iter().any(|i| i.kind == IssueKind::NoMonoSupport));
        assert_eq!(check.kind, PluginKind::Effect);
        assert!(!check.is_blocked());
    }

    #[test]
    fn one_to_two_is_supported() {
        let descs = vec![
            audio_port(0, true),
            audio_port(1, false),
            audio_port(2, false),
        ];
        let check = check_plugin(&descs, &[]);
        assert!(!check.issues.iter().any(|i| i.kind == IssueKind::NoMonoSupport));
    }

    #[test]
    fn no_audio_output_is_flagged() {
        let descs = vec![audio_port(0, true), control_port(1)];
        let check = check_plugin(&descs, &[]);
        assert!(check.issues.iter().any(|i| i.kind == IssueKind::NoOutputChannel));
    }

    #[test]
    fn instrument_has_no_audio_inputs() {
        let descs = vec![audio_port(0, false), audio_port(1, false)];
        let check = check_plugin(&descs, &[]);
        assert_eq!(check.kind, PluginKind::Instrument);
    }

    #[test]
    fn unsupported_required_feature_blocks() {
        let descs = vec![audio_port(0, true), audio_port(1, false), audio_port(2, false)];
        let required = vec![
            "http://lv2plug.in/ns/ext/urid#map".to_string(),
            "http://example.org/ext/teleport".to_string(),
        ];
        let check = check_plugin(&descs, &required);
        let unsupported: Vec<&Issue> = check
            .issues
            .iter()
            .filter(|i| i.kind == IssueKind::FeatureNotSupported)
            .collect();
        assert_eq!(unsupported.len(), 1);
        assert_eq!(unsupported[0].info, "http://example.org/ext/teleport");
        assert!(check.is_blocked());
    }

    #[test]
    fn whole_plugin_check_is_deterministic() {
        let descs = vec![
            audio_port(0, true),
            audio_port(1, false),
            audio_port(2, false),
            control_port(3),
        ];
        let required = vec!["http://lv2plug.in/ns/ext/urid#map".to_string()];
        assert_eq!(
            check_plugin(&descs, &required),
            check_plugin(&descs, &required)
        );
    }
}
