use std::os::raw::c_void;
use std::ptr;

use tracing::warn;

use crate::check::{PortFlow, PortKind, PortMeta};

/// A bound plugin port. Closed over the kinds the host knows how to
/// drive; everything else lands in `Unknown` and is connected to null.
#[derive(Debug)]
pub enum Port {
    Control(ControlPort),
    Audio(AudioPort),
    Cv(CvPort),
    Unknown(UnknownPort),
}

/// Control port with a boxed value cell so the address handed to
/// `connect_port` stays valid while the port vector moves.
#[derive(Debug)]
pub struct ControlPort {
    pub meta: PortMeta,
    pub value: Box<f32>,
}

#[derive(Debug)]
pub struct AudioPort {
    pub meta: PortMeta,
    pub buf: Box<[f32]>,
}

/// CV ports are not supported for routing but still get a buffer so a
/// connected pointer is always valid memory.
#[derive(Debug)]
pub struct CvPort {
    pub meta: PortMeta,
    pub buf: Box<[f32]>,
}

#[derive(Debug)]
pub struct UnknownPort {
    pub meta: PortMeta,
}

impl Port {
    pub fn from_meta(meta: PortMeta, frames: usize) -> Self {
        match meta.kind {
            PortKind::Control => {
                let value = Box::new(meta.def);
                Port::Control(ControlPort { meta, value })
            }
            PortKind::Audio => Port::Audio(AudioPort {
                meta,
                buf: vec![0.0; frames].into_boxed_slice(),
            }),
            PortKind::Cv => {
                let def = meta.def;
                Port::Cv(CvPort {
                    meta,
                    buf: vec![def; frames].into_boxed_slice(),
                })
            }
            PortKind::Event | PortKind::Unknown => Port::Unknown(UnknownPort { meta }),
        }
    }

    pub fn meta(&self) -> &PortMeta {
        match self {
            Port::Control(p) => &p.meta,
            Port::Audio(p) => &p.meta,
            Port::Cv(p) => &p.meta,
            Port::Unknown(p) => &p.meta,
        }
    }

    /// Address to hand to the plugin's `connect_port`. Null only for
    /// unknown ports; unused-but-known ports still point at real memory.
    pub fn data_ptr(&mut self) -> *mut c_void {
        match self {
            Port::Control(p) => &mut *p.value as *mut f32 as *mut c_void,
            Port::Audio(p) => p.buf.as_mut_ptr() as *mut c_void,
            Port::Cv(p) => p.buf.as_mut_ptr() as *mut c_void,
            Port::Unknown(_) => ptr::null_mut(),
        }
    }
}

/// Indices of up to two audio ports in one direction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StereoPortRef {
    pub left: Option<usize>,
    pub right: Option<usize>,
}

impl StereoPortRef {
    pub fn is_mono(&self) -> bool {
        self.left.is_some() && self.right.is_none()
    }
}

/// Picks the audio ports that act as the stereo pair for each direction,
/// in declaration order. Ports past the second per direction are left
/// unconnected from the host's point of view.
pub fn assign_stereo_slots(ports: &[Port]) -> (StereoPortRef, StereoPortRef) {
    let mut inputs = StereoPortRef::default();
    let mut outputs = StereoPortRef::default();
    for (slot, port) in ports.iter().enumerate() {
        let meta = port.meta();
        if meta.kind != PortKind::Audio {
            continue;
        }
        let side = match meta.flow {
            PortFlow::Input => &mut inputs,
            PortFlow::Output => &mut outputs,
            PortFlow::Unknown => continue,
        };
        if side.left.is_none() {
            side.left = Some(slot);
        } else if side.right.is_none() {
            side.right = Some(slot);
        } else {
            warn!(symbol = %meta.symbol, "ignoring extra audio port");
        }
    }
    (inputs, outputs)
}

/// Fills the plugin's audio input buffers from an interleaved host
/// buffer. `offset` selects the first of `span` host channels within
/// each frame of `stride` floats. Spreading when plugin and host widths
/// differ: a mono plugin input covering two host channels takes their
/// average, a stereo plugin input covering one host channel gets it
/// duplicated onto both sides.
pub fn copy_buffers_from_host(
    ports: &mut [Port],
    inputs: StereoPortRef,
    host: &[f32],
    offset: usize,
    span: usize,
    stride: usize,
    frames: usize,
) {
    debug_assert!(host.len() >= frames * stride);
    debug_assert!(offset + span <= stride);
    match (inputs.left, inputs.right) {
        (Some(l), Some(r)) => {
            if let Port::Audio(p) = &mut ports[l] {
                for i in 0..frames {
                    p.buf[i] = host[i * stride + offset];
                }
            }
            let right_offset = if span >= 2 { offset + 1 } else { offset };
            if let Port::Audio(p) = &mut ports[r] {
                for i in 0..frames {
                    p.buf[i] = host[i * stride + right_offset];
                }
            }
        }
        (Some(l), None) => {
            if let Port::Audio(p) = &mut ports[l] {
                if span >= 2 {
                    for i in 0..frames {
                        let frame = &host[i * stride + offset..];
                        p.buf[i] = (frame[0] + frame[1]) * 0.5;
                    }
                } else {
                    for i in 0..frames {
                        p.buf[i] = host[i * stride + offset];
                    }
                }
            }
        }
        _ => {}
    }
}

/// Writes the plugin's audio output buffers back into an interleaved
/// host buffer, with the inverse spreading: a mono plugin output
/// covering two host channels is duplicated, a stereo output squeezed
/// into one host channel is averaged.
pub fn copy_buffers_to_host(
    ports: &[Port],
    outputs: StereoPortRef,
    host: &mut [f32],
    offset: usize,
    span: usize,
    stride: usize,
    frames: usize,
) {
    debug_assert!(host.len() >= frames * stride);
    debug_assert!(offset + span <= stride);
    match (outputs.left, outputs.right) {
        (Some(l), Some(r)) => {
            let (Port::Audio(left), Port::Audio(right)) = (&ports[l], &ports[r]) else {
                return;
            };
            if span >= 2 {
                for i in 0..frames {
                    host[i * stride + offset] = left.buf[i];
                    host[i * stride + offset + 1] = right.buf[i];
                }
            } else {
                for i in 0..frames {
                    host[i * stride + offset] = (left.buf[i] + right.buf[i]) * 0.5;
                }
            }
        }
        (Some(l), None) => {
            if let Port::Audio(p) = &ports[l] {
                if span >= 2 {
                    for i in 0..frames {
                        host[i * stride + offset] = p.buf[i];
                        host[i * stride + offset + 1] = p.buf[i];
                    }
                } else {
                    for i in 0..frames {
                        host[i * stride + offset] = p.buf[i];
                    }
                }
            }
        }
        _ => {}
    }
}
