use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicI32, Ordering};

use atomic_float::AtomicF32;

use crate::check::{PortMeta, PortVis};

/// Host-side parameter attached to a control port. The variant is fixed
/// by the port's visualization hint at creation time; the cell behind it
/// is shared between linked models, so writing through any of them is
/// visible to all.
#[derive(Debug, Clone)]
pub enum Model {
    Float(FloatModel),
    Int(IntModel),
    Bool(BoolModel),
}

#[derive(Debug, Clone)]
pub struct FloatModel {
    cell: Arc<AtomicF32>,
    pub min: f32,
    pub max: f32,
    pub def: f32,
}

#[derive(Debug, Clone)]
pub struct IntModel {
    cell: Arc<AtomicI32>,
    pub min: i32,
    pub max: i32,
    pub def: i32,
}

#[derive(Debug, Clone)]
pub struct BoolModel {
    cell: Arc<AtomicBool>,
    pub def: bool,
}

impl Model {
    pub fn for_port(meta: &PortMeta) -> Self {
        match meta.vis {
            PortVis::Toggled => Model::Bool(BoolModel {
                cell: Arc::new(AtomicBool::new(meta.def >= 0.5)),
                def: meta.def >= 0.5,
            }),
            PortVis::Integer | PortVis::Enumeration => {
                let def = meta.def.round() as i32;
                // Bounds truncate toward negative infinity; only the
                // default rounds to nearest.
                Model::Int(IntModel {
                    cell: Arc::new(AtomicI32::new(def)),
                    min: meta.min.floor() as i32,
                    max: meta.max.floor() as i32,
                    def,
                })
            }
            PortVis::None => Model::Float(FloatModel {
                cell: Arc::new(AtomicF32::new(meta.def)),
                min: meta.min,
                max: meta.max,
                def: meta.def,
            }),
        }
    }

    /// Current value as the float the port cell expects.
    pub fn value(&self) -> f32 {
        match self {
            Model::Float(m) => m.cell.load(Ordering::Relaxed),
            Model::Int(m) => m.cell.load(Ordering::Relaxed) as f32,
            Model::Bool(m) => {
                if m.cell.load(Ordering::Relaxed) {
                    1.0
                } else {
                    0.0
                }
            }
        }
    }

    /// Writes a value, clamped and rounded per variant.
    pub fn set_value(&self, value: f32) {
        match self {
            Model::Float(m) => {
                m.cell.store(value.clamp(m.min, m.max), Ordering::Relaxed);
            }
            Model::Int(m) => {
                let v = (value.round() as i32).clamp(m.min, m.max);
                m.cell.store(v, Ordering::Relaxed);
            }
            Model::Bool(m) => {
                m.cell.store(value >= 0.5, Ordering::Relaxed);
            }
        }
    }

    /// Joins this model to `other`'s cell. `other` keeps its current
    /// value; afterwards a write to either is seen by both. Mismatched
    /// variants never link.
    pub fn link_to(&mut self, other: &Model) {
        match (self, other) {
            (Model::Float(a), Model::Float(b)) => a.cell = b.cell.clone(),
            (Model::Int(a), Model::Int(b)) => a.cell = b.cell.clone(),
            (Model::Bool(a), Model::Bool(b)) => a.cell = b.cell.clone(),
            _ => {}
        }
    }

    /// Detaches this model onto a private cell holding the value it had
    /// at the moment of unlinking.
    pub fn unlink(&mut self) {
        match self {
            Model::Float(m) => {
                m.cell = Arc::new(AtomicF32::new(m.cell.load(Ordering::Relaxed)));
            }
            Model::Int(m) => {
                m.cell = Arc::new(AtomicI32::new(m.cell.load(Ordering::Relaxed)));
            }
            Model::Bool(m) => {
                m.cell = Arc::new(AtomicBool::new(m.cell.load(Ordering::Relaxed)));
            }
        }
    }

    pub fn is_linked_to(&self, other: &Model) -> bool {
        match (self, other) {
            (Model::Float(a), Model::Float(b)) => Arc::ptr_eq(&a.cell, &b.cell),
            (Model::Int(a), Model::Int(b)) => Arc::ptr_eq(&a.cell, &b.cell),
            (Model::Bool(a), Model::Bool(b)) => Arc::ptr_eq(&a.cell, &b.cell),
            _ => false,
        }
    }

    pub fn reset(&self) {
        match self {
            Model::Float(m) => m.cell.store(m.def, Ordering::Relaxed),
            Model::Int(m) => m.cell.store(m.def, Ordering::Relaxed),
            Model::Bool(m) => m.cell.store(m.def, Ordering::Relaxed),
        }
    }
}

/// One host parameter: the model plus where it feeds in the port vector.
#[derive(Debug, Clone)]
pub struct Control {
    pub symbol: String,
    pub name: String,
    pub port_slot: usize,
    pub model: Model,
}
