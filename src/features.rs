use std::ffi::CString;
use std::os::raw::c_void;
use std::ptr;
use std::sync::Arc;

use lv2_raw::{LV2_ATOM__INT, LV2Feature, LV2Urid};

use crate::urid::{
    LV2_BUF_SIZE__MAX_BLOCK_LENGTH, LV2_BUF_SIZE__MIN_BLOCK_LENGTH,
    LV2_BUF_SIZE__NOMINAL_BLOCK_LENGTH, UridFeatures, UridMap,
};
use crate::worker::{LV2_WORKER__SCHEDULE, Lv2WorkerSchedule, Lv2WorkerStatus};

pub const LV2_URID__MAP: &str = "http://lv2plug.in/ns/ext/urid#map";
pub const LV2_URID__UNMAP: &str = "http://lv2plug.in/ns/ext/urid#unmap";
pub const LV2_OPTIONS__OPTIONS: &str = "http://lv2plug.in/ns/ext/options#options";
pub const LV2_BUF_SIZE__BOUNDED_BLOCK_LENGTH: &str =
    "http://lv2plug.in/ns/ext/buf-size#boundedBlockLength";

#[repr(C)]
pub struct Lv2OptionsOption {
    pub context: u32,
    pub subject: u32,
    pub key: LV2Urid,
    pub size: u32,
    pub type_: LV2Urid,
    pub value: *const c_void,
}

/// Block-length bounds advertised through the options feature.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockLengths {
    pub min: u32,
    pub max: u32,
    pub nominal: u32,
}

impl Default for BlockLengths {
    fn default() -> Self {
        Self {
            min: 1,
            max: 8192,
            nominal: 1024,
        }
    }
}

pub type ScheduleWorkFn =
    unsafe extern "C" fn(handle: *mut c_void, size: u32, data: *const c_void) -> Lv2WorkerStatus;

/// The feature array for one plugin instance.
///
/// Owns every box and vector the pushed data pointers refer to, so the
/// addresses stay valid for the lifetime of the instance. The worker
/// schedule handle starts null and is patched once the worker exists;
/// schedule is only legal during `run`, which cannot happen earlier.
pub struct InstanceFeatures {
    urid: UridFeatures,
    schedule: Box<Lv2WorkerSchedule>,
    _feature_uris: Vec<CString>,
    features: Vec<LV2Feature>,
    _option_values: Vec<u32>,
    _options: Vec<Lv2OptionsOption>,
}

unsafe impl Send for InstanceFeatures {}

impl InstanceFeatures {
    pub fn build(
        map: Arc<UridMap>,
        lengths: BlockLengths,
        schedule_fn: ScheduleWorkFn,
    ) -> Result<Self, String> {
        let urid = UridFeatures::new(map)?;
        let schedule = Box::new(Lv2WorkerSchedule {
            handle: ptr::null_mut(),
            schedule_work: Some(schedule_fn),
        });

        let option_values = vec![lengths.min, lengths.max, lengths.nominal];
        let int_type = urid.urid_map().map_bytes(LV2_ATOM__INT);
        let min_key = urid.urid_map().map(LV2_BUF_SIZE__MIN_BLOCK_LENGTH);
        let max_key = urid.urid_map().map(LV2_BUF_SIZE__MAX_BLOCK_LENGTH);
        let nominal_key = urid.urid_map().map(LV2_BUF_SIZE__NOMINAL_BLOCK_LENGTH);
        let int_option = |key: LV2Urid, value: &u32| Lv2OptionsOption {
            context: 0,
            subject: 0,
            key,
            size: std::mem::size_of::<u32>() as u32,
            type_: int_type,
            value: (value as *const u32).cast::<c_void>(),
        };
        let mut options = vec![
            int_option(min_key, &option_values[0]),
            int_option(max_key, &option_values[1]),
            int_option(nominal_key, &option_values[2]),
            Lv2OptionsOption {
                context: 0,
                subject: 0,
                key: 0,
                size: 0,
                type_: 0,
                value: ptr::null(),
            },
        ];

        let mut feature_uris = Vec::<CString>::new();
        let mut features = Vec::<LV2Feature>::new();
        let mut push_feature = |uri: &str, data: *mut c_void| -> Result<(), String> {
            let c_uri =
                CString::new(uri).map_err(|e| format!("Invalid LV2 feature URI '{uri}': {e}"))?;
            features.push(LV2Feature {
                uri: c_uri.as_ptr(),
                data,
            });
            feature_uris.push(c_uri);
            Ok(())
        };

        push_feature(LV2_URID__MAP, urid.map_feature().data)?;
        push_feature(LV2_URID__UNMAP, urid.unmap_feature().data)?;
        push_feature(
            LV2_WORKER__SCHEDULE,
            (&*schedule as *const Lv2WorkerSchedule)
                .cast_mut()
                .cast::<c_void>(),
        )?;
        push_feature(
            LV2_OPTIONS__OPTIONS,
            options.as_mut_ptr().cast::<c_void>(),
        )?;
        push_feature(LV2_BUF_SIZE__BOUNDED_BLOCK_LENGTH, ptr::null_mut())?;

        Ok(Self {
            urid,
            schedule,
            _feature_uris: feature_uris,
            features,
            _option_values: option_values,
            _options: options,
        })
    }

    pub fn features(&self) -> Vec<&LV2Feature> {
        self.features.iter().collect()
    }

    /// Points the schedule feature at the live worker.
    pub fn set_worker_handle(&mut self, handle: *mut c_void) {
        self.schedule.handle = handle;
    }

    pub fn urid(&self) -> &UridFeatures {
        &self.urid
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::ffi::CStr;

    unsafe extern "C" fn noop_schedule(
        _handle: *mut c_void,
        _size: u32,
        _data: *const c_void,
    ) -> Lv2WorkerStatus {
        0
    }

    fn build() -> InstanceFeatures {
        InstanceFeatures::build(
            Arc::new(UridMap::new()),
            BlockLengths::default(),
            noop_schedule,
        )
        .expect("feature build")
    }

    #[test]
    fn advertises_the_supported_feature_set() {
        let features = build();
        let uris: Vec<String> = features
            .features()
            .iter()
            .map(|f| unsafe { CStr::from_ptr(f.uri) }.to_str().unwrap().to_string())
            .collect();
        assert_eq!(
            uris,
            vec![
                LV2_URID__MAP,
                LV2_URID__UNMAP,
                LV2_WORKER__SCHEDULE,
                LV2_OPTIONS__OPTIONS,
                LV2_BUF_SIZE__BOUNDED_BLOCK_LENGTH,
            ]
        );
    }

    #[test]
    fn options_carry_block_lengths_as_ints() {
        let features = build();
        let opts = &features._options;
        assert_eq!(opts.len(), 4);
        for opt in &opts[..3] {
            assert_ne!(opt.key, 0);
            assert_ne!(opt.type_, 0);
            assert_eq!(opt.size, 4);
            let value = unsafe { *(opt.value as *const u32) };
            assert!([1, 8192, 1024].contains(&value));
        }
        let end = &opts[3];
        assert_eq!((end.key, end.size, end.type_), (0, 0, 0));
        assert!(end.value.is_null());
    }

    #[test]
    fn worker_handle_starts_null_and_is_patchable() {
        let mut features = build();
        assert!(features.schedule.handle.is_null());
        let marker = 0xf00du32;
        features.set_worker_handle(&marker as *const u32 as *mut c_void);
        assert!(!features.schedule.handle.is_null());
    }
}
