use std::collections::HashMap;
use std::ffi::{CStr, CString, c_char, c_void};
use std::sync::{Arc, Mutex};

use lv2_raw::{
    LV2_ATOM__DOUBLE, LV2_ATOM__FRAMETIME, LV2_ATOM__INT, LV2_ATOM__LONG, LV2_ATOM__OBJECT,
    LV2_ATOM__SEQUENCE, LV2_MIDI__MIDIEVENT, LV2_TIME__BEATSPERMINUTE, LV2_TIME__FRAME,
    LV2_TIME__POSITION, LV2_TIME__SPEED, LV2_URID__MAP, LV2_URID__UNMAP, LV2Feature, LV2Urid,
    LV2UridMap, LV2UridMapHandle,
};

pub const LV2_ATOM__FLOAT: &str = "http://lv2plug.in/ns/ext/atom#Float";
pub const LV2_ATOM__CHUNK: &str = "http://lv2plug.in/ns/ext/atom#Chunk";
pub const LV2_LOG__ERROR: &str = "http://lv2plug.in/ns/ext/log#Error";
pub const LV2_LOG__WARNING: &str = "http://lv2plug.in/ns/ext/log#Warning";
pub const LV2_LOG__NOTE: &str = "http://lv2plug.in/ns/ext/log#Note";
pub const LV2_PATCH__SET: &str = "http://lv2plug.in/ns/ext/patch#Set";
pub const LV2_PATCH__PROPERTY: &str = "http://lv2plug.in/ns/ext/patch#property";
pub const LV2_PATCH__VALUE: &str = "http://lv2plug.in/ns/ext/patch#value";
pub const LV2_STATE__STATE_CHANGED: &str = "http://lv2plug.in/ns/ext/state#StateChanged";
pub const LV2_BUF_SIZE__MIN_BLOCK_LENGTH: &str =
    "http://lv2plug.in/ns/ext/buf-size#minBlockLength";
pub const LV2_BUF_SIZE__MAX_BLOCK_LENGTH: &str =
    "http://lv2plug.in/ns/ext/buf-size#maxBlockLength";
pub const LV2_BUF_SIZE__NOMINAL_BLOCK_LENGTH: &str =
    "http://lv2plug.in/ns/ext/buf-size#nominalBlockLength";

#[derive(Default)]
struct UridTable {
    by_uri: HashMap<String, LV2Urid>,
    by_urid: Vec<CString>,
}

/// Process-wide URI <-> integer interning table.
///
/// Ids are assigned sequentially starting at 1 and are stable for the
/// lifetime of the map; 0 is reserved and means "no id". The whole
/// check-then-insert sequence runs under one mutex so two threads mapping
/// the same URI always receive the same id.
#[derive(Default)]
pub struct UridMap {
    table: Mutex<UridTable>,
}

impl UridMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn map(&self, uri: &str) -> LV2Urid {
        if uri.is_empty() {
            return 0;
        }
        let Ok(mut table) = self.table.lock() else {
            return 0;
        };
        if let Some(&existing) = table.by_uri.get(uri) {
            return existing;
        }
        let Ok(uri_c) = CString::new(uri) else {
            return 0;
        };
        let mapped = (table.by_urid.len() + 1) as LV2Urid;
        table.by_uri.insert(uri.to_string(), mapped);
        table.by_urid.push(uri_c);
        mapped
    }

    /// Maps a null-terminated byte constant as exported by `lv2_raw`.
    pub fn map_bytes(&self, uri: &[u8]) -> LV2Urid {
        let Ok(uri_str) = std::str::from_utf8(uri) else {
            return 0;
        };
        self.map(uri_str.trim_end_matches('\0'))
    }

    pub fn unmap(&self, urid: LV2Urid) -> Option<String> {
        let table = self.table.lock().ok()?;
        let idx = (urid as usize).checked_sub(1)?;
        table
            .by_urid
            .get(idx)
            .and_then(|uri| uri.to_str().ok().map(str::to_string))
    }

    /// Raw pointer variant for the `urid:unmap` FFI callback. The returned
    /// string lives as long as the map; entries are never removed.
    fn unmap_ptr(&self, urid: LV2Urid) -> *const c_char {
        let Ok(table) = self.table.lock() else {
            return std::ptr::null();
        };
        let Some(idx) = (urid as usize).checked_sub(1) else {
            return std::ptr::null();
        };
        table
            .by_urid
            .get(idx)
            .map(|uri| uri.as_ptr())
            .unwrap_or(std::ptr::null())
    }

    pub fn len(&self) -> usize {
        self.table.lock().map(|t| t.by_urid.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// URIDs needed by real-time code, resolved once at context construction
/// so the audio thread never calls `map`.
#[derive(Debug, Clone, Copy)]
pub struct CommonUrids {
    pub atom_sequence: LV2Urid,
    pub atom_chunk: LV2Urid,
    pub atom_int: LV2Urid,
    pub atom_long: LV2Urid,
    pub atom_float: LV2Urid,
    pub atom_double: LV2Urid,
    pub atom_object: LV2Urid,
    pub atom_frame_time: LV2Urid,
    pub midi_event: LV2Urid,
    pub time_position: LV2Urid,
    pub time_frame: LV2Urid,
    pub time_speed: LV2Urid,
    pub time_bpm: LV2Urid,
    pub log_error: LV2Urid,
    pub log_warning: LV2Urid,
    pub log_note: LV2Urid,
    pub patch_set: LV2Urid,
    pub patch_property: LV2Urid,
    pub patch_value: LV2Urid,
    pub state_changed: LV2Urid,
    pub bufsz_min_block: LV2Urid,
    pub bufsz_max_block: LV2Urid,
    pub bufsz_nominal_block: LV2Urid,
}

impl CommonUrids {
    pub fn resolve(map: &UridMap) -> Self {
        Self {
            atom_sequence: map.map_bytes(LV2_ATOM__SEQUENCE),
            atom_chunk: map.map(LV2_ATOM__CHUNK),
            atom_int: map.map_bytes(LV2_ATOM__INT),
            atom_long: map.map_bytes(LV2_ATOM__LONG),
            atom_float: map.map(LV2_ATOM__FLOAT),
            atom_double: map.map_bytes(LV2_ATOM__DOUBLE),
            atom_object: map.map_bytes(LV2_ATOM__OBJECT),
            atom_frame_time: map.map_bytes(LV2_ATOM__FRAMETIME),
            midi_event: map.map_bytes(LV2_MIDI__MIDIEVENT),
            time_position: map.map_bytes(LV2_TIME__POSITION),
            time_frame: map.map_bytes(LV2_TIME__FRAME),
            time_speed: map.map_bytes(LV2_TIME__SPEED),
            time_bpm: map.map_bytes(LV2_TIME__BEATSPERMINUTE),
            log_error: map.map(LV2_LOG__ERROR),
            log_warning: map.map(LV2_LOG__WARNING),
            log_note: map.map(LV2_LOG__NOTE),
            patch_set: map.map(LV2_PATCH__SET),
            patch_property: map.map(LV2_PATCH__PROPERTY),
            patch_value: map.map(LV2_PATCH__VALUE),
            state_changed: map.map(LV2_STATE__STATE_CHANGED),
            bufsz_min_block: map.map(LV2_BUF_SIZE__MIN_BLOCK_LENGTH),
            bufsz_max_block: map.map(LV2_BUF_SIZE__MAX_BLOCK_LENGTH),
            bufsz_nominal_block: map.map(LV2_BUF_SIZE__NOMINAL_BLOCK_LENGTH),
        }
    }
}

#[repr(C)]
pub struct LV2UridUnmap {
    pub handle: LV2UridMapHandle,
    pub unmap: extern "C" fn(handle: LV2UridMapHandle, urid: LV2Urid) -> *const c_char,
}

/// The `urid:map` / `urid:unmap` features handed to plugin instances.
///
/// Keeps the shared [`UridMap`] alive and owns the boxed FFI structs whose
/// addresses the plugin retains for its whole lifetime.
pub struct UridFeatures {
    map: Arc<UridMap>,
    _map_uri: CString,
    _unmap_uri: CString,
    _map_ffi: Box<LV2UridMap>,
    _unmap_ffi: Box<LV2UridUnmap>,
    map_feature: LV2Feature,
    unmap_feature: LV2Feature,
}

unsafe impl Send for UridFeatures {}

impl UridFeatures {
    pub fn new(map: Arc<UridMap>) -> Result<Self, String> {
        let handle = Arc::as_ptr(&map) as *mut c_void;
        let map_ffi = Box::new(LV2UridMap {
            handle,
            map: urid_map_callback,
        });
        let unmap_ffi = Box::new(LV2UridUnmap {
            handle,
            unmap: urid_unmap_callback,
        });

        let map_uri = uri_cstring(LV2_URID__MAP.as_bytes())?;
        let unmap_uri = uri_cstring(LV2_URID__UNMAP.as_bytes())?;
        let map_feature = LV2Feature {
            uri: map_uri.as_ptr(),
            data: (&*map_ffi as *const LV2UridMap).cast_mut().cast::<c_void>(),
        };
        let unmap_feature = LV2Feature {
            uri: unmap_uri.as_ptr(),
            data: (&*unmap_ffi as *const LV2UridUnmap)
                .cast_mut()
                .cast::<c_void>(),
        };

        Ok(Self {
            map,
            _map_uri: map_uri,
            _unmap_uri: unmap_uri,
            _map_ffi: map_ffi,
            _unmap_ffi: unmap_ffi,
            map_feature,
            unmap_feature,
        })
    }

    pub fn map_feature(&self) -> &LV2Feature {
        &self.map_feature
    }

    pub fn unmap_feature(&self) -> &LV2Feature {
        &self.unmap_feature
    }

    pub fn urid_map(&self) -> &Arc<UridMap> {
        &self.map
    }
}

fn uri_cstring(uri: &[u8]) -> Result<CString, String> {
    let trimmed = uri.strip_suffix(b"\0").unwrap_or(uri);
    CString::new(trimmed).map_err(|e| format!("Invalid LV2 feature URI: {e}"))
}

extern "C" fn urid_map_callback(handle: LV2UridMapHandle, uri: *const c_char) -> LV2Urid {
    if handle.is_null() || uri.is_null() {
        return 0;
    }
    let map = unsafe { &*(handle as *const UridMap) };
    match unsafe { CStr::from_ptr(uri) }.to_str() {
        Ok(uri_str) => map.map(uri_str),
        Err(_) => 0,
    }
}

extern "C" fn urid_unmap_callback(handle: LV2UridMapHandle, urid: LV2Urid) -> *const c_char {
    if handle.is_null() || urid == 0 {
        return std::ptr::null();
    }
    let map = unsafe { &*(handle as *const UridMap) };
    map.unmap_ptr(urid)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn map_is_idempotent() {
        let map = UridMap::new();
        let a = map.map("urn:example:a");
        let b = map.map("urn:example:a");
        assert_ne!(a, 0);
        assert_eq!(a, b);
    }

    #[test]
    fn ids_are_sequential_from_one() {
        let map = UridMap::new();
        assert_eq!(map.map("urn:example:a"), 1);
        assert_eq!(map.map("urn:example:b"), 2);
        assert_eq!(map.map("urn:example:a"), 1);
        assert_eq!(map.len(), 2);
    }

    #[test]
    fn unmap_round_trips() {
        let map = UridMap::new();
        for uri in ["urn:example:a", "urn:example:b", "urn:example:c"] {
            let id = map.map(uri);
            assert_eq!(map.unmap(id).as_deref(), Some(uri));
        }
    }

    #[test]
    fn unmap_rejects_invalid_ids() {
        let map = UridMap::new();
        map.map("urn:example:a");
        assert_eq!(map.unmap(0), None);
        assert_eq!(map.unmap(2), None);
        assert_eq!(map.unmap(u32::MAX), None);
    }

    #[test]
    fn nul_and_empty_uris_yield_no_id() {
        let map = UridMap::new();
        assert_eq!(map.map(""), 0);
        assert_eq!(map.map("urn:bad\0uri"), 0);
        assert_eq!(map.len(), 0);
    }

    #[test]
    fn concurrent_mapping_is_consistent() {
        let map = Arc::new(UridMap::new());
        let uris: Vec<String> = (0..32).map(|i| format!("urn:example:{i}")).collect();
        let mut handles = vec![];
        for _ in 0..4 {
            let map = map.clone();
            let uris = uris.clone();
            handles.push(thread::spawn(move || {
                uris.iter().map(|u| map.map(u)).collect::<Vec<_>>()
            }));
        }
        let results: Vec<Vec<LV2Urid>> =
            handles.into_iter().map(|h| h.join().expect("join")).collect();
        for ids in &results[1..] {
            assert_eq!(ids, &results[0]);
        }
        assert_eq!(map.len(), uris.len());
    }

    #[test]
    fn common_urids_are_distinct_and_nonzero() {
        let map = UridMap::new();
        let urids = CommonUrids::resolve(&map);
        let all = [
            urids.atom_sequence,
            urids.atom_chunk,
            urids.atom_int,
            urids.atom_long,
            urids.atom_float,
            urids.atom_double,
            urids.atom_object,
            urids.atom_frame_time,
            urids.midi_event,
            urids.time_position,
            urids.log_error,
            urids.patch_set,
            urids.state_changed,
            urids.bufsz_nominal_block,
        ];
        for id in all {
            assert_ne!(id, 0);
        }
        let mut dedup = all.to_vec();
        dedup.sort_unstable();
        dedup.dedup();
        assert_eq!(dedup.len(), all.len());
    }
}
