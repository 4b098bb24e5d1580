use std::os::raw::c_void;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread::JoinHandle;

use byteorder::{ByteOrder, LittleEndian, WriteBytesExt};
use ringbuf::{HeapConsumer, HeapProducer, HeapRb};
use tracing::warn;

use crate::sync::Semaphore;

pub type Lv2WorkerStatus = u32;
pub const LV2_WORKER_SUCCESS: Lv2WorkerStatus = 0;
pub const LV2_WORKER_ERR_UNKNOWN: Lv2WorkerStatus = 1;
pub const LV2_WORKER_ERR_NO_SPACE: Lv2WorkerStatus = 2;
pub const LV2_WORKER__SCHEDULE: &str = "http://lv2plug.in/ns/ext/worker#schedule";
pub const LV2_WORKER__INTERFACE: &str = "http://lv2plug.in/ns/ext/worker#interface";

/// Bytes per ring, each direction.
pub const RING_CAPACITY: usize = 32 * 1024;

#[repr(C)]
pub struct Lv2WorkerSchedule {
    pub handle: *mut c_void,
    pub schedule_work: Option<
        unsafe extern "C" fn(handle: *mut c_void, size: u32, data: *const c_void) -> Lv2WorkerStatus,
    >,
}

pub type Lv2WorkerRespondFunc = Option<
    unsafe extern "C" fn(handle: *mut c_void, size: u32, data: *const c_void) -> Lv2WorkerStatus,
>;

#[repr(C)]
pub struct Lv2WorkerInterface {
    pub work: Option<
        unsafe extern "C" fn(
            handle: *mut c_void,
            respond: Lv2WorkerRespondFunc,
            respond_handle: *mut c_void,
            size: u32,
            data: *const c_void,
        ) -> Lv2WorkerStatus,
    >,
    pub work_response: Option<
        unsafe extern "C" fn(handle: *mut c_void, size: u32, data: *const c_void) -> Lv2WorkerStatus,
    >,
    pub end_run: Option<unsafe extern "C" fn(handle: *mut c_void)>,
}

/// Receiver of offloaded jobs and their responses.
///
/// The plugin-backed handler wraps the extension-data function pointers;
/// tests substitute their own.
pub trait WorkHandler: Send {
    /// Runs one job off the audio thread (or inline under the work
    /// lock). May push data through `responder` for pickup on the
    /// audio thread.
    fn work(&mut self, responder: &mut Responder, data: &[u8]) -> Result<(), String>;

    /// Runs on the audio thread for each response frame.
    fn work_response(&mut self, data: &[u8]) -> Result<(), String>;

    /// Runs on the audio thread after all responses of a cycle.
    fn end_run(&mut self) {}
}

/// Producer half of the response ring, handed to `WorkHandler::work`.
pub struct Responder {
    tx: HeapProducer<u8>,
    scratch: Vec<u8>,
}

impl Responder {
    pub fn respond(&mut self, data: &[u8]) -> Result<(), String> {
        if data.is_empty() {
            return Err("empty worker response".into());
        }
        write_frame(&mut self.tx, &mut self.scratch, data)
    }
}

/// Trampoline for `LV2_Worker_Respond_Function`; `handle` is a
/// `*mut Responder` that only lives for the duration of `work`.
pub(crate) unsafe extern "C" fn worker_respond_callback(
    handle: *mut c_void,
    size: u32,
    data: *const c_void,
) -> Lv2WorkerStatus {
    if handle.is_null() || size == 0 || data.is_null() {
        return LV2_WORKER_ERR_UNKNOWN;
    }
    let responder = unsafe { &mut *(handle as *mut Responder) };
    let bytes = unsafe { std::slice::from_raw_parts(data.cast::<u8>(), size as usize) };
    match responder.respond(bytes) {
        Ok(()) => LV2_WORKER_SUCCESS,
        Err(_) => LV2_WORKER_ERR_NO_SPACE,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerMode {
    /// Jobs run on a dedicated thread; the usual live path.
    Threaded,
    /// Jobs run immediately on the scheduling thread, for offline
    /// rendering where there is no deadline.
    Inline,
}

/// Bridge between the real-time side and a job handler.
///
/// Frames on both rings are a `u32` little-endian length followed by
/// the payload, published with a single slice write so a reader that
/// sees the prefix always sees the payload too.
pub struct Worker<H: WorkHandler> {
    handler: H,
    req_tx: HeapProducer<u8>,
    resp_rx: HeapConsumer<u8>,
    work_lock: Arc<Mutex<()>>,
    scratch: Vec<u8>,
    side: Side,
}

enum Side {
    Threaded {
        sem: Arc<Semaphore>,
        exit: Arc<AtomicBool>,
        thread: Option<JoinHandle<()>>,
    },
    Inline {
        responder: Responder,
    },
}

impl<H: WorkHandler + Clone + 'static> Worker<H> {
    pub fn new(handler: H, mode: WorkerMode, work_lock: Arc<Mutex<()>>) -> Self {
        Self::with_capacity(handler, mode, work_lock, RING_CAPACITY)
    }

    pub fn with_capacity(
        handler: H,
        mode: WorkerMode,
        work_lock: Arc<Mutex<()>>,
        capacity: usize,
    ) -> Self {
        let (req_tx, req_rx) = HeapRb::<u8>::new(capacity).split();
        let (resp_tx, resp_rx) = HeapRb::<u8>::new(capacity).split();
        let responder = Responder {
            tx: resp_tx,
            scratch: Vec::new(),
        };
        let side = match mode {
            WorkerMode::Inline => {
                drop(req_rx);
                Side::Inline { responder }
            }
            WorkerMode::Threaded => {
                let sem = Arc::new(Semaphore::new(0));
                let exit = Arc::new(AtomicBool::new(false));
                let thread = {
                    let handler = handler.clone();
                    let sem = sem.clone();
                    let exit = exit.clone();
                    let work_lock = work_lock.clone();
                    std::thread::Builder::new()
                        .name("lv2-worker".into())
                        .spawn(move || {
                            worker_loop(handler, req_rx, responder, sem, exit, work_lock)
                        })
                        .ok()
                };
                if thread.is_none() {
                    warn!("could not spawn worker thread");
                }
                Side::Threaded {
                    sem,
                    exit,
                    thread,
                }
            }
        };
        Self {
            handler,
            req_tx,
            resp_rx,
            work_lock,
            scratch: Vec::new(),
            side,
        }
    }

    pub fn mode(&self) -> WorkerMode {
        match self.side {
            Side::Threaded { .. } => WorkerMode::Threaded,
            Side::Inline { .. } => WorkerMode::Inline,
        }
    }

    /// Entry point for the plugin's `schedule_work`. Real-time safe in
    /// threaded mode; runs the job on the spot in inline mode.
    pub fn schedule(&mut self, data: &[u8]) -> Result<(), String> {
        if data.is_empty() {
            return Err("empty work request".into());
        }
        match &mut self.side {
            Side::Threaded { sem, .. } => {
                write_frame(&mut self.req_tx, &mut self.scratch, data)?;
                sem.post();
                Ok(())
            }
            Side::Inline { responder } => {
                let _guard = lock(&self.work_lock);
                self.handler.work(responder, data)
            }
        }
    }

    /// Drains completed responses into the handler and finishes the
    /// cycle. Call from the audio thread after `run`.
    pub fn emit_responses(&mut self) {
        while let Some(frame) = read_frame(&mut self.resp_rx) {
            if let Err(err) = self.handler.work_response(&frame) {
                warn!(error = %err, "worker response rejected");
            }
        }
        self.handler.end_run();
    }
}

impl<H: WorkHandler> Drop for Worker<H> {
    fn drop(&mut self) {
        if let Side::Threaded { sem, exit, thread } = &mut self.side {
            exit.store(true, Ordering::Release);
            sem.post();
            if let Some(thread) = thread.take() {
                let _ = thread.join();
            }
        }
    }
}

fn worker_loop<H: WorkHandler>(
    mut handler: H,
    mut rx: HeapConsumer<u8>,
    mut responder: Responder,
    sem: Arc<Semaphore>,
    exit: Arc<AtomicBool>,
    work_lock: Arc<Mutex<()>>,
) {
    loop {
        sem.wait();
        if exit.load(Ordering::Acquire) {
            return;
        }
        let _guard = lock(&work_lock);
        if let Some(frame) = read_frame(&mut rx) {
            if let Err(err) = handler.work(&mut responder, &frame) {
                warn!(error = %err, "worker job failed");
            }
        }
    }
}

fn lock(mutex: &Mutex<()>) -> MutexGuard<'_, ()> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

fn write_frame(
    tx: &mut HeapProducer<u8>,
    scratch: &mut Vec<u8>,
    data: &[u8],
) -> Result<(), String> {
    scratch.clear();
    scratch
        .write_u32::<LittleEndian>(data.len() as u32)
        .map_err(|e| e.to_string())?;
    scratch.extend_from_slice(data);
    if tx.free_len() < scratch.len() {
        return Err(format!("worker ring full, dropping {} bytes", data.len()));
    }
    tx.push_slice(scratch);
    Ok(())
}

fn read_frame(rx: &mut HeapConsumer<u8>) -> Option<Vec<u8>> {
    if rx.len() < std::mem::size_of::<u32>() {
        return None;
    }
    let mut prefix = [0u8; 4];
    rx.pop_slice(&mut prefix);
    let len = LittleEndian::read_u32(&prefix) as usize;
    let mut data = vec![0u8; len];
    rx.pop_slice(&mut data);
    Some(data)
}
