use std::cell::UnsafeCell;
use std::sync::{Condvar, Mutex};

/// Counting semaphore built on `Mutex`/`Condvar`.
///
/// Used for worker-thread wakeups and as the shared work lock that
/// serializes a plugin's `work` entry point across the threaded and the
/// inline invocation paths.
#[derive(Debug)]
pub struct Semaphore {
    count: Mutex<usize>,
    cv: Condvar,
}

impl Semaphore {
    pub fn new(initial: usize) -> Self {
        Self {
            count: Mutex::new(initial),
            cv: Condvar::new(),
        }
    }

    pub fn post(&self) {
        let mut count = match self.count.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        *count += 1;
        self.cv.notify_one();
    }

    pub fn wait(&self) {
        let mut count = match self.count.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        while *count == 0 {
            count = match self.cv.wait(count) {
                Ok(guard) => guard,
                Err(poisoned) => poisoned.into_inner(),
            };
        }
        *count -= 1;
    }
}

/// Interior mutability cell for state reached from plugin callbacks.
///
/// The LV2 calling contract already serializes every access path that
/// goes through one of these (single real-time thread, or the worker
/// thread holding the work lock), so no runtime locking is performed.
#[derive(Debug)]
pub struct UnsafeMutex<T> {
    data: UnsafeCell<T>,
}

impl<T> UnsafeMutex<T> {
    pub fn new(data: T) -> Self {
        UnsafeMutex {
            data: UnsafeCell::new(data),
        }
    }

    #[allow(clippy::mut_from_ref)]
    pub fn lock(&self) -> &mut T {
        unsafe { &mut *self.data.get() }
    }
}

unsafe impl<T: Send> Send for UnsafeMutex<T> {}
unsafe impl<T: Send> Sync for UnsafeMutex<T> {}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn semaphore_wakes_waiter() {
        let sem = Arc::new(Semaphore::new(0));
        let sem2 = sem.clone();
        let handle = thread::spawn(move || {
            sem2.wait();
        });
        sem.post();
        handle.join().expect("waiter finished");
    }

    #[test]
    fn semaphore_counts_posts() {
        let sem = Semaphore::new(2);
        sem.wait();
        sem.wait();
        sem.post();
        sem.wait();
    }
}
