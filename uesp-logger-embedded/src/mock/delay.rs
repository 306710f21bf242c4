use core::cell::RefCell;

use alloc::rc::Rc;
use alloc::vec::Vec;

use embedded_hal::delay::DelayNs;

#[derive(Debug, Clone, Copy, Default)]
pub struct NoopDelay;

impl DelayNs for NoopDelay {
    fn delay_ns(&mut self, _ns: u32) {}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DelayCall {
    Nanos(u32),
    Micros(u32),
    Millis(u32),
}

/// Records every wait instead of blocking. Clones share the same record.
#[derive(Debug, Clone, Default)]
pub struct RecordingDelay {
    calls: Rc<RefCell<Vec<DelayCall>>>,
}

impl RecordingDelay {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> Vec<DelayCall> {
        self.calls.borrow().clone()
    }

    pub fn micros(&self) -> Vec<u32> {
        self.calls
            .borrow()
            .iter()
            .filter_map(|call| match call {
                DelayCall::Micros(us) => Some(*us),
                _ => None,
            })
            .collect()
    }

    pub fn millis(&self) -> Vec<u32> {
        self.calls
            .borrow()
            .iter()
            .filter_map(|call| match call {
                DelayCall::Millis(ms) => Some(*ms),
                _ => None,
            })
            .collect()
    }

    pub fn total_millis(&self) -> u64 {
        self.millis().iter().map(|&ms| u64::from(ms)).sum()
    }
}

impl DelayNs for RecordingDelay {
    fn delay_ns(&mut self, ns: u32) {
        self.calls.borrow_mut().push(DelayCall::Nanos(ns));
    }

    fn delay_us(&mut self, us: u32) {
        self.calls.borrow_mut().push(DelayCall::Micros(us));
    }

    fn delay_ms(&mut self, ms: u32) {
        self.calls.borrow_mut().push(DelayCall::Millis(ms));
    }
}
