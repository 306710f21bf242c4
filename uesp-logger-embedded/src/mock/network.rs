use core::cell::{Ref, RefCell};

use alloc::rc::Rc;
use alloc::string::{String, ToString};
use alloc::vec::Vec;

use crate::network::WirelessInterface;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MockWifiError;

#[derive(Debug, Default)]
pub struct MockInterfaceState {
    /// Connect requests that fail before one succeeds
    pub failures_before_association: u32,
    /// Failed connect requests also return an error
    pub reject_failed_connects: bool,
    pub associated_from_start: bool,
    pub active: bool,
    pub activations: u32,
    pub connect_calls: u32,
    pub last_ssid: Option<String>,
    pub last_password: Option<String>,
    pub visible: Option<Vec<String>>,
}

/// Wireless interface that associates after a fixed number of failed
/// connect requests. Clones share the same state.
#[derive(Debug, Clone, Default)]
pub struct MockInterface {
    state: Rc<RefCell<MockInterfaceState>>,
}

impl MockInterface {
    pub fn associating_after(failures: u32) -> Self {
        let interface = Self::default();
        interface.state.borrow_mut().failures_before_association = failures;
        interface
    }

    pub fn associated() -> Self {
        let interface = Self::default();
        {
            let mut state = interface.state.borrow_mut();
            state.associated_from_start = true;
            state.active = true;
        }
        interface
    }

    pub fn rejecting_failed_connects(self) -> Self {
        self.state.borrow_mut().reject_failed_connects = true;
        self
    }

    pub fn with_visible_networks(self, ssids: &[&str]) -> Self {
        self.state.borrow_mut().visible = Some(ssids.iter().map(|ssid| ssid.to_string()).collect());
        self
    }

    pub fn state(&self) -> Ref<'_, MockInterfaceState> {
        self.state.borrow()
    }
}

impl WirelessInterface for MockInterface {
    type Error = MockWifiError;

    fn is_active(&self) -> bool {
        self.state.borrow().active
    }

    fn activate(&mut self) -> Result<(), Self::Error> {
        let mut state = self.state.borrow_mut();
        state.active = true;
        state.activations += 1;
        Ok(())
    }

    fn connect(&mut self, ssid: &str, password: &str) -> Result<(), Self::Error> {
        let mut state = self.state.borrow_mut();
        state.connect_calls += 1;
        state.last_ssid = Some(ssid.to_string());
        state.last_password = Some(password.to_string());

        if state.reject_failed_connects && state.connect_calls <= state.failures_before_association
        {
            return Err(MockWifiError);
        }
        Ok(())
    }

    fn is_connected(&self) -> bool {
        let state = self.state.borrow();
        state.associated_from_start || state.connect_calls > state.failures_before_association
    }

    fn visible_networks(&mut self) -> Option<Vec<String>> {
        self.state.borrow().visible.clone()
    }
}
