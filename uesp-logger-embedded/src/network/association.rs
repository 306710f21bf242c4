use core::time::Duration;

use embedded_hal::delay::DelayNs;

use crate::config::NetworkConfig;

use super::WirelessInterface;

pub const DEFAULT_SETTLE_TIME: Duration = Duration::from_secs(5);
pub const DEFAULT_CONNECT_WAIT: Duration = Duration::from_secs(5);
pub const DEFAULT_RETRY_BACKOFF: Duration = Duration::from_secs(30);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssociationState {
    Disassociated,
    Activating,
    Connecting,
    Associated,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AssociationTimings {
    /// Wait after activating the interface
    pub settle: Duration,
    /// Wait between the connect request and the association check
    pub connect_wait: Duration,
    /// Wait before the next attempt after a failed one
    pub retry_backoff: Duration,
}

impl Default for AssociationTimings {
    fn default() -> Self {
        Self {
            settle: DEFAULT_SETTLE_TIME,
            connect_wait: DEFAULT_CONNECT_WAIT,
            retry_backoff: DEFAULT_RETRY_BACKOFF,
        }
    }
}

/// Keeps the wireless interface associated with the configured access
/// point.
///
/// There is no attempt limit: an unattended logger has no other way to
/// deliver its readings, so [`ensure_associated`](Self::ensure_associated)
/// only returns once the interface is associated. Callers wanting a bound
/// must impose it from outside.
pub struct NetworkAssociation<W, D>
where
    W: WirelessInterface,
    D: DelayNs,
{
    interface: W,
    delay: D,
    network: NetworkConfig,
    timings: AssociationTimings,
    state: AssociationState,
}

impl<W, D> NetworkAssociation<W, D>
where
    W: WirelessInterface,
    D: DelayNs,
{
    pub fn new(interface: W, delay: D, network: NetworkConfig) -> Self {
        Self {
            interface,
            delay,
            network,
            timings: AssociationTimings::default(),
            state: AssociationState::Disassociated,
        }
    }

    pub fn with_timings(mut self, timings: AssociationTimings) -> Self {
        self.timings = timings;
        self
    }

    pub fn state(&self) -> AssociationState {
        self.state
    }

    pub fn timings(&self) -> &AssociationTimings {
        &self.timings
    }

    pub fn interface(&self) -> &W {
        &self.interface
    }

    pub fn interface_mut(&mut self) -> &mut W {
        &mut self.interface
    }

    pub fn is_associated(&self) -> bool {
        self.interface.is_connected()
    }

    /// Blocks until the interface is associated and returns the number of
    /// failed attempts it took.
    pub fn ensure_associated(&mut self) -> u32 {
        log::info!("Checking network..");

        let mut retries = 0u32;
        while !self.interface.is_connected() {
            self.transition_to(AssociationState::Activating);
            if !self.interface.is_active() {
                log::info!("Activating wireless interface..");
                if let Err(e) = self.interface.activate() {
                    log::warn!("Failed to activate wireless interface: {:?}", e);
                }
            }
            self.wait(self.timings.settle);

            self.transition_to(AssociationState::Connecting);
            self.check_visibility();
            log::info!("Connecting to {}..", self.network.ssid);
            if let Err(e) = self
                .interface
                .connect(&self.network.ssid, &self.network.password)
            {
                log::warn!("Connect request to {} failed: {:?}", self.network.ssid, e);
            }
            self.wait(self.timings.connect_wait);

            if !self.interface.is_connected() {
                retries += 1;
                log::warn!(
                    "Not connected (attempt {}), retrying in {}s..",
                    retries,
                    self.timings.retry_backoff.as_secs()
                );
                self.wait(self.timings.retry_backoff);
            }
        }

        self.transition_to(AssociationState::Associated);
        log::info!("Connected to {}", self.network.ssid);

        retries
    }

    fn check_visibility(&mut self) {
        if let Some(visible) = self.interface.visible_networks() {
            if !visible.iter().any(|ssid| *ssid == self.network.ssid) {
                log::warn!(
                    "SSID {} not found, available: {:?}",
                    self.network.ssid,
                    visible
                );
            }
        }
    }

    fn wait(&mut self, duration: Duration) {
        self.delay
            .delay_ms(u32::try_from(duration.as_millis()).unwrap_or(u32::MAX));
    }

    fn transition_to(&mut self, state: AssociationState) {
        if self.state != state {
            log::debug!("Association state: {:?} -> {:?}", self.state, state);
            self.state = state;
        }
    }
}

#[cfg(test)]
mod tests {
    use alloc::string::ToString;

    use super::*;
    use crate::mock::{MockInterface, RecordingDelay};

    fn network() -> NetworkConfig {
        NetworkConfig {
            ssid: "home".to_string(),
            password: "secret".to_string(),
        }
    }

    #[test]
    fn test_already_associated() {
        let interface = MockInterface::associated();
        let delay = RecordingDelay::new();
        let mut association = NetworkAssociation::new(interface.clone(), delay.clone(), network());

        assert_eq!(association.ensure_associated(), 0);
        assert_eq!(association.state(), AssociationState::Associated);
        assert_eq!(interface.state().connect_calls, 0);
        assert!(delay.calls().is_empty());
    }

    #[test]
    fn test_first_attempt_succeeds() {
        let interface = MockInterface::associating_after(0);
        let delay = RecordingDelay::new();
        let mut association = NetworkAssociation::new(interface.clone(), delay.clone(), network());

        assert_eq!(association.state(), AssociationState::Disassociated);
        assert_eq!(association.ensure_associated(), 0);
        assert_eq!(delay.millis(), vec![5000, 5000]);

        let state = interface.state();
        assert_eq!(state.activations, 1);
        assert_eq!(state.connect_calls, 1);
        assert_eq!(state.last_ssid.as_deref(), Some("home"));
        assert_eq!(state.last_password.as_deref(), Some("secret"));
    }

    #[test]
    fn test_returns_after_exactly_n_retries() {
        for failures in [1u32, 3, 7] {
            let interface = MockInterface::associating_after(failures);
            let delay = RecordingDelay::new();
            let mut association =
                NetworkAssociation::new(interface.clone(), delay.clone(), network());

            assert_eq!(association.ensure_associated(), failures);
            assert!(association.is_associated());
            assert_eq!(interface.state().connect_calls, failures + 1);

            let mut expected = Vec::new();
            for _ in 0..failures {
                expected.extend([5000, 5000, 30000]);
            }
            expected.extend([5000, 5000]);
            assert_eq!(delay.millis(), expected);
        }
    }

    #[test]
    fn test_activates_only_when_inactive() {
        let interface = MockInterface::associating_after(2);
        let mut association =
            NetworkAssociation::new(interface.clone(), RecordingDelay::new(), network());

        association.ensure_associated();

        assert_eq!(interface.state().activations, 1);
    }

    #[test]
    fn test_connect_errors_are_retried() {
        let interface = MockInterface::associating_after(2).rejecting_failed_connects();
        let mut association =
            NetworkAssociation::new(interface.clone(), RecordingDelay::new(), network());

        assert_eq!(association.ensure_associated(), 2);
        assert_eq!(association.state(), AssociationState::Associated);
    }

    #[test]
    fn test_custom_timings() {
        let timings = AssociationTimings {
            settle: Duration::from_millis(100),
            connect_wait: Duration::from_millis(200),
            retry_backoff: Duration::from_millis(300),
        };
        let delay = RecordingDelay::new();
        let mut association = NetworkAssociation::new(
            MockInterface::associating_after(1),
            delay.clone(),
            network(),
        )
        .with_timings(timings);

        association.ensure_associated();

        assert_eq!(delay.millis(), vec![100, 200, 300, 100, 200]);
    }

    #[test]
    fn test_long_waits_saturate() {
        let timings = AssociationTimings {
            settle: Duration::from_millis(10),
            connect_wait: Duration::from_millis(10),
            retry_backoff: Duration::from_secs(4_294_968),
        };
        let delay = RecordingDelay::new();
        let mut association = NetworkAssociation::new(
            MockInterface::associating_after(1),
            delay.clone(),
            network(),
        )
        .with_timings(timings);

        association.ensure_associated();

        assert_eq!(delay.millis(), vec![10, 10, u32::MAX, 10, 10]);
    }

    #[test]
    fn test_missing_ssid_does_not_block_attempt() {
        let interface = MockInterface::associating_after(0).with_visible_networks(&["neighbour"]);
        let mut association =
            NetworkAssociation::new(interface.clone(), RecordingDelay::new(), network());

        assert_eq!(association.ensure_associated(), 0);
        assert_eq!(interface.state().connect_calls, 1);
    }
}
