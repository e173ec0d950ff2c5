//! Frame scheduling and presentation state
//!
//! The host event loop calls [`FrameDriver::tick`] once per display refresh.
//! The driver decides whether a frame is drawn and in which presentation
//! mode; it never skips frames on its own while running.

use log::{info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PresentationState {
    /// Constructed and sized, no frame drawn yet
    Idle,
    /// Single view on the flat display
    Presenting2d,
    /// Side-by-side stereo for a head-mounted viewer
    PresentingImmersive,
}

#[derive(Debug)]
pub struct FrameDriver {
    state: PresentationState,
    running: bool,
    immersive_supported: bool,
    frames: u64,
}

impl FrameDriver {
    pub fn new(immersive_supported: bool) -> Self {
        Self {
            state: PresentationState::Idle,
            running: false,
            immersive_supported,
            frames: 0,
        }
    }

    pub fn start(&mut self) {
        if !self.running {
            info!("Frame driver started");
        }
        self.running = true;
    }

    /// Halt ticking (teardown / suspend). Any presentation ends with it; the
    /// next start begins from `Idle` again.
    pub fn stop(&mut self) {
        if self.running {
            info!("Frame driver stopped after {} frames", self.frames);
        }
        self.running = false;
        self.state = PresentationState::Idle;
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn state(&self) -> PresentationState {
        self.state
    }

    pub fn immersive_supported(&self) -> bool {
        self.immersive_supported
    }

    pub fn frame_count(&self) -> u64 {
        self.frames
    }

    /// Advance one display refresh. Returns the mode to draw in, or `None`
    /// while stopped.
    pub fn tick(&mut self) -> Option<PresentationState> {
        if !self.running {
            return None;
        }
        if self.state == PresentationState::Idle {
            self.state = PresentationState::Presenting2d;
            info!("Presenting 2D");
        }
        self.frames += 1;
        Some(self.state)
    }

    /// User gesture on the session control. Returns whether immersive
    /// presentation started.
    pub fn request_immersive(&mut self) -> bool {
        if !self.immersive_supported {
            warn!("Immersive presentation not supported");
            return false;
        }
        if !self.running || self.state == PresentationState::PresentingImmersive {
            return false;
        }
        self.state = PresentationState::PresentingImmersive;
        info!("Entered immersive presentation");
        true
    }

    /// The platform ended the immersive session; drawing continues in 2D
    pub fn end_immersive(&mut self) -> bool {
        if self.state != PresentationState::PresentingImmersive {
            return false;
        }
        self.state = PresentationState::Presenting2d;
        info!("Immersive presentation ended");
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_tick_starts_2d_presentation() {
        let mut driver = FrameDriver::new(true);
        assert_eq!(driver.state(), PresentationState::Idle);
        assert_eq!(driver.tick(), None);

        driver.start();
        assert_eq!(driver.state(), PresentationState::Idle);
        assert_eq!(driver.tick(), Some(PresentationState::Presenting2d));
        assert_eq!(driver.tick(), Some(PresentationState::Presenting2d));
        assert_eq!(driver.frame_count(), 2);
    }

    #[test]
    fn immersive_round_trip() {
        let mut driver = FrameDriver::new(true);
        driver.start();
        driver.tick();

        assert!(driver.request_immersive());
        assert!(!driver.request_immersive());
        assert_eq!(driver.tick(), Some(PresentationState::PresentingImmersive));

        assert!(driver.end_immersive());
        assert!(!driver.end_immersive());
        assert_eq!(driver.tick(), Some(PresentationState::Presenting2d));
    }

    #[test]
    fn unsupported_immersive_stays_2d() {
        let mut driver = FrameDriver::new(false);
        driver.start();
        driver.tick();
        assert!(!driver.request_immersive());
        assert_eq!(driver.state(), PresentationState::Presenting2d);
    }

    #[test]
    fn stop_halts_ticks_and_resets() {
        let mut driver = FrameDriver::new(true);
        driver.start();
        driver.tick();
        driver.request_immersive();

        driver.stop();
        assert!(!driver.is_running());
        assert_eq!(driver.tick(), None);
        assert_eq!(driver.state(), PresentationState::Idle);
        assert!(!driver.request_immersive());

        driver.start();
        assert_eq!(driver.tick(), Some(PresentationState::Presenting2d));
        assert_eq!(driver.frame_count(), 2);
    }
}
