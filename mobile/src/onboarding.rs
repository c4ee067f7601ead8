pub use crate::onboarding_stt::*;
use tracing::{debug, info};

impl Default for OnboardingFlow {
    fn default() -> Self {
        Self::new()
    }
}

impl OnboardingStep {
    /// 1-based position shown in the step indicator.
    pub fn index(&self) -> usize {
        match self {
            OnboardingStep::Welcome => 1,
            OnboardingStep::PermissionRequest => 2,
            OnboardingStep::Ready => 3,
        }
    }

    pub const COUNT: usize = 3;
}

impl OnboardingFlow {
    pub fn new() -> Self {
        Self {
            step: OnboardingStep::Welcome,
            completed: false,
        }
    }

    pub fn step(&self) -> OnboardingStep {
        self.step
    }

    pub fn is_complete(&self) -> bool {
        self.completed
    }

    /// Move forward on an explicit user action.
    ///
    /// The permission step ignores this; only a permission result moves it on.
    /// Returns true once the wizard has finished.
    pub fn advance(&mut self) -> bool {
        match self.step {
            OnboardingStep::Welcome => {
                self.step = OnboardingStep::PermissionRequest;
            }
            OnboardingStep::PermissionRequest => {
                debug!("Waiting for permission result, not advancing");
            }
            OnboardingStep::Ready => {
                if !self.completed {
                    info!("Onboarding completed");
                }
                self.completed = true;
            }
        }
        self.completed
    }

    /// Feed the broker's permission callback. A denial keeps the wizard on the
    /// permission step so it can be shown again.
    pub fn on_permission_result(&mut self, granted: bool) {
        if self.step != OnboardingStep::PermissionRequest {
            debug!("Ignoring permission result in step {:?}", self.step);
            return;
        }
        if granted {
            self.step = OnboardingStep::Ready;
        } else {
            info!("Permission denied, staying on permission step");
        }
    }
}
