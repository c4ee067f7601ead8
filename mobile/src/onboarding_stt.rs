/// Steps of the first-run wizard, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OnboardingStep {
    Welcome,
    PermissionRequest,
    Ready,
}

#[derive(Debug, Clone)]
pub struct OnboardingFlow {
    pub step: OnboardingStep,
    pub completed: bool,
}
