use std::time::Duration;

/// Default timer interrupt period.
pub const DEFAULT_TIMER_PERIOD: Duration = Duration::from_secs(1);

/// Runtime settings for a VM instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VmConfig {
    /// How often the timer interrupt fires. Zero disables the timer.
    pub timer_period: Duration,
    /// Whether stdin is polled for keyboard interrupts.
    pub keyboard: bool,
}

impl Default for VmConfig {
    fn default() -> Self {
        VmConfig {
            timer_period: DEFAULT_TIMER_PERIOD,
            keyboard: true,
        }
    }
}

impl VmConfig {
    pub fn with_timer_period(mut self, period: Duration) -> Self {
        self.timer_period = period;
        self
    }

    pub fn with_keyboard(mut self, enabled: bool) -> Self {
        self.keyboard = enabled;
        self
    }
}
