/// Decides on which housekeeping passes a periodic set is due.
///
/// The collection interval is converted into a number of owner ticks. Regular
/// (non-diagnostic) sets are scaled by the manager's interval factor, so they
/// fire less often than diagnostics with the same nominal interval.
#[derive(Debug, Clone, PartialEq)]
pub struct PeriodicHousekeepingHelper {
    owner_period_ms: u32,
    is_diagnostics: bool,
    factor: u8,
    collection_interval_ticks: u32,
    internal_tick_counter: u32,
}

impl PeriodicHousekeepingHelper {
    pub fn new() -> Self {
        Self {
            owner_period_ms: 0,
            is_diagnostics: true,
            factor: 1,
            collection_interval_ticks: 1,
            internal_tick_counter: 1,
        }
    }

    pub fn initialize(
        &mut self,
        collection_interval_s: f32,
        owner_period_ms: u32,
        is_diagnostics: bool,
        non_diag_factor: u8,
    ) {
        self.owner_period_ms = owner_period_ms;
        self.is_diagnostics = is_diagnostics;
        self.factor = non_diag_factor.max(1);
        self.collection_interval_ticks = self.seconds_to_ticks(collection_interval_s);
        self.internal_tick_counter = 1;
    }

    /// Advances the tick counter and reports whether this pass should fire.
    pub fn check_op_necessary(&mut self) -> bool {
        if self.internal_tick_counter >= self.collection_interval_ticks {
            self.internal_tick_counter = 1;
            return true;
        }
        self.internal_tick_counter += 1;
        false
    }

    pub fn change_collection_interval(&mut self, new_interval_s: f32) {
        self.collection_interval_ticks = self.seconds_to_ticks(new_interval_s);
    }

    /// Nominal collection interval, rounded to the owner's tick resolution.
    pub fn collection_interval_seconds(&self) -> f32 {
        let nominal_ticks = if self.is_diagnostics {
            self.collection_interval_ticks
        } else {
            self.collection_interval_ticks / u32::from(self.factor)
        };
        nominal_ticks as f32 * self.owner_period_ms as f32 / 1000.0
    }

    pub fn collection_interval_ticks(&self) -> u32 {
        self.collection_interval_ticks
    }

    pub fn is_diagnostics(&self) -> bool {
        self.is_diagnostics
    }

    fn seconds_to_ticks(&self, interval_s: f32) -> u32 {
        let nominal = if self.owner_period_ms == 0 || interval_s <= 0.0 {
            1
        } else {
            let interval_ms = (interval_s * 1000.0).round() as u32;
            interval_ms.div_ceil(self.owner_period_ms).max(1)
        };
        if self.is_diagnostics {
            nominal
        } else {
            nominal.saturating_mul(u32::from(self.factor))
        }
    }
}

impl Default for PeriodicHousekeepingHelper {
    fn default() -> Self {
        Self::new()
    }
}
