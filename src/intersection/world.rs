use super::light::LightController;
use super::queues::DirectionalQueues;
use super::stats::RunStatistics;

/// Shared state of one run, read and written by the signal, car and arrival
/// processes.
#[derive(Debug)]
pub struct IntersectionWorld {
    pub light: LightController,
    pub queues: DirectionalQueues,
    pub stats: RunStatistics,
}

impl IntersectionWorld {
    pub fn new(light: LightController) -> Self {
        Self {
            light,
            queues: DirectionalQueues::new(),
            stats: RunStatistics::new(),
        }
    }

    /// Cars that arrived but had not departed when the run stopped
    pub fn cars_in_intersection(&self) -> usize {
        self.queues.total()
    }
}
