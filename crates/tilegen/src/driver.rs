//! Ticks a generation job with a fixed budget and tells listeners which cells
//! changed since the previous tick.

use crate::error::GenError;
use crate::grid::Grid;
use crate::level::LevelGenJob;
use crate::types::Coordinate;

/// Anything that can be advanced in budgeted steps and exposes the grids it
/// writes.
pub trait GenerationJob {
    fn name(&self) -> &str;

    fn is_finished(&self) -> bool;

    fn step(&mut self, frames: u32) -> Result<(), GenError>;

    /// The layer the next step writes into.
    fn active_layer(&self) -> usize {
        0
    }

    fn grid(&self, layer: usize) -> Option<&Grid>;
}

impl GenerationJob for LevelGenJob {
    fn name(&self) -> &str {
        self.generator_name()
    }

    fn is_finished(&self) -> bool {
        LevelGenJob::is_finished(self)
    }

    fn step(&mut self, frames: u32) -> Result<(), GenError> {
        LevelGenJob::step(self, frames)
    }

    fn grid(&self, layer: usize) -> Option<&Grid> {
        (layer == 0).then(|| self.map())
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TickReport {
    pub finished: bool,
    /// The layer written during this tick.
    pub layer: usize,
    /// Every cell of the layer when the previous tick wrote a different one.
    pub changed: Vec<Coordinate>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum DriverState {
    Running,
    Finished,
    Halted,
}

type Listener = Box<dyn FnMut(&TickReport)>;

pub struct GenerationDriver<J> {
    job: J,
    steps_run_each_update: u32,
    listeners: Vec<Listener>,
    previous: Grid,
    previous_layer: usize,
    state: DriverState,
}

impl<J: GenerationJob> GenerationDriver<J> {
    pub fn new(job: J, steps_run_each_update: u32) -> Self {
        let previous_layer = job.active_layer();
        let previous = job.grid(previous_layer).cloned().unwrap_or_else(|| Grid::new(0, 0));
        let state = if job.is_finished() { DriverState::Finished } else { DriverState::Running };
        Self {
            job,
            steps_run_each_update: steps_run_each_update.max(1),
            listeners: Vec::new(),
            previous,
            previous_layer,
            state,
        }
    }

    pub fn add_listener(&mut self, listener: impl FnMut(&TickReport) + 'static) {
        self.listeners.push(Box::new(listener));
    }

    pub fn job(&self) -> &J {
        &self.job
    }

    pub fn into_job(self) -> J {
        self.job
    }

    pub fn is_finished(&self) -> bool {
        self.state == DriverState::Finished
    }

    /// Abandons the job between ticks.
    pub fn halt(&mut self) {
        self.state = DriverState::Halted;
    }

    /// Runs one budgeted step and notifies listeners.
    pub fn update(&mut self) -> Result<TickReport, GenError> {
        match self.state {
            DriverState::Halted => {
                return Err(GenError::Halted { job: self.job.name().to_string() });
            }
            DriverState::Finished => {
                return Err(GenError::AlreadyFinished { generator: self.job.name().to_string() });
            }
            DriverState::Running => {}
        }

        let layer = self.job.active_layer();
        self.job.step(self.steps_run_each_update)?;

        let changed = match self.job.grid(layer) {
            Some(grid) => {
                let changed = if layer == self.previous_layer {
                    grid.changed_coordinates(&self.previous)
                } else {
                    grid.coordinates_in_rect(grid.bounds(), false)
                };
                self.previous.clone_from(grid);
                changed
            }
            None => Vec::new(),
        };
        self.previous_layer = layer;

        let finished = self.job.is_finished();
        if finished {
            self.state = DriverState::Finished;
        }
        let report = TickReport { finished, layer, changed };
        for listener in &mut self.listeners {
            listener(&report);
        }
        Ok(report)
    }

    /// Updates until the job finishes; returns the number of ticks taken.
    pub fn run_to_completion(&mut self) -> Result<usize, GenError> {
        let mut ticks = 0;
        while self.state == DriverState::Running {
            self.update()?;
            ticks += 1;
        }
        Ok(ticks)
    }
}
