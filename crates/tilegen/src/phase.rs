//! Ordered, resumable phase list that every generator advances one call at a time.

use crate::error::GenError;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Phase<K> {
    pub kind: K,
    pub frames_elapsed: u32,
}

/// The phases a generator registered during setup plus the index of the one
/// currently running. Phases only move forward; the schedule is rebuilt on
/// every setup.
#[derive(Clone, Debug)]
pub struct PhaseSchedule<K> {
    phases: Vec<Phase<K>>,
    current: usize,
}

impl<K> Default for PhaseSchedule<K> {
    fn default() -> Self {
        Self { phases: Vec::new(), current: 0 }
    }
}

impl<K: Copy> PhaseSchedule<K> {
    pub fn clear(&mut self) {
        self.phases.clear();
        self.current = 0;
    }

    pub fn push(&mut self, kind: K) {
        self.phases.push(Phase { kind, frames_elapsed: 0 });
    }

    pub fn is_finished(&self) -> bool {
        self.current >= self.phases.len()
    }

    pub fn current(&self) -> Option<K> {
        self.phases.get(self.current).map(|phase| phase.kind)
    }

    pub fn current_index(&self) -> usize {
        self.current
    }

    pub fn phases(&self) -> &[Phase<K>] {
        &self.phases
    }

    /// Counts one invocation of the current phase and returns its kind.
    pub fn begin_frame(&mut self, generator: &str) -> Result<K, GenError> {
        let Some(phase) = self.phases.get_mut(self.current) else {
            return Err(GenError::AlreadyFinished { generator: generator.to_string() });
        };
        phase.frames_elapsed = phase.frames_elapsed.saturating_add(1);
        Ok(phase.kind)
    }

    pub fn next_phase(&mut self) {
        if self.current < self.phases.len() {
            self.current += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    enum Step {
        First,
        Second,
    }

    #[test]
    fn schedule_advances_and_counts_invocations() {
        let mut schedule = PhaseSchedule::default();
        schedule.push(Step::First);
        schedule.push(Step::Second);

        assert_eq!(schedule.begin_frame("test").unwrap(), Step::First);
        assert_eq!(schedule.begin_frame("test").unwrap(), Step::First);
        schedule.next_phase();
        assert_eq!(schedule.begin_frame("test").unwrap(), Step::Second);
        schedule.next_phase();

        assert!(schedule.is_finished());
        assert_eq!(schedule.phases()[0].frames_elapsed, 2);
        assert_eq!(schedule.phases()[1].frames_elapsed, 1);
    }

    #[test]
    fn running_a_finished_schedule_is_an_error() {
        let mut schedule: PhaseSchedule<Step> = PhaseSchedule::default();
        assert!(schedule.is_finished());
        let err = schedule.begin_frame("caves").unwrap_err();
        assert!(matches!(err, GenError::AlreadyFinished { ref generator } if generator == "caves"));
        schedule.next_phase();
        assert_eq!(schedule.current_index(), 0);
    }
}
