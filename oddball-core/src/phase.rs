/// Defines task phases and how they chain
pub trait Phase: Copy + Clone + PartialEq + Send + Sync + std::fmt::Debug + Default {
    fn accepts_response(&self) -> bool;
    fn is_pulse_paced(&self) -> bool;
    fn next(&self) -> Option<Self>;
}

#[derive(Copy, Debug, Clone, PartialEq, Eq, Default)]
pub enum TaskPhase {
    #[default]
    BlackScreen,
    WaitFirstPulse,
    Flash,
    Iti,
    CrossOn,
    CrossRotate,
    /// Oddball or Silence, decided by the trial sequence.
    Tone,
    ResponsePeriod,
    End,
}

impl Phase for TaskPhase {
    fn accepts_response(&self) -> bool {
        matches!(self, Self::ResponsePeriod)
    }

    fn is_pulse_paced(&self) -> bool {
        matches!(
            self,
            Self::WaitFirstPulse | Self::Flash | Self::Iti | Self::CrossOn | Self::ResponsePeriod
        )
    }

    /// Successor inside a trial. `ResponsePeriod` loops back to `Iti`; the
    /// session swaps that for `End` after the last trial.
    fn next(&self) -> Option<Self> {
        use TaskPhase::*;
        Some(match self {
            BlackScreen => WaitFirstPulse,
            WaitFirstPulse => Flash,
            Flash => Iti,
            Iti => CrossOn,
            CrossOn => CrossRotate,
            CrossRotate => Tone,
            Tone => ResponsePeriod,
            ResponsePeriod => Iti,
            End => return None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trial_phases_cycle_back_to_iti() {
        let mut phase = TaskPhase::Iti;
        let mut seen = vec![phase];
        for _ in 0..5 {
            phase = phase.next().unwrap();
            seen.push(phase);
        }
        assert_eq!(
            seen,
            vec![
                TaskPhase::Iti,
                TaskPhase::CrossOn,
                TaskPhase::CrossRotate,
                TaskPhase::Tone,
                TaskPhase::ResponsePeriod,
                TaskPhase::Iti,
            ]
        );
    }

    #[test]
    fn end_has_no_successor() {
        assert_eq!(TaskPhase::End.next(), None);
    }

    #[test]
    fn only_response_period_accepts_responses() {
        assert!(TaskPhase::ResponsePeriod.accepts_response());
        assert!(!TaskPhase::Iti.accepts_response());
        assert!(!TaskPhase::CrossRotate.is_pulse_paced());
        assert!(TaskPhase::Flash.is_pulse_paced());
    }
}
