//! Machine-level state.

/// Observable state of one machine instance.
///
/// `S` is the protocol's own set of named intermediate states; the engine
/// only distinguishes the two ends of the lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MachineState<S> {
    /// Protocol is running from its entry point (initial state, and the
    /// state restored by an abort).
    Started,
    /// Implementor-defined progress marker recorded via `set_state`.
    Phase(S),
    /// `run` returned `Ok`; terminal until an abort restarts the machine.
    Completed,
}

impl<S> MachineState<S> {
    /// Whether the machine has run to completion.
    pub fn is_completed(&self) -> bool {
        matches!(self, Self::Completed)
    }

    /// Whether the machine is at its initial state.
    pub fn is_started(&self) -> bool {
        matches!(self, Self::Started)
    }

    /// The protocol-defined phase, if the machine is in one.
    pub fn phase(&self) -> Option<&S> {
        match self {
            Self::Phase(s) => Some(s),
            _ => None,
        }
    }
}

impl<S: std::fmt::Display> std::fmt::Display for MachineState<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Started => write!(f, "started"),
            Self::Phase(s) => write!(f, "{s}"),
            Self::Completed => write!(f, "completed"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_predicates() {
        let started: MachineState<&str> = MachineState::Started;
        assert!(started.is_started());
        assert!(!started.is_completed());
        assert_eq!(started.phase(), None);

        let phase = MachineState::Phase("negotiating");
        assert_eq!(phase.phase(), Some(&"negotiating"));

        let done: MachineState<&str> = MachineState::Completed;
        assert!(done.is_completed());
    }

    #[test]
    fn test_state_display() {
        assert_eq!(MachineState::<&str>::Started.to_string(), "started");
        assert_eq!(MachineState::Phase("waiting-ack").to_string(), "waiting-ack");
        assert_eq!(MachineState::<&str>::Completed.to_string(), "completed");
    }
}
