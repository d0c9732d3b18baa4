//! Mental-task labels and actuator commands

use serde::{Deserialize, Serialize};

/// Mental-task classes produced by the experiment paradigms
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum TaskLabel {
    Rest,
    LeftHand,
    RightHand,
    BothLegs,
    BothHands,
    Calm,
    Active,
}

impl TaskLabel {
    /// Collapse the multi-class vocabulary to the binary paradigm:
    /// rest stays rest, calm stays calm, every other task becomes active.
    pub fn to_binary(self) -> TaskLabel {
        match self {
            TaskLabel::Rest => TaskLabel::Rest,
            TaskLabel::Calm => TaskLabel::Calm,
            _ => TaskLabel::Active,
        }
    }

    /// Fixed lookup from predicted task to actuator command.
    pub fn command(self) -> ControlCommand {
        match self {
            TaskLabel::LeftHand => ControlCommand::TurnLeft,
            TaskLabel::RightHand => ControlCommand::TurnRight,
            TaskLabel::BothLegs | TaskLabel::BothHands | TaskLabel::Active => {
                ControlCommand::Headlight
            }
            TaskLabel::Rest | TaskLabel::Calm => ControlCommand::Straight,
        }
    }
}

/// Discrete command set understood by the actuator boundary
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ControlCommand {
    TurnLeft,
    TurnRight,
    Headlight,
    Straight,
}

impl std::fmt::Display for TaskLabel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TaskLabel::Rest => write!(f, "rest"),
            TaskLabel::LeftHand => write!(f, "left hand"),
            TaskLabel::RightHand => write!(f, "right hand"),
            TaskLabel::BothLegs => write!(f, "both legs"),
            TaskLabel::BothHands => write!(f, "both hands"),
            TaskLabel::Calm => write!(f, "calm"),
            TaskLabel::Active => write!(f, "active"),
        }
    }
}

impl std::fmt::Display for ControlCommand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ControlCommand::TurnLeft => write!(f, "turn left"),
            ControlCommand::TurnRight => write!(f, "turn right"),
            ControlCommand::Headlight => write!(f, "headlight"),
            ControlCommand::Straight => write!(f, "straight"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_binary_collapse() {
        assert_eq!(TaskLabel::Rest.to_binary(), TaskLabel::Rest);
        assert_eq!(TaskLabel::Calm.to_binary(), TaskLabel::Calm);
        assert_eq!(TaskLabel::LeftHand.to_binary(), TaskLabel::Active);
        assert_eq!(TaskLabel::BothLegs.to_binary(), TaskLabel::Active);
    }

    #[test]
    fn test_command_table() {
        assert_eq!(TaskLabel::LeftHand.command(), ControlCommand::TurnLeft);
        assert_eq!(TaskLabel::RightHand.command(), ControlCommand::TurnRight);
        assert_eq!(TaskLabel::Rest.command(), ControlCommand::Straight);
        assert_eq!(TaskLabel::BothHands.command(), ControlCommand::Headlight);
    }
}
