//! External actions fired by trigger rules

/// Identifier of an action known to an [`Actions`] implementation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ActionId(pub u8);

/// Action invocation errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ActionError {
    /// No action registered under this id
    UnknownAction(ActionId),
    /// The actuator refused or failed the command
    Actuator,
}

impl core::fmt::Display for ActionError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::UnknownAction(id) => write!(f, "Unknown action {}", id.0),
            Self::Actuator => write!(f, "Actuator failure"),
        }
    }
}

impl core::error::Error for ActionError {}

/// Set of actuators addressable by [`ActionId`]
///
/// Invocations must return promptly; the scheduler calls them from the
/// main loop between second ticks.
pub trait Actions {
    fn invoke(&mut self, id: ActionId) -> Result<(), ActionError>;
}
