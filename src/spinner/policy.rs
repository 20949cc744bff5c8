//! Handling of tasks left over from earlier spin requests.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// What a new spin request does with loops and timers from earlier requests.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Display, EnumString, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum SpinPolicy {
    /// Leave earlier loops and timers running. An earlier timer may clear
    /// the flag before a later request's duration is up.
    #[default]
    #[strum(to_string = "accumulate", serialize = "ACCUMULATE")]
    Accumulate,

    /// Cancel earlier loops and timers before starting new ones.
    #[strum(to_string = "replace", serialize = "REPLACE")]
    Replace,
}
