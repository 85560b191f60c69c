/// Events emitted during a simulation step.
/// The presentation layer consumes these for the status line and the log.

use crate::domain::entity::ElementId;
use crate::domain::tile::{Affinity, Block};

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum GameEvent {
    StoneCollected { by: Affinity, stone: ElementId },
    ExitOpened { exit: ElementId, affinity: Affinity },
    ButtonPressed { button: ElementId },
    DoorOpened { door: ElementId },
    DoorClosed { door: ElementId },
    SwitchToggled { switch: ElementId, active: bool },
    PortalReversed { portal: ElementId, is_input: bool },
    Teleported { who: Affinity, from: ElementId, to: ElementId },
    PlayerBumped { who: Affinity },
    PlayerDied { who: Affinity, block: Block },
    LevelWon,
    LevelLost,
}
