use glam::Vec2;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TryRecvError;

/// Intent sent from an input producer (keyboard, joystick, touch look) to the frame loop
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum InputCommand {
    /// Normalized movement: x = strafe right, y = forward.
    /// Persists until the next `Move`.
    Move(Vec2),
    /// Yaw/pitch deltas in radians
    Look(Vec2),
    Jump,
    Fire,
    Reload,
}

/// Everything the simulation consumes for one frame
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct FrameIntents {
    pub movement: Vec2,
    pub look: Vec2,
    pub jump: bool,
    pub fire: bool,
    pub reload: bool,
}

impl FrameIntents {
    pub fn idle() -> Self {
        Self::default()
    }

    pub fn moving(movement: Vec2) -> Self {
        Self {
            movement,
            ..Self::default()
        }
    }

    pub fn firing() -> Self {
        Self {
            fire: true,
            ..Self::default()
        }
    }
}

/// Movement vector from held direction keys. Diagonals are normalized.
pub fn intents_from_keys(forward: bool, back: bool, left: bool, right: bool) -> Vec2 {
    let axis = |pos: bool, neg: bool| (pos as i8 - neg as i8) as f32;
    Vec2::new(axis(right, left), axis(forward, back)).normalize_or_zero()
}

/// Per-frame coalescing of input commands.
/// Movement is held state; look deltas and discrete intents last one frame.
#[derive(Debug, Default)]
pub struct IntentQueue {
    movement: Vec2,
}

impl IntentQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn movement(&self) -> Vec2 {
        self.movement
    }

    /// Coalesce commands from the channel, keeping only the latest movement.
    /// Look deltas accumulate; jump/fire/reload are OR-ed.
    /// Returns `None` once every producer has gone away and the queue is empty.
    pub fn drain(&mut self, rx: &mut mpsc::Receiver<InputCommand>) -> Option<FrameIntents> {
        let mut intents = FrameIntents::default();

        // Drain all available commands
        loop {
            match rx.try_recv() {
                Ok(cmd) => self.apply(&mut intents, cmd),
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    if intents == FrameIntents::default() {
                        return None;
                    }
                    break;
                }
            }
        }

        intents.movement = self.movement;
        Some(intents)
    }

    fn apply(&mut self, intents: &mut FrameIntents, cmd: InputCommand) {
        match cmd {
            InputCommand::Move(movement) => self.movement = movement.clamp_length_max(1.0),
            InputCommand::Look(delta) => intents.look += delta,
            InputCommand::Jump => intents.jump = true,
            InputCommand::Fire => intents.fire = true,
            InputCommand::Reload => intents.reload = true,
        }
    }
}
