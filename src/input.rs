//! Keyboard input surface: discrete named commands over the simulation.

use winit::event::{ElementState, KeyEvent};
use winit::keyboard::{KeyCode, PhysicalKey};

/// Every operation the UI can ask of the simulation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    RangeUp,
    RangeDown,
    ToggleShape,
    NextStrategy,
    PrevStrategy,
    NextPalette,
    PrevPalette,
    InertiaUp,
    InertiaDown,
    DensityUp,
    DensityDown,
    Reseed,
    RegenerateRules,
    TogglePause,
    ToggleHelp,
    Quit,
}

/// Key bindings. Shown verbatim in the help overlay.
pub const BINDINGS: &[(&str, &str)] = &[
    ("Up / Down", "neighbor range +/-"),
    ("N", "toggle Moore / von Neumann"),
    ("W / Q", "next / previous weight strategy"),
    ("C / X", "next / previous palette"),
    ("= / -", "cell inertia +/-"),
    ("D / S", "resolution density up / down"),
    ("R", "reseed grid"),
    ("T", "regenerate rule table"),
    ("Space", "pause / resume"),
    ("H or F1", "toggle this overlay"),
    ("Esc", "quit"),
];

pub fn command_for_key(key: KeyCode) -> Option<Command> {
    let command = match key {
        KeyCode::ArrowUp => Command::RangeUp,
        KeyCode::ArrowDown => Command::RangeDown,
        KeyCode::KeyN => Command::ToggleShape,
        KeyCode::KeyW => Command::NextStrategy,
        KeyCode::KeyQ => Command::PrevStrategy,
        KeyCode::KeyC => Command::NextPalette,
        KeyCode::KeyX => Command::PrevPalette,
        KeyCode::Equal => Command::InertiaUp,
        KeyCode::Minus => Command::InertiaDown,
        KeyCode::KeyD => Command::DensityUp,
        KeyCode::KeyS => Command::DensityDown,
        KeyCode::KeyR => Command::Reseed,
        KeyCode::KeyT => Command::RegenerateRules,
        KeyCode::Space => Command::TogglePause,
        KeyCode::KeyH | KeyCode::F1 => Command::ToggleHelp,
        KeyCode::Escape => Command::Quit,
        _ => return None,
    };
    Some(command)
}

/// Translate a raw key event; only fresh presses fire commands.
pub fn command_for_event(event: &KeyEvent) -> Option<Command> {
    if event.state != ElementState::Pressed || event.repeat {
        return None;
    }
    match event.physical_key {
        PhysicalKey::Code(code) => command_for_key(code),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_command_has_a_binding() {
        let commands = [
            (KeyCode::ArrowUp, Command::RangeUp),
            (KeyCode::ArrowDown, Command::RangeDown),
            (KeyCode::KeyN, Command::ToggleShape),
            (KeyCode::KeyW, Command::NextStrategy),
            (KeyCode::KeyQ, Command::PrevStrategy),
            (KeyCode::KeyC, Command::NextPalette),
            (KeyCode::KeyX, Command::PrevPalette),
            (KeyCode::Equal, Command::InertiaUp),
            (KeyCode::Minus, Command::InertiaDown),
            (KeyCode::KeyD, Command::DensityUp),
            (KeyCode::KeyS, Command::DensityDown),
            (KeyCode::KeyR, Command::Reseed),
            (KeyCode::KeyT, Command::RegenerateRules),
            (KeyCode::Space, Command::TogglePause),
            (KeyCode::KeyH, Command::ToggleHelp),
            (KeyCode::Escape, Command::Quit),
        ];
        for (key, expected) in commands {
            assert_eq!(command_for_key(key), Some(expected));
        }
    }

    #[test]
    fn unbound_keys_are_ignored() {
        assert_eq!(command_for_key(KeyCode::KeyZ), None);
        assert_eq!(command_for_key(KeyCode::Tab), None);
    }
}
