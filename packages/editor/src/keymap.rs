//! Key bindings.
//!
//! Chords are written `Mod-Shift-z`; `Mod` is `Meta` on mac and `Ctrl`
//! elsewhere. An uppercase letter implies `Shift`.

use crate::commands::Command;
use crate::config::Platform;
use crate::errors::ConfigError;
use crate::state::EditorState;
use crate::transaction::Transaction;
use std::fmt;

#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct KeyChord {
    pub key: String,
    pub ctrl: bool,
    pub alt: bool,
    pub shift: bool,
    pub meta: bool,
}

impl KeyChord {
    pub fn parse(source: &str, platform: Platform) -> Result<Self, ConfigError> {
        let (mods, key) = match source.strip_suffix("--") {
            Some(rest) => (rest, "-"),
            None => match source.rsplit_once('-') {
                Some((mods, key)) => (mods, key),
                None => ("", source),
            },
        };
        if key.is_empty() {
            return Err(ConfigError::KeyChord(source.to_string()));
        }
        let mut chord = KeyChord::default();
        for part in mods.split('-').filter(|part| !part.is_empty()) {
            match part {
                "Mod" => match platform {
                    Platform::Mac => chord.meta = true,
                    Platform::Other => chord.ctrl = true,
                },
                "Ctrl" | "Control" | "c" => chord.ctrl = true,
                "Alt" | "a" => chord.alt = true,
                "Shift" | "s" => chord.shift = true,
                "Meta" | "Cmd" | "m" => chord.meta = true,
                _ => return Err(ConfigError::KeyChord(source.to_string())),
            }
        }
        chord.set_key(key);
        Ok(chord)
    }

    fn set_key(&mut self, key: &str) {
        let mut chars = key.chars();
        match (chars.next(), chars.next()) {
            (Some(c), None) if c.is_uppercase() => {
                self.shift = true;
                self.key = c.to_lowercase().collect();
            }
            (Some(' '), None) => self.key = "Space".to_string(),
            _ => self.key = key.to_string(),
        }
    }
}

impl fmt::Display for KeyChord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (on, name) in [
            (self.ctrl, "Ctrl-"),
            (self.alt, "Alt-"),
            (self.shift, "Shift-"),
            (self.meta, "Meta-"),
        ] {
            if on {
                f.write_str(name)?;
            }
        }
        f.write_str(&self.key)
    }
}

/// A key press as reported by the host.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KeyEvent {
    pub key: String,
    pub ctrl: bool,
    pub alt: bool,
    pub shift: bool,
    pub meta: bool,
}

impl KeyEvent {
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            ..Default::default()
        }
    }

    pub fn ctrl(mut self) -> Self {
        self.ctrl = true;
        self
    }

    pub fn shift(mut self) -> Self {
        self.shift = true;
        self
    }

    pub fn meta(mut self) -> Self {
        self.meta = true;
        self
    }

    pub fn alt(mut self) -> Self {
        self.alt = true;
        self
    }

    pub fn chord(&self) -> KeyChord {
        let mut chord = KeyChord {
            key: String::new(),
            ctrl: self.ctrl,
            alt: self.alt,
            shift: self.shift,
            meta: self.meta,
        };
        chord.set_key(&self.key);
        chord
    }
}

/// A chord bound to a command, as contributed by an extension.
#[derive(Clone)]
pub struct KeyBinding {
    pub chord: String,
    pub command: Command,
}

impl KeyBinding {
    pub fn new(chord: impl Into<String>, command: Command) -> Self {
        Self {
            chord: chord.into(),
            command,
        }
    }
}

/// Ordered bindings. The first command bound to a chord that applies
/// handles the key.
#[derive(Clone, Default)]
pub struct Keymap {
    bindings: Vec<(KeyChord, Command)>,
}

impl fmt::Debug for Keymap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.bindings.iter().map(|(chord, _)| chord.to_string()))
            .finish()
    }
}

impl Keymap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn bind(&mut self, chord: &str, command: Command, platform: Platform) -> Result<(), ConfigError> {
        self.bindings.push((KeyChord::parse(chord, platform)?, command));
        Ok(())
    }

    pub fn extend(&mut self, bindings: Vec<KeyBinding>, platform: Platform) -> Result<(), ConfigError> {
        for binding in bindings {
            self.bind(&binding.chord, binding.command, platform)?;
        }
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    pub fn handle(&self, event: &KeyEvent, state: &EditorState) -> Option<Transaction> {
        let chord = event.chord();
        self.bindings
            .iter()
            .filter(|(bound, _)| *bound == chord)
            .find_map(|(_, command)| command(state))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::{command, select_all};
    use crate::selection::Selection;
    use crate::state::StateConfig;
    use paper_model::{NodeSpec, Schema, SchemaSpec};

    #[test]
    fn test_parse_chords() {
        let chord = KeyChord::parse("Mod-Shift-z", Platform::Mac).unwrap();
        assert!(chord.meta && chord.shift && !chord.ctrl);
        assert_eq!(chord.key, "z");

        let chord = KeyChord::parse("Mod-B", Platform::Other).unwrap();
        assert!(chord.ctrl && chord.shift);
        assert_eq!(chord.key, "b");

        assert_eq!(KeyChord::parse("Mod--", Platform::Other).unwrap().key, "-");
        assert_eq!(KeyChord::parse("Enter", Platform::Other).unwrap().to_string(), "Enter");
        assert!(KeyChord::parse("Hyper-x", Platform::Other).is_err());
    }

    #[test]
    fn test_event_matching() {
        let chord = KeyChord::parse("Shift-Mod-z", Platform::Other).unwrap();
        assert_eq!(KeyEvent::new("Z").ctrl().chord(), chord);
        assert_eq!(KeyEvent::new("z").ctrl().shift().chord(), chord);
        assert_ne!(KeyEvent::new("z").ctrl().chord(), chord);
    }

    #[test]
    fn test_first_applicable_binding_wins() {
        let schema = Schema::new(
            SchemaSpec::default()
                .node("doc", NodeSpec::new().content("paragraph+"))
                .node("paragraph", NodeSpec::new().content("text*"))
                .node("text", NodeSpec::new()),
        )
        .unwrap();
        let state = EditorState::create(StateConfig::new(schema)).unwrap();

        let mut keymap = Keymap::new();
        keymap.bind("Mod-a", command(|_| None), Platform::Other).unwrap();
        keymap.bind("Mod-a", select_all(), Platform::Other).unwrap();
        keymap
            .bind("Mod-a", command(|_| panic!("not reached")), Platform::Other)
            .unwrap();

        let tr = keymap.handle(&KeyEvent::new("a").ctrl(), &state).unwrap();
        assert_eq!(tr.selection(), Selection::all(state.doc()));
        assert!(keymap.handle(&KeyEvent::new("a").meta(), &state).is_none());
    }
}
