//! Display modes and the ordered mode table of an output.
//!
//! The position of a mode in the table is its protocol `mode_id`, so the
//! table never reorders entries once they are in place.

use bitflags::bitflags;

use crate::core::errors::{OutputError, Result};

/// A supported (resolution, refresh rate) pair. Compared by value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Mode {
    pub width: i32,
    pub height: i32,
    /// Refresh rate in mHz
    pub refresh: i32,
}

impl Mode {
    pub fn new(width: i32, height: i32, refresh: i32) -> Self {
        Self { width, height, refresh }
    }

    /// A mode with a non-positive dimension cannot be shown on any output.
    pub fn is_valid(&self) -> bool {
        self.width > 0 && self.height > 0
    }
}

bitflags! {
    /// Per-mode flags carried by the mode event.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct ModeFlags: u32 {
        const CURRENT = 0x1;
        const PREFERRED = 0x2;
    }
}

/// Ordered modes plus the current/preferred indices into them.
///
/// Indices are `None` while no mode list is known.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ModeTable {
    modes: Vec<Mode>,
    current: Option<usize>,
    preferred: Option<usize>,
}

impl ModeTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a table from `modes`, dropping invalid entries and duplicates.
    ///
    /// The first occurrence of a duplicate keeps its position, so indices of
    /// the surviving modes follow insertion order. Both indices point at the
    /// first mode.
    pub fn from_modes(modes: impl IntoIterator<Item = Mode>) -> Self {
        let mut table = Self::new();
        for mode in modes {
            if !mode.is_valid() {
                tracing::warn!("Dropping invalid mode {}x{}@{}", mode.width, mode.height, mode.refresh);
                continue;
            }
            if table.modes.contains(&mode) {
                tracing::debug!("Dropping duplicate mode {}x{}@{}", mode.width, mode.height, mode.refresh);
                continue;
            }
            table.modes.push(mode);
        }
        if !table.modes.is_empty() {
            table.current = Some(0);
            table.preferred = Some(0);
        }
        table
    }

    pub fn modes(&self) -> &[Mode] {
        &self.modes
    }

    pub fn len(&self) -> usize {
        self.modes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.modes.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Mode> {
        self.modes.get(index)
    }

    pub fn current_index(&self) -> Option<usize> {
        self.current
    }

    pub fn preferred_index(&self) -> Option<usize> {
        self.preferred
    }

    pub fn current_mode(&self) -> Option<&Mode> {
        self.current.and_then(|i| self.modes.get(i))
    }

    /// Index of the first mode equal to `mode`.
    pub fn position_of(&self, mode: &Mode) -> Option<usize> {
        self.modes.iter().position(|m| m == mode)
    }

    fn check(&self, index: Option<usize>) -> Result<()> {
        match index {
            Some(index) if index >= self.modes.len() => Err(OutputError::InvalidModeIndex {
                index,
                len: self.modes.len(),
            }),
            _ => Ok(()),
        }
    }

    /// Returns whether the index changed.
    pub fn set_current(&mut self, index: Option<usize>) -> Result<bool> {
        self.check(index)?;
        if self.current == index {
            return Ok(false);
        }
        self.current = index;
        Ok(true)
    }

    /// Returns whether the index changed.
    pub fn set_preferred(&mut self, index: Option<usize>) -> Result<bool> {
        self.check(index)?;
        if self.preferred == index {
            return Ok(false);
        }
        self.preferred = index;
        Ok(true)
    }

    /// Flags for the mode at `index`, computed from the indices as they are now.
    pub fn flags_for(&self, index: usize) -> ModeFlags {
        let mut flags = ModeFlags::empty();
        if self.current == Some(index) {
            flags |= ModeFlags::CURRENT;
        }
        if self.preferred == Some(index) {
            flags |= ModeFlags::PREFERRED;
        }
        flags
    }

    /// Iterate `(index, mode, flags)` in protocol order.
    pub fn iter_flagged(&self) -> impl Iterator<Item = (usize, &Mode, ModeFlags)> + '_ {
        self.modes
            .iter()
            .enumerate()
            .map(move |(index, mode)| (index, mode, self.flags_for(index)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_modes_keeps_order_and_drops_duplicates() {
        let table = ModeTable::from_modes([
            Mode::new(1920, 1080, 60000),
            Mode::new(1280, 720, 60000),
            Mode::new(1920, 1080, 60000),
            Mode::new(0, 720, 60000),
            Mode::new(1024, 768, 75000),
        ]);
        assert_eq!(table.len(), 3);
        assert_eq!(table.get(2), Some(&Mode::new(1024, 768, 75000)));
        assert_eq!(table.current_index(), Some(0));
        assert_eq!(table.preferred_index(), Some(0));
    }

    #[test]
    fn test_empty_table_has_unknown_indices() {
        let table = ModeTable::from_modes(Vec::new());
        assert!(table.is_empty());
        assert_eq!(table.current_index(), None);
        assert!(table.current_mode().is_none());
    }

    #[test]
    fn test_set_current_rejects_out_of_range() {
        let mut table = ModeTable::from_modes([Mode::new(800, 600, 60000)]);
        assert_eq!(
            table.set_current(Some(3)),
            Err(OutputError::InvalidModeIndex { index: 3, len: 1 })
        );
        assert_eq!(table.current_index(), Some(0));
        assert_eq!(table.set_current(Some(0)), Ok(false));
        assert_eq!(table.set_current(None), Ok(true));
    }

    #[test]
    fn test_flags_follow_indices() {
        let mut table = ModeTable::from_modes([
            Mode::new(1920, 1080, 60000),
            Mode::new(1280, 720, 60000),
        ]);
        table.set_current(Some(1)).unwrap();
        let flags: Vec<_> = table.iter_flagged().map(|(_, _, f)| f).collect();
        assert_eq!(flags, vec![ModeFlags::PREFERRED, ModeFlags::CURRENT]);
    }

    #[test]
    fn test_position_of() {
        let table = ModeTable::from_modes([
            Mode::new(1920, 1080, 60000),
            Mode::new(1920, 1080, 144000),
        ]);
        assert_eq!(table.position_of(&Mode::new(1920, 1080, 144000)), Some(1));
        assert_eq!(table.position_of(&Mode::new(640, 480, 60000)), None);
    }
}
