//! Write-once result cells
//!
//! Every instruction value owns a cell that its handler's result is written
//! into. The continuation of the matching `Await` node reads it back once the
//! executor has observed the dispatch complete. The lock gives the
//! write-before-read ordering; nobody else touches the cell.

use std::fmt;

use parking_lot::Mutex;

use super::error::CellError;

enum Slot<T> {
    Empty,
    Full(T),
    Taken,
}

/// Single-assignment slot carrying one instruction result
pub struct ResultCell<T> {
    slot: Mutex<Slot<T>>,
}

impl<T> ResultCell<T> {
    /// Create an empty cell
    pub fn new() -> Self {
        Self {
            slot: Mutex::new(Slot::Empty),
        }
    }

    /// Store the result. Fails if a result was ever stored before.
    pub fn set(&self, value: T) -> Result<(), CellError> {
        let mut slot = self.slot.lock();
        match *slot {
            Slot::Empty => {
                *slot = Slot::Full(value);
                Ok(())
            }
            Slot::Full(_) | Slot::Taken => Err(CellError::AlreadySet),
        }
    }

    /// Move the result out of the cell.
    pub fn take(&self) -> Result<T, CellError> {
        let mut slot = self.slot.lock();
        match std::mem::replace(&mut *slot, Slot::Taken) {
            Slot::Full(value) => Ok(value),
            Slot::Empty => {
                *slot = Slot::Empty;
                Err(CellError::Unset)
            }
            Slot::Taken => Err(CellError::AlreadyTaken),
        }
    }

    /// Whether a result has been stored (consumed results count as stored)
    pub fn is_set(&self) -> bool {
        !matches!(*self.slot.lock(), Slot::Empty)
    }
}

impl<T> Default for ResultCell<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> fmt::Debug for ResultCell<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = match *self.slot.lock() {
            Slot::Empty => "empty",
            Slot::Full(_) => "set",
            Slot::Taken => "taken",
        };
        f.debug_tuple("ResultCell").field(&state).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_then_take() {
        let cell = ResultCell::new();
        assert!(!cell.is_set());
        cell.set(41).unwrap();
        assert!(cell.is_set());
        assert_eq!(cell.take(), Ok(41));
    }

    #[test]
    fn test_second_set_is_rejected() {
        let cell = ResultCell::new();
        cell.set("first").unwrap();
        assert_eq!(cell.set("second"), Err(CellError::AlreadySet));
        assert_eq!(cell.take(), Ok("first"));
        assert_eq!(cell.set("third"), Err(CellError::AlreadySet));
    }

    #[test]
    fn test_take_before_set() {
        let cell: ResultCell<u8> = ResultCell::new();
        assert_eq!(cell.take(), Err(CellError::Unset));
        cell.set(3).unwrap();
        assert_eq!(cell.take(), Ok(3));
        assert_eq!(cell.take(), Err(CellError::AlreadyTaken));
    }

    #[test]
    fn test_debug_reports_state() {
        let cell = ResultCell::new();
        assert_eq!(format!("{:?}", cell), "ResultCell(\"empty\")");
        cell.set(String::from("x")).unwrap();
        assert_eq!(format!("{:?}", cell), "ResultCell(\"set\")");
    }
}
