// src/state_cell.rs
use log::warn;
use std::cell::Cell;

/// In-memory boolean behind one toggle. Reads and writes are plain storage; rendering
/// and broadcasting belong to the controller that owns the cell.
#[derive(Debug, Default)]
pub struct StateCell {
    value: Cell<bool>,
}

impl StateCell {
    pub fn new(initial: bool) -> Self {
        Self { value: Cell::new(initial) }
    }

    /// Seeds the cell from the attribute value found in markup at attach time.
    pub fn from_markup(raw: Option<&str>) -> Self {
        Self::new(decode_flag(raw))
    }

    pub fn read(&self) -> bool {
        self.value.get()
    }

    pub fn write(&self, value: bool) {
        self.value.set(value);
    }
}

/// Markup flag to bool. Only `"true"` is true; absence reads as false.
pub fn decode_flag(raw: Option<&str>) -> bool {
    match raw {
        Some("true") => true,
        Some("false") | Some("") | None => false,
        Some(other) => {
            warn!("decode_flag: unexpected flag value {:?}, reading as false", other);
            false
        }
    }
}

pub fn encode_flag(value: bool) -> &'static str {
    if value { "true" } else { "false" }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seeds_from_markup() {
        assert!(StateCell::from_markup(Some("true")).read());
        assert!(!StateCell::from_markup(Some("false")).read());
        assert!(!StateCell::from_markup(None).read());
        assert!(!StateCell::from_markup(Some("TRUE")).read());
    }

    #[test]
    fn write_then_read() {
        let cell = StateCell::new(false);
        cell.write(true);
        assert!(cell.read());
        cell.write(false);
        assert!(!cell.read());
    }

    #[test]
    fn flag_encoding_matches_decoding() {
        assert!(decode_flag(Some(encode_flag(true))));
        assert!(!decode_flag(Some(encode_flag(false))));
    }
}
