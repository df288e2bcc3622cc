//! MIDI control-change plumbing for effect parameters.
//!
//! Effects keep a small assignment table mapping `(channel, control)` pairs
//! to their own parameter enums and feed incoming control changes through
//! it. The host-side MIDI transport and routing live outside this crate.

/// Scale a 7-bit controller value onto `0.0..=1.0`.
pub fn unit_value(value: u8) -> f32 {
    f32::from(value.min(127)) / 127.0
}

/// Switch convention for toggle parameters: 65 and up engages.
pub fn switch_on(value: u8) -> bool {
    value >= 65
}

/// Fixed-capacity `(channel, control) -> parameter` assignment table.
pub struct ControlMap<P, const N: usize> {
    entries: [Option<(u8, u8, P)>; N],
}

impl<P: Copy + PartialEq, const N: usize> ControlMap<P, N> {
    pub const fn new() -> Self {
        ControlMap { entries: [None; N] }
    }

    /// Bind `param` to control changes on `(channel, control)`.
    ///
    /// A parameter holds at most one binding; re-assigning moves it. When
    /// the table is full and the parameter is new, the assignment is
    /// dropped.
    pub fn assign(&mut self, channel: u8, control: u8, param: P) {
        for entry in self.entries.iter_mut().flatten() {
            if entry.2 == param {
                *entry = (channel, control, param);
                return;
            }
        }
        for entry in self.entries.iter_mut() {
            if entry.is_none() {
                *entry = Some((channel, control, param));
                return;
            }
        }
    }

    /// The parameter bound to `(channel, control)`, if any.
    pub fn lookup(&self, channel: u8, control: u8) -> Option<P> {
        self.entries
            .iter()
            .flatten()
            .find(|(ch, cc, _)| *ch == channel && *cc == control)
            .map(|(_, _, param)| *param)
    }
}

impl<P: Copy + PartialEq, const N: usize> Default for ControlMap<P, N> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    enum Param {
        Gain,
        Rate,
        Depth,
    }

    #[test]
    fn assign_and_lookup() {
        let mut map: ControlMap<Param, 4> = ControlMap::new();
        map.assign(0, 16, Param::Gain);
        map.assign(0, 17, Param::Rate);
        assert_eq!(map.lookup(0, 16), Some(Param::Gain));
        assert_eq!(map.lookup(0, 17), Some(Param::Rate));
        assert_eq!(map.lookup(0, 18), None);
        assert_eq!(map.lookup(1, 16), None);
    }

    #[test]
    fn reassignment_moves_the_binding() {
        let mut map: ControlMap<Param, 4> = ControlMap::new();
        map.assign(0, 16, Param::Gain);
        map.assign(2, 40, Param::Gain);
        assert_eq!(map.lookup(0, 16), None);
        assert_eq!(map.lookup(2, 40), Some(Param::Gain));
    }

    #[test]
    fn full_table_drops_new_params() {
        let mut map: ControlMap<Param, 2> = ControlMap::new();
        map.assign(0, 1, Param::Gain);
        map.assign(0, 2, Param::Rate);
        map.assign(0, 3, Param::Depth);
        assert_eq!(map.lookup(0, 3), None);
        // Existing bindings still movable.
        map.assign(0, 4, Param::Rate);
        assert_eq!(map.lookup(0, 4), Some(Param::Rate));
    }

    #[test]
    fn value_scaling() {
        assert_eq!(unit_value(0), 0.0);
        assert_eq!(unit_value(127), 1.0);
        assert!((unit_value(64) - 64.0 / 127.0).abs() < 1e-6);
        assert!(!switch_on(64));
        assert!(switch_on(65));
        assert!(switch_on(127));
    }
}
