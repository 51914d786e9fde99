//! The register file: one frame's view of the machine registers.

/// How many DWARF columns a register file tracks; covers the general,
/// segment and flag registers of both supported architectures.
pub const MAX_REGISTERS: usize = 64;

/// A fixed-size register file indexed by DWARF register number.
///
/// Registers recovered during unwinding are sparse, so each slot carries a
/// validity bit; reading an unrecovered register yields `None` rather than
/// a stale value.
#[derive(Clone)]
pub struct RegisterFile {
    values: [u64; MAX_REGISTERS],
    valid: u64,
}

impl RegisterFile {
    pub fn new() -> Self {
        Self {
            values: [0; MAX_REGISTERS],
            valid: 0,
        }
    }

    /// The register's value, if it is known in this frame.
    pub fn get(&self, reg: u16) -> Option<u64> {
        let idx = reg as usize;
        if idx >= MAX_REGISTERS || self.valid & (1 << idx) == 0 {
            return None;
        }
        Some(self.values[idx])
    }

    /// Sets a register. Columns beyond the tracked range are dropped.
    pub fn set(&mut self, reg: u16, value: u64) {
        let idx = reg as usize;
        if idx >= MAX_REGISTERS {
            log::debug!("dropping register {reg} outside the tracked range");
            return;
        }
        self.values[idx] = value;
        self.valid |= 1 << idx;
    }

    /// Numbers of the registers known in this frame, ascending.
    pub fn known(&self) -> impl Iterator<Item = u16> + '_ {
        (0..MAX_REGISTERS as u16).filter(|&r| self.valid & (1 << r) != 0)
    }
}

impl Default for RegisterFile {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for RegisterFile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut map = f.debug_map();
        for reg in self.known() {
            map.entry(&reg, &format_args!("{:#x}", self.values[reg as usize]));
        }
        map.finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_registers_read_as_none() {
        let mut regs = RegisterFile::new();
        assert_eq!(regs.get(7), None);
        regs.set(7, 0x8000);
        assert_eq!(regs.get(7), Some(0x8000));
        assert_eq!(regs.get(16), None);
    }

    #[test]
    fn out_of_range_columns_are_dropped() {
        let mut regs = RegisterFile::new();
        regs.set(200, 1);
        assert_eq!(regs.get(200), None);
        assert_eq!(regs.known().count(), 0);
    }
}
