//! Register Identifiers and the Partial Register File
//!
//! The VM has 11 registers (R0-R10) holding 32-bit signed values:
//! - R0: verdict register; packet loads also land here
//! - R1-R5: scratch, invalidated by every packet load
//! - R6-R9: preserved across packet loads
//! - R10: read-only by convention
//!
//! The register file is a *partial* map: a slot is either initialized with a
//! value or absent. Absence, not zero, means "the program never wrote this",
//! and reading an absent slot is a runtime fault. Zero-filling the file would
//! silently hide a real class of filter bugs, so the `Option` per slot is
//! load-bearing.

use core::fmt;

/// Register identifiers R0 through R10.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Register {
    /// Verdict / packet load destination
    R0 = 0,
    R1 = 1,
    R2 = 2,
    R3 = 3,
    R4 = 4,
    R5 = 5,
    R6 = 6,
    R7 = 7,
    R8 = 8,
    R9 = 9,
    /// Read-only
    R10 = 10,
}

impl Register {
    /// Total number of registers.
    pub const COUNT: usize = 11;

    /// Registers invalidated by a successful packet load.
    pub const SCRATCH: [Register; 5] = [
        Register::R1,
        Register::R2,
        Register::R3,
        Register::R4,
        Register::R5,
    ];

    /// Try to create a register from a raw nibble.
    ///
    /// Returns `None` for values 11-15.
    #[inline]
    pub const fn from_raw(value: u8) -> Option<Self> {
        match value {
            0 => Some(Self::R0),
            1 => Some(Self::R1),
            2 => Some(Self::R2),
            3 => Some(Self::R3),
            4 => Some(Self::R4),
            5 => Some(Self::R5),
            6 => Some(Self::R6),
            7 => Some(Self::R7),
            8 => Some(Self::R8),
            9 => Some(Self::R9),
            10 => Some(Self::R10),
            _ => None,
        }
    }

    /// Get the raw register number.
    #[inline]
    pub const fn as_raw(self) -> u8 {
        self as u8
    }

    /// Check if this register can be written.
    ///
    /// All registers except R10 are writable.
    #[inline]
    pub const fn is_writable(self) -> bool {
        !matches!(self, Self::R10)
    }
}

impl fmt::Display for Register {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "r{}", *self as u8)
    }
}

/// Partial mapping from register to 32-bit value.
///
/// A fixed array of optional slots, not a hash map: the register set is
/// small, closed, and index-addressable. `None` means uninitialized.
#[derive(Clone, PartialEq, Eq)]
pub struct RegisterFile {
    slots: [Option<i32>; Register::COUNT],
}

impl RegisterFile {
    /// Create a register file with every slot uninitialized.
    #[inline]
    pub const fn new() -> Self {
        Self {
            slots: [None; Register::COUNT],
        }
    }

    /// Read a register; `None` if it was never written.
    #[inline]
    pub fn get(&self, reg: Register) -> Option<i32> {
        self.slots[reg as usize]
    }

    /// Write a register.
    ///
    /// This is the raw slot store; the interpreter applies the R10
    /// read-only policy before calling it.
    #[inline]
    pub fn set(&mut self, reg: Register, value: i32) {
        self.slots[reg as usize] = Some(value);
    }

    /// Return a register to the uninitialized state.
    #[inline]
    pub fn invalidate(&mut self, reg: Register) {
        self.slots[reg as usize] = None;
    }

    /// Uninitialize every slot.
    #[inline]
    pub fn clear(&mut self) {
        self.slots = [None; Register::COUNT];
    }

    /// Check whether a register holds a value.
    #[inline]
    pub fn is_initialized(&self, reg: Register) -> bool {
        self.slots[reg as usize].is_some()
    }
}

impl Default for RegisterFile {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for RegisterFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut s = f.debug_struct("RegisterFile");
        for (i, slot) in self.slots.iter().enumerate() {
            let name = ["r0", "r1", "r2", "r3", "r4", "r5", "r6", "r7", "r8", "r9", "r10"][i];
            match slot {
                Some(v) => s.field(name, &format_args!("{:#010x}", v)),
                None => s.field(name, &format_args!("uninit")),
            };
        }
        s.finish()
    }
}
