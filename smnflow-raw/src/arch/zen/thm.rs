//! SMU thermal (THM) register definitions for Zen
//!
//! The SMU thermal block sits in the `SMUTHM` SMN window. Its first
//! register reports the current control temperature (Tctl) that the
//! `k10temp` driver exposes on Linux.
//!
//! ## References
//!
//! - Linux `drivers/hwmon/k10temp.c`
//! - AMD Processor Programming Reference (PPR) for Family 17h

use crate::register::{Register, RegisterLayout};

/// SMN window name of the SMU thermal block
pub const SMUTHM_WINDOW: &str = "SMUTHM";

/// Default base address of the SMU thermal block
pub const SMUTHM_BASE: u32 = 0x0005_9800;

/// Offset of `THM_TCON_CUR_TMP` within `SMUTHM`
pub const THM_TCON_CUR_TMP_OFFSET: u32 = 0x0;

/// Temperature offset applied when the range select bit is set (degrees C)
pub const RANGE_SELECT_OFFSET_C: f64 = 49.0;

/// Resolution of `cur_temp` (degrees C per LSB)
pub const CUR_TEMP_RESOLUTION_C: f64 = 0.125;

/// `THM_TCON_CUR_TMP` layout
///
/// | Bits   | Field        | Description                              |
/// |--------|--------------|------------------------------------------|
/// | 0-18   | reserved     |                                          |
/// | 19     | range_select | Report range is -49..206 C when set      |
/// | 20     | reserved     |                                          |
/// | 21-31  | cur_temp     | Current Tctl in 0.125 C units (11 bits)  |
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ThmTconCurTmp {
    /// Range select (bit 19)
    pub range_select: bool,

    /// Current temperature (bits 21-31, 11 bits)
    pub cur_temp: u16,
}

impl ThmTconCurTmp {
    /// Decoded Tctl in degrees Celsius
    pub fn celsius(&self) -> f64 {
        let temp = self.cur_temp as f64 * CUR_TEMP_RESOLUTION_C;
        if self.range_select {
            temp - RANGE_SELECT_OFFSET_C
        } else {
            temp
        }
    }
}

impl RegisterLayout for ThmTconCurTmp {
    fn to_raw(&self) -> u32 {
        (if self.range_select { 1 << 19 } else { 0 }) | ((self.cur_temp as u32 & 0x7FF) << 21)
    }

    fn from_raw(value: u32) -> Self {
        Self {
            range_select: (value & (1 << 19)) != 0,
            cur_temp: ((value >> 21) & 0x7FF) as u16,
        }
    }

    fn validate(&self) -> Result<(), &'static str> {
        if self.cur_temp > 0x7FF {
            return Err("cur_temp must be <= 2047 (11 bits)");
        }
        Ok(())
    }
}

/// `THM_TCON_CUR_TMP` in the `SMUTHM` window
pub fn cur_tmp_register() -> Register<ThmTconCurTmp> {
    Register::at(SMUTHM_WINDOW, THM_TCON_CUR_TMP_OFFSET)
}
