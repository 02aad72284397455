//! SmartPort bus protocol over the IWM phase lines.
//!
//! SmartPort devices share the 3.5" bus. The controller drives the four
//! phase lines as a handshake: the reset pattern is exactly PH0+PH2
//! (0b0101), and the bus is enabled while PH1 and PH3 are both raised.
//! Once enabled, packets carry block-level commands; the packet framing is
//! collapsed here to the command set itself (status, read block, write
//! block, format) against registered unit devices.

/// Status reply for a SmartPort unit.
#[derive(Debug, Clone, Copy)]
pub struct SmartPortStatus {
    pub online: bool,
    pub write_protected: bool,
    pub block_count: u32,
}

/// A block device on the SmartPort daisy chain.
pub trait SmartPortDevice {
    fn status(&mut self) -> SmartPortStatus;
    fn read_block(&mut self, block: u32, out: &mut [u8]) -> bool;
    fn write_block(&mut self, block: u32, data: &[u8]) -> bool;
    fn format(&mut self) -> bool;
}

/// Bus handshake state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum BusState {
    #[default]
    Idle,
    Reset,
    Enabled,
}

/// The SmartPort bus: phase tracking plus the unit table.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Default)]
pub struct SmartPortBus {
    pub state: BusState,
    #[cfg_attr(feature = "serde", serde(skip))]
    units: Vec<Box<dyn SmartPortDevice + Send>>,
}

impl SmartPortBus {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach a unit at the end of the chain. Unit numbers are 1-based.
    pub fn add_unit(&mut self, unit: Box<dyn SmartPortDevice + Send>) {
        self.units.push(unit);
    }

    pub fn clear_units(&mut self) {
        self.units.clear();
    }

    #[must_use]
    pub fn unit_count(&self) -> u8 {
        self.units.len() as u8
    }

    /// Track the phase lines. Reset requires the exact 0b0101 pattern;
    /// enable holds while PH1|PH3 are up.
    pub fn phase_transition(&mut self, phases: u8) {
        if phases & 0x0F == 0b0101 {
            self.state = BusState::Reset;
        } else if phases & 0b1010 == 0b1010 {
            self.state = BusState::Enabled;
        } else if phases & 0x0F == 0 {
            self.state = BusState::Idle;
        }
    }

    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.state == BusState::Enabled
    }

    fn unit(&mut self, unit: u8) -> Option<&mut Box<dyn SmartPortDevice + Send>> {
        if unit == 0 {
            return None;
        }
        self.units.get_mut(usize::from(unit - 1))
    }

    /// Status command. Unit 0 queries the bus itself.
    pub fn status(&mut self, unit: u8) -> Option<SmartPortStatus> {
        if unit == 0 {
            return Some(SmartPortStatus {
                online: true,
                write_protected: false,
                block_count: u32::from(self.unit_count()),
            });
        }
        self.unit(unit).map(|u| u.status())
    }

    pub fn read_block(&mut self, unit: u8, block: u32, out: &mut [u8]) -> bool {
        self.unit(unit).is_some_and(|u| u.read_block(block, out))
    }

    pub fn write_block(&mut self, unit: u8, block: u32, data: &[u8]) -> bool {
        self.unit(unit).is_some_and(|u| u.write_block(block, data))
    }

    pub fn format(&mut self, unit: u8) -> bool {
        self.unit(unit).is_some_and(|u| u.format())
    }
}
