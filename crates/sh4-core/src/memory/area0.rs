use crate::fault::Fault;

use super::areas::{
    AICA_REG_FIRST, AICA_REG_LAST, AICA_RTC_FIRST, AICA_RTC_LAST, AICA_WAVE_FIRST, AICA_WAVE_LAST,
    AICA_WAVE_MASK, AREA0_MASK, BIOS_FIRST, BIOS_LAST, FLASH_FIRST, FLASH_LAST, G1_FIRST, G1_LAST,
    G2_FIRST, G2_LAST, GDROM_FIRST, GDROM_LAST, MAPLE_FIRST, MAPLE_LAST, MODEM_FIRST, MODEM_LAST,
    PVR2_FIRST, PVR2_LAST, SYS_BLOCK_FIRST, SYS_BLOCK_LAST,
};
use super::region::{AccessWidth, BusData, Ram, RegionHandler, Rom};

/// Names one of the disjoint static sub-windows inside the area-0 window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Area0Window {
    /// Boot ROM image.
    Bios,
    /// Persistent flash memory.
    Flash,
    /// G1 bus registers.
    G1,
    /// System-block registers.
    SystemBlock,
    /// Maple (controller bus) registers.
    Maple,
    /// G2 bus registers.
    G2,
    /// Graphics-core registers.
    Pvr2,
    /// Modem registers.
    Modem,
    /// Sound-block registers.
    AicaReg,
    /// Sound RAM.
    AicaWave,
    /// Sound-block real-time clock.
    AicaRtc,
    /// GD-ROM drive registers.
    Gdrom,
}

#[derive(Clone, Copy)]
struct SubWindow {
    window: Area0Window,
    first: u32,
    last: u32,
    local_mask: u32,
}

const NO_LOCAL_MASK: u32 = 0xFFFF_FFFF;

// Probe order follows the original dispatch chain; the windows are disjoint
// so order only affects scan length.
const SUB_WINDOWS: [SubWindow; 12] = [
    SubWindow {
        window: Area0Window::Bios,
        first: BIOS_FIRST,
        last: BIOS_LAST,
        local_mask: NO_LOCAL_MASK,
    },
    SubWindow {
        window: Area0Window::Flash,
        first: FLASH_FIRST,
        last: FLASH_LAST,
        local_mask: NO_LOCAL_MASK,
    },
    SubWindow {
        window: Area0Window::G1,
        first: G1_FIRST,
        last: G1_LAST,
        local_mask: NO_LOCAL_MASK,
    },
    SubWindow {
        window: Area0Window::SystemBlock,
        first: SYS_BLOCK_FIRST,
        last: SYS_BLOCK_LAST,
        local_mask: NO_LOCAL_MASK,
    },
    SubWindow {
        window: Area0Window::Maple,
        first: MAPLE_FIRST,
        last: MAPLE_LAST,
        local_mask: NO_LOCAL_MASK,
    },
    SubWindow {
        window: Area0Window::G2,
        first: G2_FIRST,
        last: G2_LAST,
        local_mask: NO_LOCAL_MASK,
    },
    SubWindow {
        window: Area0Window::Pvr2,
        first: PVR2_FIRST,
        last: PVR2_LAST,
        local_mask: NO_LOCAL_MASK,
    },
    SubWindow {
        window: Area0Window::Modem,
        first: MODEM_FIRST,
        last: MODEM_LAST,
        local_mask: NO_LOCAL_MASK,
    },
    SubWindow {
        window: Area0Window::AicaReg,
        first: AICA_REG_FIRST,
        last: AICA_REG_LAST,
        local_mask: NO_LOCAL_MASK,
    },
    SubWindow {
        window: Area0Window::AicaWave,
        first: AICA_WAVE_FIRST,
        last: AICA_WAVE_LAST,
        local_mask: AICA_WAVE_MASK,
    },
    SubWindow {
        window: Area0Window::AicaRtc,
        first: AICA_RTC_FIRST,
        last: AICA_RTC_LAST,
        local_mask: NO_LOCAL_MASK,
    },
    SubWindow {
        window: Area0Window::Gdrom,
        first: GDROM_FIRST,
        last: GDROM_LAST,
        local_mask: NO_LOCAL_MASK,
    },
];

const _: () = assert_sub_windows_well_formed();

const fn assert_sub_windows_well_formed() {
    let mut i = 0;
    while i < SUB_WINDOWS.len() {
        assert!(
            SUB_WINDOWS[i].first <= SUB_WINDOWS[i].last,
            "sub-window bounds are reversed"
        );
        assert!(
            SUB_WINDOWS[i].last <= AREA0_MASK,
            "sub-window leaks out of the area-0 local space"
        );
        let mut j = i + 1;
        while j < SUB_WINDOWS.len() {
            assert!(
                SUB_WINDOWS[i].last < SUB_WINDOWS[j].first
                    || SUB_WINDOWS[j].last < SUB_WINDOWS[i].first,
                "sub-windows overlap"
            );
            j += 1;
        }
        i += 1;
    }
}

/// Peripheral bus whose every access faults unimplemented.
///
/// Stands in for buses the host has not wired up.
#[derive(Debug, Default, Clone, Copy)]
pub struct UnmappedBus;

impl RegionHandler for UnmappedBus {}

/// Injected peripheral-bus handlers, one per area-0 sub-window.
///
/// Every field defaults to [`UnmappedBus`]; hosts replace the buses they
/// model.
pub struct Area0Buses {
    /// G1 bus register handler.
    pub g1: Box<dyn RegionHandler>,
    /// System-block register handler.
    pub system_block: Box<dyn RegionHandler>,
    /// Maple register handler.
    pub maple: Box<dyn RegionHandler>,
    /// G2 bus register handler.
    pub g2: Box<dyn RegionHandler>,
    /// Graphics-core register handler.
    pub pvr2: Box<dyn RegionHandler>,
    /// Modem handler.
    pub modem: Box<dyn RegionHandler>,
    /// Sound-block register handler.
    pub aica_reg: Box<dyn RegionHandler>,
    /// Sound RAM handler.
    pub aica_wave: Box<dyn RegionHandler>,
    /// Sound-block real-time-clock handler.
    pub aica_rtc: Box<dyn RegionHandler>,
    /// GD-ROM register handler.
    pub gdrom: Box<dyn RegionHandler>,
}

impl Default for Area0Buses {
    fn default() -> Self {
        Self {
            g1: Box::new(UnmappedBus),
            system_block: Box::new(UnmappedBus),
            maple: Box::new(UnmappedBus),
            g2: Box::new(UnmappedBus),
            pvr2: Box::new(UnmappedBus),
            modem: Box::new(UnmappedBus),
            aica_reg: Box::new(UnmappedBus),
            aica_wave: Box::new(UnmappedBus),
            aica_rtc: Box::new(UnmappedBus),
            gdrom: Box::new(UnmappedBus),
        }
    }
}

const BIOS_READ_ONLY: &str = "boot ROM is read-only";
const OUTSIDE_SUB_WINDOWS: &str = "area-0 access outside every sub-window";

/// Composite region handler for the area-0 window.
///
/// Masks the incoming address with the area-0 local mask, then tests the
/// disjoint static sub-windows; an access no sub-window fully contains
/// falls through to an unimplemented-feature fault. Leaf handlers receive
/// window-local offsets (the sound RAM window additionally mirrors through
/// its local mask).
pub struct Area0 {
    bios: Rom,
    flash: Ram,
    buses: Area0Buses,
}

impl Area0 {
    /// Builds the window from a boot ROM image, flash backing, and the
    /// injected peripheral buses.
    #[must_use]
    pub fn new(bios: Rom, flash: Ram, buses: Area0Buses) -> Self {
        Self { bios, flash, buses }
    }

    /// Boot ROM image.
    #[must_use]
    pub const fn bios(&self) -> &Rom {
        &self.bios
    }

    /// Flash backing store.
    #[must_use]
    pub const fn flash(&self) -> &Ram {
        &self.flash
    }

    /// Mutable flash backing store (for host-side persistence).
    pub fn flash_mut(&mut self) -> &mut Ram {
        &mut self.flash
    }

    fn find(local: u32, width: AccessWidth) -> Option<(Area0Window, u32)> {
        let last = local + (width.byte_len() - 1);
        SUB_WINDOWS.iter().find_map(|sub| {
            (local >= sub.first && last <= sub.last)
                .then(|| (sub.window, (local - sub.first) & sub.local_mask))
        })
    }

    fn leaf(&mut self, window: Area0Window) -> &mut dyn RegionHandler {
        match window {
            Area0Window::Bios => &mut self.bios,
            Area0Window::Flash => &mut self.flash,
            Area0Window::G1 => self.buses.g1.as_mut(),
            Area0Window::SystemBlock => self.buses.system_block.as_mut(),
            Area0Window::Maple => self.buses.maple.as_mut(),
            Area0Window::G2 => self.buses.g2.as_mut(),
            Area0Window::Pvr2 => self.buses.pvr2.as_mut(),
            Area0Window::Modem => self.buses.modem.as_mut(),
            Area0Window::AicaReg => self.buses.aica_reg.as_mut(),
            Area0Window::AicaWave => self.buses.aica_wave.as_mut(),
            Area0Window::AicaRtc => self.buses.aica_rtc.as_mut(),
            Area0Window::Gdrom => self.buses.gdrom.as_mut(),
        }
    }

    fn read_value<T: BusData>(&mut self, addr: u32) -> Result<T, Fault> {
        let local = addr & AREA0_MASK;
        Self::find(local, T::WIDTH).map_or(
            Err(Fault::unimplemented_read(
                OUTSIDE_SUB_WINDOWS,
                addr,
                T::WIDTH,
            )),
            |(window, offset)| T::read_from(self.leaf(window), offset),
        )
    }

    fn write_value<T: BusData>(&mut self, addr: u32, value: T) -> Result<(), Fault> {
        let local = addr & AREA0_MASK;
        match Self::find(local, T::WIDTH) {
            // The boot ROM rejects writes at the window level so the fault
            // names the guest-visible address, not a ROM-local offset.
            Some((Area0Window::Bios, _)) => Err(Fault::unimplemented_write(
                BIOS_READ_ONLY,
                addr,
                T::WIDTH,
                value.diag_bits(),
            )),
            Some((window, offset)) => T::write_to(self.leaf(window), offset, value),
            None => Err(Fault::unimplemented_write(
                OUTSIDE_SUB_WINDOWS,
                addr,
                T::WIDTH,
                value.diag_bits(),
            )),
        }
    }
}

impl RegionHandler for Area0 {
    fn read_u8(&mut self, addr: u32) -> Result<u8, Fault> {
        self.read_value(addr)
    }

    fn read_u16(&mut self, addr: u32) -> Result<u16, Fault> {
        self.read_value(addr)
    }

    fn read_u32(&mut self, addr: u32) -> Result<u32, Fault> {
        self.read_value(addr)
    }

    fn read_f32(&mut self, addr: u32) -> Result<f32, Fault> {
        self.read_value(addr)
    }

    fn read_f64(&mut self, addr: u32) -> Result<f64, Fault> {
        self.read_value(addr)
    }

    fn write_u8(&mut self, addr: u32, value: u8) -> Result<(), Fault> {
        self.write_value(addr, value)
    }

    fn write_u16(&mut self, addr: u32, value: u16) -> Result<(), Fault> {
        self.write_value(addr, value)
    }

    fn write_u32(&mut self, addr: u32, value: u32) -> Result<(), Fault> {
        self.write_value(addr, value)
    }

    fn write_f32(&mut self, addr: u32, value: f32) -> Result<(), Fault> {
        self.write_value(addr, value)
    }

    fn write_f64(&mut self, addr: u32, value: f64) -> Result<(), Fault> {
        self.write_value(addr, value)
    }
}

impl core::fmt::Debug for Area0 {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Area0")
            .field("bios_len", &self.bios.len())
            .field("flash_len", &self.flash.len())
            .finish_non_exhaustive()
    }
}
