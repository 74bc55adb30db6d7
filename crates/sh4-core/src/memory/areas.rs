//! Guest physical-map constants.
//!
//! External physical space is 29 bits wide; regions that appear once per
//! 512 MiB image use [`EXTERNAL_SPACE_MASK`] as their range mask so the
//! mirrors and the cached/uncached views fold onto one window. The two
//! CPU-local windows (the privileged area and the operand-cache RAM area)
//! match the full 32-bit address instead.

/// Range mask folding the 512 MiB physical image mirrors together.
pub const EXTERNAL_SPACE_MASK: u32 = 0x1FFF_FFFF;

/// First address of the privileged on-chip area (top three address bits set).
pub const AREA_P4_FIRST: u32 = 0xE000_0000;
/// Last address of the privileged on-chip area.
pub const AREA_P4_LAST: u32 = 0xFFFF_FFFF;

/// First address of the system RAM window (area 3).
pub const AREA3_FIRST: u32 = 0x0C00_0000;
/// Last address of the system RAM window.
pub const AREA3_LAST: u32 = 0x0FFF_FFFF;
/// Local mask for system RAM (16 MiB, mirrored four times in its window).
pub const AREA3_MASK: u32 = 0x00FF_FFFF;

/// First address of the area-0 window (boot ROM, flash, peripheral buses).
pub const AREA0_FIRST: u32 = 0x0000_0000;
/// Last address of the area-0 window.
pub const AREA0_LAST: u32 = 0x03FF_FFFF;
/// Local mask applied inside the area-0 window before sub-dispatch.
pub const AREA0_MASK: u32 = 0x01FF_FFFF;

/// First address of the 64-bit texture memory window.
pub const TEX64_FIRST: u32 = 0x0400_0000;
/// Last address of the 64-bit texture memory window.
pub const TEX64_LAST: u32 = 0x047F_FFFF;

/// First address of the 32-bit texture memory window.
pub const TEX32_FIRST: u32 = 0x0500_0000;
/// Last address of the 32-bit texture memory window.
pub const TEX32_LAST: u32 = 0x057F_FFFF;

/// First address of the tile-accelerator polygon FIFO.
pub const TA_FIFO_POLY_FIRST: u32 = 0x1000_0000;
/// Last address of the tile-accelerator polygon FIFO.
pub const TA_FIFO_POLY_LAST: u32 = 0x107F_FFFF;

/// First address of the operand-cache RAM area.
pub const OC_RAM_FIRST: u32 = 0x7C00_0000;
/// Last address of the operand-cache RAM area.
pub const OC_RAM_LAST: u32 = 0x7FFF_FFFF;
/// Local mask mirroring the 8 KiB operand-cache RAM through its area.
pub const OC_RAM_MASK: u32 = 0x0000_1FFF;
/// Backing-store size of the operand-cache RAM.
pub const OC_RAM_BYTES: usize = 0x2000;

/// Backing-store size of system RAM (16 MiB).
pub const SYSTEM_RAM_BYTES: usize = 0x0100_0000;

/// First address of the boot ROM sub-window (area-0 local).
pub const BIOS_FIRST: u32 = 0x0000_0000;
/// Last address of the boot ROM sub-window.
pub const BIOS_LAST: u32 = 0x001F_FFFF;

/// First address of the flash memory sub-window.
pub const FLASH_FIRST: u32 = 0x0020_0000;
/// Last address of the flash memory sub-window.
pub const FLASH_LAST: u32 = 0x0021_FFFF;

/// First address of the system-block register sub-window.
pub const SYS_BLOCK_FIRST: u32 = 0x005F_6800;
/// Last address of the system-block register sub-window.
pub const SYS_BLOCK_LAST: u32 = 0x005F_69FF;

/// First address of the Maple (controller bus) register sub-window.
pub const MAPLE_FIRST: u32 = 0x005F_6C00;
/// Last address of the Maple register sub-window.
pub const MAPLE_LAST: u32 = 0x005F_6CFF;

/// First address of the GD-ROM register sub-window.
pub const GDROM_FIRST: u32 = 0x005F_7000;
/// Last address of the GD-ROM register sub-window.
pub const GDROM_LAST: u32 = 0x005F_70FF;

/// First address of the G1 bus register sub-window.
pub const G1_FIRST: u32 = 0x005F_7400;
/// Last address of the G1 bus register sub-window.
pub const G1_LAST: u32 = 0x005F_74FF;

/// First address of the G2 bus register sub-window.
pub const G2_FIRST: u32 = 0x005F_7800;
/// Last address of the G2 bus register sub-window.
pub const G2_LAST: u32 = 0x005F_78FF;

/// First address of the graphics-core register sub-window.
pub const PVR2_FIRST: u32 = 0x005F_7C00;
/// Last address of the graphics-core register sub-window.
pub const PVR2_LAST: u32 = 0x005F_9FFF;

/// First address of the modem sub-window.
pub const MODEM_FIRST: u32 = 0x0060_0000;
/// Last address of the modem sub-window.
pub const MODEM_LAST: u32 = 0x0060_048C;

/// First address of the sound-block register sub-window.
pub const AICA_REG_FIRST: u32 = 0x0070_0000;
/// Last address of the sound-block register sub-window.
pub const AICA_REG_LAST: u32 = 0x0070_7FFF;

/// First address of the sound-block real-time-clock sub-window.
pub const AICA_RTC_FIRST: u32 = 0x0071_0000;
/// Last address of the sound-block real-time-clock sub-window.
pub const AICA_RTC_LAST: u32 = 0x0071_000B;

/// First address of the sound RAM sub-window.
pub const AICA_WAVE_FIRST: u32 = 0x0080_0000;
/// Last address of the sound RAM sub-window.
pub const AICA_WAVE_LAST: u32 = 0x00FF_FFFF;
/// Local mask mirroring the 2 MiB sound RAM through its sub-window.
pub const AICA_WAVE_MASK: u32 = 0x001F_FFFF;
