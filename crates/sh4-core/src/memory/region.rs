use crate::fault::Fault;

/// Closed set of access widths the bus dispatches.
///
/// Float and double are distinct widths with their own handler callbacks,
/// not reinterpreted integer transfers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum AccessWidth {
    /// 8-bit integer access.
    U8,
    /// 16-bit integer access.
    U16,
    /// 32-bit integer access.
    U32,
    /// 32-bit floating-point access.
    F32,
    /// 64-bit floating-point access.
    F64,
}

impl AccessWidth {
    /// Number of bytes the access touches.
    #[must_use]
    pub const fn byte_len(self) -> u32 {
        match self {
            Self::U8 => 1,
            Self::U16 => 2,
            Self::U32 | Self::F32 => 4,
            Self::F64 => 8,
        }
    }
}

impl core::fmt::Display for AccessWidth {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let name = match self {
            Self::U8 => "8-bit",
            Self::U16 => "16-bit",
            Self::U32 => "32-bit",
            Self::F32 => "float",
            Self::F64 => "double",
        };
        f.write_str(name)
    }
}

/// Capability required from every pluggable memory/peripheral region.
///
/// Addresses are region-local (the dispatcher has already applied the
/// region's address mask). Every method defaults to an unimplemented-feature
/// fault so leaf handlers override only the widths their hardware decodes;
/// a handler must never touch addresses outside its declared window.
pub trait RegionHandler {
    /// Reads an 8-bit value.
    ///
    /// # Errors
    ///
    /// Returns a [`Fault`] when the window cannot complete the read.
    fn read_u8(&mut self, addr: u32) -> Result<u8, Fault> {
        Err(Fault::unimplemented_read(
            UNDECODED_WIDTH,
            addr,
            AccessWidth::U8,
        ))
    }

    /// Reads a 16-bit value.
    ///
    /// # Errors
    ///
    /// Returns a [`Fault`] when the window cannot complete the read.
    fn read_u16(&mut self, addr: u32) -> Result<u16, Fault> {
        Err(Fault::unimplemented_read(
            UNDECODED_WIDTH,
            addr,
            AccessWidth::U16,
        ))
    }

    /// Reads a 32-bit value.
    ///
    /// # Errors
    ///
    /// Returns a [`Fault`] when the window cannot complete the read.
    fn read_u32(&mut self, addr: u32) -> Result<u32, Fault> {
        Err(Fault::unimplemented_read(
            UNDECODED_WIDTH,
            addr,
            AccessWidth::U32,
        ))
    }

    /// Reads a 32-bit float.
    ///
    /// # Errors
    ///
    /// Returns a [`Fault`] when the window cannot complete the read.
    fn read_f32(&mut self, addr: u32) -> Result<f32, Fault> {
        Err(Fault::unimplemented_read(
            UNDECODED_WIDTH,
            addr,
            AccessWidth::F32,
        ))
    }

    /// Reads a 64-bit float.
    ///
    /// # Errors
    ///
    /// Returns a [`Fault`] when the window cannot complete the read.
    fn read_f64(&mut self, addr: u32) -> Result<f64, Fault> {
        Err(Fault::unimplemented_read(
            UNDECODED_WIDTH,
            addr,
            AccessWidth::F64,
        ))
    }

    /// Writes an 8-bit value.
    ///
    /// # Errors
    ///
    /// Returns a [`Fault`] when the window cannot complete the write.
    fn write_u8(&mut self, addr: u32, value: u8) -> Result<(), Fault> {
        Err(Fault::unimplemented_write(
            UNDECODED_WIDTH,
            addr,
            AccessWidth::U8,
            u64::from(value),
        ))
    }

    /// Writes a 16-bit value.
    ///
    /// # Errors
    ///
    /// Returns a [`Fault`] when the window cannot complete the write.
    fn write_u16(&mut self, addr: u32, value: u16) -> Result<(), Fault> {
        Err(Fault::unimplemented_write(
            UNDECODED_WIDTH,
            addr,
            AccessWidth::U16,
            u64::from(value),
        ))
    }

    /// Writes a 32-bit value.
    ///
    /// # Errors
    ///
    /// Returns a [`Fault`] when the window cannot complete the write.
    fn write_u32(&mut self, addr: u32, value: u32) -> Result<(), Fault> {
        Err(Fault::unimplemented_write(
            UNDECODED_WIDTH,
            addr,
            AccessWidth::U32,
            u64::from(value),
        ))
    }

    /// Writes a 32-bit float.
    ///
    /// # Errors
    ///
    /// Returns a [`Fault`] when the window cannot complete the write.
    fn write_f32(&mut self, addr: u32, value: f32) -> Result<(), Fault> {
        Err(Fault::unimplemented_write(
            UNDECODED_WIDTH,
            addr,
            AccessWidth::F32,
            u64::from(value.to_bits()),
        ))
    }

    /// Writes a 64-bit float.
    ///
    /// # Errors
    ///
    /// Returns a [`Fault`] when the window cannot complete the write.
    fn write_f64(&mut self, addr: u32, value: f64) -> Result<(), Fault> {
        Err(Fault::unimplemented_write(
            UNDECODED_WIDTH,
            addr,
            AccessWidth::F64,
            value.to_bits(),
        ))
    }
}

const UNDECODED_WIDTH: &str = "window does not decode this access width";

mod sealed {
    pub trait Sealed {}

    impl Sealed for u8 {}
    impl Sealed for u16 {}
    impl Sealed for u32 {}
    impl Sealed for f32 {}
    impl Sealed for f64 {}
}

/// Primitive transferable over the guest bus, binding a Rust type to its
/// access width and its width-specific handler callbacks.
///
/// The set is closed (`u8`, `u16`, `u32`, `f32`, `f64`); dispatch code is
/// written once, generic over this trait, instead of once per width.
pub trait BusData: sealed::Sealed + Copy {
    /// Access width this type moves over the bus.
    const WIDTH: AccessWidth;

    /// Reads a value of this width from a region handler.
    ///
    /// # Errors
    ///
    /// Propagates the handler's fault.
    fn read_from(handler: &mut dyn RegionHandler, addr: u32) -> Result<Self, Fault>;

    /// Writes a value of this width through a region handler.
    ///
    /// # Errors
    ///
    /// Propagates the handler's fault.
    fn write_to(handler: &mut dyn RegionHandler, addr: u32, value: Self) -> Result<(), Fault>;

    /// Raw bit pattern widened to 64 bits, for fault diagnostics.
    fn diag_bits(self) -> u64;
}

impl BusData for u8 {
    const WIDTH: AccessWidth = AccessWidth::U8;

    fn read_from(handler: &mut dyn RegionHandler, addr: u32) -> Result<Self, Fault> {
        handler.read_u8(addr)
    }

    fn write_to(handler: &mut dyn RegionHandler, addr: u32, value: Self) -> Result<(), Fault> {
        handler.write_u8(addr, value)
    }

    fn diag_bits(self) -> u64 {
        u64::from(self)
    }
}

impl BusData for u16 {
    const WIDTH: AccessWidth = AccessWidth::U16;

    fn read_from(handler: &mut dyn RegionHandler, addr: u32) -> Result<Self, Fault> {
        handler.read_u16(addr)
    }

    fn write_to(handler: &mut dyn RegionHandler, addr: u32, value: Self) -> Result<(), Fault> {
        handler.write_u16(addr, value)
    }

    fn diag_bits(self) -> u64 {
        u64::from(self)
    }
}

impl BusData for u32 {
    const WIDTH: AccessWidth = AccessWidth::U32;

    fn read_from(handler: &mut dyn RegionHandler, addr: u32) -> Result<Self, Fault> {
        handler.read_u32(addr)
    }

    fn write_to(handler: &mut dyn RegionHandler, addr: u32, value: Self) -> Result<(), Fault> {
        handler.write_u32(addr, value)
    }

    fn diag_bits(self) -> u64 {
        u64::from(self)
    }
}

impl BusData for f32 {
    const WIDTH: AccessWidth = AccessWidth::F32;

    fn read_from(handler: &mut dyn RegionHandler, addr: u32) -> Result<Self, Fault> {
        handler.read_f32(addr)
    }

    fn write_to(handler: &mut dyn RegionHandler, addr: u32, value: Self) -> Result<(), Fault> {
        handler.write_f32(addr, value)
    }

    fn diag_bits(self) -> u64 {
        u64::from(self.to_bits())
    }
}

impl BusData for f64 {
    const WIDTH: AccessWidth = AccessWidth::F64;

    fn read_from(handler: &mut dyn RegionHandler, addr: u32) -> Result<Self, Fault> {
        handler.read_f64(addr)
    }

    fn write_to(handler: &mut dyn RegionHandler, addr: u32, value: Self) -> Result<(), Fault> {
        handler.write_f64(addr, value)
    }

    fn diag_bits(self) -> u64 {
        self.to_bits()
    }
}

#[allow(clippy::cast_possible_truncation)]
const fn byte_index(addr: u32) -> usize {
    addr as usize
}

/// Little-endian random-access backing store honoring all five widths.
///
/// Accesses whose byte range runs past the end of the store fault
/// `OutOfBounds` without touching any byte.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct Ram {
    bytes: Box<[u8]>,
}

impl Ram {
    /// Allocates a zeroed store of `len` bytes.
    #[must_use]
    pub fn new(len: usize) -> Self {
        Self {
            bytes: vec![0; len].into_boxed_slice(),
        }
    }

    /// Builds a store owning `image`.
    #[must_use]
    pub fn from_image(image: Vec<u8>) -> Self {
        Self {
            bytes: image.into_boxed_slice(),
        }
    }

    /// Store length in bytes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// `true` when the store holds no bytes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Copies `image` into the store starting at `offset`.
    ///
    /// # Errors
    ///
    /// Returns [`Fault::OutOfBounds`] when the image would run past the end
    /// of the store.
    pub fn load_image(&mut self, offset: u32, image: &[u8]) -> Result<(), Fault> {
        let start = byte_index(offset);
        let end = start
            .checked_add(image.len())
            .filter(|end| *end <= self.bytes.len())
            .ok_or(Fault::OutOfBounds {
                addr: offset,
                width: AccessWidth::U8,
            })?;
        self.bytes[start..end].copy_from_slice(image);
        Ok(())
    }

    /// Read-only view of the backing bytes.
    #[must_use]
    pub fn as_slice(&self) -> &[u8] {
        &self.bytes
    }

    fn read_array<const N: usize>(&self, addr: u32, width: AccessWidth) -> Result<[u8; N], Fault> {
        let start = byte_index(addr);
        let end = start
            .checked_add(N)
            .filter(|end| *end <= self.bytes.len())
            .ok_or(Fault::OutOfBounds { addr, width })?;
        let mut out = [0_u8; N];
        out.copy_from_slice(&self.bytes[start..end]);
        Ok(out)
    }

    fn write_array<const N: usize>(
        &mut self,
        addr: u32,
        bytes: [u8; N],
        width: AccessWidth,
    ) -> Result<(), Fault> {
        let start = byte_index(addr);
        let end = start
            .checked_add(N)
            .filter(|end| *end <= self.bytes.len())
            .ok_or(Fault::OutOfBounds { addr, width })?;
        self.bytes[start..end].copy_from_slice(&bytes);
        Ok(())
    }
}

impl RegionHandler for Ram {
    fn read_u8(&mut self, addr: u32) -> Result<u8, Fault> {
        Ok(u8::from_le_bytes(self.read_array(addr, AccessWidth::U8)?))
    }

    fn read_u16(&mut self, addr: u32) -> Result<u16, Fault> {
        Ok(u16::from_le_bytes(self.read_array(addr, AccessWidth::U16)?))
    }

    fn read_u32(&mut self, addr: u32) -> Result<u32, Fault> {
        Ok(u32::from_le_bytes(self.read_array(addr, AccessWidth::U32)?))
    }

    fn read_f32(&mut self, addr: u32) -> Result<f32, Fault> {
        Ok(f32::from_le_bytes(self.read_array(addr, AccessWidth::F32)?))
    }

    fn read_f64(&mut self, addr: u32) -> Result<f64, Fault> {
        Ok(f64::from_le_bytes(self.read_array(addr, AccessWidth::F64)?))
    }

    fn write_u8(&mut self, addr: u32, value: u8) -> Result<(), Fault> {
        self.write_array(addr, value.to_le_bytes(), AccessWidth::U8)
    }

    fn write_u16(&mut self, addr: u32, value: u16) -> Result<(), Fault> {
        self.write_array(addr, value.to_le_bytes(), AccessWidth::U16)
    }

    fn write_u32(&mut self, addr: u32, value: u32) -> Result<(), Fault> {
        self.write_array(addr, value.to_le_bytes(), AccessWidth::U32)
    }

    fn write_f32(&mut self, addr: u32, value: f32) -> Result<(), Fault> {
        self.write_array(addr, value.to_le_bytes(), AccessWidth::F32)
    }

    fn write_f64(&mut self, addr: u32, value: f64) -> Result<(), Fault> {
        self.write_array(addr, value.to_le_bytes(), AccessWidth::F64)
    }
}

/// Read-only image window; every write faults and keeps the written value
/// in the diagnostic.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct Rom {
    cells: Ram,
}

const ROM_READ_ONLY: &str = "ROM window is read-only";

impl Rom {
    /// Builds a read-only window over `image`.
    #[must_use]
    pub fn from_image(image: Vec<u8>) -> Self {
        Self {
            cells: Ram::from_image(image),
        }
    }

    /// Image length in bytes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    /// `true` when the image holds no bytes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }
}

impl RegionHandler for Rom {
    fn read_u8(&mut self, addr: u32) -> Result<u8, Fault> {
        self.cells.read_u8(addr)
    }

    fn read_u16(&mut self, addr: u32) -> Result<u16, Fault> {
        self.cells.read_u16(addr)
    }

    fn read_u32(&mut self, addr: u32) -> Result<u32, Fault> {
        self.cells.read_u32(addr)
    }

    fn read_f32(&mut self, addr: u32) -> Result<f32, Fault> {
        self.cells.read_f32(addr)
    }

    fn read_f64(&mut self, addr: u32) -> Result<f64, Fault> {
        self.cells.read_f64(addr)
    }

    fn write_u8(&mut self, addr: u32, value: u8) -> Result<(), Fault> {
        Err(Fault::unimplemented_write(
            ROM_READ_ONLY,
            addr,
            AccessWidth::U8,
            u64::from(value),
        ))
    }

    fn write_u16(&mut self, addr: u32, value: u16) -> Result<(), Fault> {
        Err(Fault::unimplemented_write(
            ROM_READ_ONLY,
            addr,
            AccessWidth::U16,
            u64::from(value),
        ))
    }

    fn write_u32(&mut self, addr: u32, value: u32) -> Result<(), Fault> {
        Err(Fault::unimplemented_write(
            ROM_READ_ONLY,
            addr,
            AccessWidth::U32,
            u64::from(value),
        ))
    }

    fn write_f32(&mut self, addr: u32, value: f32) -> Result<(), Fault> {
        Err(Fault::unimplemented_write(
            ROM_READ_ONLY,
            addr,
            AccessWidth::F32,
            u64::from(value.to_bits()),
        ))
    }

    fn write_f64(&mut self, addr: u32, value: f64) -> Result<(), Fault> {
        Err(Fault::unimplemented_write(
            ROM_READ_ONLY,
            addr,
            AccessWidth::F64,
            value.to_bits(),
        ))
    }
}
