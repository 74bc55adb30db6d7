use crate::fault::Fault;

use super::region::{AccessWidth, BusData, RegionHandler};

/// One prioritized entry in the dispatcher's region table.
///
/// An access matches when, after masking with `range_mask`, both its first
/// and last byte fall inside `[first_addr, last_addr]`. The owning handler
/// then receives `addr & addr_mask` as its region-local address.
pub struct RegionMapping {
    name: &'static str,
    first_addr: u32,
    last_addr: u32,
    addr_mask: u32,
    range_mask: u32,
    handler: Box<dyn RegionHandler>,
}

impl RegionMapping {
    /// Builds a mapping for `handler` over `[first_addr, last_addr]`.
    #[must_use]
    pub fn new(
        name: &'static str,
        first_addr: u32,
        last_addr: u32,
        addr_mask: u32,
        range_mask: u32,
        handler: Box<dyn RegionHandler>,
    ) -> Self {
        Self {
            name,
            first_addr,
            last_addr,
            addr_mask,
            range_mask,
            handler,
        }
    }

    /// Diagnostic name of the region.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        self.name
    }

    /// Inclusive matched bounds, as registered.
    #[must_use]
    pub const fn bounds(&self) -> (u32, u32) {
        (self.first_addr, self.last_addr)
    }

    const fn contains(&self, first_byte: u32, last_byte: u32) -> bool {
        let first = first_byte & self.range_mask;
        let last = last_byte & self.range_mask;
        first >= self.first_addr
            && first <= self.last_addr
            && last >= self.first_addr
            && last <= self.last_addr
    }
}

impl core::fmt::Debug for RegionMapping {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("RegionMapping")
            .field("name", &self.name)
            .field("first_addr", &self.first_addr)
            .field("last_addr", &self.last_addr)
            .field("addr_mask", &self.addr_mask)
            .field("range_mask", &self.range_mask)
            .finish_non_exhaustive()
    }
}

/// Outcome of routing one access through the region table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolvedAccess {
    /// Index of the matched region in priority order.
    pub region_index: usize,
    /// Region-local address the handler will receive.
    pub local_addr: u32,
}

/// Accumulates region mappings in priority order, then freezes them.
#[derive(Debug, Default)]
pub struct MemoryMapBuilder {
    regions: Vec<RegionMapping>,
}

impl MemoryMapBuilder {
    /// Starts an empty builder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a mapping; earlier mappings win ties.
    #[must_use]
    pub fn region(mut self, mapping: RegionMapping) -> Self {
        self.regions.push(mapping);
        self
    }

    /// Validates and freezes the table.
    ///
    /// # Errors
    ///
    /// Returns [`Fault::Integrity`] when a mapping's bounds are reversed or
    /// not canonical under its own range mask (such a region could never
    /// match).
    pub fn build(self) -> Result<MemoryMap, Fault> {
        for mapping in &self.regions {
            if mapping.first_addr > mapping.last_addr {
                return Err(Fault::Integrity {
                    detail: "region bounds are reversed",
                });
            }
            if mapping.first_addr & mapping.range_mask != mapping.first_addr
                || mapping.last_addr & mapping.range_mask != mapping.last_addr
            {
                return Err(Fault::Integrity {
                    detail: "region bounds are not canonical under the range mask",
                });
            }
        }
        Ok(MemoryMap {
            regions: self.regions.into_boxed_slice(),
        })
    }
}

/// Ordered, immutable region table routing physical accesses.
///
/// First match wins over a linear scan; the table is small and front-loaded
/// with the hottest, most address-ambiguous region, so the scan beats a
/// balanced search structure in practice. No partial access is ever
/// performed: an access no region fully contains faults.
#[derive(Debug)]
pub struct MemoryMap {
    regions: Box<[RegionMapping]>,
}

impl MemoryMap {
    /// Starts a builder for a new table.
    #[must_use]
    pub fn builder() -> MemoryMapBuilder {
        MemoryMapBuilder::new()
    }

    /// Number of registered regions.
    #[must_use]
    pub const fn region_count(&self) -> usize {
        self.regions.len()
    }

    /// Diagnostic name for the region at `index` in priority order.
    #[must_use]
    pub fn region_name(&self, index: usize) -> Option<&'static str> {
        self.regions.get(index).map(RegionMapping::name)
    }

    /// Routes an access without performing it.
    ///
    /// # Errors
    ///
    /// Returns [`Fault::Unimplemented`] when no region contains both the
    /// first and last byte of the access (unmapped or straddling).
    pub fn resolve(&self, addr: u32, width: AccessWidth) -> Result<ResolvedAccess, Fault> {
        let last_byte = addr.wrapping_add(width.byte_len() - 1);
        for (region_index, region) in self.regions.iter().enumerate() {
            if region.contains(addr, last_byte) {
                return Ok(ResolvedAccess {
                    region_index,
                    local_addr: addr & region.addr_mask,
                });
            }
        }
        Err(Fault::unmapped(addr, width))
    }

    /// Reads a value of width `T` from the owning region.
    ///
    /// # Errors
    ///
    /// Routing faults from [`Self::resolve`], or whatever fault the region
    /// handler raises.
    pub fn read<T: BusData>(&mut self, addr: u32) -> Result<T, Fault> {
        let resolved = self.resolve(addr, T::WIDTH)?;
        let region = &mut self.regions[resolved.region_index];
        T::read_from(region.handler.as_mut(), resolved.local_addr)
    }

    /// Writes a value of width `T` through the owning region.
    ///
    /// # Errors
    ///
    /// Routing faults from [`Self::resolve`], or whatever fault the region
    /// handler raises.
    pub fn write<T: BusData>(&mut self, addr: u32, value: T) -> Result<(), Fault> {
        let resolved = self.resolve(addr, T::WIDTH)?;
        let region = &mut self.regions[resolved.region_index];
        T::write_to(region.handler.as_mut(), resolved.local_addr, value)
    }

    /// Reads an 8-bit value.
    ///
    /// # Errors
    ///
    /// See [`Self::read`].
    pub fn read_u8(&mut self, addr: u32) -> Result<u8, Fault> {
        self.read(addr)
    }

    /// Reads a 16-bit value.
    ///
    /// # Errors
    ///
    /// See [`Self::read`].
    pub fn read_u16(&mut self, addr: u32) -> Result<u16, Fault> {
        self.read(addr)
    }

    /// Reads a 32-bit value.
    ///
    /// # Errors
    ///
    /// See [`Self::read`].
    pub fn read_u32(&mut self, addr: u32) -> Result<u32, Fault> {
        self.read(addr)
    }

    /// Reads a 32-bit float.
    ///
    /// # Errors
    ///
    /// See [`Self::read`].
    pub fn read_f32(&mut self, addr: u32) -> Result<f32, Fault> {
        self.read(addr)
    }

    /// Reads a 64-bit float.
    ///
    /// # Errors
    ///
    /// See [`Self::read`].
    pub fn read_f64(&mut self, addr: u32) -> Result<f64, Fault> {
        self.read(addr)
    }

    /// Writes an 8-bit value.
    ///
    /// # Errors
    ///
    /// See [`Self::write`].
    pub fn write_u8(&mut self, addr: u32, value: u8) -> Result<(), Fault> {
        self.write(addr, value)
    }

    /// Writes a 16-bit value.
    ///
    /// # Errors
    ///
    /// See [`Self::write`].
    pub fn write_u16(&mut self, addr: u32, value: u16) -> Result<(), Fault> {
        self.write(addr, value)
    }

    /// Writes a 32-bit value.
    ///
    /// # Errors
    ///
    /// See [`Self::write`].
    pub fn write_u32(&mut self, addr: u32, value: u32) -> Result<(), Fault> {
        self.write(addr, value)
    }

    /// Writes a 32-bit float.
    ///
    /// # Errors
    ///
    /// See [`Self::write`].
    pub fn write_f32(&mut self, addr: u32, value: f32) -> Result<(), Fault> {
        self.write(addr, value)
    }

    /// Writes a 64-bit float.
    ///
    /// # Errors
    ///
    /// See [`Self::write`].
    pub fn write_f64(&mut self, addr: u32, value: f64) -> Result<(), Fault> {
        self.write(addr, value)
    }
}

#[cfg(test)]
mod tests {
    use super::{MemoryMap, RegionMapping};
    use crate::fault::Fault;
    use crate::memory::region::{AccessWidth, Ram};

    fn ram_region(
        name: &'static str,
        first: u32,
        last: u32,
        addr_mask: u32,
        range_mask: u32,
        len: usize,
    ) -> RegionMapping {
        RegionMapping::new(
            name,
            first,
            last,
            addr_mask,
            range_mask,
            Box::new(Ram::new(len)),
        )
    }

    fn aliasing_map() -> MemoryMap {
        // Both regions cover the same masked span; the first must win.
        MemoryMap::builder()
            .region(ram_region(
                "privileged",
                0xE000_0000,
                0xFFFF_FFFF,
                0xFF,
                0xFFFF_FFFF,
                0x100,
            ))
            .region(ram_region(
                "general",
                0x0000_0000,
                0x1FFF_FFFF,
                0xFF,
                0x1FFF_FFFF,
                0x100,
            ))
            .build()
            .expect("table is well formed")
    }

    #[test]
    fn first_match_wins_for_mask_aliased_addresses() {
        let mut map = aliasing_map();

        // Top three bits set: under the second region's range mask this
        // address would also land inside its span.
        map.write_u8(0xE000_0010, 0xAA).unwrap();
        let privileged = map.resolve(0xE000_0010, AccessWidth::U8).unwrap();
        assert_eq!(map.region_name(privileged.region_index), Some("privileged"));

        let general = map.resolve(0x0000_0010, AccessWidth::U8).unwrap();
        assert_eq!(map.region_name(general.region_index), Some("general"));

        // The two resolutions hit different handlers even though both
        // local addresses are 0x10.
        assert_eq!(map.read_u8(0x0000_0010).unwrap(), 0);
        assert_eq!(map.read_u8(0xE000_0010).unwrap(), 0xAA);
    }

    #[test]
    fn local_address_uses_the_region_mask() {
        let mut map = aliasing_map();
        let resolved = map.resolve(0xE000_0310, AccessWidth::U32).unwrap();
        assert_eq!(resolved.local_addr, 0x10);

        map.write_u32(0xE000_0310, 0x0102_0304).unwrap();
        assert_eq!(map.read_u32(0xE000_0010).unwrap(), 0x0102_0304);
    }

    #[test]
    fn unmapped_access_faults_with_address_and_width() {
        let map = MemoryMap::builder()
            .region(ram_region("only", 0x1000, 0x1FFF, 0xFFF, 0xFFFF, 0x1000))
            .build()
            .unwrap();

        assert_eq!(
            map.resolve(0x3000, AccessWidth::U16),
            Err(Fault::unmapped(0x3000, AccessWidth::U16))
        );
    }

    #[test]
    fn straddling_access_faults_instead_of_truncating() {
        let mut map = MemoryMap::builder()
            .region(ram_region("low", 0x0000, 0x0FFF, 0xFFF, 0xFFFF, 0x1000))
            .region(ram_region("high", 0x1000, 0x1FFF, 0xFFF, 0xFFFF, 0x1000))
            .build()
            .unwrap();

        // Last byte of the 32-bit access lands one past the low region.
        assert_eq!(
            map.resolve(0x0FFD, AccessWidth::U32),
            Err(Fault::unmapped(0x0FFD, AccessWidth::U32))
        );
        assert!(map.read_u32(0x0FFD).is_err());

        // Fully inside either region is fine.
        assert!(map.read_u32(0x0FFC).is_ok());
        assert!(map.read_u32(0x1000).is_ok());
    }

    #[test]
    fn access_wrapping_the_address_space_faults() {
        let map = MemoryMap::builder()
            .region(ram_region(
                "privileged",
                0xE000_0000,
                0xFFFF_FFFF,
                0xFF,
                0xFFFF_FFFF,
                0x100,
            ))
            .build()
            .unwrap();

        // The last byte wraps to 0x00000001, which is outside the region,
        // so the both-bytes rule refuses the access.
        assert!(map.resolve(0xFFFF_FFFE, AccessWidth::U32).is_err());
        assert!(map.resolve(0xFFFF_FFFC, AccessWidth::U32).is_ok());
    }

    #[test]
    fn builder_rejects_non_canonical_bounds() {
        let err = MemoryMap::builder()
            .region(ram_region("bad", 0x2000_0000, 0x2000_0FFF, 0xFFF, 0x1FFF_FFFF, 0x1000))
            .build()
            .unwrap_err();
        assert_eq!(
            err,
            Fault::Integrity {
                detail: "region bounds are not canonical under the range mask",
            }
        );

        let err = MemoryMap::builder()
            .region(ram_region("reversed", 0x2000, 0x1000, 0xFFF, 0xFFFF, 0x1000))
            .build()
            .unwrap_err();
        assert_eq!(
            err,
            Fault::Integrity {
                detail: "region bounds are reversed",
            }
        );
    }

    #[test]
    fn float_and_double_route_like_their_integer_widths() {
        let mut map = aliasing_map();
        map.write_f32(0xE000_0020, 3.5).unwrap();
        assert!((map.read_f32(0xE000_0020).unwrap() - 3.5).abs() < f32::EPSILON);
        map.write_f64(0xE000_0028, 0.125).unwrap();
        assert!((map.read_f64(0xE000_0028).unwrap() - 0.125).abs() < f64::EPSILON);
    }
}
