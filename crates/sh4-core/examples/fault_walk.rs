//! Fault and vectoring walk across the standard map.
//!
//! Probes a representative address set through the core facade, printing
//! the outcome of each access, then runs one miss-and-retry sequence and a
//! round of interrupt arbitration with the trace events they produce.
//!
//! ## Usage
//!
//! ```sh
//! cargo run -p sh4-core --example fault_walk
//! ```

use std::cell::RefCell;
use std::rc::Rc;

use proptest as _;
use rstest as _;
#[cfg(feature = "serde")]
use serde as _;
use sh4_core::{
    standard_map, Area0, Area0Buses, ExceptionCode, Fault, MemoryMap, PageSize, Protection, Ram,
    Rom, Sh4, StandardRegions, TlbKey, TraceEvent, TraceSink, UnmappedBus, UtlbData,
};
use thiserror as _;

#[derive(Clone, Default)]
struct SharedSink(Rc<RefCell<Vec<TraceEvent>>>);

impl SharedSink {
    fn drain(&self) -> Vec<TraceEvent> {
        self.0.borrow_mut().drain(..).collect()
    }
}

impl TraceSink for SharedSink {
    fn record(&mut self, event: TraceEvent) {
        self.0.borrow_mut().push(event);
    }
}

fn map() -> MemoryMap {
    let area0 = Area0::new(
        Rom::from_image(vec![0_u8; 0x1000]),
        Ram::new(0x2_0000),
        Area0Buses::default(),
    );
    standard_map(StandardRegions {
        on_chip: Box::new(UnmappedBus),
        area0,
        system_ram: Ram::new(0x10_0000),
        tex64: Box::new(UnmappedBus),
        tex32: Box::new(UnmappedBus),
        ta_fifo: Box::new(UnmappedBus),
    })
    .expect("canonical table is well formed")
}

fn describe(result: Result<u32, Fault>) -> String {
    match result {
        Ok(value) => format!("ok {value:#010x}"),
        Err(fault) => format!("fault: {fault}"),
    }
}

fn probe_physical(cpu: &mut Sh4) -> Vec<(u32, &'static str, String)> {
    let probes: [(u32, &'static str); 6] = [
        (0x8C00_0000, "system RAM, cached view"),
        (0xA000_0000, "boot ROM, uncached view"),
        (0xE000_0000, "on-chip window, no bus wired"),
        (0x1800_0000, "hole between external areas"),
        (0x057F_FFFD, "last bytes of the 32-bit texture window"),
        (0x0000_1000, "boot ROM past this demo's image"),
    ];
    probes
        .iter()
        .map(|(addr, label)| (*addr, *label, describe(cpu.read_phys::<u32>(*addr))))
        .collect()
}

fn miss_and_retry(cpu: &mut Sh4, sink: &SharedSink) {
    cpu.mmu_mut().set_address_translation(true);
    cpu.registers_mut().set_vbr(0x8C00_8000);

    println!("\nfetch 0x00401000 with an empty second level:");
    println!("  {}", describe(cpu.fetch_word(0x0040_1000).map(u32::from)));
    println!(
        "  expevt {:#05x}, pc {:#010x}",
        cpu.registers().expevt(),
        cpu.registers().pc()
    );

    cpu.write_phys::<u16>(0x0C00_2000, 0x0009)
        .expect("backing page is mapped RAM");
    cpu.mmu_mut()
        .install_utlb(
            0,
            TlbKey::valid(0x0040_1000, 0),
            UtlbData {
                ppn: 0x0C00_2000,
                size: PageSize::FourKiB,
                shared: false,
                cacheable: true,
                protection: Protection::ReadWrite,
                space_attr: 0,
                timing_class: false,
                dirty: true,
            },
        )
        .expect("slot 0 is within the table");

    println!("fetch again with the mapping installed:");
    println!("  {}", describe(cpu.fetch_word(0x0040_1000).map(u32::from)));

    for event in sink.drain() {
        println!("  trace {event:?}");
    }
}

fn arbitrate(cpu: &mut Sh4, sink: &SharedSink) {
    println!("\nlatch timer, serial, and non-maskable interrupts:");
    cpu.latch_interrupt(ExceptionCode::Tmu0Underflow);
    cpu.latch_interrupt(ExceptionCode::ScifReceiveFull);
    cpu.latch_interrupt(ExceptionCode::Nmi);

    loop {
        let mut sr = cpu.registers().sr();
        sr.set_exceptions_blocked(false);
        cpu.registers_mut().set_sr(sr);
        let Some(code) = cpu.service_pending() else {
            break;
        };
        println!(
            "  serviced {code:?}, intevt {:#05x}",
            cpu.registers().intevt()
        );
    }

    for event in sink.drain() {
        println!("  trace {event:?}");
    }
}

fn main() {
    let sink = SharedSink::default();
    let mut cpu = Sh4::with_trace_sink(map(), Box::new(sink.clone()));

    println!("physical probes:");
    for (addr, label, outcome) in probe_physical(&mut cpu) {
        println!("  {addr:#010x} {label:<42} {outcome}");
    }

    miss_and_retry(&mut cpu, &sink);
    arbitrate(&mut cpu, &sink);
}
