use core::cell::UnsafeCell;

use embedded_hal::digital::OutputPin;
use embedded_hal::spi::SpiBus;

/// Write command opcode.
pub(crate) const CMD_WRITE: u8 = 0x02;
/// Read command opcode.
pub(crate) const CMD_READ: u8 = 0x03;
/// Write-mode-register opcode.
pub(crate) const CMD_WRMR: u8 = 0x01;
/// Sequential (auto-increment burst) mode.
pub(crate) const MODE_SEQUENTIAL: u8 = 0x40;

/// Streaming chunk size for the blocking driver's word conversions.
const CHUNK_BYTES: usize = 64;

/// Geometry of one serial SRAM device.
///
/// `die_boundary` is the first address of the upper die in a stacked
/// package, or 0 for single-die parts. A burst must never cross it: the
/// address counter wraps within the die it started in, silently corrupting
/// data, so the drivers split straddling bursts in two.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SramSpec {
    /// Device capacity in bytes.
    pub size_bytes: u32,
    /// First address of the second die, or 0 when the package is one die.
    pub die_boundary: u32,
}

impl SramSpec {
    /// Microchip 23LC1024: 1 Mbit, single die.
    pub const MC_23LC1024: SramSpec = SramSpec {
        size_bytes: 128 * 1024,
        die_boundary: 0,
    };

    /// Stacked 1 Mbit package built from two 512 Kbit dies.
    pub const DUAL_DIE_1M: SramSpec = SramSpec {
        size_bytes: 128 * 1024,
        die_boundary: 0x10000,
    };

    /// Split `[addr, addr + len)` at the die boundary.
    ///
    /// Returns the burst unchanged plus `None` when it lies on one die,
    /// otherwise the lower-die head and the upper-die tail.
    pub(crate) fn split_burst(&self, addr: u32, len: usize) -> ((u32, usize), Option<(u32, usize)>) {
        let boundary = self.die_boundary;
        let end = addr + len as u32;
        if boundary == 0 || addr >= boundary || end <= boundary {
            return ((addr, len), None);
        }
        let head = (boundary - addr) as usize;
        ((addr, head), Some((boundary, len - head)))
    }
}

/// One serial SRAM device, byte- and word-granular.
///
/// The error model is deliberately empty: a missing or mis-wired device
/// yields undefined data and the host keeps running. DMA implementations
/// complete `read*` asynchronously; the destination must stay in place
/// until [`is_read_busy`](SramBus::is_read_busy) reports false (the delay
/// buffers read into pool-block storage, which never moves).
pub trait SramBus {
    /// One-time device initialization; safe to call repeatedly.
    fn begin(&mut self);

    /// Device geometry.
    fn spec(&self) -> SramSpec;

    /// Burst-write `src` starting at `addr`.
    fn write(&mut self, addr: u32, src: &[u8]);

    /// Burst-read into `dst` starting at `addr`.
    fn read(&mut self, addr: u32, dst: &mut [u8]);

    /// Burst-write 16-bit words (native byte order on the wire).
    fn write16(&mut self, addr: u32, src: &[i16]);

    /// Burst-read 16-bit words.
    fn read16(&mut self, addr: u32, dst: &mut [i16]);

    /// Zero `num_bytes` bytes starting at `addr`.
    fn zero(&mut self, addr: u32, num_bytes: usize);

    /// Zero `num_words` 16-bit words starting at `addr`.
    fn zero16(&mut self, addr: u32, num_words: usize) {
        self.zero(addr, num_words * 2);
    }

    /// Write a single byte.
    fn write_byte(&mut self, addr: u32, value: u8) {
        self.write(addr, &[value]);
    }

    /// Read a single byte.
    fn read_byte(&mut self, addr: u32) -> u8 {
        let mut buf = [0u8; 1];
        self.read(addr, &mut buf);
        buf[0]
    }

    /// Write a single 16-bit word.
    fn write_word(&mut self, addr: u32, value: i16) {
        self.write16(addr, &[value]);
    }

    /// Read a single 16-bit word.
    fn read_word(&mut self, addr: u32) -> i16 {
        let mut buf = [0i16; 1];
        self.read16(addr, &mut buf);
        buf[0]
    }

    /// True while a queued write transfer is still on the bus.
    fn is_write_busy(&mut self) -> bool {
        false
    }

    /// True while a queued read transfer is still on the bus.
    fn is_read_busy(&mut self) -> bool {
        false
    }
}

/// Object-safe shared view of an [`SramBus`], handed to memory slots.
pub trait SharedSram {
    fn begin(&self);
    fn spec(&self) -> SramSpec;
    fn write16(&self, addr: u32, src: &[i16]);
    fn read16(&self, addr: u32, dst: &mut [i16]);
    fn zero(&self, addr: u32, num_bytes: usize);
    fn zero16(&self, addr: u32, num_words: usize);
    fn is_write_busy(&self) -> bool;
    fn is_read_busy(&self) -> bool;
}

/// Shares one driver between every slot carved from its device.
///
/// All access funnels through the audio update context (the host calls
/// `update()` on one node at a time and never re-enters it), so interior
/// mutability here is a formality, not a lock. Callers must not touch the
/// bus from an ISR.
pub struct SramCell<T> {
    bus: UnsafeCell<T>,
}

// SAFETY: the audio update context is the sole caller (cooperative
// single-threaded model); the DMA engine only touches buffers the drivers
// hand it, never this cell.
unsafe impl<T: Send> Sync for SramCell<T> {}

impl<T: SramBus> SramCell<T> {
    pub const fn new(bus: T) -> Self {
        SramCell {
            bus: UnsafeCell::new(bus),
        }
    }

    /// Run `f` with exclusive access to the wrapped driver.
    pub fn with<R>(&self, f: impl FnOnce(&mut T) -> R) -> R {
        // SAFETY: see the Sync justification above.
        f(unsafe { &mut *self.bus.get() })
    }
}

impl<T: SramBus> SharedSram for SramCell<T> {
    fn begin(&self) {
        self.with(SramBus::begin);
    }

    fn spec(&self) -> SramSpec {
        self.with(|bus| bus.spec())
    }

    fn write16(&self, addr: u32, src: &[i16]) {
        self.with(|bus| bus.write16(addr, src));
    }

    fn read16(&self, addr: u32, dst: &mut [i16]) {
        self.with(|bus| bus.read16(addr, dst));
    }

    fn zero(&self, addr: u32, num_bytes: usize) {
        self.with(|bus| bus.zero(addr, num_bytes));
    }

    fn zero16(&self, addr: u32, num_words: usize) {
        self.with(|bus| bus.zero16(addr, num_words));
    }

    fn is_write_busy(&self) -> bool {
        self.with(SramBus::is_write_busy)
    }

    fn is_read_busy(&self) -> bool {
        self.with(SramBus::is_read_busy)
    }
}

/// Blocking SPI SRAM driver.
///
/// Each transaction asserts chip-select, clocks out the command opcode and
/// a 3-byte MSB-first address, streams the payload, and deasserts. Bursts
/// that would straddle the die boundary are decomposed into two
/// transactions. The caller owns bus configuration (mode 0, 20 MHz
/// typical).
pub struct SpiSram<SPI, CS> {
    spi: SPI,
    cs: CS,
    spec: SramSpec,
    begun: bool,
}

impl<SPI, CS> SpiSram<SPI, CS>
where
    SPI: SpiBus,
    CS: OutputPin,
{
    pub fn new(spi: SPI, cs: CS, spec: SramSpec) -> Self {
        SpiSram {
            spi,
            cs,
            spec,
            begun: false,
        }
    }

    fn start_transaction(&mut self, cmd: u8, addr: u32) {
        let _ = self.cs.set_low();
        let header = [cmd, (addr >> 16) as u8, (addr >> 8) as u8, addr as u8];
        let _ = self.spi.write(&header);
    }

    fn end_transaction(&mut self) {
        let _ = self.spi.flush();
        let _ = self.cs.set_high();
    }

    fn burst_write(&mut self, addr: u32, src: &[u8]) {
        self.start_transaction(CMD_WRITE, addr);
        let _ = self.spi.write(src);
        self.end_transaction();
    }

    fn burst_read(&mut self, addr: u32, dst: &mut [u8]) {
        self.start_transaction(CMD_READ, addr);
        let _ = self.spi.read(dst);
        self.end_transaction();
    }

    fn burst_zero(&mut self, addr: u32, mut num_bytes: usize) {
        let zeros = [0u8; CHUNK_BYTES];
        self.start_transaction(CMD_WRITE, addr);
        while num_bytes > 0 {
            let n = num_bytes.min(CHUNK_BYTES);
            let _ = self.spi.write(&zeros[..n]);
            num_bytes -= n;
        }
        self.end_transaction();
    }
}

impl<SPI, CS> SramBus for SpiSram<SPI, CS>
where
    SPI: SpiBus,
    CS: OutputPin,
{
    fn begin(&mut self) {
        if self.begun {
            return;
        }
        let _ = self.cs.set_high();
        // Burst (sequential) mode; a failed write here just leaves the
        // device in its power-on default, which is the same thing.
        let _ = self.cs.set_low();
        let _ = self.spi.write(&[CMD_WRMR, MODE_SEQUENTIAL]);
        self.end_transaction();
        self.begun = true;
    }

    fn spec(&self) -> SramSpec {
        self.spec
    }

    fn write(&mut self, addr: u32, src: &[u8]) {
        let ((a0, l0), tail) = self.spec.split_burst(addr, src.len());
        self.burst_write(a0, &src[..l0]);
        if let Some((a1, _)) = tail {
            self.burst_write(a1, &src[l0..]);
        }
    }

    fn read(&mut self, addr: u32, dst: &mut [u8]) {
        let ((a0, l0), tail) = self.spec.split_burst(addr, dst.len());
        self.burst_read(a0, &mut dst[..l0]);
        if let Some((a1, _)) = tail {
            self.burst_read(a1, &mut dst[l0..]);
        }
    }

    fn write16(&mut self, addr: u32, src: &[i16]) {
        let ((a0, l0), tail) = self.spec.split_burst(addr, src.len() * 2);
        debug_assert!(l0 % 2 == 0, "die boundary must be word aligned");
        let mut consumed = 0usize;
        for (a, len) in core::iter::once((a0, l0)).chain(tail) {
            let part = &src[consumed..consumed + len / 2];
            consumed += len / 2;
            self.start_transaction(CMD_WRITE, a);
            let mut chunk = [0u8; CHUNK_BYTES];
            for piece in part.chunks(CHUNK_BYTES / 2) {
                for (b, &w) in chunk.chunks_exact_mut(2).zip(piece.iter()) {
                    b.copy_from_slice(&w.to_le_bytes());
                }
                let _ = self.spi.write(&chunk[..piece.len() * 2]);
            }
            self.end_transaction();
        }
    }

    fn read16(&mut self, addr: u32, dst: &mut [i16]) {
        let ((a0, l0), tail) = self.spec.split_burst(addr, dst.len() * 2);
        debug_assert!(l0 % 2 == 0, "die boundary must be word aligned");
        let mut consumed = 0usize;
        for (a, len) in core::iter::once((a0, l0)).chain(tail) {
            self.start_transaction(CMD_READ, a);
            let mut chunk = [0u8; CHUNK_BYTES];
            for piece in dst[consumed..consumed + len / 2].chunks_mut(CHUNK_BYTES / 2) {
                let n = piece.len() * 2;
                let _ = self.spi.read(&mut chunk[..n]);
                for (w, b) in piece.iter_mut().zip(chunk[..n].chunks_exact(2)) {
                    *w = i16::from_le_bytes([b[0], b[1]]);
                }
            }
            self.end_transaction();
            consumed += len / 2;
        }
    }

    fn zero(&mut self, addr: u32, num_bytes: usize) {
        let ((a0, l0), tail) = self.spec.split_burst(addr, num_bytes);
        self.burst_zero(a0, l0);
        if let Some((a1, l1)) = tail {
            self.burst_zero(a1, l1);
        }
    }
}
