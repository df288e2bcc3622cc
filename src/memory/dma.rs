use super::serial::{SramBus, SramSpec, CMD_READ, CMD_WRITE, CMD_WRMR, MODE_SEQUENTIAL};

/// Largest single DMA transfer the driver will queue. Longer bursts are
/// carved into back-to-back transactions of at most this size so one delay
/// line cannot monopolize the bus for a whole update period.
pub const MAX_DMA_XFER_BYTES: usize = 16 * 1024;

const ZERO_CHUNK_BYTES: usize = 256;

/// Constant DMA source for zero fills, so clearing a delay line needs no
/// RAM buffer of its own.
static ZERO_CHUNK: [u8; ZERO_CHUNK_BYTES] = [0; ZERO_CHUNK_BYTES];

/// Queued SPI-with-DMA hardware seam.
///
/// Implementations run queued transfers in submission order and control the
/// chip-select line from the queue, so one logical transaction can span a
/// command transfer and a payload transfer with CS held across both.
/// `queue_*` may block until queue space is available but never until the
/// transfer completes.
pub trait SpiDmaBus {
    /// Queue a transmit of `len` bytes from `src`.
    ///
    /// # Safety
    ///
    /// `src` must point to `len` readable bytes that stay valid and
    /// unmodified until [`tx_busy`](SpiDmaBus::tx_busy) reports false.
    unsafe fn queue_tx(&mut self, src: *const u8, len: usize, assert_cs: bool, release_cs: bool);

    /// Queue a receive of `len` bytes into `dst`.
    ///
    /// # Safety
    ///
    /// `dst` must point to `len` writable bytes that stay valid and
    /// otherwise untouched until [`rx_busy`](SpiDmaBus::rx_busy) reports
    /// false.
    unsafe fn queue_rx(&mut self, dst: *mut u8, len: usize, release_cs: bool);

    /// True while any queued transmit has not finished.
    fn tx_busy(&mut self) -> bool;

    /// True while any queued receive has not finished.
    fn rx_busy(&mut self) -> bool;
}

struct PendingRead {
    dst: *mut u8,
    len: usize,
}

/// DMA-backed SPI SRAM driver.
///
/// Same wire protocol as [`SpiSram`](super::SpiSram) but every burst is
/// queued instead of clocked inline, so the audio update can overlap delay
/// line traffic with computation. Two rules fall out of that:
///
/// - The driver must not move while a transfer is in flight; the command
///   header is transmitted out of a buffer inside the struct. Keep it in a
///   `static` (the usual [`SramCell`](super::SramCell) placement).
/// - A read destination must stay in place until
///   [`is_read_busy`](SramBus::is_read_busy) reports false. Without a copy
///   buffer the DMA engine writes the destination directly; with one
///   (see [`set_dma_copy_buffer`](SpiSramDma::set_dma_copy_buffer),
///   required when the destination may sit in cached memory) the payload
///   lands in the copy buffer and is moved out on the poll that first
///   observes completion.
pub struct SpiSramDma<D> {
    dma: D,
    spec: SramSpec,
    cmd_buf: [u8; 4],
    copy_buf: Option<&'static mut [u8]>,
    pending: Option<PendingRead>,
    begun: bool,
}

// SAFETY: the raw pointer in `pending` refers to a caller buffer that the
// busy contract keeps alive and exclusive until the copy-out happens.
unsafe impl<D: Send> Send for SpiSramDma<D> {}

impl<D: SpiDmaBus> SpiSramDma<D> {
    pub fn new(dma: D, spec: SramSpec) -> Self {
        SpiSramDma {
            dma,
            spec,
            cmd_buf: [0; 4],
            copy_buf: None,
            pending: None,
            begun: false,
        }
    }

    /// Install a staging buffer that all payload DMA goes through.
    ///
    /// Needed when caller buffers may live in cached or otherwise
    /// non-DMA-safe memory. The buffer also caps the transaction size, so
    /// give it at least a block's worth (256 bytes) of space.
    pub fn set_dma_copy_buffer(&mut self, buf: &'static mut [u8]) {
        self.copy_buf = Some(buf);
    }

    fn wait_tx_idle(&mut self) {
        while self.dma.tx_busy() {
            core::hint::spin_loop();
        }
    }

    fn wait_rx_idle(&mut self) {
        while self.dma.rx_busy() {
            core::hint::spin_loop();
        }
        self.finish_pending();
    }

    /// Move a completed staged read out to its destination.
    fn finish_pending(&mut self) {
        if let Some(pending) = self.pending.take() {
            if let Some(buf) = self.copy_buf.as_deref() {
                // SAFETY: `dst` is valid per the read contract and the
                // staged bytes are complete (rx idle).
                unsafe { core::ptr::copy_nonoverlapping(buf.as_ptr(), pending.dst, pending.len) };
            }
        }
    }

    fn chunk_cap(&self) -> usize {
        match &self.copy_buf {
            Some(buf) => MAX_DMA_XFER_BYTES.min(buf.len() & !1),
            None => MAX_DMA_XFER_BYTES,
        }
    }

    fn queue_header(&mut self, cmd: u8, addr: u32) {
        self.cmd_buf = [cmd, (addr >> 16) as u8, (addr >> 8) as u8, addr as u8];
        // SAFETY: `cmd_buf` lives in the (pinned-by-contract) struct and is
        // only rewritten after a tx-idle wait.
        unsafe { self.dma.queue_tx(self.cmd_buf.as_ptr(), 4, true, false) };
    }

    fn write_raw(&mut self, addr: u32, src: *const u8, total: usize) {
        self.wait_tx_idle();
        self.wait_rx_idle();
        let ((a0, l0), tail) = self.spec.split_burst(addr, total);
        let mut offset = 0usize;
        for (mut a, mut len) in core::iter::once((a0, l0)).chain(tail) {
            while len > 0 {
                let n = len.min(self.chunk_cap());
                self.wait_tx_idle();
                let payload = match self.copy_buf.as_deref_mut() {
                    Some(buf) => {
                        // SAFETY: `offset + n <= total` readable bytes.
                        let chunk = unsafe { core::slice::from_raw_parts(src.add(offset), n) };
                        buf[..n].copy_from_slice(chunk);
                        buf.as_ptr()
                    }
                    // SAFETY: in-range; the caller's slice outlives the
                    // transfer because this path waits before returning.
                    None => unsafe { src.add(offset) },
                };
                self.queue_header(CMD_WRITE, a);
                // SAFETY: staged bytes (rewritten only after tx idle) or
                // the caller slice held live by the trailing wait.
                unsafe { self.dma.queue_tx(payload, n, false, true) };
                offset += n;
                a += n as u32;
                len -= n;
            }
        }
        if self.copy_buf.is_none() {
            // The source is only borrowed for this call.
            self.wait_tx_idle();
        }
    }

    fn read_raw(&mut self, addr: u32, dst: *mut u8, total: usize) {
        self.wait_tx_idle();
        self.wait_rx_idle();
        let ((a0, l0), tail) = self.spec.split_burst(addr, total);
        let mut offset = 0usize;
        for (mut a, mut len) in core::iter::once((a0, l0)).chain(tail) {
            while len > 0 {
                let n = len.min(self.chunk_cap());
                self.wait_tx_idle();
                self.wait_rx_idle();
                self.queue_header(CMD_READ, a);
                match self.copy_buf.as_deref_mut() {
                    Some(buf) => {
                        let staging = buf.as_mut_ptr();
                        // SAFETY: `n <= buf.len()` and the staging buffer
                        // is not reused until the next rx-idle wait.
                        unsafe { self.dma.queue_rx(staging, n, true) };
                        self.pending = Some(PendingRead {
                            // SAFETY: in-range per `total`.
                            dst: unsafe { dst.add(offset) },
                            len: n,
                        });
                    }
                    None => {
                        // SAFETY: the destination stays in place until the
                        // caller's is_read_busy poll, per the contract.
                        unsafe { self.dma.queue_rx(dst.add(offset), n, true) };
                    }
                }
                offset += n;
                a += n as u32;
                len -= n;
            }
        }
    }
}

impl<D: SpiDmaBus> SramBus for SpiSramDma<D> {
    fn begin(&mut self) {
        if self.begun {
            return;
        }
        self.cmd_buf = [CMD_WRMR, MODE_SEQUENTIAL, 0, 0];
        // SAFETY: `cmd_buf` outlives the transfer; we wait right here.
        unsafe { self.dma.queue_tx(self.cmd_buf.as_ptr(), 2, true, true) };
        self.wait_tx_idle();
        self.begun = true;
    }

    fn spec(&self) -> SramSpec {
        self.spec
    }

    fn write(&mut self, addr: u32, src: &[u8]) {
        self.write_raw(addr, src.as_ptr(), src.len());
    }

    fn read(&mut self, addr: u32, dst: &mut [u8]) {
        self.read_raw(addr, dst.as_mut_ptr(), dst.len());
    }

    fn write16(&mut self, addr: u32, src: &[i16]) {
        self.write_raw(addr, src.as_ptr() as *const u8, src.len() * 2);
    }

    fn read16(&mut self, addr: u32, dst: &mut [i16]) {
        self.read_raw(addr, dst.as_mut_ptr() as *mut u8, dst.len() * 2);
    }

    fn zero(&mut self, addr: u32, num_bytes: usize) {
        self.wait_tx_idle();
        self.wait_rx_idle();
        let ((a0, l0), tail) = self.spec.split_burst(addr, num_bytes);
        for (mut a, mut len) in core::iter::once((a0, l0)).chain(tail) {
            while len > 0 {
                let n = len.min(MAX_DMA_XFER_BYTES);
                self.wait_tx_idle();
                self.queue_header(CMD_WRITE, a);
                let mut remaining = n;
                while remaining > 0 {
                    let m = remaining.min(ZERO_CHUNK_BYTES);
                    // SAFETY: constant static source.
                    unsafe { self.dma.queue_tx(ZERO_CHUNK.as_ptr(), m, false, remaining == m) };
                    remaining -= m;
                }
                a += n as u32;
                len -= n;
            }
        }
    }

    fn is_write_busy(&mut self) -> bool {
        self.dma.tx_busy()
    }

    fn is_read_busy(&mut self) -> bool {
        if self.dma.rx_busy() {
            return true;
        }
        self.finish_pending();
        false
    }
}
