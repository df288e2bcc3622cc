//! In-memory serial SRAM and bus doubles for driver tests.
//!
//! [`SramModel`] emulates the device itself, including the mid-burst
//! address wrap inside one die of a stacked package, so the drivers' burst
//! splitting is tested against the failure it exists to prevent.

use std::cell::RefCell;
use std::rc::Rc;
use std::vec::Vec;

use embedded_hal::digital::{ErrorType as PinErrorType, OutputPin};
use embedded_hal::spi::{ErrorType as SpiErrorType, SpiBus};

use super::dma::SpiDmaBus;
use super::serial::{SramSpec, CMD_READ, CMD_WRITE, CMD_WRMR};

#[derive(Clone, Copy)]
enum Phase {
    /// Chip deselected.
    Idle,
    /// Selected, waiting for the opcode.
    Opcode,
    /// WRMR issued, waiting for the mode byte.
    Mode,
    Addr {
        cmd: u8,
        addr: u32,
        remaining: u8,
    },
    Payload {
        cmd: u8,
        addr: u32,
    },
    /// Command complete or unrecognized; further bytes ignored.
    Done,
}

pub(crate) struct SramModel {
    spec: SramSpec,
    mem: Vec<u8>,
    phase: Phase,
}

impl SramModel {
    pub(crate) fn shared(spec: SramSpec) -> Rc<RefCell<SramModel>> {
        Rc::new(RefCell::new(SramModel {
            spec,
            mem: std::vec![0; spec.size_bytes as usize],
            phase: Phase::Idle,
        }))
    }

    fn cs_low(&mut self) {
        self.phase = Phase::Opcode;
    }

    fn cs_high(&mut self) {
        self.phase = Phase::Idle;
    }

    /// The address range of the die containing `addr`.
    fn die_extent(&self, addr: u32) -> (u32, u32) {
        let boundary = self.spec.die_boundary;
        if boundary == 0 {
            (0, self.spec.size_bytes)
        } else if addr < boundary {
            (0, boundary)
        } else {
            (boundary, self.spec.size_bytes)
        }
    }

    /// Burst auto-increment. Real stacked parts wrap inside the die the
    /// burst started in, which is the corruption the drivers must dodge.
    fn advance(&self, addr: u32) -> u32 {
        let (start, end) = self.die_extent(addr);
        if addr + 1 >= end {
            start
        } else {
            addr + 1
        }
    }

    fn transfer_byte(&mut self, mosi: u8) -> u8 {
        match self.phase {
            Phase::Idle | Phase::Done => 0,
            Phase::Opcode => {
                self.phase = match mosi {
                    CMD_WRMR => Phase::Mode,
                    CMD_READ | CMD_WRITE => Phase::Addr {
                        cmd: mosi,
                        addr: 0,
                        remaining: 3,
                    },
                    _ => Phase::Done,
                };
                0
            }
            Phase::Mode => {
                self.phase = Phase::Done;
                0
            }
            Phase::Addr {
                cmd,
                addr,
                remaining,
            } => {
                let addr = (addr << 8) | u32::from(mosi);
                self.phase = if remaining == 1 {
                    Phase::Payload {
                        cmd,
                        addr: addr % self.spec.size_bytes,
                    }
                } else {
                    Phase::Addr {
                        cmd,
                        addr,
                        remaining: remaining - 1,
                    }
                };
                0
            }
            Phase::Payload { cmd, addr } => {
                let miso = if cmd == CMD_WRITE {
                    self.mem[addr as usize] = mosi;
                    0
                } else {
                    self.mem[addr as usize]
                };
                self.phase = Phase::Payload {
                    cmd,
                    addr: self.advance(addr),
                };
                miso
            }
        }
    }
}

/// Blocking SPI bus wired to a shared [`SramModel`].
pub(crate) struct SimSpiBus {
    model: Rc<RefCell<SramModel>>,
}

impl SimSpiBus {
    pub(crate) fn new(model: &Rc<RefCell<SramModel>>) -> Self {
        SimSpiBus {
            model: Rc::clone(model),
        }
    }
}

impl SpiErrorType for SimSpiBus {
    type Error = core::convert::Infallible;
}

impl SpiBus<u8> for SimSpiBus {
    fn read(&mut self, words: &mut [u8]) -> Result<(), Self::Error> {
        let mut model = self.model.borrow_mut();
        for word in words {
            *word = model.transfer_byte(0);
        }
        Ok(())
    }

    fn write(&mut self, words: &[u8]) -> Result<(), Self::Error> {
        let mut model = self.model.borrow_mut();
        for &word in words {
            model.transfer_byte(word);
        }
        Ok(())
    }

    fn transfer(&mut self, read: &mut [u8], write: &[u8]) -> Result<(), Self::Error> {
        let mut model = self.model.borrow_mut();
        for i in 0..read.len().max(write.len()) {
            let miso = model.transfer_byte(write.get(i).copied().unwrap_or(0));
            if let Some(slot) = read.get_mut(i) {
                *slot = miso;
            }
        }
        Ok(())
    }

    fn transfer_in_place(&mut self, words: &mut [u8]) -> Result<(), Self::Error> {
        let mut model = self.model.borrow_mut();
        for word in words {
            *word = model.transfer_byte(*word);
        }
        Ok(())
    }

    fn flush(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }
}

/// Chip-select pin wired to a shared [`SramModel`].
pub(crate) struct SimCsPin {
    model: Rc<RefCell<SramModel>>,
}

impl SimCsPin {
    pub(crate) fn new(model: &Rc<RefCell<SramModel>>) -> Self {
        SimCsPin {
            model: Rc::clone(model),
        }
    }
}

impl PinErrorType for SimCsPin {
    type Error = core::convert::Infallible;
}

impl OutputPin for SimCsPin {
    fn set_low(&mut self) -> Result<(), Self::Error> {
        self.model.borrow_mut().cs_low();
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        self.model.borrow_mut().cs_high();
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum DmaOpKind {
    Tx,
    Rx,
}

/// One queued transfer, recorded for inspection.
#[derive(Debug, Clone, Copy)]
pub(crate) struct DmaOp {
    pub kind: DmaOpKind,
    pub len: usize,
    pub assert_cs: bool,
    pub release_cs: bool,
}

/// DMA seam that completes every transfer synchronously against the model
/// and logs it. `rx_latency` holds `rx_busy` true for that many polls after
/// a queued read, to exercise callers' completion waits.
pub(crate) struct SimDmaBus {
    model: Rc<RefCell<SramModel>>,
    log: Rc<RefCell<Vec<DmaOp>>>,
    rx_latency: u32,
    rx_countdown: u32,
}

impl SimDmaBus {
    pub(crate) fn new(model: &Rc<RefCell<SramModel>>) -> Self {
        SimDmaBus {
            model: Rc::clone(model),
            log: Rc::new(RefCell::new(Vec::new())),
            rx_latency: 0,
            rx_countdown: 0,
        }
    }

    pub(crate) fn with_rx_latency(mut self, polls: u32) -> Self {
        self.rx_latency = polls;
        self
    }

    pub(crate) fn log(&self) -> Rc<RefCell<Vec<DmaOp>>> {
        Rc::clone(&self.log)
    }
}

impl SpiDmaBus for SimDmaBus {
    unsafe fn queue_tx(&mut self, src: *const u8, len: usize, assert_cs: bool, release_cs: bool) {
        let mut model = self.model.borrow_mut();
        if assert_cs {
            model.cs_low();
        }
        for i in 0..len {
            model.transfer_byte(unsafe { *src.add(i) });
        }
        if release_cs {
            model.cs_high();
        }
        self.log.borrow_mut().push(DmaOp {
            kind: DmaOpKind::Tx,
            len,
            assert_cs,
            release_cs,
        });
    }

    unsafe fn queue_rx(&mut self, dst: *mut u8, len: usize, release_cs: bool) {
        let mut model = self.model.borrow_mut();
        for i in 0..len {
            unsafe { *dst.add(i) = model.transfer_byte(0) };
        }
        if release_cs {
            model.cs_high();
        }
        self.rx_countdown = self.rx_latency;
        self.log.borrow_mut().push(DmaOp {
            kind: DmaOpKind::Rx,
            len,
            assert_cs: false,
            release_cs,
        });
    }

    fn tx_busy(&mut self) -> bool {
        false
    }

    fn rx_busy(&mut self) -> bool {
        if self.rx_countdown > 0 {
            self.rx_countdown -= 1;
            true
        } else {
            false
        }
    }
}
