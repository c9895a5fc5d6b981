//! 8254 PIT channel 2 as a one-shot delay timer
//!
//! Channel 2 is gated through bit 0 of PPI port B (0x61) and its output is
//! visible on bit 5 of port B on AT-class machines, or of port C (0x62) on
//! XT-class boards where port B reads back what was written.

use parflash_core::clock::TickTimer;

use crate::port::PortIo;

/// PIT input clock in Hz
pub const PIT_FREQUENCY_HZ: u32 = 1_193_182;

const PPI_PORT_B: u16 = 0x61;
const PPI_PORT_C: u16 = 0x62;
const PIT_CONTROL: u16 = 0x43;
const PIT_CHANNEL_2: u16 = 0x42;

/// Channel 2, lobyte/hibyte access, mode 0 (interrupt on terminal count)
const CHANNEL_2_MODE_0: u8 = 0xB0;
const GATE_2: u8 = 0x01;
const OUT_2: u8 = 0x20;

/// Reads of the output bit before the wait is abandoned
///
/// Far longer than a full 16-bit count on any real machine; it only trips
/// when channel 2 is not wired up the way this expects.
const MAX_STATUS_READS: u32 = 50_000_000;

/// [`TickTimer`] on PIT channel 2
#[derive(Debug)]
pub struct PitTimer {
    io: PortIo,
}

impl PitTimer {
    /// Use channel 2 through `io`
    pub fn new(io: PortIo) -> Self {
        Self { io }
    }
}

impl TickTimer for PitTimer {
    fn frequency_hz(&self) -> u32 {
        PIT_FREQUENCY_HZ
    }

    fn wait_ticks(&mut self, ticks: u16) {
        let gate = self.io.inb(PPI_PORT_B) | GATE_2;
        self.io.outb(PPI_PORT_B, gate);
        self.io.outb(PIT_CONTROL, CHANNEL_2_MODE_0);
        let [low, high] = ticks.to_le_bytes();
        self.io.outb(PIT_CHANNEL_2, low);
        self.io.outb(PIT_CHANNEL_2, high);

        for _ in 0..MAX_STATUS_READS {
            let mut status = self.io.inb(PPI_PORT_B);
            if status == gate {
                status = self.io.inb(PPI_PORT_C);
            }
            if status & OUT_2 != 0 {
                return;
            }
        }
        log::warn!("PIT channel 2 never reached terminal count");
    }
}
