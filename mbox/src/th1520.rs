//! # TH1520 Mailbox Channels
//!
//! Channel protocol driver for the WuJian mailbox IP on the TH1520. The
//! interconnect unit exposes one register bank per participant (the ICU
//! slots, in order: 910T, 902T, 906R, 910R). A sender deposits seven info
//! words into the receiver's bank and raises the transmit bit in that
//! bank's generation register; the receiver acknowledges by posting a fixed
//! magic value into the sender's own bank.
//!
//! The ack poll cadence (200 polls spaced one microsecond apart) and the
//! magic value are part of the contract with the remote firmware and must
//! not be tuned.

use ember_hal::{Error, Result};
use log::warn;

use crate::adapter::MboxAdapter;
use crate::mmio::RegBank;

// ============================================================================
// Channel Geometry
// ============================================================================

/// Mailbox channels per interconnect unit.
pub const CHAN_COUNT: usize = 4;
/// Byte stride between adjacent channel register banks.
pub const CHAN_STRIDE: usize = 0x1000;
/// Transport frame length in bytes (seven 32-bit info words).
pub const FRAME_LEN: usize = 28;

/// Channel-enable mask register.
const MBOX_MASK: usize = 0x0c;
/// Generation (doorbell) register.
const MBOX_GEN: usize = 0x10;
/// First info register; info0..info7 follow at a 4-byte stride.
const MBOX_INFO0: usize = 0x14;
/// Last info register, repurposed as the acknowledgment register.
const MBOX_INFO7: usize = 0x30;
/// Info registers per bank.
const MBOX_INFO_COUNT: usize = 8;

/// Transmit-data doorbell bit in the generation register.
const GEN_TX_DATA: u32 = 1 << 6;

/// Magic value the receiver posts into the sender's ack register.
pub const ACK_MAGIC: u32 = 0xdead_beaf;
/// Bounded ack wait: polls at a one-microsecond cadence.
pub const ACK_POLL_LIMIT: u32 = 200;

/// Microsecond delay hook supplied by the platform timer.
pub type DelayUs = fn(u32);

// ============================================================================
// Channel Driver
// ============================================================================

/// One interconnect unit's view of the mailbox channels.
///
/// The channel address maps are derived once at construction and immutable
/// afterwards. Each bank is touched only by this hart as sender and by the
/// remote domain as acknowledger, so the driver takes no locks.
#[derive(Debug)]
pub struct Th1520Mailbox {
    id: u32,
    own_index: usize,
    local: [RegBank; CHAN_COUNT],
    remote: [RegBank; CHAN_COUNT],
    delay_us: DelayUs,
}

impl Th1520Mailbox {
    /// Construct the driver and reset every peer channel.
    ///
    /// `own_index` is this core's slot in the interconnect's addressing
    /// scheme. `reg_table[0]` is this core's own bank; the remaining slots
    /// are the peers' banks indexed by channel, the last aliasing the own
    /// bank when this core sits on the last channel. The local bank for
    /// channel `t` is the own bank offset by `(t - own_index)` strides.
    ///
    /// # Safety
    ///
    /// Every table entry must point at a live mailbox register bank of at
    /// least [`CHAN_STRIDE`] bytes, including the banks reachable at
    /// negative strides from the own bank.
    pub unsafe fn new(
        id: u32,
        own_index: usize,
        reg_table: &[u64; CHAN_COUNT],
        delay_us: DelayUs,
    ) -> Result<Self> {
        if own_index >= CHAN_COUNT {
            return Err(Error::InvalidArgument);
        }

        let own_base = reg_table[0] as usize;
        let mut local = [unsafe { RegBank::new(own_base, CHAN_STRIDE) }; CHAN_COUNT];
        let mut remote = local;
        for chan in 0..CHAN_COUNT {
            let offset = (chan as isize - own_index as isize) * CHAN_STRIDE as isize;
            let base = (own_base as isize + offset) as usize;
            local[chan] = unsafe { RegBank::new(base, CHAN_STRIDE) };
            if chan != own_index {
                remote[chan] = unsafe { RegBank::new(reg_table[chan] as usize, CHAN_STRIDE) };
            }
        }

        let mbox = Self {
            id,
            own_index,
            local,
            remote,
            delay_us,
        };
        mbox.reset_channels();
        Ok(mbox)
    }

    /// One-time bus reset of every peer channel.
    ///
    /// Clears the generation and all eight info registers (stale acks
    /// included) on both sides, then enables one mask bit per initialized
    /// channel. The bit position advances per initialized channel, not per
    /// channel index, so the skipped self channel leaves no gap.
    fn reset_channels(&self) {
        let own_bank = &self.local[self.own_index];
        let mut mask_bit = 0;
        for chan in 0..CHAN_COUNT {
            if chan == self.own_index {
                continue;
            }
            for bank in [&self.remote[chan], &self.local[chan]] {
                bank.rmw(MBOX_GEN, 0, 0xff);
                for reg in 0..MBOX_INFO_COUNT {
                    bank.write(MBOX_INFO0 + 4 * reg, 0);
                }
            }
            own_bank.rmw(MBOX_MASK, 1 << mask_bit, 0);
            mask_bit += 1;
        }
    }

    /// Local (receive-side) bank for a channel.
    #[cfg(test)]
    fn local_bank(&self, chan: usize) -> &RegBank {
        &self.local[chan]
    }
}

impl MboxAdapter for Th1520Mailbox {
    fn id(&self) -> u32 {
        self.id
    }

    /// Send one 28-byte frame and wait for the receiver's acknowledgment.
    ///
    /// The info words must be globally visible before the doorbell bit is
    /// raised, and the doorbell before the ack poll starts; both points
    /// carry a full barrier. Timeout is surfaced, never retried here;
    /// retry policy belongs to the callers of the power client.
    fn write(&self, channel: u8, buf: &[u8]) -> Result<()> {
        let chan = channel as usize;
        if chan >= CHAN_COUNT || chan == self.own_index || buf.len() != FRAME_LEN {
            return Err(Error::InvalidArgument);
        }

        let remote = &self.remote[chan];
        for (reg, word) in buf.chunks_exact(4).enumerate() {
            let word = u32::from_ne_bytes([word[0], word[1], word[2], word[3]]);
            remote.write(MBOX_INFO0 + 4 * reg, word);
        }
        ember_hal::arch::riscv64::barriers::mb();
        remote.rmw(MBOX_GEN, GEN_TX_DATA, 0);
        ember_hal::arch::riscv64::barriers::mb();

        let local = &self.local[chan];
        for _ in 0..ACK_POLL_LIMIT {
            if local.read(MBOX_INFO7) == ACK_MAGIC {
                local.rmw(MBOX_INFO7, 0, u32::MAX);
                return Ok(());
            }
            (self.delay_us)(1);
        }

        warn!(
            "mbox {}: channel {channel} gave no ack within {ACK_POLL_LIMIT} polls",
            self.id
        );
        Err(Error::TimedOut)
    }

    /// The hardware direction only carries outbound requests; acks arrive
    /// out-of-band through the info7 register. Kept as a success stub.
    fn read(&self, _channel: u8, _buf: &mut [u8], _timeout_us: u32) -> Result<usize> {
        Ok(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapter::{adapter_write, AdapterRegistry};
    use std::boxed::Box;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::time::Duration;
    use std::{thread, vec};

    const BANK_WORDS: usize = CHAN_STRIDE / 4;

    fn no_delay(_us: u32) {}

    fn sleepy_delay(us: u32) {
        // Stretched cadence so the simulated remote side always lands
        // inside the poll window, even on a loaded host.
        thread::sleep(Duration::from_micros(us as u64 * 100));
    }

    /// Leak a zeroed slab of `n` contiguous channel banks.
    fn leak_banks(n: usize) -> usize {
        let slab = vec![0u32; n * BANK_WORDS].into_boxed_slice();
        Box::leak(slab).as_ptr() as usize
    }

    fn peek(addr: usize) -> u32 {
        unsafe { (addr as *const u32).read_volatile() }
    }

    fn poke(addr: usize, value: u32) {
        unsafe { (addr as *mut u32).write_volatile(value) }
    }

    fn frame(seed: u8) -> [u8; FRAME_LEN] {
        let mut buf = [0u8; FRAME_LEN];
        for (i, byte) in buf.iter_mut().enumerate() {
            *byte = seed.wrapping_add(i as u8);
        }
        buf
    }

    fn new_mbox(id: u32, own_index: usize, table: [u64; 4], delay: DelayUs) -> Th1520Mailbox {
        unsafe { Th1520Mailbox::new(id, own_index, &table, delay).unwrap() }
    }

    #[test]
    fn test_reset_enables_one_mask_bit_per_peer_channel() {
        let own = leak_banks(4);
        let table = [
            own as u64,
            leak_banks(1) as u64,
            leak_banks(1) as u64,
            leak_banks(1) as u64,
        ];
        // Stale state that construction must clear.
        poke(table[1] as usize + MBOX_GEN, 0xff);
        poke(own + CHAN_STRIDE + MBOX_INFO7, ACK_MAGIC);

        let _mbox = new_mbox(1, 0, table, no_delay);

        // Three peer channels => mask bits 0..2 in the own bank.
        assert_eq!(peek(own + MBOX_MASK), 0b111);
        assert_eq!(peek(table[1] as usize + MBOX_GEN), 0);
        assert_eq!(peek(own + CHAN_STRIDE + MBOX_INFO7), 0);
    }

    #[test]
    fn test_write_acknowledged_within_bound() {
        let own = leak_banks(4);
        let remote1 = leak_banks(1);
        let table = [own as u64, remote1 as u64, leak_banks(1) as u64, leak_banks(1) as u64];
        let mbox = new_mbox(1, 0, table, sleepy_delay);

        // Simulated remote side: waits for the doorbell on its bank, then
        // posts the ack magic into the sender's local bank for channel 1.
        let ack_addr = own + CHAN_STRIDE + MBOX_INFO7;
        let remote = thread::spawn(move || {
            while peek(remote1 + MBOX_GEN) & GEN_TX_DATA == 0 {
                thread::sleep(Duration::from_micros(10));
            }
            poke(ack_addr, ACK_MAGIC);
        });

        assert_eq!(mbox.write(1, &frame(0)), Ok(()));
        remote.join().unwrap();

        // Success must leave the ack register cleared.
        assert_eq!(mbox.local_bank(1).read(MBOX_INFO7), 0);
    }

    #[test]
    fn test_write_times_out_after_exactly_200_polls() {
        static POLLS: AtomicU32 = AtomicU32::new(0);
        fn counting_delay(_us: u32) {
            POLLS.fetch_add(1, Ordering::SeqCst);
        }

        let own = leak_banks(4);
        let table = [own as u64, leak_banks(1) as u64, leak_banks(1) as u64, leak_banks(1) as u64];
        let mbox = new_mbox(1, 0, table, counting_delay);

        // Something other than the magic sits in the ack register; with no
        // remote side it must survive the timeout untouched.
        let ack_addr = own + CHAN_STRIDE + MBOX_INFO7;
        poke(ack_addr, 0x1234);

        assert_eq!(mbox.write(1, &frame(3)), Err(Error::TimedOut));
        assert_eq!(POLLS.load(Ordering::SeqCst), ACK_POLL_LIMIT);
        assert_eq!(peek(ack_addr), 0x1234);
    }

    #[test]
    fn test_write_rejects_bad_channel_and_length() {
        let own = leak_banks(4);
        let table = [own as u64, leak_banks(1) as u64, leak_banks(1) as u64, leak_banks(1) as u64];
        let mbox = new_mbox(1, 0, table, no_delay);

        assert_eq!(mbox.write(4, &frame(0)), Err(Error::InvalidArgument));
        assert_eq!(mbox.write(0, &frame(0)), Err(Error::InvalidArgument)); // self channel
        assert_eq!(mbox.write(1, &[0u8; 8]), Err(Error::InvalidArgument));
    }

    #[test]
    fn test_registered_send_hits_remote_bank_and_local_ack() {
        // Core on the last slot (index 3): peer channel 1's local bank sits
        // two strides below the own bank, its remote bank comes straight
        // from the table.
        let slab = leak_banks(4);
        let own = slab + 3 * CHAN_STRIDE;
        let remote1 = leak_banks(1);
        let table = [own as u64, remote1 as u64, leak_banks(1) as u64, own as u64];

        let mbox: &'static Th1520Mailbox =
            Box::leak(Box::new(new_mbox(42, 3, table, sleepy_delay)));
        let registry = AdapterRegistry::new();
        registry.add(mbox).unwrap();
        let found = registry.find(42).expect("adapter registered");

        let local1_ack = slab + CHAN_STRIDE + MBOX_INFO7;
        let remote = thread::spawn(move || {
            while peek(remote1 + MBOX_GEN) & GEN_TX_DATA == 0 {
                thread::sleep(Duration::from_micros(10));
            }
            poke(local1_ack, ACK_MAGIC);
        });

        let buf = frame(0x40);
        assert_eq!(adapter_write(Some(found), 1, &buf), Ok(()));
        remote.join().unwrap();

        // Seven info words landed at remote offsets 0x14..0x2c.
        for (reg, word) in buf.chunks_exact(4).enumerate() {
            let expect = u32::from_ne_bytes([word[0], word[1], word[2], word[3]]);
            assert_eq!(peek(remote1 + MBOX_INFO0 + 4 * reg), expect);
        }
        assert_eq!(peek(remote1 + MBOX_GEN) & GEN_TX_DATA, GEN_TX_DATA);
        assert_eq!(peek(local1_ack), 0);
    }
}
