//! # AON RPC Frames
//!
//! Pure encode/decode of the RPC frames understood by the AON controller.
//! No I/O lives here.
//!
//! A frame is a 4-byte header followed by a service-specific payload,
//! always padded to the 28-byte transport frame:
//!
//! ```text
//! byte 0  version
//! byte 1  message size, in 32-bit words, header included
//! byte 2  service id (bits 5:0) | ack flag (bit 6) | message type (bit 7)
//! byte 3  function id
//! ```
//!
//! Header flags are assembled by OR into byte 2, so setters compose without
//! clobbering each other. Multi-byte payload fields are big-endian on the
//! wire.

use static_assertions::const_assert_eq;

// ============================================================================
// Frame Geometry
// ============================================================================

/// Protocol version spoken by the controller.
pub const RPC_VERSION: u8 = 2;
/// Frame length in bytes: header plus the low-power-management payload.
pub const FRAME_LEN: usize = 28;
/// Message-size field value: the controller counts 32-bit words.
pub const FRAME_WORDS: u8 = 7;

// The frame must exactly fill one mailbox transport frame.
const_assert_eq!(FRAME_LEN, FRAME_WORDS as usize * 4);
const_assert_eq!(FRAME_LEN, ember_mbox::th1520::FRAME_LEN);

const OFF_VERSION: usize = 0;
const OFF_SIZE: usize = 1;
const OFF_SVC: usize = 2;
const OFF_FUNC: usize = 3;

const SVC_ID_MASK: u8 = 0x3f;
const SVC_ACK_SHIFT: u8 = 6;
const SVC_MSG_TYPE_SHIFT: u8 = 7;

/// Payload offset of the 16-bit core id in a cpu-info frame.
pub const OFF_CPU_ID: usize = 4;
/// Payload offset of the 16-bit status field in a cpu-info frame.
pub const OFF_CPU_STATUS: usize = 6;
/// Reserved 32-bit words padding the cpu-info payload.
pub const CPU_INFO_RESERVED_WORDS: usize = 5;
/// Payload offset of the first reserved word.
pub const OFF_CPU_RESERVED: usize = 8;

// ============================================================================
// Identifiers
// ============================================================================

/// RPC service classes (6-bit ids).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Service {
    /// Power management
    Pm = 1,
    /// Miscellaneous controls
    Misc = 2,
    /// Adaptive voltage/frequency scaling
    Avfs = 3,
    /// System services
    Sys = 4,
    /// Watchdog
    Wdg = 5,
    /// Low-power management
    Lpm = 6,
}

/// Data frame or acknowledgment frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum MsgType {
    /// Request carrying data
    Data = 0,
    /// Acknowledgment
    Ack = 1,
}

/// Acknowledgment policy for a request.
///
/// The wire polarity is inverted: a set flag bit means *no* ack is needed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum AckMode {
    /// The controller must post an acknowledgment.
    Required = 0,
    /// Fire and forget.
    NotRequired = 1,
}

/// Functions of the low-power-management service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum LpmFunc {
    /// Request suspend-to-RAM
    RequireStr = 1,
    /// Resume from suspend-to-RAM
    ResumeStr = 2,
    /// Request standby
    RequireStd = 3,
    /// Core hotplug
    CpuHotplug = 4,
    /// Register-dump configuration
    RegdumpCfg = 5,
}

// ============================================================================
// Frame
// ============================================================================

/// One encoded RPC frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Frame {
    bytes: [u8; FRAME_LEN],
}

impl Frame {
    /// Start a zeroed frame.
    pub const fn new() -> Self {
        Self {
            bytes: [0; FRAME_LEN],
        }
    }

    /// Wire bytes of the frame.
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Rebuild a frame from wire bytes (decode side).
    pub fn from_bytes(bytes: [u8; FRAME_LEN]) -> Self {
        Self { bytes }
    }

    // ------------------------------------------------------------------------
    // Header
    // ------------------------------------------------------------------------

    /// Set the protocol version.
    pub fn set_version(&mut self, version: u8) {
        self.bytes[OFF_VERSION] = version;
    }

    /// Set the message size, in 32-bit words.
    pub fn set_size_words(&mut self, words: u8) {
        self.bytes[OFF_SIZE] = words;
    }

    /// OR the service id into the low six bits of the flags byte.
    pub fn set_service(&mut self, service: Service) {
        self.bytes[OFF_SVC] |= (service as u8) & SVC_ID_MASK;
    }

    /// OR the message-type flag into bit 7 of the flags byte.
    pub fn set_msg_type(&mut self, msg_type: MsgType) {
        self.bytes[OFF_SVC] |= (msg_type as u8) << SVC_MSG_TYPE_SHIFT;
    }

    /// OR the ack flag into bit 6 of the flags byte.
    pub fn set_ack_mode(&mut self, mode: AckMode) {
        self.bytes[OFF_SVC] |= (mode as u8) << SVC_ACK_SHIFT;
    }

    /// Set the function id.
    pub fn set_function(&mut self, function: u8) {
        self.bytes[OFF_FUNC] = function;
    }

    /// Protocol version.
    pub fn version(&self) -> u8 {
        self.bytes[OFF_VERSION]
    }

    /// Message size in 32-bit words.
    pub fn size_words(&self) -> u8 {
        self.bytes[OFF_SIZE]
    }

    /// Service id (six bits).
    pub fn service_id(&self) -> u8 {
        self.bytes[OFF_SVC] & SVC_ID_MASK
    }

    /// Message-type flag.
    pub fn msg_type(&self) -> u8 {
        (self.bytes[OFF_SVC] >> SVC_MSG_TYPE_SHIFT) & 1
    }

    /// Ack flag (wire polarity: 1 = no ack needed).
    pub fn ack_mode(&self) -> u8 {
        (self.bytes[OFF_SVC] >> SVC_ACK_SHIFT) & 1
    }

    /// Function id.
    pub fn function(&self) -> u8 {
        self.bytes[OFF_FUNC]
    }

    // ------------------------------------------------------------------------
    // Big-endian payload fields
    // ------------------------------------------------------------------------

    /// Pack a 16-bit field, most significant byte first.
    pub fn set_be16(&mut self, offset: usize, value: u16) {
        self.bytes[offset] = (value >> 8) as u8;
        self.bytes[offset + 1] = value as u8;
    }

    /// Unpack a big-endian 16-bit field.
    pub fn get_be16(&self, offset: usize) -> u16 {
        ((self.bytes[offset] as u16) << 8) | self.bytes[offset + 1] as u16
    }

    /// Pack a 32-bit field, most significant byte first.
    pub fn set_be32(&mut self, offset: usize, value: u32) {
        self.bytes[offset] = (value >> 24) as u8;
        self.bytes[offset + 1] = (value >> 16) as u8;
        self.bytes[offset + 2] = (value >> 8) as u8;
        self.bytes[offset + 3] = value as u8;
    }

    /// Unpack a big-endian 32-bit field.
    pub fn get_be32(&self, offset: usize) -> u32 {
        ((self.bytes[offset] as u32) << 24)
            | ((self.bytes[offset + 1] as u32) << 16)
            | ((self.bytes[offset + 2] as u32) << 8)
            | self.bytes[offset + 3] as u32
    }
}

impl Default for Frame {
    fn default() -> Self {
        Self::new()
    }
}

/// Build the common header of a low-power-management data frame.
pub fn lpm_frame(function: LpmFunc, ack: AckMode) -> Frame {
    let mut frame = Frame::new();
    frame.set_version(RPC_VERSION);
    frame.set_service(Service::Lpm);
    frame.set_msg_type(MsgType::Data);
    frame.set_ack_mode(ack);
    frame.set_function(function as u8);
    frame.set_size_words(FRAME_WORDS);
    frame
}
