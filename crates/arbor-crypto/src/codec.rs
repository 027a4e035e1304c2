//! Secure frame codec
//!
//! Turns a [`Message`] into a fixed-size encrypted [`WireFrame`] and back.
//!
//! ## Frame layout
//!
//! ```text
//! offset  size  field
//!      0     1  net id
//!      1     1  lengths (dest len << 4 | src len)
//!      2     1  data len (bytes of ciphertext in use)
//!      3    12  iv
//!     15    16  tag
//!     31   219  ciphertext, zero past data len
//! ```
//!
//! The plaintext is `sequence (4, big-endian) | dest | src | payload`. The
//! three header bytes are bound to the ciphertext as associated data, so any
//! change to them fails authentication.

use arbor_core::{Address, FRAME_SIZE, Message};
use bytes::Bytes;
use tracing::{debug, trace};

use crate::aead::{AeadCipher, Aes128GcmCipher, IV_SIZE, TAG_SIZE};
use crate::error::{CodecError, CodecResult, CryptoError};
use crate::key::NetworkKey;
use crate::random::{OsRandom, RandomSource};

/// Header bytes before the iv (net id, lengths, data len)
pub const HEADER_SIZE: usize = 3;

/// Bytes available for ciphertext in one frame
pub const CIPHERTEXT_SIZE: usize = FRAME_SIZE - HEADER_SIZE - IV_SIZE - TAG_SIZE;

/// Size of the sequence number at the start of the plaintext
pub const SEQUENCE_SIZE: usize = 4;

const IV_OFFSET: usize = HEADER_SIZE;
const TAG_OFFSET: usize = IV_OFFSET + IV_SIZE;
const CIPHERTEXT_OFFSET: usize = TAG_OFFSET + TAG_SIZE;

/// Largest payload that fits in one frame for the given address lengths
///
/// Returns 0 when the addresses alone fill the frame.
pub fn max_payload(src_len: usize, dest_len: usize) -> usize {
    CIPHERTEXT_SIZE.saturating_sub(SEQUENCE_SIZE + src_len + dest_len)
}

/// One frame as it appears on the link
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WireFrame {
    pub net_id: u8,
    pub lengths: u8,
    pub data_len: u8,
    pub iv: [u8; IV_SIZE],
    pub tag: [u8; TAG_SIZE],
    pub ciphertext: [u8; CIPHERTEXT_SIZE],
}

impl WireFrame {
    /// Parse a frame, requiring exactly [`FRAME_SIZE`] bytes
    pub fn from_bytes(bytes: &[u8]) -> CodecResult<Self> {
        if bytes.len() != FRAME_SIZE {
            return Err(CodecError::FrameSize {
                expected: FRAME_SIZE,
                actual: bytes.len(),
            });
        }

        let mut iv = [0u8; IV_SIZE];
        iv.copy_from_slice(&bytes[IV_OFFSET..TAG_OFFSET]);
        let mut tag = [0u8; TAG_SIZE];
        tag.copy_from_slice(&bytes[TAG_OFFSET..CIPHERTEXT_OFFSET]);
        let mut ciphertext = [0u8; CIPHERTEXT_SIZE];
        ciphertext.copy_from_slice(&bytes[CIPHERTEXT_OFFSET..]);

        Ok(Self {
            net_id: bytes[0],
            lengths: bytes[1],
            data_len: bytes[2],
            iv,
            tag,
            ciphertext,
        })
    }

    /// Serialize to the on-the-wire byte layout
    pub fn to_bytes(&self) -> [u8; FRAME_SIZE] {
        let mut out = [0u8; FRAME_SIZE];
        out[0] = self.net_id;
        out[1] = self.lengths;
        out[2] = self.data_len;
        out[IV_OFFSET..TAG_OFFSET].copy_from_slice(&self.iv);
        out[TAG_OFFSET..CIPHERTEXT_OFFSET].copy_from_slice(&self.tag);
        out[CIPHERTEXT_OFFSET..].copy_from_slice(&self.ciphertext);
        out
    }

    /// Destination address length from the header
    pub fn dest_len(&self) -> usize {
        (self.lengths >> 4) as usize
    }

    /// Source address length from the header
    pub fn src_len(&self) -> usize {
        (self.lengths & 0x0F) as usize
    }

    /// Associated data bound to the ciphertext
    pub fn aad(&self) -> [u8; HEADER_SIZE] {
        [self.net_id, self.lengths, self.data_len]
    }
}

/// Encrypts messages into frames and authenticates frames into messages
///
/// Holds the network id and key for the node's lifetime.
pub struct FrameCodec<A = Aes128GcmCipher, R = OsRandom> {
    net_id: u8,
    key: NetworkKey,
    cipher: A,
    random: R,
}

impl FrameCodec {
    /// Create a codec using AES-128-GCM and the OS random source
    pub fn new(net_id: u8, key: NetworkKey) -> Self {
        Self::with_parts(net_id, key, Aes128GcmCipher, OsRandom)
    }
}

impl<A: AeadCipher, R: RandomSource> FrameCodec<A, R> {
    /// Create a codec with explicit primitives
    pub fn with_parts(net_id: u8, key: NetworkKey, cipher: A, random: R) -> Self {
        Self {
            net_id,
            key,
            cipher,
            random,
        }
    }

    /// Network id stamped on every frame
    pub fn net_id(&self) -> u8 {
        self.net_id
    }

    /// Encrypt `msg` into a frame carrying `sequence`
    ///
    /// A payload longer than [`max_payload`] allows is truncated to fit.
    /// A fresh random iv is drawn for every call.
    pub fn encode(&self, msg: &Message, sequence: u32) -> CodecResult<WireFrame> {
        let dest = msg.destination.components();
        let src = msg.source.components();
        let lengths = ((dest.len() as u8) << 4) | src.len() as u8;

        let capacity = max_payload(src.len(), dest.len());
        let payload = if msg.payload.len() > capacity {
            debug!(
                size = msg.payload.len(),
                capacity, "Truncating payload to frame capacity"
            );
            &msg.payload[..capacity]
        } else {
            &msg.payload[..]
        };

        let mut plaintext =
            Vec::with_capacity(SEQUENCE_SIZE + dest.len() + src.len() + payload.len());
        plaintext.extend_from_slice(&sequence.to_be_bytes());
        plaintext.extend_from_slice(dest);
        plaintext.extend_from_slice(src);
        plaintext.extend_from_slice(payload);
        let data_len = plaintext.len() as u8;

        let mut iv = [0u8; IV_SIZE];
        self.random.fill(&mut iv);

        let aad = [self.net_id, lengths, data_len];
        let (sealed, tag) = self.cipher.seal(&self.key, &iv, &aad, plaintext)?;
        if sealed.len() > CIPHERTEXT_SIZE {
            return Err(CryptoError::EncryptionFailed(format!(
                "ciphertext of {} bytes exceeds frame",
                sealed.len()
            ))
            .into());
        }

        let mut ciphertext = [0u8; CIPHERTEXT_SIZE];
        ciphertext[..sealed.len()].copy_from_slice(&sealed);

        trace!(
            dest = %msg.destination,
            src = %msg.source,
            sequence,
            data_len,
            "Encoded frame"
        );

        Ok(WireFrame {
            net_id: self.net_id,
            lengths,
            data_len,
            iv,
            tag,
            ciphertext,
        })
    }

    /// Authenticate and decrypt a frame
    ///
    /// Every rejection is reported as [`CodecError::AuthenticationFailed`];
    /// the reason is only visible in trace logs.
    pub fn decode(&self, frame: &WireFrame) -> CodecResult<Message> {
        if frame.net_id != self.net_id {
            return Err(reject("network id mismatch"));
        }

        let data_len = frame.data_len as usize;
        if !(SEQUENCE_SIZE..=CIPHERTEXT_SIZE).contains(&data_len) {
            return Err(reject("data length out of range"));
        }

        let dest_len = frame.dest_len();
        let src_len = frame.src_len();
        if SEQUENCE_SIZE + dest_len + src_len > data_len {
            return Err(reject("address lengths exceed data length"));
        }

        let plaintext = self
            .cipher
            .open(
                &self.key,
                &frame.iv,
                &frame.aad(),
                frame.ciphertext[..data_len].to_vec(),
                &frame.tag,
            )
            .map_err(|_| reject("tag mismatch"))?;

        if plaintext.len() != data_len {
            return Err(reject("plaintext length mismatch"));
        }

        let (seq_bytes, rest) = plaintext.split_at(SEQUENCE_SIZE);
        let (dest, rest) = rest.split_at(dest_len);
        let (src, payload) = rest.split_at(src_len);

        let mut sequence = [0u8; SEQUENCE_SIZE];
        sequence.copy_from_slice(seq_bytes);

        Ok(Message {
            destination: Address::truncated(dest),
            source: Address::truncated(src),
            payload: Bytes::copy_from_slice(payload),
            sequence: u32::from_be_bytes(sequence),
        })
    }
}

fn reject(reason: &'static str) -> CodecError {
    trace!(reason, "Rejected frame");
    CodecError::AuthenticationFailed
}
