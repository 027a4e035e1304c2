//! # Arbor Crypto
//!
//! Hop-by-hop frame security for Arbor meshes.
//!
//! Every frame between two neighbors is sealed with AES-128-GCM under the
//! shared [`NetworkKey`]. The frame header (network id and lengths) is bound
//! as associated data. Forwarding nodes decrypt and re-encrypt; there is no
//! end-to-end protection across hops.
//!
//! ## Modules
//!
//! - [`key`]: The shared network key (zeroized on drop)
//! - [`aead`]: The [`AeadCipher`] seam and the AES-128-GCM implementation
//! - [`random`]: Nonce source
//! - [`codec`]: [`WireFrame`] layout and the [`FrameCodec`]
//!
//! ## Example
//!
//! ```rust,ignore
//! use arbor_core::{Address, Message};
//! use arbor_crypto::{FrameCodec, NetworkKey, WireFrame};
//!
//! let codec = FrameCodec::new(111, NetworkKey::generate());
//! let msg = Message::new(Address::new(&[1, 1])?, Address::root(), b"hi".to_vec());
//!
//! let bytes = codec.encode(&msg, 1)?.to_bytes();
//! let decoded = codec.decode(&WireFrame::from_bytes(&bytes)?)?;
//! assert_eq!(decoded.payload, msg.payload);
//! ```

pub mod aead;
pub mod codec;
pub mod error;
pub mod key;
pub mod random;

pub use aead::{AeadCipher, Aes128GcmCipher, IV_SIZE, TAG_SIZE};
pub use codec::{CIPHERTEXT_SIZE, FrameCodec, HEADER_SIZE, SEQUENCE_SIZE, WireFrame, max_payload};
pub use error::{CodecError, CodecResult, CryptoError, CryptoResult};
pub use key::{KEY_SIZE, NetworkKey};
pub use random::{OsRandom, RandomSource};
