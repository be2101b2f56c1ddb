use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

#[cfg(any(test, feature = "proptest-impl"))]
use proptest_derive::Arbitrary;

/// A parse error for one of the fixed-size hash newtypes in this module.
#[derive(thiserror::Error, Debug)]
#[error("expected {expected} hex bytes, got malformed input")]
pub struct HashParseError {
    expected: usize,
}

macro_rules! fixed_hash {
    ($name:ident, $len:expr, $doc:expr) => {
        #[doc = $doc]
        #[derive(Copy, Clone, Eq, PartialEq, Hash, Serialize, Deserialize)]
        #[cfg_attr(any(test, feature = "proptest-impl"), derive(Arbitrary))]
        pub struct $name(pub [u8; $len]);

        impl $name {
            /// The length in bytes of this hash's canonical encoding.
            pub const LEN: usize = $len;

            pub fn from_bytes(bytes: [u8; $len]) -> Self {
                $name(bytes)
            }

            pub fn as_bytes(&self) -> &[u8; $len] {
                &self.0
            }
        }

        impl AsRef<[u8]> for $name {
            fn as_ref(&self) -> &[u8] {
                &self.0[..]
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
                let mut reversed = self.0;
                reversed.reverse();
                f.write_str(&hex::encode(&reversed))
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
                let mut reversed = self.0;
                reversed.reverse();
                f.debug_tuple(stringify!($name))
                    .field(&hex::encode(&reversed))
                    .finish()
            }
        }

        impl FromStr for $name {
            type Err = HashParseError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let mut bytes = [0u8; $len];
                hex::decode_to_slice(s, &mut bytes[..]).map_err(|_| HashParseError { expected: $len })?;
                bytes.reverse();
                Ok($name(bytes))
            }
        }

        impl Default for $name {
            fn default() -> Self {
                $name([0u8; $len])
            }
        }
    };
}

fixed_hash!(
    TxHash,
    32,
    "The hash of a transaction's canonical serialized form, as computed by a `TxCodec`."
);
fixed_hash!(
    BlockHash,
    32,
    "The hash of a block header, identifying a block independently of its height."
);
fixed_hash!(
    ScriptHash,
    20,
    "A RIPEMD-160 script hash, the key under which `Script`s are stored."
);
