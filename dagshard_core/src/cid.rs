//! Content identifiers for DAG nodes.
//!
//! A [`Cid`] is derived from the exact encoded bytes of a node plus the
//! codec and hash-function tags. Equal bytes with equal tags always give
//! equal identifiers.

use crate::multihash::{HashAlg, Multihash, MultihashError};
use minicbor::decode::{Decoder, Error as DecodeError};
use minicbor::encode::{Encoder, Error as EncodeError, Write};
use minicbor::{Decode, Encode};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

const CID_V1: u8 = 0x01;

#[derive(thiserror::Error, Debug, PartialEq, Eq)]
pub enum CidError {
    #[error("invalid multibase string: {0}")]
    Multibase(String),
    #[error("empty cid")]
    Empty,
    #[error("unsupported cid version {0:#x}")]
    UnsupportedVersion(u8),
    #[error("unknown codec {0:#x}")]
    UnknownCodec(u8),
    #[error("cid v0 requires sha2-256 and dag-cbor, got {0:?}/{1:?}")]
    InvalidV0(HashAlg, Codec),
    #[error(transparent)]
    Multihash(#[from] MultihashError),
}

#[derive(
    Clone, Copy, Debug, Default, Hash, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "kebab-case")]
pub enum CidVersion {
    V0,
    #[default]
    V1,
}

/// Encoding of the bytes a [`Cid`] points at.
#[repr(u8)]
#[derive(
    Clone, Copy, Debug, Default, Hash, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "kebab-case")]
pub enum Codec {
    /// Opaque bytes (file content). Never a DAG node.
    Raw = 0x55,
    /// A CBOR encoded [`crate::DagNode`].
    #[default]
    DagCbor = 0x71,
}

impl Codec {
    pub fn code(self) -> u8 {
        self as u8
    }

    pub fn from_code(code: u8) -> Result<Self, CidError> {
        match code {
            0x55 => Ok(Codec::Raw),
            0x71 => Ok(Codec::DagCbor),
            other => Err(CidError::UnknownCodec(other)),
        }
    }
}

/// Identifier of a DAG node or raw blob.
///
/// ```
/// use dagshard_core::{Cid, CidVersion, Codec, HashAlg};
///
/// let cid = Cid::new(CidVersion::V1, Codec::Raw, HashAlg::Blake3, b"hello").unwrap();
/// let parsed: Cid = cid.to_string().parse().unwrap();
/// assert_eq!(cid, parsed);
/// ```
#[derive(Clone, Copy, Hash, PartialEq, Eq, PartialOrd, Ord)]
pub struct Cid {
    version: CidVersion,
    codec: Codec,
    hash: Multihash,
}

impl fmt::Debug for Cid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Cid").field(&self.to_string()).finish()
    }
}

impl Cid {
    /// Derives the identifier of `bytes`.
    pub fn new(
        version: CidVersion,
        codec: Codec,
        alg: HashAlg,
        bytes: impl AsRef<[u8]>,
    ) -> Result<Self, CidError> {
        Self::from_parts(version, codec, alg.digest(bytes))
    }

    pub fn from_parts(version: CidVersion, codec: Codec, hash: Multihash) -> Result<Self, CidError> {
        if version == CidVersion::V0 && (hash.alg() != HashAlg::Sha2_256 || codec != Codec::DagCbor)
        {
            return Err(CidError::InvalidV0(hash.alg(), codec));
        }
        Ok(Self {
            version,
            codec,
            hash,
        })
    }

    pub fn version(&self) -> CidVersion {
        self.version
    }

    pub fn codec(&self) -> Codec {
        self.codec
    }

    pub fn hash(&self) -> &Multihash {
        &self.hash
    }

    /// Returns true when `bytes` hash to this identifier.
    pub fn verifies(&self, bytes: impl AsRef<[u8]>) -> bool {
        self.hash.alg().digest(bytes) == self.hash
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        match self.version {
            CidVersion::V0 => self.hash.to_bytes(),
            CidVersion::V1 => {
                let mut out = Vec::with_capacity(2 + Multihash::ENCODED_LEN);
                out.push(CID_V1);
                out.push(self.codec.code());
                out.extend_from_slice(&self.hash.to_bytes());
                out
            }
        }
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, CidError> {
        match bytes.first() {
            None => Err(CidError::Empty),
            Some(&CID_V1) => {
                let codec = Codec::from_code(*bytes.get(1).ok_or(CidError::Empty)?)?;
                let hash = Multihash::from_bytes(&bytes[2..])?;
                Self::from_parts(CidVersion::V1, codec, hash)
            }
            Some(&code) if code == HashAlg::Sha2_256.code() => {
                let hash = Multihash::from_bytes(bytes)?;
                Self::from_parts(CidVersion::V0, Codec::DagCbor, hash)
            }
            Some(&other) => Err(CidError::UnsupportedVersion(other)),
        }
    }

    /// Base32 lowercase for v1, bare base58btc for v0.
    pub fn to_base32(&self) -> String {
        multibase::encode(multibase::Base::Base32Lower, self.to_bytes())
    }

    /// Friendly short form (first 5 digest bytes as hex).
    pub fn fmt_short(&self) -> String {
        self.hash.fmt_short()
    }
}

impl fmt::Display for Cid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.version {
            CidVersion::V0 => {
                let encoded = multibase::encode(multibase::Base::Base58Btc, self.to_bytes());
                // v0 identifiers carry no multibase prefix
                f.write_str(&encoded[1..])
            }
            CidVersion::V1 => f.write_str(&self.to_base32()),
        }
    }
}

impl FromStr for Cid {
    type Err = CidError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bytes = if s.len() == 46 && s.starts_with("Qm") {
            multibase::decode(format!("z{s}"))
        } else {
            multibase::decode(s)
        }
        .map_err(|e| CidError::Multibase(e.to_string()))?
        .1;
        Self::from_bytes(&bytes)
    }
}

impl Serialize for Cid {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Cid {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

impl<C> Encode<C> for Cid {
    fn encode<W: Write>(&self, e: &mut Encoder<W>, _: &mut C) -> Result<(), EncodeError<W::Error>> {
        e.bytes(&self.to_bytes())?;
        Ok(())
    }
}

impl<'b, C> Decode<'b, C> for Cid {
    fn decode(d: &mut Decoder<'b>, _: &mut C) -> Result<Self, DecodeError> {
        let p = d.position();
        let bytes = d.bytes()?;
        Cid::from_bytes(bytes).map_err(|e| DecodeError::message(e.to_string()).at(p))
    }
}
