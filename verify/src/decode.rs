use std::io::Read;

use bodycheck_http_message::coding::ContentCoding;
use bytes::Bytes;
use flate2::read::GzDecoder;
use tracing::{debug, warn};

use crate::VerifiedBody;

/// A verified body with its content-coding reversed, where possible.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Content {
    /// The body had no content-coding.
    Identity(Bytes),
    /// The body was gzip-compressed; these are the decompressed bytes.
    Decoded(Bytes),
    /// The coding is not one we can reverse. The raw bytes are returned as
    /// they arrived.
    Passthrough { coding: ContentCoding, raw: Bytes },
}

impl Content {
    pub fn bytes(&self) -> &Bytes {
        match self {
            Self::Identity(b) | Self::Decoded(b) => b,
            Self::Passthrough { raw, .. } => raw,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    #[error("Body is not valid {coding} data: {source}")]
    Corrupt {
        coding: ContentCoding,
        source: std::io::Error,
    },
    #[error("Decoded body exceeds {limit} bytes")]
    TooLarge { limit: u64 },
}

impl VerifiedBody {
    /// Reverse `coding`, refusing to produce more than `max_decoded_length`
    /// bytes.
    pub fn decode(
        &self,
        coding: &ContentCoding,
        max_decoded_length: u64,
    ) -> Result<Content, DecodeError> {
        match coding {
            ContentCoding::Identity => Ok(Content::Identity(self.0.clone())),
            ContentCoding::Gzip => {
                let decoded = gunzip(&self.0, max_decoded_length).inspect_err(|e| {
                    warn!(error = %e, raw_len = self.0.len(), "could not decode body");
                })?;
                debug!(raw_len = self.0.len(), decoded_len = decoded.len(), "gzip body decoded");
                Ok(Content::Decoded(decoded))
            }
            ContentCoding::Unsupported(_) => {
                debug!(%coding, "passing through body with unsupported coding");
                Ok(Content::Passthrough {
                    coding: coding.clone(),
                    raw: self.0.clone(),
                })
            }
        }
    }
}

fn gunzip(raw: &[u8], limit: u64) -> Result<Bytes, DecodeError> {
    // one byte past the limit tells "exactly at" from "over"
    let mut decoder = GzDecoder::new(raw).take(limit.saturating_add(1));
    let mut decompressed = Vec::new();
    decoder
        .read_to_end(&mut decompressed)
        .map_err(|source| DecodeError::Corrupt {
            coding: ContentCoding::Gzip,
            source,
        })?;
    if decompressed.len() as u64 > limit {
        return Err(DecodeError::TooLarge { limit });
    }
    Ok(Bytes::from(decompressed))
}
