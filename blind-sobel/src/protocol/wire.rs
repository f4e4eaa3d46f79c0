//! JSON request and response bodies, and their validation into typed requests.

use crate::crypto::codec::{blob_from_string, blob_to_string};
use crate::crypto::{Encoding, KeyMaterial};
use crate::errors::EdgeError;
use crate::grid::{GridShape, PixelGrid};

use serde::{Deserialize, Serialize};

/// Value of `public_key` on plaintext requests.
pub const PUBLIC_KEY_PLACEHOLDER: &str = "notyet";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum WirePixels {
    Raw(Vec<i64>),
    Ciphertexts(Vec<String>),
}

impl WirePixels {
    fn len(&self) -> usize {
        match self {
            WirePixels::Raw(p) => p.len(),
            WirePixels::Ciphertexts(p) => p.len(),
        }
    }
}

/// The request object exactly as it travels.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WireRequest {
    pub encrypted: bool,
    pub size: usize,
    pub pixels: WirePixels,
    #[serde(default)]
    pub public_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub encoding: Option<Encoding>,
}

impl WireRequest {
    pub fn plain(grid: &PixelGrid) -> Self {
        Self {
            encrypted: false,
            size: grid.side(),
            pixels: WirePixels::Raw(grid.pixels().iter().map(|&p| p as i64).collect()),
            public_key: Some(PUBLIC_KEY_PLACEHOLDER.to_string()),
            context: None,
            encoding: None,
        }
    }

    /// Carries the context and public key only; the secret part of `keys` is
    /// never read here.
    pub fn encrypted(
        size: usize,
        encoding: Encoding,
        ciphertexts: Vec<String>,
        keys: &KeyMaterial,
    ) -> Self {
        Self {
            encrypted: true,
            size,
            pixels: WirePixels::Ciphertexts(ciphertexts),
            public_key: Some(blob_to_string(&keys.public_key)),
            context: Some(blob_to_string(&keys.context)),
            encoding: Some(encoding),
        }
    }

    pub fn from_json(body: &[u8]) -> Result<Self, EdgeError> {
        serde_json::from_slice(body)
            .map_err(|e| EdgeError::MalformedRequest(format!("Invalid request body: {}", e)))
    }
}

/// A request that passed boundary validation.
#[derive(Debug, Clone, PartialEq)]
pub enum EdgeRequest {
    Plain {
        size: usize,
        pixels: Vec<u8>,
    },
    Encrypted {
        size: usize,
        encoding: Encoding,
        pixels: Vec<String>,
        public_key: Vec<u8>,
        context: Vec<u8>,
    },
}

impl EdgeRequest {
    pub fn size(&self) -> usize {
        match self {
            EdgeRequest::Plain { size, .. } | EdgeRequest::Encrypted { size, .. } => *size,
        }
    }
}

fn decode_blob(field: &str, value: Option<String>) -> Result<Vec<u8>, EdgeError> {
    let value = value
        .filter(|v| v != PUBLIC_KEY_PLACEHOLDER)
        .ok_or_else(|| EdgeError::MalformedRequest(format!("Encrypted request without {}", field)))?;
    blob_from_string(&value)
        .map_err(|e| EdgeError::MalformedRequest(format!("Field {} does not decode: {}", field, e)))
}

impl TryFrom<WireRequest> for EdgeRequest {
    type Error = EdgeError;

    fn try_from(wire: WireRequest) -> Result<Self, Self::Error> {
        GridShape::new(wire.size)?.check_len(wire.pixels.len())?;

        if !wire.encrypted {
            let pixels = match wire.pixels {
                WirePixels::Raw(values) => values
                    .into_iter()
                    .map(|v| {
                        u8::try_from(v).map_err(|_| {
                            EdgeError::MalformedRequest(format!("Pixel value {} is not a byte", v))
                        })
                    })
                    .collect::<Result<Vec<u8>, _>>()?,
                WirePixels::Ciphertexts(_) => {
                    return Err(EdgeError::MalformedRequest(
                        "Plaintext request carries ciphertext pixels".to_string(),
                    ));
                }
            };
            return Ok(EdgeRequest::Plain {
                size: wire.size,
                pixels,
            });
        }

        let context = decode_blob("context", wire.context)?;
        let public_key = decode_blob("public_key", wire.public_key)?;
        let pixels = match wire.pixels {
            WirePixels::Ciphertexts(values) => values,
            WirePixels::Raw(values) if values.is_empty() => Vec::new(),
            WirePixels::Raw(_) => {
                return Err(EdgeError::MalformedRequest(
                    "Encrypted request carries raw pixels".to_string(),
                ));
            }
        };

        Ok(EdgeRequest::Encrypted {
            size: wire.size,
            encoding: wire.encoding.unwrap_or_default(),
            pixels,
            public_key,
            context,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlainResponse {
    pub pixels: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(json: &str) -> Result<EdgeRequest, EdgeError> {
        EdgeRequest::try_from(WireRequest::from_json(json.as_bytes())?)
    }

    #[test]
    fn test_plain_request() -> Result<(), EdgeError> {
        let request = parse(
            r#"{"encrypted": false, "size": 2, "pixels": [0, 1, 2, 255], "public_key": "notyet"}"#,
        )?;
        assert_eq!(
            request,
            EdgeRequest::Plain {
                size: 2,
                pixels: vec![0, 1, 2, 255]
            }
        );
        Ok(())
    }

    #[test]
    fn test_encrypted_request_defaults_to_fractional() -> Result<(), EdgeError> {
        let request = parse(
            r#"{"encrypted": true, "size": 1, "pixels": ["AAE="], "public_key": "AQI=", "context": "AwQ="}"#,
        )?;
        match request {
            EdgeRequest::Encrypted {
                encoding,
                public_key,
                context,
                ..
            } => {
                assert_eq!(encoding, Encoding::Fractional);
                assert_eq!(public_key, vec![1, 2]);
                assert_eq!(context, vec![3, 4]);
            }
            other => panic!("unexpected {:?}", other),
        }
        Ok(())
    }

    #[test]
    fn test_rejections() {
        let cases = [
            r#"{"encrypted": false, "pixels": [0]}"#,
            r#"{"encrypted": false, "size": 2, "pixels": [0, 1, 2]}"#,
            r#"{"encrypted": false, "size": 1, "pixels": [256]}"#,
            r#"{"encrypted": false, "size": 4294967296, "pixels": []}"#,
            r#"{"encrypted": false, "size": 1, "pixels": ["AAE="]}"#,
            r#"{"encrypted": true, "size": 1, "pixels": ["AAE="], "public_key": "AQI="}"#,
            r#"{"encrypted": true, "size": 1, "pixels": ["AAE="], "public_key": "notyet", "context": "AwQ="}"#,
            r#"{"encrypted": true, "size": 1, "pixels": ["AAE="], "public_key": "AQI=", "context": "%%"}"#,
            r#"{"encrypted": true, "size": 1, "pixels": [7], "public_key": "AQI=", "context": "AwQ="}"#,
        ];
        for json in cases {
            assert!(
                matches!(parse(json), Err(EdgeError::MalformedRequest(_))),
                "{} should be rejected",
                json
            );
        }
    }

    #[test]
    fn test_plain_wire_shape() -> Result<(), EdgeError> {
        let grid = PixelGrid::try_with(1, vec![9])?;
        let json = serde_json::to_value(WireRequest::plain(&grid))?;
        assert_eq!(
            json,
            serde_json::json!({"encrypted": false, "size": 1, "pixels": [9], "public_key": "notyet"})
        );
        Ok(())
    }
}
