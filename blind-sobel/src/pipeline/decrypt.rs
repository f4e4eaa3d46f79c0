use crate::crypto::codec::ciphertext_from_string;
use crate::crypto::{Encoding, KeyMaterial, PlaintextValue, SecretCipher};
use crate::engine::{fractional_magnitude, integer_magnitude};
use crate::errors::EdgeError;
use crate::protocol::stream::parse_record;
use crate::transform::{ChunkedTransform, run_chunk};

use rayon::prelude::*;

use std::io::BufRead;
use std::marker::PhantomData;

/// Decrypts gradient records and finalizes them into edge magnitudes.
pub struct DecryptionPipeline<S: SecretCipher> {
    transform: ChunkedTransform,
    encoding: Encoding,
    _cipher: PhantomData<fn() -> S>,
}

impl<S: SecretCipher> DecryptionPipeline<S> {
    pub fn new(transform: ChunkedTransform, encoding: Encoding) -> Self {
        Self {
            transform,
            encoding,
            _cipher: PhantomData,
        }
    }

    /// Decrypts a fully received set of records, in order.
    pub fn decrypt_records<R>(&self, records: &[R], keys: &KeyMaterial) -> Result<Vec<u8>, EdgeError>
    where
        R: AsRef<str> + Sync,
    {
        self.transform.map_with(
            records,
            keys,
            |keys| Ok(S::restore_secret(keys)?),
            |secret, record| finalize_record(secret, record.as_ref(), self.encoding),
        )
    }

    /// Reads newline-delimited records and decrypts each full batch as soon as it
    /// has arrived. Fails unless exactly `expected` records are received.
    pub fn consume(
        &self,
        reader: impl BufRead,
        expected: usize,
        keys: &KeyMaterial,
    ) -> Result<Vec<u8>, EdgeError> {
        let batch_size = self.transform.chunk_size();
        let mut pixels = Vec::with_capacity(expected);
        let mut batch: Vec<String> = Vec::with_capacity(batch_size);
        let mut received = 0usize;

        for line in reader.lines() {
            let line = line.map_err(|e| EdgeError::Transport(format!("Stream interrupted: {}", e)))?;
            received += 1;
            if received > expected {
                return Err(EdgeError::MalformedResponse(format!(
                    "Received more than the expected {} records",
                    expected
                )));
            }

            batch.push(line);
            if batch.len() == batch_size {
                pixels.extend(self.decrypt_batch(&batch, received / batch_size - 1, keys)?);
                batch.clear();
            }
        }

        if !batch.is_empty() {
            pixels.extend(self.decrypt_batch(&batch, received / batch_size, keys)?);
        }

        if received != expected {
            return Err(EdgeError::MalformedResponse(format!(
                "Expected {} records, received {}",
                expected, received
            )));
        }
        Ok(pixels)
    }

    fn decrypt_batch(
        &self,
        batch: &[String],
        index: usize,
        keys: &KeyMaterial,
    ) -> Result<Vec<u8>, EdgeError> {
        log::trace!("decrypting batch {} of {} records", index, batch.len());
        run_chunk(index, || {
            let secret = S::restore_secret(keys)?;
            self.transform.install(|| {
                batch
                    .par_iter()
                    .map(|record| finalize_record(&secret, record, self.encoding))
                    .collect::<Result<Vec<u8>, EdgeError>>()
            })
        })
    }
}

/// Parses, decrypts and finalizes one `"<gx> <gy>"` record.
fn finalize_record<S: SecretCipher>(
    secret: &S,
    record: &str,
    encoding: Encoding,
) -> Result<u8, EdgeError> {
    let (gx, gy) = parse_record(record)?;
    let gx = ciphertext_from_string(secret.public(), gx, encoding)?;
    let gy = ciphertext_from_string(secret.public(), gy, encoding)?;

    let magnitude = match (secret.decrypt(&gx, encoding)?, secret.decrypt(&gy, encoding)?) {
        (PlaintextValue::Integer(gx), PlaintextValue::Integer(gy)) => integer_magnitude(gx, gy),
        (gx, gy) => fractional_magnitude(gx.as_f64(), gy.as_f64()),
    };
    Ok(magnitude)
}
