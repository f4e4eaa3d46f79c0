use crate::crypto::codec::ciphertext_to_string;
use crate::crypto::{Ciphertext, Encoding, HomomorphicCipher};
use crate::engine::GradientPair;
use crate::errors::EdgeError;
use crate::grid::GridShape;
use crate::kernel::{KernelOp, SOBEL_X_OPS, SOBEL_Y_OPS, fold_ops};
use crate::protocol::stream::{RECORD_SEPARATOR, format_record};
use crate::transform::{ChunkedTransform, run_chunk};

use rayon::prelude::*;

use std::collections::VecDeque;
use std::io::{self, Read};
use std::sync::Arc;

/// Sobel gradients over ciphertexts, using only homomorphic add, sub and neg.
///
/// Never decrypts and never computes a magnitude: the result is a pair of
/// ciphertexts per pixel, with the border set to one shared encryption of zero.
pub struct EncryptedGradientEngine<C: HomomorphicCipher> {
    cipher: Arc<C>,
    encoding: Encoding,
    transform: ChunkedTransform,
}

impl<C: HomomorphicCipher> Clone for EncryptedGradientEngine<C> {
    fn clone(&self) -> Self {
        Self {
            cipher: Arc::clone(&self.cipher),
            encoding: self.encoding,
            transform: self.transform.clone(),
        }
    }
}

impl<C: HomomorphicCipher> EncryptedGradientEngine<C> {
    pub fn new(cipher: C, encoding: Encoding, transform: ChunkedTransform) -> Self {
        Self {
            cipher: Arc::new(cipher),
            encoding,
            transform,
        }
    }

    pub fn encoding(&self) -> Encoding {
        self.encoding
    }

    pub fn cipher(&self) -> &C {
        &self.cipher
    }

    fn check_input(
        &self,
        ciphertexts: &[Ciphertext<C::Element>],
        shape: GridShape,
    ) -> Result<(), EdgeError> {
        shape.check_len(ciphertexts.len())?;
        if let Some(odd) = ciphertexts.iter().find(|ct| ct.encoding != self.encoding) {
            odd.expect_encoding(self.encoding)?;
        }
        Ok(())
    }

    /// Encryption of zero in the request's encoding, used for every border pixel.
    fn encrypted_zero(&self) -> Result<Ciphertext<C::Element>, EdgeError> {
        Ok(self.cipher.encrypt(self.encoding.encode_pixel(0))?)
    }

    fn apply(
        &self,
        ops: &[KernelOp],
        window: &[usize; 9],
        ciphertexts: &[Ciphertext<C::Element>],
        zero: &Ciphertext<C::Element>,
    ) -> Result<Ciphertext<C::Element>, EdgeError> {
        let cipher = self.cipher.as_ref();
        let folded = fold_ops(
            ops,
            |tap| ciphertexts[window[tap]].clone(),
            |a, b| cipher.add(a, b),
            |a, b| cipher.sub(a, b),
            |a| cipher.neg(a),
        )?;
        Ok(folded.unwrap_or_else(|| zero.clone()))
    }

    fn gradient_at(
        &self,
        ciphertexts: &[Ciphertext<C::Element>],
        shape: GridShape,
        zero: &Ciphertext<C::Element>,
        index: usize,
    ) -> Result<GradientPair<Ciphertext<C::Element>>, EdgeError> {
        if shape.is_border(index) {
            return Ok(GradientPair::new(zero.clone(), zero.clone()));
        }
        let window = shape.neighborhood(index);
        Ok(GradientPair::new(
            self.apply(&SOBEL_X_OPS, &window, ciphertexts, zero)?,
            self.apply(&SOBEL_Y_OPS, &window, ciphertexts, zero)?,
        ))
    }

    /// Encrypted `(Gx, Gy)` for every pixel, in index order.
    pub fn compute(
        &self,
        ciphertexts: &[Ciphertext<C::Element>],
        side: usize,
    ) -> Result<Vec<GradientPair<Ciphertext<C::Element>>>, EdgeError> {
        let shape = GridShape::new(side)?;
        self.check_input(ciphertexts, shape)?;
        let zero = self.encrypted_zero()?;

        let indices: Vec<usize> = (0..shape.len()).collect();
        self.transform
            .map(&indices, |&index| self.gradient_at(ciphertexts, shape, &zero, index))
    }

    /// Lazily computed, encoded gradient records, one chunk at a time.
    pub fn stream(
        &self,
        ciphertexts: Vec<Ciphertext<C::Element>>,
        side: usize,
    ) -> Result<GradientStream<C>, EdgeError> {
        let shape = GridShape::new(side)?;
        self.check_input(&ciphertexts, shape)?;
        let zero = self.encrypted_zero()?;

        Ok(GradientStream {
            engine: self.clone(),
            ciphertexts,
            shape,
            zero,
            next_index: 0,
            pending: VecDeque::new(),
            on_finish: None,
        })
    }
}

type FinishHook = Box<dyn FnOnce(usize) + Send + Sync>;

/// Encoded `"<gx> <gy>"` records in pixel order.
///
/// Each refill computes one chunk with its pixels in parallel, so the first
/// records are available long before the last ones are computed. After an error
/// the stream ends.
pub struct GradientStream<C: HomomorphicCipher> {
    engine: EncryptedGradientEngine<C>,
    ciphertexts: Vec<Ciphertext<C::Element>>,
    shape: GridShape,
    zero: Ciphertext<C::Element>,
    next_index: usize,
    pending: VecDeque<String>,
    on_finish: Option<FinishHook>,
}

impl<C: HomomorphicCipher> GradientStream<C> {
    /// Total number of records, emitted or not.
    pub fn record_count(&self) -> usize {
        self.shape.len()
    }

    /// Calls `hook` with the record count after the last record has been
    /// produced. A stream that fails never calls it.
    pub fn on_finish(mut self, hook: impl FnOnce(usize) + Send + Sync + 'static) -> Self {
        self.on_finish = Some(Box::new(hook));
        self
    }

    pub fn into_reader(self) -> GradientReader<C> {
        GradientReader {
            stream: self,
            line: Vec::new(),
            position: 0,
        }
    }

    fn compute_chunk(&self) -> Result<Vec<String>, EdgeError> {
        let transform = &self.engine.transform;
        let start = self.next_index;
        let end = (start + transform.chunk_size()).min(self.shape.len());
        let chunk = start / transform.chunk_size();

        run_chunk(chunk, || {
            transform.install(|| {
                (start..end)
                    .into_par_iter()
                    .map(|index| {
                        let pair = self.engine.gradient_at(
                            &self.ciphertexts,
                            self.shape,
                            &self.zero,
                            index,
                        )?;
                        let cipher = self.engine.cipher();
                        Ok(format_record(
                            &ciphertext_to_string(cipher, &pair.gx),
                            &ciphertext_to_string(cipher, &pair.gy),
                        ))
                    })
                    .collect::<Result<Vec<String>, EdgeError>>()
            })
        })
    }
}

impl<C: HomomorphicCipher> Iterator for GradientStream<C> {
    type Item = Result<String, EdgeError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.pending.is_empty() && self.next_index < self.shape.len() {
            match self.compute_chunk() {
                Ok(records) => {
                    self.next_index += records.len();
                    self.pending.extend(records);
                }
                Err(e) => {
                    self.next_index = self.shape.len();
                    self.on_finish = None;
                    return Some(Err(e));
                }
            }
        }

        let record = self.pending.pop_front();
        if record.is_none() {
            if let Some(hook) = self.on_finish.take() {
                hook(self.shape.len());
            }
        }
        record.map(Ok)
    }
}

/// Newline-terminated byte view of a [`GradientStream`].
pub struct GradientReader<C: HomomorphicCipher> {
    stream: GradientStream<C>,
    line: Vec<u8>,
    position: usize,
}

impl<C: HomomorphicCipher> Read for GradientReader<C> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if self.position == self.line.len() {
            match self.stream.next() {
                None => return Ok(0),
                Some(Err(e)) => {
                    log::error!("Gradient stream aborted: {}", e);
                    return Err(io::Error::other(e.to_string()));
                }
                Some(Ok(record)) => {
                    self.line = record.into_bytes();
                    self.line.push(RECORD_SEPARATOR);
                    self.position = 0;
                }
            }
        }

        let n = (self.line.len() - self.position).min(buf.len());
        buf[..n].copy_from_slice(&self.line[self.position..self.position + n]);
        self.position += n;
        Ok(n)
    }
}
