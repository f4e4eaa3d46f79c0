//! The fixed Sobel kernels and their add/subtract unrolling.
//!
//! Kernel taps follow [`GridShape::neighborhood`](crate::grid::GridShape::neighborhood)
//! order. A coefficient `c` becomes `|c|` repeated additions (or subtractions) of
//! the tap, so a cipher only needs add, sub and neg to evaluate it.

use lazy_static::lazy_static;

pub const SOBEL_X: [i64; 9] = [-1, 0, 1, -2, 0, 2, -1, 0, 1];
pub const SOBEL_Y: [i64; 9] = [-1, -2, -1, 0, 0, 0, 1, 2, 1];

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum KernelOp {
    Add(usize),
    Sub(usize),
}

lazy_static! {
    pub static ref SOBEL_X_OPS: Vec<KernelOp> = unroll(&SOBEL_X);
    pub static ref SOBEL_Y_OPS: Vec<KernelOp> = unroll(&SOBEL_Y);
}

/// Expands a kernel into one operation per unit of coefficient magnitude.
pub fn unroll(kernel: &[i64; 9]) -> Vec<KernelOp> {
    kernel
        .iter()
        .enumerate()
        .flat_map(|(tap, &coefficient)| {
            let op = if coefficient < 0 {
                KernelOp::Sub(tap)
            } else {
                KernelOp::Add(tap)
            };
            std::iter::repeat_n(op, coefficient.unsigned_abs() as usize)
        })
        .collect()
}

/// Weighted sum of the nine taps.
pub fn weighted_sum(kernel: &[i64; 9], taps: &[i64; 9]) -> i64 {
    kernel.iter().zip(taps).map(|(k, t)| k * t).sum()
}

/// Evaluates an unrolled kernel with caller-supplied arithmetic.
///
/// A leading `Sub` seeds the accumulator with `neg(tap)`. Returns `None` for an
/// empty operation list.
pub fn fold_ops<T, E>(
    ops: &[KernelOp],
    tap: impl Fn(usize) -> T,
    add: impl Fn(&T, &T) -> Result<T, E>,
    sub: impl Fn(&T, &T) -> Result<T, E>,
    neg: impl Fn(&T) -> Result<T, E>,
) -> Result<Option<T>, E> {
    let mut acc: Option<T> = None;
    for op in ops {
        acc = Some(match (acc, *op) {
            (None, KernelOp::Add(i)) => tap(i),
            (None, KernelOp::Sub(i)) => neg(&tap(i))?,
            (Some(a), KernelOp::Add(i)) => add(&a, &tap(i))?,
            (Some(a), KernelOp::Sub(i)) => sub(&a, &tap(i))?,
        });
    }
    Ok(acc)
}
