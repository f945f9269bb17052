//! Dense row-major `f32` tensors of rank 2, 3 and 4.
//!
//! Layouts follow the usual CNN convention:
//! - [`Tensor2`]: `rows x cols` (an output map)
//! - [`Tensor3`]: `c x h x w` (an input, a single kernel, or stacked maps)
//! - [`Tensor4`]: `oc x c x kh x kw` (a kernel bank)

use std::ops::{Index, IndexMut};

use crate::error::{ConvError, Result};

fn check_len(what: &'static str, expected: usize, actual: usize) -> Result<()> {
    if expected == actual {
        Ok(())
    } else {
        Err(ConvError::DataLength {
            what,
            expected,
            actual,
        })
    }
}

/// A 2-D map, `rows x cols`.
#[derive(Debug, Clone, PartialEq)]
pub struct Tensor2 {
    rows: usize,
    cols: usize,
    data: Vec<f32>,
}

impl Tensor2 {
    #[must_use]
    pub fn zeros(rows: usize, cols: usize) -> Self {
        Self {
            rows,
            cols,
            data: vec![0.0; rows * cols],
        }
    }

    /// Wrap a row-major buffer.
    ///
    /// # Errors
    ///
    /// Returns [`ConvError::DataLength`] if `data.len() != rows * cols`.
    pub fn from_vec(rows: usize, cols: usize, data: Vec<f32>) -> Result<Self> {
        check_len("tensor2", rows * cols, data.len())?;
        Ok(Self { rows, cols, data })
    }

    #[must_use]
    pub fn shape(&self) -> [usize; 2] {
        [self.rows, self.cols]
    }

    #[must_use]
    pub fn as_slice(&self) -> &[f32] {
        &self.data
    }

    pub fn as_mut_slice(&mut self) -> &mut [f32] {
        &mut self.data
    }

    #[must_use]
    pub fn into_vec(self) -> Vec<f32> {
        self.data
    }

    /// One row of the map.
    #[must_use]
    pub fn row(&self, r: usize) -> &[f32] {
        &self.data[r * self.cols..(r + 1) * self.cols]
    }
}

impl Index<[usize; 2]> for Tensor2 {
    type Output = f32;

    fn index(&self, [r, c]: [usize; 2]) -> &f32 {
        assert!(r < self.rows && c < self.cols, "index [{r}, {c}] out of bounds");
        &self.data[r * self.cols + c]
    }
}

impl IndexMut<[usize; 2]> for Tensor2 {
    fn index_mut(&mut self, [r, c]: [usize; 2]) -> &mut f32 {
        assert!(r < self.rows && c < self.cols, "index [{r}, {c}] out of bounds");
        &mut self.data[r * self.cols + c]
    }
}

/// A 3-D tensor, `c x h x w`.
#[derive(Debug, Clone, PartialEq)]
pub struct Tensor3 {
    shape: [usize; 3],
    data: Vec<f32>,
}

impl Tensor3 {
    #[must_use]
    pub fn zeros(shape: [usize; 3]) -> Self {
        Self {
            shape,
            data: vec![0.0; shape.iter().product()],
        }
    }

    /// Wrap a row-major buffer.
    ///
    /// # Errors
    ///
    /// Returns [`ConvError::DataLength`] if the buffer does not hold exactly
    /// `c * h * w` elements.
    pub fn from_vec(shape: [usize; 3], data: Vec<f32>) -> Result<Self> {
        check_len("tensor3", shape.iter().product(), data.len())?;
        Ok(Self { shape, data })
    }

    /// Build a tensor by evaluating `f(c, h, w)` at every position.
    pub fn from_fn(shape: [usize; 3], mut f: impl FnMut(usize, usize, usize) -> f32) -> Self {
        let [c, h, w] = shape;
        let mut data = Vec::with_capacity(c * h * w);
        for ci in 0..c {
            for hi in 0..h {
                for wi in 0..w {
                    data.push(f(ci, hi, wi));
                }
            }
        }
        Self { shape, data }
    }

    /// Stack equally shaped maps along a new leading axis.
    ///
    /// `map_shape` is taken explicitly so an empty list still yields a
    /// `0 x rows x cols` tensor.
    ///
    /// # Errors
    ///
    /// Returns [`ConvError::DataLength`] if any map differs in shape from
    /// `map_shape`.
    pub fn stack(maps: Vec<Tensor2>, map_shape: [usize; 2]) -> Result<Self> {
        let [rows, cols] = map_shape;
        let mut data = Vec::with_capacity(maps.len() * rows * cols);
        for map in &maps {
            check_len("stacked map", rows * cols, map.data.len())?;
            if map.shape() != map_shape {
                return Err(ConvError::DataLength {
                    what: "stacked map rows",
                    expected: rows,
                    actual: map.rows,
                });
            }
            data.extend_from_slice(&map.data);
        }
        Ok(Self {
            shape: [maps.len(), rows, cols],
            data,
        })
    }

    #[must_use]
    pub fn shape(&self) -> [usize; 3] {
        self.shape
    }

    #[must_use]
    pub fn channels(&self) -> usize {
        self.shape[0]
    }

    #[must_use]
    pub fn as_slice(&self) -> &[f32] {
        &self.data
    }

    #[must_use]
    pub fn into_vec(self) -> Vec<f32> {
        self.data
    }

    /// The `h x w` plane of channel `c`, row-major.
    #[must_use]
    pub fn channel(&self, c: usize) -> &[f32] {
        let plane = self.shape[1] * self.shape[2];
        &self.data[c * plane..(c + 1) * plane]
    }

    /// Copy channel `c` out as a map.
    #[must_use]
    pub fn map(&self, c: usize) -> Tensor2 {
        Tensor2 {
            rows: self.shape[1],
            cols: self.shape[2],
            data: self.channel(c).to_vec(),
        }
    }
}

impl Index<[usize; 3]> for Tensor3 {
    type Output = f32;

    fn index(&self, [c, h, w]: [usize; 3]) -> &f32 {
        let [sc, sh, sw] = self.shape;
        assert!(c < sc && h < sh && w < sw, "index [{c}, {h}, {w}] out of bounds");
        &self.data[(c * sh + h) * sw + w]
    }
}

/// A kernel bank, `oc x c x kh x kw`.
#[derive(Debug, Clone, PartialEq)]
pub struct Tensor4 {
    shape: [usize; 4],
    data: Vec<f32>,
}

impl Tensor4 {
    #[must_use]
    pub fn zeros(shape: [usize; 4]) -> Self {
        Self {
            shape,
            data: vec![0.0; shape.iter().product()],
        }
    }

    /// Wrap a row-major buffer.
    ///
    /// # Errors
    ///
    /// Returns [`ConvError::DataLength`] on a length/shape disagreement.
    pub fn from_vec(shape: [usize; 4], data: Vec<f32>) -> Result<Self> {
        check_len("tensor4", shape.iter().product(), data.len())?;
        Ok(Self { shape, data })
    }

    /// Stack single kernels into a bank.
    ///
    /// # Errors
    ///
    /// Returns [`ConvError::DataLength`] if the kernels disagree in shape.
    pub fn from_kernels(kernels: &[Tensor3]) -> Result<Self> {
        let kernel_shape = kernels.first().map_or([0, 0, 0], Tensor3::shape);
        let mut data = Vec::with_capacity(kernels.len() * kernel_shape.iter().product::<usize>());
        for k in kernels {
            if k.shape != kernel_shape {
                return Err(ConvError::DataLength {
                    what: "bank kernel",
                    expected: kernel_shape.iter().product(),
                    actual: k.data.len(),
                });
            }
            data.extend_from_slice(&k.data);
        }
        let [c, kh, kw] = kernel_shape;
        Ok(Self {
            shape: [kernels.len(), c, kh, kw],
            data,
        })
    }

    #[must_use]
    pub fn shape(&self) -> [usize; 4] {
        self.shape
    }

    /// Number of kernels (output channels) in the bank.
    #[must_use]
    pub fn len(&self) -> usize {
        self.shape[0]
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.shape[0] == 0
    }

    /// Shape of each kernel in the bank.
    #[must_use]
    pub fn kernel_shape(&self) -> [usize; 3] {
        [self.shape[1], self.shape[2], self.shape[3]]
    }

    /// Flat view of kernel `n`.
    #[must_use]
    pub fn kernel_slice(&self, n: usize) -> &[f32] {
        let size = self.shape[1] * self.shape[2] * self.shape[3];
        &self.data[n * size..(n + 1) * size]
    }

    /// Copy kernel `n` out of the bank.
    #[must_use]
    pub fn kernel(&self, n: usize) -> Tensor3 {
        Tensor3 {
            shape: self.kernel_shape(),
            data: self.kernel_slice(n).to_vec(),
        }
    }

    #[must_use]
    pub fn as_slice(&self) -> &[f32] {
        &self.data
    }
}
