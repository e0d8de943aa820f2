//! Shared working buffers for DOF groups and FE elements
//!
//! Every DOF group and FE element needs a tangent matrix and an unbalance
//! vector sized by its DOF count. Most objects in a mesh share a handful of
//! sizes, so the pool keeps one buffer pair per size and hands out cheap
//! handles to it. A buffer is only ever written through a [`Lease`]: an
//! exclusive borrow of the shared buffer, or a private allocation when the
//! shared one is already leased by a live consumer.

use std::cell::{RefCell, RefMut};
use std::collections::BTreeMap;
use std::ops::{Deref, DerefMut};
use std::rc::Rc;

use log::debug;

use crate::error::{FEAError, FEAResult};
use crate::math::{Mat, Vec as FEVec};

/// Exclusive access to a working buffer
#[derive(Debug)]
pub enum Lease<'a, T> {
    /// Borrow of the pool's shared buffer
    Shared(RefMut<'a, T>),
    /// Private buffer, used when the shared one is already leased
    Private(T),
}

impl<T> Lease<'_, T> {
    pub fn is_shared(&self) -> bool {
        matches!(self, Lease::Shared(_))
    }
}

impl<T: Clone> Lease<'_, T> {
    /// Copy the contents out, releasing the lease
    pub fn into_owned(self) -> T {
        match self {
            Lease::Shared(r) => r.clone(),
            Lease::Private(t) => t,
        }
    }
}

impl<T> Deref for Lease<'_, T> {
    type Target = T;

    fn deref(&self) -> &T {
        match self {
            Lease::Shared(r) => r,
            Lease::Private(t) => t,
        }
    }
}

impl<T> DerefMut for Lease<'_, T> {
    fn deref_mut(&mut self) -> &mut T {
        match self {
            Lease::Shared(r) => r,
            Lease::Private(t) => t,
        }
    }
}

fn try_zeros(rows: usize, cols: usize) -> FEAResult<Mat> {
    let len = rows.checked_mul(cols).ok_or_else(|| {
        FEAError::OutOfMemory(format!("buffer of {} x {} overflows", rows, cols))
    })?;
    let mut data: Vec<f64> = Vec::new();
    data.try_reserve_exact(len).map_err(|e| {
        FEAError::OutOfMemory(format!("cannot allocate {} x {} buffer: {}", rows, cols, e))
    })?;
    data.resize(len, 0.0);
    Ok(Mat::from_vec(rows, cols, data))
}

fn try_zeros_vec(len: usize) -> FEAResult<FEVec> {
    let mut data: Vec<f64> = Vec::new();
    data.try_reserve_exact(len).map_err(|e| {
        FEAError::OutOfMemory(format!("cannot allocate vector of {}: {}", len, e))
    })?;
    data.resize(len, 0.0);
    Ok(FEVec::from_vec(data))
}

/// Handle to the shared tangent/unbalance pair of one size
#[derive(Debug, Clone)]
pub struct UnbalAndTangent {
    size: usize,
    tangent: Rc<RefCell<Mat>>,
    unbalance: Rc<RefCell<FEVec>>,
}

impl UnbalAndTangent {
    fn allocate(size: usize) -> FEAResult<Self> {
        Ok(Self {
            size,
            tangent: Rc::new(RefCell::new(try_zeros(size, size)?)),
            unbalance: Rc::new(RefCell::new(try_zeros_vec(size)?)),
        })
    }

    /// Private pair that is never shared
    pub fn private(size: usize) -> FEAResult<Self> {
        Self::allocate(size)
    }

    pub fn size(&self) -> usize {
        self.size
    }

    /// Lease the `size x size` tangent
    pub fn tangent(&self) -> FEAResult<Lease<'_, Mat>> {
        match self.tangent.try_borrow_mut() {
            Ok(r) => Ok(Lease::Shared(r)),
            Err(_) => {
                debug!("tangent buffer of size {} busy, using a private copy", self.size);
                Ok(Lease::Private(try_zeros(self.size, self.size)?))
            }
        }
    }

    /// Lease the `size` unbalance vector
    pub fn unbalance(&self) -> FEAResult<Lease<'_, FEVec>> {
        match self.unbalance.try_borrow_mut() {
            Ok(r) => Ok(Lease::Shared(r)),
            Err(_) => {
                debug!("unbalance buffer of size {} busy, using a private copy", self.size);
                Ok(Lease::Private(try_zeros_vec(self.size)?))
            }
        }
    }

    /// True when both handles point at the same buffers
    pub fn shares_buffers_with(&self, other: &UnbalAndTangent) -> bool {
        Rc::ptr_eq(&self.tangent, &other.tangent) && Rc::ptr_eq(&self.unbalance, &other.unbalance)
    }
}

/// Size-indexed pool of shared buffers
#[derive(Debug, Default)]
pub struct UnbalAndTangentStorage {
    entries: BTreeMap<usize, UnbalAndTangent>,
}

impl UnbalAndTangentStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Handle to the buffers of `size`, growing the pool on first request
    pub fn alloc(&mut self, size: usize) -> FEAResult<UnbalAndTangent> {
        if let Some(entry) = self.entries.get(&size) {
            return Ok(entry.clone());
        }
        let entry = UnbalAndTangent::allocate(size)?;
        debug!("buffer pool grown with size {}", size);
        self.entries.insert(size, entry.clone());
        Ok(entry)
    }

    /// Shared tangent of `size`
    pub fn get_tangent(&mut self, size: usize) -> FEAResult<Rc<RefCell<Mat>>> {
        Ok(self.alloc(size)?.tangent)
    }

    /// Shared unbalance of `size`
    pub fn get_unbalance(&mut self, size: usize) -> FEAResult<Rc<RefCell<FEVec>>> {
        Ok(self.alloc(size)?.unbalance)
    }

    /// Number of distinct sizes held
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Release every pooled buffer. Outstanding handles keep their own copy alive.
    pub fn clear(&mut self) {
        self.entries.clear();
    }
}
