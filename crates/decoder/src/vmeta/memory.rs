//! Device-addressable (DMA) memory.
//!
//! The decode unit reads the bitstream and writes the picture through
//! physical addresses, so every buffer exchanged with it comes from a
//! [`DmaAllocator`] that hands out a host mapping plus a device address.
//! [`DmaBlock`] is the RAII owner: dropping it returns the memory to the
//! allocator it came from.
//!
//! [`HeapDma`] backs blocks with the host heap and uses the host address as
//! the device address. It is what the software engine and the tests run on,
//! and it keeps live-block accounting so leaks show up as non-zero counts.

use std::alloc::Layout;
use std::collections::BTreeMap;
use std::fmt;
use std::ptr::NonNull;
use std::sync::Arc;

use parking_lot::Mutex;
use thiserror::Error;
use tracing::debug;

use jhw_common::DecodeError;

/// CPU cache behaviour requested for a DMA block.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum CachePolicy {
    /// Cached mapping; the stream buffer is written by the CPU.
    Cached,
    /// Uncached mapping; the picture buffer is written by the device.
    Uncached,
}

/// DMA allocator errors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DmaError {
    #[error("DMA allocation failed: {size} bytes (align {align})")]
    AllocFailed { size: usize, align: usize },
}

impl From<DmaError> for DecodeError {
    fn from(err: DmaError) -> Self {
        match err {
            DmaError::AllocFailed { size, align } => DecodeError::AllocFailed { size, align },
        }
    }
}

/// A raw region handed out by a [`DmaAllocator`].
#[derive(Debug)]
pub struct DmaRegion {
    pub host: NonNull<u8>,
    pub device_addr: u64,
    pub size: usize,
    pub align: usize,
}

/// Source of device-addressable memory.
///
/// # Safety
/// A region returned by `alloc` must stay valid for reads and writes of
/// `size` bytes through `host` until it is passed to `free`, and must not
/// overlap any other live region.
pub unsafe trait DmaAllocator: Send + Sync + fmt::Debug {
    fn alloc(&self, size: usize, align: usize, policy: CachePolicy)
        -> Result<DmaRegion, DmaError>;

    /// # Safety
    /// `region` must come from `alloc` on this allocator and not be freed yet.
    unsafe fn free(&self, region: &DmaRegion);

    /// Host mapping of `len` bytes at `device_addr`, if that range lies inside
    /// one live region. Software engines use this to emulate DMA.
    fn host_view(&self, device_addr: u64, len: usize) -> Option<NonNull<u8>> {
        let _ = (device_addr, len);
        None
    }
}

/// RAII owner of one DMA region.
pub struct DmaBlock {
    region: DmaRegion,
    allocator: Arc<dyn DmaAllocator>,
}

// SAFETY: the block exclusively owns its region; the allocator is Send + Sync.
unsafe impl Send for DmaBlock {}

impl fmt::Debug for DmaBlock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DmaBlock")
            .field("device_addr", &format_args!("{:#x}", self.region.device_addr))
            .field("size", &self.region.size)
            .finish()
    }
}

impl DmaBlock {
    pub fn alloc(
        allocator: &Arc<dyn DmaAllocator>,
        size: usize,
        align: usize,
        policy: CachePolicy,
    ) -> Result<Self, DmaError> {
        let region = allocator.alloc(size, align, policy)?;
        debug!(
            size,
            align,
            ?policy,
            device_addr = region.device_addr,
            "Allocated DMA block"
        );
        Ok(Self {
            region,
            allocator: allocator.clone(),
        })
    }

    pub fn size(&self) -> usize {
        self.region.size
    }

    pub fn device_addr(&self) -> u64 {
        self.region.device_addr
    }

    pub fn as_slice(&self) -> &[u8] {
        // SAFETY: the allocator contract keeps `host` valid for `size` bytes
        // until `free`, which only happens in Drop.
        unsafe { std::slice::from_raw_parts(self.region.host.as_ptr(), self.region.size) }
    }

    pub fn as_mut_slice(&mut self) -> &mut [u8] {
        // SAFETY: as above, and `&mut self` guarantees exclusive host access.
        unsafe { std::slice::from_raw_parts_mut(self.region.host.as_ptr(), self.region.size) }
    }
}

impl Drop for DmaBlock {
    fn drop(&mut self) {
        debug!(
            size = self.region.size,
            device_addr = self.region.device_addr,
            "Freeing DMA block"
        );
        // SAFETY: the region came from this allocator and is freed exactly once.
        unsafe { self.allocator.free(&self.region) };
    }
}

// ---------------------------------------------------------------------------
// HeapDma
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
struct HeapState {
    /// Live regions keyed by address, value is the size.
    live: BTreeMap<u64, usize>,
    live_bytes: usize,
    total_allocs: u64,
    /// Upper bound on `live_bytes`, to simulate exhaustion.
    budget: Option<usize>,
}

/// Host-heap DMA allocator with identity device addresses.
#[derive(Debug, Default)]
pub struct HeapDma {
    state: Mutex<HeapState>,
}

impl HeapDma {
    pub fn new() -> Self {
        Self::default()
    }

    /// Shared handle, ready to pass wherever an `Arc<dyn DmaAllocator>` is expected.
    pub fn shared() -> Arc<Self> {
        Arc::new(Self::new())
    }

    /// Limit the total number of live bytes; `None` removes the limit.
    pub fn set_budget(&self, budget: Option<usize>) {
        self.state.lock().budget = budget;
    }

    pub fn live_blocks(&self) -> usize {
        self.state.lock().live.len()
    }

    pub fn live_bytes(&self) -> usize {
        self.state.lock().live_bytes
    }

    pub fn total_allocs(&self) -> u64 {
        self.state.lock().total_allocs
    }
}

// SAFETY: regions come from the global allocator with their own layout and are
// only released through `free`.
unsafe impl DmaAllocator for HeapDma {
    fn alloc(
        &self,
        size: usize,
        align: usize,
        _policy: CachePolicy,
    ) -> Result<DmaRegion, DmaError> {
        let failed = DmaError::AllocFailed { size, align };
        let mut state = self.state.lock();
        let over_budget = state.budget.is_some_and(|b| {
            state
                .live_bytes
                .checked_add(size)
                .map_or(true, |total| total > b)
        });
        if size == 0 || over_budget {
            return Err(failed);
        }
        let layout = Layout::from_size_align(size, align).map_err(|_| failed.clone())?;
        // SAFETY: layout has a non-zero size.
        let host = NonNull::new(unsafe { std::alloc::alloc_zeroed(layout) }).ok_or(failed)?;

        let device_addr = host.as_ptr() as u64;
        state.live.insert(device_addr, size);
        state.live_bytes += size;
        state.total_allocs += 1;
        Ok(DmaRegion {
            host,
            device_addr,
            size,
            align,
        })
    }

    unsafe fn free(&self, region: &DmaRegion) {
        let mut state = self.state.lock();
        if state.live.remove(&region.device_addr).is_some() {
            state.live_bytes -= region.size;
            // SAFETY: allocated in `alloc` with exactly this layout.
            std::alloc::dealloc(
                region.host.as_ptr(),
                Layout::from_size_align_unchecked(region.size, region.align),
            );
        }
    }

    fn host_view(&self, device_addr: u64, len: usize) -> Option<NonNull<u8>> {
        let state = self.state.lock();
        let (&base, &size) = state.live.range(..=device_addr).next_back()?;
        let end = device_addr.checked_add(len as u64)?;
        if end <= base + size as u64 {
            NonNull::new(device_addr as *mut u8)
        } else {
            None
        }
    }
}
