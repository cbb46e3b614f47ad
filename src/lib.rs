//! Physical page allocator based on the buddy algorithm.
//!
//! The allocator hands out contiguous, aligned blocks of `1 << order`
//! pages and reclaims them by merging freed blocks with their buddies,
//! so coalescing back into large blocks takes a logarithmic number of
//! steps. Page descriptor storage is provided by the surrounding
//! kernel; the allocator itself never touches the pages it manages,
//! only their descriptors, addressed by frame number.
//!
//! ```
//! use pgalloc::{BuddyAllocator, PageDescriptor, Pfn};
//!
//! let mut pages = [PageDescriptor::new(); 32];
//! let mut allocator = BuddyAllocator::new(Pfn::new(0), &mut pages);
//! allocator.init(Pfn::new(0), 32)?;
//!
//! let block = allocator.allocate(2)?;
//! allocator.free(block, 2)?;
//! # Ok::<(), pgalloc::Error>(())
//! ```

#![cfg_attr(not(test), no_std)]
#![deny(rust_2018_idioms)]

pub mod buddy;
pub mod free_list;
pub mod page;
pub mod pfn;

pub use buddy::{BuddyAllocator, DumpState};
pub use page::{PageArena, PageDescriptor};
pub use pfn::{Pfn, MAX_ORDER};

use core::fmt;
use displaydoc_lite::displaydoc;
use spin::Mutex;

/// Result for every page allocation operation.
pub type Result<T, E = Error> = core::result::Result<T, E>;

displaydoc! {
    /// Any error that can happen while registering, allocating,
    /// freeing or reserving physical pages.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub enum Error {
        /// tried to use an order that exceeds the maximum order.
        InvalidOrder,
        /// no free block at or above the requested order is left.
        OutOfMemory,
        /// the block start is not aligned to its order.
        MisalignedBlock,
        /// the page is not contained in any free block.
        NotFree,
        /// the block lies outside the descriptor arena.
        OutOfRange,
        /// tried to register an empty range of pages.
        RegionTooSmall,
        /// tried to register a range that exceeds the descriptor arena.
        InvalidRegion,
    }
}

/// The interface a page-allocation algorithm exposes to the kernel's
/// memory subsystem.
pub trait PageAllocator {
    /// Registers a contiguous range of currently-unowned pages and
    /// makes it available for allocation.
    fn init(&mut self, first: Pfn, count: usize) -> Result<usize>;

    /// Allocates a contiguous, aligned block of `1 << order` pages.
    fn allocate(&mut self, order: usize) -> Result<Pfn>;

    /// Returns a block previously obtained from
    /// [`allocate`](Self::allocate) with the same order.
    fn free(&mut self, pfn: Pfn, order: usize) -> Result<()>;

    /// Permanently withdraws a single, currently-free page from
    /// allocation.
    fn reserve(&mut self, pfn: Pfn) -> Result<()>;

    /// The friendly name of the algorithm, for diagnostics.
    fn name(&self) -> &'static str;
}

/// Statistics of a page allocator, denominated in pages.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AllocStats {
    /// The name of the allocator these stats belong to.
    pub name: &'static str,
    /// Pages handed to the allocator over all `init` calls.
    pub total: usize,
    /// Pages currently sitting in a free list.
    pub free: usize,
    /// Pages currently handed out to callers.
    pub allocated: usize,
    /// Pages permanently withdrawn through `reserve`.
    pub reserved: usize,
}

impl AllocStats {
    /// Create a new [`AllocStats`] instance for the given allocator name.
    pub const fn with_name(name: &'static str) -> Self {
        Self {
            name,
            total: 0,
            free: 0,
            allocated: 0,
            reserved: 0,
        }
    }
}

impl fmt::Display for AllocStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", self.name)?;
        self.name.chars().try_for_each(|_| write!(f, "~"))?;
        writeln!(f, "\nTotal pages:     0x{:x}", self.total)?;
        writeln!(f, "Free pages:      0x{:x}", self.free)?;
        writeln!(f, "Allocated pages: 0x{:x}", self.allocated)?;
        writeln!(f, "Reserved pages:  0x{:x}", self.reserved)?;
        self.name.chars().try_for_each(|_| write!(f, "~"))?;
        writeln!(f)?;
        Ok(())
    }
}

/// A [`BuddyAllocator`] behind a spin lock.
///
/// The core itself never locks; this wrapper supplies the single
/// mutual-exclusion domain that all mutating operations must share.
pub struct LockedAllocator<'pg>(Mutex<BuddyAllocator<'pg>>);

impl<'pg> LockedAllocator<'pg> {
    /// Put the given allocator behind a lock.
    pub fn new(allocator: BuddyAllocator<'pg>) -> Self {
        Self(Mutex::new(allocator))
    }

    /// Registers a contiguous range of currently-unowned pages.
    pub fn init(&self, first: Pfn, count: usize) -> Result<usize> {
        self.0.lock().init(first, count)
    }

    /// Allocates a contiguous, aligned block of `1 << order` pages.
    pub fn allocate(&self, order: usize) -> Result<Pfn> {
        self.0.lock().allocate(order)
    }

    /// Allocates the smallest block that holds at least `count`
    /// contiguous pages.
    pub fn allocate_pages(&self, count: usize) -> Result<Pfn> {
        self.0.lock().allocate_pages(count)
    }

    /// Returns a block previously obtained from
    /// [`allocate`](Self::allocate) with the same order.
    pub fn free(&self, pfn: Pfn, order: usize) -> Result<()> {
        self.0.lock().free(pfn, order)
    }

    /// Permanently withdraws a single, currently-free page from
    /// allocation.
    pub fn reserve(&self, pfn: Pfn) -> Result<()> {
        self.0.lock().reserve(pfn)
    }

    /// Return the statistics of the wrapped allocator.
    pub fn stats(&self) -> AllocStats {
        self.0.lock().stats()
    }

    /// Exclusive access to the wrapped allocator, for diagnostics like
    /// [`BuddyAllocator::dump_state`].
    pub fn lock(&self) -> spin::MutexGuard<'_, BuddyAllocator<'pg>> {
        self.0.lock()
    }
}
