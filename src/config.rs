//! Process-wide configuration knobs, settable at runtime.
//!
//! Tests that need a tiny page to exercise multi-page scans call
//! [`set_page_size`] and restore the default with [`reset_page_size`].
//! Values are stored as atomics rather than plain `const`s so they can be
//! overridden at runtime without `unsafe`.

use std::sync::atomic::{AtomicUsize, Ordering};

const DEFAULT_PAGE_SIZE: usize = 4096;
const DEFAULT_STRING_LEN: usize = 128;
const DEFAULT_IO_COST_PER_PAGE: usize = 1000;
const DEFAULT_NUM_HIST_BINS: usize = 100;
const DEFAULT_BUFFER_POOL_PAGES: usize = 50;

static PAGE_SIZE: AtomicUsize = AtomicUsize::new(DEFAULT_PAGE_SIZE);
static STRING_LEN: AtomicUsize = AtomicUsize::new(DEFAULT_STRING_LEN);
static IO_COST_PER_PAGE: AtomicUsize = AtomicUsize::new(DEFAULT_IO_COST_PER_PAGE);
static NUM_HIST_BINS: AtomicUsize = AtomicUsize::new(DEFAULT_NUM_HIST_BINS);
static BUFFER_POOL_DEFAULT_PAGES: AtomicUsize = AtomicUsize::new(DEFAULT_BUFFER_POOL_PAGES);

/// Bytes per on-disk page. Default 4096.
pub fn page_size() -> usize {
    PAGE_SIZE.load(Ordering::Relaxed)
}

/// Override the page size (tests only; affects every `HeapFile`/`HeapPage`
/// constructed afterwards).
pub fn set_page_size(bytes: usize) {
    PAGE_SIZE.store(bytes, Ordering::Relaxed);
}

/// Restore the default page size.
pub fn reset_page_size() {
    PAGE_SIZE.store(DEFAULT_PAGE_SIZE, Ordering::Relaxed);
}

/// Bytes reserved for a STRING field's payload (not counting the 4-byte
/// length prefix). Default 128.
pub fn string_len() -> usize {
    STRING_LEN.load(Ordering::Relaxed)
}

pub fn set_string_len(bytes: usize) {
    STRING_LEN.store(bytes, Ordering::Relaxed);
}

pub fn reset_string_len() {
    STRING_LEN.store(DEFAULT_STRING_LEN, Ordering::Relaxed);
}

/// Cost unit charged per page read, used by [`crate::table_stats::TableStats`].
pub fn io_cost_per_page() -> usize {
    IO_COST_PER_PAGE.load(Ordering::Relaxed)
}

pub fn set_io_cost_per_page(cost: usize) {
    IO_COST_PER_PAGE.store(cost, Ordering::Relaxed);
}

/// Number of buckets an [`crate::histogram::IntHistogram`] is built with
/// unless told otherwise. Must be at least 100.
pub fn num_hist_bins() -> usize {
    NUM_HIST_BINS.load(Ordering::Relaxed)
}

pub fn set_num_hist_bins(bins: usize) {
    NUM_HIST_BINS.store(bins.max(100), Ordering::Relaxed);
}

/// Default `BufferPool` capacity in pages.
pub fn buffer_pool_default_pages() -> usize {
    BUFFER_POOL_DEFAULT_PAGES.load(Ordering::Relaxed)
}

pub fn set_buffer_pool_default_pages(pages: usize) {
    BUFFER_POOL_DEFAULT_PAGES.store(pages, Ordering::Relaxed);
}
