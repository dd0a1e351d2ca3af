//! Hand-off of decoded frames from the streaming thread to the host.
//!
//! The runtime's streaming thread publishes every decoded frame as an
//! immutable snapshot through an atomically swapped pointer. Readers
//! on any other thread grab the latest snapshot (a reference-count bump, never
//! blocking the writer) and copy its bytes into a stable RGBA pixel store.
//!
//! A reader therefore sees either the complete previous frame or the complete
//! new one, never a mix: the bytes it copies belong to a single snapshot that
//! nobody mutates.

use std::ops::Deref;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use arc_swap::ArcSwapOption;
use parking_lot::{MappedMutexGuard, Mutex, MutexGuard};

use crate::source::FrameSize;

/// Byte source of a decoded frame.
///
/// Implemented for runtime buffer handles by the backend crate, and for plain
/// `Vec<u8>` frames.
pub trait FrameData: Send + Sync + 'static {
    /// Number of bytes the frame holds.
    fn byte_len(&self) -> usize;

    /// Copies up to `dst.len()` leading bytes into `dst`, returning how many
    /// were written.
    fn copy_to(&self, dst: &mut [u8]) -> usize;
}

impl FrameData for Vec<u8> {
    fn byte_len(&self) -> usize {
        self.len()
    }

    fn copy_to(&self, dst: &mut [u8]) -> usize {
        let n = dst.len().min(self.len());
        dst[..n].copy_from_slice(&self[..n]);
        n
    }
}

/// One decoded frame as delivered by the runtime.
struct FrameSnapshot<F> {
    data: F,
    size: FrameSize,
    /// Delivery counter, starting at 1 for the first frame.
    sequence: u64,
}

/// Read-only view of the RGBA pixel store, valid while held.
pub struct FrameView<'a> {
    pixels: MappedMutexGuard<'a, [u8]>,
    size: FrameSize,
    sequence: u64,
}

impl FrameView<'_> {
    pub fn size(&self) -> FrameSize {
        self.size
    }

    pub fn sequence(&self) -> u64 {
        self.sequence
    }
}

impl Deref for FrameView<'_> {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        &self.pixels
    }
}

fn pack(size: FrameSize) -> u64 {
    (u64::from(size.width) << 32) | u64::from(size.height)
}

fn unpack(packed: u64) -> FrameSize {
    FrameSize::new((packed >> 32) as u32, packed as u32)
}

/// Latest-frame holder shared by the delivery callback and the host.
pub struct FrameBuffer<F> {
    latest: ArcSwapOption<FrameSnapshot<F>>,
    /// Current video size, packed as `(width << 32) | height`
    size: AtomicU64,
    pixels: Mutex<Vec<u8>>,
    delivering: AtomicBool,
    sequence: AtomicU64,
}

impl<F: FrameData> FrameBuffer<F> {
    /// Creates an empty holder sized for `size` (may be zero).
    pub fn new(size: FrameSize) -> Self {
        Self {
            latest: ArcSwapOption::empty(),
            size: AtomicU64::new(pack(size)),
            pixels: Mutex::new(vec![0; size.rgba_len()]),
            delivering: AtomicBool::new(true),
            sequence: AtomicU64::new(0),
        }
    }

    /// Current video dimensions.
    pub fn size(&self) -> FrameSize {
        unpack(self.size.load(Ordering::Acquire))
    }

    /// Updates the dimensions and pixel store without a frame, e.g. after the
    /// sink reports negotiated caps.
    pub fn resize(&self, size: FrameSize) {
        let previous = unpack(self.size.swap(pack(size), Ordering::AcqRel));
        if previous != size {
            self.pixels.lock().resize(size.rgba_len(), 0);
            tracing::info!("Pixel buffer size: width = {}, height = {}", size.width, size.height);
        }
    }

    /// Publishes a decoded frame. Called on the runtime streaming thread.
    ///
    /// Returns `false` (dropping the frame) once delivery has been disabled.
    pub fn deliver(&self, data: F, size: FrameSize) -> bool {
        if !self.delivering.load(Ordering::Acquire) {
            return false;
        }
        if size != self.size() {
            self.resize(size);
        }
        let sequence = self.sequence.fetch_add(1, Ordering::AcqRel) + 1;
        self.latest.store(Some(Arc::new(FrameSnapshot {
            data,
            size,
            sequence,
        })));
        true
    }

    /// Copies the latest frame into the pixel store and returns a view of it.
    ///
    /// Returns `None` if no frame has been delivered yet.
    pub fn read(&self) -> Option<FrameView<'_>> {
        let snapshot = self.latest.load_full()?;
        let mut pixels = self.pixels.lock();
        let len = snapshot.size.rgba_len();
        if pixels.len() != len {
            pixels.resize(len, 0);
        }
        let available = snapshot.data.byte_len();
        if available < len {
            // Tail past the frame's bytes keeps the previous frame's pixels otherwise.
            pixels[available..].fill(0);
            tracing::trace!("Frame {} holds {available} of {len} bytes", snapshot.sequence);
        }
        snapshot.data.copy_to(&mut pixels);
        Some(FrameView {
            pixels: MutexGuard::map(pixels, |p| p.as_mut_slice()),
            size: snapshot.size,
            sequence: snapshot.sequence,
        })
    }

    /// Number of frames delivered so far.
    pub fn delivered(&self) -> u64 {
        self.sequence.load(Ordering::Acquire)
    }

    /// Stops accepting frames and releases the retained one.
    pub fn shutdown(&self) {
        self.delivering.store(false, Ordering::Release);
        self.latest.store(None);
    }

    pub fn is_delivering(&self) -> bool {
        self.delivering.load(Ordering::Acquire)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    fn solid(size: FrameSize, value: u8) -> Vec<u8> {
        vec![value; size.rgba_len()]
    }

    #[test]
    fn test_read_before_delivery() {
        let buffer = FrameBuffer::<Vec<u8>>::new(FrameSize::new(4, 4));
        assert!(buffer.read().is_none());
        assert_eq!(buffer.delivered(), 0);
    }

    #[test]
    fn test_deliver_then_read() {
        let size = FrameSize::new(2, 2);
        let buffer = FrameBuffer::new(size);
        assert!(buffer.deliver(solid(size, 7), size));

        let view = buffer.read().unwrap();
        assert_eq!(view.len(), 16);
        assert!(view.iter().all(|&b| b == 7));
        assert_eq!(view.sequence(), 1);
    }

    #[test]
    fn test_latest_frame_wins() {
        let size = FrameSize::new(2, 2);
        let buffer = FrameBuffer::new(size);
        buffer.deliver(solid(size, 1), size);
        buffer.deliver(solid(size, 2), size);
        buffer.deliver(solid(size, 3), size);

        let view = buffer.read().unwrap();
        assert!(view.iter().all(|&b| b == 3));
        assert_eq!(view.sequence(), 3);
    }

    #[test]
    fn test_resize_on_dimension_change() {
        let small = FrameSize::new(2, 2);
        let large = FrameSize::new(4, 3);
        let buffer = FrameBuffer::new(small);
        buffer.deliver(solid(small, 1), small);
        assert_eq!(buffer.read().unwrap().len(), small.rgba_len());

        buffer.deliver(solid(large, 9), large);
        assert_eq!(buffer.size(), large);
        let view = buffer.read().unwrap();
        assert_eq!(view.len(), large.rgba_len());
        assert_eq!(view.size(), large);
    }

    #[test]
    fn test_short_frame_is_zero_padded() {
        let size = FrameSize::new(2, 2);
        let buffer = FrameBuffer::new(size);
        buffer.deliver(vec![5; 8], size);
        let view = buffer.read().unwrap();
        assert_eq!(&view[..8], &[5; 8]);
        assert_eq!(view.len(), 16);
    }

    #[test]
    fn test_short_frame_clears_stale_tail() {
        let size = FrameSize::new(2, 2);
        let buffer = FrameBuffer::new(size);
        buffer.deliver(solid(size, 9), size);
        assert!(buffer.read().unwrap().iter().all(|&b| b == 9));

        buffer.deliver(vec![5; 8], size);
        let view = buffer.read().unwrap();
        assert_eq!(&view[..8], &[5; 8]);
        assert_eq!(&view[8..], &[0; 8]);
        assert_eq!(buffer.delivered(), 2);
    }

    #[test]
    fn test_shutdown_drops_frames() {
        let size = FrameSize::new(1, 1);
        let buffer = FrameBuffer::new(size);
        buffer.deliver(solid(size, 1), size);
        buffer.shutdown();
        assert!(buffer.read().is_none());
        assert!(!buffer.deliver(solid(size, 2), size));
        assert!(!buffer.is_delivering());
    }

    #[test]
    fn test_concurrent_reads_never_tear() {
        let size = FrameSize::new(64, 64);
        let buffer = Arc::new(FrameBuffer::new(size));

        let writer = {
            let buffer = Arc::clone(&buffer);
            thread::spawn(move || {
                for i in 0..500u32 {
                    let value = (i % 251) as u8;
                    buffer.deliver(solid(size, value), size);
                }
            })
        };

        let readers: Vec<_> = (0..4)
            .map(|_| {
                let buffer = Arc::clone(&buffer);
                thread::spawn(move || {
                    for _ in 0..500 {
                        if let Some(view) = buffer.read() {
                            let first = view[0];
                            assert!(view.iter().all(|&b| b == first), "torn frame");
                        }
                    }
                })
            })
            .collect();

        writer.join().unwrap();
        for reader in readers {
            reader.join().unwrap();
        }
        assert_eq!(buffer.delivered(), 500);
    }
}
