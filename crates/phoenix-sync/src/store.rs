use std::collections::HashSet;

use parking_lot::RwLock;

use crate::triangle::{Stride, Triangle};

/// Canonical ordered set of distinct triangles known to this client.
///
/// - insertion order is preserved
/// - no two entries are equal (bit-exact, see `Triangle`)
/// - grows monotonically; there is no removal
///
/// `merge_if_new` and `snapshot` are linearizable: both take the same lock, so
/// a snapshot observes a merge entirely or not at all, and two racing merges
/// of the same triangle cannot both succeed.
#[derive(Debug)]
pub struct TriangleStore {
    stride: Stride,
    inner: RwLock<Inner>,
}

#[derive(Debug, Default)]
struct Inner {
    ordered: Vec<Triangle>,
    index: HashSet<Triangle>,
}

impl TriangleStore {
    pub fn new(stride: Stride) -> Self {
        Self {
            stride,
            inner: RwLock::new(Inner::default()),
        }
    }

    /// Creates a store holding `local` as its first entry.
    pub fn seeded(stride: Stride, local: Triangle) -> Self {
        let store = Self::new(stride);
        store.merge_if_new(local);
        store
    }

    #[inline]
    pub fn stride(&self) -> Stride {
        self.stride
    }

    /// Appends `triangle` unless an equal one is already stored.
    ///
    /// Returns true exactly when the store grew. Triangles whose length does
    /// not fit the store's stride are refused.
    pub fn merge_if_new(&self, triangle: Triangle) -> bool {
        if !self.stride.accepts(triangle.len()) {
            log::warn!(
                "refusing triangle of {} values under stride {}",
                triangle.len(),
                self.stride.floats()
            );
            return false;
        }

        let mut inner = self.inner.write();
        if !inner.index.insert(triangle.clone()) {
            return false;
        }
        inner.ordered.push(triangle);
        true
    }

    /// Returns the current contents in insertion order.
    pub fn snapshot(&self) -> Vec<Triangle> {
        self.inner.read().ordered.clone()
    }

    pub fn contains(&self, triangle: &Triangle) -> bool {
        self.inner.read().index.contains(triangle)
    }

    pub fn len(&self) -> usize {
        self.inner.read().ordered.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Barrier;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn tri(seed: f32) -> Triangle {
        Triangle::new(vec![seed, 0.0, 0.0, 0.0, seed, 0.0], Stride::PositionColor).unwrap()
    }

    #[test]
    fn merge_appends_new_triangle() {
        let store = TriangleStore::new(Stride::PositionColor);
        assert!(store.merge_if_new(tri(0.1)));
        assert_eq!(store.snapshot(), vec![tri(0.1)]);
    }

    #[test]
    fn merge_of_present_triangle_is_rejected() {
        let store = TriangleStore::seeded(Stride::PositionColor, tri(0.1));
        assert!(!store.merge_if_new(tri(0.1)));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn snapshot_preserves_insertion_order() {
        let store = TriangleStore::new(Stride::PositionColor);
        for s in [0.3, 0.1, 0.2, 0.1, 0.3] {
            store.merge_if_new(tri(s));
        }
        assert_eq!(store.snapshot(), vec![tri(0.3), tri(0.1), tri(0.2)]);
    }

    #[test]
    fn length_grows_by_one_per_successful_merge() {
        let store = TriangleStore::new(Stride::PositionColor);
        let mut last = store.len();
        for s in [0.1, 0.1, 0.2, 0.3, 0.2, 0.4] {
            let grew = store.merge_if_new(tri(s));
            let len = store.len();
            assert_eq!(len, last + usize::from(grew));
            last = len;
        }
        assert_eq!(last, 4);
    }

    #[test]
    fn refuses_triangle_of_foreign_stride() {
        let store = TriangleStore::new(Stride::PositionColor);
        let t = Triangle::new(vec![0.0; 9], Stride::Position).unwrap();
        assert!(!store.merge_if_new(t));
        assert!(store.is_empty());
    }

    #[test]
    fn racing_duplicates_are_accepted_once() {
        const THREADS: usize = 8;

        let store = TriangleStore::new(Stride::PositionColor);
        let barrier = Barrier::new(THREADS);
        let accepted = AtomicUsize::new(0);

        std::thread::scope(|s| {
            for _ in 0..THREADS {
                s.spawn(|| {
                    barrier.wait();
                    if store.merge_if_new(tri(0.5)) {
                        accepted.fetch_add(1, Ordering::SeqCst);
                    }
                });
            }
        });

        assert_eq!(accepted.load(Ordering::SeqCst), 1);
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn snapshots_never_observe_torn_state() {
        let store = TriangleStore::new(Stride::PositionColor);

        std::thread::scope(|s| {
            s.spawn(|| {
                for i in 0..500 {
                    store.merge_if_new(tri(i as f32 / 1000.0));
                }
            });
            s.spawn(|| {
                let mut last = 0;
                for _ in 0..500 {
                    let snap = store.snapshot();
                    assert!(snap.len() >= last);
                    // Prefix property: entries are never reordered or replaced.
                    for (i, t) in snap.iter().enumerate() {
                        assert_eq!(*t, tri(i as f32 / 1000.0));
                    }
                    last = snap.len();
                }
            });
        });

        assert_eq!(store.len(), 500);
    }
}
