use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

/// A thread-safe, reference-counted resource container with read-write locking.
///
/// `MtResource` provides synchronized access to a value of type `T` that can be shared
/// across threads. It uses an `Arc<RwLock<T>>` internally. The world keeps every chunk
/// in one of these: the main thread takes short write locks to edit blocks and install
/// meshes, while a terrain worker job only holds a clone to read the chunk's mesh
/// version and to route its result back.
///
/// # Type Parameters
/// - `T`: The type of the contained resource, must be `Send + Sync`
///
/// # Examples
///
/// ```
/// use voxel_world::core::MtResource;
///
/// let counter = MtResource::new(0);
/// let counter_clone = counter.clone();
///
/// let handle = std::thread::spawn(move || {
///     *counter_clone.get_mut() += 1;
/// });
///
/// handle.join().unwrap();
/// assert_eq!(*counter.get(), 1);
/// ```
///
/// # Lock Poisoning
/// A poisoned lock means a panic happened while a chunk was being written. The data
/// is still structurally valid (plain blocks and flags), so the guard is recovered
/// instead of propagating the poison.
pub struct MtResource<T: Send + Sync> {
    pub resource: Arc<RwLock<T>>,
}

impl<T: Send + Sync + 'static> MtResource<T> {
    /// Creates a new `MtResource` containing the given value.
    pub fn new(resource: T) -> Self {
        Self {
            resource: Arc::new(RwLock::new(resource)),
        }
    }

    /// Returns a read-only guard that allows reading the contained value.
    pub fn get(&self) -> RwLockReadGuard<'_, T> {
        self.resource
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Returns a mutable guard that allows modifying the contained value.
    pub fn get_mut(&self) -> RwLockWriteGuard<'_, T> {
        self.resource
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Returns `true` if both handles point at the same underlying value.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.resource, &other.resource)
    }

    /// Number of live handles to the underlying value.
    pub fn strong_count(&self) -> usize {
        Arc::strong_count(&self.resource)
    }
}

impl<T: Send + Sync> Clone for MtResource<T> {
    fn clone(&self) -> Self {
        Self {
            resource: self.resource.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clones_share_the_value() {
        let a = MtResource::new(vec![1, 2]);
        let b = a.clone();
        b.get_mut().push(3);
        assert_eq!(a.get().len(), 3);
        assert!(a.ptr_eq(&b));
        assert_eq!(a.strong_count(), 2);
    }

    #[test]
    fn distinct_resources_are_not_ptr_eq() {
        let a = MtResource::new(1);
        let b = MtResource::new(1);
        assert!(!a.ptr_eq(&b));
    }
}
