use std::{
    cell::{Ref, RefCell, RefMut},
    rc::Rc,
};

/// A single-threaded container for main-thread-only systems.
///
/// `StSystem` provides shared access to a system of type `T` in a single-threaded
/// context. The world and the renderer share the buffer registry through one of
/// these; it is `!Send`, so GPU-facing state can never reach the terrain
/// worker. The container uses `Rc<RefCell<Box<T>>>` internally.
///
/// # Examples
///
/// ```rust
/// use voxel_world::core::StSystem;
///
/// let system = StSystem::new(Box::new(42u32));
/// *system.get_mut() = Box::new(100u32);
/// assert_eq!(**system.get(), 100);
/// ```
///
/// # Panics
/// - Panics if a borrow is held while trying to mutably borrow
/// - Panics if a mutable borrow is held while trying to borrow
pub struct StSystem<T: ?Sized> {
    pub system: Rc<RefCell<Box<T>>>,
}

impl<T: ?Sized> StSystem<T> {
    /// Creates a new `StSystem` containing the given boxed system.
    pub fn new(system: Box<T>) -> Self {
        Self {
            system: Rc::new(RefCell::new(system)),
        }
    }

    /// Returns an immutable reference to the contained system.
    pub fn get(&self) -> Ref<'_, Box<T>> {
        self.system.borrow()
    }

    /// Returns a mutable reference to the contained system.
    pub fn get_mut(&self) -> RefMut<'_, Box<T>> {
        self.system.borrow_mut()
    }
}

impl<T: ?Sized> Clone for StSystem<T> {
    fn clone(&self) -> Self {
        Self {
            system: self.system.clone(),
        }
    }
}
