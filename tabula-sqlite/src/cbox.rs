use std::ops::{Deref, DerefMut};

/// Owner of a SQLite handle (`sqlite3`, `sqlite3_stmt`), released through `dealloc`
/// when dropped unless it is still null.
///
/// Derefs to the raw pointer so it can be handed to the FFI functions, `&mut *cbox`
/// being the out parameter of the opening ones.
#[derive(Debug)]
pub(crate) struct CBox<T> {
    pub(crate) ptr: *mut T,
    dealloc: fn(*mut T),
}

impl<T> CBox<T> {
    pub fn new(ptr: *mut T, dealloc: fn(*mut T)) -> Self {
        Self { ptr, dealloc }
    }
}

impl<T> Drop for CBox<T> {
    fn drop(&mut self) {
        if !self.ptr.is_null() {
            (self.dealloc)(self.ptr);
        }
    }
}

impl<T> Deref for CBox<T> {
    type Target = *mut T;

    fn deref(&self) -> &Self::Target {
        &self.ptr
    }
}

impl<T> DerefMut for CBox<T> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.ptr
    }
}

unsafe impl<T> Send for CBox<T> {}

#[cfg(test)]
mod tests {
    use crate::cbox::CBox;
    use std::{
        ptr,
        sync::atomic::{AtomicUsize, Ordering},
    };

    #[test]
    fn released_only_when_not_null() {
        static RELEASED: AtomicUsize = AtomicUsize::new(0);
        let mut v = 123;
        {
            let handle = CBox::new(ptr::null_mut::<i32>(), |_| {
                RELEASED.fetch_add(1, Ordering::Relaxed);
            });
            assert!(handle.is_null());
        }
        assert_eq!(RELEASED.load(Ordering::Relaxed), 0);
        {
            let mut handle = CBox::new(ptr::null_mut::<i32>(), |p| {
                assert_eq!(unsafe { *p }, 123);
                RELEASED.fetch_add(1, Ordering::Relaxed);
            });
            // Filled like an out parameter
            *handle = &mut v;
            assert_eq!(RELEASED.load(Ordering::Relaxed), 0);
        }
        assert_eq!(RELEASED.load(Ordering::Relaxed), 1);
    }
}
