//! Intrusive doubly linked list backing the recency order.
//!
//! Nodes are heap allocated and addressed by raw pointer so that the key index
//! can jump straight to a node without walking the list. The list owns every
//! node; pointers handed out by [`List::push_front`] stay valid until the node
//! is unlinked, popped, or the list is cleared or dropped.
//!
//! Two sentinel nodes bracket the live nodes so that linking and unlinking
//! never has to special-case the ends:
//!
//! ```text
//! head <-> n1 (most recent) <-> n2 <-> ... <-> nK (least recent) <-> tail
//! ```

use core::fmt;
use core::marker::PhantomData;
use core::mem::MaybeUninit;
use core::ptr;

/// A node in the list.
///
/// Sentinel nodes never carry a value, which is why the payload is
/// `MaybeUninit`.
pub(crate) struct Entry<T> {
    val: MaybeUninit<T>,
    prev: *mut Entry<T>,
    next: *mut Entry<T>,
}

impl<T> Entry<T> {
    fn boxed(val: T) -> *mut Entry<T> {
        Box::into_raw(Box::new(Entry {
            val: MaybeUninit::new(val),
            prev: ptr::null_mut(),
            next: ptr::null_mut(),
        }))
    }

    fn sentinel() -> *mut Entry<T> {
        Box::into_raw(Box::new(Entry {
            val: MaybeUninit::uninit(),
            prev: ptr::null_mut(),
            next: ptr::null_mut(),
        }))
    }

    /// Returns the payload.
    ///
    /// # Safety
    ///
    /// Must not be called on a sentinel node.
    pub(crate) unsafe fn value(&self) -> &T {
        // SAFETY: the caller guarantees this is a value-carrying node.
        unsafe { self.val.assume_init_ref() }
    }

    /// Returns the payload mutably.
    ///
    /// # Safety
    ///
    /// Must not be called on a sentinel node.
    pub(crate) unsafe fn value_mut(&mut self) -> &mut T {
        // SAFETY: the caller guarantees this is a value-carrying node.
        unsafe { self.val.assume_init_mut() }
    }
}

/// Doubly linked list ordered from most to least recently used.
pub(crate) struct List<T> {
    len: usize,
    head: *mut Entry<T>,
    tail: *mut Entry<T>,
}

impl<T> List<T> {
    /// Creates an empty list.
    pub(crate) fn new() -> Self {
        let head = Entry::sentinel();
        let tail = Entry::sentinel();
        // SAFETY: both sentinels were just allocated and are exclusively ours.
        unsafe {
            (*head).next = tail;
            (*tail).prev = head;
        }
        List { len: 0, head, tail }
    }

    #[inline]
    pub(crate) fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub(crate) fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Allocates a node for `val` and links it as the most recent entry.
    pub(crate) fn push_front(&mut self, val: T) -> *mut Entry<T> {
        let node = Entry::boxed(val);
        // SAFETY: node is freshly allocated and not linked anywhere.
        unsafe { self.link_front(node) };
        self.len += 1;
        node
    }

    /// Returns the least recently used node without unlinking it.
    pub(crate) fn back(&self) -> Option<*mut Entry<T>> {
        // SAFETY: tail is a live sentinel for the lifetime of the list.
        let last = unsafe { (*self.tail).prev };
        if last == self.head {
            None
        } else {
            Some(last)
        }
    }

    /// Unlinks the least recently used node and returns its payload.
    pub(crate) fn pop_back(&mut self) -> Option<T> {
        let last = self.back()?;
        // SAFETY: `back` only returns value-carrying nodes of this list.
        Some(unsafe { self.unlink(last) })
    }

    /// Unlinks `node`, frees it and returns its payload.
    ///
    /// # Safety
    ///
    /// `node` must be a value-carrying node currently linked into this list.
    pub(crate) unsafe fn unlink(&mut self, node: *mut Entry<T>) -> T {
        // SAFETY: the caller guarantees node belongs to this list, so its
        // neighbours are live and ownership of the allocation is ours.
        unsafe {
            self.detach(node);
            self.len -= 1;
            let entry = Box::from_raw(node);
            entry.val.assume_init()
        }
    }

    /// Moves `node` to the most recent position.
    ///
    /// # Safety
    ///
    /// `node` must be a value-carrying node currently linked into this list.
    pub(crate) unsafe fn move_to_front(&mut self, node: *mut Entry<T>) {
        // SAFETY: the caller guarantees node belongs to this list.
        unsafe {
            if (*self.head).next == node {
                return;
            }
            self.detach(node);
            self.link_front(node);
        }
    }

    /// Drops every node.
    pub(crate) fn clear(&mut self) {
        while self.pop_back().is_some() {}
    }

    /// Iterates payloads from most to least recently used.
    pub(crate) fn iter(&self) -> Iter<'_, T> {
        Iter {
            // SAFETY: head is a live sentinel for the lifetime of the list.
            cursor: unsafe { (*self.head).next },
            end: self.tail,
            _marker: PhantomData,
        }
    }

    unsafe fn detach(&mut self, node: *mut Entry<T>) {
        // SAFETY: node is linked, so prev and next are valid nodes.
        unsafe {
            (*(*node).prev).next = (*node).next;
            (*(*node).next).prev = (*node).prev;
        }
    }

    unsafe fn link_front(&mut self, node: *mut Entry<T>) {
        // SAFETY: head is a live sentinel and node is not linked.
        unsafe {
            (*node).prev = self.head;
            (*node).next = (*self.head).next;
            (*(*self.head).next).prev = node;
            (*self.head).next = node;
        }
    }
}

impl<T> Drop for List<T> {
    fn drop(&mut self) {
        self.clear();
        // SAFETY: the sentinels were allocated in `new` and are freed only here.
        unsafe {
            drop(Box::from_raw(self.head));
            drop(Box::from_raw(self.tail));
        }
    }
}

impl<T> fmt::Debug for List<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("List").field("len", &self.len).finish()
    }
}

/// Borrowing iterator over a [`List`], most recent first.
pub(crate) struct Iter<'a, T> {
    cursor: *mut Entry<T>,
    end: *mut Entry<T>,
    _marker: PhantomData<&'a T>,
}

impl<'a, T> Iterator for Iter<'a, T> {
    type Item = &'a T;

    fn next(&mut self) -> Option<&'a T> {
        if self.cursor == self.end {
            return None;
        }
        // SAFETY: every node between the sentinels carries a value and the
        // borrow on the list keeps it alive for 'a.
        unsafe {
            let node = self.cursor;
            self.cursor = (*node).next;
            Some((*node).value())
        }
    }
}
