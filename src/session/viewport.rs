use std::cell::RefCell;
use std::rc::{Rc, Weak};
use std::sync::mpsc::{self, Receiver, Sender};

#[derive(Debug)]
struct ViewportInner {
    width: f32,
    listeners: Vec<(u64, Sender<f32>)>,
    next_id: u64,
}

/// The host window's size, shared between the host (which reports resizes)
/// and any number of listeners.
#[derive(Clone, Debug)]
pub struct Viewport {
    inner: Rc<RefCell<ViewportInner>>,
}

impl Viewport {
    pub fn new(width: f32) -> Self {
        Viewport {
            inner: Rc::new(RefCell::new(ViewportInner { width, listeners: Vec::new(), next_id: 0 })),
        }
    }

    pub fn width(&self) -> f32 {
        self.inner.borrow().width
    }

    pub fn resize(&self, width: f32) {
        let mut inner = self.inner.borrow_mut();
        inner.width = width;
        inner.listeners.retain(|(_, tx)| tx.send(width).is_ok());
    }

    /// Register a listener; it stays registered until the returned guard drops.
    pub fn listen(&self) -> ResizeListener {
        let (tx, rx) = mpsc::channel();
        let mut inner = self.inner.borrow_mut();
        let id = inner.next_id;
        inner.next_id += 1;
        inner.listeners.push((id, tx));
        ResizeListener { id, viewport: Rc::downgrade(&self.inner), rx }
    }

    pub fn listener_count(&self) -> usize {
        self.inner.borrow().listeners.len()
    }
}

#[derive(Debug)]
pub struct ResizeListener {
    id: u64,
    viewport: Weak<RefCell<ViewportInner>>,
    rx: Receiver<f32>,
}

impl ResizeListener {
    /// Most recent width reported since the last call, if any.
    pub fn latest(&self) -> Option<f32> {
        self.rx.try_iter().last()
    }
}

impl Drop for ResizeListener {
    fn drop(&mut self) {
        if let Some(inner) = self.viewport.upgrade() {
            inner.borrow_mut().listeners.retain(|(id, _)| *id != self.id);
        }
    }
}
