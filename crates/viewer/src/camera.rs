use std::cell::RefCell;
use std::rc::Rc;

use foundation::math::Vec3;
use runtime::tween::TweenTarget;
use tracing::warn;

/// Camera eye position and look-at target for one viewer session.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct CameraState {
    position: Vec3,
    target: Vec3,
}

impl CameraState {
    pub fn new(position: Vec3, target: Vec3) -> Self {
        Self { position, target }
    }

    pub fn position(&self) -> Vec3 {
        self.position
    }

    pub fn target(&self) -> Vec3 {
        self.target
    }

    /// Returns `false` (state unchanged) for non-finite input.
    pub fn set_position(&mut self, position: Vec3) -> bool {
        if !position.is_finite() {
            warn!("rejected non-finite camera position {position:?}");
            return false;
        }
        self.position = position;
        true
    }

    /// Returns `false` (state unchanged) for non-finite input.
    pub fn set_target(&mut self, target: Vec3) -> bool {
        if !target.is_finite() {
            warn!("rejected non-finite camera target {target:?}");
            return false;
        }
        self.target = target;
        true
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum CameraProperty {
    Position,
    Target,
}

/// Shared handle to the session's camera state.
///
/// Scroll tweens, preview tweens and the pre-frame hook all hold clones;
/// every write still goes through [`CameraState::set_position`] or
/// [`CameraState::set_target`].
#[derive(Debug, Clone)]
pub struct SharedCamera {
    inner: Rc<RefCell<CameraState>>,
}

impl SharedCamera {
    pub fn new(state: CameraState) -> Self {
        Self {
            inner: Rc::new(RefCell::new(state)),
        }
    }

    pub fn snapshot(&self) -> CameraState {
        *self.inner.borrow()
    }

    pub fn position(&self) -> Vec3 {
        self.inner.borrow().position()
    }

    pub fn target(&self) -> Vec3 {
        self.inner.borrow().target()
    }

    pub fn set_position(&self, position: Vec3) -> bool {
        self.inner.borrow_mut().set_position(position)
    }

    pub fn set_target(&self, target: Vec3) -> bool {
        self.inner.borrow_mut().set_target(target)
    }

    pub fn get(&self, property: CameraProperty) -> Vec3 {
        match property {
            CameraProperty::Position => self.position(),
            CameraProperty::Target => self.target(),
        }
    }

    pub fn set(&self, property: CameraProperty, value: Vec3) -> bool {
        match property {
            CameraProperty::Position => self.set_position(value),
            CameraProperty::Target => self.set_target(value),
        }
    }

    pub fn binding(&self, property: CameraProperty) -> CameraBinding {
        CameraBinding {
            camera: self.clone(),
            property,
        }
    }
}

/// One property of a [`SharedCamera`], usable as a tween target.
#[derive(Debug, Clone)]
pub struct CameraBinding {
    camera: SharedCamera,
    property: CameraProperty,
}

impl CameraBinding {
    pub fn property(&self) -> CameraProperty {
        self.property
    }
}

impl TweenTarget for CameraBinding {
    fn get(&self) -> Vec3 {
        self.camera.get(self.property)
    }

    fn set(&self, value: Vec3) {
        self.camera.set(self.property, value);
    }
}
