//! Floating contextual menu: a single global instance with placement rules.
//!
//! Only one menu can be open at a time. Invoking the trigger that owns the
//! open menu closes it; invoking any other trigger moves the menu there.
//!
//! Placement, in viewport coordinates (origin top-left):
//!
//! 1. Below the anchor, right edge aligned with the anchor's right edge.
//! 2. If the bottom would overflow the viewport, flip above the anchor.
//! 3. If the right edge would overflow, shift left until it fits.
//! 4. Never start left of the viewport's left edge.

use serde::Serialize;

/// Gap between the anchor and the menu.
pub const MENU_GAP: i32 = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Rect {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl Rect {
    pub fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn right(&self) -> i32 {
        self.x + self.width
    }

    pub fn bottom(&self) -> i32 {
        self.y + self.height
    }

    pub fn contains(&self, x: i32, y: i32) -> bool {
        x >= self.x && x < self.right() && y >= self.y && y < self.bottom()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Size {
    pub width: i32,
    pub height: i32,
}

/// Which side of the anchor the menu ended up on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Placement {
    Below,
    Above,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpenMenu {
    /// Identity of the trigger (e.g. the document source it belongs to).
    pub trigger: String,
    pub anchor: Rect,
    pub bounds: Rect,
    pub placement: Placement,
}

/// What a [`MenuController::toggle`] call did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MenuEvent {
    Opened,
    /// Replaced a menu that belonged to another trigger.
    Moved { from: String },
    Closed,
}

/// Compute the menu bounds for `anchor` inside `viewport`.
pub fn place(anchor: Rect, size: Size, viewport: Size) -> (Rect, Placement) {
    let mut x = anchor.right() - size.width;
    if x + size.width > viewport.width {
        x = viewport.width - size.width;
    }
    x = x.max(0);

    let below = anchor.bottom() + MENU_GAP;
    let (y, placement) = if below + size.height > viewport.height {
        ((anchor.y - MENU_GAP - size.height).max(0), Placement::Above)
    } else {
        (below, Placement::Below)
    };

    (Rect::new(x, y, size.width, size.height), placement)
}

/// Holder of the single open menu.
#[derive(Debug, Default)]
pub struct MenuController {
    open: Option<OpenMenu>,
    size: Option<Size>,
}

impl MenuController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn open_menu(&self) -> Option<&OpenMenu> {
        self.open.as_ref()
    }

    pub fn is_open(&self) -> bool {
        self.open.is_some()
    }

    /// Open, move or close the menu for `trigger`.
    pub fn toggle(
        &mut self,
        trigger: &str,
        anchor: Rect,
        size: Size,
        viewport: Size,
    ) -> MenuEvent {
        let previous = self.open.take();
        if let Some(prev) = &previous {
            if prev.trigger == trigger {
                self.size = None;
                return MenuEvent::Closed;
            }
        }

        let (bounds, placement) = place(anchor, size, viewport);
        self.open = Some(OpenMenu {
            trigger: trigger.to_string(),
            anchor,
            bounds,
            placement,
        });
        self.size = Some(size);

        match previous {
            Some(prev) => MenuEvent::Moved { from: prev.trigger },
            None => MenuEvent::Opened,
        }
    }

    /// Close on a click outside both the menu and its trigger.
    ///
    /// Returns `true` if the menu was closed.
    pub fn outside_click(&mut self, x: i32, y: i32) -> bool {
        let inside = match &self.open {
            Some(menu) => menu.bounds.contains(x, y) || menu.anchor.contains(x, y),
            None => return false,
        };
        if inside {
            return false;
        }
        self.close()
    }

    /// Close on the escape gesture.
    pub fn escape(&mut self) -> bool {
        self.close()
    }

    /// Recompute placement after the anchor moved or the viewport resized.
    pub fn reposition(&mut self, anchor: Rect, viewport: Size) {
        if let (Some(menu), Some(size)) = (self.open.as_mut(), self.size) {
            let (bounds, placement) = place(anchor, size, viewport);
            menu.anchor = anchor;
            menu.bounds = bounds;
            menu.placement = placement;
        }
    }

    pub fn close(&mut self) -> bool {
        self.size = None;
        self.open.take().is_some()
    }
}
