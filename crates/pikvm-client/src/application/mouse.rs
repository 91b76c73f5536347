//! Mouse façade.
//!
//! Absolute coordinates are in the target's screen space as the device sees
//! it.  A click at a position is a move followed by a button press, and a drag
//! is a button held across [`drag_path`] intermediate moves.

use pikvm_core::domain::pacing::{CLICK_SETTLE, DOUBLE_CLICK_GAP, DRAG_STEP_GAP};
use pikvm_core::{drag_path, HidEvent, MouseButton, Point, Result};
use tokio::time::sleep;
use tracing::debug;

use super::{send_hid, DeviceTransport};

pub struct Mouse<'a, T: ?Sized> {
    transport: &'a T,
}

impl<'a, T: DeviceTransport + ?Sized> Mouse<'a, T> {
    pub fn new(transport: &'a T) -> Self {
        Self { transport }
    }

    /// Moves the pointer to an absolute position.
    pub async fn move_to(&self, x: i32, y: i32) -> Result<()> {
        send_hid(
            self.transport,
            HidEvent::MouseMove {
                to: Point::new(x, y),
            },
        )
        .await
    }

    /// Clicks `button`, first moving to `at` when given.
    ///
    /// Both the move and the button-down are followed by [`CLICK_SETTLE`].
    pub async fn click(&self, at: Option<Point>, button: MouseButton) -> Result<()> {
        if let Some(at) = at {
            self.move_to(at.x, at.y).await?;
            sleep(CLICK_SETTLE).await;
        }
        self.button(button, true).await?;
        sleep(CLICK_SETTLE).await;
        self.button(button, false).await
    }

    pub async fn right_click(&self, at: Option<Point>) -> Result<()> {
        self.click(at, MouseButton::Right).await
    }

    pub async fn middle_click(&self, at: Option<Point>) -> Result<()> {
        self.click(at, MouseButton::Middle).await
    }

    /// Two left clicks separated by [`DOUBLE_CLICK_GAP`].
    pub async fn double_click(&self, at: Option<Point>) -> Result<()> {
        self.click(at, MouseButton::Left).await?;
        sleep(DOUBLE_CLICK_GAP).await;
        self.click(at, MouseButton::Left).await
    }

    /// Scrolls the wheel; negative `dy` scrolls up.
    pub async fn scroll(&self, dx: i32, dy: i32) -> Result<()> {
        send_hid(
            self.transport,
            HidEvent::MouseWheel {
                delta: Point::new(dx, dy),
            },
        )
        .await
    }

    /// Drags from `from` to `to` holding `button`, passing through `steps`
    /// evenly spaced positions.
    ///
    /// Sends one move to `from`, the button-down, `steps` moves each followed
    /// by [`DRAG_STEP_GAP`], and the button-up.  If a step fails the button is
    /// left pressed.
    pub async fn drag(&self, from: Point, to: Point, button: MouseButton, steps: u32) -> Result<()> {
        debug!(?from, ?to, %button, steps, "dragging");
        self.move_to(from.x, from.y).await?;
        sleep(CLICK_SETTLE).await;
        self.button(button, true).await?;
        sleep(CLICK_SETTLE).await;

        for point in drag_path(from, to, steps) {
            self.move_to(point.x, point.y).await?;
            sleep(DRAG_STEP_GAP).await;
        }

        self.button(button, false).await
    }

    /// Moves the pointer by a relative delta.
    pub async fn relative_move(&self, dx: i32, dy: i32) -> Result<()> {
        send_hid(
            self.transport,
            HidEvent::MouseRelative {
                delta: Point::new(dx, dy),
            },
        )
        .await
    }

    async fn button(&self, button: MouseButton, state: bool) -> Result<()> {
        send_hid(self.transport, HidEvent::MouseButton { button, state }).await
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
