//! UI element placement in base coordinates
//!
//! Positions are returned *before* scaling; the caller's render path maps
//! them to canvas pixels through the scaled rendering context.

use std::fmt;
use std::str::FromStr;

use crate::coordinates::CanvasInfo;
use crate::error::{BubbleError, Result};
use crate::fallback::with_fallback;
use crate::geometry::{Point, Rect};

/// Returned whenever a position cannot be computed
pub const FALLBACK_POSITION: Point = Point::new(400.0, 300.0);

/// Vertical distance between stacked status readouts
pub const STATUS_SPACING: f32 = 40.0;
/// Vertical pitch between stacked buttons
pub const BUTTON_PITCH: f32 = 42.0;
/// Assumed button width used to anchor buttons off the right margin
pub const BUTTON_WIDTH: f32 = 100.0;

const MOBILE_MAX_WIDTH: f32 = 480.0;
const TABLET_MAX_WIDTH: f32 = 768.0;

/// Display-width breakpoint
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Breakpoint {
    Mobile,
    Tablet,
    Desktop,
}

impl Breakpoint {
    pub fn for_display_width(width: f32) -> Self {
        if width < MOBILE_MAX_WIDTH {
            Breakpoint::Mobile
        } else if width < TABLET_MAX_WIDTH {
            Breakpoint::Tablet
        } else {
            Breakpoint::Desktop
        }
    }

    pub fn margins(self) -> Margins {
        match self {
            Breakpoint::Mobile => Margins::new(5.0, 10.0, 10.0, 10.0),
            Breakpoint::Tablet => Margins::new(5.0, 15.0, 15.0, 15.0),
            Breakpoint::Desktop => Margins::new(5.0, 20.0, 20.0, 20.0),
        }
    }
}

/// Edge margins in base units
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Margins {
    pub top: f32,
    pub right: f32,
    pub bottom: f32,
    pub left: f32,
}

impl Margins {
    pub const fn new(top: f32, right: f32, bottom: f32, left: f32) -> Self {
        Self {
            top,
            right,
            bottom,
            left,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StatusKind {
    Score,
    Time,
    Hp,
}

impl StatusKind {
    /// Row in the status stack
    pub fn index(self) -> usize {
        match self {
            StatusKind::Score => 0,
            StatusKind::Time => 1,
            StatusKind::Hp => 2,
        }
    }
}

impl FromStr for StatusKind {
    type Err = BubbleError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "score" => Ok(StatusKind::Score),
            "time" => Ok(StatusKind::Time),
            "hp" => Ok(StatusKind::Hp),
            other => Err(BubbleError::UnknownElement(format!("status:{other}"))),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Edge {
    Top,
    Right,
    Bottom,
    Left,
}

/// Semantic UI element descriptor
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum UiElement {
    Status(StatusKind),
    Button { kind: String, index: usize },
    Dialog(String),
    Center,
}

impl FromStr for UiElement {
    type Err = BubbleError;

    /// Parse `status:<kind>`, `button:<type>,<index>`, `dialog:<type>` or `center`
    fn from_str(s: &str) -> Result<Self> {
        let unknown = || BubbleError::UnknownElement(s.to_string());
        if s == "center" {
            return Ok(UiElement::Center);
        }

        let (category, rest) = s.split_once(':').ok_or_else(unknown)?;
        match category {
            "status" => rest.parse().map(UiElement::Status),
            "button" => {
                let (kind, index) = rest.split_once(',').ok_or_else(unknown)?;
                let index = index.trim().parse::<usize>().map_err(|_| unknown())?;
                if kind.is_empty() {
                    return Err(unknown());
                }
                Ok(UiElement::Button {
                    kind: kind.to_string(),
                    index,
                })
            }
            "dialog" if !rest.is_empty() => Ok(UiElement::Dialog(rest.to_string())),
            _ => Err(unknown()),
        }
    }
}

impl fmt::Display for UiElement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UiElement::Status(kind) => write!(f, "status:{}", format!("{kind:?}").to_lowercase()),
            UiElement::Button { kind, index } => write!(f, "button:{kind},{index}"),
            UiElement::Dialog(kind) => write!(f, "dialog:{kind}"),
            UiElement::Center => f.write_str("center"),
        }
    }
}

/// Computes base-space positions for HUD elements
#[derive(Clone, Debug)]
pub struct UiPositionCalculator {
    info: CanvasInfo,
}

impl UiPositionCalculator {
    pub fn new(info: CanvasInfo) -> Self {
        Self { info }
    }

    /// Track a new canvas size
    pub fn update_canvas_info(&mut self, info: CanvasInfo) {
        self.info = info;
    }

    pub fn breakpoint(&self) -> Breakpoint {
        Breakpoint::for_display_width(self.info.display_width)
    }

    pub fn responsive_margins(&self) -> Margins {
        self.breakpoint().margins()
    }

    /// Position for a descriptor string, or [`FALLBACK_POSITION`]
    pub fn position(&self, descriptor: &str) -> Point {
        with_fallback("UiPositionCalculator::position", FALLBACK_POSITION, || {
            let element = descriptor.parse::<UiElement>()?;
            self.try_position(&element)
        })
    }

    pub fn try_position(&self, element: &UiElement) -> Result<Point> {
        let point = match element {
            UiElement::Status(kind) => self.status_point(*kind),
            UiElement::Button { index, .. } => self.button_point(*index),
            UiElement::Dialog(_) | UiElement::Center => self.center_point(None),
        };
        if point.is_finite() {
            Ok(point)
        } else {
            Err(BubbleError::InvalidCoordinate {
                operation: "ui_position",
                x: point.x,
                y: point.y,
            })
        }
    }

    pub fn status_position(&self, kind: StatusKind) -> Point {
        self.guarded("UiPositionCalculator::status_position", self.status_point(kind))
    }

    /// Buttons stack down the right edge; `_kind` does not affect placement
    pub fn button_position(&self, _kind: &str, index: usize) -> Point {
        self.guarded("UiPositionCalculator::button_position", self.button_point(index))
    }

    /// Every dialog kind is centered
    pub fn dialog_position(&self, _kind: &str) -> Point {
        self.guarded("UiPositionCalculator::dialog_position", self.center_point(None))
    }

    /// Center of the base canvas, or of `container` when given
    pub fn center_position(&self, container: Option<Rect>) -> Point {
        self.guarded(
            "UiPositionCalculator::center_position",
            self.center_point(container),
        )
    }

    /// Midpoint of `edge`, inset by `margin`
    pub fn align_to_edge(&self, edge: Edge, margin: f32) -> Point {
        let (w, h) = (self.info.base_width, self.info.base_height);
        let point = match edge {
            Edge::Top => Point::new(w / 2.0, margin),
            Edge::Bottom => Point::new(w / 2.0, h - margin),
            Edge::Left => Point::new(margin, h / 2.0),
            Edge::Right => Point::new(w - margin, h / 2.0),
        };
        self.guarded("UiPositionCalculator::align_to_edge", point)
    }

    fn status_point(&self, kind: StatusKind) -> Point {
        let margins = self.responsive_margins();
        Point::new(
            margins.left,
            margins.top + kind.index() as f32 * STATUS_SPACING,
        )
    }

    fn button_point(&self, index: usize) -> Point {
        let margins = self.responsive_margins();
        Point::new(
            self.info.base_width - margins.right - BUTTON_WIDTH,
            margins.top + index as f32 * BUTTON_PITCH,
        )
    }

    fn center_point(&self, container: Option<Rect>) -> Point {
        match container {
            Some(rect) => rect.center(),
            None => Point::new(self.info.base_width / 2.0, self.info.base_height / 2.0),
        }
    }

    fn guarded(&self, context: &str, point: Point) -> Point {
        with_fallback(context, FALLBACK_POSITION, || {
            if point.is_finite() {
                Ok(point)
            } else {
                Err(BubbleError::InvalidCoordinate {
                    operation: "ui_position",
                    x: point.x,
                    y: point.y,
                })
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coordinates::CanvasMetrics;

    fn calculator(display_width: f32, display_height: f32) -> UiPositionCalculator {
        let info = CanvasInfo::from_metrics(
            800.0,
            600.0,
            CanvasMetrics::new(display_width, display_height, 1.0),
        )
        .unwrap();
        UiPositionCalculator::new(info)
    }

    #[test]
    fn test_restart_button_on_desktop() {
        let calc = calculator(800.0, 600.0);
        assert_eq!(calc.breakpoint(), Breakpoint::Desktop);
        assert_eq!(calc.button_position("restart", 1), Point::new(680.0, 47.0));
        assert_eq!(calc.position("button:restart,1"), Point::new(680.0, 47.0));
    }

    #[test]
    fn test_kind_does_not_move_buttons_or_dialogs() {
        let calc = calculator(800.0, 600.0);
        assert_eq!(calc.button_position("restart", 2), calc.button_position("giveup", 2));
        assert_eq!(calc.dialog_position("pause"), calc.dialog_position("gameover"));
        assert_eq!(calc.dialog_position("pause"), Point::new(400.0, 300.0));
    }

    #[test]
    fn test_breakpoints_follow_display_width() {
        assert_eq!(calculator(479.0, 600.0).breakpoint(), Breakpoint::Mobile);
        assert_eq!(calculator(480.0, 600.0).breakpoint(), Breakpoint::Tablet);
        assert_eq!(calculator(767.0, 600.0).breakpoint(), Breakpoint::Tablet);
        assert_eq!(calculator(768.0, 600.0).breakpoint(), Breakpoint::Desktop);

        // Mobile right margin is 10 base units
        assert_eq!(calculator(400.0, 300.0).button_position("giveup", 0).x, 690.0);
    }

    #[test]
    fn test_status_stack() {
        let calc = calculator(1024.0, 768.0);
        assert_eq!(calc.status_position(StatusKind::Score), Point::new(20.0, 5.0));
        assert_eq!(calc.status_position(StatusKind::Time), Point::new(20.0, 45.0));
        assert_eq!(calc.position("status:hp"), Point::new(20.0, 85.0));
    }

    #[test]
    fn test_dialogs_and_center() {
        let calc = calculator(800.0, 600.0);
        assert_eq!(calc.position("dialog:pause"), Point::new(400.0, 300.0));
        assert_eq!(calc.position("center"), Point::new(400.0, 300.0));
        let container = Rect::new(100.0, 100.0, 200.0, 100.0);
        assert_eq!(calc.center_position(Some(container)), Point::new(200.0, 150.0));
    }

    #[test]
    fn test_align_to_edge() {
        let calc = calculator(800.0, 600.0);
        assert_eq!(calc.align_to_edge(Edge::Top, 10.0), Point::new(400.0, 10.0));
        assert_eq!(calc.align_to_edge(Edge::Bottom, 10.0), Point::new(400.0, 590.0));
        assert_eq!(calc.align_to_edge(Edge::Left, 10.0), Point::new(10.0, 300.0));
        assert_eq!(calc.align_to_edge(Edge::Right, 10.0), Point::new(790.0, 300.0));
        assert_eq!(calc.align_to_edge(Edge::Left, f32::NAN), FALLBACK_POSITION);
    }

    #[test]
    fn test_unknown_elements_fall_back() {
        let calc = calculator(800.0, 600.0);
        assert_eq!(calc.position("status:mana"), FALLBACK_POSITION);
        assert_eq!(calc.position("button:restart"), FALLBACK_POSITION);
        assert_eq!(calc.position("widget:thing"), FALLBACK_POSITION);
        assert!(matches!(
            "button:x,abc".parse::<UiElement>(),
            Err(BubbleError::UnknownElement(_))
        ));
    }

    #[test]
    fn test_descriptor_display_round_trips() {
        for descriptor in ["status:time", "button:pause,2", "dialog:settings", "center"] {
            let element: UiElement = descriptor.parse().unwrap();
            assert_eq!(element.to_string(), descriptor);
        }
    }
}
