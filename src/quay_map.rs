//! # Schematic Quay Map
//!
//! Draws the berth 15 landing area with `embedded-graphics` primitives onto a
//! [`CharCanvas`], a [`DrawTarget`] whose pixels are terminal character cells.
//!
//! ```text
//!   ███████████████████████████████  Vicente de Carvalho waterfront
//!                 ███
//!        stairway █ █ basin          pier with both landings
//!                 ███
//!                  ·                 catraia route
//!                  ·
//!                  ⛴                 catraia
//! ```
//!
//! During high or low tide the route bends to the quay stairway on the left
//! of the pier; otherwise it ends at the floating dock in the market basin.

use crate::TideLevel;
use embedded_graphics::{
    pixelcolor::BinaryColor,
    prelude::*,
    primitives::{Line, PrimitiveStyle, Rectangle},
};

const WIDTH: u32 = 44;
const HEIGHT: u32 = 14;

const PIER_X: i32 = 20;
const PIER_WIDTH: u32 = 4;
const PIER_TOP: i32 = 3;
const PIER_BOTTOM: i32 = 8;
const STAIRWAY: Point = Point::new(PIER_X - 2, PIER_BOTTOM - 1);
const BASIN: Point = Point::new(PIER_X + PIER_WIDTH as i32 + 1, PIER_BOTTOM - 1);
const CATRAIA: Point = Point::new(PIER_X + 1, HEIGHT as i32 - 2);

/// Character framebuffer. `On` pixels are drawn with the current ink.
#[derive(Clone, Debug)]
pub struct CharCanvas {
    width: u32,
    height: u32,
    cells: Vec<char>,
    ink: char,
}

impl CharCanvas {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            cells: vec![' '; (width * height) as usize],
            ink: '█',
        }
    }

    /// Character used for subsequent `On` pixels.
    pub fn set_ink(&mut self, ink: char) {
        self.ink = ink;
    }

    /// Write text starting at `origin`, clipped to the canvas.
    pub fn put_text(&mut self, origin: Point, text: &str) {
        for (i, c) in text.chars().enumerate() {
            self.put(origin + Point::new(i as i32, 0), c);
        }
    }

    pub fn get(&self, point: Point) -> Option<char> {
        self.index(point).map(|i| self.cells[i])
    }

    pub fn lines(&self) -> Vec<String> {
        self.cells
            .chunks(self.width as usize)
            .map(|row| row.iter().collect::<String>().trim_end().to_string())
            .collect()
    }

    fn put(&mut self, point: Point, c: char) {
        if let Some(i) = self.index(point) {
            self.cells[i] = c;
        }
    }

    fn index(&self, point: Point) -> Option<usize> {
        let inside = point.x >= 0
            && point.y >= 0
            && (point.x as u32) < self.width
            && (point.y as u32) < self.height;
        inside.then(|| (point.y as u32 * self.width + point.x as u32) as usize)
    }
}

impl OriginDimensions for CharCanvas {
    fn size(&self) -> Size {
        Size::new(self.width, self.height)
    }
}

impl DrawTarget for CharCanvas {
    type Color = BinaryColor;
    type Error = core::convert::Infallible;

    fn draw_iter<I>(&mut self, pixels: I) -> Result<(), Self::Error>
    where
        I: IntoIterator<Item = Pixel<Self::Color>>,
    {
        for Pixel(point, color) in pixels {
            let c = match color {
                BinaryColor::On => self.ink,
                BinaryColor::Off => ' ',
            };
            self.put(point, c);
        }
        Ok(())
    }
}

/// Landing the catraia heads for at `level`.
pub fn destination_label(level: TideLevel) -> &'static str {
    if level.is_extreme() {
        "DESTINATION: QUAY"
    } else {
        "DESTINATION: BASIN"
    }
}

/// Draw the schematic for `level`, labelling the waterfront with `town`.
pub fn draw(level: TideLevel, town: &str) -> CharCanvas {
    let mut canvas = CharCanvas::new(WIDTH, HEIGHT);
    let solid = PrimitiveStyle::with_fill(BinaryColor::On);
    let stroke = PrimitiveStyle::with_stroke(BinaryColor::On, 1);

    Rectangle::new(Point::new(0, 0), Size::new(WIDTH, 2))
        .into_styled(solid)
        .draw(&mut canvas)
        .ok();
    Rectangle::new(
        Point::new(PIER_X, PIER_TOP - 1),
        Size::new(PIER_WIDTH, (PIER_BOTTOM - PIER_TOP + 1) as u32),
    )
    .into_styled(solid)
    .draw(&mut canvas)
    .ok();

    canvas.set_ink('·');
    let target = if level.is_extreme() { STAIRWAY } else { BASIN };
    let bend = Point::new(target.x, CATRAIA.y - 2);
    Line::new(CATRAIA - Point::new(0, 1), Point::new(CATRAIA.x, bend.y))
        .into_styled(stroke)
        .draw(&mut canvas)
        .ok();
    Line::new(Point::new(CATRAIA.x, bend.y), bend)
        .into_styled(stroke)
        .draw(&mut canvas)
        .ok();
    Line::new(bend, target + Point::new(0, 1))
        .into_styled(stroke)
        .draw(&mut canvas)
        .ok();

    canvas.put_text(Point::new(1, 0), town);
    canvas.put(STAIRWAY, if level.is_extreme() { '▶' } else { '▷' });
    canvas.put(BASIN, if level.is_extreme() { '◁' } else { '◀' });
    canvas.put_text(Point::new(STAIRWAY.x - 9, STAIRWAY.y), "stairway");
    canvas.put_text(Point::new(BASIN.x + 2, BASIN.y), "market basin");
    canvas.put(CATRAIA, '⛴');
    canvas.put_text(Point::new(CATRAIA.x + 2, CATRAIA.y), "catraia");
    canvas.put_text(Point::new(0, HEIGHT as i32 - 1), destination_label(level));

    canvas
}
