//! Frame display.

use std::io::{self, Write};

use crossterm::cursor::MoveTo;
use crossterm::queue;
use crossterm::style::{Color, Print, ResetColor, SetBackgroundColor, SetForegroundColor};
use crossterm::terminal::{Clear, ClearType};
use image::{Rgb, RgbImage};

use crate::controller::CycleCounters;
use crate::error::{Result, ThermalError};
use crate::frame::CleanedFrame;

/// Per-frame display sink. Failures are logged by the caller and never
/// stop the loop.
pub trait Renderer {
    fn render(
        &mut self,
        frame: &CleanedFrame,
        colors: &RgbImage,
        counters: &CycleCounters,
    ) -> Result<()>;
}

/// Terminal renderer: a 24-bit color thumbnail drawn with half blocks
/// (two pixel rows per text row) followed by the counter overlay line
pub struct ConsoleRenderer {
    out: Box<dyn Write + Send>,
    /// Move the cursor home before each frame so the picture redraws in place
    redraw_in_place: bool,
}

impl ConsoleRenderer {
    /// Render to stdout, redrawing in place
    pub fn stdout() -> Self {
        Self {
            out: Box::new(io::stdout()),
            redraw_in_place: true,
        }
    }

    /// Render to an arbitrary writer, appending frames
    pub fn new(out: Box<dyn Write + Send>) -> Self {
        Self {
            out,
            redraw_in_place: false,
        }
    }
}

/// Counter overlay text
pub fn overlay_line(counters: &CycleCounters) -> String {
    format!(
        "Hot: {}  Cold: {}  Total: {}",
        counters.hot_columns,
        counters.cold_columns,
        counters.total()
    )
}

fn rgb(pixel: &Rgb<u8>) -> Color {
    Color::Rgb {
        r: pixel[0],
        g: pixel[1],
        b: pixel[2],
    }
}

/// Queue a half-block rendering of a color grid, one text row per two
/// pixel rows. Nothing is flushed.
pub fn queue_thumbnail<W: Write>(out: &mut W, colors: &RgbImage) -> io::Result<()> {
    let (width, height) = colors.dimensions();

    for y in (0..height).step_by(2) {
        for x in 0..width {
            let background = if y + 1 < height {
                rgb(colors.get_pixel(x, y + 1))
            } else {
                Color::Reset
            };
            queue!(
                out,
                SetForegroundColor(rgb(colors.get_pixel(x, y))),
                SetBackgroundColor(background),
                Print('▀')
            )?;
        }
        queue!(out, ResetColor, Print('\n'))?;
    }
    Ok(())
}

impl ConsoleRenderer {
    fn draw(&mut self, colors: &RgbImage, counters: &CycleCounters) -> io::Result<()> {
        if self.redraw_in_place {
            queue!(self.out, Clear(ClearType::All), MoveTo(0, 0))?;
        }
        queue_thumbnail(&mut self.out, colors)?;
        queue!(self.out, Print(overlay_line(counters)), Print('\n'))?;
        self.out.flush()
    }
}

impl Renderer for ConsoleRenderer {
    fn render(
        &mut self,
        _frame: &CleanedFrame,
        colors: &RgbImage,
        counters: &CycleCounters,
    ) -> Result<()> {
        self.draw(colors, counters)
            .map_err(|e| ThermalError::collaborator("renderer", e))
    }
}
