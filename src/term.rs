use std::io::{stdout, Stdout, Write};
use std::time::Duration;

use anyhow::{Context, Result};
use crossterm::event::{poll, read, DisableMouseCapture, EnableMouseCapture, Event, KeyEvent};
use crossterm::style::{Color, Print, ResetColor, SetBackgroundColor, SetForegroundColor};
use crossterm::terminal::{ClearType, EnterAlternateScreen, LeaveAlternateScreen};
use crossterm::{cursor, execute, queue, terminal};
use tracing::error;

use crate::theme::Palette;

pub type ScreenPos = (u16, u16);

#[derive(Copy, Clone, Debug, PartialEq)]
struct Glyph {
    ch: char,
    fg: Color,
    bg: Color,
}

pub struct TermManager {
    width: u16,
    height: u16,
    stdout: Stdout,
    palette: Palette,
    screen: Vec<Glyph>,
    current_msg: Option<Message>,
    active: bool,
}

struct Message {
    top_left: ScreenPos,
    width: u16,
    height: u16,
}

impl TermManager {
    pub fn new(palette: Palette) -> Result<Self> {
        let (width, height) = terminal::size().context("failed to read terminal size")?;
        let blank = Glyph { ch: ' ', fg: palette.text, bg: palette.background };
        Ok(TermManager {
            width,
            height,
            stdout: stdout(),
            palette,
            screen: vec![blank; width as usize * height as usize],
            current_msg: None,
            active: false,
        })
    }

    pub fn setup(&mut self) -> Result<()> {
        execute!(self.stdout, EnterAlternateScreen).context("failed to enter alternate screen")?;
        terminal::enable_raw_mode().context("failed to enable raw mode")?;
        execute!(self.stdout, cursor::Hide, cursor::DisableBlinking, EnableMouseCapture)
            .context("failed to configure cursor and mouse")?;
        self.active = true;
        Ok(())
    }

    /// Puts the terminal back the way we found it. Failures are logged, there
    /// is nothing else left to do with them on the way out.
    pub fn restore(&mut self) {
        if !self.active {
            return;
        }
        self.active = false;

        if let Err(err) = execute!(
            self.stdout,
            ResetColor,
            DisableMouseCapture,
            cursor::Show,
            cursor::EnableBlinking
        ) {
            error!(%err, "failed to restore cursor");
        }
        if let Err(err) = terminal::disable_raw_mode() {
            error!(%err, "failed to disable raw mode");
        }
        if let Err(err) = execute!(self.stdout, LeaveAlternateScreen) {
            error!(%err, "failed to leave alternate screen");
        }
    }

    pub fn set_palette(&mut self, palette: Palette) {
        self.palette = palette;
    }

    pub fn palette(&self) -> Palette {
        self.palette
    }

    pub fn read_event_blocking(&self) -> Result<Event> {
        read().context("failed to read terminal event")
    }

    pub fn read_key_blocking(&self) -> Result<KeyEvent> {
        loop {
            if let Event::Key(ev) = self.read_event_blocking()? {
                return Ok(ev);
            }
        }
    }

    /// Waits up to `timeout` for the first event, then drains whatever else is
    /// already queued.
    pub fn read_events(&self, timeout: Duration) -> Result<Vec<Event>> {
        let mut events = vec![];
        let mut wait = timeout;

        while poll(wait).context("failed to poll terminal events")? {
            events.push(self.read_event_blocking()?);
            wait = Duration::from_millis(0);
        }

        Ok(events)
    }

    /// Picks up a resized terminal. Only called between sessions.
    pub fn refresh_size(&mut self) -> Result<()> {
        let (width, height) = terminal::size().context("failed to read terminal size")?;
        self.width = width;
        self.height = height;
        self.clear()
    }

    pub fn get_terminal_size(&self) -> ScreenPos {
        (self.width, self.height)
    }

    pub fn draw_borders(&mut self, width: u16, height: u16) {
        let end_x = width - 1;
        let end_y = height - 1;
        let fg = self.palette.text;

        for x in 0..width {
            let ch = if x == 0 || x == end_x { '+' } else { '-' };
            self.print_at((x, 0), ch, fg);
            self.print_at((x, end_y), ch, fg);
        }

        for y in 1..end_y {
            self.print_at((0, y), '|', fg);
            self.print_at((end_x, y), '|', fg);
        }
    }

    /// Paints a full-width status line at row `y`, padded with background.
    pub fn print_line(&mut self, y: u16, text: &str) {
        let fg = self.palette.text;
        let padded = format!("{:<width$}", text, width = self.width as usize);
        for (x, ch) in padded.chars().take(self.width as usize).enumerate() {
            self.print_at((x as u16, y), ch, fg);
        }
    }

    pub fn show_message(&mut self, lines: &[&str]) -> Result<()> {
        if self.has_message() {
            self.hide_message()?;
        }

        let msg_height = (lines.len() + 2) as u16;
        let msg_width = (lines.iter().map(|x| x.chars().count()).max().unwrap_or(0) + 2) as u16;
        let msg_width = msg_width.min(self.width);
        let center = (self.width / 2, self.height / 2);
        let top_left = (
            center.0.saturating_sub(msg_width / 2),
            center.1.saturating_sub(msg_height / 2),
        );
        let (fg, bg) = (self.palette.background, self.palette.text);

        for y in [top_left.1, top_left.1 + msg_height - 1] {
            for x_diff in 0..msg_width {
                self.print_at_no_save((top_left.0 + x_diff, y), ' ', fg, bg)?;
            }
        }

        for (i, line) in lines.iter().enumerate() {
            let padded_line = format!("{line: ^width$}", line = line, width = msg_width as usize);
            let y = top_left.1 + i as u16 + 1;
            for (x_diff, ch) in padded_line.chars().take(msg_width as usize).enumerate() {
                self.print_at_no_save((top_left.0 + x_diff as u16, y), ch, fg, bg)?;
            }
        }

        self.current_msg = Some(Message { width: msg_width, height: msg_height, top_left });
        self.flush()
    }

    pub fn hide_message(&mut self) -> Result<()> {
        let msg = match self.current_msg.take() {
            Some(msg) => msg,
            None => return Ok(()),
        };

        // Repaint what the message covered from the screen buffer
        for y_diff in 0..msg.height {
            for x_diff in 0..msg.width {
                let (x, y) = (msg.top_left.0 + x_diff, msg.top_left.1 + y_diff);
                if let Some(glyph) = self.glyph(x, y) {
                    self.print_at_no_save((x, y), glyph.ch, glyph.fg, glyph.bg)?;
                }
            }
        }

        self.flush()
    }

    pub fn print_at(&mut self, pos: ScreenPos, ch: char, fg: Color) {
        let bg = self.palette.background;
        if pos.0 >= self.width {
            return;
        }
        let idx = self.width as usize * pos.1 as usize + pos.0 as usize;
        match self.screen.get_mut(idx) {
            Some(slot) => *slot = Glyph { ch, fg, bg },
            None => return,
        }
        // Queue errors resurface on the next flush.
        let _ = queue!(
            self.stdout,
            cursor::MoveTo(pos.0, pos.1),
            SetForegroundColor(fg),
            SetBackgroundColor(bg),
            Print(ch)
        );
    }

    pub fn clear(&mut self) -> Result<()> {
        let bg = self.palette.background;
        let blank = Glyph { ch: ' ', fg: self.palette.text, bg };
        execute!(self.stdout, SetBackgroundColor(bg), terminal::Clear(ClearType::All))
            .context("failed to clear terminal")?;
        self.screen = vec![blank; self.width as usize * self.height as usize];
        self.current_msg = None;
        Ok(())
    }

    pub fn flush(&mut self) -> Result<()> {
        self.stdout.flush().context("failed to flush terminal")
    }

    pub fn has_message(&self) -> bool {
        self.current_msg.is_some()
    }

    ///////////////////////////////////////////////////////////////////////////

    fn glyph(&self, x: u16, y: u16) -> Option<Glyph> {
        if x >= self.width {
            return None;
        }
        self.screen.get(self.width as usize * y as usize + x as usize).copied()
    }

    fn print_at_no_save(&mut self, pos: ScreenPos, ch: char, fg: Color, bg: Color) -> Result<()> {
        // Messages skip the buffer so hiding them can restore what was underneath
        queue!(
            self.stdout,
            cursor::MoveTo(pos.0, pos.1),
            SetForegroundColor(fg),
            SetBackgroundColor(bg),
            Print(ch)
        )
        .context("failed to queue terminal output")
    }
}

impl Drop for TermManager {
    fn drop(&mut self) {
        self.restore();
    }
}
