/// Presentation layer: double-buffered, diff-based terminal renderer.
///
/// How it works:
///   1. Build the next frame into `front` buffer (array of Cell)
///   2. Compare each cell with `back` buffer (previous frame)
///   3. Only emit terminal commands for cells that changed
///   4. All commands are batched with `queue!`, flushed once at the end
///   5. Swap front/back
///
/// The map view is centred on the camera, which the overworld moves
/// through `SceneShifter`; the character glyph comes from `Sprite`,
/// driven through `AnimationProvider`. Both are shared with the core via
/// `Rc<RefCell<_>>` handles.

use std::cell::RefCell;
use std::io::{self, BufWriter, Write};
use std::rc::Rc;

use crossterm::{
    cursor::{self, MoveTo},
    event::{KeyboardEnhancementFlags, PopKeyboardEnhancementFlags, PushKeyboardEnhancementFlags},
    execute, queue,
    style::{Color, Print, ResetColor, SetBackgroundColor, SetForegroundColor},
    terminal::{self, Clear, ClearType},
};
use tracing::{debug, warn};

use overworld::domain::grid::{GridCoord, TILE_SIZE};
use overworld::error::AnimationError;
use overworld::sim::ports::{AnimationProvider, SceneShifter};
use overworld::sim::trigger::TriggerKind;
use overworld::{Direction, Overworld};

// ── Camera / Sprite: the renderer's side of the collaborator ports ──

/// Pixel position the view is centred on.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Camera {
    pub px: i64,
    pub py: i64,
}

impl Camera {
    pub fn on_tile(tile: GridCoord) -> Self {
        let (px, py) = tile.to_pixel();
        Camera { px, py }
    }

    /// Tile under the camera, rounding to the nearest tile so a step
    /// scrolls the view halfway through.
    pub fn focus(&self) -> GridCoord {
        let half = i64::from(TILE_SIZE / 2);
        GridCoord::from_pixel(self.px + half, self.py + half)
    }
}

#[derive(Clone)]
pub struct CameraHandle(pub Rc<RefCell<Camera>>);

impl SceneShifter for CameraHandle {
    fn shift_by(&mut self, dx: i32, dy: i32) {
        let mut cam = self.0.borrow_mut();
        cam.px += i64::from(dx);
        cam.py += i64::from(dy);
    }
}

/// Character glyph state.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Sprite {
    pub facing: Direction,
    pub walking: bool,
}

impl Default for Sprite {
    fn default() -> Self {
        Sprite { facing: Direction::Down, walking: false }
    }
}

impl Sprite {
    fn glyph(&self) -> char {
        match (self.facing, self.walking) {
            (Direction::Up, _) => '▲',
            (Direction::Left, _) => '◀',
            (Direction::Right, _) => '▶',
            (_, true) => '▼',
            _ => '☺',
        }
    }
}

#[derive(Clone)]
pub struct SpriteHandle(pub Rc<RefCell<Sprite>>);

impl AnimationProvider for SpriteHandle {
    fn select_and_play(&mut self, dir: Direction) -> Result<(), AnimationError> {
        if dir.is_none() {
            return Err(AnimationError::Unknown { name: dir.name().to_string() });
        }
        let mut sprite = self.0.borrow_mut();
        sprite.facing = dir;
        sprite.walking = true;
        Ok(())
    }

    fn stop_at_rest_frame(&mut self) {
        self.0.borrow_mut().walking = false;
    }
}

// ── Cell: the unit of the back-buffer ──

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
struct Cell {
    ch: char,
    fg: Color,
    bg: Color,
}

impl Cell {
    /// Explicit dark background for all "empty" terminal cells, so the
    /// inter-row gap colour matches on VTE terminals.
    const BASE_BG: Color = Color::Rgb { r: 22, g: 22, b: 35 };

    const BLANK: Cell = Cell { ch: ' ', fg: Color::White, bg: Cell::BASE_BG };

    /// Sentinel cell used to invalidate the back buffer.
    const INVALID: Cell = Cell { ch: '?', fg: Color::Magenta, bg: Color::Magenta };

    fn new(ch: char, fg: Color, bg: Color) -> Self {
        Cell { ch, fg, bg: if bg == Color::Reset { Cell::BASE_BG } else { bg } }
    }
}

// ── FrameBuffer: a 2D grid of Cells ──

struct FrameBuffer {
    width: usize,
    height: usize,
    cells: Vec<Cell>,
}

impl FrameBuffer {
    fn new(w: usize, h: usize) -> Self {
        FrameBuffer { width: w, height: h, cells: vec![Cell::BLANK; w * h] }
    }

    fn resize(&mut self, w: usize, h: usize) {
        if self.width != w || self.height != h {
            self.width = w;
            self.height = h;
            self.cells = vec![Cell::BLANK; w * h];
        }
    }

    fn clear(&mut self) {
        self.cells.fill(Cell::BLANK);
    }

    fn set(&mut self, x: usize, y: usize, cell: Cell) {
        if x < self.width && y < self.height {
            self.cells[y * self.width + x] = cell;
        }
    }

    fn get(&self, x: usize, y: usize) -> Cell {
        if x < self.width && y < self.height {
            self.cells[y * self.width + x]
        } else {
            Cell::BLANK
        }
    }

    /// Write a string at (x, y). Each char occupies 1 column.
    fn put_str(&mut self, x: usize, y: usize, s: &str, fg: Color, bg: Color) {
        for (i, ch) in s.chars().enumerate() {
            if x + i >= self.width { break; }
            self.set(x + i, y, Cell::new(ch, fg, bg));
        }
    }

    fn fill_row(&mut self, y: usize, bg: Color) {
        for x in 0..self.width {
            self.set(x, y, Cell::new(' ', Color::White, bg));
        }
    }
}

// ── Renderer ──

/// Each map tile is two terminal columns wide, so tiles look square.
const CELL_W: usize = 2;

const HUD_ROW: usize = 0;
const MAP_ROW: usize = 1;
/// Dialog box: border + 3 text rows + border.
const DIALOG_ROWS: usize = 5;

const HUD_BG: Color = Color::Rgb { r: 20, g: 20, b: 60 };
const WALL_FG: Color = Color::Rgb { r: 120, g: 110, b: 100 };
const FLOOR_FG: Color = Color::Rgb { r: 45, g: 60, b: 45 };
const DIALOG_BG: Color = Color::Rgb { r: 10, g: 10, b: 20 };

pub struct Renderer {
    writer: BufWriter<io::Stdout>,
    front: FrameBuffer,
    back: FrameBuffer,
    term_w: usize,
    term_h: usize,
    enhanced_keys: bool,
}

impl Renderer {
    pub fn new() -> Self {
        Renderer {
            writer: BufWriter::with_capacity(16384, io::stdout()),
            front: FrameBuffer::new(0, 0),
            back: FrameBuffer::new(0, 0),
            term_w: 0,
            term_h: 0,
            enhanced_keys: false,
        }
    }

    /// Enter raw mode + alternate screen. Returns whether the terminal
    /// will report key Release events.
    pub fn init(&mut self) -> io::Result<bool> {
        terminal::enable_raw_mode()?;
        execute!(
            self.writer,
            terminal::EnterAlternateScreen,
            cursor::Hide,
            SetBackgroundColor(Cell::BASE_BG),
            Clear(ClearType::All)
        )?;

        if terminal::supports_keyboard_enhancement().unwrap_or(false) {
            match execute!(
                self.writer,
                PushKeyboardEnhancementFlags(KeyboardEnhancementFlags::REPORT_EVENT_TYPES)
            ) {
                Ok(()) => self.enhanced_keys = true,
                Err(error) => warn!(%error, "keyboard_enhancement_failed"),
            }
        }
        debug!(enhanced = self.enhanced_keys, "terminal_ready");

        let (tw, th) = terminal::size().unwrap_or((80, 24));
        self.resize(tw as usize, th as usize);

        Ok(self.enhanced_keys)
    }

    pub fn cleanup(&mut self) -> io::Result<()> {
        if self.enhanced_keys {
            execute!(self.writer, PopKeyboardEnhancementFlags)?;
        }
        execute!(self.writer, ResetColor, cursor::Show, terminal::LeaveAlternateScreen)?;
        terminal::disable_raw_mode()
    }

    fn resize(&mut self, w: usize, h: usize) {
        self.term_w = w;
        self.term_h = h;
        self.front.resize(w, h);
        self.back.resize(w, h);
        // Force full repaint: back ≠ front for every cell.
        self.back.cells.fill(Cell::INVALID);
    }

    pub fn render(&mut self, world: &Overworld, camera: &Camera, sprite: &Sprite) -> io::Result<()> {
        // Detect terminal resize
        let (tw, th) = terminal::size().unwrap_or((80, 24));
        if tw as usize != self.term_w || th as usize != self.term_h {
            self.resize(tw as usize, th as usize);
            queue!(self.writer, SetBackgroundColor(Cell::BASE_BG), Clear(ClearType::All))?;
        }

        self.compose(world, camera, sprite);
        self.flush_diff()?;

        // Swap: current front becomes next back
        std::mem::swap(&mut self.front, &mut self.back);
        Ok(())
    }

    // ── Diff flush: only write changed cells ──

    fn flush_diff(&mut self) -> io::Result<()> {
        let mut last_fg = Color::White;
        let mut last_bg = Cell::BASE_BG;
        let mut cursor_at: Option<(usize, usize)> = None;

        // Explicit base colors; ResetColor would fall back to the
        // terminal's own default and leave line artifacts.
        queue!(self.writer, SetForegroundColor(Color::White), SetBackgroundColor(Cell::BASE_BG))?;

        for y in 0..self.front.height {
            for x in 0..self.front.width {
                let cell = self.front.get(x, y);
                if cell == self.back.get(x, y) {
                    continue;
                }
                if cursor_at != Some((x, y)) {
                    queue!(self.writer, MoveTo(x as u16, y as u16))?;
                }
                if cell.fg != last_fg {
                    queue!(self.writer, SetForegroundColor(cell.fg))?;
                    last_fg = cell.fg;
                }
                if cell.bg != last_bg {
                    queue!(self.writer, SetBackgroundColor(cell.bg))?;
                    last_bg = cell.bg;
                }
                queue!(self.writer, Print(cell.ch))?;
                cursor_at = Some((x + 1, y));
            }
        }

        self.writer.flush()
    }

    // ── Compose: build front buffer content ──

    fn compose(&mut self, w: &Overworld, camera: &Camera, sprite: &Sprite) {
        self.front.clear();
        let buf_w = self.front.width;
        let buf_h = self.front.height;
        if buf_w == 0 || buf_h == 0 {
            return;
        }

        // ── HUD row ──
        let tile = w.tile();
        let hud = format!(
            " ({:>4},{:>4})  {}  {} ",
            tile.x,
            tile.y,
            if w.input.is_running() { "RUN " } else { "walk" },
            w.triggers.session().last_fired_tag.as_deref().unwrap_or(""),
        );
        self.front.fill_row(HUD_ROW, HUD_BG);
        self.front.put_str(0, HUD_ROW, &hud, Color::White, HUD_BG);

        // ── Map (camera viewport) ──
        let view_w = buf_w / CELL_W;
        let view_h = buf_h.saturating_sub(MAP_ROW + DIALOG_ROWS + 1).max(1);
        let focus = camera.focus();
        let origin_x = focus.x.saturating_sub((view_w / 2) as i32);
        let origin_y = focus.y.saturating_sub((view_h / 2) as i32);

        for vy in 0..view_h {
            let row = MAP_ROW + vy;
            for vx in 0..view_w {
                let at = GridCoord::new(
                    origin_x.saturating_add(vx as i32),
                    origin_y.saturating_add(vy as i32),
                );
                let (ch, fg) = self.glyph_at(w, at);
                let col = vx * CELL_W;
                self.front.set(col, row, Cell::new(ch, fg, Color::Reset));
                self.front.set(col + 1, row, Cell::new(if ch == '█' { '█' } else { ' ' }, fg, Color::Reset));
            }
        }

        // Character sits at its own tile relative to the view.
        let cx = i64::from(tile.x) - i64::from(origin_x);
        let cy = i64::from(tile.y) - i64::from(origin_y);
        if cx >= 0 && cy >= 0 && (cx as usize) < view_w && (cy as usize) < view_h {
            self.front.set(cx as usize * CELL_W, MAP_ROW + cy as usize, Cell::new(sprite.glyph(), Color::Yellow, Color::Reset));
        }

        // ── Dialog box ──
        let box_top = MAP_ROW + view_h;
        if w.dialog_active() && box_top + DIALOG_ROWS <= buf_h {
            self.compose_dialog(w, box_top);
        } else if box_top < buf_h {
            let help = " WASD/Arrows: move (hold to run)  Enter: talk  Esc: quit";
            self.front.put_str(0, buf_h - 1, help, Color::DarkGrey, Color::Reset);
        }
    }

    fn glyph_at(&self, w: &Overworld, at: GridCoord) -> (char, Color) {
        if w.walls.contains(at) {
            return ('█', WALL_FG);
        }
        match w.triggers.get(at) {
            Some(t) if !t.has_pages() => ('+', Color::Cyan),
            Some(t) => match t.kind {
                TriggerKind::Point => ('!', Color::Green),
                TriggerKind::Area(_) => (':', Color::DarkYellow),
            },
            None => ('·', FLOOR_FG),
        }
    }

    fn compose_dialog(&mut self, w: &Overworld, top: usize) {
        let width = self.front.width;
        for r in 0..DIALOG_ROWS {
            self.front.fill_row(top + r, DIALOG_BG);
        }
        let border: String = std::iter::repeat('─').take(width.saturating_sub(2)).collect();
        self.front.put_str(0, top, &format!("┌{border}┐"), Color::White, DIALOG_BG);
        self.front.put_str(0, top + DIALOG_ROWS - 1, &format!("└{border}┘"), Color::White, DIALOG_BG);

        let inner = width.saturating_sub(4).max(1);
        for (i, line) in wrap(w.dialog.revealed(), inner).iter().take(DIALOG_ROWS - 2).enumerate() {
            self.front.put_str(2, top + 1 + i, line, Color::White, DIALOG_BG);
        }

        let typewriter = &w.dialog;
        if typewriter.page_count() > 1 {
            let page = format!(" {}/{} ", typewriter.page_index() + 1, typewriter.page_count());
            self.front.put_str(width.saturating_sub(page.len() + 2), top, &page, Color::Grey, DIALOG_BG);
        }
        if typewriter.is_fully_revealed() {
            let marker = if typewriter.is_last_page() { '■' } else { '▼' };
            self.front.set(width.saturating_sub(3), top + DIALOG_ROWS - 2, Cell::new(marker, Color::Yellow, DIALOG_BG));
        }
    }
}

/// Greedy word wrap by character count.
fn wrap(text: &str, width: usize) -> Vec<String> {
    let mut lines = Vec::new();
    let mut line = String::new();
    for word in text.split(' ') {
        let needed = if line.is_empty() { word.chars().count() } else { line.chars().count() + 1 + word.chars().count() };
        if needed > width && !line.is_empty() {
            lines.push(std::mem::take(&mut line));
        }
        if !line.is_empty() {
            line.push(' ');
        }
        line.push_str(word);
    }
    if !line.is_empty() {
        lines.push(line);
    }
    lines
}

#[cfg(test)]
mod tests {
    use super::*;
    use overworld::config::OverworldConfig;
    use overworld::sim::ports::Collaborators;
    use overworld::Trigger;

    fn row_text(r: &Renderer, y: usize) -> String {
        (0..r.front.width).map(|x| r.front.get(x, y).ch).collect()
    }

    #[test]
    fn camera_shift_moves_focus() {
        let cam = Rc::new(RefCell::new(Camera::on_tile(GridCoord::new(3, 3))));
        let mut handle = CameraHandle(Rc::clone(&cam));
        handle.shift_by(7, 0);
        assert_eq!(cam.borrow().focus(), GridCoord::new(3, 3));
        handle.shift_by(1, 0);
        assert_eq!(cam.borrow().focus(), GridCoord::new(4, 3));
    }

    #[test]
    fn sprite_follows_animation_calls() {
        let sprite = Rc::new(RefCell::new(Sprite::default()));
        let mut handle = SpriteHandle(Rc::clone(&sprite));
        handle.select_and_play(Direction::Left).unwrap();
        assert_eq!(sprite.borrow().glyph(), '◀');
        handle.stop_at_rest_frame();
        assert!(!sprite.borrow().walking);
        assert!(handle.select_and_play(Direction::None).is_err());
    }

    #[test]
    fn compose_draws_character_walls_and_dialog() {
        let mut world = Overworld::new(&OverworldConfig::default(), GridCoord::new(0, 0), Collaborators::detached());
        world.add_wall_cell(GridCoord::new(1, 0));
        world.add_trigger(GridCoord::new(-1, 0), Trigger::new("npc").with_text("Hello traveller"));

        let mut r = Renderer::new();
        r.front.resize(40, 20);
        let cam = Camera::on_tile(GridCoord::new(0, 0));
        r.compose(&world, &cam, &Sprite::default());

        let view_h = 20 - (MAP_ROW + DIALOG_ROWS + 1);
        let centre_row = MAP_ROW + view_h / 2;
        let text = row_text(&r, centre_row);
        assert!(text.contains("! ☺ ██"), "row was {text:?}");

        world.open_dialog(vec!["Hello traveller".into()]);
        world.dialog.complete_reveal();
        r.compose(&world, &cam, &Sprite::default());
        let box_text = row_text(&r, MAP_ROW + view_h + 1);
        assert!(box_text.contains("Hello traveller"));
    }

    #[test]
    fn compose_at_plane_corner() {
        let corner = GridCoord::new(i32::MAX, i32::MIN);
        let world = Overworld::new(&OverworldConfig::default(), corner, Collaborators::detached());
        let mut r = Renderer::new();
        r.front.resize(40, 20);
        let cam = Camera::on_tile(GridCoord::new(i32::MIN, i32::MAX));
        assert_eq!(cam.focus(), GridCoord::new(i32::MIN, i32::MAX));
        r.compose(&world, &cam, &Sprite::default());
        r.compose(&world, &Camera::on_tile(corner), &Sprite::default());
    }

    #[test]
    fn wrap_breaks_on_spaces() {
        assert_eq!(wrap("one two three", 7), vec!["one two", "three"]);
        assert_eq!(wrap("", 5), Vec::<String>::new());
    }
}
