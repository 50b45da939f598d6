/// Entry point and game loop.

mod ui;

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::fs::File;
use std::rc::Rc;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

use overworld::config::OverworldConfig;
use overworld::sim::movement::TickOutcome;
use overworld::sim::ports::{Collaborators, EventPublisher, OverworldEvent};
use overworld::sim::store::{default_save_dir, FileStore};
use overworld::{step, DialogProgress, GridCoord, Overworld, Region, Trigger};
use ui::gamepad::{GamepadState, PadAction};
use ui::input::{KeyAction, KeyTracker};
use ui::renderer::{Camera, CameraHandle, Renderer, Sprite, SpriteHandle};
use ui::sound::SoundEngine;

const FRAME_SLEEP: Duration = Duration::from_millis(5);

/// Where the demo map puts you on a fresh start.
const START: GridCoord = GridCoord { x: 3, y: 3 };

fn main() {
    let config = OverworldConfig::load();
    init_tracing(&config);

    let camera = Rc::new(RefCell::new(Camera::on_tile(START)));
    let sprite = Rc::new(RefCell::new(Sprite::default()));
    let events = EventQueue::default();
    let save_dir = config.storage.save_dir.clone().unwrap_or_else(default_save_dir);
    let collab = Collaborators {
        animation: Box::new(SpriteHandle(Rc::clone(&sprite))),
        scene: Box::new(CameraHandle(Rc::clone(&camera))),
        events: Box::new(events.clone()),
        store: Box::new(FileStore::new(save_dir, &config.storage.namespace)),
    };

    let mut world = Overworld::new(&config, START, collab);
    let door_target = Rc::new(Cell::new(None));
    build_demo_map(&mut world, &door_target);

    let restored = world.restore_position();
    if world.walls.contains(restored) {
        warn!(%restored, "saved_position_inside_wall");
        world.teleport(START);
    }

    let mut renderer = Renderer::new();
    let enhanced = match renderer.init() {
        Ok(enhanced) => enhanced,
        Err(e) => {
            eprintln!("Terminal init failed: {e}");
            return;
        }
    };

    let sound = SoundEngine::new();
    let mut frame = Frame {
        world: &mut world,
        camera: &camera,
        sprite: &sprite,
        events: &events,
        door_target: &door_target,
        sound: sound.as_ref(),
    };

    let result = game_loop(&mut frame, &mut renderer, &config, enhanced);

    if let Err(e) = renderer.cleanup() {
        eprintln!("Terminal cleanup failed: {e}");
    }
    if let Err(e) = result {
        eprintln!("Game error: {e}");
    }

    world.end_session();
    println!();
    println!("Left the overworld at {}.", world.tile());
}

/// Log to `overworld.log` in the working directory; the terminal is
/// owned by the renderer. `RUST_LOG` overrides the default level.
fn init_tracing(config: &OverworldConfig) {
    let file = match File::create("overworld.log") {
        Ok(f) => f,
        Err(_) => return,
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_ansi(false)
        .with_writer(Mutex::new(file))
        .compact()
        .init();
    info!(?config, "starting");
}

// ── Event queue: overworld → front-end ──

#[derive(Clone, Default)]
struct EventQueue(Rc<RefCell<VecDeque<OverworldEvent>>>);

impl EventPublisher for EventQueue {
    fn publish(&mut self, event: OverworldEvent) {
        self.0.borrow_mut().push_back(event);
    }
}

impl EventQueue {
    fn drain(&self) -> Vec<OverworldEvent> {
        self.0.borrow_mut().drain(..).collect()
    }
}

// ── Demo map ──

//   0         1         2
//   0123456789012345678901234
const DEMO_MAP: &[&str] = &[
    "#########################", // 0
    "#.......#...............#", // 1
    "#.......#...............#", // 2
    "#...........!...........#", // 3
    "#.......#...............#", // 4
    "#.......#######.#########", // 5
    "#.......#...............#", // 6
    "#.......#...............#", // 7
    "#+......#...............#", // 8
    "#########################", // 9
];

fn build_demo_map(world: &mut Overworld, door_target: &Rc<Cell<Option<GridCoord>>>) {
    for (y, row) in DEMO_MAP.iter().enumerate() {
        for (x, ch) in row.chars().enumerate() {
            if ch == '#' {
                world.add_wall_cell(GridCoord::new(x as i32, y as i32));
            }
        }
    }

    world.add_trigger(
        GridCoord::new(12, 3),
        Trigger::new("elder").with_pages([
            "Ah, a traveller! Few come through this hall these days.",
            "The shop to the south opens when you step inside.",
            "And the old door in the west room... it goes somewhere else entirely.",
        ]),
    );

    world.add_area_trigger(
        Region::from_corners(10, 6, 14, 8),
        Trigger::new("shop").with_text("Welcome! Have a look around, nothing is for sale yet."),
    );

    let target = Rc::clone(door_target);
    world.add_trigger(
        GridCoord::new(1, 8),
        Trigger::new("door").with_action(move || target.set(Some(GridCoord::new(22, 1)))),
    );
}

// ── Game loop ──

struct Frame<'a> {
    world: &'a mut Overworld,
    camera: &'a Rc<RefCell<Camera>>,
    sprite: &'a Rc<RefCell<Sprite>>,
    events: &'a EventQueue,
    door_target: &'a Rc<Cell<Option<GridCoord>>>,
    sound: Option<&'a SoundEngine>,
}

fn game_loop(
    f: &mut Frame<'_>,
    renderer: &mut Renderer,
    config: &OverworldConfig,
    enhanced: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut kb = KeyTracker::new();
    kb.honor_release = enhanced;
    let mut gp = GamepadState::new();
    gp.load_button_config(&config.gamepad);
    let tick_rate = Duration::from_millis(config.timing.tick_rate_ms);
    let mut last_tick = Instant::now();

    loop {
        for action in kb.poll_actions() {
            match action {
                KeyAction::Press(dir) => f.world.press(dir),
                KeyAction::Release(dir) => f.world.release(dir),
                KeyAction::Confirm => confirm(f.world),
                KeyAction::Quit => return Ok(()),
            }
        }
        for action in gp.update() {
            match action {
                PadAction::StartMove(dir) => f.world.start_move(dir),
                PadAction::StopMove(dir) => f.world.stop_move(dir),
                PadAction::Confirm => confirm(f.world),
                PadAction::Cancel => return Ok(()),
            }
        }

        let elapsed = last_tick.elapsed();
        if elapsed >= tick_rate {
            last_tick = Instant::now();
            tick(f, u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX));
        }

        renderer.render(f.world, &f.camera.borrow(), &f.sprite.borrow())?;
        std::thread::sleep(FRAME_SLEEP);
    }
}

fn tick(f: &mut Frame<'_>, elapsed_ms: u64) {
    let revealed = f.world.advance_clock(elapsed_ms);
    if revealed > 0 {
        if let Some(sfx) = f.sound {
            sfx.play_blip(f.world.dialog.revealed().chars().count());
        }
    }

    for outcome in step(f.world, 1) {
        if let TickOutcome::Blocked { .. } = outcome {
            if let Some(sfx) = f.sound { sfx.play_thud(); }
        }
    }

    for event in f.events.drain() {
        debug!(topic = event.topic(), "overworld_event");
        if let OverworldEvent::DialogOpened(_) = event {
            if let Some(sfx) = f.sound { sfx.play_chime(); }
        }
    }

    if let Some(dest) = f.door_target.take() {
        f.world.teleport(dest);
    }
}

fn confirm(world: &mut Overworld) {
    let progress = world.continue_dialog();
    if progress != DialogProgress::Inactive {
        debug!(?progress, "dialog_continue");
    }
}
