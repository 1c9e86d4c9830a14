//! Homestead host: window, input and the per-frame loop

mod logging;

use macroquad::prelude::*;
use tracing::{debug, info, warn};

use homestead::{game, level, VERSION};
use homestead::game::{PointerEvent, World, WorldEvent};
use homestead::level::WorldConfig;
use homestead::render::{AssetLoader, RenderContext, ScreenSurface};

const ASSET_ROOT: &str = "assets";
const WORLD_FILE: &str = "assets/worlds/demo.ron";
const PLAYER_ID: &str = "farmer";
/// Acceleration from the arrow keys, world pixels per second squared
const PLAYER_ACCEL: f64 = 480.0;
/// Fraction of velocity kept per frame when no key is held
const PLAYER_DRAG: f64 = 0.8;

fn window_conf() -> Conf {
    Conf {
        window_title: format!("Homestead v{}", VERSION),
        window_width: 960,
        window_height: 720,
        window_resizable: true,
        high_dpi: true,
        ..Default::default()
    }
}

fn load_config() -> WorldConfig {
    match level::load_world_config(WORLD_FILE) {
        Ok(config) => {
            info!("Loaded {}", WORLD_FILE);
            config
        }
        Err(e) => {
            warn!("{}; using the built-in farm", e);
            level::demo_config()
        }
    }
}

/// Arrow keys steer the farmer; releasing them lets it coast to a stop
fn steer_player(world: &mut World) {
    let mut dir = game::Vector::ZERO;
    if is_key_down(KeyCode::Left) {
        dir.x -= 1.0;
    }
    if is_key_down(KeyCode::Right) {
        dir.x += 1.0;
    }
    if is_key_down(KeyCode::Up) {
        dir.y -= 1.0;
    }
    if is_key_down(KeyCode::Down) {
        dir.y += 1.0;
    }

    let Some(player) = world.get_entity_mut(PLAYER_ID) else {
        return;
    };
    if dir != game::Vector::ZERO {
        let force = dir.normalize() * (PLAYER_ACCEL * player.mass());
        player.apply_force(force);
    } else if player.velocity() != game::Vector::ZERO {
        let slowed = player.velocity() * PLAYER_DRAG;
        player.set_velocity(if slowed.length() < 1.0 { game::Vector::ZERO } else { slowed });
    }
}

#[macroquad::main(window_conf)]
async fn main() {
    #[cfg(not(target_arch = "wasm32"))]
    crashlog::setup!(crashlog::cargo_metadata!().capitalized(), false);

    logging::init();
    info!("Homestead v{}", VERSION);

    let config = load_config();
    let context = RenderContext::new(AssetLoader::new(ASSET_ROOT));
    let textures = context.textures.clone();
    let mut world = level::build_world(&config, context);
    let (view_w, view_h) = config.view;
    let mut surface = ScreenSurface::new(view_w, view_h, textures);

    let mut last_pointer: Option<game::Vector> = None;
    let mut collected = 0usize;

    loop {
        // Input
        let (mx, my) = mouse_position();
        let pointer = surface.screen_to_world(mx, my);
        if last_pointer != Some(pointer) {
            world.handle_pointer(PointerEvent::moved(pointer));
            last_pointer = Some(pointer);
        }
        if is_mouse_button_pressed(MouseButton::Left) {
            world.handle_pointer(PointerEvent::click(pointer));
        }
        if is_key_pressed(KeyCode::D) {
            let enabled = !world.debug_mode();
            world.set_debug_mode(enabled);
        }
        if is_key_pressed(KeyCode::P) {
            let clock = world.clock_mut();
            if clock.is_paused() {
                clock.resume();
            } else {
                clock.pause();
            }
        }
        steer_player(&mut world);

        // Tick (draws into the offscreen target when something changed)
        surface.begin();
        world.update(get_time(), &mut surface);
        surface.end();

        for event in world.drain_events() {
            match event {
                WorldEvent::Collected { item, collector } => {
                    collected += 1;
                    info!("{} picked up {}", collector, item);
                }
                WorldEvent::Clicked { id, point } => {
                    info!("Clicked {} at ({:.0}, {:.0})", id, point.x, point.y);
                    if id.as_str() == PLAYER_ID {
                        world.renderers_mut().send_event(&id, "wave");
                    }
                }
                other => debug!("{:?}", other),
            }
        }

        clear_background(BLACK);
        surface.present();

        let status = if world.clock().is_paused() { " (paused)" } else { "" };
        draw_text(
            &format!("{:.0} fps  carrots: {}{}", world.clock().fps(), collected, status),
            8.0,
            20.0,
            20.0,
            WHITE,
        );

        next_frame().await;
    }
}
