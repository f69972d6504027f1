mod attachment;
mod config;
mod controllers;
mod editor;
mod envelope;
mod grains;
mod layout;
mod look_and_feel;
mod output;
mod params;
mod slider;

use std::sync::{Arc, Mutex, mpsc};

use anyhow::{Context, Result};
use clap::Parser;
use config::{Args, window_conf};
use controllers::KeyboardController;
use editor::Editor;
use grains::{GrainEngine, GrainSettings, spawn_parameter_listener};
use log::{debug, error, info, warn};
use macroquad::prelude::*;
use output::AudioEngine;
use params::ParameterTree;
use slider::PointerInput;
use tokio::runtime::Runtime;

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();
    macroquad::Window::from_config(window_conf(&args), async move {
        if let Err(e) = run(args).await {
            error!("{e:#}");
        }
    });
}

async fn run(args: Args) -> Result<()> {
    let runtime = Runtime::new().context("starting tokio runtime")?;

    let (changes_tx, changes_rx) = mpsc::channel();
    let mut tree = ParameterTree::grain_synth();
    tree.add_listener(changes_tx);
    let settings = GrainSettings::from_tree(&tree).into_shared();
    let parameters = tree.into_shared();
    let _listener = spawn_parameter_listener(&runtime, changes_rx, settings.clone());

    let engine = Arc::new(Mutex::new(GrainEngine::new(settings)));
    let _audio = if args.no_audio {
        info!("audio disabled, editor only");
        None
    } else {
        match AudioEngine::start(engine.clone()) {
            Ok(audio) => Some(audio),
            Err(e) => {
                warn!("continuing without audio: {e:#}");
                None
            }
        }
    };

    let mut editor = Editor::new(parameters, screen_width(), screen_height())?;
    let mut keyboard = KeyboardController::new();

    loop {
        let size = vec2(screen_width(), screen_height());
        if size != editor.size() {
            editor.resized(size.x, size.y);
        }
        if is_key_pressed(KeyCode::Tab) {
            editor.cycle_source_wave();
        }
        if is_key_pressed(KeyCode::R) {
            editor.reset_parameters();
        }
        if let Some(message) = keyboard.poll() {
            debug!("note {} gate {}", message.midi_note, message.gate);
            if let Ok(mut engine) = engine.lock() {
                engine.set_gate(message.gate, message.frequency);
            }
        }

        editor.update(&PointerInput::poll());
        editor.paint();

        next_frame().await;
    }
}
