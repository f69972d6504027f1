use clap::Parser;
use macroquad::window::Conf;

#[derive(Parser, Debug, Clone)]
#[command(name = "grainbox")]
#[command(about = "Granular synth with a ten-knob editor", long_about = None)]
pub struct Args {
    /// Initial editor width in pixels
    #[arg(long, default_value_t = 800)]
    pub width: i32,

    /// Initial editor height in pixels
    #[arg(long, default_value_t = 500)]
    pub height: i32,

    /// Run the editor without opening an audio device
    #[arg(long)]
    pub no_audio: bool,
}

pub fn window_conf(args: &Args) -> Conf {
    Conf {
        window_title: "Grainbox".into(),
        fullscreen: false,
        sample_count: 4,
        window_width: args.width.max(320),
        window_height: args.height.max(240),
        high_dpi: false,
        window_resizable: true,
        ..Default::default()
    }
}
