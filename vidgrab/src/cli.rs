use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(author, version, about = "Fetch and remux videos with yt-dlp and ffmpeg", long_about = None)]
pub struct Cli {
    /// Base directory for downloads and logs (overrides VIDGRAB_BASE_DIR)
    #[arg(long, global = true)]
    pub base_dir: Option<PathBuf>,

    /// Directory holding bundled tool binaries (overrides VIDGRAB_BIN_DIR)
    #[arg(long, global = true)]
    pub bin_dir: Option<PathBuf>,

    /// Number of transcode attempts (overrides VIDGRAB_TRANSCODE_ATTEMPTS)
    #[arg(long, global = true)]
    pub attempts: Option<u32>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Do not write a log file
    #[arg(long, global = true)]
    pub no_log_file: bool,

    /// Print machine-readable JSON
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Download a video with yt-dlp
    Fetch {
        /// Video URL
        url: String,
        /// 1080p, 720p, 480p, "Audio Only (MP3)" or anything else for best
        #[arg(short, long, default_value = "best")]
        format: String,
    },
    /// Show title and expected download sizes of a video
    Info {
        /// Video URL, or text containing one
        url: String,
    },
    /// Remux an HLS playlist into MP4 with ffmpeg
    Transcode(TranscodeArgs),
    /// Show the download history
    History,
    /// Delete files from the download history
    Delete {
        /// File names as shown by `history`
        #[arg(required = true)]
        names: Vec<String>,
    },
    /// Show which external tools are available
    Tools,
}

#[derive(Args, Debug)]
#[group(required = true, multiple = false)]
pub struct TranscodeArgs {
    /// Playlist URL
    #[arg(long)]
    pub url: Option<String>,
    /// Local playlist file
    #[arg(long)]
    pub file: Option<PathBuf>,
}
