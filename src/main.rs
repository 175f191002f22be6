use clap::Parser;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

use qrscan::cli::{self, Args, Command};
use qrscan::config::Config;

fn main() {
    let args = Args::parse();
    init_logging(args.verbose);

    let mut config = match Config::load(args.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    };
    args.apply(&mut config);

    match args.command {
        Some(Command::ListCameras) => cli::list_cameras(),
        Some(Command::Config { action }) => {
            cli::handle_config_action(action, args.config.as_deref(), &config)
        }
        Some(Command::Scan) | None => {
            let runtime = match tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
            {
                Ok(rt) => rt,
                Err(e) => {
                    eprintln!("Error: failed to start async runtime: {}", e);
                    std::process::exit(1);
                }
            };
            let code = runtime.block_on(scan::run(&config));
            // The stdin zoom reader may still be parked in a blocking read
            runtime.shutdown_timeout(Duration::from_millis(100));
            std::process::exit(code);
        }
    }
}

/// Route `log` records through a tracing subscriber on stderr.
fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

#[cfg(feature = "camera")]
mod scan {
    use std::time::Duration;
    use tokio::io::{AsyncBufReadExt, BufReader};

    use qrscan::camera::CameraCapture;
    use qrscan::cli;
    use qrscan::config::Config;
    use qrscan::decoder;
    use qrscan::scan::{ScanEvent, ScanHandle, ScanLoop, ScanPhase, SessionView};

    /// Exit status when the scan was cancelled (128 + SIGINT)
    const EXIT_CANCELLED: i32 = 130;

    /// How long to wait for a camera that was still opening at cancel time
    const RELEASE_TIMEOUT: Duration = Duration::from_secs(3);

    pub async fn run(config: &Config) -> i32 {
        let (settings, options) = match (config.camera_settings(), config.scan_options()) {
            (Ok(settings), Ok(options)) => (settings, options),
            (Err(e), _) | (_, Err(e)) => {
                eprintln!("Error: {}", e);
                return 1;
            }
        };

        let pipeline = decoder::default_pipeline(config.decoder.assist);
        let scan = ScanLoop::new(CameraCapture::new(settings), pipeline, options);
        let handle = scan.handle();

        let cancel = handle.clone();
        if let Err(e) = ctrlc::set_handler(move || cancel.cancel()) {
            log::warn!("Could not install Ctrl+C handler: {}", e);
        }
        spawn_zoom_reader(handle.clone());

        let (task, mut events) = scan.spawn();
        let mut payload = None;
        while let Some(event) = events.recv().await {
            eprintln!("{}", cli::describe_event(&event));
            if let ScanEvent::Scanning = event {
                eprintln!("Type a zoom factor, '+' or '-' and press Enter to zoom.");
            }
            if let ScanEvent::Decoded(decoded) = event {
                payload = Some(decoded);
            }
        }

        let phase = task.await.unwrap_or(ScanPhase::Failed);
        wait_for_release(&handle.view()).await;
        match (phase, payload) {
            (ScanPhase::Decoded, Some(payload)) => {
                if let Err(e) = cli::write_payload(&mut std::io::stdout(), &payload.bytes) {
                    eprintln!("Error writing payload: {}", e);
                    return 1;
                }
                0
            }
            (ScanPhase::Cancelled, _) => EXIT_CANCELLED,
            _ => 1,
        }
    }

    /// The device is closed by the open itself when a scan is cancelled
    /// mid-open; keep the process alive until that has happened.
    async fn wait_for_release(view: &SessionView) {
        let deadline = tokio::time::Instant::now() + RELEASE_TIMEOUT;
        while !view.is_source_released() {
            if tokio::time::Instant::now() >= deadline {
                log::warn!("Camera still busy after {:?}; exiting anyway", RELEASE_TIMEOUT);
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    }

    /// Read zoom requests from stdin while the scan runs.
    fn spawn_zoom_reader(handle: ScanHandle) {
        tokio::spawn(async move {
            let zoom = handle.zoom();
            let view = handle.view();
            let mut lines = BufReader::new(tokio::io::stdin()).lines();

            while let Ok(Some(line)) = lines.next_line().await {
                let current = view.zoom().unwrap_or(1.0);
                let Some(requested) = cli::parse_zoom_command(&line, current) else {
                    eprintln!("Unrecognized zoom '{}'", line.trim());
                    continue;
                };
                match zoom.set_zoom(requested) {
                    Ok(applied) => eprintln!("Zoom: {:.1}x", applied),
                    Err(e) => {
                        log::debug!("Zoom reader stopping: {}", e);
                        break;
                    }
                }
            }
        });
    }
}

#[cfg(not(feature = "camera"))]
mod scan {
    use qrscan::config::Config;

    pub async fn run(_config: &Config) -> i32 {
        eprintln!("qrscan was built without camera support.");
        eprintln!("Rebuild with: cargo build --features camera");
        1
    }
}
