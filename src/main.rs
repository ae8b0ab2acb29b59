use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use anyhow::Result;
use outputdevice::config::ServerConfig;
use outputdevice::core::discovery::{FakeOutputFeed, ManualFeed, OutputDiscoveryFeed};
use outputdevice::core::Compositor;
use outputdevice::util::logging::MAIN;
use outputdevice::wlog;

static RUNNING: AtomicBool = AtomicBool::new(true);

extern "C" fn handle_signal(_: libc::c_int) {
    RUNNING.store(false, Ordering::SeqCst);
}

fn main() -> Result<()> {
    // Set default log level to info
    if std::env::var("RUST_LOG").is_err() {
        std::env::set_var("RUST_LOG", "info,outputdevice=debug");
    }
    // Initialize logging with standardized format
    tracing_subscriber::fmt()
        .with_timer(tracing_subscriber::fmt::time::ChronoLocal::new("%Y-%m-%d %H:%M:%S".to_string()))
        .with_ansi(false)
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let config = ServerConfig::from_args(std::env::args().skip(1))?;
    wlog!(MAIN, "Starting outputdevice server v{} (minimum v{})", config.version, config.min_version);

    unsafe {
        libc::signal(libc::SIGINT, handle_signal as libc::sighandler_t);
        libc::signal(libc::SIGTERM, handle_signal as libc::sighandler_t);
    }

    let mut compositor = Compositor::new(config.clone())?;
    let mut state = compositor.new_state();

    let mut feed: Box<dyn OutputDiscoveryFeed> = match &config.outputs_file {
        Some(path) => Box::new(FakeOutputFeed::new(path.clone())),
        None => {
            wlog!(MAIN, "No fake-output file given, starting without outputs");
            Box::new(ManualFeed::new())
        }
    };

    compositor.start()?;
    while RUNNING.load(Ordering::SeqCst) {
        compositor.poll_discovery(&mut state, feed.as_mut());
        for event in compositor.take_events() {
            tracing::debug!("{:?}", event);
        }
        compositor.dispatch(&mut state)?;
        std::thread::sleep(Duration::from_millis(5));
    }

    wlog!(MAIN, "Shutting down");
    compositor.stop(&mut state)?;
    Ok(())
}
