use present_pen::hotkey::GlobalInput;
use present_pen::mode::dialog;
use present_pen::mode::{EngineConfig, EngineServices, EngineUpdate, ModeController};
use present_pen::{logging, settings_store};
use std::sync::mpsc::{channel, TryRecvError};
use std::time::{Duration, Instant};

const FRAME_INTERVAL: Duration = Duration::from_millis(8);

fn main() -> anyhow::Result<()> {
    let settings = settings_store::load()?;
    let log_file = settings
        .log_file
        .clone()
        .or_else(|| settings.debug_logging.then(logging::default_log_path).flatten());
    logging::init(settings.debug_logging, log_file);
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "present_pen starting");

    let services = EngineServices::system(&settings);
    let mut controller = ModeController::new(services, EngineConfig::from(&settings));
    let updates = controller.subscribe();

    let (tx, rx) = channel::<GlobalInput>();
    #[cfg(windows)]
    present_pen::hotkey::spawn_hotkey_listener(settings.hotkeys.table(), tx);
    #[cfg(not(windows))]
    {
        drop(tx);
        tracing::warn!("global hotkeys are only available on Windows");
    }

    loop {
        loop {
            match rx.try_recv() {
                Ok(input) => controller.handle_global(input),
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    controller.shutdown();
                    return Ok(());
                }
            }
        }

        controller.tick(Instant::now());

        for update in updates.try_iter() {
            if let EngineUpdate::Notice(notice) = update {
                tracing::warn!(title = %notice.title, message = %notice.message, "notice");
                dialog::offer_in_background(notice);
            }
        }

        std::thread::sleep(FRAME_INTERVAL);
    }
}
