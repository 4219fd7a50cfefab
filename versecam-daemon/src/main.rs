mod config;

use anyhow::{Context, Result};
use config::Config;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{error, info};
use versecam_core::button::{wait_for_press, Press};
use versecam_core::lifecycle::{shutdown_devices, ShutdownGuard};
use versecam_core::pipeline::Pipeline;
use versecam_core::uploads::UploadStore;
use versecam_io::{Camera, GpioButton, Printer, PrinterConfig};
use versecam_neural::{DeepSeekPoet, ReplicateCaptioner};

/// Quiet period after a job before the button re-arms.
const REARM_DELAY: Duration = Duration::from_secs(1);

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .with_writer(std::io::stderr)
        .init();

    // .env is optional; the device ships one, dev machines may not.
    let _ = dotenvy::dotenv();

    let config = Config::from_env()?;
    info!(serial = %config.serial_port, "versecam starting");

    // 1. Bootstrap the filesystem collaborators.
    let uploads = UploadStore::new(&config.uploads_dir);
    uploads.ensure_dirs()?;
    std::fs::create_dir_all(&config.images_dir)
        .with_context(|| format!("creating {}", config.images_dir.display()))?;

    // 2. Claim the hardware. The printer is fatal at startup: no device,
    //    no appliance. Reset it so leftovers from a crash don't print.
    let mut printer = Printer::open(PrinterConfig {
        port: config.serial_port.clone(),
        baud_rate: config.baud_rate,
    })?;
    printer.reset();
    let printer = Arc::new(Mutex::new(printer));

    let mut button = GpioButton::open(&config.gpio_chip, config.button_line)?;

    // 3. Wire up the remote collaborators and the pipeline.
    let pipeline = Pipeline::new(
        printer.clone(),
        Arc::new(ReplicateCaptioner::new(&config.replicate_api_token)),
        Arc::new(DeepSeekPoet::new(&config.deepseek_api_key)),
        Camera::new(&config.capture_command),
        uploads,
        &config.images_dir,
    );

    // 4. One guard for both shutdown paths: long press and OS signal.
    let guard = Arc::new(ShutdownGuard::new());
    spawn_signal_handler(printer.clone(), guard.clone());

    // 5. The main loop. Strictly sequential: while a job runs, the
    //    button is not polled; while we poll, no job runs.
    info!("waiting for button presses");
    loop {
        match wait_for_press(&mut button).await {
            Press::Short => {
                if guard.is_shutting_down() {
                    break;
                }
                if let Err(e) = pipeline.run().await {
                    error!(error = %e, "job failed");
                }
                tokio::time::sleep(REARM_DELAY).await;
            }
            Press::Long => {
                info!("long press detected");
                if guard.begin() {
                    shutdown_devices(&printer).await;
                }
                break;
            }
        }
    }

    // Dropping the button handle releases the GPIO line reservation.
    drop(button);
    info!("versecam stopped");
    Ok(())
}

/// SIGTERM/SIGINT tear the device down even mid-job, then terminate
/// unconditionally; a shutdown failure is logged, never waited out.
fn spawn_signal_handler(printer: Arc<Mutex<Printer>>, guard: Arc<ShutdownGuard>) {
    use tokio::signal::unix::{signal, SignalKind};

    tokio::spawn(async move {
        let mut term = match signal(SignalKind::terminate()) {
            Ok(stream) => stream,
            Err(e) => {
                error!(error = %e, "cannot install SIGTERM handler");
                return;
            }
        };
        let mut int = match signal(SignalKind::interrupt()) {
            Ok(stream) => stream,
            Err(e) => {
                error!(error = %e, "cannot install SIGINT handler");
                return;
            }
        };

        tokio::select! {
            _ = term.recv() => info!("SIGTERM received"),
            _ = int.recv() => info!("SIGINT received"),
        }

        if guard.begin() {
            shutdown_devices(&printer).await;
        }
        std::process::exit(0);
    });
}
