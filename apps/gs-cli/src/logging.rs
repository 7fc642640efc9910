// logging.rs - Tracing setup and the process panic hook.
//
// Logs go to stderr so JSON results on stdout stay machine-readable.

use std::any::Any;
use std::panic;

use tracing_subscriber::EnvFilter;

use crate::LogFormat;

pub fn init_tracing(format: LogFormat) -> anyhow::Result<()> {
    let filter = EnvFilter::from_default_env()
        .add_directive("gs_batch=info".parse()?)
        .add_directive("gs_trigger=info".parse()?)
        .add_directive("gs_connectors=info".parse()?)
        .add_directive("gsb=info".parse()?);

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_ansi(false);

    match format {
        LogFormat::Text => builder.init(),
        LogFormat::Json => builder.json().init(),
    }
    Ok(())
}

/// Report panics as one error event instead of the default stderr banner.
///
/// Engine panics and panicking runs are caught and turned into failed
/// outcomes, but the hook still fires first. Routing it through tracing keeps
/// `--log-format json` output parseable.
pub fn install_panic_hook() {
    panic::set_hook(Box::new(|info| {
        let current = std::thread::current();
        let thread = current.name().unwrap_or("<unnamed>");
        let location = info
            .location()
            .map(|l| l.to_string())
            .unwrap_or_else(|| "unknown".to_string());
        tracing::error!(
            thread,
            %location,
            message = %payload_message(info.payload()),
            "thread panicked"
        );
    }));
}

fn payload_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
