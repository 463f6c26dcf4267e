use loanlens_core::LogFormat;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Filter used when `RUST_LOG` is not set.
pub fn default_filter() -> EnvFilter {
    EnvFilter::new("loanlens=debug,loanlens_capture=debug,loanlens_storage=info,info")
}

/// Initialize tracing with an `EnvFilter` and a pretty or JSON fmt layer.
pub fn init_telemetry(
    service_name: &str,
    format: LogFormat,
) -> Result<(), Box<dyn std::error::Error>> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| default_filter());
    let registry = tracing_subscriber::registry().with(filter);

    match format {
        LogFormat::Json => registry
            .with(tracing_subscriber::fmt::layer().json())
            .try_init()?,
        LogFormat::Pretty => registry
            .with(tracing_subscriber::fmt::layer().with_target(false))
            .try_init()?,
    }

    tracing::debug!(service = %service_name, format = ?format, "Telemetry initialized");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn second_init_is_an_error_not_a_panic() {
        let _ = init_telemetry("test", LogFormat::Pretty);
        assert!(init_telemetry("test", LogFormat::Json).is_err());
    }
}
