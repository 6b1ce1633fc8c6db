//! Logging and optional trace export.
//!
//! Logs go to stdout, pretty or as JSON lines. When
//! `OTEL_EXPORTER_OTLP_ENDPOINT` is set, spans are also exported over OTLP/gRPC;
//! `https://` endpoints are verified against the system roots.

use anyhow::{Context, Result, bail};
use once_cell::sync::OnceCell;
use opentelemetry::{KeyValue, global, trace::TracerProvider as _};
use opentelemetry_otlp::{WithExportConfig, WithTonicConfig, tonic_types::transport::ClientTlsConfig};
use opentelemetry_sdk::{
    Resource,
    propagation::TraceContextPropagator,
    trace::{SdkTracerProvider, Tracer},
};
use std::{env::var, fmt, str::FromStr, time::Duration};
use tracing::{Level, debug, warn};
use tracing_subscriber::{EnvFilter, Registry, fmt as log_fmt, layer::SubscriberExt};
use ulid::Ulid;
use url::Url;

const OTLP_ENDPOINT_ENV: &str = "OTEL_EXPORTER_OTLP_ENDPOINT";
const EXPORT_TIMEOUT: Duration = Duration::from_secs(3);

static TRACER_PROVIDER: OnceCell<SdkTracerProvider> = OnceCell::new();

/// How log lines are rendered.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pretty" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            other => Err(format!("unknown log format '{other}', expected pretty or json")),
        }
    }
}

impl fmt::Display for LogFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Pretty => "pretty",
            Self::Json => "json",
        })
    }
}

/// Where spans are exported and, for `https`, the name to verify.
#[derive(Debug, PartialEq, Eq)]
struct OtlpTarget {
    endpoint: String,
    tls_domain: Option<String>,
}

/// Parse the collector endpoint. A bare `host:port` means plain `http`.
fn otlp_target(raw: &str) -> Result<OtlpTarget> {
    let raw = raw.trim();
    let with_scheme = if raw.contains("://") {
        raw.to_string()
    } else {
        format!("http://{raw}")
    };
    let url = Url::parse(&with_scheme)
        .with_context(|| format!("invalid {OTLP_ENDPOINT_ENV} '{raw}'"))?;

    let tls_domain = match url.scheme() {
        "http" => None,
        "https" => Some(
            url.host_str()
                .context("https collector endpoint without a host")?
                .to_string(),
        ),
        scheme => bail!("unsupported {OTLP_ENDPOINT_ENV} scheme '{scheme}'"),
    };

    Ok(OtlpTarget {
        endpoint: url.as_str().trim_end_matches('/').to_string(),
        tls_domain,
    })
}

fn init_tracer(target: OtlpTarget) -> Result<Tracer> {
    let mut exporter = opentelemetry_otlp::SpanExporter::builder()
        .with_tonic()
        .with_endpoint(&target.endpoint)
        .with_timeout(EXPORT_TIMEOUT);
    if let Some(domain) = target.tls_domain {
        exporter = exporter.with_tls_config(
            ClientTlsConfig::new()
                .domain_name(domain)
                .with_native_roots(),
        );
    }
    let exporter = exporter
        .build()
        .with_context(|| format!("failed to build span exporter for {}", target.endpoint))?;

    let instance_id = var("OTEL_SERVICE_INSTANCE_ID").unwrap_or_else(|_| Ulid::new().to_string());
    let provider = SdkTracerProvider::builder()
        .with_batch_exporter(exporter)
        .with_resource(
            Resource::builder_empty()
                .with_attributes([
                    KeyValue::new("service.name", env!("CARGO_PKG_NAME")),
                    KeyValue::new("service.version", env!("CARGO_PKG_VERSION")),
                    KeyValue::new("service.instance.id", instance_id),
                    KeyValue::new("vcs.revision", crate::GIT_COMMIT_HASH),
                ])
                .build(),
        )
        .build();

    if TRACER_PROVIDER.set(provider.clone()).is_err() {
        warn!("tracer provider already installed");
    }
    global::set_tracer_provider(provider.clone());
    global::set_text_map_propagator(TraceContextPropagator::new());

    debug!("exporting spans to {}", target.endpoint);
    Ok(provider.tracer(env!("CARGO_PKG_NAME")))
}

/// Default level from `-v`, overridable with `RUST_LOG`. Database and
/// directory clients stay quiet unless asked.
fn env_filter(verbosity_level: Option<Level>) -> Result<EnvFilter> {
    Ok(EnvFilter::builder()
        .with_default_directive(verbosity_level.unwrap_or(Level::ERROR).into())
        .from_env_lossy()
        .add_directive("sqlx=warn".parse()?)
        .add_directive("ldap3=warn".parse()?)
        .add_directive("opentelemetry_sdk=warn".parse()?))
}

/// Install the global subscriber.
///
/// # Errors
///
/// Returns an error if the collector endpoint is invalid, the exporter cannot
/// be built, or a subscriber is already installed.
pub fn init(verbosity_level: Option<Level>, format: LogFormat) -> Result<()> {
    let tracer = match var(OTLP_ENDPOINT_ENV) {
        Ok(raw) => Some(init_tracer(otlp_target(&raw)?)?),
        Err(_) => None,
    };

    let pretty = (format == LogFormat::Pretty).then(|| {
        log_fmt::layer()
            .with_target(false)
            .with_file(false)
            .with_line_number(false)
            .pretty()
    });
    let json = (format == LogFormat::Json).then(|| {
        log_fmt::layer()
            .json()
            .with_current_span(true)
            .with_span_list(false)
    });
    let otel = tracer.map(|tracer| tracing_opentelemetry::layer().with_tracer(tracer));

    let subscriber = Registry::default()
        .with(env_filter(verbosity_level)?)
        .with(pretty)
        .with(json)
        .with(otel);
    tracing::subscriber::set_global_default(subscriber)?;

    Ok(())
}

/// Flush and stop the exporter, if one was installed.
pub fn shutdown_tracer() {
    if let Some(provider) = TRACER_PROVIDER.get() {
        if let Err(err) = provider.shutdown() {
            warn!("tracer provider shutdown failed: {err}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bare_host_port_is_plain_http() -> Result<()> {
        assert_eq!(
            otlp_target("localhost:4317")?,
            OtlpTarget {
                endpoint: "http://localhost:4317".to_string(),
                tls_domain: None,
            }
        );
        Ok(())
    }

    #[test]
    fn https_endpoint_verifies_host() -> Result<()> {
        assert_eq!(
            otlp_target(" https://otel.example.org:4317/ ")?,
            OtlpTarget {
                endpoint: "https://otel.example.org:4317".to_string(),
                tls_domain: Some("otel.example.org".to_string()),
            }
        );
        Ok(())
    }

    #[test]
    fn other_schemes_are_rejected() {
        assert!(otlp_target("udp://collector:4317").is_err());
        assert!(otlp_target("http://").is_err());
    }

    #[test]
    fn log_format_parses() {
        assert_eq!("JSON".parse::<LogFormat>(), Ok(LogFormat::Json));
        assert_eq!("pretty".parse::<LogFormat>(), Ok(LogFormat::Pretty));
        assert!("xml".parse::<LogFormat>().is_err());
        assert_eq!(LogFormat::Json.to_string(), "json");
    }

    #[test]
    fn filter_accepts_every_level() -> Result<()> {
        for level in [None, Some(Level::WARN), Some(Level::TRACE)] {
            env_filter(level)?;
        }
        Ok(())
    }

    #[test]
    fn shutdown_without_exporter_is_a_noop() {
        shutdown_tracer();
    }
}
