use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_tree::HierarchicalLayer;

/// Installs the global subscriber. `RUST_LOG` takes precedence over
/// `default_filter`. Calling this twice is harmless.
pub fn init(default_filter: &str) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_filter))
        .unwrap_or_else(|_| EnvFilter::new("info"));
    let tree = HierarchicalLayer::new(2)
        .with_targets(true)
        .with_bracketed_fields(true)
        .with_writer(std::io::stderr);
    _ = tracing_subscriber::registry().with(filter).with(tree).try_init();
}
