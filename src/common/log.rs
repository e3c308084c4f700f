use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_tree::HierarchicalLayer;

/// Installs the global subscriber.
///
/// `RUST_LOG` wins when set; otherwise `verbose` picks between `debug` and
/// `info` for this crate.
pub fn init_logging(verbose: bool) {
    let default = if verbose { "groupwm=debug" } else { "groupwm=info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    let tree = HierarchicalLayer::new(2)
        .with_indent_lines(true)
        .with_targets(true)
        .with_writer(std::io::stderr);
    // Ignore the error if a subscriber is already installed (e.g. in tests).
    _ = tracing_subscriber::registry().with(filter).with(tree).try_init();
}
