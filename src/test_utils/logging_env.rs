use tracing_subscriber::filter::Targets;
use tracing_subscriber::prelude::*;

// Tags events with the component that emitted them.
fn component_tag(event: &tracing::Event<'_>) -> Option<tracing_forest::Tag> {
    let target = event.metadata().target().strip_prefix("f1_tcs::")?;
    let (component, icon) = match target.split("::").next()? {
        "ascii" => ("line", '📟'),
        "ascom" => ("alpaca", '📡'),
        "server" => ("http", '🏭'),
        "test_utils" => ("stub", '🧪'),
        _ => return None,
    };

    Some(
        tracing_forest::Tag::builder()
            .prefix(component)
            .level(*event.metadata().level())
            .icon(icon)
            .build(),
    )
}

#[ctor::ctor]
fn init_test_logging() {
    tracing_subscriber::registry()
        .with(Targets::new().with_target("f1_tcs", tracing::Level::DEBUG))
        .with(tracing_forest::ForestLayer::new(
            tracing_forest::printer::TestCapturePrinter::new(),
            component_tag,
        ))
        .with(tracing_error::ErrorLayer::default())
        .init();

    if let Err(err) = color_eyre::install() {
        eprintln!("color-eyre already installed: {err}");
    }
}
