//! Dataview - Main Entry Point
//!
//! Runs a viewer session against an in-process data source that answers on
//! a tokio task with uneven delays, scrolling through the table page by page.
//! `--schema` prints the JSON schema of the wire protocol instead.

use std::sync::Arc;
use std::time::Duration;

use dataview::components::data_table::PagedDataProvider;
use dataview::config::ViewerConfig;
use dataview::constants::LOG_FILE_PREFIX;
use dataview::domain::{
    CellValue, Column, DataSet, Fragment, InboundMessage, OutboundMessage, protocol_schema,
};
use dataview::error::Error;
use dataview::helpers::get_or_create_data_dir;
use dataview::services::{DataSession, DataSource, PageFetch, TokioTransport};
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

const DEMO_ROWS: usize = 950;
const VIEWPORT_HEIGHT: f32 = 480.0;

fn init_tracing() -> Option<WorkerGuard> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let registry = tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer());

    match get_or_create_data_dir() {
        Ok(data_dir) => {
            let appender = tracing_appender::rolling::daily(data_dir.join("logs"), LOG_FILE_PREFIX);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            registry
                .with(
                    tracing_subscriber::fmt::layer()
                        .with_ansi(false)
                        .with_writer(writer),
                )
                .init();
            Some(guard)
        }
        Err(e) => {
            registry.init();
            tracing::warn!("File logging disabled: {}", e);
            None
        }
    }
}

fn demo_dataset(rows: usize) -> DataSet {
    let ids = (0..rows as i64).map(CellValue::from).collect();
    let names = (0..rows).map(|i| CellValue::from(format!("row {i}"))).collect();
    let values = (0..rows).map(|i| CellValue::from(i as f64 * 0.5)).collect();
    DataSet::new(
        "Demo",
        vec![
            Column::new("id", ids).with_type("int"),
            Column::new("name", names).with_type("string"),
            Column::new("value", values).with_type("float"),
        ],
    )
}

/// Answer every request after a delay that depends on its start row
async fn serve(
    source: Arc<DataSource>,
    dataset_id: String,
    mut requests: UnboundedReceiver<OutboundMessage>,
    replies: UnboundedSender<InboundMessage>,
) {
    while let Some(request) = requests.recv().await {
        let reply = source.receive_message(&dataset_id, &request);
        let delay = Duration::from_millis(5 + (request.start_row as u64 / 100 % 3) * 20);
        let replies = replies.clone();
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let _ = replies.send(reply);
        });
    }
    tracing::info!("Data source stopped");
}

/// Feed inbound messages to the session until `fetch` resolves
async fn drive(
    session: &mut DataSession,
    inbound: &mut UnboundedReceiver<InboundMessage>,
    mut fetch: PageFetch,
) -> Result<Fragment, Error> {
    loop {
        tokio::select! {
            result = &mut fetch => return result,
            message = inbound.recv() => match message {
                Some(message) => {
                    session.on_message(message);
                }
                None => {
                    return Err(Error::Transport {
                        message: "inbound channel closed".to_string(),
                    });
                }
            },
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _guard = init_tracing();

    if std::env::args().any(|arg| arg == "--schema") {
        println!("{}", serde_json::to_string_pretty(&protocol_schema())?);
        return Ok(());
    }

    let config = match ViewerConfig::load_or_init().await {
        Ok(config) => config,
        Err(e) => {
            tracing::warn!("Using default viewer config: {}", e);
            ViewerConfig::default()
        }
    };
    tracing::info!("Starting dataview with {:?}", config);

    let mut source = DataSource::new();
    let dataset_id = source.register_dataset(demo_dataset(DEMO_ROWS));
    let source = Arc::new(source);

    let (transport, requests) = TokioTransport::pair();
    let (replies, mut inbound) = tokio::sync::mpsc::unbounded_channel();
    let server = tokio::spawn(serve(source, dataset_id.clone(), requests, replies));

    let mut session = DataSession::new(dataset_id.as_str(), Arc::new(transport), &config);
    let events = session.events();

    if let Some(open) = session.open() {
        let first = drive(&mut session, &mut inbound, open).await?;
        tracing::info!("Handshake delivered {} rows", first.len());
    }

    let page_height = config.page_size as f32 * config.row_height;
    let mut scroll_top = 0.0;
    while scroll_top <= DEMO_ROWS as f32 * config.row_height {
        let tick = session.on_scroll(config.geometry(scroll_top, VIEWPORT_HEIGHT));
        tracing::info!(
            "Scrolled to {:.0}px: target page {}, planned {:?}",
            scroll_top,
            tick.plan.target_page,
            tick.plan.pages
        );
        for (page, fetch) in tick.fetches {
            if !fetch.is_waiting() {
                continue;
            }
            match drive(&mut session, &mut inbound, fetch).await {
                Ok(fragment) => tracing::info!("Page {} ready ({} rows)", page, fragment.len()),
                Err(e) => tracing::warn!("Page {} failed: {}", page, e),
            }
        }
        scroll_top += page_height * 0.75;
    }

    // Let late replies to backfill requests land before tearing down
    while session.coordinator().in_flight() > 0 {
        match tokio::time::timeout(config.request_timeout(), inbound.recv()).await {
            Ok(Some(message)) => {
                session.on_message(message);
            }
            _ => break,
        }
    }

    let store = session.store();
    let window = config
        .geometry(DEMO_ROWS as f32 * config.row_height, VIEWPORT_HEIGHT)
        .render_window(store.len());
    let placeholders = store
        .row_slots(window.rows.clone())
        .iter()
        .filter(|slot| slot.is_placeholder())
        .count();
    tracing::info!(
        "Loaded {} of {} rows; last window {:?} has {} placeholders",
        store.loaded_row_count(),
        store.row_count(),
        window.rows,
        placeholders
    );
    if let Some(last) = store.row(store.row_count().saturating_sub(1)) {
        let cells: Vec<String> = last.iter().map(CellValue::display).collect();
        tracing::info!("Last row: {}", cells.join(" | "));
    }

    session.dispose();
    for event in events.try_iter() {
        tracing::debug!("Event: {:?}", event);
    }
    drop(session);
    server.await?;

    Ok(())
}
