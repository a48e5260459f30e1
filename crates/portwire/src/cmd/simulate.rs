use std::time::Duration;

use portwire_activity::{
    with_timeout, ActivityHost, ActivityIframePort, ActivityPortDef, PortError,
};
use portwire_codec::{EntitlementsRequest, Message, SkuSelectedResponse};
use portwire_transport::{MemoryIframe, MemoryWindow};
use serde_json::json;
use tokio::sync::mpsc;

use crate::cmd::SimulateArgs;
use crate::exit::{io_error, port_error, CliError, CliResult, SUCCESS, USAGE};
use crate::output::{print_transcript, OutputFormat, TranscriptStep};

const PAGE_ORIGIN: &str = "https://publisher.example";
const ACTIVITY_ORIGIN: &str = "https://activity.example";

pub fn run(args: SimulateArgs, format: OutputFormat) -> CliResult<i32> {
    let limit = parse_duration(&args.timeout)?;
    if args.height == 0 || args.max_height == 0 {
        return Err(CliError::new(USAGE, "heights must be greater than zero"));
    }

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|err| io_error("failed starting runtime", err))?;
    let steps = runtime
        .block_on(with_timeout(limit, session(args.height, args.max_height)))
        .map_err(|err| port_error("simulation failed", err))?;

    print_transcript(&steps, format);
    Ok(SUCCESS)
}

/// Drive a page and an activity through one full iframe session.
async fn session(height: u32, max_height: u32) -> portwire_activity::Result<Vec<TranscriptStep>> {
    let mut steps = Vec::new();

    let page = MemoryWindow::new(PAGE_ORIGIN);
    let iframe = MemoryIframe::new(PAGE_ORIGIN, ACTIVITY_ORIGIN);
    iframe.attach();

    let port = ActivityIframePort::new(
        page.clone(),
        iframe.clone(),
        &format!("{ACTIVITY_ORIGIN}/offers"),
        Some(json!({ "skus": ["basic", "premium"] })),
    )?;
    let host = ActivityHost::new(iframe.frame(), page.handle_for(ACTIVITY_ORIGIN));

    // The port must be listening before the host announces itself.
    let (connected, activity_args) = tokio::join!(port.connect(), host.connect());
    connected?;
    let activity_args = activity_args?;
    steps.push(TranscriptStep::new("page", "connect", format!("loaded {}", port.url())));
    steps.push(TranscriptStep::new("activity", "start", activity_args.to_string()));

    host.ready()?;
    port.when_ready().await?;
    steps.push(TranscriptStep::new("activity", "ready", "rendered"));

    let (resize_tx, mut resize_rx) = mpsc::unbounded_channel();
    port.on_resize_request(move |requested| {
        let _ = resize_tx.send(requested);
    });
    let (complete_tx, mut complete_rx) = mpsc::unbounded_channel();
    host.on_resize_complete(move |allowed, requested, overflow| {
        let _ = complete_tx.send((allowed, requested, overflow));
    });

    host.request_resize(height)?;
    let requested = resize_rx.recv().await.ok_or(PortError::Closed)?;
    steps.push(TranscriptStep::new("activity", "resize", format!("{requested}px")));

    let granted = requested.min(max_height);
    iframe.set_offset_height(granted);
    port.resized()?;
    let (allowed, requested, overflow) = complete_rx.recv().await.ok_or(PortError::Closed)?;
    steps.push(TranscriptStep::new(
        "page",
        "resized",
        format!("{allowed}px of {requested}px, overflow={overflow}"),
    ));

    let (request_tx, mut request_rx) = mpsc::unbounded_channel();
    host.on_request(move |message| {
        let _ = request_tx.send(message);
    });
    port.execute(&EntitlementsRequest {
        token: Some("simulated-token".to_string()),
        is_user_registered: Some(true),
        ..Default::default()
    })?;
    let request = request_rx.recv().await.ok_or(PortError::Closed)?;
    steps.push(TranscriptStep::new(
        "activity",
        "request",
        request.to_value().to_string(),
    ));

    let (response_tx, mut response_rx) = mpsc::unbounded_channel();
    port.on::<SkuSelectedResponse, _>(move |response| {
        let _ = response_tx.send(response);
    })?;
    host.respond(&SkuSelectedResponse {
        sku: Some("basic".to_string()),
        one_time: Some(false),
        ..Default::default()
    })?;
    let response = response_rx.recv().await.ok_or(PortError::Closed)?;
    steps.push(TranscriptStep::new(
        "page",
        "response",
        response.to_value().to_string(),
    ));

    host.result(json!({ "sku": "basic" }))?;
    let result = port.accept_result().await?;
    let data = result
        .data
        .as_ref()
        .map_or_else(|| "null".to_string(), ToString::to_string);
    steps.push(TranscriptStep::new(
        "page",
        "result",
        format!("{} from {} data={data}", result.code, result.origin),
    ));

    host.when_closed().await;
    steps.push(TranscriptStep::new("activity", "close", "channel closed"));

    Ok(steps)
}

fn parse_duration(input: &str) -> CliResult<Duration> {
    let input = input.trim();
    if input.is_empty() {
        return Err(CliError::new(USAGE, "duration must not be empty"));
    }

    let (number, millis) = if let Some(num) = input.strip_suffix("ms") {
        (num, true)
    } else if let Some(num) = input.strip_suffix('s') {
        (num, false)
    } else {
        (input, false)
    };

    let value: u64 = number
        .parse()
        .map_err(|_| CliError::new(USAGE, format!("invalid duration value: {input}")))?;
    if value == 0 {
        return Err(CliError::new(USAGE, "duration must be greater than zero"));
    }

    Ok(if millis {
        Duration::from_millis(value)
    } else {
        Duration::from_secs(value)
    })
}
