#[cfg(target_arch = "wasm32")]
fn main() {}

#[cfg(not(target_arch = "wasm32"))]
use block_shuffle::{
    render, Cell, ClientConfig, ClientError, ConnectionPhase, Effect, Input, MovePolicy, Session, Timer,
    DEFAULT_SERVER_URL,
};
#[cfg(not(target_arch = "wasm32"))]
use clap::Parser;
#[cfg(not(target_arch = "wasm32"))]
use futures::{SinkExt, StreamExt};
#[cfg(not(target_arch = "wasm32"))]
use simple_logger::SimpleLogger;
#[cfg(not(target_arch = "wasm32"))]
use std::time::Duration;
#[cfg(not(target_arch = "wasm32"))]
use tokio::io::{AsyncBufReadExt, BufReader};
#[cfg(not(target_arch = "wasm32"))]
use tokio_tungstenite::{connect_async, tungstenite::Message};

/// Plays Block Shuffle from a terminal. Type a cell (`B3`) to select it, a
/// pair (`B3 B4`) to select both, or `quit`.
#[cfg(not(target_arch = "wasm32"))]
#[derive(Parser, Debug, Clone)]
struct Opts {
    /// Game server websocket address
    #[arg(long, default_value = DEFAULT_SERVER_URL)]
    server: String,
    /// How a selected pair becomes a move: eager, confirm or optimistic
    #[arg(long, default_value = "eager")]
    policy: MovePolicy,
    /// Milliseconds to wait for the final result after the last move (0 waits forever)
    #[arg(long, default_value_t = 10_000)]
    result_timeout_ms: u32,
    /// Diagnostics level
    #[arg(long, default_value = "warn")]
    log_level: log::LevelFilter,
}

#[cfg(not(target_arch = "wasm32"))]
const HELP: &str = "commands: <cell> (e.g. B3), <cell> <cell> (e.g. B3 B4), quit";

#[cfg(not(target_arch = "wasm32"))]
#[derive(Debug, PartialEq)]
enum Command {
    Inputs(Vec<Input>),
    Help,
}

#[cfg(not(target_arch = "wasm32"))]
fn parse_command(line: &str) -> Result<Command, ClientError> {
    let line = line.trim();
    match line.to_ascii_lowercase().as_str() {
        "quit" | "exit" | "q" => return Ok(Command::Inputs(vec![Input::Quit])),
        "help" | "?" => return Ok(Command::Help),
        _ => {}
    }
    let clicks = line
        .split_whitespace()
        .map(|token| Cell::parse(token).map(Input::Click))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(Command::Inputs(clicks))
}

#[cfg(not(target_arch = "wasm32"))]
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let opts = Opts::parse();
    SimpleLogger::new().with_level(opts.log_level).init()?;

    let config = ClientConfig {
        server_url: opts.server.clone(),
        policy: opts.policy,
        result_timeout_ms: (opts.result_timeout_ms > 0).then_some(opts.result_timeout_ms),
        ..ClientConfig::default()
    };
    let mut session = Session::new(config);
    let mut last_frame = String::new();
    draw(&session, &mut last_frame);

    let ws_stream = match connect_async(opts.server.as_str()).await {
        Ok((ws, _)) => ws,
        Err(e) => {
            session.handle(Input::Failed(e.to_string()));
            draw(&session, &mut last_frame);
            return Err(e.into());
        }
    };
    let (mut ws_tx, mut ws_rx) = ws_stream.split();
    let (timer_tx, mut timer_rx) = tokio::sync::mpsc::unbounded_channel::<Timer>();
    let mut stdin = BufReader::new(tokio::io::stdin()).lines();
    let mut pending = vec![Input::Opened];
    println!("{}", HELP);

    loop {
        let mut quit = false;
        for input in pending.drain(..) {
            for effect in session.handle(input) {
                match effect {
                    Effect::Send(msg) => {
                        if let Err(e) = ws_tx.send(Message::Text(msg.encode())).await {
                            log::warn!("send failed: {}", e);
                        }
                    }
                    Effect::Schedule { delay_ms, timer } => {
                        let timer_tx = timer_tx.clone();
                        tokio::spawn(async move {
                            tokio::time::sleep(Duration::from_millis(delay_ms as u64)).await;
                            if let Err(e) = timer_tx.send(timer) {
                                log::debug!("timer fired after shutdown: {:?}", e.0);
                            }
                        });
                    }
                    Effect::Reload => quit = true,
                }
            }
        }
        draw(&session, &mut last_frame);
        if quit {
            let _ = ws_tx.close().await;
            break;
        }
        if session.connection() == ConnectionPhase::Closed {
            break;
        }

        tokio::select! {
            msg = ws_rx.next() => match msg {
                Some(Ok(Message::Text(text))) => pending.push(Input::Frame(text)),
                Some(Ok(Message::Close(_))) | None => pending.push(Input::Closed),
                Some(Ok(_)) => {}
                Some(Err(e)) => pending.push(Input::Failed(e.to_string())),
            },
            Some(timer) = timer_rx.recv() => pending.push(Input::Timer(timer)),
            line = stdin.next_line() => match line? {
                Some(line) => match parse_command(&line) {
                    Ok(Command::Inputs(inputs)) => pending.extend(inputs),
                    Ok(Command::Help) => println!("{}", HELP),
                    Err(e) => println!("{}", e),
                },
                None => pending.push(Input::Quit),
            },
        }
    }
    Ok(())
}

#[cfg(not(target_arch = "wasm32"))]
fn draw(session: &Session, last_frame: &mut String) {
    let frame = render(session).to_text();
    if frame != *last_frame {
        println!("{}", frame);
        *last_frame = frame;
    }
}
