use std::io::{self, BufRead, Write};

use canvas_cli::providers;
use canvas_cli::session::Session;
use chat_canvas::logging::init_logging;
use chat_canvas::EnvConfig;

fn main() -> io::Result<()> {
    let env = EnvConfig::from_env();
    if let Err(error) = init_logging(&env) {
        eprintln!("chat-canvas: {error}");
    }

    let transport = providers::transport_from_env().map_err(io::Error::other)?;
    let profile = transport.profile();
    tracing::info!(
        transport_id = %profile.transport_id,
        model_id = %profile.model_id,
        "starting session"
    );

    let mut session = Session::new(transport, env.debug_layout);
    let mut stdout = io::stdout();
    writeln!(
        stdout,
        "chat-canvas · {} ({}) · /help for commands",
        profile.transport_id, profile.model_id
    )?;

    for line in io::stdin().lock().lines() {
        let output = session.handle_line(&line?);
        for text in &output.lines {
            writeln!(stdout, "{text}")?;
        }
        stdout.flush()?;
        if output.quit {
            break;
        }
    }

    let pending = session.controller().wait_idle();
    tracing::debug!(streams = pending.len(), "session closed");
    Ok(())
}
