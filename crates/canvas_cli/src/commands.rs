use chat_canvas::NodeId;

pub const HELP_TEXT: &str = "\
Commands:
  <text>                              reply under the latest answer (or start the conversation)
  /reply <node-id> <prompt>           continue below a node
  /branch <node-id> <excerpt> => <prompt>
                                      branch off an excerpt of a node
  /collapse <node-id>                 collapse or expand a node's subtree
  /move <node-id> <x> <y>             pin a node at canvas coordinates
  /anchors <node-id>                  show where branches attach in a node
  /tree                               print the laid-out tree
  /tokens                             print token usage
  /demo                               load the sample conversation (empty canvas only)
  /help                               show this help
  /quit                               exit";

#[derive(Debug, Clone, PartialEq)]
pub enum SlashCommand {
    Help,
    Reply {
        parent: NodeId,
        prompt: String,
    },
    Branch {
        parent: NodeId,
        highlight: String,
        prompt: String,
    },
    Collapse(NodeId),
    Move {
        id: NodeId,
        x: f64,
        y: f64,
    },
    Anchors(NodeId),
    Tree,
    Tokens,
    Demo,
    Quit,
    /// Known command with malformed arguments.
    Usage(&'static str),
    Unknown(String),
}

/// Parse `input` as a slash command. Returns `None` for plain prompts.
pub fn parse_slash_command(input: &str) -> Option<SlashCommand> {
    let trimmed = input.trim();
    if !trimmed.starts_with('/') {
        return None;
    }

    let (command, rest) = match trimmed.split_once(char::is_whitespace) {
        Some((command, rest)) => (command, rest.trim()),
        None => (trimmed, ""),
    };

    let parsed = match command {
        "/help" => SlashCommand::Help,
        "/tree" => SlashCommand::Tree,
        "/tokens" => SlashCommand::Tokens,
        "/demo" => SlashCommand::Demo,
        "/quit" | "/exit" => SlashCommand::Quit,
        "/reply" => parse_reply(rest).unwrap_or(SlashCommand::Usage("/reply <node-id> <prompt>")),
        "/branch" => parse_branch(rest)
            .unwrap_or(SlashCommand::Usage("/branch <node-id> <excerpt> => <prompt>")),
        "/collapse" => single_id(rest)
            .map(SlashCommand::Collapse)
            .unwrap_or(SlashCommand::Usage("/collapse <node-id>")),
        "/anchors" => single_id(rest)
            .map(SlashCommand::Anchors)
            .unwrap_or(SlashCommand::Usage("/anchors <node-id>")),
        "/move" => parse_move(rest).unwrap_or(SlashCommand::Usage("/move <node-id> <x> <y>")),
        _ => SlashCommand::Unknown(command.to_string()),
    };

    Some(parsed)
}

fn split_id(rest: &str) -> Option<(NodeId, &str)> {
    let (id, remainder) = match rest.split_once(char::is_whitespace) {
        Some((id, remainder)) => (id, remainder.trim()),
        None => (rest, ""),
    };
    (!id.is_empty()).then(|| (NodeId::from(id), remainder))
}

fn single_id(rest: &str) -> Option<NodeId> {
    match split_id(rest)? {
        (id, "") => Some(id),
        _ => None,
    }
}

fn parse_reply(rest: &str) -> Option<SlashCommand> {
    let (parent, prompt) = split_id(rest)?;
    (!prompt.is_empty()).then(|| SlashCommand::Reply {
        parent,
        prompt: prompt.to_string(),
    })
}

fn parse_branch(rest: &str) -> Option<SlashCommand> {
    let (parent, remainder) = split_id(rest)?;
    let (highlight, prompt) = remainder.split_once("=>")?;
    let (highlight, prompt) = (highlight.trim(), prompt.trim());
    if highlight.is_empty() || prompt.is_empty() {
        return None;
    }
    Some(SlashCommand::Branch {
        parent,
        highlight: highlight.to_string(),
        prompt: prompt.to_string(),
    })
}

fn parse_move(rest: &str) -> Option<SlashCommand> {
    let mut parts = rest.split_whitespace();
    let id = NodeId::from(parts.next()?);
    let x = parts.next()?.parse::<f64>().ok()?;
    let y = parts.next()?.parse::<f64>().ok()?;
    if parts.next().is_some() {
        return None;
    }
    Some(SlashCommand::Move { id, x, y })
}
