use std::sync::Arc;

use chat_canvas::{
    compute_layout, sample_conversation, ConversationController, ConversationState,
    LayoutConfig, NodeId, Role,
};
use generation::GenerationTransport;

use crate::commands::{parse_slash_command, SlashCommand, HELP_TEXT};
use crate::outline::{render_anchors, render_tokens, render_tree, reply_text};

/// What the driver should print for one input line, and whether to stop.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionOutput {
    pub lines: Vec<String>,
    pub quit: bool,
}

impl SessionOutput {
    fn lines(lines: Vec<String>) -> Self {
        Self { lines, quit: false }
    }

    fn line(line: impl Into<String>) -> Self {
        Self::lines(vec![line.into()])
    }
}

/// Line-oriented front end over one [`ConversationController`].
///
/// Each submission waits for its stream to finish before returning, so
/// output lines always describe a settled reply.
pub struct Session {
    controller: Arc<ConversationController>,
    transport: Arc<dyn GenerationTransport>,
    layout_config: LayoutConfig,
    show_connectors: bool,
    last_assistant: Option<NodeId>,
}

impl Session {
    pub fn new(transport: Arc<dyn GenerationTransport>, show_connectors: bool) -> Self {
        let layout_config = LayoutConfig::default();
        Self {
            controller: ConversationController::with_state(
                Arc::clone(&transport),
                ConversationState::default(),
                layout_config,
            ),
            transport,
            layout_config,
            show_connectors,
            last_assistant: None,
        }
    }

    pub fn controller(&self) -> &Arc<ConversationController> {
        &self.controller
    }

    pub fn handle_line(&mut self, line: &str) -> SessionOutput {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            return SessionOutput::default();
        }

        let Some(command) = parse_slash_command(trimmed) else {
            let parent = self.default_parent();
            return self.submit(parent, trimmed, None);
        };

        match command {
            SlashCommand::Help => SessionOutput::lines(HELP_TEXT.lines().map(String::from).collect()),
            SlashCommand::Reply { parent, prompt } => self.submit(Some(parent), &prompt, None),
            SlashCommand::Branch {
                parent,
                highlight,
                prompt,
            } => self.submit(Some(parent), &prompt, Some(&highlight)),
            SlashCommand::Collapse(id) => match self.controller.toggle_collapse(&id) {
                Ok(true) => SessionOutput::line(format!("collapsed {id}")),
                Ok(false) => SessionOutput::line(format!("expanded {id}")),
                Err(error) => SessionOutput::line(format!("error: {error}")),
            },
            SlashCommand::Move { id, x, y } => match self.controller.move_node(&id, x, y) {
                Ok(()) => SessionOutput::line(format!("moved {id} to ({x}, {y})")),
                Err(error) => SessionOutput::line(format!("error: {error}")),
            },
            SlashCommand::Anchors(id) => match self.controller.branch_anchors(&id) {
                Ok(anchors) => SessionOutput::lines(render_anchors(&anchors)),
                Err(error) => SessionOutput::line(format!("error: {error}")),
            },
            SlashCommand::Tree => {
                let snapshot = self.controller.snapshot();
                let layout = compute_layout(&snapshot, &self.layout_config);
                SessionOutput::lines(render_tree(&snapshot, &layout, self.show_connectors))
            }
            SlashCommand::Tokens => {
                SessionOutput::line(render_tokens(self.controller.snapshot().tokens()))
            }
            SlashCommand::Demo => self.load_demo(),
            SlashCommand::Quit => SessionOutput {
                lines: Vec::new(),
                quit: true,
            },
            SlashCommand::Usage(usage) => SessionOutput::line(format!("usage: {usage}")),
            SlashCommand::Unknown(command) => {
                SessionOutput::line(format!("unknown command {command}; try /help"))
            }
        }
    }

    fn submit(
        &mut self,
        parent: Option<NodeId>,
        prompt: &str,
        highlight: Option<&str>,
    ) -> SessionOutput {
        let submission = match self
            .controller
            .submit_prompt(parent.as_ref(), prompt, highlight)
        {
            Ok(submission) => submission,
            Err(error) => return SessionOutput::line(format!("error: {error}")),
        };
        self.last_assistant = Some(submission.assistant_id.clone());

        let report = self.controller.join_stream(submission.stream_id);
        let content = self
            .controller
            .snapshot()
            .node(&submission.assistant_id)
            .map(|node| reply_text(&node.content))
            .unwrap_or_default();

        let mut lines: Vec<String> = content.lines().map(String::from).collect();
        let status = match report {
            Some(report) => format!(
                "[{}] {} after {} fragments",
                submission.assistant_id, report.outcome, report.fragments
            ),
            None => format!("[{}]", submission.assistant_id),
        };
        lines.push(status);
        SessionOutput::lines(lines)
    }

    fn load_demo(&mut self) -> SessionOutput {
        if !self.controller.snapshot().is_empty() {
            return SessionOutput::line("error: /demo needs an empty canvas");
        }
        match sample_conversation() {
            Ok(sample) => {
                let count = sample.len();
                self.controller = ConversationController::with_state(
                    Arc::clone(&self.transport),
                    sample,
                    self.layout_config,
                );
                self.last_assistant = None;
                SessionOutput::line(format!("loaded sample conversation ({count} nodes)"))
            }
            Err(error) => SessionOutput::line(format!("error: {error}")),
        }
    }

    /// Where a plain prompt goes: under the last reply this session created,
    /// else at the end of the main column, else as the root.
    fn default_parent(&self) -> Option<NodeId> {
        let snapshot = self.controller.snapshot();
        if let Some(last) = self
            .last_assistant
            .as_ref()
            .filter(|id| snapshot.contains(id))
        {
            return Some(last.clone());
        }

        let mut cursor = snapshot.root()?;
        while let Some(next) = snapshot.children(&cursor.id).find(|child| !child.is_branch) {
            cursor = next;
        }
        (cursor.role == Role::Assistant).then(|| cursor.id.clone())
    }
}
