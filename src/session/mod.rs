use std::{sync::Arc, time::Duration};

use rand::rngs::StdRng;
use tokio::{
    sync::mpsc,
    time::{self, Instant},
};
use tracing::{debug, info, instrument};

use crate::{
    chat::{
        ABORT_PUNISHING, BOARD_CLEARED, ChatSurface, GAME_LOST, MessageId, NEW_BOARD, REWARDING,
        Requester, SUGGESTING, TIMES_UP, board_message,
    },
    error::TransportError,
    logic::{SessionController, Status},
    score::{ScoreEvent, Tally},
};

/// The two reactions that drive a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Signal {
    Proceed,
    Abort,
}

impl Signal {
    pub const ALL: [Signal; 2] = [Signal::Proceed, Signal::Abort];

    pub const fn reaction(self) -> &'static str {
        match self {
            Signal::Proceed => "✅",
            Signal::Abort => "❌",
        }
    }

    pub fn from_reaction(reaction: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|signal| signal.reaction() == reaction)
    }
}

/// A reaction on the session's board, as delivered by the surface.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selection {
    pub requester: Requester,
    pub reaction: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionInput {
    Selection(Selection),
    /// A reward or punishment the shared counter has already recorded.
    Score(ScoreEvent),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Completion {
    /// The game reached a terminal status on its own.
    Advanced,
    Lost,
    TimedOut,
    /// Nothing can reach the session any more.
    Disconnected,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionReport {
    pub completion: Completion,
    pub status: Status,
    pub tally: Tally,
}

enum Wait {
    Signal(Signal),
    TimedOut,
    Disconnected,
}

pub struct Session {
    controller: SessionController,
    requester: Requester,
    surface: Arc<dyn ChatSurface>,
    board_message: MessageId,
    inputs: mpsc::UnboundedReceiver<SessionInput>,
    timeout: Duration,
    rng: StdRng,
}

impl Session {
    /// Posts the hidden board without any reactions.
    pub async fn publish(
        controller: &SessionController,
        surface: &dyn ChatSurface,
    ) -> Result<MessageId, TransportError> {
        let content = board_message(NEW_BOARD, &controller.board().render(false));
        surface.send(&content).await
    }

    /// Offers the proceed and abort reactions on a published board.
    pub async fn attach_signals(
        surface: &dyn ChatSurface,
        board_message: MessageId,
    ) -> Result<(), TransportError> {
        surface
            .add_reactions(board_message, &Signal::ALL.map(Signal::reaction))
            .await
    }

    /// Wraps a board that is already published.
    pub fn new(
        controller: SessionController,
        requester: Requester,
        surface: Arc<dyn ChatSurface>,
        board_message: MessageId,
        inputs: mpsc::UnboundedReceiver<SessionInput>,
        timeout: Duration,
        rng: StdRng,
    ) -> Self {
        Self {
            controller,
            requester,
            surface,
            board_message,
            inputs,
            timeout,
            rng,
        }
    }

    /// Publishes the hidden board with both reactions attached.
    #[instrument(level = "trace", skip_all, fields(requester = %requester))]
    pub async fn open(
        controller: SessionController,
        requester: Requester,
        surface: Arc<dyn ChatSurface>,
        inputs: mpsc::UnboundedReceiver<SessionInput>,
        timeout: Duration,
        rng: StdRng,
    ) -> Result<Self, TransportError> {
        let board_message = Self::publish(&controller, surface.as_ref()).await?;
        Self::attach_signals(surface.as_ref(), board_message).await?;
        debug!("Published board {} for {}", board_message, requester);

        Ok(Self::new(
            controller,
            requester,
            surface,
            board_message,
            inputs,
            timeout,
            rng,
        ))
    }

    pub fn board_message(&self) -> MessageId {
        self.board_message
    }

    pub fn controller(&self) -> &SessionController {
        &self.controller
    }

    /// Waits for the requester's next signal. Foreign or unknown reactions
    /// and score events are consumed without moving the deadline.
    async fn wait(&mut self) -> Wait {
        let deadline = Instant::now() + self.timeout;

        loop {
            let input = match time::timeout_at(deadline, self.inputs.recv()).await {
                Err(_) => return Wait::TimedOut,
                Ok(None) => return Wait::Disconnected,
                Ok(Some(input)) => input,
            };

            match input {
                SessionInput::Score(event) => {
                    debug!("Counting {:?} toward session", event);
                    self.controller.count(event);
                }
                SessionInput::Selection(selection) if selection.requester != self.requester => {
                    debug!(
                        "Ignoring reaction {} from {}",
                        selection.reaction, selection.requester
                    );
                }
                SessionInput::Selection(selection) => {
                    match Signal::from_reaction(&selection.reaction) {
                        Some(signal) => return Wait::Signal(signal),
                        None => debug!("Ignoring unknown reaction {}", selection.reaction),
                    }
                }
            }
        }
    }

    async fn publish_board(&self, heading: &str) -> Result<(), TransportError> {
        let board = self.controller.board().render(true);
        self.surface
            .edit(self.board_message, &board_message(heading, &board))
            .await
    }

    async fn drive(&mut self) -> Result<Completion, TransportError> {
        loop {
            if self.controller.status() != Status::InProgress {
                return Ok(Completion::Advanced);
            }

            match self.wait().await {
                Wait::Signal(Signal::Proceed) => {
                    self.controller.reveal_safe_cells(&mut self.rng);
                    if self.controller.settle() == Status::Won {
                        self.publish_board(BOARD_CLEARED).await?;
                        self.surface.send(REWARDING).await?;
                    } else {
                        self.publish_board(SUGGESTING).await?;
                    }
                }
                Wait::Signal(Signal::Abort) => {
                    self.controller.declare_loss();
                    self.publish_board(GAME_LOST).await?;
                    self.surface.send(ABORT_PUNISHING).await?;
                    return Ok(Completion::Lost);
                }
                Wait::TimedOut => {
                    self.surface.send(TIMES_UP).await?;
                    return Ok(Completion::TimedOut);
                }
                Wait::Disconnected => {
                    debug!("Session inputs closed");
                    return Ok(Completion::Disconnected);
                }
            }
        }
    }

    /// Drives the game until it is lost, won, abandoned or times out.
    pub async fn run(mut self) -> Result<SessionReport, TransportError> {
        let outcome = self.drive().await;

        // Score events queued before the channel closed still count.
        self.inputs.close();
        while let Ok(input) = self.inputs.try_recv() {
            if let SessionInput::Score(event) = input {
                self.controller.count(event);
            }
        }

        let completion = outcome?;
        info!("Session for {} finished: {:?}", self.requester, completion);

        Ok(SessionReport {
            completion,
            status: self.controller.status(),
            tally: self.controller.tally(),
        })
    }
}
