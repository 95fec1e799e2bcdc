use std::sync::Arc;

use rand::{SeedableRng, rngs::StdRng};
use tokio::sync::mpsc;
use tracing::{Instrument, debug, error, info, info_span, instrument, warn};

use crate::{
    chat::{ChatSurface, MessageId, PUNISHING, REWARDING, Requester, SLOW_DOWN, USAGE},
    config::Config,
    error::{CommandError, GameError, TransportError},
    logic::SessionController,
    model::client::{Command, mine_count},
    rate_limit::RateLimiter,
    registry::{SessionId, SessionRegistry},
    score::{Percentage, ScoreCounter, ScoreEvent},
    session::{Selection, Session},
};

/// The command surface shared by every chat channel.
pub struct Bot {
    config: Config,
    sessions: Arc<SessionRegistry>,
    score: Arc<ScoreCounter>,
    limiter: Arc<RateLimiter>,
}

impl Bot {
    pub fn new(config: Config) -> Self {
        let limiter = Arc::new(RateLimiter::per_minute(config.games_per_minute));
        Self {
            config,
            sessions: Arc::new(SessionRegistry::new()),
            score: Arc::new(ScoreCounter::new()),
            limiter,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn sessions(&self) -> &Arc<SessionRegistry> {
        &self.sessions
    }

    pub fn score(&self) -> &Arc<ScoreCounter> {
        &self.score
    }

    pub fn limiter(&self) -> &Arc<RateLimiter> {
        &self.limiter
    }

    /// Publishes a fresh board and spawns its interaction loop.
    #[instrument(level = "trace", skip(self, surface, requester), fields(requester = %requester))]
    pub async fn start_game(
        &self,
        surface: Arc<dyn ChatSurface>,
        requester: Requester,
        mine_count: i64,
    ) -> Result<SessionId, CommandError> {
        if mine_count < 0 {
            return Err(GameError::NegativeMineCount(mine_count).into());
        }
        let mines = usize::try_from(mine_count).unwrap_or(usize::MAX);

        if !self.limiter.check(&requester) {
            warn!("Rate limit exceeded for {}", requester);
            return Err(CommandError::RateLimited);
        }

        let mut rng = StdRng::from_rng(&mut rand::rng());
        let controller =
            SessionController::new(self.config.board, mines, self.score.clone(), &mut rng)?;

        // A reaction can arrive as soon as it is offered, so register first.
        let board = Session::publish(&controller, surface.as_ref()).await?;
        debug!("Published board {} for {}", board, requester);
        let (inputs, receiver) = mpsc::unbounded_channel();
        let id = self.sessions.register(requester.clone(), board, inputs);
        if let Err(e) = Session::attach_signals(surface.as_ref(), board).await {
            warn!("Could not offer reactions on board {}: {}", board, e);
            self.sessions.remove(&id);
            return Err(e.into());
        }

        let session = Session::new(
            controller,
            requester.clone(),
            surface,
            board,
            receiver,
            self.config.signal_timeout,
            rng,
        );

        let sessions = self.sessions.clone();
        let span = info_span!("session", id = %id, requester = %requester);
        let session_id = id.clone();
        tokio::spawn(
            async move {
                match session.run().await {
                    Ok(report) => info!(
                        "Session ended with {:?}, status {:?}, {} rewards, {} punishments",
                        report.completion,
                        report.status,
                        report.tally.rewards,
                        report.tally.punishments
                    ),
                    Err(e) => error!("Abandoning session after transport failure: {}", e),
                }
                sessions.remove(&session_id);
            }
            .instrument(span),
        );

        info!("Started session {} for {}", id, requester);
        Ok(id)
    }

    /// Records in the shared counter right away, then lets the requester's
    /// active session count it toward its own tally.
    fn record(&self, requester: &Requester, event: ScoreEvent) {
        self.score.record(event);
        if !self.sessions.route_score(requester, event) {
            debug!("No active session for {}, {:?} counted globally only", requester, event);
        }
    }

    pub async fn punish(
        &self,
        surface: &dyn ChatSurface,
        requester: &Requester,
    ) -> Result<(), CommandError> {
        self.record(requester, ScoreEvent::Punish);
        surface.send(PUNISHING).await?;
        Ok(())
    }

    pub async fn reward(
        &self,
        surface: &dyn ChatSurface,
        requester: &Requester,
    ) -> Result<(), CommandError> {
        self.record(requester, ScoreEvent::Reward);
        surface.send(REWARDING).await?;
        Ok(())
    }

    pub async fn stats(&self, surface: &dyn ChatSurface) -> Result<Percentage, CommandError> {
        let percentage = self.score.percentage();
        surface.send(&percentage.to_string()).await?;
        Ok(percentage)
    }

    /// Hands a reaction to the session that published `message`.
    pub fn react(&self, message: MessageId, selection: Selection) -> bool {
        self.sessions.deliver(message, selection)
    }

    /// Runs a command, answering rejected input in the channel. Only
    /// transport failures reach the caller.
    pub async fn dispatch(
        &self,
        surface: Arc<dyn ChatSurface>,
        requester: Requester,
        command: Command,
    ) -> Result<(), TransportError> {
        debug!("Dispatching {:?} from {}", command, requester);
        let result = match command {
            Command::StartGame { bombs } => match mine_count(&bombs) {
                Ok(mines) => self
                    .start_game(surface.clone(), requester, mines)
                    .await
                    .map(|_| ()),
                Err(e) => Err(e.into()),
            },
            Command::Punish => self.punish(surface.as_ref(), &requester).await,
            Command::Reward => self.reward(surface.as_ref(), &requester).await,
            Command::Stats => self.stats(surface.as_ref()).await.map(|_| ()),
        };

        match result {
            Ok(()) => Ok(()),
            Err(CommandError::Game(e)) => {
                debug!("Rejected command: {}", e);
                surface.send(&format!("{e}\n{USAGE}")).await?;
                Ok(())
            }
            Err(CommandError::RateLimited) => {
                surface.send(SLOW_DOWN).await?;
                Ok(())
            }
            Err(CommandError::Transport(e)) => Err(e),
        }
    }
}
