use std::cmp;
use std::time::Duration;

use tokio::time::sleep;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::core::{
    Config, EndpointConfig, Error, Hz, Result, Side, MAX_REPLY_BYTES, MIN_POLL_INTERVAL_MS,
};
use crate::network::Connection;
use crate::protocol::{
    encode_get_frequency, encode_set_frequency, is_set_acknowledged, parse_frequency,
};
use super::tracker::ChangeTracker;

/// One side of the sync pair: its address plus the exclusively-owned
/// connection handle, present only while a session is live
struct Endpoint {
    config: EndpointConfig,
    conn: Option<Connection>,
}

impl Endpoint {
    fn new(config: EndpointConfig) -> Self {
        Endpoint { config, conn: None }
    }

    fn is_connected(&self) -> bool {
        self.conn.is_some()
    }

    async fn connect(&mut self, io_timeout: Duration) -> Result<()> {
        if self.conn.is_none() {
            self.conn = Some(
                Connection::connect(
                    &self.config.host,
                    self.config.port,
                    &self.config.name,
                    io_timeout,
                )
                .await?,
            );
        }
        Ok(())
    }

    async fn disconnect(&mut self) {
        if let Some(conn) = self.conn.take() {
            conn.close().await;
        }
    }

    fn conn_mut(&mut self) -> Result<&mut Connection> {
        let name = &self.config.name;
        match self.conn.as_mut() {
            Some(conn) => Ok(conn),
            None => Err(Error::unexpected(format!("{}: not connected", name))),
        }
    }

    /// Queries the current frequency. An unparseable reply surfaces as
    /// [`Error::Parse`]; the engine decides how to ride it out.
    async fn query_frequency(&mut self) -> Result<Hz> {
        let name = self.config.name.clone();
        let conn = self.conn_mut()?;
        conn.send_line(&encode_get_frequency()).await?;
        let reply = conn.receive_line(MAX_REPLY_BYTES).await?;
        parse_frequency(&reply).ok_or_else(|| {
            Error::parse(format!(
                "{}: could not parse frequency from '{}'",
                name,
                reply.trim()
            ))
        })
    }

    /// Pushes a frequency. A non-acknowledgment surfaces as [`Error::Ack`];
    /// the engine logs it and lets the next tick's comparison supersede it.
    async fn set_frequency(&mut self, freq: Hz) -> Result<()> {
        let name = self.config.name.clone();
        let conn = self.conn_mut()?;
        conn.send_line(&encode_set_frequency(freq)).await?;
        let reply = conn.receive_line(MAX_REPLY_BYTES).await?;
        if !is_set_acknowledged(&reply) {
            return Err(Error::ack(format!(
                "{}: set freq not acknowledged: '{}'",
                name,
                reply.trim()
            )));
        }
        Ok(())
    }
}

/// Demotes a parse failure to "no reading this tick"; everything else
/// propagates to the engine's failure dispatch
fn reading(result: Result<Hz>) -> Result<Option<Hz>> {
    match result {
        Ok(freq) => Ok(Some(freq)),
        Err(e @ Error::Parse(_)) => {
            warn!("{}", e);
            Ok(None)
        }
        Err(e) => Err(e),
    }
}

/// The driving loop: keeps both endpoints connected, polls each for its
/// current frequency, and pushes the most-recently-changed value across
/// whenever the two sides diverge by at least the change threshold.
///
/// States: disconnected -> connecting -> polling, with every recoverable
/// failure funnelling back to disconnected after a backoff. Cancelling the
/// token is the only way out; in-flight I/O is bounded by its own timeout, so
/// shutdown latency is at worst one I/O timeout plus one poll interval.
pub struct SyncEngine {
    config: Config,
    /// Tick spacing with the busy-loop floor applied
    poll_interval: Duration,
    tracker: ChangeTracker,
    primary: Endpoint,
    secondary: Endpoint,
    cancel: CancellationToken,
}

impl SyncEngine {
    /// Creates an engine from a resolved configuration and a cancellation token
    pub fn new(config: Config, cancel: CancellationToken) -> Self {
        let poll_interval = cmp::max(
            config.poll_interval,
            Duration::from_millis(MIN_POLL_INTERVAL_MS),
        );
        SyncEngine {
            poll_interval,
            tracker: ChangeTracker::new(config.change_threshold_hz),
            primary: Endpoint::new(config.primary.clone()),
            secondary: Endpoint::new(config.secondary.clone()),
            cancel,
            config,
        }
    }

    /// Runs the sync loop until the cancellation token fires. Every failure
    /// category is handled here; nothing terminates the loop early.
    pub async fn run(&mut self) {
        info!(
            "{} @ {}:{} | {} @ {}:{}; poll={}ms, threshold={} Hz",
            self.config.primary.name,
            self.config.primary.host,
            self.config.primary.port,
            self.config.secondary.name,
            self.config.secondary.host,
            self.config.secondary.port,
            self.poll_interval.as_millis(),
            self.config.change_threshold_hz,
        );

        while !self.cancel.is_cancelled() {
            if !self.primary.is_connected() || !self.secondary.is_connected() {
                if let Err(e) = self.connect_both().await {
                    error!(
                        "{}. Retrying in {:.1}s ...",
                        e,
                        self.config.reconnect_wait.as_secs_f64()
                    );
                    // No partial-connection state survives a failed attempt
                    self.disconnect_both().await;
                    self.wait(self.config.reconnect_wait).await;
                    continue;
                }
            }

            match self.poll_tick().await {
                Ok(()) => self.wait(self.poll_interval).await,
                Err(e) if e.is_io() => {
                    error!(
                        "{}. Reconnecting in {:.1}s ...",
                        e,
                        self.config.reconnect_wait.as_secs_f64()
                    );
                    // Half-connected is useless: discard both handles
                    self.disconnect_both().await;
                    self.wait(self.config.reconnect_wait).await;
                }
                Err(e) => {
                    error!("Unexpected error: {}", e);
                    self.wait(self.poll_interval).await;
                }
            }
        }

        self.disconnect_both().await;
        info!("Exited cleanly.");
    }

    async fn connect_both(&mut self) -> Result<()> {
        self.primary.connect(self.config.io_timeout).await?;
        self.secondary.connect(self.config.io_timeout).await?;
        Ok(())
    }

    async fn disconnect_both(&mut self) {
        self.primary.disconnect().await;
        self.secondary.disconnect().await;
    }

    /// One polling iteration: primary strictly before secondary, so a
    /// correction always acts on a consistent same-tick pair of readings.
    async fn poll_tick(&mut self) -> Result<()> {
        self.tracker.begin_tick();

        let primary_freq = reading(self.primary.query_frequency().await)?;
        let secondary_freq = reading(self.secondary.query_frequency().await)?;

        if let Some(freq) = primary_freq {
            self.tracker.record(Side::Primary, freq);
        }
        if let Some(freq) = secondary_freq {
            self.tracker.record(Side::Secondary, freq);
        }

        let (Some(primary_freq), Some(secondary_freq)) = (primary_freq, secondary_freq) else {
            // One side had no reading this tick; nothing to compare
            return Ok(());
        };

        let delta = primary_freq.abs_diff(secondary_freq);
        if delta < self.config.change_threshold_hz {
            debug!(
                "In sync ({} Hz < {}).",
                delta, self.config.change_threshold_hz
            );
            return Ok(());
        }

        // Tie or no history resolves to the primary as source
        let source = self
            .tracker
            .side_of_most_recent_change()
            .unwrap_or(Side::Primary);
        let value = match source {
            Side::Primary => primary_freq,
            Side::Secondary => secondary_freq,
        };
        let target = self.endpoint_mut(source.other());
        info!("Sync {} -> {} Hz ({} Hz off)", target.config.name, value, delta);
        match target.set_frequency(value).await {
            Ok(()) => {}
            Err(e @ Error::Ack(_)) => warn!("{}", e),
            Err(e) => return Err(e),
        }
        Ok(())
    }

    fn endpoint_mut(&mut self, side: Side) -> &mut Endpoint {
        match side {
            Side::Primary => &mut self.primary,
            Side::Secondary => &mut self.secondary,
        }
    }

    /// Sleeps for `duration`, returning early if the token is cancelled
    async fn wait(&self, duration: Duration) {
        tokio::select! {
            _ = self.cancel.cancelled() => {}
            _ = sleep(duration) => {}
        }
    }
}
