//! Request/reply protocol between the bus core and the poll core.
//!
//! Two single-slot channels, one per direction. The bus core asks for mouse
//! packets and for settings to be saved; the poll core answers packet
//! requests and can stop the bus core around flash writes and
//! reconfiguration. Every request blocks until its reply arrives, so at most
//! one message is in flight per direction.
//!
//! A stop can arrive while the bus core is waiting on a packet reply. The
//! bus core then treats the stop as the reply, and the poll core discards
//! the packet request it was sent.

use embassy_sync::blocking_mutex::raw::RawMutex;
use embassy_sync::channel::Channel;
use portable_atomic::{AtomicU8, Ordering};

use crate::mouse::MousePacket;
use crate::serial::SerialState;
use crate::settings::Settings;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum CoreMessage {
    /// bus -> poll: finalize the cycle.
    RequestMousePacket,
    /// poll -> bus: a packet to post.
    HasUpdate(MousePacket),
    /// poll -> bus: nothing changed this cycle.
    NoUpdate,
    /// poll -> bus: halt before flash or timing changes.
    RequestStop,
    /// bus -> poll: halted.
    Stopped,
    /// poll -> bus: restart with these settings.
    Resume(Settings),
    /// bus -> poll: persist settings edited in the terminal.
    RequestSaveSettings(Settings),
}

/// Answer to [`BusLink::request_packet`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PacketReply {
    Update(MousePacket),
    NoUpdate,
    /// The poll core stopped the bus instead of replying and has since
    /// resumed it with new settings.
    Resumed(Settings),
}

/// What the bus core asked for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum BusRequest {
    MousePacket,
    SaveSettings(Settings),
}

/// The two channels. Lives in a `static` shared by both cores.
pub struct CoreChannels<M: RawMutex> {
    to_poll: Channel<M, CoreMessage, 1>,
    to_bus: Channel<M, CoreMessage, 1>,
}

impl<M: RawMutex> CoreChannels<M> {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            to_poll: Channel::new(),
            to_bus: Channel::new(),
        }
    }

    #[must_use]
    pub fn bus_link(&self) -> BusLink<'_, M> {
        BusLink { channels: self }
    }

    #[must_use]
    pub fn poll_link(&self) -> PollLink<'_, M> {
        PollLink { channels: self }
    }
}

impl<M: RawMutex> Default for CoreChannels<M> {
    fn default() -> Self {
        Self::new()
    }
}

/// Bus core end.
#[derive(Clone, Copy)]
pub struct BusLink<'a, M: RawMutex> {
    channels: &'a CoreChannels<M>,
}

impl<M: RawMutex> BusLink<'_, M> {
    /// Ask the poll core for this cycle's packet.
    pub async fn request_packet(&self) -> PacketReply {
        self.channels
            .to_poll
            .send(CoreMessage::RequestMousePacket)
            .await;
        loop {
            match self.channels.to_bus.receive().await {
                CoreMessage::HasUpdate(pkt) => return PacketReply::Update(pkt),
                CoreMessage::NoUpdate => return PacketReply::NoUpdate,
                CoreMessage::RequestStop => {
                    return PacketReply::Resumed(self.acknowledge_stop().await)
                }
                _ => {}
            }
        }
    }

    /// Hand edited settings over for saving. The poll core stops this core,
    /// writes flash and resumes it; the settings it resumes with are returned.
    pub async fn request_save(&self, settings: Settings) -> Settings {
        self.channels
            .to_poll
            .send(CoreMessage::RequestSaveSettings(settings))
            .await;
        self.stop_requested().await;
        self.acknowledge_stop().await
    }

    /// Wait for a stop outside of a request. Cancel safe, for use in a
    /// `select` with the cycle timer; follow up with
    /// [`acknowledge_stop`](Self::acknowledge_stop).
    pub async fn stop_requested(&self) {
        while self.channels.to_bus.receive().await != CoreMessage::RequestStop {}
    }

    /// Report halted and wait to be resumed.
    pub async fn acknowledge_stop(&self) -> Settings {
        self.channels.to_poll.send(CoreMessage::Stopped).await;
        loop {
            if let CoreMessage::Resume(settings) = self.channels.to_bus.receive().await {
                return settings;
            }
        }
    }
}

/// Poll core end.
#[derive(Clone, Copy)]
pub struct PollLink<'a, M: RawMutex> {
    channels: &'a CoreChannels<M>,
}

impl<M: RawMutex> PollLink<'_, M> {
    /// Next request from the bus core. Cancel safe.
    pub async fn next_request(&self) -> BusRequest {
        loop {
            match self.channels.to_poll.receive().await {
                CoreMessage::RequestMousePacket => return BusRequest::MousePacket,
                CoreMessage::RequestSaveSettings(s) => return BusRequest::SaveSettings(s),
                _ => {}
            }
        }
    }

    pub async fn reply_packet(&self, pkt: Option<MousePacket>) {
        let msg = match pkt {
            Some(pkt) => CoreMessage::HasUpdate(pkt),
            None => CoreMessage::NoUpdate,
        };
        self.channels.to_bus.send(msg).await;
    }

    /// Halt the bus core. Returns settings the bus core asked to save while
    /// the stop was in flight, which the caller must persist.
    pub async fn stop_bus(&self) -> Option<Settings> {
        self.channels.to_bus.send(CoreMessage::RequestStop).await;
        let mut pending = None;
        loop {
            match self.channels.to_poll.receive().await {
                CoreMessage::Stopped => return pending,
                CoreMessage::RequestSaveSettings(s) => pending = Some(s),
                // superseded by the stop
                _ => {}
            }
        }
    }

    pub async fn resume_bus(&self, settings: Settings) {
        self.channels
            .to_bus
            .send(CoreMessage::Resume(settings))
            .await;
    }
}

/// State read by the bus core and written by the poll core, or the other
/// way round. Reads may be one serial cycle stale.
pub struct SharedStatus {
    mouse_count: AtomicU8,
    serial_state: AtomicU8,
}

impl SharedStatus {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            mouse_count: AtomicU8::new(0),
            serial_state: AtomicU8::new(0),
        }
    }

    /// Written by the poll core on mount and unmount.
    pub fn set_mouse_count(&self, count: u8) {
        self.mouse_count.store(count, Ordering::Relaxed);
    }

    #[must_use]
    pub fn mouse_count(&self) -> u8 {
        self.mouse_count.load(Ordering::Relaxed)
    }

    /// Written by the bus core.
    pub fn set_serial_state(&self, state: SerialState) {
        self.serial_state.store(state.to_u8(), Ordering::Relaxed);
    }

    #[must_use]
    pub fn serial_state(&self) -> SerialState {
        SerialState::from_u8(self.serial_state.load(Ordering::Relaxed)).unwrap_or_default()
    }

    /// A terminal session owns the serial port. Stopping the bus core now
    /// would abandon it, so runtime changes wait until it closes.
    #[must_use]
    pub fn stop_deferred(&self) -> bool {
        self.serial_state().is_terminal()
    }
}

impl Default for SharedStatus {
    fn default() -> Self {
        Self::new()
    }
}
