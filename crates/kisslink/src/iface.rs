use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread;
use std::time::Duration;

use bytes::Bytes;
use kisslink_frame::decoder::{DecodeEvent, Decoder};
use kisslink_frame::{encode_header, kiss, Ax25Address, HEADER_SIZE};
use kisslink_transport::{PortSettings, SerialLink, SerialOpener, TransportError};
use tracing::{debug, error, info, trace, warn};

use crate::clock::Clock;
use crate::config::{DeviceTiming, InterfaceConfig};
use crate::error::{InterfaceError, Result};
use crate::flow::FlowState;

/// Destination callsign stamped on every outbound frame. Only one peer
/// relationship is modeled.
pub const DEFAULT_DST_CALLSIGN: &str = "APZRNS";

/// Receives decoded packets from the reader loop.
pub trait PacketSink: Send + Sync {
    /// Called synchronously from the reader loop for every completed,
    /// header-stripped data frame.
    fn inbound(&self, payload: Bytes, iface: &str);
}

/// Timing knobs for the reader loop and lifecycle manager.
///
/// The defaults are tuned for real serial links; tests shrink them.
#[derive(Debug, Clone, Copy)]
pub struct Timeouts {
    /// Delay between opening the port and configuring the device.
    pub settle: Duration,
    /// Reader sleep when no input is pending.
    pub poll: Duration,
    /// Discard a partial frame after this long without a byte.
    pub idle: Duration,
    /// Force a queue drain if no READY signal arrives within this long.
    pub flow_control: Duration,
    /// Delay between reconnect attempts.
    pub reconnect: Duration,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            settle: Duration::from_secs(2),
            poll: Duration::from_millis(50),
            idle: Duration::from_millis(100),
            flow_control: Duration::from_secs(5),
            reconnect: Duration::from_secs(5),
        }
    }
}

/// An AX.25 KISS serial interface.
///
/// Two-phase lifecycle: [`KissInterface::new`] validates configuration and
/// wires dependencies without touching any transport; [`KissInterface::start`]
/// opens the port, spawns the reader thread, and configures the device.
///
/// After a runtime transport failure the interface goes offline and the
/// reader thread retries the port indefinitely; there is no stop control
/// beyond process shutdown.
pub struct KissInterface {
    inner: Arc<Inner>,
    reader: Option<thread::JoinHandle<()>>,
}

impl std::fmt::Debug for KissInterface {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KissInterface")
            .field("name", &self.inner.name)
            .finish_non_exhaustive()
    }
}

struct Inner {
    name: String,
    settings: PortSettings,
    timing: DeviceTiming,
    timeouts: Timeouts,
    mtu: usize,
    dst: Ax25Address,
    src: Ax25Address,
    flow_control: bool,
    online: AtomicBool,
    rxb: AtomicU64,
    txb: AtomicU64,
    link: Mutex<Option<Box<dyn SerialLink>>>,
    flow: Mutex<FlowState>,
    opener: Box<dyn SerialOpener>,
    sink: Arc<dyn PacketSink>,
    clock: Arc<dyn Clock>,
}

impl KissInterface {
    pub fn new(
        config: &InterfaceConfig,
        opener: Box<dyn SerialOpener>,
        sink: Arc<dyn PacketSink>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self> {
        let v = config.validate()?;
        let now = clock.now();

        Ok(Self {
            inner: Arc::new(Inner {
                name: v.name,
                settings: v.settings,
                timing: v.timing,
                timeouts: Timeouts::default(),
                mtu: v.mtu,
                dst: v.dst,
                src: v.src,
                flow_control: v.flow_control,
                online: AtomicBool::new(false),
                rxb: AtomicU64::new(0),
                txb: AtomicU64::new(0),
                link: Mutex::new(None),
                flow: Mutex::new(FlowState::new(v.flow_control, now)),
                opener,
                sink,
                clock,
            }),
            reader: None,
        })
    }

    /// Override the default timing knobs. Only effective before `start`.
    pub fn with_timeouts(mut self, timeouts: Timeouts) -> Self {
        if let Some(inner) = Arc::get_mut(&mut self.inner) {
            inner.timeouts = timeouts;
        }
        self
    }

    /// Open the port, spawn the reader loop, and configure the device.
    ///
    /// Errors here are fatal for this interface: an open failure, or a
    /// configuration write that does not complete.
    pub fn start(&mut self) -> Result<()> {
        let inner = Arc::clone(&self.inner);

        self.inner.open_link()?;
        self.inner.clock.sleep(self.inner.timeouts.settle);

        let handle = thread::Builder::new()
            .name(format!("kiss-reader-{}", self.inner.name))
            .spawn(move || reader_main(inner))
            .map_err(TransportError::Io)?;
        self.reader = Some(handle);

        self.inner.finish_configure()
    }

    /// Hand an outbound packet to the interface.
    ///
    /// Queued if the device has not signalled readiness; dropped (with a
    /// log event) while the interface is offline. A partial write surfaces
    /// as [`InterfaceError::ShortWrite`] and the payload is not retried.
    pub fn send(&self, payload: impl Into<Bytes>) -> Result<()> {
        self.inner.send(payload.into())
    }

    pub fn name(&self) -> &str {
        &self.inner.name
    }

    pub fn is_online(&self) -> bool {
        self.inner.online()
    }

    /// Payloads waiting on a device READY signal.
    pub fn pending_tx(&self) -> usize {
        self.inner.lock_flow().queued()
    }

    /// Total bytes received, including address headers.
    pub fn rx_bytes(&self) -> u64 {
        self.inner.rxb.load(Ordering::Relaxed)
    }

    /// Total payload bytes transmitted.
    pub fn tx_bytes(&self) -> u64 {
        self.inner.txb.load(Ordering::Relaxed)
    }
}

impl Inner {
    fn online(&self) -> bool {
        self.online.load(Ordering::SeqCst)
    }

    fn lock_flow(&self) -> MutexGuard<'_, FlowState> {
        self.flow.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn lock_link(&self) -> MutexGuard<'_, Option<Box<dyn SerialLink>>> {
        self.link.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn open_link(&self) -> Result<()> {
        info!(name = %self.name, port = %self.settings.port, "opening serial port");
        let link = self.opener.open(&self.settings)?;
        *self.lock_link() = Some(link);
        Ok(())
    }

    /// Configure the device and bring the interface online. The reader
    /// loop may already be running; configuration writes serialize with it
    /// through the link mutex.
    fn finish_configure(&self) -> Result<()> {
        self.configure_device()?;
        {
            let mut flow = self.lock_flow();
            flow.reset(self.clock.now());
            flow.mark_ready();
        }
        self.online.store(true, Ordering::SeqCst);
        info!(name = %self.name, "interface configured and online");
        Ok(())
    }

    fn configure_device(&self) -> Result<()> {
        debug!(name = %self.name, "configuring KISS device parameters");
        self.write_control("preamble", kiss::CMD_TXDELAY, tens(self.timing.preamble_ms))?;
        self.write_control("txtail", kiss::CMD_TXTAIL, tens(self.timing.txtail_ms))?;
        self.write_control("persistence", kiss::CMD_P, byte(self.timing.persistence))?;
        self.write_control("slottime", kiss::CMD_SLOTTIME, tens(self.timing.slottime_ms))?;
        self.write_control("flow control", kiss::CMD_READY, 0x01)?;
        Ok(())
    }

    fn write_control(&self, setting: &'static str, command: u8, value: u8) -> Result<()> {
        let frame = kiss::control_frame(command, value);
        let written = {
            let mut guard = self.lock_link();
            let link = guard.as_mut().ok_or(TransportError::Closed)?;
            link.write(&frame)?
        };
        if written != frame.len() {
            return Err(InterfaceError::DeviceConfig {
                setting,
                written,
                expected: frame.len(),
            });
        }
        trace!(setting, value, "device parameter written");
        Ok(())
    }

    fn send(&self, payload: Bytes) -> Result<()> {
        if !self.online() {
            debug!(name = %self.name, len = payload.len(), "interface offline, dropping outbound payload");
            return Ok(());
        }

        {
            let mut flow = self.lock_flow();
            if !flow.is_ready() {
                flow.push(payload);
                trace!(queued = flow.queued(), "interface busy, payload queued");
                return Ok(());
            }
            flow.lock(self.clock.now());
        }

        self.transmit(&payload)
    }

    /// Frame and write one payload: address header, control, PID, data,
    /// all KISS-escaped between delimiters.
    fn transmit(&self, payload: &[u8]) -> Result<()> {
        let mut body = encode_header(&self.dst, &self.src);
        body.extend_from_slice(payload);
        let frame = kiss::data_frame(kiss::CMD_DATA, &body);

        let written = {
            let mut guard = self.lock_link();
            let link = guard.as_mut().ok_or(TransportError::Closed)?;
            link.write(&frame)?
        };

        if written != frame.len() {
            // The device may still signal READY for the partial frame;
            // do not leave the interface locked on a failed send.
            self.lock_flow().unlock();
            return Err(InterfaceError::ShortWrite {
                written,
                expected: frame.len(),
            });
        }

        self.txb.fetch_add(payload.len() as u64, Ordering::Relaxed);
        trace!(len = payload.len(), "frame transmitted");
        Ok(())
    }

    /// Pop and resend the oldest queued payload, if any.
    fn drain_queue(&self) {
        let next = self.lock_flow().drain_one();
        if let Some(payload) = next {
            if let Err(err) = self.send(payload) {
                warn!(name = %self.name, %err, "queued transmit failed");
            }
        }
    }

    /// One reader session: poll the open link byte by byte until a
    /// transport error ends it. Never returns `Ok`.
    fn run_session(&self) -> kisslink_transport::Result<()> {
        let mut decoder = Decoder::new(self.mtu);

        loop {
            let mut received: Option<u8> = None;
            {
                let mut guard = self.lock_link();
                let link = guard.as_mut().ok_or(TransportError::Closed)?;
                if !link.is_open() {
                    return Err(TransportError::Closed);
                }
                if link.bytes_available()? > 0 {
                    let mut buf = [0u8; 1];
                    if link.read(&mut buf)? == 1 {
                        received = Some(buf[0]);
                    }
                }
            }

            match received {
                Some(byte) => match decoder.push(byte, self.clock.now()) {
                    Some(DecodeEvent::Packet(payload)) => {
                        self.rxb
                            .fetch_add((payload.len() + HEADER_SIZE) as u64, Ordering::Relaxed);
                        self.sink.inbound(payload, &self.name);
                    }
                    Some(DecodeEvent::Ready) => self.drain_queue(),
                    None => {}
                },
                None => {
                    decoder.expire_idle(self.clock.now(), self.timeouts.idle);
                    self.clock.sleep(self.timeouts.poll);

                    if self.flow_control {
                        let stuck = self
                            .lock_flow()
                            .timed_out(self.clock.now(), self.timeouts.flow_control);
                        if stuck {
                            // Documented failsafe: the device missed (or
                            // does not support) the READY command.
                            warn!(
                                name = %self.name,
                                "unlocking flow control after timeout; this should not happen"
                            );
                            self.drain_queue();
                        }
                    }
                }
            }
        }
    }

    fn go_offline(&self) {
        self.online.store(false, Ordering::SeqCst);
        if let Some(mut link) = self.lock_link().take() {
            link.close();
        }
    }

    /// Retry open + configure with a fixed delay, forever, until the port
    /// comes back. Long-running field links never give up.
    fn reconnect(&self) {
        while !self.online() {
            self.clock.sleep(self.timeouts.reconnect);
            info!(name = %self.name, port = %self.settings.port, "attempting to reconnect serial port");
            match self.try_reopen() {
                Ok(()) => info!(name = %self.name, "reconnected serial port"),
                Err(err) => warn!(name = %self.name, %err, "error while reconnecting port"),
            }
        }
    }

    fn try_reopen(&self) -> Result<()> {
        self.open_link()?;
        self.clock.sleep(self.timeouts.settle);
        self.finish_configure()
    }
}

/// Reader thread body: run sessions until the process exits, reconnecting
/// after every transport failure.
fn reader_main(inner: Arc<Inner>) {
    loop {
        if let Err(err) = inner.run_session() {
            error!(name = %inner.name, %err, "serial port error, interface is now offline");
        }
        inner.go_offline();
        inner.reconnect();
    }
}

/// Millisecond value to the tens-of-ms byte the device expects.
fn tens(ms: u32) -> u8 {
    (ms / 10).min(255) as u8
}

fn byte(value: u32) -> u8 {
    value.min(255) as u8
}
