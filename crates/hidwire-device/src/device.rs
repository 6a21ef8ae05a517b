use hidwire_protocol::{Frame, MessageType, Protocol, ProtocolVersion, WireProtocol};
use hidwire_transport::{ChunkTransport, DeviceModel, HidDevice, HidDeviceInfo, HidTransport};
use tracing::{debug, info};

use crate::config::{select_protocol, DeviceConfig};
use crate::error::{DeviceError, Result};
use crate::message::Message;

/// A connection to one device: the chunk transport plus the protocol state
/// bound to it.
///
/// All operations take `&mut self`; one exchange runs at a time. Wrap the
/// device in a `Mutex` to share it between threads.
#[derive(Debug)]
pub struct Device<T> {
    transport: T,
    protocol: WireProtocol,
}

impl<T: ChunkTransport> Device<T> {
    /// Bind a protocol to a transport. No I/O is performed.
    pub fn new(transport: T, protocol: impl Into<WireProtocol>) -> Self {
        Self {
            transport,
            protocol: protocol.into(),
        }
    }

    /// Bind the protocol `model` speaks under `config` to a transport.
    pub fn for_model(transport: T, model: DeviceModel, config: &DeviceConfig) -> Self {
        let version = select_protocol(model, config);
        debug!(%model, %version, "selected protocol");
        Self::new(
            transport,
            WireProtocol::new(version, config.protocol.clone()),
        )
    }

    /// Begin the protocol session (handshake for V2, no-op for V1).
    pub fn open(&mut self) -> Result<()> {
        self.protocol.begin_session(&mut self.transport)?;
        Ok(())
    }

    /// End the protocol session, if one is active.
    pub fn close(&mut self) -> Result<()> {
        self.protocol.end_session(&mut self.transport)?;
        Ok(())
    }

    /// Send one raw message.
    pub fn write_message(&mut self, message_type: MessageType, payload: &[u8]) -> Result<()> {
        self.protocol
            .write_message(&mut self.transport, message_type, payload)?;
        Ok(())
    }

    /// Receive one raw message.
    pub fn read_message(&mut self) -> Result<Frame> {
        Ok(self.protocol.read_message(&mut self.transport)?)
    }

    /// Send one raw message and wait for the reply.
    pub fn call(&mut self, message_type: MessageType, payload: &[u8]) -> Result<Frame> {
        self.write_message(message_type, payload)?;
        self.read_message()
    }

    /// Encode and send a typed message.
    pub fn send<M: Message>(&mut self, message: &M) -> Result<()> {
        let payload = message.encode()?;
        self.write_message(M::MESSAGE_TYPE, &payload)
    }

    /// Receive a typed message, rejecting any other message type.
    pub fn recv<M: Message>(&mut self) -> Result<M> {
        let frame = self.read_message()?;
        decode_frame::<M>(&frame)
    }

    /// Send a typed request and decode the typed response.
    pub fn exchange<Req: Message, Resp: Message>(&mut self, request: &Req) -> Result<Resp> {
        self.send(request)?;
        self.recv()
    }

    /// Protocol generation in use.
    pub fn version(&self) -> ProtocolVersion {
        self.protocol.version()
    }

    /// Whether a V2 session is active.
    pub fn has_session(&self) -> bool {
        self.protocol.has_session()
    }

    /// Borrow the protocol state.
    pub fn protocol(&self) -> &WireProtocol {
        &self.protocol
    }

    /// Borrow the underlying transport.
    pub fn get_ref(&self) -> &T {
        &self.transport
    }

    /// Mutably borrow the underlying transport.
    pub fn get_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    /// Consume the device and return the transport. No session teardown is done.
    pub fn into_inner(self) -> T {
        self.transport
    }
}

impl<D: HidDevice> Device<HidTransport<D>> {
    /// Open a HID interface, pick its protocol and begin the session.
    pub fn connect<F>(info: HidDeviceInfo, open: F, config: &DeviceConfig) -> Result<Self>
    where
        F: FnOnce(&HidDeviceInfo) -> hidwire_transport::Result<D>,
    {
        let model = info.model().ok_or(DeviceError::UnsupportedDevice {
            vendor_id: info.vendor_id,
            product_id: info.product_id,
        })?;

        let mut transport = HidTransport::new(info);
        transport.open(open)?;

        let mut device = Self::for_model(transport, model, config);
        if let Err(err) = device.open() {
            device.transport.close();
            return Err(err);
        }
        info!(
            path = %device.transport.info().path,
            %model,
            version = %device.version(),
            "connected to device"
        );
        Ok(device)
    }

    /// End the session and release the HID handle.
    ///
    /// The handle is released even when the session teardown fails.
    pub fn disconnect(mut self) -> Result<()> {
        let result = self.close();
        self.transport.close();
        debug!(path = %self.transport.info().path, "disconnected from device");
        result
    }
}

fn decode_frame<M: Message>(frame: &Frame) -> Result<M> {
    if frame.message_type != M::MESSAGE_TYPE {
        return Err(DeviceError::UnexpectedMessage {
            expected: M::MESSAGE_TYPE,
            actual: frame.message_type,
        });
    }
    M::decode(frame.payload.as_ref())
}
