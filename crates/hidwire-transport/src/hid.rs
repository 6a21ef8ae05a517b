use std::io::ErrorKind;

use tracing::{debug, trace};

use crate::error::{Result, TransportError};
use crate::model::{DeviceModel, HidDeviceInfo};
use crate::traits::{Chunk, ChunkTransport, CHUNK_SIZE};

/// Raw report I/O over an opened HID interface.
///
/// This is the seam to the OS HID library. Reads and writes move a single
/// report and return how many bytes the stack actually transferred.
pub trait HidDevice {
    /// Read one input report into `buf`.
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize>;

    /// Write one output report.
    fn write(&mut self, data: &[u8]) -> std::io::Result<usize>;
}

/// Whether the HID stack expects a leading report-id byte on writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HidVersion {
    /// Reports are written as-is (64 bytes).
    V1,
    /// Reports are prefixed with a zero report id (65 bytes).
    V2,
}

/// Probe which HID write convention the device accepts.
///
/// Sends a 65-byte report (`00 3F FF..`) first; if every byte is accepted the
/// stack uses report ids. Otherwise the 64-byte tail is sent on its own.
pub fn probe_hid_version<D: HidDevice + ?Sized>(device: &mut D) -> Result<HidVersion> {
    let mut report = [0xFFu8; CHUNK_SIZE + 1];
    report[0] = 0x00;
    report[1] = 0x3F;

    if device.write(&report)? == report.len() {
        return Ok(HidVersion::V2);
    }
    if device.write(&report[1..])? == CHUNK_SIZE {
        return Ok(HidVersion::V1);
    }
    Err(TransportError::UnknownHidVersion)
}

/// Reference-counted owner of an opened device.
///
/// The device is opened on the first [`acquire`](Self::acquire) and dropped on
/// the matching last [`release`](Self::release).
#[derive(Debug)]
pub struct HidHandle<D> {
    count: usize,
    device: Option<D>,
}

impl<D> Default for HidHandle<D> {
    fn default() -> Self {
        Self {
            count: 0,
            device: None,
        }
    }
}

impl<D> HidHandle<D> {
    /// Create a handle with nothing opened.
    pub fn new() -> Self {
        Self::default()
    }

    /// Take one reference, opening the device if this is the first.
    ///
    /// Returns `true` when the device was opened by this call.
    pub fn acquire<F>(&mut self, open: F) -> Result<bool>
    where
        F: FnOnce() -> Result<D>,
    {
        let opened = if self.device.is_none() {
            self.device = Some(open()?);
            true
        } else {
            false
        };
        self.count += 1;
        Ok(opened)
    }

    /// Drop one reference, closing the device when none remain.
    ///
    /// Returns `true` when the device was closed by this call. Releasing a
    /// handle that holds no reference is a no-op.
    pub fn release(&mut self) -> bool {
        match self.count {
            0 => false,
            1 => {
                self.count = 0;
                self.device = None;
                true
            }
            _ => {
                self.count -= 1;
                false
            }
        }
    }

    /// Number of outstanding references.
    pub fn count(&self) -> usize {
        self.count
    }

    /// Whether a device is currently open.
    pub fn is_open(&self) -> bool {
        self.device.is_some()
    }

    /// Borrow the open device.
    pub fn device_mut(&mut self) -> Result<&mut D> {
        self.device.as_mut().ok_or(TransportError::NotOpen)
    }
}

/// [`ChunkTransport`] over a HID interface of a known device.
#[derive(Debug)]
pub struct HidTransport<D> {
    info: HidDeviceInfo,
    handle: HidHandle<D>,
    version: Option<HidVersion>,
}

impl<D: HidDevice> HidTransport<D> {
    /// Create a closed transport for the given interface.
    pub fn new(info: HidDeviceInfo) -> Self {
        Self {
            info,
            handle: HidHandle::new(),
            version: None,
        }
    }

    /// Open (or re-reference) the device.
    ///
    /// On first open the HID version is probed for legacy devices; every other
    /// model uses version 1.
    pub fn open<F>(&mut self, open: F) -> Result<()>
    where
        F: FnOnce(&HidDeviceInfo) -> Result<D>,
    {
        let info = &self.info;
        let opened = self.handle.acquire(|| open(info))?;
        if !opened {
            return Ok(());
        }

        let version = if self.info.model() == Some(DeviceModel::Legacy) {
            match probe_hid_version(self.handle.device_mut()?) {
                Ok(version) => version,
                Err(err) => {
                    self.handle.release();
                    return Err(err);
                }
            }
        } else {
            HidVersion::V1
        };
        debug!(path = %self.info.path, ?version, "opened hid device");
        self.version = Some(version);
        Ok(())
    }

    /// Release one reference; the device closes when the last one goes.
    pub fn close(&mut self) {
        if self.handle.release() {
            debug!(path = %self.info.path, "closed hid device");
            self.version = None;
        }
    }

    /// Descriptor this transport was created for.
    pub fn info(&self) -> &HidDeviceInfo {
        &self.info
    }

    /// Negotiated HID version, when open.
    pub fn hid_version(&self) -> Option<HidVersion> {
        self.version
    }

    /// Whether the underlying device is open.
    pub fn is_open(&self) -> bool {
        self.handle.is_open()
    }
}

impl<D: HidDevice> ChunkTransport for HidTransport<D> {
    fn read_chunk(&mut self) -> Result<Chunk> {
        let device = self.handle.device_mut()?;
        let mut chunk = [0u8; CHUNK_SIZE];
        let read = loop {
            match device.read(&mut chunk) {
                Ok(n) => break n,
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) => return Err(TransportError::Io(err)),
            }
        };
        if read != CHUNK_SIZE {
            return Err(TransportError::ChunkSizeMismatch {
                expected: CHUNK_SIZE,
                actual: read,
            });
        }
        trace!(tag = chunk[0], "read chunk");
        Ok(chunk)
    }

    fn write_chunk(&mut self, chunk: &Chunk) -> Result<()> {
        let version = self.version.ok_or(TransportError::NotOpen)?;
        let device = self.handle.device_mut()?;
        let written = match version {
            HidVersion::V2 => {
                let mut report = [0u8; CHUNK_SIZE + 1];
                report[1..].copy_from_slice(chunk);
                device.write(&report)?.saturating_sub(1)
            }
            HidVersion::V1 => device.write(chunk)?,
        };
        if written != CHUNK_SIZE {
            return Err(TransportError::ChunkSizeMismatch {
                expected: CHUNK_SIZE,
                actual: written,
            });
        }
        trace!(tag = chunk[0], "wrote chunk");
        Ok(())
    }
}
