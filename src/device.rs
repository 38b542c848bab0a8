/*!
 # USB device transport

 Talks to the keyboard controller through vendor control transfers on
 interface 0. The keyboard being absent is not fatal: the transport degrades
 to a headless no-op so the rest of the engine keeps running (useful for
 previewing and for tests).
*/

use std::time::Duration;

use rusb::{DeviceHandle, GlobalContext};
use tracing::{debug, info, instrument, warn};

use crate::{Result, FRAME_LEN};

/// USB vendor id of the keyboard controller
pub const VENDOR_ID: u16 = 0x048D;
/// USB product id of the keyboard controller
pub const PRODUCT_ID: u16 = 0xC965;

/// Interface carrying the lighting control endpoint
const INTERFACE: u8 = 0;
/// Upper bound on a single control transfer
const USB_TIMEOUT: Duration = Duration::from_secs(1);

/// Where control frames end up: real hardware or a test double
pub trait Transport {
    /// Sends one 33-byte control frame to the device
    fn send(&mut self, frame: &[u8; FRAME_LEN]) -> Result<()>;

    /// Whether a physical device is attached
    fn is_connected(&self) -> bool;
}

/// Control-channel transport for the physical keyboard
pub struct UsbTransport {
    /// Open handle, or `None` when running headless
    handle: Option<DeviceHandle<GlobalContext>>,
    /// Whether a kernel driver was detached and should be reattached on drop
    was_attached: bool,
}

impl UsbTransport {
    /// Opens the keyboard by its fixed vendor/product id.
    ///
    /// If the device is absent (or cannot be claimed) the transport comes up
    /// headless: `send` becomes a successful no-op.
    #[instrument]
    pub fn open() -> Self {
        let Some(mut handle) = rusb::open_device_with_vid_pid(VENDOR_ID, PRODUCT_ID) else {
            warn!(
                "Keyboard {:04x}:{:04x} not found, running headless",
                VENDOR_ID, PRODUCT_ID
            );
            return Self {
                handle: None,
                was_attached: false,
            };
        };

        let was_attached = handle.kernel_driver_active(INTERFACE).unwrap_or(false);
        if was_attached {
            if let Err(e) = handle.detach_kernel_driver(INTERFACE) {
                warn!("Failed to detach kernel driver: {}", e);
            }
        }

        if let Err(e) = handle.claim_interface(INTERFACE) {
            warn!("Failed to claim USB interface {}: {}", INTERFACE, e);
        }

        info!("Connected to keyboard {:04x}:{:04x}", VENDOR_ID, PRODUCT_ID);
        Self {
            handle: Some(handle),
            was_attached,
        }
    }
}

impl Transport for UsbTransport {
    #[instrument(skip(self, frame))]
    fn send(&mut self, frame: &[u8; FRAME_LEN]) -> Result<()> {
        let Some(handle) = &self.handle else {
            debug!("Headless mode, dropping frame");
            return Ok(());
        };

        // bmRequestType 0x21 = Host-to-Device | Class | Interface
        // bRequest 0x09 = SET_REPORT, wValue 0x03CC, wIndex = interface 0
        handle.write_control(0x21, 0x09, 0x03CC, 0x00, frame, USB_TIMEOUT)?;
        debug!("Frame sent");
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.handle.is_some()
    }
}

impl Drop for UsbTransport {
    fn drop(&mut self) {
        if let Some(handle) = &mut self.handle {
            let _ = handle.release_interface(INTERFACE);
            if self.was_attached {
                let _ = handle.attach_kernel_driver(INTERFACE);
            }
        }
    }
}

/// Transport double that records every frame instead of transmitting
#[derive(Debug, Default)]
pub struct MockTransport {
    /// Frames in transmission order
    pub frames: Vec<[u8; FRAME_LEN]>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Transport for MockTransport {
    fn send(&mut self, frame: &[u8; FRAME_LEN]) -> Result<()> {
        self.frames.push(*frame);
        Ok(())
    }

    fn is_connected(&self) -> bool {
        true
    }
}
