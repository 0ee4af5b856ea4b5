//! Modem, VoIP and handset capabilities
//!
//! Call state changes are not returned from these traits; real backends
//! report them through the event manager as `Modem` and `Voip` events.

use event_manager::{ModemState, VoipState};

use super::{BackendError, BackendResult};

pub trait ModemManager: Send {
    fn call(&self, number: &str) -> BackendResult<()>;
    fn accept(&self) -> BackendResult<()>;
    fn terminate(&self) -> BackendResult<()>;
    fn state(&self) -> BackendResult<ModemState>;
}

/// SIP account credentials for [`Voip::login`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VoipAccount {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,
}

pub trait Voip: Send {
    fn login(&self, account: &VoipAccount) -> BackendResult<()>;
    fn logout(&self) -> BackendResult<()>;
    fn call(&self, uri: &str) -> BackendResult<()>;
    /// Accept the incoming call and return the caller's address
    fn accept(&self) -> BackendResult<String>;
    fn terminate(&self) -> BackendResult<()>;
    fn state(&self) -> BackendResult<VoipState>;
    /// Remote party of the current call
    fn contact(&self) -> BackendResult<String>;
    /// Send one DTMF digit on the current call
    fn dial(&self, dtmf: u8) -> BackendResult<()>;
}

/// Display and keypad of the desk handset
///
/// Without a handset attached every operation succeeds and does nothing.
pub trait Handset: Send {
    fn display_clear(&self) -> BackendResult<()>;
    fn display_sync(&self) -> BackendResult<()>;
    fn display_set_brightness(&self, brightness: u32) -> BackendResult<()>;
    fn keypad_set_brightness(&self, brightness: u32) -> BackendResult<()>;
    fn icon_show(&self, id: u32, show: bool) -> BackendResult<()>;
    fn text_show(&self, x: u32, y: u32, text: &str, show: bool) -> BackendResult<()>;
}

/// Hot-plugged USB handset
pub trait UsbHandset: Send {
    fn is_connected(&self) -> bool;
}

#[derive(Debug, Default)]
pub struct NullModemManager;

impl ModemManager for NullModemManager {
    fn call(&self, _number: &str) -> BackendResult<()> {
        Err(BackendError::NotSupported("modem_manager_call"))
    }

    fn accept(&self) -> BackendResult<()> {
        Err(BackendError::NotSupported("modem_manager_accept"))
    }

    fn terminate(&self) -> BackendResult<()> {
        Err(BackendError::NotSupported("modem_manager_terminate"))
    }

    fn state(&self) -> BackendResult<ModemState> {
        Err(BackendError::NotSupported("modem_manager_get_state"))
    }
}

#[derive(Debug, Default)]
pub struct NullVoip;

impl Voip for NullVoip {
    fn login(&self, _account: &VoipAccount) -> BackendResult<()> {
        Err(BackendError::NotSupported("voip_login"))
    }

    fn logout(&self) -> BackendResult<()> {
        Err(BackendError::NotSupported("voip_logout"))
    }

    fn call(&self, _uri: &str) -> BackendResult<()> {
        Err(BackendError::NotSupported("voip_call"))
    }

    fn accept(&self) -> BackendResult<String> {
        Err(BackendError::NotSupported("voip_accept"))
    }

    fn terminate(&self) -> BackendResult<()> {
        Err(BackendError::NotSupported("voip_terminate"))
    }

    fn state(&self) -> BackendResult<VoipState> {
        Err(BackendError::NotSupported("voip_get_state"))
    }

    fn contact(&self) -> BackendResult<String> {
        Err(BackendError::NotSupported("voip_get_contact"))
    }

    fn dial(&self, _dtmf: u8) -> BackendResult<()> {
        Err(BackendError::NotSupported("voip_dial"))
    }
}

#[derive(Debug, Default)]
pub struct NullHandset;

impl Handset for NullHandset {
    fn display_clear(&self) -> BackendResult<()> {
        Ok(())
    }

    fn display_sync(&self) -> BackendResult<()> {
        Ok(())
    }

    fn display_set_brightness(&self, _brightness: u32) -> BackendResult<()> {
        Ok(())
    }

    fn keypad_set_brightness(&self, _brightness: u32) -> BackendResult<()> {
        Ok(())
    }

    fn icon_show(&self, _id: u32, _show: bool) -> BackendResult<()> {
        Ok(())
    }

    fn text_show(&self, _x: u32, _y: u32, _text: &str, _show: bool) -> BackendResult<()> {
        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct NullUsbHandset;

impl UsbHandset for NullUsbHandset {
    fn is_connected(&self) -> bool {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_null_voip_rejects_calls() {
        let account = VoipAccount {
            host: "sip.example.org".to_string(),
            port: 5060,
            username: "desk".to_string(),
            password: "secret".to_string(),
        };
        assert!(matches!(
            NullVoip.login(&account),
            Err(BackendError::NotSupported("voip_login"))
        ));
        assert!(matches!(NullVoip.dial(b'5'), Err(BackendError::NotSupported(_))));
        assert!(matches!(
            NullModemManager.call("0123"),
            Err(BackendError::NotSupported("modem_manager_call"))
        ));
    }

    #[test]
    fn test_null_handset_accepts_display_updates() {
        let handset = NullHandset;
        handset.display_clear().unwrap();
        handset.text_show(0, 1, "Hello", true).unwrap();
        handset.icon_show(3, false).unwrap();
        handset.display_sync().unwrap();
        assert!(!NullUsbHandset.is_connected());
    }
}
