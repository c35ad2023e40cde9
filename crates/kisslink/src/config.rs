use kisslink_frame::decoder::DEFAULT_MTU;
use kisslink_frame::Ax25Address;
use kisslink_transport::{Parity, PortSettings};
use serde::Deserialize;

use crate::error::ConfigError;
use crate::iface::DEFAULT_DST_CALLSIGN;

/// Recognized interface options.
///
/// Parsing the surrounding config file is the caller's business; this is
/// the shape it deserializes into. Everything except `port` and `callsign`
/// has a usable default. The SSID defaults to -1, which is invalid: a
/// station must pick one explicitly.
#[derive(Debug, Clone, Deserialize)]
pub struct InterfaceConfig {
    #[serde(default = "defaults::name")]
    pub name: String,
    pub port: Option<String>,
    #[serde(default = "defaults::speed")]
    pub speed: u32,
    #[serde(default = "defaults::databits")]
    pub databits: u8,
    #[serde(default = "defaults::parity")]
    pub parity: String,
    #[serde(default = "defaults::stopbits")]
    pub stopbits: u8,
    /// Preamble (TX delay) in milliseconds.
    #[serde(default = "defaults::preamble")]
    pub preamble: u32,
    /// TX tail in milliseconds.
    #[serde(default = "defaults::txtail")]
    pub txtail: u32,
    /// CSMA persistence, 0-255.
    #[serde(default = "defaults::persistence")]
    pub persistence: u32,
    /// Slot time in milliseconds.
    #[serde(default = "defaults::slottime")]
    pub slottime: u32,
    #[serde(default)]
    pub flow_control: bool,
    #[serde(default)]
    pub callsign: String,
    #[serde(default = "defaults::ssid")]
    pub ssid: i16,
    /// Maximum payload size per frame, excluding the address header.
    #[serde(default = "defaults::mtu")]
    pub mtu: usize,
}

mod defaults {
    use super::DEFAULT_MTU;

    pub fn name() -> String {
        "ax25kiss".to_string()
    }
    pub fn speed() -> u32 {
        9600
    }
    pub fn databits() -> u8 {
        8
    }
    pub fn parity() -> String {
        "N".to_string()
    }
    pub fn stopbits() -> u8 {
        1
    }
    pub fn preamble() -> u32 {
        350
    }
    pub fn txtail() -> u32 {
        20
    }
    pub fn persistence() -> u32 {
        64
    }
    pub fn slottime() -> u32 {
        20
    }
    pub fn ssid() -> i16 {
        -1
    }
    pub fn mtu() -> usize {
        DEFAULT_MTU
    }
}

impl Default for InterfaceConfig {
    fn default() -> Self {
        Self {
            name: defaults::name(),
            port: None,
            speed: defaults::speed(),
            databits: defaults::databits(),
            parity: defaults::parity(),
            stopbits: defaults::stopbits(),
            preamble: defaults::preamble(),
            txtail: defaults::txtail(),
            persistence: defaults::persistence(),
            slottime: defaults::slottime(),
            flow_control: false,
            callsign: String::new(),
            ssid: defaults::ssid(),
            mtu: defaults::mtu(),
        }
    }
}

/// Validated, typed configuration parts.
#[derive(Debug, Clone)]
pub(crate) struct Validated {
    pub name: String,
    pub settings: PortSettings,
    pub timing: DeviceTiming,
    pub flow_control: bool,
    pub mtu: usize,
    pub src: Ax25Address,
    pub dst: Ax25Address,
}

/// KISS device timing parameters, in the units configs use.
#[derive(Debug, Clone, Copy)]
pub(crate) struct DeviceTiming {
    pub preamble_ms: u32,
    pub txtail_ms: u32,
    pub persistence: u32,
    pub slottime_ms: u32,
}

impl InterfaceConfig {
    /// Validate and produce typed parts. Fails before any transport is
    /// touched.
    pub(crate) fn validate(&self) -> Result<Validated, ConfigError> {
        let port = self.port.clone().ok_or(ConfigError::MissingPort)?;
        let parity = Parity::parse(&self.parity)
            .ok_or_else(|| ConfigError::InvalidParity(self.parity.clone()))?;
        let src = Ax25Address::new(&self.callsign, self.ssid)?;
        let dst = Ax25Address::new(DEFAULT_DST_CALLSIGN, 0)?;

        Ok(Validated {
            name: self.name.clone(),
            settings: PortSettings {
                port,
                speed: self.speed,
                databits: self.databits,
                parity,
                stopbits: self.stopbits,
            },
            timing: DeviceTiming {
                preamble_ms: self.preamble,
                txtail_ms: self.txtail,
                persistence: self.persistence,
                slottime_ms: self.slottime,
            },
            flow_control: self.flow_control,
            mtu: self.mtu,
            src,
            dst,
        })
    }
}

#[cfg(test)]
mod tests {
    use kisslink_frame::FrameError;

    use super::*;

    fn minimal() -> InterfaceConfig {
        InterfaceConfig {
            port: Some("/dev/ttyUSB0".to_string()),
            callsign: "N0CALL".to_string(),
            ssid: 0,
            ..InterfaceConfig::default()
        }
    }

    #[test]
    fn minimal_config_validates() {
        let v = minimal().validate().unwrap();
        assert_eq!(v.settings.port, "/dev/ttyUSB0");
        assert_eq!(v.settings.speed, 9600);
        assert_eq!(v.settings.parity, Parity::None);
        assert_eq!(v.timing.preamble_ms, 350);
        assert_eq!(v.timing.txtail_ms, 20);
        assert_eq!(v.timing.persistence, 64);
        assert_eq!(v.timing.slottime_ms, 20);
        assert_eq!(v.mtu, DEFAULT_MTU);
        assert!(!v.flow_control);
        assert_eq!(v.src.callsign(), "N0CALL");
        assert_eq!(v.dst.callsign(), DEFAULT_DST_CALLSIGN);
    }

    #[test]
    fn missing_port_is_rejected() {
        let cfg = InterfaceConfig {
            port: None,
            ..minimal()
        };
        assert!(matches!(cfg.validate(), Err(ConfigError::MissingPort)));
    }

    #[test]
    fn default_ssid_is_rejected() {
        let cfg = InterfaceConfig {
            ssid: defaults::ssid(),
            ..minimal()
        };
        assert!(matches!(
            cfg.validate(),
            Err(ConfigError::Address(FrameError::InvalidSsid { ssid: -1 }))
        ));
    }

    #[test]
    fn ssid_16_is_rejected() {
        let cfg = InterfaceConfig {
            ssid: 16,
            ..minimal()
        };
        assert!(matches!(
            cfg.validate(),
            Err(ConfigError::Address(FrameError::InvalidSsid { ssid: 16 }))
        ));
    }

    #[test]
    fn bad_callsign_is_rejected() {
        let cfg = InterfaceConfig {
            callsign: "XY".to_string(),
            ..minimal()
        };
        assert!(matches!(
            cfg.validate(),
            Err(ConfigError::Address(FrameError::InvalidCallsign { .. }))
        ));
    }

    #[test]
    fn bad_parity_is_rejected() {
        let cfg = InterfaceConfig {
            parity: "M".to_string(),
            ..minimal()
        };
        assert!(matches!(cfg.validate(), Err(ConfigError::InvalidParity(_))));
    }

    #[test]
    fn parity_words_are_accepted() {
        let cfg = InterfaceConfig {
            parity: "even".to_string(),
            ..minimal()
        };
        assert_eq!(cfg.validate().unwrap().settings.parity, Parity::Even);
    }

    #[test]
    fn deserializes_with_defaults() {
        let cfg: InterfaceConfig = serde_json::from_str(
            r#"{
                "name": "radio0",
                "port": "/dev/ttyS0",
                "callsign": "abcde",
                "ssid": 7,
                "flow_control": true
            }"#,
        )
        .unwrap();

        assert_eq!(cfg.name, "radio0");
        assert_eq!(cfg.speed, 9600);
        assert_eq!(cfg.databits, 8);
        assert_eq!(cfg.stopbits, 1);
        assert_eq!(cfg.preamble, 350);
        assert!(cfg.flow_control);

        let v = cfg.validate().unwrap();
        assert_eq!(v.src.callsign(), "ABCDE");
        assert_eq!(v.src.ssid(), 7);
    }
}
