use std::fmt;

/// Parity setting for a serial port.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Parity {
    #[default]
    None,
    Even,
    Odd,
}

impl Parity {
    /// Parse a parity designator as it appears in interface configs:
    /// `N`/`none`, `E`/`even`, `O`/`odd`, case-insensitive.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "n" | "none" => Some(Parity::None),
            "e" | "even" => Some(Parity::Even),
            "o" | "odd" => Some(Parity::Odd),
            _ => None,
        }
    }
}

impl fmt::Display for Parity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Parity::None => write!(f, "N"),
            Parity::Even => write!(f, "E"),
            Parity::Odd => write!(f, "O"),
        }
    }
}

/// Everything an opener needs to open a serial port.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortSettings {
    /// Device path or address, e.g. `/dev/ttyUSB0`.
    pub port: String,
    /// Bit rate in baud.
    pub speed: u32,
    /// Data bits per character (5-8).
    pub databits: u8,
    /// Parity scheme.
    pub parity: Parity,
    /// Stop bits (1 or 2).
    pub stopbits: u8,
}

impl PortSettings {
    /// Settings for `port` with the conventional 9600 8N1 defaults.
    pub fn new(port: impl Into<String>) -> Self {
        Self {
            port: port.into(),
            speed: 9600,
            databits: 8,
            parity: Parity::None,
            stopbits: 1,
        }
    }
}
